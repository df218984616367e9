//! Gap-based position ordering for Kanban columns.
//!
//! Tasks carry an integer `position` ordering them within their
//! (workspace, status) column. Positions are assigned in steps of 1000 so
//! a single move rewrites only the columns it touches, never the whole
//! board.

use std::collections::BTreeMap;

use api_types::TaskStatus;
use thiserror::Error;
use uuid::Uuid;

pub const POSITION_STEP: i64 = 1_000;
pub const POSITION_CEILING: i64 = 1_000_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoveError {
    #[error("task {0} is not on the board")]
    TaskNotFound(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardEntry {
    pub id: Uuid,
    pub status: TaskStatus,
    pub position: i64,
}

/// One row of the batch produced by a move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionUpdate {
    pub id: Uuid,
    pub status: TaskStatus,
    pub position: i64,
}

/// Position assigned to the slot at `index` in a column, clamped so
/// oversized columns stop growing the position space.
pub fn slot(index: usize) -> i64 {
    ((index as i64 + 1) * POSITION_STEP).min(POSITION_CEILING)
}

/// Position for a task created into a column: one step above the current
/// minimum, near the front of the ordering. Empty columns start at one
/// step.
pub fn creation_position(column_min: Option<i64>) -> i64 {
    match column_min {
        Some(min) => min + POSITION_STEP,
        None => POSITION_STEP,
    }
}

/// In-memory board: status -> tasks ordered ascending by position.
/// Reconstructed from the flat task list on every use.
#[derive(Debug, Default)]
pub struct Board {
    columns: BTreeMap<TaskStatus, Vec<BoardEntry>>,
}

impl Board {
    pub fn from_tasks<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = BoardEntry>,
    {
        let mut columns: BTreeMap<TaskStatus, Vec<BoardEntry>> = BTreeMap::new();
        for entry in entries {
            columns.entry(entry.status).or_default().push(entry);
        }
        for column in columns.values_mut() {
            column.sort_by_key(|entry| entry.position);
        }
        Self { columns }
    }

    pub fn column(&self, status: TaskStatus) -> &[BoardEntry] {
        self.columns.get(&status).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Moves a task to `destination_index` within the `destination_status`
    /// column and returns the minimal batch of position updates: the moved
    /// task always, displaced destination siblings, and - for cross-column
    /// moves - the source column re-packed to close the gap. Tasks whose
    /// position already matches their slot are skipped. Only the two
    /// affected columns ever appear in the batch.
    pub fn plan_move(
        &mut self,
        task_id: Uuid,
        destination_status: TaskStatus,
        destination_index: usize,
    ) -> Result<Vec<PositionUpdate>, MoveError> {
        let mut removed = None;
        for (status, column) in self.columns.iter_mut() {
            if let Some(index) = column.iter().position(|entry| entry.id == task_id) {
                removed = Some((*status, column.remove(index)));
                break;
            }
        }
        let (source_status, mut entry) = removed.ok_or(MoveError::TaskNotFound(task_id))?;
        entry.status = destination_status;

        let destination = self.columns.entry(destination_status).or_default();
        let index = destination_index.min(destination.len());
        entry.position = slot(index);
        destination.insert(index, entry);

        let mut updates = vec![PositionUpdate {
            id: task_id,
            status: destination_status,
            position: slot(index),
        }];

        for (index, entry) in destination.iter_mut().enumerate() {
            if entry.id == task_id {
                continue;
            }
            let position = slot(index);
            if entry.position != position {
                entry.position = position;
                updates.push(PositionUpdate {
                    id: entry.id,
                    status: destination_status,
                    position,
                });
            }
        }

        if source_status != destination_status {
            if let Some(source) = self.columns.get_mut(&source_status) {
                for (index, entry) in source.iter_mut().enumerate() {
                    let position = slot(index);
                    if entry.position != position {
                        entry.position = position;
                        updates.push(PositionUpdate {
                            id: entry.id,
                            status: source_status,
                            position,
                        });
                    }
                }
            }
        }

        Ok(updates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: Uuid, status: TaskStatus, position: i64) -> BoardEntry {
        BoardEntry {
            id,
            status,
            position,
        }
    }

    fn column_ids(board: &Board, status: TaskStatus) -> Vec<Uuid> {
        board.column(status).iter().map(|e| e.id).collect()
    }

    #[test]
    fn creation_position_starts_empty_columns_at_one_step() {
        assert_eq!(creation_position(None), 1_000);
        assert_eq!(creation_position(Some(1_000)), 2_000);
        assert_eq!(creation_position(Some(5_000)), 6_000);
    }

    #[test]
    fn slot_clamps_at_the_ceiling() {
        assert_eq!(slot(0), 1_000);
        assert_eq!(slot(998), 999_000);
        assert_eq!(slot(999), 1_000_000);
        assert_eq!(slot(5_000), 1_000_000);
    }

    #[test]
    fn columns_sort_ascending_by_position() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let board = Board::from_tasks(vec![
            entry(b, TaskStatus::Todo, 2_000),
            entry(a, TaskStatus::Todo, 1_000),
        ]);
        assert_eq!(column_ids(&board, TaskStatus::Todo), vec![a, b]);
    }

    #[test]
    fn same_column_reorder_skips_settled_tasks() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let mut board = Board::from_tasks(vec![
            entry(a, TaskStatus::Todo, 1_000),
            entry(b, TaskStatus::Todo, 2_000),
            entry(c, TaskStatus::Todo, 3_000),
        ]);

        // Move the last task to the front: a and b shift down one slot each.
        let updates = board.plan_move(c, TaskStatus::Todo, 0).unwrap();

        assert_eq!(column_ids(&board, TaskStatus::Todo), vec![c, a, b]);
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[0], PositionUpdate {
            id: c,
            status: TaskStatus::Todo,
            position: 1_000,
        });
        assert!(updates.iter().any(|u| u.id == a && u.position == 2_000));
        assert!(updates.iter().any(|u| u.id == b && u.position == 3_000));
    }

    #[test]
    fn dropping_back_into_place_touches_only_the_moved_task() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut board = Board::from_tasks(vec![
            entry(a, TaskStatus::Todo, 1_000),
            entry(b, TaskStatus::Todo, 2_000),
        ]);

        let updates = board.plan_move(b, TaskStatus::Todo, 1).unwrap();

        // Position already matches the slot formula, so nothing else moves.
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].id, b);
        assert_eq!(updates[0].position, 2_000);
    }

    #[test]
    fn cross_column_move_closes_the_source_gap() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let d = Uuid::new_v4();
        let mut board = Board::from_tasks(vec![
            entry(a, TaskStatus::Todo, 1_000),
            entry(b, TaskStatus::Todo, 2_000),
            entry(c, TaskStatus::Todo, 3_000),
            entry(d, TaskStatus::InProgress, 1_000),
        ]);

        let updates = board.plan_move(a, TaskStatus::InProgress, 0).unwrap();

        assert_eq!(column_ids(&board, TaskStatus::Todo), vec![b, c]);
        assert_eq!(column_ids(&board, TaskStatus::InProgress), vec![a, d]);

        // Moved task, displaced d, and both source tasks repacked.
        assert!(updates.contains(&PositionUpdate {
            id: a,
            status: TaskStatus::InProgress,
            position: 1_000,
        }));
        assert!(updates.contains(&PositionUpdate {
            id: d,
            status: TaskStatus::InProgress,
            position: 2_000,
        }));
        assert!(updates.contains(&PositionUpdate {
            id: b,
            status: TaskStatus::Todo,
            position: 1_000,
        }));
        assert!(updates.contains(&PositionUpdate {
            id: c,
            status: TaskStatus::Todo,
            position: 2_000,
        }));
        assert_eq!(updates.len(), 4);
    }

    #[test]
    fn updates_are_bounded_by_the_two_affected_columns() {
        let mut entries = Vec::new();
        for status in [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done] {
            for i in 0..4 {
                entries.push(entry(Uuid::new_v4(), status, slot(i)));
            }
        }
        let moved = entries[0].id;
        let mut board = Board::from_tasks(entries);

        let updates = board.plan_move(moved, TaskStatus::InProgress, 2).unwrap();

        // n + m bound, and the third column never appears.
        assert!(updates.len() <= 8);
        assert!(updates.iter().all(|u| u.status != TaskStatus::Done));
    }

    #[test]
    fn destination_index_is_clamped_to_the_column_length() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut board = Board::from_tasks(vec![
            entry(a, TaskStatus::Todo, 1_000),
            entry(b, TaskStatus::InProgress, 1_000),
        ]);

        let updates = board.plan_move(a, TaskStatus::InProgress, 99).unwrap();

        assert_eq!(column_ids(&board, TaskStatus::InProgress), vec![b, a]);
        assert!(updates.contains(&PositionUpdate {
            id: a,
            status: TaskStatus::InProgress,
            position: 2_000,
        }));
    }

    #[test]
    fn sorting_by_position_reproduces_the_visible_order_after_many_moves() {
        let ids: Vec<Uuid> = (0..6).map(|_| Uuid::new_v4()).collect();
        let mut board = Board::from_tasks(
            ids.iter()
                .enumerate()
                .map(|(i, id)| entry(*id, TaskStatus::Backlog, slot(i))),
        );

        board.plan_move(ids[5], TaskStatus::Todo, 0).unwrap();
        board.plan_move(ids[0], TaskStatus::Todo, 1).unwrap();
        board.plan_move(ids[3], TaskStatus::Backlog, 0).unwrap();
        board.plan_move(ids[5], TaskStatus::Backlog, 2).unwrap();

        for status in [TaskStatus::Backlog, TaskStatus::Todo] {
            let column = board.column(status);
            let mut sorted = column.to_vec();
            sorted.sort_by_key(|e| e.position);
            assert_eq!(
                sorted.iter().map(|e| e.id).collect::<Vec<_>>(),
                column.iter().map(|e| e.id).collect::<Vec<_>>(),
            );
        }
    }

    #[test]
    fn moving_an_unknown_task_is_an_error() {
        let mut board = Board::from_tasks(vec![]);
        let ghost = Uuid::new_v4();
        assert_eq!(
            board.plan_move(ghost, TaskStatus::Todo, 0),
            Err(MoveError::TaskNotFound(ghost))
        );
    }
}
