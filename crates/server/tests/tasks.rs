mod common;

use axum::{Router, http::StatusCode};
use common::{
    app, bare_request, create_project, create_task, create_workspace, json_request, own_member_id,
    read_json, register, send,
};
use serde_json::{Value, json};

struct Fixture {
    app: Router,
    cookie: String,
    workspace_id: String,
    project_id: String,
    member_id: String,
}

async fn fixture() -> Fixture {
    let (app, _pool) = app().await;
    let cookie = register(&app, "Ada", "ada@example.com").await;
    let workspace = create_workspace(&app, &cookie, "Acme").await;
    let workspace_id = workspace["id"].as_str().unwrap().to_string();
    let project = create_project(&app, &cookie, &workspace_id, "Launch").await;
    let project_id = project["id"].as_str().unwrap().to_string();
    let member_id = own_member_id(&app, &cookie, &workspace_id, "ada@example.com").await;
    Fixture {
        app,
        cookie,
        workspace_id,
        project_id,
        member_id,
    }
}

impl Fixture {
    fn task_body(&self, name: &str, status: &str) -> Value {
        json!({
            "name": name,
            "status": status,
            "workspace_id": self.workspace_id,
            "project_id": self.project_id,
            "assignee_id": self.member_id,
            "due_date": "2026-09-01T00:00:00Z",
        })
    }

    /// Column contents in on-screen order: position ascending.
    async fn column(&self, status: &str) -> Vec<Value> {
        let response = send(
            &self.app,
            bare_request(
                "GET",
                &format!(
                    "/api/tasks?workspace_id={}&status={status}",
                    self.workspace_id
                ),
                Some(&self.cookie),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let mut tasks = read_json(response).await["data"].as_array().unwrap().clone();
        tasks.sort_by_key(|task| task["position"].as_i64().unwrap());
        tasks
    }

    /// Pins explicit positions so follow-up assertions are deterministic.
    async fn pin_positions(&self, updates: Value) {
        let response = send(
            &self.app,
            json_request(
                "POST",
                "/api/tasks/bulk-update",
                Some(&self.cookie),
                json!({ "updates": updates }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    async fn move_task(&self, task_id: &str, status: &str, index: usize) {
        let response = send(
            &self.app,
            json_request(
                "POST",
                &format!("/api/tasks/{task_id}/move"),
                Some(&self.cookie),
                json!({ "status": status, "index": index }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn new_tasks_are_placed_one_step_above_the_column_minimum() {
    let fx = fixture().await;

    let first = create_task(&fx.app, &fx.cookie, fx.task_body("first", "TODO")).await;
    assert_eq!(first["position"], 1000);

    let second = create_task(&fx.app, &fx.cookie, fx.task_body("second", "TODO")).await;
    assert_eq!(second["position"], 2000);

    // The column minimum is still 1000, so the formula lands here too.
    let third = create_task(&fx.app, &fx.cookie, fx.task_body("third", "TODO")).await;
    assert_eq!(third["position"], 2000);

    // Other columns start fresh.
    let elsewhere = create_task(&fx.app, &fx.cookie, fx.task_body("other", "DONE")).await;
    assert_eq!(elsewhere["position"], 1000);
}

#[tokio::test]
async fn filters_combine_conjunctively() {
    let fx = fixture().await;
    let other_project = create_project(&fx.app, &fx.cookie, &fx.workspace_id, "Ops").await;
    let other_project_id = other_project["id"].as_str().unwrap();

    create_task(&fx.app, &fx.cookie, fx.task_body("write docs", "TODO")).await;
    create_task(&fx.app, &fx.cookie, fx.task_body("write tests", "IN_PROGRESS")).await;
    let mut foreign = fx.task_body("deploy", "TODO");
    foreign["project_id"] = json!(other_project_id);
    create_task(&fx.app, &fx.cookie, foreign).await;

    let response = send(
        &fx.app,
        bare_request(
            "GET",
            &format!(
                "/api/tasks?workspace_id={}&project_id={}",
                fx.workspace_id, fx.project_id
            ),
            Some(&fx.cookie),
        ),
    )
    .await;
    let body = read_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let response = send(
        &fx.app,
        bare_request(
            "GET",
            &format!(
                "/api/tasks?workspace_id={}&project_id={}&status=TODO",
                fx.workspace_id, fx.project_id
            ),
            Some(&fx.cookie),
        ),
    )
    .await;
    let body = read_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["name"], "write docs");

    let response = send(
        &fx.app,
        bare_request(
            "GET",
            &format!("/api/tasks?workspace_id={}&search=write", fx.workspace_id),
            Some(&fx.cookie),
        ),
    )
    .await;
    let body = read_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn enrichment_matches_independent_fetches() {
    let fx = fixture().await;
    let task = create_task(&fx.app, &fx.cookie, fx.task_body("write docs", "TODO")).await;
    let task_id = task["id"].as_str().unwrap();

    let response = send(
        &fx.app,
        bare_request("GET", &format!("/api/tasks/{task_id}"), Some(&fx.cookie)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let enriched = read_json(response).await["data"].clone();

    let response = send(
        &fx.app,
        bare_request(
            "GET",
            &format!("/api/projects/{}", fx.project_id),
            Some(&fx.cookie),
        ),
    )
    .await;
    let project = read_json(response).await["data"].clone();

    assert_eq!(enriched["project"], project);
    assert_eq!(enriched["assignee"]["id"].as_str().unwrap(), fx.member_id);
    assert_eq!(enriched["assignee"]["email"], "ada@example.com");
    assert_eq!(enriched["assignee"]["name"], "Ada");
}

#[tokio::test]
async fn partial_updates_leave_other_fields_alone() {
    let fx = fixture().await;
    let task = create_task(&fx.app, &fx.cookie, fx.task_body("write docs", "TODO")).await;
    let task_id = task["id"].as_str().unwrap();

    let response = send(
        &fx.app,
        json_request(
            "PATCH",
            &format!("/api/tasks/{task_id}"),
            Some(&fx.cookie),
            json!({ "name": "write better docs" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = read_json(response).await["data"].clone();
    assert_eq!(updated["name"], "write better docs");
    assert_eq!(updated["status"], "TODO");
    assert_eq!(updated["position"], task["position"]);
}

#[tokio::test]
async fn deleted_tasks_are_gone() {
    let fx = fixture().await;
    let task = create_task(&fx.app, &fx.cookie, fx.task_body("ephemeral", "TODO")).await;
    let task_id = task["id"].as_str().unwrap();

    let response = send(
        &fx.app,
        bare_request("DELETE", &format!("/api/tasks/{task_id}"), Some(&fx.cookie)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &fx.app,
        bare_request("GET", &format!("/api/tasks/{task_id}"), Some(&fx.cookie)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn task_listing_requires_membership() {
    let fx = fixture().await;
    let outsider = register(&fx.app, "Grace", "grace@example.com").await;

    let response = send(
        &fx.app,
        bare_request(
            "GET",
            &format!("/api/tasks?workspace_id={}", fx.workspace_id),
            Some(&outsider),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn moving_within_a_column_keeps_position_order_in_sync_with_the_screen() {
    let fx = fixture().await;
    let a = create_task(&fx.app, &fx.cookie, fx.task_body("a", "TODO")).await;
    let b = create_task(&fx.app, &fx.cookie, fx.task_body("b", "TODO")).await;
    let c = create_task(&fx.app, &fx.cookie, fx.task_body("c", "TODO")).await;
    fx.pin_positions(json!([
        { "id": a["id"], "status": "TODO", "position": 1000 },
        { "id": b["id"], "status": "TODO", "position": 2000 },
        { "id": c["id"], "status": "TODO", "position": 3000 },
    ]))
    .await;

    // Drag "a" to the bottom.
    fx.move_task(a["id"].as_str().unwrap(), "TODO", 2).await;
    let column = fx.column("TODO").await;
    let names: Vec<_> = column.iter().map(|t| t["name"].clone()).collect();
    assert_eq!(names, vec![json!("b"), json!("c"), json!("a")]);

    // Drag "c" to the top.
    fx.move_task(c["id"].as_str().unwrap(), "TODO", 0).await;
    let column = fx.column("TODO").await;
    let names: Vec<_> = column.iter().map(|t| t["name"].clone()).collect();
    assert_eq!(names, vec![json!("c"), json!("b"), json!("a")]);

    // Positions land on exact slot steps.
    let positions: Vec<_> = column
        .iter()
        .map(|t| t["position"].as_i64().unwrap())
        .collect();
    assert_eq!(positions, vec![1000, 2000, 3000]);
}

#[tokio::test]
async fn cross_column_moves_update_both_columns_and_change_status() {
    let fx = fixture().await;
    let a = create_task(&fx.app, &fx.cookie, fx.task_body("a", "TODO")).await;
    let b = create_task(&fx.app, &fx.cookie, fx.task_body("b", "TODO")).await;
    let busy = create_task(&fx.app, &fx.cookie, fx.task_body("busy", "IN_PROGRESS")).await;
    fx.pin_positions(json!([
        { "id": a["id"], "status": "TODO", "position": 1000 },
        { "id": b["id"], "status": "TODO", "position": 2000 },
        { "id": busy["id"], "status": "IN_PROGRESS", "position": 1000 },
    ]))
    .await;

    let response = send(
        &fx.app,
        json_request(
            "POST",
            &format!("/api/tasks/{}/move", a["id"].as_str().unwrap()),
            Some(&fx.cookie),
            json!({ "status": "IN_PROGRESS", "index": 0 }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let moved = read_json(response).await["data"].clone();
    assert_eq!(moved["status"], "IN_PROGRESS");
    assert_eq!(moved["position"], 1000);

    let in_progress = fx.column("IN_PROGRESS").await;
    let names: Vec<_> = in_progress.iter().map(|t| t["name"].clone()).collect();
    assert_eq!(names, vec![json!("a"), json!("busy")]);

    // Source column closed the gap behind the moved task.
    let todo = fx.column("TODO").await;
    assert_eq!(todo.len(), 1);
    assert_eq!(todo[0]["name"], "b");
    assert_eq!(todo[0]["position"], 1000);
}

#[tokio::test]
async fn bulk_updates_are_atomic_and_stay_inside_one_workspace() {
    let fx = fixture().await;
    let ours = create_task(&fx.app, &fx.cookie, fx.task_body("ours", "TODO")).await;

    // A second workspace owned by the same user, with its own task.
    let other_workspace = create_workspace(&fx.app, &fx.cookie, "Side project").await;
    let other_workspace_id = other_workspace["id"].as_str().unwrap();
    let other_project = create_project(&fx.app, &fx.cookie, other_workspace_id, "Infra").await;
    let other_member =
        own_member_id(&fx.app, &fx.cookie, other_workspace_id, "ada@example.com").await;
    let foreign = create_task(
        &fx.app,
        &fx.cookie,
        json!({
            "name": "foreign",
            "status": "TODO",
            "workspace_id": other_workspace_id,
            "project_id": other_project["id"].as_str().unwrap(),
            "assignee_id": other_member,
            "due_date": "2026-09-01T00:00:00Z",
        }),
    )
    .await;

    let response = send(
        &fx.app,
        json_request(
            "POST",
            "/api/tasks/bulk-update",
            Some(&fx.cookie),
            json!({
                "updates": [
                    { "id": ours["id"], "status": "DONE", "position": 5000 },
                    { "id": foreign["id"], "status": "DONE", "position": 5000 },
                ]
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        read_json(response).await["error"],
        "all tasks must belong to the same workspace"
    );

    // The first update rolled back with the rest of the batch.
    let response = send(
        &fx.app,
        bare_request(
            "GET",
            &format!("/api/tasks/{}", ours["id"].as_str().unwrap()),
            Some(&fx.cookie),
        ),
    )
    .await;
    let body = read_json(response).await;
    assert_eq!(body["data"]["status"], "TODO");
    assert_eq!(body["data"]["position"], 1000);
}

#[tokio::test]
async fn bulk_update_applies_the_whole_batch() {
    let fx = fixture().await;
    let a = create_task(&fx.app, &fx.cookie, fx.task_body("a", "TODO")).await;
    let b = create_task(&fx.app, &fx.cookie, fx.task_body("b", "TODO")).await;

    let response = send(
        &fx.app,
        json_request(
            "POST",
            "/api/tasks/bulk-update",
            Some(&fx.cookie),
            json!({
                "updates": [
                    { "id": a["id"], "status": "IN_REVIEW", "position": 1000 },
                    { "id": b["id"], "status": "IN_REVIEW", "position": 2000 },
                ]
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = read_json(response).await["data"].clone();
    assert_eq!(updated.as_array().unwrap().len(), 2);

    let review = fx.column("IN_REVIEW").await;
    let names: Vec<_> = review.iter().map(|t| t["name"].clone()).collect();
    assert_eq!(names, vec![json!("a"), json!("b")]);
}
