//! API types shared between the server and its clients.
//!
//! This crate contains:
//! - Row types (e.g., `Workspace`, `Task`) - the API representation of database entities
//! - Request types (e.g., `CreateTaskRequest`, `UpdateMemberRoleRequest`) - API input types
//! - Shared enums (e.g., `TaskStatus`, `MemberRole`)

pub mod analytics;
pub mod member;
pub mod project;
pub mod response;
pub mod task;
pub mod user;
pub mod workspace;

pub use analytics::*;
pub use member::*;
pub use project::*;
pub use response::*;
pub use task::*;
pub use user::*;
pub use workspace::*;
