use serde::{Deserialize, Serialize};

/// Envelope for successful responses: `{"data": ...}`. Failures are
/// rendered as `{"error": "..."}` with a non-2xx status by the server's
/// error type.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}
