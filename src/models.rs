use serde::{Deserialize, Serialize};

// Verification request body. The email field is kept as a raw JSON
// value so a missing field and a non-string field both surface as
// client input errors instead of a framework rejection.
#[derive(Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub email: Option<serde_json::Value>,
}

// Classification result, echoing the submitted email and extracted
// domain as-is
#[derive(Serialize)]
pub struct VerifyResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub email: String,
    pub domain: String,
    pub is_disposable: bool,
}

// Error envelope for 4xx responses
#[derive(Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: &'static str,
}

impl ErrorResponse {
    pub fn new(message: &'static str) -> Self {
        Self {
            status: "error",
            message,
        }
    }
}
