use serde::Serialize;
use serde_json::Value;

/// Body of the EmailJS send call.
#[derive(Debug, Clone, Serialize)]
pub struct SendEmailRequest {
    pub service_id: String,
    pub template_id: String,
    /// EmailJS public key.
    pub user_id: String,
    #[serde(rename = "accessToken", skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    pub template_params: Value,
}
