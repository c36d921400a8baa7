// Minimal EmailJS REST client.
// https://www.emailjs.com/docs/rest-api/send/

pub mod models;

use reqwest::Client;
use serde_json::{json, Value};

use crate::models::SendEmailRequest;

const SEND_URL: &str = "https://api.emailjs.com/api/v1.0/email/send";

#[derive(Debug, thiserror::Error)]
pub enum EmailJsError {
    #[error("request to EmailJS failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("EmailJS returned {status}: {body}")]
    Api { status: u16, body: String },
}

#[derive(Debug, Clone)]
pub struct EmailJsOptions {
    pub service_id: String,
    /// Default template used when the caller does not specify one.
    pub template_id: String,
    pub public_key: String,
    /// Required by EmailJS for server-side (non-browser) calls.
    pub private_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EmailJsService {
    options: EmailJsOptions,
    client: Client,
}

impl EmailJsService {
    pub fn new(options: EmailJsOptions) -> Self {
        Self {
            options,
            client: Client::new(),
        }
    }

    pub fn default_template_id(&self) -> &str {
        &self.options.template_id
    }

    /// Send one email through an EmailJS template.
    ///
    /// `template_params` is the flat map the template interpolates; on success
    /// the API answers with a bare "OK" body, echoed back as the raw response.
    pub async fn send(
        &self,
        template_id: &str,
        template_params: Value,
    ) -> Result<Value, EmailJsError> {
        let request = SendEmailRequest {
            service_id: self.options.service_id.clone(),
            template_id: template_id.to_string(),
            user_id: self.options.public_key.clone(),
            access_token: self.options.private_key.clone(),
            template_params,
        };

        let response = self.client.post(SEND_URL).json(&request).send().await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(EmailJsError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(json!({ "status": status.as_u16(), "body": body }))
    }
}
