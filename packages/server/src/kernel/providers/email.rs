//! Email channel adapter backed by EmailJS.

use async_trait::async_trait;
use emailjs::{EmailJsOptions, EmailJsService};
use serde_json::{Map, Value};

use super::{ProviderAdapter, SendError, SendOutcome};
use crate::config::EmailJsConfig;
use crate::kernel::jobs::{Channel, SendRequest};

pub struct EmailJsAdapter {
    service: EmailJsService,
}

impl EmailJsAdapter {
    pub fn new(config: &EmailJsConfig) -> Self {
        Self {
            service: EmailJsService::new(EmailJsOptions {
                service_id: config.service_id.clone(),
                template_id: config.template_id.clone(),
                public_key: config.public_key.clone(),
                private_key: config.private_key.clone(),
            }),
        }
    }

    /// Template parameters: the standard recipient/subject/message trio,
    /// overlaid with any caller-supplied params.
    fn template_params(request: &SendRequest) -> Value {
        let mut params = Map::new();
        params.insert("to_email".to_string(), Value::String(request.to.clone()));
        params.insert(
            "subject".to_string(),
            Value::String(request.subject.clone().unwrap_or_default()),
        );
        params.insert("message".to_string(), Value::String(request.body.clone()));
        if let Some(Value::Object(extra)) = &request.template_params {
            for (key, value) in extra {
                params.insert(key.clone(), value.clone());
            }
        }
        Value::Object(params)
    }
}

#[async_trait]
impl ProviderAdapter for EmailJsAdapter {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn send(&self, request: &SendRequest) -> Result<SendOutcome, SendError> {
        if request.channel != Channel::Email {
            return Err(SendError::Validation(format!(
                "email adapter cannot send {} messages",
                request.channel
            )));
        }
        if !request.to.contains('@') {
            return Err(SendError::Validation(format!(
                "malformed email recipient: {}",
                request.to
            )));
        }

        let template_id = request
            .template_id
            .as_deref()
            .unwrap_or_else(|| self.service.default_template_id());

        match self
            .service
            .send(template_id, Self::template_params(request))
            .await
        {
            // EmailJS returns no message id, only an OK body.
            Ok(raw_response) => Ok(SendOutcome {
                provider_id: None,
                raw_response,
            }),
            Err(e) => Err(SendError::Transient(e.to_string())),
        }
    }
}
