//! WhatsApp channel adapter backed by the Twilio Messages API.

use async_trait::async_trait;
use serde_json::Value;
use twilio::{TwilioOptions, TwilioService};

use super::{ProviderAdapter, SendError, SendOutcome};
use crate::config::TwilioConfig;
use crate::kernel::jobs::{Channel, SendRequest};

pub struct TwilioWhatsAppAdapter {
    service: TwilioService,
}

impl TwilioWhatsAppAdapter {
    pub fn new(config: &TwilioConfig) -> Self {
        Self {
            service: TwilioService::new(TwilioOptions {
                account_sid: config.account_sid.clone(),
                auth_token: config.auth_token.clone(),
                from_number: config.from_number.clone(),
            }),
        }
    }
}

#[async_trait]
impl ProviderAdapter for TwilioWhatsAppAdapter {
    fn channel(&self) -> Channel {
        Channel::WhatsApp
    }

    async fn send(&self, request: &SendRequest) -> Result<SendOutcome, SendError> {
        if request.channel != Channel::WhatsApp {
            return Err(SendError::Validation(format!(
                "whatsapp adapter cannot send {} messages",
                request.channel
            )));
        }

        // E.164, with or without the channel prefix the API expects.
        let number = request.to.strip_prefix("whatsapp:").unwrap_or(&request.to);
        if !number.starts_with('+') {
            return Err(SendError::Validation(format!(
                "malformed whatsapp recipient, expected E.164: {}",
                request.to
            )));
        }

        match self.service.send_whatsapp(number, &request.body).await {
            Ok(response) => {
                let provider_id = Some(response.sid.clone());
                let raw_response = serde_json::to_value(&response).unwrap_or(Value::Null);
                Ok(SendOutcome {
                    provider_id,
                    raw_response,
                })
            }
            Err(e) => Err(SendError::Transient(e.to_string())),
        }
    }
}
