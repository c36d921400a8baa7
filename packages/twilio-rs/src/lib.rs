// Minimal Twilio Messages API client for the WhatsApp channel.
// https://www.twilio.com/docs/whatsapp/api

use std::collections::HashMap;

pub mod models;

use reqwest::Client;

use crate::models::MessageResponse;

#[derive(Debug, thiserror::Error)]
pub enum TwilioError {
    #[error("request to Twilio failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Twilio returned {status}: {body}")]
    Api { status: u16, body: String },
}

#[derive(Debug, Clone)]
pub struct TwilioOptions {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number in E.164 form, without the `whatsapp:` prefix.
    pub from_number: String,
}

#[derive(Debug, Clone)]
pub struct TwilioService {
    options: TwilioOptions,
    client: Client,
}

/// Prefix an E.164 number for the WhatsApp channel, e.g. `whatsapp:+15551234567`.
pub fn whatsapp_address(number: &str) -> String {
    if number.starts_with("whatsapp:") {
        number.to_string()
    } else {
        format!("whatsapp:{}", number)
    }
}

impl TwilioService {
    pub fn new(options: TwilioOptions) -> Self {
        Self {
            options,
            client: Client::new(),
        }
    }

    /// Send a WhatsApp message via the Messages API.
    ///
    /// `to` is the recipient number in E.164 form; the `whatsapp:` channel
    /// prefix is added here for both parties.
    pub async fn send_whatsapp(
        &self,
        to: &str,
        body: &str,
    ) -> Result<MessageResponse, TwilioError> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.options.account_sid
        );

        let mut form_body: HashMap<&str, String> = HashMap::new();
        form_body.insert("From", whatsapp_address(&self.options.from_number));
        form_body.insert("To", whatsapp_address(to));
        form_body.insert("Body", body.to_string());

        let response = self
            .client
            .post(url)
            .basic_auth(
                &self.options.account_sid,
                Some(&self.options.auth_token),
            )
            .form(&form_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TwilioError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<MessageResponse>().await?)
    }
}
