//! Provider adapters: one per outbound channel, each wrapping exactly one
//! third-party transport. Adapters are constructed from explicit configuration
//! at startup; there is no ambient client state.

mod email;
mod whatsapp;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::Config;
use crate::kernel::jobs::{Channel, SendRequest};

pub use email::EmailJsAdapter;
pub use whatsapp::TwilioWhatsAppAdapter;

/// Normalized provider response.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    /// Provider-side message identifier, when the transport returns one.
    pub provider_id: Option<String>,
    /// Raw provider payload, persisted verbatim in the communication log.
    pub raw_response: Value,
}

/// How a send failed, which decides whether retrying can help.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SendError {
    /// Missing or unusable provider credentials. Retrying cannot succeed.
    #[error("configuration error: {0}")]
    Config(String),
    /// Malformed request (bad recipient, wrong channel). Retrying cannot succeed.
    #[error("validation error: {0}")]
    Validation(String),
    /// Provider or network failure that may succeed later.
    #[error("{0}")]
    Transient(String),
}

impl SendError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SendError::Transient(_))
    }
}

/// Uniform interface to one outbound channel.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn channel(&self) -> Channel;

    async fn send(&self, request: &SendRequest) -> Result<SendOutcome, SendError>;
}

/// Channel → adapter lookup. A channel whose credentials were never configured
/// has no adapter; resolving it is a configuration error, which the dispatcher
/// treats as immediately terminal.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    email: Option<Arc<dyn ProviderAdapter>>,
    whatsapp: Option<Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build adapters for every channel the configuration enables.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();
        if let Some(emailjs) = &config.emailjs {
            registry = registry.with_email(Arc::new(EmailJsAdapter::new(emailjs)));
        }
        if let Some(twilio) = &config.twilio {
            registry = registry.with_whatsapp(Arc::new(TwilioWhatsAppAdapter::new(twilio)));
        }
        registry
    }

    pub fn with_email(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.email = Some(adapter);
        self
    }

    pub fn with_whatsapp(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.whatsapp = Some(adapter);
        self
    }

    pub fn resolve(&self, channel: Channel) -> Result<&Arc<dyn ProviderAdapter>, SendError> {
        let slot = match channel {
            Channel::Email => &self.email,
            Channel::WhatsApp => &self.whatsapp,
        };
        slot.as_ref().ok_or_else(|| {
            SendError::Config(format!("{channel} provider credentials not configured"))
        })
    }
}
