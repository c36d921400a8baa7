use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Shared secret for the trigger/retry endpoints. When unset, those
    /// endpoints accept unauthenticated calls (development only).
    pub automation_secret: Option<String>,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    /// Retry ceiling: a job is terminally failed once attempts reach this.
    pub max_attempts: u32,
    /// Base delay for quadratic backoff, in milliseconds.
    pub base_delay_ms: u64,
    /// Default (and maximum) number of due jobs per dispatch cycle.
    pub batch_limit: i64,
    /// Upper bound on one provider send call, in seconds.
    pub provider_timeout_secs: u64,
    pub emailjs: Option<EmailJsConfig>,
    pub twilio: Option<TwilioConfig>,
}

#[derive(Debug, Clone)]
pub struct EmailJsConfig {
    pub service_id: String,
    pub template_id: String,
    pub public_key: String,
    pub private_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            automation_secret: env::var("AUTOMATION_SECRET").ok(),
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "automation".to_string()),
            max_attempts: env::var("AUTOMATION_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("AUTOMATION_MAX_ATTEMPTS must be a valid number")?,
            base_delay_ms: env::var("AUTOMATION_BASE_DELAY_MS")
                .unwrap_or_else(|_| "30000".to_string())
                .parse()
                .context("AUTOMATION_BASE_DELAY_MS must be a valid number")?,
            batch_limit: env::var("AUTOMATION_BATCH_LIMIT")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("AUTOMATION_BATCH_LIMIT must be a valid number")?,
            provider_timeout_secs: env::var("PROVIDER_TIMEOUT_SECS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .context("PROVIDER_TIMEOUT_SECS must be a valid number")?,
            emailjs: Self::emailjs_from_env()?,
            twilio: Self::twilio_from_env()?,
        })
    }

    /// The email channel is configured only when the EmailJS variable group is
    /// present; a partially set group is a configuration error.
    fn emailjs_from_env() -> Result<Option<EmailJsConfig>> {
        match env::var("EMAILJS_SERVICE_ID") {
            Err(_) => Ok(None),
            Ok(service_id) => Ok(Some(EmailJsConfig {
                service_id,
                template_id: env::var("EMAILJS_TEMPLATE_ID")
                    .context("EMAILJS_TEMPLATE_ID must be set when EMAILJS_SERVICE_ID is")?,
                public_key: env::var("EMAILJS_PUBLIC_KEY")
                    .context("EMAILJS_PUBLIC_KEY must be set when EMAILJS_SERVICE_ID is")?,
                private_key: env::var("EMAILJS_PRIVATE_KEY").ok(),
            })),
        }
    }

    fn twilio_from_env() -> Result<Option<TwilioConfig>> {
        match env::var("TWILIO_ACCOUNT_SID") {
            Err(_) => Ok(None),
            Ok(account_sid) => Ok(Some(TwilioConfig {
                account_sid,
                auth_token: env::var("TWILIO_AUTH_TOKEN")
                    .context("TWILIO_AUTH_TOKEN must be set when TWILIO_ACCOUNT_SID is")?,
                from_number: env::var("TWILIO_WHATSAPP_FROM")
                    .context("TWILIO_WHATSAPP_FROM must be set when TWILIO_ACCOUNT_SID is")?,
            })),
        }
    }
}
