use anyhow::Result;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT Claims - data stored in the token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,     // Subject (account_id as string)
    pub account_id: Uuid, // Account UUID
    pub email: String,   // Email (for logging/debugging)
    pub is_admin: bool,  // Admin flag
    pub exp: i64,        // Expiration timestamp
    pub iat: i64,        // Issued at timestamp
    pub iss: String,     // Issuer
    pub jti: String,     // JWT ID (unique token identifier)
}

/// JWT Service - creates and verifies JWT tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl JwtService {
    /// Create new JWT service with secret and issuer
    pub fn new(secret: &str, issuer: String) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
        }
    }

    /// Create a new JWT token for an account
    ///
    /// Token expires after 24 hours
    pub fn create_token(&self, account_id: Uuid, email: String, is_admin: bool) -> Result<String> {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::hours(24);

        let claims = Claims {
            sub: account_id.to_string(),
            account_id,
            email,
            is_admin,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            jti: Uuid::new_v4().to_string(), // Unique token ID
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(Into::into)
    }

    /// Verify and decode a JWT token
    ///
    /// Returns claims if token is valid and not expired
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_valid_token() {
        let service = JwtService::new("test_secret", "test_issuer".to_string());
        let account_id = Uuid::new_v4();
        let token = service
            .create_token(account_id, "a@b.com".to_string(), true)
            .unwrap();

        let claims = service.verify_token(&token).unwrap();
        assert_eq!(claims.account_id, account_id);
        assert_eq!(claims.email, "a@b.com");
        assert!(claims.is_admin);
        assert_eq!(claims.iss, "test_issuer");
    }

    #[test]
    fn rejects_wrong_secret() {
        let service = JwtService::new("test_secret", "test_issuer".to_string());
        let other = JwtService::new("other_secret", "test_issuer".to_string());
        let token = service
            .create_token(Uuid::new_v4(), "a@b.com".to_string(), false)
            .unwrap();
        assert!(other.verify_token(&token).is_err());
    }

    #[test]
    fn rejects_wrong_issuer() {
        let service = JwtService::new("test_secret", "test_issuer".to_string());
        let other = JwtService::new("test_secret", "other_issuer".to_string());
        let token = service
            .create_token(Uuid::new_v4(), "a@b.com".to_string(), false)
            .unwrap();
        assert!(other.verify_token(&token).is_err());
    }

    #[test]
    fn rejects_garbage_token() {
        let service = JwtService::new("test_secret", "test_issuer".to_string());
        assert!(service.verify_token("not_a_token").is_err());
    }
}
