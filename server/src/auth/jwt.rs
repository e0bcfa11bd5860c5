//! HS256 access tokens.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// The caller's user id.
    pub sub: Uuid,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiry_mins: i64,
}

pub fn generate_token(
    user_id: Uuid,
    role: &str,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        iat: now,
        exp: now + config.expiry_mins * 60,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Checks signature and expiry.
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(expiry_mins: i64) -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            expiry_mins,
        }
    }

    #[test]
    fn test_token_round_trip() {
        let user = Uuid::new_v4();
        let token = generate_token(user, ROLE_ADMIN, &config(60)).unwrap();
        let claims = validate_token(&token, &config(60)).unwrap();

        assert_eq!(claims.sub, user);
        assert_eq!(claims.role, ROLE_ADMIN);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        // Well past the default validation leeway.
        let token = generate_token(Uuid::new_v4(), ROLE_USER, &config(-120)).unwrap();
        assert!(validate_token(&token, &config(60)).is_err());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = generate_token(Uuid::new_v4(), ROLE_USER, &config(60)).unwrap();
        let other = JwtConfig {
            secret: "other".to_string(),
            expiry_mins: 60,
        };
        assert!(validate_token(&token, &other).is_err());
    }
}
