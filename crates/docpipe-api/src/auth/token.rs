//! JWT issuing and verification.
//!
//! The same HS256 key authenticates inbound requests and signs the
//! caller-scoped bearer token attached to outbound analysis submissions.

use chrono::Utc;
use docpipe_core::models::{Caller, UserRole};
use docpipe_core::AppError;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: Uuid, // user_id
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub exp: i64, // expiration timestamp
    pub iat: i64, // issued at timestamp
}

/// Sign a token carrying the caller's identity.
pub fn issue_token(caller: &Caller, secret: &str, expiry_hours: i64) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: caller.user_id,
        email: caller.email.clone(),
        name: caller.name.clone(),
        role: caller.role,
        exp: (now + chrono::Duration::hours(expiry_hours)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
}

/// Verify a token's signature and expiry, returning the caller it names.
pub fn verify_token(token: &str, secret: &str) -> Result<Caller, AppError> {
    let data = decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

    Ok(Caller {
        user_id: data.claims.sub,
        email: data.claims.email,
        name: data.claims.name,
        role: data.claims.role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller() -> Caller {
        Caller {
            user_id: Uuid::new_v4(),
            email: "editor@example.com".to_string(),
            name: "Editor".to_string(),
            role: UserRole::Editor,
        }
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let caller = caller();
        let token = issue_token(&caller, "secret", 24).unwrap();
        let verified = verify_token(&token, "secret").unwrap();
        assert_eq!(verified.user_id, caller.user_id);
        assert_eq!(verified.role, caller.role);
        assert_eq!(verified.email, caller.email);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_token(&caller(), "secret", 24).unwrap();
        let err = verify_token(&token, "other-secret").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = issue_token(&caller(), "secret", -1).unwrap();
        let err = verify_token(&token, "secret").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
