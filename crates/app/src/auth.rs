use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::problem::ProblemResponse;
use crate::router::AppState;

const BEARER_PREFIX: &str = "Bearer ";

/// Verifies HS256 bearer tokens. Issuing tokens happens elsewhere.
#[derive(Clone)]
pub struct TokenValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|err| TokenError::Invalid(err.to_string()))?;
        Ok(data.claims)
    }
}

/// Claims carried by access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Claims {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub exp: usize,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("missing bearer token")]
    Missing,
    #[error("invalid token: {0}")]
    Invalid(String),
}

/// Caller identity extracted from a valid `Authorization: Bearer` header.
///
/// Adding this extractor to a handler makes the route require a token.
#[derive(Debug, Clone)]
pub struct Identity(pub Claims);

#[axum::async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = ProblemResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(TokenError::Missing);
        let claims = token.and_then(|token| state.token_validator().validate(token));
        match claims {
            Ok(claims) => Ok(Identity(claims)),
            Err(err) => {
                info!(stage = "http", path = %parts.uri.path(), error = %err, "rejected request");
                Err(ProblemResponse::unauthorized(err.to_string()))
            }
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let prefix = value.get(..BEARER_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }
    let token = value[BEARER_PREFIX.len()..].trim();
    (!token.is_empty()).then_some(token)
}


#[cfg(test)]
mod tests {
    use super::test_tokens::{mint, valid, SECRET};
    use super::*;
    use axum::http::Request;
    use chrono::Duration;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/v1/accounts");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).expect("request").into_parts().0
    }

    #[test]
    fn accepts_valid_token() {
        let validator = TokenValidator::new(SECRET);
        let claims = validator.validate(&valid()).expect("valid token");
        assert_eq!(claims.id, "100");
        assert_eq!(claims.name, "tester");
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let validator = TokenValidator::new(SECRET);
        let forged = mint(b"other-secret", Duration::hours(1));
        assert!(matches!(validator.validate(&forged), Err(TokenError::Invalid(_))));

        let expired = mint(SECRET, Duration::hours(-2));
        assert!(matches!(validator.validate(&expired), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn bearer_prefix_is_case_insensitive() {
        let token = valid();
        let header = format!("bearer {token}");
        let parts = parts_with(Some(&header));
        assert_eq!(bearer_token(&parts), Some(token.as_str()));
    }

    #[test]
    fn missing_or_foreign_schemes_yield_no_token() {
        assert_eq!(bearer_token(&parts_with(None)), None);
        assert_eq!(bearer_token(&parts_with(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer   "))), None);
    }
}
