//! Access token verification.
//!
//! Tokens are issued by the marketplace's authentication service and signed with a shared HS256 secret. The server
//! only ever verifies them. [`TokenIssuer`] exists so that tools and tests can mint tokens with the same secret.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header::HeaderValue, FromRequest, HttpMessage, HttpRequest};
use chrono::{Duration, Utc};
use farmstand_engine::{
    db_types::{Role, UserId},
    order_objects::Requester,
};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub id: UserId,
    pub role: Role,
    pub exp: i64,
}

impl JwtClaims {
    pub fn requester(&self) -> Requester {
        Requester::new(self.id, self.role)
    }
}

/// Handlers on authenticated routes can take `JwtClaims` as an argument. The claims are placed in the request
/// extensions by [`crate::middleware::AuthenticationMiddlewareFactory`].
impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<JwtClaims>().cloned().ok_or_else(|| {
            warn!("💻️ No JWT claims found in request extensions for {}", req.path());
            ServerError::AuthenticationError(AuthError::MissingCredentials)
        });
        ready(claims)
    }
}

#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        let key = DecodingKey::from_secret(config.jwt_secret.reveal().as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        Self { key, validation }
    }

    pub fn verify(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::ValidationError(e.to_string()),
        })?;
        let claims = data.claims;
        if !claims.id.is_well_formed() {
            return Err(AuthError::ValidationError(format!("Token carries an invalid user id: {}", claims.id.value())));
        }
        Ok(claims)
    }

    /// Verifies the token in an `Authorization: Bearer <token>` header.
    pub fn verify_header(&self, header: Option<&HeaderValue>) -> Result<JwtClaims, AuthError> {
        let token = header
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingCredentials)?;
        self.verify(token)
    }
}

pub struct TokenIssuer {
    key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self { key: EncodingKey::from_secret(config.jwt_secret.reveal().as_bytes()) }
    }

    /// Issue a new access token for the given user, valid for `duration`.
    pub fn issue_token(&self, id: UserId, role: Role, duration: Duration) -> Result<String, AuthError> {
        let claims = JwtClaims { id, role, exp: (Utc::now() + duration).timestamp() };
        encode(&Header::new(Algorithm::HS256), &claims, &self.key).map_err(|e| AuthError::ValidationError(e.to_string()))
    }
}
