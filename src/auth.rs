//! Caller identity extraction.
//!
//! Identity is minted by an external provider; this service treats the
//! bearer token as an opaque token identifier and resolves it against
//! the `users` index wherever an operation needs an account. Handlers
//! receive identity as an explicit value so the services stay testable
//! without a live provider.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use std::convert::Infallible;

/// The caller as asserted by the identity provider.
#[derive(Clone, Debug)]
pub struct Identity {
    /// Opaque token identifier from the `Authorization: Bearer` header.
    pub token_identifier: String,
}

/// Optional-identity extractor.
///
/// Never rejects: operations that require authentication report the
/// unauthenticated error themselves, with an operation-specific
/// message, and public operations ignore the value entirely.
pub struct MaybeIdentity(pub Option<Identity>);

impl<S> FromRequestParts<S> for MaybeIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(bearer_identity(&parts.headers)))
    }
}

fn bearer_identity(headers: &HeaderMap) -> Option<Identity> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(Identity {
        token_identifier: token.to_string(),
    })
}
