//! Signing Key Source Port
//!
//! Defines the interface for resolving the keys that bearer tokens are
//! verified against, plus the errors raised while authorizing a request.

use async_trait::async_trait;
use jsonwebtoken::DecodingKey;

/// Point in the authorization pipeline a request reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    /// No usable token extracted yet
    Unauthenticated,
    /// Token parsed and signature verified
    SignatureChecked,
    /// Issuer and expiry verified
    IssuerChecked,
    /// Every claims validator passed
    Authorized,
}

impl std::fmt::Display for AuthStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthStage::Unauthenticated => write!(f, "unauthenticated"),
            AuthStage::SignatureChecked => write!(f, "signature-checked"),
            AuthStage::IssuerChecked => write!(f, "issuer-checked"),
            AuthStage::Authorized => write!(f, "authorized"),
        }
    }
}

/// Reasons a bearer token is rejected.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no bearer token supplied")]
    MissingToken,
    #[error("authorization header is not a bearer credential")]
    MalformedHeader,
    #[error("token is not a well-formed JWT: {0}")]
    Malformed(#[source] jsonwebtoken::errors::Error),
    #[error("no signing key matches kid {0:?}")]
    UnknownSigningKey(Option<String>),
    #[error("signing keys unavailable: {0}")]
    KeySource(String),
    #[error("token signature rejected: {0}")]
    InvalidSignature(#[source] jsonwebtoken::errors::Error),
    #[error("token has expired")]
    Expired,
    #[error("token issuer is not trusted")]
    InvalidIssuer,
    #[error("token claims rejected: {0}")]
    InvalidClaims(#[source] jsonwebtoken::errors::Error),
    #[error("token audience does not include {expected}")]
    InvalidAudience { expected: String },
}

impl AuthError {
    /// Last stage the request completed before this error rejected it.
    pub fn reached_stage(&self) -> AuthStage {
        match self {
            AuthError::MissingToken
            | AuthError::MalformedHeader
            | AuthError::Malformed(_)
            | AuthError::UnknownSigningKey(_)
            | AuthError::KeySource(_)
            | AuthError::InvalidSignature(_) => AuthStage::Unauthenticated,
            AuthError::Expired | AuthError::InvalidIssuer | AuthError::InvalidClaims(_) => {
                AuthStage::SignatureChecked
            }
            AuthError::InvalidAudience { .. } => AuthStage::IssuerChecked,
        }
    }

    /// Whether the client sent any token at all.
    pub fn token_presented(&self) -> bool {
        !matches!(self, AuthError::MissingToken)
    }
}

/// Resolver for token verification keys.
///
/// This is an outbound port; the production adapter reads the issuer's
/// published JWKS, tests plug in a fixed key.
#[async_trait]
pub trait SigningKeySource: Send + Sync {
    /// Key matching the token header's `kid`.
    async fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey, AuthError>;
}
