//! Auth Gateway
//!
//! Validates bearer tokens before any weather use case runs: signature via
//! the signing key source, then issuer and expiry, then a chain of claim
//! validators (the audience check lives there).

use crate::domain::ports::{AuthError, AuthStage, SigningKeySource};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::Validation;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Allowed clock skew for `exp` and `nbf`, in seconds.
pub const DEFAULT_LEEWAY_SECS: u64 = 60;

/// `aud` may be a single string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Audience::Single(aud) => aud == audience,
            Audience::Many(auds) => auds.iter().any(|aud| aud == audience),
        }
    }
}

/// Claims the relay reads from a validated token.
///
/// `iss` and `exp` are optional here so that a token lacking them fails
/// the required-claim check rather than deserialization. After a
/// successful `authorize` both are always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub aud: Option<Audience>,
    #[serde(default)]
    pub exp: Option<u64>,
}

/// A check run against claims that already passed signature, issuer and
/// expiry validation.
pub trait ClaimsValidator: Send + Sync {
    fn validate(&self, claims: &Claims) -> Result<(), AuthError>;
}

/// Requires the configured audience to appear in `aud`.
#[derive(Debug, Clone)]
pub struct AudienceValidator {
    expected: String,
}

impl AudienceValidator {
    pub fn new(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
        }
    }
}

impl ClaimsValidator for AudienceValidator {
    fn validate(&self, claims: &Claims) -> Result<(), AuthError> {
        match &claims.aud {
            Some(aud) if aud.contains(&self.expected) => Ok(()),
            _ => Err(AuthError::InvalidAudience {
                expected: self.expected.clone(),
            }),
        }
    }
}

/// Bearer token gate in front of the weather API.
pub struct AuthGateway {
    issuer: String,
    keys: Arc<dyn SigningKeySource>,
    validators: Vec<Box<dyn ClaimsValidator>>,
    leeway_secs: u64,
}

impl AuthGateway {
    /// Gateway trusting `issuer` with an empty validator chain.
    pub fn new(issuer: impl Into<String>, keys: Arc<dyn SigningKeySource>) -> Self {
        Self {
            issuer: issuer.into(),
            keys,
            validators: Vec::new(),
            leeway_secs: DEFAULT_LEEWAY_SECS,
        }
    }

    /// Gateway trusting `issuer` that also requires `audience`.
    pub fn for_audience(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        keys: Arc<dyn SigningKeySource>,
    ) -> Self {
        Self::new(issuer, keys).with_validator(AudienceValidator::new(audience))
    }

    /// Append a validator to the chain. Validators run in insertion order.
    pub fn with_validator(mut self, validator: impl ClaimsValidator + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    /// Extract the token from an `Authorization` header value.
    pub fn bearer_token(authorization: Option<&str>) -> Result<&str, AuthError> {
        let value = authorization.ok_or(AuthError::MissingToken)?;
        let (scheme, token) = value
            .trim()
            .split_once(' ')
            .ok_or(AuthError::MalformedHeader)?;

        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err(AuthError::MalformedHeader);
        }

        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MalformedHeader);
        }
        Ok(token)
    }

    /// Validate the bearer credential in `authorization` and return its claims.
    pub async fn authorize(&self, authorization: Option<&str>) -> Result<Claims, AuthError> {
        match self.check(authorization).await {
            Ok(claims) => {
                tracing::debug!(
                    "token {} for subject {}",
                    AuthStage::Authorized,
                    claims.sub.as_deref().unwrap_or("<none>")
                );
                Ok(claims)
            }
            Err(e) => {
                tracing::warn!("token rejected after stage {}: {}", e.reached_stage(), e);
                Err(e)
            }
        }
    }

    async fn check(&self, authorization: Option<&str>) -> Result<Claims, AuthError> {
        let token = Self::bearer_token(authorization)?;

        let header = jsonwebtoken::decode_header(token).map_err(AuthError::Malformed)?;
        let key = self.keys.decoding_key(header.kid.as_deref()).await?;

        let validation = self.validation(header.alg);
        let claims = jsonwebtoken::decode::<Claims>(token, &key, &validation)
            .map_err(classify)?
            .claims;

        for validator in &self.validators {
            validator.validate(&claims)?;
        }
        Ok(claims)
    }

    fn validation(&self, alg: jsonwebtoken::Algorithm) -> Validation {
        let mut validation = Validation::new(alg);
        validation.leeway = self.leeway_secs;
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "iss"]);

        // Issuers are commonly configured with or without the trailing slash
        let trimmed = self.issuer.trim_end_matches('/');
        let with_slash = format!("{}/", trimmed);
        validation.set_issuer(&[trimmed, with_slash.as_str()]);
        validation
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => AuthError::Malformed(err),
        ErrorKind::MissingRequiredClaim(_)
        | ErrorKind::ImmatureSignature
        | ErrorKind::InvalidAudience
        | ErrorKind::InvalidSubject => AuthError::InvalidClaims(err),
        _ => AuthError::InvalidSignature(err),
    }
}
