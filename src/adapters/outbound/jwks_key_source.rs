//! JWKS Key Source
//!
//! Implements SigningKeySource from the issuer's published key set, found
//! through OpenID discovery unless a JWKS URL is configured directly.

use crate::domain::ports::{AuthError, SigningKeySource};
use crate::infrastructure::clock::{Clock, SystemClock};
use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::DecodingKey;
use parking_lot::RwLock;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long a fetched key set is trusted.
pub const KEY_SET_TTL: Duration = Duration::from_secs(300);

/// Minimum spacing between fetch attempts, successful or not.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Past this age a key set is no longer served, even when the issuer is
/// unreachable.
pub const MAX_KEY_SET_AGE: Duration = Duration::from_secs(3600);

#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    issuer: String,
    jwks_uri: String,
}

#[derive(Clone)]
struct CachedKeys {
    keys: Arc<JwkSet>,
    fetched_at: Instant,
}

#[derive(Default)]
struct KeyState {
    cached: Option<CachedKeys>,
    /// Earliest instant the issuer may be contacted again
    next_attempt: Option<Instant>,
    /// Fetch attempts so far, used to detect a refresh that raced ours
    attempts: u64,
}

impl KeyState {
    fn may_refresh(&self, now: Instant) -> bool {
        self.next_attempt.map_or(true, |at| now >= at)
    }

    fn usable_keys(&self, now: Instant) -> Option<Arc<JwkSet>> {
        self.cached
            .as_ref()
            .filter(|c| now.saturating_duration_since(c.fetched_at) < MAX_KEY_SET_AGE)
            .map(|c| c.keys.clone())
    }
}

/// Key source backed by the issuer's JWKS endpoint.
pub struct JwksKeySource {
    client: reqwest::Client,
    issuer: String,
    jwks_uri: Option<String>,
    clock: Arc<dyn Clock>,
    state: RwLock<KeyState>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl JwksKeySource {
    /// Key source for `issuer`. When `jwks_uri` is set, discovery is skipped.
    pub fn new(issuer: String, jwks_uri: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            issuer,
            jwks_uri,
            clock: Arc::new(SystemClock),
            state: RwLock::new(KeyState::default()),
            refresh_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn discovery_url(&self) -> String {
        format!(
            "{}/.well-known/openid-configuration",
            self.issuer.trim_end_matches('/')
        )
    }

    fn same_issuer(a: &str, b: &str) -> bool {
        a.trim_end_matches('/') == b.trim_end_matches('/')
    }

    fn unavailable() -> AuthError {
        AuthError::KeySource("no usable signing keys, waiting to retry the issuer".to_string())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, AuthError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AuthError::KeySource(format!("request to {} failed: {}", url, e)))?;

        response
            .json::<T>()
            .await
            .map_err(|e| AuthError::KeySource(format!("invalid document at {}: {}", url, e)))
    }

    async fn resolve_jwks_uri(&self) -> Result<String, AuthError> {
        if let Some(uri) = &self.jwks_uri {
            return Ok(uri.clone());
        }

        let url = self.discovery_url();
        let doc: DiscoveryDocument = self.get_json(&url).await?;
        if !Self::same_issuer(&doc.issuer, &self.issuer) {
            return Err(AuthError::KeySource(format!(
                "discovery document names issuer {} but {} is configured",
                doc.issuer, self.issuer
            )));
        }
        Ok(doc.jwks_uri)
    }

    /// Fetch a new key set unless another caller attempted one since
    /// `seen_attempts` was read.
    async fn refresh(&self, seen_attempts: u64) -> Result<Arc<JwkSet>, AuthError> {
        let _guard = self.refresh_lock.lock().await;

        {
            let state = self.state.read();
            if state.attempts != seen_attempts {
                return state.usable_keys(self.clock.now()).ok_or_else(Self::unavailable);
            }
        }

        let fetched = async {
            let uri = self.resolve_jwks_uri().await?;
            self.get_json::<JwkSet>(&uri).await
        }
        .await;

        let now = self.clock.now();
        let mut state = self.state.write();
        state.attempts += 1;
        state.next_attempt = Some(now + MIN_REFRESH_INTERVAL);

        match fetched {
            Ok(set) => {
                tracing::info!("loaded {} signing keys for issuer {}", set.keys.len(), self.issuer);
                let keys = Arc::new(set);
                state.cached = Some(CachedKeys {
                    keys: keys.clone(),
                    fetched_at: now,
                });
                Ok(keys)
            }
            Err(e) => match state.usable_keys(now) {
                Some(keys) => {
                    tracing::warn!("signing key refresh failed, keeping previous set: {}", e);
                    Ok(keys)
                }
                None => {
                    tracing::error!("signing keys unavailable: {}", e);
                    Err(e)
                }
            },
        }
    }

    fn select(keys: &JwkSet, kid: Option<&str>) -> Result<DecodingKey, AuthError> {
        let jwk = match kid {
            Some(kid) => keys.find(kid),
            None if keys.keys.len() == 1 => keys.keys.first(),
            None => None,
        }
        .ok_or_else(|| AuthError::UnknownSigningKey(kid.map(str::to_string)))?;

        DecodingKey::from_jwk(jwk)
            .map_err(|e| AuthError::KeySource(format!("unusable signing key: {}", e)))
    }
}

#[async_trait]
impl SigningKeySource for JwksKeySource {
    async fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey, AuthError> {
        let now = self.clock.now();
        let (current, may_refresh, attempts) = {
            let state = self.state.read();
            (state.cached.clone(), state.may_refresh(now), state.attempts)
        };

        if let Some(current) = &current {
            let age = now.saturating_duration_since(current.fetched_at);
            if age < KEY_SET_TTL {
                match Self::select(&current.keys, kid) {
                    Ok(key) => return Ok(key),
                    Err(AuthError::UnknownSigningKey(_)) if may_refresh => {
                        tracing::debug!("unknown kid {:?}, refreshing signing keys", kid);
                    }
                    Err(e) => return Err(e),
                }
            } else if age < MAX_KEY_SET_AGE && !may_refresh {
                return Self::select(&current.keys, kid);
            }
        }

        if !may_refresh {
            return Err(Self::unavailable());
        }

        let keys = self.refresh(attempts).await?;
        Self::select(&keys, kid)
    }
}
