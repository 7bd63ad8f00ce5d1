//! In-memory one-time token vault.
//!
//! A token binds `(user, action, data)` for a fixed TTL and can be redeemed
//! once. Lookup and removal happen under one lock, so two concurrent
//! redemptions of the same token can never both succeed. A background task
//! sweeps expired entries so abandoned tokens do not accumulate.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use parking_lot::Mutex;
use rand::RngCore;
use rand::rngs::OsRng;
use serde_json::Value;
use tokio::time::{Instant, MissedTickBehavior};

/// How long a token stays redeemable.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3 * 60);

/// How often expired tokens are purged.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Longest TTL a vault accepts. Longer values are clamped.
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Shortest sweep period a vault accepts. Shorter values are raised to it.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Entropy per token.
const TOKEN_BYTES: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("random source unavailable: {0}")]
    RandomSource(String),

    /// Unknown, already redeemed and expired tokens all look the same.
    #[error("invalid or expired token")]
    InvalidOrExpiredToken,
}

/// What a redeemed token was bound to.
#[derive(Debug, Clone, PartialEq)]
pub struct Redemption {
    pub user_id: String,
    pub action: String,
    pub data: Value,
}

struct OtpEntry {
    redemption: Redemption,
    expires_at: Instant,
}

type TokenMap = Mutex<HashMap<String, OtpEntry>>;

pub struct TokenVault {
    tokens: Arc<TokenMap>,
    ttl: Duration,
}

impl TokenVault {
    /// Create a vault and start its sweep task.
    ///
    /// Must be called from within a tokio runtime. The sweep task holds a
    /// weak reference and stops after the vault is dropped. `ttl` is capped
    /// at [`MAX_TOKEN_TTL`] and `sweep_interval` raised to at least
    /// [`MIN_SWEEP_INTERVAL`].
    pub fn new(ttl: Duration, sweep_interval: Duration) -> Self {
        let ttl = ttl.min(MAX_TOKEN_TTL);
        let sweep_interval = sweep_interval.max(MIN_SWEEP_INTERVAL);

        let tokens = Arc::new(Mutex::new(HashMap::new()));
        tokio::spawn(sweep_loop(Arc::downgrade(&tokens), sweep_interval));
        Self { tokens, ttl }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_TOKEN_TTL, DEFAULT_SWEEP_INTERVAL)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `(user_id, action, data)`.
    pub fn generate(
        &self,
        user_id: &str,
        action: &str,
        data: Value,
    ) -> Result<String, VaultError> {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| VaultError::RandomSource(e.to_string()))?;
        let token = URL_SAFE_NO_PAD.encode(bytes);

        let entry = OtpEntry {
            redemption: Redemption {
                user_id: user_id.to_string(),
                action: action.to_string(),
                data,
            },
            expires_at: Instant::now() + self.ttl,
        };
        self.tokens.lock().insert(token.clone(), entry);

        tracing::debug!(user_id, action, "issued one-time token");
        Ok(token)
    }

    /// Redeem a token. The entry is removed whether or not it has expired.
    pub fn validate(&self, token: &str) -> Result<Redemption, VaultError> {
        let entry = self
            .tokens
            .lock()
            .remove(token)
            .ok_or(VaultError::InvalidOrExpiredToken)?;

        if Instant::now() >= entry.expires_at {
            return Err(VaultError::InvalidOrExpiredToken);
        }

        Ok(entry.redemption)
    }

    /// Remove every expired entry now. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        sweep_expired(&self.tokens, Instant::now())
    }

    /// Number of outstanding (possibly expired) tokens.
    pub fn len(&self) -> usize {
        self.tokens.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for TokenVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVault")
            .field("ttl", &self.ttl)
            .field("outstanding", &self.len())
            .finish()
    }
}

fn sweep_expired(tokens: &TokenMap, now: Instant) -> usize {
    let mut map = tokens.lock();
    let before = map.len();
    map.retain(|_, entry| entry.expires_at > now);
    before - map.len()
}

async fn sweep_loop(tokens: Weak<TokenMap>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let Some(tokens) = tokens.upgrade() else {
            break;
        };
        let removed = sweep_expired(&tokens, Instant::now());
        if removed > 0 {
            tracing::debug!(removed, "swept expired tokens");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn redeems_exactly_once() {
        let vault = TokenVault::with_defaults();
        let token = vault
            .generate("U1", "list_sessions", json!({ "page": 1 }))
            .unwrap();

        let redemption = vault.validate(&token).unwrap();
        assert_eq!(
            redemption,
            Redemption {
                user_id: "U1".into(),
                action: "list_sessions".into(),
                data: json!({ "page": 1 }),
            }
        );

        assert!(matches!(
            vault.validate(&token),
            Err(VaultError::InvalidOrExpiredToken)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn tokens_are_url_safe_and_distinct() {
        let vault = TokenVault::with_defaults();
        let a = vault.generate("U1", "x", Value::Null).unwrap();
        let b = vault.generate("U1", "x", Value::Null).unwrap();

        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_token_is_rejected_and_removed() {
        let vault = TokenVault::new(Duration::from_secs(60), DEFAULT_SWEEP_INTERVAL);
        let token = vault.generate("U1", "x", Value::Null).unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;

        assert!(matches!(
            vault.validate(&token),
            Err(VaultError::InvalidOrExpiredToken)
        ));
        assert!(vault.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_removes_only_expired() {
        let vault = TokenVault::new(Duration::from_secs(60), DEFAULT_SWEEP_INTERVAL);
        let old = vault.generate("U1", "x", Value::Null).unwrap();
        tokio::time::advance(Duration::from_secs(45)).await;
        let fresh = vault.generate("U2", "y", Value::Null).unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;

        assert_eq!(vault.sweep(), 1);
        assert_eq!(vault.len(), 1);

        let unknown = vault.validate("never-issued").unwrap_err();
        let swept = vault.validate(&old).unwrap_err();
        assert_eq!(unknown.to_string(), swept.to_string());
        assert!(vault.validate(&fresh).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn background_sweep_runs_on_interval() {
        let vault = TokenVault::new(Duration::from_secs(1), Duration::from_secs(300));
        vault.generate("U1", "x", Value::Null).unwrap();
        assert_eq!(vault.len(), 1);

        tokio::time::sleep(Duration::from_secs(301)).await;

        assert_eq!(vault.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_sweep_interval_still_sweeps() {
        let vault = TokenVault::new(Duration::from_secs(1), Duration::ZERO);
        vault.generate("U1", "x", Value::Null).unwrap();

        tokio::time::sleep(Duration::from_secs(60 * 60)).await;

        assert!(vault.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_ttl_is_clamped() {
        let vault = TokenVault::new(Duration::MAX, DEFAULT_SWEEP_INTERVAL);
        assert_eq!(vault.ttl(), MAX_TOKEN_TTL);

        let token = vault.generate("U1", "x", Value::Null).unwrap();
        tokio::time::advance(MAX_TOKEN_TTL + Duration::from_secs(1)).await;
        assert!(vault.validate(&token).is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_redemption_succeeds_once() {
        let vault = Arc::new(TokenVault::with_defaults());
        let token = vault.generate("U1", "x", Value::Null).unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let vault = Arc::clone(&vault);
                let token = token.clone();
                tokio::spawn(async move { vault.validate(&token).is_ok() })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }
}
