use chrono::{DateTime, Utc};
use dashmap::DashMap;
use redis::AsyncCommands;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum BlacklistError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Token revocation store keyed by JWT id (`jti`).
///
/// Entries carry a TTL equal to the token's remaining lifetime, so the
/// store never outgrows the set of live tokens. Redis backs production;
/// the in-memory variant exists for tests and single-process setups.
pub enum TokenBlacklist {
    Redis {
        client: Arc<redis::Client>,
        namespace: String,
    },
    InMemory(DashMap<String, DateTime<Utc>>),
}

impl TokenBlacklist {
    pub fn redis(client: Arc<redis::Client>, namespace: impl Into<String>) -> Self {
        Self::Redis {
            client,
            namespace: namespace.into(),
        }
    }

    pub fn in_memory() -> Self {
        Self::InMemory(DashMap::new())
    }

    fn key(namespace: &str, jti: &str) -> String {
        format!("{}:{}", namespace, jti)
    }

    /// Records a token id until `expires_at`.
    pub async fn insert(
        &self,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), BlacklistError> {
        let ttl = (expires_at - Utc::now()).num_seconds().max(1) as u64;
        match self {
            Self::Redis { client, namespace } => {
                let mut conn = client.get_async_connection().await?;
                let _: () = conn
                    .set_ex(Self::key(namespace, jti), 1u8, ttl as usize)
                    .await?;
            }
            Self::InMemory(map) => {
                map.insert(jti.to_string(), expires_at);
            }
        }
        debug!(%jti, ttl_secs = ttl, "token blacklisted");
        Ok(())
    }

    /// Whether a token id has been revoked.
    pub async fn contains(&self, jti: &str) -> Result<bool, BlacklistError> {
        match self {
            Self::Redis { client, namespace } => {
                let mut conn = client.get_async_connection().await?;
                let found: bool = conn.exists(Self::key(namespace, jti)).await?;
                Ok(found)
            }
            Self::InMemory(map) => {
                let now = Utc::now();
                if let Some(entry) = map.get(jti) {
                    if *entry.value() > now {
                        return Ok(true);
                    }
                }
                // Expired entries are of no further interest.
                map.retain(|_, expiry| *expiry > now);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn in_memory_blacklist_round_trip() {
        let blacklist = TokenBlacklist::in_memory();
        blacklist
            .insert("token-1", Utc::now() + Duration::minutes(5))
            .await
            .unwrap();

        assert!(blacklist.contains("token-1").await.unwrap());
        assert!(!blacklist.contains("token-2").await.unwrap());
    }

    #[tokio::test]
    async fn expired_entries_are_forgotten() {
        let blacklist = TokenBlacklist::in_memory();
        blacklist
            .insert("stale", Utc::now() - Duration::seconds(30))
            .await
            .unwrap();

        assert!(!blacklist.contains("stale").await.unwrap());
    }
}
