//! Redis-backed overlay grant inbox shared by every API replica.

use async_trait::async_trait;
use medgate_application::OverlayGrantInbox;
use medgate_core::{AppError, AppResult, UserId};
use medgate_domain::OverlayGrant;
use redis::{AsyncCommands, Script};

const DELIVER_GRANT_SCRIPT: &str = r#"
redis.call('RPUSH', KEYS[1], ARGV[1])
redis.call('EXPIRE', KEYS[1], tonumber(ARGV[2]))
return 1
"#;

const ACKNOWLEDGE_GRANTS_SCRIPT: &str = r#"
local removed = 0
for index = 1, #ARGV do
    removed = removed + redis.call('LREM', KEYS[1], 1, ARGV[index])
end
return removed
"#;

/// Redis implementation of the overlay grant inbox port.
///
/// Each user has one list; entries live at most `ttl_seconds` so grants for
/// users who never come back do not accumulate.
#[derive(Clone)]
pub struct RedisOverlayGrantInbox {
    client: redis::Client,
    key_prefix: String,
    ttl_seconds: u64,
}

impl RedisOverlayGrantInbox {
    /// Creates an inbox with a configured Redis client, key prefix and entry lifetime.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>, ttl_seconds: u64) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
            ttl_seconds: ttl_seconds.max(1),
        }
    }

    fn key_for(&self, user_id: UserId) -> String {
        format!("{}:{user_id}", self.key_prefix)
    }

    fn encode(grant: &OverlayGrant) -> AppResult<String> {
        serde_json::to_string(grant).map_err(|error| {
            AppError::Internal(format!("failed to encode overlay grant: {error}"))
        })
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))
    }
}

#[async_trait]
impl OverlayGrantInbox for RedisOverlayGrantInbox {
    async fn deliver(&self, user_id: UserId, grant: OverlayGrant) -> AppResult<()> {
        let payload = Self::encode(&grant)?;
        let mut connection = self.connection().await?;

        let _: i64 = Script::new(DELIVER_GRANT_SCRIPT)
            .key(self.key_for(user_id))
            .arg(payload)
            .arg(self.ttl_seconds)
            .invoke_async(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to deliver overlay grant: {error}"))
            })?;

        Ok(())
    }

    async fn pending(&self, user_id: UserId) -> AppResult<Vec<OverlayGrant>> {
        let mut connection = self.connection().await?;

        let encoded: Vec<String> = connection
            .lrange(self.key_for(user_id), 0, -1)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to read overlay grants: {error}"))
            })?;

        encoded
            .iter()
            .map(|value| {
                serde_json::from_str::<OverlayGrant>(value).map_err(|error| {
                    AppError::Internal(format!("invalid overlay grant in redis: {error}"))
                })
            })
            .collect()
    }

    async fn acknowledge(&self, user_id: UserId, grants: &[OverlayGrant]) -> AppResult<()> {
        if grants.is_empty() {
            return Ok(());
        }

        let mut connection = self.connection().await?;
        let script = Script::new(ACKNOWLEDGE_GRANTS_SCRIPT);
        let mut invocation = script.key(self.key_for(user_id));
        for grant in grants {
            invocation.arg(Self::encode(grant)?);
        }

        let _: i64 = invocation
            .invoke_async(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to acknowledge overlay grants: {error}"))
            })?;

        Ok(())
    }
}
