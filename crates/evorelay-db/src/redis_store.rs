use std::time::Duration;

use async_trait::async_trait;
use evorelay_common::{Error, Result};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, ConnectionInfo, IntoConnectionInfo};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::kv::KvBackend;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Redis-backed key-value store shared by all relay instances.
pub struct RedisBackend {
    manager: RwLock<Option<ConnectionManager>>,
}

impl RedisBackend {
    /// Connect and verify the server answers `PING` within five seconds.
    ///
    /// `url` carries host, port and database; `password` is applied verbatim.
    pub async fn connect(url: &str, password: Option<&str>) -> Result<Self> {
        let client = redis::Client::open(connection_info(url, password)?)
            .map_err(|e| Error::Database(format!("failed to open redis client: {e}")))?;

        let manager = tokio::time::timeout(CONNECT_TIMEOUT, async {
            let mut manager = client.get_connection_manager().await?;
            let _pong: String = redis::cmd("PING").query_async(&mut manager).await?;
            Ok::<_, redis::RedisError>(manager)
        })
        .await
        .map_err(|_| Error::Database("timed out connecting to redis".to_string()))?
        .map_err(|e| Error::Database(format!("connect redis: {e}")))?;

        debug!("redis answered PING");
        Ok(Self {
            manager: RwLock::new(Some(manager)),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        self.manager
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::Database("redis connection is closed".to_string()))
    }
}

fn connection_info(url: &str, password: Option<&str>) -> Result<ConnectionInfo> {
    let mut info = url
        .into_connection_info()
        .map_err(|e| Error::Database(format!("invalid redis url {url}: {e}")))?;
    if let Some(password) = password {
        info.redis.password = Some(password.to_string());
    }
    Ok(info)
}

#[async_trait]
impl KvBackend for RedisBackend {
    fn backend_id(&self) -> &str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        conn.get(key)
            .await
            .map_err(|e| Error::Database(format!("failed to read {key} from redis: {e}")))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.connection().await?;
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(|e| Error::Database(format!("failed to write {key} to redis: {e}")))
    }

    async fn close(&self) -> Result<()> {
        // Dropping the last manager clone tears down the multiplexed connection.
        if self.manager.write().await.take().is_some() {
            info!("redis connection closed");
        }
        Ok(())
    }
}
