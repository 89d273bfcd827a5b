use anyhow::Result;
use redis::Client;
use uuid::Uuid;

#[derive(Clone)]
pub struct RedisCache {
    client: Client,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let cache = Self::open(redis_url)?;
        cache.ping().await?;
        Ok(cache)
    }

    /// Parses the URL without connecting.
    pub fn open(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        Ok(Self { client })
    }

    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }

    /// Takes `key` for `ttl_seconds` unless someone else holds it.
    pub async fn try_lock(&self, key: &str, ttl_seconds: u64) -> Result<Option<LockGuard>> {
        let token = Uuid::new_v4().to_string();
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let acquired: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(&token)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await?;

        Ok(acquired.map(|_| LockGuard {
            key: key.to_string(),
            token,
        }))
    }

    /// Releases the lock only if it is still ours; an expired lock may have
    /// been taken over by another run.
    pub async fn unlock(&self, guard: LockGuard) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::Script::new(
            "if redis.call('GET', KEYS[1]) == ARGV[1] then \
                 return redis.call('DEL', KEYS[1]) \
             else \
                 return 0 \
             end",
        )
        .key(&guard.key)
        .arg(&guard.token)
        .invoke_async::<_, i64>(&mut conn)
        .await?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct LockGuard {
    key: String,
    token: String,
}
