use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient, aio::MultiplexedConnection};

use super::{PhoneCache, keys};
use crate::error::CacheError;

/// Redis 手机号缓存
#[derive(Clone)]
pub struct RedisPhoneCache {
    client: RedisClient,
    key_prefix: String,
    timeout: Option<Duration>,
}

impl RedisPhoneCache {
    pub fn new(client: RedisClient, key_prefix: String, timeout: Option<Duration>) -> Self {
        Self {
            client,
            key_prefix,
            timeout,
        }
    }

    // 配置了超时时，连接和命令都受同一个上限约束
    async fn bounded<T, F>(&self, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, redis::RedisError>>,
    {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| CacheError::Timeout(limit))?
                .map_err(CacheError::from),
            None => fut.await.map_err(CacheError::from),
        }
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CacheError> {
        self.bounded(self.client.get_multiplexed_async_connection())
            .await
    }
}

#[async_trait]
impl PhoneCache for RedisPhoneCache {
    async fn get(&self, username: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        let key = keys::user_phone_key(&self.key_prefix, username);

        let phone: Option<String> = self.bounded(conn.get(key)).await?;
        Ok(phone)
    }

    async fn set(
        &self,
        username: &str,
        phone: &str,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let key = keys::user_phone_key(&self.key_prefix, username);

        match ttl {
            // 整秒用 SETEX，不足一秒或带小数的用 PSETEX，且至少 1 毫秒
            Some(ttl) if ttl.subsec_nanos() == 0 && ttl.as_secs() > 0 => {
                let _: () = self.bounded(conn.set_ex(key, phone, ttl.as_secs())).await?;
            }
            Some(ttl) => {
                let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
                let _: () = self.bounded(conn.pset_ex(key, phone, millis)).await?;
            }
            None => {
                let _: () = self.bounded(conn.set(key, phone)).await?;
            }
        }

        Ok(())
    }
}
