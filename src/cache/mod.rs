// 缓存模块
// 用户名 -> 手机号 的读穿缓存，只作为关系存储的派生副本

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheError;

pub mod keys;
pub mod operations;

pub use operations::RedisPhoneCache;

#[async_trait]
pub trait PhoneCache: Send + Sync {
    /// 查询用户名对应的缓存手机号，未命中返回 `None`
    async fn get(&self, username: &str) -> Result<Option<String>, CacheError>;

    /// 覆盖写入，`ttl` 为 `None` 时不过期
    async fn set(&self, username: &str, phone: &str, ttl: Option<Duration>)
    -> Result<(), CacheError>;
}
