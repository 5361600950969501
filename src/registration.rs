use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;

use crate::cache::PhoneCache;
use crate::database::{InsertOutcome, UserRecord, UserStore};
use crate::error::ServiceError;

/// 结果来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cache,
    Database,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// 缓存中的手机号与请求一致
    CacheHit,
    /// 数据库中已有该用户名
    StoreHit,
    /// 新用户已写入数据库
    Registered,
}

impl Registration {
    pub fn source(&self) -> Source {
        match self {
            Registration::CacheHit => Source::Cache,
            Registration::StoreHit | Registration::Registered => Source::Database,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Registration::Registered => StatusCode::CREATED,
            _ => StatusCode::OK,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Registration::CacheHit => "Welcome back! (From Cache)",
            Registration::StoreHit => "Welcome back! (From DB)",
            Registration::Registered => "User registered successfully!",
        }
    }
}

/// 先查缓存，未命中再查数据库，数据库也没有则注册
#[derive(Clone)]
pub struct UserRegistrationService {
    store: Arc<dyn UserStore>,
    cache: Arc<dyn PhoneCache>,
    cache_ttl: Option<Duration>,
}

impl UserRegistrationService {
    pub fn new(
        store: Arc<dyn UserStore>,
        cache: Arc<dyn PhoneCache>,
        cache_ttl: Option<Duration>,
    ) -> Self {
        Self {
            store,
            cache,
            cache_ttl,
        }
    }

    pub async fn check_or_register(
        &self,
        username: &str,
        phone: &str,
    ) -> Result<Registration, ServiceError> {
        if self.cache.get(username).await?.as_deref() == Some(phone) {
            tracing::debug!(username, "cache hit");
            return Ok(Registration::CacheHit);
        }

        let outcome = self.lookup_or_insert(username, phone).await?;

        // 数据库命中时不比对已存的手机号，直接以请求中的手机号覆盖缓存
        self.cache.set(username, phone, self.cache_ttl).await?;

        Ok(outcome)
    }

    // 借出的连接在此函数返回时归还，无论成功与否
    async fn lookup_or_insert(
        &self,
        username: &str,
        phone: &str,
    ) -> Result<Registration, ServiceError> {
        let mut session = self.store.checkout().await?;

        if session.find_user(username).await?.is_some() {
            tracing::debug!(username, "user found in database");
            return Ok(Registration::StoreHit);
        }

        let user = UserRecord::new(username, phone);
        match session.insert_user(&user).await? {
            InsertOutcome::Inserted => {
                session.commit().await?;
                tracing::info!(username, "registered new user");
                Ok(Registration::Registered)
            }
            InsertOutcome::AlreadyExists => {
                tracing::warn!(username, "user registered concurrently, treating as existing");
                Ok(Registration::StoreHit)
            }
        }
    }
}
