// 数据库模块
// 用户表只插入不更新，连接按请求从连接池借出

use async_trait::async_trait;

use crate::error::StoreError;

pub mod models;
pub mod repositories;

pub use models::user::{InsertOutcome, UserRecord};
pub use repositories::user::PgUserStore;

/// 关系存储
#[async_trait]
pub trait UserStore: Send + Sync {
    /// 从连接池借出一个连接并开启事务
    ///
    /// 返回的会话被丢弃时连接归还连接池，未提交的写入回滚
    async fn checkout(&self) -> Result<Box<dyn UserSession>, StoreError>;
}

/// 一次借出的连接上的操作
#[async_trait]
pub trait UserSession: Send {
    async fn find_user(&mut self, username: &str) -> Result<Option<UserRecord>, StoreError>;

    /// 插入新用户，用户名已存在时不报错而是返回 `InsertOutcome::AlreadyExists`
    async fn insert_user(&mut self, user: &UserRecord) -> Result<InsertOutcome, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
