use sqlx::FromRow;

/// 用户数据库实体
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct UserRecord {
    pub username: String,
    pub phone: String,
}

impl UserRecord {
    pub fn new(username: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            phone: phone.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// 并发请求已先一步注册了同一用户名
    AlreadyExists,
}
