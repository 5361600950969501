use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::database::{InsertOutcome, UserRecord, UserSession, UserStore};
use crate::error::StoreError;

/// PostgreSQL 用户存储
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn checkout(&self) -> Result<Box<dyn UserSession>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUserSession { tx }))
    }
}

/// 事务持有借出的连接，drop 时回滚并归还
struct PgUserSession {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UserSession for PgUserSession {
    async fn find_user(&mut self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        // 旧表的 phone 列可能允许 NULL
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT username, COALESCE(phone, '') AS phone
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(user)
    }

    async fn insert_user(&mut self, user: &UserRecord) -> Result<InsertOutcome, StoreError> {
        let inserted: Option<String> = sqlx::query_scalar(
            r#"
            INSERT INTO users (username, phone)
            VALUES ($1, $2)
            ON CONFLICT (username) DO NOTHING
            RETURNING username
            "#,
        )
        .bind(&user.username)
        .bind(&user.phone)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(match inserted {
            Some(_) => InsertOutcome::Inserted,
            None => InsertOutcome::AlreadyExists,
        })
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
