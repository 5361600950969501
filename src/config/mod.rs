use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use sqlx::postgres::PgConnectOptions;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} is required")]
    Missing(&'static str),
    #[error("environment variable {var} has invalid value {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub db_host: String,
    pub db_port: u16,
    pub db_name: String,
    pub db_user: String,
    pub db_password: Option<String>,
    pub db_pool_min: u32,
    pub db_pool_max: u32,
    pub db_acquire_timeout_secs: u64,
    pub db_run_migrations: bool,
    pub redis_url: String,
    pub redis_timeout_secs: Option<u64>,
    pub cache_ttl_secs: Option<u64>,
    pub cache_key_prefix: String,
    pub server_host: IpAddr,
    pub server_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源解析配置，`from_env` 用进程环境变量调用它
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &'static str| lookup(var).filter(|v| !v.trim().is_empty());
        let or_default = |var: &'static str, default: &str| {
            get(var).unwrap_or_else(|| default.to_string())
        };

        let database_url = get("DATABASE_URL");
        let db_password = get("DB_PASS");
        // 没有完整连接串时必须提供数据库密码
        if database_url.is_none() && db_password.is_none() {
            return Err(ConfigError::Missing("DB_PASS"));
        }

        let redis_url = match get("REDIS_URL") {
            Some(url) => url,
            None => format!(
                "redis://{}:{}/",
                or_default("REDIS_HOST", "redis-service"),
                parse_or(&get, "REDIS_PORT", 6379u16)?
            ),
        };

        let db_pool_min = parse_or(&get, "DB_POOL_MIN", 1u32)?;
        let db_pool_max = parse_or(&get, "DB_POOL_MAX", 10u32)?;
        if db_pool_max == 0 || db_pool_min > db_pool_max {
            return Err(ConfigError::Invalid {
                var: "DB_POOL_MAX",
                value: db_pool_max.to_string(),
            });
        }

        let db_acquire_timeout_secs = parse_or(&get, "DB_ACQUIRE_TIMEOUT_SECS", 30u64)?;
        // 0 会让每次借连接立即超时
        if db_acquire_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_ACQUIRE_TIMEOUT_SECS",
                value: "0".into(),
            });
        }

        Ok(Config {
            database_url,
            db_host: or_default("DB_HOST", "db-service"),
            db_port: parse_or(&get, "DB_PORT", 5432u16)?,
            db_name: or_default("DB_NAME", "mydb"),
            db_user: or_default("DB_USER", "user"),
            db_password,
            db_pool_min,
            db_pool_max,
            db_acquire_timeout_secs,
            db_run_migrations: parse_or(&get, "DB_RUN_MIGRATIONS", true)?,
            redis_url,
            redis_timeout_secs: parse_opt::<_, u64>(&get, "REDIS_TIMEOUT_SECS")?.filter(|s| *s > 0),
            cache_ttl_secs: parse_opt::<_, u64>(&get, "CACHE_TTL_SECS")?.filter(|s| *s > 0),
            cache_key_prefix: get("CACHE_KEY_PREFIX").unwrap_or_default(),
            server_host: parse_or(&get, "SERVER_HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?,
            server_port: parse_or(&get, "SERVER_PORT", 5000u16)?,
        })
    }

    pub fn pg_connect_options(&self) -> Result<PgConnectOptions, ConfigError> {
        if let Some(url) = &self.database_url {
            return url.parse().map_err(|_| ConfigError::Invalid {
                var: "DATABASE_URL",
                value: "<redacted>".into(),
            });
        }

        let mut options = PgConnectOptions::new()
            .host(&self.db_host)
            .port(self.db_port)
            .database(&self.db_name)
            .username(&self.db_user)
            .application_name("check_user_backend");
        if let Some(password) = &self.db_password {
            options = options.password(password);
        }
        Ok(options)
    }

    pub fn db_acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.db_acquire_timeout_secs)
    }

    pub fn redis_timeout(&self) -> Option<Duration> {
        self.redis_timeout_secs.map(Duration::from_secs)
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_secs.map(Duration::from_secs)
    }
}

fn parse_or<G, T>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&'static str) -> Option<String>,
    T: std::str::FromStr,
{
    Ok(parse_opt(get, var)?.unwrap_or(default))
}

fn parse_opt<G, T>(get: &G, var: &'static str) -> Result<Option<T>, ConfigError>
where
    G: Fn(&'static str) -> Option<String>,
    T: std::str::FromStr,
{
    match get(var) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
        None => Ok(None),
    }
}
