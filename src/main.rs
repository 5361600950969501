use std::net::SocketAddr;
use std::sync::Arc;

use check_user_backend::{
    AppState,
    cache::RedisPhoneCache,
    config::Config,
    database::PgUserStore,
    registration::UserRegistrationService,
    router::create_router,
    shutdown::shutdown_signal,
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");
    let connect_options = config
        .pg_connect_options()
        .expect("Invalid database configuration");

    // 连接池延迟建立连接，数据库不可用时请求返回 500 而不是进程退出
    let pool = PgPoolOptions::new()
        .min_connections(config.db_pool_min)
        .max_connections(config.db_pool_max)
        .acquire_timeout(config.db_acquire_timeout())
        .connect_lazy_with(connect_options);
    tracing::info!(
        min = config.db_pool_min,
        max = config.db_pool_max,
        "Database connection pool initialized"
    );

    let store = PgUserStore::new(pool.clone());
    if config.db_run_migrations {
        match store.migrate().await {
            Ok(()) => tracing::info!("Database migrations applied"),
            Err(e) => tracing::error!("Failed to apply database migrations: {}", e),
        }
    }

    // 设置 Redis 客户端
    let redis_client =
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client");
    let cache = RedisPhoneCache::new(
        redis_client,
        config.cache_key_prefix.clone(),
        config.redis_timeout(),
    );

    // 设置应用状态
    let state = AppState {
        registrations: UserRegistrationService::new(
            Arc::new(store),
            Arc::new(cache),
            config.cache_ttl(),
        ),
    };

    let app = create_router(state);

    // 启动服务器
    let addr = SocketAddr::new(config.server_host, config.server_port);
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app,
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Failed to start server");

    pool.close().await;
    tracing::info!("Database connection pool closed");
}
