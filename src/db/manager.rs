#[cfg(feature = "database")]
use sqlx::{migrate::MigrateDatabase, SqlitePool};

/// Owns the connection pool and migration lifecycle, mirroring the
/// teacher's single-struct `DatabaseManager`.
#[cfg(feature = "database")]
pub struct DatabaseManager {
    pool: SqlitePool,
}

#[cfg(feature = "database")]
impl DatabaseManager {
    pub async fn new(database_url: &str, auto_migrate: bool) -> anyhow::Result<Self> {
        if !sqlx::Sqlite::database_exists(database_url).await.unwrap_or(false) {
            tracing::info!(url = database_url, "creating database");
            sqlx::Sqlite::create_database(database_url).await?;
        }

        let pool = SqlitePool::connect(database_url).await?;

        if auto_migrate {
            tracing::info!("running database migrations");
            sqlx::migrate!("./migrations").run(&pool).await?;
        }

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn shutdown(&self) {
        self.pool.close().await;
        tracing::info!("database connections closed");
    }
}

#[cfg(feature = "database")]
static DB_MANAGER: std::sync::LazyLock<
    std::sync::Arc<tokio::sync::RwLock<Option<DatabaseManager>>>,
> = std::sync::LazyLock::new(|| std::sync::Arc::new(tokio::sync::RwLock::new(None)));

#[cfg(feature = "database")]
pub async fn init_database() -> anyhow::Result<()> {
    let config = crate::config::config()?;
    let manager =
        DatabaseManager::new(&config.database.url, config.database.auto_migrate).await?;

    let mut guard = DB_MANAGER.write().await;
    *guard = Some(manager);
    tracing::info!("database manager initialized");
    Ok(())
}

/// Clones the global connection pool (`SqlitePool` is a cheap `Arc` handle
/// internally). Panics if called before `init_database` has succeeded,
/// matching the rest of the crate's fail-fast-at-startup posture for
/// required dependencies.
#[cfg(feature = "database")]
pub async fn pool() -> SqlitePool {
    let guard = DB_MANAGER.read().await;
    guard.as_ref().expect("database not initialized").pool().clone()
}

#[cfg(feature = "database")]
pub async fn shutdown_database() {
    let guard = DB_MANAGER.read().await;
    if let Some(manager) = guard.as_ref() {
        manager.shutdown().await;
    }
}

#[cfg(not(feature = "database"))]
pub async fn init_database() -> anyhow::Result<()> {
    tracing::info!("database feature not enabled, skipping initialization");
    Ok(())
}

#[cfg(not(feature = "database"))]
pub async fn shutdown_database() {
    tracing::info!("database feature not enabled, nothing to shut down");
}
