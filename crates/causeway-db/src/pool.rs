use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};

use causeway_core::config::DatabaseConfig;
use causeway_core::error::{CausewayError, Result};

/// Database connection wrapper providing connection pooling.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect using the given configuration.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = connect_options(config)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.pool_timeout_secs))
            .connect_with(options)
            .await
            .map_err(|e| CausewayError::Database(format!("Failed to connect: {}", e)))?;

        Ok(Self { pool })
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| CausewayError::Database(format!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Close all connections gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Build connect options from configuration.
///
/// A connection url wins over the discrete parameters; the TLS toggle is
/// applied on top of either form.
fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions> {
    let mut options = match &config.url {
        Some(url) => url
            .parse::<PgConnectOptions>()
            .map_err(|e| CausewayError::Config(format!("Invalid database url: {}", e)))?,
        None => {
            let mut options = PgConnectOptions::new()
                .host(&config.host)
                .port(config.port)
                .username(&config.user)
                .database(&config.database);
            if let Some(password) = &config.password {
                options = options.password(password);
            }
            options
        }
    };

    if config.tls {
        options = options.ssl_mode(PgSslMode::Require);
    }

    Ok(options)
}
