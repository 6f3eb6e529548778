//! Database connection pool management
//!
//! Wraps an sqlx `AnyPool` so one pool type serves MySQL, Postgres and
//! SQLite. The pool is created explicitly from a `PoolConfig`, passed by
//! reference into every data-access call, and shut down explicitly.

use std::time::Duration;

use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::pool::PoolConnection;
use sqlx::{Any, AnyPool};
use tracing::{debug, info};
use url::Url;

use crate::config::PoolConfig;
use crate::dialect::Dialect;
use crate::error::{OrmError, Result};

const SQLITE_MEMORY: &str = ":memory:";

/// Bounded set of live connections plus the dialect they speak
#[derive(Clone, Debug)]
pub struct Pool {
    pub(crate) inner: AnyPool,
    pub(crate) dialect: Dialect,
    autocommit: bool,
}

impl Pool {
    /// Create a connection pool.
    ///
    /// Opens `minsize` connections up front; at most `maxsize` are ever open.
    ///
    /// # Errors
    ///
    /// Returns a config error if required credentials are missing, or the
    /// driver error if the initial connection fails.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let pool = Pool::create(&PoolConfig::sqlite("webapp.db")).await?;
    /// ```
    pub async fn create(config: &PoolConfig) -> Result<Self> {
        config.validate()?;
        install_default_drivers();

        let url = connection_url(config)?;
        let (min, max) = pool_bounds(config);
        info!(
            driver = %config.driver,
            host = %config.host,
            db = config.db.as_deref().unwrap_or_default(),
            min,
            max,
            "create database connection pool..."
        );

        let inner = AnyPoolOptions::new()
            .min_connections(min)
            .max_connections(max)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&url)
            .await?;

        Ok(Self {
            inner,
            dialect: config.driver,
            autocommit: config.autocommit,
        })
    }

    /// Borrow a connection. It goes back to the pool when the guard drops.
    ///
    /// Waits while `maxsize` connections are checked out.
    pub async fn acquire(&self) -> Result<PoolConnection<Any>> {
        if self.inner.is_closed() {
            return Err(OrmError::PoolClosed);
        }
        self.inner.acquire().await.map_err(|e| match e {
            sqlx::Error::PoolClosed => OrmError::PoolClosed,
            other => other.into(),
        })
    }

    /// Close the pool, waiting for checked-out connections to come back.
    pub async fn shutdown(&self) {
        self.inner.close().await;
        info!("Database connection pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Default transaction mode for mutating statements
    pub fn autocommit(&self) -> bool {
        self.autocommit
    }

    /// Connections currently open (idle or in use)
    pub fn size(&self) -> u32 {
        self.inner.size()
    }

    pub fn num_idle(&self) -> usize {
        self.inner.num_idle()
    }
}

/// Every connection to `:memory:` is a separate database, so cap it at one.
fn pool_bounds(config: &PoolConfig) -> (u32, u32) {
    if config.driver == Dialect::Sqlite && config.db.as_deref() == Some(SQLITE_MEMORY) {
        debug!("in-memory sqlite database, pool capped at one connection");
        (config.minsize.min(1), 1)
    } else {
        (config.minsize, config.maxsize)
    }
}

fn connection_url(config: &PoolConfig) -> Result<String> {
    let db = config.db.as_deref().unwrap_or_default();

    if config.driver == Dialect::Sqlite {
        if db == SQLITE_MEMORY {
            return Ok("sqlite::memory:".to_string());
        }
        return Ok(format!("sqlite://{}?mode=rwc", db));
    }

    let invalid = |part: &str| OrmError::config(format!("invalid {} in connection settings", part));

    let mut url = Url::parse(&format!("{}://localhost", config.driver.scheme()))
        .map_err(|_| invalid("driver"))?;
    url.set_host(Some(&config.host)).map_err(|_| invalid("host"))?;
    url.set_port(Some(config.port)).map_err(|_| invalid("port"))?;
    url.set_username(config.user.as_deref().unwrap_or_default())
        .map_err(|_| invalid("user"))?;
    url.set_password(config.password.as_deref())
        .map_err(|_| invalid("password"))?;
    url.set_path(db);

    if config.driver == Dialect::MySql {
        url.query_pairs_mut().append_pair("charset", &config.charset);
    }

    Ok(url.into())
}
