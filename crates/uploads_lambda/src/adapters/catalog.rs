use std::time::Duration;

use crate::runtime::config::ReconcileConfig;
use crate::runtime::contract::CatalogRow;

/// An open session against the catalog database. The connection is the only
/// exclusively-owned resource of the reconciliation scan; `close` must be
/// called exactly once on every exit path.
pub trait CatalogConnection {
    fn fetch_rows(&mut self, table: &str) -> Result<Vec<CatalogRow>, String>;
    fn close(&mut self) -> Result<(), String>;
}

pub trait CatalogConnector {
    fn connect(&self) -> Result<Box<dyn CatalogConnection>, String>;
}

pub struct MySqlCatalogConnector {
    opts: mysql_async::Opts,
    call_timeout: Duration,
}

impl MySqlCatalogConnector {
    pub fn from_config(config: &ReconcileConfig) -> Self {
        let opts = mysql_async::OptsBuilder::default()
            .ip_or_hostname(config.db_host.clone())
            .user(Some(config.db_user.clone()))
            .pass(Some(config.db_password.clone()))
            .db_name(Some(config.db_name.clone()))
            .into();

        Self {
            opts,
            call_timeout: Duration::from_secs(config.catalog_timeout_secs),
        }
    }
}

impl CatalogConnector for MySqlCatalogConnector {
    fn connect(&self) -> Result<Box<dyn CatalogConnection>, String> {
        let opts = self.opts.clone();
        let call_timeout = self.call_timeout;

        // A hung connect would otherwise run until the invocation's hard
        // wall-clock limit; every catalog call gets the same bound.
        let conn = tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                tokio::time::timeout(call_timeout, mysql_async::Conn::new(opts))
                    .await
                    .map_err(|_| "timed out connecting to catalog database".to_string())?
                    .map_err(|error| format!("failed to connect to catalog database: {error}"))
            })
        })?;

        Ok(Box::new(MySqlCatalogConnection {
            conn: Some(conn),
            call_timeout: self.call_timeout,
        }))
    }
}

struct MySqlCatalogConnection {
    conn: Option<mysql_async::Conn>,
    call_timeout: Duration,
}

impl CatalogConnection for MySqlCatalogConnection {
    fn fetch_rows(&mut self, table: &str) -> Result<Vec<CatalogRow>, String> {
        use mysql_async::prelude::*;

        let call_timeout = self.call_timeout;
        let Some(conn) = self.conn.as_mut() else {
            return Err("catalog connection is already closed".to_string());
        };

        let query = format!("SELECT name, size FROM {table}");
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let mapped = conn.query_map(query, |(object_key, expected_size): (String, i64)| {
                    CatalogRow {
                        object_key,
                        expected_size,
                    }
                });

                tokio::time::timeout(call_timeout, mapped)
                    .await
                    .map_err(|_| "catalog query timed out".to_string())?
                    .map_err(|error| format!("catalog query failed: {error}"))
            })
        })
    }

    fn close(&mut self) -> Result<(), String> {
        let call_timeout = self.call_timeout;
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                tokio::time::timeout(call_timeout, conn.disconnect())
                    .await
                    .map_err(|_| "timed out closing catalog connection".to_string())?
                    .map_err(|error| format!("failed to close catalog connection: {error}"))
            })
        })
    }
}
