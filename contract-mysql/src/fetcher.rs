use contract::criteria::LookupCriteria;
use contract::error::ContractResult;
use contract::fetch::RecordFetcher;
use contract::types::Record;
use contract_config::shared::MySqlConnectionConfig;
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

use crate::convert::row_to_record;
use crate::error::{connection_error, query_error};
use crate::query::build_select;

/// Fetches records from a MySQL database.
///
/// The fetcher owns a current-thread runtime and a single-connection pool, and blocks on every
/// query. Lookups are issued one at a time, in the order the verifier asks for them.
#[derive(Debug)]
pub struct MySqlRecordFetcher {
    runtime: Runtime,
    pool: MySqlPool,
}

impl MySqlRecordFetcher {
    /// Connects to the configured database.
    ///
    /// `acquire_timeout` bounds how long a query waits for the connection.
    pub fn connect(
        config: &MySqlConnectionConfig,
        acquire_timeout: Duration,
    ) -> ContractResult<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;

        let pool = runtime
            .block_on(
                MySqlPoolOptions::new()
                    .min_connections(0)
                    .max_connections(1)
                    .acquire_timeout(acquire_timeout)
                    .connect_with(config.with_db()),
            )
            .map_err(connection_error)?;

        info!(
            host = %config.host,
            port = config.port,
            database = %config.name,
            "connected to source database"
        );

        Ok(Self { runtime, pool })
    }
}

impl RecordFetcher for MySqlRecordFetcher {
    fn fetch_records(
        &self,
        collection: &str,
        criteria: &LookupCriteria,
    ) -> ContractResult<Vec<Record>> {
        let sql = build_select(collection, criteria);
        debug!(
            %sql,
            params = ?criteria.values().collect::<Vec<_>>(),
            "executing lookup query"
        );

        let mut query = sqlx::query(&sql);
        for value in criteria.values() {
            query = query.bind(value);
        }

        let rows = self
            .runtime
            .block_on(query.fetch_all(&self.pool))
            .map_err(query_error)?;

        let records = rows
            .iter()
            .map(row_to_record)
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_error)?;

        debug!(collection, rows = records.len(), "lookup query returned");

        Ok(records)
    }
}

impl Drop for MySqlRecordFetcher {
    fn drop(&mut self) {
        self.runtime.block_on(self.pool.close());
    }
}
