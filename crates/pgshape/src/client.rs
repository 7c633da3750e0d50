//! Database driver seam.
//!
//! Query construction is driver-independent; only the count estimate and the
//! optional `fetch_all` helpers talk to the database, through [`GenericClient`].

use crate::bindings::{Bindings, params_ref};
use crate::error::{ShapeError, ShapeResult};
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// A trait that unifies database clients and transactions.
pub trait GenericClient: Send + Sync {
    /// Execute a query with `$n` placeholders and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = ShapeResult<Vec<Row>>> + Send;

    /// Execute a query written with `:name` placeholders.
    fn query_named(
        &self,
        sql: &str,
        bindings: &Bindings,
    ) -> impl std::future::Future<Output = ShapeResult<Vec<Row>>> + Send {
        async move {
            let (sql, values) = bindings.to_positional(sql)?;
            let params = params_ref(&values);
            self.query(&sql, &params).await
        }
    }

    /// Execute an `EXPLAIN` statement and return its plan, one line per row.
    ///
    /// The default implementation reads the first column of every row as text.
    fn query_plan(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = ShapeResult<Vec<String>>> + Send {
        async move {
            let rows = self.query(sql, params).await?;
            rows.iter()
                .map(|row| row.try_get::<_, String>(0).map_err(ShapeError::from))
                .collect()
        }
    }
}

impl GenericClient for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> ShapeResult<Vec<Row>> {
        Ok(tokio_postgres::Client::query(self, sql, params).await?)
    }
}

impl GenericClient for tokio_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> ShapeResult<Vec<Row>> {
        Ok(tokio_postgres::Transaction::query(self, sql, params).await?)
    }
}

#[cfg(feature = "pool")]
impl GenericClient for deadpool_postgres::Client {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> ShapeResult<Vec<Row>> {
        // Delegate to the deref target (ClientWrapper / tokio_postgres::Client).
        GenericClient::query(&**self, sql, params).await
    }
}

#[cfg(feature = "pool")]
impl GenericClient for deadpool_postgres::ClientWrapper {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> ShapeResult<Vec<Row>> {
        GenericClient::query(&**self, sql, params).await
    }
}

#[cfg(feature = "pool")]
impl GenericClient for deadpool_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> ShapeResult<Vec<Row>> {
        GenericClient::query(&**self, sql, params).await
    }
}

impl<C: GenericClient> GenericClient for &C {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> ShapeResult<Vec<Row>> {
        (**self).query(sql, params).await
    }

    async fn query_plan(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> ShapeResult<Vec<String>> {
        (**self).query_plan(sql, params).await
    }
}
