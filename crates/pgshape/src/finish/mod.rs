//! Query finishing: filters, WHERE joining, grouping, counting and paging.
//!
//! # Example
//!
//! ```ignore
//! use pgshape::{MetaParams, prepare_query};
//!
//! let prepared = prepare_query("SELECT * FROM data.articles", Vec::new())
//!     .sorting_table("data.articles")
//!     .filters(filters, &ARTICLE_FILTERS)
//!     .meta(MetaParams::new().per_page(10))
//!     .prepare(&client)
//!     .await?;
//!
//! let rows = prepared.fetch_all(&client).await?;
//! ```

pub mod config;
pub mod count;
pub mod filter;
pub mod meta;

#[cfg(test)]
mod tests;

use crate::bindings::Bindings;
use crate::client::GenericClient;
use crate::condition::{ConditionFragment, join_conditions};
use crate::error::ShapeResult;
use crate::search::search_condition;
use config::FinishConfig;
use filter::{FilterRules, Filters, compile_filters};
use meta::{MetaParams, Sorting, compile_sorting};
use tokio_postgres::Row;

/// Query text and bindings, ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub query: String,
    pub bindings: Bindings,
}

impl CompiledQuery {
    /// Execute the query and return all rows.
    pub async fn fetch_all(&self, conn: &impl GenericClient) -> ShapeResult<Vec<Row>> {
        conn.query_named(&self.query, &self.bindings).await
    }
}

/// A finished, paginated query plus the unpaginated row count.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedQuery {
    pub query: String,
    pub bindings: Bindings,
    pub total_count: u64,
}

impl PreparedQuery {
    /// Execute the query and return all rows of the page.
    pub async fn fetch_all(&self, conn: &impl GenericClient) -> ShapeResult<Vec<Row>> {
        conn.query_named(&self.query, &self.bindings).await
    }
}

/// Start finishing `main_query` with its base conditions.
pub fn prepare_query<'a>(
    main_query: impl Into<String>,
    conditions: Vec<ConditionFragment>,
) -> PrepareQuery<'a> {
    PrepareQuery {
        main_query: main_query.into(),
        conditions,
        do_not_add_where: false,
        group_by: None,
        meta: None,
        order_raw: None,
        sorting_table: None,
        filters: None,
        search: None,
        config: FinishConfig::default(),
    }
}

/// Builder returned by [`prepare_query`].
#[must_use]
#[derive(Debug, Clone)]
pub struct PrepareQuery<'a> {
    main_query: String,
    conditions: Vec<ConditionFragment>,
    do_not_add_where: bool,
    group_by: Option<String>,
    meta: Option<MetaParams>,
    order_raw: Option<String>,
    sorting_table: Option<String>,
    filters: Option<(Filters, &'a FilterRules)>,
    search: Option<(Vec<String>, String)>,
    config: FinishConfig,
}

impl<'a> PrepareQuery<'a> {
    /// The base query already has a `WHERE`; conditions are appended with `AND`.
    pub fn do_not_add_where(mut self) -> Self {
        self.do_not_add_where = true;
        self
    }

    /// Append a condition to the base conditions.
    pub fn condition(mut self, condition: ConditionFragment) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Append a grouping clause (e.g. `GROUP BY a.id`) verbatim after the WHERE clause.
    pub fn group_by(mut self, group_by: impl Into<String>) -> Self {
        self.group_by = Some(group_by.into());
        self
    }

    pub fn meta(mut self, meta: MetaParams) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Like [`PrepareQuery::meta`], for optional caller arguments.
    pub fn meta_opt(mut self, meta: Option<MetaParams>) -> Self {
        self.meta = meta;
        self
    }

    /// Use `order_raw` as the `ORDER BY` expression, ignoring every other ordering input.
    pub fn order_raw(mut self, order_raw: impl Into<String>) -> Self {
        self.order_raw = Some(order_raw.into());
        self
    }

    /// Table (or alias) used to qualify `orderBy` and for the default ordering.
    pub fn sorting_table(mut self, table: impl Into<String>) -> Self {
        self.sorting_table = Some(table.into());
        self
    }

    /// Compile `filters` against `rules` into additional conditions.
    pub fn filters(mut self, filters: Filters, rules: &'a FilterRules) -> Self {
        self.filters = Some((filters, rules));
        self
    }

    /// Restrict rows to those where any of `columns` contains `text`.
    pub fn search<I, S>(mut self, columns: I, text: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search = Some((columns.into_iter().map(Into::into).collect(), text.into()));
        self
    }

    pub fn config(mut self, config: FinishConfig) -> Self {
        self.config = config;
        self
    }

    /// Base query with filters, WHERE clause and grouping applied, plus its bindings.
    fn filtered(&self) -> ShapeResult<(String, Bindings)> {
        let mut conditions = self.conditions.clone();
        if let Some((filters, rules)) = &self.filters {
            conditions.extend(compile_filters(filters, rules)?);
        }
        if let Some((columns, text)) = &self.search {
            conditions.extend(search_condition(columns.as_slice(), text));
        }

        let clause = join_conditions(&conditions, self.do_not_add_where);
        let mut query = format!("{}{}", self.main_query, clause.sql);
        if let Some(group_by) = &self.group_by {
            query.push(' ');
            query.push_str(group_by);
        }
        Ok((query, clause.bindings))
    }

    fn sorting(&self) -> ShapeResult<Sorting> {
        compile_sorting(
            self.meta.as_ref(),
            self.sorting_table.as_deref(),
            self.order_raw.as_deref(),
            &self.config,
        )
    }

    /// Finish the query without counting rows. Performs no I/O.
    pub fn build(&self) -> ShapeResult<CompiledQuery> {
        let (query, mut bindings) = self.filtered()?;
        let sorting = self.sorting()?;
        bindings.merge(&sorting.bindings);

        Ok(CompiledQuery {
            query: query + &sorting.sql,
            bindings,
        })
    }

    /// Finish the query and count the rows it matches before paging.
    ///
    /// Issues one `EXPLAIN ANALYZE` round trip through `client`. Input errors
    /// (unknown filters, an invalid order) are reported before that round trip.
    pub async fn prepare(&self, client: &impl GenericClient) -> ShapeResult<PreparedQuery> {
        let (query, mut bindings) = self.filtered()?;
        let sorting = self.sorting()?;

        let total_count = count::count_rows(client, &query, &bindings).await?;

        bindings.merge(&sorting.bindings);
        let query = query + &sorting.sql;
        tracing::debug!(
            target: "pgshape.sql",
            sql = %query,
            binding_count = bindings.len(),
            total_count,
            "prepared query"
        );

        Ok(PreparedQuery {
            query,
            bindings,
            total_count,
        })
    }
}
