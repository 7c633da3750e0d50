//! # pgshape
//!
//! Assemble parameterized PostgreSQL queries from declarative field schemas.
//!
//! ## Features
//!
//! - **Field graphs**: compile the fields a client asked for (explicitly or from a
//!   GraphQL selection) into one `SELECT`, with relations as nested JSON subqueries
//! - **Named bindings**: every value travels as a `:name` placeholder, never as SQL text
//! - **Query finishing**: filters, WHERE joining, grouping, ordering and paging
//! - **Row counting**: the unpaginated total is read from one `EXPLAIN ANALYZE` round trip
//! - **Transaction-friendly**: pass a transaction anywhere a `GenericClient` is expected
//!
//! ## Example
//!
//! ```ignore
//! use pgshape::{FieldSchema, MetaParams, Relation, field_graph};
//! use std::sync::Arc;
//!
//! let authors = Arc::new(
//!     FieldSchema::new("data.authors").column("name", "data.authors.name"),
//! );
//! let articles = FieldSchema::new("data.articles")
//!     .column("id", "data.articles.id")
//!     .column("title", "data.articles.title")
//!     .field("author", Relation::one(authors, "data.authors.id = data.articles.author_id"));
//!
//! let prepared = field_graph(&articles)
//!     .fields(["id", "title", "author"])
//!     .related("author", ["name"])
//!     .build()?
//!     .finish()
//!     .sorting_table("data.articles")
//!     .meta(MetaParams::new().per_page(10))
//!     .prepare(&client)
//!     .await?;
//!
//! let rows = prepared.fetch_all(&client).await?;
//! println!("{} of {}", rows.len(), prepared.total_count);
//! ```

pub mod bindings;
pub mod client;
pub mod condition;
pub mod error;
pub mod finish;
pub mod graph;
pub mod sanitize;
pub mod search;
pub mod selection;
pub mod value;

pub use bindings::Bindings;
pub use client::GenericClient;
pub use condition::{ConditionFragment, WhereClause, join_conditions};
pub use error::{ShapeError, ShapeResult};
pub use finish::config::FinishConfig;
pub use finish::count::{count_rows, parse_actual_rows};
pub use finish::filter::{FilterRule, FilterRules, Filters, compile_filters};
pub use finish::meta::{MetaParams, SortOrder, compile_sorting};
pub use finish::{CompiledQuery, PrepareQuery, PreparedQuery, prepare_query};
pub use graph::schema::{Cardinality, Column, FieldSchema, FieldSpec, Relation};
pub use graph::{FieldGraph, SelectGraph, create_sql_query_for_builder, field_graph};
pub use sanitize::remove_special_symbols;
pub use search::search_condition;
pub use selection::{RequestedFields, SelectedField};
pub use value::Value;

#[cfg(feature = "graphql")]
pub use selection::parse_selection;
