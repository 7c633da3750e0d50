//! Field-graph compilation.
//!
//! [`field_graph`] turns a [`FieldSchema`] plus the fields a caller asked for
//! into a base query and its WHERE fragments. Relation fields become
//! correlated JSON subqueries, so one round trip returns the whole graph.
//!
//! # Example
//!
//! ```ignore
//! use pgshape::field_graph;
//!
//! let graph = field_graph(&ARTICLES)
//!     .fields(["id", "title", "author"])
//!     .related("author", ["name"])
//!     .build()?;
//!
//! let prepared = graph
//!     .finish()
//!     .sorting_table("data.articles")
//!     .prepare(&client)
//!     .await?;
//! ```

mod compile;
pub mod schema;


use crate::condition::{ConditionFragment, join_conditions};
use crate::error::{ShapeError, ShapeResult};
use crate::finish::{CompiledQuery, PrepareQuery, prepare_query};
use crate::selection::{RequestedFields, SelectedField};
use indexmap::IndexMap;
use schema::FieldSchema;

/// Compiled graph: `SELECT ... FROM ... [JOIN ...]` plus its WHERE fragments.
///
/// The bindings of all fragments are gathered in one trailing, binding-only
/// fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectGraph {
    pub main_query: String,
    pub conditions: Vec<ConditionFragment>,
}

impl SelectGraph {
    /// Join the conditions onto the base query. No grouping or paging.
    pub fn to_query(&self) -> CompiledQuery {
        create_sql_query_for_builder(&self.main_query, &self.conditions)
    }

    /// Hand the graph to the query finisher.
    pub fn finish<'a>(self) -> PrepareQuery<'a> {
        prepare_query(self.main_query, self.conditions)
    }
}

/// Reduce a base query and its fragments to one `SELECT ... WHERE ...` string.
pub fn create_sql_query_for_builder(
    main_query: &str,
    conditions: &[ConditionFragment],
) -> CompiledQuery {
    let clause = join_conditions(conditions, false);
    CompiledQuery {
        query: format!("{main_query}{}", clause.sql),
        bindings: clause.bindings,
    }
}

/// Start compiling a query over `schema`.
pub fn field_graph(schema: &FieldSchema) -> FieldGraph<'_> {
    FieldGraph {
        schema,
        fields: None,
        related: IndexMap::new(),
        selection: None,
        requested: None,
    }
}

/// Builder returned by [`field_graph`].
///
/// The requested set comes from the first source given of: [`requested`],
/// [`fields`] (with [`related`]), [`selection`].
///
/// [`requested`]: FieldGraph::requested
/// [`fields`]: FieldGraph::fields
/// [`related`]: FieldGraph::related
/// [`selection`]: FieldGraph::selection
#[must_use]
#[derive(Debug, Clone)]
pub struct FieldGraph<'a> {
    schema: &'a FieldSchema,
    fields: Option<Vec<String>>,
    related: IndexMap<String, Vec<String>>,
    selection: Option<&'a SelectedField>,
    requested: Option<RequestedFields>,
}

impl<'a> FieldGraph<'a> {
    /// Explicit top-level field names.
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Nested field names for the relation field `name`.
    pub fn related<I, S>(mut self, name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.related
            .insert(name.into(), fields.into_iter().map(Into::into).collect());
        self
    }

    /// A resolver's selection; its `data` children are the requested fields.
    pub fn selection(mut self, selection: &'a SelectedField) -> Self {
        self.selection = Some(selection);
        self
    }

    /// A fully resolved requested-field tree.
    pub fn requested(mut self, requested: RequestedFields) -> Self {
        self.requested = Some(requested);
        self
    }

    fn resolve(&self) -> ShapeResult<RequestedFields> {
        if let Some(requested) = &self.requested {
            return Ok(requested.clone());
        }
        if let Some(fields) = &self.fields {
            return Ok(RequestedFields::with_related(fields.iter().cloned(), &self.related));
        }
        match self.selection {
            Some(selection) => RequestedFields::from_selection(selection),
            None => Err(ShapeError::configuration(format!(
                "no fields or selection given for `{}`",
                self.schema.table_name()
            ))),
        }
    }

    pub fn build(&self) -> ShapeResult<SelectGraph> {
        let requested = self.resolve()?;
        if requested.is_empty() {
            return Err(ShapeError::configuration(format!(
                "empty field set requested from `{}`",
                self.schema.table_name()
            )));
        }

        let graph = compile::compile(self.schema, &requested)?;
        tracing::debug!(
            target: "pgshape.sql",
            sql = %graph.main_query,
            condition_count = graph.conditions.len(),
            "compiled field graph"
        );
        Ok(graph)
    }
}
