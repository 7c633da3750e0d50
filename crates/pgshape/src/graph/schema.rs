//! Per-model field schemas.
//!
//! A [`FieldSchema`] describes how every logical field of a model is realized
//! in SQL. Schemas are built once at startup and shared read-only; relations
//! hold their target schema behind an `Arc` so one schema can be referenced
//! from many parents.
//!
//! # Example
//!
//! ```ignore
//! use pgshape::{Column, FieldSchema, Relation};
//! use std::sync::Arc;
//!
//! let authors = Arc::new(
//!     FieldSchema::new("data.authors")
//!         .column("id", "data.authors.id")
//!         .column("name", "data.authors.name"),
//! );
//!
//! let articles = FieldSchema::new("data.articles")
//!     .column("id", "data.articles.id")
//!     .field(
//!         "price",
//!         Column::new("data.prices.amount AS price")
//!             .join("LEFT JOIN data.prices ON data.prices.article_id = data.articles.id")
//!             .filter("data.prices.currency = :currency")
//!             .bind("currency", "EUR"),
//!     )
//!     .field(
//!         "author",
//!         Relation::one(authors, "data.authors.id = data.articles.author_id"),
//!     );
//! ```

use crate::condition::ConditionFragment;
use crate::value::Value;
use indexmap::IndexMap;
use std::sync::Arc;

/// Declarative description of one model's selectable fields.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    table_name: String,
    fields: IndexMap<String, FieldSpec>,
}

impl FieldSchema {
    /// Start a schema for `table_name` (schema-qualified, optionally aliased,
    /// e.g. `data.articles AS a`).
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            fields: IndexMap::new(),
        }
    }

    /// Declare a field. Declaration order is the order of the emitted SELECT list.
    pub fn field(mut self, name: impl Into<String>, spec: impl Into<FieldSpec>) -> Self {
        self.fields.insert(name.into(), spec.into());
        self
    }

    /// Declare a plain column field selected as `select`.
    pub fn column(self, name: impl Into<String>, select: impl Into<String>) -> Self {
        self.field(name, Column::new(select))
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// How a single field is realized.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSpec {
    Column(Column),
    Relation(Relation),
}

impl From<Column> for FieldSpec {
    fn from(column: Column) -> Self {
        FieldSpec::Column(column)
    }
}

impl From<Relation> for FieldSpec {
    fn from(relation: Relation) -> Self {
        FieldSpec::Relation(relation)
    }
}

/// A field selected from the model's own row (possibly through joins).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Column {
    pub(crate) select: Vec<String>,
    pub(crate) joins: Vec<String>,
    pub(crate) condition: Option<ConditionFragment>,
}

impl Column {
    /// A column selected by one SQL expression, normally aliased
    /// (`data.articles.title` or `lower(a.title) AS title`).
    pub fn new(select: impl Into<String>) -> Self {
        Self {
            select: vec![select.into()],
            ..Self::default()
        }
    }

    /// Add another select expression.
    pub fn select(mut self, expr: impl Into<String>) -> Self {
        self.select.push(expr.into());
        self
    }

    /// Add a JOIN clause needed by the select expressions.
    pub fn join(mut self, clause: impl Into<String>) -> Self {
        self.joins.push(clause.into());
        self
    }

    /// Add an implicit WHERE condition applied whenever this field is requested.
    pub fn filter(mut self, query: impl Into<String>) -> Self {
        let fragment = self.condition.take().unwrap_or_default();
        self.condition = Some(ConditionFragment {
            query: Some(query.into()),
            ..fragment
        });
        self
    }

    /// Bind a value used by this column's SQL (select, join or filter).
    ///
    /// Schema-level constants such as a default currency come in here, from
    /// the application's configuration, when the schema is built.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.condition
            .get_or_insert_with(ConditionFragment::default)
            .bindings
            .insert(name, value);
        self
    }

    pub fn select_exprs(&self) -> &[String] {
        &self.select
    }

    pub fn joins(&self) -> &[String] {
        &self.joins
    }

    pub fn condition(&self) -> Option<&ConditionFragment> {
        self.condition.as_ref()
    }
}

/// Whether a relation yields one related row or many.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// A field produced by a correlated subquery over another model.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub(crate) schema: Arc<FieldSchema>,
    pub(crate) cardinality: Cardinality,
    pub(crate) condition: ConditionFragment,
}

impl Relation {
    /// `on` ties related rows back to the parent row, e.g.
    /// `data.comments.article_id = data.articles.id`.
    pub fn new(
        schema: impl Into<Arc<FieldSchema>>,
        cardinality: Cardinality,
        on: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            cardinality,
            condition: ConditionFragment::new(on),
        }
    }

    /// A relation rendered as a JSON object (`to_jsonb`).
    pub fn one(schema: impl Into<Arc<FieldSchema>>, on: impl Into<String>) -> Self {
        Self::new(schema, Cardinality::One, on)
    }

    /// A relation rendered as a JSON array (`jsonb_agg`).
    pub fn many(schema: impl Into<Arc<FieldSchema>>, on: impl Into<String>) -> Self {
        Self::new(schema, Cardinality::Many, on)
    }

    /// Bind a value used by the correlating condition.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.condition.bindings.insert(name, value);
        self
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn condition(&self) -> &ConditionFragment {
        &self.condition
    }
}
