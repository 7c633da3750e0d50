use super::SelectGraph;
use super::schema::{Cardinality, Column, FieldSchema, FieldSpec, Relation};
use crate::bindings::Bindings;
use crate::condition::ConditionFragment;
use crate::error::{ShapeError, ShapeResult};
use crate::selection::RequestedFields;
use indexmap::IndexSet;
use std::borrow::Cow;

/// SELECT expressions, JOIN clauses and WHERE fragments collected for one
/// schema level. Each is a set: a fragment contributed by two fields is
/// emitted once.
#[derive(Debug, Default)]
struct Accumulator {
    selects: IndexSet<String>,
    joins: IndexSet<String>,
    filters: IndexSet<String>,
    bindings: Bindings,
}

impl Accumulator {
    fn add_column(&mut self, column: &Column) -> ShapeResult<()> {
        self.selects.extend(column.select.iter().cloned());
        self.joins.extend(column.joins.iter().cloned());
        if let Some(condition) = &column.condition {
            self.add_condition(condition)?;
        }
        Ok(())
    }

    fn add_condition(&mut self, condition: &ConditionFragment) -> ShapeResult<()> {
        if let Some(sql) = condition.sql() {
            self.filters.insert(sql.to_string());
        }
        self.add_bindings(&condition.bindings)
    }

    /// Identical name/value pairs collapse; a name bound to two different
    /// values cannot be expressed in one query.
    fn add_bindings(&mut self, bindings: &Bindings) -> ShapeResult<()> {
        for (name, value) in bindings {
            match self.bindings.get(name) {
                Some(existing) if existing != value => {
                    return Err(ShapeError::configuration(format!(
                        "binding `:{name}` is bound to both {existing:?} and {value:?}"
                    )));
                }
                Some(_) => {}
                None => {
                    self.bindings.insert(name, value.clone());
                }
            }
        }
        Ok(())
    }

    fn finish(self, table_name: &str) -> ShapeResult<SelectGraph> {
        if self.selects.is_empty() {
            return Err(ShapeError::configuration(format!(
                "no requested field is selectable from `{table_name}`"
            )));
        }

        let mut main_query = format!(
            "SELECT {} FROM {table_name}",
            self.selects.into_iter().collect::<Vec<_>>().join(",")
        );
        if !self.joins.is_empty() {
            main_query.push(' ');
            main_query.push_str(&self.joins.into_iter().collect::<Vec<_>>().join(" "));
        }

        let mut conditions: Vec<ConditionFragment> =
            self.filters.into_iter().map(ConditionFragment::new).collect();
        if !self.bindings.is_empty() {
            conditions.push(ConditionFragment::bindings_only(self.bindings));
        }

        Ok(SelectGraph {
            main_query,
            conditions,
        })
    }
}

/// Compile `requested` against `schema`, walking fields in declaration order.
pub(super) fn compile(schema: &FieldSchema, requested: &RequestedFields) -> ShapeResult<SelectGraph> {
    let mut acc = Accumulator::default();

    for name in requested.names() {
        if schema.get(name).is_none() {
            tracing::trace!(target: "pgshape.sql", field = name, table = schema.table_name(), "skipping unknown field");
        }
    }

    for (name, spec) in schema.fields().filter(|(name, _)| requested.contains(name)) {
        match spec {
            FieldSpec::Column(column) => acc.add_column(column)?,
            FieldSpec::Relation(relation) => match requested.nested(name) {
                Some(nested) if !nested.is_empty() => {
                    let (select, bindings) = relation_select(name, relation, nested)?;
                    acc.selects.insert(select);
                    acc.add_bindings(&bindings)?;
                }
                _ => {
                    tracing::trace!(target: "pgshape.sql", field = name, "relation requested without nested fields");
                }
            },
        }
    }

    acc.finish(schema.table_name())
}

/// Correlated subquery for one relation field, wrapped into a JSON value
/// aliased as the field name.
fn relation_select(
    name: &str,
    relation: &Relation,
    nested: &RequestedFields,
) -> ShapeResult<(String, Bindings)> {
    let mut related = compile(relation.schema(), nested)?;
    related.conditions.push(relation.condition().clone());
    let sub = related.to_query();

    let alias = output_alias(name);
    let select = match relation.cardinality() {
        Cardinality::Many => {
            let inner = output_alias(&format!("{name}_agg")).into_owned();
            format!("(SELECT jsonb_agg({inner}) FROM ({}) AS {inner}) AS {alias}", sub.query)
        }
        Cardinality::One => {
            let inner = output_alias(&format!("{name}_row")).into_owned();
            format!("(SELECT to_jsonb({inner}) FROM ({}) AS {inner}) AS {alias}", sub.query)
        }
    };
    Ok((select, sub.bindings))
}

/// Column alias that keeps `name` verbatim in the result set. Names Postgres
/// would case-fold (or reject) unquoted are double-quoted, `"` doubled.
fn output_alias(name: &str) -> Cow<'_, str> {
    let mut chars = name.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c == '_' || c.is_ascii_lowercase())
        && chars.all(|c| c == '_' || c.is_ascii_lowercase() || c.is_ascii_digit());
    if plain {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("\"{}\"", name.replace('"', "\"\"")))
    }
}
