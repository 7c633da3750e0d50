//! Selection extraction.
//!
//! Converts a GraphQL-style selection tree into the [`RequestedFields`] the
//! field-graph compiler consumes. Resolvers return `{ data, ... }` envelopes,
//! so the requested model fields are the children of the `data` field.

use crate::error::{ShapeError, ShapeResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Metadata field present in every GraphQL selection; never a model field.
pub const TYPENAME_FIELD: &str = "__typename";

/// Field whose children are the requested model fields.
pub const DATA_FIELD: &str = "data";

/// One selected field and its sub-selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedField {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SelectedField>,
}

impl SelectedField {
    pub fn new(name: impl Into<String>, children: Vec<SelectedField>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }

    /// A field without sub-selection.
    pub fn leaf(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    /// The direct child named `name`.
    pub fn child(&self, name: &str) -> Option<&SelectedField> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// Logical field names requested from a schema, with nested requests under
/// relation fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestedFields {
    fields: IndexMap<String, Option<RequestedFields>>,
}

impl RequestedFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request `names` without nested selections.
    pub fn flat<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut requested = Self::new();
        for name in names {
            requested.add(name);
        }
        requested
    }

    /// Request `names`, nesting the lists in `related` under the matching names.
    pub fn with_related<I, S>(names: I, related: &IndexMap<String, Vec<String>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut requested = Self::new();
        for name in names {
            let name = name.into();
            match related.get(&name) {
                Some(nested) => requested.add_nested(name, Self::flat(nested.iter().cloned())),
                None => requested.add(name),
            }
        }
        requested
    }

    /// Requested fields of a resolver's selection: the children of its `data` field.
    pub fn from_selection(resolver: &SelectedField) -> ShapeResult<Self> {
        let data = resolver.child(DATA_FIELD).ok_or_else(|| {
            ShapeError::configuration(format!(
                "selection `{}` has no `{DATA_FIELD}` field",
                resolver.name
            ))
        })?;
        Ok(Self::from_selected(&data.children))
    }

    /// Requested fields mirroring `fields`, skipping `__typename` at every level.
    pub fn from_selected(fields: &[SelectedField]) -> Self {
        let mut requested = Self::new();
        for field in fields.iter().filter(|f| f.name != TYPENAME_FIELD) {
            if field.children.is_empty() {
                requested.add(field.name.clone());
            } else {
                requested.add_nested(field.name.clone(), Self::from_selected(&field.children));
            }
        }
        requested
    }

    pub fn add(&mut self, name: impl Into<String>) {
        self.fields.entry(name.into()).or_insert(None);
    }

    /// Request `name` with `nested` under it. A name already nested keeps its
    /// fields and gains the new ones.
    pub fn add_nested(&mut self, name: impl Into<String>, nested: RequestedFields) {
        let slot = self.fields.entry(name.into()).or_insert(None);
        match slot {
            Some(existing) => existing.merge(nested),
            None => *slot = Some(nested),
        }
    }

    fn merge(&mut self, other: RequestedFields) {
        for (name, nested) in other.fields {
            match nested {
                Some(nested) => self.add_nested(name, nested),
                None => self.add(name),
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Nested request under `name`, if any.
    pub fn nested(&self, name: &str) -> Option<&RequestedFields> {
        self.fields.get(name).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Split into the flat name list and the one-level nested lists of
    /// relation fields.
    pub fn flatten(&self) -> (Vec<String>, IndexMap<String, Vec<String>>) {
        let names = self.fields.keys().cloned().collect();
        let related = self
            .fields
            .iter()
            .filter_map(|(name, nested)| {
                nested
                    .as_ref()
                    .map(|n| (name.clone(), n.fields.keys().cloned().collect()))
            })
            .collect();
        (names, related)
    }
}

/// Parse the selection of a GraphQL document's operation.
///
/// Returns the operation's root fields. Inline fragments and named fragment
/// spreads are flattened into their parent; a spread of an undefined or
/// self-including fragment is a configuration error.
#[cfg(feature = "graphql")]
pub fn parse_selection(document: &str) -> ShapeResult<Vec<SelectedField>> {
    use graphql_query::ast::{ASTContext, Definition, Document, ParseNode};
    use std::collections::HashMap;

    let ctx = ASTContext::new();
    let document = Document::parse(&ctx, document)
        .map_err(|e| ShapeError::configuration(format!("invalid GraphQL document: {e}")))?;
    let operation = document
        .operation(None)
        .map_err(|e| ShapeError::configuration(format!("no GraphQL operation: {e}")))?;

    let mut fragments = HashMap::new();
    for definition in document.definitions.iter() {
        if let Definition::Fragment(fragment) = definition {
            fragments.insert(fragment.name.name, fragment);
        }
    }

    let mut collector = SelectionCollector {
        fragments,
        expanding: Vec::new(),
    };
    collector.collect(&operation.selection_set)
}

#[cfg(feature = "graphql")]
struct SelectionCollector<'d, 'a> {
    fragments: std::collections::HashMap<&'a str, &'d graphql_query::ast::FragmentDefinition<'a>>,
    /// Fragments currently being expanded, innermost last.
    expanding: Vec<&'a str>,
}

#[cfg(feature = "graphql")]
impl<'d, 'a> SelectionCollector<'d, 'a> {
    fn collect(
        &mut self,
        set: &'d graphql_query::ast::SelectionSet<'a>,
    ) -> ShapeResult<Vec<SelectedField>> {
        use graphql_query::ast::Selection;

        let mut fields = Vec::new();
        for selection in set.selections.iter() {
            match selection {
                Selection::Field(field) => {
                    if field.name == TYPENAME_FIELD {
                        continue;
                    }
                    fields.push(SelectedField {
                        name: field.name.to_string(),
                        children: self.collect(&field.selection_set)?,
                    });
                }
                Selection::InlineFragment(fragment) => {
                    fields.extend(self.collect(&fragment.selection_set)?);
                }
                Selection::FragmentSpread(spread) => {
                    let name = spread.name.name;
                    let fragment = *self.fragments.get(name).ok_or_else(|| {
                        ShapeError::configuration(format!("fragment `{name}` is not defined"))
                    })?;
                    if self.expanding.contains(&name) {
                        return Err(ShapeError::configuration(format!(
                            "fragment `{name}` spreads itself"
                        )));
                    }
                    self.expanding.push(name);
                    let expanded = self.collect(&fragment.selection_set);
                    self.expanding.pop();
                    fields.extend(expanded?);
                }
            }
        }
        Ok(fields)
    }
}
