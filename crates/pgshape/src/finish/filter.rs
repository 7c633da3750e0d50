//! Declarative filter rules.
//!
//! A [`FilterRules`] table maps public filter names to the column (or custom
//! SQL) they constrain. Caller-supplied [`Filters`] are compiled against it
//! into one [`ConditionFragment`] per filter.

use crate::condition::ConditionFragment;
use crate::error::{ShapeError, ShapeResult};
use crate::value::Value;
use indexmap::IndexMap;
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Caller-supplied filter values, in the order they were given.
pub type Filters = IndexMap<String, Value>;

/// Filter rules keyed by public filter name.
pub type FilterRules = IndexMap<String, FilterRule>;

static VALUE_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":value\b").expect("valid placeholder regex"));

/// How one filter value becomes a WHERE fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    pub table: String,
    pub field: String,
    /// Custom SQL using `:value` for the filter value. When absent the rule
    /// compiles to `<table>.<field> = :<filter name>`.
    #[serde(default)]
    pub query: Option<String>,
}

impl FilterRule {
    /// An equality rule on `table.field`.
    pub fn eq(table: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            field: field.into(),
            query: None,
        }
    }

    /// A rule with a custom SQL template.
    pub fn custom(
        table: impl Into<String>,
        field: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            field: field.into(),
            query: Some(query.into()),
        }
    }

    fn render(&self, key: &str) -> String {
        match &self.query {
            Some(template) => VALUE_PLACEHOLDER
                .replace_all(template, NoExpand(&format!(":{key}")))
                .into_owned(),
            None => format!("{}.{} = :{key}", self.table, self.field),
        }
    }
}

/// Compile every filter into a fragment bound under the filter's own name.
///
/// Every key must have a rule; an unknown key is a configuration error rather
/// than a silently ignored filter.
pub fn compile_filters(filters: &Filters, rules: &FilterRules) -> ShapeResult<Vec<ConditionFragment>> {
    filters
        .iter()
        .map(|(key, value)| {
            let rule = rules.get(key).ok_or_else(|| {
                ShapeError::configuration(format!("no filter rule configured for `{key}`"))
            })?;
            Ok(ConditionFragment::new(rule.render(key)).bind(key.clone(), value.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> FilterRules {
        let mut rules = FilterRules::new();
        rules.insert("isPublished".into(), FilterRule::eq("data.articles", "is_published"));
        rules.insert(
            "titleLike".into(),
            FilterRule::custom("data.articles", "title", "data.articles.title ILIKE :value"),
        );
        rules.insert(
            "tag".into(),
            FilterRule::custom("data.tags", "name", ":value = ANY(data.articles.tags) OR :values_x"),
        );
        rules
    }

    #[test]
    fn one_fragment_per_filter_in_order() {
        let mut filters = Filters::new();
        filters.insert("titleLike".into(), Value::from("%rust%"));
        filters.insert("isPublished".into(), Value::from(true));

        let fragments = compile_filters(&filters, &rules()).unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(
            fragments[0].query.as_deref(),
            Some("data.articles.title ILIKE :titleLike")
        );
        assert_eq!(
            fragments[1].query.as_deref(),
            Some("data.articles.is_published = :isPublished")
        );
        for (fragment, key) in fragments.iter().zip(filters.keys()) {
            assert_eq!(fragment.bindings.len(), 1);
            assert!(fragment.bindings.contains(key));
        }
    }

    #[test]
    fn template_substitutes_whole_placeholder_only() {
        let mut filters = Filters::new();
        filters.insert("tag".into(), Value::from("db"));
        let fragments = compile_filters(&filters, &rules()).unwrap();
        assert_eq!(
            fragments[0].query.as_deref(),
            Some(":tag = ANY(data.articles.tags) OR :values_x")
        );
    }

    #[test]
    fn unknown_filter_is_configuration_error() {
        let mut filters = Filters::new();
        filters.insert("nope".into(), Value::from(1));
        let err = compile_filters(&filters, &rules()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn rules_deserialize_from_json() {
        let rules: FilterRules = serde_json::from_str(
            r#"{"isPublished": {"table": "data.articles", "field": "is_published"}}"#,
        )
        .unwrap();
        assert_eq!(rules["isPublished"], FilterRule::eq("data.articles", "is_published"));
    }
}
