//! WHERE-clause fragments and the joiner that merges them.

use crate::bindings::Bindings;
use crate::value::Value;

/// A SQL boolean expression plus the bindings it needs.
///
/// `query` may be absent when the fragment only carries bindings used by SQL
/// text elsewhere (e.g. a constant referenced from a select expression).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionFragment {
    pub query: Option<String>,
    pub bindings: Bindings,
}

impl ConditionFragment {
    /// A fragment with SQL text and no bindings yet.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            bindings: Bindings::new(),
        }
    }

    /// A fragment that only carries bindings.
    pub fn bindings_only(bindings: Bindings) -> Self {
        Self {
            query: None,
            bindings,
        }
    }

    /// Add a binding to this fragment.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bindings.insert(name, value);
        self
    }

    /// SQL text, if any non-blank text is present.
    pub fn sql(&self) -> Option<&str> {
        self.query.as_deref().filter(|q| !q.trim().is_empty())
    }
}

/// Output of [`join_conditions`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    /// `" WHERE (a) AND (b)"`, `" AND (a) AND (b)"` or empty.
    pub sql: String,
    pub bindings: Bindings,
}

/// Join fragments into one clause: each query is parenthesized and joined by
/// `AND`; bindings are merged with later fragments winning on collision.
///
/// With `do_not_add_where` the clause starts with `" AND "` for base queries
/// that already carry their own `WHERE`.
pub fn join_conditions(fragments: &[ConditionFragment], do_not_add_where: bool) -> WhereClause {
    let mut bindings = Bindings::new();
    let mut parts = Vec::new();

    for fragment in fragments {
        if let Some(sql) = fragment.sql() {
            parts.push(format!("({sql})"));
        }
        bindings.merge(&fragment.bindings);
    }

    let sql = if parts.is_empty() {
        String::new()
    } else {
        let keyword = if do_not_add_where { " AND " } else { " WHERE " };
        format!("{keyword}{}", parts.join(" AND "))
    };

    WhereClause { sql, bindings }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn where_prefix_and_parentheses() {
        let clause = join_conditions(
            &[
                ConditionFragment::new("a.x = :x").bind("x", 1),
                ConditionFragment::new("a.y > 2 OR a.y < 0"),
            ],
            false,
        );
        assert_eq!(clause.sql, " WHERE (a.x = :x) AND (a.y > 2 OR a.y < 0)");
        assert_eq!(clause.bindings, Bindings::new().with("x", 1));
    }

    #[test]
    fn and_prefix_when_base_has_where() {
        let clause = join_conditions(&[ConditionFragment::new("a.x = 1")], true);
        assert_eq!(clause.sql, " AND (a.x = 1)");
    }

    #[test]
    fn empty_list_yields_empty_clause_in_both_modes() {
        assert_eq!(join_conditions(&[], false).sql, "");
        assert_eq!(join_conditions(&[], true).sql, "");
    }

    #[test]
    fn binding_only_fragments_add_no_text() {
        let clause = join_conditions(
            &[ConditionFragment::bindings_only(Bindings::new().with("cur", "EUR"))],
            false,
        );
        assert_eq!(clause.sql, "");
        assert_eq!(clause.bindings.get("cur"), Some(&Value::from("EUR")));
    }

    #[test]
    fn later_bindings_override_earlier() {
        let clause = join_conditions(
            &[
                ConditionFragment::bindings_only(Bindings::new().with("lang", "en")),
                ConditionFragment::new("t.lang = :lang").bind("lang", "de"),
            ],
            false,
        );
        assert_eq!(clause.bindings.get("lang"), Some(&Value::from("de")));
        assert_eq!(clause.bindings.len(), 1);
    }
}
