//! Free-text search over a set of columns.

use crate::condition::ConditionFragment;
use crate::sanitize::remove_special_symbols;

/// Placeholder name bound by [`search_condition`].
pub const SEARCH_BINDING: &str = "search";

/// Build `(c1 ILIKE :search OR c2 ILIKE :search ...)` for `text`.
///
/// The text is sanitized first; `None` is returned when nothing searchable is
/// left or no columns are given. `_` is escaped so it matches literally.
pub fn search_condition<S: AsRef<str>>(columns: &[S], text: &str) -> Option<ConditionFragment> {
    let term = remove_special_symbols(text);
    if term.is_empty() || columns.is_empty() {
        return None;
    }

    let query = columns
        .iter()
        .map(|c| format!("{} ILIKE :{SEARCH_BINDING}", c.as_ref()))
        .collect::<Vec<_>>()
        .join(" OR ");
    let pattern = format!("%{}%", term.replace('_', "\\_"));

    Some(ConditionFragment::new(query).bind(SEARCH_BINDING, pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn builds_ilike_over_all_columns() {
        let fragment = search_condition(&["a.title", "a.body"], " rust's (book) ").unwrap();
        assert_eq!(
            fragment.query.as_deref(),
            Some("a.title ILIKE :search OR a.body ILIKE :search")
        );
        assert_eq!(
            fragment.bindings.get(SEARCH_BINDING),
            Some(&Value::from("%rusts book%"))
        );
    }

    #[test]
    fn escapes_underscore() {
        let fragment = search_condition(&["a.slug"], "snake_case").unwrap();
        assert_eq!(
            fragment.bindings.get(SEARCH_BINDING),
            Some(&Value::from("%snake\\_case%"))
        );
    }

    #[test]
    fn nothing_left_after_sanitizing() {
        assert!(search_condition(&["a.title"], " %%; ").is_none());
        assert!(search_condition::<&str>(&[], "x").is_none());
    }
}
