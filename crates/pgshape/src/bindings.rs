//! Named placeholder bindings.
//!
//! All emitted SQL uses `:name` placeholders. [`Bindings`] keeps the values in
//! insertion order and rewrites the SQL into the `$1, $2, ...` form that
//! `tokio-postgres` understands right before execution.

use crate::error::{ShapeError, ShapeResult};
use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio_postgres::types::ToSql;

/// An ordered placeholder-name → value map.
///
/// Inserting an existing name replaces its value (last write wins).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bindings(IndexMap<String, Value>);

impl Bindings {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Bind `name`, replacing any earlier value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    /// Builder-style [`Bindings::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merge `other` into `self`; values from `other` win on collision.
    pub fn merge(&mut self, other: &Bindings) {
        for (name, value) in &other.0 {
            self.0.insert(name.clone(), value.clone());
        }
    }

    /// Rewrite `:name` placeholders in `sql` to `$n` and collect the values in
    /// parameter order.
    ///
    /// A name used more than once maps to the same `$n`. `::` casts are left
    /// untouched, as is text inside quotes (including `E'...'` and `$tag$`
    /// strings) and comments.
    pub fn to_positional<'a>(&'a self, sql: &str) -> ShapeResult<(String, Vec<&'a Value>)> {
        let mut out = String::with_capacity(sql.len());
        let mut order: IndexMap<&str, usize> = IndexMap::new();
        let mut values = Vec::new();

        let bytes = sql.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            let c = bytes[i];
            match c {
                b'\'' | b'"' => {
                    let end = find_closing(bytes, i + 1, c);
                    out.push_str(&sql[i..end]);
                    i = end;
                }
                b'E' | b'e' if bytes.get(i + 1) == Some(&b'\'') && !follows_ident(bytes, i) => {
                    let end = find_escaped_closing(bytes, i + 2);
                    out.push_str(&sql[i..end]);
                    i = end;
                }
                b'-' if bytes.get(i + 1) == Some(&b'-') => {
                    let end = sql[i..].find('\n').map_or(bytes.len(), |p| i + p);
                    out.push_str(&sql[i..end]);
                    i = end;
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    let end = find_comment_end(bytes, i + 2);
                    out.push_str(&sql[i..end]);
                    i = end;
                }
                b'$' if !follows_ident(bytes, i) && dollar_tag(bytes, i).is_some() => {
                    let end = dollar_tag(bytes, i)
                        .map(|tag_end| {
                            let tag = &sql[i..tag_end];
                            sql[tag_end..]
                                .find(tag)
                                .map_or(bytes.len(), |p| tag_end + p + tag.len())
                        })
                        .unwrap_or(bytes.len());
                    out.push_str(&sql[i..end]);
                    i = end;
                }
                b':' if bytes.get(i + 1) == Some(&b':') => {
                    out.push_str("::");
                    i += 2;
                }
                b':' if bytes.get(i + 1).is_some_and(|b| is_ident_start(*b)) => {
                    let start = i + 1;
                    let mut end = start;
                    while end < bytes.len() && is_ident_char(bytes[end]) {
                        end += 1;
                    }
                    let name = &sql[start..end];
                    let idx = match order.get(name) {
                        Some(idx) => *idx,
                        None => {
                            let (key, value) = self.0.get_key_value(name).ok_or_else(|| {
                                ShapeError::configuration(format!(
                                    "no binding supplied for placeholder :{name}"
                                ))
                            })?;
                            values.push(value);
                            order.insert(key.as_str(), values.len());
                            values.len()
                        }
                    };
                    out.push('$');
                    out.push_str(&idx.to_string());
                    i = end;
                }
                _ => {
                    let ch_len = utf8_len(c);
                    out.push_str(&sql[i..i + ch_len]);
                    i += ch_len;
                }
            }
        }

        Ok((out, values))
    }
}

/// Borrow positional values as `tokio-postgres` parameter refs.
pub(crate) fn params_ref<'a>(values: &[&'a Value]) -> Vec<&'a (dyn ToSql + Sync)> {
    values.iter().map(|v| *v as &(dyn ToSql + Sync)).collect()
}

/// Index just past the quote closing a literal opened before `from`.
/// Doubled quotes are escapes; an unterminated literal runs to the end.
fn find_closing(bytes: &[u8], mut from: usize, quote: u8) -> usize {
    while from < bytes.len() {
        if bytes[from] == quote {
            if bytes.get(from + 1) == Some(&quote) {
                from += 2;
                continue;
            }
            return from + 1;
        }
        from += 1;
    }
    bytes.len()
}

/// Like [`find_closing`] for `E'...'` strings, where a backslash escapes the
/// next byte.
fn find_escaped_closing(bytes: &[u8], mut from: usize) -> usize {
    while from < bytes.len() {
        match bytes[from] {
            b'\\' => from += 2,
            b'\'' if bytes.get(from + 1) == Some(&b'\'') => from += 2,
            b'\'' => return from + 1,
            _ => from += 1,
        }
    }
    bytes.len()
}

/// Index just past the `*/` closing a block comment opened before `from`.
/// Block comments nest.
fn find_comment_end(bytes: &[u8], mut from: usize) -> usize {
    let mut depth = 1;
    while from < bytes.len() {
        match (bytes[from], bytes.get(from + 1)) {
            (b'/', Some(b'*')) => {
                depth += 1;
                from += 2;
            }
            (b'*', Some(b'/')) => {
                depth -= 1;
                from += 2;
                if depth == 0 {
                    return from;
                }
            }
            _ => from += 1,
        }
    }
    bytes.len()
}

/// End of a `$tag$` dollar-quote opener starting at `at`. `$1` style
/// positional markers are not openers.
fn dollar_tag(bytes: &[u8], at: usize) -> Option<usize> {
    let mut end = at + 1;
    if bytes.get(end).is_some_and(|b| !is_ident_start(*b) && *b != b'$') {
        return None;
    }
    while end < bytes.len() && is_ident_char(bytes[end]) {
        end += 1;
    }
    (bytes.get(end) == Some(&b'$')).then_some(end + 1)
}

fn follows_ident(bytes: &[u8], at: usize) -> bool {
    at > 0 && (is_ident_char(bytes[at - 1]) || bytes[at - 1] == b'$')
}

fn is_ident_start(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphabetic()
}

fn is_ident_char(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}

fn utf8_len(first: u8) -> usize {
    match first {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        _ => 4,
    }
}

impl<K, V> FromIterator<(K, V)> for Bindings
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<'a> IntoIterator for &'a Bindings {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
