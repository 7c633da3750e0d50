//! Paging and ordering.

use super::config::FinishConfig;
use crate::bindings::Bindings;
use crate::error::{ShapeError, ShapeResult};
use crate::sanitize::remove_special_symbols;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Page size used when none is requested.
pub const DEFAULT_PER_PAGE: u32 = 25;

/// Placeholder bound to the page offset.
pub const OFFSET_BINDING: &str = "offset";

/// Placeholder bound to the page size.
pub const PER_PAGE_BINDING: &str = "perPage";

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for SortOrder {
    type Err = ShapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(SortOrder::Asc),
            "DESC" => Ok(SortOrder::Desc),
            _ => Err(ShapeError::validation(format!(
                "order must be ASC or DESC, got `{s}`"
            ))),
        }
    }
}

/// Paging and sorting arguments as supplied by a caller.
///
/// `order` stays a string so an invalid value surfaces as a validation error
/// when the query is prepared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetaParams {
    pub per_page: Option<u32>,
    pub offset: Option<u32>,
    pub order: Option<String>,
    pub order_by: Option<String>,
}

impl MetaParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(field.into());
        self
    }

    /// The parsed sort order, `ASC` when none was given.
    pub fn sort_order(&self) -> ShapeResult<SortOrder> {
        self.order
            .as_deref()
            .map_or(Ok(SortOrder::default()), SortOrder::from_str)
    }
}

/// Output of [`compile_sorting`].
#[derive(Debug, Clone, PartialEq)]
pub struct Sorting {
    /// `" ORDER BY ... OFFSET :offset LIMIT :perPage"`, ordering optional.
    pub sql: String,
    pub bindings: Bindings,
}

/// Build the `ORDER BY ... OFFSET ... LIMIT ...` tail.
///
/// `order_raw` replaces every other ordering input. Otherwise `meta.order_by`
/// (sanitized, qualified by `table`) wins over the configured default columns,
/// which need `table`. Paging is always emitted.
pub fn compile_sorting(
    meta: Option<&MetaParams>,
    table: Option<&str>,
    order_raw: Option<&str>,
    config: &FinishConfig,
) -> ShapeResult<Sorting> {
    let order = meta.map_or(Ok(SortOrder::default()), MetaParams::sort_order)?;
    let order_by = meta
        .and_then(|m| m.order_by.as_deref())
        .map(remove_special_symbols)
        .filter(|f| !f.is_empty());

    let ordering = match (order_raw, order_by, table) {
        (Some(raw), _, _) => Some(raw.to_string()),
        (None, Some(field), Some(table)) => Some(format!("{table}.{field} {order}")),
        (None, Some(field), None) => Some(format!("{field} {order}")),
        (None, None, Some(table)) if !config.default_sort_columns.is_empty() => Some(
            config
                .default_sort_columns
                .iter()
                .map(|c| format!("{table}.{c} DESC"))
                .collect::<Vec<_>>()
                .join(", "),
        ),
        _ => None,
    };

    let mut sql = String::new();
    if let Some(ordering) = ordering {
        sql.push_str(" ORDER BY ");
        sql.push_str(&ordering);
    }
    sql.push_str(&format!(" OFFSET :{OFFSET_BINDING} LIMIT :{PER_PAGE_BINDING}"));

    let per_page = meta
        .and_then(|m| m.per_page)
        .unwrap_or(config.default_per_page);
    let offset = meta.and_then(|m| m.offset).unwrap_or(0);
    let bindings = Bindings::new()
        .with(PER_PAGE_BINDING, per_page)
        .with(OFFSET_BINDING, offset);

    Ok(Sorting { sql, bindings })
}
