//! Row counting through `EXPLAIN ANALYZE`.
//!
//! The filtered query is executed once in analyze mode and the executed row
//! count of the outermost plan node is read back from the plan text. This
//! avoids writing a second, structurally different `COUNT(*)` query.

use crate::bindings::{Bindings, params_ref};
use crate::client::GenericClient;
use crate::error::{ShapeError, ShapeResult};
use regex::Regex;
use std::sync::LazyLock;

// Matches `(actual time=0.010..0.012 rows=42 loops=1)` as well as the
// `TIMING OFF` form `(actual rows=42 loops=1)`. Newer servers print
// fractional row counts (`rows=42.00`); the integer part is taken.
static ACTUAL_ROWS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"actual (?:time=\S+ )?rows=(\d+)").expect("valid actual-rows regex")
});

/// Read the executed row count of the outermost plan node.
///
/// The outermost node is the first line of the plan. Fails with an execution
/// error when that line carries no `actual ... rows=N` annotation.
pub fn parse_actual_rows<S: AsRef<str>>(plan: &[S]) -> ShapeResult<u64> {
    let top = plan
        .iter()
        .flat_map(|row| row.as_ref().lines())
        .next()
        .ok_or_else(|| ShapeError::execution("EXPLAIN ANALYZE returned an empty plan"))?;

    let rows = ACTUAL_ROWS
        .captures(top)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| {
            ShapeError::execution(format!("no actual row count in plan line `{top}`"))
        })?;

    rows.as_str().parse().map_err(|e| {
        ShapeError::execution(format!("invalid row count `{}`: {e}", rows.as_str()))
    })
}

/// Count the rows `query` would return, without paging.
///
/// `query` must not carry `ORDER BY`/`OFFSET`/`LIMIT` yet.
pub async fn count_rows(
    client: &impl GenericClient,
    query: &str,
    bindings: &Bindings,
) -> ShapeResult<u64> {
    let explain = format!("EXPLAIN ANALYZE {query}");
    let (sql, values) = bindings.to_positional(&explain)?;
    let params = params_ref(&values);

    tracing::debug!(target: "pgshape.sql", sql = %sql, param_count = params.len(), "counting rows");

    let plan = client.query_plan(&sql, &params).await?;
    let total = parse_actual_rows(&plan)?;

    tracing::debug!(target: "pgshape.sql", total, "row count estimated");
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_outermost_node() {
        let plan = [
            "Hash Join  (cost=1.09..2.22 rows=5 width=36) (actual time=0.031..0.036 rows=3 loops=1)",
            "  ->  Seq Scan on articles a  (cost=0.00..1.05 rows=5 width=36) (actual time=0.005..0.006 rows=5 loops=1)",
            "Planning Time: 0.120 ms",
        ];
        assert_eq!(parse_actual_rows(&plan).unwrap(), 3);
    }

    #[test]
    fn reads_timing_off_and_fractional_forms() {
        assert_eq!(
            parse_actual_rows(&["Seq Scan on t  (cost=0.00..1.05 rows=5 width=4) (actual rows=12 loops=1)"])
                .unwrap(),
            12
        );
        assert_eq!(
            parse_actual_rows(&["Seq Scan on t  (cost=0.00..1.05 rows=5 width=4) (actual time=0.004..0.005 rows=7.00 loops=1)"])
                .unwrap(),
            7
        );
    }

    #[test]
    fn reads_single_multiline_row() {
        let plan = ["Aggregate  (actual time=0.1..0.1 rows=1 loops=1)\n  ->  Seq Scan (actual time=0.0..0.0 rows=9 loops=1)"];
        assert_eq!(parse_actual_rows(&plan).unwrap(), 1);
    }

    #[test]
    fn plain_explain_output_is_execution_error() {
        let err = parse_actual_rows(&["Seq Scan on t  (cost=0.00..1.05 rows=5 width=4)"]).unwrap_err();
        assert!(err.is_execution());
    }

    #[test]
    fn empty_plan_is_execution_error() {
        let err = parse_actual_rows::<&str>(&[]).unwrap_err();
        assert!(err.is_execution());
    }
}
