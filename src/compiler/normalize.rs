//! Canonical text renderings applied to every column before row hashing.
//!
//! Both dialects must produce byte-identical strings for equal data, so every
//! rule draws its precision and pseudo-null vocabulary from one shared
//! [`NormalizeOptions`] value.
//!
//! - Numeric: NULL or zero becomes `'0'`, otherwise rounded fixed-point text
//!   with grouping separators removed. Legacy zero and cloud NULL therefore
//!   hash identically.
//! - Text: upper-cased, trimmed, control characters removed, whitespace runs
//!   collapsed, pseudo-null tokens mapped to NULL.
//! - Date: `YYYY-MM-DD`. Timestamp: `YYYY-MM-DD HH:MM:SS.mmm`.
//! - Anything else falls back to the text rule.

use super::table::quote_literal;
use crate::schema::{ColumnSpec, Platform, TypeFamily};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DECIMALS: u32 = 3;

pub const PSEUDO_NULL_TOKENS: &[&str] = &[
    "", "NULL", "NUL", "NONE", "N/A", "<NA>", "EMPTY", "NIL", ".",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    pub decimals: u32,
    pub pseudo_nulls: Vec<String>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            decimals: DEFAULT_DECIMALS,
            pseudo_nulls: PSEUDO_NULL_TOKENS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl NormalizeOptions {
    fn token_list(&self) -> String {
        self.pseudo_nulls
            .iter()
            .map(|t| quote_literal(t))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn legacy_number_mask(&self) -> String {
        if self.decimals == 0 {
            "FM9999999999999999990".to_string()
        } else {
            format!("FM9999999999999990.{}", "0".repeat(self.decimals as usize))
        }
    }
}

/// Normalization expression for `column` under the given type family.
///
/// The family is passed separately so that both sides of a column pair can be
/// rendered under one agreed family.
pub fn normalize_expr(column: &ColumnSpec, family: TypeFamily, opts: &NormalizeOptions) -> String {
    let platform = column.platform;
    let ident = column.identifier();
    match family {
        TypeFamily::Numeric => numeric_expr(platform, &ident, opts),
        TypeFamily::Date => date_expr(platform, &ident),
        TypeFamily::Timestamp => timestamp_expr(platform, &ident),
        TypeFamily::Text | TypeFamily::Other => {
            let source = if column.family() == TypeFamily::Text {
                match platform {
                    Platform::Legacy => ident,
                    Platform::Cloud => format!("CAST({} AS VARCHAR)", ident),
                }
            } else {
                platform.to_text(&ident)
            };
            text_expr(platform, &source, opts)
        }
    }
}

fn numeric_expr(platform: Platform, c: &str, opts: &NormalizeOptions) -> String {
    let d = opts.decimals;
    match platform {
        Platform::Legacy => format!(
            "CASE WHEN {c} IS NULL OR {c} = 0 THEN '0' \
             ELSE REPLACE(TO_CHAR(ROUND({c}, {d}), '{mask}', \
             'NLS_NUMERIC_CHARACTERS=''.,'''), ',', '') END",
            c = c,
            d = d,
            mask = opts.legacy_number_mask(),
        ),
        // Adding 0.0 folds negative zero produced by rounding.
        Platform::Cloud => format!(
            "CASE WHEN {c} IS NULL OR CAST({c} AS DOUBLE) = 0 THEN '0' \
             ELSE replace(format('%.{d}f', round(CAST({c} AS DOUBLE), {d}) + 0.0), ',', '') END",
            c = c,
            d = d,
        ),
    }
}

fn text_expr(platform: Platform, source: &str, opts: &NormalizeOptions) -> String {
    let cleaned = match platform {
        Platform::Legacy => format!(
            "TRIM(REGEXP_REPLACE(REGEXP_REPLACE(UPPER(TRIM({})), '[[:cntrl:]]', ''), \
             '[[:space:]]+', ' '))",
            source
        ),
        Platform::Cloud => format!(
            "trim(regexp_replace(regexp_replace(upper(trim({})), '\\p{{Cntrl}}', ''), \
             '\\s+', ' '))",
            source
        ),
    };
    format!(
        "CASE WHEN {cleaned} IN ({tokens}) THEN NULL ELSE {cleaned} END",
        cleaned = cleaned,
        tokens = opts.token_list(),
    )
}

fn date_expr(platform: Platform, c: &str) -> String {
    format!(
        "CASE WHEN {c} IS NULL THEN NULL ELSE {fmt} END",
        c = c,
        fmt = platform.format_day(c)
    )
}

fn timestamp_expr(platform: Platform, c: &str) -> String {
    let fmt = match platform {
        Platform::Legacy => format!("TO_CHAR({}, 'YYYY-MM-DD HH24:MI:SS.FF3')", c),
        Platform::Cloud => format!("format_datetime({}, 'yyyy-MM-dd HH:mm:ss.SSS')", c),
    };
    format!("CASE WHEN {c} IS NULL THEN NULL ELSE {fmt} END", c = c, fmt = fmt)
}

/// Family both sides of a pair are normalized under.
///
/// Differing temporal families meet at the coarser date rule; any other
/// disagreement falls back to text.
pub fn shared_family(legacy: TypeFamily, cloud: TypeFamily) -> TypeFamily {
    match (legacy, cloud) {
        (a, b) if a == b => a,
        (TypeFamily::Date, TypeFamily::Timestamp) | (TypeFamily::Timestamp, TypeFamily::Date) => {
            TypeFamily::Date
        }
        _ => TypeFamily::Text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy(name: &str, ty: &str) -> ColumnSpec {
        ColumnSpec::new(Platform::Legacy, name, ty)
    }

    fn cloud(name: &str, ty: &str) -> ColumnSpec {
        ColumnSpec::new(Platform::Cloud, name, ty)
    }

    fn expr(col: &ColumnSpec) -> String {
        normalize_expr(col, col.family(), &NormalizeOptions::default())
    }

    #[test]
    fn test_legacy_numeric_rule() {
        let e = expr(&legacy("balance", "NUMBER(12,2)"));
        assert!(e.contains("WHEN BALANCE IS NULL OR BALANCE = 0 THEN '0'"));
        assert!(e.contains("ROUND(BALANCE, 3)"));
        assert!(e.contains("FM9999999999999990.000"));
        assert!(e.contains("REPLACE("));
    }

    #[test]
    fn test_cloud_numeric_rule() {
        let e = expr(&cloud("balance", "decimal(12,2)"));
        assert!(e.contains("WHEN balance IS NULL OR CAST(balance AS DOUBLE) = 0 THEN '0'"));
        assert!(e.contains("format('%.3f'"));
        assert!(e.contains("round(CAST(balance AS DOUBLE), 3)"));
    }

    #[test]
    fn test_custom_decimals_apply_to_both_dialects() {
        let opts = NormalizeOptions {
            decimals: 5,
            ..Default::default()
        };
        let l = normalize_expr(&legacy("p", "NUMBER"), TypeFamily::Numeric, &opts);
        let c = normalize_expr(&cloud("p", "double"), TypeFamily::Numeric, &opts);
        assert!(l.contains("ROUND(P, 5)"));
        assert!(l.contains(".00000'"));
        assert!(c.contains("%.5f"));
        assert!(c.contains("round(CAST(p AS DOUBLE), 5)"));

        let zero = NormalizeOptions {
            decimals: 0,
            ..Default::default()
        };
        let l = normalize_expr(&legacy("p", "NUMBER"), TypeFamily::Numeric, &zero);
        assert!(!l.contains("0.'"));
    }

    #[test]
    fn test_text_rule_steps() {
        let l = expr(&legacy("status", "VARCHAR2(10)"));
        assert!(l.contains("UPPER(TRIM(STATUS))"));
        assert!(l.contains("[[:cntrl:]]"));
        assert!(l.contains("[[:space:]]+"));

        let c = expr(&cloud("status", "varchar(10)"));
        assert!(c.contains("upper(trim(CAST(status AS VARCHAR)))"));
        assert!(c.contains("\\p{Cntrl}"));
        assert!(c.contains("\\s+"));
    }

    #[test]
    fn test_pseudo_null_token_parity() {
        let l = expr(&legacy("status", "VARCHAR2(10)"));
        let c = expr(&cloud("status", "string"));
        let tokens = NormalizeOptions::default().token_list();
        assert!(l.contains(&tokens));
        assert!(c.contains(&tokens));
        let expected = [
            "'NULL'", "'NUL'", "'NONE'", "'N/A'", "'<NA>'", "'EMPTY'", "'NIL'", "'.'", "''",
        ];
        for token in expected {
            assert!(l.contains(token), "legacy missing {}", token);
            assert!(c.contains(token), "cloud missing {}", token);
        }
    }

    #[test]
    fn test_date_and_timestamp_rules() {
        let l = expr(&legacy("open_dt", "DATE"));
        assert!(l.contains("WHEN OPEN_DT IS NULL THEN NULL"));
        assert!(l.contains("TO_CHAR(OPEN_DT, 'YYYY-MM-DD')"));
        let c = expr(&cloud("open_dt", "date"));
        assert!(c.contains("date_format(open_dt, '%Y-%m-%d')"));

        let l = expr(&legacy("load_ts", "TIMESTAMP(6)"));
        assert!(l.contains("'YYYY-MM-DD HH24:MI:SS.FF3'"));
        let c = expr(&cloud("load_ts", "timestamp"));
        assert!(c.contains("'yyyy-MM-dd HH:mm:ss.SSS'"));
    }

    #[test]
    fn test_unknown_type_falls_back_to_text() {
        let l = expr(&legacy("blob_col", "BLOB"));
        assert!(l.contains("TO_CHAR(BLOB_COL)"));
        assert!(l.contains("'N/A'"));
        let c = expr(&cloud("flag", "boolean"));
        assert!(c.contains("CAST(flag AS VARCHAR)"));
        assert!(c.contains("'N/A'"));
    }

    #[test]
    fn test_shared_family() {
        assert_eq!(
            shared_family(TypeFamily::Date, TypeFamily::Timestamp),
            TypeFamily::Date
        );
        assert_eq!(
            shared_family(TypeFamily::Numeric, TypeFamily::Numeric),
            TypeFamily::Numeric
        );
        assert_eq!(
            shared_family(TypeFamily::Numeric, TypeFamily::Text),
            TypeFamily::Text
        );
    }
}
