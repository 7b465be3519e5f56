use crate::error::{MigCheckError, Result};
use crate::schema::Platform;
use serde::{Deserialize, Serialize};
use std::fmt;

pub(crate) const ALWAYS_TRUE: &str = "1=1";

/// A qualified table reference: `owner.table` on the legacy side,
/// `database.table` on the cloud side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub qualifier: String,
    pub table: String,
}

impl TableRef {
    pub fn new(qualifier: impl Into<String>, table: impl Into<String>) -> Result<Self> {
        let qualifier = qualifier.into().trim().to_string();
        let table = table.into().trim().to_string();
        if qualifier.is_empty() || table.is_empty() {
            return Err(MigCheckError::Compilation(format!(
                "Table reference '{}.{}' must name both qualifier and table",
                qualifier, table
            )));
        }
        Ok(Self { qualifier, table })
    }

    pub fn parse(reference: &str) -> Result<Self> {
        let (qualifier, table) = reference.trim().split_once('.').ok_or_else(|| {
            MigCheckError::Compilation(format!(
                "Table reference '{}' is missing its qualifier",
                reference
            ))
        })?;
        Self::new(qualifier, table)
    }

    pub fn render(&self, platform: Platform) -> String {
        format!(
            "{}.{}",
            platform.identifier(&self.qualifier),
            platform.identifier(&self.table)
        )
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.qualifier, self.table)
    }
}

/// Missing or blank filters compile to the always-true predicate.
pub(crate) fn where_clause(filter: Option<&str>) -> String {
    match filter.map(str::trim) {
        Some(f) if !f.is_empty() => f.to_string(),
        _ => ALWAYS_TRUE.to_string(),
    }
}

/// Joins predicates with AND, skipping blanks and always-true parts.
pub fn and_predicates<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let parts: Vec<String> = parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty() && *p != ALWAYS_TRUE)
        .map(|p| format!("({})", p))
        .collect();
    if parts.is_empty() {
        ALWAYS_TRUE.to_string()
    } else {
        parts.join(" AND ")
    }
}

pub(crate) fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
