use crate::compare::Scalar;
use crate::error::Result;
use crate::schema::Platform;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type Record = BTreeMap<String, Option<Scalar>>;

/// Runs query text against one platform. Connections, credentials and
/// retries belong to the implementation.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    fn platform(&self) -> Platform;

    async fn query(&self, sql: &str) -> Result<QueryResult>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<Scalar>>>,
}

impl QueryResult {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn with_row(mut self, row: Vec<Option<Scalar>>) -> Self {
        self.rows.push(row);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows keyed by lower-cased column name. Short rows yield NULL for the
    /// trailing columns.
    pub fn records(&self) -> Vec<Record> {
        let names: Vec<String> = self.columns.iter().map(|c| c.to_lowercase()).collect();
        self.rows
            .iter()
            .map(|row| {
                names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| (name.clone(), row.get(i).cloned().flatten()))
                    .collect()
            })
            .collect()
    }

    pub fn first_record(&self) -> Option<Record> {
        self.records().into_iter().next()
    }
}
