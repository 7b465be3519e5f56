use super::query::{QueryExecutor, QueryResult};
use crate::error::{MigCheckError, Result};
use crate::schema::Platform;
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum Canned {
    Rows(QueryResult),
    Fail(String),
}

/// In-memory executor answering by SQL substring. The first registered
/// pattern contained in the query wins; unmatched queries return no rows.
#[derive(Debug)]
pub struct MockExecutor {
    platform: Platform,
    responses: Vec<(String, Canned)>,
    executed: Mutex<Vec<String>>,
}

impl MockExecutor {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            responses: Vec::new(),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn with_result(mut self, pattern: impl Into<String>, result: QueryResult) -> Self {
        self.responses.push((pattern.into(), Canned::Rows(result)));
        self
    }

    pub fn with_failure(mut self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        self.responses.push((pattern.into(), Canned::Fail(message.into())));
        self
    }

    /// Every query seen so far, in arrival order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl QueryExecutor for MockExecutor {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn query(&self, sql: &str) -> Result<QueryResult> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_string());
        }
        match self.responses.iter().find(|(p, _)| sql.contains(p.as_str())) {
            Some((_, Canned::Rows(result))) => Ok(result.clone()),
            Some((pattern, Canned::Fail(message))) => {
                Err(MigCheckError::execution(self.platform, pattern.clone(), message.clone()))
            }
            None => Ok(QueryResult::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::Scalar;

    #[tokio::test]
    async fn test_mock_answers_by_pattern() {
        let mock = MockExecutor::new(Platform::Cloud)
            .with_result(
                "COUNT(*)",
                QueryResult::new(["row_count"]).with_row(vec![Some(Scalar::Int(9))]),
            )
            .with_failure("broken_table", "table not found");

        let ok = mock.query("SELECT COUNT(*) AS row_count FROM t").await.unwrap();
        assert_eq!(ok.rows.len(), 1);

        let err = mock.query("SELECT * FROM broken_table").await.unwrap_err();
        assert!(err.to_string().contains("table not found"));

        let empty = mock.query("SELECT 1").await.unwrap();
        assert!(empty.is_empty());
        assert_eq!(mock.executed().len(), 3);
    }

    #[test]
    fn test_query_without_runtime() {
        let mock = MockExecutor::new(Platform::Legacy);
        let result = tokio_test::block_on(mock.query("SELECT 1 FROM dual")).unwrap();
        assert!(result.is_empty());
        assert_eq!(mock.platform(), Platform::Legacy);
        assert_eq!(mock.executed(), vec!["SELECT 1 FROM dual".to_string()]);
    }
}
