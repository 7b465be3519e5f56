use serde::{Deserialize, Serialize};

pub const ENTRY_DELIMITER: &str = "||";
pub const COUNT_DELIMITER: &str = "::";

/// One `value::count` pair of a top-N frequency list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    pub value: String,
    /// `None` when the count could not be parsed.
    pub count: Option<u64>,
}

impl FrequencyEntry {
    pub fn new(value: impl Into<String>, count: u64) -> Self {
        Self {
            value: value.into(),
            count: Some(count),
        }
    }
}

/// Parses `v1::c1||v2::c2`. The count is taken after the last `::` so that
/// values containing the delimiter survive.
pub fn parse_frequency(text: &str) -> Vec<FrequencyEntry> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    text.split(ENTRY_DELIMITER)
        .map(|item| match item.rsplit_once(COUNT_DELIMITER) {
            Some((value, count)) => FrequencyEntry {
                value: value.to_string(),
                count: count.trim().parse::<u64>().ok(),
            },
            None => FrequencyEntry {
                value: item.to_string(),
                count: None,
            },
        })
        .collect()
}

pub fn render_frequency(entries: &[FrequencyEntry]) -> String {
    entries
        .iter()
        .map(|e| match e.count {
            Some(c) => format!("{}{}{}", e.value, COUNT_DELIMITER, c),
            None => e.value.clone(),
        })
        .collect::<Vec<_>>()
        .join(ENTRY_DELIMITER)
}
