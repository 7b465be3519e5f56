use crate::compare::Scalar;
use crate::compiler::HASH_ALIAS;
use crate::error::{MigCheckError, Result};
use crate::schema::Platform;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

pub const DEFAULT_SAMPLE_LIMIT: usize = 100;

pub type RowKey = Vec<Option<String>>;

/// One row's key tuple and content digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashRow {
    pub key: RowKey,
    pub hash: String,
}

impl HashRow {
    pub fn new<K: Into<String>>(
        key: impl IntoIterator<Item = Option<K>>,
        hash: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into_iter().map(|k| k.map(Into::into)).collect(),
            hash: hash.into(),
        }
    }

    /// Reads the key aliases and `hash_value` from a lower-cased record.
    pub fn from_record(
        record: &BTreeMap<String, Option<Scalar>>,
        key_aliases: &[String],
    ) -> Result<HashRow> {
        let key = key_aliases
            .iter()
            .map(|alias| {
                record
                    .get(alias)
                    .map(|v| v.as_ref().map(|s| s.to_string()))
                    .ok_or_else(|| {
                        MigCheckError::MalformedResult(format!(
                            "hash record is missing key '{}'",
                            alias
                        ))
                    })
            })
            .collect::<Result<RowKey>>()?;
        let hash = record
            .get(HASH_ALIAS)
            .and_then(|v| v.as_ref())
            .map(|v| v.to_string().to_lowercase())
            .ok_or_else(|| {
                MigCheckError::MalformedResult(format!("hash record has no '{}'", HASH_ALIAS))
            })?;
        Ok(HashRow { key, hash })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashMismatch {
    pub key: RowKey,
    pub left_hash: String,
    pub right_hash: String,
}

/// Outcome of joining two row-hash sets on their key tuple.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowHashComparison {
    pub left_rows: usize,
    pub right_rows: usize,
    pub matched: usize,
    pub hash_mismatch: usize,
    pub left_only: usize,
    pub right_only: usize,
    /// Keys occurring more than once on either side.
    pub duplicate_keys: usize,
    pub sample_mismatches: Vec<HashMismatch>,
    pub sample_left_only: Vec<RowKey>,
    pub sample_right_only: Vec<RowKey>,
}

impl RowHashComparison {
    pub fn is_match(&self) -> bool {
        self.hash_mismatch == 0 && self.left_only == 0 && self.right_only == 0
    }

    /// Full outer join on key. Rows sharing a key are paired as a multiset,
    /// equal hashes first.
    pub fn reconcile(left: &[HashRow], right: &[HashRow], sample_limit: usize) -> Self {
        let mut cmp = RowHashComparison {
            left_rows: left.len(),
            right_rows: right.len(),
            ..Default::default()
        };

        if left.is_empty() || right.is_empty() {
            cmp.left_only = left.len();
            cmp.right_only = right.len();
            cmp.sample_left_only = sample_keys(left, sample_limit);
            cmp.sample_right_only = sample_keys(right, sample_limit);
            return cmp;
        }

        let group = |rows: &[HashRow]| {
            let mut map: BTreeMap<RowKey, Vec<String>> = BTreeMap::new();
            for row in rows {
                map.entry(row.key.clone()).or_default().push(row.hash.clone());
            }
            map
        };
        let left_map = group(left);
        let right_map = group(right);
        let keys: BTreeSet<&RowKey> = left_map.keys().chain(right_map.keys()).collect();

        for key in keys {
            let mut l = left_map.get(key).cloned().unwrap_or_default();
            let mut r = right_map.get(key).cloned().unwrap_or_default();
            if l.len() > 1 || r.len() > 1 {
                cmp.duplicate_keys += 1;
            }

            l.sort();
            r.sort();
            let (l_rest, r_rest) = take_common(l, r, &mut cmp.matched);

            let paired = l_rest.len().min(r_rest.len());
            for (lh, rh) in l_rest.iter().zip(&r_rest) {
                if cmp.sample_mismatches.len() < sample_limit {
                    cmp.sample_mismatches.push(HashMismatch {
                        key: key.clone(),
                        left_hash: lh.clone(),
                        right_hash: rh.clone(),
                    });
                }
            }
            cmp.hash_mismatch += paired;

            for _ in paired..l_rest.len() {
                cmp.left_only += 1;
                if cmp.sample_left_only.len() < sample_limit {
                    cmp.sample_left_only.push(key.clone());
                }
            }
            for _ in paired..r_rest.len() {
                cmp.right_only += 1;
                if cmp.sample_right_only.len() < sample_limit {
                    cmp.sample_right_only.push(key.clone());
                }
            }
        }

        cmp
    }
}

fn sample_keys(rows: &[HashRow], limit: usize) -> Vec<RowKey> {
    rows.iter().take(limit).map(|r| r.key.clone()).collect()
}

/// Removes hashes present in both sorted lists, counting them as matched.
fn take_common(
    left: Vec<String>,
    right: Vec<String>,
    matched: &mut usize,
) -> (Vec<String>, Vec<String>) {
    let mut l_rest = Vec::new();
    let mut r_rest = Vec::new();
    let mut li = left.into_iter().peekable();
    let mut ri = right.into_iter().peekable();
    loop {
        match (li.peek(), ri.peek()) {
            (Some(a), Some(b)) if a == b => {
                *matched += 1;
                li.next();
                ri.next();
            }
            (Some(a), Some(b)) if a < b => l_rest.extend(li.next()),
            (Some(_), Some(_)) => r_rest.extend(ri.next()),
            (Some(_), None) => l_rest.extend(li.next()),
            (None, Some(_)) => r_rest.extend(ri.next()),
            (None, None) => break,
        }
    }
    (l_rest, r_rest)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum HashOutcome {
    Compared(RowHashComparison),
    NotComparable { missing_on: Vec<Platform> },
}

/// Reconciles two optional hash sets; a missing set on either side is never
/// treated as a match.
pub fn reconcile_hashes(
    scope: &str,
    left: Option<&[HashRow]>,
    right: Option<&[HashRow]>,
    sample_limit: usize,
) -> HashOutcome {
    match (left, right) {
        (Some(l), Some(r)) => {
            let cmp = RowHashComparison::reconcile(l, r, sample_limit);
            if cmp.is_match() {
                debug!(scope = %scope, rows = cmp.matched, "Row hashes match");
            } else {
                warn!(
                    scope = %scope,
                    mismatched = cmp.hash_mismatch,
                    left_only = cmp.left_only,
                    right_only = cmp.right_only,
                    "Row hash differences"
                );
            }
            HashOutcome::Compared(cmp)
        }
        _ => {
            let missing_on = [
                (Platform::Legacy, left.is_none()),
                (Platform::Cloud, right.is_none()),
            ]
            .into_iter()
            .filter(|(_, missing)| *missing)
            .map(|(p, _)| p)
            .collect();
            HashOutcome::NotComparable { missing_on }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, hash: &str) -> HashRow {
        HashRow::new([Some(id)], hash)
    }

    #[test]
    fn test_outer_join_classification() {
        let left = vec![row("1", "a"), row("2", "b")];
        let right = vec![row("1", "a"), row("3", "c")];

        let cmp = RowHashComparison::reconcile(&left, &right, DEFAULT_SAMPLE_LIMIT);

        assert_eq!(cmp.matched, 1);
        assert_eq!(cmp.hash_mismatch, 0);
        assert_eq!(cmp.left_only, 1);
        assert_eq!(cmp.right_only, 1);
        assert_eq!(cmp.sample_left_only, vec![vec![Some("2".to_string())]]);
        assert_eq!(cmp.sample_right_only, vec![vec![Some("3".to_string())]]);
        assert!(!cmp.is_match());
    }

    #[test]
    fn test_hash_mismatch_is_sampled() {
        let left: Vec<HashRow> = (0..150).map(|i| row(&i.to_string(), "x")).collect();
        let right: Vec<HashRow> = (0..150).map(|i| row(&i.to_string(), "y")).collect();
        let cmp = RowHashComparison::reconcile(&left, &right, DEFAULT_SAMPLE_LIMIT);
        assert_eq!(cmp.hash_mismatch, 150);
        assert_eq!(cmp.sample_mismatches.len(), 100);
        assert_eq!(cmp.sample_mismatches[0].left_hash, "x");
        assert_eq!(cmp.matched, 0);
    }

    #[test]
    fn test_duplicate_keys_pair_as_multiset() {
        let left = vec![row("1", "a"), row("1", "b"), row("1", "c")];
        let right = vec![row("1", "b"), row("1", "z")];
        let cmp = RowHashComparison::reconcile(&left, &right, DEFAULT_SAMPLE_LIMIT);
        assert_eq!(cmp.duplicate_keys, 1);
        assert_eq!(cmp.matched, 1);
        assert_eq!(cmp.hash_mismatch, 1);
        assert_eq!(cmp.left_only, 1);
        assert_eq!(cmp.right_only, 0);
    }

    #[test]
    fn test_empty_side_skips_join() {
        let left = vec![row("1", "a"), row("2", "b")];
        let cmp = RowHashComparison::reconcile(&left, &[], DEFAULT_SAMPLE_LIMIT);
        assert_eq!(cmp.matched, 0);
        assert_eq!(cmp.left_only, 2);
        assert_eq!(cmp.right_only, 0);

        let cmp = RowHashComparison::reconcile(&[], &[], DEFAULT_SAMPLE_LIMIT);
        assert!(cmp.is_match());
    }

    #[test]
    fn test_missing_hash_set_not_comparable() {
        let left = vec![row("1", "a")];
        assert_eq!(
            reconcile_hashes("t", Some(left.as_slice()), None, DEFAULT_SAMPLE_LIMIT),
            HashOutcome::NotComparable {
                missing_on: vec![Platform::Cloud]
            }
        );
        assert!(matches!(
            reconcile_hashes(
                "t",
                Some(left.as_slice()),
                Some(left.as_slice()),
                DEFAULT_SAMPLE_LIMIT
            ),
            HashOutcome::Compared(ref c) if c.is_match()
        ));
    }

    #[test]
    fn test_from_record() {
        let mut record: BTreeMap<String, Option<Scalar>> = BTreeMap::new();
        record.insert("acct_id".to_string(), Some(Scalar::from("42")));
        record.insert("branch".to_string(), None);
        record.insert("hash_value".to_string(), Some(Scalar::from("ABCDEF")));

        let keys = vec!["acct_id".to_string(), "branch".to_string()];
        let row = HashRow::from_record(&record, &keys).unwrap();
        assert_eq!(row.key, vec![Some("42".to_string()), None]);
        assert_eq!(row.hash, "abcdef");

        record.insert("hash_value".to_string(), None);
        assert!(HashRow::from_record(&record, &keys).is_err());
        assert!(HashRow::from_record(&record, &["missing".to_string()]).is_err());
    }
}
