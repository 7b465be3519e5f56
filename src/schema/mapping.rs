use super::column::{types_compatible, ColumnSpec};
use super::platform::Platform;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// One crosswalk entry linking a legacy column to its cloud counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub source_column: String,
    pub target_column: String,
    /// Tokenized / PII columns never take part in comparison.
    #[serde(default)]
    pub excluded: bool,
}

impl ColumnMapping {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source_column: source.into(),
            target_column: target.into(),
            excluded: false,
        }
    }

    pub fn excluded(mut self) -> Self {
        self.excluded = true;
        self
    }
}

/// A comparable column: mapped, present in both catalogs, not excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPair {
    pub legacy: ColumnSpec,
    pub cloud: ColumnSpec,
}

impl ColumnPair {
    /// Logical name used to key results across both platforms.
    pub fn name(&self) -> &str {
        &self.legacy.name
    }

    pub fn side(&self, platform: Platform) -> &ColumnSpec {
        match platform {
            Platform::Legacy => &self.legacy,
            Platform::Cloud => &self.cloud,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMismatch {
    pub legacy_column: String,
    pub cloud_column: String,
    pub legacy_type: String,
    pub cloud_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Crosswalk {
    pub comparable: Vec<ColumnPair>,
    pub tokenized: Vec<String>,
    pub legacy_only: Vec<String>,
    pub cloud_only: Vec<String>,
    /// Mappings naming a column absent from its catalog.
    pub dangling: Vec<ColumnMapping>,
    pub type_mismatches: Vec<TypeMismatch>,
}

impl Crosswalk {
    pub fn build(
        legacy_catalog: &[ColumnSpec],
        cloud_catalog: &[ColumnSpec],
        mappings: &[ColumnMapping],
    ) -> Self {
        let legacy_cols: HashMap<String, &ColumnSpec> = legacy_catalog
            .iter()
            .map(|c| (Platform::Legacy.identifier(&c.name), c))
            .collect();
        let cloud_cols: HashMap<String, &ColumnSpec> = cloud_catalog
            .iter()
            .map(|c| (Platform::Cloud.identifier(&c.name), c))
            .collect();

        let mut comparable: BTreeMap<String, ColumnPair> = BTreeMap::new();
        let mut tokenized = BTreeSet::new();
        let mut mapped_legacy = BTreeSet::new();
        let mut mapped_cloud = BTreeSet::new();
        let mut dangling = Vec::new();
        let mut type_mismatches = Vec::new();

        for mapping in mappings {
            let legacy_name = Platform::Legacy.identifier(&mapping.source_column);
            let cloud_name = Platform::Cloud.identifier(&mapping.target_column);
            if legacy_name.is_empty() || cloud_name.is_empty() {
                continue;
            }
            mapped_legacy.insert(legacy_name.clone());
            mapped_cloud.insert(cloud_name.clone());

            let (Some(legacy), Some(cloud)) =
                (legacy_cols.get(&legacy_name), cloud_cols.get(&cloud_name))
            else {
                dangling.push(mapping.clone());
                continue;
            };

            if mapping.excluded {
                tokenized.insert(legacy_name);
                continue;
            }

            if !types_compatible(&legacy.data_type, &cloud.data_type) {
                debug!(
                    column = %legacy_name,
                    legacy_type = %legacy.data_type,
                    cloud_type = %cloud.data_type,
                    "Type pair looks incompatible"
                );
                type_mismatches.push(TypeMismatch {
                    legacy_column: legacy_name.clone(),
                    cloud_column: cloud_name.clone(),
                    legacy_type: legacy.data_type.clone(),
                    cloud_type: cloud.data_type.clone(),
                });
            }

            comparable.insert(
                legacy_name.clone(),
                ColumnPair {
                    legacy: ColumnSpec::new(Platform::Legacy, legacy_name, &legacy.data_type),
                    cloud: ColumnSpec::new(Platform::Cloud, cloud_name, &cloud.data_type),
                },
            );
        }

        let mut legacy_only: Vec<String> = legacy_cols
            .keys()
            .filter(|c| !mapped_legacy.contains(*c))
            .cloned()
            .collect();
        legacy_only.sort();
        let mut cloud_only: Vec<String> = cloud_cols
            .keys()
            .filter(|c| !mapped_cloud.contains(*c))
            .cloned()
            .collect();
        cloud_only.sort();

        Self {
            comparable: comparable.into_values().collect(),
            tokenized: tokenized.into_iter().collect(),
            legacy_only,
            cloud_only,
            dangling,
            type_mismatches,
        }
    }

    pub fn pair(&self, name: &str) -> Option<&ColumnPair> {
        let key = Platform::Legacy.identifier(name);
        self.comparable.iter().find(|p| p.legacy.name == key)
    }

    pub fn comparable_names(&self) -> Vec<&str> {
        self.comparable.iter().map(|p| p.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.comparable.is_empty()
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

    #[test]
    fn test_crosswalk_partitions_columns() {
        let legacy_cat = vec![
            legacy("ACCT_ID", "NUMBER"),
            legacy("SSN", "VARCHAR2(9)"),
            legacy("BRANCH", "VARCHAR2(10)"),
            legacy("LEGACY_FLAG", "CHAR(1)"),
        ];
        let cloud_cat = vec![
            cloud("acct_id", "bigint"),
            cloud("ssn_token", "string"),
            cloud("branch_cd", "string"),
            cloud("load_ts", "timestamp"),
        ];
        let mappings = vec![
            ColumnMapping::new("acct_id", "ACCT_ID"),
            ColumnMapping::new("ssn", "ssn_token").excluded(),
            ColumnMapping::new("branch", "branch_cd"),
            ColumnMapping::new("closed_dt", "closed_dt"),
        ];

        let xw = Crosswalk::build(&legacy_cat, &cloud_cat, &mappings);

        assert_eq!(xw.comparable_names(), vec!["ACCT_ID", "BRANCH"]);
        assert_eq!(xw.pair("acct_id").unwrap().cloud.name, "acct_id");
        assert_eq!(xw.tokenized, vec!["SSN"]);
        assert_eq!(xw.legacy_only, vec!["LEGACY_FLAG"]);
        assert_eq!(xw.cloud_only, vec!["load_ts"]);
        assert_eq!(xw.dangling.len(), 1);
        assert!(xw.type_mismatches.is_empty());
    }

    #[test]
    fn test_crosswalk_flags_type_mismatch_but_keeps_column() {
        let xw = Crosswalk::build(
            &[legacy("OPEN_DT", "TIMESTAMP(6)")],
            &[cloud("open_dt", "date")],
            &[ColumnMapping::new("OPEN_DT", "open_dt")],
        );
        assert_eq!(xw.comparable.len(), 1);
        assert_eq!(xw.type_mismatches.len(), 1);
        assert_eq!(xw.type_mismatches[0].legacy_type, "TIMESTAMP(6)");
    }
}
