use super::platform::Platform;
use serde::{Deserialize, Serialize};
use tracing::debug;

const LEGACY_CONTINUOUS: &[&str] = &["NUMBER", "FLOAT", "BINARY_FLOAT", "BINARY_DOUBLE"];
const CLOUD_CONTINUOUS: &[&str] = &[
    "int", "integer", "double", "decimal", "float", "bigint", "tinyint", "smallint", "real",
];

const LEGACY_NUMERIC: &[&str] = &[
    "NUMBER",
    "NUMERIC",
    "INTEGER",
    "INT",
    "FLOAT",
    "DOUBLE",
    "DECIMAL",
    "BINARY_FLOAT",
    "BINARY_DOUBLE",
];
const LEGACY_TEXT: &[&str] = &["VARCHAR", "CHAR", "RAW", "CLOB"];
const CLOUD_NUMERIC: &[&str] = &[
    "bigint", "int", "integer", "double", "float", "decimal", "real",
];
const CLOUD_TEXT: &[&str] = &["string", "varchar", "char"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnCategory {
    Continuous,
    Categorical,
}

/// Coarse type family driving the normalization rule chosen for hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeFamily {
    Numeric,
    Text,
    Date,
    Timestamp,
    Other,
}

impl TypeFamily {
    pub fn is_temporal(&self) -> bool {
        matches!(self, TypeFamily::Date | TypeFamily::Timestamp)
    }
}

/// Matches whole words of a type string. A word may carry a trailing size
/// (`VARCHAR2`) or a national-character prefix (`NVARCHAR2`), so `int`
/// matches `int` and `int4` but not `interval`.
fn contains_any(data_type: &str, keywords: &[&str]) -> bool {
    data_type
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|word| !word.is_empty())
        .any(|word| {
            let base = word.trim_end_matches(|c: char| c.is_ascii_digit());
            let unprefixed = base.strip_prefix(['N', 'n']);
            keywords.iter().any(|k| base == *k || unprefixed == Some(*k))
        })
}

/// Case-insensitive keyword match; anything unrecognized is categorical.
pub fn classify(platform: Platform, data_type: &str) -> ColumnCategory {
    let continuous = match platform {
        Platform::Legacy => contains_any(&data_type.to_uppercase(), LEGACY_CONTINUOUS),
        Platform::Cloud => contains_any(&data_type.to_lowercase(), CLOUD_CONTINUOUS),
    };
    if continuous {
        return ColumnCategory::Continuous;
    }
    if data_type.trim().is_empty() {
        debug!(platform = %platform, "Empty type string, defaulting to categorical");
    }
    ColumnCategory::Categorical
}

pub fn type_family(platform: Platform, data_type: &str) -> TypeFamily {
    match platform {
        Platform::Legacy => {
            let dt = data_type.to_uppercase();
            if dt.contains("TIMESTAMP") {
                TypeFamily::Timestamp
            } else if dt.contains("DATE") {
                TypeFamily::Date
            } else if contains_any(&dt, LEGACY_NUMERIC) {
                TypeFamily::Numeric
            } else if contains_any(&dt, LEGACY_TEXT) {
                TypeFamily::Text
            } else {
                TypeFamily::Other
            }
        }
        Platform::Cloud => {
            let dt = data_type.trim().to_lowercase();
            if dt.contains("timestamp") {
                TypeFamily::Timestamp
            } else if dt == "date" {
                TypeFamily::Date
            } else if contains_any(&dt, CLOUD_NUMERIC) {
                TypeFamily::Numeric
            } else if contains_any(&dt, CLOUD_TEXT) {
                TypeFamily::Text
            } else {
                TypeFamily::Other
            }
        }
    }
}

/// Whether a legacy type has a plausible cloud counterpart.
pub fn types_compatible(legacy_type: &str, cloud_type: &str) -> bool {
    let legacy = legacy_type.to_uppercase();
    let cloud = cloud_type.to_lowercase();

    if legacy.contains("NUMBER") {
        return contains_any(
            &cloud,
            &["double", "decimal", "bigint", "int", "integer", "smallint", "tinyint"],
        );
    }
    if contains_any(&legacy, &["VARCHAR", "CHAR"]) {
        return contains_any(&cloud, &["string", "varchar", "char"]);
    }
    if legacy.contains("DATE") && !legacy.contains("TIMESTAMP") {
        return contains_any(&cloud, &["date", "timestamp"]);
    }
    if legacy.contains("TIMESTAMP") {
        return cloud.contains("timestamp");
    }
    false
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub data_type: String,
    pub platform: Platform,
    pub category: ColumnCategory,
}

impl ColumnSpec {
    pub fn new(platform: Platform, name: impl Into<String>, data_type: impl Into<String>) -> Self {
        let data_type = data_type.into();
        let category = classify(platform, &data_type);
        Self {
            name: name.into(),
            data_type,
            platform,
            category,
        }
    }

    pub fn is_continuous(&self) -> bool {
        self.category == ColumnCategory::Continuous
    }

    pub fn family(&self) -> TypeFamily {
        type_family(self.platform, &self.data_type)
    }

    /// Column identifier in the owning platform's case convention.
    pub fn identifier(&self) -> String {
        self.platform.identifier(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_legacy_numeric_keywords() {
        assert_eq!(classify(Platform::Legacy, "NUMBER(10,2)"), ColumnCategory::Continuous);
        assert_eq!(classify(Platform::Legacy, "binary_double"), ColumnCategory::Continuous);
        assert_eq!(classify(Platform::Legacy, "VARCHAR2(20)"), ColumnCategory::Categorical);
        assert_eq!(classify(Platform::Legacy, "DATE"), ColumnCategory::Categorical);
    }

    #[test]
    fn test_classify_cloud_numeric_keywords() {
        assert_eq!(classify(Platform::Cloud, "BIGINT"), ColumnCategory::Continuous);
        assert_eq!(classify(Platform::Cloud, "decimal(18,2)"), ColumnCategory::Continuous);
        assert_eq!(classify(Platform::Cloud, "varchar"), ColumnCategory::Categorical);
        assert_eq!(classify(Platform::Cloud, "timestamp(3)"), ColumnCategory::Categorical);
    }

    #[test]
    fn test_classify_unknown_defaults_categorical() {
        assert_eq!(classify(Platform::Legacy, ""), ColumnCategory::Categorical);
        assert_eq!(classify(Platform::Cloud, "geometry"), ColumnCategory::Categorical);
    }

    #[test]
    fn test_type_family_timestamp_before_date() {
        assert_eq!(type_family(Platform::Legacy, "TIMESTAMP(6)"), TypeFamily::Timestamp);
        assert_eq!(type_family(Platform::Legacy, "DATE"), TypeFamily::Date);
        assert_eq!(type_family(Platform::Cloud, "date"), TypeFamily::Date);
        assert_eq!(type_family(Platform::Cloud, "timestamp"), TypeFamily::Timestamp);
        assert_eq!(type_family(Platform::Cloud, "varchar(10)"), TypeFamily::Text);
        assert_eq!(type_family(Platform::Legacy, "BLOB"), TypeFamily::Other);
    }

    #[test]
    fn test_types_compatible() {
        assert!(types_compatible("NUMBER(12,2)", "decimal(12,2)"));
        assert!(types_compatible("VARCHAR2(30)", "string"));
        assert!(types_compatible("DATE", "timestamp"));
        assert!(!types_compatible("TIMESTAMP(6)", "date"));
        assert!(!types_compatible("NUMBER", "varchar"));
        assert!(types_compatible("NUMBER(9)", "integer"));
        assert!(types_compatible("NVARCHAR2(40)", "varchar(40)"));
        assert!(!types_compatible("NUMBER", "interval day to second"));
    }

    #[test]
    fn test_keywords_match_whole_words() {
        assert_eq!(
            classify(Platform::Cloud, "interval day to second"),
            ColumnCategory::Categorical
        );
        assert_eq!(
            type_family(Platform::Cloud, "interval year to month"),
            TypeFamily::Other
        );
        assert_eq!(
            type_family(Platform::Legacy, "INTERVAL DAY(2) TO SECOND(6)"),
            TypeFamily::Other
        );
        assert_eq!(classify(Platform::Cloud, "int"), ColumnCategory::Continuous);
        assert_eq!(type_family(Platform::Legacy, "NCHAR(2)"), TypeFamily::Text);
        assert_eq!(type_family(Platform::Legacy, "BINARY_DOUBLE"), TypeFamily::Numeric);
    }

    #[test]
    fn test_column_spec_derives_category() {
        let col = ColumnSpec::new(Platform::Cloud, "Balance", "double");
        assert!(col.is_continuous());
        assert_eq!(col.identifier(), "balance");
        assert_eq!(col.family(), TypeFamily::Numeric);
    }
}
