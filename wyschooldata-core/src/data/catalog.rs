//! Subgroup catalog: the versioned wide-column-to-label lookup table.
//!
//! Stored as TOML so the table can be revised without touching the reshaping
//! code. Every entry names the canonical wide column, the tidy label it becomes,
//! and the provider spellings that decode into it.

use super::columns::normalize_column_name;
use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Version of the built-in catalog.
pub const SUBGROUP_CATALOG_VERSION: u32 = 1;

/// Wide column holding the row total.
pub const TOTAL_COLUMN: &str = "n_students";

/// Tidy label for the row total.
pub const TOTAL_LABEL: &str = "total_enrollment";

/// One recognized subgroup column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubgroupEntry {
    pub column: String,
    pub label: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Subgroups whose counts add up to the row total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub name: String,
    /// Member labels.
    pub members: Vec<String>,
}

/// The complete versioned catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubgroupCatalog {
    pub version: u32,
    pub entries: Vec<SubgroupEntry>,
    #[serde(default)]
    pub partitions: Vec<Partition>,
}

impl Default for SubgroupCatalog {
    fn default() -> Self {
        Self::v1()
    }
}

impl SubgroupCatalog {
    /// Parse a catalog from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let catalog: Self = toml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("subgroup catalog: {e}")))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Serialize the catalog to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse(format!("serialize subgroup catalog: {e}")))
    }

    /// Labels and columns must be unique; partitions may only name known labels.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut columns = HashSet::new();
        let mut labels = HashSet::new();
        for entry in &self.entries {
            if !columns.insert(entry.column.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate subgroup column '{}'",
                    entry.column
                )));
            }
            if !labels.insert(entry.label.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate subgroup label '{}'",
                    entry.label
                )));
            }
        }
        for partition in &self.partitions {
            if let Some(unknown) = partition
                .members
                .iter()
                .find(|m| !labels.contains(m.as_str()))
            {
                return Err(ConfigError::Invalid(format!(
                    "partition '{}' names unknown label '{unknown}'",
                    partition.name
                )));
            }
        }
        Ok(())
    }

    /// Tidy label for a canonical wide column.
    pub fn label_for(&self, column: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.column == column)
            .map(|e| e.label.as_str())
    }

    /// Canonical wide column for a provider column name, matching the column
    /// itself or any alias after normalization.
    pub fn resolve(&self, provider_column: &str) -> Option<&str> {
        let norm = normalize_column_name(provider_column);
        self.entries
            .iter()
            .filter(|e| e.column != TOTAL_COLUMN)
            .find(|e| e.column == norm || e.aliases.iter().any(|a| *a == norm))
            .map(|e| e.column.as_str())
    }

    /// Canonical column for a label.
    pub fn column_for_label(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| e.column.as_str())
    }

    /// Built-in catalog, version 1.
    pub fn v1() -> Self {
        fn entry(column: &str, aliases: &[&str]) -> SubgroupEntry {
            SubgroupEntry {
                column: column.into(),
                label: column.into(),
                aliases: aliases.iter().map(|a| a.to_string()).collect(),
            }
        }

        let race = [
            "white",
            "black",
            "hispanic",
            "asian",
            "native_american",
            "pacific_islander",
            "multiracial",
        ];

        let mut entries = vec![SubgroupEntry {
            column: TOTAL_COLUMN.into(),
            label: TOTAL_LABEL.into(),
            aliases: Vec::new(),
        }];
        entries.extend([
            entry("white", &["caucasian"]),
            entry("black", &["african_american", "black_or_african_american"]),
            entry("hispanic", &["hispanic_latino", "hispanic_or_latino", "latino"]),
            entry("asian", &[]),
            entry(
                "native_american",
                &[
                    "american_indian",
                    "american_indian_alaska_native",
                    "american_indian_or_alaska_native",
                ],
            ),
            entry(
                "pacific_islander",
                &[
                    "native_hawaiian_pacific_islander",
                    "native_hawaiian_or_other_pacific_islander",
                ],
            ),
            entry("multiracial", &["two_or_more", "two_or_more_races"]),
            entry("male", &["m"]),
            entry("female", &["f"]),
            entry("special_ed", &["sped", "students_with_disabilities"]),
            entry("lep", &["ell", "english_learners"]),
            entry(
                "econ_disadv",
                &["frl", "free_reduced_lunch", "economically_disadvantaged"],
            ),
        ]);

        Self {
            version: SUBGROUP_CATALOG_VERSION,
            entries,
            partitions: vec![
                Partition {
                    name: "race".into(),
                    members: race.iter().map(|s| s.to_string()).collect(),
                },
                Partition {
                    name: "gender".into(),
                    members: vec!["male".into(), "female".into()],
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v1_is_valid() {
        let c = SubgroupCatalog::v1();
        assert!(c.validate().is_ok());
        assert_eq!(c.version, SUBGROUP_CATALOG_VERSION);
        assert_eq!(c.label_for(TOTAL_COLUMN), Some(TOTAL_LABEL));
    }

    #[test]
    fn resolves_provider_spellings() {
        let c = SubgroupCatalog::v1();
        assert_eq!(c.resolve("Two or More Races"), Some("multiracial"));
        assert_eq!(c.resolve("AMERICAN_INDIAN"), Some("native_american"));
        assert_eq!(c.resolve("white"), Some("white"));
        assert_eq!(c.resolve("migrant"), None);
    }

    #[test]
    fn total_column_is_not_a_provider_alias() {
        let c = SubgroupCatalog::v1();
        assert_eq!(c.resolve("n_students"), None);
    }

    #[test]
    fn toml_roundtrip() {
        let c = SubgroupCatalog::v1();
        let text = c.to_toml().unwrap();
        let parsed = SubgroupCatalog::from_toml(&text).unwrap();
        assert_eq!(parsed, c);
    }

    #[test]
    fn rejects_duplicate_labels() {
        let mut c = SubgroupCatalog::v1();
        c.entries[2].label = "white".into();
        assert!(matches!(c.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_partition_with_unknown_member() {
        let mut c = SubgroupCatalog::v1();
        c.partitions[1].members.push("nonbinary".into());
        assert!(c.validate().is_err());
    }
}
