//! Versioned brand alias table.
//!
//! Source extracts spell some brands differently from the catalog
//! (`SSANG-YONG` vs `SSANGYONG`). The reconciler consults this table after
//! exact slug and name lookups fail and before it concludes a brand is
//! missing. Only explicit entries link records; fuzzy guesses go to the
//! suggestion report instead.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::slug::normalize_name;
use crate::ConfigError;

/// Highest alias file version this build understands.
pub const ALIAS_TABLE_VERSION: u32 = 1;

const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("CITROËN", "CITROEN"),
    ("CITRON", "CITROEN"),
    ("SSANG-YONG", "SSANGYONG"),
    ("DS AUTOMOBILES", "DS"),
    ("ROVER / MG", "ROVER"),
    ("FORTHING (Dongfeng)", "FORTHING"),
    ("DFSK (SERES)", "DFSK"),
    ("LDV (LEYLAND DAF)", "LDV"),
    ("LYNK & CO", "LYNK"),
    ("AUSTIN ROVER", "AUSTIN"),
    ("FORD USA", "FORD"),
    ("RENAULT TRUCKS", "RENAULT"),
];

#[derive(Debug, Deserialize)]
struct AliasFile {
    version: u32,
    #[serde(default)]
    aliases: Vec<AliasEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AliasEntry {
    pub from: String,
    pub to: String,
}

/// Map from a normalized source spelling to the canonical catalog name.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: HashMap<String, String>,
    version: u32,
}

impl AliasTable {
    /// The aliases shipped with the binary.
    #[must_use]
    pub fn builtin() -> Self {
        let entries = BUILTIN_ALIASES
            .iter()
            .map(|(from, to)| (normalize_name(from), (*to).to_string()))
            .collect();
        Self {
            entries,
            version: ALIAS_TABLE_VERSION,
        }
    }

    /// An empty table, for callers that want exact matching only.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
            version: ALIAS_TABLE_VERSION,
        }
    }

    /// Builtin aliases overlaid with the entries of a YAML alias file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or parsed, declares an
    /// unsupported version, or fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::AliasFileIo {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::builtin().merged_with_yaml(&content)
    }

    fn merged_with_yaml(mut self, content: &str) -> Result<Self, ConfigError> {
        let file: AliasFile = serde_yaml::from_str(content)?;
        if file.version == 0 || file.version > ALIAS_TABLE_VERSION {
            return Err(ConfigError::Validation(format!(
                "unsupported alias table version {}; this build reads up to {ALIAS_TABLE_VERSION}",
                file.version
            )));
        }

        let mut seen = HashMap::new();
        for entry in &file.aliases {
            let from = normalize_name(&entry.from);
            if from.is_empty() || entry.to.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "alias entries need a non-empty `from` and `to`".to_string(),
                ));
            }
            if seen.insert(from, entry.to.trim().to_string()).is_some() {
                return Err(ConfigError::Validation(format!(
                    "duplicate alias for '{}'",
                    entry.from
                )));
            }
        }

        for (from, to) in seen {
            if normalize_name(&to) == from {
                continue;
            }
            self.entries.insert(from, to);
        }
        self.version = file.version;
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (from, to) in &self.entries {
            let target = normalize_name(to);
            if let Some(next) = self.entries.get(&target) {
                if normalize_name(next) != target {
                    return Err(ConfigError::Validation(format!(
                        "alias chain '{from}' -> '{to}' -> '{next}'; point '{from}' at '{next}' directly"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Canonical name for `raw`, if the table has an entry for it.
    #[must_use]
    pub fn resolve(&self, raw: &str) -> Option<&str> {
        self.entries.get(&normalize_name(raw)).map(String::as_str)
    }

    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_resolves_known_spellings() {
        let table = AliasTable::builtin();
        assert_eq!(table.resolve("CITROËN"), Some("CITROEN"));
        assert_eq!(table.resolve("  ssang-yong "), Some("SSANGYONG"));
        assert_eq!(table.resolve("Lynk & Co"), Some("LYNK"));
        assert_eq!(table.resolve("PEUGEOT"), None);
    }

    #[test]
    fn yaml_entries_extend_and_override_builtin() {
        let yaml = r"
version: 1
aliases:
  - from: VW
    to: VOLKSWAGEN
  - from: ROVER / MG
    to: MG
";
        let table = AliasTable::builtin().merged_with_yaml(yaml).unwrap();
        assert_eq!(table.resolve("vw"), Some("VOLKSWAGEN"));
        assert_eq!(table.resolve("ROVER / MG"), Some("MG"));
        assert_eq!(table.resolve("CITROËN"), Some("CITROEN"));
    }

    #[test]
    fn yaml_self_alias_is_ignored() {
        let yaml = "version: 1\naliases:\n  - from: MERCEDES-BENZ\n    to: MERCEDES-BENZ\n";
        let table = AliasTable::empty().merged_with_yaml(yaml).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn yaml_rejects_unsupported_version() {
        let err = AliasTable::builtin()
            .merged_with_yaml("version: 9\naliases: []\n")
            .unwrap_err();
        assert!(err.to_string().contains("unsupported alias table version 9"));
    }

    #[test]
    fn yaml_rejects_duplicate_from() {
        let yaml = "version: 1\naliases:\n  - from: VW\n    to: VOLKSWAGEN\n  - from: vw\n    to: VAG\n";
        let err = AliasTable::empty().merged_with_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate alias"));
    }

    #[test]
    fn yaml_rejects_empty_names() {
        let yaml = "version: 1\naliases:\n  - from: ''\n    to: X\n";
        let err = AliasTable::empty().merged_with_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn yaml_rejects_chains() {
        let yaml = "version: 1\naliases:\n  - from: VW\n    to: VAG\n  - from: VAG\n    to: VOLKSWAGEN\n";
        let err = AliasTable::empty().merged_with_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("alias chain"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = AliasTable::load(Path::new("/nonexistent/aliases.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::AliasFileIo { .. }));
    }
}
