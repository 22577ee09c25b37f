use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::{Error, Result};
use crate::query::DEFAULT_PAGE_SIZE;
use crate::storage::schema::{validate_table_name, DEFAULT_TABLE};

/// Overrides the configured database path
pub const DATABASE_ENV: &str = "ARTIFACT_REGISTRY_DB";
/// Overrides the configured table name
pub const TABLE_ENV: &str = "ARTIFACT_TABLE_NAME";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// SQLite file backing the record store
    pub database: PathBuf,
    pub table: String,
    /// Create the table on open; otherwise a missing table is `ResourceMissing`
    pub create_table: bool,
    pub scan_page_size: usize,
    /// Route every mutating operation through one registry-wide lock
    pub serialize_writes: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            database: default_database_path_in(Path::new(".")),
            table: DEFAULT_TABLE.to_string(),
            create_table: true,
            scan_page_size: DEFAULT_PAGE_SIZE,
            serialize_writes: false,
        }
    }
}

impl RegistryConfig {
    /// Load the config file (or defaults when it is absent), then apply
    /// environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = load_config(path)?.unwrap_or_default();
        let config = config.with_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply `ARTIFACT_REGISTRY_DB` / `ARTIFACT_TABLE_NAME` as resolved by `lookup`
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(db) = lookup(DATABASE_ENV).filter(|v| !v.trim().is_empty()) {
            self.database = PathBuf::from(db);
        }
        if let Some(table) = lookup(TABLE_ENV).filter(|v| !v.trim().is_empty()) {
            self.table = table.trim().to_string();
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_table_name(&self.table)?;
        if self.scan_page_size == 0 {
            return Err(Error::Config("scan_page_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("artifact-registry.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".artifact-registry").join("registry.db")
}

pub fn load_config(path: Option<&Path>) -> Result<Option<RegistryConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: RegistryConfig = toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &RegistryConfig, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "config already exists at {} (use --force to overwrite)",
            path.display()
        )));
    }

    let contents = toml::to_string_pretty(config).map_err(|e| Error::Config(e.to_string()))?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RegistryConfig::default();
        assert_eq!(config.table, "artifacts_metadata");
        assert_eq!(config.scan_page_size, 100);
        assert!(config.create_table);
        assert!(!config.serialize_writes);
        assert!(config.database.ends_with("registry.db"));
    }

    #[test]
    fn test_partial_file_and_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact-registry.toml");
        std::fs::write(&path, "table = \"models_v2\"\nscan_page_size = 25\n").unwrap();

        let config = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(config.table, "models_v2");
        assert_eq!(config.scan_page_size, 25);
        assert!(config.create_table);

        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &config, true).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), Some(config));
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.toml"))).unwrap().is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = RegistryConfig::default().with_overrides(|key| match key {
            DATABASE_ENV => Some("/tmp/other.db".to_string()),
            TABLE_ENV => Some(" prod_artifacts ".to_string()),
            _ => None,
        });
        assert_eq!(config.database, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.table, "prod_artifacts");

        let untouched = RegistryConfig::default().with_overrides(|_| Some(String::new()));
        assert_eq!(untouched, RegistryConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = RegistryConfig { table: "drop table;".to_string(), ..Default::default() };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.table = "ok_table".to_string();
        config.scan_page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ensure_db_dir() {
        let dir = tempfile::tempdir().unwrap();
        let db = default_database_path_in(dir.path());
        ensure_db_dir(&db).unwrap();
        assert!(db.parent().unwrap().is_dir());
    }
}
