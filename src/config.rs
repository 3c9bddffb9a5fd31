use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

/// Options that change how addresses are compared.
///
/// Passed explicitly to the identity key, the duplicate detector and the
/// missing/excess diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Lower-case the housenumber before it enters the identity key
    pub case_insensitive_housenumber: bool,
    /// Leave bare POI objects (no `building` tag) out of duplicate detection
    pub exclude_poi: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub matching: MatchConfig,
    pub update_check: UpdateCheckConfig,
    pub overpass: OverpassConfig,
    pub emapa: EmapaConfig,
    pub paths: PathsConfig,
}

/// Where the canonical copy of the street names mapping table lives.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpdateCheckConfig {
    pub enabled: bool,
    pub github_user: String,
    pub github_repo: String,
    pub github_branch: String,
    pub github_path: String,
}

impl Default for UpdateCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            github_user: "openstreetmap-polska".to_string(),
            github_repo: "gugik2osm".to_string(),
            github_branch: "main".to_string(),
            github_path: "processing/sql/data/street_names_mappings.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OverpassConfig {
    pub url: String,
    pub retries: u32,
    pub retry_pause_secs: u64,
    /// Query override for address objects; must contain `<teryt_terc>`
    pub address_query_file: Option<PathBuf>,
    /// Query override for street objects; must contain `<teryt_terc>`
    pub street_query_file: Option<PathBuf>,
}

impl OverpassConfig {
    pub fn retry_pause(&self) -> Duration {
        Duration::from_secs(self.retry_pause_secs)
    }
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            url: "https://lz4.overpass-api.de/api/interpreter".to_string(),
            retries: 5,
            retry_pause_secs: 30,
            address_query_file: None,
            street_query_file: None,
        }
    }
}

/// GUGiK index listing each commune's address exports
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmapaConfig {
    pub index_url: String,
}

impl Default for EmapaConfig {
    fn default() -> Self {
        Self {
            index_url: "https://integracja.gugik.gov.pl/daneadresowe/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl PathsConfig {
    pub fn mappings_file(&self) -> PathBuf {
        self.data_dir.join("street_names_mappings.csv")
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("out"),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.matching, MatchConfig::default());
        assert!(config.update_check.enabled);
        assert_eq!(config.overpass.retries, 5);
        assert_eq!(
            config.emapa.index_url,
            "https://integracja.gugik.gov.pl/daneadresowe/"
        );
        assert_eq!(
            config.paths.mappings_file(),
            PathBuf::from("data/street_names_mappings.csv")
        );
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml(
            r#"
            [matching]
            exclude_poi = true

            [update_check]
            enabled = false

            [overpass]
            retry_pause_secs = 2
            "#,
        )
        .unwrap();

        assert!(config.matching.exclude_poi);
        assert!(!config.matching.case_insensitive_housenumber);
        assert!(!config.update_check.enabled);
        assert_eq!(config.update_check.github_repo, "gugik2osm");
        assert_eq!(config.overpass.retry_pause(), Duration::from_secs(2));
        assert_eq!(config.overpass.retries, 5);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(Config::from_toml("[matching\nexclude_poi = 1").is_err());
    }
}
