//! Configuration for the scout application.
//!
//! One TOML file holds the scheduler settings, the API connection, an
//! optional external name corpus, and export settings. Every section is
//! optional and falls back to defaults.

use std::path::{Path, PathBuf};

use scout_search::SchedulerConfig;
use scout_search::clients::ApiConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoutError};

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "SCOUT_CONFIG_DIR";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    /// Pacing, filter, strategy and run settings.
    pub scheduler: SchedulerConfig,
    /// Search/profile service connection.
    pub api: ApiConfig,
    /// External name corpus.
    pub corpus: CorpusConfig,
    /// Where and how accepted records are written.
    pub export: ExportConfig,
}

/// External name corpus settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// File with one name per line. Blank lines and `#` comments are
    /// skipped. Names are appended to the strategy's own corpus.
    pub names_file: Option<PathBuf>,
}

/// Output file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// One pretty-printed JSON array.
    Json,
    /// One JSON object per line.
    JsonLines,
}

impl ExportFormat {
    /// File extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::JsonLines => "jsonl",
        }
    }
}

/// Export settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory output files are written to. Created if missing.
    pub output_dir: PathBuf,
    /// Formats to write; each produces one file per export.
    pub formats: Vec<ExportFormat>,
    /// File name prefix, followed by a timestamp.
    pub file_prefix: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("scout-output"),
            formats: vec![ExportFormat::Json],
            file_prefix: "profiles".into(),
        }
    }
}

impl ScoutConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| ScoutError::Config(format!("{}: {e}", path.display())))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ScoutError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from `path` if given, else from the default path if a file
    /// exists there, else defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be loaded.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        let default = Self::default_config_path();
        if default.is_file() {
            tracing::debug!(path = %default.display(), "loading default config");
            Self::from_file(&default)
        } else {
            Ok(Self::default())
        }
    }

    /// Returns the default config file path.
    ///
    /// `$SCOUT_CONFIG_DIR/config.toml` when set, otherwise
    /// `<platform config dir>/scout/config.toml`.
    pub fn default_config_path() -> PathBuf {
        Self::config_path_from(std::env::var_os(CONFIG_DIR_ENV).map(PathBuf::from))
    }

    fn config_path_from(override_dir: Option<PathBuf>) -> PathBuf {
        match override_dir {
            Some(dir) => dir.join("config.toml"),
            None => dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("scout")
                .join("config.toml"),
        }
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        self.scheduler.validate()?;
        self.api.validate()?;
        if self.export.formats.is_empty() {
            return Err(ScoutError::Config(
                "export.formats must list at least one format".into(),
            ));
        }
        if self.export.file_prefix.trim().is_empty() {
            return Err(ScoutError::Config("export.file_prefix must not be empty".into()));
        }
        Ok(())
    }

    /// The scheduler config with the external corpus merged in.
    ///
    /// # Errors
    ///
    /// Returns [`ScoutError::Corpus`] if the names file cannot be loaded,
    /// and a config error if the merged strategy is invalid.
    pub fn resolved_scheduler(&self) -> Result<SchedulerConfig> {
        let mut scheduler = self.scheduler.clone();
        if let Some(path) = &self.corpus.names_file {
            let names = load_corpus(path)?;
            tracing::info!(path = %path.display(), names = names.len(), "loaded name corpus");
            scheduler.strategy.extend_corpus(names);
        }
        scheduler.validate()?;
        Ok(scheduler)
    }
}

/// Read a name corpus: one entry per line, blank lines and `#` comments
/// skipped, surrounding whitespace trimmed.
///
/// # Errors
///
/// Returns [`ScoutError::Corpus`] if the file cannot be read or holds no
/// entries.
pub fn load_corpus(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ScoutError::Corpus(format!("{}: {e}", path.display())))?;
    let names: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect();
    if names.is_empty() {
        return Err(ScoutError::Corpus(format!(
            "{}: no names found",
            path.display()
        )));
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use scout_search::Strategy;

    #[test]
    fn default_config_is_valid() {
        let config = ScoutConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.export.formats, vec![ExportFormat::Json]);
    }

    #[test]
    fn config_path_honours_override() {
        let path = ScoutConfig::config_path_from(Some(PathBuf::from("/etc/scout-test")));
        assert_eq!(path, PathBuf::from("/etc/scout-test/config.toml"));
    }

    #[test]
    fn default_config_path_ends_with_config_toml() {
        let path = ScoutConfig::config_path_from(None);
        let path_str = path.to_string_lossy();
        assert!(path_str.ends_with("config.toml"));
        assert!(path_str.contains("scout"));
    }

    #[test]
    fn from_file_nonexistent_returns_error() {
        let result = ScoutConfig::from_file(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(ScoutError::Io(_))));
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: ScoutConfig = toml::from_str(
            r#"
            [scheduler.pacing]
            base_delay_ms = 5000

            [export]
            formats = ["json", "json_lines"]
            "#,
        )
        .unwrap();
        assert_eq!(config.scheduler.pacing.base_delay_ms, 5000);
        assert_eq!(config.scheduler.pacing.min_delay_ms, 1500);
        assert_eq!(
            config.export.formats,
            vec![ExportFormat::Json, ExportFormat::JsonLines]
        );
        assert_eq!(config.export.file_prefix, "profiles");
    }

    #[test]
    fn strategy_is_tagged_by_kind() {
        let config: ScoutConfig = toml::from_str(
            r#"
            [scheduler.strategy]
            kind = "ad_hoc"
            terms = ["gym dubai", "pt riyadh"]
            priority = "high"
            "#,
        )
        .unwrap();
        assert_eq!(config.scheduler.strategy.kind(), "ad_hoc");
    }

    #[test]
    fn empty_formats_rejected() {
        let mut config = ScoutConfig::default();
        config.export.formats.clear();
        assert!(matches!(config.validate(), Err(ScoutError::Config(_))));
    }

    #[test]
    fn invalid_pacing_rejected() {
        let mut config = ScoutConfig::default();
        config.scheduler.pacing.min_delay_ms = 20_000;
        assert!(matches!(config.validate(), Err(ScoutError::Search(_))));
    }

    #[test]
    fn resolved_scheduler_without_corpus_is_unchanged() {
        let config = ScoutConfig {
            scheduler: SchedulerConfig {
                strategy: Strategy::default(),
                ..Default::default()
            },
            ..Default::default()
        };
        let resolved = config.resolved_scheduler().unwrap();
        assert_eq!(resolved.strategy, Strategy::default());
    }
}
