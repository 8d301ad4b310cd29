use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Evaluation output the inspector reads when no path is given.
pub const DEFAULT_INSPECT_LOG: &str = "OpenHands/evaluation/evaluation_outputs/outputs/princeton-nlp__SWE-bench-test/CodeActAgent/qwen2.5-coder_7b_maxiter_25/output.jsonl";

/// Top-level configuration loaded from evalreport.toml.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ReportConfig {
    pub compare: CompareConfig,
    pub inspect: InspectConfig,
}

impl ReportConfig {
    /// Load config from a TOML file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let config: ReportConfig =
                    toml::from_str(&contents).map_err(|e| ConfigError::Parse {
                        path: path.to_path_buf(),
                        source: e,
                    })?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Apply CLI overrides. CLI values take precedence over file/default
    /// values when present (Some).
    pub fn apply_cli_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(ref p) = overrides.output {
            self.compare.output = p.clone();
        }
        if let Some(ref p) = overrides.inspect_log {
            self.inspect.log = p.clone();
        }
    }
}

/// CLI values that override config file settings.
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub output: Option<PathBuf>,
    pub inspect_log: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CompareConfig {
    /// Where the rendered report is written.
    pub output: PathBuf,
    /// Instance ids listed per change bucket before "+N more".
    pub id_preview_limit: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InspectConfig {
    pub log: PathBuf,
    pub preview_chars: usize,
    pub max_agent_messages: usize,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("comparison_report.txt"),
            id_preview_limit: 10,
        }
    }
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            log: PathBuf::from(DEFAULT_INSPECT_LOG),
            preview_chars: 300,
            max_agent_messages: 10,
        }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(
                    f,
                    "failed to read config file {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Parse { path, source } => {
                write!(
                    f,
                    "failed to parse config file {}: {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ReportConfig::default();
        assert_eq!(
            config.compare.output,
            PathBuf::from("comparison_report.txt")
        );
        assert_eq!(config.compare.id_preview_limit, 10);
        assert_eq!(config.inspect.log, PathBuf::from(DEFAULT_INSPECT_LOG));
        assert_eq!(config.inspect.preview_chars, 300);
        assert_eq!(config.inspect.max_agent_messages, 10);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = ReportConfig::load(Path::new("/nonexistent/evalreport.toml")).unwrap();
        assert_eq!(config.compare.id_preview_limit, 10);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("evalreport.toml");
        std::fs::write(
            &path,
            "[compare]\nid_preview_limit = 25\n\n[inspect]\npreview_chars = 80\n",
        )
        .unwrap();
        let config = ReportConfig::load(&path).unwrap();
        assert_eq!(config.compare.id_preview_limit, 25);
        assert_eq!(
            config.compare.output,
            PathBuf::from("comparison_report.txt")
        );
        assert_eq!(config.inspect.preview_chars, 80);
        assert_eq!(config.inspect.max_agent_messages, 10);
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("evalreport.toml");
        std::fs::write(&path, "[compare\noutput = ").unwrap();
        let err = ReportConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = ReportConfig::default();
        let overrides = CliOverrides {
            output: Some(PathBuf::from("out/report.txt")),
            inspect_log: Some(PathBuf::from("runs/output.jsonl")),
        };
        config.apply_cli_overrides(&overrides);
        assert_eq!(config.compare.output, PathBuf::from("out/report.txt"));
        assert_eq!(config.inspect.log, PathBuf::from("runs/output.jsonl"));
    }

    #[test]
    fn test_empty_overrides_keep_config() {
        let mut config = ReportConfig::default();
        config.apply_cli_overrides(&CliOverrides::default());
        assert_eq!(
            config.compare.output,
            PathBuf::from("comparison_report.txt")
        );
    }
}
