use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("redirect.{key} must be a 3xx status, got {status}")]
    InvalidStatus { key: &'static str, status: u16 },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Directory for JSONL logs. Unset: log to stderr only.
    pub log_dir: Option<PathBuf>,

    pub listen: Option<String>,
    pub metrics_listen: Option<String>,

    #[serde(default)]
    pub redirect: RedirectConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedirectConfig {
    pub enabled: Option<bool>,
    /// Status for GET and HEAD. Default 301.
    pub get_status: Option<u16>,
    /// Status for every other method. Default 308.
    pub other_status: Option<u16>,
}

impl AppConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Self::parse(text, "<inline>")
    }

    /// Load from file. Relative paths inside are resolved against the file's
    /// directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut cfg = Self::parse(&text, &path.display().to_string())?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        cfg.resolve_paths(base_dir);
        Ok(cfg)
    }

    fn parse(text: &str, origin: &str) -> Result<Self, ConfigError> {
        // an empty file means "all defaults"
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Self = serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("get_status", self.redirect.get_status),
            ("other_status", self.redirect.other_status),
        ];
        for (key, status) in checks {
            if let Some(status) = status {
                if !(300..400).contains(&status) {
                    return Err(ConfigError::InvalidStatus { key, status });
                }
            }
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        self.listen
            .clone()
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
    }

    pub fn metrics_addr(&self) -> String {
        self.metrics_listen
            .clone()
            .unwrap_or_else(|| "0.0.0.0:9100".to_string())
    }

    pub fn resolve_paths(&mut self, base_dir: &Path) {
        if let Some(p) = &self.log_dir {
            self.log_dir = Some(resolve_path(base_dir, p));
        }
    }
}

fn resolve_path(base_dir: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        let cfg = AppConfig::from_yaml_str("").unwrap();
        assert!(cfg.log_dir.is_none());
        assert_eq!(cfg.listen_addr(), "0.0.0.0:8080");
        assert_eq!(cfg.metrics_addr(), "0.0.0.0:9100");
        assert!(cfg.redirect.enabled.is_none());
    }

    #[test]
    fn parses_all_keys() {
        let yaml = r#"
log_dir: logs
listen: 127.0.0.1:8000
metrics_listen: 127.0.0.1:9000
redirect:
  enabled: false
  get_status: 302
  other_status: 307
"#;
        let cfg = AppConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(cfg.log_dir, Some(PathBuf::from("logs")));
        assert_eq!(cfg.listen_addr(), "127.0.0.1:8000");
        assert_eq!(cfg.metrics_addr(), "127.0.0.1:9000");
        assert_eq!(cfg.redirect.enabled, Some(false));
        assert_eq!(cfg.redirect.get_status, Some(302));
        assert_eq!(cfg.redirect.other_status, Some(307));
    }

    #[test]
    fn rejects_non_redirect_status() {
        let err = AppConfig::from_yaml_str("redirect:\n  get_status: 200\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidStatus {
                key: "get_status",
                status: 200
            }
        ));
    }

    #[test]
    fn rejects_bad_yaml() {
        let err = AppConfig::from_yaml_str("listen: [unterminated").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn relative_log_dir_follows_config_file() {
        let dir = std::env::temp_dir().join(format!("canonpath-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("canonpath.yaml");
        std::fs::write(&file, "log_dir: logs\n").unwrap();

        let cfg = AppConfig::load(&file).unwrap();
        assert_eq!(cfg.log_dir, Some(dir.join("logs")));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = AppConfig::load(Path::new("/nonexistent/canonpath.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
