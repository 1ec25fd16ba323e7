use serde::Deserialize;
use std::path::Path;

use crate::error::ConfigError;
use crate::state::shell::Theme;

pub const API_BASE_URL_ENV: &str = "KLAW_API_BASE_URL";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_log_tail_lines")]
    pub log_tail_lines: u32,
    #[serde(default)]
    pub default_theme: Theme,
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

fn default_listen_port() -> u16 {
    9090
}

fn default_api_base_url() -> String {
    "http://127.0.0.1:8080/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_log_tail_lines() -> u32 {
    100
}

fn default_session_idle_secs() -> u64 {
    30 * 60
}

fn default_static_dir() -> String {
    "static".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_port: default_listen_port(),
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            log_tail_lines: default_log_tail_lines(),
            default_theme: Theme::default(),
            session_idle_secs: default_session_idle_secs(),
            static_dir: default_static_dir(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut cfg = Self::parse(&data)?;

        if let Ok(url) = std::env::var(API_BASE_URL_ENV) {
            if !url.is_empty() {
                cfg.api_base_url = url;
            }
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn parse(data: &str) -> Result<Self, ConfigError> {
        // An empty file means "all defaults".
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(data)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "api_base_url must be an http(s) url, got {:?}",
                self.api_base_url
            )));
        }
        if self.log_tail_lines == 0 {
            return Err(ConfigError::Invalid("log_tail_lines must be positive".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.listen_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_for_empty_file() {
        let cfg = Config::parse("").unwrap();
        assert_eq!(cfg.listen_port, 9090);
        assert_eq!(cfg.api_base_url, "http://127.0.0.1:8080/api");
        assert_eq!(cfg.log_tail_lines, 100);
        assert_eq!(cfg.default_theme, Theme::Light);
        assert_eq!(cfg.listen_addr(), "0.0.0.0:9090");
    }

    #[test]
    fn parses_overrides() {
        let cfg = Config::parse(
            "listen_port: 8000\napi_base_url: https://klaw.internal/api\nlog_tail_lines: 500\ndefault_theme: dark\n",
        )
        .unwrap();
        assert_eq!(cfg.listen_port, 8000);
        assert_eq!(cfg.api_base_url, "https://klaw.internal/api");
        assert_eq!(cfg.log_tail_lines, 500);
        assert_eq!(cfg.default_theme, Theme::Dark);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_non_http_base_url() {
        let cfg = Config::parse("api_base_url: ftp://example.com\n").unwrap();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_zero_tail_lines() {
        let cfg = Config::parse("log_tail_lines: 0\n").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "listen_port: 7070").unwrap();
        writeln!(file, "session_idle_secs: 60").unwrap();

        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.listen_port, 7070);
        assert_eq!(cfg.session_idle_secs, 60);
    }

    #[test]
    fn load_missing_file_is_read_error() {
        let err = Config::load(Path::new("/nonexistent/klaw-console.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn bad_yaml_is_parse_error() {
        assert!(matches!(
            Config::parse("listen_port: [not a port"),
            Err(ConfigError::Parse(_))
        ));
    }
}
