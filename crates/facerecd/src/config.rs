use std::path::{Path, PathBuf};

use facerec_core::LoadPolicy;
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Daemon configuration.
///
/// Read from the TOML file named by `FACEREC_CONFIG` when set, then
/// overridden field by field from `FACEREC_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listen address (default: 0.0.0.0:8080).
    pub bind: String,
    /// Directory of reference pictures enrolled at startup; file stem = label.
    pub faces_dir: PathBuf,
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
    /// Skip reference pictures without exactly one face instead of refusing to start.
    pub skip_invalid_faces: bool,
    /// Maximum accepted request body size in bytes.
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            faces_dir: PathBuf::from("/root/faces"),
            model_dir: facerec_core::default_model_dir(),
            skip_invalid_faces: false,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Config {
    /// Load the optional config file and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let base = match std::env::var("FACEREC_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        Ok(base.with_overrides(|key| std::env::var(key).ok()))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `FACEREC_*` overrides looked up through `var`. Unparsable values are ignored.
    pub fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(bind) = var("FACEREC_BIND") {
            self.bind = bind;
        }
        if let Some(dir) = var("FACEREC_FACES_DIR") {
            self.faces_dir = PathBuf::from(dir);
        }
        if let Some(dir) = var("FACEREC_MODEL_DIR") {
            self.model_dir = PathBuf::from(dir);
        }
        if let Some(skip) = var("FACEREC_SKIP_INVALID_FACES").and_then(|v| parse_bool(&v)) {
            self.skip_invalid_faces = skip;
        }
        if let Some(max) = var("FACEREC_MAX_UPLOAD_BYTES").and_then(|v| v.parse().ok()) {
            self.max_upload_bytes = max;
        }
        self
    }

    pub fn load_policy(&self) -> LoadPolicy {
        if self.skip_invalid_faces {
            LoadPolicy::Skip
        } else {
            LoadPolicy::Abort
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default().with_overrides(vars(&[]));
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(config.faces_dir, PathBuf::from("/root/faces"));
        assert!(!config.skip_invalid_faces);
        assert_eq!(config.load_policy(), LoadPolicy::Abort);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::default().with_overrides(vars(&[
            ("FACEREC_BIND", "127.0.0.1:9000"),
            ("FACEREC_FACES_DIR", "/srv/faces"),
            ("FACEREC_MODEL_DIR", "/srv/models"),
            ("FACEREC_SKIP_INVALID_FACES", "1"),
            ("FACEREC_MAX_UPLOAD_BYTES", "1024"),
        ]));
        assert_eq!(config.bind, "127.0.0.1:9000");
        assert_eq!(config.faces_dir, PathBuf::from("/srv/faces"));
        assert_eq!(config.model_dir, PathBuf::from("/srv/models"));
        assert_eq!(config.load_policy(), LoadPolicy::Skip);
        assert_eq!(config.max_upload_bytes, 1024);
    }

    #[test]
    fn test_bad_env_values_are_ignored() {
        let config = Config::default().with_overrides(vars(&[
            ("FACEREC_SKIP_INVALID_FACES", "maybe"),
            ("FACEREC_MAX_UPLOAD_BYTES", "lots"),
        ]));
        assert!(!config.skip_invalid_faces);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn test_file_then_env() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("facerec.toml");
        std::fs::write(
            &path,
            "bind = \"127.0.0.1:7000\"\nfaces_dir = \"/data/faces\"\nskip_invalid_faces = true\n",
        )
        .unwrap();

        let config = Config::from_file(&path)
            .unwrap()
            .with_overrides(vars(&[("FACEREC_BIND", "127.0.0.1:7001")]));

        assert_eq!(config.bind, "127.0.0.1:7001");
        assert_eq!(config.faces_dir, PathBuf::from("/data/faces"));
        assert!(config.skip_invalid_faces);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn test_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("facerec.toml");
        std::fs::write(&path, "bind = [").unwrap();

        assert!(matches!(Config::from_file(&path), Err(ConfigError::Parse { .. })));
        assert!(matches!(
            Config::from_file(&dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
