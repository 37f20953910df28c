use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

pub const DEFAULT_MODEL_PATH: &str = "models/puppysense.pt";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("Extended response mode requires S3_BUCKET_NAME and AWS_REGION")]
    MissingStorage,
}

/// Shape of the `/predict` success body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Top class and its raw probability.
    #[default]
    Simple,
    /// All classes as percentages, plus the stored image URL.
    Extended,
}

impl FromStr for ResponseMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(ResponseMode::Simple),
            "extended" => Ok(ResponseMode::Extended),
            other => Err(ConfigError::InvalidValue {
                key: "RESPONSE_MODE",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    pub public_base_url: Option<Url>,
    pub public_read: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub model_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub mode: ResponseMode,
    pub max_upload_bytes: usize,
    pub storage: Option<StorageConfig>,
}

/// Optional YAML file; every field may be overridden from the environment.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    model_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    mode: Option<ResponseMode>,
    max_upload_bytes: Option<usize>,
    storage: FileStorageConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileStorageConfig {
    bucket: Option<String>,
    region: Option<String>,
    public_base_url: Option<String>,
    public_read: Option<bool>,
}

impl AppConfig {
    /// Reads `PUPPYSENSE_CONFIG` (if set) and then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match lookup("PUPPYSENSE_CONFIG") {
            Some(path) => FileConfig::read(Path::new(&path))?,
            None => FileConfig::default(),
        };

        let mode = match lookup("RESPONSE_MODE") {
            Some(value) => value.parse()?,
            None => file.mode.unwrap_or_default(),
        };

        let port = match lookup("PORT") {
            Some(value) => parse_value("PORT", &value)?,
            None => file.port.unwrap_or(DEFAULT_PORT),
        };

        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(value) => parse_value("MAX_UPLOAD_BYTES", &value)?,
            None => file.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        };

        let bucket = lookup("S3_BUCKET_NAME")
            .or(file.storage.bucket)
            .filter(|b| !b.trim().is_empty());
        let region = lookup("AWS_REGION")
            .or(file.storage.region)
            .filter(|r| !r.trim().is_empty());
        let public_base_url = match lookup("S3_PUBLIC_BASE_URL").or(file.storage.public_base_url) {
            Some(raw) => Some(Url::parse(&raw).map_err(|_| ConfigError::InvalidValue {
                key: "S3_PUBLIC_BASE_URL",
                value: raw.clone(),
            })?),
            None => None,
        };
        let public_read = match lookup("S3_PUBLIC_READ") {
            Some(value) => parse_value("S3_PUBLIC_READ", &value)?,
            None => file.storage.public_read.unwrap_or(false),
        };

        let storage = match (bucket, region) {
            (Some(bucket), Some(region)) => Some(StorageConfig {
                bucket,
                region,
                public_base_url,
                public_read,
            }),
            _ => None,
        };

        if mode == ResponseMode::Extended && storage.is_none() {
            return Err(ConfigError::MissingStorage);
        }

        Ok(Self {
            model_path: lookup("MODEL_PATH")
                .map(PathBuf::from)
                .or(file.model_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            host: lookup("HOST")
                .or(file.host)
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            mode,
            max_upload_bytes,
            storage,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl FileConfig {
    fn read(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_yaml::from_str(&raw)?)
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_any_configuration() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.model_path, PathBuf::from(DEFAULT_MODEL_PATH));
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
        assert_eq!(config.mode, ResponseMode::Simple);
        assert!(config.storage.is_none());
    }

    #[test]
    fn extended_mode_requires_storage() {
        let err = AppConfig::from_lookup(lookup_from(&[("RESPONSE_MODE", "extended")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingStorage));

        let config = AppConfig::from_lookup(lookup_from(&[
            ("RESPONSE_MODE", "Extended"),
            ("S3_BUCKET_NAME", "puppy-images"),
            ("AWS_REGION", "ap-northeast-2"),
        ]))
        .unwrap();
        let storage = config.storage.unwrap();
        assert_eq!(storage.bucket, "puppy-images");
        assert!(!storage.public_read);
    }

    #[test]
    fn rejects_unknown_mode_and_bad_port() {
        assert!(matches!(
            AppConfig::from_lookup(lookup_from(&[("RESPONSE_MODE", "verbose")])),
            Err(ConfigError::InvalidValue { key: "RESPONSE_MODE", .. })
        ));
        assert!(matches!(
            AppConfig::from_lookup(lookup_from(&[("PORT", "eighty")])),
            Err(ConfigError::InvalidValue { key: "PORT", .. })
        ));
    }

    #[test]
    fn environment_overrides_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "model_path: /srv/model.pt\nport: 8081\nmode: extended\nstorage:\n  bucket: from-file\n  region: us-east-1\n  public_base_url: https://cdn.example.com/dogs/"
        )
        .unwrap();
        let path = file.path().to_string_lossy().to_string();

        let config = AppConfig::from_lookup(lookup_from(&[
            ("PUPPYSENSE_CONFIG", path.as_str()),
            ("PORT", "9000"),
            ("S3_BUCKET_NAME", "from-env"),
        ]))
        .unwrap();

        assert_eq!(config.model_path, PathBuf::from("/srv/model.pt"));
        assert_eq!(config.port, 9000);
        assert_eq!(config.mode, ResponseMode::Extended);
        let storage = config.storage.unwrap();
        assert_eq!(storage.bucket, "from-env");
        assert_eq!(storage.region, "us-east-1");
        assert_eq!(
            storage.public_base_url.unwrap().as_str(),
            "https://cdn.example.com/dogs/"
        );
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = AppConfig::from_lookup(lookup_from(&[(
            "PUPPYSENSE_CONFIG",
            "/nonexistent/puppysense.yaml",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
