use std::env;
use std::path::PathBuf;

/// Configuration for payload staging
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Directory where temp files are created (default: OS temp dir)
    pub temp_dir: PathBuf,

    /// Filename prefix for staged payloads (default: "latex")
    pub temp_prefix: String,

    /// Name of the form/multipart field carrying the payload (default: "payload")
    pub field_name: String,

    /// Maximum request payload size in bytes (default: 64 MB)
    pub max_payload_size: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            temp_dir: env::temp_dir(),
            temp_prefix: "latex".to_string(),
            field_name: "payload".to_string(),
            max_payload_size: 64 * 1024 * 1024, // 64 MB
        }
    }
}

impl UploadConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            temp_dir: env::var("PAYLOAD_TEMP_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(default.temp_dir),

            temp_prefix: env::var("PAYLOAD_TEMP_PREFIX").unwrap_or(default.temp_prefix),

            field_name: env::var("PAYLOAD_FIELD")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(default.field_name),

            max_payload_size: env::var("MAX_PAYLOAD_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_payload_size),
        }
    }

    /// Create config for development (small limits, staging under the OS temp dir)
    pub fn development() -> Self {
        Self {
            temp_dir: env::temp_dir().join("payload-echo"),
            temp_prefix: "dev".to_string(),
            field_name: "payload".to_string(),
            max_payload_size: 8 * 1024 * 1024,
        }
    }

    /// Stage into `dir` instead of the configured temp directory
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    /// Body limit for the HTTP layer, with headroom for multipart framing
    pub fn body_limit(&self) -> usize {
        self.max_payload_size.saturating_add(64 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = UploadConfig::default();
        assert_eq!(config.temp_dir, env::temp_dir());
        assert_eq!(config.temp_prefix, "latex");
        assert_eq!(config.field_name, "payload");
        assert_eq!(config.max_payload_size, 64 * 1024 * 1024);
    }

    #[test]
    fn test_development_config() {
        let config = UploadConfig::development();
        assert!(config.temp_dir.starts_with(env::temp_dir()));
        assert_eq!(config.max_payload_size, 8 * 1024 * 1024);
    }

    #[test]
    fn test_with_temp_dir_overrides() {
        let config = UploadConfig::default().with_temp_dir("/srv/staging");
        assert_eq!(config.temp_dir, PathBuf::from("/srv/staging"));
        assert_eq!(config.temp_prefix, "latex");
    }

    #[test]
    fn test_body_limit_adds_headroom() {
        let config = UploadConfig {
            max_payload_size: 1024,
            ..UploadConfig::default()
        };
        assert_eq!(config.body_limit(), 1024 + 64 * 1024);

        let config = UploadConfig {
            max_payload_size: usize::MAX,
            ..UploadConfig::default()
        };
        assert_eq!(config.body_limit(), usize::MAX);
    }

    #[test]
    fn test_from_env_temp_dir() {
        unsafe { env::set_var("PAYLOAD_TEMP_DIR", "/var/tmp/payloads") };
        let config = UploadConfig::from_env();
        unsafe { env::remove_var("PAYLOAD_TEMP_DIR") };
        assert_eq!(config.temp_dir, PathBuf::from("/var/tmp/payloads"));
    }
}
