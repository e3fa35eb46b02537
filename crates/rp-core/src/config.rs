//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! sub-configs for the HTTP server, the transcoding engine and the form
//! defaults. Every section defaults sensibly so a completely empty `{}` file is
//! valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

/// Transcoding flags shown in the options box of a fresh form, one group per
/// line.
pub const DEFAULT_OPTIONS: &str = r#"-threads 8
-vf "pad=ceil(iw/2)*2:ceil(ih/2)*2"
-pix_fmt yuv420p
-strict experimental
-r 30
-acodec aac
-ar 44100 -ac 2
-vb 1024k
-minrate 1024k -maxrate 1024k -bufsize 1024k"#;

/// Output extension of a fresh form.
pub const DEFAULT_EXTENSION: &str = "mp4";

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub form: FormConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path. Unlike [`Config::load_or_default`]
    /// a missing or malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if let Some(ref dir) = self.server.static_dir {
            if !dir.exists() {
                warnings.push(format!(
                    "server.static_dir {} does not exist; the built-in page is served",
                    dir.display()
                ));
            }
        }

        for (name, path) in [
            ("engine.ffmpeg_path", &self.engine.ffmpeg_path),
            ("engine.ffprobe_path", &self.engine.ffprobe_path),
        ] {
            if let Some(p) = path {
                if !p.exists() {
                    warnings.push(format!(
                        "{name} {} does not exist; falling back to PATH",
                        p.display()
                    ));
                }
            }
        }

        if self.engine.timeout_secs == 0 {
            warnings.push("engine.timeout_secs is 0; every transcode will time out".into());
        }

        if self.form.default_extension.trim().is_empty() {
            warnings.push("form.default_extension is empty".into());
        }

        if self.form.max_upload_bytes == 0 {
            warnings.push("form.max_upload_bytes is 0; no file can be uploaded".into());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory with a custom `index.html` replacing the built-in form page.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            static_dir: None,
        }
    }
}

/// Transcoding engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    /// Maximum time a single transcode may run before ffmpeg is killed.
    pub timeout_secs: u64,
    /// Parent directory for per-run scratch directories (system temp dir when unset).
    pub scratch_dir: Option<PathBuf>,
    /// Pass `-hide_banner` to ffmpeg.
    pub hide_banner: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
            timeout_secs: 86_400,
            scratch_dir: None,
            hide_banner: false,
        }
    }
}

/// Initial values of the form and upload limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    pub default_options: String,
    pub default_extension: String,
    /// Largest accepted upload; clamped to the platform's address space.
    pub max_upload_bytes: u64,
}

impl FormConfig {
    /// Upload limit as a body-size bound for this platform.
    pub fn upload_limit(&self) -> usize {
        usize::try_from(self.max_upload_bytes).unwrap_or(usize::MAX)
    }
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            default_options: DEFAULT_OPTIONS.to_string(),
            default_extension: DEFAULT_EXTENSION.to_string(),
            max_upload_bytes: 2 * 1024 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_upload_limit_is_two_gib() {
        let form = FormConfig::default();
        assert_eq!(form.max_upload_bytes, 2 * 1024 * 1024 * 1024);
        assert_eq!(form.upload_limit() as u64, form.max_upload_bytes.min(usize::MAX as u64));
    }

    #[test]
    fn oversized_upload_limit_clamps() {
        let form = FormConfig {
            max_upload_bytes: u64::MAX,
            ..FormConfig::default()
        };
        assert_eq!(form.upload_limit(), usize::MAX);
    }

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.port, 8080);
        assert!(cfg.server.static_dir.is_none());
        assert_eq!(cfg.engine.timeout_secs, 86_400);
        assert_eq!(cfg.form.default_extension, "mp4");
        assert!(cfg.form.default_options.starts_with("-threads 8\n"));
    }

    #[test]
    fn default_config_no_warnings() {
        let cfg = Config::default();
        let warnings = cfg.validate();
        assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
    }

    #[test]
    fn default_preset_has_nine_lines() {
        assert_eq!(DEFAULT_OPTIONS.lines().count(), 9);
        assert!(DEFAULT_OPTIONS.contains(r#"-vf "pad=ceil(iw/2)*2:ceil(ih/2)*2""#));
        assert!(DEFAULT_OPTIONS.ends_with("-bufsize 1024k"));
    }

    #[test]
    fn parse_json_config() {
        let json = r#"{"server": {"port": 9090}, "form": {"default_extension": "webm"}}"#;
        let cfg = Config::from_json(json).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.form.default_extension, "webm");
        assert_eq!(cfg.form.default_options, DEFAULT_OPTIONS);
    }

    #[test]
    fn parse_empty_json_uses_defaults() {
        let cfg = Config::from_json("{}").unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert!(!cfg.engine.hide_banner);
    }

    #[test]
    fn parse_invalid_json_is_validation_error() {
        let err = Config::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn load_or_default_with_none() {
        let cfg = Config::load_or_default(None);
        assert_eq!(cfg.server.port, 8080);
    }

    #[test]
    fn load_or_default_with_missing_file() {
        let cfg = Config::load_or_default(Some(Path::new("/nonexistent/reelpress.json")));
        assert_eq!(cfg.server.port, 8080);
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reelpress.json");
        std::fs::write(&path, r#"{"engine": {"timeout_secs": 60}}"#).unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.engine.timeout_secs, 60);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = Config::load(Path::new("/nonexistent/reelpress.json")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn zero_timeout_warns() {
        let mut cfg = Config::default();
        cfg.engine.timeout_secs = 0;
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("timeout_secs")));
    }

    #[test]
    fn missing_tool_path_warns() {
        let mut cfg = Config::default();
        cfg.engine.ffmpeg_path = Some(PathBuf::from("/nonexistent/ffmpeg"));
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("engine.ffmpeg_path")));
    }
}
