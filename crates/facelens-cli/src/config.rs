use facelens_core::EyeIndices;
use facelens_runtime::DEFAULT_TFJS_BACKEND;
use std::path::PathBuf;

/// CLI configuration, loaded from environment variables.
pub struct Config {
    /// Accessory image drawn over the eyes. Unset means fallback markers only.
    pub overlay_asset: Option<PathBuf>,
    /// Keypoint positions of the eyes in the detector's output.
    pub eye_indices: EyeIndices,
    /// Short names of the backends the engine has factories for.
    pub backends: Vec<String>,
    /// Backend activated before any requested switch.
    pub default_backend: String,
    /// How long `render` waits for the overlay asset before drawing markers instead.
    pub asset_timeout_ms: u64,
}

impl Config {
    /// Load configuration from `FACELENS_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let defaults = EyeIndices::default();
        Self {
            overlay_asset: std::env::var("FACELENS_OVERLAY_ASSET").ok().map(PathBuf::from),
            eye_indices: EyeIndices {
                left: env_usize("FACELENS_LEFT_EYE_INDEX", defaults.left),
                right: env_usize("FACELENS_RIGHT_EYE_INDEX", defaults.right),
            },
            backends: parse_backend_list(
                &std::env::var("FACELENS_BACKENDS").unwrap_or_else(|_| "cpu,webgl,wasm".to_string()),
            ),
            default_backend: std::env::var("FACELENS_DEFAULT_BACKEND")
                .unwrap_or_else(|_| DEFAULT_TFJS_BACKEND.to_string()),
            asset_timeout_ms: env_u64("FACELENS_ASSET_TIMEOUT_MS", 2000),
        }
    }
}

pub(crate) fn parse_backend_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
