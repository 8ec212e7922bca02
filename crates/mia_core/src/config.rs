use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MiaConfig {
    pub backend: BackendConfig,
    pub user: UserConfig,
    pub chat: ChatConfig,
    pub storage: StorageConfig,
}

impl MiaConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: MiaConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        // EXPO_PUBLIC_BACKEND_URL is accepted as a fallback
        if let Ok(v) =
            std::env::var("MIA_BACKEND_URL").or_else(|_| std::env::var("EXPO_PUBLIC_BACKEND_URL"))
        {
            self.backend.base_url = v;
        }
        if let Ok(v) = std::env::var("MIA_USER_ID") {
            self.user.user_id = v;
        }
        if let Ok(v) = std::env::var("MIA_HISTORY_LIMIT") {
            if let Ok(n) = v.parse() {
                self.chat.history_limit = n;
            }
        }
        if let Ok(v) = std::env::var("MIA_DATA_DIR") {
            self.storage.data_dir = Some(PathBuf::from(v));
        }
    }

    /// Full API root, e.g. `http://localhost:8001/api`.
    pub fn api_root(&self) -> String {
        self.backend.api_root()
    }

    /// Directory for device-local state.
    pub fn data_dir(&self) -> PathBuf {
        self.storage.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("mia")
        })
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    /// Path segment every endpoint lives under.
    pub api_prefix: String,
    /// Request timeout. `None` keeps the transport default.
    pub timeout_secs: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            api_prefix: "/api".to_string(),
            timeout_secs: None,
        }
    }
}

impl BackendConfig {
    pub fn api_root(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let prefix = self.api_prefix.trim_matches('/');
        if prefix.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, prefix)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Owner id sent with companion creation.
    pub user_id: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            user_id: "default_user".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Number of past exchanges fetched when the chat opens.
    pub history_limit: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self { history_limit: 10 }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: Option<PathBuf>,
}

// ============================================================================
// Tests
// ============================================================================
