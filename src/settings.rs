use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "redraft";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Endpoint of the rewrite service.
    #[serde(default = "default_rewrite_url")]
    pub rewrite_url: String,

    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Bearer token sent with every rewrite request, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Where section sidecars live. Unset means the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Wrap width used when a section is shown.
    #[serde(default = "default_view_width")]
    pub view_width: usize,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_rewrite_url() -> String {
    "http://127.0.0.1:8000/api/refine".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_view_width() -> usize {
    80
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            rewrite_url: default_rewrite_url(),
            request_timeout_secs: default_timeout_secs(),
            api_token: None,
            data_dir: None,
            view_width: default_view_width(),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Loads settings from `explicit` when given, otherwise from the
    /// platform config dir. A missing file is created with defaults; an
    /// unreadable or unparsable file falls back to defaults untouched.
    pub fn load_or_default(explicit: Option<&Path>) -> Self {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(preferred_config_path);
        let Some(path) = path else {
            error!("Could not determine config directory, using default settings");
            return Self::default();
        };

        if path.exists() {
            Self::load_from_path(&path)
        } else {
            info!("Settings file not found, creating with defaults at {path:?}");
            let settings = Self::default();
            save_settings_to_file(&settings, &path);
            settings
        }
    }

    fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
                Ok(settings) => {
                    debug!("Loaded settings from {path:?}");
                    settings
                }
                Err(e) => {
                    error!("Failed to parse settings file {path:?}: {e}");
                    Self::default()
                }
            },
            Err(e) => {
                error!("Failed to read settings file {path:?}: {e}");
                Self::default()
            }
        }
    }
}

fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

fn save_settings_to_file(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory {parent:?}: {e}");
                return;
            }
        }
    }

    let content = generate_settings_yaml(settings);

    match fs::write(path, content) {
        Ok(()) => debug!("Saved settings to {path:?}"),
        Err(e) => error!("Failed to save settings to {path:?}: {e}"),
    }
}

fn generate_settings_yaml(settings: &Settings) -> String {
    let mut content = String::new();

    content.push_str(&format!("version: {}\n", settings.version));
    content.push_str(&format!("rewrite_url: \"{}\"\n", settings.rewrite_url));
    content.push_str(&format!(
        "request_timeout_secs: {}\n",
        settings.request_timeout_secs
    ));
    content.push_str(&format!("view_width: {}\n", settings.view_width));
    content.push('\n');
    content.push_str("# Uncomment to authenticate against the rewrite service:\n");
    content.push_str("# api_token: \"...\"\n");
    content.push('\n');
    content.push_str("# Uncomment to keep section sidecars somewhere specific:\n");
    content.push_str("# data_dir: \"/path/to/dir\"\n");

    content
}
