use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use figment::{
    Figment,
    providers::{Format, Json, Serialized},
};
use gpui::*;
use gpui_component::{Theme, ThemeMode, ThemeRegistry};
use sehat_cloud::{IdentityConfig, StoreConfig};
use sehat_llm::{DEFAULT_GEMINI_MODEL, GeneratorConfig, RIG_GEMINI_PROVIDER_ID};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use snafu::{ResultExt, Snafu};

pub const SETTINGS_DIRECTORY_NAME: &str = "sehat";
pub const SETTINGS_FILE_NAME: &str = "settings.json";

pub const DEFAULT_STORE_BASE_URL: &str = "https://store.sehat.app";
pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://id.sehat.app";

/// Environment fallback for the generation key, so no credential has to live
/// in any checked-in file.
pub const GENERATION_API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_store_base_url")]
    pub store_base_url: String,
    #[serde(default)]
    pub store_api_key: String,
    #[serde(default = "default_identity_base_url")]
    pub identity_base_url: String,
    #[serde(default)]
    pub identity_client_id: String,
    #[serde(default)]
    pub generation_api_key: String,
    #[serde(default = "default_generation_model")]
    pub generation_model: String,
    #[serde(
        default = "default_theme_mode",
        serialize_with = "serialize_theme_mode",
        deserialize_with = "deserialize_theme_mode"
    )]
    pub theme_mode: ThemeMode,
    #[serde(default)]
    pub theme_name: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            store_base_url: default_store_base_url(),
            store_api_key: String::new(),
            identity_base_url: default_identity_base_url(),
            identity_client_id: String::new(),
            generation_api_key: String::new(),
            generation_model: default_generation_model(),
            theme_mode: default_theme_mode(),
            theme_name: String::new(),
        }
    }
}

impl AppSettings {
    pub fn normalized(mut self) -> Self {
        self.store_base_url = normalize_url(&self.store_base_url, DEFAULT_STORE_BASE_URL);
        self.store_api_key = self.store_api_key.trim().to_string();
        self.identity_base_url = normalize_url(&self.identity_base_url, DEFAULT_IDENTITY_BASE_URL);
        self.identity_client_id = self.identity_client_id.trim().to_string();
        self.generation_api_key = self.generation_api_key.trim().to_string();
        self.generation_model = if self.generation_model.trim().is_empty() {
            default_generation_model()
        } else {
            self.generation_model.trim().to_string()
        };
        self.theme_name = self.theme_name.trim().to_string();
        self
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(&self.store_base_url, &self.store_api_key)
    }

    pub fn identity_config(&self) -> IdentityConfig {
        IdentityConfig::new(&self.identity_base_url, &self.identity_client_id)
    }

    /// Generation key from settings, falling back to the environment.
    pub fn resolved_generation_api_key(&self) -> Option<String> {
        if !self.generation_api_key.is_empty() {
            return Some(self.generation_api_key.clone());
        }

        std::env::var(GENERATION_API_KEY_ENV)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// `None` when no key is configured anywhere; the consultation view then
    /// degrades to the generic fallback reply.
    pub fn generator_config(&self) -> Option<GeneratorConfig> {
        let api_key = self.resolved_generation_api_key()?;
        Some(GeneratorConfig::new(
            RIG_GEMINI_PROVIDER_ID,
            api_key,
            Some(self.generation_model.clone()),
        ))
    }

    pub fn apply_theme(&self, window: Option<&mut Window>, cx: &mut App) {
        if let Some(theme_config) = ThemeRegistry::global(cx)
            .themes()
            .get(&SharedString::from(self.theme_name.trim().to_string()))
            .cloned()
        {
            let mode = theme_config.mode;
            let theme = Theme::global_mut(cx);
            if mode.is_dark() {
                theme.dark_theme = theme_config;
            } else {
                theme.light_theme = theme_config;
            }
            Theme::change(mode, window, cx);
            return;
        }

        Theme::change(self.theme_mode, window, cx);
    }
}

pub struct SettingsStore {
    settings: Arc<ArcSwap<AppSettings>>,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".sehat"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = Self::load_from_disk(&config_path);
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path,
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn settings(&self) -> Arc<AppSettings> {
        self.settings.load_full()
    }

    pub fn update(&self, settings: AppSettings) -> Result<(), SettingsError> {
        let normalized_settings = settings.normalized();
        self.persist(&normalized_settings)?;
        self.settings.store(Arc::new(normalized_settings));
        Ok(())
    }

    fn load_from_disk(path: &PathBuf) -> AppSettings {
        if !path.exists() {
            tracing::info!("settings file not found at {:?}, using defaults", path);
            return AppSettings::default();
        }

        let figment =
            Figment::from(Serialized::defaults(AppSettings::default())).merge(Json::file(path));

        match figment.extract::<AppSettings>() {
            Ok(settings) => settings.normalized(),
            Err(error) => {
                tracing::warn!(
                    "failed to parse settings from {:?}: {}. using defaults",
                    path,
                    error
                );
                AppSettings::default()
            }
        }
    }

    fn persist(&self, settings: &AppSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context(CreateDirSnafu {
                stage: "create-settings-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(settings).context(SerializeConfigSnafu {
            stage: "serialize-settings-json",
        })?;

        let temp_path = self.config_path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "write-temporary-settings-file",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, &self.config_path).context(RenameTempFileSnafu {
            stage: "rename-temporary-settings-file",
            from: temp_path,
            to: self.config_path.clone(),
        })?;

        tracing::info!("saved settings to {:?}", self.config_path);
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to create settings directory at {path:?} on `{stage}`: {source}"))]
    CreateDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to serialize settings on `{stage}`: {source}"))]
    SerializeConfig {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to write settings file at {path:?} on `{stage}`: {source}"))]
    WriteFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "failed to replace settings file from {from:?} to {to:?} on `{stage}`: {source}"
    ))]
    RenameTempFile {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

fn normalize_url(raw: &str, fallback: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

fn default_store_base_url() -> String {
    DEFAULT_STORE_BASE_URL.to_string()
}

fn default_identity_base_url() -> String {
    DEFAULT_IDENTITY_BASE_URL.to_string()
}

fn default_generation_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

fn default_theme_mode() -> ThemeMode {
    ThemeMode::Light
}

fn serialize_theme_mode<S>(value: &ThemeMode, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(value.name())
}

fn deserialize_theme_mode<'de, D>(deserializer: D) -> Result<ThemeMode, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(parse_theme_mode(&value))
}

fn parse_theme_mode(value: &str) -> ThemeMode {
    if value.trim().eq_ignore_ascii_case("dark") {
        ThemeMode::Dark
    } else {
        ThemeMode::Light
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_restores_defaults_for_blank_fields() {
        let settings = AppSettings {
            store_base_url: "  ".to_string(),
            generation_model: "".to_string(),
            ..AppSettings::default()
        }
        .normalized();

        assert_eq!(settings.store_base_url, DEFAULT_STORE_BASE_URL);
        assert_eq!(settings.generation_model, DEFAULT_GEMINI_MODEL);
    }

    #[test]
    fn generator_config_is_absent_without_a_key() {
        let settings = AppSettings {
            generation_api_key: String::new(),
            ..AppSettings::default()
        };

        // Only meaningful when the environment fallback is also unset.
        if std::env::var(GENERATION_API_KEY_ENV).is_err() {
            assert!(settings.generator_config().is_none());
        }

        let with_key = AppSettings {
            generation_api_key: "key".to_string(),
            ..AppSettings::default()
        };
        let config = with_key.generator_config().expect("config with key");
        assert_eq!(config.provider_id, RIG_GEMINI_PROVIDER_ID);
        assert_eq!(config.model_id, DEFAULT_GEMINI_MODEL);
    }
}
