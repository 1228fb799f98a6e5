use std::future::Future;
use std::pin::Pin;

use snafu::Snafu;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-pro";

/// Fixed instruction preamble steering answers toward general health
/// guidance with a consult-a-professional disclaimer. Static configuration,
/// prepended to every request.
pub const HEALTH_PREAMBLE: &str = "Anda adalah asisten kesehatan AI yang membantu memberikan informasi kesehatan umum.\n\
Berikan informasi yang akurat dan berbasis bukti.\n\
Selalu ingatkan bahwa ini hanya informasi umum dan pengguna harus berkonsultasi dengan profesional kesehatan untuk diagnosis atau pengobatan spesifik.";

/// The single user-facing message every generation failure collapses into.
pub const GENERATION_FALLBACK_MESSAGE: &str =
    "Maaf, terjadi kesalahan. Silakan coba lagi dalam beberapa saat.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub provider_id: String,
    pub api_key: String,
    pub model_id: String,
}

impl GeneratorConfig {
    pub fn new(
        provider_id: impl Into<String>,
        api_key: impl Into<String>,
        model_id: Option<String>,
    ) -> Self {
        let model_id = model_id
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());

        Self {
            provider_id: provider_id.into().trim().to_string(),
            api_key: api_key.into().trim().to_string(),
            model_id,
        }
    }
}

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub type GenerationResult<T> = Result<T, GenerationError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum GenerationError {
    #[snafu(display("missing API key for generation provider '{provider_id}'"))]
    MissingApiKey {
        stage: &'static str,
        provider_id: String,
    },
    #[snafu(display("generation provider '{provider_id}' is not supported"))]
    UnsupportedProvider {
        stage: &'static str,
        provider_id: String,
    },
    #[snafu(display("generation input is empty"))]
    EmptyInput { stage: &'static str },
    #[snafu(display("http client failed on `{stage}`, {source}"))]
    HttpClient {
        stage: &'static str,
        source: rig::http_client::Error,
    },
    #[snafu(display("generation request failed on `{stage}`, {source}"))]
    RequestFailed {
        stage: &'static str,
        source: rig::completion::PromptError,
    },
    #[snafu(display("generation provider returned an empty response"))]
    EmptyResponse { stage: &'static str },
}

/// One blocking request per user turn. No retry, no streaming.
pub trait Generator: Send + Sync + std::fmt::Debug {
    fn id(&self) -> &str;
    fn model_id(&self) -> &str;
    fn ask<'a>(&'a self, user_text: &'a str) -> BoxFuture<'a, GenerationResult<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_falls_back_to_the_default_model() {
        let config = GeneratorConfig::new("gemini", " key ", None);
        assert_eq!(config.model_id, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.api_key, "key");

        let config = GeneratorConfig::new("gemini", "key", Some("  ".to_string()));
        assert_eq!(config.model_id, DEFAULT_GEMINI_MODEL);

        let config = GeneratorConfig::new("gemini", "key", Some("gemini-1.5-pro".to_string()));
        assert_eq!(config.model_id, "gemini-1.5-pro");
    }

    #[test]
    fn preamble_requests_the_disclaimer() {
        assert!(HEALTH_PREAMBLE.contains("profesional kesehatan"));
    }
}
