#![deny(unsafe_code)]

//! Wrapper around the hosted generative-language collaborator.

use std::sync::Arc;

mod generator;
mod rig_adapter;

pub use generator::{
    BoxFuture, DEFAULT_GEMINI_MODEL, GENERATION_FALLBACK_MESSAGE, GenerationError,
    GenerationResult, Generator, GeneratorConfig, HEALTH_PREAMBLE,
};
pub use rig_adapter::{RIG_GEMINI_PROVIDER_ID, RigGeminiAdapter};

pub fn create_generator(mut config: GeneratorConfig) -> GenerationResult<Arc<dyn Generator>> {
    if config.provider_id.trim().is_empty() {
        config.provider_id = RIG_GEMINI_PROVIDER_ID.to_string();
    }

    match config.provider_id.as_str() {
        "gemini" | "rig-gemini" => {
            config.provider_id = RIG_GEMINI_PROVIDER_ID.to_string();
            Ok(Arc::new(RigGeminiAdapter::new(config)?))
        }
        _ => Err(GenerationError::UnsupportedProvider {
            stage: "create-generator",
            provider_id: config.provider_id,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_provider_id_defaults_to_gemini() {
        let generator = create_generator(GeneratorConfig::new("", "key", None))
            .expect("default provider resolves");
        assert_eq!(generator.id(), RIG_GEMINI_PROVIDER_ID);
        assert_eq!(generator.model_id(), DEFAULT_GEMINI_MODEL);
    }

    #[test]
    fn unknown_provider_id_is_rejected() {
        let error = create_generator(GeneratorConfig::new("openai", "key", None))
            .expect_err("unsupported provider");
        assert!(matches!(
            error,
            GenerationError::UnsupportedProvider { .. }
        ));
    }
}
