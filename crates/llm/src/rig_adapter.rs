use rig::completion::Prompt;
use rig::prelude::CompletionClient;
use rig::providers::gemini;
use snafu::{ResultExt, ensure};

use super::generator::{
    BoxFuture, EmptyInputSnafu, EmptyResponseSnafu, Generator, GenerationResult, GeneratorConfig,
    HEALTH_PREAMBLE, HttpClientSnafu, MissingApiKeySnafu, RequestFailedSnafu,
};

pub const RIG_GEMINI_PROVIDER_ID: &str = "gemini";

#[derive(Debug)]
pub struct RigGeminiAdapter {
    config: GeneratorConfig,
}

impl RigGeminiAdapter {
    pub fn new(config: GeneratorConfig) -> GenerationResult<Self> {
        ensure!(
            !config.api_key.is_empty(),
            MissingApiKeySnafu {
                stage: "rig-adapter-new",
                provider_id: config.provider_id.clone(),
            }
        );

        Ok(Self { config })
    }

    fn build_client(&self) -> GenerationResult<gemini::Client> {
        gemini::Client::builder()
            .api_key(self.config.api_key.as_str())
            .build()
            .context(HttpClientSnafu {
                stage: "build-client",
            })
    }
}

impl Generator for RigGeminiAdapter {
    fn id(&self) -> &str {
        &self.config.provider_id
    }

    fn model_id(&self) -> &str {
        &self.config.model_id
    }

    fn ask<'a>(&'a self, user_text: &'a str) -> BoxFuture<'a, GenerationResult<String>> {
        Box::pin(async move {
            let trimmed = user_text.trim();
            ensure!(
                !trimmed.is_empty(),
                EmptyInputSnafu {
                    stage: "ask-validate",
                }
            );

            let client = self.build_client()?;
            let assistant = client
                .agent(self.config.model_id.as_str())
                .preamble(HEALTH_PREAMBLE)
                .build();

            let reply = assistant
                .prompt(trimmed)
                .await
                .context(RequestFailedSnafu { stage: "ask-prompt" })?;

            ensure!(
                !reply.trim().is_empty(),
                EmptyResponseSnafu {
                    stage: "ask-response",
                }
            );

            tracing::debug!(
                model_id = %self.config.model_id,
                reply_bytes = reply.len(),
                "generation call completed"
            );
            Ok(reply)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GenerationError;

    #[test]
    fn adapter_requires_an_api_key() {
        let config = GeneratorConfig::new(RIG_GEMINI_PROVIDER_ID, "", None);
        let error = RigGeminiAdapter::new(config).expect_err("must reject empty key");
        assert!(matches!(error, GenerationError::MissingApiKey { .. }));
    }

    #[tokio::test]
    async fn whitespace_input_is_rejected_before_any_transport() {
        let adapter =
            RigGeminiAdapter::new(GeneratorConfig::new(RIG_GEMINI_PROVIDER_ID, "key", None))
                .expect("adapter with key");

        let error = adapter.ask("   \n ").await.expect_err("empty input fails");
        assert!(matches!(error, GenerationError::EmptyInput { .. }));
    }
}
