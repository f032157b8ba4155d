//! Generated prompts from an external text service, with a placeholder fallback.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::{
    questions::bank::QuestionSeed,
    state::session::Difficulty,
};

/// Payload sent to the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuestionsRequest {
    /// Names of the players, used to personalize prompts.
    pub player_names: Vec<String>,
    /// Number of prompts wanted.
    pub num_questions: usize,
    /// Requested tone.
    pub difficulty: Difficulty,
}

/// Payload returned by the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateQuestionsResponse {
    /// Prompt texts, without category.
    #[serde(default)]
    pub questions: Vec<String>,
}

/// Failures of the generation service. None of them is fatal to a game.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// The request could not be sent.
    #[error("failed to reach question generator: {message}")]
    Transport {
        /// Underlying error message.
        message: String,
    },
    /// The service answered with an error status.
    #[error("question generator answered with status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },
    /// The response body was not the expected JSON.
    #[error("failed to decode question generator response: {message}")]
    Decode {
        /// Underlying error message.
        message: String,
    },
    /// The service did not answer in time.
    #[error("question generator timed out")]
    Timeout,
}

/// Source of generated prompts.
pub trait QuestionGenerator: Send + Sync {
    /// Ask for `request.num_questions` prompts.
    fn generate(
        &self,
        request: GenerateQuestionsRequest,
    ) -> BoxFuture<'static, Result<GenerateQuestionsResponse, GeneratorError>>;
}

/// Placeholder prompts used when generation fails: one per player, truncated to the request.
pub fn fallback_questions(request: &GenerateQuestionsRequest) -> Vec<String> {
    request
        .player_names
        .iter()
        .take(request.num_questions)
        .map(|name| format!("be {name}? (fallback)"))
        .collect()
}

/// Ask `generator` for prompts, falling back to placeholders on error or empty answer.
///
/// Generated prompts carry the difficulty's signature category.
pub async fn generate_or_fallback(
    generator: &dyn QuestionGenerator,
    request: GenerateQuestionsRequest,
) -> Vec<QuestionSeed> {
    let category = request.difficulty.signature_category();

    let texts = match generator.generate(request.clone()).await {
        Ok(response) => {
            let texts: Vec<String> = response
                .questions
                .into_iter()
                .map(|text| text.trim().to_owned())
                .filter(|text| !text.is_empty())
                .collect();
            if texts.is_empty() {
                warn!(
                    difficulty = request.difficulty.as_str(),
                    "question generator returned no prompts, using fallback"
                );
                fallback_questions(&request)
            } else {
                texts
            }
        }
        Err(err) => {
            warn!(
                difficulty = request.difficulty.as_str(),
                error = %err,
                "question generation failed, using fallback"
            );
            fallback_questions(&request)
        }
    };

    texts
        .into_iter()
        .map(|text| QuestionSeed::new(text, category))
        .collect()
}

#[cfg(feature = "generator")]
pub use self::http::HttpQuestionGenerator;

#[cfg(feature = "generator")]
mod http {
    use std::{sync::Arc, time::Duration};

    use futures::future::BoxFuture;
    use reqwest::Client;

    use super::{GenerateQuestionsRequest, GenerateQuestionsResponse, GeneratorError, QuestionGenerator};

    /// Generator backed by an HTTP endpoint accepting [`GenerateQuestionsRequest`] as JSON.
    #[derive(Clone)]
    pub struct HttpQuestionGenerator {
        client: Client,
        url: Arc<str>,
    }

    impl HttpQuestionGenerator {
        /// Build a generator posting to `url`, giving up after `timeout`.
        pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, GeneratorError> {
            let client = Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|err| GeneratorError::Transport {
                    message: err.to_string(),
                })?;
            Ok(Self {
                client,
                url: Arc::from(url.into()),
            })
        }
    }

    impl QuestionGenerator for HttpQuestionGenerator {
        fn generate(
            &self,
            request: GenerateQuestionsRequest,
        ) -> BoxFuture<'static, Result<GenerateQuestionsResponse, GeneratorError>> {
            let client = self.client.clone();
            let url = self.url.clone();
            Box::pin(async move {
                let response = client
                    .post(url.as_ref())
                    .json(&request)
                    .send()
                    .await
                    .map_err(|err| {
                        if err.is_timeout() {
                            GeneratorError::Timeout
                        } else {
                            GeneratorError::Transport {
                                message: err.to_string(),
                            }
                        }
                    })?;

                let status = response.status();
                if !status.is_success() {
                    return Err(GeneratorError::Status {
                        status: status.as_u16(),
                    });
                }

                response
                    .json::<GenerateQuestionsResponse>()
                    .await
                    .map_err(|err| GeneratorError::Decode {
                        message: err.to_string(),
                    })
            })
        }
    }
}
