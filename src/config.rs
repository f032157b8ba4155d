//! Application-level configuration loading: game rules, session codes and question sources.

use std::{collections::HashMap, env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationMilliSeconds, DurationSeconds, serde_as};
use tracing::{info, warn};

use crate::{
    questions::bank::{QuestionBank, QuestionSeed},
    state::{session::Difficulty, state_machine::Rules},
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "HOT_SEAT_BACK_CONFIG_PATH";
/// Bounds of the generated session code length.
const CODE_LENGTH_RANGE: (usize, usize) = (4, 6);

/// Where prompts come from when a game starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionSource {
    /// The built-in (or overridden) prompt tables.
    #[default]
    Bank,
    /// The external generator, with placeholder fallback.
    Generated,
}

/// Connection settings of the external question generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Endpoint receiving the generation request.
    pub url: String,
    /// Upper bound on a generation call.
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Players required before the host can start.
    pub min_players: usize,
    /// Largest round count accepted at creation.
    pub max_rounds: u32,
    /// Round timer used when a creation request does not set one.
    pub default_timer: Duration,
    /// Length of generated session codes.
    pub session_code_length: usize,
    /// Whether players may choose themselves.
    pub allow_self_vote: bool,
    /// Whether closed rounds stop on a results screen.
    pub show_round_results: bool,
    /// Whether the server closes rounds when their timer elapses.
    pub server_round_timer: bool,
    /// Prompt source used at start.
    pub question_source: QuestionSource,
    /// Generator settings, required for [`QuestionSource::Generated`].
    pub generator: Option<GeneratorConfig>,
    /// Prompt tables.
    pub question_bank: QuestionBank,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        min_players = app_config.min_players,
                        question_source = ?app_config.question_source,
                        "loaded game configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a configuration document. Absent keys take their default.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Rules handed to the session reducer.
    pub fn rules(&self) -> Rules {
        Rules {
            min_players: self.min_players,
            allow_self_vote: self.allow_self_vote,
            show_round_results: self.show_round_results,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    min_players: usize,
    max_rounds: u32,
    #[serde_as(as = "DurationSeconds<u64>")]
    default_timer_seconds: Duration,
    session_code_length: usize,
    allow_self_vote: bool,
    show_round_results: bool,
    server_round_timer: bool,
    question_source: QuestionSource,
    generator: Option<RawGenerator>,
    questions: HashMap<Difficulty, Vec<QuestionSeed>>,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_rounds: 30,
            default_timer_seconds: Duration::from_secs(30),
            session_code_length: CODE_LENGTH_RANGE.0,
            allow_self_vote: true,
            show_round_results: true,
            server_round_timer: true,
            question_source: QuestionSource::Bank,
            generator: None,
            questions: HashMap::new(),
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
/// JSON representation of the `generator` section.
struct RawGenerator {
    url: String,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(default = "default_generator_timeout")]
    timeout_ms: Duration,
}

fn default_generator_timeout() -> Duration {
    Duration::from_secs(10)
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let question_bank = if value.questions.is_empty() {
            QuestionBank::builtin()
        } else {
            QuestionBank::with_overrides(&value.questions)
        };

        Self {
            min_players: value.min_players.max(1),
            max_rounds: value.max_rounds.max(1),
            default_timer: value.default_timer_seconds,
            session_code_length: value
                .session_code_length
                .clamp(CODE_LENGTH_RANGE.0, CODE_LENGTH_RANGE.1),
            allow_self_vote: value.allow_self_vote,
            show_round_results: value.show_round_results,
            server_round_timer: value.server_round_timer,
            question_source: value.question_source,
            generator: value.generator.map(|raw| GeneratorConfig {
                url: raw.url,
                timeout: raw.timeout_ms,
            }),
            question_bank,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
