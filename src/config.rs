//! Process configuration read from the environment

use crate::llm::{
    RetryPolicy, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL,
};
use crate::pipeline::{Toggles, CONFIRMATION_PHRASES};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_GENERATION_URL: &str = "http://127.0.0.1:8080/generate";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Settings for the backends and the pipeline
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub generation_url: String,
    /// Content backend key; without it classification and verification
    /// degrade to their fallbacks
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub pipeline: PipelineSettings,
}

/// Settings consumed by the response pipeline
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub toggles: Toggles,
    pub generation_policy: RetryPolicy,
    pub content_policy: RetryPolicy,
    pub confirmation_phrases: Vec<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            toggles: Toggles::default(),
            generation_policy: RetryPolicy::default(),
            content_policy: RetryPolicy::default(),
            confirmation_phrases: CONFIRMATION_PHRASES.iter().map(ToString::to_string).collect(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            generation_url: DEFAULT_GENERATION_URL.to_string(),
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            pipeline: PipelineSettings::default(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let timeout = Duration::from_secs(parse_or(
            &lookup,
            "VERACITY_REQUEST_TIMEOUT_SECS",
            "a number of seconds",
            60,
        )?);
        let max_attempts = parse_positive_or(&lookup, "VERACITY_MAX_ATTEMPTS", 3)?;
        let policy = RetryPolicy {
            max_attempts,
            timeout,
            ..RetryPolicy::default()
        };

        let toggles = Toggles {
            context_enabled: parse_bool_or(&lookup, "VERACITY_CONTEXT_ENABLED", true)?,
            fact_check_enabled: parse_bool_or(&lookup, "VERACITY_FACT_CHECK_ENABLED", true)?,
        };

        let confirmation_phrases = lookup("VERACITY_CONFIRMATION_PHRASES")
            .map(|raw| {
                raw.split('|')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_lowercase)
                    .collect()
            })
            .unwrap_or(defaults.pipeline.confirmation_phrases);

        Ok(Self {
            port: parse_or(&lookup, "VERACITY_PORT", "a port number", DEFAULT_PORT)?,
            generation_url: lookup("GENERATION_URL").unwrap_or(defaults.generation_url),
            gemini_api_key: lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()),
            gemini_model: lookup("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_base_url: lookup("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            pipeline: PipelineSettings {
                toggles,
                generation_policy: policy.clone(),
                content_policy: policy,
                confirmation_phrases,
            },
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            expected,
            value,
        }),
    }
}

fn parse_positive_or(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: u32,
) -> Result<u32, ConfigError> {
    let expected = "a positive integer";
    match parse_or(lookup, var, expected, default)? {
        0 => Err(ConfigError::Invalid {
            var,
            expected,
            value: "0".to_string(),
        }),
        n => Ok(n),
    }
}

fn parse_bool_or(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                var,
                expected: "a boolean",
                value,
            }),
        },
    }
}
