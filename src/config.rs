use crate::context::DEFAULT_MAX_RECORDS;
use crate::error::{AnalysisError, Result};
use crate::llm::GenerationParams;
use crate::orchestrator::OrchestratorConfig;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub bind_addr: String,
    pub data_path: Option<PathBuf>,
    pub request_timeout: Duration,
    pub max_context_records: usize,
    pub analyze_empty_context: bool,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let gemini_api_key = get("GEMINI_API_KEY").ok_or_else(|| {
            AnalysisError::Configuration("Gemini API key not configured".to_string())
        })?;

        let max_context_records = parse_or(
            "ANALYST_MAX_CONTEXT_RECORDS",
            get("ANALYST_MAX_CONTEXT_RECORDS"),
            DEFAULT_MAX_RECORDS,
        )?;
        if max_context_records == 0 {
            return Err(AnalysisError::Configuration(
                "ANALYST_MAX_CONTEXT_RECORDS must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            gemini_api_key,
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            bind_addr: get("ANALYST_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            data_path: get("ANALYST_DATA_PATH").map(PathBuf::from),
            request_timeout: Duration::from_secs(parse_or(
                "ANALYST_REQUEST_TIMEOUT_SECS",
                get("ANALYST_REQUEST_TIMEOUT_SECS"),
                DEFAULT_TIMEOUT_SECS,
            )?),
            max_context_records,
            analyze_empty_context: parse_or(
                "ANALYST_ANALYZE_EMPTY_CONTEXT",
                get("ANALYST_ANALYZE_EMPTY_CONTEXT"),
                true,
            )?,
        })
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            max_records: self.max_context_records,
            analyze_empty_context: self.analyze_empty_context,
            generation: GenerationParams::default(),
        }
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| {
            AnalysisError::Configuration(format!("Invalid value '{}' for {}", value, key))
        }),
    }
}
