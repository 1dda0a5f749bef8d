use crate::config::{DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use crate::error::{AnalysisError, Result};
use crate::llm::types::*;
use crate::llm::{GenerationParams, LanguageModel};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use std::time::Duration;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    /// Builds a client with the default model and request timeout.
    ///
    /// A blank key is a configuration error, not something to discover per request.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(api_key, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AnalysisError::Configuration(
                "Gemini API key not configured".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::Configuration(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub(crate) async fn generate_content(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String> {
        // The key travels in a header so it never shows up in URLs or error text.
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let payload = GenerateContentRequest {
            contents: vec![Content::user_text(prompt)],
            generation_config: params.into(),
        };

        debug!(
            "Sending {} byte prompt to Gemini model {}",
            prompt.len(),
            self.model
        );

        let res = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                AnalysisError::Backend(format!("Gemini request failed: {}", e.without_url()))
            })?;
        let status = res.status();

        if !status.is_success() {
            let err_text = res.text().await.unwrap_or_default();
            return Err(AnalysisError::Backend(format!(
                "Gemini API Error (status {}): {}",
                status, err_text
            )));
        }

        let body: GenerateContentResponse = res.json().await.map_err(|e| {
            AnalysisError::Backend(format!("Invalid response from AI service: {}", e.without_url()))
        })?;

        body.first_text().map(str::to_string).ok_or_else(|| {
            AnalysisError::Backend("Invalid response from AI service: no generated text".to_string())
        })
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        self.generate_content(prompt, params).await
    }
}
