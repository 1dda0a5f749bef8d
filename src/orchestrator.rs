//! Server-side handling of a single analysis request.
//!
//! Each call validates the request, resolves the caller's scope, assembles the
//! financial context, prompts the language model and normalizes the outcome
//! into either an [`AnalysisResponse`] or an [`AnalysisFailure`]. Nothing is
//! kept between calls, so one orchestrator can serve many users concurrently.

use crate::context::{ContextAssembler, DEFAULT_MAX_RECORDS};
use crate::error::{AnalysisError, ErrorKind, Result};
use crate::llm::{GenerationParams, LanguageModel};
use crate::prompts::build_analysis_prompt;
use crate::schema::CompanyId;
use crate::scope::ScopeResolver;
use crate::store::RecordStore;
use log::{debug, error, info, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Safe text shown to the user whenever an analysis cannot be produced.
pub const FALLBACK_RESPONSE: &str = "I apologize, but I'm unable to analyze the financial data at the moment. Please try again later or contact support if the issue persists.";

/// Returned instead of calling the model when empty-context analysis is disabled.
pub const NO_DATA_RESPONSE: &str = "I couldn't find any balance sheet data to analyze yet. Upload balance sheets for your company to get insights.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub company_id: Option<CompanyId>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl AnalysisRequest {
    pub fn new(message: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            company_id: None,
            user_id: Some(user_id.into()),
        }
    }

    pub fn with_company(mut self, company_id: Option<CompanyId>) -> Self {
        self.company_id = company_id;
        self
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&schemars::schema_for!(AnalysisRequest))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub response: String,
    pub data_available: bool,
}

/// Failure envelope. `response` is always safe for direct display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisFailure {
    pub error: String,
    pub response: String,
}

impl AnalysisFailure {
    pub fn from_error(err: &AnalysisError) -> Self {
        Self {
            error: err.public_message(),
            response: FALLBACK_RESPONSE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub max_records: usize,
    /// Whether to prompt the model when no balance sheets are in scope.
    pub analyze_empty_context: bool,
    pub generation: GenerationParams,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_records: DEFAULT_MAX_RECORDS,
            analyze_empty_context: true,
            generation: GenerationParams::default(),
        }
    }
}

#[derive(Clone)]
pub struct AnalysisOrchestrator {
    resolver: ScopeResolver,
    assembler: ContextAssembler,
    model: Arc<dyn LanguageModel>,
    config: OrchestratorConfig,
}

impl AnalysisOrchestrator {
    pub fn new(
        store: Arc<dyn RecordStore>,
        model: Arc<dyn LanguageModel>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            resolver: ScopeResolver::new(store.clone()),
            assembler: ContextAssembler::new(store).with_max_records(config.max_records),
            model,
            config,
        }
    }

    pub fn resolver(&self) -> &ScopeResolver {
        &self.resolver
    }

    /// Runs the pipeline and returns typed errors.
    pub async fn handle(&self, request: &AnalysisRequest) -> Result<AnalysisResponse> {
        if request.message.trim().is_empty() {
            return Err(AnalysisError::Validation("Message is required".to_string()));
        }
        let user_id = request
            .user_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AnalysisError::Validation("User id is required".to_string()))?;

        let grant = self.resolver.resolve(user_id).await?;
        info!(
            "Analysis request from user {} (role {}, scope {:?})",
            user_id, grant.role, grant.scope
        );

        // An empty companyId from a form is the same as no filter.
        let requested_company = request
            .company_id
            .clone()
            .filter(|id| !id.as_str().trim().is_empty());

        let context = self
            .assembler
            .assemble(&grant.scope, requested_company)
            .await?;

        if !context.data_available && !self.config.analyze_empty_context {
            debug!("No balance sheets in scope for user {}; skipping model call", user_id);
            return Ok(AnalysisResponse {
                response: NO_DATA_RESPONSE.to_string(),
                data_available: false,
            });
        }

        let prompt = build_analysis_prompt(&context.text, grant.role, &request.message);
        debug!(
            "Prompting model with {} records ({} chars)",
            context.record_count(),
            prompt.len()
        );

        let text = self.model.generate(&prompt, &self.config.generation).await?;

        Ok(AnalysisResponse {
            response: text,
            data_available: context.data_available,
        })
    }

    /// Runs the pipeline and normalizes every failure into a safe envelope.
    /// Full error detail goes to the log only.
    pub async fn respond(
        &self,
        request: &AnalysisRequest,
    ) -> std::result::Result<AnalysisResponse, AnalysisFailure> {
        self.handle(request).await.map_err(|err| {
            match err.kind() {
                ErrorKind::Validation | ErrorKind::Authorization => {
                    warn!("Analysis request rejected: {}", err)
                }
                _ => error!("Error in analysis request: {}", err),
            }
            AnalysisFailure::from_error(&err)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Company, Profile, UserRole};
    use crate::store::InMemoryRecordStore;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct EchoModel {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LanguageModel for EchoModel {
        async fn generate(&self, prompt: &str, _params: &GenerationParams) -> Result<String> {
            self.prompts.lock().push(prompt.to_string());
            Ok("insights".to_string())
        }
    }

    struct FailingModel;

    #[async_trait]
    impl LanguageModel for FailingModel {
        async fn generate(&self, _prompt: &str, _params: &GenerationParams) -> Result<String> {
            Err(AnalysisError::Backend(
                "Gemini API Error (status 500): quota".to_string(),
            ))
        }
    }

    fn store() -> Arc<dyn RecordStore> {
        Arc::new(
            InMemoryRecordStore::new()
                .with_company(Company {
                    id: "a".into(),
                    name: "Acme Holdings".to_string(),
                    description: None,
                })
                .with_profile(Profile {
                    id: "ceo".to_string(),
                    email: None,
                    full_name: None,
                    role: UserRole::Ceo,
                    company_id: Some("a".into()),
                }),
        )
    }

    #[tokio::test]
    async fn test_blank_message_rejected_before_model() {
        let model = Arc::new(EchoModel::default());
        let orchestrator = AnalysisOrchestrator::new(store(), model.clone(), Default::default());

        let err = orchestrator
            .handle(&AnalysisRequest::new("   ", "ceo"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(model.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_missing_user_id_rejected() {
        let orchestrator =
            AnalysisOrchestrator::new(store(), Arc::new(EchoModel::default()), Default::default());
        let request = AnalysisRequest {
            message: "hello".to_string(),
            company_id: None,
            user_id: None,
        };
        let failure = orchestrator.respond(&request).await.unwrap_err();
        assert_eq!(failure.error, "User id is required");
        assert_eq!(failure.response, FALLBACK_RESPONSE);
    }

    #[tokio::test]
    async fn test_empty_context_still_prompts_model() {
        let model = Arc::new(EchoModel::default());
        let orchestrator = AnalysisOrchestrator::new(store(), model.clone(), Default::default());

        let response = orchestrator
            .handle(&AnalysisRequest::new("How are we doing?", "ceo"))
            .await
            .unwrap();
        assert_eq!(response.response, "insights");
        assert!(!response.data_available);

        let prompts = model.prompts.lock();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("FINANCIAL DATA:\nNo financial data available."));
        assert!(prompts[0].contains("USER QUESTION: How are we doing?"));
    }

    #[tokio::test]
    async fn test_empty_context_short_circuit_when_disabled() {
        let model = Arc::new(EchoModel::default());
        let config = OrchestratorConfig {
            analyze_empty_context: false,
            ..Default::default()
        };
        let orchestrator = AnalysisOrchestrator::new(store(), model.clone(), config);

        let response = orchestrator
            .handle(&AnalysisRequest::new("Anything?", "ceo"))
            .await
            .unwrap();
        assert_eq!(response.response, NO_DATA_RESPONSE);
        assert!(!response.data_available);
        assert!(model.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_is_normalized() {
        let orchestrator =
            AnalysisOrchestrator::new(store(), Arc::new(FailingModel), Default::default());
        let failure = orchestrator
            .respond(&AnalysisRequest::new("Revenue?", "ceo"))
            .await
            .unwrap_err();
        assert_eq!(failure.error, "Failed to get AI analysis");
        assert_eq!(failure.response, FALLBACK_RESPONSE);
        assert!(!failure.error.contains("quota"));
    }

    #[tokio::test]
    async fn test_prompt_carries_message_verbatim() {
        let model = Arc::new(EchoModel::default());
        let orchestrator = AnalysisOrchestrator::new(store(), model.clone(), Default::default());

        orchestrator
            .handle(&AnalysisRequest::new("  Cash position?\n", "ceo"))
            .await
            .unwrap();
        let prompts = model.prompts.lock();
        assert!(prompts[0].contains("USER QUESTION:   Cash position?\n"));
    }

    #[test]
    fn test_request_wire_format() {
        let request: AnalysisRequest = serde_json::from_str(
            r#"{"message":"hi","companyId":"a","userId":"u1"}"#,
        )
        .unwrap();
        assert_eq!(request.company_id, Some("a".into()));
        assert_eq!(request.user_id.as_deref(), Some("u1"));

        let response = serde_json::to_value(AnalysisResponse {
            response: "ok".to_string(),
            data_available: true,
        })
        .unwrap();
        assert_eq!(response["dataAvailable"], true);

        let schema = AnalysisRequest::schema_as_json().unwrap();
        assert!(schema.contains("companyId"));
    }
}
