use crate::error::AnalysisError;
use crate::orchestrator::{AnalysisFailure, AnalysisOrchestrator, AnalysisRequest};
use crate::routes::{ANALYZE_PATH, COMPANIES_PATH, HEALTH_PATH};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::warn;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<AnalysisOrchestrator>,
}

#[derive(Debug, Deserialize)]
pub struct CompaniesQuery {
    #[serde(rename = "userId")]
    pub user_id: String,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health_check))
        .route(ANALYZE_PATH, post(analyze_balance_sheet))
        .route(COMPANIES_PATH, get(list_companies))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

fn failure_response(err: &AnalysisError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(AnalysisFailure::from_error(err)),
    )
        .into_response()
}

async fn analyze_balance_sheet(
    State(state): State<AppState>,
    body: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Rejected analysis body: {}", rejection);
            return failure_response(&AnalysisError::Validation(
                "Invalid request body".to_string(),
            ));
        }
    };

    match state.orchestrator.respond(&request).await {
        Ok(answer) => (StatusCode::OK, Json(answer)).into_response(),
        Err(failure) => (StatusCode::INTERNAL_SERVER_ERROR, Json(failure)).into_response(),
    }
}

async fn list_companies(
    State(state): State<AppState>,
    query: Result<Query<CompaniesQuery>, QueryRejection>,
) -> Response {
    let user_id = match query {
        Ok(Query(query)) if !query.user_id.trim().is_empty() => query.user_id,
        Ok(_) => {
            return failure_response(&AnalysisError::Validation(
                "User id is required".to_string(),
            ))
        }
        Err(rejection) => {
            warn!("Rejected company listing query: {}", rejection);
            return failure_response(&AnalysisError::Validation(
                "User id is required".to_string(),
            ));
        }
    };

    match state.orchestrator.resolver().company_listing(&user_id).await {
        Ok(listing) => (StatusCode::OK, Json(listing)).into_response(),
        Err(err) => {
            warn!("Company listing failed for {}: {}", user_id, err);
            failure_response(&err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::llm::{GenerationParams, LanguageModel};
    use crate::orchestrator::{AnalysisResponse, FALLBACK_RESPONSE};
    use crate::schema::{Company, Profile, UserRole};
    use crate::store::InMemoryRecordStore;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    struct CannedModel;

    #[async_trait]
    impl LanguageModel for CannedModel {
        async fn generate(&self, _prompt: &str, _params: &GenerationParams) -> Result<String> {
            Ok("Liquidity looks healthy.".to_string())
        }
    }

    fn app() -> Router {
        let store = InMemoryRecordStore::new()
            .with_company(Company {
                id: "a".into(),
                name: "Acme Holdings".to_string(),
                description: None,
            })
            .with_profile(Profile {
                id: "owner".to_string(),
                email: None,
                full_name: None,
                role: UserRole::GroupOwner,
                company_id: None,
            });
        let orchestrator =
            AnalysisOrchestrator::new(Arc::new(store), Arc::new(CannedModel), Default::default());
        create_router(AppState {
            orchestrator: Arc::new(orchestrator),
        })
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(ANALYZE_PATH)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_analyze_success_envelope() {
        let res = app()
            .oneshot(post_json(r#"{"message":"How is liquidity?","userId":"owner"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let answer: AnalysisResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(answer.response, "Liquidity looks healthy.");
        assert!(!answer.data_available);
    }

    #[tokio::test]
    async fn test_analyze_failure_envelope() {
        let res = app()
            .oneshot(post_json(r#"{"message":"","userId":"owner"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let failure: AnalysisFailure = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(failure.error, "Message is required");
        assert_eq!(failure.response, FALLBACK_RESPONSE);
    }

    #[tokio::test]
    async fn test_malformed_body_uses_failure_envelope() {
        let res = app().oneshot(post_json("not json")).await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let failure: AnalysisFailure = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(failure.error, "Invalid request body");
    }

    #[tokio::test]
    async fn test_companies_for_unknown_user() {
        let req = Request::builder()
            .uri(format!("{}?userId=ghost", COMPANIES_PATH))
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let failure: AnalysisFailure = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(failure.error, "User profile not found");
    }

    async fn get_failure(uri: &str) -> AnalysisFailure {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_companies_without_user_id_uses_failure_envelope() {
        let failure = get_failure(COMPANIES_PATH).await;
        assert_eq!(failure.error, "User id is required");
        assert_eq!(failure.response, FALLBACK_RESPONSE);

        let failure = get_failure(&format!("{}?userId=", COMPANIES_PATH)).await;
        assert_eq!(failure.error, "User id is required");
    }

    #[tokio::test]
    async fn test_companies_listing_with_default() {
        let req = Request::builder()
            .uri(format!("{}?userId=owner", COMPANIES_PATH))
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["defaultCompanyId"], "a");
        assert_eq!(body["companies"][0]["name"], "Acme Holdings");
    }

    #[cfg(feature = "client")]
    #[tokio::test]
    async fn test_http_transport_against_router() {
        use crate::session::AnalysisTransport;
        use crate::test_support::serve_stub;
        use crate::transport::HttpTransport;
        use std::time::Duration;

        let base_url = serve_stub(app()).await;
        let transport = HttpTransport::new(base_url, Duration::from_secs(5)).unwrap();

        let answer = transport
            .analyze(&AnalysisRequest::new("How is liquidity?", "owner").with_company(Some("a".into())))
            .await
            .unwrap();
        assert_eq!(answer.response, "Liquidity looks healthy.");
        assert!(!answer.data_available);

        let failure = transport
            .analyze(&AnalysisRequest::new("   ", "owner"))
            .await
            .unwrap_err();
        assert_eq!(failure.error, "Message is required");
        assert_eq!(failure.response, FALLBACK_RESPONSE);

        let listing = transport.company_listing("owner").await.unwrap();
        assert_eq!(listing.default_company().map(|c| c.id.as_str()), Some("a"));

        let err = transport.company_listing("ghost").await.unwrap_err();
        assert!(err.to_string().contains("User profile not found"));
    }
}
