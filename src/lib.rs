//! # Balance Sheet Analyst
//!
//! Role-scoped access to periodic balance sheet data, and an AI analysis
//! pipeline that answers free-text questions grounded in that data.
//!
//! ## Core Concepts
//!
//! - **Scope**: the companies a verified user may read. Group owners see every
//!   company; CEOs and analysts see only their assigned company, whatever
//!   company filter the request carries.
//! - **Context**: the most recent balance sheets in scope (at most 20), rendered
//!   to a fixed text template and sent to the language model with the question.
//! - **dataAvailable**: whether any real records backed the answer.
//! - **Session**: the client-side transcript that allows one in-flight request
//!   at a time and always ends a request with an assistant message.
//!
//! ## Example
//!
//! ```rust,ignore
//! use balance_sheet_analyst::*;
//! use std::sync::Arc;
//!
//! let store = Arc::new(InMemoryRecordStore::load("data.json".as_ref())?);
//! let model = Arc::new(GeminiClient::new(api_key)?);
//! let orchestrator = Arc::new(AnalysisOrchestrator::new(store, model, OrchestratorConfig::default()));
//!
//! let session = SessionHandle::new("user-1", orchestrator);
//! session.open(None);
//! session.submit("What is our revenue trend?").await;
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod prompts;
pub mod schema;
pub mod scope;
pub mod session;
pub mod store;

#[cfg(feature = "server")]
pub mod server;
#[cfg(feature = "client")]
pub mod transport;

#[cfg(test)]
mod test_support;

pub use config::ServiceConfig;
pub use context::{ContextAssembler, FinancialContext, NO_DATA_PLACEHOLDER};
pub use error::{AnalysisError, ErrorKind, Result};
pub use llm::{GenerationParams, LanguageModel};
pub use orchestrator::*;
pub use schema::*;
pub use scope::{default_company, AccessGrant, CompanyListing, Scope, ScopeResolver};
pub use session::*;
pub use store::{BalanceSheetQuery, InMemoryRecordStore, RecordStore, StoreSnapshot};

#[cfg(feature = "gemini")]
pub use llm::GeminiClient;
#[cfg(feature = "client")]
pub use transport::HttpTransport;

/// HTTP paths shared by the server and the client transport.
pub mod routes {
    pub const HEALTH_PATH: &str = "/api/health";
    pub const ANALYZE_PATH: &str = "/api/analyze-balance-sheet";
    pub const COMPANIES_PATH: &str = "/api/companies";
}
