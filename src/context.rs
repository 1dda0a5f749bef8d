use crate::error::Result;
use crate::schema::{BalanceSheetWithCompany, CompanyId};
use crate::scope::Scope;
use crate::store::RecordStore;
use log::debug;
use std::sync::Arc;

pub const DEFAULT_MAX_RECORDS: usize = 20;
pub const NO_DATA_PLACEHOLDER: &str = "No financial data available.";
pub const RECORD_SEPARATOR: &str = "\n---\n";

/// Bounded textual rendering of the scoped balance sheets.
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialContext {
    pub text: String,
    pub data_available: bool,
    /// Owning company of each rendered record, in render order.
    pub company_ids: Vec<CompanyId>,
}

impl FinancialContext {
    pub fn empty() -> Self {
        Self {
            text: NO_DATA_PLACEHOLDER.to_string(),
            data_available: false,
            company_ids: Vec::new(),
        }
    }

    pub fn record_count(&self) -> usize {
        self.company_ids.len()
    }
}

#[derive(Clone)]
pub struct ContextAssembler {
    store: Arc<dyn RecordStore>,
    max_records: usize,
}

impl ContextAssembler {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            max_records: DEFAULT_MAX_RECORDS,
        }
    }

    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }

    pub fn max_records(&self) -> usize {
        self.max_records
    }

    /// Fetches the most recent balance sheets visible under `scope` and renders
    /// them into a single context blob. `requested_company` only narrows an
    /// `AllCompanies` scope.
    pub async fn assemble(
        &self,
        scope: &Scope,
        requested_company: Option<CompanyId>,
    ) -> Result<FinancialContext> {
        let query = scope.balance_sheet_query(requested_company, self.max_records);
        let rows = self.store.query_balance_sheets(&query).await?;

        debug!(
            "Assembling context from {} balance sheets (query: {:?})",
            rows.len(),
            query
        );

        render_context(&rows)
    }
}

pub fn render_context(rows: &[BalanceSheetWithCompany]) -> Result<FinancialContext> {
    if rows.is_empty() {
        return Ok(FinancialContext::empty());
    }

    let blocks = rows
        .iter()
        .map(render_record)
        .collect::<Result<Vec<String>>>()?;

    Ok(FinancialContext {
        text: blocks.join(RECORD_SEPARATOR),
        data_available: true,
        company_ids: rows.iter().map(|r| r.sheet.company_id.clone()).collect(),
    })
}

pub fn render_record(row: &BalanceSheetWithCompany) -> Result<String> {
    let sheet = &row.sheet;
    Ok(format!(
        "Company: {}\n\
         Period: {}\n\
         Assets: {}\n\
         Liabilities: {}\n\
         Equity: {}\n\
         Revenue: ${}M\n\
         Net Income: ${}M",
        row.company_name(),
        sheet.period_label(),
        serde_json::to_string_pretty(&sheet.assets)?,
        serde_json::to_string_pretty(&sheet.liabilities)?,
        serde_json::to_string_pretty(&sheet.equity)?,
        sheet.revenue.unwrap_or(0.0),
        sheet.net_income.unwrap_or(0.0),
    ))
}
