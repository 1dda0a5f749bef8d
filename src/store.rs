use crate::error::{AnalysisError, Result};
use crate::schema::{BalanceSheet, BalanceSheetWithCompany, Company, CompanyId, Profile};
use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Read query over the balance sheet relation.
///
/// Results are always ordered most recent first (year desc, quarter desc) and
/// capped at `limit` rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceSheetQuery {
    pub company_id: Option<CompanyId>,
    pub limit: usize,
}

impl BalanceSheetQuery {
    pub fn all(limit: usize) -> Self {
        Self {
            company_id: None,
            limit,
        }
    }

    pub fn for_company(company_id: CompanyId, limit: usize) -> Self {
        Self {
            company_id: Some(company_id),
            limit,
        }
    }
}

/// Read-only access to companies, profiles and balance sheets.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All companies ordered by name.
    async fn list_companies(&self) -> Result<Vec<Company>>;

    async fn find_profile(&self, user_id: &str) -> Result<Option<Profile>>;

    async fn query_balance_sheets(
        &self,
        query: &BalanceSheetQuery,
    ) -> Result<Vec<BalanceSheetWithCompany>>;
}

/// Serialized form of the three relations, used to seed an [`InMemoryRecordStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub companies: Vec<Company>,
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub balance_sheets: Vec<BalanceSheet>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    companies: HashMap<CompanyId, Company>,
    profiles: HashMap<String, Profile>,
    balance_sheets: Vec<BalanceSheet>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self> {
        for sheet in &snapshot.balance_sheets {
            check_quarter(sheet)?;
        }

        let store = Self {
            companies: snapshot
                .companies
                .into_iter()
                .map(|c| (c.id.clone(), c))
                .collect(),
            profiles: snapshot
                .profiles
                .into_iter()
                .map(|p| (p.id.clone(), p))
                .collect(),
            balance_sheets: snapshot.balance_sheets,
        };

        info!(
            "Record store loaded: {} companies, {} profiles, {} balance sheets",
            store.companies.len(),
            store.profiles.len(),
            store.balance_sheets.len()
        );

        Ok(store)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let snapshot: StoreSnapshot = serde_json::from_str(json)?;
        Self::from_snapshot(snapshot)
    }

    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading record store snapshot from {}", path.display());
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn with_company(mut self, company: Company) -> Self {
        self.companies.insert(company.id.clone(), company);
        self
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profiles.insert(profile.id.clone(), profile);
        self
    }

    pub fn with_balance_sheet(mut self, sheet: BalanceSheet) -> Result<Self> {
        check_quarter(&sheet)?;
        self.balance_sheets.push(sheet);
        Ok(self)
    }
}

fn check_quarter(sheet: &BalanceSheet) -> Result<()> {
    if sheet.has_valid_quarter() {
        Ok(())
    } else {
        Err(AnalysisError::Store(format!(
            "Balance sheet '{}' has invalid quarter {}",
            sheet.id, sheet.period_quarter
        )))
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn list_companies(&self) -> Result<Vec<Company>> {
        let mut companies: Vec<Company> = self.companies.values().cloned().collect();
        companies.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(companies)
    }

    async fn find_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        Ok(self.profiles.get(user_id).cloned())
    }

    async fn query_balance_sheets(
        &self,
        query: &BalanceSheetQuery,
    ) -> Result<Vec<BalanceSheetWithCompany>> {
        let mut matching: Vec<&BalanceSheet> = self
            .balance_sheets
            .iter()
            .filter(|sheet| {
                query
                    .company_id
                    .as_ref()
                    .map_or(true, |id| sheet.company_id == *id)
            })
            .collect();

        matching.sort_by(|a, b| a.cmp_most_recent_first(b));

        Ok(matching
            .into_iter()
            .take(query.limit)
            .map(|sheet| BalanceSheetWithCompany {
                sheet: sheet.clone(),
                company: self.companies.get(&sheet.company_id).cloned(),
            })
            .collect())
    }
}
