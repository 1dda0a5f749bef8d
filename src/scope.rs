use crate::error::{AnalysisError, Result};
use crate::schema::{Company, CompanyId, Profile, UserRole};
use crate::store::{BalanceSheetQuery, RecordStore};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The set of companies a user may read balance sheet data for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    AllCompanies,
    SingleCompany(CompanyId),
}

impl Scope {
    /// Builds the balance sheet query for this scope.
    ///
    /// A caller-supplied company filter can only narrow an `AllCompanies` scope.
    /// For `SingleCompany` it is dropped and the assigned company is used.
    pub fn balance_sheet_query(
        &self,
        requested_company: Option<CompanyId>,
        limit: usize,
    ) -> BalanceSheetQuery {
        match self {
            Scope::AllCompanies => BalanceSheetQuery {
                company_id: requested_company,
                limit,
            },
            Scope::SingleCompany(assigned) => BalanceSheetQuery::for_company(assigned.clone(), limit),
        }
    }

    pub fn permits(&self, company_id: &CompanyId) -> bool {
        match self {
            Scope::AllCompanies => true,
            Scope::SingleCompany(assigned) => assigned == company_id,
        }
    }
}

/// Result of resolving a verified user: their role plus the scope it grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub user_id: String,
    pub role: UserRole,
    pub scope: Scope,
}

impl AccessGrant {
    fn from_profile(profile: &Profile) -> Result<Self> {
        let scope = match profile.role {
            UserRole::GroupOwner => Scope::AllCompanies,
            UserRole::Ceo | UserRole::Analyst => match &profile.company_id {
                Some(company_id) => Scope::SingleCompany(company_id.clone()),
                None => return Err(AnalysisError::NoCompanyAssigned(profile.id.clone())),
            },
        };

        Ok(Self {
            user_id: profile.id.clone(),
            role: profile.role,
            scope,
        })
    }
}

#[derive(Clone)]
pub struct ScopeResolver {
    store: Arc<dyn RecordStore>,
}

impl ScopeResolver {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, user_id: &str) -> Result<AccessGrant> {
        let profile = self
            .store
            .find_profile(user_id)
            .await?
            .ok_or_else(|| AnalysisError::ProfileNotFound(user_id.to_string()))?;

        let grant = AccessGrant::from_profile(&profile);
        match &grant {
            Ok(g) => debug!("Resolved scope for user {} ({}): {:?}", user_id, g.role, g.scope),
            Err(e) => warn!("Scope resolution failed for user {}: {}", user_id, e),
        }
        grant
    }

    pub async fn resolve_scope(&self, user_id: &str) -> Result<Scope> {
        Ok(self.resolve(user_id).await?.scope)
    }

    /// Companies the user may see, in name order.
    pub async fn visible_companies(&self, user_id: &str) -> Result<Vec<Company>> {
        let grant = self.resolve(user_id).await?;
        self.companies_for(&grant).await
    }

    /// Visible companies plus the one a new session should start on.
    pub async fn company_listing(&self, user_id: &str) -> Result<CompanyListing> {
        let grant = self.resolve(user_id).await?;
        let companies = self.companies_for(&grant).await?;
        let default_company_id = default_company(&grant, &companies).map(|c| c.id.clone());
        Ok(CompanyListing {
            companies,
            default_company_id,
        })
    }

    async fn companies_for(&self, grant: &AccessGrant) -> Result<Vec<Company>> {
        let companies = self.store.list_companies().await?;
        Ok(companies
            .into_iter()
            .filter(|c| grant.scope.permits(&c.id))
            .collect())
    }
}

/// Body of the company listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyListing {
    pub companies: Vec<Company>,
    pub default_company_id: Option<CompanyId>,
}

impl CompanyListing {
    pub fn default_company(&self) -> Option<&Company> {
        let id = self.default_company_id.as_ref()?;
        self.companies.iter().find(|c| c.id == *id)
    }

    pub fn find(&self, company_id: &str) -> Option<&Company> {
        self.companies.iter().find(|c| c.id.as_str() == company_id)
    }
}

/// Company pre-selected when a user opens the dashboard: the first company by
/// name for group owners, the assigned company otherwise.
pub fn default_company<'a>(grant: &AccessGrant, companies: &'a [Company]) -> Option<&'a Company> {
    match &grant.scope {
        Scope::AllCompanies => companies.first(),
        Scope::SingleCompany(assigned) => companies.iter().find(|c| c.id == *assigned),
    }
}
