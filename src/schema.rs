use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Open mapping of named numeric fields (e.g. `{"total": 120.0, "cash": 40.0}`).
pub type AccountGroup = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CompanyId(pub String);

impl CompanyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CompanyId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Analyst,
    Ceo,
    GroupOwner,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Analyst => "analyst",
            UserRole::Ceo => "ceo",
            UserRole::GroupOwner => "group_owner",
        }
    }

    /// Human-readable label used in dashboards and headers.
    pub fn display_name(&self) -> &'static str {
        match self {
            UserRole::Analyst => "Analyst",
            UserRole::Ceo => "CEO",
            UserRole::GroupOwner => "Group Owner",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Profile {
    /// Equals the authenticated user id.
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    pub role: UserRole,
    /// Required for analysts and CEOs, optional for group owners.
    #[serde(default)]
    pub company_id: Option<CompanyId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub id: String,
    pub company_id: CompanyId,
    pub period_year: i32,
    pub period_quarter: u8,
    #[serde(default)]
    pub assets: AccountGroup,
    #[serde(default)]
    pub liabilities: AccountGroup,
    #[serde(default)]
    pub equity: AccountGroup,
    #[serde(default)]
    pub revenue: Option<f64>,
    #[serde(default)]
    pub net_income: Option<f64>,
    #[serde(default)]
    pub uploaded_by: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl BalanceSheet {
    /// "Q{quarter} {year}"
    pub fn period_label(&self) -> String {
        format!("Q{} {}", self.period_quarter, self.period_year)
    }

    pub fn has_valid_quarter(&self) -> bool {
        (1..=4).contains(&self.period_quarter)
    }

    /// Canonical "most recent first" ordering: year desc, then quarter desc.
    pub fn cmp_most_recent_first(&self, other: &Self) -> Ordering {
        other
            .period_year
            .cmp(&self.period_year)
            .then_with(|| other.period_quarter.cmp(&self.period_quarter))
    }
}

/// A balance sheet joined with its owning company, as returned by store queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheetWithCompany {
    #[serde(flatten)]
    pub sheet: BalanceSheet,
    #[serde(rename = "companies", default)]
    pub company: Option<Company>,
}

impl BalanceSheetWithCompany {
    pub fn company_name(&self) -> &str {
        self.company
            .as_ref()
            .map(|c| c.name.as_str())
            .unwrap_or("Unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sheet(year: i32, quarter: u8) -> BalanceSheet {
        serde_json::from_value(json!({
            "id": format!("bs-{}-{}", year, quarter),
            "company_id": "acme",
            "period_year": year,
            "period_quarter": quarter,
            "assets": { "total": 100.0 }
        }))
        .unwrap()
    }

    #[test]
    fn test_period_label() {
        assert_eq!(sheet(2024, 3).period_label(), "Q3 2024");
    }

    #[test]
    fn test_most_recent_first_ordering() {
        let mut sheets = vec![sheet(2023, 4), sheet(2024, 1), sheet(2024, 3), sheet(2022, 2)];
        sheets.sort_by(|a, b| a.cmp_most_recent_first(b));
        let labels: Vec<String> = sheets.iter().map(|s| s.period_label()).collect();
        assert_eq!(labels, vec!["Q3 2024", "Q1 2024", "Q4 2023", "Q2 2022"]);
    }

    #[test]
    fn test_role_serialization() {
        let role: UserRole = serde_json::from_str("\"group_owner\"").unwrap();
        assert_eq!(role, UserRole::GroupOwner);
        assert_eq!(role.display_name(), "Group Owner");
        assert_eq!(serde_json::to_string(&UserRole::Ceo).unwrap(), "\"ceo\"");
    }

    #[test]
    fn test_joined_row_uses_companies_key() {
        let row: BalanceSheetWithCompany = serde_json::from_value(json!({
            "id": "bs-1",
            "company_id": "acme",
            "period_year": 2024,
            "period_quarter": 1,
            "companies": { "id": "acme", "name": "Acme Holdings" }
        }))
        .unwrap();
        assert_eq!(row.company_name(), "Acme Holdings");
        assert!(row.sheet.has_valid_quarter());
    }
}
