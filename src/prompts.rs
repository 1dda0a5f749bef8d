// Prompt text for the balance sheet analysis request

use crate::schema::UserRole;

pub const SYSTEM_FRAMING: &str = "You are an expert financial analyst specializing in balance sheet analysis. \
You provide actionable insights and recommendations to top management based on financial data.";

pub const ANALYSIS_INSTRUCTIONS: &str = r#"Please analyze the financial data and provide:
1. Key insights about the company's financial health
2. Trends in assets, liabilities, revenue, and profitability
3. Actionable recommendations for management
4. Risk factors to consider
5. Growth opportunities"#;

pub const FORMAT_INSTRUCTIONS: &str =
    "Format your response with clear sections and bullet points for easy reading.";

/// Decision-making audience the answer is tailored to.
pub fn audience_for(role: UserRole) -> &'static str {
    match role {
        UserRole::GroupOwner => "a group owner managing multiple companies",
        UserRole::Ceo => "a CEO making strategic decisions",
        UserRole::Analyst => "an analyst preparing reports",
    }
}

pub fn build_analysis_prompt(context: &str, role: UserRole, message: &str) -> String {
    format!(
        "{SYSTEM_FRAMING}\n\n\
         FINANCIAL DATA:\n{context}\n\n\
         USER ROLE: {role}\n\
         USER QUESTION: {message}\n\n\
         {ANALYSIS_INSTRUCTIONS}\n\n\
         Keep your response concise, professional, and focused on actionable insights that would be valuable for {audience}.\n\n\
         {FORMAT_INSTRUCTIONS}",
        role = role.as_str(),
        audience = audience_for(role),
    )
}
