//! Keyword-based account classification.

use super::types::AccountType;

/// Keyword tables, checked in order. The first table with a keyword
/// contained in the account name wins.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "assets",
        &["cash", "bank", "receivable", "inventory", "equipment", "building", "assets"],
    ),
    ("liabilities", &["payable", "debt", "loan", "liability", "accrued"]),
    ("equity", &["equity", "capital", "retained", "earnings"]),
    ("revenue", &["revenue", "income", "sales", "turnover"]),
    ("expenses", &["expense", "cost", "salary", "rent", "utilities"]),
];

/// Category assigned when no keyword matches.
pub const UNCATEGORIZED: &str = "other";

/// Infers the account type and category from an account name.
#[must_use]
pub fn categorize_account(name: &str) -> (AccountType, &'static str) {
    let lower = name.trim().to_lowercase();
    if lower.is_empty() {
        return (AccountType::Unknown, UNCATEGORIZED);
    }

    CATEGORIES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map_or((AccountType::Unknown, UNCATEGORIZED), |(category, _)| {
            (category_type(category), *category)
        })
}

fn category_type(category: &str) -> AccountType {
    match category {
        "assets" => AccountType::Asset,
        "liabilities" => AccountType::Liability,
        "equity" => AccountType::Equity,
        "revenue" => AccountType::Revenue,
        "expenses" => AccountType::Expense,
        _ => AccountType::Unknown,
    }
}
