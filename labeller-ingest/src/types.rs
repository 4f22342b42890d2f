use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const NAME_COLUMN: &str = "Name";
pub const CATEGORY_COLUMN: &str = "Category";
pub const FLAG_COLUMN: &str = "Flag";
pub const DATE_COLUMN: &str = "Date";
pub const AMOUNT_COLUMN: &str = "Amount";
pub const ACCOUNT_COLUMN: &str = "Account";

/// One training example: a description and its human-assigned category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledDescription {
    pub name: String,
    pub category: String,
}

/// A transaction row as seen by a reviewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub name: String,
    pub date: Option<NaiveDate>,
    pub amount: Option<f64>,
    pub account: Option<String>,
    /// Empty until labeled.
    pub category: String,
    /// Reviewer flag for follow-up.
    pub flag: bool,
}

impl TransactionRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            date: None,
            amount: None,
            account: None,
            category: String::new(),
            flag: false,
        }
    }

    pub fn is_labeled(&self) -> bool {
        !self.category.trim().is_empty()
    }
}

/// Parse dates in the formats bank exports commonly use.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    // Two-digit years first: %Y would accept "26" as year 0026.
    ["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Parse `12.50`, `$1,204.00`, `-3.10` or `(3.10)`.
pub fn parse_amount(s: &str) -> Option<f64> {
    let s = s.trim();
    let (negative, body) = match s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, s),
    };
    let cleaned: String = body.chars().filter(|c| *c != '$' && *c != ',').collect();
    let value: f64 = cleaned.trim().parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Accepts `true`/`false` in any case plus `1`/`0`, `yes`/`no`. Anything else is unflagged.
pub fn parse_flag(s: &str) -> bool {
    matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "y")
}
