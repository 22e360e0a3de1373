//! Data produced by extraction and batch runs.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Label for physical goods, prizes, supplies and anything ambiguous.
pub const MATERIALS_LABEL: &str = "物料";

/// Label for food, drinks, snacks and catering.
pub const REFRESHMENTS_LABEL: &str = "茶歇";

/// Expense category of a line item.
///
/// The model is asked for one of the two fixed labels. Anything else it
/// returns is kept verbatim in [`Category::Other`] rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    #[default]
    Materials,
    Refreshments,
    Other(String),
}

impl Category {
    pub fn label(&self) -> &str {
        match self {
            Category::Materials => MATERIALS_LABEL,
            Category::Refreshments => REFRESHMENTS_LABEL,
            Category::Other(s) => s,
        }
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        let trimmed = s.trim();
        if trimmed == MATERIALS_LABEL || trimmed.eq_ignore_ascii_case("materials") {
            Category::Materials
        } else if trimmed == REFRESHMENTS_LABEL
            || trimmed.eq_ignore_ascii_case("tea break")
            || trimmed.eq_ignore_ascii_case("refreshments")
        {
            Category::Refreshments
        } else {
            Category::Other(trimmed.to_string())
        }
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.label().to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One expense line. Every document becomes exactly one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: Category,
    /// Source filename without its extension; never taken from the model.
    pub name: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_amount: f64,
    /// Always empty after extraction.
    #[serde(default, deserialize_with = "null_as_default")]
    pub remarks: String,
}

impl InvoiceItem {
    /// Check numeric ranges the schema cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if !self.quantity.is_finite() || self.quantity <= 0.0 {
            return Err(format!("quantity must be positive, got {}", self.quantity));
        }
        if !self.unit_price.is_finite() || self.unit_price < 0.0 {
            return Err(format!(
                "unitPrice must be non-negative, got {}",
                self.unit_price
            ));
        }
        if !self.total_amount.is_finite() || self.total_amount < 0.0 {
            return Err(format!(
                "totalAmount must be non-negative, got {}",
                self.total_amount
            ));
        }
        Ok(())
    }
}

// `null` is treated like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parsed answer for one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Required: an answer without `items` is not an extraction.
    pub items: Vec<InvoiceItem>,
}

/// Which file of the batch is being worked on. 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub current: usize,
    pub total: usize,
    pub filename: String,
}

/// A file that produced no items because normalisation or extraction failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPhase {
    #[default]
    Idle,
    Running,
}

/// Everything the presentation layer renders. Lives in memory only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchState {
    pub phase: BatchPhase,
    /// Accumulated items, in processing order.
    pub items: Vec<InvoiceItem>,
    pub progress: Option<BatchProgress>,
    pub error: Option<String>,
    /// Last non-empty title the model produced.
    pub title: Option<String>,
}

impl BatchState {
    pub fn is_running(&self) -> bool {
        self.phase == BatchPhase::Running
    }

    /// Sum of `totalAmount` over all accumulated items.
    pub fn grand_total(&self) -> f64 {
        self.items.iter().map(|i| i.total_amount).sum()
    }
}

/// Outcome of one batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub files_total: usize,
    pub items_added: usize,
    /// Failures in processing order.
    pub failures: Vec<FileFailure>,
    /// The user-facing summary, if any.
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl BatchReport {
    pub fn failed_filenames(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.filename.as_str()).collect()
    }
}
