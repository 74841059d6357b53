use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One `(duration, percent)` pair a product can be taken out at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermOption {
    /// Term in months.
    pub duration: u32,
    /// Annual percentage as offered to the customer, e.g. `12` for 12%.
    pub percent: Decimal,
}

impl TermOption {
    pub fn new(duration: u32, percent: Decimal) -> Self {
        Self { duration, percent }
    }
}

/// Catalogue entry shared by loan types and deposit types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductType {
    /// Unique within its catalogue.
    pub name: String,
    pub options: Vec<TermOption>,
    pub available: bool,
}

pub type LoanType = ProductType;
pub type DepositType = ProductType;

impl ProductType {
    pub fn new(name: impl Into<String>, options: Vec<TermOption>) -> Self {
        Self {
            name: name.into(),
            options,
            available: true,
        }
    }

    /// Exact match on both duration and percent.
    pub fn find_option(&self, duration: u32, percent: Decimal) -> Option<TermOption> {
        self.options
            .iter()
            .copied()
            .find(|o| o.duration == duration && o.percent == percent)
    }
}
