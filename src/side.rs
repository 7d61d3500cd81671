//! The two sides of the operating ledger.
//!
//! Revenues and expenses live in separate tables with identical schemas,
//! as do their category namespaces. Most ledger and category queries are
//! shared and dispatch on the side.

/// Whether a ledger entry or category belongs to the revenue or expense
/// side of the operating ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerSide {
    /// Money coming in: tithes, offerings, reserve fund withdrawals.
    Revenue,
    /// Money going out: bills, purchases, reserve fund deposits.
    Expense,
}

impl LedgerSide {
    /// The table holding this side's ledger entries.
    pub fn entry_table(self) -> &'static str {
        match self {
            LedgerSide::Revenue => "revenue",
            LedgerSide::Expense => "expense",
        }
    }

    /// The table holding this side's categories.
    pub fn category_table(self) -> &'static str {
        match self {
            LedgerSide::Revenue => "revenue_category",
            LedgerSide::Expense => "expense_category",
        }
    }
}
