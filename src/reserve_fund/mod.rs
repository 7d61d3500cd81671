//! The reserve fund: a per-church savings sub-ledger.
//!
//! The fund holds a running balance plus an append-only transaction
//! history, and is fed by three operations: manual deposits, manual
//! withdrawals, and a once-a-month automatic sweep of the available
//! balance. Deposits and withdrawals also write a mirrored entry in the
//! operating ledger; each operation runs inside a single database
//! transaction so the two ledgers cannot drift apart on a partial failure.

pub mod auto_transfer;
pub mod core;
pub mod deposit;
pub mod summary;
pub mod withdraw;

pub use auto_transfer::{auto_transfer, auto_transfer_endpoint, run_auto_transfers};
pub use core::{
    FundTransaction, ReserveFund, TransactionKind, create_reserve_fund_tables, get_fund,
    get_or_create_fund, list_transactions,
};
pub use deposit::{deposit, deposit_endpoint};
pub use summary::{get_history_endpoint, get_summary_endpoint};
pub use withdraw::{withdraw, withdraw_endpoint};
