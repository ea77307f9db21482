//! Query side
//!
//! Read-only views over balances and the transaction history. Reads never
//! open a unit of work.

mod balance_reader;
mod history_reader;

pub use balance_reader::BalanceReader;
pub use history_reader::{HistoryQuery, HistoryReader, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
