//! Field normalization (§4.1): general name normalization, fund-manager
//! alias resolution, and DBA/trade-name extraction.

pub mod dba;
pub mod fund_manager;
pub mod general;

pub use dba::{contains_dba_marker, extract_dba, DbaSplit};
pub use fund_manager::normalize_fund_manager;
pub use general::{normalize_name, word_multiset};
