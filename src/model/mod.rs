//! Election data types and the integrity rules that govern them.

pub mod api;
pub mod ballot;
pub mod candidate;
pub mod clock;
pub mod eligibility;
pub mod identity;
pub mod ledger;
pub mod mongodb;
pub mod results;
