//! Durable state owned by the reply engine
//!
//! The only persisted state the engine depends on for correctness is the
//! processed-identifier ledger.

pub mod ledger;

pub use ledger::DedupLedger;
