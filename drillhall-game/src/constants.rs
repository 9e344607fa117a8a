//! Shared strings and fixed keys for the Drillhall engine.
//!
//! Balance numbers live in [`crate::config::RulesConfig`]; this module only
//! holds identifiers and narrative text the engine emits.

// Storage ------------------------------------------------------------------
/// Slot holding the JSON array of run records.
pub const RECORDS_SLOT: &str = "drillhall.records";

// Narrative log lines ------------------------------------------------------
pub(crate) const LOG_RUN_START: &str = "Turn 1: Cadet assigned. Drill hall online.";
pub(crate) const LOG_RESET: &str = "New run: state reinitialized.";
pub(crate) const LOG_REJECTED_PREFIX: &str = "[Rejected]";
pub(crate) const LOG_SUCCESS: &str = "Success!";
pub(crate) const LOG_FAILURE: &str = "Failed...";
pub(crate) const LOG_OVERLOAD: &str =
    "(Stress overload!) The cadet refuses the drill and breaks down!";
pub(crate) const LOG_EVENT_PREFIX: &str = "(Event)";
pub(crate) const LOG_COLLAPSE: &str = "The cadet collapsed.";
pub(crate) const LOG_DEFEAT: &str = "Defeat...";
pub(crate) const LOG_CLEARED: &str = "All loops cleared. The run is complete.";

// Rolls --------------------------------------------------------------------
pub(crate) const PERCENT_SCALE: f64 = 100.0;
