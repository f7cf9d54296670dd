//! The IronJudge execution engine.
//!
//! The engine follows a **Think → Act → Observe** cycle:
//!
//! 1. **Render** the ledger and tool catalog into the system prompt
//! 2. **Infer** the next directive from the completion service
//! 3. **Parse** it against the protocol, self-healing on malformed output
//! 4. **Act** on the enforcement tag, dispatching at most one tool
//! 5. **Record** the outcome in the ledger and emit telemetry
//!
//! The loop continues until the model issues `[ENFORCE: TERMINATE]`, the
//! completion service fails fatally, or the iteration budget is spent.

pub mod engine;
pub mod ledger;
pub mod parser;
pub mod prompt;
pub mod stream_event;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use engine::{Engine, RunReport, self_heal_message};
pub use ledger::{Ledger, LedgerEntry, LedgerWindows};
pub use parser::{Enforcement, FormatViolation, ParsedDirective, parse};
pub use prompt::{Blueprint, TOOL_REGISTRY_PLACEHOLDER};
pub use stream_event::{HaltReason, TelemetryEvent};
