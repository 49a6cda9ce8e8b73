//! Execution and item lifecycle rules.
//!
//! This module lives in `core` (zero internal deps) so it can be used by
//! both the engine and the repository layer. Status ids are intentionally
//! duplicated from the `db` crate's status enums; the ids match the
//! `*_statuses` lookup-table seed order.

use serde::Serialize;

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Status ids shared by executions and items (1-based SMALLSERIAL).
pub mod state_machine {
    /// Returns the valid target status ids reachable from `from_status`.
    ///
    /// The lifecycle is strictly monotonic: Pending=1 -> Processing=2 ->
    /// {Completed=3, Failed=4}. A pending entity may also fail directly
    /// (cancellation, timeout). Terminal states return an empty slice.
    pub fn valid_transitions(from_status: i16) -> &'static [i16] {
        match from_status {
            // Pending -> Processing, Failed
            1 => &[2, 4],
            // Processing -> Completed, Failed
            2 => &[3, 4],
            // Terminal: Completed, Failed
            3 | 4 => &[],
            // Unknown status: no transitions allowed
            _ => &[],
        }
    }

    /// Check whether a transition from `from` to `to` is valid.
    pub fn can_transition(from: i16, to: i16) -> bool {
        valid_transitions(from).contains(&to)
    }

    /// Whether a status id is terminal.
    pub fn is_terminal(status: i16) -> bool {
        matches!(status, 3 | 4)
    }
}

// ---------------------------------------------------------------------------
// Terminal-status policy
// ---------------------------------------------------------------------------

/// Terminal status of a fully settled execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalStatus {
    Completed,
    Failed,
}

/// Decide the terminal status of an execution from its item tallies.
///
/// Policy: `Completed` as soon as at least one item completed, even when
/// siblings failed. Partial success is success, with the failure count
/// surfaced in the output summary. `Failed` is reserved for every single
/// item failing.
///
/// Callers must only invoke this once no item is pending or processing.
pub fn resolve_terminal(completed: i64, failed: i64) -> TerminalStatus {
    if completed > 0 {
        TerminalStatus::Completed
    } else {
        debug_assert!(failed > 0, "resolve_terminal called with no terminal items");
        TerminalStatus::Failed
    }
}

// ---------------------------------------------------------------------------
// Output summary
// ---------------------------------------------------------------------------

/// Aggregate written to `executions.output_summary` at finalize time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputSummary {
    pub total_items: i64,
    pub completed_items: i64,
    pub failed_items: i64,
    pub total_cost_cents: i64,
    pub total_revenue_cents: i64,
}

impl OutputSummary {
    /// Human-readable error summary for partially or fully failed runs.
    /// Returns `None` when every item completed.
    pub fn error_summary(&self) -> Option<String> {
        if self.failed_items == 0 {
            None
        } else {
            Some(format!(
                "{} of {} items failed",
                self.failed_items, self.total_items
            ))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
