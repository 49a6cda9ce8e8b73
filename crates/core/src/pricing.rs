//! Per-item cost and revenue resolution.
//!
//! Pure and deterministic: the same (pricing table, resolution) pair always
//! resolves to the same price. All amounts are integer cents; no floating
//! point ever touches the financial path. Any mismatch here corrupts
//! financial reporting, so this module carries the densest test coverage in
//! the engine.

use serde::{Deserialize, Serialize};

use crate::workflow::Resolution;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How the provider cost of one item is computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "schedule", rename_all = "snake_case")]
pub enum CostSchedule {
    /// One price regardless of output resolution (flash-tier models).
    Flat { cost_cents: i64 },

    /// Resolution-dependent pricing (pro-tier models).
    PerResolution {
        r1k_cents: i64,
        r2k_cents: i64,
        r4k_cents: i64,
    },
}

/// The pricing portion of a workflow template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTable {
    /// Provider cost schedule.
    pub cost: CostSchedule,
    /// Flat per-item revenue billed to the client.
    pub revenue_cents: i64,
}

/// Resolved cost and revenue for a single work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ItemPrice {
    pub cost_cents: i64,
    pub revenue_cents: i64,
}

impl ItemPrice {
    /// Margin in cents. Negative when an item is sold below cost.
    pub fn margin_cents(self) -> i64 {
        self.revenue_cents - self.cost_cents
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve the cost and revenue of one item.
///
/// Aspect ratio never affects price: the provider bills per generated image
/// at a given resolution, and revenue is flat per item.
pub fn resolve(table: &PricingTable, resolution: Resolution) -> ItemPrice {
    let cost_cents = match &table.cost {
        CostSchedule::Flat { cost_cents } => *cost_cents,
        CostSchedule::PerResolution {
            r1k_cents,
            r2k_cents,
            r4k_cents,
        } => match resolution {
            Resolution::R1k => *r1k_cents,
            Resolution::R2k => *r2k_cents,
            Resolution::R4k => *r4k_cents,
        },
    };

    ItemPrice {
        cost_cents,
        revenue_cents: table.revenue_cents,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
