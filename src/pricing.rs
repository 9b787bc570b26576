//! Server-side price quoting for print jobs.
//!
//! The quote is always recomputed here from the order attributes; any figure
//! a client submits alongside the form is discarded before this runs.

use rust_decimal::Decimal;

use crate::models::PrintType;

/// Per-page rate in whole currency units.
const RATE_MONOCHROME: i64 = 2;
const RATE_COLOR: i64 = 5;
/// Flat surcharges.
const BINDING_CHARGE: i64 = 30;
const URGENT_CHARGE: i64 = 20;
/// Minimum charge applied when the computed total would otherwise be zero.
const MINIMUM_CHARGE: i64 = 1;

/// Computes the amount owed for a print job. Deterministic and side-effect
/// free: `pages * rate + surcharges`, clamped to the minimum charge.
pub fn price(pages: u32, print_type: PrintType, binding: bool, urgent: bool) -> Decimal {
    let rate = match print_type {
        PrintType::Monochrome => RATE_MONOCHROME,
        PrintType::Color => RATE_COLOR,
    };

    let mut amount = i64::from(pages) * rate;
    if binding {
        amount += BINDING_CHARGE;
    }
    if urgent {
        amount += URGENT_CHARGE;
    }
    if amount == 0 {
        amount = MINIMUM_CHARGE;
    }

    Decimal::from(amount)
}
