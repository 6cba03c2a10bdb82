//! Fair-line probability adjustment.
//!
//! The no-vig probability prices the posted book line. When an outside fair
//! line disagrees with it, the probability is nudged toward the fair line
//! before EV is computed. The nudge is direction dependent: a fair line above
//! the book line makes the over more likely and the under less likely.

use common::Direction;
use serde::{Deserialize, Serialize};

use crate::config::AdjusterParams;
use crate::odds::{cap_ev, expected_value, round_dp};

/// Result of adjusting one side of a prop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    /// Line difference after clamping to the configured maximum.
    pub line_difference: f64,
    /// Signed probability shift before the direction rule is applied.
    pub probability_adjustment: f64,
    pub true_probability: f64,
    /// EV in percent of stake, already capped.
    pub ev: f64,
    /// |fair − book| exceeded the maximum and was clamped.
    pub line_clamped: bool,
    pub probability_clamped: bool,
    pub ev_capped: bool,
}

/// Shift a no-vig probability toward the fair line.
///
/// `line_difference` is `fair_line − book_line`.
pub fn adjust_probability(
    direction: Direction,
    no_vig_probability: f64,
    line_difference: f64,
    params: &AdjusterParams,
) -> (f64, f64, bool) {
    let max = params.max_line_difference;
    let clamped = line_difference.clamp(-max, max);
    let adjustment = clamped * params.per_unit_shift * params.confidence_factor;

    let shifted = match direction {
        Direction::Over => no_vig_probability + adjustment,
        Direction::Under => {
            if clamped > 0.0 {
                no_vig_probability - adjustment.abs()
            } else if clamped < 0.0 {
                no_vig_probability + adjustment.abs()
            } else {
                no_vig_probability
            }
        }
    };

    let bounded = shifted.clamp(params.probability_floor, params.probability_ceiling);
    (round_dp(bounded, 4), adjustment, bounded != shifted)
}

/// Adjust one side and price it at `decimal_odds`.
///
/// Returns `None` for a non-finite input.
pub fn adjusted_ev(
    direction: Direction,
    no_vig_probability: f64,
    line_difference: f64,
    decimal_odds: f64,
    params: &AdjusterParams,
) -> Option<Adjustment> {
    if !no_vig_probability.is_finite() || !line_difference.is_finite() || !decimal_odds.is_finite() {
        return None;
    }

    let max = params.max_line_difference;
    let (true_probability, probability_adjustment, probability_clamped) =
        adjust_probability(direction, no_vig_probability, line_difference, params);
    let (ev, ev_capped) = cap_ev(expected_value(decimal_odds, true_probability), params.ev_cap);

    Some(Adjustment {
        line_difference: line_difference.clamp(-max, max),
        probability_adjustment,
        true_probability,
        ev,
        line_clamped: line_difference.abs() > max,
        probability_clamped,
        ev_capped,
    })
}
