//! Odds math: American/decimal conversion, implied probability,
//! vig removal, and expected value.
//!
//! Every function propagates absence: an input no bookmaker could
//! actually quote (zero American odds, decimal odds ≤ 1) yields `None`
//! instead of a bogus number.

/// Stake used when expressing EV as a percentage.
pub const DEFAULT_STAKE: f64 = 100.0;

/// Default magnitude cap applied to EV before filtering/ranking.
pub const DEFAULT_EV_CAP: f64 = 100.0;

/// Round half away from zero to `dp` decimal places.
pub(crate) fn round_dp(value: f64, dp: i32) -> f64 {
    let factor = 10f64.powi(dp);
    (value * factor).round() / factor
}

/// American odds → decimal odds, rounded to 4 dp.
///
/// `+150` → `2.5`, `-110` → `1.9091`. Zero is not a quotable price.
pub fn american_to_decimal(american: f64) -> Option<f64> {
    if !american.is_finite() || american == 0.0 {
        return None;
    }
    let decimal = if american > 0.0 {
        1.0 + american / 100.0
    } else {
        1.0 + 100.0 / american.abs()
    };
    Some(round_dp(decimal, 4))
}

/// Decimal odds → American odds, rounded to the nearest integer.
///
/// Even money (2.0) maps to `+100`.
pub fn decimal_to_american(decimal: f64) -> Option<i64> {
    if !decimal.is_finite() || decimal <= 1.0 {
        return None;
    }
    let american = if decimal >= 2.0 {
        (decimal - 1.0) * 100.0
    } else {
        -100.0 / (decimal - 1.0)
    };
    Some(american.round() as i64)
}

/// Break-even probability implied by decimal odds, rounded to 4 dp.
pub fn implied_probability(decimal: f64) -> Option<f64> {
    if !decimal.is_finite() || decimal <= 0.0 {
        return None;
    }
    Some(round_dp(1.0 / decimal, 4))
}

/// Fair probability → American odds (via decimal `1/p`).
pub fn probability_to_american(probability: f64) -> Option<i64> {
    if !(probability > 0.0 && probability < 1.0) {
        return None;
    }
    decimal_to_american(1.0 / probability)
}

/// Strip the bookmaker margin from an over/under pair of implied
/// probabilities so the pair sums to 1.
///
/// Returns `(None, None)` when either side is missing.
pub fn no_vig_pair(p_over: Option<f64>, p_under: Option<f64>) -> (Option<f64>, Option<f64>) {
    let (Some(over), Some(under)) = (p_over, p_under) else {
        return (None, None);
    };
    let total = over + under;
    if !total.is_finite() || total <= 0.0 {
        return (None, None);
    }
    (
        Some(round_dp(over / total, 4)),
        Some(round_dp(under / total, 4)),
    )
}

/// EV as a percentage of a 100-unit stake.
///
/// `ev = p × stake × (d − 1) − (1 − p) × stake`
pub fn expected_value(decimal: f64, true_probability: f64) -> f64 {
    let potential_profit = DEFAULT_STAKE * (decimal - 1.0);
    let ev = true_probability * potential_profit - (1.0 - true_probability) * DEFAULT_STAKE;
    round_dp(100.0 * ev / DEFAULT_STAKE, 2)
}

/// Same as [`expected_value`] with an explicit stake.
pub fn expected_value_with_stake(decimal: f64, true_probability: f64, stake: f64) -> Option<f64> {
    if !(stake > 0.0) || !decimal.is_finite() || !true_probability.is_finite() {
        return None;
    }
    let potential_profit = stake * (decimal - 1.0);
    let ev = true_probability * potential_profit - (1.0 - true_probability) * stake;
    Some(round_dp(100.0 * ev / stake, 2))
}

/// Clamp EV to `±cap`. The flag reports whether clamping kicked in.
pub fn cap_ev(ev: f64, cap: f64) -> (f64, bool) {
    if ev.abs() > cap {
        (cap.copysign(ev), true)
    } else {
        (ev, false)
    }
}

/// Closing line value in percent: how much better (positive) or worse
/// (negative) the taken price was than the closing price.
pub fn closing_line_value(bet_american: f64, closing_american: f64) -> Option<f64> {
    let bet = american_to_decimal(bet_american)?;
    let closing = american_to_decimal(closing_american)?;
    let clv = if bet > closing {
        (bet / closing - 1.0) * 100.0
    } else {
        -((closing / bet) - 1.0) * 100.0
    };
    Some(round_dp(clv, 2))
}

/// `150` → `"+150"`, `-110` → `"-110"`.
pub fn format_american(american: i64) -> String {
    if american > 0 {
        format!("+{}", american)
    } else {
        american.to_string()
    }
}
