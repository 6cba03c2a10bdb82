//! Configuration structs for the prop strategy.
//!
//! Every heuristic constant lives here under a name so it can be tuned
//! from `config.toml` and tested on its own.

use common::Error;
use serde::{Deserialize, Serialize};

// ── Named Constants ───────────────────────────────────────────────────

/// Largest |fair − book| the adjuster will act on; bigger gaps are capped.
pub const MAX_LINE_DIFFERENCE: f64 = 4.0;
/// Probability shift per unit of line difference.
pub const PER_UNIT_SHIFT: f64 = 0.075;
/// Discount applied to the raw shift.
pub const CONFIDENCE_FACTOR: f64 = 0.85;
/// Hard floor for an adjusted probability.
pub const PROBABILITY_FLOOR: f64 = 0.15;
/// Hard ceiling for an adjusted probability.
pub const PROBABILITY_CEILING: f64 = 0.85;
/// Edge percentage points credited per point of line advantage.
pub const LINE_SHOPPING_RATE: f64 = 10.0;
/// Largest American-odds gap tolerated against the consensus median.
pub const MAX_ODDS_DIFFERENCE: f64 = 300.0;
/// Minimum plausible line for a points prop.
pub const POINTS_LINE_FLOOR: f64 = 10.0;

/// Fair-line probability adjuster parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjusterParams {
    #[serde(default = "default_max_line_difference")]
    pub max_line_difference: f64,

    #[serde(default = "default_per_unit_shift")]
    pub per_unit_shift: f64,

    #[serde(default = "default_confidence_factor")]
    pub confidence_factor: f64,

    #[serde(default = "default_probability_floor")]
    pub probability_floor: f64,

    #[serde(default = "default_probability_ceiling")]
    pub probability_ceiling: f64,

    #[serde(default = "default_ev_cap")]
    pub ev_cap: f64,
}

/// Line plausibility guard applied before any aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSanity {
    /// Prop types containing this keyword (case-insensitive) are checked.
    #[serde(default = "default_points_keyword")]
    pub points_keyword: String,

    /// Lines below this floor are treated as a mis-mapped field.
    #[serde(default = "default_points_floor")]
    pub points_floor: f64,
}

/// Value-play ranker thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankerConfig {
    #[serde(default = "default_min_bookmakers")]
    pub min_bookmakers: usize,

    #[serde(default = "default_exclude_keywords")]
    pub exclude_keywords: Vec<String>,

    /// Stricter than the adjuster cap: props beyond this are dropped.
    #[serde(default = "default_ranker_max_line_diff")]
    pub max_line_difference: f64,

    #[serde(default = "default_min_ev")]
    pub min_ev: f64,

    #[serde(default = "default_max_ev")]
    pub max_ev: f64,

    #[serde(default = "default_top_n")]
    pub top_n: usize,

    #[serde(default = "default_ev_weight")]
    pub ev_weight: f64,

    #[serde(default = "default_edge_weight")]
    pub edge_weight: f64,

    /// Score multiplier for plus-money prices.
    #[serde(default = "default_plus_money_bonus")]
    pub plus_money_bonus: f64,
}

/// Cross-bookmaker edge finder thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeConfig {
    /// Minimum edge in percentage points.
    #[serde(default = "default_min_edge")]
    pub min_edge: f64,

    /// Minimum other books backing the consensus line.
    #[serde(default = "default_edge_min_bookmakers")]
    pub min_bookmakers: usize,

    /// Lines within this distance of consensus count as the same line.
    #[serde(default = "default_same_line_tolerance")]
    pub same_line_tolerance: f64,

    #[serde(default = "default_edge_max_line_diff")]
    pub max_line_difference: f64,

    #[serde(default = "default_max_odds_difference")]
    pub max_odds_difference: f64,

    #[serde(default = "default_line_shopping_rate")]
    pub line_shopping_rate: f64,

    /// Same-line edges at or above this get a firm "BET" label.
    #[serde(default = "default_strong_edge")]
    pub strong_edge: f64,
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_max_line_difference() -> f64 {
    MAX_LINE_DIFFERENCE
}
fn default_per_unit_shift() -> f64 {
    PER_UNIT_SHIFT
}
fn default_confidence_factor() -> f64 {
    CONFIDENCE_FACTOR
}
fn default_probability_floor() -> f64 {
    PROBABILITY_FLOOR
}
fn default_probability_ceiling() -> f64 {
    PROBABILITY_CEILING
}
fn default_ev_cap() -> f64 {
    crate::odds::DEFAULT_EV_CAP
}
fn default_points_keyword() -> String {
    "points".into()
}
fn default_points_floor() -> f64 {
    POINTS_LINE_FLOOR
}
fn default_min_bookmakers() -> usize {
    3
}
fn default_exclude_keywords() -> Vec<String> {
    vec!["steals".into(), "blocks".into()]
}
fn default_ranker_max_line_diff() -> f64 {
    2.0
}
fn default_min_ev() -> f64 {
    0.0
}
fn default_max_ev() -> f64 {
    80.0
}
fn default_top_n() -> usize {
    100
}
fn default_ev_weight() -> f64 {
    0.7
}
fn default_edge_weight() -> f64 {
    0.3
}
fn default_plus_money_bonus() -> f64 {
    1.1
}
fn default_min_edge() -> f64 {
    2.0
}
fn default_edge_min_bookmakers() -> usize {
    2
}
fn default_same_line_tolerance() -> f64 {
    0.5
}
fn default_edge_max_line_diff() -> f64 {
    2.0
}
fn default_max_odds_difference() -> f64 {
    MAX_ODDS_DIFFERENCE
}
fn default_line_shopping_rate() -> f64 {
    LINE_SHOPPING_RATE
}
fn default_strong_edge() -> f64 {
    3.0
}

impl Default for AdjusterParams {
    fn default() -> Self {
        Self {
            max_line_difference: default_max_line_difference(),
            per_unit_shift: default_per_unit_shift(),
            confidence_factor: default_confidence_factor(),
            probability_floor: default_probability_floor(),
            probability_ceiling: default_probability_ceiling(),
            ev_cap: default_ev_cap(),
        }
    }
}

impl Default for LineSanity {
    fn default() -> Self {
        Self {
            points_keyword: default_points_keyword(),
            points_floor: default_points_floor(),
        }
    }
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            min_bookmakers: default_min_bookmakers(),
            exclude_keywords: default_exclude_keywords(),
            max_line_difference: default_ranker_max_line_diff(),
            min_ev: default_min_ev(),
            max_ev: default_max_ev(),
            top_n: default_top_n(),
            ev_weight: default_ev_weight(),
            edge_weight: default_edge_weight(),
            plus_money_bonus: default_plus_money_bonus(),
        }
    }
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            min_edge: default_min_edge(),
            min_bookmakers: default_edge_min_bookmakers(),
            same_line_tolerance: default_same_line_tolerance(),
            max_line_difference: default_edge_max_line_diff(),
            max_odds_difference: default_max_odds_difference(),
            line_shopping_rate: default_line_shopping_rate(),
            strong_edge: default_strong_edge(),
        }
    }
}

// ── Validation ────────────────────────────────────────────────────────

fn require(ok: bool, msg: impl Into<String>) -> Result<(), Error> {
    if ok {
        Ok(())
    } else {
        Err(Error::Config(msg.into()))
    }
}

impl AdjusterParams {
    pub fn validate(&self) -> Result<(), Error> {
        require(
            self.max_line_difference >= 0.0,
            "adjuster.max_line_difference must be >= 0",
        )?;
        require(
            (0.0..=1.0).contains(&self.confidence_factor),
            "adjuster.confidence_factor must be within [0, 1]",
        )?;
        require(
            0.0 <= self.probability_floor
                && self.probability_floor < self.probability_ceiling
                && self.probability_ceiling <= 1.0,
            format!(
                "adjuster probability bounds invalid: floor={} ceiling={}",
                self.probability_floor, self.probability_ceiling
            ),
        )?;
        require(self.ev_cap > 0.0, "adjuster.ev_cap must be > 0")
    }
}

impl RankerConfig {
    /// Reject thresholds that cannot describe any play.
    pub fn validate(&self) -> Result<(), Error> {
        require(
            self.min_ev.is_finite() && self.max_ev.is_finite(),
            "ranker EV thresholds must be finite",
        )?;
        require(
            self.min_ev <= self.max_ev,
            format!(
                "ranker.min_ev ({}) is greater than ranker.max_ev ({})",
                self.min_ev, self.max_ev
            ),
        )?;
        require(
            self.max_line_difference >= 0.0,
            "ranker.max_line_difference must be >= 0",
        )?;
        require(self.top_n > 0, "ranker.top_n must be > 0")?;
        require(
            self.plus_money_bonus > 0.0,
            "ranker.plus_money_bonus must be > 0",
        )
    }
}

impl EdgeConfig {
    pub fn validate(&self) -> Result<(), Error> {
        require(self.min_edge.is_finite(), "edge.min_edge must be finite")?;
        require(self.min_bookmakers >= 1, "edge.min_bookmakers must be >= 1")?;
        require(
            self.same_line_tolerance >= 0.0,
            "edge.same_line_tolerance must be >= 0",
        )?;
        require(
            self.max_line_difference >= self.same_line_tolerance,
            format!(
                "edge.max_line_difference ({}) is below edge.same_line_tolerance ({})",
                self.max_line_difference, self.same_line_tolerance
            ),
        )?;
        require(
            self.max_odds_difference > 0.0,
            "edge.max_odds_difference must be > 0",
        )
    }
}
