//! Per-prop statistics.
//!
//! Joins the over and under rows of every (player, prop type), prices both
//! sides at the bookmaker median, removes the vig, runs the fair-line
//! adjuster, and emits one [`EnrichedStat`] per pair.

use std::collections::HashMap;
use std::fmt;

use common::{Direction, PropRow};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::adjust::{adjusted_ev, Adjustment};
use crate::config::{AdjusterParams, LineSanity};
use crate::odds::{implied_probability, no_vig_pair, probability_to_american};
use crate::quotes::{median, MedianQuote, QuoteBook};

// ── Types ─────────────────────────────────────────────────────────────

/// One output row per (player, prop type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedStat {
    pub player: String,
    pub prop_type: String,
    pub fair_line: Option<f64>,
    pub book_line: Option<f64>,

    pub total_bookmakers: usize,
    pub over_bookmakers: usize,
    pub under_bookmakers: usize,

    pub median_over_odds: Option<i64>,
    pub median_under_odds: Option<i64>,
    pub median_over_bookmaker: Option<String>,
    pub median_under_bookmaker: Option<String>,
    pub median_over_decimal: Option<f64>,
    pub median_under_decimal: Option<f64>,

    pub over_implied_prob: Option<f64>,
    pub under_implied_prob: Option<f64>,
    pub no_vig_over_prob: Option<f64>,
    pub no_vig_under_prob: Option<f64>,
    pub no_vig_over_odds: Option<i64>,
    pub no_vig_under_odds: Option<i64>,
    pub fair_over_odds: Option<i64>,
    pub fair_under_odds: Option<i64>,

    /// Adjusted probabilities the EVs were priced with.
    pub over_true_prob: Option<f64>,
    pub under_true_prob: Option<f64>,
    pub over_ev: Option<f64>,
    pub under_ev: Option<f64>,

    pub game: Option<String>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub event_id: Option<String>,
}

impl EnrichedStat {
    /// `fair_line − book_line` when both are known.
    pub fn line_difference(&self) -> Option<f64> {
        Some(self.fair_line? - self.book_line?)
    }
}

/// Non-fatal data-quality signal raised while processing a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataWarning {
    LargeLineDifference {
        player: String,
        prop_type: String,
        fair_line: f64,
        book_line: f64,
    },
    ExtremeEvCapped {
        player: String,
        prop_type: String,
        direction: Direction,
    },
    DivergentSideLines {
        player: String,
        prop_type: String,
        over_line: f64,
        under_line: f64,
    },
    ImplausibleLine {
        player: String,
        prop_type: String,
        direction: Direction,
        discarded: usize,
    },
    MalformedBundle {
        player: String,
        prop_type: String,
        direction: Direction,
    },
    DirectionCorrected {
        player: String,
        prop_type: String,
        from: Direction,
        to: Direction,
    },
}

impl fmt::Display for DataWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LargeLineDifference {
                player,
                prop_type,
                fair_line,
                book_line,
            } => write!(
                f,
                "{} {}: large line difference (fair {} vs book {})",
                player, prop_type, fair_line, book_line
            ),
            Self::ExtremeEvCapped {
                player,
                prop_type,
                direction,
            } => write!(f, "{} {} {}: extreme EV capped", player, prop_type, direction),
            Self::DivergentSideLines {
                player,
                prop_type,
                over_line,
                under_line,
            } => write!(
                f,
                "{} {}: over line {} differs from under line {}, using over",
                player, prop_type, over_line, under_line
            ),
            Self::ImplausibleLine {
                player,
                prop_type,
                direction,
                discarded,
            } => write!(
                f,
                "{} {} {}: discarded {} quotes with implausible lines",
                player, prop_type, direction, discarded
            ),
            Self::MalformedBundle {
                player,
                prop_type,
                direction,
            } => write!(
                f,
                "{} {} {}: bookmaker bundle unreadable, treated as empty",
                player, prop_type, direction
            ),
            Self::DirectionCorrected {
                player,
                prop_type,
                from,
                to,
            } => write!(
                f,
                "{} {}: direction corrected {} -> {}",
                player, prop_type, from, to
            ),
        }
    }
}

/// Aggregator output: the stats plus every warning raised building them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsReport {
    pub stats: Vec<EnrichedStat>,
    pub warnings: Vec<DataWarning>,
    /// Pairs with only one side present.
    pub skipped: usize,
}

// ── Aggregator ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct PairSlots {
    player: String,
    prop_type: String,
    over: Option<usize>,
    under: Option<usize>,
}

/// Index rows by (player, prop type) in first-seen order.
fn index_pairs(rows: &[PropRow]) -> Vec<PairSlots> {
    let mut pairs: Vec<PairSlots> = Vec::new();
    let mut lookup: HashMap<(String, String), usize> = HashMap::new();

    for (i, row) in rows.iter().enumerate() {
        let player = row.player();
        let key = (player.clone(), row.prop_type.clone());
        let slot = *lookup.entry(key).or_insert_with(|| {
            pairs.push(PairSlots {
                player,
                prop_type: row.prop_type.clone(),
                ..PairSlots::default()
            });
            pairs.len() - 1
        });

        let side = match row.direction {
            Direction::Over => &mut pairs[slot].over,
            Direction::Under => &mut pairs[slot].under,
        };
        if side.is_none() {
            *side = Some(i);
        } else {
            debug!(row = i, direction = %row.direction, "duplicate side row ignored");
        }
    }
    pairs
}

/// Builds [`EnrichedStat`] rows from a snapshot.
#[derive(Debug, Clone, Default)]
pub struct StatsAggregator {
    adjuster: AdjusterParams,
    sanity: LineSanity,
}

impl StatsAggregator {
    pub fn new(adjuster: AdjusterParams, sanity: LineSanity) -> Self {
        Self { adjuster, sanity }
    }

    pub fn aggregate(&self, rows: &[PropRow]) -> StatsReport {
        let mut report = StatsReport::default();

        for pair in index_pairs(rows) {
            let (Some(over_idx), Some(under_idx)) = (pair.over, pair.under) else {
                debug!(player = %pair.player, prop_type = %pair.prop_type, "missing side, skipping");
                report.skipped += 1;
                continue;
            };
            let stat = self.enrich(&pair, &rows[over_idx], &rows[under_idx], &mut report.warnings);
            report.stats.push(stat);
        }

        for warning in &report.warnings {
            warn!(%warning, "data quality");
        }
        info!(
            stats = report.stats.len(),
            skipped = report.skipped,
            warnings = report.warnings.len(),
            "aggregated prop stats"
        );
        report
    }

    fn load_book(
        &self,
        pair: &PairSlots,
        row: &PropRow,
        warnings: &mut Vec<DataWarning>,
    ) -> QuoteBook {
        let book = QuoteBook::for_prop(row.bookmakers.as_ref(), &pair.prop_type, &self.sanity);
        if book.is_malformed() {
            warnings.push(DataWarning::MalformedBundle {
                player: pair.player.clone(),
                prop_type: pair.prop_type.clone(),
                direction: row.direction,
            });
        }
        if book.discarded() > 0 {
            warnings.push(DataWarning::ImplausibleLine {
                player: pair.player.clone(),
                prop_type: pair.prop_type.clone(),
                direction: row.direction,
                discarded: book.discarded(),
            });
        }
        book
    }

    fn enrich(
        &self,
        pair: &PairSlots,
        over: &PropRow,
        under: &PropRow,
        warnings: &mut Vec<DataWarning>,
    ) -> EnrichedStat {
        let over_book = self.load_book(pair, over, warnings);
        let under_book = self.load_book(pair, under, warnings);

        // Both sides are priced against the over row's posted line.
        let book_line = over.book_line;
        if let (Some(over_line), Some(under_line)) = (over.book_line, under.book_line) {
            if over_line != under_line {
                warnings.push(DataWarning::DivergentSideLines {
                    player: pair.player.clone(),
                    prop_type: pair.prop_type.clone(),
                    over_line,
                    under_line,
                });
            }
        }

        let fair_line = over.fair_line.or(under.fair_line).or_else(|| {
            let pooled: Vec<f64> = [over.book_line, under.book_line]
                .into_iter()
                .flatten()
                .chain(over_book.available_lines())
                .chain(under_book.available_lines())
                .collect();
            median(&pooled)
        });

        let median_over = over_book.median_quote(Direction::Over);
        let median_under = under_book.median_quote(Direction::Under);

        let over_implied = median_over.as_ref().and_then(|m| implied_probability(m.decimal_price));
        let under_implied = median_under.as_ref().and_then(|m| implied_probability(m.decimal_price));
        let (no_vig_over, no_vig_under) = no_vig_pair(over_implied, under_implied);
        let no_vig_over_odds = no_vig_over.and_then(probability_to_american);
        let no_vig_under_odds = no_vig_under.and_then(probability_to_american);

        let line_difference = fair_line.zip(book_line).map(|(fair, book)| fair - book);
        if let (Some(fair), Some(book), Some(diff)) = (fair_line, book_line, line_difference) {
            if diff.abs() > self.adjuster.max_line_difference {
                warnings.push(DataWarning::LargeLineDifference {
                    player: pair.player.clone(),
                    prop_type: pair.prop_type.clone(),
                    fair_line: fair,
                    book_line: book,
                });
            }
        }

        let over_adj = self.price_side(
            pair,
            Direction::Over,
            no_vig_over,
            line_difference,
            median_over.as_ref(),
            warnings,
        );
        let under_adj = self.price_side(
            pair,
            Direction::Under,
            no_vig_under,
            line_difference,
            median_under.as_ref(),
            warnings,
        );

        let fair_odds = |supplied: Option<f64>, fallback: Option<i64>| {
            supplied.map(|odds| odds.round() as i64).or(fallback)
        };

        EnrichedStat {
            player: pair.player.clone(),
            prop_type: pair.prop_type.clone(),
            fair_line,
            book_line,
            total_bookmakers: over_book.count_available(None),
            over_bookmakers: over_book.count_available(Some(Direction::Over)),
            under_bookmakers: under_book.count_available(Some(Direction::Under)),
            median_over_odds: median_over.as_ref().map(|m| m.price),
            median_under_odds: median_under.as_ref().map(|m| m.price),
            median_over_bookmaker: median_over.as_ref().map(|m| m.bookmaker.clone()),
            median_under_bookmaker: median_under.as_ref().map(|m| m.bookmaker.clone()),
            median_over_decimal: median_over.as_ref().map(|m| m.decimal_price),
            median_under_decimal: median_under.as_ref().map(|m| m.decimal_price),
            over_implied_prob: over_implied,
            under_implied_prob: under_implied,
            no_vig_over_prob: no_vig_over,
            no_vig_under_prob: no_vig_under,
            no_vig_over_odds,
            no_vig_under_odds,
            fair_over_odds: fair_odds(over.fair_odds, no_vig_over_odds),
            fair_under_odds: fair_odds(under.fair_odds, no_vig_under_odds),
            over_true_prob: over_adj.map(|a| a.true_probability),
            under_true_prob: under_adj.map(|a| a.true_probability),
            over_ev: over_adj.map(|a| a.ev),
            under_ev: under_adj.map(|a| a.ev),
            game: over.game.clone().or_else(|| under.game.clone()),
            home_team: over.home_team.clone().or_else(|| under.home_team.clone()),
            away_team: over.away_team.clone().or_else(|| under.away_team.clone()),
            event_id: over.event_id.clone().or_else(|| under.event_id.clone()),
        }
    }

    fn price_side(
        &self,
        pair: &PairSlots,
        direction: Direction,
        no_vig: Option<f64>,
        line_difference: Option<f64>,
        quote: Option<&MedianQuote>,
        warnings: &mut Vec<DataWarning>,
    ) -> Option<Adjustment> {
        let adj = adjusted_ev(
            direction,
            no_vig?,
            line_difference?,
            quote?.decimal_price,
            &self.adjuster,
        )?;
        if adj.ev_capped {
            warnings.push(DataWarning::ExtremeEvCapped {
                player: pair.player.clone(),
                prop_type: pair.prop_type.clone(),
                direction,
            });
        }
        Some(adj)
    }
}
