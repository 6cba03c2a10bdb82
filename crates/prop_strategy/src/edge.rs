//! Cross-bookmaker edge finder.
//!
//! For one target bookmaker, compares each of its quotes with the consensus
//! of every other book on the same prop side. Works on raw rows; no fair
//! line is needed.
//!
//! Two kinds of edge are reported:
//! - same line: the target pays more than the consensus median at the
//!   consensus line;
//! - line shopping: the target posts an easier number (lower for overs,
//!   higher for unders) than the consensus line.

use std::fmt;

use common::{Direction, Error, PropRow};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{EdgeConfig, LineSanity};
use crate::odds::{
    american_to_decimal, decimal_to_american, format_american, implied_probability, round_dp,
};
use crate::quotes::{median, BookQuote, QuoteBook};

// ── Types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonType {
    #[serde(rename = "same line comparison")]
    SameLine,
    #[serde(rename = "line shopping")]
    LineShopping,
}

impl fmt::Display for ComparisonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SameLine => f.pad("same line comparison"),
            Self::LineShopping => f.pad("line shopping"),
        }
    }
}

/// One target-bookmaker opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub player: String,
    pub prop_type: String,
    pub direction: Direction,
    pub target_bookmaker: String,
    pub target_odds: i64,
    pub target_line: f64,
    pub compared_bookmaker: String,
    pub compared_odds: i64,
    pub compared_line: f64,
    pub consensus_line: f64,
    /// Points of line advantage; line shopping only.
    pub line_difference: Option<f64>,
    /// Percentage points.
    pub edge: f64,
    pub ev_percentage: f64,
    pub implied_probability: f64,
    /// Consensus books plus the target.
    pub num_bookmakers: usize,
    pub comparison_type: ComparisonType,
    pub recommendation: String,
    pub other_bookmakers_lines: String,
}

/// Records plus running counters for one scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EdgeScan {
    pub records: Vec<EdgeRecord>,
    /// Rows with readable bookmaker data.
    pub processed: usize,
    /// Rows that produced a record.
    pub valid: usize,
    /// Rows rejected by the line or odds outlier bounds.
    pub outliers: usize,
}

/// Aggregate view of a scan for reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EdgeSummary {
    pub total: usize,
    pub same_line: usize,
    pub line_shopping: usize,
    pub over: usize,
    pub under: usize,
    pub average_edge: Option<f64>,
    pub min_edge: Option<f64>,
    pub max_edge: Option<f64>,
}

impl EdgeScan {
    pub fn summary(&self) -> EdgeSummary {
        let edges: Vec<f64> = self.records.iter().map(|r| r.edge).collect();
        let count = |pred: &dyn Fn(&EdgeRecord) -> bool| {
            self.records.iter().filter(|&r| pred(r)).count()
        };

        EdgeSummary {
            total: self.records.len(),
            same_line: count(&|r| r.comparison_type == ComparisonType::SameLine),
            line_shopping: count(&|r| r.comparison_type == ComparisonType::LineShopping),
            over: count(&|r| r.direction == Direction::Over),
            under: count(&|r| r.direction == Direction::Under),
            average_edge: (!edges.is_empty())
                .then(|| round_dp(edges.iter().sum::<f64>() / edges.len() as f64, 2)),
            min_edge: edges.iter().copied().reduce(f64::min),
            max_edge: edges.iter().copied().reduce(f64::max),
        }
    }
}

// ── Line Groups ───────────────────────────────────────────────────────

/// Other books sharing one half-point-rounded line, in insertion order.
struct LineGroup<'a> {
    line: f64,
    quotes: Vec<(&'a BookQuote, f64)>,
}

fn round_half(line: f64) -> f64 {
    (line * 2.0).round() / 2.0
}

/// The group with the most books; ties go to the group seen first.
fn consensus_group<'a, 'b>(groups: &'b [LineGroup<'a>]) -> Option<&'b LineGroup<'a>> {
    let mut best: Option<&LineGroup<'a>> = None;
    for group in groups {
        if best.map_or(true, |b| group.quotes.len() > b.quotes.len()) {
            best = Some(group);
        }
    }
    best
}

/// Median decimal price of a group and the quote closest to it.
fn group_median<'a>(group: &LineGroup<'a>) -> Option<(f64, &'a BookQuote)> {
    let decimals: Vec<f64> = group.quotes.iter().map(|(_, d)| *d).collect();
    let m = median(&decimals)?;
    let mut closest = group.quotes.first()?;
    for candidate in &group.quotes[1..] {
        if (candidate.1 - m).abs() < (closest.1 - m).abs() {
            closest = candidate;
        }
    }
    Some((m, closest.0))
}

fn describe_lines(quotes: &[(&BookQuote, f64)]) -> String {
    let mut parts: Vec<(&str, String)> = quotes
        .iter()
        .filter_map(|(q, _)| {
            let line = q.line?;
            let price = q.price?;
            Some((
                q.bookmaker.as_str(),
                format!("{}: {} @ {}", q.bookmaker, line, format_american(price.trunc() as i64)),
            ))
        })
        .collect();
    parts.sort_by(|a, b| a.0.cmp(b.0));
    parts.into_iter().map(|(_, s)| s).collect::<Vec<_>>().join("; ")
}

// ── Finder ────────────────────────────────────────────────────────────

enum Outcome {
    Record(EdgeRecord),
    Outlier,
    Skip,
}

pub struct EdgeFinder {
    config: EdgeConfig,
    sanity: LineSanity,
}

impl EdgeFinder {
    /// Fails with `Error::Config` on inconsistent thresholds.
    pub fn new(config: EdgeConfig, sanity: LineSanity) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self { config, sanity })
    }

    /// Scan every row for edges at `target`.
    ///
    /// Errors only when no row quotes the target bookmaker at all.
    pub fn scan(&self, rows: &[PropRow], target: &str) -> Result<EdgeScan, Error> {
        let mut scan = EdgeScan::default();
        let mut target_seen = false;

        for row in rows {
            let book = QuoteBook::for_prop(row.bookmakers.as_ref(), &row.prop_type, &self.sanity);
            if book.is_empty() {
                continue;
            }
            scan.processed += 1;

            let Some(target_quote) = book.get(target) else {
                continue;
            };
            target_seen = true;

            match self.evaluate(row, &book, target_quote) {
                Outcome::Record(record) => {
                    scan.valid += 1;
                    scan.records.push(record);
                }
                Outcome::Outlier => scan.outliers += 1,
                Outcome::Skip => {}
            }
        }

        if !target_seen {
            return Err(Error::BookmakerNotFound(target.to_string()));
        }

        scan.records.sort_by(|a, b| b.ev_percentage.total_cmp(&a.ev_percentage));
        info!(
            bookmaker = target,
            processed = scan.processed,
            valid = scan.valid,
            outliers = scan.outliers,
            "edge scan complete"
        );
        Ok(scan)
    }

    fn evaluate(&self, row: &PropRow, book: &QuoteBook, target: &BookQuote) -> Outcome {
        let player = row.player();
        if !target.available {
            return Outcome::Skip;
        }
        let (Some(target_price), Some(target_line)) = (target.price, target.line) else {
            debug!(%player, prop_type = %row.prop_type, "target quote missing price or line");
            return Outcome::Skip;
        };
        let Some(target_decimal) = american_to_decimal(target_price) else {
            return Outcome::Skip;
        };

        let others: Vec<(&BookQuote, f64)> = book
            .available()
            .filter(|q| q.bookmaker != target.bookmaker && q.line.is_some())
            .filter_map(|q| q.decimal_price().map(|d| (q, d)))
            .collect();

        let mut groups: Vec<LineGroup<'_>> = Vec::new();
        for &(q, d) in &others {
            let Some(line) = q.line.map(round_half) else {
                continue;
            };
            match groups.iter_mut().find(|g| g.line == line) {
                Some(group) => group.quotes.push((q, d)),
                None => groups.push(LineGroup {
                    line,
                    quotes: vec![(q, d)],
                }),
            }
        }
        let Some(consensus) = consensus_group(&groups) else {
            return Outcome::Skip;
        };
        if consensus.quotes.len() < self.config.min_bookmakers {
            return Outcome::Skip;
        }
        let Some((median_decimal, closest)) = group_median(consensus) else {
            return Outcome::Skip;
        };
        let Some(median_american) = decimal_to_american(median_decimal) else {
            return Outcome::Skip;
        };
        let Some(target_implied) = implied_probability(target_decimal) else {
            return Outcome::Skip;
        };

        let target_rounded = round_half(target_line);
        let gap = target_rounded - consensus.line;
        let direction = row.direction;

        let (edge, comparison_type, compared_bookmaker, compared_line, line_difference, recommendation) =
            if gap.abs() <= self.config.same_line_tolerance {
                if (target_price - median_american as f64).abs() > self.config.max_odds_difference {
                    return Outcome::Outlier;
                }
                let Some(median_implied) = implied_probability(median_decimal) else {
                    return Outcome::Skip;
                };
                let edge = round_dp((median_implied - target_implied) * 100.0, 2);
                let recommendation = if edge >= self.config.strong_edge {
                    format!("BET {}", direction)
                } else {
                    "Consider betting".to_string()
                };
                (
                    edge,
                    ComparisonType::SameLine,
                    format!("median({})", closest.bookmaker),
                    consensus.line,
                    None,
                    recommendation,
                )
            } else {
                if gap.abs() > self.config.max_line_difference {
                    return Outcome::Outlier;
                }
                let closest_line = closest.line.unwrap_or(consensus.line);
                let (advantage, recommendation) = match direction {
                    Direction::Over if gap < 0.0 => (closest_line - target_line, "BET OVER on lower line"),
                    Direction::Under if gap > 0.0 => (target_line - closest_line, "BET UNDER on higher line"),
                    _ => return Outcome::Skip,
                };
                if advantage > self.config.max_line_difference {
                    return Outcome::Outlier;
                }
                (
                    round_dp(advantage * self.config.line_shopping_rate, 2),
                    ComparisonType::LineShopping,
                    closest.bookmaker.clone(),
                    closest_line,
                    Some(advantage),
                    recommendation.to_string(),
                )
            };

        if edge < self.config.min_edge {
            return Outcome::Skip;
        }

        Outcome::Record(EdgeRecord {
            player,
            prop_type: row.prop_type.clone(),
            direction,
            target_bookmaker: target.bookmaker.clone(),
            target_odds: target_price.round() as i64,
            target_line,
            compared_bookmaker,
            compared_odds: median_american,
            compared_line,
            consensus_line: consensus.line,
            line_difference,
            edge,
            ev_percentage: round_dp((edge / 100.0) / target_implied * 100.0, 2),
            implied_probability: target_implied,
            num_bookmakers: consensus.quotes.len() + 1,
            comparison_type,
            recommendation,
            other_bookmakers_lines: describe_lines(&others),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::BookmakerBundle;

    fn make_row(direction: Direction, prop: &str, books: &[(&str, i64, f64)]) -> PropRow {
        let entries: Vec<String> = books
            .iter()
            .map(|(b, odds, line)| {
                format!(
                    r#""{}": {{"odds": {}, "overUnder": {}, "available": true}}"#,
                    b, odds, line
                )
            })
            .collect();
        PropRow {
            player_name: Some("Jalen Brunson".into()),
            player_id: None,
            prop_type: prop.into(),
            direction,
            book_line: None,
            fair_line: None,
            fair_odds: None,
            bookmakers: Some(BookmakerBundle::Text(format!("{{{}}}", entries.join(", ")))),
            game: None,
            home_team: None,
            away_team: None,
            event_id: None,
        }
    }

    fn make_finder() -> EdgeFinder {
        EdgeFinder::new(EdgeConfig::default(), LineSanity::default()).unwrap()
    }

    #[test]
    fn test_same_line_edge() {
        let row = make_row(
            Direction::Over,
            "points",
            &[("target", 110, 25.5), ("a", -115, 25.5), ("b", -110, 25.5), ("c", -105, 25.5)],
        );
        let scan = make_finder().scan(&[row], "target").unwrap();
        assert_eq!(scan.records.len(), 1);
        let r = &scan.records[0];
        assert_eq!(r.comparison_type, ComparisonType::SameLine);
        // median 1.9091 (-110): implied 0.5238; target 2.1 → 0.4762.
        assert_eq!(r.edge, 4.76);
        assert_eq!(r.compared_odds, -110);
        assert_eq!(r.compared_bookmaker, "median(b)");
        assert_eq!(r.recommendation, "BET OVER");
        assert_eq!(r.num_bookmakers, 4);
        assert_eq!(r.ev_percentage, 10.0);
        assert_eq!(r.other_bookmakers_lines, "a: 25.5 @ -115; b: 25.5 @ -110; c: 25.5 @ -105");
    }

    #[test]
    fn test_small_same_line_edge_is_soft_recommendation() {
        let row = make_row(
            Direction::Under,
            "rebounds",
            &[("target", 100, 8.5), ("a", -110, 8.5), ("b", -110, 8.5)],
        );
        let r = &make_finder().scan(&[row], "target").unwrap().records[0];
        // 0.5238 - 0.5 = 2.38.
        assert_eq!(r.edge, 2.38);
        assert_eq!(r.recommendation, "Consider betting");
    }

    #[test]
    fn test_odds_outlier_rejected() {
        let row = make_row(
            Direction::Over,
            "rebounds",
            &[("target", 400, 8.5), ("a", -110, 8.5), ("b", -110, 8.5)],
        );
        let scan = make_finder().scan(&[row], "target").unwrap();
        assert!(scan.records.is_empty());
        assert_eq!(scan.outliers, 1);
    }

    #[test]
    fn test_line_shopping_over_on_lower_line() {
        let row = make_row(
            Direction::Over,
            "points",
            &[("target", -110, 24.5), ("a", -110, 25.5), ("b", -110, 25.5)],
        );
        let r = &make_finder().scan(&[row], "target").unwrap().records[0];
        assert_eq!(r.comparison_type, ComparisonType::LineShopping);
        assert_eq!(r.line_difference, Some(1.0));
        assert_eq!(r.edge, 10.0);
        assert_eq!(r.recommendation, "BET OVER on lower line");
        assert_eq!(r.compared_line, 25.5);
    }

    #[test]
    fn test_line_shopping_wrong_side_is_not_an_edge() {
        // A higher over line is a worse number.
        let row = make_row(
            Direction::Over,
            "points",
            &[("target", -110, 26.5), ("a", -110, 25.5), ("b", -110, 25.5)],
        );
        let scan = make_finder().scan(&[row], "target").unwrap();
        assert!(scan.records.is_empty());
        assert_eq!(scan.outliers, 0);
    }

    #[test]
    fn test_line_shopping_under_on_higher_line() {
        let row = make_row(
            Direction::Under,
            "rebounds",
            &[("target", -110, 9.5), ("a", -110, 8.5), ("b", -110, 8.5)],
        );
        let scan = make_finder().scan(&[row], "target").unwrap();
        assert_eq!(scan.records.len(), 1);
        let r = &scan.records[0];
        assert_eq!(r.comparison_type, ComparisonType::LineShopping);
        assert_eq!(r.line_difference, Some(1.0));
        assert_eq!(r.edge, 10.0);
        assert_eq!(r.recommendation, "BET UNDER on higher line");
        assert_eq!(r.compared_line, 8.5);
        assert_eq!(r.ev_percentage, 19.09);
    }

    #[test]
    fn test_under_on_lower_line_is_not_an_edge() {
        let row = make_row(
            Direction::Under,
            "rebounds",
            &[("target", -110, 7.5), ("a", -110, 8.5), ("b", -110, 8.5)],
        );
        let scan = make_finder().scan(&[row], "target").unwrap();
        assert!(scan.records.is_empty());
        assert_eq!(scan.outliers, 0);
    }

    #[test]
    fn test_line_beyond_max_difference_is_outlier() {
        let row = make_row(
            Direction::Under,
            "points",
            &[("target", -110, 29.5), ("a", -110, 25.5), ("b", -110, 25.5)],
        );
        let scan = make_finder().scan(&[row], "target").unwrap();
        assert_eq!(scan.outliers, 1);
    }

    #[test]
    fn test_thin_consensus_skipped() {
        let row = make_row(
            Direction::Over,
            "rebounds",
            &[("target", 110, 8.5), ("a", -110, 8.5), ("b", -110, 9.5)],
        );
        let scan = make_finder().scan(&[row], "target").unwrap();
        assert!(scan.records.is_empty());
        assert_eq!(scan.processed, 1);
    }

    #[test]
    fn test_unknown_target_is_an_error() {
        let row = make_row(Direction::Over, "rebounds", &[("a", -110, 8.5)]);
        let err = make_finder().scan(&[row], "nobody").unwrap_err();
        assert!(matches!(err, Error::BookmakerNotFound(_)));
    }

    #[test]
    fn test_records_sorted_by_ev_and_summarized() {
        let rows = vec![
            make_row(
                Direction::Under,
                "rebounds",
                &[("target", 100, 8.5), ("a", -110, 8.5), ("b", -110, 8.5)],
            ),
            make_row(
                Direction::Over,
                "points",
                &[("target", -110, 24.5), ("a", -110, 25.5), ("b", -110, 25.5)],
            ),
        ];
        let scan = make_finder().scan(&rows, "target").unwrap();
        assert_eq!(scan.records.len(), 2);
        assert!(scan.records[0].ev_percentage >= scan.records[1].ev_percentage);

        let summary = scan.summary();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.same_line, 1);
        assert_eq!(summary.line_shopping, 1);
        assert_eq!(summary.over, 1);
        assert_eq!(summary.under, 1);
        assert_eq!(summary.max_edge, Some(10.0));
        assert_eq!(summary.min_edge, Some(2.38));
    }
}
