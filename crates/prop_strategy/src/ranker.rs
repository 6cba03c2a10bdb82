//! Value-play ranking.
//!
//! Turns enriched per-prop stats into a short list of directional plays:
//! filter on coverage and line sanity, score each side, make the direction
//! agree with the fair line, keep one play per prop, take the top N.

use std::cmp::Ordering;
use std::collections::HashMap;

use common::{Direction, Error};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::RankerConfig;
use crate::odds::round_dp;
use crate::stats::{DataWarning, EnrichedStat};

/// One directional recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuePlay {
    pub player: String,
    pub prop_type: String,
    pub direction: Direction,
    pub fair_line: Option<f64>,
    pub book_line: Option<f64>,
    /// Median American price for the side that was priced.
    pub price: i64,
    pub bookmaker: Option<String>,
    /// No-vig probability minus implied probability.
    pub edge: f64,
    pub score: f64,
    pub ev: f64,
    pub implied_prob: f64,
    /// Line-adjusted probability behind `ev`. `edge` uses the unadjusted
    /// no-vig probability, so the two can disagree.
    pub true_prob: Option<f64>,
    pub total_bookmakers: usize,
    pub game: Option<String>,
    /// Direction label was flipped to agree with the fair line.
    #[serde(default)]
    pub direction_corrected: bool,
}

/// Ranked plays plus the corrections made along the way.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Ranking {
    pub plays: Vec<ValuePlay>,
    pub warnings: Vec<DataWarning>,
    /// Stats that passed the prop-level filters.
    pub eligible: usize,
}

pub struct ValuePlayRanker {
    config: RankerConfig,
}

impl ValuePlayRanker {
    /// Fails with `Error::Config` on inconsistent thresholds.
    pub fn new(config: RankerConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RankerConfig {
        &self.config
    }

    pub fn rank(&self, stats: &[EnrichedStat]) -> Ranking {
        let eligible: Vec<&EnrichedStat> = stats.iter().filter(|s| self.is_eligible(s)).collect();

        let mut plays: Vec<ValuePlay> = eligible
            .iter()
            .flat_map(|s| {
                [Direction::Over, Direction::Under]
                    .into_iter()
                    .filter_map(move |d| self.candidate(s, d))
            })
            .collect();
        sort_by_score(&mut plays);

        let warnings = correct_directions(&mut plays);
        let mut plays = dedup_plays(plays);
        sort_by_score(&mut plays);
        plays.truncate(self.config.top_n);

        info!(
            stats = stats.len(),
            eligible = eligible.len(),
            plays = plays.len(),
            corrected = warnings.len(),
            "ranked value plays"
        );
        Ranking {
            plays,
            warnings,
            eligible: eligible.len(),
        }
    }

    fn is_eligible(&self, stat: &EnrichedStat) -> bool {
        if stat.total_bookmakers < self.config.min_bookmakers {
            return false;
        }
        let prop = stat.prop_type.to_lowercase();
        if self
            .config
            .exclude_keywords
            .iter()
            .any(|k| prop.contains(&k.to_lowercase()))
        {
            return false;
        }
        match stat.line_difference() {
            Some(diff) => diff.abs() <= self.config.max_line_difference,
            None => {
                debug!(player = %stat.player, prop_type = %stat.prop_type, "no line difference");
                false
            }
        }
    }

    fn candidate(&self, stat: &EnrichedStat, direction: Direction) -> Option<ValuePlay> {
        let (ev, price, bookmaker, no_vig, implied, true_prob) = match direction {
            Direction::Over => (
                stat.over_ev,
                stat.median_over_odds,
                &stat.median_over_bookmaker,
                stat.no_vig_over_prob,
                stat.over_implied_prob,
                stat.over_true_prob,
            ),
            Direction::Under => (
                stat.under_ev,
                stat.median_under_odds,
                &stat.median_under_bookmaker,
                stat.no_vig_under_prob,
                stat.under_implied_prob,
                stat.under_true_prob,
            ),
        };

        let ev = ev?;
        if ev < self.config.min_ev || ev > self.config.max_ev {
            return None;
        }
        let price = price?;
        let implied = implied?;
        let edge = no_vig? - implied;

        let mut score = self.config.ev_weight * ev + self.config.edge_weight * edge * 100.0;
        if price > 0 {
            score *= self.config.plus_money_bonus;
        }

        Some(ValuePlay {
            player: stat.player.clone(),
            prop_type: stat.prop_type.clone(),
            direction,
            fair_line: stat.fair_line,
            book_line: stat.book_line,
            price,
            bookmaker: bookmaker.clone(),
            edge: round_dp(edge, 4),
            score: round_dp(score, 4),
            ev,
            implied_prob: implied,
            true_prob,
            total_bookmakers: stat.total_bookmakers,
            game: stat.game.clone(),
            direction_corrected: false,
        })
    }
}

fn sort_by_score(plays: &mut [ValuePlay]) {
    plays.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}

/// Force each play's label to agree with the fair line: above the book line
/// means OVER, below means UNDER. Returns one warning per flip.
pub fn correct_directions(plays: &mut [ValuePlay]) -> Vec<DataWarning> {
    let mut warnings = Vec::new();
    for play in plays.iter_mut() {
        let (Some(fair), Some(book)) = (play.fair_line, play.book_line) else {
            continue;
        };
        let expected = if fair > book {
            Direction::Over
        } else if fair < book {
            Direction::Under
        } else {
            continue;
        };
        if play.direction != expected {
            let warning = DataWarning::DirectionCorrected {
                player: play.player.clone(),
                prop_type: play.prop_type.clone(),
                from: play.direction,
                to: expected,
            };
            warn!(%warning, "bet direction contradicts fair line");
            warnings.push(warning);
            play.direction = expected;
            play.direction_corrected = true;
        }
    }
    warnings
}

type PlayKey = (String, String, Option<u64>, Option<u64>);

fn play_key(play: &ValuePlay) -> PlayKey {
    (
        play.player.clone(),
        play.prop_type.clone(),
        play.fair_line.map(f64::to_bits),
        play.book_line.map(f64::to_bits),
    )
}

/// Keep the highest-EV play per (player, prop type, fair line, book line).
/// Ties keep the earlier play. Running it on its own output is a no-op.
pub fn dedup_plays(plays: Vec<ValuePlay>) -> Vec<ValuePlay> {
    let mut kept: Vec<ValuePlay> = Vec::with_capacity(plays.len());
    let mut index: HashMap<PlayKey, usize> = HashMap::new();

    for play in plays {
        match index.get(&play_key(&play)) {
            Some(&slot) => {
                if play.ev > kept[slot].ev {
                    kept[slot] = play;
                }
            }
            None => {
                index.insert(play_key(&play), kept.len());
                kept.push(play);
            }
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_stat(player: &str, fair: f64, book: f64, over_ev: f64, under_ev: f64) -> EnrichedStat {
        EnrichedStat {
            player: player.into(),
            prop_type: "points".into(),
            fair_line: Some(fair),
            book_line: Some(book),
            total_bookmakers: 5,
            over_bookmakers: 5,
            under_bookmakers: 5,
            median_over_odds: Some(-110),
            median_under_odds: Some(-110),
            median_over_bookmaker: Some("median(a)".into()),
            median_under_bookmaker: Some("median(b)".into()),
            median_over_decimal: Some(1.9091),
            median_under_decimal: Some(1.9091),
            over_implied_prob: Some(0.5238),
            under_implied_prob: Some(0.5238),
            no_vig_over_prob: Some(0.5),
            no_vig_under_prob: Some(0.5),
            no_vig_over_odds: Some(100),
            no_vig_under_odds: Some(100),
            fair_over_odds: Some(100),
            fair_under_odds: Some(100),
            over_true_prob: Some(0.55),
            under_true_prob: Some(0.45),
            over_ev: Some(over_ev),
            under_ev: Some(under_ev),
            game: None,
            home_team: None,
            away_team: None,
            event_id: None,
        }
    }

    fn make_play(player: &str, direction: Direction, ev: f64, fair: f64, book: f64) -> ValuePlay {
        ValuePlay {
            player: player.into(),
            prop_type: "points".into(),
            direction,
            fair_line: Some(fair),
            book_line: Some(book),
            price: -110,
            bookmaker: None,
            edge: 0.0,
            score: ev,
            ev,
            implied_prob: 0.5238,
            true_prob: None,
            total_bookmakers: 4,
            game: None,
            direction_corrected: false,
        }
    }

    fn make_ranker(min_ev: f64) -> ValuePlayRanker {
        ValuePlayRanker::new(RankerConfig {
            min_ev,
            ..RankerConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_new_rejects_inverted_thresholds() {
        let cfg = RankerConfig {
            min_ev: 50.0,
            max_ev: 10.0,
            ..RankerConfig::default()
        };
        assert!(matches!(ValuePlayRanker::new(cfg), Err(Error::Config(_))));
    }

    #[test]
    fn test_filters_coverage_keywords_and_line_gap() {
        let ranker = make_ranker(0.0);
        let mut thin = make_stat("thin", 26.5, 25.5, 7.0, -15.0);
        thin.total_bookmakers = 2;
        let mut steals = make_stat("steals", 2.5, 1.5, 7.0, -15.0);
        steals.prop_type = "Steals".into();
        let wide = make_stat("wide", 28.5, 25.5, 7.0, -15.0);
        let ok = make_stat("ok", 26.5, 25.5, 7.0, -15.0);

        let ranking = ranker.rank(&[thin, steals, wide, ok]);
        assert_eq!(ranking.eligible, 1);
        assert_eq!(ranking.plays.len(), 1);
        assert_eq!(ranking.plays[0].player, "ok");
    }

    #[test]
    fn test_ev_window_applies_per_side() {
        let ranker = make_ranker(3.0);
        let ranking = ranker.rank(&[make_stat("p", 26.5, 25.5, 7.63, -16.7)]);
        assert_eq!(ranking.plays.len(), 1);
        assert_eq!(ranking.plays[0].direction, Direction::Over);
        assert!(!ranking.plays[0].direction_corrected);

        let too_good = ranker.rank(&[make_stat("p", 26.5, 25.5, 95.0, -16.7)]);
        assert!(too_good.plays.is_empty());
    }

    #[test]
    fn test_score_weights_and_plus_money_bonus() {
        let ranker = make_ranker(0.0);
        let mut plus = make_stat("plus", 26.5, 25.5, 10.0, -20.0);
        plus.median_over_odds = Some(120);
        let minus = make_stat("minus", 26.5, 25.5, 10.0, -20.0);

        let ranking = ranker.rank(&[minus, plus]);
        // edge = 0.5 - 0.5238 = -0.0238 → base = 7.0 - 0.714 = 6.286.
        assert_eq!(ranking.plays[0].player, "plus");
        assert!((ranking.plays[1].score - 6.286).abs() < 1e-9);
        assert!((ranking.plays[0].score - 6.9146).abs() < 1e-9);
    }

    #[test]
    fn test_direction_correction_flips_and_flags() {
        let mut plays = vec![
            make_play("a", Direction::Under, 5.0, 26.5, 25.5),
            make_play("b", Direction::Under, 5.0, 24.5, 25.5),
            make_play("c", Direction::Over, 5.0, 25.5, 25.5),
        ];
        let warnings = correct_directions(&mut plays);
        assert_eq!(warnings.len(), 1);
        assert_eq!(plays[0].direction, Direction::Over);
        assert!(plays[0].direction_corrected);
        assert!(!plays[1].direction_corrected);
        assert_eq!(plays[2].direction, Direction::Over);
    }

    #[test]
    fn test_dedup_keeps_highest_ev() {
        let plays = vec![
            make_play("a", Direction::Over, 4.0, 26.5, 25.5),
            make_play("a", Direction::Over, 9.0, 26.5, 25.5),
            make_play("a", Direction::Over, 6.0, 27.5, 25.5),
        ];
        let kept = dedup_plays(plays);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].ev, 9.0);
        assert_eq!(kept[1].ev, 6.0);
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let plays = vec![
            make_play("a", Direction::Over, 4.0, 26.5, 25.5),
            make_play("a", Direction::Under, 9.0, 26.5, 25.5),
            make_play("b", Direction::Over, 3.0, 10.5, 9.5),
            make_play("b", Direction::Over, 3.0, 10.5, 9.5),
        ];
        let once = dedup_plays(plays);
        let twice = dedup_plays(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_top_n_truncates() {
        let ranker = ValuePlayRanker::new(RankerConfig {
            top_n: 2,
            ..RankerConfig::default()
        })
        .unwrap();
        let stats: Vec<EnrichedStat> = (0..5)
            .map(|i| make_stat(&format!("p{}", i), 26.5, 25.5, 5.0 + i as f64, -10.0))
            .collect();
        let ranking = ranker.rank(&stats);
        assert_eq!(ranking.plays.len(), 2);
        assert_eq!(ranking.plays[0].player, "p4");
        assert_eq!(ranking.plays[1].player, "p3");
    }
}
