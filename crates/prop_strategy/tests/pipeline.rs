use common::Direction;
use prop_strategy::quotes::QuoteBook;
use prop_strategy::ranker::dedup_plays;
use prop_strategy::{BookQuote, RankerConfig, Snapshot, StatsAggregator, ValuePlayRanker};

fn make_snapshot() -> Snapshot {
    let bundle = r#"{'draftkings': {'odds': '-110', 'overUnder': '25.5', 'available': True},
                     'fanduel': {'odds': '-110', 'overUnder': '25.5', 'available': True},
                     'betmgm': {'odds': '-110', 'overUnder': '25.5', 'available': True}}"#;
    let rows = serde_json::json!([
        {
            "playerID": "JAYSON_TATUM_1_NBA",
            "propType": "points",
            "direction": "over",
            "bookOverUnder": "25.5",
            "fairOverUnder": "26.5",
            "byBookmaker": bundle,
            "game": "BOS @ NYK"
        },
        {
            "playerID": "JAYSON_TATUM_1_NBA",
            "propType": "points",
            "direction": "under",
            "bookOverUnder": "25.5",
            "fairOverUnder": "26.5",
            "byBookmaker": bundle,
            "game": "BOS @ NYK"
        }
    ]);
    Snapshot::from_json_str(&rows.to_string()).unwrap()
}

#[test]
fn test_end_to_end_over_surfaces_alone() {
    let snapshot = make_snapshot();
    assert_eq!(snapshot.rejected, 0);

    let report = StatsAggregator::default().aggregate(&snapshot.rows);
    assert_eq!(report.stats.len(), 1);
    let stat = &report.stats[0];
    assert_eq!(stat.player, "Jayson Tatum");
    assert_eq!(stat.fair_line, Some(26.5));
    assert_eq!(stat.book_line, Some(25.5));
    assert_eq!(stat.no_vig_over_prob, Some(0.5));
    assert_eq!(stat.no_vig_under_prob, Some(0.5));

    let over_true = stat.over_true_prob.unwrap();
    let under_true = stat.under_true_prob.unwrap();
    assert!((over_true - 0.5638).abs() < 1e-3, "over true {}", over_true);
    assert!((under_true - 0.4362).abs() < 1e-3, "under true {}", under_true);
    assert!(stat.over_ev.unwrap() > 3.0);
    assert!(stat.under_ev.unwrap() < 0.0);

    let ranker = ValuePlayRanker::new(RankerConfig {
        min_ev: 3.0,
        ..RankerConfig::default()
    })
    .unwrap();
    let ranking = ranker.rank(&report.stats);
    assert_eq!(ranking.plays.len(), 1);
    let play = &ranking.plays[0];
    assert_eq!(play.direction, Direction::Over);
    assert!(!play.direction_corrected);
    assert!(ranking.warnings.is_empty());
    assert_eq!(play.price, -110);
    assert_eq!(play.total_bookmakers, 3);
}

#[test]
fn test_ranker_output_survives_second_dedup() {
    let snapshot = make_snapshot();
    let report = StatsAggregator::default().aggregate(&snapshot.rows);
    let ranking = ValuePlayRanker::new(RankerConfig {
        min_ev: -100.0,
        max_ev: 100.0,
        ..RankerConfig::default()
    })
    .unwrap()
    .rank(&report.stats);

    // Both sides pass the EV window; one play per prop survives.
    assert_eq!(ranking.plays.len(), 1);
    let again = dedup_plays(ranking.plays.clone());
    assert_eq!(again, ranking.plays);
}

#[test]
fn test_median_of_three_prices() {
    let quote = |book: &str, price: f64| BookQuote {
        bookmaker: book.to_string(),
        price: Some(price),
        line: Some(20.5),
        available: true,
    };
    // Decimal 1.50, 1.91, 2.20.
    let book = QuoteBook::from_quotes(vec![
        quote("caesars", -200.0),
        quote("pinnacle", -110.0),
        quote("bet365", 120.0),
    ]);
    let median = book.median_quote(Direction::Over).unwrap();
    assert!((median.decimal_price - 1.91).abs() < 1e-3);
    assert_eq!(median.bookmaker, "median(pinnacle)");
}

#[test]
fn test_under_only_books_do_not_lift_coverage() {
    let over_bundle = r#"{"a": {"odds": "-110", "overUnder": "20.5", "available": true},
                          "b": {"odds": "-110", "overUnder": "20.5", "available": true}}"#;
    let under_bundle = r#"{"c": {"odds": "-110", "overUnder": "20.5", "available": true},
                           "d": {"odds": "-110", "overUnder": "20.5", "available": true}}"#;
    let rows = serde_json::json!([
        {
            "playerID": "MIKAL_BRIDGES_1_NBA",
            "propType": "rebounds",
            "direction": "over",
            "bookOverUnder": "20.5",
            "fairOverUnder": "21",
            "byBookmaker": over_bundle
        },
        {
            "playerID": "MIKAL_BRIDGES_1_NBA",
            "propType": "rebounds",
            "direction": "under",
            "bookOverUnder": "20.5",
            "fairOverUnder": "21",
            "byBookmaker": under_bundle
        }
    ]);
    let snapshot = Snapshot::from_json_str(&rows.to_string()).unwrap();
    let report = StatsAggregator::default().aggregate(&snapshot.rows);
    let stat = &report.stats[0];
    assert_eq!(stat.total_bookmakers, 2);
    assert_eq!(stat.over_bookmakers, 2);
    assert_eq!(stat.under_bookmakers, 2);

    // Default coverage floor is three books.
    let ranking = ValuePlayRanker::new(RankerConfig::default())
        .unwrap()
        .rank(&report.stats);
    assert_eq!(ranking.eligible, 0);
    assert!(ranking.plays.is_empty());
}
