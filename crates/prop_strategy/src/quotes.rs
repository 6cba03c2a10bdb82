//! Bookmaker quote extraction and consensus selection.
//!
//! Feed rows carry every bookmaker's quote in one bundle, which may be a
//! structured object or a text blob of uneven quality. Text goes through an
//! ordered chain of parser strategies; the first one that yields an object
//! wins. Nothing here returns an error: a bundle no strategy can read is an
//! empty [`QuoteBook`] flagged as malformed.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use common::{value_as_f64, BookmakerBundle, Direction, PropRow};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::LineSanity;
use crate::odds::{american_to_decimal, decimal_to_american};

/// Price field inside a bookmaker entry.
const PRICE_FIELD: &str = "odds";

/// Line fields in precedence order; the first one present wins.
const LINE_FIELDS: &[&str] = &["overUnder", "line", "total", "value"];

/// Extra line fields some feeds use for points props.
const POINTS_LINE_FIELDS: &[&str] = &["points", "playerTotal", "pointsHandicap"];

// ── Types ─────────────────────────────────────────────────────────────

/// One bookmaker's quote for a single prop side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookQuote {
    pub bookmaker: String,
    /// American odds.
    pub price: Option<f64>,
    pub line: Option<f64>,
    pub available: bool,
}

impl BookQuote {
    pub fn decimal_price(&self) -> Option<f64> {
        self.price.and_then(american_to_decimal)
    }
}

/// Consensus quote: median decimal price across available books, tagged
/// with the real bookmaker whose price sits closest to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedianQuote {
    /// Median price in American odds.
    pub price: i64,
    pub decimal_price: f64,
    /// `median(<closest bookmaker>)`.
    pub bookmaker: String,
    /// Line posted by the closest bookmaker.
    pub line: Option<f64>,
}

/// All bookmaker quotes parsed from one bundle, ordered by bookmaker name.
#[derive(Debug, Clone, Default)]
pub struct QuoteBook {
    quotes: Vec<BookQuote>,
    malformed: bool,
    discarded: usize,
}

// ── Parser Chain ──────────────────────────────────────────────────────

type ParseStrategy = fn(&str) -> Result<Map<String, Value>, String>;

const STRATEGIES: &[(&str, ParseStrategy)] = &[
    ("json", parse_strict_json),
    ("python-literal", parse_python_literal),
    ("pattern-recovery", recover_blocks),
];

fn parse_strict_json(text: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected an object, got {}", json_kind(&other))),
        Err(e) => Err(e.to_string()),
    }
}

/// Python dict literals: single quotes plus `True`/`False`/`None`.
fn parse_python_literal(text: &str) -> Result<Map<String, Value>, String> {
    let quoted = text.replace('\'', "\"");
    let normalized = literal_pattern().replace_all(&quoted, |caps: &regex::Captures<'_>| {
        match &caps[0] {
            "True" => "true",
            "False" => "false",
            _ => "null",
        }
    });
    parse_strict_json(&normalized)
}

/// Last resort: pull out every `"book": {...}` block and read its
/// key/value pairs one by one.
fn recover_blocks(text: &str) -> Result<Map<String, Value>, String> {
    let mut recovered = Map::new();
    for caps in block_pattern().captures_iter(text) {
        let book = caps[1].trim().to_string();
        let body = &caps[2];

        let fields = serde_json::from_str::<Map<String, Value>>(&format!("{{{}}}", body))
            .unwrap_or_else(|_| recover_fields(body));
        recovered.insert(book, Value::Object(fields));
    }

    if recovered.is_empty() {
        Err("no bookmaker blocks found".into())
    } else {
        Ok(recovered)
    }
}

fn recover_fields(body: &str) -> Map<String, Value> {
    field_pattern()
        .captures_iter(body)
        .map(|caps| (caps[1].to_string(), scalar_from_text(caps[2].trim())))
        .collect()
}

fn scalar_from_text(raw: &str) -> Value {
    match raw {
        "true" | "True" => Value::Bool(true),
        "false" | "False" => Value::Bool(false),
        "null" | "None" => Value::Null,
        _ => match raw.parse::<f64>() {
            Ok(n) => serde_json::Number::from_f64(n)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(raw.to_string())),
            Err(_) => Value::String(raw.to_string()),
        },
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn literal_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b(True|False|None)\b").expect("literal pattern is valid"))
}

fn block_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"["']([^"']+)["']\s*:\s*\{([^{}]*)\}"#).expect("block pattern is valid")
    })
}

fn field_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"["']?([A-Za-z_][A-Za-z0-9_]*)["']?\s*:\s*["']?([^,"'{}]+)["']?"#)
            .expect("field pattern is valid")
    })
}

/// Run the parser chain over a text bundle.
fn parse_text(text: &str) -> Option<Map<String, Value>> {
    for (name, strategy) in STRATEGIES {
        match strategy(text) {
            Ok(map) => {
                debug!(strategy = *name, books = map.len(), "parsed bookmaker bundle");
                return Some(map);
            }
            Err(reason) => debug!(strategy = *name, %reason, "bundle strategy failed"),
        }
    }
    None
}

// ── Extraction ────────────────────────────────────────────────────────

fn is_points_prop(prop_type: &str) -> bool {
    prop_type.to_ascii_lowercase().contains("points")
}

fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn quote_from_entry(bookmaker: &str, entry: &Map<String, Value>, prop_type: &str) -> BookQuote {
    let points = is_points_prop(prop_type);
    let line = LINE_FIELDS
        .iter()
        .chain(POINTS_LINE_FIELDS.iter().filter(|_| points))
        .find_map(|field| entry.get(*field).and_then(value_as_f64));

    BookQuote {
        bookmaker: bookmaker.to_string(),
        price: entry.get(PRICE_FIELD).and_then(value_as_f64),
        line,
        available: entry.get("available").and_then(as_flag).unwrap_or(false),
    }
}

/// Parse a bundle into a [`QuoteBook`]. Missing bundles are empty books.
pub fn extract_quotes(bundle: Option<&BookmakerBundle>, prop_type: &str) -> QuoteBook {
    let (map, malformed) = match bundle {
        None => (Map::new(), false),
        Some(BookmakerBundle::Structured(map)) => (map.clone(), false),
        Some(BookmakerBundle::Text(text)) if text.trim().is_empty() => (Map::new(), false),
        Some(BookmakerBundle::Text(text)) => match parse_text(text.trim()) {
            Some(map) => (map, false),
            None => (Map::new(), true),
        },
    };

    let quotes = map
        .iter()
        .filter_map(|(book, entry)| {
            entry
                .as_object()
                .map(|entry| quote_from_entry(book, entry, prop_type))
        })
        .collect();

    QuoteBook {
        quotes,
        malformed,
        discarded: 0,
    }
}

/// Every bookmaker name that appears anywhere in the snapshot, sorted.
pub fn collect_bookmakers(rows: &[PropRow]) -> Vec<String> {
    let mut books = BTreeSet::new();
    for row in rows {
        let book = extract_quotes(row.bookmakers.as_ref(), &row.prop_type);
        books.extend(book.quotes.into_iter().map(|q| q.bookmaker));
    }
    books.into_iter().collect()
}

// ── Median ────────────────────────────────────────────────────────────

/// Median of a set of values; the two middle values are averaged for
/// even counts.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

// ── QuoteBook ─────────────────────────────────────────────────────────

impl QuoteBook {
    /// Extract and apply the line sanity filter in one step.
    pub fn for_prop(bundle: Option<&BookmakerBundle>, prop_type: &str, sanity: &LineSanity) -> Self {
        let mut book = extract_quotes(bundle, prop_type);
        book.apply_sanity(prop_type, sanity);
        book
    }

    pub fn from_quotes(mut quotes: Vec<BookQuote>) -> Self {
        quotes.sort_by(|a, b| a.bookmaker.cmp(&b.bookmaker));
        Self {
            quotes,
            ..Self::default()
        }
    }

    /// Drop quotes whose line cannot be right for this prop type.
    /// Returns how many were discarded.
    pub fn apply_sanity(&mut self, prop_type: &str, sanity: &LineSanity) -> usize {
        let keyword = sanity.points_keyword.to_ascii_lowercase();
        if keyword.is_empty() || !prop_type.to_ascii_lowercase().contains(&keyword) {
            return 0;
        }
        let before = self.quotes.len();
        self.quotes
            .retain(|q| q.line.map_or(true, |line| line >= sanity.points_floor));
        let dropped = before - self.quotes.len();
        self.discarded += dropped;
        dropped
    }

    /// True when the bundle was text no parser strategy could read.
    pub fn is_malformed(&self) -> bool {
        self.malformed
    }

    /// Quotes removed by the sanity filter.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BookQuote> {
        self.quotes.iter()
    }

    pub fn available(&self) -> impl Iterator<Item = &BookQuote> {
        self.quotes.iter().filter(|q| q.available)
    }

    pub fn get(&self, bookmaker: &str) -> Option<&BookQuote> {
        self.quotes.iter().find(|q| q.bookmaker == bookmaker)
    }

    /// Number of available bookmakers. Each bundle already belongs to one
    /// side, so the direction does not narrow the count.
    pub fn count_available(&self, _direction: Option<Direction>) -> usize {
        self.available().count()
    }

    /// Lines posted by available bookmakers.
    pub fn available_lines(&self) -> impl Iterator<Item = f64> + '_ {
        self.available().filter_map(|q| q.line)
    }

    /// Median decimal price across available priced quotes.
    pub fn median_quote(&self, _direction: Direction) -> Option<MedianQuote> {
        let priced: Vec<(&BookQuote, f64)> = self
            .available()
            .filter_map(|q| q.decimal_price().map(|d| (q, d)))
            .collect();
        let decimals: Vec<f64> = priced.iter().map(|(_, d)| *d).collect();
        let median_decimal = median(&decimals)?;

        let mut closest = priced.first()?;
        for candidate in &priced[1..] {
            if (candidate.1 - median_decimal).abs() < (closest.1 - median_decimal).abs() {
                closest = candidate;
            }
        }

        Some(MedianQuote {
            price: decimal_to_american(median_decimal)?,
            decimal_price: median_decimal,
            bookmaker: format!("median({})", closest.0.bookmaker),
            line: closest.0.line,
        })
    }

    /// Quote with the highest decimal price.
    pub fn best_quote(&self, _direction: Direction) -> Option<&BookQuote> {
        let mut best: Option<(&BookQuote, f64)> = None;
        for q in self.available() {
            if let Some(d) = q.decimal_price() {
                if best.map_or(true, |(_, best_d)| d > best_d) {
                    best = Some((q, d));
                }
            }
        }
        best.map(|(q, _)| q)
    }
}
