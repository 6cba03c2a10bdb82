//! Domain types shared across the scanner.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// ── Prop Types ────────────────────────────────────────────────────────

/// Side of an over/under prop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[serde(alias = "over", alias = "Over")]
    Over,
    #[serde(alias = "under", alias = "Under")]
    Under,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Over => "OVER",
            Self::Under => "UNDER",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Per-bookmaker quote bundle as delivered by the odds feed.
///
/// Upstream exports are inconsistent: some rows carry a proper JSON object,
/// others a stringified dict (often Python-literal with single quotes).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BookmakerBundle {
    Structured(Map<String, Value>),
    Text(String),
}

/// One raw quote row: a (player, prop type, direction) with every
/// bookmaker's quote bundled inside.
///
/// Field aliases accept the column names of the odds-feed CSV export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropRow {
    #[serde(default, alias = "player", alias = "playerName")]
    pub player_name: Option<String>,

    /// Upstream player id, e.g. `LEBRON_JAMES_1_NBA`.
    #[serde(default, alias = "playerID")]
    pub player_id: Option<String>,

    #[serde(alias = "propType")]
    pub prop_type: String,

    pub direction: Direction,

    /// Posted book line for this side.
    #[serde(
        default,
        alias = "bookOverUnder",
        deserialize_with = "de_lenient_f64"
    )]
    pub book_line: Option<f64>,

    /// Fair line supplied directly by the feed, when it has one.
    #[serde(
        default,
        alias = "fairOverUnder",
        deserialize_with = "de_lenient_f64"
    )]
    pub fair_line: Option<f64>,

    /// Fair American odds supplied directly by the feed.
    #[serde(default, alias = "fairOdds", deserialize_with = "de_lenient_f64")]
    pub fair_odds: Option<f64>,

    #[serde(default, alias = "byBookmaker")]
    pub bookmakers: Option<BookmakerBundle>,

    #[serde(default)]
    pub game: Option<String>,
    #[serde(default)]
    pub home_team: Option<String>,
    #[serde(default)]
    pub away_team: Option<String>,
    #[serde(default, alias = "eventID")]
    pub event_id: Option<String>,
}

impl PropRow {
    /// Display name: explicit name, else derived from the player id.
    pub fn player(&self) -> String {
        if let Some(name) = self.player_name.as_deref().map(str::trim) {
            if !name.is_empty() {
                return name.to_string();
            }
        }
        match self.player_id.as_deref() {
            Some(id) => player_display_name(id),
            None => "Unknown".to_string(),
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────

/// Turn an upstream player id into a display name.
///
/// `LEBRON_JAMES_1_NBA` → `Lebron James`.
pub fn player_display_name(player_id: &str) -> String {
    let trimmed = player_id.trim();
    if trimmed.is_empty() {
        return "Unknown".to_string();
    }

    let mut parts: Vec<&str> = trimmed.split('_').filter(|p| !p.is_empty()).collect();
    if parts.len() >= 3 && parts.last() == Some(&"NBA") {
        parts.truncate(parts.len() - 2);
    }

    parts
        .iter()
        .map(|word| title_case(word))
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

/// Read a number that may arrive as a JSON number or a numeric string.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Serde adapter for optional numbers encoded as numbers or strings.
/// Anything unparseable becomes `None` rather than failing the row.
pub fn de_lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_f64))
}
