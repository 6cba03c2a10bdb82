//! Snapshot loading.
//!
//! A snapshot is a JSON array of prop rows. Rows that do not deserialize
//! are skipped and counted so one bad row never sinks the batch.

use std::path::Path;

use chrono::{DateTime, Utc};
use common::{Error, PropRow, Result};
use serde_json::Value;
use tracing::{debug, info, warn};

/// An immutable set of prop rows taken at one point in time.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub rows: Vec<PropRow>,
    /// Rows dropped because they did not deserialize.
    pub rejected: usize,
    pub loaded_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn from_rows(rows: Vec<PropRow>) -> Self {
        Self {
            rows,
            rejected: 0,
            loaded_at: Utc::now(),
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Array(items) = value else {
            return Err(Error::Snapshot("expected a JSON array of prop rows".into()));
        };

        let total = items.len();
        let mut rows = Vec::with_capacity(total);
        let mut rejected = 0;
        for (i, item) in items.into_iter().enumerate() {
            match serde_json::from_value::<PropRow>(item) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    debug!(row = i, error = %e, "skipping unreadable row");
                    rejected += 1;
                }
            }
        }

        if rejected > 0 {
            warn!(rejected, total, "some snapshot rows were skipped");
        }
        Ok(Self {
            rows,
            rejected,
            loaded_at: Utc::now(),
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let snapshot = Self::from_json_str(&text)?;
        info!(
            path = %path.display(),
            rows = snapshot.rows.len(),
            rejected = snapshot.rejected,
            "loaded snapshot"
        );
        Ok(snapshot)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_rows_are_counted_not_fatal() {
        let text = r#"[
            {"player_name": "A", "prop_type": "points", "direction": "over"},
            {"player_name": "B", "prop_type": "points", "direction": "sideways"},
            {"player_name": "C"},
            {"playerID": "JALEN_BRUNSON_1_NBA", "propType": "assists", "direction": "UNDER"}
        ]"#;
        let snap = Snapshot::from_json_str(text).unwrap();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.rejected, 2);
        assert_eq!(snap.rows[1].player(), "Jalen Brunson");
    }

    #[test]
    fn test_non_array_is_an_error() {
        let err = Snapshot::from_json_str(r#"{"rows": []}"#).unwrap_err();
        assert!(matches!(err, Error::Snapshot(_)), "got {:?}", err);
        assert!(matches!(Snapshot::from_json_str("not json"), Err(Error::Json(_))));
    }
}
