//! # Ledger Configuration
//!
//! Environment-driven settings for the ledger service.
//!
//! ## Environment Variables
//! ```text
//! ┌──────────────────────────────────┬──────────────────────────────────────┐
//! │ Variable                         │ Effect                               │
//! ├──────────────────────────────────┼──────────────────────────────────────┤
//! │ TALLY_INSTANCE_ID                │ instance id on every ledger span     │
//! │ INSTANCE_ID, HOSTNAME            │ fallbacks, in that order             │
//! │ TALLY_ENFORCE_STOCK_ON_POSTING   │ "true"/"1": sales may not take stock │
//! │                                  │ below zero (default: allowed)        │
//! └──────────────────────────────────┴──────────────────────────────────────┘
//! ```

/// Instance id used when no variable names one.
pub const UNKNOWN_INSTANCE: &str = "unknown";

/// Ledger settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Identifies this process in logs when several share one database.
    pub instance_id: String,

    /// Apply the stock floor to sale postings, not only to direct `out`
    /// adjustments.
    pub enforce_stock_on_posting: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            instance_id: UNKNOWN_INSTANCE.to_string(),
            enforce_stock_on_posting: false,
        }
    }
}

impl LedgerConfig {
    /// Creates a config with the given instance id and default policies.
    pub fn new(instance_id: impl Into<String>) -> Self {
        LedgerConfig {
            instance_id: instance_id.into(),
            ..LedgerConfig::default()
        }
    }

    /// Reads the config from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let instance_id = ["TALLY_INSTANCE_ID", "INSTANCE_ID", "HOSTNAME"]
            .into_iter()
            .filter_map(&lookup)
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
            .unwrap_or_else(|| UNKNOWN_INSTANCE.to_string());

        let enforce_stock_on_posting = lookup("TALLY_ENFORCE_STOCK_ON_POSTING")
            .map(|raw| parse_flag(&raw))
            .unwrap_or(false);

        LedgerConfig {
            instance_id,
            enforce_stock_on_posting,
        }
    }

    /// Sets whether sale postings respect the stock floor.
    pub fn enforce_stock_on_posting(mut self, enforce: bool) -> Self {
        self.enforce_stock_on_posting = enforce;
        self
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_instance_id_precedence() {
        let config = LedgerConfig::from_lookup(lookup(&[
            ("TALLY_INSTANCE_ID", "ledger-a"),
            ("INSTANCE_ID", "ignored"),
            ("HOSTNAME", "ignored"),
        ]));
        assert_eq!(config.instance_id, "ledger-a");

        let config = LedgerConfig::from_lookup(lookup(&[("INSTANCE_ID", "i-42"), ("HOSTNAME", "box")]));
        assert_eq!(config.instance_id, "i-42");

        let config = LedgerConfig::from_lookup(lookup(&[("TALLY_INSTANCE_ID", " "), ("HOSTNAME", "box")]));
        assert_eq!(config.instance_id, "box");

        let config = LedgerConfig::from_lookup(lookup(&[]));
        assert_eq!(config.instance_id, UNKNOWN_INSTANCE);
    }

    #[test]
    fn test_stock_floor_flag() {
        assert!(!LedgerConfig::from_lookup(lookup(&[])).enforce_stock_on_posting);
        assert!(
            LedgerConfig::from_lookup(lookup(&[("TALLY_ENFORCE_STOCK_ON_POSTING", "TRUE")]))
                .enforce_stock_on_posting
        );
        assert!(
            !LedgerConfig::from_lookup(lookup(&[("TALLY_ENFORCE_STOCK_ON_POSTING", "nope")]))
                .enforce_stock_on_posting
        );
    }
}
