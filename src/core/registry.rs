//! Market registry
//!
//! Ordered set of tracked instruments. Commands address entries by a 1-based
//! position in insertion order, resolved against the current contents on
//! every call. The registry does no locking of its own; callers share it as
//! `SharedRegistry` and hold the lock for a single operation only.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::adapters::Quote;
use crate::core::store::PersistedState;

/// Type alias for registry access shared by the scheduler and command consumer
pub type SharedRegistry = Arc<Mutex<MarketRegistry>>;

/// Last successful price capture for one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub timestamp: DateTime<Utc>,
    pub last_close: Option<f64>,
    pub current_price: f64,
    /// Price seen by the previous successful fetch of this symbol
    pub previous_fetch_price: Option<f64>,
    /// Change against `previous_fetch_price`, in percent
    pub percent_change: Option<f64>,
    /// Session change as reported by the source, in percent
    pub today_trend: Option<f64>,
}

impl PriceSnapshot {
    /// Build a snapshot from a fresh quote and the previous fetch price
    pub fn from_quote(quote: &Quote, previous_fetch_price: Option<f64>, at: DateTime<Utc>) -> Self {
        let percent_change = previous_fetch_price
            .filter(|prev| *prev != 0.0)
            .map(|prev| (quote.current_price - prev) / prev * 100.0);

        Self {
            timestamp: at,
            last_close: quote.last_close,
            current_price: quote.current_price,
            previous_fetch_price,
            percent_change,
            today_trend: quote.today_change_percent,
        }
    }
}

/// One tracked instrument
#[derive(Debug, Clone, PartialEq)]
pub struct MarketEntry {
    pub symbol: String,
    pub display_name: Option<String>,
    pub enabled: bool,
    pub last_snapshot: Option<PriceSnapshot>,
    pub last_error: Option<String>,
}

impl MarketEntry {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            display_name: None,
            enabled: true,
            last_snapshot: None,
            last_error: None,
        }
    }

    /// Name used in notifications: the display name, else the symbol
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.symbol)
    }
}

/// Row of `MarketRegistry::list`
#[derive(Debug, Clone, PartialEq)]
pub struct MarketListing {
    /// 1-based position in the current order
    pub index: usize,
    pub symbol: String,
    pub display_name: Option<String>,
    pub enabled: bool,
    pub last_snapshot: Option<PriceSnapshot>,
}

/// Registry operation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Market {0} already exists")]
    AlreadyExists(String),

    #[error("Index {0} not found")]
    IndexNotFound(usize),
}

/// Ordered mapping from symbol to `MarketEntry`
#[derive(Debug, Clone, Default)]
pub struct MarketRegistry {
    entries: Vec<MarketEntry>,
}

impl MarketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from persisted state, keeping document order.
    /// Duplicate symbols keep their first occurrence.
    pub fn from_persisted(state: &PersistedState) -> Self {
        let mut registry = Self::new();
        for (symbol, status) in &state.markets {
            if registry.position_of(symbol).is_some() {
                continue;
            }
            let mut entry = MarketEntry::new(symbol.clone());
            entry.enabled = status.is_enabled();
            entry.display_name = state
                .market_names
                .iter()
                .find(|(s, _)| s == symbol)
                .map(|(_, name)| name.clone());
            registry.entries.push(entry);
        }
        registry
    }

    /// Serializable view of the structural state (no snapshots)
    pub fn to_persisted(&self) -> PersistedState {
        PersistedState::from_entries(&self.entries)
    }

    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(Mutex::new(self))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, symbol: &str) -> Option<&MarketEntry> {
        self.entries.iter().find(|e| e.symbol == symbol)
    }

    fn position_of(&self, symbol: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.symbol == symbol)
    }

    /// Resolve a 1-based index against the current order
    fn resolve(&self, index: usize) -> Result<usize, RegistryError> {
        if index == 0 || index > self.entries.len() {
            return Err(RegistryError::IndexNotFound(index));
        }
        Ok(index - 1)
    }

    /// Append a new enabled market
    pub fn add(&mut self, symbol: &str) -> Result<(), RegistryError> {
        if self.position_of(symbol).is_some() {
            return Err(RegistryError::AlreadyExists(symbol.to_string()));
        }
        self.entries.push(MarketEntry::new(symbol));
        Ok(())
    }

    /// Delete the market at `index`, returning its symbol
    pub fn remove_by_index(&mut self, index: usize) -> Result<String, RegistryError> {
        let pos = self.resolve(index)?;
        Ok(self.entries.remove(pos).symbol)
    }

    pub fn set_enabled_by_index(
        &mut self,
        index: usize,
        enabled: bool,
    ) -> Result<String, RegistryError> {
        let pos = self.resolve(index)?;
        let entry = &mut self.entries[pos];
        entry.enabled = enabled;
        Ok(entry.symbol.clone())
    }

    pub fn rename_by_index(&mut self, index: usize, name: &str) -> Result<String, RegistryError> {
        let pos = self.resolve(index)?;
        let entry = &mut self.entries[pos];
        entry.display_name = Some(name.to_string());
        Ok(entry.symbol.clone())
    }

    /// Current contents with 1-based indices
    pub fn list(&self) -> Vec<MarketListing> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| MarketListing {
                index: i + 1,
                symbol: e.symbol.clone(),
                display_name: e.display_name.clone(),
                enabled: e.enabled,
                last_snapshot: e.last_snapshot.clone(),
            })
            .collect()
    }

    /// Enabled symbols in registry order
    pub fn enabled_symbols(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.enabled)
            .map(|e| e.symbol.clone())
            .collect()
    }

    /// Store a successful fetch. Returns the notification label and the new
    /// snapshot, or `None` if the symbol was removed while the fetch was in
    /// flight.
    pub fn record_success(
        &mut self,
        symbol: &str,
        quote: &Quote,
        at: DateTime<Utc>,
    ) -> Option<(String, PriceSnapshot)> {
        let pos = self.position_of(symbol)?;
        let entry = &mut self.entries[pos];
        let previous = entry.last_snapshot.as_ref().map(|s| s.current_price);
        let snapshot = PriceSnapshot::from_quote(quote, previous, at);
        entry.last_snapshot = Some(snapshot.clone());
        entry.last_error = None;
        Some((entry.label().to_string(), snapshot))
    }

    /// Store a failed fetch. Returns the notification label, or `None` if the
    /// symbol is gone.
    pub fn record_failure(&mut self, symbol: &str, error: &str) -> Option<String> {
        let pos = self.position_of(symbol)?;
        let entry = &mut self.entries[pos];
        entry.last_snapshot = None;
        entry.last_error = Some(error.to_string());
        Some(entry.label().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(symbols: &[&str]) -> MarketRegistry {
        let mut registry = MarketRegistry::new();
        for s in symbols {
            registry.add(s).unwrap();
        }
        registry
    }

    fn assert_index_matches_order(registry: &MarketRegistry) {
        let listing = registry.list();
        for (pos, row) in listing.iter().enumerate() {
            assert_eq!(row.index, pos + 1);
            assert_eq!(row.symbol, registry.entries[pos].symbol);
        }
    }

    #[test]
    fn test_add_appends_enabled() {
        let registry = registry_with(&["GC=F", "CL=F"]);
        let listing = registry.list();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[1].symbol, "CL=F");
        assert!(listing[1].enabled);
        assert!(listing[1].last_snapshot.is_none());
    }

    #[test]
    fn test_add_duplicate_rejected() {
        let mut registry = registry_with(&["GC=F"]);
        assert_eq!(
            registry.add("GC=F"),
            Err(RegistryError::AlreadyExists("GC=F".to_string()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_index_tracks_order_through_mutations() {
        let mut registry = registry_with(&["A", "B", "C", "D"]);
        assert_index_matches_order(&registry);

        assert_eq!(registry.remove_by_index(2).unwrap(), "B");
        assert_index_matches_order(&registry);
        assert_eq!(registry.list()[1].symbol, "C");

        registry.add("E").unwrap();
        assert_index_matches_order(&registry);
        assert_eq!(registry.list()[3].symbol, "E");

        assert_eq!(registry.remove_by_index(1).unwrap(), "A");
        assert_index_matches_order(&registry);
        let symbols: Vec<_> = registry.list().into_iter().map(|r| r.symbol).collect();
        assert_eq!(symbols, vec!["C", "D", "E"]);
    }

    #[test]
    fn test_out_of_range_index() {
        let mut registry = registry_with(&["A"]);
        assert_eq!(
            registry.remove_by_index(0),
            Err(RegistryError::IndexNotFound(0))
        );
        assert_eq!(
            registry.set_enabled_by_index(2, false),
            Err(RegistryError::IndexNotFound(2))
        );
        assert_eq!(
            registry.rename_by_index(5, "x"),
            Err(RegistryError::IndexNotFound(5))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_disable_keeps_entry_and_name() {
        let mut registry = registry_with(&["GC=F", "CL=F"]);
        registry.rename_by_index(1, "Gold").unwrap();
        assert_eq!(registry.set_enabled_by_index(1, false).unwrap(), "GC=F");

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.enabled_symbols(), vec!["CL=F"]);
        let gold = registry.get("GC=F").unwrap();
        assert_eq!(gold.display_name.as_deref(), Some("Gold"));
        assert!(!gold.enabled);

        registry.set_enabled_by_index(1, true).unwrap();
        assert_eq!(registry.enabled_symbols(), vec!["GC=F", "CL=F"]);
    }

    #[test]
    fn test_record_success_tracks_previous_price() {
        let mut registry = registry_with(&["GC=F"]);
        registry.rename_by_index(1, "Gold").unwrap();
        let now = Utc::now();

        let (label, first) = registry
            .record_success("GC=F", &Quote::new("GC=F", 2000.0, Some(1990.0)), now)
            .unwrap();
        assert_eq!(label, "Gold");
        assert!(first.previous_fetch_price.is_none());
        assert!(first.percent_change.is_none());

        let (_, second) = registry
            .record_success("GC=F", &Quote::new("GC=F", 2020.0, Some(1990.0)), now)
            .unwrap();
        assert_eq!(second.previous_fetch_price, Some(2000.0));
        assert!((second.percent_change.unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_record_failure_clears_snapshot() {
        let mut registry = registry_with(&["GC=F"]);
        registry.record_success("GC=F", &Quote::new("GC=F", 2000.0, None), Utc::now());

        let label = registry.record_failure("GC=F", "timeout").unwrap();
        assert_eq!(label, "GC=F");
        let entry = registry.get("GC=F").unwrap();
        assert!(entry.last_snapshot.is_none());
        assert_eq!(entry.last_error.as_deref(), Some("timeout"));

        registry.record_success("GC=F", &Quote::new("GC=F", 2001.0, None), Utc::now());
        assert!(registry.get("GC=F").unwrap().last_error.is_none());
    }

    #[test]
    fn test_record_for_removed_symbol() {
        let mut registry = registry_with(&["GC=F"]);
        registry.remove_by_index(1).unwrap();
        assert!(registry
            .record_success("GC=F", &Quote::new("GC=F", 1.0, None), Utc::now())
            .is_none());
        assert!(registry.record_failure("GC=F", "gone").is_none());
    }

    #[test]
    fn test_persisted_roundtrip_keeps_order_and_flags() {
        let mut registry = registry_with(&["GC=F", "CL=F", "BTC-USD"]);
        registry.set_enabled_by_index(2, false).unwrap();
        registry.rename_by_index(3, "Bitcoin").unwrap();

        let restored = MarketRegistry::from_persisted(&registry.to_persisted());
        assert_eq!(restored.list(), registry.list());
    }
}
