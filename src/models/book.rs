use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Flat price table: rental duration in days -> fee in minor currency units.
/// The set of offered durations comes from the catalog, not from code.
pub type PriceTable = BTreeMap<u32, i64>;

/// One title in the published catalog snapshot. Immutable per snapshot,
/// replaced wholesale on reload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRecord {
    pub title: String,
    pub description: String,
    pub author: Option<String>,
    pub genres: Vec<String>,
    pub price_by_duration: PriceTable,
}

/// Fallback fees for titles whose catalog row carries no price table.
pub fn default_price_table() -> PriceTable {
    [(10, 5000), (14, 6500), (21, 8000), (30, 10000)]
        .into_iter()
        .collect()
}

/// Price for a duration, falling back to the default table when the
/// book's own table is empty or misses the requested duration.
pub fn price_for(table: &PriceTable, duration_days: u32) -> Option<i64> {
    table
        .get(&duration_days)
        .copied()
        .or_else(|| default_price_table().get(&duration_days).copied())
}

/// Durations to offer for a book: its own table if present, else defaults.
pub fn offered_durations(table: &PriceTable) -> Vec<u32> {
    if table.is_empty() {
        default_price_table().keys().copied().collect()
    } else {
        table.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_prefers_book_table() {
        let table: PriceTable = [(7, 70), (14, 140)].into_iter().collect();
        assert_eq!(price_for(&table, 7), Some(70));
        assert_eq!(price_for(&table, 14), Some(140));
    }

    #[test]
    fn price_falls_back_to_default_table() {
        let empty = PriceTable::new();
        assert_eq!(price_for(&empty, 14), Some(6500));
        assert_eq!(price_for(&empty, 3), None);
    }

    #[test]
    fn offered_durations_follow_the_table() {
        let table: PriceTable = [(7, 70), (21, 210)].into_iter().collect();
        assert_eq!(offered_durations(&table), vec![7, 21]);
        assert_eq!(offered_durations(&PriceTable::new()), vec![10, 14, 21, 30]);
    }
}
