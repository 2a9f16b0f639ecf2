use async_trait::async_trait;
use sqlx::Row;
use thiserror::Error;

use crate::database::Database;
use crate::models::PriceTable;

/// One flat row of the upstream catalog table, before validation.
/// Everything is optional here; `CatalogSnapshot::load` decides what to
/// skip.
#[derive(Debug, Clone, Default)]
pub struct CatalogRow {
    pub location: Option<String>,
    pub genre: Option<String>,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub price_by_duration: Option<PriceTable>,
}

#[derive(Debug, Error)]
pub enum CatalogSourceError {
    #[error("catalog source unreachable: {0}")]
    Unreachable(#[from] sqlx::Error),
}

/// Upstream catalog storage. A reload reads everything; there is no
/// incremental path.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn read_all(&self) -> Result<Vec<CatalogRow>, CatalogSourceError>;
}

/// Catalog rows kept in the `catalog` table, edited out-of-band by the
/// operator.
pub struct PgCatalogSource {
    db: Database,
}

impl PgCatalogSource {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CatalogSource for PgCatalogSource {
    async fn read_all(&self) -> Result<Vec<CatalogRow>, CatalogSourceError> {
        let rows = sqlx::query(
            "SELECT location, genre, author, title, description, price_by_duration
             FROM catalog",
        )
        .fetch_all(&self.db.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| CatalogRow {
                location: row.get("location"),
                genre: row.get("genre"),
                author: row.get("author"),
                title: row.get("title"),
                description: row.get("description"),
                price_by_duration: row
                    .get::<Option<serde_json::Value>, _>("price_by_duration")
                    .and_then(parse_price_table),
            })
            .collect())
    }
}

/// Lenient JSONB parse: `{"7": 70, "14": 140}`. Entries that are not a
/// positive day count with an integer fee are dropped.
fn parse_price_table(value: serde_json::Value) -> Option<PriceTable> {
    let map = value.as_object()?;
    let table: PriceTable = map
        .iter()
        .filter_map(|(days, fee)| {
            let days = days.trim().parse::<u32>().ok().filter(|d| *d > 0)?;
            let fee = fee.as_i64().filter(|f| *f >= 0)?;
            Some((days, fee))
        })
        .collect();
    if table.is_empty() {
        None
    } else {
        Some(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_a_well_formed_price_table() {
        let table = parse_price_table(json!({"7": 70, "14": 140})).unwrap();
        assert_eq!(table.get(&7), Some(&70));
        assert_eq!(table.get(&14), Some(&140));
    }

    #[test]
    fn drops_malformed_entries() {
        let table = parse_price_table(json!({"7": 70, "zero": 1, "0": 5, "14": "x"})).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn non_object_or_empty_yields_none() {
        assert!(parse_price_table(json!([1, 2])).is_none());
        assert!(parse_price_table(json!({"bad": "x"})).is_none());
    }
}
