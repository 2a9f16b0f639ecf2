pub mod source;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::models::{BookRecord, PriceTable};

pub use source::{CatalogRow, CatalogSource, CatalogSourceError, PgCatalogSource};

/// The published set of location/genre/author/title indices. Built in one
/// pass by `load` and swapped in atomically behind an `Arc`; readers never
/// observe a half-built index.
#[derive(Debug, Default)]
pub struct CatalogSnapshot {
    pub locations: Vec<String>,
    pub genres: Vec<String>,
    pub authors: Vec<String>,
    books: HashMap<String, BookRecord>,
    location_titles: HashMap<String, BTreeSet<String>>,
    title_locations: HashMap<String, BTreeSet<String>>,
    genre_titles: HashMap<String, BTreeSet<String>>,
    author_titles: HashMap<String, BTreeSet<String>>,
}

impl CatalogSnapshot {
    /// Full rebuild from flat catalog rows. Rows missing a required field
    /// are skipped with a log line; duplicate titles merge (first
    /// description and price table win, cross-references accumulate).
    pub fn load(rows: Vec<CatalogRow>) -> Self {
        let mut snapshot = CatalogSnapshot::default();
        let mut locations = BTreeSet::new();
        let mut genres = BTreeSet::new();
        let mut authors = BTreeSet::new();

        for (i, row) in rows.into_iter().enumerate() {
            let (location, genre, title) = match (
                non_blank(row.location),
                non_blank(row.genre),
                non_blank(row.title),
            ) {
                (Some(l), Some(g), Some(t)) => (l, g, t),
                _ => {
                    log::warn!("catalog row {} skipped: missing location/genre/title", i);
                    continue;
                }
            };
            let author = non_blank(row.author);

            locations.insert(location.clone());
            genres.insert(genre.clone());
            if let Some(a) = &author {
                authors.insert(a.clone());
            }

            snapshot
                .location_titles
                .entry(location.clone())
                .or_default()
                .insert(title.clone());
            snapshot
                .title_locations
                .entry(title.clone())
                .or_default()
                .insert(location);
            snapshot
                .genre_titles
                .entry(genre.clone())
                .or_default()
                .insert(title.clone());
            if let Some(a) = &author {
                snapshot
                    .author_titles
                    .entry(a.clone())
                    .or_default()
                    .insert(title.clone());
            }

            let book = snapshot
                .books
                .entry(title.clone())
                .or_insert_with(|| BookRecord {
                    title,
                    description: row.description.unwrap_or_default(),
                    author: author.clone(),
                    genres: Vec::new(),
                    price_by_duration: row.price_by_duration.unwrap_or_else(PriceTable::new),
                });
            if !book.genres.contains(&genre) {
                book.genres.push(genre);
            }
            if book.author.is_none() {
                book.author = author;
            }
        }

        snapshot.locations = locations.into_iter().collect();
        snapshot.genres = genres.into_iter().collect();
        snapshot.authors = authors.into_iter().collect();
        snapshot
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn book_count(&self) -> usize {
        self.books.len()
    }

    pub fn book(&self, title: &str) -> Option<&BookRecord> {
        self.books.get(title)
    }

    pub fn locations_of(&self, title: &str) -> Vec<String> {
        self.title_locations
            .get(title)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Genres that have at least one title at `location` (all genres when
    /// no location is given).
    pub fn genres_at(&self, location: Option<&str>) -> Vec<String> {
        self.filtered_axis(&self.genre_titles, &self.genres, location)
    }

    pub fn authors_at(&self, location: Option<&str>) -> Vec<String> {
        self.filtered_axis(&self.author_titles, &self.authors, location)
    }

    pub fn titles_for_genre(&self, genre: &str, location: Option<&str>) -> Vec<String> {
        self.filtered_titles(self.genre_titles.get(genre), location)
    }

    pub fn titles_for_author(&self, author: &str, location: Option<&str>) -> Vec<String> {
        self.filtered_titles(self.author_titles.get(author), location)
    }

    pub fn titles_at(&self, location: &str) -> Vec<String> {
        self.location_titles
            .get(location)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every unique title in the catalog, regardless of how many
    /// (location, genre) pairs it appears under.
    pub fn all_titles(&self) -> Vec<String> {
        let titles: BTreeMap<&String, ()> = self.books.keys().map(|t| (t, ())).collect();
        titles.into_keys().cloned().collect()
    }

    fn filtered_axis(
        &self,
        axis: &HashMap<String, BTreeSet<String>>,
        all: &[String],
        location: Option<&str>,
    ) -> Vec<String> {
        match location.and_then(|l| self.location_titles.get(l)) {
            None => all.to_vec(),
            Some(at_location) => all
                .iter()
                .filter(|key| {
                    axis.get(*key)
                        .map(|titles| !titles.is_disjoint(at_location))
                        .unwrap_or(false)
                })
                .cloned()
                .collect(),
        }
    }

    fn filtered_titles(
        &self,
        titles: Option<&BTreeSet<String>>,
        location: Option<&str>,
    ) -> Vec<String> {
        let Some(titles) = titles else {
            return Vec::new();
        };
        match location.and_then(|l| self.location_titles.get(l)) {
            None => titles.iter().cloned().collect(),
            Some(at_location) => titles.intersection(at_location).cloned().collect(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(location: &str, genre: &str, author: Option<&str>, title: &str) -> CatalogRow {
        CatalogRow {
            location: Some(location.to_string()),
            genre: Some(genre.to_string()),
            author: author.map(String::from),
            title: Some(title.to_string()),
            description: Some(format!("Опис «{title}»")),
            price_by_duration: Some([(7, 70), (14, 140)].into_iter().collect()),
        }
    }

    fn sample() -> CatalogSnapshot {
        CatalogSnapshot::load(vec![
            row("Кав'ярня A", "Фантастика", Some("Френк Герберт"), "Дюна"),
            row("Кав'ярня A", "Роман", Some("Джейн Остін"), "Гордість і упередження"),
            row("Кав'ярня B", "Роман", Some("Джейн Остін"), "Гордість і упередження"),
            row("Кав'ярня B", "Історія", None, "Історія України"),
        ])
    }

    #[test]
    fn axes_are_sorted_and_distinct() {
        let snap = sample();
        assert_eq!(snap.locations, vec!["Кав'ярня A", "Кав'ярня B"]);
        assert_eq!(snap.genres, vec!["Історія", "Роман", "Фантастика"]);
        assert_eq!(snap.authors, vec!["Джейн Остін", "Френк Герберт"]);
    }

    #[test]
    fn rows_missing_required_fields_are_skipped() {
        let mut bad = row("Кав'ярня A", "Роман", None, "Щось");
        bad.title = None;
        let mut blank = row("  ", "Роман", None, "Інше");
        blank.location = Some("  ".to_string());
        let snap = CatalogSnapshot::load(vec![
            bad,
            blank,
            row("Кав'ярня A", "Фантастика", None, "Дюна"),
        ]);
        assert_eq!(snap.book_count(), 1);
        assert!(snap.book("Дюна").is_some());
    }

    #[test]
    fn no_orphaned_cross_references() {
        let snap = sample();
        for genre in &snap.genres {
            for title in snap.titles_for_genre(genre, None) {
                assert!(
                    !snap.locations_of(&title).is_empty(),
                    "{title} has no location"
                );
            }
        }
        for title in snap.all_titles() {
            let book = snap.book(&title).unwrap();
            assert!(!book.genres.is_empty(), "{title} has no genre");
        }
    }

    #[test]
    fn all_titles_dedupes_across_location_genre_pairs() {
        let snap = sample();
        let all = snap.all_titles();
        assert_eq!(all.len(), 3);
        assert_eq!(
            all.iter().filter(|t| *t == "Гордість і упередження").count(),
            1
        );
    }

    #[test]
    fn genre_menu_is_filtered_by_location() {
        // Scenario B: a location without fantasy titles hides the genre.
        let snap = sample();
        let at_b = snap.genres_at(Some("Кав'ярня B"));
        assert!(!at_b.contains(&"Фантастика".to_string()));
        assert!(at_b.contains(&"Роман".to_string()));

        let at_a = snap.genres_at(Some("Кав'ярня A"));
        assert!(at_a.contains(&"Фантастика".to_string()));
    }

    #[test]
    fn genre_titles_intersect_with_location() {
        let snap = sample();
        assert_eq!(
            snap.titles_for_genre("Роман", Some("Кав'ярня B")),
            vec!["Гордість і упередження"]
        );
        assert!(snap.titles_for_genre("Фантастика", Some("Кав'ярня B")).is_empty());
    }

    #[test]
    fn duplicate_titles_merge_keeping_first_price_table() {
        let mut second = row("Кав'ярня B", "Фантастика", None, "Дюна");
        second.price_by_duration = Some([(3, 30)].into_iter().collect());
        let snap = CatalogSnapshot::load(vec![
            row("Кав'ярня A", "Фантастика", Some("Френк Герберт"), "Дюна"),
            second,
        ]);
        let book = snap.book("Дюна").unwrap();
        assert_eq!(book.price_by_duration.get(&7), Some(&70));
        assert_eq!(snap.locations_of("Дюна").len(), 2);
    }
}
