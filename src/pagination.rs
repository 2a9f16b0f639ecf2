use std::collections::HashMap;

use sha2::{Digest, Sha256};

pub const LOCATIONS_PER_PAGE: usize = 10;
pub const BOOKS_PER_PAGE: usize = 10;

/// Hex length of a selector token. 12 hex chars = 48 bits, enough that
/// collisions over a realistic catalog are not a practical concern.
const TOKEN_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceItem {
    pub label: String,
    pub token: String,
}

/// One rendered page of a choice list. The token table is scoped to this
/// render: the caller stores it in the session and resolves the next
/// selection event against it.
#[derive(Debug, Clone)]
pub struct ChoicePage {
    pub items: Vec<ChoiceItem>,
    pub page: usize,
    pub has_prev: bool,
    pub has_next: bool,
    pub token_table: HashMap<String, String>,
}

/// Short opaque stand-in for a label. Labels can exceed Telegram's
/// 64-byte callback-data limit or contain separator characters, so the
/// callback payload carries this token instead.
pub fn selector_token(label: &str) -> String {
    let digest = Sha256::digest(label.as_bytes());
    hex::encode(&digest[..TOKEN_LEN / 2])
}

/// Slice `labels` into page `page_no` of size `page_size`. A page number
/// past the end clamps to the last page, so "next" on the last page and
/// "prev" on the first are harmless no-ops for the caller.
pub fn paginate(labels: &[String], page_size: usize, page_no: usize) -> ChoicePage {
    let page_size = page_size.max(1);
    let pages = page_count(labels.len(), page_size);
    let page = page_no.min(pages.saturating_sub(1));
    let start = page * page_size;
    let end = (start + page_size).min(labels.len());

    let mut token_table = HashMap::new();
    let mut items = Vec::with_capacity(end.saturating_sub(start));
    for label in &labels[start..end] {
        let token = selector_token(label);
        // Collisions within one render resolve first-wins.
        if let Some(existing) = token_table.get(&token) {
            if existing != label {
                log::warn!("selector token collision: {:?} vs {:?}", existing, label);
            }
        } else {
            token_table.insert(token.clone(), label.clone());
        }
        items.push(ChoiceItem {
            label: label.clone(),
            token,
        });
    }

    ChoicePage {
        items,
        page,
        has_prev: page > 0,
        has_next: end < labels.len(),
        token_table,
    }
}

pub fn page_count(item_count: usize, page_size: usize) -> usize {
    item_count.div_ceil(page_size.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Книга {i}")).collect()
    }

    #[test]
    fn page_count_is_ceil_of_n_over_p() {
        for n in 0..40 {
            for p in 1..7 {
                assert_eq!(page_count(n, p), n.div_ceil(p), "n={n} p={p}");
            }
        }
    }

    #[test]
    fn empty_input_yields_empty_page() {
        let page = paginate(&[], 10, 0);
        assert!(page.items.is_empty());
        assert!(!page.has_prev);
        assert!(!page.has_next);
    }

    #[test]
    fn slices_and_flags_are_consistent() {
        let all = labels(23);
        let first = paginate(&all, 10, 0);
        assert_eq!(first.items.len(), 10);
        assert!(!first.has_prev);
        assert!(first.has_next);

        let last = paginate(&all, 10, 2);
        assert_eq!(last.items.len(), 3);
        assert!(last.has_prev);
        assert!(!last.has_next);
    }

    #[test]
    fn next_past_the_end_clamps_to_last_page() {
        let all = labels(23);
        let beyond = paginate(&all, 10, 99);
        let last = paginate(&all, 10, 2);
        assert_eq!(beyond.page, 2);
        assert_eq!(beyond.items, last.items);
    }

    #[test]
    fn tokens_resolve_back_to_their_labels() {
        let all = labels(10);
        let page = paginate(&all, 10, 0);
        for item in &page.items {
            assert_eq!(page.token_table.get(&item.token), Some(&item.label));
        }
    }

    #[test]
    fn tokens_are_collision_free_over_a_large_label_set() {
        let mut seen = std::collections::HashSet::new();
        for i in 0..1000 {
            let token = selector_token(&format!("Видання №{i} — окремий наклад"));
            assert!(seen.insert(token), "collision at label {i}");
        }
    }

    #[test]
    fn tokens_are_short_hex() {
        let token = selector_token("Вбивство в «Східному експресі»");
        assert_eq!(token.len(), 12);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
