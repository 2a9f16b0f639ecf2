use crate::models::{BookFilter, Session};

use super::events::BackAction;

/// Where a back action should land. BookList can be reached through a
/// location+genre path, through an author, or through "all books" with no
/// location at all, so the prior menu is reconstructed from the session's
/// path markers rather than popped from a history stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackTarget {
    /// Recompute the genre menu for the recorded location.
    GenreMenu,
    /// Return to the author list (author path with no location).
    AuthorMenu,
    /// Root menu: pick a location.
    LocationMenu,
    /// Re-render BookList from the session's existing set and page.
    BookList,
    /// Full reset to the greeting.
    Greeting,
}

pub fn resolve(action: BackAction, session: &Session) -> BackTarget {
    match action {
        BackAction::Genres => {
            if session.location.is_some() {
                BackTarget::GenreMenu
            } else if matches!(session.filter, Some(BookFilter::Author(_))) {
                BackTarget::AuthorMenu
            } else {
                BackTarget::LocationMenu
            }
        }
        BackAction::Books => BackTarget::BookList,
        BackAction::Locations => BackTarget::LocationMenu,
        BackAction::Start => BackTarget::Greeting,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn back_to_genres_with_location_recomputes_genre_menu() {
        let session = Session {
            location: Some("Кав'ярня A".to_string()),
            filter: Some(BookFilter::Genre("Фантастика".to_string())),
            ..Session::default()
        };
        assert_eq!(resolve(BackAction::Genres, &session), BackTarget::GenreMenu);
    }

    #[test]
    fn back_to_genres_on_author_path_returns_author_list() {
        let session = Session {
            location: None,
            filter: Some(BookFilter::Author("Джейн Остін".to_string())),
            ..Session::default()
        };
        assert_eq!(resolve(BackAction::Genres, &session), BackTarget::AuthorMenu);
    }

    #[test]
    fn back_to_genres_without_markers_falls_back_to_root() {
        let session = Session {
            filter: Some(BookFilter::AllCatalog),
            ..Session::default()
        };
        assert_eq!(
            resolve(BackAction::Genres, &session),
            BackTarget::LocationMenu
        );
    }

    #[test]
    fn books_and_levels_map_directly() {
        let session = Session::default();
        assert_eq!(resolve(BackAction::Books, &session), BackTarget::BookList);
        assert_eq!(
            resolve(BackAction::Locations, &session),
            BackTarget::LocationMenu
        );
        assert_eq!(resolve(BackAction::Start, &session), BackTarget::Greeting);
    }
}
