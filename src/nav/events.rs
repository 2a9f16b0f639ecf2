/// Explicit back actions available from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackAction {
    Genres,
    Books,
    Locations,
    Start,
}

/// Typed navigation event. Callback payloads on the wire are the encoded
/// forms below; tokens are selector tokens from the current page render,
/// never raw labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavEvent {
    Location(String),
    LocationPage(usize),
    Genre(String),
    ShowAuthors,
    Author(String),
    AllAtLocation,
    AllBooks,
    Book(String),
    BookPage(usize),
    Rent,
    Duration(u32),
    RetryInvoice,
    Back(BackAction),
    Ignore,
}

impl NavEvent {
    pub fn encode(&self) -> String {
        match self {
            NavEvent::Location(t) => format!("loc:{t}"),
            NavEvent::LocationPage(p) => format!("locpg:{p}"),
            NavEvent::Genre(t) => format!("genre:{t}"),
            NavEvent::ShowAuthors => "authors".to_string(),
            NavEvent::Author(t) => format!("author:{t}"),
            NavEvent::AllAtLocation => "all_here".to_string(),
            NavEvent::AllBooks => "all_books".to_string(),
            NavEvent::Book(t) => format!("book:{t}"),
            NavEvent::BookPage(p) => format!("bookpg:{p}"),
            NavEvent::Rent => "rent".to_string(),
            NavEvent::Duration(d) => format!("days:{d}"),
            NavEvent::RetryInvoice => "retry_invoice".to_string(),
            NavEvent::Back(BackAction::Genres) => "back:genres".to_string(),
            NavEvent::Back(BackAction::Books) => "back:books".to_string(),
            NavEvent::Back(BackAction::Locations) => "back:locations".to_string(),
            NavEvent::Back(BackAction::Start) => "back:start".to_string(),
            NavEvent::Ignore => "noop".to_string(),
        }
    }

    pub fn parse(data: &str) -> Option<NavEvent> {
        if let Some((prefix, rest)) = data.split_once(':') {
            return match prefix {
                "loc" => Some(NavEvent::Location(rest.to_string())),
                "locpg" => rest.parse().ok().map(NavEvent::LocationPage),
                "genre" => Some(NavEvent::Genre(rest.to_string())),
                "author" => Some(NavEvent::Author(rest.to_string())),
                "book" => Some(NavEvent::Book(rest.to_string())),
                "bookpg" => rest.parse().ok().map(NavEvent::BookPage),
                "days" => rest.parse().ok().map(NavEvent::Duration),
                "back" => match rest {
                    "genres" => Some(NavEvent::Back(BackAction::Genres)),
                    "books" => Some(NavEvent::Back(BackAction::Books)),
                    "locations" => Some(NavEvent::Back(BackAction::Locations)),
                    "start" => Some(NavEvent::Back(BackAction::Start)),
                    _ => None,
                },
                _ => None,
            };
        }
        match data {
            "authors" => Some(NavEvent::ShowAuthors),
            "all_here" => Some(NavEvent::AllAtLocation),
            "all_books" => Some(NavEvent::AllBooks),
            "rent" => Some(NavEvent::Rent),
            "retry_invoice" => Some(NavEvent::RetryInvoice),
            "noop" => Some(NavEvent::Ignore),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_token_carrying_events() {
        assert_eq!(
            NavEvent::parse("loc:ab12cd34ef56"),
            Some(NavEvent::Location("ab12cd34ef56".to_string()))
        );
        assert_eq!(
            NavEvent::parse("book:deadbeef0123"),
            Some(NavEvent::Book("deadbeef0123".to_string()))
        );
        assert_eq!(NavEvent::parse("days:14"), Some(NavEvent::Duration(14)));
        assert_eq!(NavEvent::parse("bookpg:3"), Some(NavEvent::BookPage(3)));
    }

    #[test]
    fn parses_back_actions() {
        assert_eq!(
            NavEvent::parse("back:genres"),
            Some(NavEvent::Back(BackAction::Genres))
        );
        assert_eq!(
            NavEvent::parse("back:start"),
            Some(NavEvent::Back(BackAction::Start))
        );
    }

    #[test]
    fn rejects_unknown_payloads() {
        assert_eq!(NavEvent::parse(""), None);
        assert_eq!(NavEvent::parse("calendar_day_2024_1_1"), None);
        assert_eq!(NavEvent::parse("days:many"), None);
        assert_eq!(NavEvent::parse("back:everything"), None);
    }

    #[test]
    fn encode_is_parseable() {
        for event in [
            NavEvent::Genre("aaaa".into()),
            NavEvent::AllBooks,
            NavEvent::Rent,
            NavEvent::Back(BackAction::Books),
        ] {
            assert_eq!(NavEvent::parse(&event.encode()), Some(event));
        }
    }
}
