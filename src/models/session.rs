use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::book::PriceTable;

/// Conversation state. One per chat, advanced by the navigation machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavState {
    Location,
    Genre,
    BookList,
    BookDetail,
    Duration,
    Name,
    Contact,
    Confirmation,
}

/// How the current BookList set was produced. Recorded so that "back"
/// can rebuild the correct prior menu instead of popping a history stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookFilter {
    Genre(String),
    Author(String),
    /// Every title at the selected location.
    AllAtLocation,
    /// Every unique title in the catalog, location ignored.
    AllCatalog,
}

/// Per-chat in-memory conversational context. Created on first
/// interaction, reset on "start over", cleared on completion or /cancel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub state: NavState,
    pub location: Option<String>,
    pub filter: Option<BookFilter>,
    /// Whether the Genre state is currently showing the author menu.
    pub author_menu: bool,
    /// Current filtered title set and pagination offsets.
    pub titles: Vec<String>,
    pub page: usize,
    pub location_page: usize,
    pub book: Option<String>,
    pub duration_days: Option<u32>,
    pub name: Option<String>,
    pub contact: Option<String>,
    pub order_id: Option<String>,
    /// Selector token -> label table, scoped to the latest rendered page.
    pub tokens: HashMap<String, String>,
    pub last_activity: DateTime<Utc>,
}

impl Default for Session {
    fn default() -> Self {
        Session {
            state: NavState::Location,
            location: None,
            filter: None,
            author_menu: false,
            titles: Vec::new(),
            page: 0,
            location_page: 0,
            book: None,
            duration_days: None,
            name: None,
            contact: None,
            order_id: None,
            tokens: HashMap::new(),
            last_activity: Utc::now(),
        }
    }
}

impl Session {
    /// Drop filters at or below the location level and reset pagination.
    pub fn reset_to_locations(&mut self) {
        self.state = NavState::Location;
        self.location = None;
        self.filter = None;
        self.author_menu = false;
        self.titles.clear();
        self.page = 0;
        self.location_page = 0;
        self.book = None;
        self.duration_days = None;
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}

/// Everything the order lifecycle needs once the user has supplied the
/// last detail. Handed from the navigation machine to `OrderLifecycle`.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingIntent {
    pub title: String,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub location: Option<String>,
    pub duration_days: u32,
    pub price_table: PriceTable,
    pub name: String,
    pub contact: String,
}
