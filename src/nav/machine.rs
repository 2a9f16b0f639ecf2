use crate::catalog::CatalogSnapshot;
use crate::models::{offered_durations, BookFilter, BookingIntent, NavState, Order, Session};
use crate::pagination::{paginate, ChoicePage, BOOKS_PER_PAGE, LOCATIONS_PER_PAGE};

use super::back::{resolve, BackTarget};
use super::events::{BackAction, NavEvent};

/// Transport-agnostic response: text plus rows of (label, callback data)
/// buttons. The teloxide layer turns this into an inline keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub buttons: Vec<Vec<(String, String)>>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Reply::text("")
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.buttons.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Outcome {
    pub reply: Reply,
    pub intent: Option<BookingIntent>,
}

impl Outcome {
    fn reply(reply: Reply) -> Self {
        Outcome {
            reply,
            intent: None,
        }
    }
}

const GREETING: &str = "👋 Вас вітає «Тиха Поличка»!\n\
Сучасний і зручний спосіб оренди книжок у затишних для вас місцях.\n\n\
Оберіть локацію:";

/// /start and "start over": full session reset plus the greeting menu.
pub fn start(session: &mut Session, snapshot: &CatalogSnapshot) -> Outcome {
    *session = Session::default();
    let mut reply = location_menu(session, snapshot);
    reply.text = GREETING.to_string();
    Outcome::reply(reply)
}

pub fn handle_event(
    session: &mut Session,
    event: NavEvent,
    snapshot: &CatalogSnapshot,
) -> Outcome {
    session.touch();
    match event {
        NavEvent::Ignore => Outcome::reply(Reply::empty()),
        // Retrying an invoice needs the order lifecycle; the bot layer
        // intercepts it before the machine is consulted.
        NavEvent::RetryInvoice => Outcome::reply(stale(session)),

        NavEvent::Back(action) => handle_back(session, action, snapshot),

        NavEvent::LocationPage(page) => {
            session.location_page = page;
            Outcome::reply(location_menu(session, snapshot))
        }
        NavEvent::Location(token) => match resolve_token(session, &token) {
            Some(location) if snapshot.locations.contains(&location) => {
                session.location = Some(location);
                session.filter = None;
                session.page = 0;
                session.state = NavState::Genre;
                Outcome::reply(genre_menu(session, snapshot))
            }
            _ => Outcome::reply(stale(session)),
        },

        NavEvent::ShowAuthors => {
            session.state = NavState::Genre;
            Outcome::reply(author_menu(session, snapshot))
        }
        NavEvent::Genre(token) => match resolve_token(session, &token) {
            Some(genre) => {
                let titles = snapshot.titles_for_genre(&genre, session.location.as_deref());
                enter_book_list(session, snapshot, BookFilter::Genre(genre), titles)
            }
            None => Outcome::reply(stale(session)),
        },
        NavEvent::Author(token) => match resolve_token(session, &token) {
            Some(author) => {
                let titles = snapshot.titles_for_author(&author, session.location.as_deref());
                enter_book_list(session, snapshot, BookFilter::Author(author), titles)
            }
            None => Outcome::reply(stale(session)),
        },
        NavEvent::AllAtLocation => match session.location.clone() {
            Some(location) => {
                let titles = snapshot.titles_at(&location);
                enter_book_list(session, snapshot, BookFilter::AllAtLocation, titles)
            }
            None => {
                let titles = snapshot.all_titles();
                enter_book_list(session, snapshot, BookFilter::AllCatalog, titles)
            }
        },
        NavEvent::AllBooks => {
            let titles = snapshot.all_titles();
            enter_book_list(session, snapshot, BookFilter::AllCatalog, titles)
        }

        NavEvent::BookPage(page) => {
            session.page = page;
            Outcome::reply(book_list(session))
        }
        NavEvent::Book(token) => match resolve_token(session, &token) {
            Some(title) if snapshot.book(&title).is_some() => {
                session.book = Some(title);
                session.state = NavState::BookDetail;
                Outcome::reply(book_detail(session, snapshot))
            }
            _ => Outcome::reply(stale(session)),
        },

        NavEvent::Rent => match session.book.clone() {
            Some(title) if snapshot.book(&title).is_some() => {
                session.state = NavState::Duration;
                Outcome::reply(duration_menu(session, snapshot))
            }
            _ => Outcome::reply(stale(session)),
        },
        NavEvent::Duration(days) => {
            let valid = session
                .book
                .as_deref()
                .and_then(|t| snapshot.book(t))
                .map(|b| offered_durations(&b.price_by_duration).contains(&days))
                .unwrap_or(false);
            if !valid {
                return Outcome::reply(stale(session));
            }
            session.duration_days = Some(days);
            session.state = NavState::Name;
            Outcome::reply(Reply::text(
                "✍️ Як до вас звертатися? Напишіть ваше ім'я:",
            ))
        }
    }
}

/// Free-text input: only the Name and Contact states consume it.
pub fn handle_text(session: &mut Session, text: &str, snapshot: &CatalogSnapshot) -> Outcome {
    session.touch();
    match session.state {
        NavState::Name => {
            let name = text.trim();
            if name.is_empty() {
                return Outcome::reply(Reply::text("Ім'я не може бути порожнім. Спробуйте ще раз:"));
            }
            session.name = Some(name.to_string());
            session.state = NavState::Contact;
            Outcome::reply(Reply::text(
                "📞 Залиште контакт для зв'язку (номер телефону):",
            ))
        }
        NavState::Contact => {
            let contact = text.trim();
            if contact.chars().filter(|c| c.is_ascii_digit()).count() < 6 {
                return Outcome::reply(Reply::text(
                    "Схоже, це не номер телефону. Введіть контакт ще раз:",
                ));
            }
            session.contact = Some(contact.to_string());
            finish_booking(session, snapshot)
        }
        _ => Outcome::reply(Reply::text("Скористайтеся, будь ласка, кнопками вище 🙂")),
    }
}

fn finish_booking(session: &mut Session, snapshot: &CatalogSnapshot) -> Outcome {
    let (Some(title), Some(duration), Some(name), Some(contact)) = (
        session.book.clone(),
        session.duration_days,
        session.name.clone(),
        session.contact.clone(),
    ) else {
        return Outcome::reply(stale(session));
    };
    let Some(book) = snapshot.book(&title) else {
        return Outcome::reply(stale(session));
    };

    let genre = match &session.filter {
        Some(BookFilter::Genre(g)) => Some(g.clone()),
        _ => book.genres.first().cloned(),
    };
    let author = match &session.filter {
        Some(BookFilter::Author(a)) => Some(a.clone()),
        _ => book.author.clone(),
    };

    session.state = NavState::Confirmation;
    Outcome {
        reply: Reply::text("⏳ Оформлюю замовлення…"),
        intent: Some(BookingIntent {
            title,
            author,
            genre,
            location: session.location.clone(),
            duration_days: duration,
            price_table: book.price_by_duration.clone(),
            name,
            contact,
        }),
    }
}

fn handle_back(session: &mut Session, action: BackAction, snapshot: &CatalogSnapshot) -> Outcome {
    match resolve(action, session) {
        BackTarget::GenreMenu => {
            session.filter = None;
            session.book = None;
            session.duration_days = None;
            session.page = 0;
            session.state = NavState::Genre;
            Outcome::reply(genre_menu(session, snapshot))
        }
        BackTarget::AuthorMenu => {
            session.book = None;
            session.duration_days = None;
            session.page = 0;
            session.state = NavState::Genre;
            Outcome::reply(author_menu(session, snapshot))
        }
        BackTarget::LocationMenu => {
            session.reset_to_locations();
            Outcome::reply(location_menu(session, snapshot))
        }
        BackTarget::BookList => {
            session.book = None;
            session.duration_days = None;
            session.state = NavState::BookList;
            Outcome::reply(book_list(session))
        }
        BackTarget::Greeting => start(session, snapshot),
    }
}

fn enter_book_list(
    session: &mut Session,
    snapshot: &CatalogSnapshot,
    filter: BookFilter,
    titles: Vec<String>,
) -> Outcome {
    if titles.is_empty() {
        // ValidationFailed: route back to a safe menu with an explanation.
        let mut reply = genre_menu(session, snapshot);
        reply.text = format!("😔 За цим вибором книжок не знайдено.\n\n{}", reply.text);
        session.state = NavState::Genre;
        return Outcome::reply(reply);
    }
    session.filter = Some(filter);
    session.titles = titles;
    session.page = 0;
    session.state = NavState::BookList;
    Outcome::reply(book_list(session))
}

// --- menu renders ---------------------------------------------------------

fn location_menu(session: &mut Session, snapshot: &CatalogSnapshot) -> Reply {
    session.state = NavState::Location;
    session.page = 0;
    let page = paginate(&snapshot.locations, LOCATIONS_PER_PAGE, session.location_page);
    session.location_page = page.page;
    session.tokens = page.token_table.clone();

    let mut buttons = choice_rows(&page, |token| NavEvent::Location(token).encode());
    push_pager(&mut buttons, &page, |p| NavEvent::LocationPage(p).encode());
    buttons.push(vec![(
        "📚 Всі книги".to_string(),
        NavEvent::AllBooks.encode(),
    )]);

    Reply {
        text: "🏠 Оберіть локацію:".to_string(),
        buttons,
    }
}

fn genre_menu(session: &mut Session, snapshot: &CatalogSnapshot) -> Reply {
    session.author_menu = false;
    let genres = snapshot.genres_at(session.location.as_deref());
    // Genre axes are short; render them unpaginated.
    let page = paginate(&genres, genres.len().max(1), 0);
    session.tokens = page.token_table.clone();

    let mut buttons = choice_rows(&page, |token| NavEvent::Genre(token).encode());
    buttons.push(vec![(
        "✍️ За автором".to_string(),
        NavEvent::ShowAuthors.encode(),
    )]);
    let all_label = if session.location.is_some() {
        "📚 Всі книги тут"
    } else {
        "📚 Всі книги"
    };
    buttons.push(vec![(
        all_label.to_string(),
        NavEvent::AllAtLocation.encode(),
    )]);
    buttons.push(vec![(
        "🏠 До локацій".to_string(),
        NavEvent::Back(BackAction::Locations).encode(),
    )]);

    let text = match &session.location {
        Some(location) => format!("📍 {location}\n\nОберіть жанр:"),
        None => "Оберіть жанр:".to_string(),
    };
    Reply { text, buttons }
}

fn author_menu(session: &mut Session, snapshot: &CatalogSnapshot) -> Reply {
    session.author_menu = true;
    let authors = snapshot.authors_at(session.location.as_deref());
    let page = paginate(&authors, authors.len().max(1), 0);
    session.tokens = page.token_table.clone();

    let mut buttons = choice_rows(&page, |token| NavEvent::Author(token).encode());
    buttons.push(vec![(
        "🔙 До жанрів".to_string(),
        NavEvent::Back(BackAction::Genres).encode(),
    )]);
    buttons.push(vec![(
        "🏠 До локацій".to_string(),
        NavEvent::Back(BackAction::Locations).encode(),
    )]);

    Reply {
        text: "✍️ Оберіть автора:".to_string(),
        buttons,
    }
}

fn book_list(session: &mut Session) -> Reply {
    session.state = NavState::BookList;
    let page = paginate(&session.titles, BOOKS_PER_PAGE, session.page);
    session.page = page.page;
    session.tokens = page.token_table.clone();

    let mut buttons = choice_rows(&page, |token| NavEvent::Book(token).encode());
    push_pager(&mut buttons, &page, |p| NavEvent::BookPage(p).encode());
    buttons.push(vec![(
        "🔙 До жанрів".to_string(),
        NavEvent::Back(BackAction::Genres).encode(),
    )]);
    buttons.push(vec![(
        "🏠 До локацій".to_string(),
        NavEvent::Back(BackAction::Locations).encode(),
    )]);

    Reply {
        text: "📖 Оберіть книгу:".to_string(),
        buttons,
    }
}

fn book_detail(session: &mut Session, snapshot: &CatalogSnapshot) -> Reply {
    let Some(book) = session.book.as_deref().and_then(|t| snapshot.book(t)) else {
        return stale(session);
    };

    let mut text = format!("📖 {}\n\n{}", book.title, book.description);
    if let Some(author) = &book.author {
        text.push_str(&format!("\n\n✍️ Автор: {author}"));
    }
    let locations = snapshot.locations_of(&book.title);
    if !locations.is_empty() {
        text.push_str(&format!("\n📍 Доступна: {}", locations.join(", ")));
    }

    let buttons = vec![
        vec![("✅ Орендувати".to_string(), NavEvent::Rent.encode())],
        vec![(
            "🔙 До книг".to_string(),
            NavEvent::Back(BackAction::Books).encode(),
        )],
        vec![(
            "📚 До жанрів".to_string(),
            NavEvent::Back(BackAction::Genres).encode(),
        )],
    ];
    Reply { text, buttons }
}

fn duration_menu(session: &mut Session, snapshot: &CatalogSnapshot) -> Reply {
    let Some(book) = session.book.as_deref().and_then(|t| snapshot.book(t)) else {
        return stale(session);
    };

    let mut buttons: Vec<Vec<(String, String)>> = offered_durations(&book.price_by_duration)
        .into_iter()
        .map(|days| {
            let label = match crate::models::price_for(&book.price_by_duration, days) {
                Some(price) => format!("{days} дн. — {}", format_price(price)),
                None => format!("{days} дн."),
            };
            vec![(label, NavEvent::Duration(days).encode())]
        })
        .collect();
    buttons.push(vec![(
        "🔙 До книг".to_string(),
        NavEvent::Back(BackAction::Books).encode(),
    )]);

    Reply {
        text: "⏱️ На скільки днів орендуєте?".to_string(),
        buttons,
    }
}

/// Confirmation message once the order is persisted and the invoice is out.
pub fn confirmation_reply(order: &Order, invoice_url: &str) -> Reply {
    Reply {
        text: format!(
            "✅ Замовлення прийнято!\n\n\
             📖 {}\n⏱️ {} дн.\n💸 {}\n\n\
             Сплатіть за посиланням, і книга чекатиме на вас:\n{}\n\n\
             Номер замовлення: {}",
            order.title,
            order.duration_days,
            format_price(order.price_minor),
            invoice_url,
            order.order_id
        ),
        buttons: vec![vec![(
            "🏠 На початок".to_string(),
            NavEvent::Back(BackAction::Start).encode(),
        )]],
    }
}

/// Invoice creation failed: order stays Pending, retry is allowed.
pub fn invoice_failed_reply(reason: &str) -> Reply {
    Reply {
        text: format!("⚠️ Не вдалося створити рахунок: {reason}"),
        buttons: vec![
            vec![(
                "🔄 Спробувати ще раз".to_string(),
                NavEvent::RetryInvoice.encode(),
            )],
            vec![(
                "🏠 На початок".to_string(),
                NavEvent::Back(BackAction::Start).encode(),
            )],
        ],
    }
}

/// Ledger write failed: nothing downstream may treat the order as created.
pub fn persistence_failed_reply(session: &mut Session) -> Reply {
    session.state = NavState::Contact;
    Reply::text("⚠️ Не вдалося зберегти замовлення. Спробуйте, будь ласка, пізніше.")
}

pub fn catalog_unavailable_reply() -> Reply {
    Reply::text("😔 Каталог тимчасово недоступний. Спробуйте трохи пізніше.")
}

// SelectionStale: re-prompt, the state does not change.
fn stale(_session: &Session) -> Reply {
    Reply::text("⚠️ Ця кнопка застаріла. Оновіть меню командою /start або повторіть вибір.")
}

fn resolve_token(session: &Session, token: &str) -> Option<String> {
    session.tokens.get(token).cloned()
}

fn choice_rows(
    page: &ChoicePage,
    encode: impl Fn(String) -> String,
) -> Vec<Vec<(String, String)>> {
    page.items
        .iter()
        .map(|item| vec![(item.label.clone(), encode(item.token.clone()))])
        .collect()
}

fn push_pager(
    buttons: &mut Vec<Vec<(String, String)>>,
    page: &ChoicePage,
    encode: impl Fn(usize) -> String,
) {
    let mut row = Vec::new();
    if page.has_prev {
        row.push(("⬅️ Назад".to_string(), encode(page.page - 1)));
    }
    if page.has_next {
        row.push(("➡️ Далі".to_string(), encode(page.page + 1)));
    }
    if !row.is_empty() {
        buttons.push(row);
    }
}

pub fn format_price(minor: i64) -> String {
    format!("{}.{:02} грн", minor / 100, minor % 100)
}
