pub mod book;
pub mod order;
pub mod session;

pub use book::{default_price_table, offered_durations, price_for, BookRecord, PriceTable};
pub use order::{InvoiceRef, Order, PaymentStatus};
pub use session::{BookFilter, BookingIntent, NavState, Session};
