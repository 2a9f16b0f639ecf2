pub mod back;
pub mod events;
pub mod machine;

pub use events::NavEvent;
pub use machine::Reply;
