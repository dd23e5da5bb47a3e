pub mod event;
pub mod item;

pub use event::Entity as Event;
pub use item::Entity as Item;
