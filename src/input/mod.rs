pub mod events;
pub mod handler;

// Re-export the essential types
pub use events::{InputEvent, MapEvent};
pub use handler::{Action, EventManager, InputHandler, MapOperations};
