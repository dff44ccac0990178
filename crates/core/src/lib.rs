// crates/core/src/lib.rs
pub mod cascade;
pub mod checklist;
pub mod engine;
pub mod error;
pub mod events;
pub mod inference;
pub mod locator;
pub mod progress;
pub mod tail;

pub use checklist::*;
pub use engine::*;
pub use error::*;
pub use events::*;
pub use inference::InferenceState;
pub use progress::*;
pub use tail::*;
