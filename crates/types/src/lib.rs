// crates/types/src/lib.rs
//! Types shared between the sync core, the HTTP server and the browser.

pub mod ids;
pub mod wire;

pub use ids::*;
pub use wire::*;
