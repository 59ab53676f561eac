//! Force-directed layout and interaction engine for knowledge graphs.
//!
//! [`explorer::Explorer`] owns the model and the simulation; the desktop host
//! in `main.rs` only forwards input and paints.

pub mod color;
pub mod explorer;
pub mod graph;
pub mod highlight;
pub mod physics;
pub mod selection;
pub mod settings;
pub mod viewport;

mod util;

pub use util::truncate_label;
