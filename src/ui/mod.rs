//! Terminal rendering with ratatui.
//!
//! Each view lives in its own module; [`common`] holds the chrome drawn
//! around them.

pub mod common;
pub mod current;
pub mod devices;
pub mod history;
pub mod theme;

pub use theme::Theme;
