// src/render/mod.rs

//! Terminal output of the status table.
//!
//! - [`table`] formats a snapshot as colour-coded lines.
//! - [`renderer`] redraws it periodically from a background thread.

pub mod renderer;
pub mod table;

pub use renderer::Renderer;
pub use table::{format_row, format_rows, status_label};
