//! Collection of reusable TUI components.

pub mod annotation_panel;
pub mod code_view;
pub mod split;
