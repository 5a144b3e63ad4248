//! Terminal browser built on ratatui and crossterm.

pub mod app;
pub mod components;
