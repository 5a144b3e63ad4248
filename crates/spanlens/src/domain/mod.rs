//! Core domain types shared by the detector, selection, and annotation layers.

pub mod errors;
pub mod model;
