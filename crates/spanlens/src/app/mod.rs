//! Application layer orchestrating domain logic and infrastructure.

pub mod annotations;
pub mod detect;
pub mod history;
pub mod registry;
pub mod scan;
pub mod selection;
pub mod service;
pub mod session;
pub mod view;
pub mod watch;
