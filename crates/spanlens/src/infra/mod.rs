//! Infrastructure adapters for config, logging, highlighting, and the remote service.

pub mod config;
pub mod highlight;
pub mod http;
pub mod logging;
