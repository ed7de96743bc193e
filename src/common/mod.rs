//! Common utilities shared by the CLI and the suite runner

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;
pub mod text;

pub use error::{Error, Result};
