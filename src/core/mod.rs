/*!
 * Core Module
 * Configuration, errors and kernel ABI constants shared by every layer
 */

pub mod config;
pub mod errors;
pub mod limits;

pub use config::{TrampolineConfig, CONFIG_ENV};
pub use errors::{Result, TrampolineError};
