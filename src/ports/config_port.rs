//! Configuration access port trait.
//!
//! Lookups are by INI-style section and key. Typed getters return `default`
//! when a key is absent or blank, and `ScanError::ConfigInvalid` when it is
//! present but does not parse.

use crate::domain::error::ScanError;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> Result<i64, ScanError>;
    fn get_double(&self, section: &str, key: &str, default: f64) -> Result<f64, ScanError>;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> Result<bool, ScanError>;
}
