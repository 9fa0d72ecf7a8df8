//! INI file configuration adapter.

use crate::domain::error::ScanError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScanError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| ScanError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, ScanError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| ScanError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    /// An empty configuration; every lookup falls back to its default.
    pub fn empty() -> Self {
        Self { config: Ini::new() }
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }

    /// Non-blank raw value of `key`, trimmed.
    fn raw(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_with<T>(
        &self,
        section: &str,
        key: &str,
        default: T,
        expected: &str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<T, ScanError> {
        match self.raw(section, key) {
            None => Ok(default),
            Some(raw) => parse(&raw).ok_or_else(|| {
                ScanError::invalid_config(section, key, format!("'{raw}' is not {expected}"))
            }),
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> Result<i64, ScanError> {
        self.parse_with(section, key, default, "an integer", |v| v.parse().ok())
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> Result<f64, ScanError> {
        self.parse_with(section, key, default, "a number", |v| v.parse().ok())
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> Result<bool, ScanError> {
        self.parse_with(section, key, default, "a boolean", Self::parse_bool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn get_string_returns_value() {
        let adapter =
            FileConfigAdapter::from_string("[scan]\nsymbols = AAPL, MSFT, GC=F\n").unwrap();
        assert_eq!(
            adapter.get_string("scan", "symbols"),
            Some("AAPL, MSFT, GC=F".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[scan]\ntimeframe = 1D\n").unwrap();
        assert_eq!(adapter.get_string("scan", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_parses_and_defaults() {
        let adapter = FileConfigAdapter::from_string("[features]\nrsi_period = 21\nbb_period =\n")
            .unwrap();
        assert_eq!(adapter.get_int("features", "rsi_period", 14).unwrap(), 21);
        assert_eq!(adapter.get_int("features", "bb_period", 20).unwrap(), 20);
        assert_eq!(adapter.get_int("features", "missing", 42).unwrap(), 42);
    }

    #[test]
    fn get_int_rejects_bad_value() {
        let adapter = FileConfigAdapter::from_string("[features]\nbb_period = abc\n").unwrap();
        assert!(matches!(
            adapter.get_int("features", "bb_period", 20),
            Err(ScanError::ConfigInvalid { section, key, .. })
                if section == "features" && key == "bb_period"
        ));
    }

    #[test]
    fn get_double_rejects_bad_values() {
        let adapter = FileConfigAdapter::from_string(
            "[backtest]\ninitial_equity = 25000.5\nmin_score = high\nrisk_per_trade = 0.05x\n",
        )
        .unwrap();
        assert_eq!(adapter.get_double("backtest", "initial_equity", 0.0).unwrap(), 25000.5);
        assert!(adapter.get_double("backtest", "min_score", 50.0).is_err());
        let err = adapter.get_double("backtest", "risk_per_trade", 0.01).unwrap_err();
        assert!(err.to_string().contains("'0.05x' is not a number"));
    }

    #[test]
    fn get_bool_accepts_common_spellings() {
        let adapter = FileConfigAdapter::from_string(
            "[scan]\na = true\nb = yes\nc = 1\nd = off\ne = No\nf = maybe\n",
        )
        .unwrap();
        assert!(adapter.get_bool("scan", "a", false).unwrap());
        assert!(adapter.get_bool("scan", "b", false).unwrap());
        assert!(adapter.get_bool("scan", "c", false).unwrap());
        assert!(!adapter.get_bool("scan", "d", true).unwrap());
        assert!(!adapter.get_bool("scan", "e", true).unwrap());
        assert!(adapter.get_bool("scan", "f", true).is_err());
        assert!(adapter.get_bool("scan", "missing", true).unwrap());
    }

    #[test]
    fn empty_config_uses_defaults() {
        let adapter = FileConfigAdapter::empty();
        assert_eq!(adapter.get_string("data", "dir"), None);
        assert_eq!(adapter.get_double("weights", "regime", 25.0).unwrap(), 25.0);
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[data]\ndir = /var/lib/marketscan\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("data", "dir"),
            Some("/var/lib/marketscan".to_string())
        );
    }

    #[test]
    fn from_file_missing_is_parse_error() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/marketscan.ini");
        assert!(matches!(result, Err(ScanError::ConfigParse { .. })));
    }
}
