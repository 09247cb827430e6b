//! Configuration for dataset stores.

use serde::{Deserialize, Serialize};

/// Configuration shared by stores and gridded datasets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Label written for the index column of static datasets.
    pub static_key_column: String,

    /// Label written for the index column of time series datasets.
    pub timeseries_key_column: String,

    /// Column holding the grid point index used for row selection.
    pub gpi_column: String,

    /// Zero-padded width of cell ids in cell file names.
    pub cell_digits: usize,

    /// Commit every write immediately instead of on flush/close.
    pub write_through: bool,

    /// Commit through a temporary file and rename over the target.
    pub atomic_writes: bool,

    /// fsync committed content before the rename.
    pub sync_on_commit: bool,

    /// Cell stores a gridded dataset keeps open at once. The least recently
    /// used store is closed when another cell is needed.
    pub max_open_cells: usize,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            static_key_column: "gpi".to_string(),
            timeseries_key_column: "date".to_string(),
            gpi_column: "gpi".to_string(),
            cell_digits: 4,
            write_through: true,
            atomic_writes: true,
            sync_on_commit: true,
            max_open_cells: 64,
        }
    }
}

impl DatasetConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("GRIDDED_STATIC_KEY_COLUMN") {
            config.static_key_column = val;
        }

        if let Ok(val) = std::env::var("GRIDDED_TIMESERIES_KEY_COLUMN") {
            config.timeseries_key_column = val;
        }

        if let Ok(val) = std::env::var("GRIDDED_GPI_COLUMN") {
            config.gpi_column = val;
        }

        if let Ok(val) = std::env::var("GRIDDED_CELL_DIGITS") {
            if let Ok(digits) = val.parse() {
                config.cell_digits = digits;
            }
        }

        if let Ok(val) = std::env::var("GRIDDED_WRITE_THROUGH") {
            config.write_through = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("GRIDDED_ATOMIC_WRITES") {
            config.atomic_writes = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("GRIDDED_SYNC_ON_COMMIT") {
            config.sync_on_commit = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("GRIDDED_MAX_OPEN_CELLS") {
            if let Ok(cells) = val.parse() {
                config.max_open_cells = cells;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.static_key_column.is_empty() {
            return Err("static_key_column must not be empty".to_string());
        }

        if self.timeseries_key_column.is_empty() {
            return Err("timeseries_key_column must not be empty".to_string());
        }

        if self.gpi_column.is_empty() {
            return Err("gpi_column must not be empty".to_string());
        }

        if self.cell_digits == 0 || self.cell_digits > 12 {
            return Err("cell_digits must be 1-12".to_string());
        }

        if self.max_open_cells == 0 {
            return Err("max_open_cells must be at least 1".to_string());
        }

        Ok(())
    }

    /// File name for a cell store, e.g. `0042.csv`.
    pub fn cell_filename(&self, cell: u64, extension: &str) -> String {
        format!("{:0width$}.{}", cell, extension, width = self.cell_digits)
    }
}

fn parse_flag(val: &str) -> bool {
    val.to_lowercase() == "true" || val == "1"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DatasetConfig::default();
        assert_eq!(config.static_key_column, "gpi");
        assert_eq!(config.timeseries_key_column, "date");
        assert_eq!(config.gpi_column, "gpi");
        assert_eq!(config.cell_digits, 4);
        assert!(config.write_through);
        assert!(config.atomic_writes);
        assert_eq!(config.max_open_cells, 64);
    }

    #[test]
    fn test_config_validation() {
        let mut config = DatasetConfig::default();
        assert!(config.validate().is_ok());

        config.gpi_column = String::new();
        assert!(config.validate().is_err());

        config = DatasetConfig::default();
        config.cell_digits = 0;
        assert!(config.validate().is_err());

        config.cell_digits = 13;
        assert!(config.validate().is_err());

        config = DatasetConfig::default();
        config.max_open_cells = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cell_filename() {
        let config = DatasetConfig::default();
        assert_eq!(config.cell_filename(42, "csv"), "0042.csv");
        assert_eq!(config.cell_filename(123456, "img"), "123456.img");
    }
}
