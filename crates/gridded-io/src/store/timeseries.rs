//! Time-ordered records per grid point.
//!
//! The index column of a time series file is the timestamp; grid point
//! identity travels as an ordinary data column. Reads return the matching
//! rows in storage order without re-sorting them. The file always has
//! exactly one header row and earlier rows stay queryable after an append.

use crate::codec::{CsvCodec, RecordCodec};
use crate::config::DatasetConfig;
use crate::error::Result;
use crate::record::Table;
use crate::topology::Gpi;

use super::record_store::{RecordLayout, RecordStore};

/// Rows keyed by timestamp, many per grid point.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeSeriesLayout;

impl RecordLayout for TimeSeriesLayout {
    fn key_column(config: &DatasetConfig) -> &str {
        &config.timeseries_key_column
    }
}

/// Time series dataset.
pub type TimeSeriesStore<C = CsvCodec> = RecordStore<TimeSeriesLayout, C>;

impl<C: RecordCodec> RecordStore<TimeSeriesLayout, C> {
    /// Alias of [`read`](Self::read).
    pub fn read_ts(&mut self, gpi: Gpi) -> Result<Table> {
        self.read(gpi)
    }

    /// Alias of [`write`](Self::write).
    pub fn write_ts(&mut self, data: &Table) -> Result<()> {
        self.write(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DatasetError;
    use crate::mode::AccessMode;
    use crate::record::Value;
    use crate::store::DatasetStore;

    #[test]
    fn test_header_written_once_across_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ts.csv");
        let chunk = |gpi: i64| {
            Table::new("", vec![Value::Int(gpi)])
                .with_column("gpi", vec![Value::Int(gpi)])
                .unwrap()
        };

        let mut store = TimeSeriesStore::new(&path, AccessMode::Write);
        store.write_ts(&chunk(1)).unwrap();
        store.write_ts(&chunk(2)).unwrap();
        store.close().unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "date,gpi\n1,1\n2,2\n"
        );
    }

    #[test]
    fn test_schema_change_rejected_on_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ts.csv");
        std::fs::write(&path, "date,gpi,sm\n2007-01-01,1,0.5\n").unwrap();

        let mut store = TimeSeriesStore::new(&path, AccessMode::Append);
        let other = Table::new("", vec![Value::Int(0)])
            .with_column("gpi", vec![Value::Int(1)])
            .unwrap();
        assert!(matches!(
            store.write(&other),
            Err(DatasetError::SchemaMismatch(_))
        ));
        store.close().unwrap();

        // the failed write left the file untouched
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "date,gpi,sm\n2007-01-01,1,0.5\n"
        );
    }

    #[test]
    fn test_gpi_as_key_column_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ts.csv");
        std::fs::write(&path, "date,gpi,sm\n2007-01-01,1,0.5\n").unwrap();

        let mut store = TimeSeriesStore::new(&path, AccessMode::Append);
        let rows = Table::new("", vec![Value::Int(0)])
            .with_column("gpi", vec![Value::Int(1)])
            .unwrap()
            .with_column("sm", vec![Value::Float(0.25)])
            .unwrap();
        assert!(matches!(
            store.write_with_key(&rows, "gpi"),
            Err(DatasetError::SchemaMismatch(_))
        ));
        store.close().unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "date,gpi,sm\n2007-01-01,1,0.5\n"
        );
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
