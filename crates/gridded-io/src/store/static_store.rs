//! One record per grid point.

use crate::codec::CsvCodec;
use crate::config::DatasetConfig;

use super::record_store::{RecordLayout, RecordStore};

/// Rows keyed by grid point, no ordering across rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLayout;

impl RecordLayout for StaticLayout {
    fn key_column(config: &DatasetConfig) -> &str {
        &config.static_key_column
    }
}

/// Static dataset: one row per grid point.
pub type StaticStore<C = CsvCodec> = RecordStore<StaticLayout, C>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DatasetError;
    use crate::mode::AccessMode;
    use crate::record::{Table, Value};
    use crate::store::DatasetStore;

    #[test]
    fn test_write_on_read_store_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("static.csv");
        std::fs::write(&path, "gpi,data\n0,100\n").unwrap();

        let mut store = StaticStore::new(&path, AccessMode::Read);
        assert_eq!(store.read(0).unwrap().len(), 1);
        let table = Table::new("gpi", vec![Value::Int(1)]);
        assert!(matches!(
            store.write(&table),
            Err(DatasetError::ModeMismatch { .. })
        ));
    }

    #[test]
    fn test_read_on_write_store_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = StaticStore::new(dir.path().join("static.csv"), AccessMode::Write);
        store.open().unwrap();
        assert!(matches!(store.read(0), Err(DatasetError::ModeMismatch { .. })));
    }

    #[test]
    fn test_custom_key_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("static.csv");
        let table = Table::new("", vec![Value::Int(5)])
            .with_column("data", vec![Value::Int(105)])
            .unwrap();

        let mut store = StaticStore::new(&path, AccessMode::Write);
        store.write_with_key(&table, "location_id").unwrap();
        store.close().unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "location_id,data\n5,105\n"
        );
    }

    #[test]
    fn test_configured_key_column_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("static.csv");
        let config = DatasetConfig {
            static_key_column: "location_id".to_string(),
            gpi_column: "location_id".to_string(),
            ..DatasetConfig::default()
        };
        let table = Table::new("", vec![Value::Int(7)])
            .with_column("data", vec![Value::Int(107)])
            .unwrap();

        let mut store = StaticStore::with_codec(&path, AccessMode::Write, CsvCodec, &config);
        store.write(&table).unwrap();
        store.close().unwrap();

        let mut store = StaticStore::with_codec(&path, AccessMode::Read, CsvCodec, &config);
        let rows = store.read(7).unwrap();
        assert_eq!(rows.index_name(), "location_id");
        assert_eq!(rows.column("data").unwrap().values, vec![Value::Int(107)]);
    }
}
