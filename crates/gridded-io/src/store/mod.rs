//! Store variants built on a [`DatasetHandle`](crate::handle::DatasetHandle).
//!
//! Each variant owns exactly one handle and specialises reads and writes
//! for its record shape:
//!
//! - [`StaticStore`]: one row per grid point
//! - [`TimeSeriesStore`]: many time-keyed rows per grid point
//! - [`ImageStore`]: one full-grid snapshot, no per-point addressing
//!
//! The two tabular variants are [`RecordStore`] with a different
//! [`RecordLayout`].
//!
//! [`AnyStore`] selects a variant at construction time for callers that only
//! know the dataset kind at runtime.

mod image_store;
mod record_store;
mod static_store;
mod timeseries;

pub use image_store::ImageStore;
pub use record_store::{RecordLayout, RecordStore};
pub use static_store::{StaticLayout, StaticStore};
pub use timeseries::{TimeSeriesLayout, TimeSeriesStore};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::DatasetConfig;
use crate::error::{DatasetError, Result};
use crate::image::Image;
use crate::mode::AccessMode;
use crate::record::Table;
use crate::topology::Gpi;

/// Lifecycle operations shared by every store.
pub trait DatasetStore {
    fn path(&self) -> &Path;

    fn mode(&self) -> AccessMode;

    fn is_open(&self) -> bool;

    /// Open the underlying handle in the store's mode.
    fn open(&mut self) -> Result<()>;

    /// Commit buffered writes. Output modes only.
    fn flush(&mut self) -> Result<()>;

    /// Commit pending writes and release the resource.
    fn close(&mut self) -> Result<()>;

    /// Run `f` against the store, then close it on every exit path.
    ///
    /// An error from `f` takes precedence over an error from closing.
    fn scoped<R>(mut self, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R>
    where
        Self: Sized,
    {
        let result = f(&mut self);
        let closed = self.close();
        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                warn!(path = %self.path().display(), error = %close_err, "Close failed after error");
                Err(e)
            }
        }
    }
}

/// Stores addressed by grid point index.
pub trait PointStore: DatasetStore + Sized {
    /// Build an unopened store for a cell file.
    fn create(path: PathBuf, mode: AccessMode, config: &DatasetConfig) -> Self;

    /// File extension used for cell files.
    fn extension() -> &'static str;

    /// Rows for `gpi`. No matching rows is an empty table, not an error.
    fn read(&mut self, gpi: Gpi) -> Result<Table>;

    /// Write the whole record set with the store's default key column.
    fn write(&mut self, data: &Table) -> Result<()>;
}

/// Record shape of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Static,
    TimeSeries,
    Image,
}

impl DatasetKind {
    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "timeseries" | "time_series" | "ts" => Ok(Self::TimeSeries),
            "image" => Ok(Self::Image),
            other => Err(DatasetError::Config(format!("unknown dataset kind '{}'", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::TimeSeries => "timeseries",
            Self::Image => "image",
        }
    }
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Addressing used when reading through [`AnyStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    /// Rows belonging to one grid point.
    GridPoint(Gpi),
    /// The whole snapshot.
    Image,
}

/// Content returned by or handed to [`AnyStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Record {
    Table(Table),
    Image(Image),
}

/// A store whose variant is chosen at runtime.
pub enum AnyStore {
    Static(StaticStore),
    TimeSeries(TimeSeriesStore),
    Image(ImageStore),
}

impl AnyStore {
    /// Create an unopened store of the given kind.
    pub fn create(
        kind: DatasetKind,
        path: impl Into<PathBuf>,
        mode: AccessMode,
        config: &DatasetConfig,
    ) -> Self {
        let path = path.into();
        match kind {
            DatasetKind::Static => Self::Static(StaticStore::create(path, mode, config)),
            DatasetKind::TimeSeries => {
                Self::TimeSeries(TimeSeriesStore::create(path, mode, config))
            }
            DatasetKind::Image => Self::Image(ImageStore::with_config(path, mode, config)),
        }
    }

    pub fn kind(&self) -> DatasetKind {
        match self {
            Self::Static(_) => DatasetKind::Static,
            Self::TimeSeries(_) => DatasetKind::TimeSeries,
            Self::Image(_) => DatasetKind::Image,
        }
    }

    /// Read according to `query`. The query shape must suit the variant.
    pub fn read(&mut self, query: Query) -> Result<Record> {
        match (self, query) {
            (Self::Static(store), Query::GridPoint(gpi)) => store.read(gpi).map(Record::Table),
            (Self::TimeSeries(store), Query::GridPoint(gpi)) => store.read(gpi).map(Record::Table),
            (Self::Image(store), Query::Image) => store.read().map(Record::Image),
            (Self::Image(store), Query::GridPoint(gpi)) => store.read_point(gpi).map(Record::Table),
            (store, Query::Image) => Err(DatasetError::invalid_query(format!(
                "{} dataset {} cannot be read as an image",
                store.kind(),
                store.path().display()
            ))),
        }
    }

    /// Write `record`. Tables go to point stores, images to image stores.
    pub fn write(&mut self, record: &Record) -> Result<()> {
        match (self, record) {
            (Self::Static(store), Record::Table(table)) => store.write(table),
            (Self::TimeSeries(store), Record::Table(table)) => store.write(table),
            (Self::Image(store), Record::Image(image)) => store.write(image),
            (store, _) => Err(DatasetError::invalid_query(format!(
                "record shape does not match {} dataset {}",
                store.kind(),
                store.path().display()
            ))),
        }
    }

    fn inner(&self) -> &dyn DatasetStore {
        match self {
            Self::Static(store) => store,
            Self::TimeSeries(store) => store,
            Self::Image(store) => store,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn DatasetStore {
        match self {
            Self::Static(store) => store,
            Self::TimeSeries(store) => store,
            Self::Image(store) => store,
        }
    }
}

impl DatasetStore for AnyStore {
    fn path(&self) -> &Path {
        self.inner().path()
    }

    fn mode(&self) -> AccessMode {
        self.inner().mode()
    }

    fn is_open(&self) -> bool {
        self.inner().is_open()
    }

    fn open(&mut self) -> Result<()> {
        self.inner_mut().open()
    }

    fn flush(&mut self) -> Result<()> {
        self.inner_mut().flush()
    }

    fn close(&mut self) -> Result<()> {
        self.inner_mut().close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse() {
        assert_eq!(DatasetKind::parse("Static").unwrap(), DatasetKind::Static);
        assert_eq!(DatasetKind::parse("ts").unwrap(), DatasetKind::TimeSeries);
        assert_eq!(DatasetKind::parse("image").unwrap(), DatasetKind::Image);
        assert!(DatasetKind::parse("cube").is_err());
    }

    #[test]
    fn test_stores_are_send() {
        fn assert_send<T: Send>() {}
        assert_send::<StaticStore>();
        assert_send::<TimeSeriesStore>();
        assert_send::<ImageStore>();
        assert_send::<AnyStore>();
    }

    #[test]
    fn test_query_shape_checked() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatasetConfig::default();

        let mut image = AnyStore::create(
            DatasetKind::Image,
            dir.path().join("a.img"),
            AccessMode::Read,
            &config,
        );
        assert!(matches!(
            image.read(Query::GridPoint(3)),
            Err(DatasetError::InvalidQuery(_))
        ));

        let mut points = AnyStore::create(
            DatasetKind::Static,
            dir.path().join("a.csv"),
            AccessMode::Write,
            &config,
        );
        assert!(matches!(points.read(Query::Image), Err(DatasetError::InvalidQuery(_))));
        assert!(matches!(
            points.write(&Record::Image(Image::default())),
            Err(DatasetError::InvalidQuery(_))
        ));
    }
}
