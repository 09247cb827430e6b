//! Tabular store shared by the per-point record shapes.
//!
//! Static and time series files differ only in the label written for their
//! index column. Both select rows through the grid point column and append
//! with read-merge-rewrite: an append handle loads the rows already on disk,
//! each write extends them, and the full set is rewritten in one pass.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use tracing::instrument;

use crate::codec::{CsvCodec, RecordCodec};
use crate::config::DatasetConfig;
use crate::error::{DatasetError, Result};
use crate::handle::{CommitOptions, DatasetHandle};
use crate::mode::AccessMode;
use crate::record::Table;
use crate::topology::Gpi;

use super::{DatasetStore, PointStore};

/// Record shape of a tabular store.
pub trait RecordLayout: Send {
    /// Index label written by [`RecordStore::write`].
    fn key_column(config: &DatasetConfig) -> &str;
}

/// Store of tabular records addressed by grid point.
pub struct RecordStore<L: RecordLayout, C: RecordCodec = CsvCodec> {
    handle: DatasetHandle<C>,
    key_column: String,
    gpi_column: String,
    layout: PhantomData<L>,
}

impl<L: RecordLayout> RecordStore<L, CsvCodec> {
    /// CSV-backed store with default configuration.
    pub fn new(path: impl Into<PathBuf>, mode: AccessMode) -> Self {
        Self::with_codec(path, mode, CsvCodec, &DatasetConfig::default())
    }
}

impl<L: RecordLayout, C: RecordCodec> RecordStore<L, C> {
    pub fn with_codec(
        path: impl Into<PathBuf>,
        mode: AccessMode,
        codec: C,
        config: &DatasetConfig,
    ) -> Self {
        Self {
            handle: DatasetHandle::new(path, mode, codec, CommitOptions::from(config)),
            key_column: L::key_column(config).to_string(),
            gpi_column: config.gpi_column.clone(),
            layout: PhantomData,
        }
    }

    pub fn handle(&self) -> &DatasetHandle<C> {
        &self.handle
    }

    /// Rows whose grid point column holds `gpi`, in storage order.
    ///
    /// The whole file is loaded on the first call and reused afterwards.
    #[instrument(skip(self), fields(path = %self.handle.path().display()))]
    pub fn read(&mut self, gpi: Gpi) -> Result<Table> {
        self.handle.open(AccessMode::Read)?;
        let data = self.handle.read_all()?;
        data.select_gpi(&self.gpi_column, gpi)
    }

    /// Write `data`, labelling its index with the configured key column.
    pub fn write(&mut self, data: &Table) -> Result<()> {
        let key_column = self.key_column.clone();
        self.write_with_key(data, &key_column)
    }

    /// Write `data`, labelling its index `key_column`.
    pub fn write_with_key(&mut self, data: &Table, key_column: &str) -> Result<()> {
        let mode = self.handle.mode();
        if !mode.is_output() {
            return Err(DatasetError::mode_mismatch(self.handle.path(), mode, AccessMode::Write));
        }
        self.handle.open(mode)?;
        self.handle.stage(data.clone(), key_column)
    }
}

impl<L: RecordLayout, C: RecordCodec> DatasetStore for RecordStore<L, C> {
    fn path(&self) -> &Path {
        self.handle.path()
    }

    fn mode(&self) -> AccessMode {
        self.handle.mode()
    }

    fn is_open(&self) -> bool {
        self.handle.is_open()
    }

    fn open(&mut self) -> Result<()> {
        let mode = self.handle.mode();
        self.handle.open(mode)
    }

    fn flush(&mut self) -> Result<()> {
        self.handle.flush()
    }

    fn close(&mut self) -> Result<()> {
        self.handle.close()
    }
}

impl<L: RecordLayout, C: RecordCodec + Default> PointStore for RecordStore<L, C> {
    fn create(path: PathBuf, mode: AccessMode, config: &DatasetConfig) -> Self {
        Self::with_codec(path, mode, C::default(), config)
    }

    fn extension() -> &'static str {
        C::default().extension()
    }

    fn read(&mut self, gpi: Gpi) -> Result<Table> {
        Self::read(self, gpi)
    }

    fn write(&mut self, data: &Table) -> Result<()> {
        Self::write(self, data)
    }
}
