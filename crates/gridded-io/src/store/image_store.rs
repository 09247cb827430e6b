//! Full-grid snapshots.

use std::path::{Path, PathBuf};

use tracing::instrument;

use crate::codec::{ImageCodec, RasterCodec};
use crate::config::DatasetConfig;
use crate::error::{DatasetError, Result};
use crate::handle::{CommitOptions, DatasetHandle};
use crate::image::Image;
use crate::mode::AccessMode;
use crate::record::Table;
use crate::topology::Gpi;

use super::DatasetStore;

/// Image dataset: the only valid query is the whole image.
pub struct ImageStore<C: ImageCodec = RasterCodec> {
    handle: DatasetHandle<C>,
}

impl ImageStore<RasterCodec> {
    /// Raster-backed store with default configuration.
    pub fn new(path: impl Into<PathBuf>, mode: AccessMode) -> Self {
        Self::with_config(path, mode, &DatasetConfig::default())
    }

    pub fn with_config(path: impl Into<PathBuf>, mode: AccessMode, config: &DatasetConfig) -> Self {
        Self::with_codec(path, mode, RasterCodec, config)
    }
}

impl<C: ImageCodec> ImageStore<C> {
    pub fn with_codec(
        path: impl Into<PathBuf>,
        mode: AccessMode,
        codec: C,
        config: &DatasetConfig,
    ) -> Self {
        Self {
            handle: DatasetHandle::new(path, mode, codec, CommitOptions::from(config)),
        }
    }

    pub fn handle(&self) -> &DatasetHandle<C> {
        &self.handle
    }

    /// The full snapshot, decoded once per handle.
    #[instrument(skip(self), fields(path = %self.handle.path().display()))]
    pub fn read(&mut self) -> Result<Image> {
        self.handle.open(AccessMode::Read)?;
        self.handle.read_all().cloned()
    }

    /// Grid point queries are not supported on images.
    pub fn read_point(&mut self, gpi: Gpi) -> Result<Table> {
        Err(DatasetError::invalid_query(format!(
            "image dataset {} has no per grid point access (gpi {})",
            self.handle.path().display(),
            gpi
        )))
    }

    /// Replace the stored snapshot with `image`.
    pub fn write(&mut self, image: &Image) -> Result<()> {
        let mode = self.handle.mode();
        if !mode.is_output() {
            return Err(DatasetError::mode_mismatch(self.handle.path(), mode, AccessMode::Write));
        }
        self.handle.open(mode)?;
        self.handle.stage(image.clone(), "")
    }
}

impl<C: ImageCodec> DatasetStore for ImageStore<C> {
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
