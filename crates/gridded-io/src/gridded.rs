//! Aggregation of per-cell stores addressed by grid point index.
//!
//! ```text
//! GriddedDataset::read(gpi)
//!      │
//!      ├─► topology.cell_for(gpi) ── None ──► UnknownGridPoint
//!      │
//!      ├─► store for cell (created on first use: <root>/<cell>.<ext>)
//!      │
//!      └─► store.read(gpi)
//! ```
//!
//! Writes that carry a grid point column are split by owning cell before
//! any store is touched, so every row lands in the file of its own cell.
//!
//! At most `max_open_cells` stores are held at once. The least recently used
//! one is closed to make room; a write-mode cell that comes back later is
//! reopened for append so its committed rows are kept.

use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use lru::LruCache;
use tracing::{debug, info, warn};

use crate::config::DatasetConfig;
use crate::error::{DatasetError, Result};
use crate::mode::AccessMode;
use crate::record::Table;
use crate::store::{DatasetStore, PointStore};
use crate::topology::{CellId, Gpi, GridTopology};

/// Dataset spread over one store per grid cell.
pub struct GriddedDataset<S: PointStore, T: GridTopology> {
    root: PathBuf,
    topology: T,
    mode: AccessMode,
    config: DatasetConfig,
    stores: LruCache<CellId, S>,
    /// Cells that have had a store during this session.
    visited: BTreeSet<CellId>,
    closed: bool,
}

impl<S: PointStore, T: GridTopology> GriddedDataset<S, T> {
    /// Open a gridded dataset rooted at `root`.
    ///
    /// Read mode requires `root` to exist; output modes create it.
    pub fn open(
        root: impl Into<PathBuf>,
        topology: T,
        mode: AccessMode,
        config: DatasetConfig,
    ) -> Result<Self> {
        config.validate().map_err(DatasetError::Config)?;
        topology.validate()?;
        let capacity = NonZeroUsize::new(config.max_open_cells)
            .ok_or_else(|| DatasetError::Config("max_open_cells must be at least 1".to_string()))?;
        let root = root.into();

        if mode.is_output() {
            std::fs::create_dir_all(&root).map_err(|e| DatasetError::unavailable(&root, e))?;
        } else if !root.is_dir() {
            return Err(DatasetError::unavailable(&root, "dataset directory does not exist"));
        }

        info!(root = %root.display(), mode = %mode, "Opened gridded dataset");

        Ok(Self {
            root,
            topology,
            mode,
            config,
            stores: LruCache::new(capacity),
            visited: BTreeSet::new(),
            closed: false,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn topology(&self) -> &T {
        &self.topology
    }

    /// Cells that currently hold a store instance, ascending.
    pub fn open_cells(&self) -> Vec<CellId> {
        let mut cells: Vec<CellId> = self.stores.iter().map(|(cell, _)| *cell).collect();
        cells.sort_unstable();
        cells
    }

    /// Path of the file backing `cell`.
    pub fn cell_path(&self, cell: CellId) -> PathBuf {
        self.root.join(self.config.cell_filename(cell, S::extension()))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(DatasetError::Closed(self.root.display().to_string()));
        }
        Ok(())
    }

    fn cell_of(&self, gpi: Gpi) -> Result<CellId> {
        self.topology
            .cell_for(gpi)
            .ok_or(DatasetError::UnknownGridPoint(gpi))
    }

    fn store_mut(&mut self, cell: CellId) -> Result<&mut S> {
        if !self.stores.contains(&cell) {
            if self.stores.len() >= self.stores.cap().get() {
                if let Some((evicted, mut store)) = self.stores.pop_lru() {
                    debug!(cell = evicted, "Closing least recently used cell store");
                    store.close()?;
                }
            }

            let mode = if self.mode == AccessMode::Write && self.visited.contains(&cell) {
                AccessMode::Append
            } else {
                self.mode
            };
            let path = self.cell_path(cell);
            debug!(cell, path = %path.display(), mode = %mode, "Created cell store");
            self.stores.put(cell, S::create(path, mode, &self.config));
            self.visited.insert(cell);
        }

        self.stores
            .get_mut(&cell)
            .ok_or_else(|| DatasetError::NotOpen(format!("cell {}", cell)))
    }

    /// Rows for `gpi` from the store of its cell.
    pub fn read(&mut self, gpi: Gpi) -> Result<Table> {
        self.ensure_open()?;
        let cell = self.cell_of(gpi)?;
        self.store_mut(cell)?.read(gpi)
    }

    /// Rows for the grid point nearest to (`lon`, `lat`).
    pub fn read_nearest(&mut self, lon: f64, lat: f64) -> Result<(Gpi, Table)> {
        let gpi = self.topology.nearest_gpi(lon, lat).ok_or_else(|| {
            DatasetError::invalid_query(format!("no grid point near ({}, {})", lon, lat))
        })?;
        let data = self.read(gpi)?;
        Ok((gpi, data))
    }

    /// Write `data` addressed to `gpi`.
    ///
    /// If `data` has a grid point column, its rows are routed to the cells
    /// owning each row's grid point. Otherwise the whole table goes to the
    /// cell of `gpi`.
    pub fn write(&mut self, gpi: Gpi, data: &Table) -> Result<()> {
        self.ensure_open()?;
        let cell = self.cell_of(gpi)?;
        if data.column(&self.config.gpi_column).is_none() {
            return self.store_mut(cell)?.write(data);
        }
        self.write_split(data)
    }

    /// Write rows for any number of grid points, split by owning cell.
    pub fn write_all(&mut self, data: &Table) -> Result<()> {
        self.ensure_open()?;
        self.write_split(data)
    }

    fn write_split(&mut self, data: &Table) -> Result<()> {
        let column = data
            .column(&self.config.gpi_column)
            .ok_or_else(|| DatasetError::MissingColumn(self.config.gpi_column.clone()))?;

        // Every row is validated before any store is written.
        let mut groups: BTreeMap<CellId, Vec<usize>> = BTreeMap::new();
        for (position, value) in column.values.iter().enumerate() {
            let gpi = value.as_gpi().ok_or_else(|| {
                DatasetError::invalid_query(format!(
                    "row {} has no valid grid point index: {:?}",
                    position, value
                ))
            })?;
            let cell = self.cell_of(gpi)?;
            groups.entry(cell).or_default().push(position);
        }

        debug!(cells = groups.len(), rows = data.len(), "Split write across cells");
        for (cell, positions) in groups {
            self.store_mut(cell)?.write(&data.take(&positions))?;
        }
        Ok(())
    }

    /// Iterate over every grid point of the topology in ascending order.
    pub fn iter_gp(&mut self) -> GridPointIter<'_, S, T> {
        let gpis = self.topology.grid_points().into_iter();
        GridPointIter {
            dataset: self,
            gpis,
        }
    }

    /// Commit buffered writes in every open store.
    pub fn flush(&mut self) -> Result<()> {
        self.ensure_open()?;
        if !self.mode.is_output() {
            return Err(DatasetError::mode_mismatch(&self.root, self.mode, AccessMode::Write));
        }
        for (_, store) in self.stores.iter_mut() {
            if store.is_open() {
                store.flush()?;
            }
        }
        Ok(())
    }

    /// Close every store once. All stores are closed even if one fails; the
    /// first failure is returned.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut first_error = None;
        for (cell, store) in self.stores.iter_mut() {
            if let Err(e) = store.close() {
                warn!(cell = *cell, error = %e, "Failed to close cell store");
                first_error.get_or_insert(e);
            }
        }
        info!(root = %self.root.display(), cells = self.visited.len(), "Closed gridded dataset");
        self.stores.clear();

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl<S: PointStore, T: GridTopology> Drop for GriddedDataset<S, T> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.close() {
                warn!(root = %self.root.display(), error = %e, "Failed to close gridded dataset on drop");
            }
        }
    }
}

/// Iterator over `(gpi, rows)` of a gridded dataset.
pub struct GridPointIter<'a, S: PointStore, T: GridTopology> {
    dataset: &'a mut GriddedDataset<S, T>,
    gpis: std::vec::IntoIter<Gpi>,
}

impl<'a, S: PointStore, T: GridTopology> Iterator for GridPointIter<'a, S, T> {
    type Item = Result<(Gpi, Table)>;

    fn next(&mut self) -> Option<Self::Item> {
        let gpi = self.gpis.next()?;
        Some(self.dataset.read(gpi).map(|data| (gpi, data)))
    }
}
