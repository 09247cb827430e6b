//! Grid topology: which grid points exist and which cell stores each one.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, Result};

/// Grid point index.
pub type Gpi = u64;

/// Identifier of a cell, i.e. one backing store covering many grid points.
pub type CellId = u64;

/// Maps grid points to the cells that store them.
///
/// The mapping must be fixed for the lifetime of a value: a gridded dataset
/// relies on every supported grid point resolving to the same cell on every
/// call.
pub trait GridTopology {
    /// Cell holding `gpi`, or `None` if the grid point is not part of the grid.
    fn cell_for(&self, gpi: Gpi) -> Option<CellId>;

    /// All valid grid points in ascending order.
    fn grid_points(&self) -> Vec<Gpi>;

    /// Nearest grid point to a coordinate, if the topology knows coordinates.
    fn nearest_gpi(&self, _lon: f64, _lat: f64) -> Option<Gpi> {
        None
    }

    /// Reject definitions that cannot map grid points to cells.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// All distinct cells in ascending order.
    fn cells(&self) -> BTreeSet<CellId> {
        self.grid_points()
            .into_iter()
            .filter_map(|gpi| self.cell_for(gpi))
            .collect()
    }
}

/// Regular lon/lat grid partitioned into square cells.
///
/// Grid point `gpi = j * nx + i` sits at
/// `(first_lon + i * dx, first_lat + j * dy)`. Cells are `cell_size` degree
/// squares numbered column-major from (-180, -90).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegularGrid {
    /// Number of points in longitude direction
    pub nx: usize,
    /// Number of points in latitude direction
    pub ny: usize,
    /// Longitude step in degrees
    pub dx: f64,
    /// Latitude step in degrees (negative for north-to-south grids)
    pub dy: f64,
    /// Longitude of the first grid point
    pub first_lon: f64,
    /// Latitude of the first grid point
    pub first_lat: f64,
    /// Cell edge length in degrees
    pub cell_size: f64,
}

impl RegularGrid {
    /// Create a grid, failing with `Config` if the definition is unusable.
    pub fn new(
        nx: usize,
        ny: usize,
        dx: f64,
        dy: f64,
        first_lon: f64,
        first_lat: f64,
        cell_size: f64,
    ) -> Result<Self> {
        let grid = Self {
            nx,
            ny,
            dx,
            dy,
            first_lon,
            first_lat,
            cell_size,
        };
        GridTopology::validate(&grid)?;
        Ok(grid)
    }

    /// Total number of grid points.
    pub fn len(&self) -> usize {
        self.nx.saturating_mul(self.ny)
    }

    pub fn is_empty(&self) -> bool {
        self.nx == 0 || self.ny == 0
    }

    /// Coordinates (lon, lat) of a grid point.
    pub fn gpi_to_lonlat(&self, gpi: Gpi) -> Option<(f64, f64)> {
        if gpi >= self.len() as Gpi {
            return None;
        }
        let i = (gpi % self.nx as Gpi) as f64;
        let j = (gpi / self.nx as Gpi) as f64;
        Some((self.first_lon + i * self.dx, self.first_lat + j * self.dy))
    }

    /// Cell id for a coordinate, `None` if the cell size or the coordinate
    /// is not usable.
    pub fn lonlat_to_cell(&self, lon: f64, lat: f64) -> Option<CellId> {
        if !valid_cell_size(self.cell_size) || !lon.is_finite() || !lat.is_finite() {
            return None;
        }
        let lon = (lon + 180.0).rem_euclid(360.0);
        let lat = (lat + 90.0).clamp(0.0, 180.0);
        let lat_cells = (180.0 / self.cell_size).ceil() as u64;
        let lon_idx = (lon / self.cell_size).floor() as u64;
        let lat_idx = ((lat / self.cell_size).floor() as u64).min(lat_cells.saturating_sub(1));
        lon_idx.checked_mul(lat_cells)?.checked_add(lat_idx)
    }
}

fn valid_cell_size(cell_size: f64) -> bool {
    cell_size.is_finite() && cell_size > 0.0
}

impl GridTopology for RegularGrid {
    fn validate(&self) -> Result<()> {
        for (name, step) in [("dx", self.dx), ("dy", self.dy)] {
            if !step.is_finite() || step == 0.0 {
                return Err(DatasetError::Config(format!(
                    "{} must be finite and non-zero, got {}",
                    name, step
                )));
            }
        }
        if !self.first_lon.is_finite() || !self.first_lat.is_finite() {
            return Err(DatasetError::Config(
                "first grid point must have finite coordinates".to_string(),
            ));
        }
        if !valid_cell_size(self.cell_size) {
            return Err(DatasetError::Config(format!(
                "cell_size must be finite and positive, got {}",
                self.cell_size
            )));
        }
        let cells = (360.0 / self.cell_size).ceil() * (180.0 / self.cell_size).ceil();
        if cells >= u64::MAX as f64 {
            return Err(DatasetError::Config(format!(
                "cell_size {} yields too many cells",
                self.cell_size
            )));
        }
        if self.nx.checked_mul(self.ny).is_none() {
            return Err(DatasetError::Config(format!(
                "{} x {} grid points overflow",
                self.nx, self.ny
            )));
        }
        Ok(())
    }

    fn cell_for(&self, gpi: Gpi) -> Option<CellId> {
        self.gpi_to_lonlat(gpi)
            .and_then(|(lon, lat)| self.lonlat_to_cell(lon, lat))
    }

    fn grid_points(&self) -> Vec<Gpi> {
        (0..self.len() as Gpi).collect()
    }

    fn nearest_gpi(&self, lon: f64, lat: f64) -> Option<Gpi> {
        if self.is_empty() {
            return None;
        }
        let i = ((lon - self.first_lon) / self.dx).round() as isize;
        let j = ((lat - self.first_lat) / self.dy).round() as isize;

        if i < 0 || j < 0 || i >= self.nx as isize || j >= self.ny as isize {
            return None;
        }

        Some(j as Gpi * self.nx as Gpi + i as Gpi)
    }
}

/// Explicit grid point to cell assignment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartitionMap {
    cells: BTreeMap<Gpi, CellId>,
}

impl PartitionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `gpi` to `cell`, replacing any previous assignment.
    pub fn assign(&mut self, gpi: Gpi, cell: CellId) {
        self.cells.insert(gpi, cell);
    }

    /// Consecutive blocks of `points_per_cell` grid points share a cell.
    pub fn blocks(num_points: Gpi, points_per_cell: Gpi) -> Self {
        let per_cell = points_per_cell.max(1);
        (0..num_points).map(|gpi| (gpi, gpi / per_cell)).collect()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl FromIterator<(Gpi, CellId)> for PartitionMap {
    fn from_iter<I: IntoIterator<Item = (Gpi, CellId)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

impl GridTopology for PartitionMap {
    fn cell_for(&self, gpi: Gpi) -> Option<CellId> {
        self.cells.get(&gpi).copied()
    }

    fn grid_points(&self) -> Vec<Gpi> {
        self.cells.keys().copied().collect()
    }
}
