//! Common test fixtures for gridded dataset tests.
//!
//! This module provides small grids, partitions and configurations that
//! show up across the test suite.

use std::path::PathBuf;

use gridded_io::{DatasetConfig, PartitionMap};
use tempfile::TempDir;

/// Common grid definitions for testing.
pub mod grid {
    use gridded_io::RegularGrid;

    /// Global 5 degree grid of cell centres with 10 degree cells.
    ///
    /// 72 x 36 points; gpi 0 sits at (-177.5, -87.5).
    pub fn global_5deg() -> RegularGrid {
        RegularGrid::new(72, 36, 5.0, 5.0, -177.5, -87.5, 10.0).expect("valid grid")
    }

    /// A 4 x 2 patch near the origin, one point per degree, 2 degree cells.
    ///
    /// Points 0,1 / 4,5 share a cell, as do 2,3 / 6,7.
    pub fn small_patch() -> RegularGrid {
        RegularGrid::new(4, 2, 1.0, 1.0, 0.5, 0.5, 2.0).expect("valid grid")
    }
}

/// Grid points 0..100 spread over four cells of 25 points each.
pub fn hundred_points_four_cells() -> PartitionMap {
    PartitionMap::blocks(100, 25)
}

/// Configuration that buffers writes until flush/close and skips fsync.
pub fn buffered_config() -> DatasetConfig {
    DatasetConfig {
        write_through: false,
        sync_on_commit: false,
        ..DatasetConfig::default()
    }
}

/// Configuration that writes files in place without a temporary file.
pub fn direct_write_config() -> DatasetConfig {
    DatasetConfig {
        atomic_writes: false,
        sync_on_commit: false,
        ..DatasetConfig::default()
    }
}

/// Scratch directory removed when dropped.
pub struct Scratch {
    dir: TempDir,
}

impl Scratch {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create scratch directory"),
        }
    }

    /// Path of `name` inside the scratch directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Names of the files currently in the directory, sorted.
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dir.path())
            .expect("read scratch directory")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

impl Default for Scratch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridded_io::GridTopology;

    #[test]
    fn test_small_patch_cells() {
        let grid = grid::small_patch();
        let cell = grid.cell_for(0).unwrap();
        assert_eq!(grid.cell_for(1), Some(cell));
        assert_eq!(grid.cell_for(4), Some(cell));
        assert_eq!(grid.cell_for(5), Some(cell));
        assert_ne!(grid.cell_for(2), Some(cell));
        assert_eq!(grid.cell_for(2), grid.cell_for(7));
    }

    #[test]
    fn test_hundred_points_four_cells() {
        let map = hundred_points_four_cells();
        assert_eq!(map.cells().len(), 4);
        assert_eq!(map.cell_for(99), Some(3));
    }

    #[test]
    fn test_scratch_lists_files() {
        let scratch = Scratch::new();
        std::fs::write(scratch.file("b.csv"), "").unwrap();
        std::fs::write(scratch.file("a.csv"), "").unwrap();
        assert_eq!(scratch.file_names(), vec!["a.csv", "b.csv"]);
    }
}
