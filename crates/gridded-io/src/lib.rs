//! Dataset Access Layer for Gridded Geophysical Data
//!
//! This crate provides a uniform read/write contract for datasets indexed
//! by grid point (gpi). It supports three record shapes:
//!
//! - **Static**: one record per grid point
//! - **Time series**: many time-keyed records per grid point
//! - **Image**: one full-grid snapshot per instant
//!
//! # Architecture
//!
//! ```text
//! Client
//!   │
//!   ▼
//! GriddedDataset::read(gpi) / write(gpi, table)
//!   │
//!   ├─► GridTopology: gpi → cell
//!   │
//!   ▼
//! StaticStore / TimeSeriesStore / ImageStore  (one per cell file)
//!   │
//!   ▼
//! DatasetHandle: Unopened → Open(mode) → Closed
//!   │       ├─ read:  decode once, keep resident
//!   │       └─ write: stage, commit via temp file + rename
//!   ▼
//! Codec (CsvCodec / RasterCodec)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use gridded_io::{AccessMode, StaticStore, Table};
//!
//! let mut store = StaticStore::new("static.csv", AccessMode::Write);
//! store.write(&table)?;
//! store.close()?;
//!
//! let mut store = StaticStore::new("static.csv", AccessMode::Read);
//! let rows = store.read(1)?;
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod gridded;
pub mod handle;
pub mod image;
pub mod mode;
pub mod record;
pub mod store;
pub mod topology;

// Re-export commonly used types at crate root
pub use codec::{Codec, CsvCodec, ImageCodec, Payload, RasterCodec, RecordCodec};
pub use config::DatasetConfig;
pub use error::{DatasetError, Result};
pub use gridded::{GridPointIter, GriddedDataset};
pub use handle::{CommitOptions, DatasetHandle, HandleState};
pub use image::Image;
pub use mode::AccessMode;
pub use record::{Column, Table, Value};
pub use store::{
    AnyStore, DatasetKind, DatasetStore, ImageStore, PointStore, Query, Record, RecordLayout,
    RecordStore, StaticLayout, StaticStore, TimeSeriesLayout, TimeSeriesStore,
};
pub use topology::{CellId, Gpi, GridTopology, PartitionMap, RegularGrid};
