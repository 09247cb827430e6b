//! Full-grid snapshot type.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, Result};
use crate::topology::Gpi;

/// One full-grid snapshot at a single instant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Image {
    /// Pixel values (row-major order, top-to-bottom).
    pub data: Vec<f32>,
    /// Width in grid points.
    pub width: usize,
    /// Height in grid points.
    pub height: usize,
    /// Acquisition time of the snapshot.
    pub timestamp: Option<DateTime<Utc>>,
    /// Free-form metadata (units, variable name, ...).
    pub attributes: BTreeMap<String, String>,
}

impl Image {
    /// Create a new image. `data.len()` must equal `width * height`.
    pub fn new(data: Vec<f32>, width: usize, height: usize) -> Result<Self> {
        let expected = width.checked_mul(height).ok_or_else(|| {
            DatasetError::schema_mismatch(format!("image {}x{} is too large", width, height))
        })?;
        if data.len() != expected {
            return Err(DatasetError::schema_mismatch(format!(
                "image {}x{} needs {} values, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            timestamp: None,
            attributes: BTreeMap::new(),
        })
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Get the value at a specific grid coordinate.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.data.get(row * self.width + col).copied()
    }

    /// Value at the row-major flat index `gpi`.
    pub fn value_at(&self, gpi: Gpi) -> Option<f32> {
        self.data.get(usize::try_from(gpi).ok()?).copied()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
