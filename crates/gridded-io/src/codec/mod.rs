//! Serialization services used by dataset handles.
//!
//! Handles never touch raw bytes; they hand a sink or source to a [`Codec`].

mod csv;
mod raster;

pub use csv::CsvCodec;
pub use raster::RasterCodec;

use std::io::{Read, Write};

use crate::error::Result;
use crate::image::Image;
use crate::record::Table;

/// Content a handle can stage for output.
pub trait Payload: Clone + Default + Send {
    /// Fold `incoming` into already staged content.
    fn merge(&mut self, incoming: Self) -> Result<()>;
}

impl Payload for Table {
    fn merge(&mut self, incoming: Self) -> Result<()> {
        self.extend(incoming)
    }
}

impl Payload for Image {
    /// A snapshot has no rows to extend; the newest image wins.
    fn merge(&mut self, incoming: Self) -> Result<()> {
        *self = incoming;
        Ok(())
    }
}

/// Serialize/deserialize one payload type to a byte stream.
pub trait Codec: Send {
    type Item: Payload;

    /// File extension for resources written by this codec.
    fn extension(&self) -> &'static str;

    /// Reject `item` if it cannot be written with its index labelled
    /// `key_column`. Runs before anything is staged.
    fn check(&self, _item: &Self::Item, _key_column: &str) -> Result<()> {
        Ok(())
    }

    /// Write `item` to `sink`, labelling its index column `key_column`.
    fn serialize(&self, item: &Self::Item, sink: &mut dyn Write, key_column: &str) -> Result<()>;

    /// Read a whole payload from `source`.
    fn deserialize(&self, source: &mut dyn Read) -> Result<Self::Item>;
}

/// Codec over tabular records.
pub trait RecordCodec: Codec<Item = Table> {}

impl<C: Codec<Item = Table>> RecordCodec for C {}

/// Codec over full-grid images.
pub trait ImageCodec: Codec<Item = Image> {}

impl<C: Codec<Item = Image>> ImageCodec for C {}
