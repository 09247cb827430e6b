//! Lifecycle-managed binding to one backing resource.
//!
//! A handle moves through `Unopened → Open → Closed` and never back. Read
//! handles decode the resource once and keep the result resident for the
//! rest of their lifetime. Output handles keep a staging buffer holding the
//! complete content to be committed; every commit rewrites the resource
//! from that buffer.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, instrument, warn};

use crate::codec::{Codec, Payload};
use crate::config::DatasetConfig;
use crate::error::{DatasetError, Result};
use crate::mode::AccessMode;

/// Lifecycle state of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Unopened,
    Open,
    Closed,
}

/// How staged output reaches the backing resource.
#[derive(Debug, Clone, Copy)]
pub struct CommitOptions {
    /// Commit on every write rather than on flush/close.
    pub write_through: bool,
    /// Write a temporary file next to the target, then rename over it.
    pub atomic: bool,
    /// fsync before the rename.
    pub sync: bool,
}

impl From<&DatasetConfig> for CommitOptions {
    fn from(config: &DatasetConfig) -> Self {
        Self {
            write_through: config.write_through,
            atomic: config.atomic_writes,
            sync: config.sync_on_commit,
        }
    }
}

impl Default for CommitOptions {
    fn default() -> Self {
        Self::from(&DatasetConfig::default())
    }
}

enum Resource<T> {
    Reader(BufReader<File>),
    Output(Staging<T>),
}

struct Staging<T> {
    pending: T,
    key_column: String,
    dirty: bool,
}

/// Handle over a single file.
///
/// The resident cache is filled on the first read and never invalidated.
/// A handle cannot mix reads and writes, so it never observes its own
/// writes stale; changes made to the file by anyone else after the first
/// read are not seen until a new handle is created.
pub struct DatasetHandle<C: Codec> {
    path: PathBuf,
    mode: AccessMode,
    codec: C,
    options: CommitOptions,
    state: HandleState,
    resource: Option<Resource<C::Item>>,
    resident: Option<C::Item>,
}

impl<C: Codec> DatasetHandle<C> {
    /// Create an unopened handle. No I/O happens until [`open`](Self::open).
    pub fn new(path: impl Into<PathBuf>, mode: AccessMode, codec: C, options: CommitOptions) -> Self {
        Self {
            path: path.into(),
            mode,
            codec,
            options,
            state: HandleState::Unopened,
            resource: None,
            resident: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == HandleState::Open
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Cached content of a read handle, if it has been loaded.
    pub fn resident(&self) -> Option<&C::Item> {
        self.resident.as_ref()
    }

    /// True if staged output has not reached the backing resource yet.
    pub fn is_dirty(&self) -> bool {
        matches!(&self.resource, Some(Resource::Output(staging)) if staging.dirty)
    }

    /// Open the handle in `requested` mode.
    ///
    /// Idempotent while open. Fails with `ModeMismatch` if `requested`
    /// differs from the mode the handle was created with, and with `Closed`
    /// once the handle has been closed.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn open(&mut self, requested: AccessMode) -> Result<()> {
        if self.state == HandleState::Closed {
            return Err(DatasetError::Closed(self.path.display().to_string()));
        }
        if requested != self.mode {
            return Err(DatasetError::mode_mismatch(&self.path, self.mode, requested));
        }
        if self.state == HandleState::Open {
            return Ok(());
        }

        let resource = self.acquire()?;
        self.resource = Some(resource);
        self.state = HandleState::Open;
        debug!(mode = %self.mode, "Opened dataset handle");
        Ok(())
    }

    fn acquire(&self) -> Result<Resource<C::Item>> {
        match self.mode {
            AccessMode::Read => {
                let file =
                    File::open(&self.path).map_err(|e| DatasetError::unavailable(&self.path, e))?;
                Ok(Resource::Reader(BufReader::new(file)))
            }
            AccessMode::Write => {
                self.check_writable()?;
                // Truncation: committing the empty buffer replaces old content.
                Ok(Resource::Output(Staging {
                    pending: C::Item::default(),
                    key_column: String::new(),
                    dirty: true,
                }))
            }
            AccessMode::Append => {
                self.check_writable()?;
                if !self.path.exists() {
                    return Ok(Resource::Output(Staging {
                        pending: C::Item::default(),
                        key_column: String::new(),
                        dirty: true,
                    }));
                }
                let file =
                    File::open(&self.path).map_err(|e| DatasetError::unavailable(&self.path, e))?;
                let existing = self.codec.deserialize(&mut BufReader::new(file))?;
                debug!("Loaded existing content for append");
                Ok(Resource::Output(Staging {
                    pending: existing,
                    key_column: String::new(),
                    dirty: false,
                }))
            }
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.path.is_dir() {
            return Err(DatasetError::unavailable(&self.path, "path is a directory"));
        }
        let parent = parent_dir(&self.path);
        if !parent.is_dir() {
            return Err(DatasetError::unavailable(
                &self.path,
                format!("directory {} does not exist", parent.display()),
            ));
        }
        Ok(())
    }

    fn require_open(&self) -> Result<()> {
        match self.state {
            HandleState::Open => Ok(()),
            HandleState::Unopened => Err(DatasetError::NotOpen(self.path.display().to_string())),
            HandleState::Closed => Err(DatasetError::Closed(self.path.display().to_string())),
        }
    }

    /// Whole content of a read handle, decoded on first call.
    ///
    /// The file is released once its content is resident.
    pub fn read_all(&mut self) -> Result<&C::Item> {
        self.require_open()?;
        if self.mode != AccessMode::Read {
            return Err(DatasetError::mode_mismatch(&self.path, self.mode, AccessMode::Read));
        }

        if self.resident.is_none() {
            let mut reader = match self.resource.take() {
                Some(Resource::Reader(reader)) => reader,
                _ => BufReader::new(
                    File::open(&self.path).map_err(|e| DatasetError::unavailable(&self.path, e))?,
                ),
            };
            let item = self.codec.deserialize(&mut reader)?;
            debug!(path = %self.path.display(), "Loaded resident data");
            self.resident = Some(item);
        }

        self.resident
            .as_ref()
            .ok_or_else(|| DatasetError::NotOpen(self.path.display().to_string()))
    }

    /// Merge `item` into the staged output, labelling the index `key_column`.
    ///
    /// With write-through enabled the merged content is committed first and
    /// only adopted as staged output once the commit succeeded, so a failed
    /// call leaves nothing behind for a later flush or close.
    #[instrument(skip(self, item), fields(path = %self.path.display()))]
    pub fn stage(&mut self, item: C::Item, key_column: &str) -> Result<()> {
        self.require_open()?;
        if !self.mode.is_output() {
            return Err(DatasetError::mode_mismatch(&self.path, self.mode, AccessMode::Write));
        }
        self.codec.check(&item, key_column)?;

        let staging = match self.resource.as_mut() {
            Some(Resource::Output(staging)) => staging,
            _ => return Err(DatasetError::NotOpen(self.path.display().to_string())),
        };

        if !self.options.write_through {
            staging.pending.merge(item)?;
            staging.key_column = key_column.to_string();
            staging.dirty = true;
            return Ok(());
        }

        let mut candidate = staging.pending.clone();
        candidate.merge(item)?;
        write_resource(&self.path, &self.codec, &self.options, &candidate, key_column)?;
        staging.pending = candidate;
        staging.key_column = key_column.to_string();
        staging.dirty = false;
        Ok(())
    }

    /// Commit staged output without closing. Output modes only.
    pub fn flush(&mut self) -> Result<()> {
        self.require_open()?;
        if !self.mode.is_output() {
            return Err(DatasetError::mode_mismatch(&self.path, self.mode, AccessMode::Write));
        }
        self.commit()
    }

    /// Commit pending output and release the resource.
    ///
    /// The handle is closed even if the final commit fails; the failure is
    /// returned.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn close(&mut self) -> Result<()> {
        match self.state {
            HandleState::Closed => Ok(()),
            HandleState::Unopened => {
                self.state = HandleState::Closed;
                Ok(())
            }
            HandleState::Open => {
                let result = self.commit();
                self.resource = None;
                self.resident = None;
                self.state = HandleState::Closed;
                debug!("Closed dataset handle");
                result
            }
        }
    }

    fn commit(&mut self) -> Result<()> {
        let staging = match self.resource.as_mut() {
            Some(Resource::Output(staging)) if staging.dirty => staging,
            _ => return Ok(()),
        };

        write_resource(
            &self.path,
            &self.codec,
            &self.options,
            &staging.pending,
            &staging.key_column,
        )?;
        staging.dirty = false;
        Ok(())
    }
}

impl<C: Codec> Drop for DatasetHandle<C> {
    fn drop(&mut self) {
        if self.state == HandleState::Open {
            if let Err(e) = self.close() {
                warn!(path = %self.path.display(), error = %e, "Failed to commit dataset on drop");
            }
        }
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn write_resource<C: Codec>(
    path: &Path,
    codec: &C,
    options: &CommitOptions,
    item: &C::Item,
    key_column: &str,
) -> Result<()> {
    if options.atomic {
        let mut tmp = NamedTempFile::new_in(parent_dir(path))
            .map_err(|e| DatasetError::unavailable(path, e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            codec.serialize(item, &mut writer, key_column)?;
            writer.flush()?;
        }
        if options.sync {
            tmp.as_file().sync_all()?;
        }
        tmp.persist(path)
            .map_err(|e| DatasetError::Storage(format!("{}: {}", path.display(), e.error)))?;
    } else {
        let file = File::create(path).map_err(|e| DatasetError::unavailable(path, e))?;
        let mut writer = BufWriter::new(file);
        codec.serialize(item, &mut writer, key_column)?;
        writer.flush()?;
        if options.sync {
            writer.get_ref().sync_all()?;
        }
    }

    debug!(path = %path.display(), "Committed dataset content");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CsvCodec;
    use crate::record::Table;

    fn table(rows: i64) -> Table {
        Table::new("gpi", (0..rows).map(Into::into).collect())
            .with_column("data", (0..rows).map(|v| (v + 100).into()).collect())
            .unwrap()
    }

    fn handle(path: &Path, mode: AccessMode) -> DatasetHandle<CsvCodec> {
        DatasetHandle::new(path, mode, CsvCodec, CommitOptions::default())
    }

    #[test]
    fn test_open_is_idempotent_in_same_mode() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = handle(&dir.path().join("a.csv"), AccessMode::Write);
        h.open(AccessMode::Write).unwrap();
        h.open(AccessMode::Write).unwrap();
        assert!(h.is_open());
    }

    #[test]
    fn test_open_with_other_mode_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        std::fs::write(&path, "gpi,data\n1,2\n").unwrap();

        let mut h = handle(&path, AccessMode::Read);
        h.open(AccessMode::Read).unwrap();
        let err = h.open(AccessMode::Write).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::ModeMismatch {
                current: AccessMode::Read,
                requested: AccessMode::Write,
                ..
            }
        ));
    }

    #[test]
    fn test_read_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = handle(&dir.path().join("missing.csv"), AccessMode::Read);
        assert!(matches!(
            h.open(AccessMode::Read),
            Err(DatasetError::ResourceUnavailable { .. })
        ));
    }

    #[test]
    fn test_write_into_missing_directory_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = handle(&dir.path().join("nope").join("a.csv"), AccessMode::Write);
        assert!(matches!(
            h.open(AccessMode::Write),
            Err(DatasetError::ResourceUnavailable { .. })
        ));
    }

    #[test]
    fn test_operations_before_open_and_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = handle(&dir.path().join("a.csv"), AccessMode::Write);
        assert!(matches!(h.flush(), Err(DatasetError::NotOpen(_))));
        assert!(matches!(h.stage(table(1), "gpi"), Err(DatasetError::NotOpen(_))));

        h.open(AccessMode::Write).unwrap();
        h.close().unwrap();
        assert_eq!(h.state(), HandleState::Closed);
        assert!(matches!(h.open(AccessMode::Write), Err(DatasetError::Closed(_))));
        assert!(matches!(h.flush(), Err(DatasetError::Closed(_))));
        // closing twice is harmless
        h.close().unwrap();
    }

    #[test]
    fn test_flush_rejected_on_read_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        std::fs::write(&path, "gpi,data\n1,2\n").unwrap();
        let mut h = handle(&path, AccessMode::Read);
        h.open(AccessMode::Read).unwrap();
        assert!(matches!(h.flush(), Err(DatasetError::ModeMismatch { .. })));
    }

    #[test]
    fn test_write_mode_truncates_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        std::fs::write(&path, "gpi,data\n1,2\n").unwrap();

        let mut h = handle(&path, AccessMode::Write);
        h.open(AccessMode::Write).unwrap();
        h.close().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_resident_data_loaded_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        std::fs::write(&path, "gpi,data\n1,2\n").unwrap();

        let mut h = handle(&path, AccessMode::Read);
        h.open(AccessMode::Read).unwrap();
        assert!(h.resident().is_none());
        assert_eq!(h.read_all().unwrap().len(), 1);
        assert!(h.resource.is_none());

        // Changes underneath an open read handle are not observed.
        std::fs::write(&path, "gpi,data\n1,2\n3,4\n").unwrap();
        assert_eq!(h.read_all().unwrap().len(), 1);
    }

    #[test]
    fn test_buffered_writes_reach_disk_on_flush() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        let options = CommitOptions {
            write_through: false,
            ..CommitOptions::default()
        };
        let mut h = DatasetHandle::new(&path, AccessMode::Write, CsvCodec, options);
        h.open(AccessMode::Write).unwrap();
        h.stage(table(2), "gpi").unwrap();
        assert!(h.is_dirty());
        assert!(!path.exists());

        h.flush().unwrap();
        assert!(!h.is_dirty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "gpi,data\n0,100\n1,101\n");
    }

    #[test]
    fn test_drop_commits_pending_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        {
            let options = CommitOptions {
                write_through: false,
                atomic: false,
                sync: false,
            };
            let mut h = DatasetHandle::new(&path, AccessMode::Write, CsvCodec, options);
            h.open(AccessMode::Write).unwrap();
            h.stage(table(1), "gpi").unwrap();
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "gpi,data\n0,100\n");
    }

    #[test]
    fn test_failed_commit_is_not_staged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        let row = |gpi: i64, data: i64| {
            Table::new("gpi", vec![gpi.into()])
                .with_column("data", vec![data.into()])
                .unwrap()
        };

        let mut h = handle(&path, AccessMode::Write);
        h.open(AccessMode::Write).unwrap();
        h.stage(row(0, 100), "gpi").unwrap();

        // target replaced by a directory: the commit cannot land
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        assert!(h.stage(row(1, 999), "gpi").is_err());
        assert!(!h.is_dirty());

        std::fs::remove_dir(&path).unwrap();
        h.stage(row(2, 102), "gpi").unwrap();
        h.close().unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "gpi,data\n0,100\n2,102\n"
        );
    }

    #[test]
    fn test_key_column_clash_rejected_before_staging() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        let options = CommitOptions {
            write_through: false,
            ..CommitOptions::default()
        };
        let mut h = DatasetHandle::new(&path, AccessMode::Write, CsvCodec, options);
        h.open(AccessMode::Write).unwrap();

        let series = Table::new("", vec![0.into()])
            .with_column("gpi", vec![1.into()])
            .unwrap();
        assert!(matches!(
            h.stage(series, "gpi"),
            Err(DatasetError::SchemaMismatch(_))
        ));
        h.close().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
