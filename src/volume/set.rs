//! Volume Set
//!
//! Per-unit collection of backing volumes, addressed by volume index.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Result, StoreError};

use super::OpenMode;

/// One backing file of a unit
#[derive(Debug)]
pub struct Volume {
    /// Where the volume lives on disk
    path: PathBuf,

    /// Open handle, `None` once released
    file: Option<File>,
}

impl Volume {
    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the handle is still held
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }
}

/// The volumes of one unit, in index order
///
/// `open` pushes volumes one by one; if it fails part way, the volumes
/// opened so far stay open and the caller is expected to `close`.
#[derive(Debug)]
pub struct VolumeSet {
    /// Open volumes; index = volume index
    volumes: Vec<Volume>,

    /// Upper bound on `volumes.len()`
    max_volumes: u32,
}

impl VolumeSet {
    /// Create an empty (closed) volume set
    pub fn new(max_volumes: u32) -> Self {
        Self {
            volumes: Vec::new(),
            max_volumes,
        }
    }

    /// Open every backing file in `paths`, in order
    ///
    /// Fails with a configuration error for a bad volume count, an empty or
    /// duplicated path, or a path naming a directory. Fails with an I/O
    /// error if a file cannot be opened.
    pub fn open(&mut self, paths: &[PathBuf], mode: OpenMode) -> Result<()> {
        if !self.volumes.is_empty() {
            return Err(StoreError::Config(
                "volume set is already open".to_string(),
            ));
        }
        if paths.is_empty() || paths.len() > self.max_volumes as usize {
            return Err(StoreError::Config(format!(
                "volume count must be between 1 and {}, got {}",
                self.max_volumes,
                paths.len()
            )));
        }

        let mut seen = HashSet::new();
        for path in paths {
            if path.as_os_str().is_empty() {
                return Err(StoreError::Config("empty volume path".to_string()));
            }
            if path.is_dir() {
                return Err(StoreError::Config(format!(
                    "volume path {} is a directory",
                    path.display()
                )));
            }
            if !seen.insert(path) {
                return Err(StoreError::Config(format!(
                    "volume path {} listed twice",
                    path.display()
                )));
            }
        }

        for path in paths {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(mode == OpenMode::New)
                .open(path)?;

            debug!(volume = self.volumes.len(), path = %path.display(), ?mode, "opened volume");

            self.volumes.push(Volume {
                path: path.clone(),
                file: Some(file),
            });
        }

        Ok(())
    }

    /// Flush and release every handle
    ///
    /// Closing an already-closed set is a no-op. Every handle is released
    /// even if syncing one of them fails; the first failure is returned.
    pub fn close(&mut self) -> Result<()> {
        let mut first_error = None;

        for (index, volume) in self.volumes.iter_mut().enumerate() {
            if let Some(file) = volume.file.take() {
                if let Err(e) = file.sync_all() {
                    warn!(volume = index, path = %volume.path.display(), error = %e, "volume sync failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        self.volumes.clear();

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Read exactly `buf.len()` bytes from `volume` at `offset`
    pub fn read_at(&mut self, volume: u32, offset: u64, buf: &mut [u8]) -> Result<()> {
        let file = self.file_mut(volume)?;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        Ok(())
    }

    /// Write all of `buf` to `volume` at `offset`
    pub fn write_at(&mut self, volume: u32, offset: u64, buf: &[u8]) -> Result<()> {
        let file = self.file_mut(volume)?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)?;
        Ok(())
    }

    /// Current length of a volume's backing file
    pub fn volume_len(&self, volume: u32) -> Result<u64> {
        let file = self
            .volumes
            .get(volume as usize)
            .and_then(|v| v.file.as_ref())
            .ok_or(StoreError::VolumeNotOpen { volume })?;
        Ok(file.metadata()?.len())
    }

    /// Number of open volumes
    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    /// Whether at least one volume is held
    pub fn is_open(&self) -> bool {
        self.volumes.iter().any(Volume::is_open)
    }

    /// The volumes, in index order
    pub fn volumes(&self) -> &[Volume] {
        &self.volumes
    }

    /// Paths of the volumes, in index order
    pub fn paths(&self) -> Vec<PathBuf> {
        self.volumes.iter().map(|v| v.path.clone()).collect()
    }

    /// Delete backing files; missing files are ignored
    pub fn remove_files(paths: &[PathBuf]) -> Result<()> {
        for path in paths {
            match fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "removed volume"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn file_mut(&mut self, volume: u32) -> Result<&mut File> {
        self.volumes
            .get_mut(volume as usize)
            .and_then(|v| v.file.as_mut())
            .ok_or(StoreError::VolumeNotOpen { volume })
    }
}

impl Drop for VolumeSet {
    fn drop(&mut self) {
        if self.is_open() {
            let _ = self.close();
        }
    }
}
