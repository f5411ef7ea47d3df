//! Savefile - Slot file layout and file replacement

use crate::{Error, Result, SLOT_COUNT, SLOT_FILE_REGEX};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// The primary or backup file of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Primary,
    Backup,
}

/// A recognised file found in a save directory
#[derive(Debug, Clone, Serialize)]
pub struct SlotFile {
    pub slot: usize,
    pub kind: FileKind,
    pub path: PathBuf,
    pub len: u64,
}

/// Directory holding the slot files
#[derive(Debug, Clone)]
pub struct SaveDir {
    pub root: PathBuf,
}

impl SaveDir {
    /// Create a new SaveDir
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Check that a slot index is addressable
    pub fn check_slot(index: usize) -> Result<()> {
        if index < SLOT_COUNT {
            Ok(())
        } else {
            Err(Error::InvalidSlot(index))
        }
    }

    /// Path of the slot's save file
    pub fn filename(&self, index: usize) -> PathBuf {
        self.root.join(format!("slider{}.cat", index))
    }

    /// Path of the slot's backup file
    pub fn backup_filename(&self, index: usize) -> PathBuf {
        self.root.join(format!("slider{}-backup.cat", index))
    }

    pub fn path(&self, index: usize, kind: FileKind) -> PathBuf {
        match kind {
            FileKind::Primary => self.filename(index),
            FileKind::Backup => self.backup_filename(index),
        }
    }

    /// Check if the save file exists
    pub fn exists(&self, index: usize) -> bool {
        self.filename(index).exists()
    }

    /// Read a file, treating a missing file as `None`
    pub fn read(&self, index: usize, kind: FileKind) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.path(index, kind)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Replace a file's contents
    ///
    /// The bytes go to a sibling `.tmp` file first and are renamed over the
    /// target, so readers see either the old or the new contents.
    pub fn write(&self, index: usize, kind: FileKind, bytes: &[u8]) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.root)?;

        let path = self.path(index, kind);
        let tmp = path.with_extension("cat.tmp");
        let result = (|| {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
            fs::rename(&tmp, &path)
        })();

        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result.map(|_| path)
    }

    /// Delete the save file
    pub fn delete(&self, index: usize) -> io::Result<bool> {
        let path = self.filename(index);
        if Path::new(&path).exists() {
            fs::remove_file(path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// List recognised slot and backup files, ordered by slot then kind
    pub fn scan(&self) -> io::Result<Vec<SlotFile>> {
        let mut files = Vec::new();
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(e),
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(captures) = SLOT_FILE_REGEX.captures(file_name) else {
                continue;
            };
            let Ok(slot) = captures[1].parse::<usize>() else {
                continue;
            };
            if slot >= SLOT_COUNT {
                continue;
            }
            let kind = if captures.get(2).is_some() {
                FileKind::Backup
            } else {
                FileKind::Primary
            };
            let len = entry.metadata().map(|m| m.len()).unwrap_or(0);
            files.push(SlotFile {
                slot,
                kind,
                path,
                len,
            });
        }

        files.sort_by_key(|f| (f.slot, f.kind == FileKind::Backup));
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn paths_follow_slot_layout() {
        let dir = SaveDir::new("/data");
        assert_eq!(dir.filename(0), PathBuf::from("/data/slider0.cat"));
        assert_eq!(dir.backup_filename(2), PathBuf::from("/data/slider2-backup.cat"));
    }

    #[test]
    fn check_slot_rejects_out_of_range() {
        assert!(SaveDir::check_slot(2).is_ok());
        assert!(matches!(SaveDir::check_slot(3), Err(Error::InvalidSlot(3))));
    }

    #[test]
    fn write_replaces_and_leaves_no_temp_file() {
        let tmp = TempDir::new().unwrap();
        let dir = SaveDir::new(tmp.path().join("saves"));

        dir.write(1, FileKind::Primary, b"first").unwrap();
        dir.write(1, FileKind::Primary, b"second").unwrap();

        assert_eq!(dir.read(1, FileKind::Primary).unwrap().unwrap(), b"second");
        assert!(!dir.root.join("slider1.cat.tmp").exists());
        assert_eq!(dir.read(0, FileKind::Primary).unwrap(), None);
    }

    #[test]
    fn delete_is_ok_when_missing() {
        let tmp = TempDir::new().unwrap();
        let dir = SaveDir::new(tmp.path());
        assert!(!dir.delete(0).unwrap());
        dir.write(0, FileKind::Primary, b"x").unwrap();
        assert!(dir.delete(0).unwrap());
        assert!(!dir.exists(0));
    }

    #[test]
    fn scan_finds_slot_files_only() {
        let tmp = TempDir::new().unwrap();
        let dir = SaveDir::new(tmp.path());
        dir.write(2, FileKind::Backup, b"b").unwrap();
        dir.write(0, FileKind::Primary, b"a").unwrap();
        dir.write(2, FileKind::Primary, b"c").unwrap();
        fs::write(tmp.path().join("slider7.cat"), b"out of range").unwrap();
        fs::write(tmp.path().join("notes.txt"), b"ignored").unwrap();

        let found: Vec<(usize, FileKind)> =
            dir.scan().unwrap().iter().map(|f| (f.slot, f.kind)).collect();
        assert_eq!(
            found,
            vec![
                (0, FileKind::Primary),
                (2, FileKind::Primary),
                (2, FileKind::Backup)
            ]
        );
    }

    #[test]
    fn scan_of_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        let dir = SaveDir::new(tmp.path().join("nope"));
        assert!(dir.scan().unwrap().is_empty());
    }
}
