//! Manager - Owns the profile slots and the current profile

use crate::{
    codec,
    profile::{Area, Profile},
    remap::SchemaRemap,
    savefile::{FileKind, SaveDir},
    Error, Result, DEFAULT_PROFILE_NAME, SLOT_COUNT,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Where saves live and how old saves are read
#[derive(Debug, Clone)]
pub struct SaveConfig {
    pub save_dir: PathBuf,
    pub remap: SchemaRemap,
}

impl SaveConfig {
    /// Create a config using the standard remap table
    pub fn new(save_dir: impl Into<PathBuf>) -> Self {
        Self {
            save_dir: save_dir.into(),
            remap: SchemaRemap::standard(),
        }
    }

    /// Create a config from the environment
    pub fn from_env() -> Self {
        Self::new(crate::save_dir())
    }

    /// Add entries to the remap table
    pub fn with_remap(mut self, extra: SchemaRemap) -> Self {
        self.remap.merge(extra);
        self
    }
}

/// Lifecycle of a slot's in-memory profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotState {
    /// No profile
    #[default]
    Empty,
    /// Read from disk and unchanged since
    Loaded,
    /// Changed since it was last read or written
    Dirty,
    /// Written to disk and unchanged since
    Saved,
}

impl std::fmt::Display for SlotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            SlotState::Empty => "empty",
            SlotState::Loaded => "loaded",
            SlotState::Dirty => "dirty",
            SlotState::Saved => "saved",
        })
    }
}

#[derive(Debug, Default)]
struct Slot {
    profile: Option<Profile>,
    state: SlotState,
    /// The profile was read from or written to the slot file
    persisted: bool,
}

impl Slot {
    /// A profile that came from disk
    fn loaded(profile: Profile) -> Self {
        Self {
            profile: Some(profile),
            state: SlotState::Loaded,
            persisted: true,
        }
    }

    /// A profile that exists only in memory until its first save
    fn unsaved(profile: Profile) -> Self {
        Self {
            profile: Some(profile),
            state: SlotState::Dirty,
            persisted: false,
        }
    }

    /// The profile, if it has ever been on disk
    fn persisted_profile(&self) -> Option<&Profile> {
        self.profile.as_ref().filter(|_| self.persisted)
    }

    /// Borrow the profile for modification, marking the slot dirty
    fn edit(&mut self) -> &mut Profile {
        self.state = SlotState::Dirty;
        self.profile
            .get_or_insert_with(|| Profile::new(DEFAULT_PROFILE_NAME))
    }
}

/// The profile consumers read and write
#[derive(Debug, Clone, PartialEq)]
pub enum CurrentProfile {
    /// A slot's profile; saves go to that slot's file
    Bound(usize),
    /// A stand-in created because nothing was bound; never saved
    Transient(Profile),
}

/// Outcome of loading one slot
#[derive(Debug)]
pub enum SlotLoad {
    Missing,
    Loaded,
    Failed(Error),
}

/// Per-slot outcomes of [`ProfileManager::load_all`]
#[derive(Debug, Default)]
pub struct LoadReport {
    pub slots: Vec<SlotLoad>,
}

impl LoadReport {
    /// Indices that loaded successfully
    pub fn loaded(&self) -> Vec<usize> {
        self.indices(|s| matches!(s, SlotLoad::Loaded))
    }

    /// Indices whose file existed but could not be loaded
    pub fn failed(&self) -> Vec<usize> {
        self.indices(|s| matches!(s, SlotLoad::Failed(_)))
    }

    fn indices(&self, pred: impl Fn(&SlotLoad) -> bool) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| pred(s))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Per-slot outcomes of [`ProfileManager::backup_all`]
#[derive(Debug, Default, Clone, Serialize)]
pub struct BackupReport {
    pub written: Vec<usize>,
    pub skipped: Vec<usize>,
    pub failed: Vec<(usize, String)>,
}

/// Owns every profile slot and tracks which one is current
///
/// The in-memory profiles are authoritative while the manager is alive;
/// files are only read by [`load_all`](Self::load_all) and
/// [`restore_backup`](Self::restore_backup), and only written by
/// [`save`](Self::save) and [`backup_all`](Self::backup_all).
#[derive(Debug)]
pub struct ProfileManager {
    dir: SaveDir,
    remap: SchemaRemap,
    slots: [Slot; SLOT_COUNT],
    current: Option<CurrentProfile>,
}

impl ProfileManager {
    /// Create a manager with every slot empty
    pub fn new(config: SaveConfig) -> Self {
        Self {
            dir: SaveDir::new(config.save_dir),
            remap: config.remap,
            slots: Default::default(),
            current: None,
        }
    }

    /// Create a manager and load every slot
    pub fn open(config: SaveConfig) -> Self {
        let mut manager = Self::new(config);
        manager.load_all();
        manager
    }

    pub fn save_dir(&self) -> &SaveDir {
        &self.dir
    }

    pub fn remap(&self) -> &SchemaRemap {
        &self.remap
    }

    /// Load every slot from disk
    ///
    /// A slot whose file can't be read or decoded is left empty; the
    /// failure is logged and reported without affecting the other slots.
    pub fn load_all(&mut self) -> LoadReport {
        let mut report = LoadReport::default();

        for index in 0..SLOT_COUNT {
            let outcome = match self.load_slot(index) {
                Ok(Some(profile)) => {
                    tracing::debug!(slot = index, name = %profile.name, "Loaded profile");
                    self.slots[index] = Slot::loaded(profile);
                    SlotLoad::Loaded
                }
                Ok(None) => {
                    self.slots[index] = Slot::default();
                    SlotLoad::Missing
                }
                Err(e) => {
                    tracing::error!(slot = index, error = %e, "Failed to load profile");
                    self.slots[index] = Slot::default();
                    SlotLoad::Failed(e)
                }
            };
            report.slots.push(outcome);
        }

        if let Some(CurrentProfile::Bound(index)) = self.current {
            if self.slots[index].profile.is_none() {
                self.current = None;
            }
        }

        report
    }

    fn load_slot(&self, index: usize) -> Result<Option<Profile>> {
        match self.dir.read(index, FileKind::Primary)? {
            Some(bytes) => Ok(Some(codec::decode(&bytes, &self.remap)?)),
            None => Ok(None),
        }
    }

    /// Get the profile in a slot
    pub fn get_profile(&self, index: usize) -> Option<&Profile> {
        self.slots.get(index).and_then(|s| s.profile.as_ref())
    }

    /// Get a slot's state
    pub fn slot_state(&self, index: usize) -> Option<SlotState> {
        self.slots.get(index).map(|s| s.state)
    }

    /// Iterate over every slot's state and profile
    pub fn slots(&self) -> impl Iterator<Item = (usize, SlotState, Option<&Profile>)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, s)| (i, s.state, s.profile.as_ref()))
    }

    /// Check if any slot holds a profile that has been on disk
    pub fn any_profiles_loaded(&self) -> bool {
        self.slots.iter().any(|s| s.persisted_profile().is_some())
    }

    /// Index of the persisted slot saved most recently
    ///
    /// Ties go to the lower index. Profiles that were never saved don't count.
    pub fn most_recently_played(&self) -> Option<usize> {
        let mut best: Option<(usize, DateTime<Utc>)> = None;
        for (index, slot) in self.slots.iter().enumerate() {
            if let Some(profile) = slot.persisted_profile() {
                if best.map_or(true, |(_, latest)| profile.last_saved > latest) {
                    best = Some((index, profile.last_saved));
                }
            }
        }
        best.map(|(index, _)| index)
    }

    /// Bind a slot as the current profile
    ///
    /// An empty slot gets a fresh default profile, which is neither written
    /// nor backed up until the next save. Any transient profile is discarded.
    pub fn set_current(&mut self, index: usize) -> Result<()> {
        SaveDir::check_slot(index)?;
        tracing::info!(slot = index, "Setting current profile");

        let slot = &mut self.slots[index];
        if slot.profile.is_none() {
            *slot = Slot::unsaved(Profile::new(DEFAULT_PROFILE_NAME));
        }

        if let Some(CurrentProfile::Transient(_)) = self.current {
            tracing::debug!("Discarding transient profile");
        }
        self.current = Some(CurrentProfile::Bound(index));
        Ok(())
    }

    /// Create a named profile in a slot and bind it
    ///
    /// Replaces anything in the slot's memory; the file is untouched until
    /// the next save.
    pub fn new_profile(&mut self, index: usize, name: &str) -> Result<()> {
        SaveDir::check_slot(index)?;
        tracing::info!(slot = index, name, "Creating new profile");
        self.slots[index] = Slot::unsaved(Profile::new(name));
        self.current = Some(CurrentProfile::Bound(index));
        Ok(())
    }

    /// Bind a slot and return the area its player was last in
    pub fn load_profile(&mut self, index: usize) -> Result<Area> {
        SaveDir::check_slot(index)?;
        if self.slots[index].profile.is_none() {
            tracing::error!(slot = index, "Loading an empty slot; creating a new profile");
        }
        self.set_current(index)?;
        Ok(self.current().get_last_area())
    }

    /// How the current profile is bound, if anything has been bound yet
    pub fn binding(&self) -> Option<&CurrentProfile> {
        self.current.as_ref()
    }

    /// Index of the bound slot
    pub fn current_index(&self) -> Option<usize> {
        match self.current {
            Some(CurrentProfile::Bound(index)) => Some(index),
            _ => None,
        }
    }

    /// Check if the current profile is a never-saved stand-in
    pub fn is_transient(&self) -> bool {
        matches!(self.current, Some(CurrentProfile::Transient(_)))
    }

    fn transient() -> CurrentProfile {
        tracing::warn!("No profile bound; creating a transient default profile");
        CurrentProfile::Transient(Profile::new(DEFAULT_PROFILE_NAME))
    }

    /// The current profile
    ///
    /// If no slot has been bound, a transient default profile is created so
    /// that reads always succeed.
    pub fn current(&mut self) -> &Profile {
        let slots = &mut self.slots;
        match self.current.get_or_insert_with(Self::transient) {
            CurrentProfile::Transient(profile) => profile,
            CurrentProfile::Bound(index) => slots[*index]
                .profile
                .get_or_insert_with(|| Profile::new(DEFAULT_PROFILE_NAME)),
        }
    }

    /// The current profile, for modification
    pub fn current_mut(&mut self) -> &mut Profile {
        let slots = &mut self.slots;
        match self.current.get_or_insert_with(Self::transient) {
            CurrentProfile::Transient(profile) => profile,
            CurrentProfile::Bound(index) => slots[*index].edit(),
        }
    }

    /// Save the current profile to its slot's file
    ///
    /// Returns `Ok(false)` without touching the disk when no slot is bound.
    /// On failure the profile keeps its previous stamp and stays dirty.
    pub fn save(&mut self, reason: &str) -> Result<bool> {
        let index = match self.current {
            Some(CurrentProfile::Bound(index)) => index,
            _ => {
                tracing::debug!(reason, "No slot bound; not saving");
                return Ok(false);
            }
        };

        if !reason.is_empty() {
            tracing::info!(slot = index, reason, "Saving game");
        }

        let slot = &mut self.slots[index];
        let profile = slot
            .profile
            .get_or_insert_with(|| Profile::new(DEFAULT_PROFILE_NAME));
        let previous = profile.last_saved;
        profile.stamp();
        let bytes = codec::encode(profile);

        match self.dir.write(index, FileKind::Primary, &bytes) {
            Ok(path) => {
                tracing::debug!(slot = index, path = %path.display(), bytes = bytes.len(), "Saved");
                slot.state = SlotState::Saved;
                slot.persisted = true;
                Ok(true)
            }
            Err(e) => {
                tracing::error!(slot = index, error = %e, "Save failed");
                profile.last_saved = previous;
                slot.state = SlotState::Dirty;
                Err(e.into())
            }
        }
    }

    /// Refresh the backup file of every persisted slot
    ///
    /// A backup whose recorded save time matches the in-memory profile is
    /// assumed current and left alone. A profile that has never been on disk
    /// is not backed up, so it can't replace the last good copy of its slot.
    /// Failures are logged and reported per slot.
    pub fn backup_all(&self) -> BackupReport {
        tracing::info!("Creating backups of save profiles");
        let mut report = BackupReport::default();

        for (index, slot) in self.slots.iter().enumerate() {
            let Some(profile) = slot.persisted_profile() else {
                continue;
            };

            match self.dir.read(index, FileKind::Backup) {
                Ok(Some(bytes)) => match codec::peek_last_saved(&bytes) {
                    Ok(stamp) if stamp == profile.last_saved => {
                        report.skipped.push(index);
                        continue;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(slot = index, error = %e, "Existing backup unreadable")
                    }
                },
                Ok(None) => {}
                Err(e) => tracing::warn!(slot = index, error = %e, "Existing backup unreadable"),
            }

            tracing::info!(slot = index, "Saving backup");
            match self
                .dir
                .write(index, FileKind::Backup, &codec::encode(profile))
            {
                Ok(_) => report.written.push(index),
                Err(e) => {
                    tracing::error!(slot = index, error = %e, "Error when saving backup");
                    report.failed.push((index, e.to_string()));
                }
            }
        }

        report
    }

    /// Replace a slot with its backup, in memory and on disk
    pub fn restore_backup(&mut self, index: usize) -> Result<()> {
        SaveDir::check_slot(index)?;

        let bytes = self
            .dir
            .read(index, FileKind::Backup)?
            .ok_or(Error::BackupNotFound(index))?;
        let profile = codec::decode(&bytes, &self.remap)?;

        self.dir
            .write(index, FileKind::Primary, &codec::encode(&profile))?;
        tracing::info!(slot = index, name = %profile.name, "Restored backup");
        self.slots[index] = Slot::loaded(profile);
        Ok(())
    }

    /// Clear a slot and delete its save file; its backup is kept
    pub fn delete(&mut self, index: usize) -> Result<()> {
        SaveDir::check_slot(index)?;
        tracing::info!(slot = index, "Deleting save profile");

        self.slots[index] = Slot::default();
        if self.current_index() == Some(index) {
            self.current = None;
        }
        self.dir.delete(index)?;
        Ok(())
    }
}
