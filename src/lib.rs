//! SliderSave - Save profiles for a slot-based game
//!
//! This library keeps each player's progress in one of a fixed number of
//! profile slots, persists them in a versioned binary format that survives
//! type renames between builds, and maintains backups of every slot.

use lazy_static::lazy_static;
use regex::Regex;
use std::path::PathBuf;

pub mod codec;
pub mod command_result;
pub mod commands;
pub mod formatters;
pub mod manager;
pub mod profile;
pub mod remap;
pub mod savefile;
pub mod session;
pub mod store;

pub use codec::DecodeError;
pub use command_result::CommandResult;
pub use commands::Commands;
pub use formatters::Formatters;
pub use manager::{CurrentProfile, ProfileManager, SaveConfig, SlotState};
pub use profile::{Area, Profile};
pub use remap::{SchemaRemap, TypeTag};
pub use savefile::SaveDir;
pub use session::Session;
pub use store::{LocalizedString, Value, ValueStore};

/// Number of profile slots
pub const SLOT_COUNT: usize = 3;

/// Name given to profiles created without one
pub const DEFAULT_PROFILE_NAME: &str = "Boomo";

/// Default save directory relative to the working directory
pub const SAVE_DIR: &str = "saves";

/// Environment variable overriding the save directory
pub const SAVE_DIR_ENV: &str = "SLIDERSAVE_DIR";

lazy_static! {
    /// Slot save and backup file names
    pub static ref SLOT_FILE_REGEX: Regex =
        Regex::new(r"^slider(\d+)(-backup)?\.cat$").unwrap();
}

/// Get the save directory, honouring `SLIDERSAVE_DIR`
pub fn save_dir() -> PathBuf {
    std::env::var(SAVE_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(SAVE_DIR))
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Invalid slot: {0} (expected 0..{})", SLOT_COUNT)]
    InvalidSlot(usize),

    #[error("No profile in slot {0}")]
    NoProfile(usize),

    #[error("No backup for slot {0}")]
    BackupNotFound(usize),

    #[error("Invalid remap table: {0}")]
    RemapTable(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
