//! Profile - One player's complete save state

use crate::store::ValueStore;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Areas of the game world; the name doubles as the scene to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Area {
    None,
    #[default]
    Village,
    Caves,
    Ocean,
    Jungle,
    Desert,
    Factory,
    Mountain,
    Military,
    MagiTech,
}

impl Area {
    pub const ALL: [Area; 10] = [
        Area::None,
        Area::Village,
        Area::Caves,
        Area::Ocean,
        Area::Jungle,
        Area::Desert,
        Area::Factory,
        Area::Mountain,
        Area::Military,
        Area::MagiTech,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Area::None => "None",
            Area::Village => "Village",
            Area::Caves => "Caves",
            Area::Ocean => "Ocean",
            Area::Jungle => "Jungle",
            Area::Desert => "Desert",
            Area::Factory => "Factory",
            Area::Mountain => "Mountain",
            Area::Military => "Military",
            Area::MagiTech => "MagiTech",
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Area {
    type Err = String;

    /// Parse an area by name, ignoring case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Area::ALL
            .iter()
            .find(|area| area.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| format!("unknown area '{}'", s))
    }
}

/// A player's save state: typed values plus metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub store: ValueStore,
    pub last_saved: DateTime<Utc>,
    pub last_area: Area,
}

impl Profile {
    /// Create a new, never-saved profile
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            store: ValueStore::new(),
            last_saved: DateTime::<Utc>::default(),
            last_area: Area::default(),
        }
    }

    /// Stamp the profile as saved now
    ///
    /// Truncated to milliseconds, the precision the codec records. Stamps
    /// move forward, so two saves within the same millisecond still get
    /// distinct stamps. A previous stamp at the end of chrono's range can't
    /// be advanced; the clock is used as-is then.
    pub fn stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let now = DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now);
        let next = self
            .last_saved
            .checked_add_signed(Duration::milliseconds(1))
            .unwrap_or(now);
        self.last_saved = now.max(next);
        self.last_saved
    }

    /// Check if the profile has ever been saved
    pub fn has_been_saved(&self) -> bool {
        self.last_saved != DateTime::<Utc>::default()
    }

    pub fn get_last_saved(&self) -> DateTime<Utc> {
        self.last_saved
    }

    pub fn get_last_area(&self) -> Area {
        self.last_area
    }

    pub fn set_last_area(&mut self, area: Area) {
        self.last_area = area;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_profile_is_unsaved_in_village() {
        let profile = Profile::new("Boomo");
        assert_eq!(profile.name, "Boomo");
        assert!(!profile.has_been_saved());
        assert_eq!(profile.get_last_area(), Area::Village);
        assert!(profile.store.is_empty());
    }

    #[test]
    fn stamp_uses_millisecond_precision() {
        let mut profile = Profile::new("Boomo");
        let stamped = profile.stamp();
        assert!(profile.has_been_saved());
        assert_eq!(stamped.timestamp_subsec_nanos() % 1_000_000, 0);
        assert_eq!(profile.get_last_saved(), stamped);
    }

    #[test]
    fn stamps_are_strictly_increasing() {
        let mut profile = Profile::new("Boomo");
        let first = profile.stamp();
        let second = profile.stamp();
        assert!(second > first);
    }

    #[test]
    fn stamp_after_maximum_time_uses_clock() {
        let max = DateTime::<Utc>::MAX_UTC;
        let mut profile = Profile::new("Boomo");
        profile.last_saved = DateTime::from_timestamp_millis(max.timestamp_millis()).unwrap();

        let stamped = profile.stamp();
        assert!(stamped < max);
        assert!(stamped <= Utc::now());
        assert!(profile.has_been_saved());
    }

    #[test]
    fn area_parses_by_name() {
        assert_eq!("caves".parse::<Area>(), Ok(Area::Caves));
        assert_eq!("MagiTech".parse::<Area>(), Ok(Area::MagiTech));
        assert!("Space".parse::<Area>().is_err());
        for area in Area::ALL {
            assert_eq!(area.to_string().parse::<Area>(), Ok(area));
        }
    }
}
