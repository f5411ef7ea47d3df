//! Remap - Schema evolution table for type identifiers in saved data
//!
//! Save files record a `(module, name)` tag for every value they hold.
//! When a build renames a module or a type, entries in this table let the
//! decoder translate the stale tag to the one the running build knows.
//! Encoding never consults the table; it always writes current tags.

use crate::{store::ValueKind, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Module name written by the current build
pub const CURRENT_MODULE: &str = "SliderScripts";

/// Type name of the profile record
pub const PROFILE_TYPE: &str = "SerializableSaveProfile";

lazy_static::lazy_static! {
    /// Evolution table shipped with the game
    static ref STANDARD_REMAP: SchemaRemap = SchemaRemap::new()
        .with_module("Assembly-CSharp", CURRENT_MODULE)
        .with_type(TypeTag::new(CURRENT_MODULE, "SaveProfile"), TypeTag::current(PROFILE_TYPE));
}

/// Identifies a serialized type: the module that defines it and its name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeTag {
    pub module: String,
    pub name: String,
}

impl TypeTag {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }

    /// A tag in the current module
    pub fn current(name: impl Into<String>) -> Self {
        Self::new(CURRENT_MODULE, name)
    }

    /// Tag written for values of the given kind
    pub fn for_kind(kind: ValueKind) -> Self {
        Self::current(match kind {
            ValueKind::Bool => "Boolean",
            ValueKind::Int => "Int32",
            ValueKind::String => "String",
            ValueKind::Localized => "LocalizationPair",
        })
    }

    /// Tag written for the profile record
    pub fn profile() -> Self {
        Self::current(PROFILE_TYPE)
    }

    /// What the running build constructs for this tag, if anything
    pub fn kind(&self) -> Option<TagKind> {
        if self.module != CURRENT_MODULE {
            return None;
        }
        match self.name.as_str() {
            "Boolean" => Some(TagKind::Value(ValueKind::Bool)),
            "Int32" => Some(TagKind::Value(ValueKind::Int)),
            "String" => Some(TagKind::Value(ValueKind::String)),
            "LocalizationPair" => Some(TagKind::Value(ValueKind::Localized)),
            PROFILE_TYPE => Some(TagKind::Profile),
            _ => None,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.module, self.name)
    }
}

/// Constructible targets of a resolved tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Profile,
    Value(ValueKind),
}

/// One type rename
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemapEntry {
    pub old: TypeTag,
    pub new: TypeTag,
}

/// Serialized form of a remap table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RemapDocument {
    #[serde(default)]
    modules: HashMap<String, String>,
    #[serde(default)]
    types: Vec<RemapEntry>,
}

/// Lookup table from stale type tags to current ones
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaRemap {
    modules: HashMap<String, String>,
    types: HashMap<TypeTag, TypeTag>,
}

impl SchemaRemap {
    /// Create an empty table; every tag passes through
    pub fn new() -> Self {
        Self::default()
    }

    /// The table shipped with the game
    pub fn standard() -> Self {
        STANDARD_REMAP.clone()
    }

    /// Load a table from JSON
    ///
    /// ```json
    /// { "modules": { "Assembly-CSharp": "SliderScripts" },
    ///   "types": [ { "old": { "module": "SliderScripts", "name": "LocPair" },
    ///                "new": { "module": "SliderScripts", "name": "LocalizationPair" } } ] }
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: RemapDocument = serde_json::from_str(json).map_err(Error::RemapTable)?;
        let mut remap = Self::new();
        for (old, new) in doc.modules {
            remap.add_module(old, new);
        }
        for entry in doc.types {
            remap.add_type(entry.old, entry.new);
        }
        Ok(remap)
    }

    /// Rename every type in module `old` to module `new`
    pub fn add_module(&mut self, old: impl Into<String>, new: impl Into<String>) {
        self.modules.insert(old.into(), new.into());
    }

    /// Rename a single type
    pub fn add_type(&mut self, old: TypeTag, new: TypeTag) {
        self.types.insert(old, new);
    }

    pub fn with_module(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.add_module(old, new);
        self
    }

    pub fn with_type(mut self, old: TypeTag, new: TypeTag) -> Self {
        self.add_type(old, new);
        self
    }

    /// Add every entry of `other`, replacing ours on conflict
    pub fn merge(&mut self, other: SchemaRemap) {
        self.modules.extend(other.modules);
        self.types.extend(other.types);
    }

    /// Translate a recorded tag to the current one
    ///
    /// The module is renamed first, then an exact type entry is applied to
    /// the result (falling back to the tag as recorded). Tags with no entry
    /// pass through unchanged.
    pub fn resolve(&self, tag: &TypeTag) -> TypeTag {
        let renamed = match self.modules.get(&tag.module) {
            Some(module) => TypeTag::new(module.clone(), tag.name.clone()),
            None => tag.clone(),
        };
        self.types
            .get(&renamed)
            .or_else(|| self.types.get(tag))
            .cloned()
            .unwrap_or(renamed)
    }

    /// All type renames, sorted for display
    pub fn entries(&self) -> Vec<RemapEntry> {
        let mut entries: Vec<RemapEntry> = self
            .types
            .iter()
            .map(|(old, new)| RemapEntry {
                old: old.clone(),
                new: new.clone(),
            })
            .collect();
        entries.sort_by_key(|e| e.old.to_string());
        entries
    }
}
