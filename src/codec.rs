//! Codec - Versioned binary encoding of profiles
//!
//! # Format
//! Big endian throughout; `str` is a `u32` byte length followed by UTF-8.
//! - Magic `SLDR` (4 bytes), format version (u16)
//! - Tag count (u16), then each tag as `str module, str name`
//! - Root tag index (u16), which must resolve to the profile record
//! - Profile name (str), last saved as unix millis (i64), last area (str)
//! - Entry count (u32), then each entry as `str key, u16 tag index, payload`
//!
//! Payloads: `Boolean` u8 (0 or 1), `Int32` i32, `String` str,
//! `LocalizationPair` str original then str translated.

use crate::{
    profile::{Area, Profile},
    remap::{SchemaRemap, TagKind, TypeTag},
    store::{LocalizedString, Value, ValueKind, ValueStore},
};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, Utc};
use std::io::{self, Cursor, Read, Write};

/// File magic
pub const MAGIC: &[u8; 4] = b"SLDR";

/// Current format version
pub const FORMAT_VERSION: u16 = 1;

/// Errors from decoding a save
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("corrupt save data: {reason}")]
    Corrupt { reason: String },

    #[error("schema mismatch: no known type for {module}::{name}")]
    SchemaMismatch { module: String, name: String },
}

impl DecodeError {
    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::Corrupt {
            reason: reason.into(),
        }
    }

    fn mismatch(tag: &TypeTag) -> Self {
        Self::SchemaMismatch {
            module: tag.module.clone(),
            name: tag.name.clone(),
        }
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. })
    }

    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, Self::SchemaMismatch { .. })
    }
}

impl From<io::Error> for DecodeError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::corrupt("unexpected end of input")
        } else {
            Self::corrupt(err.to_string())
        }
    }
}

type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Encode a profile to bytes
///
/// Output is deterministic: the tag table lists the profile record first,
/// then value types in the order they first occur among the sorted keys.
pub fn encode(profile: &Profile) -> Vec<u8> {
    let mut buffer = Vec::new();
    // Writes into a Vec cannot fail
    encode_to(profile, &mut buffer).ok();
    buffer
}

/// Encode a profile into a writer
pub fn encode_to<W: Write>(profile: &Profile, writer: &mut W) -> io::Result<()> {
    let mut kinds: Vec<ValueKind> = Vec::new();
    for (_, value) in profile.store.iter() {
        if !kinds.contains(&value.kind()) {
            kinds.push(value.kind());
        }
    }
    let tag_index = |kind: ValueKind| -> u16 {
        // Index 0 is the profile record
        kinds.iter().position(|k| *k == kind).map_or(0, |i| i as u16 + 1)
    };

    writer.write_all(MAGIC)?;
    writer.write_u16::<BigEndian>(FORMAT_VERSION)?;

    writer.write_u16::<BigEndian>(kinds.len() as u16 + 1)?;
    write_tag(writer, &TypeTag::profile())?;
    for kind in &kinds {
        write_tag(writer, &TypeTag::for_kind(*kind))?;
    }

    writer.write_u16::<BigEndian>(0)?;
    write_str(writer, &profile.name)?;
    writer.write_i64::<BigEndian>(profile.last_saved.timestamp_millis())?;
    write_str(writer, profile.last_area.as_str())?;

    writer.write_u32::<BigEndian>(profile.store.len() as u32)?;
    for (key, value) in profile.store.iter() {
        write_str(writer, key)?;
        writer.write_u16::<BigEndian>(tag_index(value.kind()))?;
        match value {
            Value::Bool(b) => writer.write_u8(u8::from(*b))?,
            Value::Int(n) => writer.write_i32::<BigEndian>(*n)?,
            Value::String(s) => write_str(writer, s)?,
            Value::Localized(l) => {
                write_str(writer, &l.original)?;
                write_str(writer, &l.translated)?;
            }
        }
    }

    Ok(())
}

fn write_tag<W: Write>(writer: &mut W, tag: &TypeTag) -> io::Result<()> {
    write_str(writer, &tag.module)?;
    write_str(writer, &tag.name)
}

fn write_str<W: Write>(writer: &mut W, s: &str) -> io::Result<()> {
    writer.write_u32::<BigEndian>(s.len() as u32)?;
    writer.write_all(s.as_bytes())
}

/// Decode a profile, resolving every recorded type tag through `remap`
///
/// Either the whole profile is reconstructed or an error is returned.
pub fn decode(bytes: &[u8], remap: &SchemaRemap) -> DecodeResult<Profile> {
    let mut decoder = Decoder::new(bytes);
    let header = decoder.read_header()?;

    let resolved: Vec<TypeTag> = header.tags.iter().map(|t| remap.resolve(t)).collect();
    let kind_at = |index: u16| -> DecodeResult<TagKind> {
        let tag = resolved.get(index as usize).ok_or_else(|| {
            DecodeError::corrupt(format!(
                "tag index {} out of range ({} tags)",
                index,
                resolved.len()
            ))
        })?;
        tag.kind().ok_or_else(|| DecodeError::mismatch(tag))
    };

    match kind_at(header.root)? {
        TagKind::Profile => {}
        TagKind::Value(_) => {
            return Err(DecodeError::corrupt("root record is not a profile"));
        }
    }

    let area_name = decoder.read_str()?;
    let last_area = area_name.parse::<Area>().map_err(|_| DecodeError::SchemaMismatch {
        module: crate::remap::CURRENT_MODULE.to_string(),
        name: format!("Area::{}", area_name),
    })?;

    let mut store = ValueStore::new();
    let count = decoder.cursor.read_u32::<BigEndian>()?;
    for _ in 0..count {
        let key = decoder.read_str()?;
        let kind = match kind_at(decoder.cursor.read_u16::<BigEndian>()?)? {
            TagKind::Value(kind) => kind,
            TagKind::Profile => {
                return Err(DecodeError::corrupt(format!(
                    "entry '{}' is tagged as a profile",
                    key
                )));
            }
        };
        let value = decoder.read_value(kind)?;
        if store.contains(&key) {
            return Err(DecodeError::corrupt(format!("duplicate key '{}'", key)));
        }
        store.insert(key, value);
    }

    decoder.finish()?;

    Ok(Profile {
        name: header.name,
        store,
        last_saved: header.last_saved,
        last_area,
    })
}

/// Read only the `last_saved` stamp from an encoded profile
pub fn peek_last_saved(bytes: &[u8]) -> DecodeResult<DateTime<Utc>> {
    Decoder::new(bytes).read_header().map(|h| h.last_saved)
}

struct Header {
    tags: Vec<TypeTag>,
    root: u16,
    name: String,
    last_saved: DateTime<Utc>,
}

struct Decoder<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> Decoder<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(bytes),
        }
    }

    fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len() as u64;
        len.saturating_sub(self.cursor.position()) as usize
    }

    fn read_header(&mut self) -> DecodeResult<Header> {
        let mut magic = [0u8; 4];
        self.cursor.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(DecodeError::corrupt("bad magic"));
        }

        let version = self.cursor.read_u16::<BigEndian>()?;
        if version != FORMAT_VERSION {
            return Err(DecodeError::corrupt(format!(
                "unsupported format version {} (expected {})",
                version, FORMAT_VERSION
            )));
        }

        let tag_count = self.cursor.read_u16::<BigEndian>()?;
        let mut tags = Vec::with_capacity(tag_count as usize);
        for _ in 0..tag_count {
            let module = self.read_str()?;
            let name = self.read_str()?;
            tags.push(TypeTag::new(module, name));
        }

        let root = self.cursor.read_u16::<BigEndian>()?;
        let name = self.read_str()?;
        let millis = self.cursor.read_i64::<BigEndian>()?;
        let last_saved = DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| DecodeError::corrupt(format!("timestamp {} out of range", millis)))?;

        Ok(Header {
            tags,
            root,
            name,
            last_saved,
        })
    }

    fn read_str(&mut self) -> DecodeResult<String> {
        let len = self.cursor.read_u32::<BigEndian>()? as usize;
        if len > self.remaining() {
            return Err(DecodeError::corrupt(format!(
                "string of {} bytes exceeds remaining {}",
                len,
                self.remaining()
            )));
        }
        let mut buf = vec![0u8; len];
        self.cursor.read_exact(&mut buf)?;
        String::from_utf8(buf).map_err(|_| DecodeError::corrupt("invalid UTF-8 string"))
    }

    fn read_value(&mut self, kind: ValueKind) -> DecodeResult<Value> {
        Ok(match kind {
            ValueKind::Bool => match self.cursor.read_u8()? {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                other => {
                    return Err(DecodeError::corrupt(format!("invalid bool byte {}", other)));
                }
            },
            ValueKind::Int => Value::Int(self.cursor.read_i32::<BigEndian>()?),
            ValueKind::String => Value::String(self.read_str()?),
            ValueKind::Localized => {
                let original = self.read_str()?;
                let translated = self.read_str()?;
                Value::Localized(LocalizedString {
                    original,
                    translated,
                })
            }
        })
    }

    fn finish(&self) -> DecodeResult<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(DecodeError::corrupt(format!("{} trailing bytes", n))),
        }
    }
}
