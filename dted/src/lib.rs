//! DTED (Digital Terrain Elevation Data) naming conventions.
//!
//! DTED distributions arrange tiles on disk as one directory per degree
//! of longitude (`w115`, `e010`), each containing one file per degree
//! of latitude (`n32.dt2`, `s05.dt1.zip`). Everything this crate knows
//! is derived from those names; it never opens the files themselves.
//!
//! # References
//!
//! 1. [MIL-PRF-89020B, DTED performance specification](https://earth-info.nga.mil/)

mod error;

pub use crate::error::DtedError;

/// DTED resolution level, lowest (0) to highest (3) precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Zero,
    One,
    Two,
    Three,
}

impl Level {
    /// Returns this level's bit contribution to a coverage mask.
    ///
    /// Level 0 contributes no bit. Level-0-only coverage is therefore
    /// indistinguishable from absence of data once folded into a mask;
    /// the index format reserves only three bits per cell.
    pub fn mask(self) -> u8 {
        match self {
            Self::Zero => 0,
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 4,
        }
    }

    /// Extracts the resolution level from a tile file name.
    ///
    /// Matches the `dt0`..`dt3` token anywhere in the lower-cased name,
    /// highest level first, so archive suffixes (`n32.dt2.zip`) resolve
    /// the same as bare files.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        if name.contains("dt3") {
            Some(Self::Three)
        } else if name.contains("dt2") {
            Some(Self::Two)
        } else if name.contains("dt1") {
            Some(Self::One)
        } else if name.contains("dt0") {
            Some(Self::Zero)
        } else {
            None
        }
    }
}

/// How a tile is stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileKind {
    /// Bare elevation file (`.dt0`..`.dt3`).
    Raw,
    /// Single-member archive of an elevation file (`.dt0.zip`..`.dt3.zip`).
    Archived,
}

const RAW_SUFFIXES: [&str; 4] = [".dt0", ".dt1", ".dt2", ".dt3"];
const ARCHIVED_SUFFIXES: [&str; 4] = [".dt0.zip", ".dt1.zip", ".dt2.zip", ".dt3.zip"];

impl TileKind {
    /// Classifies a tile file name by suffix, case-insensitively.
    /// Returns `None` for anything that is not a DTED tile.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        if ARCHIVED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
            Some(Self::Archived)
        } else if RAW_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
            Some(Self::Raw)
        } else {
            None
        }
    }
}

/// A tile file name decomposed into its geographic parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Signed integer degree of latitude, south negative.
    pub latitude: i32,
    /// Resolution level encoded in the name.
    pub level: Level,
    /// Bare elevation file or pre-built archive.
    pub kind: TileKind,
}

impl Tile {
    /// Parses a tile file name such as `n32.dt2` or `S05.DT1.zip`.
    pub fn from_name(name: &str) -> Result<Self, DtedError> {
        let kind =
            TileKind::from_name(name).ok_or_else(|| DtedError::TileSuffix(name.to_owned()))?;
        let level =
            Level::from_name(name).ok_or_else(|| DtedError::TileName(name.to_owned()))?;
        let latitude = parse_latitude(name)?;
        Ok(Self {
            latitude,
            level,
            kind,
        })
    }
}

/// Returns the signed longitude degree encoded in a band directory name
/// such as `w115` or `E010`.
///
/// The hemisphere letter must lead the name; every other non-digit
/// character is stripped before the numeric parse, and `w` negates.
pub fn parse_band(name: &str) -> Result<i32, DtedError> {
    let lower = name.to_lowercase();
    let sign = match lower.bytes().next() {
        Some(b'w') => -1,
        Some(b'e') => 1,
        _ => return Err(DtedError::BandName(name.to_owned())),
    };
    let value = parse_digits(&lower).ok_or_else(|| DtedError::BandName(name.to_owned()))?;
    Ok(sign * value)
}

/// Returns the signed latitude degree encoded in a tile file name.
///
/// Digits are taken from the base name (the text before the first
/// `.`); a leading `s` negates. A name with neither `n` nor `s`
/// parses non-negative, as legacy distributions relied on.
pub fn parse_latitude(name: &str) -> Result<i32, DtedError> {
    let base = match name.find('.') {
        Some(dot) => &name[..dot],
        None => name,
    };
    let lower = base.to_lowercase();
    let value = parse_digits(&lower).ok_or_else(|| DtedError::TileName(name.to_owned()))?;
    if lower.starts_with('s') {
        Ok(-value)
    } else {
        Ok(value)
    }
}

/// Parses the concatenation of all decimal digits in `name`, if any.
fn parse_digits(name: &str) -> Option<i32> {
    let digits: String = name.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<i32>().ok()
}
