//! Versioned coverage index files.
//!
//! Layout: line 1 is the format version, line 2 the creation time in
//! milliseconds since the Unix epoch (both ASCII decimal), followed by
//! one line per longitude row of the grid holding 180 digits `0`..`7`,
//! one per latitude cell. The deliverable form is a single-member zip
//! archive of that text file.

use crate::{
    grid::{CoverageGrid, GRID_COLS, GRID_ROWS},
    CoverageError,
};
use log::warn;
use std::{
    ffi::OsStr,
    fs::{self, File},
    io::{self, BufRead, BufReader, BufWriter, Lines, Write},
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

/// A fully parsed index file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    pub version: u32,
    /// Creation time, milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub grid: CoverageGrid,
}

/// Writes `grid` to `path`, stamped with `version` and the current
/// wall-clock time. Overwrites any existing file at `path`.
pub fn write(path: &Path, version: u32, grid: &CoverageGrid) -> Result<(), CoverageError> {
    let mut wtr = BufWriter::new(File::create(path)?);
    writeln!(wtr, "{version}")?;
    writeln!(wtr, "{}", epoch_millis()?)?;
    for row in grid.rows() {
        let line: String = row.iter().map(|&cell| char::from(b'0' + cell)).collect();
        writeln!(wtr, "{line}")?;
    }
    wtr.flush()?;
    Ok(())
}

/// Reads a persisted index back into memory.
///
/// Any malformed line fails the whole read; a partial grid is never
/// returned.
pub fn read(path: &Path) -> Result<Index, CoverageError> {
    let mut lines = BufReader::new(File::open(path)?).lines();

    let version_line = next_line(&mut lines)?;
    let version = version_line
        .parse::<u32>()
        .map_err(|_| CoverageError::Version(version_line))?;

    let timestamp_line = next_line(&mut lines)?;
    let timestamp = timestamp_line
        .parse::<u64>()
        .map_err(|_| CoverageError::Timestamp(timestamp_line))?;

    let mut rows: Vec<Vec<u8>> = Vec::with_capacity(GRID_ROWS);
    for (n, line) in lines.enumerate() {
        let line = line?;
        if !line.bytes().all(|digit| digit.is_ascii_digit()) {
            return Err(CoverageError::RowDigits(n + 1));
        }
        rows.push(line.bytes().map(|digit| digit - b'0').collect());
    }
    let grid = CoverageGrid::from_rows(rows)?;

    Ok(Index {
        version,
        timestamp,
        grid,
    })
}

/// Checks a persisted index without materializing a grid: an all-digit
/// version line, an all-digit timestamp line, then exactly
/// [`GRID_ROWS`] data rows of exactly [`GRID_COLS`] mask digits each.
/// The first violation found is returned.
pub fn validate(path: &Path) -> Result<(), CoverageError> {
    let mut lines = BufReader::new(File::open(path)?).lines();

    let version = next_line(&mut lines)?;
    if version.is_empty() || !version.bytes().all(|digit| digit.is_ascii_digit()) {
        return Err(CoverageError::Version(version));
    }

    let timestamp = next_line(&mut lines)?;
    if timestamp.is_empty() || !timestamp.bytes().all(|digit| digit.is_ascii_digit()) {
        return Err(CoverageError::Timestamp(timestamp));
    }

    let mut n_rows = 0;
    for line in lines {
        let line = line?;
        n_rows += 1;
        if line.len() != GRID_COLS {
            return Err(CoverageError::RowWidth {
                row: n_rows,
                width: line.len(),
            });
        }
        if !line.bytes().all(|digit| (b'0'..=b'7').contains(&digit)) {
            return Err(CoverageError::RowDigits(n_rows));
        }
    }
    if n_rows != GRID_ROWS {
        return Err(CoverageError::RowCount(n_rows));
    }
    Ok(())
}

/// Compresses the file at `path` into a sibling `<path>.zip` holding a
/// single member named after the file, and returns the archive path.
/// A partially written archive is removed before any failure is
/// returned.
pub fn archive(path: &Path) -> Result<PathBuf, CoverageError> {
    let member = path
        .file_name()
        .and_then(OsStr::to_str)
        .ok_or_else(|| CoverageError::ArchiveName(path.to_owned()))?;
    let archive_path = {
        let mut name = path.as_os_str().to_owned();
        name.push(".zip");
        PathBuf::from(name)
    };

    match compress(path, &archive_path, member) {
        Ok(()) => Ok(archive_path),
        Err(e) => {
            if archive_path.exists() {
                if let Err(e) = fs::remove_file(&archive_path) {
                    warn!("failed to remove partial archive {archive_path:?}: {e}");
                }
            }
            Err(e)
        }
    }
}

fn compress(src: &Path, dst: &Path, member: &str) -> Result<(), CoverageError> {
    let mut rdr = File::open(src)?;
    let mut zip = ZipWriter::new(File::create(dst)?);
    zip.start_file(
        member,
        FileOptions::default().compression_method(CompressionMethod::Deflated),
    )?;
    io::copy(&mut rdr, &mut zip)?;
    zip.finish()?;
    Ok(())
}

fn next_line(lines: &mut Lines<BufReader<File>>) -> Result<String, CoverageError> {
    match lines.next() {
        Some(line) => Ok(line?),
        None => Err(CoverageError::Truncated),
    }
}

fn epoch_millis() -> Result<u64, CoverageError> {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| CoverageError::Clock)?
        .as_millis();
    u64::try_from(millis).map_err(|_| CoverageError::Clock)
}
