use crate::{options::Pack, progress};
use anyhow::{bail, Context, Result};
use coverage::{index, CoverageGrid};
use dted::{Tile, TileKind};
use log::{debug, warn};
use std::{
    ffi::OsStr,
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

/// Empty file dropped into every band directory to keep static file
/// servers from emitting a directory listing.
const LISTING_MARKER: &str = "index.html";

/// Name of the uncompressed index written before archiving.
const INDEX_NAME: &str = "index";

impl Pack {
    pub fn run(&self) -> Result<()> {
        let grid = self.package()?;

        let index_path = self.output_dir.join(INDEX_NAME);
        index::write(&index_path, self.index_version, &grid)
            .with_context(|| format!("writing index {}", index_path.display()))?;
        let archive_path = index::archive(&index_path)
            .with_context(|| format!("archiving index {}", index_path.display()))?;
        fs::remove_file(&index_path)
            .with_context(|| format!("removing uncompressed index {}", index_path.display()))?;
        debug!("index archived at {}", archive_path.display());

        println!(
            "Constructed the server layout at: {}",
            self.output_dir.display()
        );
        Ok(())
    }

    /// Walks the input tree, stages every recognized tile into the
    /// output tree, and returns the coverage accumulated on the way.
    fn package(&self) -> Result<CoverageGrid> {
        if !self.input_dir.is_dir() {
            bail!(
                "input directory does not exist: {}",
                self.input_dir.display()
            );
        }
        if self.output_dir.exists() {
            bail!(
                "output directory already exists, remove it first: {}",
                self.output_dir.display()
            );
        }
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("creating output directory {}", self.output_dir.display())
        })?;

        let mut grid = CoverageGrid::new();
        let bands = self.band_dirs()?;
        let pb = progress::bar("Packaging bands".to_string(), bands.len() as u64);
        for band_path in &bands {
            self.pack_band(band_path, &mut grid)?;
            pb.inc(1);
        }
        pb.finish_and_clear();
        Ok(grid)
    }

    /// Returns the input's band directories, sorted for a stable walk
    /// order. The walk only descends into directories led by a
    /// hemisphere letter; everything else at the root is ignored.
    fn band_dirs(&self) -> Result<Vec<PathBuf>> {
        let mut bands = Vec::new();
        for entry in fs::read_dir(&self.input_dir)
            .with_context(|| format!("reading input directory {}", self.input_dir.display()))?
        {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(OsStr::to_str) {
                if matches!(name.chars().next(), Some('e' | 'E' | 'w' | 'W')) {
                    bands.push(path);
                }
            }
        }
        bands.sort();
        Ok(bands)
    }

    /// Mirrors one band directory into the output tree. An unparsable
    /// band name skips the whole directory; failure to create the
    /// mirrored directory or its marker aborts the run.
    fn pack_band(&self, band_path: &Path, grid: &mut CoverageGrid) -> Result<()> {
        let band_name = match band_path.file_name().and_then(OsStr::to_str) {
            Some(name) => name,
            None => {
                warn!(
                    "skipping band directory with unreadable name: {}",
                    band_path.display()
                );
                return Ok(());
            }
        };
        let band_lon = match dted::parse_band(band_name) {
            Ok(lon) => lon,
            Err(e) => {
                warn!("skipping band directory {}: {e}", band_path.display());
                return Ok(());
            }
        };

        let out_band = self.output_dir.join(band_name);
        fs::create_dir(&out_band)
            .with_context(|| format!("creating band directory {}", out_band.display()))?;
        let marker = out_band.join(LISTING_MARKER);
        File::create(&marker)
            .with_context(|| format!("creating listing marker {}", marker.display()))?;

        for entry in fs::read_dir(band_path)
            .with_context(|| format!("reading band directory {}", band_path.display()))?
        {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            self.stage_tile(&path, band_lon, &out_band, grid);
        }
        Ok(())
    }

    /// Stages one candidate tile into `out_band` and folds its
    /// coverage into `grid`. Every failure here is per-file: the tile
    /// is logged and skipped while the rest of the band continues.
    fn stage_tile(&self, path: &Path, band_lon: i32, out_band: &Path, grid: &mut CoverageGrid) {
        let name = match path.file_name().and_then(OsStr::to_str) {
            // Staged names are normalized to lower case.
            Some(name) => name.to_lowercase(),
            None => {
                warn!("skipping tile with unreadable name: {}", path.display());
                return;
            }
        };

        match TileKind::from_name(&name) {
            Some(TileKind::Raw) => {
                debug!("compressing raw tile {}", path.display());
                let staged = out_band.join(format!("{name}.zip"));
                if let Err(e) = zip_tile(path, &staged, &name) {
                    warn!("failed to compress {}: {e}", path.display());
                    return;
                }
            }
            Some(TileKind::Archived) => {
                if let Err(e) = fs::copy(path, out_band.join(&name)) {
                    warn!("failed to copy {}: {e}", path.display());
                    return;
                }
            }
            None => {
                warn!("skipping unrecognized file {}", path.display());
                return;
            }
        }

        // A staged tile whose name still fails the full parse stays in
        // the layout; only the index skips it.
        let tile = match Tile::from_name(&name) {
            Ok(tile) => tile,
            Err(e) => {
                warn!("staged {} but cannot index it: {e}", path.display());
                return;
            }
        };
        grid.merge(band_lon, tile.latitude, tile.level.mask());
    }
}

/// Compresses `src` into a fresh single-member archive at `dst`. A
/// partially written archive is removed before the error is returned.
fn zip_tile(src: &Path, dst: &Path, member: &str) -> Result<()> {
    let result = write_tile_archive(src, dst, member);
    if result.is_err() && dst.exists() {
        if let Err(e) = fs::remove_file(dst) {
            warn!("failed to remove partial archive {}: {e}", dst.display());
        }
    }
    result
}

fn write_tile_archive(src: &Path, dst: &Path, member: &str) -> Result<()> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    fn pack_args(input: &Path, output: &Path) -> Pack {
        Pack {
            index_version: 1,
            input_dir: input.to_owned(),
            output_dir: output.to_owned(),
        }
    }

    fn write_tile(dir: &Path, band: &str, name: &str, contents: &[u8]) {
        let band_dir = dir.join(band);
        fs::create_dir_all(&band_dir).unwrap();
        fs::write(band_dir.join(name), contents).unwrap();
    }

    fn read_zip_member(path: &Path, member: &str) -> Vec<u8> {
        let mut zip = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut contents = Vec::new();
        zip.by_name(member)
            .unwrap()
            .read_to_end(&mut contents)
            .unwrap();
        contents
    }

    fn read_index_lines(output: &Path) -> Vec<String> {
        let text = read_zip_member(&output.join("index.zip"), INDEX_NAME);
        String::from_utf8(text)
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn test_pack_scenario() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        write_tile(&input, "w115", "n32.dt2", b"elevation samples");
        write_tile(&input, "e010", "s05.dt1.zip", b"pre-archived bytes");

        pack_args(&input, &output).run().unwrap();

        // Mirrored bands with empty listing markers.
        let marker = output.join("w115").join("index.html");
        assert!(marker.is_file());
        assert_eq!(fs::metadata(&marker).unwrap().len(), 0);
        assert!(output.join("e010").join("index.html").is_file());

        // The raw tile was compressed into a single-member archive.
        let staged = output.join("w115").join("n32.dt2.zip");
        assert_eq!(read_zip_member(&staged, "n32.dt2"), b"elevation samples");

        // The pre-archived tile was copied verbatim.
        let copied = fs::read(output.join("e010").join("s05.dt1.zip")).unwrap();
        assert_eq!(copied, b"pre-archived bytes");

        // Only the compressed index remains at the root.
        assert!(!output.join(INDEX_NAME).exists());
        let lines = read_index_lines(&output);
        assert_eq!(lines.len(), 2 + coverage::GRID_ROWS);
        assert_eq!(lines[0], "1");
        assert!(lines[1].bytes().all(|digit| digit.is_ascii_digit()));
        // w115/n32 at row -115 + 180, column 32 + 90.
        assert_eq!(lines[2 + 65].as_bytes()[122], b'2');
        // e010/s05 at row 10 + 180, column -5 + 90.
        assert_eq!(lines[2 + 190].as_bytes()[85], b'1');
        let nonzero = lines[2..]
            .iter()
            .flat_map(|row| row.bytes())
            .filter(|&digit| digit != b'0')
            .count();
        assert_eq!(nonzero, 2);
    }

    #[test]
    fn test_package_grid_contents() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        write_tile(&input, "w115", "n32.dt2", b"raw");
        write_tile(&input, "w115", "n32.dt3", b"raw");
        write_tile(&input, "e010", "s05.dt1.zip", b"archived");

        let grid = pack_args(&input, &output).package().unwrap();
        // Levels 2 and 3 accumulate into one cell.
        assert_eq!(grid.get(-115, 32), Some(6));
        assert_eq!(grid.get(10, -5), Some(1));
    }

    #[test]
    fn test_uppercase_names_are_normalized() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        write_tile(&input, "W115", "N32.DT2", b"raw");

        let grid = pack_args(&input, &output).package().unwrap();
        assert_eq!(grid.get(-115, 32), Some(2));
        // The band directory keeps its case; the staged tile does not.
        assert!(output.join("W115").join("n32.dt2.zip").is_file());
    }

    #[test]
    fn test_unrecognized_tile_skipped() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        write_tile(&input, "w010", "n32.dt9", b"not a tile");

        let grid = pack_args(&input, &output).package().unwrap();
        assert_eq!(grid, CoverageGrid::new());
        // The band was mirrored with its marker and nothing else.
        let entries: Vec<_> = fs::read_dir(output.join("w010"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec!["index.html"]);
    }

    #[test]
    fn test_out_of_range_band_staged_but_not_indexed() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        write_tile(&input, "w300", "n32.dt1", b"raw");

        let grid = pack_args(&input, &output).package().unwrap();
        assert_eq!(grid, CoverageGrid::new());
        assert!(output.join("w300").join("n32.dt1.zip").is_file());
    }

    #[test]
    fn test_band_without_digits_skipped() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        write_tile(&input, "east", "n32.dt1", b"raw");

        let grid = pack_args(&input, &output).package().unwrap();
        assert_eq!(grid, CoverageGrid::new());
        assert!(!output.join("east").exists());
    }

    #[test]
    fn test_non_band_entries_ignored() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        fs::create_dir_all(input.join("docs")).unwrap();
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("readme.txt"), b"notes").unwrap();
        fs::write(input.join("n32.dt2"), b"stray tile at the root").unwrap();

        let grid = pack_args(&input, &output).package().unwrap();
        assert_eq!(grid, CoverageGrid::new());
        assert_eq!(fs::read_dir(&output).unwrap().count(), 0);
    }

    #[test]
    fn test_existing_output_aborts() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        write_tile(&input, "w115", "n32.dt2", b"raw");
        fs::create_dir_all(&output).unwrap();

        assert!(pack_args(&input, &output).run().is_err());
        // Nothing was written into the pre-existing directory.
        assert_eq!(fs::read_dir(&output).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_input_aborts() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("missing");
        let output = dir.path().join("out");

        assert!(pack_args(&input, &output).run().is_err());
        assert!(!output.exists());
    }

    #[test]
    fn test_pack_twice_is_identical_modulo_timestamps() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in");
        write_tile(&input, "w115", "n32.dt2", b"elevation samples");
        write_tile(&input, "e010", "s05.dt1.zip", b"pre-archived bytes");

        let out1 = dir.path().join("out1");
        let out2 = dir.path().join("out2");
        pack_args(&input, &out1).run().unwrap();
        pack_args(&input, &out2).run().unwrap();

        for band in ["w115", "e010"] {
            let mut names1: Vec<_> = fs::read_dir(out1.join(band))
                .unwrap()
                .map(|entry| entry.unwrap().file_name())
                .collect();
            let mut names2: Vec<_> = fs::read_dir(out2.join(band))
                .unwrap()
                .map(|entry| entry.unwrap().file_name())
                .collect();
            names1.sort();
            names2.sort();
            assert_eq!(names1, names2);
        }
        assert_eq!(
            read_zip_member(&out1.join("w115").join("n32.dt2.zip"), "n32.dt2"),
            read_zip_member(&out2.join("w115").join("n32.dt2.zip"), "n32.dt2"),
        );

        // Grid rows agree; only the timestamp line may differ.
        let lines1 = read_index_lines(&out1);
        let lines2 = read_index_lines(&out2);
        assert_eq!(lines1[0], lines2[0]);
        assert_eq!(lines1[2..], lines2[2..]);
    }
}
