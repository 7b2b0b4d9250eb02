//! Zstd-compressed tar archives of a list of paths.
//!
//! Entries are named by the position of their path in the request (`0`,
//! `1`, ...), not by the path itself. Absolute paths and paths that leave the
//! base directory therefore pack like any other, and extraction writes each
//! entry back to the path at the same position of the restore request.

use covbase_core::{Error, Result};
use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};

const ZSTD_LEVEL: i32 = 3;

fn resolve(path: &Path, base_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn append_paths<W: Write>(
    builder: &mut tar::Builder<W>,
    paths: &[PathBuf],
    base_dir: &Path,
) -> Result<usize> {
    let mut packed = 0;
    for (index, p) in paths.iter().enumerate() {
        let abs_path = resolve(p, base_dir);
        if !abs_path.exists() {
            continue;
        }
        let name = index.to_string();

        if abs_path.is_dir() {
            builder
                .append_dir_all(&name, &abs_path)
                .map_err(|e| Error::Archive(format!("Failed to pack dir: {}", e)))?;
        } else {
            builder
                .append_path_with_name(&abs_path, &name)
                .map_err(|e| Error::Archive(format!("Failed to pack file: {}", e)))?;
        }
        packed += 1;
    }
    Ok(packed)
}

/// Create an archive from paths. Returns how many of the paths existed.
pub fn create_archive<W: Write>(writer: W, paths: &[PathBuf], base_dir: &Path) -> Result<usize> {
    let mut encoder = zstd::stream::write::Encoder::new(writer, ZSTD_LEVEL)
        .map_err(|e| Error::Archive(format!("Zstd init failed: {}", e)))?;
    let packed = {
        let mut builder = tar::Builder::new(&mut encoder);
        let packed = append_paths(&mut builder, paths, base_dir)?;
        builder
            .finish()
            .map_err(|e| Error::Archive(format!("Failed to finish tar: {}", e)))?;
        packed
    };
    encoder
        .finish()
        .map_err(|e| Error::Archive(format!("Zstd finish failed: {}", e)))?;
    Ok(packed)
}

/// Where an archive entry is written: the requested path at the entry's
/// index, plus whatever lies below it for directories.
fn target_for(name: &Path, paths: &[PathBuf], base_dir: &Path) -> Result<PathBuf> {
    let mut components = name.components();
    let path = match components.next() {
        Some(Component::Normal(first)) => first
            .to_str()
            .and_then(|s| s.parse::<usize>().ok())
            .and_then(|index| paths.get(index)),
        _ => None,
    }
    .ok_or_else(|| Error::Archive(format!("Unexpected archive entry: {}", name.display())))?;

    let mut target = resolve(path, base_dir);
    for component in components {
        match component {
            Component::Normal(part) => target.push(part),
            Component::CurDir => {}
            _ => {
                return Err(Error::Archive(format!(
                    "Unsafe archive entry: {}",
                    name.display()
                )));
            }
        }
    }
    Ok(target)
}

/// Extract an archive onto `paths`. Returns how many entries were written.
pub fn extract_archive<R: Read>(reader: R, paths: &[PathBuf], base_dir: &Path) -> Result<usize> {
    let decoder = zstd::stream::read::Decoder::new(reader)
        .map_err(|e| Error::Archive(format!("Failed to create decoder: {}", e)))?;
    let mut archive = tar::Archive::new(decoder);

    let mut restored = 0;
    let entries = archive
        .entries()
        .map_err(|e| Error::Archive(format!("Failed to read archive: {}", e)))?;
    for entry in entries {
        let mut entry =
            entry.map_err(|e| Error::Archive(format!("Failed to read archive: {}", e)))?;
        let name = entry
            .path()
            .map_err(|e| Error::Archive(format!("Invalid entry name: {}", e)))?
            .into_owned();
        let target = target_for(&name, paths, base_dir)?;

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        entry.unpack(&target).map_err(|e| {
            Error::Archive(format!("Failed to unpack {}: {}", target.display(), e))
        })?;
        restored += 1;
    }
    Ok(restored)
}
