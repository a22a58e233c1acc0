//! Local packaging capability: packable file listing and temporary archives.
//!
//! Mirrors publish-time file selection closely enough for size measurement:
//! VCS metadata, `node_modules`, and `.npmignore`d paths never ship, so they
//! never count.

use crate::error::AnalyzeError;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Directory names that never ship in a published package.
const SKIP_DIRS: &[&str] = &["node_modules", ".git", ".hg", ".svn"];

/// File names that never ship.
const SKIP_FILES: &[&str] = &[".npmignore", ".gitignore", ".DS_Store", "yarn.lock", "package-lock.json"];

/// List the files of a local package that would be packed for publishing.
///
/// Returns paths relative to `dir`, sorted for determinism.
pub fn list_packable_files(dir: &Path) -> Result<Vec<PathBuf>, AnalyzeError> {
    let ignores = read_npmignore(dir);
    let mut files = Vec::new();

    let walker = WalkDir::new(dir).min_depth(1).into_iter().filter_entry(|entry| {
        let name = entry.file_name().to_string_lossy();
        !(entry.file_type().is_dir() && SKIP_DIRS.contains(&name.as_ref()))
    });

    for entry in walker {
        let entry = entry.map_err(|e| AnalyzeError::pack(dir, e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if SKIP_FILES.contains(&name.as_ref()) {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| AnalyzeError::pack(dir, e.to_string()))?
            .to_path_buf();
        if is_ignored(&rel, &ignores) {
            continue;
        }
        files.push(rel);
    }

    files.sort();
    Ok(files)
}

/// Build a temporary gzipped tarball of `files` under a `package/` prefix.
///
/// Returns the temp dir guard and the archive path inside it; the archive
/// disappears when the guard drops.
pub fn archive(dir: &Path, files: &[PathBuf]) -> Result<(TempDir, PathBuf), AnalyzeError> {
    let tmp = TempDir::new().map_err(|e| AnalyzeError::pack(dir, e.to_string()))?;
    let tgz_path = tmp.path().join("package.tgz");

    let file = File::create(&tgz_path).map_err(|e| AnalyzeError::pack(dir, e.to_string()))?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for rel in files {
        builder
            .append_path_with_name(dir.join(rel), Path::new("package").join(rel))
            .map_err(|e| AnalyzeError::pack(dir, e.to_string()))?;
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| AnalyzeError::pack(dir, e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| AnalyzeError::pack(dir, e.to_string()))?;

    Ok((tmp, tgz_path))
}

/// Sum the on-disk sizes of the listed files.
pub fn unpacked_size(dir: &Path, files: &[PathBuf]) -> Result<u64, AnalyzeError> {
    let mut total = 0;
    for rel in files {
        let meta =
            fs::metadata(dir.join(rel)).map_err(|e| AnalyzeError::pack(dir, e.to_string()))?;
        total += meta.len();
    }
    Ok(total)
}

/// Read `.npmignore` patterns as literal path prefixes.
fn read_npmignore(dir: &Path) -> Vec<PathBuf> {
    let Ok(content) = fs::read_to_string(dir.join(".npmignore")) else {
        return Vec::new();
    };
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| PathBuf::from(line.trim_start_matches('/').trim_end_matches('/')))
        .collect()
}

fn is_ignored(rel: &Path, ignores: &[PathBuf]) -> bool {
    // package.json always ships
    if rel == Path::new("package.json") {
        return false;
    }
    ignores.iter().any(|ignore| rel.starts_with(ignore))
}
