//! Installed distribution metadata.
//!
//! Looks up the version of a distribution from the `*.dist-info/METADATA`
//! (or `*.egg-info/PKG-INFO`) file that installers leave next to the package.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

static NAME_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-_.]+").expect("valid separator pattern"));

/// Normalizes a distribution name so `Hikari_Tanjun` and `hikari-tanjun`
/// compare equal.
pub fn normalize_name(name: &str) -> String {
    NAME_SEPARATORS.replace_all(name, "-").to_lowercase()
}

/// Finds the installed version of `package` under any of `roots`.
pub fn package_version(roots: &[PathBuf], package: &str) -> Option<String> {
    let wanted = normalize_name(package);

    for root in roots {
        let Some(metadata) = find_metadata(root, &wanted) else {
            continue;
        };

        match fs::read_to_string(&metadata) {
            Ok(content) => {
                if let Some(version) = parse_version(&content) {
                    return Some(version);
                }
                tracing::debug!("No Version header in {}", metadata.display());
            }
            Err(e) => tracing::debug!("Failed to read {}: {}", metadata.display(), e),
        }
    }

    None
}

fn find_metadata(root: &Path, wanted: &str) -> Option<PathBuf> {
    let entries = fs::read_dir(root).ok()?;

    let mut candidates: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .filter_map(|path| {
            let file_name = path.file_name()?.to_str()?;
            let (stem, metadata_file) = if let Some(stem) = file_name.strip_suffix(".dist-info") {
                (stem, "METADATA")
            } else if let Some(stem) = file_name.strip_suffix(".egg-info") {
                (stem, "PKG-INFO")
            } else {
                return None;
            };

            // `<name>-<version>`, names never contain `-` once escaped
            let name = stem.split_once('-').map_or(stem, |(name, _)| name);
            (normalize_name(name) == wanted).then(|| path.join(metadata_file))
        })
        .filter(|path| path.is_file())
        .collect();

    candidates.sort();
    candidates.into_iter().next()
}

/// Reads the `Version:` header of a core metadata file.
fn parse_version(content: &str) -> Option<String> {
    for line in content.lines() {
        // Headers end at the first blank line, the description follows
        if line.trim().is_empty() {
            break;
        }

        if let Some((key, value)) = line.split_once(':') {
            if key.trim().eq_ignore_ascii_case("version") {
                let value = value.trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }

    None
}
