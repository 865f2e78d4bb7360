//! Persistence of a [`ReferenceIndex`] as a JSON document

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::index::reference::ReferenceIndex;

/// The persisted form of an index.
pub type IndexArtifact = ReferenceIndex;

impl ReferenceIndex {
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IndexerError;
    use tempfile::TempDir;

    fn sample() -> IndexArtifact {
        let mut index = ReferenceIndex::new("2.0.0");
        index.add_use("pkg.models.User", "pkg.api.fetch_user()");
        index.add_use("builtins.str", "pkg.models.User.name");
        index.record_alias("pkg.User", "pkg.models.User");
        index
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out").join("pkg_index.json");

        let index = sample();
        index.save(&path).unwrap();
        assert_eq!(ReferenceIndex::load(&path).unwrap(), index);
    }

    #[test]
    fn test_json_field_order() {
        let json = sample().to_json().unwrap();
        let positions: Vec<usize> = [
            "\"aliases\"",
            "\"alias_search_tree\"",
            "\"object_paths_to_uses\"",
            "\"object_search_tree\"",
            "\"version\"",
        ]
        .iter()
        .map(|key| json.find(key).unwrap())
        .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_from_json_round_trip() {
        let index = sample();
        assert_eq!(ReferenceIndex::from_json(&index.to_json().unwrap()).unwrap(), index);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ReferenceIndex::load(Path::new("/no/such/index.json")).unwrap_err();
        assert!(matches!(err, IndexerError::Io(_)));
    }

    #[test]
    fn test_load_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, "{\"aliases\": [").unwrap();
        assert!(matches!(ReferenceIndex::load(&path).unwrap_err(), IndexerError::Json(_)));
    }
}
