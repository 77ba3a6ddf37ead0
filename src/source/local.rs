//! Exported archive unpacked into a local directory.
//!
//! Every `*.json` file directly under the directory is one note. Attachment
//! files may sit next to the notes or in any subdirectory.

use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::model::file_name;
use crate::source::{NoteSource, RecordIter, SourceRecord};

/// A directory of exported note files.
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if `root` is not a directory.
    pub fn open(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::InvalidArgument(format!(
                "source is not a directory: {}",
                root.display()
            )));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Note files, sorted by file name.
    fn note_files(&self) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.root)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|e| e == "json"))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Relative path inside the root, if it stays inside the root.
    fn resolve_relative(&self, file_path: &str) -> Option<PathBuf> {
        let relative = Path::new(file_path);
        let contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        contained.then(|| self.root.join(relative))
    }
}

/// Depth-first search for a file called `name` under `dir`.
fn find_file(dir: &Path, name: &str) -> Option<PathBuf> {
    let mut subdirs = Vec::new();
    let mut entries: Vec<_> = std::fs::read_dir(dir).ok()?.flatten().collect();
    entries.sort_by_key(std::fs::DirEntry::file_name);

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if entry.file_name().to_str() == Some(name) {
            return Some(path);
        }
    }

    subdirs.iter().find_map(|sub| find_file(sub, name))
}

impl NoteSource for LocalSource {
    fn records(&self) -> Result<RecordIter<'_>> {
        let files = self.note_files()?;
        debug!(count = files.len(), root = %self.root.display(), "listed note files");

        Ok(Box::new(files.into_iter().map(|path| -> Result<SourceRecord> {
            let origin = path
                .file_name()
                .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
            let bytes = std::fs::read(&path)?;
            Ok(SourceRecord { origin, bytes })
        })))
    }

    fn read_attachment_bytes(&self, file_path: &str) -> Result<Option<Vec<u8>>> {
        let direct = self.resolve_relative(file_path).filter(|p| p.is_file());
        let found = direct.or_else(|| find_file(&self.root, file_name(file_path)));

        match found {
            Some(path) => Ok(Some(std::fs::read(path)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_records_sorted_json_only() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("b.json"), "{}").unwrap();
        std::fs::write(temp.path().join("a.json"), "{}").unwrap();
        std::fs::write(temp.path().join("photo.png"), "png").unwrap();
        std::fs::create_dir(temp.path().join("nested.json")).unwrap();

        let source = LocalSource::open(temp.path()).unwrap();
        let origins: Vec<String> = source
            .records()
            .unwrap()
            .map(|r| r.unwrap().origin)
            .collect();
        assert_eq!(origins, vec!["a.json", "b.json"]);
    }

    #[test]
    fn test_attachment_lookup() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("media/2020")).unwrap();
        std::fs::write(temp.path().join("media/2020/pic.png"), "deep").unwrap();
        std::fs::write(temp.path().join("top.png"), "top").unwrap();

        let source = LocalSource::open(temp.path()).unwrap();
        assert_eq!(source.read_attachment_bytes("top.png").unwrap().unwrap(), b"top");
        assert_eq!(
            source.read_attachment_bytes("Takeout/Keep/pic.png").unwrap().unwrap(),
            b"deep"
        );
        assert!(source.read_attachment_bytes("missing.png").unwrap().is_none());
        assert!(source.read_attachment_bytes("../top.png").unwrap().is_some());
    }

    #[test]
    fn test_open_rejects_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("note.json");
        std::fs::write(&file, "{}").unwrap();
        assert!(LocalSource::open(&file).is_err());
    }
}
