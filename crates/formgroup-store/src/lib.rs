//! Snapshot store.
//!
//! The whole form state lives in one text file holding a JSON object
//! `{ groupKey: [{ value, ...attrs }, ...] }`. Every write replaces the file;
//! every read parses it back in full. Nothing is cached in between, so the
//! file is the source of truth.

mod encoding;

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use formgroup_core::{Snapshot, StoreError};
use serde::Deserialize;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

pub use encoding::Encoding;

/// Widths above this are clamped, as JSON `space` arguments are.
pub const MAX_INDENT_WIDTH: usize = 10;

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreOptions {
    pub encoding: Encoding,
    /// Spaces per nesting level; 0 writes compact JSON.
    #[serde(alias = "space")]
    pub indent_width: usize,
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn indent_width(mut self, width: usize) -> Self {
        self.indent_width = width;
        self
    }
}

#[derive(Debug)]
pub struct SnapshotStore {
    path: PathBuf,
    options: StoreOptions,
}

impl SnapshotStore {
    /// Opens the store at `path`, replacing whatever it held with an empty
    /// snapshot. Fails if the path cannot be written.
    pub fn open(path: impl Into<PathBuf>, options: StoreOptions) -> Result<Self, StoreError> {
        let store = Self {
            path: path.into(),
            options,
        };
        store.write_snapshot(&Snapshot::new())?;
        log::debug!(
            "snapshot store ready at {} ({}, indent {})",
            store.path.display(),
            store.options.encoding,
            store.indent()
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    fn indent(&self) -> usize {
        self.options.indent_width.min(MAX_INDENT_WIDTH)
    }

    pub fn serialize(&self, data: &Snapshot) -> Result<String, StoreError> {
        let width = self.indent();
        if width == 0 {
            return serde_json::to_string(data).map_err(StoreError::Serialize);
        }
        let indent = " ".repeat(width);
        let mut buf = Vec::new();
        let mut ser =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(indent.as_bytes()));
        data.serialize(&mut ser).map_err(StoreError::Serialize)?;
        // serde_json only ever emits UTF-8
        String::from_utf8(buf).map_err(|e| StoreError::Encoding {
            encoding: "utf8",
            detail: e.to_string(),
        })
    }

    /// Replaces the file contents with `data`. The new contents are written
    /// to a sibling temp file first and renamed over the target.
    pub fn write_snapshot(&self, data: &Snapshot) -> Result<(), StoreError> {
        let text = self.serialize(data)?;
        let bytes = self.options.encoding.encode(&text)?;

        let tmp = self.temp_path();
        if let Err(source) = fs::write(&tmp, &bytes) {
            log::warn!("write of {} failed, removing temp file", tmp.display());
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::Io { path: tmp, source });
        }
        if let Err(source) = fs::rename(&tmp, &self.path) {
            log::warn!("rename of {} failed, removing temp file", tmp.display());
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::Io {
                path: self.path.clone(),
                source,
            });
        }
        log::trace!("wrote {} groups to {}", data.len(), self.path.display());
        Ok(())
    }

    pub fn read_snapshot(&self) -> Result<Snapshot, StoreError> {
        let bytes = fs::read(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        let text = self.options.encoding.decode(&bytes)?;
        serde_json::from_str(&text).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formgroup_core::StateRecord;
    use tempfile::tempdir;

    fn sample() -> Snapshot {
        let mut record = StateRecord::new("a");
        record.insert("title", "t");
        let mut snap = Snapshot::new();
        snap.insert("group1", vec![record, StateRecord::new(2)]);
        snap.insert("group0", vec![]);
        snap
    }

    #[test]
    fn test_open_writes_empty_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("form.json");
        let store = SnapshotStore::open(&path, StoreOptions::default()).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
        assert!(store.read_snapshot().unwrap().is_empty());
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_open_replaces_previous_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("form.json");
        fs::write(&path, r#"{"old":[{"value":"x"}]}"#).unwrap();

        let store = SnapshotStore::open(&path, StoreOptions::default()).unwrap();
        assert!(store.read_snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_open_unwritable_path_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("form.json");
        let err = SnapshotStore::open(&path, StoreOptions::default()).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::open(dir.path().join("s.json"), StoreOptions::default()).unwrap();
        store.write_snapshot(&sample()).unwrap();

        let back = store.read_snapshot().unwrap();
        assert_eq!(back, sample());
        assert_eq!(back.keys().collect::<Vec<_>>(), vec!["group1", "group0"]);
    }

    #[test]
    fn test_indent_width() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s.json");
        let store = SnapshotStore::open(&path, StoreOptions::new().indent_width(2)).unwrap();
        let mut snap = Snapshot::new();
        snap.insert("g", vec![StateRecord::new("v")]);
        store.write_snapshot(&snap).unwrap();

        let expected = "{\n  \"g\": [\n    {\n      \"value\": \"v\"\n    }\n  ]\n}";
        assert_eq!(fs::read_to_string(&path).unwrap(), expected);
    }

    #[test]
    fn test_indent_width_is_clamped() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::open(dir.path().join("s.json"), StoreOptions::new().indent_width(40)).unwrap();
        let mut snap = Snapshot::new();
        snap.insert("g", vec![]);
        assert_eq!(store.serialize(&snap).unwrap(), format!("{{\n{}\"g\": []\n}}", " ".repeat(10)));
    }

    #[test]
    fn test_utf16_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s.json");
        let store = SnapshotStore::open(&path, StoreOptions::new().encoding(Encoding::Utf16Le)).unwrap();
        let mut snap = Snapshot::new();
        snap.insert("g", vec![StateRecord::new("héllo ✓")]);
        store.write_snapshot(&snap).unwrap();

        assert_eq!(fs::read(&path).unwrap().len() % 2, 0);
        assert_eq!(store.read_snapshot().unwrap(), snap);
    }

    #[test]
    fn test_latin1_rejects_unrepresentable_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s.json");
        let store = SnapshotStore::open(&path, StoreOptions::new().encoding(Encoding::Latin1)).unwrap();

        let mut ok = Snapshot::new();
        ok.insert("g", vec![StateRecord::new("café")]);
        store.write_snapshot(&ok).unwrap();
        assert_eq!(store.read_snapshot().unwrap(), ok);

        let mut bad = Snapshot::new();
        bad.insert("g", vec![StateRecord::new("✓")]);
        let err = store.write_snapshot(&bad).unwrap_err();
        assert!(matches!(err, StoreError::Encoding { encoding: "latin1", .. }));
        // prior contents survive the failed write
        assert_eq!(store.read_snapshot().unwrap(), ok);
    }

    #[test]
    fn test_failed_temp_write_keeps_target() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s.json");
        let store = SnapshotStore::open(&path, StoreOptions::default()).unwrap();
        store.write_snapshot(&sample()).unwrap();

        // a directory squatting on the temp path makes the write fail
        fs::create_dir(store.temp_path()).unwrap();
        let err = store.write_snapshot(&Snapshot::new()).unwrap_err();
        assert!(matches!(err, StoreError::Io { path, .. } if path == store.temp_path()));
        assert_eq!(store.read_snapshot().unwrap(), sample());
        assert!(store.temp_path().is_dir());

        fs::remove_dir(store.temp_path()).unwrap();
        store.write_snapshot(&Snapshot::new()).unwrap();
        assert!(!store.temp_path().exists());
        assert!(store.read_snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_unparsable_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s.json");
        let store = SnapshotStore::open(&path, StoreOptions::default()).unwrap();
        fs::write(&path, "not json").unwrap();
        assert!(matches!(store.read_snapshot().unwrap_err(), StoreError::Parse { .. }));

        fs::remove_file(&path).unwrap();
        assert!(matches!(store.read_snapshot().unwrap_err(), StoreError::Io { .. }));
    }

    #[test]
    fn test_encoding_names() {
        assert_eq!("UTF-8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert_eq!("ucs2".parse::<Encoding>().unwrap(), Encoding::Utf16Le);
        assert_eq!("binary".parse::<Encoding>().unwrap(), Encoding::Latin1);
        assert!(matches!(
            "ebcdic".parse::<Encoding>(),
            Err(StoreError::UnsupportedEncoding(name)) if name == "ebcdic"
        ));
    }

    #[test]
    fn test_options_from_json() {
        let opts: StoreOptions = serde_json::from_str(r#"{ "encoding": "utf-16le", "space": 4 }"#).unwrap();
        assert_eq!(opts, StoreOptions::new().encoding(Encoding::Utf16Le).indent_width(4));

        let defaults: StoreOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(defaults, StoreOptions::default());

        assert!(serde_json::from_str::<StoreOptions>(r#"{ "encoding": "koi8" }"#).is_err());
    }
}
