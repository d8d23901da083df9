use std::fs;
use std::io;
use std::path::PathBuf;

#[cfg(test)]
pub use memory::MemoryStorage;

/// Key/value persistence medium for the session store and UI preferences.
pub trait Storage: Send {
    fn read(&self, key: &str) -> io::Result<Option<String>>;
    fn write(&mut self, key: &str, value: &str) -> io::Result<()>;
}

/// Stores each key as `<key>.json` inside a data directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    #[cfg(test)]
    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.key_path(key)) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let final_path = self.key_path(key);
        let tmp_path = self.dir.join(format!("{key}.json.tmp"));

        fs::write(&tmp_path, value)?;
        match fs::rename(&tmp_path, &final_path) {
            Ok(()) => Ok(()),
            Err(rename_err) => {
                if final_path.exists() {
                    fs::remove_file(&final_path)?;
                    fs::rename(&tmp_path, &final_path)?;
                    Ok(())
                } else {
                    Err(rename_err)
                }
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_storage_returns_none_for_missing_key() {
        let dir = tempdir().expect("temp dir should be created");
        let storage = FileStorage::open(dir.path()).expect("storage should open");
        assert!(storage.read("missing").expect("read should succeed").is_none());
    }

    #[test]
    fn file_storage_overwrites_existing_value_without_leaving_tmp_file() {
        let dir = tempdir().expect("temp dir should be created");
        let mut storage = FileStorage::open(dir.path()).expect("storage should open");

        storage.write("conversations", "[1]").expect("first write should succeed");
        storage.write("conversations", "[2]").expect("second write should succeed");

        let value = storage.read("conversations").expect("read should succeed");
        assert_eq!(value.as_deref(), Some("[2]"));
        assert!(dir.path().join("conversations.json").exists());
        assert!(!dir.path().join("conversations.json.tmp").exists());
    }

    #[test]
    fn file_storage_creates_nested_data_dir() {
        let dir = tempdir().expect("temp dir should be created");
        let nested = dir.path().join("a").join("b");
        let storage = FileStorage::open(&nested).expect("storage should open");
        assert!(storage.dir().is_dir());
    }

    #[test]
    fn memory_storage_clones_share_entries() {
        let mut storage = MemoryStorage::new();
        let view = storage.clone();
        storage.write("theme", "\"light\"").expect("write should succeed");
        assert_eq!(
            view.read("theme").expect("read should succeed").as_deref(),
            Some("\"light\"")
        );
    }
}
