use directories::ProjectDirs;
use std::path::PathBuf;

/// Data directory for the store file. `MEMVOCAB_DATA_DIR` overrides the
/// platform default.
pub fn data_root() -> PathBuf {
    if let Ok(dir) = std::env::var("MEMVOCAB_DATA_DIR") {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    if let Some(pd) = ProjectDirs::from("com", "memvocab", "MemVocab") {
        pd.data_dir().to_path_buf()
    } else {
        // Fallback: current dir
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }
}

pub fn default_store_file() -> (PathBuf, PathBuf) {
    let root = data_root();
    let file = root.join("memvocab.json");
    let backups = root.join("backups");
    (file, backups)
}
