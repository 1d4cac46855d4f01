use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `bytes` to a sibling staging file, fsync it, then rename it over `path`.
pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = staging_path(path);
    {
        let mut f = File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_path_keeps_original_extension() {
        let staged = staging_path(Path::new("/srv/pages/run-timestamps.json"));
        assert_eq!(staged, Path::new("/srv/pages/run-timestamps.json.tmp"));
    }

    #[test]
    fn atomic_write_replaces_existing_file() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let path = dir.path().join("out.json");
        fs::write(&path, b"old").unwrap();

        atomic_write_bytes(&path, b"new").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"new");
        assert!(!staging_path(&path).exists());
    }
}
