use std::{
    io,
    path::{Path, PathBuf},
};

/// Creates `dir` (and its parents) if it does not exist yet.
pub async fn ensure_directory(dir: &Path) -> io::Result<()> {
    if tokio::fs::try_exists(dir).await? {
        return Ok(());
    }

    log::info!("[Scanner] creating {}", dir.display());
    tokio::fs::create_dir_all(dir).await
}

/// Lists regular files directly inside `dir` whose extension matches
/// `extension` (ASCII case-insensitive, without the dot). Sorted by path so
/// discovery order does not depend on the filesystem.
pub async fn enumerate(dir: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if !matches {
            continue;
        }

        // Files can vanish between listing and stat; that is not an error here.
        match entry.file_type().await {
            Ok(kind) if kind.is_file() => found.push(path),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }

    found.sort();
    Ok(found)
}

/// Bootstraps `dir`, then lists its `extension` files.
pub async fn scan(dir: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
    ensure_directory(dir).await?;
    enumerate(dir, extension).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bootstrap_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("CustomPlatforms").join("nested");

        let files = scan(&target, "plat").await.unwrap();
        assert!(files.is_empty());
        assert!(target.is_dir());

        // Second run is a no-op.
        ensure_directory(&target).await.unwrap();
    }

    #[tokio::test]
    async fn enumeration_is_flat_filtered_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for name in ["b.plat", "a.PLAT", "notes.txt", "plat"] {
            std::fs::write(root.join(name), b"x").unwrap();
        }
        std::fs::create_dir(root.join("sub.plat")).unwrap();
        std::fs::create_dir(root.join("Scripts")).unwrap();
        std::fs::write(root.join("Scripts").join("c.plat"), b"x").unwrap();

        let files = enumerate(root, "plat").await.unwrap();
        assert_eq!(files, vec![root.join("a.PLAT"), root.join("b.plat")]);
    }

    #[tokio::test]
    async fn missing_directory_is_an_error_without_bootstrap() {
        let dir = tempfile::tempdir().unwrap();
        assert!(enumerate(&dir.path().join("nope"), "plat").await.is_err());
    }
}
