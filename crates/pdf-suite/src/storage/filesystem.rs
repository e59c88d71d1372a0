use std::path::{Component, Path, PathBuf};

use crate::error::StorageError;
use crate::storage::{FileStore, Visibility};

const PUBLIC_PREFIX: &str = "/files/";
const PRIVATE_PREFIX: &str = "/private/files/";

/// Site-directory backed file store.
///
/// Layout: `<site>/public/files/<name>` for public references and
/// `<site>/private/files/<name>` for private ones.
pub struct FileStorage {
    site_directory: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(site_directory: P) -> Self {
        Self {
            site_directory: site_directory.as_ref().to_path_buf(),
        }
    }

    pub fn site_directory(&self) -> &Path {
        &self.site_directory
    }

    fn area_directory(&self, visibility: Visibility) -> PathBuf {
        match visibility {
            Visibility::Public => self.site_directory.join("public").join("files"),
            Visibility::Private => self.site_directory.join("private").join("files"),
        }
    }

    fn reference_for(visibility: Visibility, filename: &str) -> String {
        match visibility {
            Visibility::Public => format!("{}{}", PUBLIC_PREFIX, filename),
            Visibility::Private => format!("{}{}", PRIVATE_PREFIX, filename),
        }
    }

    /// Splits a reference into its area and relative path without touching disk.
    fn locate(&self, file_ref: &str) -> Result<PathBuf, StorageError> {
        if file_ref.trim().is_empty() {
            return Err(StorageError::MissingReference);
        }

        let (visibility, relative) = if let Some(rest) = file_ref.strip_prefix(PRIVATE_PREFIX) {
            (Visibility::Private, rest)
        } else if let Some(rest) = file_ref.strip_prefix(PUBLIC_PREFIX) {
            (Visibility::Public, rest)
        } else {
            (Visibility::Public, file_ref)
        };

        let relative = Path::new(relative);
        let is_plain = relative.components().count() > 0
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_plain {
            return Err(StorageError::NotFound(file_ref.to_string()));
        }

        Ok(self.area_directory(visibility).join(relative))
    }

    fn ensure_directory(&self, path: &Path) -> Result<(), StorageError> {
        if !path.exists() {
            std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        Ok(())
    }

    /// Writes with exclusive creation, suffixing `_2`, `_3`, ... on clashes.
    fn store_with_atomic_creation(
        &self,
        dir_path: &Path,
        filename: &str,
        content: &[u8],
    ) -> Result<String, StorageError> {
        use std::io::Write;

        let (base, ext) = match filename.rfind('.') {
            Some(dot_pos) if dot_pos > 0 => (&filename[..dot_pos], Some(&filename[dot_pos..])),
            _ => (filename, None),
        };

        for counter in 1..=1000 {
            let try_filename = if counter == 1 {
                filename.to_string()
            } else {
                match ext {
                    Some(ext) => format!("{}_{}{}", base, counter, ext),
                    None => format!("{}_{}", base, counter),
                }
            };

            let try_path = dir_path.join(&try_filename);

            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&try_path)
            {
                Ok(mut file) => {
                    file.write_all(content)
                        .map_err(|e| StorageError::WriteFile {
                            path: try_path.clone(),
                            source: e,
                        })?;
                    return Ok(try_filename);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StorageError::WriteFile {
                        path: try_path,
                        source: e,
                    });
                }
            }
        }

        Err(StorageError::FileExists(dir_path.join(filename)))
    }
}

impl FileStore for FileStorage {
    fn resolve(&self, file_ref: &str) -> Result<PathBuf, StorageError> {
        let path = self.locate(file_ref)?;
        if !path.is_file() {
            return Err(StorageError::NotFound(file_ref.to_string()));
        }
        Ok(path)
    }

    fn store(
        &self,
        content: &[u8],
        filename: &str,
        visibility: Visibility,
    ) -> Result<String, StorageError> {
        let name = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| StorageError::InvalidFilename(filename.to_string()))?;

        let dir_path = self.area_directory(visibility);
        self.ensure_directory(&dir_path)?;

        let stored_name = self.store_with_atomic_creation(&dir_path, name, content)?;
        let file_ref = Self::reference_for(visibility, &stored_name);

        tracing::debug!(file_ref = %file_ref, bytes = content.len(), "stored file");

        Ok(file_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn storage() -> (TempDir, FileStorage) {
        let temp = TempDir::new().unwrap();
        let storage = FileStorage::new(temp.path());
        (temp, storage)
    }

    #[test]
    fn test_store_private_and_resolve() {
        let (_temp, storage) = storage();

        let file_ref = storage.store(b"%PDF-1.5", "out.pdf", Visibility::Private).unwrap();
        assert_eq!(file_ref, "/private/files/out.pdf");

        let path = storage.resolve(&file_ref).unwrap();
        assert!(path.ends_with("private/files/out.pdf"));
        assert_eq!(storage.read(&file_ref).unwrap(), b"%PDF-1.5");
    }

    #[test]
    fn test_store_public() {
        let (_temp, storage) = storage();

        let file_ref = storage.store(b"x", "a.pdf", Visibility::Public).unwrap();
        assert_eq!(file_ref, "/files/a.pdf");
        assert!(storage.resolve("a.pdf").is_ok());
    }

    #[test]
    fn test_store_conflict_suffix() {
        let (_temp, storage) = storage();

        let first = storage.store(b"1", "merged.pdf", Visibility::Private).unwrap();
        let second = storage.store(b"2", "merged.pdf", Visibility::Private).unwrap();
        let third = storage.store(b"3", "merged.pdf", Visibility::Private).unwrap();

        assert_eq!(first, "/private/files/merged.pdf");
        assert_eq!(second, "/private/files/merged_2.pdf");
        assert_eq!(third, "/private/files/merged_3.pdf");
        assert_eq!(storage.read(&second).unwrap(), b"2");
    }

    #[test]
    fn test_store_strips_directories_from_filename() {
        let (_temp, storage) = storage();

        let file_ref = storage
            .store(b"x", "../../etc/passwd.pdf", Visibility::Private)
            .unwrap();
        assert_eq!(file_ref, "/private/files/passwd.pdf");
    }

    #[test]
    fn test_store_rejects_empty_filename() {
        let (_temp, storage) = storage();
        let result = storage.store(b"x", "", Visibility::Private);
        assert!(matches!(result, Err(StorageError::InvalidFilename(_))));
    }

    #[test]
    fn test_resolve_missing() {
        let (_temp, storage) = storage();
        match storage.resolve("/files/missing.pdf") {
            Err(StorageError::NotFound(r)) => assert_eq!(r, "/files/missing.pdf"),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let (_temp, storage) = storage();
        assert!(matches!(
            storage.resolve("/files/../../secret.pdf"),
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            storage.resolve("/private/files//etc/passwd"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_resolve_empty_reference() {
        let (_temp, storage) = storage();
        assert!(matches!(
            storage.resolve("  "),
            Err(StorageError::MissingReference)
        ));
    }
}
