use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};


/// Write to a temporary file, atomically renamed into place when kept
///
/// The parent directory is created if needed. Data is written to a `.tmp`
/// sibling which replaces the target only when explicitly persisted; the
/// temporary file is removed on drop otherwise, so a failed write never
/// leaves a partial file at the destination.
pub struct GuardedFile<P: AsRef<Path>> {
    // Option so drop() can close the file before removing it
    file: Option<File>,
    path: P,
}

impl<P: AsRef<Path>> GuardedFile<P> {
    /// Run a closure with the temporary file, persist on success
    pub fn for_scope<T, F: FnOnce(&mut File) -> std::io::Result<T>>(path: P, f: F) -> std::io::Result<T> {
        let mut gfile = Self::create(path)?;
        let result = f(gfile.as_file_mut())?;
        gfile.persist()?;
        Ok(result)
    }

    /// Create the temporary file, and parent directories if needed
    pub fn create(path: P) -> std::io::Result<Self> {
        let dirname = path.as_ref().parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent directory")
        })?;
        fs::create_dir_all(dirname)?;

        let file = OpenOptions::new()
            .read(true).write(true).create(true).truncate(true)
            .open(Self::build_tmp_path(path.as_ref()))?;
        Ok(Self { file: Some(file), path })
    }

    /// Rename the temporary file onto the target path
    pub fn persist(mut self) -> std::io::Result<File> {
        fs::rename(Self::build_tmp_path(self.path.as_ref()), self.path.as_ref())?;
        Ok(self.file.take().expect("file already persisted"))
    }

    /// Access the underlying file
    pub fn as_file_mut(&mut self) -> &mut File {
        self.file.as_mut().expect("file already persisted")
    }

    fn build_tmp_path(path: &Path) -> PathBuf {
        let mut s = path.as_os_str().to_owned();
        s.push(".tmp");
        s.into()
    }
}

impl<P: AsRef<Path>> Drop for GuardedFile<P> {
    fn drop(&mut self) {
        if self.file.is_some() {
            let _ = fs::remove_file(Self::build_tmp_path(self.path.as_ref()));  // ignore errors
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn persisted_file_replaces_target() {
        let dir = std::env::temp_dir().join("riftkit-guarded-persist");
        let _ = fs::remove_dir_all(&dir);
        let target = dir.join("out.txt");

        GuardedFile::for_scope(&target, |f| f.write_all(b"payload")).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"payload");
        assert!(!target.with_extension("txt.tmp").exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn dropped_file_leaves_nothing() {
        let dir = std::env::temp_dir().join("riftkit-guarded-drop");
        let _ = fs::remove_dir_all(&dir);
        let target = dir.join("out.txt");

        {
            let mut gfile = GuardedFile::create(&target).unwrap();
            gfile.as_file_mut().write_all(b"partial").unwrap();
            // dropped without persist()
        }
        assert!(!target.exists());
        assert!(fs::read_dir(&dir).unwrap().next().is_none());
        let _ = fs::remove_dir_all(&dir);
    }
}
