//! Extraction of WAD entries to a filesystem tree

use std::fs;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use sha2::{Digest, Sha256};
use riftkit_utils::GuardedFile;
use super::{check_sha256_prefix, Result, WadEntry, WadError, WadHashMapper, WadReader};

/// SHA-256 prefix verification mode
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum VerifyPolicy {
    /// Do not verify checksums
    #[default]
    Off,
    /// Verify, but treat a zero stored prefix as "unverified"
    ///
    /// Some archive writers leave the prefix of trailing entries zeroed.
    AcceptZero,
    /// Verify every non-symlink entry, a zero prefix must match too
    Strict,
}

/// Outcome of an extraction run
#[derive(Debug, Default)]
pub struct ExtractReport {
    /// Entries written to disk
    pub extracted: usize,
    /// Entries skipped (already present, or unknown entries not requested)
    pub skipped: usize,
    /// Symlink entries, recorded but not written
    pub symlinked: usize,
    /// Per-entry failures; they do not abort the run
    pub errors: Vec<(u64, WadError)>,
}

impl ExtractReport {
    /// Return `true` if no entry failed
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}


/// Extract WAD entries into a directory tree
///
/// Entries with a known path are written under the output root at that path;
/// entries with an unknown path land in a configurable subdirectory, named by
/// their hex hash with an extension sniffed from the payload. Writes are
/// atomic and per-entry failures are accumulated in the report.
pub struct WadExtractor<'a> {
    output: PathBuf,
    mapper: Option<&'a WadHashMapper>,
    unknown_dir: Option<PathBuf>,
    overwrite: bool,
    verify: VerifyPolicy,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> WadExtractor<'a> {
    /// Create an extractor writing under `output`
    pub fn new<P: AsRef<Path>>(output: P) -> Self {
        Self {
            output: output.as_ref().to_path_buf(),
            mapper: None,
            unknown_dir: Some(PathBuf::from("unknown")),
            overwrite: false,
            verify: VerifyPolicy::Off,
            cancel: None,
        }
    }

    /// Resolve entry paths with the given hash mapping
    pub fn with_mapper(mut self, mapper: &'a WadHashMapper) -> Self {
        self.mapper = Some(mapper);
        self
    }

    /// Subdirectory for unknown entries, `None` to skip them
    pub fn unknown_dir<P: Into<PathBuf>>(mut self, dir: Option<P>) -> Self {
        self.unknown_dir = dir.map(Into::into);
        self
    }

    /// Overwrite destinations that already exist
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set the checksum verification policy
    pub fn verify(mut self, verify: VerifyPolicy) -> Self {
        self.verify = verify;
        self
    }

    /// Stop between entries once the flag is set
    pub fn with_cancel(mut self, cancel: &'a AtomicBool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Extract all entries, sorted by payload offset
    pub fn extract_all<R: Read + Seek>(&self, wad: &mut WadReader<R>) -> Result<ExtractReport> {
        let entries: Vec<WadEntry> = wad.wad().entries_by_offset().into_iter().copied().collect();
        let mut report = ExtractReport::default();

        for entry in entries {
            if let Some(cancel) = self.cancel {
                if cancel.load(Ordering::Relaxed) {
                    log::info!("extraction cancelled after {} entries", report.extracted);
                    break;
                }
            }
            if let Err(e) = self.extract_one(wad, &entry, &mut report) {
                log::warn!("failed to extract {:x}: {}", entry.path, e);
                report.errors.push((entry.path.hash, e));
            }
        }
        Ok(report)
    }

    /// Extract a single entry, updating the report counters
    ///
    /// Errors are returned to the caller, which decides whether to record
    /// them and continue.
    pub fn extract_one<R: Read + Seek>(
        &self,
        wad: &mut WadReader<R>,
        entry: &WadEntry,
        report: &mut ExtractReport,
    ) -> Result<()> {
        if entry.is_symlink() {
            let target = wad.read_symlink_target(entry)?;
            log::debug!("symlink entry {:x} -> {}", entry.path, target);
            report.symlinked += 1;
            return Ok(());
        }

        let dest = match self.entry_dest(wad, entry)? {
            Some(dest) => dest,
            None => {
                report.skipped += 1;
                return Ok(());
            }
        };

        if !self.overwrite && self.dest_up_to_date(entry, &dest)? {
            report.skipped += 1;
            return Ok(());
        }

        let mut gfile = GuardedFile::create(&dest)?;
        let digest = wad.decode_entry_into(entry, gfile.as_file_mut())?;
        check_sha256_prefix(entry, &digest, self.verify)?;
        gfile.persist()?;
        log::debug!("extracted {:x} to {}", entry.path, dest.display());
        report.extracted += 1;
        Ok(())
    }

    /// Destination path for an entry, `None` when it should be skipped
    fn entry_dest<R: Read + Seek>(&self, wad: &mut WadReader<R>, entry: &WadEntry) -> Result<Option<PathBuf>> {
        if let Some(name) = self.mapper.and_then(|m| m.get(entry.path.hash)) {
            let rel = sanitize_entry_path(name)?;
            return Ok(Some(self.output.join(rel)));
        }
        let unknown_dir = match &self.unknown_dir {
            Some(dir) => dir,
            None => return Ok(None),
        };
        let name = match wad.sniff_entry_extension(entry) {
            Some(ext) => format!("{:x}.{}", entry.path, ext),
            None => format!("{:x}", entry.path),
        };
        Ok(Some(self.output.join(unknown_dir).join(name)))
    }

    /// Return `true` when the destination already holds the entry
    fn dest_up_to_date(&self, entry: &WadEntry, dest: &Path) -> Result<bool> {
        let meta = match fs::metadata(dest) {
            Ok(meta) => meta,
            Err(_) => return Ok(false),
        };
        if !meta.is_file() || meta.len() != entry.target_size as u64 {
            return Ok(false);
        }
        if self.verify != VerifyPolicy::Off && entry.sha256_prefix != 0 {
            let digest: [u8; 32] = Sha256::digest(fs::read(dest)?).into();
            return Ok(check_sha256_prefix(entry, &digest, self.verify).is_ok());
        }
        Ok(true)
    }
}


/// Validate an entry name for use as a relative filesystem path
///
/// Entry names use `/` separators; anything that could escape the output
/// root is rejected.
fn sanitize_entry_path(name: &str) -> Result<PathBuf> {
    let mut path = PathBuf::new();
    for part in name.split('/') {
        match part {
            "" | "." => continue,
            ".." => return Err(WadError::InvalidPath(name.to_string())),
            part if part.contains('\\') || part.contains(':') => {
                return Err(WadError::InvalidPath(name.to_string()));
            }
            part => path.push(part),
        }
    }
    if path.as_os_str().is_empty() {
        return Err(WadError::InvalidPath(name.to_string()));
    }
    Ok(path)
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::super::tests::{build_wad, sha_prefix};
    use super::super::WadFormat;
    use std::io::Cursor;

    fn temp_output(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("riftkit-wad-{name}"));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn extract_known_unknown_and_symlink() {
        let out = temp_output("extract");
        let link = b"assets/elsewhere.png";
        let data = build_wad(&[
            (0x10, WadFormat::Raw, b"known data", 10, sha_prefix(b"known data")),
            (0x20, WadFormat::Raw, b"\x89PNG\x0d\x0a\x1a\x0a1234", 12, 0),
            (0x30, WadFormat::Symlink, link, link.len() as u32, 0),
        ]);
        let mut wad = WadReader::new(Cursor::new(data)).unwrap();

        let mut mapper = WadHashMapper::new();
        mapper.insert(0x10, "assets/dir/file.txt".to_string());

        let report = WadExtractor::new(&out)
            .with_mapper(&mapper)
            .verify(VerifyPolicy::AcceptZero)
            .extract_all(&mut wad)
            .unwrap();

        assert!(report.is_ok(), "errors: {:?}", report.errors);
        assert_eq!(report.extracted, 2);
        assert_eq!(report.symlinked, 1);
        assert_eq!(fs::read(out.join("assets/dir/file.txt")).unwrap(), b"known data");
        assert_eq!(
            fs::read(out.join("unknown/0000000000000020.png")).unwrap(),
            b"\x89PNG\x0d\x0a\x1a\x0a1234"
        );
        let _ = fs::remove_dir_all(&out);
    }

    #[test]
    fn second_run_skips_existing() {
        let out = temp_output("skip");
        let data = build_wad(&[(0x10, WadFormat::Raw, b"payload", 7, sha_prefix(b"payload"))]);
        let mut mapper = WadHashMapper::new();
        mapper.insert(0x10, "file.txt".to_string());

        let mut wad = WadReader::new(Cursor::new(data.clone())).unwrap();
        let report = WadExtractor::new(&out).with_mapper(&mapper).extract_all(&mut wad).unwrap();
        assert_eq!((report.extracted, report.skipped), (1, 0));

        let mut wad = WadReader::new(Cursor::new(data)).unwrap();
        let report = WadExtractor::new(&out).with_mapper(&mapper).extract_all(&mut wad).unwrap();
        assert_eq!((report.extracted, report.skipped), (0, 1));
        let _ = fs::remove_dir_all(&out);
    }

    #[test]
    fn entry_failure_does_not_abort_run() {
        let out = temp_output("errors");
        let data = build_wad(&[
            (0x10, WadFormat::Unknown(9), b"xx", 2, 0),
            (0x20, WadFormat::Raw, b"fine", 4, 0),
        ]);
        let mut mapper = WadHashMapper::new();
        mapper.insert(0x10, "bad.dat".to_string());
        mapper.insert(0x20, "good.dat".to_string());

        let mut wad = WadReader::new(Cursor::new(data)).unwrap();
        let report = WadExtractor::new(&out).with_mapper(&mapper).extract_all(&mut wad).unwrap();
        assert_eq!(report.extracted, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].0, 0x10);
        assert!(out.join("good.dat").is_file());
        assert!(!out.join("bad.dat").exists());
        let _ = fs::remove_dir_all(&out);
    }

    #[test]
    fn traversal_names_are_rejected() {
        assert!(sanitize_entry_path("a/../../etc/passwd").is_err());
        assert!(sanitize_entry_path("c:\\windows").is_err());
        assert!(sanitize_entry_path("").is_err());
        assert_eq!(
            sanitize_entry_path("/a//b/./c.txt").unwrap(),
            PathBuf::from("a/b/c.txt")
        );
    }

    #[test]
    fn cancel_stops_between_entries() {
        let out = temp_output("cancel");
        let data = build_wad(&[
            (0x10, WadFormat::Raw, b"a", 1, 0),
            (0x20, WadFormat::Raw, b"b", 1, 0),
        ]);
        let mut mapper = WadHashMapper::new();
        mapper.insert(0x10, "a.txt".to_string());
        mapper.insert(0x20, "b.txt".to_string());

        let cancel = AtomicBool::new(true);
        let mut wad = WadReader::new(Cursor::new(data)).unwrap();
        let report = WadExtractor::new(&out)
            .with_mapper(&mapper)
            .with_cancel(&cancel)
            .extract_all(&mut wad)
            .unwrap();
        assert_eq!(report.extracted, 0);
        let _ = fs::remove_dir_all(&out);
    }
}
