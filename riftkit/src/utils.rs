//! Tools shared by subcommands
use std::hash::Hash;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use num_traits::Num;
use walkdir::{WalkDir, DirEntry};
use riftkit_hashes::HashMapper;
use riftkit_prop::{
    is_prop_path,
    JsonSerializer,
    PropEntriesSerializer,
    PropHashMappers,
    PropSerializer,
    TextTreeSerializer,
};


/// Match strings against a pattern with `*` wildcards
pub struct PathPattern<'a> {
    prefix: &'a str,
    suffix: Option<&'a str>,
    parts: Vec<&'a str>,
}

impl<'a> PathPattern<'a> {
    pub fn new(pattern: &'a str) -> Self {
        let mut it = pattern.split('*');
        let prefix = it.next().unwrap_or("");
        let mut parts: Vec<&str> = it.collect();
        let suffix = parts.pop();
        Self { prefix, suffix, parts }
    }

    pub fn is_match(&self, mut s: &str) -> bool {
        // No suffix means no `*`, compare the whole string
        let suffix = match self.suffix {
            None => return self.prefix == s,
            Some(suffix) => suffix,
        };

        // Prefix and suffix must match
        if !s.starts_with(self.prefix) {
            return false;
        }
        s = &s[self.prefix.len()..];
        if !s.ends_with(suffix) {
            return false;
        }
        s = &s[..s.len() - suffix.len()];

        // Find parts, one after the other
        for part in self.parts.iter() {
            s = match s.find(part) {
                None => return false,
                Some(i) => &s[i + part.len()..],
            };
        }
        true
    }
}

/// Match a hash value against a pattern
///
/// The pattern is either the hex representation of a hash value or a string
/// pattern with `*` wildcards.
pub enum HashValuePattern<'a, T: Num + Eq + Hash + Copy> {
    Hash(T),
    Path(PathPattern<'a>),
}

impl<'a, T: Num + Eq + Hash + Copy> HashValuePattern<'a, T> {
    pub fn new(pattern: &'a str) -> Self {
        // A string with the exact hex width is taken as a hash
        if pattern.len() == std::mem::size_of::<T>() * 2 {
            if let Ok(hash) = T::from_str_radix(pattern, 16) {
                return Self::Hash(hash);
            }
        }

        Self::Path(PathPattern::new(pattern))
    }

    pub fn is_match<const N: usize>(&self, hash: T, mapper: &HashMapper<T, N>) -> bool {
        match self {
            Self::Hash(h) => hash == *h,
            Self::Path(pattern) => {
                if let Some(path) = mapper.get(hash) {
                    pattern.is_match(path)
                } else {
                    false
                }
            }
        }
    }
}


/// Flag flipped by Ctrl-C, checked by long operations between work units
pub fn install_cancel_flag() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = flag.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_flag.store(true, Ordering::Relaxed)) {
        log::warn!("failed to install Ctrl-C handler: {e}");
    }
    flag
}


fn is_prop_direntry(entry: &DirEntry) -> bool {
    let ftype = entry.file_type();
    if ftype.is_file() {
        is_prop_path(entry.path())
    } else {
        ftype.is_dir()
    }
}

/// Iterate on property binary files from a directory
pub fn prop_files_from_dir<P: AsRef<Path>>(root: P) -> impl Iterator<Item=PathBuf> {
    WalkDir::new(&root)
        .into_iter()
        .filter_entry(is_prop_direntry)
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
}


/// Create an entry serializer, JSON or text tree
pub fn build_entry_serializer<'a, W: io::Write>(
    writer: &'a mut W,
    hmappers: &'a PropHashMappers,
    json: bool,
) -> io::Result<Box<dyn PropEntriesSerializer + 'a>> {
    if json {
        Ok(Box::new(JsonSerializer::new(writer, hmappers).write_entries()?))
    } else {
        Ok(Box::new(TextTreeSerializer::new(writer, hmappers).write_entries()?))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_patterns() {
        assert!(PathPattern::new("a/b.txt").is_match("a/b.txt"));
        assert!(!PathPattern::new("a/b.txt").is_match("a/b.txt.bak"));
        assert!(PathPattern::new("a/*.txt").is_match("a/b.txt"));
        assert!(PathPattern::new("*skin*").is_match("data/skins/skin0.bin"));
        assert!(!PathPattern::new("a/*.txt").is_match("b/b.txt"));
    }

    #[test]
    fn hash_value_patterns() {
        let mut mapper = HashMapper::<u64, 64>::new();
        mapper.insert(0x42, "assets/file.png".to_string());

        let pat = HashValuePattern::<u64>::new("0000000000000042");
        assert!(pat.is_match(0x42, &mapper));
        assert!(!pat.is_match(0x43, &mapper));

        let pat = HashValuePattern::<u64>::new("assets/*.png");
        assert!(pat.is_match(0x42, &mapper));
        assert!(!pat.is_match(0x1, &mapper));
    }
}
