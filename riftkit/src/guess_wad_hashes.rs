//! Discovery of unknown WAD path hashes
//!
//! Candidate paths are generated by a pipeline of strategies, mined from
//! decoded archive content and from combinatorial substitutions on already
//! known paths. Every candidate goes through the same filter: hash it, check
//! membership in the unknown set, move it to the known mapping on a hit.
//!
//! Strategies are incremental (substitution products are driven by
//! iterators) and interruptible (a cancel flag is checked between candidate
//! groups, and nothing is written to disk until the caller saves).

use std::collections::{HashMap, HashSet};
use std::io::{Read, Seek};
use std::sync::atomic::{AtomicBool, Ordering};
use regex::bytes::Regex as BytesRegex;
use regex::Regex;
use riftkit_hashes::xx::compute_path_hash;
use riftkit_wad::{WadHashMapper, WadReader};

/// Shard regions used in client asset paths
pub const REGIONS: [&str; 12] = [
    "br", "eune", "euw", "jp", "kr", "lan", "las", "na", "oce", "pbe", "ru", "tr",
];

/// Locale codes used in asset paths
pub const LANGUAGES: [&str; 18] = [
    "cs_cz", "de_de", "el_gr", "en_au", "en_gb", "en_us", "es_es", "es_mx",
    "fr_fr", "hu_hu", "it_it", "ja_jp", "ko_kr", "pl_pl", "pt_br", "ro_ro",
    "ru_ru", "tr_tr",
];

/// Payload extensions known to never contain path strings
const BINARY_EXTENSIONS: [&str; 17] = [
    "png", "jpg", "ttf", "otf", "webm", "ogg", "dds", "tga", "skl", "skn",
    "scb", "sco", "anm", "bnk", "wpk", "tex", "mapgeo",
];


/// Receiver for guessing progress, polled at candidate-group boundaries
pub trait ProgressSink {
    /// Called when a strategy finishes one group of candidates
    fn on_progress(&mut self, strategy: &str, done: usize, total: usize);
}

/// Progress sink discarding everything
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn on_progress(&mut self, _strategy: &str, _done: usize, _total: usize) {}
}


/// Filter of candidate paths against the unknown hash set
///
/// Insertions only mutate in-memory state; the caller decides when the
/// updated mapping is saved.
pub struct WadHashFinder {
    /// Known hash mapping, extended on hits
    pub known: WadHashMapper,
    /// Hashes still to be found
    pub unknown: HashSet<u64>,
    /// Callback invoked on each new hit
    pub on_found: fn(u64, &str),
}

impl WadHashFinder {
    pub fn new(known: WadHashMapper, unknown: HashSet<u64>) -> Self {
        // Hashes already known are not to be found again
        let mut this = Self { known, unknown, on_found: |_, _| {} };
        this.unknown.retain(|h| !this.known.is_known(*h));
        this
    }

    /// Check a single candidate path
    pub fn check(&mut self, path: &str) -> bool {
        let hash = compute_path_hash(path);
        if self.unknown.remove(&hash) {
            (self.on_found)(hash, path);
            self.known.insert(hash, path.to_string());
            true
        } else {
            false
        }
    }

    /// Check candidates from an iterator, return the number of hits
    pub fn check_iter<S: AsRef<str>>(&mut self, paths: impl Iterator<Item=S>) -> usize {
        let mut found = 0;
        for p in paths {
            if self.check(p.as_ref()) {
                found += 1;
            }
        }
        found
    }

    /// Remaining number of unknown hashes
    pub fn unknown_len(&self) -> usize {
        self.unknown.len()
    }
}


/// A candidate-generation strategy
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Strategy {
    /// Mine path-like strings from decoded archive content
    Grep,
    /// Cross known directories with known basenames
    Basenames,
    /// Substitute one basename word against the wordlist
    Words,
    /// Re-enumerate numbers appearing in basenames
    Numbers,
    /// Swap file extensions against the known extension set
    Extensions,
    /// Substitute region and language segments
    RegionLang,
    /// Swap the plugin name segment
    Plugin,
    /// Recombine `skinNN` segments
    SkinNum,
    /// Swap the character name segment
    Character,
    /// Prepend known basename prefixes (`2x_`, `4x_`, ...)
    Prefixes,
}

impl Strategy {
    /// All strategies, in their default running order
    pub const ALL: [Strategy; 10] = [
        Strategy::Grep,
        Strategy::Basenames,
        Strategy::Words,
        Strategy::Numbers,
        Strategy::Extensions,
        Strategy::RegionLang,
        Strategy::Plugin,
        Strategy::SkinNum,
        Strategy::Character,
        Strategy::Prefixes,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Grep => "grep",
            Self::Basenames => "basenames",
            Self::Words => "words",
            Self::Numbers => "numbers",
            Self::Extensions => "extensions",
            Self::RegionLang => "region_lang",
            Self::Plugin => "plugin",
            Self::SkinNum => "skin_num",
            Self::Character => "character",
            Self::Prefixes => "prefixes",
        }
    }
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|v| v.name() == s)
            .copied()
            .ok_or_else(|| format!("unknown strategy: {s}"))
    }
}


/// Drive the candidate strategies against a finder
pub struct WadHashGuesser<'a> {
    finder: WadHashFinder,
    cancel: Option<&'a AtomicBool>,
    progress: Box<dyn ProgressSink + 'a>,
    /// Maximum value enumerated by the numbers strategy
    pub number_max: u32,
}

impl<'a> WadHashGuesser<'a> {
    pub fn new(finder: WadHashFinder) -> Self {
        Self {
            finder,
            cancel: None,
            progress: Box::new(NullProgress),
            number_max: 10_000,
        }
    }

    /// Stop between candidate groups once the flag is set
    pub fn with_cancel(mut self, cancel: &'a AtomicBool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Report group-level progress to the given sink
    pub fn with_progress(mut self, progress: Box<dyn ProgressSink + 'a>) -> Self {
        self.progress = progress;
        self
    }

    /// End guessing, hand the finder back
    pub fn into_finder(self) -> WadHashFinder {
        self.finder
    }

    /// Access the underlying finder
    pub fn finder(&self) -> &WadHashFinder {
        &self.finder
    }

    fn cancelled(&self) -> bool {
        self.cancel.is_some_and(|c| c.load(Ordering::Relaxed))
    }

    /// Run a substitution strategy (the grep strategy needs archive data,
    /// see [grep_wad()](Self::grep_wad))
    ///
    /// Return `false` when interrupted by the cancel flag.
    pub fn run(&mut self, strategy: Strategy) -> bool {
        match strategy {
            Strategy::Grep => true,  // driven by grep_wad()
            Strategy::Basenames => self.substitute_basenames(),
            Strategy::Words => self.substitute_basename_words(),
            Strategy::Numbers => self.substitute_numbers(),
            Strategy::Extensions => self.substitute_extensions(),
            Strategy::RegionLang => self.substitute_region_lang(),
            Strategy::Plugin => self.substitute_plugin(),
            Strategy::SkinNum => self.substitute_skin_numbers(),
            Strategy::Character => self.substitute_character(),
            Strategy::Prefixes => self.check_basename_prefixes(),
        }
    }

    /// Run formats against a candidate generator, with progress and cancel
    /// checks between groups
    fn drive<F: Fn(&str) -> Vec<String>>(&mut self, strategy: Strategy, formats: Vec<String>, generate: F) -> bool {
        let total = formats.len();
        for (done, fmt) in formats.iter().enumerate() {
            if self.cancelled() {
                return false;
            }
            for candidate in generate(fmt) {
                self.finder.check(&candidate);
            }
            self.progress.on_progress(strategy.name(), done + 1, total);
        }
        true
    }

    /// Known paths, collected to decouple iteration from insertions
    fn known_paths(&self) -> Vec<String> {
        self.finder.known.iter().map(|(_, p)| p.to_string()).collect()
    }

    /// All directories appearing in known paths, including intermediate ones
    fn directory_list(&self) -> Vec<String> {
        let dirname = |p: &String| p.rsplit_once('/').map(|(d, _)| d.to_string());
        let mut dirs = HashSet::new();
        let mut bases: HashSet<String> = self.known_paths().iter().filter_map(dirname).collect();
        while !bases.is_empty() {
            let parents: HashSet<String> = bases.iter()
                .filter_map(dirname)
                .filter(|d| !dirs.contains(d))
                .collect();
            dirs.extend(bases);
            bases = parents;
        }
        let mut dirs: Vec<String> = dirs.into_iter().collect();
        dirs.sort();
        dirs
    }

    /// Word tokens from known paths, without extensions and long numbers
    fn build_wordlist(&self) -> Vec<String> {
        let re_number = Regex::new(r"^[0-9]{3,}$").expect("static regex");
        let mut words = HashSet::new();
        for path in self.known_paths() {
            let mut parts: Vec<&str> = path.split(['/', '_', '.', '-']).collect();
            parts.pop();  // drop the extension token
            words.extend(parts.into_iter().map(str::to_string));
        }
        let mut words: Vec<String> = words.into_iter()
            .filter(|w| !w.is_empty() && !re_number.is_match(w))
            .collect();
        words.sort();
        words
    }

    /// Check every known basename in every known directory
    pub fn substitute_basenames(&mut self) -> bool {
        let names: HashSet<String> = self.known_paths()
            .iter()
            .filter_map(|p| p.rsplit_once('/').map(|(_, b)| b.to_string()))
            .collect();
        let dirs = self.directory_list();
        log::debug!("substitute basenames: {} basenames, {} directories", names.len(), dirs.len());

        let mut names: Vec<String> = names.into_iter().collect();
        names.sort();
        self.drive(Strategy::Basenames, names, |name| {
            dirs.iter().map(|dir| format!("{dir}/{name}")).collect()
        })
    }

    /// Replace each basename word with every wordlist word
    pub fn substitute_basename_words(&mut self) -> bool {
        let words = self.build_wordlist();
        let mut formats = HashSet::new();
        for path in self.known_paths() {
            for (start, end) in basename_word_spans(&path) {
                formats.insert(format!("{}{{}}{}", &path[..start], &path[end..]));
            }
        }
        let mut formats: Vec<String> = formats.into_iter().collect();
        formats.sort();
        log::debug!("substitute basename words: {} formats, {} words", formats.len(), words.len());

        self.drive(Strategy::Words, formats, |fmt| {
            words.iter().map(|w| fmt.replacen("{}", w, 1)).collect()
        })
    }

    /// Re-enumerate numbers appearing in basenames
    pub fn substitute_numbers(&mut self) -> bool {
        let re_number = Regex::new(r"[0-9]+").expect("static regex");
        let mut formats = HashSet::new();
        for path in self.known_paths() {
            let base_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
            if !path[base_start..].contains('.') {
                continue;
            }
            for m in re_number.find_iter(&path[base_start..]) {
                let (start, end) = (base_start + m.start(), base_start + m.end());
                formats.insert(format!("{}{{}}{}", &path[..start], &path[end..]));
            }
        }
        let mut formats: Vec<String> = formats.into_iter().collect();
        formats.sort();
        log::debug!("substitute numbers: {} formats, nmax = {}", formats.len(), self.number_max);

        let nmax = self.number_max;
        self.drive(Strategy::Numbers, formats, |fmt| {
            (0..nmax).map(|n| fmt.replacen("{}", &n.to_string(), 1)).collect()
        })
    }

    /// Swap file extensions against the known extension set
    pub fn substitute_extensions(&mut self) -> bool {
        let mut prefixes = HashSet::new();
        let mut extensions = HashSet::new();
        for path in self.known_paths() {
            if let Some((prefix, ext)) = path.rsplit_once('.') {
                prefixes.insert(prefix.to_string());
                extensions.insert(ext.to_string());
            }
        }
        let mut prefixes: Vec<String> = prefixes.into_iter().collect();
        prefixes.sort();
        log::debug!("substitute extensions: {} prefixes, {} extensions", prefixes.len(), extensions.len());

        self.drive(Strategy::Extensions, prefixes, |prefix| {
            extensions.iter().map(|ext| format!("{prefix}.{ext}")).collect()
        })
    }

    /// Substitute region and language segments
    pub fn substitute_region_lang(&mut self) -> bool {
        // Plugin paths carry a region and a language component
        let re_plugin = Regex::new(r"^plugins/([^/]+)/[^/]+/[^/]+/(.*)$").expect("static regex");
        let plugin_formats: Vec<(String, String)> = self.known_paths()
            .iter()
            .filter_map(|p| {
                let captures = re_plugin.captures(p)?;
                Some((captures[1].to_string(), captures[2].to_string()))
            })
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let mut region_langs: Vec<String> = Vec::new();
        for region in REGIONS.iter().copied().chain(["global"]) {
            for lang in LANGUAGES.iter().copied().chain(["default"]) {
                region_langs.push(format!("{region}/{lang}"));
            }
        }
        log::debug!("substitute region and lang: {} formats", plugin_formats.len());

        let done = self.drive(Strategy::RegionLang, region_langs, |region_lang| {
            plugin_formats.iter()
                .map(|(plugin, rest)| format!("plugins/{plugin}/{region_lang}/{rest}"))
                .collect()
        });
        if !done {
            return false;
        }

        // Game paths only carry a language token
        let lang_formats: Vec<String> = {
            let mut formats = HashSet::new();
            for path in self.known_paths() {
                for lang in LANGUAGES {
                    if path.contains(lang) {
                        formats.insert(path.replace(lang, "{}"));
                    }
                }
            }
            formats.into_iter().collect()
        };
        self.drive(Strategy::RegionLang, lang_formats, |fmt| {
            LANGUAGES.iter().map(|lang| fmt.replace("{}", lang)).collect()
        })
    }

    /// Swap the plugin name segment
    pub fn substitute_plugin(&mut self) -> bool {
        let paths: Vec<String> = self.known_paths()
            .into_iter()
            .filter(|p| p.starts_with("plugins/"))
            .collect();
        let plugins: HashSet<String> = paths.iter()
            .filter_map(|p| p.split('/').nth(1).map(str::to_string))
            .collect();
        let formats: HashSet<String> = paths.iter()
            .filter_map(|p| {
                let rest = p.strip_prefix("plugins/")?;
                let (_, rest) = rest.split_once('/')?;
                Some(format!("plugins/{{}}/{rest}"))
            })
            .collect();
        let mut formats: Vec<String> = formats.into_iter().collect();
        formats.sort();
        log::debug!("substitute plugin: {} formats, {} plugins", formats.len(), plugins.len());

        self.drive(Strategy::Plugin, formats, |fmt| {
            plugins.iter().map(|p| fmt.replacen("{}", p, 1)).collect()
        })
    }

    /// Recombine `skinNN` segments of character paths
    pub fn substitute_skin_numbers(&mut self) -> bool {
        let re_skin = Regex::new(r"/characters/([^/]+)/skins/(base|skin\d+)/").expect("static regex");
        // char -> (skins, formats)
        let mut characters: HashMap<String, (HashSet<String>, HashSet<String>)> = HashMap::new();
        for path in self.known_paths() {
            let captures = match re_skin.captures(&path) {
                Some(captures) => captures,
                None => continue,
            };
            if &captures[1] == "sightward" {
                continue;
            }
            let skin = captures[2].to_string();
            let entry = characters.entry(captures[1].to_string()).or_default();
            entry.1.insert(path.replace(&skin, "{}"));
            entry.0.insert(skin);
        }
        log::debug!("substitute skin numbers: {} characters", characters.len());

        let total = characters.len();
        for (done, (_, (skins, formats))) in characters.into_iter().enumerate() {
            if self.cancelled() {
                return false;
            }
            for fmt in &formats {
                for skin in &skins {
                    self.finder.check(&fmt.replace("{}", skin));
                }
            }
            self.progress.on_progress(Strategy::SkinNum.name(), done + 1, total);
        }
        true
    }

    /// Swap the character segment of `assets/` and `data/` paths
    pub fn substitute_character(&mut self) -> bool {
        let re_char = Regex::new(r"^(?:assets|data)/characters/([^/]+)/").expect("static regex");
        let mut characters = HashSet::new();
        let mut formats = HashSet::new();
        for path in self.known_paths() {
            if let Some(captures) = re_char.captures(&path) {
                let name = captures[1].to_string();
                formats.insert(path.replace(&name, "{}"));
                characters.insert(name);
            }
        }
        let mut formats: Vec<String> = formats.into_iter().collect();
        formats.sort();
        log::debug!("substitute characters: {} formats, {} characters", formats.len(), characters.len());

        self.drive(Strategy::Character, formats, |fmt| {
            characters.iter().map(|c| fmt.replace("{}", c)).collect()
        })
    }

    /// Prepend known resolution prefixes to every basename
    pub fn check_basename_prefixes(&mut self) -> bool {
        const PREFIXES: [&str; 5] = ["2x_", "2x_sd_", "4x_", "4x_sd_", "sd_"];
        let paths = self.known_paths();
        log::debug!("check basename prefixes: {} prefixes on {} paths", PREFIXES.len(), paths.len());

        self.drive(Strategy::Prefixes, paths, |path| {
            match path.rsplit_once('/') {
                Some((dir, base)) => PREFIXES.iter().map(|p| format!("{dir}/{p}{base}")).collect(),
                None => PREFIXES.iter().map(|p| format!("{p}{path}")).collect(),
            }
        })
    }

    /// Mine candidate paths from an archive's decoded content
    ///
    /// Return `false` when interrupted by the cancel flag.
    pub fn grep_wad<R: Read + Seek>(&mut self, wad: &mut WadReader<R>) -> bool {
        let entries: Vec<riftkit_wad::WadEntry> = wad.entries().to_vec();
        let total = entries.len();
        for (done, entry) in entries.iter().enumerate() {
            if self.cancelled() {
                return false;
            }
            self.progress.on_progress(Strategy::Grep.name(), done + 1, total);

            if entry.is_symlink() {
                continue;
            }
            let ext = self.finder.known.get(entry.path.hash)
                .and_then(|p| p.rsplit_once('.').map(|(_, e)| e.to_string()))
                .or_else(|| wad.sniff_entry_extension(entry).map(str::to_string));
            if ext.as_deref().is_some_and(|e| BINARY_EXTENSIONS.contains(&e)) {
                continue;
            }
            let data = match wad.read_entry(entry) {
                Ok(data) => data,
                Err(_) => continue,
            };
            if ext.as_deref() == Some("bin") {
                self.grep_prop_strings(&data);
            } else {
                self.grep_data(&data);
            }
        }
        true
    }

    /// Scan property binary data for length-prefixed path strings
    fn grep_prop_strings(&mut self, data: &[u8]) {
        let re = BytesRegex::new(r"(?:ASSETS|DATA|Characters|Shaders|Maps/MapGeometry)/")
            .expect("static regex");
        for m in re.find_iter(data) {
            let i = m.start();
            if i < 2 {
                continue;
            }
            let n = u16::from_le_bytes([data[i - 2], data[i - 1]]) as usize;
            let path = match data.get(i..i + n).and_then(|s| std::str::from_utf8(s).ok()) {
                Some(path) => path.to_ascii_lowercase(),
                None => continue,
            };
            if path.starts_with("characters") {
                self.finder.check(&format!("assets/{path}"));
                self.finder.check(&format!("data/{path}"));
            } else if let Some(stem) = path.strip_suffix(".lua") {
                self.finder.check(&format!("{stem}.luabin"));
                self.finder.check(&format!("{stem}.luabin64"));
            } else if path.starts_with("shaders") {
                self.finder.check(&format!("assets/shaders/generated/{path}.ps_2_0"));
                self.finder.check(&format!("assets/shaders/generated/{path}.vs_2_0"));
            } else if path.starts_with("maps") {
                self.finder.check(&format!("data/{path}.mapgeo"));
                self.finder.check(&format!("data/{path}.materials.bin"));
            } else {
                self.finder.check(&path);
                if let Some(stem) = path.strip_suffix(".png") {
                    self.finder.check(&format!("{stem}.dds"));
                }
            }
        }
    }

    /// Scan arbitrary text-like data for path-looking strings
    fn grep_data(&mut self, data: &[u8]) {
        let re_path = BytesRegex::new(r"(?:ASSETS|DATA|DATA_SOON|Global|LEVELS|UX)/[0-9a-zA-Z_. /-]+")
            .expect("static regex");
        let mut paths = HashSet::new();
        for m in re_path.find_iter(data) {
            let path = String::from_utf8_lossy(m.as_bytes()).to_ascii_lowercase();
            paths.insert(path.replace("data_soon/", "data/"));
            // Strings are often length-prefixed, recover the exact candidate
            let pos = m.start();
            if pos >= 2 {
                let mut n = u16::from_le_bytes([data[pos - 2], data[pos - 1]]) as usize;
                if n == 0 && pos >= 4 {
                    n = u32::from_le_bytes([data[pos - 4], data[pos - 3], data[pos - 2], data[pos - 1]]) as usize;
                }
                if n < m.len() {
                    let path = String::from_utf8_lossy(&m.as_bytes()[..n]).to_ascii_lowercase();
                    paths.insert(path.replace("data_soon/", "data/"));
                }
            }
        }
        for p in paths {
            if let Some(stem) = p.strip_suffix(".lua") {
                self.finder.check(&format!("{stem}.luabin"));
                self.finder.check(&format!("{stem}.luabin64"));
            } else {
                self.finder.check(&p);
            }
        }

        // Client plugin paths, possibly behind rewrite shorthands
        let re_plugin = BytesRegex::new(r"\bplugins/[0-9a-zA-Z-]+/[0-9a-zA-Z/_.@-]+")
            .expect("static regex");
        self.finder.check_iter(re_plugin.find_iter(data)
            .map(|m| String::from_utf8_lossy(m.as_bytes()).to_ascii_lowercase()));
        let re_fe = BytesRegex::new(r"\bfe/([^/\s]+)/([a-zA-Z0-9/_.@-]+)").expect("static regex");
        for c in re_fe.captures_iter(data) {
            let plugin = String::from_utf8_lossy(&c[1]).to_ascii_lowercase();
            let rest = String::from_utf8_lossy(&c[2]).to_ascii_lowercase();
            self.finder.check(&format!("plugins/rcp-fe-{plugin}/global/default/{rest}"));
        }
        let re_data = BytesRegex::new(r"/DATA/([a-zA-Z0-9/_.@-]+)").expect("static regex");
        for c in re_data.captures_iter(data) {
            let rest = String::from_utf8_lossy(&c[1]).to_ascii_lowercase();
            self.finder.check(&format!("plugins/rcp-be-lol-game-data/global/default/data/{rest}"));
        }
        let re_assets = BytesRegex::new(r"\blol-game-data/assets/([a-zA-Z0-9/_.@-]+)").expect("static regex");
        for c in re_assets.captures_iter(data) {
            let rest = String::from_utf8_lossy(&c[1]).to_ascii_lowercase();
            self.finder.check(&format!("plugins/rcp-be-lol-game-data/global/default/{rest}"));
        }
    }
}


/// Spans of word tokens in a path's basename, excluding the extension
fn basename_word_spans(path: &str) -> Vec<(usize, usize)> {
    let base_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    let stem_end = match path[base_start..].rfind('.') {
        Some(i) => base_start + i,
        None => return vec![],  // no extension, not a file name
    };
    let stem = &path[base_start..stem_end];
    let mut spans = Vec::new();
    let mut start = None;
    for (i, c) in stem.char_indices() {
        let is_sep = matches!(c, '_' | '.' | '-');
        match (start, is_sep) {
            (None, false) => start = Some(i),
            (Some(s), true) => {
                spans.push((base_start + s, base_start + i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((base_start + s, stem_end));
    }
    spans
}


#[cfg(test)]
mod tests {
    use super::*;

    fn finder_with(known: &[&str], unknown: &[&str]) -> WadHashFinder {
        let mut mapper = WadHashMapper::new();
        for path in known {
            mapper.insert(compute_path_hash(path), path.to_string());
        }
        let unknown = unknown.iter().map(|p| compute_path_hash(p)).collect();
        WadHashFinder::new(mapper, unknown)
    }

    #[test]
    fn finder_moves_hits_to_known() {
        let mut finder = finder_with(&[], &["assets/foo.png"]);
        assert_eq!(finder.unknown_len(), 1);
        assert!(!finder.check("assets/bar.png"));
        assert!(finder.check("assets/foo.png"));
        assert_eq!(finder.unknown_len(), 0);
        assert_eq!(finder.known.get(compute_path_hash("assets/foo.png")), Some("assets/foo.png"));
        // Second pass inserts nothing
        assert!(!finder.check("assets/foo.png"));
    }

    #[test]
    fn substitute_basenames_crosses_dirs_and_names() {
        let finder = finder_with(
            &["assets/a/x.png", "assets/b/y.png"],
            &["assets/a/y.png"],
        );
        let mut guesser = WadHashGuesser::new(finder);
        assert!(guesser.substitute_basenames());
        assert_eq!(guesser.finder().unknown_len(), 0);
    }

    #[test]
    fn substitute_numbers_enumerates() {
        let finder = finder_with(
            &["assets/icons/icon_12.png"],
            &["assets/icons/icon_7.png"],
        );
        let mut guesser = WadHashGuesser::new(finder);
        guesser.number_max = 100;
        assert!(guesser.substitute_numbers());
        assert_eq!(guesser.finder().unknown_len(), 0);
    }

    #[test]
    fn substitute_extensions_swaps() {
        let finder = finder_with(
            &["assets/a.png", "assets/b.dds"],
            &["assets/a.dds"],
        );
        let mut guesser = WadHashGuesser::new(finder);
        assert!(guesser.substitute_extensions());
        assert_eq!(guesser.finder().unknown_len(), 0);
    }

    #[test]
    fn substitute_words_uses_wordlist() {
        let finder = finder_with(
            &["assets/ui/icon_border.png", "assets/ui/frame_fancy.png"],
            &["assets/ui/icon_fancy.png"],
        );
        let mut guesser = WadHashGuesser::new(finder);
        assert!(guesser.substitute_basename_words());
        assert_eq!(guesser.finder().unknown_len(), 0);
    }

    #[test]
    fn substitute_character_swaps_names() {
        let finder = finder_with(
            &[
                "assets/characters/ahri/hud/ahri_circle.png",
                "assets/characters/annie/hud/annie_circle.png",
                "data/characters/akali/akali.bin",
            ],
            &["assets/characters/akali/hud/akali_circle.png"],
        );
        let mut guesser = WadHashGuesser::new(finder);
        assert!(guesser.substitute_character());
        assert_eq!(guesser.finder().unknown_len(), 0);
    }

    #[test]
    fn skin_numbers_recombine() {
        let finder = finder_with(
            &[
                "assets/characters/ahri/skins/skin01/ahri.skn",
                "assets/characters/ahri/skins/base/model.skn",
            ],
            &["assets/characters/ahri/skins/base/ahri.skn"],
        );
        let mut guesser = WadHashGuesser::new(finder);
        assert!(guesser.substitute_skin_numbers());
        assert_eq!(guesser.finder().unknown_len(), 0);
    }

    #[test]
    fn prefixes_are_prepended() {
        let finder = finder_with(
            &["assets/loot/chest.png"],
            &["assets/loot/4x_chest.png"],
        );
        let mut guesser = WadHashGuesser::new(finder);
        assert!(guesser.check_basename_prefixes());
        assert_eq!(guesser.finder().unknown_len(), 0);
    }

    #[test]
    fn region_lang_substitutes_plugin_components() {
        let finder = finder_with(
            &["plugins/rcp-fe-lol-loot/global/default/trans.json"],
            &["plugins/rcp-fe-lol-loot/euw/fr_fr/trans.json"],
        );
        let mut guesser = WadHashGuesser::new(finder);
        assert!(guesser.substitute_region_lang());
        assert_eq!(guesser.finder().unknown_len(), 0);
    }

    #[test]
    fn plugin_substitution() {
        let finder = finder_with(
            &[
                "plugins/rcp-fe-lol-loot/global/default/index.html",
                "plugins/rcp-fe-lol-champ-select/global/default/app.js",
            ],
            &["plugins/rcp-fe-lol-champ-select/global/default/index.html"],
        );
        let mut guesser = WadHashGuesser::new(finder);
        assert!(guesser.substitute_plugin());
        assert_eq!(guesser.finder().unknown_len(), 0);
    }

    #[test]
    fn cancel_stops_strategies() {
        let finder = finder_with(
            &["assets/a/x.png"],
            &["assets/a/y.png"],
        );
        let cancel = AtomicBool::new(true);
        let mut guesser = WadHashGuesser::new(finder).with_cancel(&cancel);
        assert!(!guesser.substitute_basenames());
        assert_eq!(guesser.finder().unknown_len(), 1);
    }

    #[test]
    fn word_spans_cover_stem_tokens() {
        let spans = basename_word_spans("dir/icon_border-big.png");
        let tokens: Vec<&str> = spans.iter().map(|&(s, e)| &"dir/icon_border-big.png"[s..e]).collect();
        assert_eq!(tokens, ["icon", "border", "big"]);
        assert!(basename_word_spans("dir/no_extension").is_empty());
    }

    #[test]
    fn grep_finds_length_prefixed_strings() {
        let finder = finder_with(&[], &["data/characters/ahri/ahri.bin", "assets/ux/icon.dds"]);
        let mut guesser = WadHashGuesser::new(finder);

        let mut data = Vec::new();
        let s = b"DATA/Characters/Ahri/Ahri.bin";
        data.extend_from_slice(&(s.len() as u16).to_le_bytes());
        data.extend_from_slice(s);
        data.extend_from_slice(b"\x00\x00 junk");
        guesser.grep_data(&data);

        assert!(guesser.finder().known.is_known(compute_path_hash("data/characters/ahri/ahri.bin")));
    }
}
