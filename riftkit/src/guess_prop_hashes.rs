//! Discovery of unknown property hashes
//!
//! Property binaries are mined by hooks registered per entry type: a hook
//! inspects decoded entries carrying name-bearing fields and derives
//! candidate entry paths or hash values from them. Candidates go through the
//! same unknown-set filter as archive paths.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use riftkit_hashes::fnv1a;
use riftkit_hashes::fnv::PropNameKind;
use riftkit_prop::{
    compute_prop_hash,
    data::*,
    propget,
    PropEntry,
    PropFile,
    PropHashMappers,
    PropHashSets,
};
use crate::utils::prop_files_from_dir;


/// Filter of candidate names against the unknown property hash sets
pub struct PropHashFinder {
    /// Unknown hashes to find
    pub hashes: PropHashSets,
    /// Hash mappers extended on hits
    pub hmappers: PropHashMappers,
    /// Callback invoked on each new hit
    on_found: fn(u32, &str),
}

impl PropHashFinder {
    pub fn new(hashes: PropHashSets, hmappers: PropHashMappers) -> Self {
        Self { hashes, hmappers, on_found: |_, _| {} }
    }

    pub fn on_found(mut self, f: fn(u32, &str)) -> Self {
        self.on_found = f;
        self
    }

    /// Return true if the given hash is still unknown
    pub fn is_unknown(&self, kind: PropNameKind, hash: u32) -> bool {
        self.hashes.get(kind).contains(&hash)
    }

    /// Get the known name for a hash
    pub fn get_str(&self, kind: PropNameKind, hash: u32) -> Option<&str> {
        self.hmappers.get(kind).get(hash)
    }

    /// Check a single name against all unknown hashes of a kind
    pub fn check_any<S: Into<String> + AsRef<str>>(&mut self, kind: PropNameKind, value: S) {
        let hash = compute_prop_hash(value.as_ref());
        if self.hashes.get_mut(kind).remove(&hash) {
            (self.on_found)(hash, value.as_ref());
            self.hmappers.get_mut(kind).insert(hash, value.into());
        }
    }

    /// Check an iterable of names against all unknown hashes of a kind
    pub fn check_any_from_iter<S: Into<String> + AsRef<str>>(&mut self, kind: PropNameKind, values: impl Iterator<Item=S>) {
        for value in values {
            self.check_any(kind, value);
        }
    }

    /// Check a single name against a given hash
    ///
    /// Return `false` if the hash remains unknown.
    pub fn check_one<S: Into<String> + AsRef<str>>(&mut self, kind: PropNameKind, hash: u32, value: S) -> bool {
        if !self.hashes.get(kind).contains(&hash) {
            return true;
        }
        if hash == compute_prop_hash(value.as_ref()) {
            self.hashes.get_mut(kind).remove(&hash);
            (self.on_found)(hash, value.as_ref());
            self.hmappers.get_mut(kind).insert(hash, value.into());
            return true;
        }
        false
    }

    /// Check an iterable of names against a given hash
    ///
    /// Return `false` if the hash remains unknown.
    pub fn check_one_from_iter<S: Into<String> + AsRef<str>>(&mut self, kind: PropNameKind, hash: u32, values: impl Iterator<Item=S>) -> bool {
        if !self.hashes.get(kind).contains(&hash) {
            return true;
        }
        for value in values {
            if self.check_one(kind, hash, value) {
                return true;
            }
        }
        false
    }

    /// Total number of unknown hashes, all kinds
    pub fn unknown_len(&self) -> usize {
        PropNameKind::VARIANTS.iter().map(|k| self.hashes.get(*k).len()).sum::<usize>()
            + self.hashes.path_value.len()
    }
}


/// A guessing hook, watching a set of entry types
pub trait GuessingHook {
    /// Entry types this hook wants to inspect
    fn entry_types(&self) -> &[TypeName];
    /// Inspect a decoded entry
    fn on_entry(&mut self, entry: &PropEntry, finder: &mut PropHashFinder);
}

/// Hook calling a closure for one or more entry types
pub struct FnHook {
    types: Vec<TypeName>,
    on_entry: Box<dyn FnMut(&PropEntry, &mut PropHashFinder)>,
}

impl FnHook {
    pub fn new(types: Vec<TypeName>, on_entry: Box<dyn FnMut(&PropEntry, &mut PropHashFinder)>) -> Self {
        Self { types, on_entry }
    }
}

impl GuessingHook for FnHook {
    fn entry_types(&self) -> &[TypeName] {
        &self.types
    }

    fn on_entry(&mut self, entry: &PropEntry, finder: &mut PropHashFinder) {
        (self.on_entry)(entry, finder)
    }
}

/// Hook deriving an entry's own path from one of its string fields
///
/// With a format, the field value is substituted into its `{}` placeholder;
/// without one, the field value is the candidate path itself.
pub struct FieldPathHook {
    types: Vec<TypeName>,
    attr: FieldName,
    format: Option<&'static str>,
}

impl FieldPathHook {
    pub fn direct(types: Vec<TypeName>, attr: FieldName) -> Self {
        Self { types, attr, format: None }
    }

    pub fn pattern(types: Vec<TypeName>, attr: FieldName, format: &'static str) -> Self {
        Self { types, attr, format: Some(format) }
    }
}

impl GuessingHook for FieldPathHook {
    fn entry_types(&self) -> &[TypeName] {
        &self.types
    }

    fn on_entry(&mut self, entry: &PropEntry, finder: &mut PropHashFinder) {
        if !finder.is_unknown(PropNameKind::EntryPath, entry.path.hash) {
            return;
        }
        let value = match entry.getv::<PropString>(self.attr) {
            Some(s) => &s.0,
            None => return,
        };
        let candidate = match self.format {
            Some(format) => format.replacen("{}", value, 1),
            None => value.clone(),
        };
        finder.check_one(PropNameKind::EntryPath, entry.path.hash, candidate);
    }
}


/// Drive guessing hooks over directories of property binaries
pub struct PropHashGuesser<'a> {
    hooks: Vec<Box<dyn GuessingHook>>,
    /// Hook indexes registered for each entry type
    registry: HashMap<TypeName, Vec<usize>>,
    finder: PropHashFinder,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> PropHashGuesser<'a> {
    pub fn new(finder: PropHashFinder) -> Self {
        Self {
            hooks: Vec::default(),
            registry: HashMap::default(),
            finder,
            cancel: None,
        }
    }

    /// Stop between files once the flag is set
    pub fn with_cancel(mut self, cancel: &'a AtomicBool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_hook(mut self, hook: Box<dyn GuessingHook>) -> Self {
        let i = self.hooks.len();
        for t in hook.entry_types().iter() {
            self.registry.entry(*t).or_default().push(i);
        }
        self.hooks.push(hook);
        self
    }

    pub fn with_fn_hook(self, types: Vec<TypeName>, on_entry: Box<dyn FnMut(&PropEntry, &mut PropHashFinder)>) -> Self {
        self.with_hook(Box::new(FnHook::new(types, on_entry)))
    }

    /// Register the standard set of hooks
    pub fn with_default_hooks(self) -> Self {
        // Types whose entry path is simply their `name` field
        const NAMED_TYPES: [&str; 7] = [
            "StaticMaterialDef",
            "UISceneData",
            "UiElementGroupButtonData",
            "UiElementGroupData",
            "UiElementGroupFramedData",
            "UiElementGroupMeterData",
            "UiElementGroupSliderData",
        ];
        let named: Vec<TypeName> = NAMED_TYPES.iter().map(|s| compute_prop_hash(s).into()).collect();

        self
            .with_hook(Box::new(FieldPathHook::direct(named, fnv1a!("name"))))
            .with_hook(Box::new(FieldPathHook::direct(vec![fnv1a!("ContextualActionData")], fnv1a!("mObjectPath"))))
            .with_hook(Box::new(FieldPathHook::direct(vec![fnv1a!("CustomShaderDef")], fnv1a!("objectPath"))))
            .with_hook(Box::new(FieldPathHook::direct(vec![fnv1a!("MapContainer")], fnv1a!("mapPath"))))
            .with_hook(Box::new(FieldPathHook::direct(vec![fnv1a!("RewardGroup")], fnv1a!("internalName"))))
            .with_hook(Box::new(FieldPathHook::direct(vec![fnv1a!("VfxSystemDefinitionData")], fnv1a!("particlePath"))))
            .with_hook(Box::new(FieldPathHook::pattern(
                vec![fnv1a!("CharacterRecord"), fnv1a!("TFTCharacterRecord")],
                fnv1a!("mCharacterName"),
                "Characters/{}/CharacterRecords/Root",
            )))
            .with_hook(Box::new(FieldPathHook::pattern(
                vec![fnv1a!("GameFontDescription")], fnv1a!("name"), "UX/Fonts/Descriptions/{}",
            )))
            .with_hook(Box::new(FieldPathHook::pattern(
                vec![fnv1a!("TooltipFormat")], fnv1a!("mObjectName"), "UX/Tooltips/{}",
            )))
            .with_hook(Box::new(FieldPathHook::pattern(
                vec![fnv1a!("X3DSharedConstantBufferDef")], fnv1a!("name"), "Shaders/SharedData/{}",
            )))
            .with_fn_hook(
                vec![fnv1a!("CharacterRecord"), fnv1a!("TFTCharacterRecord")],
                Box::new(on_character_record),
            )
            .with_fn_hook(
                vec![fnv1a!("ItemData")],
                Box::new(|entry, finder| {
                    if finder.is_unknown(PropNameKind::EntryPath, entry.path.hash) {
                        if let Some(id) = propget!(entry => itemID(PropS32)) {
                            finder.check_one(PropNameKind::EntryPath, entry.path.hash, format!("Items/{}", id.0));
                        }
                    }
                }),
            )
            .with_fn_hook(
                vec![fnv1a!("SpellObject")],
                Box::new(|entry, finder| {
                    if finder.is_unknown(PropNameKind::EntryPath, entry.path.hash) {
                        if let Some(name) = propget!(entry => mScriptName(PropString)) {
                            finder.check_one(PropNameKind::EntryPath, entry.path.hash,
                                             format!("Items/Spells/{}", name.0));
                        }
                    }
                }),
            )
            .with_fn_hook(
                vec![fnv1a!("ResourceResolver"), fnv1a!("GlobalResourceResolver")],
                Box::new(|entry, finder| {
                    if let Some(map) = propget!(entry => resourceMap(PropMap)) {
                        guess_map_keys_from_link_values(map, finder);
                    }
                }),
            )
            .with_fn_hook(
                vec![fnv1a!("AnimationGraphData")],
                Box::new(|entry, finder| {
                    if let Some(map) = propget!(entry => mClipDataMap(PropMap)(PropHash, PropStruct)) {
                        for (hash, clip_data) in map {
                            check_clip_data(hash.0.hash, clip_data, finder);
                        }
                    }
                }),
            )
    }

    /// End guessing, hand the finder back
    pub fn into_finder(self) -> PropHashFinder {
        self.finder
    }

    /// Access the underlying finder
    pub fn finder(&self) -> &PropHashFinder {
        &self.finder
    }

    /// Inspect one decoded entry with the hooks watching its type
    pub fn visit_entry(&mut self, entry: &PropEntry) {
        if let Some(indexes) = self.registry.get(&entry.ctype) {
            for i in indexes.clone() {
                self.hooks[i].on_entry(entry, &mut self.finder);
            }
        }
    }

    /// Run the hooks over all property binaries below a directory
    ///
    /// Return `false` when interrupted by the cancel flag.
    pub fn guess_dir<P: AsRef<Path>>(&mut self, root: P) -> bool {
        for path in prop_files_from_dir(root) {
            if self.cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                return false;
            }
            let scanner = match PropFile::scan_entries_from_path(&path) {
                Ok(scanner) => scanner,
                Err(e) => {
                    log::debug!("skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            let mut scan = scanner.scan();
            while let Some(Ok(item)) = scan.next() {
                if self.registry.contains_key(&item.ctype) {
                    if let Ok(entry) = item.read() {
                        self.visit_entry(&entry);
                    }
                }
            }
        }
        true
    }
}


/// Derive paths from a character record: common entries and spells
fn on_character_record(entry: &PropEntry, finder: &mut PropHashFinder) {
    let cname = match propget!(entry => mCharacterName(PropString)) {
        Some(s) => &s.0,
        None => return,
    };
    let prefix = format!("Characters/{}", cname);

    // Common entries; possible ones depend on the character subtype but
    // checking them all costs little
    finder.check_any_from_iter(PropNameKind::EntryPath, [
        prefix.clone(),
        format!("{}/CharacterRecords/Root", prefix),
        format!("{}/CharacterRecords/SLIME", prefix),
        format!("{}/CharacterRecords/URF", prefix),
        format!("{}/Skins/Meta", prefix),
        format!("{}/Skins/Root", prefix),
    ].into_iter());

    // Spell entries live under `{prefix}/Spells/`; ability spells also
    // appear with their `{ability}/{spell}` suffix in spellNames
    if let Some(names) = propget!(entry => spellNames(PropList)(PropString)) {
        let it = names.iter().map(|s| format!("{}/Spells/{}", prefix, s.0));
        finder.check_any_from_iter(PropNameKind::EntryPath, it);
        let it = names.iter().filter_map(|name| {
            let parent = name.0.split_once('/')?.0;
            if parent.is_empty() {
                None
            } else {
                Some(format!("{}/Spells/{}", prefix, parent))
            }
        });
        finder.check_any_from_iter(PropNameKind::EntryPath, it);
    }

    // extraSpells holds other spells, with a placeholder entry to skip
    if let Some(names) = propget!(entry => extraSpells(PropList)(PropString)) {
        let it = names.iter()
            .filter(|s| s.0 != "BaseSpell")
            .map(|s| format!("{}/Spells/{}", prefix, s.0));
        finder.check_any_from_iter(PropNameKind::EntryPath, it);
    }
}

/// Guess an animation clip key from the animation file path
///
/// Clip keys are the last underscore-separated components of the `.anm`
/// basename, camel-cased at underscores.
fn check_clip_data(hash: u32, data: &PropStruct, finder: &mut PropHashFinder) -> Option<()> {
    if !finder.is_unknown(PropNameKind::HashValue, hash) {
        return None;
    }
    let path = &propget!(data => mAnimationResourceData(PropEmbed).mAnimationFilePath(PropString))?.0;
    let path = path.strip_suffix(".anm")?;
    let (_, path) = path.rsplit_once('/')?;
    let path: String = path.chars().scan(false, |upper, c| {
        if c == '_' {
            *upper = true;
            Some('_')
        } else if *upper {
            *upper = false;
            Some(c.to_ascii_uppercase())
        } else {
            Some(c)
        }
    }).collect();
    let it = path.rmatch_indices('_').map(|(i, _)| &path[i + 1..]);
    finder.check_one_from_iter(PropNameKind::HashValue, hash, it);
    None
}

/// Guess hash map keys from the paths of the entries their values link to
fn guess_map_keys_from_link_values(map: &PropMap, finder: &mut PropHashFinder) {
    if let Some(pairs) = propget!(map => (PropHash, PropLink)) {
        for (k, v) in pairs.iter() {
            if finder.is_unknown(PropNameKind::HashValue, k.0.hash) {
                if let Some(target) = finder.get_str(PropNameKind::EntryPath, v.0.hash) {
                    let target = target.to_owned();
                    if finder.check_one(PropNameKind::HashValue, k.0.hash, &target) {
                        continue;
                    }
                    if let Some((_, base)) = target.rsplit_once('/') {
                        finder.check_one(PropNameKind::HashValue, k.0.hash, base);
                    }
                }
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn finder_with_unknown_entry(name: &str) -> PropHashFinder {
        let mut hashes = PropHashSets::default();
        hashes.entry_path.insert(compute_prop_hash(name));
        PropHashFinder::new(hashes, PropHashMappers::default())
    }

    #[test]
    fn check_any_moves_hits() {
        let mut finder = finder_with_unknown_entry("Characters/Ahri");
        finder.check_any(PropNameKind::EntryPath, "Characters/Nope");
        assert_eq!(finder.unknown_len(), 1);
        finder.check_any(PropNameKind::EntryPath, "Characters/Ahri");
        assert_eq!(finder.unknown_len(), 0);
        assert_eq!(
            finder.get_str(PropNameKind::EntryPath, compute_prop_hash("Characters/Ahri")),
            Some("Characters/Ahri")
        );
        // Idempotent on a second pass
        finder.check_any(PropNameKind::EntryPath, "Characters/Ahri");
        assert_eq!(finder.unknown_len(), 0);
    }

    #[test]
    fn check_one_requires_matching_hash() {
        let mut finder = finder_with_unknown_entry("Items/1001");
        let hash = compute_prop_hash("Items/1001");
        assert!(!finder.check_one(PropNameKind::EntryPath, hash, "Items/1002"));
        assert!(finder.check_one(PropNameKind::EntryPath, hash, "Items/1001"));
        // Known hashes short-circuit to true
        assert!(finder.check_one(PropNameKind::EntryPath, hash, "anything"));
    }

    #[test]
    fn field_path_hook_derives_entry_path() {
        // Entry of type VfxSystemDefinitionData with particlePath field
        let ctype: TypeName = compute_prop_hash("VfxSystemDefinitionData").into();
        let path = "Characters/Ahri/VFX/Orb";
        let entry_hash = compute_prop_hash(path);

        let mut fields = Vec::new();
        fields.extend_from_slice(&compute_prop_hash("particlePath").to_le_bytes());
        fields.push(16);  // String
        fields.extend_from_slice(&(path.len() as u16).to_le_bytes());
        fields.extend_from_slice(path.as_bytes());

        let mut data = Vec::new();
        data.extend_from_slice(b"PROP");
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&ctype.hash.to_le_bytes());
        data.extend_from_slice(&(4 + 2 + fields.len() as u32).to_le_bytes());
        data.extend_from_slice(&entry_hash.to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&fields);

        let prop = PropFile::from_slice(&data).unwrap();
        let finder = finder_with_unknown_entry(path);
        let mut guesser = PropHashGuesser::new(finder).with_default_hooks();
        guesser.visit_entry(&prop.entries[0]);
        assert_eq!(guesser.finder().unknown_len(), 0);
    }
}
