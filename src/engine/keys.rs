//! Name hashing and collision-free key generation.
//!
//! Keys are compared the way the binary format compares them: by the FNV-1a
//! hash of the lowercased name. A quoted key and a hash token therefore
//! collide when they denote the same hash, and `"Hero_Q"` collides with
//! `"hero_q"`. [`KeySet`] stores hashes only, which also makes every lookup
//! independent of the order keys were added in.

use crate::NameRef;
use chrono::{Local, NaiveDateTime};
use std::collections::HashSet;

/// Numeric suffixes tried by [`unique_name`] before the timestamp fallback.
pub const MAX_SUFFIX_ATTEMPTS: usize = 1000;

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over the ASCII-lowercased bytes of `text`.
pub fn fnv1a_lower(text: &str) -> u32 {
    text.bytes().fold(FNV_OFFSET, |hash, b| (hash ^ u32::from(b.to_ascii_lowercase())).wrapping_mul(FNV_PRIME))
}

/// Set of keys already present in a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySet {
    hashes: HashSet<u32>,
}

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a NameRef>) -> Self {
        let mut set = Self::new();
        for name in names {
            set.insert(name);
        }
        set
    }

    pub fn insert(&mut self, name: &NameRef) -> bool {
        self.hashes.insert(name.hash())
    }

    pub fn contains(&self, name: &NameRef) -> bool {
        self.hashes.contains(&name.hash())
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.hashes.contains(&fnv1a_lower(name))
    }

    fn contains_hash(&self, hash: u32) -> bool {
        self.hashes.contains(&hash)
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

/// `desired`, or `desired_2`, `desired_3`, ... whichever is free first.
///
/// After [`MAX_SUFFIX_ATTEMPTS`] the suffix switches to the current local time
/// (`desired_20240102T030405`), with a counter on top if even that is taken.
pub fn unique_name(desired: &str, existing: &KeySet) -> String {
    unique_name_at(desired, existing, Local::now().naive_local())
}

/// [`unique_name`] with an explicit clock for the timestamp fallback.
pub fn unique_name_at(desired: &str, existing: &KeySet, now: NaiveDateTime) -> String {
    if !existing.contains_name(desired) {
        return desired.to_string();
    }

    for n in 2..MAX_SUFFIX_ATTEMPTS + 2 {
        let candidate = format!("{desired}_{n}");
        if !existing.contains_name(&candidate) {
            return candidate;
        }
    }

    let stamped = format!("{desired}_{}", now.format("%Y%m%dT%H%M%S"));
    log::warn!("{MAX_SUFFIX_ATTEMPTS} suffixes taken for '{desired}', falling back to '{stamped}'");
    if !existing.contains_name(&stamped) {
        return stamped;
    }

    // At most `existing.len()` candidates can be taken, so this terminates.
    let mut n = 2usize;
    loop {
        let candidate = format!("{stamped}_{n}");
        if !existing.contains_name(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Fixed-width `0x%08x` token derived from `seed`, free in `existing`.
///
/// The token is the name hash of `seed`; on collision `seed#1`, `seed#2`, ...
/// are hashed in turn. If that search runs as long as the set is large, the
/// hash is stepped linearly, which must hit a free slot.
pub fn deterministic_token(seed: &str, existing: &KeySet) -> String {
    NameRef::Hash(deterministic_hash(seed, existing)).to_source()
}

pub(crate) fn deterministic_hash(seed: &str, existing: &KeySet) -> u32 {
    let mut hash = fnv1a_lower(seed);
    let mut attempt = 0usize;
    while existing.contains_hash(hash) && attempt <= existing.len() {
        attempt += 1;
        hash = fnv1a_lower(&format!("{seed}#{attempt}"));
    }
    while existing.contains_hash(hash) {
        hash = hash.wrapping_add(1);
    }
    hash
}
