use crate::{ConditionRecord, NameRef, Span};
use std::collections::HashMap;

/// Row-major 4x4 matrix of a system's `transform: mtx44` field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix44(pub [f32; 16]);

impl Matrix44 {
    pub const IDENTITY: Matrix44 =
        Matrix44([1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);

    /// Identity with the translation in the last row.
    pub fn translation(x: f32, y: f32, z: f32) -> Matrix44 {
        let mut m = Self::IDENTITY;
        m.0[12] = x;
        m.0[13] = y;
        m.0[14] = z;
        m
    }

    /// Exactly sixteen numeric values, in reading order.
    pub fn from_values<S: AsRef<str>>(values: &[S]) -> Option<Matrix44> {
        if values.len() != 16 {
            return None;
        }
        let mut out = [0.0f32; 16];
        for (slot, value) in out.iter_mut().zip(values) {
            *slot = value.as_ref().trim().parse().ok()?;
        }
        Some(Matrix44(out))
    }

    pub fn rows(&self) -> [[f32; 4]; 4] {
        let m = &self.0;
        [[m[0], m[1], m[2], m[3]], [m[4], m[5], m[6], m[7]], [m[8], m[9], m[10], m[11]], [m[12], m[13], m[14], m[15]]]
    }
}

/// Which emitter list of a system an emitter lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmitterList {
    Complex,
    Simple,
}

impl EmitterList {
    pub fn field_name(self) -> &'static str {
        match self {
            EmitterList::Complex => "complexEmitterDefinitionData",
            EmitterList::Simple => "simpleEmitterDefinitionData",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Emitter {
    pub name: String,
    pub list: EmitterList,
    pub span: Span,
}

/// Header key and `particleName` of a system that disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameMismatch {
    pub header: String,
    pub particle_name: String,
}

/// A `VfxSystemDefinitionData` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct System {
    pub key: NameRef,
    pub span: Span,
    /// Last path segment of the key, or the hash token.
    pub display_name: String,
    pub particle_name: Option<String>,
    pub particle_path: Option<String>,
    /// File order, both emitter lists interleaved by position.
    pub emitters: Vec<Emitter>,
    pub transform: Option<Matrix44>,
    pub name_mismatch: Option<NameMismatch>,
}

impl System {
    pub fn emitter(&self, name: &str) -> Option<&Emitter> {
        self.emitters.iter().find(|e| e.name == name)
    }

    pub fn emitter_names(&self) -> impl Iterator<Item = &str> {
        self.emitters.iter().map(|e| e.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverEntry {
    pub key: NameRef,
    pub target: NameRef,
    pub line: Span,
}

/// A `ResourceResolver` entry; `scope` is its header key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverTable {
    pub scope: NameRef,
    pub span: Span,
    pub entries: Vec<ResolverEntry>,
}

impl ResolverTable {
    pub fn get(&self, key: &NameRef) -> Option<&ResolverEntry> {
        self.entries.iter().find(|e| e.key.matches(key))
    }
}

/// One `PersistentEffectConditionData` item. Records that fail to decode keep
/// their span and the decode error.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionBlock {
    pub span: Span,
    pub record: Result<ConditionRecord, String>,
}

/// A `persistentEffectConditions` list and the entry that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionList {
    pub owner: Option<NameRef>,
    pub span: Span,
    pub records: Vec<ConditionBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipEvent {
    pub name: NameRef,
    pub type_name: String,
    pub effect_key: Option<NameRef>,
    pub bone_name: Option<String>,
}

/// An `mClipDataMap` entry with its `mEventDataMap` events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clip {
    pub name: NameRef,
    pub type_name: String,
    pub span: Span,
    pub events: Vec<ClipEvent>,
}

/// Everything extracted from one document revision.
#[derive(Debug, Clone, Default)]
pub struct EntityTable {
    pub systems: Vec<System>,
    pub resolvers: Vec<ResolverTable>,
    pub conditions: Vec<ConditionList>,
    pub clips: Vec<Clip>,
    by_hash: HashMap<u32, usize>,
    by_short_name: HashMap<String, usize>,
    by_particle_name: HashMap<String, usize>,
}

impl EntityTable {
    pub fn new(
        systems: Vec<System>,
        resolvers: Vec<ResolverTable>,
        conditions: Vec<ConditionList>,
        clips: Vec<Clip>,
    ) -> Self {
        let mut by_hash = HashMap::new();
        let mut by_short_name = HashMap::new();
        let mut by_particle_name = HashMap::new();
        for (idx, system) in systems.iter().enumerate() {
            by_hash.entry(system.key.hash()).or_insert(idx);
            by_short_name.entry(system.display_name.to_ascii_lowercase()).or_insert(idx);
            if let Some(name) = &system.particle_name {
                by_particle_name.entry(name.to_ascii_lowercase()).or_insert(idx);
            }
        }
        EntityTable { systems, resolvers, conditions, clips, by_hash, by_short_name, by_particle_name }
    }

    /// Resolve a user query to a system: exact key text, then hash equality
    /// (so `0x...` tokens and differently cased names work), then the last path
    /// segment, then `particleName`.
    pub fn find_system(&self, query: &str) -> Option<&System> {
        let query = query.trim();
        if let Some(system) = self.systems.iter().find(|s| s.key.as_text() == Some(query)) {
            return Some(system);
        }
        let name = NameRef::from_input(query);
        let lowered = name.to_string().to_ascii_lowercase();
        self.by_hash
            .get(&name.hash())
            .or_else(|| self.by_short_name.get(&lowered))
            .or_else(|| self.by_particle_name.get(&lowered))
            .map(|&idx| &self.systems[idx])
    }

    pub fn system_by_key(&self, key: &NameRef) -> Option<&System> {
        self.by_hash.get(&key.hash()).map(|&idx| &self.systems[idx])
    }

    /// Systems for display: those matching `pinned` first, in `pinned` order,
    /// then the rest in file order.
    pub fn pinned_first<S: AsRef<str>>(&self, pinned: &[S]) -> Vec<&System> {
        let mut out: Vec<&System> = Vec::with_capacity(self.systems.len());
        for query in pinned {
            if let Some(system) = self.find_system(query.as_ref()) {
                if !out.iter().any(|s| std::ptr::eq(*s, system)) {
                    out.push(system);
                }
            }
        }
        for system in &self.systems {
            if !out.iter().any(|s| std::ptr::eq(*s, system)) {
                out.push(system);
            }
        }
        out
    }

    /// Condition items of the first `persistentEffectConditions` list.
    pub fn condition_records(&self) -> &[ConditionBlock] {
        match self.conditions.first() {
            Some(list) => &list.records,
            None => &[],
        }
    }

    /// Resolver entry mapping `key`, from any table.
    pub fn resolve(&self, key: &NameRef) -> Option<&ResolverEntry> {
        self.resolvers.iter().find_map(|table| table.get(key))
    }

    pub fn mismatches(&self) -> impl Iterator<Item = &System> {
        self.systems.iter().filter(|s| s.name_mismatch.is_some())
    }
}
