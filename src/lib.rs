//! Structure-preserving editing of brace-delimited visual-effect definition text.
//!
//! Documents look like this:
//!
//! ```text
//! entries: map[hash,embed] = {
//!     "Characters/Hero/Skins/Skin0/Particles/Hero_Q" = VfxSystemDefinitionData {
//!         complexEmitterDefinitionData: list[pointer] = {
//!             VfxEmitterDefinitionData {
//!                 emitterName: string = "a"
//!             }
//!         }
//!         particleName: string = "Hero_Q"
//!     }
//!     "Characters/Hero/Skins/Skin0/Resources" = ResourceResolver {
//!         resourceMap: map[hash,link] = {
//!             "Hero_Q" = "Characters/Hero/Skins/Skin0/Particles/Hero_Q"
//!         }
//!     }
//! }
//! ```
//!
//! The crate never re-serialises a document from a tree. Every edit is a splice
//! into the original text, so bytes outside the edited block stay identical.
//! See [`EditSession`] for the stateful entry point and [`engine`] for the pure
//! operations it is built on.

#[macro_use]
mod macros;
mod api;
mod condition_expr;
mod config;
mod converter;
pub mod engine;
mod entity;
mod error;
mod history;

pub use api::{EditSession, Selection};
pub use condition_expr::{BoolDriver, ComparisonOp, ConditionRecord, DelayPair, FloatDriver, VfxBinding, VfxFlags};
pub use config::EngineConfig;
pub use converter::{ConversionOutput, Converter, ProcessConverter};
pub use entity::{
    Clip, ClipEvent, ConditionBlock, ConditionList, Emitter, EmitterList, EntityTable, Matrix44, NameMismatch,
    ResolverEntry, ResolverTable, System,
};
pub use error::{EngineError, ErrorKind, Result};
pub use history::{DEFAULT_HISTORY_CAPACITY, HistorySnapshot, HistoryStack};

use std::fmt;

// --- Shared primitives -------------------------------------------------------

/// Half-open byte range `[start, end)` into a document's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Start byte index (inclusive).
    pub start: usize,
    /// End byte index (exclusive).
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when `other` lies entirely within `self`.
    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        text.get(self.start..self.end).unwrap_or("")
    }
}

/// A record key or hash-typed value as written in the text: either a quoted
/// name or a fixed-width hexadecimal token.
///
/// Names are case-insensitive once hashed, so `"Hero_Q"` and the token of its
/// lowercase FNV-1a hash refer to the same thing (see [`NameRef::matches`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NameRef {
    Text(String),
    Hash(u32),
}

impl NameRef {
    pub fn text(value: impl Into<String>) -> Self {
        NameRef::Text(value.into())
    }

    /// Parse a source token: `"quoted"` (with `\"` / `\\` escapes) or `0x1a2b3c4d`.
    pub fn parse(token: &str) -> Option<NameRef> {
        let token = token.trim();
        if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
            if hex.is_empty() || hex.len() > 8 {
                return None;
            }
            return u32::from_str_radix(hex, 16).ok().map(NameRef::Hash);
        }

        let inner = token.strip_prefix('"')?.strip_suffix('"')?;
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(other) => out.push(other),
                    None => return None,
                }
            } else {
                out.push(c);
            }
        }
        Some(NameRef::Text(out))
    }

    /// Parse a desired key from user input, where quotes are optional.
    pub fn from_input(input: &str) -> NameRef {
        let trimmed = input.trim();
        match NameRef::parse(trimmed) {
            Some(name) => name,
            None => NameRef::Text(trimmed.trim_matches('"').to_string()),
        }
    }

    /// Hash used by the binary format for this name.
    pub fn hash(&self) -> u32 {
        match self {
            NameRef::Text(text) => engine::fnv1a_lower(text),
            NameRef::Hash(hash) => *hash,
        }
    }

    /// Equality under hashing: a quoted name matches its own hash token.
    pub fn matches(&self, other: &NameRef) -> bool {
        match (self, other) {
            (NameRef::Text(a), NameRef::Text(b)) => a.eq_ignore_ascii_case(b),
            _ => self.hash() == other.hash(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            NameRef::Text(text) => Some(text),
            NameRef::Hash(_) => None,
        }
    }

    /// Render as it must appear in the document.
    pub fn to_source(&self) -> String {
        match self {
            NameRef::Text(text) => {
                let mut out = String::with_capacity(text.len() + 2);
                out.push('"');
                for c in text.chars() {
                    match c {
                        '"' => out.push_str("\\\""),
                        '\\' => out.push_str("\\\\"),
                        '\n' => out.push_str("\\n"),
                        '\t' => out.push_str("\\t"),
                        _ => out.push(c),
                    }
                }
                out.push('"');
                out
            }
            NameRef::Hash(hash) => format!("0x{hash:08x}"),
        }
    }
}

impl fmt::Display for NameRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameRef::Text(text) => f.write_str(text),
            NameRef::Hash(hash) => write!(f, "0x{hash:08x}"),
        }
    }
}

/// The full text buffer plus a monotonic revision counter.
///
/// Documents are values: every mutation produces a new `Document` through
/// [`Document::revise`] instead of editing in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    text: String,
    revision: u64,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Document { text: text.into(), revision: 0 }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Successor document holding `text`.
    pub fn revise(&self, text: String) -> Document {
        Document { text, revision: self.revision + 1 }
    }

    pub fn is_balanced(&self) -> bool {
        engine::is_balanced(&self.text)
    }

    pub fn into_text(self) -> String {
        self.text
    }
}
