//! Scanning, extraction and mutation engine.
//!
//! Everything in this module is a pure, synchronous function over text. The
//! stateful layer (history, selection, pending deletions) lives in
//! [`crate::EditSession`].
//!
//! ## How the parts work together
//!
//! ```text
//! text ── Outline::scan ─────────────── (scanner.rs)
//!           │   brace tokens (logos) -> blocks with heads, depth, parent
//!           v
//!        extract ──────────────────────  (extract.rs)
//!           │   Systems / Emitters / ResolverTables / Conditions / Clips
//!           v
//!        EntityTable  (read path, display)
//!
//! edit intent ── mutate::* ─────────────  (mutate.rs)
//!                  │  locate target block via Outline
//!                  │  keys.rs      unique names / hash tokens
//!                  │  condition.rs encode/decode condition records
//!                  │  resolver.rs  keep the resolver table in sync
//!                  v
//!               splice edits into the original text -> new Document
//! ```
//!
//! ## Invariants
//!
//! - No operation returns a document whose braces are unbalanced. Donor text is
//!   checked before it is spliced in; unbalanced donors are refused with
//!   `MalformedInput` and the input document is left as it was.
//! - Bytes outside the targeted block are never rewritten. All edits go through
//!   `apply_edits`, which splices replacement text into byte ranges.
//! - Insertion points follow fixed rules (end of the last block of the same
//!   kind, then before a structurally later block, then end of file), so the
//!   same input always produces the same output.
//!
//! ## Responsibilities by module
//!
//! - `scanner.rs`: string/comment-aware brace tokenizer, matching-brace search,
//!   header lookup and the `Outline` block tree.
//! - `writer.rs`: indentation-aware emission of new blocks and re-indentation
//!   of donor text.
//! - `keys.rs`: name hashing, unique names and deterministic hash tokens.
//! - `extract.rs`: builds the `EntityTable`.
//! - `resolver.rs`: resolver table lookup and idempotent mapping insertion.
//! - `condition.rs`: condition record codec.
//! - `mutate.rs`: block insert / replace / delete operations.

#[path = "engine/condition.rs"]
mod condition;
#[path = "engine/extract.rs"]
mod extract;
#[path = "engine/keys.rs"]
mod keys;
#[path = "engine/mutate.rs"]
mod mutate;
#[path = "engine/resolver.rs"]
mod resolver;
#[path = "engine/scanner.rs"]
mod scanner;
#[cfg(test)]
#[path = "engine/tests.rs"]
mod tests;
#[path = "engine/writer.rs"]
mod writer;

pub use condition::{ConditionDecodeError, decode_condition, decode_condition_block, encode_condition};
pub use extract::extract;
pub use keys::{KeySet, MAX_SUFFIX_ATTEMPTS, deterministic_token, fnv1a_lower, unique_name, unique_name_at};
pub use mutate::{
    DonorEmitter, EditGeneration, InsertedSystem, delete_condition, delete_emitters, insert_system, merge_emitters,
    replace_system_block, set_system_transform, upsert_condition,
};
pub use resolver::{TableScope, derive_short_name, ensure_mapping, scope_for};
pub use scanner::{
    Block, BlockHead, MapEntry, Outline, ScalarField, find_header, find_headers, find_matching_brace, indent_at,
    is_balanced, line_end, line_end_inclusive, line_start,
};
pub use writer::reindent;
