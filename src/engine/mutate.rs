//! Block-level edits.
//!
//! Every operation takes a [`Document`] and returns a new one, or an error with
//! the input untouched. Target blocks are located on a fresh [`Outline`] and
//! changed through [`apply_edits`], so text outside them is never rewritten.

use super::condition::{CONDITION_LIST, CONDITION_TYPE, encode_condition};
use super::extract::{EMITTER_LISTS, EMITTER_TYPE, SYSTEM_TYPE, emitter_name};
use super::keys::{KeySet, deterministic_hash, unique_name};
use super::resolver::{RESOLVER_TYPE, derive_short_name, ensure_mapping, scope_entries, scope_for};
use super::scanner::{MapEntry, Outline, indent_at, is_balanced, line_end, line_end_inclusive, line_start, strip_comment};
use super::writer::{
    BlockWriter, Edit, append_to_block, append_top_level, apply_edits, inner_indent, insert_lines, reindent,
    removal_span,
};
use crate::{ConditionRecord, Document, EngineConfig, EngineError, Matrix44, NameRef, Result, Span};
use std::collections::HashSet;

const SKIN_PROPERTIES: &str = "SkinCharacterDataProperties";

/// Emitter deletions not yet saved, keyed by system hash and emitter name.
///
/// While a pair is in here, merging an emitter of that name into that system is
/// refused, so a delete followed by a port from a stale donor cannot bring the
/// emitter back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditGeneration {
    deleted: HashSet<(u32, String)>,
}

impl EditGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_deleted(&mut self, system: &NameRef, emitter: &str) {
        self.deleted.insert((system.hash(), emitter.to_string()));
    }

    pub fn is_deleted(&self, system: &NameRef, emitter: &str) -> bool {
        self.deleted.contains(&(system.hash(), emitter.to_string()))
    }

    pub fn clear(&mut self) {
        self.deleted.clear();
    }

    pub fn len(&self) -> usize {
        self.deleted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deleted.is_empty()
    }
}

/// An emitter block to port into another system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonorEmitter {
    pub name: String,
    pub text: String,
}

impl DonorEmitter {
    /// Copy `emitter` out of `text`, including the indentation of its first
    /// line so [`reindent`] sees consistent lines.
    pub fn from_text(text: &str, emitter: &crate::Emitter) -> DonorEmitter {
        let start = line_start(text, emitter.span.start);
        DonorEmitter { name: emitter.name.clone(), text: text[start..emitter.span.end].to_string() }
    }
}

/// Result of [`insert_system`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertedSystem {
    pub document: Document,
    /// Final header key.
    pub key: NameRef,
    /// Whether `key` differs from the requested name.
    pub renamed: bool,
}

fn scan_balanced(document: &Document) -> Result<Outline> {
    let outline = Outline::scan(document.text());
    if !outline.is_balanced() {
        return Err(EngineError::malformed("document", "braces are unbalanced"));
    }
    Ok(outline)
}

fn locate_system(outline: &Outline, key: &NameRef) -> Result<usize> {
    outline
        .keyed(SYSTEM_TYPE)
        .find(|&idx| outline.block(idx).key().is_some_and(|k| k.matches(key)))
        .ok_or_else(|| EngineError::not_found(format!("system {key}")))
}

/// Move an edit computed on the whole text into the coordinates of `base`.
fn rebase(edit: Edit, base: Span) -> Edit {
    Edit::replace(Span::new(edit.span.start - base.start, edit.span.end - base.start), edit.replacement)
}

/// Drop `ResourceResolver` entries from donor text.
fn strip_resolvers(text: &str) -> String {
    let outline = Outline::scan(text);
    let mut edits: Vec<Edit> = Vec::new();
    let mut last_end = 0usize;
    for idx in outline.keyed(RESOLVER_TYPE) {
        let span = removal_span(text, outline.block(idx).span);
        if span.start >= last_end {
            last_end = span.end;
            edits.push(Edit::delete(span));
        }
    }
    apply_edits(text, edits)
}

// --- Systems ------------------------------------------------------------------

/// Insert the first system found in `system_text` under `desired_name`.
///
/// Resolver tables carried by the donor are dropped. When the name is taken by
/// any entry, or its short name already maps elsewhere in the target resolver
/// table, text keys get a numeric suffix and hash keys a fresh token. For text
/// keys, `particleName` and `particlePath` are rewritten to the final key.
/// The block goes after the line closing the last system, else before the
/// first resolver table, else at the end of the top-level entries. The
/// resolver mapping for the new key is added last.
pub fn insert_system(
    document: &Document,
    system_text: &str,
    desired_name: &str,
    config: &EngineConfig,
) -> Result<InsertedSystem> {
    let text = document.text();
    let outline = scan_balanced(document)?;
    let unit = config.indent_unit.as_str();

    if !is_balanced(system_text) {
        return Err(EngineError::malformed(desired_name, "unbalanced braces"));
    }
    let donor = strip_resolvers(system_text);
    let donor_outline = Outline::scan(&donor);
    let system_idx = donor_outline
        .keyed(SYSTEM_TYPE)
        .next()
        .ok_or_else(|| EngineError::malformed(desired_name, "no VfxSystemDefinitionData block"))?;

    let desired = NameRef::from_input(desired_name);
    let existing = KeySet::from_names(outline.entries().into_iter().filter_map(|idx| outline.block(idx).key()));
    let mapped = scope_entries(text, &outline, &scope_for(&desired));
    let key = free_key(&desired, &existing, &mapped);
    if key != desired {
        log::info!("{}", EngineError::NameCollision { name: desired.to_string(), renamed: key.to_string() });
    }

    let block_text = renamed_block(&donor, &donor_outline, system_idx, &key, unit);

    let systems: Vec<usize> = outline.keyed(SYSTEM_TYPE).collect();
    let edit = if let Some(&last) = systems.last() {
        let block = outline.block(last);
        let indent = indent_at(text, block.span.start);
        let after = if strip_comment(&text[block.span.end..line_end(text, block.span.end)]).trim().is_empty() {
            line_end_inclusive(text, block.span.end)
        } else {
            block.span.end
        };
        insert_lines(text, after, &reindent(&block_text, indent))
    } else if let Some(table) = outline.keyed(RESOLVER_TYPE).next() {
        let block = outline.block(table);
        insert_lines(text, line_start(text, block.span.start), &reindent(&block_text, indent_at(text, block.span.start)))
    } else {
        append_top_level(text, &outline, unit, |indent| reindent(&block_text, indent)[indent.len()..].to_string())
    };
    let inserted = document.revise(apply_edits(text, vec![edit]));

    let mapped = ensure_mapping(&inserted, &derive_short_name(&key), &key, &scope_for(&key), config)?;
    log::info!("inserted system {key}");
    Ok(InsertedSystem { document: document.revise(mapped.into_text()), renamed: key != desired, key })
}

/// `desired`, renamed until it is neither an entry key nor a symbolic name
/// that `mapped` already points at another target.
fn free_key(desired: &NameRef, existing: &KeySet, mapped: &[MapEntry]) -> NameRef {
    let short_taken = |key: &NameRef| {
        let short = derive_short_name(key);
        mapped.iter().any(|entry| {
            entry.key.matches(&short) && !NameRef::parse(&entry.value).is_some_and(|target| target.matches(key))
        })
    };

    let mut taken = existing.clone();
    let mut key = desired.clone();
    while taken.contains(&key) || short_taken(&key) {
        taken.insert(&key);
        key = match desired {
            NameRef::Text(name) => NameRef::Text(unique_name(name, &taken)),
            NameRef::Hash(_) => NameRef::Hash(deterministic_hash(&desired.to_string(), &taken)),
        };
    }
    key
}

/// The donor system block, from the start of its line, with its key replaced
/// and particle names following it.
fn renamed_block(donor: &str, outline: &Outline, idx: usize, key: &NameRef, unit: &str) -> String {
    let block = outline.block(idx);
    let mut edits = Vec::new();
    if let Some(span) = block.key_span() {
        edits.push(Edit::replace(span, key.to_source()));
    }

    if let NameRef::Text(full) = key {
        let short = derive_short_name(key).to_string();
        let indent = inner_indent(donor, outline, idx, unit);
        let mut missing = Vec::new();
        for (field, value) in [("particleName", short.as_str()), ("particlePath", full.as_str())] {
            let rendered = NameRef::text(value).to_source();
            match outline.scalar_field(donor, idx, field) {
                Some(f) => edits.push(Edit::replace(f.value_span, rendered)),
                None => missing.push(format!("{indent}{field}: string = {rendered}")),
            }
        }
        if !missing.is_empty() {
            edits.push(append_to_block(donor, block, &missing.join("\n")));
        }
    }

    let span = Span::new(line_start(donor, block.span.start), block.span.end);
    let edits = edits.into_iter().map(|e| rebase(e, span)).collect();
    apply_edits(span.slice(donor), edits)
}

/// Replace a system block with `new_text`, inserted as given apart from
/// surrounding whitespace.
pub fn replace_system_block(document: &Document, system: &NameRef, new_text: &str) -> Result<Document> {
    if !is_balanced(new_text) {
        return Err(EngineError::malformed(system.to_string(), "unbalanced braces"));
    }
    let outline = scan_balanced(document)?;
    let idx = locate_system(&outline, system)?;
    let edit = Edit::replace(outline.block(idx).span, new_text.trim());
    Ok(document.revise(apply_edits(document.text(), vec![edit])))
}

/// Set a system's `transform: mtx44`, adding the field at the end of the
/// system when it has none.
pub fn set_system_transform(
    document: &Document,
    system: &NameRef,
    matrix: &Matrix44,
    config: &EngineConfig,
) -> Result<Document> {
    let text = document.text();
    let outline = scan_balanced(document)?;
    let idx = locate_system(&outline, system)?;
    let block = outline.block(idx);
    let unit = config.indent_unit.as_str();

    let edit = match outline.child_field(idx, "transform") {
        Some(field) => {
            let span = outline.block(field).span;
            Edit::replace(span, render_transform(matrix, indent_at(text, span.start), unit))
        }
        None => {
            let indent = inner_indent(text, &outline, idx, unit);
            append_to_block(text, block, &format!("{indent}{}", render_transform(matrix, &indent, unit)))
        }
    };
    let new_block = apply_edits(block.span.slice(text), vec![rebase(edit, block.span)]);
    replace_system_block(document, system, &new_block)
}

fn render_transform(matrix: &Matrix44, indent: &str, unit: &str) -> String {
    let mut w = BlockWriter::new(indent, unit);
    w.open("transform: mtx44 =");
    for row in matrix.rows() {
        w.line(row.iter().map(f32::to_string).collect::<Vec<_>>().join(", "));
    }
    w.close();
    w.finish()
}

// --- Emitters -----------------------------------------------------------------

/// Remove the named emitters of `system`. A list left without emitters is
/// written as `= {}`. Returns the names actually removed.
pub fn delete_emitters<S: AsRef<str>>(
    document: &Document,
    system: &NameRef,
    names: &[S],
) -> Result<(Document, Vec<String>)> {
    let text = document.text();
    let outline = scan_balanced(document)?;
    let idx = locate_system(&outline, system)?;
    let wanted: HashSet<&str> = names.iter().map(|n| n.as_ref()).collect();

    let mut edits = Vec::new();
    let mut removed = Vec::new();
    for list in EMITTER_LISTS {
        let Some(list_idx) = outline.child_field(idx, list.field_name()) else { continue };
        let items = outline.child_items(list_idx, EMITTER_TYPE);
        let doomed: Vec<(usize, String)> = items
            .iter()
            .filter_map(|&item| emitter_name(text, &outline, item).map(|name| (item, name)))
            .filter(|(_, name)| wanted.contains(name.as_str()))
            .collect();
        if doomed.is_empty() {
            continue;
        }

        if doomed.len() == outline.children(list_idx).len() {
            edits.push(Edit::replace(outline.block(list_idx).body(), ""));
        } else {
            edits.extend(doomed.iter().map(|&(item, _)| Edit::delete(removal_span(text, outline.block(item).span))));
        }
        removed.extend(doomed.into_iter().map(|(_, name)| name));
    }

    for name in &wanted {
        if !removed.iter().any(|r| r == name) {
            log::debug!("{}", EngineError::not_found(format!("emitter {name} in {system}")));
        }
    }
    if edits.is_empty() {
        return Ok((document.clone(), removed));
    }
    Ok((document.revise(apply_edits(text, edits)), removed))
}

/// Append donor emitters to the `complexEmitterDefinitionData` list of
/// `system`, creating the list as the system's first field when absent.
///
/// Donors pending deletion from `system` in `generation`, or already present
/// by name, are skipped. Returns the names actually merged.
pub fn merge_emitters(
    document: &Document,
    system: &NameRef,
    donors: &[DonorEmitter],
    generation: &EditGeneration,
    config: &EngineConfig,
) -> Result<(Document, Vec<String>)> {
    if let Some(bad) = donors.iter().find(|d| !is_balanced(&d.text)) {
        return Err(EngineError::malformed(&bad.name, "unbalanced braces"));
    }
    let text = document.text();
    let outline = scan_balanced(document)?;
    let idx = locate_system(&outline, system)?;
    let unit = config.indent_unit.as_str();

    let mut present: HashSet<String> = EMITTER_LISTS
        .iter()
        .filter_map(|list| outline.child_field(idx, list.field_name()))
        .flat_map(|list| outline.child_items(list, EMITTER_TYPE))
        .filter_map(|item| emitter_name(text, &outline, item))
        .collect();

    let mut accepted: Vec<&DonorEmitter> = Vec::new();
    for donor in donors {
        if generation.is_deleted(system, &donor.name) {
            log::info!("not merging {} into {system}: deleted in this edit generation", donor.name);
        } else if !present.insert(donor.name.clone()) {
            log::debug!("emitter {} already in {system}", donor.name);
        } else {
            accepted.push(donor);
        }
    }
    if accepted.is_empty() {
        return Ok((document.clone(), Vec::new()));
    }

    let edit = match outline.child_field(idx, EMITTER_LISTS[0].field_name()) {
        Some(list) => {
            let indent = inner_indent(text, &outline, list, unit);
            let body = accepted.iter().map(|d| reindent(&d.text, &indent)).collect::<Vec<_>>().join("\n");
            append_to_block(text, outline.block(list), &body)
        }
        None => {
            let block = outline.block(idx);
            let indent = inner_indent(text, &outline, idx, unit);
            let item_indent = format!("{indent}{unit}");
            let body = accepted.iter().map(|d| reindent(&d.text, &item_indent)).collect::<Vec<_>>().join("\n");
            let content = format!("{indent}{}: list[pointer] = {{\n{body}\n{indent}}}", EMITTER_LISTS[0].field_name());
            if strip_comment(&text[block.open + 1..line_end(text, block.open)]).trim().is_empty() {
                insert_lines(text, line_end_inclusive(text, block.open), &content)
            } else {
                append_to_block(text, block, &content)
            }
        }
    };

    let merged = accepted.iter().map(|d| d.name.clone()).collect();
    Ok((document.revise(apply_edits(text, vec![edit])), merged))
}

// --- Conditions ---------------------------------------------------------------

/// Write `record` over the condition at `edit_index`, or append it when the
/// index is `None` or out of range. A missing condition list is created in the
/// first `SkinCharacterDataProperties` entry, or at the end of the text.
pub fn upsert_condition(
    document: &Document,
    record: &ConditionRecord,
    edit_index: Option<usize>,
    config: &EngineConfig,
) -> Result<Document> {
    let text = document.text();
    let outline = scan_balanced(document)?;
    let unit = config.indent_unit.as_str();

    let edit = match outline.fields_named(CONDITION_LIST).next() {
        Some(list) => {
            let items = outline.child_items(list, CONDITION_TYPE);
            match edit_index.and_then(|n| items.get(n)) {
                Some(&item) => {
                    let span = outline.block(item).span;
                    Edit::replace(span, encode_condition(record, indent_at(text, span.start), unit))
                }
                None => {
                    if let Some(n) = edit_index {
                        log::warn!("condition index {n} out of range ({} present), appending", items.len());
                    }
                    let indent = inner_indent(text, &outline, list, unit);
                    append_to_block(text, outline.block(list), &format!("{indent}{}", encode_condition(record, &indent, unit)))
                }
            }
        }
        None => {
            let owner = outline.keyed(SKIN_PROPERTIES).next();
            let indent = match owner {
                Some(owner) => inner_indent(text, &outline, owner, unit),
                None => String::new(),
            };
            let item_indent = format!("{indent}{unit}");
            let content = format!(
                "{indent}{CONDITION_LIST}: list2[pointer] = {{\n{item_indent}{}\n{indent}}}",
                encode_condition(record, &item_indent, unit)
            );
            match owner {
                Some(owner) => append_to_block(text, outline.block(owner), &content),
                None => {
                    log::debug!("{}", EngineError::not_found(SKIN_PROPERTIES));
                    insert_lines(text, text.len(), &content)
                }
            }
        }
    };
    Ok(document.revise(apply_edits(text, vec![edit])))
}

/// Remove the condition at `index`; the list itself stays, as `= {}` when
/// emptied.
pub fn delete_condition(document: &Document, index: usize) -> Result<Document> {
    let text = document.text();
    let outline = scan_balanced(document)?;
    let list = outline.fields_named(CONDITION_LIST).next().ok_or_else(|| EngineError::not_found(CONDITION_LIST))?;
    let items = outline.child_items(list, CONDITION_TYPE);
    let item = *items.get(index).ok_or_else(|| EngineError::not_found(format!("condition {index}")))?;

    let edit = if outline.children(list).len() == 1 {
        Edit::replace(outline.block(list).body(), "")
    } else {
        Edit::delete(removal_span(text, outline.block(item).span))
    };
    Ok(document.revise(apply_edits(text, vec![edit])))
}
