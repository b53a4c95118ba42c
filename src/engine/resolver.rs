//! Resolver tables: `ResourceResolver` entries whose `resourceMap` maps a short
//! symbolic name to the key of a system.
//!
//! A system inserted through the engine gets exactly one mapping, in the table
//! of its path family. [`ensure_mapping`] is idempotent: asking for a mapping
//! that already exists returns the document untouched.

use super::scanner::{MapEntry, Outline};
use super::writer::{BlockWriter, append_to_block, append_top_level, apply_edits, inner_indent};
use crate::{Document, EngineConfig, EngineError, NameRef, Result};
use std::fmt;

pub(crate) const RESOLVER_TYPE: &str = "ResourceResolver";
pub(crate) const RESOURCE_MAP: &str = "resourceMap";

/// Which resolver table a mapping belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableScope {
    /// The table keyed by this path, or failing that, one in the same family.
    Exact(String),
    /// Whichever table comes first in the document.
    First,
}

impl fmt::Display for TableScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableScope::Exact(scope) => write!(f, "\"{scope}\""),
            TableScope::First => f.write_str("first table"),
        }
    }
}

/// Last `/` segment of a quoted key. Hash keys have no segments and are kept.
pub fn derive_short_name(key: &NameRef) -> NameRef {
    match key {
        NameRef::Text(text) => NameRef::Text(text.rsplit('/').next().unwrap_or(text).to_string()),
        NameRef::Hash(_) => key.clone(),
    }
}

/// Scope of the table a system key should be mapped in.
///
/// `Characters/Hero/Skins/Skin0/Particles/Hero_Q` maps into
/// `Characters/Hero/Skins/Skin0/Resources`. Keys without a path go to the first
/// table.
pub fn scope_for(key: &NameRef) -> TableScope {
    match key.as_text().and_then(path_family) {
        Some(family) => TableScope::Exact(format!("{family}/Resources")),
        None => TableScope::First,
    }
}

/// Path up to a `Particles` segment, or up to the last segment.
fn path_family(path: &str) -> Option<&str> {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() < 2 {
        return None;
    }
    let cut = segments.iter().position(|s| s.eq_ignore_ascii_case("particles")).unwrap_or(segments.len() - 1);
    if cut == 0 {
        return None;
    }
    let len = segments[..cut].iter().map(|s| s.len()).sum::<usize>() + cut - 1;
    Some(&path[..len])
}

fn select_table(outline: &Outline, scope: &TableScope) -> Option<usize> {
    let tables: Vec<usize> = outline.keyed(RESOLVER_TYPE).collect();
    match scope {
        TableScope::First => tables.first().copied(),
        TableScope::Exact(name) => {
            let wanted = NameRef::text(name.as_str());
            let family = path_family(name);
            tables.iter().copied().find(|&t| outline.block(t).key().is_some_and(|k| wanted.matches(k))).or_else(|| {
                let family = family?;
                tables.iter().copied().find(|&t| {
                    let table_family = outline.block(t).key().and_then(NameRef::as_text).and_then(path_family);
                    table_family.is_some_and(|f| f.eq_ignore_ascii_case(family))
                })
            })
        }
    }
}

/// Entries of the `resourceMap` that [`ensure_mapping`] writes to for `scope`.
pub(crate) fn scope_entries(text: &str, outline: &Outline, scope: &TableScope) -> Vec<MapEntry> {
    select_table(outline, scope)
        .and_then(|table| outline.child_field(table, RESOURCE_MAP))
        .map(|map| outline.map_entries(text, map))
        .unwrap_or_default()
}

fn write_map(w: &mut BlockWriter<'_>, key: &NameRef, target: &NameRef) {
    w.open(format!("{RESOURCE_MAP}: map[hash,link] ="));
    w.line(format!("{} = {}", key.to_source(), target.to_source()));
    w.close();
}

/// Make sure the table selected by `scope` maps `key` to `target`.
///
/// The new line goes before the closing brace of the table's `resourceMap`,
/// indented like the existing entries. A table without `resourceMap` gets one,
/// and when no table matches, a minimal one is appended as a top-level entry.
/// Other tables and all system blocks are left alone.
pub fn ensure_mapping(
    document: &Document,
    key: &NameRef,
    target: &NameRef,
    scope: &TableScope,
    config: &EngineConfig,
) -> Result<Document> {
    let text = document.text();
    let outline = Outline::scan(text);
    if !outline.is_balanced() {
        return Err(EngineError::malformed(RESOLVER_TYPE, "document braces are unbalanced"));
    }
    let unit = config.indent_unit.as_str();

    let edit = match select_table(&outline, scope) {
        Some(table) => match outline.child_field(table, RESOURCE_MAP) {
            Some(map) => {
                if outline.map_entries(text, map).iter().any(|entry| entry.key.matches(key)) {
                    log::debug!("resolver mapping for {key} already present");
                    return Ok(document.clone());
                }
                let indent = inner_indent(text, &outline, map, unit);
                let line = format!("{indent}{} = {}", key.to_source(), target.to_source());
                append_to_block(text, outline.block(map), &line)
            }
            None => {
                let indent = inner_indent(text, &outline, table, unit);
                let mut w = BlockWriter::new(&indent, unit);
                write_map(&mut w, key, target);
                append_to_block(text, outline.block(table), &format!("{indent}{}", w.finish()))
            }
        },
        None => {
            log::debug!("{}", EngineError::not_found(format!("resolver table for {scope}")));
            let name = match scope {
                TableScope::Exact(name) => name.clone(),
                TableScope::First => config.default_resolver_scope.clone(),
            };
            append_top_level(text, &outline, unit, |indent| {
                let mut w = BlockWriter::new(indent, unit);
                w.open(format!("{} = {RESOLVER_TYPE}", NameRef::text(name).to_source()));
                write_map(&mut w, key, target);
                w.close();
                w.finish()
            })
        }
    };

    log::info!("mapped {key} -> {target} ({scope})");
    Ok(document.revise(apply_edits(text, vec![edit])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    const TABLE: &str = r#"entries: map[hash,embed] = {
    "Characters/Hero/Skins/Skin0/Resources" = ResourceResolver {
        resourceMap: map[hash,link] = {
            "Hero_Q" = "Characters/Hero/Skins/Skin0/Particles/Hero_Q"
        }
    }
}
"#;

    fn map(doc: &Document, key: &str, target: &str, scope: &TableScope) -> Result<Document> {
        ensure_mapping(doc, &NameRef::text(key), &NameRef::text(target), scope, &EngineConfig::default())
    }

    #[test]
    fn short_name_and_scope_from_key() {
        let key = NameRef::text("Characters/Hero/Skins/Skin0/Particles/Hero_Q");
        assert_eq!(derive_short_name(&key), NameRef::text("Hero_Q"));
        assert_eq!(scope_for(&key), TableScope::Exact("Characters/Hero/Skins/Skin0/Resources".into()));
        assert_eq!(scope_for(&NameRef::text("Maps/Shared/Glow")), TableScope::Exact("Maps/Shared/Resources".into()));
        assert_eq!(scope_for(&NameRef::text("Hero_W")), TableScope::First);
        assert_eq!(derive_short_name(&NameRef::Hash(9)), NameRef::Hash(9));
        assert_eq!(scope_for(&NameRef::Hash(9)), TableScope::First);
    }

    #[test]
    fn adds_exactly_one_entry_to_the_table() {
        let doc = Document::new(TABLE);
        let out = map(&doc, "Hero_W", "Hero_W", &TableScope::First).unwrap();
        let expected = TABLE.replace(
            "Particles/Hero_Q\"\n",
            "Particles/Hero_Q\"\n            \"Hero_W\" = \"Hero_W\"\n",
        );
        assert_eq!(out.text(), expected);
        assert_eq!(out.revision(), 1);
    }

    #[test]
    fn mapping_is_idempotent() {
        let doc = Document::new(TABLE);
        let once = map(&doc, "Hero_W", "Hero_W", &TableScope::First).unwrap();
        let twice = map(&once, "Hero_W", "Hero_W", &TableScope::First).unwrap();
        assert_eq!(once.text(), twice.text());

        let hashed = NameRef::Hash(NameRef::text("Hero_Q").hash());
        let again = ensure_mapping(&doc, &hashed, &NameRef::text("x"), &TableScope::First, &EngineConfig::default())
            .unwrap();
        assert_eq!(again, doc);
    }

    #[test]
    fn picks_table_of_the_same_family() {
        let text = TABLE.replace(
            "}\n}\n",
            "}\n    \"Characters/Hero/Skins/Skin1/Resources\" = ResourceResolver {\n        resourceMap: map[hash,link] = {}\n    }\n}\n",
        );
        let doc = Document::new(text.as_str());
        let scope = TableScope::Exact("Characters/Hero/Skins/Skin1/Other".into());
        let out = map(&doc, "Hero_E", "Characters/Hero/Skins/Skin1/Particles/Hero_E", &scope).unwrap();
        assert!(out.text().contains(
            "resourceMap: map[hash,link] = {\n            \"Hero_E\" = \"Characters/Hero/Skins/Skin1/Particles/Hero_E\"\n        }"
        ));
        assert_eq!(out.text().matches("\"Hero_E\"").count(), 1);
        assert!(out.text().starts_with(TABLE.trim_end_matches("}\n")));
    }

    #[test]
    fn creates_resource_map_in_bare_table() {
        let doc = Document::new("\"Scope/Resources\" = ResourceResolver {\n}");
        let out = map(&doc, "k", "t", &TableScope::Exact("Scope/Resources".into())).unwrap();
        assert_eq!(
            out.text(),
            "\"Scope/Resources\" = ResourceResolver {\n    resourceMap: map[hash,link] = {\n        \"k\" = \"t\"\n    }\n}"
        );
    }

    #[test]
    fn creates_table_when_none_exists() {
        let doc = Document::new("entries: map[hash,embed] = {\n}\n");
        let out = map(&doc, "Hero_W", "Hero_W", &TableScope::First).unwrap();
        assert_eq!(
            out.text(),
            "entries: map[hash,embed] = {\n    \"Resources\" = ResourceResolver {\n        resourceMap: map[hash,link] = {\n            \"Hero_W\" = \"Hero_W\"\n        }\n    }\n}\n"
        );
    }

    #[test]
    fn refuses_unbalanced_document() {
        let doc = Document::new("\"a\" = ResourceResolver {");
        let err = map(&doc, "k", "t", &TableScope::First).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }
}
