//! Document -> [`EntityTable`].
//!
//! One scan builds the outline; each entity kind is then read off it in a
//! single walk. Extraction never fails: blocks that cannot be read are logged
//! and skipped, and condition items that do not decode keep their error.

use super::condition::{CONDITION_LIST, CONDITION_TYPE, decode_condition};
use super::resolver::{RESOLVER_TYPE, RESOURCE_MAP, derive_short_name};
use super::scanner::Outline;
use crate::{
    Clip, ClipEvent, ConditionBlock, ConditionList, Document, Emitter, EmitterList, EntityTable, Matrix44, NameMismatch,
    NameRef, ResolverEntry, ResolverTable, System,
};

pub(crate) const SYSTEM_TYPE: &str = "VfxSystemDefinitionData";
pub(crate) const EMITTER_TYPE: &str = "VfxEmitterDefinitionData";
pub(crate) const EMITTER_LISTS: [EmitterList; 2] = [EmitterList::Complex, EmitterList::Simple];

pub fn extract(document: &Document) -> EntityTable {
    let text = document.text();
    let outline = Outline::scan(text);
    if !outline.is_balanced() {
        log::warn!("extracting from a document with unbalanced braces (revision {})", document.revision());
    }

    let systems = outline.keyed(SYSTEM_TYPE).map(|idx| system(text, &outline, idx)).collect::<Vec<_>>();
    let resolvers = outline.keyed(RESOLVER_TYPE).map(|idx| resolver(text, &outline, idx)).collect();
    let conditions = outline.fields_named(CONDITION_LIST).map(|idx| conditions(text, &outline, idx)).collect();
    let clips = outline.fields_named("mClipDataMap").flat_map(|idx| clips(text, &outline, idx)).collect();

    log::debug!("extracted {} systems from revision {}", systems.len(), document.revision());
    EntityTable::new(systems, resolvers, conditions, clips)
}

/// `emitterName` of an emitter item.
pub(crate) fn emitter_name(text: &str, outline: &Outline, idx: usize) -> Option<String> {
    outline.scalar_field(text, idx, "emitterName")?.string()
}

fn system(text: &str, outline: &Outline, idx: usize) -> System {
    let block = outline.block(idx);
    let key = block.key().cloned().unwrap_or(NameRef::Hash(0));

    let mut emitters = Vec::new();
    for list in EMITTER_LISTS {
        let Some(list_idx) = outline.child_field(idx, list.field_name()) else { continue };
        for item in outline.child_items(list_idx, EMITTER_TYPE) {
            match emitter_name(text, outline, item) {
                Some(name) => emitters.push(Emitter { name, list, span: outline.block(item).span }),
                None => log::debug!("emitter without emitterName in {key} at byte {}", outline.block(item).span.start),
            }
        }
    }
    emitters.sort_by_key(|e| e.span.start);

    let particle_name = outline.scalar_field(text, idx, "particleName").and_then(|f| f.string());
    let particle_path = outline.scalar_field(text, idx, "particlePath").and_then(|f| f.string());
    let transform = outline.child_field(idx, "transform").and_then(|t| Matrix44::from_values(&outline.list_values(text, t)));
    let display_name = derive_short_name(&key).to_string();

    let name_mismatch = particle_name.as_ref().and_then(|particle| {
        let agrees = match &key {
            NameRef::Text(full) => particle.eq_ignore_ascii_case(&display_name) || particle.eq_ignore_ascii_case(full),
            NameRef::Hash(hash) => NameRef::text(particle.as_str()).hash() == *hash,
        };
        (!agrees).then(|| NameMismatch { header: key.to_string(), particle_name: particle.clone() })
    });
    if let Some(mismatch) = &name_mismatch {
        log::info!("system {} has particleName {}", mismatch.header, mismatch.particle_name);
    }

    System { key, span: block.span, display_name, particle_name, particle_path, emitters, transform, name_mismatch }
}

fn resolver(text: &str, outline: &Outline, idx: usize) -> ResolverTable {
    let block = outline.block(idx);
    let entries = outline
        .child_field(idx, RESOURCE_MAP)
        .map(|map| {
            outline
                .map_entries(text, map)
                .into_iter()
                .map(|e| ResolverEntry { key: e.key, target: NameRef::from_input(&e.value), line: e.line })
                .collect()
        })
        .unwrap_or_default();
    ResolverTable { scope: block.key().cloned().unwrap_or(NameRef::Hash(0)), span: block.span, entries }
}

fn conditions(text: &str, outline: &Outline, idx: usize) -> ConditionList {
    let mut owner = outline.block(idx).parent;
    while let Some(p) = owner {
        if outline.block(p).key().is_some() {
            break;
        }
        owner = outline.block(p).parent;
    }

    let records = outline
        .child_items(idx, CONDITION_TYPE)
        .into_iter()
        .map(|item| ConditionBlock {
            span: outline.block(item).span,
            record: decode_condition(text, outline, item).map_err(|e| e.to_string()),
        })
        .collect();

    ConditionList { owner: owner.and_then(|p| outline.block(p).key().cloned()), span: outline.block(idx).span, records }
}

fn clips(text: &str, outline: &Outline, map: usize) -> Vec<Clip> {
    outline
        .child_keyed(map)
        .into_iter()
        .filter_map(|idx| {
            let block = outline.block(idx);
            let events = outline
                .child_field(idx, "mEventDataMap")
                .map(|events| outline.child_keyed(events).into_iter().filter_map(|e| event(text, outline, e)).collect())
                .unwrap_or_default();
            Some(Clip {
                name: block.key()?.clone(),
                type_name: block.type_name().unwrap_or_default().to_string(),
                span: block.span,
                events,
            })
        })
        .collect()
}

/// An event with its effect key and bone, which may sit in nested pair lists.
fn event(text: &str, outline: &Outline, idx: usize) -> Option<ClipEvent> {
    let block = outline.block(idx);
    let find = |field: &str| outline.subtree(idx).find_map(|b| outline.scalar_field(text, b, field));
    Some(ClipEvent {
        name: block.key()?.clone(),
        type_name: block.type_name().unwrap_or_default().to_string(),
        effect_key: find("mEffectKey").and_then(|f| f.name()),
        bone_name: find("mBoneName").and_then(|f| f.name()).map(|n| n.to_string()),
    })
}
