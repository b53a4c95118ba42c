//! Scenario tests across scanner, extraction, mutation and the edit session.

use super::*;
use crate::{
    BoolDriver, ComparisonOp, ConditionRecord, Document, EditSession, EngineConfig, FloatDriver, Matrix44, NameRef,
    Selection, VfxFlags,
};
use proptest::prelude::*;

const DOC: &str = r#"#PROP_text
type: string = "PROP"
version: u32 = 3
entries: map[hash,embed] = {
    "Characters/Hero/Skins/Skin0/Particles/Hero_Q" = VfxSystemDefinitionData {
        complexEmitterDefinitionData: list[pointer] = {
            VfxEmitterDefinitionData {
                emitterName: string = "a"
            }
            VfxEmitterDefinitionData {
                emitterName: string = "b"
            }
        }
        particleName: string = "Hero_Q"
        particlePath: string = "Characters/Hero/Skins/Skin0/Particles/Hero_Q"
    }
    "Characters/Hero/Skins/Skin1/Resources" = ResourceResolver {
        resourceMap: map[hash,link] = {
            "Hero_Q" = "Characters/Hero/Skins/Skin1/Particles/Hero_Q"
        }
    }
    "Characters/Hero/Skins/Skin0/Resources" = ResourceResolver {
        resourceMap: map[hash,link] = {
            "Hero_Q" = "Characters/Hero/Skins/Skin0/Particles/Hero_Q"
        }
    }
}
"#;

const HERO_W: &str = r#"
"Old/Particles/Hero_W" = VfxSystemDefinitionData {
    complexEmitterDefinitionData: list[pointer] = {
        VfxEmitterDefinitionData {
            emitterName: string = "w_core"
        }
    }
    particleName: string = "Old"
}
"Old/Resources" = ResourceResolver {
    resourceMap: map[hash,link] = {
        "Hero_W" = "Old/Particles/Hero_W"
    }
}
"#;

const HERO_W_KEY: &str = "Characters/Hero/Skins/Skin0/Particles/Hero_W";

fn resolver_keys(table: &crate::EntityTable, scope: &str) -> Vec<String> {
    table
        .resolvers
        .iter()
        .find(|r| r.scope == NameRef::text(scope))
        .map(|r| r.entries.iter().map(|e| e.key.to_string()).collect())
        .unwrap_or_default()
}

fn conditions_doc(records: &[ConditionRecord]) -> String {
    let indent = "            ";
    let items: Vec<String> =
        records.iter().map(|r| format!("{indent}{}", encode_condition(r, indent, "    "))).collect();
    format!(
        "entries: map[hash,embed] = {{\n    \"Characters/Hero/Skins/Skin0\" = SkinCharacterDataProperties {{\n        persistentEffectConditions: list2[pointer] = {{\n{}\n        }}\n    }}\n}}\n",
        items.join("\n")
    )
}

#[test]
fn deleting_one_emitter_leaves_the_other_and_the_header() {
    let doc = Document::new(DOC);
    let key = NameRef::text("Characters/Hero/Skins/Skin0/Particles/Hero_Q");
    let (out, removed) = delete_emitters(&doc, &key, &["a"]).unwrap();

    assert_eq!(removed, ["a"]);
    let expected =
        DOC.replacen("            VfxEmitterDefinitionData {\n                emitterName: string = \"a\"\n            }\n", "", 1);
    assert_eq!(out.text(), expected);

    let table = extract(&out);
    assert_eq!(table.systems[0].emitter_names().collect::<Vec<_>>(), ["b"]);
    assert_eq!(table.systems[0].key, key);
}

#[test]
fn inserted_system_is_mapped_once_in_its_family_table() {
    let doc = Document::new(DOC);
    let inserted = insert_system(&doc, HERO_W, HERO_W_KEY, &EngineConfig::default()).unwrap();
    assert!(!inserted.renamed);
    assert_eq!(inserted.key, NameRef::text(HERO_W_KEY));
    assert_eq!(inserted.document.revision(), 1);
    assert!(inserted.document.is_balanced());

    let table = extract(&inserted.document);
    assert_eq!(resolver_keys(&table, "Characters/Hero/Skins/Skin0/Resources"), ["Hero_Q", "Hero_W"]);
    assert_eq!(resolver_keys(&table, "Characters/Hero/Skins/Skin1/Resources"), ["Hero_Q"]);
    assert_eq!(table.resolvers.len(), 2, "donor resolver tables are dropped");

    let system = table.find_system("Hero_W").unwrap();
    assert_eq!(system.particle_name.as_deref(), Some("Hero_W"));
    assert_eq!(system.particle_path.as_deref(), Some(HERO_W_KEY));
    assert_eq!(system.emitter_names().collect::<Vec<_>>(), ["w_core"]);

    // The new block directly follows the last system, at entry indentation.
    let hero_q_end = table.systems[0].span.end;
    assert!(inserted.document.text()[hero_q_end..].starts_with(&format!("\n    \"{HERO_W_KEY}\" = VfxSystemDefinitionData {{\n")));
}

#[test]
fn colliding_insert_gets_a_suffix() {
    let doc = Document::new(DOC);
    let config = EngineConfig::default();
    let first = insert_system(&doc, HERO_W, HERO_W_KEY, &config).unwrap();
    let second = insert_system(&first.document, HERO_W, HERO_W_KEY, &config).unwrap();

    assert!(second.renamed);
    assert_eq!(second.key, NameRef::text(format!("{HERO_W_KEY}_2")));
    let table = extract(&second.document);
    assert_eq!(resolver_keys(&table, "Characters/Hero/Skins/Skin0/Resources"), ["Hero_Q", "Hero_W", "Hero_W_2"]);
    assert_eq!(table.find_system("Hero_W_2").and_then(|s| s.particle_name.as_deref()), Some("Hero_W_2"));
    assert_eq!(table.systems.len(), 3);
}

#[test]
fn hash_keyed_insert_collision_gets_a_fresh_token() {
    let doc = Document::new(DOC);
    let taken = NameRef::text("Characters/Hero/Skins/Skin0/Particles/Hero_Q").hash();
    let donor = "0x00000001 = VfxSystemDefinitionData {\n    particleName: string = \"Glow\"\n}\n";
    let inserted = insert_system(&doc, donor, &format!("0x{taken:08x}"), &EngineConfig::default()).unwrap();

    assert!(inserted.renamed);
    let NameRef::Hash(hash) = inserted.key else { panic!("expected a hash key") };
    assert_ne!(hash, taken);
    let table = extract(&inserted.document);
    assert!(table.system_by_key(&NameRef::Hash(hash)).is_some());
    // Hash keys keep their particleName.
    assert_eq!(table.system_by_key(&NameRef::Hash(hash)).and_then(|s| s.particle_name.as_deref()), Some("Glow"));
}

#[test]
fn upsert_over_first_of_three_leaves_others_untouched() {
    let records = [
        ConditionRecord::new(BoolDriver::SpellLearned { slot: 0 }),
        ConditionRecord::new(BoolDriver::GearEquipped { index: 1 }),
        ConditionRecord::new(BoolDriver::BuffActive { spell: NameRef::text("HeroRBuff") }).show(NameRef::text("Cape")),
    ];
    let doc = Document::new(conditions_doc(&records));
    let first = extract(&doc).condition_records()[0].span;

    let replacement = ConditionRecord::new(BoolDriver::AnimationPlaying { animations: vec![NameRef::text("Spell4")] })
        .with_delay(0.5, 0.0)
        .with_vfx(NameRef::text("Hero_R_Glow"), Some("C_Buffbone_Glb_Center_Loc"), VfxFlags::OWNER_ONLY);
    let out = upsert_condition(&doc, &replacement, Some(0), &EngineConfig::default()).unwrap();

    assert_eq!(&out.text()[..first.start], &doc.text()[..first.start]);
    assert!(out.text().ends_with(&doc.text()[first.end..]));

    let decoded: Vec<ConditionRecord> =
        extract(&out).condition_records().iter().map(|b| b.record.clone().unwrap()).collect();
    assert_eq!(decoded, [replacement, records[1].clone(), records[2].clone()]);
}

#[test]
fn deleted_emitter_is_not_merged_back_until_saved() {
    let donor = Document::new(DOC);
    let mut session = EditSession::new(DOC);
    assert_eq!(session.delete_emitters("Hero_Q", &["a"]).unwrap(), Some(vec!["a".to_string()]));

    let merged = session.port_emitters(&donor, "Hero_Q", "Hero_Q", &["a", "b"]).unwrap();
    assert_eq!(merged, Some(Vec::new()));
    assert_eq!(session.entities().systems[0].emitter_names().collect::<Vec<_>>(), ["b"]);
    assert_eq!(session.history().len(), 1);

    session.mark_saved();
    let merged = session.port_emitters(&donor, "Hero_Q", "Hero_Q", &["a"]).unwrap();
    assert_eq!(merged, Some(vec!["a".to_string()]));
    assert_eq!(session.entities().systems[0].emitter_names().collect::<Vec<_>>(), ["b", "a"]);
    assert!(session.document().is_balanced());
}

#[test]
fn ensure_mapping_twice_changes_text_once() {
    let mut session = EditSession::new(DOC);
    let key = NameRef::text("Hero_E");
    let target = NameRef::text("Characters/Hero/Skins/Skin0/Particles/Hero_E");
    let scope = scope_for(&target);

    assert!(session.ensure_mapping(&key, &target, &scope).unwrap());
    let once = session.text().to_string();
    assert!(session.ensure_mapping(&key, &target, &scope).unwrap());
    assert_eq!(session.text(), once);
    assert_eq!(session.history().len(), 1);
    assert_eq!(resolver_keys(session.entities(), "Characters/Hero/Skins/Skin0/Resources"), ["Hero_Q", "Hero_E"]);
}

#[test]
fn undo_restores_text_entities_and_selection() {
    let mut session = EditSession::new(DOC);
    let selection = Selection {
        system: Some(NameRef::text("Characters/Hero/Skins/Skin0/Particles/Hero_Q")),
        emitters: vec!["b".into()],
        condition: None,
    };
    session.set_selection(selection.clone());

    let key = session.insert_system(HERO_W, HERO_W_KEY).unwrap();
    assert_eq!(key, Some(NameRef::text(HERO_W_KEY)));
    assert_eq!(session.selection().system, key);
    assert_eq!(session.entities().systems.len(), 2);
    assert_eq!(session.history().peek_label(), Some("insert system"));

    assert!(session.undo());
    assert_eq!(session.text(), DOC);
    assert_eq!(session.document().revision(), 2);
    assert_eq!(session.entities().systems.len(), 1);
    assert_eq!(session.selection(), &selection);
}

#[test]
fn history_is_bounded_by_capacity() {
    let config = EngineConfig { history_capacity: 3, ..EngineConfig::default() };
    let mut session = EditSession::with_config(DOC, config);
    for x in 1..=5 {
        assert!(session.set_transform("Hero_Q", &Matrix44::translation(x as f32, 0.0, 0.0)).unwrap());
        assert!(session.history().len() <= 3);
    }
    assert_eq!(session.history().len(), 3);

    for _ in 0..3 {
        assert!(session.undo());
    }
    assert!(!session.undo());
    let transform = session.entities().systems[0].transform.unwrap();
    assert_eq!(transform.rows()[3], [2.0, 0.0, 0.0, 1.0]);
}

#[test]
fn transform_edit_keeps_bytes_outside_the_system() {
    let doc = Document::new(DOC);
    let system = extract(&doc).systems[0].clone();
    let out = set_system_transform(&doc, &system.key, &Matrix44::translation(0.0, 25.0, 0.0), &EngineConfig::default())
        .unwrap();

    assert_eq!(&out.text()[..system.span.start], &doc.text()[..system.span.start]);
    assert!(out.text().ends_with(&doc.text()[system.span.end..]));
    assert_eq!(extract(&out).systems[0].transform, Some(Matrix44::translation(0.0, 25.0, 0.0)));
}

#[test]
fn unbalanced_document_is_refused_everywhere() {
    let doc = Document::new(&DOC[..DOC.len() - 3]);
    let key = NameRef::text("Hero_Q");
    let config = EngineConfig::default();
    assert!(insert_system(&doc, HERO_W, HERO_W_KEY, &config).is_err());
    assert!(delete_emitters(&doc, &key, &["a"]).is_err());
    assert!(set_system_transform(&doc, &key, &Matrix44::IDENTITY, &config).is_err());
    assert!(ensure_mapping(&doc, &key, &key, &TableScope::First, &config).is_err());
}

#[test]
fn insert_under_a_short_name_mapped_elsewhere_is_renamed() {
    let doc = Document::new(DOC);
    let inserted = insert_system(&doc, HERO_W, "Hero_Q", &EngineConfig::default()).unwrap();

    assert!(inserted.renamed);
    assert_eq!(inserted.key, NameRef::text("Hero_Q_2"));
    let table = extract(&inserted.document);
    assert_eq!(resolver_keys(&table, "Characters/Hero/Skins/Skin1/Resources"), ["Hero_Q", "Hero_Q_2"]);
    assert_eq!(resolver_keys(&table, "Characters/Hero/Skins/Skin0/Resources"), ["Hero_Q"]);
    let targets = table.resolvers.iter().flat_map(|r| &r.entries).filter(|e| e.target == inserted.key).count();
    assert_eq!(targets, 1);
    assert_eq!(
        table.resolvers[0].get(&NameRef::text("Hero_Q")).map(|e| e.target.clone()),
        Some(NameRef::text("Characters/Hero/Skins/Skin1/Particles/Hero_Q"))
    );
}

#[test]
fn trailing_comments_do_not_hide_emitters() {
    let commented = DOC.replacen("emitterName: string = \"a\"", "emitterName: string = \"a\" # main", 1);
    let doc = Document::new(commented.as_str());
    let table = extract(&doc);
    assert_eq!(table.systems[0].emitter_names().collect::<Vec<_>>(), ["a", "b"]);
    assert_eq!(table.systems[0].particle_name.as_deref(), Some("Hero_Q"));

    let (out, removed) = delete_emitters(&doc, &table.systems[0].key, &["a"]).unwrap();
    assert_eq!(removed, ["a"]);
    let expected = commented.replacen(
        "            VfxEmitterDefinitionData {\n                emitterName: string = \"a\" # main\n            }\n",
        "",
        1,
    );
    assert_eq!(out.text(), expected);
}

#[test]
fn insert_keeps_a_comment_after_the_last_system_on_its_line() {
    let commented = DOC.replacen(
        "    }\n    \"Characters/Hero/Skins/Skin1/Resources\"",
        "    } # Hero_Q\n    \"Characters/Hero/Skins/Skin1/Resources\"",
        1,
    );
    let doc = Document::new(commented.as_str());
    let inserted = insert_system(&doc, HERO_W, HERO_W_KEY, &EngineConfig::default()).unwrap();

    let text = inserted.document.text();
    assert!(text.contains(&format!("    }} # Hero_Q\n    \"{HERO_W_KEY}\" = VfxSystemDefinitionData {{\n")));
    let table = extract(&inserted.document);
    assert_eq!(table.systems.len(), 2);
    assert_eq!(table.find_system("Hero_W").map(|s| s.emitter_names().collect::<Vec<_>>()), Some(vec!["w_core"]));
}

#[test]
fn submesh_names_with_commas_and_hashes_survive_extraction() {
    let record = ConditionRecord::new(BoolDriver::SpellLearned { slot: 3 })
        .show(NameRef::text("Cape,Left"))
        .show(NameRef::text("Cape # Right"));
    let doc = Document::new(conditions_doc(std::slice::from_ref(&record)));
    let decoded = extract(&doc).condition_records()[0].record.clone().unwrap();
    assert_eq!(decoded.submeshes_to_show, [NameRef::text("Cape,Left"), NameRef::text("Cape # Right")]);
}

// --- Properties ---------------------------------------------------------------

fn name() -> impl Strategy<Value = NameRef> {
    prop_oneof![r##"[A-Za-z0-9_/,# "{}]{1,12}"##.prop_map(NameRef::Text), any::<u32>().prop_map(NameRef::Hash)]
}

fn operator() -> impl Strategy<Value = ComparisonOp> {
    prop::sample::select(ComparisonOp::ALL.to_vec())
}

fn float_driver() -> impl Strategy<Value = FloatDriver> {
    prop_oneof![
        (-1000.0f32..1000.0).prop_map(FloatDriver::Literal),
        any::<u8>().prop_map(|slot| FloatDriver::SpellRank { slot }),
    ]
}

fn driver() -> impl Strategy<Value = BoolDriver> {
    prop_oneof![
        prop::collection::vec(name(), 0..4).prop_map(|animations| BoolDriver::AnimationPlaying { animations }),
        name().prop_map(|spell| BoolDriver::BuffActive { spell }),
        any::<u8>().prop_map(|slot| BoolDriver::SpellLearned { slot }),
        any::<u8>().prop_map(|index| BoolDriver::GearEquipped { index }),
        (operator(), float_driver(), float_driver())
            .prop_map(|(operator, left, right)| BoolDriver::FloatComparison { operator, left, right }),
        (name(), operator(), -1000.0f32..1000.0)
            .prop_map(|(spell, operator, value)| BoolDriver::BuffCounter { spell, operator, value }),
    ]
}

fn condition_record() -> impl Strategy<Value = ConditionRecord> {
    let vfx = (name(), prop::option::of("[A-Za-z_]{1,16}"), 0u8..8);
    (
        driver(),
        prop::option::of((0.0f32..10.0, 0.0f32..10.0)),
        prop::collection::vec(vfx, 0..3),
        prop::collection::vec(name(), 0..3),
        prop::collection::vec(name(), 0..3),
    )
        .prop_map(|(driver, delay, vfx, show, hide)| {
            let mut record = ConditionRecord::new(driver);
            if let Some((on, off)) = delay {
                record = record.with_delay(on, off);
            }
            for (key, bone, bits) in vfx {
                record = record.with_vfx(key, bone.as_deref(), VfxFlags::from_bits_truncate(bits));
            }
            record.submeshes_to_show = show;
            record.submeshes_to_hide = hide;
            record
        })
}

proptest! {
    #[test]
    fn condition_codec_round_trips(record in condition_record(), depth in 0usize..4) {
        let indent = "    ".repeat(depth);
        let encoded = encode_condition(&record, &indent, "    ");
        prop_assert!(is_balanced(&encoded));
        prop_assert_eq!(decode_condition_block(&encoded), Ok(record));
    }

    #[test]
    fn unique_name_skips_every_taken_suffix(taken in 0usize..200) {
        let mut names = vec![NameRef::text("Hero_W")];
        names.extend((2..taken + 2).map(|n| NameRef::text(format!("Hero_W_{n}"))));
        let existing = KeySet::from_names(&names);

        let fresh = unique_name("Hero_W", &existing);
        prop_assert!(!existing.contains_name(&fresh));
        prop_assert_eq!(fresh, format!("Hero_W_{}", taken + 2));
    }

    #[test]
    fn deterministic_token_is_free_and_stable(
        seed in "[a-z]{1,8}",
        suffixes in 0usize..20,
        extra in prop::collection::vec(any::<u32>(), 0..300),
    ) {
        let mut existing = KeySet::new();
        existing.insert(&NameRef::text(seed.as_str()));
        for n in 1..=suffixes {
            existing.insert(&NameRef::text(format!("{seed}#{n}")));
        }
        for hash in extra {
            existing.insert(&NameRef::Hash(hash));
        }

        let token = deterministic_token(&seed, &existing);
        prop_assert_eq!(token.len(), 10);
        let parsed = NameRef::parse(&token);
        prop_assert!(matches!(parsed, Some(NameRef::Hash(_))));
        prop_assert!(!existing.contains(&parsed.unwrap_or(NameRef::Hash(0))));
        prop_assert_eq!(deterministic_token(&seed, &existing), token);
    }
}
