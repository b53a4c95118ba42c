//! Condition records <-> `PersistentEffectConditionData` text.
//!
//! ```text
//! PersistentEffectConditionData {
//!     OwnerCondition: pointer = DelayedBoolMaterialDriver {     # only with a delay
//!         mBoolDriver: pointer = HasBuffDynamicMaterialBoolDriver {
//!             Spell: hash = "HeroRBuff"
//!         }
//!         mDelayOn: f32 = 0.25
//!         mDelayOff: f32 = 0
//!     }
//!     PersistentVfxs: list2[embed] = {
//!         PersistentVfxData {
//!             effectKey: hash = "Hero_R_Glow"
//!             boneName: string = "C_Buffbone_Glb_Center_Loc"
//!             ShowToOwnerOnly: bool = true
//!         }
//!     }
//!     SubmeshesToShow: list[hash] = {
//!         "Weapon"
//!     }
//! }
//! ```
//!
//! Empty lists are not written. Missing numeric fields decode as zero, the
//! same default the binary format applies.

use super::scanner::Outline;
use super::writer::BlockWriter;
use crate::{BoolDriver, ComparisonOp, ConditionRecord, DelayPair, FloatDriver, NameRef, VfxBinding, VfxFlags};
use std::str::FromStr;

pub(crate) const CONDITION_TYPE: &str = "PersistentEffectConditionData";
pub(crate) const CONDITION_LIST: &str = "persistentEffectConditions";

const DELAYED: &str = "DelayedBoolMaterialDriver";
const ANIMATION_PLAYING: &str = "IsAnimationPlayingDynamicMaterialBoolDriver";
const HAS_BUFF: &str = "HasBuffDynamicMaterialBoolDriver";
const LEARNED_SPELL: &str = "LearnedSpellDynamicMaterialBoolDriver";
const HAS_GEAR: &str = "HasGearDynamicMaterialBoolDriver";
const FLOAT_COMPARISON: &str = "FloatComparisonMaterialDriver";
const FLOAT_LITERAL: &str = "FloatLiteralMaterialDriver";
const SPELL_RANK: &str = "SpellRankIntDriver";
const BUFF_COUNTER: &str = "BuffCounterDynamicMaterialFloatDriver";
const VFX_DATA: &str = "PersistentVfxData";

const FLAG_FIELDS: [(VfxFlags, &str); 3] = [
    (VfxFlags::OWNER_ONLY, "ShowToOwnerOnly"),
    (VfxFlags::ATTACH_TO_CAMERA, "AttachToCamera"),
    (VfxFlags::FORCE_RENDER, "forceRenderVfx"),
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConditionDecodeError {
    #[error("expected a PersistentEffectConditionData block")]
    NotACondition,
    #[error("missing field {0}")]
    MissingField(&'static str),
    #[error("unknown driver type {0}")]
    UnknownDriver(String),
    #[error("invalid value for {field}: {value}")]
    BadValue { field: &'static str, value: String },
}

type Decoded<T> = std::result::Result<T, ConditionDecodeError>;

// --- Encoding -----------------------------------------------------------------

/// Render `record` as a `PersistentEffectConditionData` block. The first line
/// is unindented; the rest are indented from `indent` in steps of `unit`.
pub fn encode_condition(record: &ConditionRecord, indent: &str, unit: &str) -> String {
    let mut w = BlockWriter::new(indent, unit);
    w.open(CONDITION_TYPE);

    if record.delay.is_zero() {
        write_driver(&mut w, "OwnerCondition", &record.driver);
    } else {
        w.open(format!("OwnerCondition: pointer = {DELAYED}"));
        write_driver(&mut w, "mBoolDriver", &record.driver);
        w.line(format!("mDelayOn: f32 = {}", record.delay.on));
        w.line(format!("mDelayOff: f32 = {}", record.delay.off));
        w.close();
    }

    if !record.vfx.is_empty() {
        w.open("PersistentVfxs: list2[embed] =");
        for vfx in &record.vfx {
            w.open(VFX_DATA);
            w.line(format!("effectKey: hash = {}", vfx.effect_key.to_source()));
            if let Some(bone) = &vfx.bone_name {
                w.line(format!("boneName: string = {}", NameRef::text(bone.as_str()).to_source()));
            }
            for (flag, field) in FLAG_FIELDS {
                if vfx.flags.contains(flag) {
                    w.line(format!("{field}: bool = true"));
                }
            }
            w.close();
        }
        w.close();
    }

    write_names(&mut w, "SubmeshesToShow", &record.submeshes_to_show);
    write_names(&mut w, "SubmeshesToHide", &record.submeshes_to_hide);
    w.close();
    w.finish()
}

fn write_names(w: &mut BlockWriter<'_>, field: &str, names: &[NameRef]) {
    if names.is_empty() {
        return;
    }
    w.open(format!("{field}: list[hash] ="));
    for name in names {
        w.line(name.to_source());
    }
    w.close();
}

fn write_driver(w: &mut BlockWriter<'_>, field: &str, driver: &BoolDriver) {
    match driver {
        BoolDriver::AnimationPlaying { animations } => {
            w.open(format!("{field}: pointer = {ANIMATION_PLAYING}"));
            if animations.is_empty() {
                w.line("mAnimationNames: list[hash] = {}");
            } else {
                w.open("mAnimationNames: list[hash] =");
                for name in animations {
                    w.line(name.to_source());
                }
                w.close();
            }
        }
        BoolDriver::BuffActive { spell } => {
            w.open(format!("{field}: pointer = {HAS_BUFF}"));
            w.line(format!("Spell: hash = {}", spell.to_source()));
        }
        BoolDriver::SpellLearned { slot } => {
            w.open(format!("{field}: pointer = {LEARNED_SPELL}"));
            w.line(format!("mSlot: u8 = {slot}"));
        }
        BoolDriver::GearEquipped { index } => {
            w.open(format!("{field}: pointer = {HAS_GEAR}"));
            w.line(format!("mGearIndex: u8 = {index}"));
        }
        BoolDriver::FloatComparison { operator, left, right } => {
            w.open(format!("{field}: pointer = {FLOAT_COMPARISON}"));
            w.line(format!("mOperator: u32 = {}", operator.code()));
            write_float(w, "mValueA", left);
            write_float(w, "mValueB", right);
        }
        BoolDriver::BuffCounter { spell, operator, value } => {
            w.open(format!("{field}: pointer = {FLOAT_COMPARISON}"));
            w.line(format!("mOperator: u32 = {}", operator.code()));
            w.open(format!("mValueA: pointer = {BUFF_COUNTER}"));
            w.line(format!("Spell: hash = {}", spell.to_source()));
            w.close();
            write_float(w, "mValueB", &FloatDriver::Literal(*value));
        }
    }
    w.close();
}

fn write_float(w: &mut BlockWriter<'_>, field: &str, driver: &FloatDriver) {
    match driver {
        FloatDriver::Literal(value) => {
            w.open(format!("{field}: pointer = {FLOAT_LITERAL}"));
            w.line(format!("mValue: f32 = {value}"));
        }
        FloatDriver::SpellRank { slot } => {
            w.open(format!("{field}: pointer = {SPELL_RANK}"));
            w.line(format!("SpellSlot: u8 = {slot}"));
        }
    }
    w.close();
}

// --- Decoding -----------------------------------------------------------------

/// Decode block `idx` of an already scanned text.
pub fn decode_condition(text: &str, outline: &Outline, idx: usize) -> Decoded<ConditionRecord> {
    let block = outline.block(idx);
    if block.type_name() != Some(CONDITION_TYPE) {
        return Err(ConditionDecodeError::NotACondition);
    }
    let reader = Reader { text, outline };

    let owner = outline.child_field(idx, "OwnerCondition").ok_or(ConditionDecodeError::MissingField("OwnerCondition"))?;
    let (driver, delay) = if outline.block(owner).type_name() == Some(DELAYED) {
        let inner = outline.child_field(owner, "mBoolDriver").ok_or(ConditionDecodeError::MissingField("mBoolDriver"))?;
        let delay = DelayPair {
            on: reader.number(owner, "mDelayOn")?.unwrap_or(0.0),
            off: reader.number(owner, "mDelayOff")?.unwrap_or(0.0),
        };
        (reader.driver(inner)?, delay)
    } else {
        (reader.driver(owner)?, DelayPair::default())
    };

    let vfx = match outline.child_field(idx, "PersistentVfxs") {
        Some(list) => outline.child_items(list, VFX_DATA).into_iter().map(|item| reader.vfx(item)).collect::<Decoded<_>>()?,
        None => Vec::new(),
    };

    Ok(ConditionRecord {
        driver,
        delay,
        vfx,
        submeshes_to_show: reader.names(idx, "SubmeshesToShow")?,
        submeshes_to_hide: reader.names(idx, "SubmeshesToHide")?,
    })
}

/// Decode the first condition block found in `text`.
pub fn decode_condition_block(text: &str) -> Decoded<ConditionRecord> {
    let outline = Outline::scan(text);
    let idx = outline
        .blocks()
        .iter()
        .position(|b| b.type_name() == Some(CONDITION_TYPE))
        .ok_or(ConditionDecodeError::NotACondition)?;
    decode_condition(text, &outline, idx)
}

struct Reader<'a> {
    text: &'a str,
    outline: &'a Outline,
}

impl Reader<'_> {
    fn number<T: FromStr>(&self, idx: usize, field: &'static str) -> Decoded<Option<T>> {
        match self.outline.scalar_field(self.text, idx, field) {
            Some(f) => f.value.parse().map(Some).map_err(|_| ConditionDecodeError::BadValue { field, value: f.value }),
            None => Ok(None),
        }
    }

    fn flag(&self, idx: usize, field: &'static str) -> Decoded<bool> {
        match self.outline.scalar_field(self.text, idx, field) {
            Some(f) => match f.value.as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(ConditionDecodeError::BadValue { field, value: f.value.clone() }),
            },
            None => Ok(false),
        }
    }

    fn name(&self, idx: usize, field: &'static str) -> Decoded<NameRef> {
        let f = self.outline.scalar_field(self.text, idx, field).ok_or(ConditionDecodeError::MissingField(field))?;
        f.name().ok_or(ConditionDecodeError::BadValue { field, value: f.value })
    }

    fn names(&self, idx: usize, field: &'static str) -> Decoded<Vec<NameRef>> {
        let Some(list) = self.outline.child_field(idx, field) else {
            return Ok(Vec::new());
        };
        self.outline
            .list_values(self.text, list)
            .into_iter()
            .map(|value| NameRef::parse(&value).ok_or(ConditionDecodeError::BadValue { field, value }))
            .collect()
    }

    fn driver(&self, idx: usize) -> Decoded<BoolDriver> {
        let type_name = self.outline.block(idx).type_name().unwrap_or_default();
        match type_name {
            ANIMATION_PLAYING => Ok(BoolDriver::AnimationPlaying { animations: self.names(idx, "mAnimationNames")? }),
            HAS_BUFF => Ok(BoolDriver::BuffActive { spell: self.name(idx, "Spell")? }),
            LEARNED_SPELL => Ok(BoolDriver::SpellLearned { slot: self.number(idx, "mSlot")?.unwrap_or(0) }),
            HAS_GEAR => Ok(BoolDriver::GearEquipped { index: self.number(idx, "mGearIndex")?.unwrap_or(0) }),
            FLOAT_COMPARISON => self.comparison(idx),
            other => Err(ConditionDecodeError::UnknownDriver(other.to_string())),
        }
    }

    fn comparison(&self, idx: usize) -> Decoded<BoolDriver> {
        let code: u32 = self.number(idx, "mOperator")?.unwrap_or(0);
        let operator = ComparisonOp::from_code(code)
            .ok_or(ConditionDecodeError::BadValue { field: "mOperator", value: code.to_string() })?;
        let a = self.outline.child_field(idx, "mValueA").ok_or(ConditionDecodeError::MissingField("mValueA"))?;
        let b = self.outline.child_field(idx, "mValueB").ok_or(ConditionDecodeError::MissingField("mValueB"))?;

        if self.outline.block(a).type_name() == Some(BUFF_COUNTER) {
            let FloatDriver::Literal(value) = self.float(b)? else {
                return Err(ConditionDecodeError::BadValue {
                    field: "mValueB",
                    value: self.outline.block(b).type_name().unwrap_or_default().to_string(),
                });
            };
            return Ok(BoolDriver::BuffCounter { spell: self.name(a, "Spell")?, operator, value });
        }

        Ok(BoolDriver::FloatComparison { operator, left: self.float(a)?, right: self.float(b)? })
    }

    fn float(&self, idx: usize) -> Decoded<FloatDriver> {
        match self.outline.block(idx).type_name().unwrap_or_default() {
            FLOAT_LITERAL => Ok(FloatDriver::Literal(self.number(idx, "mValue")?.unwrap_or(0.0))),
            SPELL_RANK => Ok(FloatDriver::SpellRank { slot: self.number(idx, "SpellSlot")?.unwrap_or(0) }),
            other => Err(ConditionDecodeError::UnknownDriver(other.to_string())),
        }
    }

    fn vfx(&self, idx: usize) -> Decoded<VfxBinding> {
        let mut flags = VfxFlags::empty();
        for (flag, field) in FLAG_FIELDS {
            flags.set(flag, self.flag(idx, field)?);
        }
        let bone_name = self.outline.scalar_field(self.text, idx, "boneName").and_then(|f| f.name()).map(|n| n.to_string());
        Ok(VfxBinding { effect_key: self.name(idx, "effectKey")?, bone_name, flags })
    }
}
