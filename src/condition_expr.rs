use crate::NameRef;

bitflags::bitflags! {
    /// Per-binding switches of a persistent visual effect.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct VfxFlags: u8 {
        /// `ShowToOwnerOnly`
        const OWNER_ONLY       = 1 << 0;
        /// `AttachToCamera`
        const ATTACH_TO_CAMERA = 1 << 1;
        /// `forceRenderVfx`
        const FORCE_RENDER     = 1 << 2;
    }
}

/// Comparison operator of a float comparison driver, stored as `mOperator: u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    LessThan,
    LessOrEqual,
    Equal,
    GreaterOrEqual,
    GreaterThan,
    NotEqual,
}

impl ComparisonOp {
    pub const ALL: [ComparisonOp; 6] = [
        ComparisonOp::LessThan,
        ComparisonOp::LessOrEqual,
        ComparisonOp::Equal,
        ComparisonOp::GreaterOrEqual,
        ComparisonOp::GreaterThan,
        ComparisonOp::NotEqual,
    ];

    pub fn code(self) -> u32 {
        match self {
            ComparisonOp::LessThan => 0,
            ComparisonOp::LessOrEqual => 1,
            ComparisonOp::Equal => 2,
            ComparisonOp::GreaterOrEqual => 3,
            ComparisonOp::GreaterThan => 4,
            ComparisonOp::NotEqual => 5,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.code() == code)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOp::LessThan => "<",
            ComparisonOp::LessOrEqual => "<=",
            ComparisonOp::Equal => "==",
            ComparisonOp::GreaterOrEqual => ">=",
            ComparisonOp::GreaterThan => ">",
            ComparisonOp::NotEqual => "!=",
        }
    }
}

/// Operand of a float comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum FloatDriver {
    /// `FloatLiteralMaterialDriver { mValue }`
    Literal(f32),
    /// `SpellRankIntDriver { SpellSlot }`
    SpellRank { slot: u8 },
}

/// The boolean driver deciding when a condition is active.
#[derive(Debug, Clone, PartialEq)]
pub enum BoolDriver {
    /// Any of the animations is playing.
    AnimationPlaying { animations: Vec<NameRef> },
    /// The buff script is active on the owner.
    BuffActive { spell: NameRef },
    /// A spell is learned in `slot`.
    SpellLearned { slot: u8 },
    /// Gear at `index` is equipped.
    GearEquipped { index: u8 },
    /// `left <op> right`
    FloatComparison { operator: ComparisonOp, left: FloatDriver, right: FloatDriver },
    /// Stack count of a buff compared against a literal.
    BuffCounter { spell: NameRef, operator: ComparisonOp, value: f32 },
}

impl BoolDriver {
    pub fn kind_name(&self) -> &'static str {
        match self {
            BoolDriver::AnimationPlaying { .. } => "animation-playing",
            BoolDriver::BuffActive { .. } => "buff-active",
            BoolDriver::SpellLearned { .. } => "spell-learned",
            BoolDriver::GearEquipped { .. } => "gear-equipped",
            BoolDriver::FloatComparison { .. } => "float-comparison",
            BoolDriver::BuffCounter { .. } => "buff-counter",
        }
    }
}

/// Activation / deactivation delay in seconds. All-zero means no delay wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DelayPair {
    pub on: f32,
    pub off: f32,
}

impl DelayPair {
    pub fn is_zero(&self) -> bool {
        self.on == 0.0 && self.off == 0.0
    }
}

/// One visual effect attached while the condition holds.
#[derive(Debug, Clone, PartialEq)]
pub struct VfxBinding {
    pub effect_key: NameRef,
    pub bone_name: Option<String>,
    pub flags: VfxFlags,
}

/// A persistent-effect condition: driver, delays, effects and submesh toggles.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionRecord {
    pub driver: BoolDriver,
    pub delay: DelayPair,
    pub vfx: Vec<VfxBinding>,
    pub submeshes_to_show: Vec<NameRef>,
    pub submeshes_to_hide: Vec<NameRef>,
}

impl ConditionRecord {
    pub fn new(driver: BoolDriver) -> Self {
        ConditionRecord {
            driver,
            delay: DelayPair::default(),
            vfx: Vec::new(),
            submeshes_to_show: Vec::new(),
            submeshes_to_hide: Vec::new(),
        }
    }

    pub fn with_delay(mut self, on: f32, off: f32) -> Self {
        self.delay = DelayPair { on, off };
        self
    }

    pub fn with_vfx(mut self, effect_key: NameRef, bone_name: Option<&str>, flags: VfxFlags) -> Self {
        self.vfx.push(VfxBinding { effect_key, bone_name: bone_name.map(str::to_string), flags });
        self
    }

    pub fn show(mut self, submesh: NameRef) -> Self {
        self.submeshes_to_show.push(submesh);
        self
    }

    pub fn hide(mut self, submesh: NameRef) -> Self {
        self.submeshes_to_hide.push(submesh);
        self
    }
}
