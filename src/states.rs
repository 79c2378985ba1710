/// Chromosomal state carried by one hidden state of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateTag {
    Euploid,
    Trisomy,
    PaternalTrisomy,
}

/// The two transition-weight classes the states fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionClass {
    EuploidLike,
    TrisomyLike,
}

impl StateTag {
    pub fn transition_class(self) -> TransitionClass {
        match self {
            StateTag::Euploid => TransitionClass::EuploidLike,
            StateTag::Trisomy | StateTag::PaternalTrisomy => TransitionClass::TrisomyLike,
        }
    }

    /// State number in the read-count reference table that carries the
    /// depth parameters for this tag (1 = euploid, 2 = trisomy).
    pub fn read_count_state(self) -> u8 {
        match self.transition_class() {
            TransitionClass::EuploidLike => 1,
            TransitionClass::TrisomyLike => 2,
        }
    }
}

pub const READ_COUNT_STATES: [StateTag; 2] = [StateTag::Euploid, StateTag::Trisomy];

pub const ALLELIC_RATIO_STATES: [StateTag; 7] = [
    StateTag::Euploid,
    StateTag::Trisomy,
    StateTag::Euploid,
    StateTag::PaternalTrisomy,
    StateTag::PaternalTrisomy,
    StateTag::Euploid,
    StateTag::Trisomy,
];

/// Observed per-segment measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    TotalCount,
    AllelicRatio,
}

impl Feature {
    pub fn column(self) -> &'static str {
        match self {
            Feature::TotalCount => "total_count",
            Feature::AllelicRatio => "allelic_ratio",
        }
    }
}

/// Parameter layout of a decoding model.
///
/// The fixed-fraction read-count variant shares `ReadCount`; only the
/// fetal fraction used for the reference lookup differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    ReadCount,
    AllelicRatio,
    Joint,
}

impl ModelKind {
    pub fn states(self) -> &'static [StateTag] {
        match self {
            ModelKind::ReadCount => &READ_COUNT_STATES,
            ModelKind::AllelicRatio | ModelKind::Joint => &ALLELIC_RATIO_STATES,
        }
    }

    pub fn n_states(self) -> usize {
        self.states().len()
    }

    /// Observation columns, in the order they form the observation vector.
    pub fn features(self) -> &'static [Feature] {
        match self {
            ModelKind::ReadCount => &[Feature::TotalCount],
            ModelKind::AllelicRatio => &[Feature::AllelicRatio],
            ModelKind::Joint => &[Feature::AllelicRatio, Feature::TotalCount],
        }
    }

    /// Whether rows with missing or non-finite features are dropped before
    /// grouping instead of being rejected.
    pub fn drops_non_finite(self) -> bool {
        !matches!(self, ModelKind::ReadCount)
    }

    pub fn name(self) -> &'static str {
        match self {
            ModelKind::ReadCount => "read-count",
            ModelKind::AllelicRatio => "allelic-ratio",
            ModelKind::Joint => "joint",
        }
    }
}
