use serde::{Deserialize, Serialize};

/// Which eclipse kinds a search looks for. Combine with `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EclipseKind(u8);

impl EclipseKind {
    pub const SOLAR: EclipseKind = EclipseKind(0b01);
    pub const LUNAR: EclipseKind = EclipseKind(0b10);
    pub const ALL: EclipseKind = EclipseKind(0b11);

    pub fn contains(self, other: EclipseKind) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for EclipseKind {
    type Output = EclipseKind;

    fn bitor(self, rhs: EclipseKind) -> EclipseKind {
        EclipseKind(self.0 | rhs.0)
    }
}

/// A time range in Julian days, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchRange {
    pub start_jd: f64,
    pub end_jd: f64,
    pub kinds: EclipseKind,
}

impl SearchRange {
    pub fn new(start_jd: f64, end_jd: f64, kinds: EclipseKind) -> Self {
        Self { start_jd, end_jd, kinds }
    }

    pub fn is_empty(&self) -> bool {
        !(self.end_jd > self.start_jd)
    }
}

/// One eclipse found by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Eclipse {
    pub kind: EclipseKind,
    pub occulter: String,
    pub receiver: String,
    pub start_jd: f64,
    pub end_jd: f64,
}
