use serde::Serialize;
use std::fmt;

/// One of the two incoming directions at the intersection.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Approach {
    A,
    B,
}

impl Approach {
    pub const ALL: [Approach; 2] = [Approach::A, Approach::B];

    pub fn other(&self) -> Approach {
        match self {
            Approach::A => Approach::B,
            Approach::B => Approach::A,
        }
    }

    /// Index into per-approach arrays.
    pub fn index(&self) -> usize {
        match self {
            Approach::A => 0,
            Approach::B => 1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Approach::A => "A",
            Approach::B => "B",
        }
    }
}

impl fmt::Display for Approach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
