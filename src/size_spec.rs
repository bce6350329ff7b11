//! Size constraints passed down the tree during measurement.

use cgmath::Vector2;

/// A measured size in pixels (`x` is the width, `y` the height).
pub type Size = Vector2<i32>;

/// How a [`SizeSpec`] constrains a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecMode {
    /// Any size is acceptable.
    Unspecified,
    /// The size must be exactly `size`.
    Exactly,
    /// The size may be anything up to `size`.
    AtMost,
}

/// A constraint on one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SizeSpec {
    pub mode: SpecMode,
    pub size: i32,
}

impl SizeSpec {
    pub const fn exactly(size: i32) -> SizeSpec {
        SizeSpec {
            mode: SpecMode::Exactly,
            size,
        }
    }

    pub const fn at_most(size: i32) -> SizeSpec {
        SizeSpec {
            mode: SpecMode::AtMost,
            size,
        }
    }

    pub const fn unspecified() -> SizeSpec {
        SizeSpec {
            mode: SpecMode::Unspecified,
            size: 0,
        }
    }

    /// Resolves a desired size against this constraint.
    pub fn resolve(&self, desired: i32) -> i32 {
        match self.mode {
            SpecMode::Exactly => self.size,
            SpecMode::AtMost => desired.min(self.size),
            SpecMode::Unspecified => desired,
        }
    }

    /// Returns a spec for the space left after removing `amount` pixels (padding, margins).
    pub fn shrink(&self, amount: i32) -> SizeSpec {
        match self.mode {
            SpecMode::Unspecified => *self,
            mode => SpecMode::into_spec(mode, (self.size - amount).max(0)),
        }
    }

    /// Returns true if a measurement of `old_measured` taken under `old` is still valid under
    /// `self`.
    pub fn is_compatible(&self, old: SizeSpec, old_measured: i32) -> bool {
        if *self == old {
            return true;
        }
        match (old.mode, self.mode) {
            (SpecMode::Unspecified, SpecMode::Unspecified) => true,
            // the new spec pins the size to what was measured before
            (_, SpecMode::Exactly) => self.size == old_measured,
            // an unconstrained measurement that still fits the new bound
            (SpecMode::Unspecified, SpecMode::AtMost) => self.size >= old_measured,
            // a tighter bound that still contains the old measurement
            (SpecMode::AtMost, SpecMode::AtMost) => {
                old.size > self.size && old_measured <= self.size
            }
            _ => false,
        }
    }
}

impl SpecMode {
    fn into_spec(self, size: i32) -> SizeSpec {
        SizeSpec { mode: self, size }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve() {
        assert_eq!(SizeSpec::exactly(10).resolve(40), 10);
        assert_eq!(SizeSpec::at_most(10).resolve(40), 10);
        assert_eq!(SizeSpec::at_most(10).resolve(4), 4);
        assert_eq!(SizeSpec::unspecified().resolve(40), 40);
    }

    #[test]
    fn compatibility() {
        let old = SizeSpec::at_most(100);
        assert!(old.is_compatible(old, 30));
        assert!(SizeSpec::exactly(30).is_compatible(old, 30));
        assert!(!SizeSpec::exactly(31).is_compatible(old, 30));
        assert!(SizeSpec::at_most(50).is_compatible(old, 30));
        assert!(!SizeSpec::at_most(20).is_compatible(old, 30));
        assert!(!SizeSpec::at_most(200).is_compatible(old, 30));
        assert!(SizeSpec::at_most(40).is_compatible(SizeSpec::unspecified(), 30));
        assert!(!SizeSpec::unspecified().is_compatible(old, 30));
    }

    #[test]
    fn shrink_keeps_mode() {
        assert_eq!(SizeSpec::exactly(10).shrink(4), SizeSpec::exactly(6));
        assert_eq!(SizeSpec::at_most(3).shrink(4), SizeSpec::at_most(0));
        assert_eq!(SizeSpec::unspecified().shrink(4), SizeSpec::unspecified());
    }
}
