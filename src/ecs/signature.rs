//! Fixed-width component signatures

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

use serde::{Deserialize, Serialize};

/// Stable numeric id of a registered component type
pub type ComponentId = u16;

/// Maximum number of distinct component types a world can register
pub const MAX_COMPONENTS: usize = 64;

/// Bitset recording which component types an entity owns.
///
/// Bit `i` is set iff the entity owns the component registered with id `i`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature(u64);

impl Signature {
    pub const EMPTY: Signature = Signature(0);

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Sets or clears bit `id`. Ids past [`MAX_COMPONENTS`] are ignored.
    #[inline]
    pub fn set(&mut self, id: ComponentId, value: bool) {
        if (id as usize) >= MAX_COMPONENTS {
            debug_assert!(false, "component id {id} out of signature range");
            return;
        }
        if value {
            self.0 |= 1 << id;
        } else {
            self.0 &= !(1 << id);
        }
    }

    #[inline]
    pub fn insert(&mut self, id: ComponentId) {
        self.set(id, true);
    }

    #[inline]
    pub fn remove(&mut self, id: ComponentId) {
        self.set(id, false);
    }

    /// Builder form of [`Signature::insert`]
    pub fn with(mut self, id: ComponentId) -> Self {
        self.insert(id);
        self
    }

    #[inline]
    pub const fn test(self, id: ComponentId) -> bool {
        (id as usize) < MAX_COMPONENTS && self.0 & (1 << id) != 0
    }

    /// Superset check: every bit of `other` is also set in `self`
    #[inline]
    pub const fn has_all(self, other: Signature) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn intersects(self, other: Signature) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Bits set in `self` but not in `other`
    pub const fn difference(self, other: Signature) -> Signature {
        Signature(self.0 & !other.0)
    }

    /// Iterates set component ids in ascending order
    pub fn iter(self) -> SetBits {
        SetBits { bits: self.0 }
    }

    pub fn for_each_set_bit(self, mut f: impl FnMut(ComponentId)) {
        for id in self.iter() {
            f(id);
        }
    }
}

impl BitOr for Signature {
    type Output = Signature;

    fn bitor(self, rhs: Self) -> Self::Output {
        Signature(self.0 | rhs.0)
    }
}

impl BitAnd for Signature {
    type Output = Signature;

    fn bitand(self, rhs: Self) -> Self::Output {
        Signature(self.0 & rhs.0)
    }
}

impl Not for Signature {
    type Output = Signature;

    fn not(self) -> Self::Output {
        Signature(!self.0)
    }
}

impl FromIterator<ComponentId> for Signature {
    fn from_iter<I: IntoIterator<Item = ComponentId>>(iter: I) -> Self {
        let mut signature = Signature::EMPTY;
        for id in iter {
            signature.insert(id);
        }
        signature
    }
}

impl IntoIterator for Signature {
    type Item = ComponentId;
    type IntoIter = SetBits;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Iterator over the set bits of a [`Signature`], lowest id first
#[derive(Clone, Debug)]
pub struct SetBits {
    bits: u64,
}

impl Iterator for SetBits {
    type Item = ComponentId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.bits == 0 {
            return None;
        }
        let id = self.bits.trailing_zeros() as ComponentId;
        // clear lowest set bit
        self.bits &= self.bits - 1;
        Some(id)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.bits.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for SetBits {}
