use std::{
    cmp::{max, min},
    fmt::{Debug, Formatter},
    net::Ipv4Addr,
};

use funty::Unsigned;

/// Span is an inclusive interval `[lo, hi]` over one header field.
/// Addresses use `Span<u32>`, transport ports use `Span<u16>`.
///
/// A span is never empty: constructors return `None` instead of producing
/// `lo > hi`, so every operation that may empty a span is `Option`-valued.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span<U: Unsigned> {
    lo: U,
    hi: U,
}

impl<U: Unsigned> Span<U> {
    #[inline]
    pub fn new(lo: U, hi: U) -> Option<Self> {
        (lo <= hi).then_some(Span { lo, hi })
    }

    #[inline]
    pub fn point(value: U) -> Self {
        Span { lo: value, hi: value }
    }

    #[inline]
    pub fn full() -> Self {
        Span {
            lo: U::ZERO,
            hi: U::MAX,
        }
    }

    #[inline]
    pub fn lo(&self) -> U {
        self.lo
    }

    #[inline]
    pub fn hi(&self) -> U {
        self.hi
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.lo == U::ZERO && self.hi == U::MAX
    }

    #[inline]
    pub fn is_point(&self) -> bool {
        self.lo == self.hi
    }

    /// `self` is a superset of `rhs`.
    #[inline]
    pub fn contains(&self, rhs: &Self) -> bool {
        self.lo <= rhs.lo && rhs.hi <= self.hi
    }

    #[inline]
    pub fn intersects(&self, rhs: &Self) -> bool {
        self.lo <= rhs.hi && rhs.lo <= self.hi
    }

    #[inline]
    pub fn intersect(&self, rhs: &Self) -> Option<Self> {
        Span::new(max(self.lo, rhs.lo), min(self.hi, rhs.hi))
    }

    /// `a.hi + 1 == b.lo` or `b.hi + 1 == a.lo`, without wrapping at `U::MAX`.
    #[inline]
    pub fn is_adjacent(&self, rhs: &Self) -> bool {
        (self.hi != U::MAX && self.hi + U::ONE == rhs.lo)
            || (rhs.hi != U::MAX && rhs.hi + U::ONE == self.lo)
    }

    /// Smallest span covering both. Only meaningful for adjacent or
    /// intersecting spans.
    #[inline]
    pub fn hull(&self, rhs: &Self) -> Self {
        Span {
            lo: min(self.lo, rhs.lo),
            hi: max(self.hi, rhs.hi),
        }
    }

    /// The part of `self` strictly below `at`.
    #[inline]
    pub fn below(&self, at: U) -> Option<Self> {
        if at > self.lo {
            Span::new(self.lo, min(self.hi, at - U::ONE))
        } else {
            None
        }
    }

    /// The part of `self` strictly above `at`.
    #[inline]
    pub fn above(&self, at: U) -> Option<Self> {
        if at < self.hi {
            Span::new(max(self.lo, at + U::ONE), self.hi)
        } else {
            None
        }
    }
}

impl<U: Unsigned> Debug for Span<U> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.lo, self.hi)
    }
}

impl Span<u32> {
    /// Span of an IPv4 prefix, `None` when `plen > 32`. Host bits of `addr`
    /// are ignored.
    pub fn from_prefix(addr: Ipv4Addr, plen: u8) -> Option<Self> {
        if plen > 32 {
            return None;
        }
        let host_bits = u32::MAX.checked_shr(plen as u32).unwrap_or(0);
        let base = u32::from(addr) & !host_bits;
        Span::new(base, base | host_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_new_rejects_inverted() {
        assert!(Span::new(5u16, 4).is_none());
        assert_eq!(Span::new(4u16, 4), Some(Span::point(4)));
    }

    #[test]
    fn test_span_adjacent_at_bounds() {
        let low = Span::new(0u16, 79).unwrap();
        let high = Span::new(80u16, u16::MAX).unwrap();
        assert!(low.is_adjacent(&high));
        assert!(high.is_adjacent(&low));
        assert!(!Span::<u16>::full().is_adjacent(&Span::point(0)));
        assert_eq!(low.hull(&high), Span::full());
    }

    #[test]
    fn test_span_below_above() {
        let s = Span::new(10u32, 20).unwrap();
        assert_eq!(s.below(10), None);
        assert_eq!(s.below(15), Span::new(10, 14));
        assert_eq!(s.above(20), None);
        assert_eq!(s.above(15), Span::new(16, 20));
        let full = Span::<u32>::full();
        assert_eq!(full.above(u32::MAX), None);
        assert_eq!(full.below(0), None);
    }

    #[test]
    fn test_span_from_prefix() {
        let s = Span::from_prefix(Ipv4Addr::new(10, 1, 2, 3), 24).unwrap();
        assert_eq!(s.lo(), u32::from(Ipv4Addr::new(10, 1, 2, 0)));
        assert_eq!(s.hi(), u32::from(Ipv4Addr::new(10, 1, 2, 255)));
        assert_eq!(Span::from_prefix(Ipv4Addr::UNSPECIFIED, 0), Some(Span::full()));
        assert_eq!(
            Span::from_prefix(Ipv4Addr::new(1, 2, 3, 4), 32),
            Some(Span::point(0x01020304))
        );
        assert!(Span::from_prefix(Ipv4Addr::UNSPECIFIED, 33).is_none());
    }
}
