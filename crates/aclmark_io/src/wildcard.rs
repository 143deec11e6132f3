use aclmark_core::span::Span;
use bitvec::prelude::*;

use crate::error::StatementError;

/// Number of maximal ranges `addr wildcard` matches: the low-order run of
/// don't-care bits forms one block, every other don't-care bit doubles the
/// block count.
pub fn range_count(wildcard: u32) -> u64 {
    let bits = wildcard.view_bits::<Lsb0>();
    let block = bits.leading_ones();
    let scattered = bits[block..].count_ones();
    1u64 << scattered
}

/// Decompose an address and a (possibly non-contiguous) wildcard mask into
/// the ascending list of maximal contiguous address ranges `i` satisfying
/// `i & !wildcard == addr & !wildcard`.
///
/// Fails with [StatementError::TooManyRanges] instead of materializing more
/// than `limit` ranges.
pub fn decompose(addr: u32, wildcard: u32, limit: usize) -> Result<Vec<Span<u32>>, StatementError> {
    let count = range_count(wildcard);
    if count > limit as u64 {
        return Err(StatementError::TooManyRanges { count, limit });
    }

    let block = wildcard.view_bits::<Lsb0>().leading_ones();
    let block_mask = ((1u64 << block) - 1) as u32;
    let scattered = wildcard & !block_mask;
    let base = addr & !wildcard;

    let mut ranges = Vec::with_capacity(count as usize);
    // walk the subsets of the scattered bits in increasing order
    let mut sub = 0u32;
    loop {
        let lo = base | sub;
        ranges.push(Span::new(lo, lo | block_mask).unwrap_or(Span::point(lo)));
        if sub == scattered {
            break;
        }
        sub = sub.wrapping_sub(scattered) & scattered;
    }
    Ok(ranges)
}
