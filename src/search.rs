//! Fixed-width exact-match search over padded key blocks.
//!
//! Callers must uphold:
//! - `haystack.len()` is a non-zero multiple of [`LANES`];
//! - `query` occurs at most once in `haystack`.
//!
//! Unused slots are padded with `0`, which never equals a valid (non-zero)
//! query, so repeated padding does not break the second rule.

/// Keys compared per block.
pub const LANES: usize = 8;

/// Returns the slot holding `query`, or `None`.
#[inline]
pub fn find_exact(query: u64, haystack: &[u64]) -> Option<usize> {
    debug_assert!(!haystack.is_empty() && haystack.len() % LANES == 0);

    #[cfg(target_arch = "x86_64")]
    {
        if std::is_x86_feature_detected!("sse4.1") {
            // SAFETY: feature detected at runtime.
            return unsafe { find_exact_sse41(query, haystack) };
        }
    }
    find_exact_portable(query, haystack)
}

#[inline]
fn find_exact_portable(query: u64, haystack: &[u64]) -> Option<usize> {
    for (block, keys) in haystack.chunks_exact(LANES).enumerate() {
        let mut mask = 0u32;
        for (lane, &k) in keys.iter().enumerate() {
            mask |= ((k == query) as u32) << lane;
        }
        if mask != 0 {
            return Some(block * LANES + mask.trailing_zeros() as usize);
        }
    }
    None
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse4.1")]
unsafe fn find_exact_sse41(query: u64, haystack: &[u64]) -> Option<usize> {
    use core::arch::x86_64::{
        __m128i, _mm_castsi128_pd, _mm_cmpeq_epi64, _mm_loadu_si128, _mm_movemask_pd,
        _mm_set1_epi64x,
    };

    // SAFETY: caller guarantees SSE4.1. Every load reads two in-bounds u64s
    // from a `chunks_exact(LANES)` block; `loadu` has no alignment requirement.
    unsafe {
        let needle = _mm_set1_epi64x(query as i64);
        for (block, keys) in haystack.chunks_exact(LANES).enumerate() {
            let p = keys.as_ptr() as *const __m128i;
            let m0 = _mm_movemask_pd(_mm_castsi128_pd(_mm_cmpeq_epi64(needle, _mm_loadu_si128(p))));
            let m1 = _mm_movemask_pd(_mm_castsi128_pd(_mm_cmpeq_epi64(needle, _mm_loadu_si128(p.add(1)))));
            let m2 = _mm_movemask_pd(_mm_castsi128_pd(_mm_cmpeq_epi64(needle, _mm_loadu_si128(p.add(2)))));
            let m3 = _mm_movemask_pd(_mm_castsi128_pd(_mm_cmpeq_epi64(needle, _mm_loadu_si128(p.add(3)))));
            let mask = (m0 | (m1 << 2) | (m2 << 4) | (m3 << 6)) as u32;
            if mask != 0 {
                return Some(block * LANES + mask.trailing_zeros() as usize);
            }
        }
    }
    None
}
