//! Histogram kernels with runtime-selected acceleration
//!
//! The portable scalar kernels are always available. With the `simd`
//! feature on x86_64, an AVX2 path is chosen at runtime when the CPU
//! supports it. Operands are integer counts converted exactly to `f64`, so
//! both paths produce bit-identical sums.

/// Whether the accelerated path is active on this machine.
pub fn accelerated() -> bool {
    #[cfg(all(feature = "simd", target_arch = "x86_64"))]
    {
        if std::arch::is_x86_feature_detected!("avx2") {
            return true;
        }
    }
    false
}

/// Dot product of two count vectors.
pub fn dot(a: &[u32], b: &[u32]) -> f64 {
    #[cfg(all(feature = "simd", target_arch = "x86_64"))]
    {
        if accelerated() && exact_in_f64(a) && exact_in_f64(b) {
            // SAFETY: AVX2 availability checked at runtime.
            return unsafe { avx2::dot(a, b) };
        }
    }
    scalar_dot(a, b)
}

/// Sum of squares of a count vector.
pub fn norm_squared(a: &[u32]) -> f64 {
    dot(a, a)
}

pub fn scalar_dot(a: &[u32], b: &[u32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum()
}

/// Counts up to 2^20 keep every partial sum of a 256-bin dot product below
/// 2^53, so lane order cannot change the result.
#[cfg(all(feature = "simd", target_arch = "x86_64"))]
fn exact_in_f64(v: &[u32]) -> bool {
    const LIMIT: u32 = 1 << 20;
    v.len() <= 256 && v.iter().all(|&x| x <= LIMIT)
}

#[cfg(all(feature = "simd", target_arch = "x86_64"))]
mod avx2 {
    use std::arch::x86_64::*;

    /// Values must fit in `i32`; the dispatcher guarantees it.
    #[target_feature(enable = "avx2")]
    pub unsafe fn dot(a: &[u32], b: &[u32]) -> f64 {
        let len = a.len().min(b.len());
        let mut acc = _mm256_setzero_pd();
        let mut i = 0;
        while i + 4 <= len {
            let va = _mm256_cvtepi32_pd(_mm_loadu_si128(a.as_ptr().add(i) as *const __m128i));
            let vb = _mm256_cvtepi32_pd(_mm_loadu_si128(b.as_ptr().add(i) as *const __m128i));
            acc = _mm256_add_pd(acc, _mm256_mul_pd(va, vb));
            i += 4;
        }

        let mut lanes = [0.0f64; 4];
        _mm256_storeu_pd(lanes.as_mut_ptr(), acc);
        let mut sum: f64 = lanes.iter().sum();
        for j in i..len {
            sum += f64::from(a[j]) * f64::from(b[j]);
        }
        sum
    }
}
