//! Runtime CPU feature detection.
//!
//! Capabilities are probed lazily exactly once per process through a
//! [`OnceLock`] and read without further synchronization afterwards. The
//! probe never fails: unknown architectures simply report an all-scalar
//! capability set.

use std::sync::OnceLock;

/// Detected SIMD capability flags, immutable after initialization.
///
/// On x86_64 the fields mirror CPUID feature bits. On aarch64, NEON is
/// architecturally mandatory and always reported; dot-product and SVE are
/// optional extensions probed through the platform capability query. Fields
/// for the other architecture family are simply `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimdCapabilities {
    pub sse2: bool,
    pub sse42: bool,
    pub avx: bool,
    pub avx2: bool,
    pub avx512f: bool,
    pub avx512bw: bool,
    pub neon: bool,
    pub dotprod: bool,
    pub sve: bool,
    pub sve2: bool,
}

impl SimdCapabilities {
    /// True if any vector backend is usable at all.
    pub fn any_simd(&self) -> bool {
        self.sse2 || self.neon
    }
}

static CAPABILITIES: OnceLock<SimdCapabilities> = OnceLock::new();

/// Detect CPU capabilities, memoized for the life of the process.
pub fn detect() -> SimdCapabilities {
    *CAPABILITIES.get_or_init(probe)
}

#[cfg(target_arch = "x86_64")]
fn probe() -> SimdCapabilities {
    SimdCapabilities {
        sse2: is_x86_feature_detected!("sse2"),
        sse42: is_x86_feature_detected!("sse4.2"),
        avx: is_x86_feature_detected!("avx"),
        avx2: is_x86_feature_detected!("avx2"),
        avx512f: is_x86_feature_detected!("avx512f"),
        avx512bw: is_x86_feature_detected!("avx512bw"),
        ..SimdCapabilities::default()
    }
}

#[cfg(target_arch = "aarch64")]
fn probe() -> SimdCapabilities {
    SimdCapabilities {
        // NEON (ASIMD) is mandatory on AArch64.
        neon: true,
        dotprod: std::arch::is_aarch64_feature_detected!("dotprod"),
        sve: std::arch::is_aarch64_feature_detected!("sve"),
        sve2: std::arch::is_aarch64_feature_detected!("sve2"),
        ..SimdCapabilities::default()
    }
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn probe() -> SimdCapabilities {
    SimdCapabilities::default()
}
