//! Seedable non-cryptographic uniform generators for the sampling loops.
//!
//! Every estimator takes an explicit generator handle; there is no global
//! random state. Per-worker streams are derived from one base seed with
//! [`stream_seed`].

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

pub type Xoshiro256Rng = Xoshiro256PlusPlus;
pub type Pcg64Rng = Pcg64;

/// Source of uniform variates on `[0, 1)`.
pub trait UniformSource {
    fn next_f64(&mut self) -> f64;

    /// Uniform variate on `[lo, hi)`.
    #[inline(always)]
    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        (hi - lo).mul_add(self.next_f64(), lo)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FastRngKind {
    #[default]
    Xoshiro256PlusPlus,
    Pcg64,
    StdRng,
}

impl std::str::FromStr for FastRngKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xoshiro" | "xoshiro256++" | "xoshiro256plusplus" => Ok(Self::Xoshiro256PlusPlus),
            "pcg" | "pcg64" => Ok(Self::Pcg64),
            "std" | "stdrng" | "chacha" => Ok(Self::StdRng),
            other => Err(format!(
                "unknown rng `{other}` (expected xoshiro, pcg or std)"
            )),
        }
    }
}

impl std::fmt::Display for FastRngKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Xoshiro256PlusPlus => "xoshiro",
            Self::Pcg64 => "pcg",
            Self::StdRng => "std",
        })
    }
}

#[derive(Debug, Clone)]
pub struct Xoshiro256PlusPlus {
    state: [u64; 4],
}

impl Xoshiro256PlusPlus {
    #[inline]
    pub fn seed_from_u64(seed: u64) -> Self {
        let mut sm = SplitMix64::new(seed);
        let mut state = [0_u64; 4];
        for item in &mut state {
            *item = sm.next_u64();
        }

        if state.iter().all(|&x| x == 0) {
            state[0] = 1;
        }

        Self { state }
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.state[0].wrapping_add(self.state[3]))
            .rotate_left(23)
            .wrapping_add(self.state[0]);

        let t = self.state[1] << 17;

        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];

        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);

        result
    }
}

impl UniformSource for Xoshiro256PlusPlus {
    #[inline(always)]
    fn next_f64(&mut self) -> f64 {
        unit_f64(self.next_u64())
    }
}

#[derive(Debug, Clone)]
pub struct Pcg64 {
    state: u128,
    inc: u128,
}

impl Pcg64 {
    const MULTIPLIER: u128 = 47026247687942121848144207491837523525;

    #[inline]
    pub fn seed_from_u64(seed: u64) -> Self {
        let mut sm = SplitMix64::new(seed);
        let state_hi = sm.next_u64() as u128;
        let state_lo = sm.next_u64() as u128;
        let stream = sm.next_u64() as u128;

        let mut rng = Self {
            state: (state_hi << 64) | state_lo,
            inc: (stream << 1) | 1,
        };
        let _ = rng.next_u64();
        rng
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let oldstate = self.state;
        self.state = oldstate
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(self.inc);

        // XSL-RR 128/64 output permutation.
        let xorshifted = ((oldstate >> 64) ^ oldstate) as u64;
        let rot = (oldstate >> 122) as u32;
        xorshifted.rotate_right(rot)
    }
}

impl UniformSource for Pcg64 {
    #[inline(always)]
    fn next_f64(&mut self) -> f64 {
        unit_f64(self.next_u64())
    }
}

impl UniformSource for StdRng {
    #[inline(always)]
    fn next_f64(&mut self) -> f64 {
        self.random::<f64>()
    }
}

/// Generator selected at runtime by [`FastRngKind`].
#[derive(Debug)]
pub enum FastRng {
    Xoshiro256PlusPlus(Xoshiro256Rng),
    Pcg64(Pcg64Rng),
    StdRng(StdRng),
}

impl FastRng {
    #[inline]
    pub fn from_seed(kind: FastRngKind, seed: u64) -> Self {
        match kind {
            FastRngKind::Xoshiro256PlusPlus => {
                Self::Xoshiro256PlusPlus(Xoshiro256Rng::seed_from_u64(seed))
            }
            FastRngKind::Pcg64 => Self::Pcg64(Pcg64Rng::seed_from_u64(seed)),
            FastRngKind::StdRng => Self::StdRng(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn kind(&self) -> FastRngKind {
        match self {
            Self::Xoshiro256PlusPlus(_) => FastRngKind::Xoshiro256PlusPlus,
            Self::Pcg64(_) => FastRngKind::Pcg64,
            Self::StdRng(_) => FastRngKind::StdRng,
        }
    }
}

impl UniformSource for FastRng {
    #[inline(always)]
    fn next_f64(&mut self) -> f64 {
        match self {
            Self::Xoshiro256PlusPlus(rng) => rng.next_f64(),
            Self::Pcg64(rng) => rng.next_f64(),
            Self::StdRng(rng) => rng.next_f64(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    #[inline]
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

/// Top 53 bits of `x` mapped onto `[0, 1)`.
#[inline(always)]
fn unit_f64(x: u64) -> f64 {
    (x >> 11) as f64 * (1.0 / ((1_u64 << 53) as f64))
}

/// Seed of worker `stream_index` derived from `base_seed`.
#[inline]
pub fn stream_seed(base_seed: u64, stream_index: usize) -> u64 {
    base_seed.wrapping_add((stream_index as u64).wrapping_mul(6_364_136_223_846_793_005))
}

/// Fresh seed from the thread-local OS-seeded generator.
pub fn entropy_seed() -> u64 {
    rand::rng().random::<u64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xoshiro_same_seed_reproduces_sequence() {
        let mut a = FastRng::from_seed(FastRngKind::Xoshiro256PlusPlus, 42);
        let mut b = FastRng::from_seed(FastRngKind::Xoshiro256PlusPlus, 42);

        for _ in 0..128 {
            assert_eq!(a.next_f64(), b.next_f64());
        }
    }

    #[test]
    fn std_rng_same_seed_reproduces_sequence() {
        let mut a = FastRng::from_seed(FastRngKind::StdRng, 7);
        let mut b = FastRng::from_seed(FastRngKind::StdRng, 7);

        for _ in 0..128 {
            assert_eq!(a.next_f64(), b.next_f64());
        }
    }

    #[test]
    fn uniform_stays_in_half_open_range() {
        for kind in [
            FastRngKind::Xoshiro256PlusPlus,
            FastRngKind::Pcg64,
            FastRngKind::StdRng,
        ] {
            let mut rng = FastRng::from_seed(kind, 1);
            for _ in 0..1000 {
                let x = rng.uniform(-21.0, 35.0);
                assert!((-21.0..35.0).contains(&x), "{kind}: {x}");
            }
        }
    }

    #[test]
    fn worker_streams_differ() {
        let mut a = Xoshiro256Rng::seed_from_u64(stream_seed(99, 0));
        let mut b = Xoshiro256Rng::seed_from_u64(stream_seed(99, 1));
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn kind_parses_cli_names() {
        assert_eq!("pcg".parse::<FastRngKind>(), Ok(FastRngKind::Pcg64));
        assert_eq!(
            "Xoshiro".parse::<FastRngKind>(),
            Ok(FastRngKind::Xoshiro256PlusPlus)
        );
        assert!("mersenne".parse::<FastRngKind>().is_err());
    }
}
