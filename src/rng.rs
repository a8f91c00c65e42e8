//! Random sources for the sampling integrators.
//!
//! Each thread owns one generator, so the free-function samplers below are
//! safe to call from every render worker without locking. The engine is a
//! 48-bit linear congruential generator (the `drand48` constants), which is
//! plenty for Monte-Carlo pixel estimates and measurably cheaper than the
//! std-quality generators on the hot path.

use std::cell::RefCell;

use rand::{Rng, RngCore, SeedableRng};

use crate::math::{Vec2, Vec3};

// ─── LCG Engine ─────────────────────────────────────────────────────────────

const LCG_MULTIPLIER: u64 = 0x5DEE_CE66D;
const LCG_INCREMENT: u64 = 11;
const LCG_MASK: u64 = (1 << 48) - 1;
const UNIFORM_SCALE: f64 = 1.0 / (1u64 << 48) as f64;

/// A 48-bit linear congruential generator.
///
/// State advances as `s ← (s · 0x5DEECE66D + 11) mod 2⁴⁸`; uniform doubles
/// take the full 48-bit state scaled by 2⁻⁴⁸, so consecutive values cover
/// `[0, 1)` with 48 bits of resolution.
#[derive(Debug, Clone)]
pub struct Lcg48 {
    state: u64,
}

impl Lcg48 {
    pub const fn new(seed: u64) -> Self {
        Self {
            state: seed & LCG_MASK,
        }
    }

    #[inline(always)]
    fn advance(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(LCG_MULTIPLIER)
            .wrapping_add(LCG_INCREMENT)
            & LCG_MASK;
        self.state
    }

    /// Uniform double in `[0, 1)`.
    #[inline(always)]
    pub fn uniform(&mut self) -> f64 {
        self.advance() as f64 * UNIFORM_SCALE
    }
}

impl RngCore for Lcg48 {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        // Drop the low 16 bits; the high bits of an LCG have the longest
        // periods.
        (self.advance() >> 16) as u32
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        (u64::from(self.next_u32()) << 32) | u64::from(self.next_u32())
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut chunks = dest.chunks_exact_mut(8);
        for chunk in &mut chunks {
            chunk.copy_from_slice(&self.next_u64().to_le_bytes());
        }
        let tail = chunks.into_remainder();
        if !tail.is_empty() {
            let bytes = self.next_u64().to_le_bytes();
            tail.copy_from_slice(&bytes[..tail.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for Lcg48 {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u64::from_le_bytes(seed))
    }

    fn seed_from_u64(state: u64) -> Self {
        Self::new(state)
    }
}

thread_local! {
    static ENGINE: RefCell<Lcg48> = RefCell::new(Lcg48::new(rand::thread_rng().gen()));
    static NORMAL_SPARE: RefCell<Option<f64>> = const { RefCell::new(None) };
}

/// Re-seeds the calling thread's generator. Renders are reproducible only
/// per-thread; deterministic tests pin the thread count to one.
pub fn reseed(seed: u64) {
    ENGINE.with(|e| *e.borrow_mut() = Lcg48::new(seed));
    NORMAL_SPARE.with(|s| *s.borrow_mut() = None);
}

/// Uniform double in `[0, 1)` from the calling thread's generator.
#[inline]
pub fn uniform() -> f64 {
    ENGINE.with(|e| e.borrow_mut().uniform())
}

// ─── Samplers ───────────────────────────────────────────────────────────────

/// Uniform point in the unit square `[0, 1)²`.
#[inline]
pub fn unit_square() -> Vec2 {
    Vec2::new(uniform(), uniform())
}

/// Uniform point in the unit disk, obtained by rejection-sampling
/// `unit_square · 2 − 1` against `x² + y² < 1`.
#[inline]
pub fn unit_disk() -> Vec2 {
    loop {
        let sample = Vec2::new(uniform() * 2.0 - 1.0, uniform() * 2.0 - 1.0);
        if sample.length_squared() < 1.0 {
            return sample;
        }
    }
}

/// Pair of independent standard-normal samples via the Marsaglia polar
/// method: sample the unit disk excluding the origin, then scale by
/// `√(−2 ln s / s)` with `s = x² + y²`.
pub fn normal_pair() -> Vec2 {
    loop {
        let x = uniform() * 2.0 - 1.0;
        let y = uniform() * 2.0 - 1.0;
        let s = x * x + y * y;
        if s < 1.0 && s != 0.0 {
            let scale = (-2.0 * s.ln() / s).sqrt();
            return Vec2::new(x * scale, y * scale);
        }
    }
}

/// Pair of independent standard-normal samples via the Box-Muller
/// transform. Exact where [`normal_pair`] rejects; slower on average
/// because of the trigonometry.
pub fn normal_pair_box_muller() -> Vec2 {
    let u0 = uniform().max(f64::MIN_POSITIVE);
    let u1 = uniform();
    let radius = (-2.0 * u0.ln()).sqrt();
    let angle = std::f64::consts::TAU * u1;
    Vec2::new(radius * angle.cos(), radius * angle.sin())
}

/// Single standard-normal sample; hands out the two halves of a cached
/// [`normal_pair`] on alternating calls.
pub fn normal() -> f64 {
    NORMAL_SPARE.with(|spare| {
        let mut spare = spare.borrow_mut();
        match spare.take() {
            Some(v) => v,
            None => {
                let pair = normal_pair();
                *spare = Some(pair.y);
                pair.x
            }
        }
    })
}

/// Uniform direction on the 2-sphere (Marsaglia 1972): pick
/// `(x₁, x₂) ∈ [−1, 1]²` rejecting `x₁² + x₂² ≥ 1`, then lift onto the
/// sphere.
pub fn unit_vector() -> Vec3 {
    loop {
        let x1 = uniform() * 2.0 - 1.0;
        let x2 = uniform() * 2.0 - 1.0;
        let s = x1 * x1 + x2 * x2;
        if s >= 1.0 {
            continue;
        }

        let lift = (1.0 - s).sqrt();
        return Vec3::new(2.0 * x1 * lift, 2.0 * x2 * lift, 1.0 - 2.0 * s);
    }
}
