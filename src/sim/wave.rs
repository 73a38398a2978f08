//! Terrain wave field
//!
//! Ground height is a superposition of four sinusoids: a slow baseline drift,
//! a main harmonic and two shorter sub-harmonics. Parameters are drawn once per
//! session from a seeded RNG, so every run gets its own terrain while staying
//! inside a fixed vertical band.

use std::f64::consts::TAU;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::tuning::Tuning;

/// One sinusoidal component of the wave
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Harmonic {
    pub amplitude: f32,
    pub wavelength: f32,
    pub phase: f32,
}

impl Harmonic {
    #[inline]
    fn sample(&self, x: f64) -> f64 {
        self.amplitude as f64 * (TAU * x / self.wavelength as f64 + self.phase as f64).sin()
    }
}

/// Per-session wave parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveParams {
    pub baseline: Harmonic,
    pub main: Harmonic,
    pub sub1: Harmonic,
    pub sub2: Harmonic,
    /// Highest point the ground may reach (smallest screen Y)
    pub min_y: f32,
    /// Lowest point the ground may reach (largest screen Y)
    pub max_y: f32,
}

impl WaveParams {
    /// Draw a fresh terrain profile
    ///
    /// Ranges, with `w` the canvas width:
    /// - baseline: amplitude 30..70, wavelength 2.5w..3.5w
    /// - main: amplitude 60..110, wavelength w/2..2w/3
    /// - sub1: 0.35..0.60 of main amplitude, 0.55..0.80 of main wavelength
    /// - sub2: 0.20..0.40 of main amplitude, 0.33..0.53 of main wavelength
    /// - every phase uniform in [0, 2π)
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, tuning: &Tuning) -> Self {
        let w = tuning.canvas_width;
        let phase = |rng: &mut R| rng.random::<f32>() * std::f32::consts::TAU;

        let baseline = Harmonic {
            amplitude: 30.0 + rng.random::<f32>() * 40.0,
            wavelength: w * (2.5 + rng.random::<f32>()),
            phase: phase(rng),
        };

        let main_amp = 60.0 + rng.random::<f32>() * 50.0;
        let main_lambda = w / 2.0 + rng.random::<f32>() * (w * 2.0 / 3.0 - w / 2.0);
        let main = Harmonic {
            amplitude: main_amp,
            wavelength: main_lambda,
            phase: phase(rng),
        };

        let sub1 = Harmonic {
            amplitude: main_amp * (0.35 + rng.random::<f32>() * 0.25),
            wavelength: main_lambda * (0.55 + rng.random::<f32>() * 0.25),
            phase: phase(rng),
        };

        let sub2 = Harmonic {
            amplitude: main_amp * (0.20 + rng.random::<f32>() * 0.20),
            wavelength: main_lambda * (0.33 + rng.random::<f32>() * 0.20),
            phase: phase(rng),
        };

        let (min_y, max_y) = tuning.wave_band();
        Self {
            baseline,
            main,
            sub1,
            sub2,
            min_y,
            max_y,
        }
    }

    /// Resting line the wave oscillates around
    #[inline]
    pub fn base_y(&self) -> f32 {
        (self.min_y + self.max_y) / 2.0
    }
}

/// Pure terrain height function over world X
///
/// `Copy` and immutable: presentation can hold its own copy and sample it from
/// any thread.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveField {
    params: WaveParams,
}

impl WaveField {
    pub fn new(params: WaveParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &WaveParams {
        &self.params
    }

    /// Ground height (screen Y) at a world X
    ///
    /// The raw sum is normalised by the total amplitude into [-1, 1] and then
    /// squashed into the `[min_y, max_y]` band.
    pub fn height_at(&self, world_x: f32) -> f32 {
        let p = &self.params;
        let x = world_x as f64;
        let base_y = p.base_y() as f64;

        let raw = base_y
            + p.baseline.sample(x)
            + p.main.sample(x)
            + p.sub1.sample(x)
            + p.sub2.sample(x);

        let total_amp = (p.baseline.amplitude
            + p.main.amplitude
            + p.sub1.amplitude
            + p.sub2.amplitude) as f64;
        let normalized = if total_amp > 0.0 {
            ((raw - base_y) / total_amp).clamp(-1.0, 1.0)
        } else {
            0.0
        };

        let half_band = (p.max_y - p.min_y) as f64 / 2.0;
        let height = (base_y + normalized * half_band) as f32;
        // f64 -> f32 rounding can land a hair outside the band
        height.clamp(p.min_y, p.max_y)
    }
}
