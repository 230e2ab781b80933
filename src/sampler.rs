// Parameter Sampler - Seeded perturbation of nominal impact parameters
// Log-normal draws keep physical quantities positive; same seed gives the same sample set

use rand::prelude::*;
use rand_distr::LogNormal;
use rand_pcg::Pcg64;

use crate::error::{EngineError, EngineResult};
use crate::physics_engine::{ImpactParameters, ESCAPE_VELOCITY_KM_S};

/// Relative standard deviation of the diameter estimate
pub const DIAMETER_RELATIVE_SD: f64 = 0.10;

/// Relative standard deviation of the bulk density estimate
pub const DENSITY_RELATIVE_SD: f64 = 0.20;

/// Relative standard deviation of the entry velocity estimate
pub const VELOCITY_RELATIVE_SD: f64 = 0.05;

/// Mean-preserving log-normal with the given relative standard deviation.
///
/// σ² = ln(1 + cv²), μ = ln(mean) - σ²/2, so E[X] = mean and SD[X] = cv * mean.
/// Returns `None` when there is no spread to sample.
fn log_normal(mean: f64, relative_sd: f64) -> EngineResult<Option<LogNormal<f64>>> {
    if relative_sd <= 0.0 {
        return Ok(None);
    }
    let sigma = (1.0 + relative_sd * relative_sd).ln().sqrt();
    let mu = mean.ln() - 0.5 * sigma * sigma;
    LogNormal::new(mu, sigma)
        .map(Some)
        .map_err(|_| EngineError::degenerate("log-normal parameters"))
}

fn draw(dist: &Option<LogNormal<f64>>, nominal: f64, rng: &mut Pcg64) -> f64 {
    match dist {
        Some(d) => d.sample(rng),
        None => nominal,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSampler {
    pub diameter_relative_sd: f64,
    pub density_relative_sd: f64,
    pub velocity_relative_sd: f64,
}

impl Default for ParameterSampler {
    fn default() -> Self {
        Self {
            diameter_relative_sd: DIAMETER_RELATIVE_SD,
            density_relative_sd: DENSITY_RELATIVE_SD,
            velocity_relative_sd: VELOCITY_RELATIVE_SD,
        }
    }
}

impl ParameterSampler {
    /// Draw `n` perturbed parameter sets around `nominal`.
    ///
    /// Angle and location are operator-chosen and never resampled.
    /// Velocity draws are truncated at Earth escape velocity.
    pub fn sample(
        &self,
        nominal: &ImpactParameters,
        n: usize,
        seed: u64,
    ) -> EngineResult<Vec<ImpactParameters>> {
        let diameter = log_normal(nominal.diameter_m, self.diameter_relative_sd)?;
        let density = log_normal(nominal.density_kg_m3, self.density_relative_sd)?;
        let velocity = log_normal(nominal.velocity_km_s, self.velocity_relative_sd)?;

        let mut rng = Pcg64::seed_from_u64(seed);

        Ok((0..n)
            .map(|_| ImpactParameters {
                diameter_m: draw(&diameter, nominal.diameter_m, &mut rng),
                density_kg_m3: draw(&density, nominal.density_kg_m3, &mut rng),
                velocity_km_s: draw(&velocity, nominal.velocity_km_s, &mut rng)
                    .max(ESCAPE_VELOCITY_KM_S),
                ..*nominal
            })
            .collect())
    }
}
