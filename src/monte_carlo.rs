// Monte Carlo Aggregator - Uncertainty propagation through the impact model
// Fans samples out across worker threads, merges per-channel arrays, reduces to percentile bands

use rayon::prelude::*;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::materials::MaterialType;
use crate::physics_engine::{
    BlastLevel, ImpactParameters, ImpactPhysicsModel, PhysicalEffects, ThermalLevel,
};

/// Default number of Monte Carlo samples per simulation
pub const DEFAULT_SAMPLES: usize = 1000;

/// Samples handed to one worker at a time
pub const DEFAULT_CHUNK_SIZE: usize = 64;

// =============================================================================
// UNCERTAINTY BAND
// =============================================================================

/// 5th / 50th / 95th percentile of one scalar. Always p5 <= p50 <= p95.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyBand {
    pub p5: f64,
    pub p50: f64,
    pub p95: f64,
}

impl UncertaintyBand {
    /// Band collapsed to a single value
    pub fn point(value: f64) -> Self {
        Self {
            p5: value,
            p50: value,
            p95: value,
        }
    }

    /// Reduce already-sorted values. `sorted` must be non-empty.
    pub fn from_sorted(sorted: &[f64]) -> Self {
        Self {
            p5: percentile(sorted, 5.0),
            p50: percentile(sorted, 50.0),
            p95: percentile(sorted, 95.0),
        }
    }

    /// Apply a non-decreasing function to every percentile
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            p5: f(self.p5),
            p50: f(self.p50),
            p95: f(self.p95),
        }
    }

    /// Per-percentile maximum
    pub fn max(&self, other: &UncertaintyBand) -> Self {
        Self {
            p5: self.p5.max(other.p5),
            p50: self.p50.max(other.p50),
            p95: self.p95.max(other.p95),
        }
    }

    pub fn is_ordered(&self) -> bool {
        self.p5 <= self.p50 && self.p50 <= self.p95
    }
}

/// Percentile with linear interpolation between closest ranks.
/// Result is clamped to its bracketing samples so ordering survives rounding.
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (pct / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = (lower + 1).min(n - 1);
            let frac = rank - lower as f64;
            let (lo, hi) = (sorted[lower], sorted[upper]);
            (lo + (hi - lo) * frac).clamp(lo, hi)
        }
    }
}

/// Band plus the sample extremes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub band: UncertaintyBand,
    pub min: f64,
    pub max: f64,
}

impl ChannelStats {
    pub fn from_samples(mut values: Vec<f64>) -> Self {
        values.sort_by(|a, b| a.total_cmp(b));
        let band = UncertaintyBand::from_sorted(&values);
        Self {
            band,
            min: values.first().copied().unwrap_or(0.0),
            max: values.last().copied().unwrap_or(0.0),
        }
    }

    pub fn point(value: f64) -> Self {
        Self {
            band: UncertaintyBand::point(value),
            min: value,
            max: value,
        }
    }

    /// Union of two concentric zones: the larger radius wins at every percentile
    pub fn union(&self, other: &ChannelStats) -> Self {
        Self {
            band: self.band.max(&other.band),
            min: self.min.max(other.min),
            max: self.max.max(other.max),
        }
    }
}

// =============================================================================
// CHANNELS
// =============================================================================

/// One scalar output of the impact model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Channel {
    EnergyTntTons,
    Blast(BlastLevel),
    Thermal(ThermalLevel),
    CraterRim,
    CraterDepth,
    CraterEjecta,
    MaterialRadius(MaterialType),
    MaterialDamage(MaterialType),
}

/// Per-channel sample arrays for one batch of model runs
#[derive(Debug, Default)]
struct ChannelSamples {
    values: BTreeMap<Channel, Vec<f64>>,
}

impl ChannelSamples {
    fn push(&mut self, channel: Channel, value: f64) {
        self.values.entry(channel).or_default().push(value);
    }

    fn record(&mut self, effects: &PhysicalEffects) {
        self.push(Channel::EnergyTntTons, effects.tnt_tons);
        for level in BlastLevel::ALL {
            self.push(Channel::Blast(level), effects.blast_radius(level));
        }
        for level in ThermalLevel::ALL {
            self.push(Channel::Thermal(level), effects.thermal_radius(level));
        }
        self.push(Channel::CraterRim, effects.crater.rim_radius_km);
        self.push(Channel::CraterDepth, effects.crater.depth_m);
        self.push(Channel::CraterEjecta, effects.crater.ejecta_radius_km);
        for footprint in &effects.materials {
            self.push(Channel::MaterialRadius(footprint.material_type), footprint.radius_km);
            self.push(
                Channel::MaterialDamage(footprint.material_type),
                footprint.damage_percentage,
            );
        }
    }

    /// Concatenate another batch after this one
    fn append(mut self, other: ChannelSamples) -> Self {
        for (channel, mut values) in other.values {
            self.values.entry(channel).or_default().append(&mut values);
        }
        self
    }
}

/// Percentile reduction of every channel
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedChannels {
    channels: BTreeMap<Channel, ChannelStats>,
    samples: usize,
}

impl AggregatedChannels {
    pub fn get(&self, channel: Channel) -> EngineResult<&ChannelStats> {
        self.channels.get(&channel).ok_or_else(|| {
            EngineError::unavailable("aggregated channels", format!("missing channel {:?}", channel))
        })
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Channel, &ChannelStats)> {
        self.channels.iter()
    }
}

// =============================================================================
// AGGREGATOR
// =============================================================================

#[derive(Clone)]
pub struct MonteCarloAggregator {
    chunk_size: usize,
    pool: Option<Arc<ThreadPool>>,
}

impl std::fmt::Debug for MonteCarloAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonteCarloAggregator")
            .field("chunk_size", &self.chunk_size)
            .field("dedicated_pool", &self.pool.is_some())
            .finish()
    }
}

impl Default for MonteCarloAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl MonteCarloAggregator {
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            pool: None,
        }
    }

    /// Run on a dedicated pool instead of rayon's global one
    pub fn with_pool(mut self, pool: Arc<ThreadPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Run the model over every sample and reduce each channel to a band.
    ///
    /// Chunks run independently; their arrays are concatenated in sample order
    /// before the percentile reduction, so results do not depend on thread count.
    pub fn aggregate(
        &self,
        samples: &[ImpactParameters],
        model: &ImpactPhysicsModel,
    ) -> EngineResult<AggregatedChannels> {
        if samples.is_empty() {
            return Err(EngineError::validation("samples", "at least one sample is required"));
        }

        let chunk_size = self.chunk_size.max(1);
        let run = || -> EngineResult<ChannelSamples> {
            let batches = samples
                .par_chunks(chunk_size)
                .map(|chunk| {
                    let mut batch = ChannelSamples::default();
                    for params in chunk {
                        batch.record(&model.compute(params)?);
                    }
                    Ok(batch)
                })
                .collect::<EngineResult<Vec<_>>>()?;

            Ok(batches
                .into_iter()
                .fold(ChannelSamples::default(), ChannelSamples::append))
        };

        let merged = match &self.pool {
            Some(pool) => pool.install(run)?,
            None => run()?,
        };

        let channels = merged
            .values
            .into_iter()
            .map(|(channel, values)| (channel, ChannelStats::from_samples(values)))
            .collect();

        Ok(AggregatedChannels {
            channels,
            samples: samples.len(),
        })
    }
}
