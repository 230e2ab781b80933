// State Manager - Simulation orchestration and shared read-only data
// Owns the population dataset and material table, serves simulate / deflect / presets / health

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn};

use crate::config::{EngineConfig, MAX_SAMPLES};
use crate::deflection::{
    DeflectionModel, DeflectionParameters, DeflectionResult, OriginalTrajectory,
};
use crate::error::{EngineError, EngineResult, ErrorPayload};
use crate::materials::{MaterialDamageCalculator, MaterialDamageEntry, MaterialTable};
use crate::monte_carlo::{AggregatedChannels, Channel, MonteCarloAggregator, UncertaintyBand};
use crate::physics_engine::{BlastLevel, ImpactParameters, ImpactPhysicsModel, ThermalLevel};
use crate::population::{
    ExposureReport, ExposureZone, GeoPoint, PopulationDataset, PopulationExposureEstimator,
};
use crate::presets::{preset_scenarios, PresetScenario};
use crate::sampler::ParameterSampler;

// =============================================================================
// REQUESTS
// =============================================================================

fn default_density() -> f64 {
    2500.0
}

fn default_velocity() -> f64 {
    20.0
}

fn default_angle() -> f64 {
    45.0
}

fn default_asteroid_diameter() -> f64 {
    100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub lat: f64,
    pub lon: f64,
    pub diameter_m: f64,
    #[serde(default = "default_density")]
    pub density_kg_m3: f64,
    #[serde(default = "default_velocity")]
    pub velocity_km_s: f64,
    #[serde(default = "default_angle")]
    pub angle_deg: f64,
    /// Overrides the configured sample count
    #[serde(default)]
    pub samples: Option<usize>,
    /// Overrides the configured seed
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SimulationRequest {
    pub fn parameters(&self) -> ImpactParameters {
        ImpactParameters {
            diameter_m: self.diameter_m,
            density_kg_m3: self.density_kg_m3,
            velocity_km_s: self.velocity_km_s,
            angle_deg: self.angle_deg,
            lat: self.lat,
            lon: self.lon,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeflectionRequest {
    pub delta_v_cm_s: f64,
    pub lead_time_years: f64,
    pub method: String,
    #[serde(default = "default_asteroid_diameter")]
    pub asteroid_diameter_m: f64,
    #[serde(default)]
    pub original_trajectory: OriginalTrajectory,
}

impl DeflectionRequest {
    pub fn parameters(&self) -> EngineResult<DeflectionParameters> {
        Ok(DeflectionParameters {
            delta_v_cm_s: self.delta_v_cm_s,
            lead_time_years: self.lead_time_years,
            method: self.method.parse()?,
            asteroid_diameter_m: self.asteroid_diameter_m,
            original_trajectory: self.original_trajectory,
        })
    }
}

/// One line of the JSON-lines transport
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum EngineRequest {
    Simulate(SimulationRequest),
    Deflect(DeflectionRequest),
    Presets,
    Health,
}

// =============================================================================
// RESULTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlastEffect {
    pub psi: f64,
    pub r_km: UncertaintyBand,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalEffect {
    #[serde(rename = "J_m2")]
    pub j_m2: f64,
    pub r_km: UncertaintyBand,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CraterResult {
    pub rim_r_km: UncertaintyBand,
    pub depth_m: UncertaintyBand,
    pub ejecta_r_km: UncertaintyBand,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactEffects {
    pub blast: Vec<BlastEffect>,
    pub thermal: Vec<ThermalEffect>,
    pub crater: CraterResult,
    pub texture: Vec<MaterialDamageEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationMetadata {
    pub energy_tnt_tons: UncertaintyBand,
    pub calculation_time_ms: f64,
    pub uncertainty_method: String,
    pub population_year: i32,
    pub samples: usize,
    pub seed: u64,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub effects: ImpactEffects,
    pub exposure: ExposureReport,
    pub metadata: SimulationMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub population_ready: bool,
    pub population_centers: usize,
    pub population_year: i32,
    pub materials: usize,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EngineResponse {
    Simulation(Box<SimulationResult>),
    Deflection(DeflectionResult),
    Presets { presets: Vec<PresetScenario> },
    Health(HealthReport),
    Error { error: ErrorPayload },
}

impl From<EngineError> for EngineResponse {
    fn from(err: EngineError) -> Self {
        EngineResponse::Error {
            error: err.to_payload(),
        }
    }
}

// =============================================================================
// ENGINE
// =============================================================================

pub struct ImpactEngine {
    config: EngineConfig,
    population: Arc<RwLock<Arc<PopulationDataset>>>,
    model: ImpactPhysicsModel,
    sampler: ParameterSampler,
    aggregator: MonteCarloAggregator,
    deflection: DeflectionModel,
}

impl ImpactEngine {
    pub fn new(
        config: EngineConfig,
        population: PopulationDataset,
        materials: MaterialTable,
    ) -> EngineResult<Self> {
        config.validate()?;
        population.validate()?;
        let model = ImpactPhysicsModel::new(Arc::new(materials))?;

        let mut aggregator = MonteCarloAggregator::new();
        if let Some(threads) = config.worker_threads {
            let pool = ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("impactor-worker-{}", i))
                .build()
                .map_err(|e| EngineError::Config(format!("worker pool: {}", e)))?;
            aggregator = aggregator.with_pool(Arc::new(pool));
        }

        info!(
            "Impact engine ready: {} population centers ({}), {} materials, {} samples",
            population.centers.len(),
            population.year,
            model.materials().rows().len(),
            config.samples
        );

        Ok(Self {
            config,
            population: Arc::new(RwLock::new(Arc::new(population))),
            model,
            sampler: ParameterSampler::default(),
            aggregator,
            deflection: DeflectionModel::new(),
        })
    }

    /// Build from configuration: population file if set, otherwise the built-in table
    pub fn from_config(config: EngineConfig) -> EngineResult<Self> {
        let population = load_population(&config)?;
        Self::new(config, population, MaterialTable::standard())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current dataset. Callers keep the snapshot for the whole call.
    pub fn population(&self) -> Arc<PopulationDataset> {
        self.population.read().clone()
    }

    /// Swap in a new dataset. In-flight calls keep the snapshot they started with.
    pub fn refresh_population(&self, dataset: PopulationDataset) -> EngineResult<()> {
        dataset.validate()?;
        info!(
            "Population dataset replaced: {} centers, year {}",
            dataset.centers.len(),
            dataset.year
        );
        *self.population.write() = Arc::new(dataset);
        Ok(())
    }

    /// Re-read the configured source
    pub fn reload_population(&self) -> EngineResult<()> {
        self.refresh_population(load_population(&self.config)?)
    }

    pub fn simulate(&self, request: &SimulationRequest) -> EngineResult<SimulationResult> {
        let samples = request.samples.unwrap_or(self.config.samples);
        let seed = request.seed.unwrap_or(self.config.seed);
        self.simulate_with_seed(&request.parameters(), samples, seed)
    }

    pub fn simulate_with_seed(
        &self,
        params: &ImpactParameters,
        samples: usize,
        seed: u64,
    ) -> EngineResult<SimulationResult> {
        let _span = info_span!("simulate", samples, seed).entered();
        let start = Instant::now();
        params.validate()?;
        if samples == 0 || samples > MAX_SAMPLES {
            return Err(EngineError::validation(
                "samples",
                format!("must be within 1..={}, got {}", MAX_SAMPLES, samples),
            ));
        }

        info!(
            "Simulating impact at ({}, {}): {} m, {} kg/m³, {} km/s, {}°",
            params.lat,
            params.lon,
            params.diameter_m,
            params.density_kg_m3,
            params.velocity_km_s,
            params.angle_deg
        );

        // Fail before the expensive part if the dataset is unusable
        let population = self.population();
        let estimator = PopulationExposureEstimator::new(&population)?;

        let draws = self.sampler.sample(params, samples, seed)?;
        let channels = self.aggregator.aggregate(&draws, &self.model)?;
        debug!("Aggregated {} samples (seed {})", channels.samples(), seed);

        let effects = build_effects(&channels, self.model.materials())?;
        let zones = exposure_zones(&channels)?;
        let exposure = estimator.assess(GeoPoint::new(params.lat, params.lon), &zones);

        let calculation_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        info!(
            "Simulation completed in {:.1}ms, {:.0} people affected (p50)",
            calculation_time_ms, exposure.total_affected.p50
        );

        Ok(SimulationResult {
            effects,
            exposure,
            metadata: SimulationMetadata {
                energy_tnt_tons: channels.get(Channel::EnergyTntTons)?.band,
                calculation_time_ms,
                uncertainty_method: "monte_carlo".to_string(),
                population_year: population.year,
                samples,
                seed,
                computed_at: Utc::now(),
            },
        })
    }

    pub fn deflect(&self, request: &DeflectionRequest) -> EngineResult<DeflectionResult> {
        let _span = info_span!("deflect", method = %request.method).entered();
        info!(
            "Simulating {} deflection: {} cm/s, {} years lead time",
            request.method, request.delta_v_cm_s, request.lead_time_years
        );
        let params = request.parameters()?;
        let result = self.deflection.deflect(&params)?;
        info!(
            "Deflection completed: {:?}, shift {:.1} km",
            result.classification, result.corridor_shift_km
        );
        Ok(result)
    }

    pub fn presets(&self) -> Vec<PresetScenario> {
        preset_scenarios()
    }

    pub fn health(&self) -> HealthReport {
        let population = self.population();
        let population_ready = population.validate().is_ok();
        HealthReport {
            status: if population_ready { "ok" } else { "degraded" }.to_string(),
            population_ready,
            population_centers: population.centers.len(),
            population_year: population.year,
            materials: self.model.materials().rows().len(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn handle_request(&self, request: EngineRequest) -> EngineResponse {
        let outcome = match request {
            EngineRequest::Simulate(req) => self
                .simulate(&req)
                .map(|r| EngineResponse::Simulation(Box::new(r))),
            EngineRequest::Deflect(req) => self.deflect(&req).map(EngineResponse::Deflection),
            EngineRequest::Presets => Ok(EngineResponse::Presets {
                presets: self.presets(),
            }),
            EngineRequest::Health => Ok(EngineResponse::Health(self.health())),
        };
        outcome.unwrap_or_else(|err| {
            warn!("Request failed: {}", err);
            err.into()
        })
    }

    /// Decode one JSON line, run it, encode the response
    pub fn handle_line(&self, line: &str) -> EngineResult<String> {
        let response = match serde_json::from_str::<EngineRequest>(line) {
            Ok(request) => self.handle_request(request),
            Err(err) => {
                warn!("Malformed request: {}", err);
                EngineError::from(err).into()
            }
        };
        Ok(serde_json::to_string(&response)?)
    }
}

fn load_population(config: &EngineConfig) -> EngineResult<PopulationDataset> {
    match &config.population_file {
        Some(path) => {
            info!("Loading population dataset from {}", path.display());
            PopulationDataset::from_file(path)
        }
        None => Ok(PopulationDataset::builtin(config.population_year)),
    }
}

fn build_effects(
    channels: &AggregatedChannels,
    materials: &MaterialTable,
) -> EngineResult<ImpactEffects> {
    let blast = BlastLevel::ALL
        .into_iter()
        .map(|level| {
            Ok(BlastEffect {
                psi: level.psi(),
                r_km: channels.get(Channel::Blast(level))?.band,
                description: level.description().to_string(),
            })
        })
        .collect::<EngineResult<Vec<_>>>()?;

    let thermal = ThermalLevel::ALL
        .into_iter()
        .map(|level| {
            Ok(ThermalEffect {
                j_m2: level.flux_j_m2(),
                r_km: channels.get(Channel::Thermal(level))?.band,
                description: level.description().to_string(),
            })
        })
        .collect::<EngineResult<Vec<_>>>()?;

    let crater = CraterResult {
        rim_r_km: channels.get(Channel::CraterRim)?.band,
        depth_m: channels.get(Channel::CraterDepth)?.band,
        ejecta_r_km: channels.get(Channel::CraterEjecta)?.band,
    };

    Ok(ImpactEffects {
        blast,
        thermal,
        crater,
        texture: MaterialDamageCalculator::evaluate(materials, channels)?,
    })
}

fn exposure_zones(channels: &AggregatedChannels) -> EngineResult<Vec<ExposureZone>> {
    let mut zones = Vec::with_capacity(BlastLevel::ALL.len() + ThermalLevel::ALL.len() + 1);
    for level in BlastLevel::ALL {
        zones.push(ExposureZone {
            zone: format!("blast_{}psi", level.psi()),
            description: level.description().to_string(),
            radius_km: *channels.get(Channel::Blast(level))?,
        });
    }
    for level in ThermalLevel::ALL {
        zones.push(ExposureZone {
            zone: format!("thermal_{}", level.flux_j_m2()),
            description: level.description().to_string(),
            radius_km: *channels.get(Channel::Thermal(level))?,
        });
    }
    zones.push(ExposureZone {
        zone: "crater".to_string(),
        description: "Within the crater rim".to_string(),
        radius_km: *channels.get(Channel::CraterRim)?,
    });
    Ok(zones)
}
