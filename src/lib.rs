// Impactor - Asteroid impact effects & deflection uncertainty engine
// Library entry point and JSON-lines request loop

pub mod config;
pub mod deflection;
pub mod error;
pub mod materials;
pub mod monte_carlo;
pub mod physics_engine;
pub mod population;
pub mod presets;
pub mod sampler;
pub mod state_manager;

#[cfg(test)]
mod proptest_impact;

use std::io::{BufRead, Write};

pub use config::EngineConfig;
pub use deflection::{
    DeflectionMethod, DeflectionModel, DeflectionParameters, DeflectionResult, ImpactClassification,
};
pub use error::{EngineError, EngineResult};
pub use materials::{MaterialTable, MaterialType};
pub use monte_carlo::{MonteCarloAggregator, UncertaintyBand};
pub use physics_engine::{ImpactParameters, ImpactPhysicsModel, PhysicalEffects};
pub use population::{PopulationDataset, PopulationExposureEstimator};
pub use sampler::ParameterSampler;
pub use state_manager::{DeflectionRequest, ImpactEngine, SimulationRequest, SimulationResult};

/// Serve requests from `input`, one JSON object per line, answering on `output`.
/// Blank lines are skipped. Request failures are answered, never fatal.
pub fn serve<R: BufRead, W: Write>(
    engine: &ImpactEngine,
    input: R,
    mut output: W,
) -> EngineResult<usize> {
    let mut handled = 0;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = engine.handle_line(&line)?;
        writeln!(output, "{}", response)?;
        output.flush()?;
        handled += 1;
    }
    Ok(handled)
}

/// Build the engine from the environment and serve stdin until EOF
pub fn run() -> EngineResult<()> {
    let config = EngineConfig::from_env()?;
    let engine = ImpactEngine::from_config(config)?;

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let handled = serve(&engine, stdin.lock(), stdout.lock())?;
    tracing::info!("Input closed after {} requests", handled);
    Ok(())
}
