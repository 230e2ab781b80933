// Preset Scenarios - Reference impacts for quick runs

use serde::{Deserialize, Serialize};

use crate::physics_engine::ImpactParameters;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleLocation {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetScenario {
    pub name: String,
    pub description: String,
    pub diameter_m: f64,
    pub density_kg_m3: f64,
    pub velocity_km_s: f64,
    pub angle_deg: f64,
    pub example_location: ExampleLocation,
}

impl PresetScenario {
    pub fn parameters(&self) -> ImpactParameters {
        ImpactParameters {
            diameter_m: self.diameter_m,
            density_kg_m3: self.density_kg_m3,
            velocity_km_s: self.velocity_km_s,
            angle_deg: self.angle_deg,
            lat: self.example_location.lat,
            lon: self.example_location.lon,
        }
    }
}

fn preset(
    name: &str,
    description: &str,
    (diameter_m, density_kg_m3, velocity_km_s, angle_deg): (f64, f64, f64, f64),
    (lat, lon): (f64, f64),
) -> PresetScenario {
    PresetScenario {
        name: name.to_string(),
        description: description.to_string(),
        diameter_m,
        density_kg_m3,
        velocity_km_s,
        angle_deg,
        example_location: ExampleLocation { lat, lon },
    }
}

pub fn preset_scenarios() -> Vec<PresetScenario> {
    vec![
        preset(
            "Tunguska-class Event",
            "Similar to 1908 Tunguska explosion",
            (60.0, 2000.0, 20.0, 45.0),
            (60.9, 101.9),
        ),
        preset(
            "Chelyabinsk-class Event",
            "Similar to 2013 Chelyabinsk meteor",
            (20.0, 3700.0, 19.0, 20.0),
            (55.1, 61.4),
        ),
        preset(
            "City-Killer Scenario",
            "140m asteroid - regional devastation",
            (140.0, 2500.0, 25.0, 30.0),
            (40.7, -74.0),
        ),
        preset(
            "Civilization Threat",
            "1km asteroid - global consequences",
            (1000.0, 2200.0, 20.0, 45.0),
            (0.0, 0.0),
        ),
    ]
}
