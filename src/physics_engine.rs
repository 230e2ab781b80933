// Physics Engine - Impact Effects Model
// Implements energy coupling, blast/thermal scaling laws, crater scaling and material footprints

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::sync::Arc;

use crate::error::{ensure_finite, EngineError, EngineResult};
use crate::materials::{self, MaterialTable, MaterialType};

// =============================================================================
// PHYSICAL CONSTANTS (SI Units)
// =============================================================================

/// Energy of one ton of TNT (J)
pub const TNT_TON_J: f64 = 4.184e9;

/// Energy of one megaton of TNT (J)
pub const MEGATON_J: f64 = 4.184e15;

/// Surface gravity (m/s²)
pub const EARTH_GRAVITY: f64 = 9.81;

/// Target crustal rock density (kg/m³)
pub const TARGET_DENSITY: f64 = 2700.0;

/// Earth escape velocity, the floor for any impact speed (km/s)
pub const ESCAPE_VELOCITY_KM_S: f64 = 11.0;

/// Impactors below this size deposit no energy at the surface (m)
pub const MIN_IMPACTOR_DIAMETER_M: f64 = 1.0;

/// Fraction of impact energy radiated by the fireball.
/// Collins, Melosh & Marcus (2005), Earth Impact Effects Program
pub const LUMINOUS_EFFICIENCY: f64 = 3.0e-3;

/// Final crater diameter coefficient for D = K * (E / (ρ_t * g))^(1/4).
/// Melosh (1989) energy scaling
pub const CRATER_SCALE_FACTOR: f64 = 1.8;

/// Simple crater depth to diameter ratio
pub const CRATER_DEPTH_RATIO: f64 = 0.2;

/// Ejecta blanket radius in crater diameters
pub const EJECTA_RADIUS_RATIO: f64 = 1.5;

/// Accepted impactor bulk density range (kg/m³), icy to metallic
pub mod density_range {
    pub const MIN: f64 = 1000.0;
    pub const MAX: f64 = 8000.0;
}

/// Blast scaled distances k(psi) in km per Mt^(1/3), surface burst.
/// Glasstone & Dolan (1977)
const BLAST_SCALING: [(f64, f64); 5] = [
    (1.0, 16.0),
    (5.0, 6.5),
    (10.0, 4.5),
    (20.0, 3.0),
    (50.0, 2.0),
];

/// Thermal radius coefficient c in R = c * sqrt(Y) / sqrt(φ),
/// hemispherical fireball: φ = η E / (2π R²). Units: km·(J/m²)^½ per Mt^½
pub fn thermal_coefficient_km() -> f64 {
    (LUMINOUS_EFFICIENCY * MEGATON_J / (2.0 * PI)).sqrt() / 1000.0
}

// =============================================================================
// EFFECT CHANNELS
// =============================================================================

/// Blast overpressure thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BlastLevel {
    Psi1,
    Psi5,
    Psi10,
    Psi20,
    Psi50,
}

impl BlastLevel {
    pub const ALL: [BlastLevel; 5] = [
        BlastLevel::Psi1,
        BlastLevel::Psi5,
        BlastLevel::Psi10,
        BlastLevel::Psi20,
        BlastLevel::Psi50,
    ];

    fn index(self) -> usize {
        match self {
            BlastLevel::Psi1 => 0,
            BlastLevel::Psi5 => 1,
            BlastLevel::Psi10 => 2,
            BlastLevel::Psi20 => 3,
            BlastLevel::Psi50 => 4,
        }
    }

    pub fn psi(self) -> f64 {
        BLAST_SCALING[self.index()].0
    }

    /// Tabulated k(psi) in km per Mt^(1/3)
    pub fn scaled_distance_km(self) -> f64 {
        BLAST_SCALING[self.index()].1
    }

    pub fn description(self) -> &'static str {
        match self {
            BlastLevel::Psi1 => "Window breakage, minor injuries",
            BlastLevel::Psi5 => "Building damage, serious injuries",
            BlastLevel::Psi10 => "Residential building collapse",
            BlastLevel::Psi20 => "Reinforced structures damaged",
            BlastLevel::Psi50 => "Total destruction",
        }
    }
}

/// Radiant exposure thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ThermalLevel {
    FirstDegreeBurns,
    SecondDegreeBurns,
    ThirdDegreeBurns,
    ClothingIgnition,
    VegetationIgnition,
}

impl ThermalLevel {
    pub const ALL: [ThermalLevel; 5] = [
        ThermalLevel::FirstDegreeBurns,
        ThermalLevel::SecondDegreeBurns,
        ThermalLevel::ThirdDegreeBurns,
        ThermalLevel::ClothingIgnition,
        ThermalLevel::VegetationIgnition,
    ];

    fn index(self) -> usize {
        match self {
            ThermalLevel::FirstDegreeBurns => 0,
            ThermalLevel::SecondDegreeBurns => 1,
            ThermalLevel::ThirdDegreeBurns => 2,
            ThermalLevel::ClothingIgnition => 3,
            ThermalLevel::VegetationIgnition => 4,
        }
    }

    /// Threshold radiant exposure (J/m²)
    pub fn flux_j_m2(self) -> f64 {
        match self {
            ThermalLevel::FirstDegreeBurns => 125_000.0,
            ThermalLevel::SecondDegreeBurns => 250_000.0,
            ThermalLevel::ThirdDegreeBurns => 500_000.0,
            ThermalLevel::ClothingIgnition => 1_000_000.0,
            ThermalLevel::VegetationIgnition => 2_000_000.0,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ThermalLevel::FirstDegreeBurns => "1st degree burns",
            ThermalLevel::SecondDegreeBurns => "2nd degree burns",
            ThermalLevel::ThirdDegreeBurns => "3rd degree burns",
            ThermalLevel::ClothingIgnition => "Ignition of clothing",
            ThermalLevel::VegetationIgnition => "Ignition of dry vegetation",
        }
    }
}

// =============================================================================
// IMPACT PARAMETERS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactParameters {
    pub diameter_m: f64,
    pub density_kg_m3: f64,
    pub velocity_km_s: f64,
    /// Entry angle from horizontal (degrees)
    pub angle_deg: f64,
    pub lat: f64,
    pub lon: f64,
}

impl ImpactParameters {
    /// Check every field against its domain. The first offending field is reported.
    pub fn validate(&self) -> EngineResult<()> {
        let fields = [
            ("diameter_m", self.diameter_m),
            ("density_kg_m3", self.density_kg_m3),
            ("velocity_km_s", self.velocity_km_s),
            ("angle_deg", self.angle_deg),
            ("lat", self.lat),
            ("lon", self.lon),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(EngineError::validation(name, "must be a finite number"));
            }
        }

        if self.diameter_m <= 0.0 {
            return Err(EngineError::validation(
                "diameter_m",
                format!("must be positive, got {}", self.diameter_m),
            ));
        }
        if !(density_range::MIN..=density_range::MAX).contains(&self.density_kg_m3) {
            return Err(EngineError::validation(
                "density_kg_m3",
                format!(
                    "must be within [{}, {}] kg/m³, got {}",
                    density_range::MIN,
                    density_range::MAX,
                    self.density_kg_m3
                ),
            ));
        }
        if self.velocity_km_s < ESCAPE_VELOCITY_KM_S {
            return Err(EngineError::validation(
                "velocity_km_s",
                format!(
                    "must be at least {} km/s (Earth escape velocity), got {}",
                    ESCAPE_VELOCITY_KM_S, self.velocity_km_s
                ),
            ));
        }
        if self.angle_deg <= 0.0 || self.angle_deg > 90.0 {
            return Err(EngineError::validation(
                "angle_deg",
                format!("must be within (0, 90] degrees, got {}", self.angle_deg),
            ));
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(EngineError::validation(
                "lat",
                format!("must be within [-90, 90], got {}", self.lat),
            ));
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return Err(EngineError::validation(
                "lon",
                format!("must be within [-180, 180], got {}", self.lon),
            ));
        }
        Ok(())
    }

    /// Mass of a homogeneous sphere (kg)
    pub fn mass_kg(&self) -> f64 {
        let radius = self.diameter_m / 2.0;
        self.density_kg_m3 * (4.0 / 3.0) * PI * radius.powi(3)
    }

    /// Kinetic energy at impact: 0.5 * m * v² (J)
    pub fn kinetic_energy_j(&self) -> f64 {
        let v = self.velocity_km_s * 1000.0;
        0.5 * self.mass_kg() * v * v
    }

    /// Energy coupled into the surface: E * sin(angle) (J)
    pub fn effective_energy_j(&self) -> f64 {
        self.kinetic_energy_j() * self.angle_deg.to_radians().sin()
    }
}

// =============================================================================
// SCALING LAWS
// =============================================================================

/// Blast scaled distance k(psi) in km per Mt^(1/3) for any positive overpressure.
/// Log-log interpolation between tabulated points, end slopes extrapolated.
pub fn blast_scaled_distance_km(psi: f64) -> f64 {
    let last = BLAST_SCALING.len() - 1;
    let segment = BLAST_SCALING
        .windows(2)
        .position(|w| psi <= w[1].0)
        .unwrap_or(last - 1);

    let (p0, k0) = BLAST_SCALING[segment];
    let (p1, k1) = BLAST_SCALING[segment + 1];
    let slope = (k1.ln() - k0.ln()) / (p1.ln() - p0.ln());
    (k0.ln() + slope * (psi.ln() - p0.ln())).exp()
}

/// Radius (km) at which blast overpressure falls to `psi`
pub fn blast_radius_km(yield_megatons: f64, psi: f64) -> f64 {
    if yield_megatons <= 0.0 {
        return 0.0;
    }
    blast_scaled_distance_km(psi) * yield_megatons.cbrt()
}

/// Radius (km) at which radiant exposure falls to `flux_j_m2`
pub fn thermal_radius_km(yield_megatons: f64, flux_j_m2: f64) -> f64 {
    if yield_megatons <= 0.0 {
        return 0.0;
    }
    thermal_coefficient_km() * yield_megatons.sqrt() / flux_j_m2.sqrt()
}

/// Final crater diameter (m) from coupled energy
pub fn crater_diameter_m(effective_energy_j: f64) -> f64 {
    if effective_energy_j <= 0.0 {
        return 0.0;
    }
    CRATER_SCALE_FACTOR * (effective_energy_j / (TARGET_DENSITY * EARTH_GRAVITY)).powf(0.25)
}

// =============================================================================
// PHYSICAL EFFECTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CraterGeometry {
    pub rim_radius_km: f64,
    pub depth_m: f64,
    pub ejecta_radius_km: f64,
}

/// Footprint of one material for a single parameter set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialFootprint {
    pub material_type: MaterialType,
    pub radius_km: f64,
    pub damage_percentage: f64,
}

/// Deterministic effects of one parameter set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalEffects {
    pub mass_kg: f64,
    pub kinetic_energy_j: f64,
    pub effective_energy_j: f64,
    pub yield_megatons: f64,
    pub tnt_tons: f64,
    pub blast_radii_km: [f64; 5],
    pub thermal_radii_km: [f64; 5],
    pub crater: CraterGeometry,
    pub materials: Vec<MaterialFootprint>,
}

impl PhysicalEffects {
    pub fn blast_radius(&self, level: BlastLevel) -> f64 {
        self.blast_radii_km[level.index()]
    }

    pub fn thermal_radius(&self, level: ThermalLevel) -> f64 {
        self.thermal_radii_km[level.index()]
    }

    pub fn material(&self, material_type: MaterialType) -> Option<&MaterialFootprint> {
        self.materials
            .iter()
            .find(|m| m.material_type == material_type)
    }
}

// =============================================================================
// IMPACT PHYSICS MODEL
// =============================================================================

/// Pure impact effects model. Shares the read-only material table.
#[derive(Debug, Clone)]
pub struct ImpactPhysicsModel {
    materials: Arc<MaterialTable>,
}

impl ImpactPhysicsModel {
    /// Fails closed when the material table is empty or incomplete.
    pub fn new(materials: Arc<MaterialTable>) -> EngineResult<Self> {
        materials.validate()?;
        Ok(Self { materials })
    }

    pub fn materials(&self) -> &MaterialTable {
        &self.materials
    }

    /// Compute all effects for one parameter set.
    /// Same input, same output. Non-finite intermediates are reported, never propagated.
    pub fn compute(&self, params: &ImpactParameters) -> EngineResult<PhysicalEffects> {
        let mass_kg = ensure_finite("mass_kg", params.mass_kg())?;
        let kinetic_energy_j = ensure_finite("kinetic_energy_j", params.kinetic_energy_j())?;

        // Small bodies burn up: nothing reaches the ground
        let effective_energy_j = if params.diameter_m < MIN_IMPACTOR_DIAMETER_M {
            0.0
        } else {
            ensure_finite("effective_energy_j", params.effective_energy_j())?
        };

        let yield_megatons = effective_energy_j / MEGATON_J;
        let tnt_tons = effective_energy_j / TNT_TON_J;

        let mut blast_radii_km = [0.0; 5];
        for level in BlastLevel::ALL {
            let radius = blast_radius_km(yield_megatons, level.psi());
            blast_radii_km[level.index()] = ensure_finite("blast_radius_km", radius)?;
        }

        let mut thermal_radii_km = [0.0; 5];
        for level in ThermalLevel::ALL {
            let radius = thermal_radius_km(yield_megatons, level.flux_j_m2());
            thermal_radii_km[level.index()] = ensure_finite("thermal_radius_km", radius)?;
        }

        let diameter_m = ensure_finite("crater_diameter_m", crater_diameter_m(effective_energy_j))?;
        let crater = CraterGeometry {
            rim_radius_km: diameter_m / 2000.0,
            depth_m: diameter_m * CRATER_DEPTH_RATIO,
            ejecta_radius_km: diameter_m * EJECTA_RADIUS_RATIO / 1000.0,
        };

        let materials = self
            .materials
            .rows()
            .iter()
            .map(|row| {
                let blast = blast_radius_km(yield_megatons, row.pressure_threshold_psi);
                let thermal = thermal_radius_km(yield_megatons, row.thermal_threshold_j_m2);
                let radius_km = ensure_finite("material_radius_km", blast.max(thermal))?;
                let edge = materials::edge_damage_percentage(blast, thermal);
                Ok(MaterialFootprint {
                    material_type: row.material_type,
                    radius_km,
                    damage_percentage: materials::mean_footprint_damage(radius_km, edge),
                })
            })
            .collect::<EngineResult<Vec<_>>>()?;

        Ok(PhysicalEffects {
            mass_kg,
            kinetic_energy_j,
            effective_energy_j,
            yield_megatons,
            tnt_tons,
            blast_radii_km,
            thermal_radii_km,
            crater,
            materials,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn model() -> ImpactPhysicsModel {
        ImpactPhysicsModel::new(Arc::new(MaterialTable::standard())).unwrap()
    }

    fn reference_impact() -> ImpactParameters {
        ImpactParameters {
            diameter_m: 100.0,
            density_kg_m3: 2500.0,
            velocity_km_s: 20.0,
            angle_deg: 90.0,
            lat: 0.0,
            lon: 0.0,
        }
    }

    #[test]
    fn test_reference_energy() {
        let effects = model().compute(&reference_impact()).unwrap();

        assert_relative_eq!(effects.mass_kg, 1.309e9, max_relative = 1e-3);
        assert_relative_eq!(effects.kinetic_energy_j, 2.618e17, max_relative = 1e-3);
        assert_relative_eq!(effects.yield_megatons, 62.6, max_relative = 1e-3);
        assert_relative_eq!(effects.tnt_tons, 62.6e6, max_relative = 1e-3);
    }

    #[test]
    fn test_blast_radius_decreases_with_psi() {
        let effects = model().compute(&reference_impact()).unwrap();
        for pair in BlastLevel::ALL.windows(2) {
            assert!(effects.blast_radius(pair[0]) > effects.blast_radius(pair[1]));
        }
        // 1 psi at 62.6 Mt: 16 km * 62.6^(1/3)
        assert_relative_eq!(
            effects.blast_radius(BlastLevel::Psi1),
            16.0 * 62.57_f64.cbrt(),
            max_relative = 1e-3
        );
    }

    #[test]
    fn test_blast_zones_follow_scaling_law() {
        let effects = model().compute(&reference_impact()).unwrap();
        for level in BlastLevel::ALL {
            assert_relative_eq!(
                effects.blast_radius(level),
                blast_radius_km(effects.yield_megatons, level.psi()),
                max_relative = 1e-12
            );
        }
    }

    #[test]
    fn test_thermal_radius_decreases_with_flux() {
        let effects = model().compute(&reference_impact()).unwrap();
        for pair in ThermalLevel::ALL.windows(2) {
            assert!(effects.thermal_radius(pair[0]) > effects.thermal_radius(pair[1]));
        }
    }

    #[test]
    fn test_scaled_distance_interpolation() {
        for level in BlastLevel::ALL {
            assert_relative_eq!(
                blast_scaled_distance_km(level.psi()),
                level.scaled_distance_km(),
                max_relative = 1e-12
            );
        }
        // Strictly decreasing, including extrapolated ends
        let pressures = [0.05, 0.1, 0.5, 1.0, 2.0, 7.5, 15.0, 35.0, 50.0, 80.0];
        for pair in pressures.windows(2) {
            assert!(blast_scaled_distance_km(pair[0]) > blast_scaled_distance_km(pair[1]));
        }
    }

    #[test]
    fn test_oblique_impact_couples_less_energy() {
        let model = model();
        let vertical = model.compute(&reference_impact()).unwrap();
        let shallow = model
            .compute(&ImpactParameters {
                angle_deg: 15.0,
                ..reference_impact()
            })
            .unwrap();

        assert!(shallow.effective_energy_j < vertical.effective_energy_j);
        for level in BlastLevel::ALL {
            assert!(shallow.blast_radius(level) < vertical.blast_radius(level));
        }
        for level in ThermalLevel::ALL {
            assert!(shallow.thermal_radius(level) < vertical.thermal_radius(level));
        }
        assert!(shallow.crater.rim_radius_km < vertical.crater.rim_radius_km);
    }

    #[test]
    fn test_tiny_impactor_has_no_effects() {
        let effects = model()
            .compute(&ImpactParameters {
                diameter_m: 0.5,
                ..reference_impact()
            })
            .unwrap();

        assert_eq!(effects.yield_megatons, 0.0);
        assert!(effects.blast_radii_km.iter().all(|r| *r == 0.0));
        assert!(effects.thermal_radii_km.iter().all(|r| *r == 0.0));
        assert_eq!(effects.crater.rim_radius_km, 0.0);
        assert!(effects
            .materials
            .iter()
            .all(|m| m.radius_km == 0.0 && m.damage_percentage == 0.0));
    }

    #[test]
    fn test_absurd_diameter_is_degenerate() {
        let err = model()
            .compute(&ImpactParameters {
                diameter_m: 1e120,
                ..reference_impact()
            })
            .unwrap_err();
        assert_eq!(err.kind(), "numeric_degeneracy");
    }

    #[test]
    fn test_crater_grows_with_energy() {
        let model = model();
        let small = model.compute(&reference_impact()).unwrap();
        let large = model
            .compute(&ImpactParameters {
                diameter_m: 300.0,
                ..reference_impact()
            })
            .unwrap();
        assert!(large.crater.rim_radius_km > small.crater.rim_radius_km);
        assert!(large.crater.depth_m > small.crater.depth_m);
        assert_relative_eq!(
            small.crater.depth_m,
            small.crater.rim_radius_km * 2000.0 * CRATER_DEPTH_RATIO,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_steel_footprint_inside_glass() {
        let effects = model().compute(&reference_impact()).unwrap();
        let glass = effects.material(MaterialType::Glass).unwrap();
        let steel = effects.material(MaterialType::Steel).unwrap();
        assert!(steel.radius_km <= glass.radius_km);
        assert!(glass.damage_percentage > 0.0 && glass.damage_percentage <= 100.0);
    }

    #[test]
    fn test_validation_names_field() {
        let cases = [
            (
                ImpactParameters {
                    diameter_m: 0.0,
                    ..reference_impact()
                },
                "diameter_m",
            ),
            (
                ImpactParameters {
                    density_kg_m3: 900.0,
                    ..reference_impact()
                },
                "density_kg_m3",
            ),
            (
                ImpactParameters {
                    velocity_km_s: 10.9,
                    ..reference_impact()
                },
                "velocity_km_s",
            ),
            (
                ImpactParameters {
                    angle_deg: 0.0,
                    ..reference_impact()
                },
                "angle_deg",
            ),
            (
                ImpactParameters {
                    angle_deg: 90.5,
                    ..reference_impact()
                },
                "angle_deg",
            ),
            (
                ImpactParameters {
                    lat: 91.0,
                    ..reference_impact()
                },
                "lat",
            ),
            (
                ImpactParameters {
                    lon: -181.0,
                    ..reference_impact()
                },
                "lon",
            ),
            (
                ImpactParameters {
                    diameter_m: f64::NAN,
                    ..reference_impact()
                },
                "diameter_m",
            ),
        ];
        for (params, field) in cases {
            match params.validate() {
                Err(EngineError::Validation { field: got, .. }) => assert_eq!(got, field),
                other => panic!("expected validation error for {}, got {:?}", field, other),
            }
        }
        assert!(reference_impact().validate().is_ok());
    }

    #[test]
    fn test_compute_is_deterministic() {
        let model = model();
        let a = model.compute(&reference_impact()).unwrap();
        let b = model.compute(&reference_impact()).unwrap();
        assert_eq!(a, b);
    }
}
