// Material Damage - Per-material thresholds and damage footprints
// Eight fixed materials ordered by robustness, glass most fragile, steel most robust

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{EngineError, EngineResult};
use crate::monte_carlo::{AggregatedChannels, Channel, UncertaintyBand};

/// Damage at the edge of a footprint when a single mechanism acts there (%)
pub const EDGE_DAMAGE_PCT: f64 = 10.0;

// =============================================================================
// MATERIAL TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialType {
    Glass,
    Fabric,
    Vegetation,
    Asphalt,
    Wood,
    Brick,
    Concrete,
    Steel,
}

impl MaterialType {
    /// In robustness order
    pub const ALL: [MaterialType; 8] = [
        MaterialType::Glass,
        MaterialType::Fabric,
        MaterialType::Vegetation,
        MaterialType::Asphalt,
        MaterialType::Wood,
        MaterialType::Brick,
        MaterialType::Concrete,
        MaterialType::Steel,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MaterialType::Glass => "glass",
            MaterialType::Fabric => "fabric",
            MaterialType::Vegetation => "vegetation",
            MaterialType::Asphalt => "asphalt",
            MaterialType::Wood => "wood",
            MaterialType::Brick => "brick",
            MaterialType::Concrete => "concrete",
            MaterialType::Steel => "steel",
        }
    }
}

impl fmt::Display for MaterialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaterialType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MaterialType::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EngineError::validation("material_type", format!("unknown material '{}'", s)))
    }
}

// =============================================================================
// THRESHOLD TABLE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialThreshold {
    pub material_type: MaterialType,
    pub pressure_threshold_psi: f64,
    #[serde(rename = "thermal_threshold_J_m2")]
    pub thermal_threshold_j_m2: f64,
    pub description: String,
    pub consequences: String,
}

/// Read-only material threshold table, one row per material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialTable {
    rows: Vec<MaterialThreshold>,
}

impl MaterialTable {
    pub fn new(mut rows: Vec<MaterialThreshold>) -> EngineResult<Self> {
        rows.sort_by_key(|r| r.material_type);
        let table = Self { rows };
        table.validate()?;
        Ok(table)
    }

    /// Built-in thresholds. Both channels increase strictly with robustness.
    pub fn standard() -> Self {
        let row = |material_type, psi, flux, description: &str, consequences: &str| MaterialThreshold {
            material_type,
            pressure_threshold_psi: psi,
            thermal_threshold_j_m2: flux,
            description: description.to_string(),
            consequences: consequences.to_string(),
        };

        Self {
            rows: vec![
                row(
                    MaterialType::Glass,
                    0.10,
                    30_000.0,
                    "Window shattering and glass damage",
                    "Flying glass fragments causing severe lacerations, eye injuries, and puncture wounds",
                ),
                row(
                    MaterialType::Fabric,
                    0.15,
                    50_000.0,
                    "Clothing and textile damage",
                    "Thermal burns, exposure-related injuries, loss of protective barriers",
                ),
                row(
                    MaterialType::Vegetation,
                    0.20,
                    80_000.0,
                    "Tree damage and flying debris",
                    "Projectile injuries from branches, leaves causing respiratory irritation",
                ),
                row(
                    MaterialType::Asphalt,
                    0.50,
                    100_000.0,
                    "Road surface damage",
                    "Debris and uneven surfaces causing falls, cuts, and vehicle accidents",
                ),
                row(
                    MaterialType::Wood,
                    1.0,
                    125_000.0,
                    "Wooden structure damage",
                    "Splinter injuries, structural collapse causing crushing and blunt force trauma",
                ),
                row(
                    MaterialType::Brick,
                    1.5,
                    150_000.0,
                    "Brick wall collapse",
                    "Falling masonry causing blunt force trauma, fractures, and crushing injuries",
                ),
                row(
                    MaterialType::Concrete,
                    2.0,
                    200_000.0,
                    "Concrete cracking and spalling",
                    "Debris projectiles causing head trauma, abrasions, and crush injuries",
                ),
                row(
                    MaterialType::Steel,
                    5.0,
                    300_000.0,
                    "Steel structure deformation",
                    "Structural failure leading to crushing injuries and internal trauma",
                ),
            ],
        }
    }

    /// Load a table supplied by external data-loading code
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let rows: Vec<MaterialThreshold> = serde_json::from_str(json)?;
        Self::new(rows)
    }

    pub fn rows(&self) -> &[MaterialThreshold] {
        &self.rows
    }

    pub fn get(&self, material_type: MaterialType) -> EngineResult<&MaterialThreshold> {
        self.rows
            .iter()
            .find(|r| r.material_type == material_type)
            .ok_or_else(|| {
                EngineError::unavailable("material table", format!("no row for {}", material_type))
            })
    }

    /// Every material present exactly once with positive finite thresholds.
    pub fn validate(&self) -> EngineResult<()> {
        if self.rows.is_empty() {
            return Err(EngineError::unavailable("material table", "table is empty"));
        }
        for material_type in MaterialType::ALL {
            let count = self
                .rows
                .iter()
                .filter(|r| r.material_type == material_type)
                .count();
            if count != 1 {
                return Err(EngineError::unavailable(
                    "material table",
                    format!("expected one row for {}, found {}", material_type, count),
                ));
            }
        }
        for row in &self.rows {
            let valid = |v: f64| v.is_finite() && v > 0.0;
            if !valid(row.pressure_threshold_psi) || !valid(row.thermal_threshold_j_m2) {
                return Err(EngineError::unavailable(
                    "material table",
                    format!("non-positive threshold for {}", row.material_type),
                ));
            }
        }
        // Footprints nest only if both thresholds rise from glass to steel
        for pair in MaterialType::ALL.windows(2) {
            let (weaker, stronger) = (self.get(pair[0])?, self.get(pair[1])?);
            if weaker.pressure_threshold_psi >= stronger.pressure_threshold_psi
                || weaker.thermal_threshold_j_m2 >= stronger.thermal_threshold_j_m2
            {
                return Err(EngineError::unavailable(
                    "material table",
                    format!(
                        "thresholds for {} must exceed those for {}",
                        stronger.material_type, weaker.material_type
                    ),
                ));
            }
        }
        Ok(())
    }
}

// =============================================================================
// DAMAGE PROFILE
// =============================================================================

/// Damage at the footprint edge. Rises toward twice the single-mechanism value
/// as the secondary channel approaches the dominant one.
pub fn edge_damage_percentage(blast_radius_km: f64, thermal_radius_km: f64) -> f64 {
    let dominant = blast_radius_km.max(thermal_radius_km);
    if dominant <= 0.0 {
        return EDGE_DAMAGE_PCT;
    }
    let secondary = blast_radius_km.min(thermal_radius_km);
    EDGE_DAMAGE_PCT * (1.0 + secondary / dominant)
}

/// Damage (%) at `distance_km` from ground zero: 100 at the center, decaying
/// exponentially to `edge_pct` at the footprint radius, 0 beyond it.
pub fn damage_at_distance(distance_km: f64, radius_km: f64, edge_pct: f64) -> f64 {
    if radius_km <= 0.0 || distance_km > radius_km {
        return 0.0;
    }
    let x = (distance_km / radius_km).max(0.0);
    100.0 * (edge_pct / 100.0).powf(x)
}

/// Area-weighted mean of `damage_at_distance` over the footprint disc (%).
///
/// With a = edge/100 and λ = ln a: mean = 100 * 2(aλ - a + 1) / λ²
pub fn mean_footprint_damage(radius_km: f64, edge_pct: f64) -> f64 {
    if radius_km <= 0.0 {
        return 0.0;
    }
    let a = (edge_pct / 100.0).clamp(f64::MIN_POSITIVE, 1.0);
    let lambda = a.ln();
    if lambda.abs() < 1e-9 {
        return 100.0;
    }
    (100.0 * 2.0 * (a * lambda - a + 1.0) / (lambda * lambda)).clamp(0.0, 100.0)
}

// =============================================================================
// MATERIAL DAMAGE CALCULATOR
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDamageEntry {
    pub material_type: MaterialType,
    /// Pressure threshold (psi)
    #[serde(rename = "damage_threshold")]
    pub pressure_threshold_psi: f64,
    #[serde(rename = "thermal_threshold_J_m2")]
    pub thermal_threshold_j_m2: f64,
    pub damage_percentage: UncertaintyBand,
    pub r_km: UncertaintyBand,
    pub description: String,
    pub consequences: String,
}

pub struct MaterialDamageCalculator;

impl MaterialDamageCalculator {
    /// Attach fixed descriptions to the aggregated per-material bands.
    pub fn evaluate(
        table: &MaterialTable,
        channels: &AggregatedChannels,
    ) -> EngineResult<Vec<MaterialDamageEntry>> {
        table.validate()?;

        MaterialType::ALL
            .into_iter()
            .map(|material_type| {
                let row = table.get(material_type)?;
                let radius = channels.get(Channel::MaterialRadius(material_type))?;
                let damage = channels.get(Channel::MaterialDamage(material_type))?;
                Ok(MaterialDamageEntry {
                    material_type,
                    pressure_threshold_psi: row.pressure_threshold_psi,
                    thermal_threshold_j_m2: row.thermal_threshold_j_m2,
                    damage_percentage: damage.band,
                    r_km: radius.band,
                    description: row.description.clone(),
                    consequences: row.consequences.clone(),
                })
            })
            .collect()
    }
}
