// Deflection Model - Mission outcome for a velocity change applied ahead of impact
// Linear drift of the impact point, hit/miss/clear against the target corridor, feasibility scoring

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::error::{EngineError, EngineResult};

/// Julian year in seconds
pub const SECONDS_PER_YEAR: f64 = 31_557_600.0;

/// Earth radius plus 100 km of atmosphere (km)
pub const DEFAULT_CORRIDOR_HALF_WIDTH_KM: f64 = 6471.0;

/// Fraction of the half-width below "clear" that still counts as a miss
pub const MARGINAL_BAND: f64 = 0.25;

/// Request bounds
pub const MAX_DELTA_V_CM_S: f64 = 10_000.0;
pub const MAX_LEAD_TIME_YEARS: f64 = 100.0;

/// Cost normalisation reference, one DART-class mission (USD)
pub const REFERENCE_MISSION_COST_USD: f64 = 500.0e6;

/// Bulk density assumed when sizing kinetic impactor campaigns (kg/m³)
pub const ASSUMED_ASTEROID_DENSITY: f64 = 2000.0;

/// Momentum delivered by one DART-class impactor: 580 kg at 6.1 km/s, β = 3.6 (kg·m/s)
pub const IMPACTOR_MOMENTUM: f64 = 3.6 * 580.0 * 6100.0;

/// Years between launch decision and arrival
const MISSION_OVERHEAD_YEARS: f64 = 2.0;

// =============================================================================
// ENUMS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeflectionMethod {
    Kinetic,
    Tractor,
    Standoff,
}

impl DeflectionMethod {
    pub const ALL: [DeflectionMethod; 3] = [
        DeflectionMethod::Kinetic,
        DeflectionMethod::Tractor,
        DeflectionMethod::Standoff,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DeflectionMethod::Kinetic => "kinetic",
            DeflectionMethod::Tractor => "tractor",
            DeflectionMethod::Standoff => "standoff",
        }
    }

    /// Coupling of the applied Δv into along-track drift
    pub fn efficiency(self) -> f64 {
        match self {
            DeflectionMethod::Kinetic => 1.0,
            DeflectionMethod::Tractor => 0.6,
            DeflectionMethod::Standoff => 1.5,
        }
    }

    pub fn readiness(self) -> TechnologyReadiness {
        match self {
            DeflectionMethod::Kinetic => TechnologyReadiness::Demonstrated,
            DeflectionMethod::Tractor => TechnologyReadiness::Concept,
            DeflectionMethod::Standoff => TechnologyReadiness::Theoretical,
        }
    }

    fn base_success(self) -> f64 {
        match self {
            DeflectionMethod::Kinetic => 0.8,
            DeflectionMethod::Tractor => 0.6,
            DeflectionMethod::Standoff => 0.4,
        }
    }

    /// Lead time (years) over which the method approaches its base success rate
    fn lead_time_scale_years(self) -> f64 {
        match self {
            DeflectionMethod::Kinetic => 2.0,
            DeflectionMethod::Tractor => 10.0,
            DeflectionMethod::Standoff => 1.0,
        }
    }

    fn challenges(self) -> &'static [&'static str] {
        match self {
            DeflectionMethod::Kinetic => &[
                "Precise targeting of a small body at high relative speed",
                "Momentum enhancement depends on unknown surface properties",
            ],
            DeflectionMethod::Tractor => &[
                "Requires very long mission duration",
                "Station keeping near an irregular gravity field",
            ],
            DeflectionMethod::Standoff => &[
                "Requires nuclear weapons in space",
                "International treaties may prohibit",
                "High technical risk",
            ],
        }
    }
}

impl fmt::Display for DeflectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeflectionMethod {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kinetic" => Ok(DeflectionMethod::Kinetic),
            "tractor" => Ok(DeflectionMethod::Tractor),
            "standoff" => Ok(DeflectionMethod::Standoff),
            other => Err(EngineError::validation(
                "method",
                format!("unknown deflection method '{}', expected kinetic, tractor or standoff", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TechnologyReadiness {
    Demonstrated,
    Concept,
    Theoretical,
}

impl TechnologyReadiness {
    pub fn score(self) -> f64 {
        match self {
            TechnologyReadiness::Demonstrated => 1.0,
            TechnologyReadiness::Concept => 0.6,
            TechnologyReadiness::Theoretical => 0.3,
        }
    }
}

/// Ordered outcome: Hit < Miss < Clear
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactClassification {
    Hit,
    Miss,
    Clear,
}

// =============================================================================
// PARAMETERS & RESULTS
// =============================================================================

/// Optional description of the undeflected path
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OriginalTrajectory {
    #[serde(default)]
    pub corridor_half_width_km: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeflectionParameters {
    pub delta_v_cm_s: f64,
    pub lead_time_years: f64,
    pub method: DeflectionMethod,
    pub asteroid_diameter_m: f64,
    #[serde(default)]
    pub original_trajectory: OriginalTrajectory,
}

impl DeflectionParameters {
    pub fn validate(&self) -> EngineResult<()> {
        if !self.delta_v_cm_s.is_finite() || self.delta_v_cm_s < 0.0 {
            return Err(EngineError::validation(
                "delta_v_cm_s",
                format!("must be a finite non-negative number, got {}", self.delta_v_cm_s),
            ));
        }
        if self.delta_v_cm_s > MAX_DELTA_V_CM_S {
            return Err(EngineError::validation(
                "delta_v_cm_s",
                format!("must not exceed {} cm/s, got {}", MAX_DELTA_V_CM_S, self.delta_v_cm_s),
            ));
        }
        if !self.lead_time_years.is_finite()
            || self.lead_time_years <= 0.0
            || self.lead_time_years > MAX_LEAD_TIME_YEARS
        {
            return Err(EngineError::validation(
                "lead_time_years",
                format!(
                    "must be within (0, {}] years, got {}",
                    MAX_LEAD_TIME_YEARS, self.lead_time_years
                ),
            ));
        }
        if !self.asteroid_diameter_m.is_finite() || self.asteroid_diameter_m <= 0.0 {
            return Err(EngineError::validation(
                "asteroid_diameter_m",
                format!("must be positive, got {}", self.asteroid_diameter_m),
            ));
        }
        if let Some(hw) = self.original_trajectory.corridor_half_width_km {
            if !hw.is_finite() || hw <= 0.0 {
                return Err(EngineError::validation(
                    "original_trajectory.corridor_half_width_km",
                    format!("must be positive, got {}", hw),
                ));
            }
        }
        Ok(())
    }

    pub fn corridor_half_width_km(&self) -> f64 {
        self.original_trajectory
            .corridor_half_width_km
            .unwrap_or(DEFAULT_CORRIDOR_HALF_WIDTH_KM)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTrajectory {
    pub deflection_m_s: f64,
    pub position_change_km: f64,
    pub corridor_half_width_km: f64,
    pub miss_distance_km: f64,
    pub lead_time_years: f64,
    pub method: DeflectionMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionFeasibility {
    pub overall_score: f64,
    pub technology_readiness: TechnologyReadiness,
    pub success_probability: f64,
    pub estimated_cost_usd: f64,
    pub mission_duration_years: f64,
    pub impactors_required: u64,
    pub challenges: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeflectionResult {
    pub classification: ImpactClassification,
    pub impact_probability_drop: f64,
    pub corridor_shift_km: f64,
    pub new_trajectory: NewTrajectory,
    pub mission_feasibility: MissionFeasibility,
}

// =============================================================================
// MODEL
// =============================================================================

/// Along-track displacement of the impact point (km). Strictly increasing in
/// Δv for positive lead time, and in lead time for positive Δv.
pub fn corridor_shift_km(delta_v_cm_s: f64, lead_time_years: f64, method: DeflectionMethod) -> f64 {
    let delta_v_m_s = delta_v_cm_s * 0.01;
    delta_v_m_s * lead_time_years * SECONDS_PER_YEAR / 1000.0 * method.efficiency()
}

pub fn classify(shift_km: f64, half_width_km: f64) -> ImpactClassification {
    if shift_km >= half_width_km {
        ImpactClassification::Clear
    } else if shift_km >= (1.0 - MARGINAL_BAND) * half_width_km {
        ImpactClassification::Miss
    } else {
        ImpactClassification::Hit
    }
}

/// Drop in impact probability for a uniform-density corridor.
/// The remaining overlap falls off quadratically and reaches zero at the corridor edge.
pub fn impact_probability_drop(shift_km: f64, half_width_km: f64) -> f64 {
    if shift_km >= half_width_km {
        return 1.0;
    }
    let x = (shift_km / half_width_km).clamp(0.0, 1.0);
    1.0 - (1.0 - x) * (1.0 - x)
}

/// DART-class impactors needed to deliver `delta_v_cm_s` to the asteroid
pub fn impactors_required(delta_v_cm_s: f64, asteroid_diameter_m: f64) -> u64 {
    let radius = asteroid_diameter_m / 2.0;
    let mass = ASSUMED_ASTEROID_DENSITY * (4.0 / 3.0) * PI * radius.powi(3);
    let momentum = mass * delta_v_cm_s * 0.01;
    ((momentum / IMPACTOR_MOMENTUM).ceil() as u64).max(1)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeflectionModel;

impl DeflectionModel {
    pub fn new() -> Self {
        Self
    }

    pub fn deflect(&self, params: &DeflectionParameters) -> EngineResult<DeflectionResult> {
        params.validate()?;

        let half_width = params.corridor_half_width_km();
        let shift = corridor_shift_km(params.delta_v_cm_s, params.lead_time_years, params.method);
        if !shift.is_finite() {
            return Err(EngineError::degenerate("corridor_shift_km"));
        }

        let classification = classify(shift, half_width);
        let probability_drop = impact_probability_drop(shift, half_width);

        Ok(DeflectionResult {
            classification,
            impact_probability_drop: probability_drop,
            corridor_shift_km: shift,
            new_trajectory: NewTrajectory {
                deflection_m_s: params.delta_v_cm_s * 0.01 * params.method.efficiency(),
                position_change_km: shift,
                corridor_half_width_km: half_width,
                miss_distance_km: (shift - half_width).max(0.0),
                lead_time_years: params.lead_time_years,
                method: params.method,
            },
            mission_feasibility: self.feasibility(params),
        })
    }

    pub fn feasibility(&self, params: &DeflectionParameters) -> MissionFeasibility {
        let method = params.method;
        let readiness = method.readiness();
        let impactors = match method {
            DeflectionMethod::Kinetic => {
                impactors_required(params.delta_v_cm_s, params.asteroid_diameter_m)
            }
            DeflectionMethod::Tractor | DeflectionMethod::Standoff => 0,
        };

        let estimated_cost_usd = match method {
            DeflectionMethod::Kinetic => REFERENCE_MISSION_COST_USD * impactors as f64,
            DeflectionMethod::Tractor => 2.0e9,
            DeflectionMethod::Standoff => 5.0e9,
        };
        let cost_score = (REFERENCE_MISSION_COST_USD / estimated_cost_usd).min(1.0);

        let lead_factor = 1.0 - (-params.lead_time_years / method.lead_time_scale_years()).exp();
        let mut success = method.base_success() * lead_factor;

        let mut challenges: Vec<String> =
            method.challenges().iter().map(|c| c.to_string()).collect();
        if impactors > 1 {
            success *= 0.7;
            challenges.push(format!("Requires {} coordinated impactors", impactors));
        }
        if params.lead_time_years < method.lead_time_scale_years() * 2.0 {
            challenges.push("Short lead time limits effectiveness".to_string());
        }
        let success = success.clamp(0.0, 1.0);

        let overall = 0.3 * readiness.score() + 0.2 * cost_score + 0.5 * success;

        MissionFeasibility {
            overall_score: overall.clamp(0.0, 1.0),
            technology_readiness: readiness,
            success_probability: success,
            estimated_cost_usd,
            mission_duration_years: params.lead_time_years + MISSION_OVERHEAD_YEARS,
            impactors_required: impactors,
            challenges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params(
        delta_v_cm_s: f64,
        lead_time_years: f64,
        method: DeflectionMethod,
    ) -> DeflectionParameters {
        DeflectionParameters {
            delta_v_cm_s,
            lead_time_years,
            method,
            asteroid_diameter_m: 100.0,
            original_trajectory: OriginalTrajectory::default(),
        }
    }

    #[test]
    fn test_reference_shift() {
        // 1 cm/s for 10 years ≈ 3156 km
        let shift = corridor_shift_km(1.0, 10.0, DeflectionMethod::Kinetic);
        assert_relative_eq!(shift, 3155.76, epsilon = 1e-6);
        assert_relative_eq!(
            corridor_shift_km(1.0, 10.0, DeflectionMethod::Standoff),
            shift * 1.5,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_zero_delta_v_is_hit() {
        let result = DeflectionModel::new()
            .deflect(&params(0.0, 10.0, DeflectionMethod::Kinetic))
            .unwrap();
        assert_eq!(result.classification, ImpactClassification::Hit);
        assert_eq!(result.corridor_shift_km, 0.0);
        assert_eq!(result.impact_probability_drop, 0.0);
    }

    #[test]
    fn test_classification_boundaries() {
        let hw = DEFAULT_CORRIDOR_HALF_WIDTH_KM;
        assert_eq!(classify(0.0, hw), ImpactClassification::Hit);
        assert_eq!(classify(0.74 * hw, hw), ImpactClassification::Hit);
        assert_eq!(classify(0.75 * hw, hw), ImpactClassification::Miss);
        assert_eq!(classify(0.99 * hw, hw), ImpactClassification::Miss);
        assert_eq!(classify(hw, hw), ImpactClassification::Clear);
        assert_eq!(classify(10.0 * hw, hw), ImpactClassification::Clear);
    }

    #[test]
    fn test_classification_monotone_in_delta_v() {
        let model = DeflectionModel::new();
        let mut previous = ImpactClassification::Hit;
        for step in 0..100 {
            let dv = step as f64 * 0.1;
            let result = model.deflect(&params(dv, 5.0, DeflectionMethod::Tractor)).unwrap();
            assert!(result.classification >= previous);
            previous = result.classification;
        }
        assert_eq!(previous, ImpactClassification::Clear);
    }

    #[test]
    fn test_earlier_launch_moves_impact_further() {
        let model = DeflectionModel::new();
        let mut previous = model.deflect(&params(0.5, 0.5, DeflectionMethod::Kinetic)).unwrap();
        for years in 1..=50 {
            let result = model
                .deflect(&params(0.5, years as f64, DeflectionMethod::Kinetic))
                .unwrap();
            assert!(result.corridor_shift_km > previous.corridor_shift_km);
            assert!(result.classification >= previous.classification);
            assert!(result.impact_probability_drop >= previous.impact_probability_drop);
            previous = result;
        }
        // 0.5 cm/s over 50 years clears the corridor
        assert_eq!(previous.classification, ImpactClassification::Clear);
        assert_eq!(previous.impact_probability_drop, 1.0);
    }

    #[test]
    fn test_probability_drop_bounds() {
        let hw = 1000.0;
        assert_eq!(impact_probability_drop(0.0, hw), 0.0);
        assert_relative_eq!(impact_probability_drop(500.0, hw), 0.75, epsilon = 1e-12);
        assert_eq!(impact_probability_drop(1000.0, hw), 1.0);
        assert_eq!(impact_probability_drop(5000.0, hw), 1.0);
    }

    #[test]
    fn test_custom_half_width() {
        let mut p = params(1.0, 1.0, DeflectionMethod::Kinetic);
        // shift ≈ 315.6 km
        p.original_trajectory.corridor_half_width_km = Some(300.0);
        let result = DeflectionModel::new().deflect(&p).unwrap();
        assert_eq!(result.classification, ImpactClassification::Clear);
        assert_relative_eq!(result.new_trajectory.miss_distance_km, 15.576, epsilon = 1e-6);
    }

    #[test]
    fn test_unknown_method_rejected() {
        let err = "laser".parse::<DeflectionMethod>().unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert_eq!(" Kinetic ".parse::<DeflectionMethod>().unwrap(), DeflectionMethod::Kinetic);
    }

    #[test]
    fn test_input_bounds() {
        let model = DeflectionModel::new();
        assert!(model.deflect(&params(-1.0, 10.0, DeflectionMethod::Kinetic)).is_err());
        assert!(model.deflect(&params(10_001.0, 10.0, DeflectionMethod::Kinetic)).is_err());
        assert!(model.deflect(&params(1.0, 0.0, DeflectionMethod::Kinetic)).is_err());
        assert!(model.deflect(&params(1.0, 101.0, DeflectionMethod::Kinetic)).is_err());
        let mut p = params(1.0, 10.0, DeflectionMethod::Kinetic);
        p.asteroid_diameter_m = 0.0;
        assert!(model.deflect(&p).is_err());
    }

    #[test]
    fn test_feasibility_scores_in_range() {
        let model = DeflectionModel::new();
        for method in DeflectionMethod::ALL {
            for lead in [0.5, 2.0, 10.0, 50.0] {
                let f = model.feasibility(&params(5.0, lead, method));
                assert!((0.0..=1.0).contains(&f.overall_score));
                assert!((0.0..=1.0).contains(&f.success_probability));
                assert_eq!(f.mission_duration_years, lead + 2.0);
                assert!(!f.challenges.is_empty());
            }
        }
    }

    #[test]
    fn test_kinetic_campaign_scales_with_size() {
        // 100 m body at 2000 kg/m³ is ~1.05e9 kg; 1 cm/s needs ~1.05e7 kg·m/s, one impactor
        assert_eq!(impactors_required(1.0, 100.0), 1);
        // 1 km body is 1000x heavier: ~822 impactors for the same Δv
        let many = impactors_required(1.0, 1000.0);
        assert!(many > 800 && many < 850, "impactors {}", many);

        let mut big = params(1.0, 10.0, DeflectionMethod::Kinetic);
        big.asteroid_diameter_m = 1000.0;
        let model = DeflectionModel::new();
        let small = model.feasibility(&params(1.0, 10.0, DeflectionMethod::Kinetic));
        let large = model.feasibility(&big);
        assert!(large.estimated_cost_usd > small.estimated_cost_usd);
        assert!(large.success_probability < small.success_probability);
        assert!(large.overall_score < small.overall_score);
    }

    #[test]
    fn test_longer_lead_time_improves_success() {
        let model = DeflectionModel::new();
        let short = model.feasibility(&params(1.0, 1.0, DeflectionMethod::Tractor));
        let long = model.feasibility(&params(1.0, 30.0, DeflectionMethod::Tractor));
        assert!(long.success_probability > short.success_probability);
        assert_eq!(long.technology_readiness, TechnologyReadiness::Concept);
    }

    #[test]
    fn test_result_serializes_lowercase_enums() {
        let result = DeflectionModel::new()
            .deflect(&params(2.0, 10.0, DeflectionMethod::Standoff))
            .unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["classification"], "clear");
        assert_eq!(json["mission_feasibility"]["technology_readiness"], "theoretical");
        assert_eq!(json["new_trajectory"]["method"], "standoff");
    }
}
