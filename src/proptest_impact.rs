//! Property-based tests for the impact and deflection models using proptest.
//!
//! These tests check ordering and monotonicity properties over the whole
//! accepted input domain rather than at hand-picked points.

use proptest::prelude::*;
use std::sync::Arc;

use crate::deflection::{classify, corridor_shift_km, impact_probability_drop, DeflectionMethod};
use crate::materials::{MaterialTable, MaterialType};
use crate::monte_carlo::{ChannelStats, MonteCarloAggregator};
use crate::physics_engine::{BlastLevel, ImpactParameters, ImpactPhysicsModel, ThermalLevel};
use crate::population::{ExposureZone, GeoPoint, PopulationDataset, PopulationExposureEstimator};
use crate::sampler::ParameterSampler;

fn model() -> ImpactPhysicsModel {
    ImpactPhysicsModel::new(Arc::new(MaterialTable::standard())).unwrap()
}

fn params_strategy() -> impl Strategy<Value = ImpactParameters> {
    (
        1.0f64..2000.0,
        1000.0f64..8000.0,
        11.0f64..72.0,
        1.0f64..90.0,
        -90.0f64..90.0,
        -180.0f64..180.0,
    )
        .prop_map(|(diameter_m, density_kg_m3, velocity_km_s, angle_deg, lat, lon)| ImpactParameters {
            diameter_m,
            density_kg_m3,
            velocity_km_s,
            angle_deg,
            lat,
            lon,
        })
}

fn method_strategy() -> impl Strategy<Value = DeflectionMethod> {
    prop_oneof![
        Just(DeflectionMethod::Kinetic),
        Just(DeflectionMethod::Tractor),
        Just(DeflectionMethod::Standoff),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Stricter thresholds reach less far: 1 psi beyond 50 psi, first-degree burns beyond ignition.
    #[test]
    fn prop_radii_shrink_with_severity(params in params_strategy()) {
        let effects = model().compute(&params).unwrap();
        for pair in BlastLevel::ALL.windows(2) {
            prop_assert!(effects.blast_radius(pair[0]) >= effects.blast_radius(pair[1]));
        }
        for pair in ThermalLevel::ALL.windows(2) {
            prop_assert!(effects.thermal_radius(pair[0]) >= effects.thermal_radius(pair[1]));
        }
    }

    /// Robust materials never fail further out than fragile ones.
    #[test]
    fn prop_steel_footprint_inside_glass(params in params_strategy()) {
        let effects = model().compute(&params).unwrap();
        let glass = effects.material(MaterialType::Glass).unwrap();
        let steel = effects.material(MaterialType::Steel).unwrap();
        prop_assert!(steel.radius_km <= glass.radius_km);
        for footprint in &effects.materials {
            prop_assert!((0.0..=100.0).contains(&footprint.damage_percentage));
        }
    }

    /// Larger bodies carry more energy and push every zone outward.
    #[test]
    fn prop_effects_grow_with_diameter(params in params_strategy(), factor in 1.01f64..3.0) {
        let bigger = ImpactParameters { diameter_m: params.diameter_m * factor, ..params };
        let model = model();
        let small = model.compute(&params).unwrap();
        let large = model.compute(&bigger).unwrap();
        prop_assert!(large.effective_energy_j > small.effective_energy_j);
        prop_assert!(large.blast_radius(BlastLevel::Psi1) >= small.blast_radius(BlastLevel::Psi1));
        prop_assert!(large.crater.rim_radius_km >= small.crater.rim_radius_km);
    }

    /// Aggregated bands are always ordered.
    #[test]
    fn prop_bands_ordered(params in params_strategy(), seed in any::<u64>()) {
        let draws = ParameterSampler::default().sample(&params, 40, seed).unwrap();
        let channels = MonteCarloAggregator::new().aggregate(&draws, &model()).unwrap();
        for (channel, stats) in channels.iter() {
            prop_assert!(stats.band.is_ordered(), "{:?} unordered: {:?}", channel, stats.band);
            prop_assert!(stats.min <= stats.band.p5 && stats.band.p95 <= stats.max);
        }
    }

    /// Exposure never shrinks as the radius grows, anywhere on the globe.
    #[test]
    fn prop_exposure_monotone_in_radius(
        lat in -89.0f64..89.0,
        lon in -179.0f64..179.0,
        r in 0.0f64..500.0,
        dr in 0.0f64..200.0,
    ) {
        let data = PopulationDataset::builtin(2025);
        let estimator = PopulationExposureEstimator::new(&data).unwrap();
        let point = GeoPoint::new(lat, lon);
        let inner = estimator.population_in_disc(point, r).total;
        let outer = estimator.population_in_disc(point, r + dr).total;
        prop_assert!(outer >= inner - 1e-6 * inner.max(1.0));
    }

    /// Combined total never exceeds the sum of the zones it combines.
    #[test]
    fn prop_union_not_more_than_sum(
        lat in -60.0f64..60.0,
        lon in -179.0f64..179.0,
        a in 0.0f64..300.0,
        b in 0.0f64..300.0,
    ) {
        let data = PopulationDataset::builtin(2025);
        let estimator = PopulationExposureEstimator::new(&data).unwrap();
        let zones = vec![
            ExposureZone {
                zone: "a".into(),
                description: "a".into(),
                radius_km: ChannelStats::point(a),
            },
            ExposureZone {
                zone: "b".into(),
                description: "b".into(),
                radius_km: ChannelStats::point(b),
            },
        ];
        let report = estimator.assess(GeoPoint::new(lat, lon), &zones);
        let sum: f64 = report.population.iter().map(|p| p.count.p50).sum();
        prop_assert!(report.total_affected.p50 <= sum + 1e-6 * sum.max(1.0));
    }

    /// Corridor shift strictly increases with Δv; classification never steps back.
    #[test]
    fn prop_deflection_monotone(
        dv in 0.0f64..100.0,
        extra in 0.001f64..100.0,
        lead in 0.1f64..100.0,
        method in method_strategy(),
    ) {
        let hw = 6471.0;
        let low = corridor_shift_km(dv, lead, method);
        let high = corridor_shift_km(dv + extra, lead, method);
        prop_assert!(high > low);
        prop_assert!(classify(high, hw) >= classify(low, hw));
        prop_assert!(impact_probability_drop(high, hw) >= impact_probability_drop(low, hw));
        prop_assert!((0.0..=1.0).contains(&impact_probability_drop(high, hw)));
    }

    /// Launching earlier moves the impact point further for any positive Δv.
    #[test]
    fn prop_deflection_monotone_in_lead_time(
        dv in 0.001f64..100.0,
        lead in 0.1f64..50.0,
        extra in 0.01f64..50.0,
        method in method_strategy(),
    ) {
        let hw = 6471.0;
        let early = corridor_shift_km(dv, lead + extra, method);
        let late = corridor_shift_km(dv, lead, method);
        prop_assert!(early > late);
        prop_assert!(classify(early, hw) >= classify(late, hw));
        prop_assert!(impact_probability_drop(early, hw) >= impact_probability_drop(late, hw));
    }
}
