// Population Exposure - Affected population within effect zones
// Named density centers plus regional background density, union of zones for totals

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::Path;

use crate::error::{EngineError, EngineResult};
use crate::monte_carlo::{ChannelStats, UncertaintyBand};

/// Mean Earth radius (km)
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Background density outside every listed region (people/km²)
pub const DEFAULT_BACKGROUND_DENSITY: f64 = 50.0;

/// Ceiling on any exposure count when a dataset does not state its own
pub const DEFAULT_WORLD_POPULATION: f64 = 8.2e9;

/// No point on the surface is farther from ground zero than this (km)
pub const MAX_SURFACE_DISTANCE_KM: f64 = PI * EARTH_RADIUS_KM;

// =============================================================================
// GEOGRAPHY
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Great-circle distance (haversine) in km
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Surface area within geodesic distance `radius_km` of a point (km²).
/// Spherical cap 2πR²(1 - cos(r/R)); the whole globe once r reaches πR.
pub fn spherical_cap_area_km2(radius_km: f64) -> f64 {
    let r = radius_km.clamp(0.0, MAX_SURFACE_DISTANCE_KM);
    2.0 * PI * EARTH_RADIUS_KM * EARTH_RADIUS_KM * (1.0 - (r / EARTH_RADIUS_KM).cos())
}

/// Intersection area of two discs with radii `r1`, `r2` whose centers are `d` apart.
pub fn circle_overlap_area(d: f64, r1: f64, r2: f64) -> f64 {
    if r1 <= 0.0 || r2 <= 0.0 || d >= r1 + r2 {
        return 0.0;
    }
    if d <= (r1 - r2).abs() {
        let r = r1.min(r2);
        return PI * r * r;
    }

    let alpha = ((d * d + r1 * r1 - r2 * r2) / (2.0 * d * r1)).clamp(-1.0, 1.0).acos();
    let beta = ((d * d + r2 * r2 - r1 * r1) / (2.0 * d * r2)).clamp(-1.0, 1.0).acos();
    let kite = 0.5
        * ((-d + r1 + r2) * (d + r1 - r2) * (d - r1 + r2) * (d + r1 + r2))
            .max(0.0)
            .sqrt();
    (r1 * r1 * alpha + r2 * r2 * beta - kite).max(0.0)
}

// =============================================================================
// DATASET
// =============================================================================

/// High-density urban center, modeled as a uniform disc
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationCenter {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub population: f64,
    pub density_per_km2: f64,
}

impl PopulationCenter {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }

    /// Radius of the equivalent uniform disc (km)
    pub fn radius_km(&self) -> f64 {
        (self.population / (PI * self.density_per_km2)).sqrt()
    }
}

/// Lat/lon box with a background density. First matching region wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityRegion {
    pub name: String,
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
    pub density_per_km2: f64,
}

impl DensityRegion {
    pub fn contains(&self, point: GeoPoint) -> bool {
        point.lat > self.lat_min
            && point.lat < self.lat_max
            && point.lon > self.lon_min
            && point.lon < self.lon_max
    }
}

/// Read-only population data, loaded once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationDataset {
    pub year: i32,
    pub centers: Vec<PopulationCenter>,
    #[serde(default)]
    pub regions: Vec<DensityRegion>,
    #[serde(default = "default_background_density")]
    pub default_density_per_km2: f64,
    /// Upper bound on every count drawn from this dataset
    #[serde(default = "default_world_population")]
    pub world_population: f64,
}

fn default_background_density() -> f64 {
    DEFAULT_BACKGROUND_DENSITY
}

fn default_world_population() -> f64 {
    DEFAULT_WORLD_POPULATION
}

impl PopulationDataset {
    /// Built-in megacity table and coarse regional densities
    pub fn builtin(year: i32) -> Self {
        let center = |name: &str, lat, lon, population, density_per_km2| PopulationCenter {
            name: name.to_string(),
            lat,
            lon,
            population,
            density_per_km2,
        };
        let region = |name: &str, lat_min, lat_max, lon_min, lon_max, density_per_km2| DensityRegion {
            name: name.to_string(),
            lat_min,
            lat_max,
            lon_min,
            lon_max,
            density_per_km2,
        };

        Self {
            year,
            centers: vec![
                center("Tokyo", 35.6762, 139.6503, 37_400_068.0, 6158.0),
                center("Delhi", 28.7041, 77.1025, 30_290_936.0, 11297.0),
                center("Shanghai", 31.2304, 121.4737, 27_058_480.0, 3847.0),
                center("São Paulo", -23.5558, -46.6396, 22_043_028.0, 7398.0),
                center("Mexico City", 19.4326, -99.1332, 21_671_908.0, 5967.0),
                center("Cairo", 30.0444, 31.2357, 20_484_965.0, 19376.0),
                center("Mumbai", 19.0760, 72.8777, 20_411_274.0, 20694.0),
                center("Beijing", 39.9042, 116.4074, 20_035_455.0, 1311.0),
                center("Dhaka", 23.8103, 90.4125, 19_578_421.0, 23234.0),
                center("Osaka", 34.6937, 135.5023, 19_222_665.0, 12004.0),
                center("New York", 40.7128, -74.0060, 18_804_000.0, 10194.0),
                center("Karachi", 24.8607, 67.0011, 15_400_000.0, 18900.0),
                center("Istanbul", 41.0082, 28.9784, 15_067_724.0, 2813.0),
                center("Kinshasa", -4.4419, 15.2663, 14_565_000.0, 1555.0),
                center("Lagos", 6.5244, 3.3792, 14_368_332.0, 13712.0),
                center("Buenos Aires", -34.6118, -58.3960, 14_967_000.0, 14429.0),
                center("Kolkata", 22.5726, 88.3639, 14_850_066.0, 24306.0),
                center("Manila", 14.5995, 120.9842, 13_482_462.0, 41515.0),
                center("Tianjin", 39.3434, 117.3616, 13_215_344.0, 1173.0),
                center("Guangzhou", 23.1291, 113.2644, 13_080_500.0, 1800.0),
            ],
            regions: vec![
                region("Arctic", 60.0, 90.1, -180.1, 180.1, 1.0),
                region("Antarctic", -90.1, -60.0, -180.1, 180.1, 1.0),
                region("Sahara and Arabian deserts", 20.0, 35.0, -20.0, 60.0, 1.0),
                region("Australian outback", -30.0, -10.0, 110.0, 155.0, 1.0),
                region("Central Asian deserts", 35.0, 45.0, 55.0, 90.0, 1.0),
                region("Northern latitudes", 45.0, 60.0, -180.1, 180.1, 20.0),
                region("Southern latitudes", -60.0, -45.0, -180.1, 180.1, 20.0),
                region("Eastern tropics", -10.0, 10.0, 60.0, 95.0, 20.0),
                region("Western tropics", -10.0, 10.0, -180.1, -60.0, 20.0),
                region("South Asia", 0.0, 40.0, 60.0, 100.0, 200.0),
                region("Southeast Asia", -10.0, 20.0, 95.0, 140.0, 200.0),
                region("Europe and Western Asia", 10.0, 70.0, -10.0, 60.0, 100.0),
                region("East Asia", 20.0, 50.0, 70.0, 140.0, 100.0),
                region("North America", 25.0, 50.0, -130.0, -60.0, 100.0),
            ],
            default_density_per_km2: DEFAULT_BACKGROUND_DENSITY,
            world_population: DEFAULT_WORLD_POPULATION,
        }
    }

    pub fn from_json(json: &str) -> EngineResult<Self> {
        let dataset: Self = serde_json::from_str(json)?;
        dataset.validate()?;
        Ok(dataset)
    }

    pub fn from_file(path: &Path) -> EngineResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Fails closed: an empty table must never read as "zero people".
    pub fn validate(&self) -> EngineResult<()> {
        if self.centers.is_empty() {
            return Err(EngineError::unavailable(
                "population dataset",
                "no population centers loaded",
            ));
        }
        for c in &self.centers {
            let ok = c.lat.is_finite()
                && c.lon.is_finite()
                && c.population.is_finite()
                && c.population > 0.0
                && c.density_per_km2.is_finite()
                && c.density_per_km2 > 0.0;
            if !ok {
                return Err(EngineError::unavailable(
                    "population dataset",
                    format!("invalid population center '{}'", c.name),
                ));
            }
        }
        if !self.world_population.is_finite() || self.world_population <= 0.0 {
            return Err(EngineError::unavailable(
                "population dataset",
                "world population must be finite and positive",
            ));
        }
        let densities = self
            .regions
            .iter()
            .map(|r| r.density_per_km2)
            .chain(std::iter::once(self.default_density_per_km2));
        for density in densities {
            if !density.is_finite() || density < 0.0 {
                return Err(EngineError::unavailable(
                    "population dataset",
                    "background densities must be finite and non-negative",
                ));
            }
        }
        Ok(())
    }

    /// Background density at a point (people/km²)
    pub fn background_density(&self, point: GeoPoint) -> f64 {
        self.regions
            .iter()
            .find(|r| r.contains(point))
            .map(|r| r.density_per_km2)
            .unwrap_or(self.default_density_per_km2)
    }
}

// =============================================================================
// EXPOSURE RESULTS
// =============================================================================

/// Population inside a single disc
#[derive(Debug, Clone, PartialEq)]
pub struct DiscPopulation {
    pub total: f64,
    /// (center index, people) for every center the disc touches
    pub by_center: Vec<(usize, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionExposure {
    pub name: String,
    pub count: UncertaintyBand,
}

/// Affected population for one effect zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationExposureEntry {
    pub description: String,
    pub zone: String,
    pub count: UncertaintyBand,
    pub range: [f64; 2],
    pub source_radius_km: UncertaintyBand,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalAffected {
    pub p50: f64,
    pub range: [f64; 2],
    pub band: UncertaintyBand,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureReport {
    pub total_affected: TotalAffected,
    pub population: Vec<PopulationExposureEntry>,
    pub regions: Vec<RegionExposure>,
}

/// Effect zone handed to the estimator
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureZone {
    pub zone: String,
    pub description: String,
    pub radius_km: ChannelStats,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExposureEstimate {
    pub count: UncertaintyBand,
    pub range: [f64; 2],
    pub regions: Vec<RegionExposure>,
}

// =============================================================================
// ESTIMATOR
// =============================================================================

pub struct PopulationExposureEstimator<'a> {
    dataset: &'a PopulationDataset,
}

impl<'a> PopulationExposureEstimator<'a> {
    pub fn new(dataset: &'a PopulationDataset) -> EngineResult<Self> {
        dataset.validate()?;
        Ok(Self { dataset })
    }

    /// People inside a disc of `radius_km` around `center`.
    ///
    /// Centers contribute their density times the overlap area; the rest of the
    /// disc is filled with the regional background density. The radius is
    /// geodesic and stops at the antipode; the total never exceeds the
    /// dataset's world population.
    pub fn population_in_disc(&self, center: GeoPoint, radius_km: f64) -> DiscPopulation {
        if radius_km <= 0.0 || radius_km.is_nan() {
            return DiscPopulation {
                total: 0.0,
                by_center: Vec::new(),
            };
        }

        let radius_km = radius_km.min(MAX_SURFACE_DISTANCE_KM);
        let mut by_center = Vec::new();
        let mut covered_area = 0.0;
        let mut urban = 0.0;
        for (index, c) in self.dataset.centers.iter().enumerate() {
            let distance = haversine_km(center, c.location());
            let overlap = circle_overlap_area(distance, radius_km, c.radius_km());
            if overlap > 0.0 {
                let people = (c.density_per_km2 * overlap).min(c.population);
                by_center.push((index, people));
                covered_area += overlap;
                urban += people;
            }
        }

        let disc_area = spherical_cap_area_km2(radius_km);
        let background =
            self.dataset.background_density(center) * (disc_area - covered_area).max(0.0);

        DiscPopulation {
            total: (urban + background).min(self.dataset.world_population),
            by_center,
        }
    }

    /// Population band for one zone. Population grows with radius, so each
    /// percentile radius maps to the same percentile of population.
    pub fn estimate(&self, center: GeoPoint, radius_km: &ChannelStats) -> ExposureEstimate {
        let band = radius_km.band;
        let at = [
            self.population_in_disc(center, band.p5),
            self.population_in_disc(center, band.p50),
            self.population_in_disc(center, band.p95),
        ];
        let count = UncertaintyBand {
            p5: at[0].total,
            p50: at[1].total,
            p95: at[2].total,
        };
        let range = [
            self.population_in_disc(center, radius_km.min).total,
            self.population_in_disc(center, radius_km.max).total,
        ];

        let people_at = |disc: &DiscPopulation, index: usize| {
            disc.by_center
                .iter()
                .find(|(i, _)| *i == index)
                .map(|(_, p)| *p)
                .unwrap_or(0.0)
        };
        let regions = at[2]
            .by_center
            .iter()
            .map(|(index, _)| RegionExposure {
                name: self.dataset.centers[*index].name.clone(),
                count: UncertaintyBand {
                    p5: people_at(&at[0], *index),
                    p50: people_at(&at[1], *index),
                    p95: people_at(&at[2], *index),
                },
            })
            .collect();

        ExposureEstimate {
            count,
            range,
            regions,
        }
    }

    /// Exposure per zone plus the union total. Zones are concentric discs, so
    /// the union is the largest radius at every percentile, never the sum.
    pub fn assess(&self, center: GeoPoint, zones: &[ExposureZone]) -> ExposureReport {
        let population = zones
            .iter()
            .map(|zone| {
                let estimate = self.estimate(center, &zone.radius_km);
                PopulationExposureEntry {
                    description: zone.description.clone(),
                    zone: zone.zone.clone(),
                    count: estimate.count,
                    range: estimate.range,
                    source_radius_km: zone.radius_km.band,
                }
            })
            .collect();

        let union = zones
            .iter()
            .map(|z| z.radius_km)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_else(|| ChannelStats::point(0.0));
        let total = self.estimate(center, &union);

        ExposureReport {
            total_affected: TotalAffected {
                p50: total.count.p50,
                range: total.range,
                band: total.count,
            },
            population,
            regions: total.regions,
        }
    }
}
