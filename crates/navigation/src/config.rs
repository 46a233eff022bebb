use std::{env, fmt, fs, str::FromStr, time::Duration};

use crate::{
    arrival::DEFAULT_ARRIVAL_RADIUS_M,
    boundary::BoundingPolygon,
    tracker::{TrackerConfig, DEFAULT_CAMERA_INTERVAL, DEFAULT_MOVEMENT_THRESHOLD_M},
};

pub const DEFAULT_FIX_TIMEOUT: Duration = Duration::from_secs(10);
const MIN_FIX_TIMEOUT_SECS: u64 = 5;
const MAX_FIX_TIMEOUT_SECS: u64 = 10;

#[derive(Debug)]
pub enum ConfigError {
    Invalid { key: &'static str, value: String },
    Boundary(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid { key, value } => write!(f, "invalid value for {}: {:?}", key, value),
            Self::Boundary(why) => write!(f, "could not read touring area: {}", why),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct NavigationConfig {
    pub arrival_radius_m: f64,
    pub tracker: TrackerConfig,
    pub initial_fix_timeout: Duration,
    pub boundary: BoundingPolygon,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            arrival_radius_m: DEFAULT_ARRIVAL_RADIUS_M,
            tracker: TrackerConfig::default(),
            initial_fix_timeout: DEFAULT_FIX_TIMEOUT,
            boundary: BoundingPolygon::unrestricted(),
        }
    }
}

impl NavigationConfig {
    /// Reads the `TOUR_*` variables, falling back to the defaults for unset
    /// ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        let arrival_radius_m =
            parse_var("TOUR_ARRIVAL_RADIUS_M")?.unwrap_or(DEFAULT_ARRIVAL_RADIUS_M);
        let movement_threshold_m =
            parse_var("TOUR_MOVEMENT_THRESHOLD_M")?.unwrap_or(DEFAULT_MOVEMENT_THRESHOLD_M);
        let camera_interval = parse_var("TOUR_CAMERA_INTERVAL_MS")?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_CAMERA_INTERVAL);
        let initial_fix_timeout = parse_var::<u64>("TOUR_FIX_TIMEOUT_SECS")?
            .map(|secs| Duration::from_secs(secs.clamp(MIN_FIX_TIMEOUT_SECS, MAX_FIX_TIMEOUT_SECS)))
            .unwrap_or(DEFAULT_FIX_TIMEOUT);
        let boundary = match env::var("TOUR_BOUNDARY_FILE") {
            Ok(path) => load_boundary(&path)?,
            Err(_) => BoundingPolygon::unrestricted(),
        };

        Ok(Self {
            arrival_radius_m,
            tracker: TrackerConfig {
                movement_threshold_m,
                camera_interval,
            },
            initial_fix_timeout,
            boundary,
        })
    }
}

/// Reads a touring area from a JSON file of `[lat, lon]` pairs.
pub fn load_boundary(path: &str) -> Result<BoundingPolygon, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|why| ConfigError::Boundary(format!("{}: {}", path, why)))?;
    parse_boundary(&raw)
}

fn parse_boundary(raw: &str) -> Result<BoundingPolygon, ConfigError> {
    serde_json::from_str(raw).map_err(|why| ConfigError::Boundary(why.to_string()))
}

fn parse_var<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use model::geo::Coordinate;

    use super::*;

    #[test]
    fn defaults_match_the_documented_constants() {
        let config = NavigationConfig::default();
        assert_eq!(config.arrival_radius_m, 50.0);
        assert_eq!(config.tracker.movement_threshold_m, 5.0);
        assert_eq!(config.tracker.camera_interval, Duration::from_secs(1));
        assert_eq!(config.initial_fix_timeout, Duration::from_secs(10));
        assert!(config.boundary.is_unrestricted());
    }

    // the only test touching the process environment
    #[test]
    fn reads_and_clamps_environment() {
        env::set_var("TOUR_ARRIVAL_RADIUS_M", "35.5");
        env::set_var("TOUR_FIX_TIMEOUT_SECS", "60");
        env::set_var("TOUR_CAMERA_INTERVAL_MS", "250");
        let config = NavigationConfig::from_env().unwrap();
        assert_eq!(config.arrival_radius_m, 35.5);
        assert_eq!(config.initial_fix_timeout, Duration::from_secs(10));
        assert_eq!(config.tracker.camera_interval, Duration::from_millis(250));

        env::set_var("TOUR_FIX_TIMEOUT_SECS", "1");
        assert_eq!(
            NavigationConfig::from_env().unwrap().initial_fix_timeout,
            Duration::from_secs(5)
        );

        env::set_var("TOUR_ARRIVAL_RADIUS_M", "fifty");
        assert!(matches!(
            NavigationConfig::from_env(),
            Err(ConfigError::Invalid { key: "TOUR_ARRIVAL_RADIUS_M", .. })
        ));

        env::remove_var("TOUR_ARRIVAL_RADIUS_M");
        env::remove_var("TOUR_FIX_TIMEOUT_SECS");
        env::remove_var("TOUR_CAMERA_INTERVAL_MS");
    }

    #[test]
    fn boundary_from_json() {
        let polygon = parse_boundary("[[0, 0], [0, 2], [2, 2], [2, 0]]").unwrap();
        assert!(polygon.contains(&Coordinate::new(1.0, 1.0)));
        assert!(matches!(parse_boundary("{}"), Err(ConfigError::Boundary(_))));
        assert!(matches!(
            load_boundary("/nonexistent/area.json"),
            Err(ConfigError::Boundary(_))
        ));
    }
}
