use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    #[default]
    Walking,
    Cycling,
    Driving,
}

impl TransportMode {
    pub const ALL: [TransportMode; 3] = [Self::Walking, Self::Cycling, Self::Driving];

    /// Speed in m/s used whenever no provider duration is available.
    pub fn fallback_speed(&self) -> f64 {
        match self {
            Self::Walking => 1.4,
            Self::Cycling => 4.0,
            Self::Driving => 8.33,
        }
    }

    /// Seconds needed for `distance_meters` at the fallback speed.
    pub fn estimate_seconds(&self, distance_meters: f64) -> f64 {
        distance_meters / self.fallback_speed()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Walking => "walking",
            Self::Cycling => "cycling",
            Self::Driving => "driving",
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Self::Walking => "Walk",
            Self::Cycling => "Cycle",
            Self::Driving => "Drive",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTransportMode(pub String);

impl fmt::Display for UnknownTransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown transport mode '{}'", self.0)
    }
}

impl std::error::Error for UnknownTransportMode {}

impl FromStr for TransportMode {
    type Err = UnknownTransportMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "walking" | "walk" | "foot" => Ok(Self::Walking),
            "cycling" | "bike" | "bicycle" => Ok(Self::Cycling),
            "driving" | "drive" | "car" => Ok(Self::Driving),
            _ => Err(UnknownTransportMode(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eta_for_one_kilometer() {
        assert_eq!(TransportMode::Walking.estimate_seconds(1000.0).round(), 714.0);
        assert_eq!(TransportMode::Cycling.estimate_seconds(1000.0), 250.0);
        assert_eq!(TransportMode::Driving.estimate_seconds(1000.0).round(), 120.0);
    }

    #[test]
    fn parses_aliases() {
        assert_eq!("car".parse::<TransportMode>(), Ok(TransportMode::Driving));
        assert_eq!("Walking".parse::<TransportMode>(), Ok(TransportMode::Walking));
        assert!("boat".parse::<TransportMode>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&TransportMode::Cycling).unwrap(),
            "\"cycling\""
        );
    }
}
