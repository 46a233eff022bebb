pub mod announcer;
pub mod arrival;
pub mod boundary;
pub mod config;
pub mod directions;
pub mod navigator;
pub mod optimizer;
pub mod progress;
pub mod session;
pub mod sites;
pub mod steps;
pub mod tracker;

pub use config::NavigationConfig;
pub use session::{NavigationSession, SessionEvent, SessionParts, SessionPhase};
