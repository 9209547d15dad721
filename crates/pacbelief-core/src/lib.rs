#![deny(warnings)]
pub mod belief;
pub mod cache;
pub mod config;
pub mod evidence;
pub mod filter;
pub mod grid;
pub mod metrics;
pub mod sensor;
pub mod transition;
pub mod view;

pub use belief::BeliefMap;
pub use cache::{TransitionCache, TransitionKey};
pub use config::{ConfigError, TrackerConfig};
pub use evidence::EvidenceGenerator;
pub use filter::{BeliefFilter, FilterError, TargetOutcome, UpdateReport};
pub use grid::{Cell, GridError, GridMap};
pub use metrics::{BeliefMetrics, TurnMetrics};
pub use sensor::SensorModel;
pub use transition::{BehaviorMode, TransitionModel};
pub use view::BeliefView;

pub struct AppInfo;

impl AppInfo {
    pub const fn name() -> &'static str {
        "pacbelief"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}
