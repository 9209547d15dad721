pub mod analytics;
pub mod config;
pub mod layout;
pub mod logging;
pub mod session;
