//! HTTP API handlers for hrm-ui

pub mod health;
pub mod session;
pub mod settings;
pub mod wizard;

pub use health::health_routes;
pub use session::session_routes;
pub use settings::settings_routes;
pub use wizard::wizard_routes;
