//! # HRM Common Library
//!
//! Shared engine for the HRM settings workflow:
//! - Typed parameter catalog and validation
//! - Per-format confidence policy
//! - Settings (image, restoration, analysis) and their page checks
//! - Wizard page sequencing
//! - Setting management (create, copy, default, delete)
//! - Database storage

pub mod confidence;
pub mod db;
pub mod editor;
pub mod error;
pub mod params;
pub mod setting;
pub mod wizard;

pub use confidence::{ConfidenceLevel, ConfidencePolicy};
pub use editor::SettingEditor;
pub use error::{Error, Result};
pub use params::{FieldMap, ParamName, ParamValue, Parameter};
pub use setting::{Setting, SettingKind};
pub use wizard::{NextStep, SettingPhase, WizardPage};
