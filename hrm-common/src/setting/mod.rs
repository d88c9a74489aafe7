//! Settings: named, persisted collections of parameters
//!
//! A [`Setting`] represents one stage of the wizard (image acquisition
//! parameters, restoration parameters, analysis parameters) as an
//! ordered map of typed [`Parameter`]s owned by one user. Posted form
//! data is validated page-subset by page-subset (see the
//! `check_posted_*` family in [`checks`]); the composite outcome of
//! the last operation is retrievable via [`Setting::message`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::confidence::ConfidencePolicy;
use crate::params::catalog::{self, ParamGroup};
use crate::params::{ParamName, ParamValue, Parameter, MAX_CHANNELS};
use crate::{Error, Result};

mod checks;

/// Owner name under which administrator-authored template settings are
/// stored. Templates are shared read-only and copyable by every user.
pub const TEMPLATE_OWNER: &str = "admin";

/// The three wizard stages a setting can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingKind {
    Image,
    Restoration,
    Analysis,
}

impl SettingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKind::Image => "image",
            SettingKind::Restoration => "restoration",
            SettingKind::Analysis => "analysis",
        }
    }

    pub fn parse(s: &str) -> Option<SettingKind> {
        match s {
            "image" => Some(SettingKind::Image),
            "restoration" => Some(SettingKind::Restoration),
            "analysis" => Some(SettingKind::Analysis),
            _ => None,
        }
    }

    /// Wizard groups owned by this kind. The groups are disjoint
    /// across kinds; together they cover the whole catalog.
    pub fn groups(&self) -> &'static [ParamGroup] {
        match self {
            SettingKind::Image => &[
                ParamGroup::Image,
                ParamGroup::Microscope,
                ParamGroup::Capturing,
                ParamGroup::PixelSizeCalculation,
                ParamGroup::Sted,
                ParamGroup::PsfFile,
                ParamGroup::Correction,
            ],
            SettingKind::Restoration => &[ParamGroup::Restoration],
            SettingKind::Analysis => &[ParamGroup::Analysis],
        }
    }

    /// All parameter names owned by this kind, in catalog order.
    pub fn parameter_names(&self) -> Vec<ParamName> {
        self.groups()
            .iter()
            .flat_map(|g| catalog::group_members(*g))
            .collect()
    }
}

impl std::fmt::Display for SettingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named collection of parameters for a wizard stage.
#[derive(Debug, Clone)]
pub struct Setting {
    kind: SettingKind,
    name: String,
    owner: String,
    is_default: bool,
    number_of_channels: usize,
    parameters: BTreeMap<ParamName, Parameter>,
    message: String,
}

impl Setting {
    /// Create an empty setting of the given kind, with every owned
    /// parameter instantiated at its catalog default and one channel.
    pub fn new(kind: SettingKind) -> Setting {
        let parameters = kind
            .parameter_names()
            .into_iter()
            .map(|name| (name, Parameter::new(name)))
            .collect();
        Setting {
            kind,
            name: String::new(),
            owner: String::new(),
            is_default: false,
            number_of_channels: 1,
            parameters,
            message: String::new(),
        }
    }

    pub fn kind(&self) -> SettingKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn set_owner(&mut self, owner: &str) {
        self.owner = owner.to_string();
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn make_default(&mut self) {
        self.is_default = true;
    }

    pub fn clear_default(&mut self) {
        self.is_default = false;
    }

    /// Last human-readable outcome (validation errors or success
    /// confirmation). Overwritten by every `check_posted_*` and save
    /// call; read it immediately after the operation that produced it.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The parameter of the given name.
    ///
    /// Asking for a name this kind does not own is a programming
    /// error, reported loudly instead of silently returning a default.
    pub fn parameter(&self, name: ParamName) -> Result<&Parameter> {
        self.parameters
            .get(&name)
            .ok_or_else(|| Error::UnknownParameter {
                kind: self.kind.as_str(),
                name: name.as_str().to_string(),
            })
    }

    pub fn parameter_mut(&mut self, name: ParamName) -> Result<&mut Parameter> {
        let kind = self.kind.as_str();
        self.parameters
            .get_mut(&name)
            .ok_or_else(|| Error::UnknownParameter {
                kind,
                name: name.as_str().to_string(),
            })
    }

    /// Infallible access for names this module knows the kind owns.
    pub(crate) fn param(&self, name: ParamName) -> &Parameter {
        self.parameters
            .get(&name)
            .expect("setting kind owns this parameter")
    }

    pub(crate) fn param_mut(&mut self, name: ParamName) -> &mut Parameter {
        self.parameters
            .get_mut(&name)
            .expect("setting kind owns this parameter")
    }

    /// Replace the stored parameter of the same name.
    pub fn set(&mut self, parameter: Parameter) {
        self.parameters.insert(parameter.name(), parameter);
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = ParamName> + '_ {
        self.parameters.keys().copied()
    }

    pub fn number_of_channels(&self) -> usize {
        self.number_of_channels
    }

    /// Propagate a channel count to every per-channel parameter,
    /// preserving entries below the new count. Clamped to
    /// `1..=MAX_CHANNELS`.
    pub fn set_number_of_channels(&mut self, n: usize) {
        let n = n.clamp(1, MAX_CHANNELS);
        self.number_of_channels = n;
        for parameter in self.parameters.values_mut() {
            parameter.set_channels(n);
        }
    }

    /// Set the confidence level of every parameter from the policy,
    /// keyed by the selected image file format (empty for kinds that
    /// are format-independent).
    pub fn apply_confidence(&mut self, policy: &ConfidencePolicy) {
        let format = match self.kind {
            SettingKind::Image => self
                .param(ParamName::ImageFileFormat)
                .as_str()
                .unwrap_or("")
                .to_string(),
            _ => String::new(),
        };
        for parameter in self.parameters.values_mut() {
            parameter.set_confidence(policy.level(&format, parameter.name()));
        }
    }

    /// Copy all parameter values (but not name/owner/default flag)
    /// from another setting of the same kind.
    pub fn copy_parameters_from(&mut self, other: &Setting) {
        self.number_of_channels = other.number_of_channels;
        for (name, parameter) in &other.parameters {
            if let Some(own) = self.parameters.get_mut(name) {
                own.set_channels(other.number_of_channels);
                own.set_value(parameter.value().clone());
            }
        }
    }

    pub fn microscope_type(&self) -> Option<&str> {
        self.parameters
            .get(&ParamName::MicroscopeType)
            .and_then(Parameter::as_str)
    }

    pub fn is_sted(&self) -> bool {
        matches!(self.microscope_type(), Some("STED") | Some("STED 3D"))
    }

    pub fn is_sted_3d(&self) -> bool {
        matches!(self.microscope_type(), Some("STED 3D"))
    }

    pub fn is_two_photon(&self) -> bool {
        matches!(self.microscope_type(), Some("two photon"))
    }

    /// Confocal variants have a physical pinhole to describe.
    pub fn has_pinhole(&self) -> bool {
        matches!(
            self.microscope_type(),
            Some("single point confocal")
                | Some("multipoint confocal (spinning disk)")
                | Some("nipkow disk confocal")
        )
    }

    /// Whether a measured PSF was chosen over a theoretical one.
    pub fn uses_measured_psf(&self) -> bool {
        self.parameters
            .get(&ParamName::PointSpreadFunction)
            .and_then(Parameter::as_str)
            == Some("measured")
    }

    /// Relative refractive-index deviation between sample medium and
    /// lens immersion medium; `None` when either index is unknown.
    pub fn refractive_index_deviation(&self) -> Option<f64> {
        let objective = self.param(ParamName::ObjectiveType).as_str()?;
        let medium = self.param(ParamName::SampleMedium).as_str()?;
        let objective_ri = catalog::refractive_index(ParamName::ObjectiveType, objective)?;
        let sample_ri = catalog::refractive_index(ParamName::SampleMedium, medium)?;
        Some((sample_ri - objective_ri).abs() / objective_ri)
    }

    /// Stable plain-text summary of the current parameter values, for
    /// confirmation screens. Deterministic given identical state.
    pub fn display_string(&self) -> String {
        let mut out = String::new();
        for parameter in self.parameters.values() {
            if !self.displayed(parameter.name()) {
                continue;
            }
            out.push_str(&parameter.display_line());
        }
        out
    }

    /// Parameters hidden from the summary because the current state
    /// makes them irrelevant.
    fn displayed(&self, name: ParamName) -> bool {
        let group = catalog::def(name).group;
        match group {
            // Calculator inputs are scratch values, not acquisition facts.
            ParamGroup::PixelSizeCalculation => false,
            ParamGroup::Sted => self.is_sted(),
            ParamGroup::PsfFile => self.uses_measured_psf(),
            ParamGroup::Correction => self
                .param(ParamName::AberrationCorrectionNecessary)
                .as_bool()
                .unwrap_or(false),
            _ => true,
        }
    }

    /// Persist the setting. Returns whether the save succeeded; on
    /// failure the details go to the log and [`Setting::message`]
    /// carries a generic notice, never the raw database error.
    pub async fn save(&mut self, db: &sqlx::SqlitePool) -> bool {
        match crate::db::settings::save_setting(db, self).await {
            Ok(()) => {
                self.message = "The setting has been saved.".to_string();
                true
            }
            Err(e) => {
                tracing::error!(
                    "Failed to save {} setting '{}' for {}: {}",
                    self.kind,
                    self.name,
                    self.owner,
                    e
                );
                self.message = "An error occurred while saving the setting.".to_string();
                false
            }
        }
    }

    /// Serialize all parameter values to the JSON form stored in the
    /// database.
    pub fn values_to_json(&self) -> Result<String> {
        let map: BTreeMap<&str, &ParamValue> = self
            .parameters
            .iter()
            .map(|(name, p)| (name.as_str(), p.value()))
            .collect();
        serde_json::to_string(&map).map_err(|e| Error::Internal(format!("serialize setting: {}", e)))
    }

    /// Restore parameter values from their stored JSON form.
    ///
    /// Unknown or foreign parameter names fail fast instead of being
    /// silently dropped.
    pub fn values_from_json(&mut self, json: &str) -> Result<()> {
        let map: BTreeMap<String, ParamValue> = serde_json::from_str(json)
            .map_err(|e| Error::Internal(format!("deserialize setting: {}", e)))?;
        let mut values = Vec::with_capacity(map.len());
        for (name, value) in map {
            let parsed = ParamName::parse(&name).ok_or_else(|| Error::UnknownParameter {
                kind: self.kind.as_str(),
                name,
            })?;
            values.push((parsed, value));
        }
        // Shape before content: the stored channel count must be in
        // effect when the per-channel arrays are applied, or they get
        // truncated to the current count. Kinds without a channel-count
        // parameter fall back to the widest stored array.
        let n = values
            .iter()
            .find(|(name, _)| *name == ParamName::NumberOfChannels)
            .and_then(|(_, value)| match value {
                ParamValue::Scalar(Some(s)) => s.trim().parse().ok(),
                _ => None,
            })
            .or_else(|| {
                values
                    .iter()
                    .filter_map(|(_, value)| match value {
                        ParamValue::PerChannel(vs) => Some(vs.len()),
                        _ => None,
                    })
                    .max()
            })
            .unwrap_or(self.number_of_channels);
        self.set_number_of_channels(n);
        for (name, value) in values {
            self.parameter_mut(name)?.set_value(value);
        }
        Ok(())
    }
}
