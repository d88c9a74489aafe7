//! Parameter confidence levels and the per-format confidence policy
//!
//! A confidence level states how trustworthy a parameter value is when
//! it is not typed in by the user: whether a safe default exists,
//! whether the file metadata reports it, or whether the user must be
//! asked. The policy derives the level per (file format, parameter)
//! from a persisted table plus a set of hard rules for parameters the
//! image metadata can never decide.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::params::ParamName;

/// Confidence level for a parameter value, ordered from weakest to
/// strongest requirement on the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    /// A safe built-in default exists.
    Default,
    /// The file metadata carries an estimate.
    Estimated,
    /// The file metadata reports the value.
    Reported,
    /// The user must be asked; no default is safe.
    Asked,
    /// The user must always provide the value explicitly.
    Provided,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::Default => "default",
            ConfidenceLevel::Estimated => "estimated",
            ConfidenceLevel::Reported => "reported",
            ConfidenceLevel::Asked => "asked",
            ConfidenceLevel::Provided => "provided",
        }
    }

    pub fn parse(s: &str) -> Option<ConfidenceLevel> {
        match s {
            "default" => Some(ConfidenceLevel::Default),
            "estimated" => Some(ConfidenceLevel::Estimated),
            "reported" => Some(ConfidenceLevel::Reported),
            "asked" => Some(ConfidenceLevel::Asked),
            "provided" => Some(ConfidenceLevel::Provided),
            _ => None,
        }
    }

    /// True when this level demands explicit user input.
    pub fn must_provide(&self) -> bool {
        matches!(self, ConfidenceLevel::Asked | ConfidenceLevel::Provided)
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters the user must always provide: file metadata cannot
/// override the deconvolution strategy or the channel layout.
const ALWAYS_PROVIDED: &[ParamName] = &[
    ParamName::ImageFileFormat,
    ParamName::NumberOfChannels,
    ParamName::PointSpreadFunction,
    ParamName::MicroscopeType,
    ParamName::CoverslipRelativePosition,
    ParamName::PerformAberrationCorrection,
    ParamName::AberrationCorrectionMode,
    ParamName::AdvancedCorrectionOptions,
    ParamName::Psf,
];

/// Parameters with a safe built-in default irrespective of the format.
const ALWAYS_DEFAULT: &[ParamName] = &[
    ParamName::Binning,
    ParamName::ObjectiveMagnification,
    ParamName::CMount,
    ParamName::TubeFactor,
    ParamName::AberrationCorrectionNecessary,
    ParamName::CcdCaptorSize,
    ParamName::PsfGenerationDepth,
];

/// Per-(file format, parameter) confidence lookup.
///
/// Read-only from the workflow's perspective. Lookups never fail:
/// hard rules first, then the policy rows, then `default`.
#[derive(Debug, Clone, Default)]
pub struct ConfidencePolicy {
    rows: HashMap<(String, ParamName), ConfidenceLevel>,
}

impl ConfidencePolicy {
    pub fn new(rows: HashMap<(String, ParamName), ConfidenceLevel>) -> ConfidencePolicy {
        ConfidencePolicy { rows }
    }

    /// Policy shipped with the system, used for fresh databases and in
    /// tests. Metadata-rich formats report the optical parameters;
    /// plain TIFF-like formats report nothing.
    pub fn built_in() -> ConfidencePolicy {
        let mut rows = HashMap::new();
        let rich_formats = ["dv", "ics", "ics2", "lif", "lsm", "czi", "nd2"];
        let reported = [
            ParamName::NumericalAperture,
            ParamName::ObjectiveType,
            ParamName::ExcitationWavelength,
            ParamName::EmissionWavelength,
            ParamName::CcdCaptorSizeX,
            ParamName::ZStepSize,
            ParamName::TimeInterval,
            ParamName::PinholeSize,
        ];
        for format in rich_formats {
            for name in reported {
                rows.insert((format.to_string(), name), ConfidenceLevel::Reported);
            }
        }
        // STED acquisition parameters are asked even for rich formats.
        for format in rich_formats {
            for name in [
                ParamName::StedDepletionMode,
                ParamName::StedWavelength,
                ParamName::StedSaturationFactor,
            ] {
                rows.insert((format.to_string(), name), ConfidenceLevel::Asked);
            }
        }
        ConfidencePolicy::new(rows)
    }

    /// Iterate over all explicit policy rows.
    pub fn rows(&self) -> impl Iterator<Item = (&str, ParamName, ConfidenceLevel)> {
        self.rows
            .iter()
            .map(|((f, p), l)| (f.as_str(), *p, *l))
    }

    /// Merge explicit rows over this policy, replacing duplicates.
    pub fn merge(&mut self, other: ConfidencePolicy) {
        self.rows.extend(other.rows);
    }

    /// Derive the confidence level for a parameter under a file
    /// format. An empty format is valid for format-independent
    /// parameters. Never fails; the fallback is `default`.
    pub fn level(&self, file_format: &str, name: ParamName) -> ConfidenceLevel {
        if ALWAYS_PROVIDED.contains(&name) {
            return ConfidenceLevel::Provided;
        }
        if ALWAYS_DEFAULT.contains(&name) {
            return ConfidenceLevel::Default;
        }
        // The wavelength pair shares one confidence: the weaker of the
        // two rows wins, so one unreported wavelength forces both to
        // be asked from the user together.
        if matches!(
            name,
            ParamName::ExcitationWavelength | ParamName::EmissionWavelength
        ) {
            let ex = self.row(file_format, ParamName::ExcitationWavelength);
            let em = self.row(file_format, ParamName::EmissionWavelength);
            return ex.min(em);
        }
        self.row(file_format, name)
    }

    fn row(&self, file_format: &str, name: ParamName) -> ConfidenceLevel {
        self.rows
            .get(&(file_format.to_string(), name))
            .copied()
            .unwrap_or(ConfidenceLevel::Default)
    }
}
