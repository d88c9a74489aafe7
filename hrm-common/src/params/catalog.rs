//! Parameter catalog: the single source of truth for every
//! parameter's wire name, validation domain, default value and wizard
//! group. Validation rules live here once instead of being repeated at
//! every call site.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::{ParamName, ParamValue};

/// Wizard group a parameter belongs to. Groups partition the parameter
/// space across wizard pages; setting kinds own disjoint group sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamGroup {
    Image,
    Microscope,
    Capturing,
    PixelSizeCalculation,
    Sted,
    PsfFile,
    Correction,
    Restoration,
    Analysis,
}

/// Validation domain for one parameter.
#[derive(Debug, Clone)]
pub enum ParamDomain {
    /// Scalar number with optional open/closed bounds.
    Numeric {
        min: Option<f64>,
        max: Option<f64>,
        min_included: bool,
        max_included: bool,
        integral: bool,
    },
    /// Scalar value from a fixed list.
    Choice { values: &'static [&'static str] },
    /// `true`/`false` (also accepts `1`/`0` on the wire).
    Boolean,
    /// One number per channel.
    ChannelNumeric {
        min: Option<f64>,
        max: Option<f64>,
        min_included: bool,
        max_included: bool,
    },
    /// One fixed-list value per channel.
    ChannelChoice { values: &'static [&'static str] },
    /// Per channel: either a keyword or a non-negative number.
    ChannelNumericOrKeyword { keywords: &'static [&'static str] },
    /// Per channel: comma-separated numeric vector of fixed arity.
    ChannelVector { components: usize },
    /// Free text per channel (e.g. a measured PSF file per channel).
    ChannelText,
    /// Unordered multi-selection from a fixed list.
    MultiChoice {
        values: &'static [&'static str],
        min_select: usize,
    },
    /// Multi-selection of channel indices.
    ChannelSelection { min_select: usize },
}

/// Catalog row for one parameter.
#[derive(Debug)]
pub struct ParamDef {
    pub name: ParamName,
    pub group: ParamGroup,
    pub domain: ParamDomain,
    /// Default textual value, or `None` when there is no safe default.
    pub default: Option<&'static str>,
}

impl ParamDef {
    /// Build the initial value for this parameter at the given channel
    /// count, shaped to match the domain.
    pub fn default_value(&self, channels: usize) -> ParamValue {
        let fill = self.default.map(str::to_string);
        match self.domain {
            ParamDomain::ChannelNumeric { .. }
            | ParamDomain::ChannelChoice { .. }
            | ParamDomain::ChannelNumericOrKeyword { .. }
            | ParamDomain::ChannelVector { .. }
            | ParamDomain::ChannelText => {
                ParamValue::PerChannel(vec![fill; channels.max(1)])
            }
            ParamDomain::MultiChoice { .. } | ParamDomain::ChannelSelection { .. } => {
                ParamValue::Multi(Vec::new())
            }
            _ => ParamValue::Scalar(fill),
        }
    }
}

pub const IMAGE_FILE_FORMATS: &[&str] = &[
    "dv", "ics", "ics2", "lif", "lsm", "czi", "nd2", "ome-tiff", "stk", "tiff",
];

pub const MICROSCOPE_TYPES: &[&str] = &[
    "widefield",
    "multipoint confocal (spinning disk)",
    "nipkow disk confocal",
    "single point confocal",
    "two photon",
    "STED",
    "STED 3D",
];

pub const OBJECTIVE_TYPES: &[&str] = &["oil", "water", "glycerol", "air"];

pub const SAMPLE_MEDIA: &[&str] = &[
    "water / buffer",
    "liquid vectashield",
    "90% glycerol",
    "fructose",
];

pub const STED_DEPLETION_MODES: &[&str] = &[
    "off (confocal)",
    "pulsed",
    "cw gated detection",
    "cw non gated detection",
];

pub const DECONVOLUTION_ALGORITHMS: &[&str] = &["cmle", "qmle", "gmle", "skip"];

pub const OUTPUT_FILE_FORMATS: &[&str] = &["ics", "ics2", "hdf5", "r3d", "tiff 16-bit"];

pub const COLOC_COEFFICIENTS: &[&str] =
    &["pearson", "spearman", "manders", "k1", "k2", "m1", "m2"];

/// Full parameter catalog, in wizard page order.
static CATALOG: &[ParamDef] = &[
    // ---- Image selection ------------------------------------------------
    ParamDef {
        name: ParamName::ImageFileFormat,
        group: ParamGroup::Image,
        domain: ParamDomain::Choice {
            values: IMAGE_FILE_FORMATS,
        },
        default: None,
    },
    ParamDef {
        name: ParamName::NumberOfChannels,
        group: ParamGroup::Image,
        domain: ParamDomain::Numeric {
            min: Some(1.0),
            max: Some(super::MAX_CHANNELS as f64),
            min_included: true,
            max_included: true,
            integral: true,
        },
        default: None,
    },
    ParamDef {
        name: ParamName::PointSpreadFunction,
        group: ParamGroup::Image,
        domain: ParamDomain::Choice {
            values: &["theoretical", "measured"],
        },
        default: None,
    },
    // ---- Microscope -----------------------------------------------------
    ParamDef {
        name: ParamName::MicroscopeType,
        group: ParamGroup::Microscope,
        domain: ParamDomain::Choice {
            values: MICROSCOPE_TYPES,
        },
        default: None,
    },
    ParamDef {
        name: ParamName::NumericalAperture,
        group: ParamGroup::Microscope,
        domain: ParamDomain::Numeric {
            min: Some(0.2),
            max: Some(1.7),
            min_included: true,
            max_included: true,
            integral: false,
        },
        default: None,
    },
    ParamDef {
        name: ParamName::ObjectiveType,
        group: ParamGroup::Microscope,
        domain: ParamDomain::Choice {
            values: OBJECTIVE_TYPES,
        },
        default: None,
    },
    ParamDef {
        name: ParamName::SampleMedium,
        group: ParamGroup::Microscope,
        domain: ParamDomain::Choice {
            values: SAMPLE_MEDIA,
        },
        default: None,
    },
    ParamDef {
        name: ParamName::ExcitationWavelength,
        group: ParamGroup::Microscope,
        domain: ParamDomain::ChannelNumeric {
            min: Some(200.0),
            max: Some(1500.0),
            min_included: true,
            max_included: true,
        },
        default: None,
    },
    ParamDef {
        name: ParamName::EmissionWavelength,
        group: ParamGroup::Microscope,
        domain: ParamDomain::ChannelNumeric {
            min: Some(200.0),
            max: Some(1500.0),
            min_included: true,
            max_included: true,
        },
        default: None,
    },
    // ---- Capturing ------------------------------------------------------
    ParamDef {
        // Pixel size in the image plane, nm.
        name: ParamName::CcdCaptorSizeX,
        group: ParamGroup::Capturing,
        domain: ParamDomain::Numeric {
            min: Some(0.0),
            max: Some(100_000.0),
            min_included: false,
            max_included: true,
            integral: false,
        },
        default: None,
    },
    ParamDef {
        name: ParamName::ZStepSize,
        group: ParamGroup::Capturing,
        domain: ParamDomain::Numeric {
            min: Some(0.0),
            max: None,
            min_included: true,
            max_included: true,
            integral: false,
        },
        default: Some("0"),
    },
    ParamDef {
        name: ParamName::TimeInterval,
        group: ParamGroup::Capturing,
        domain: ParamDomain::Numeric {
            min: Some(0.0),
            max: None,
            min_included: true,
            max_included: true,
            integral: false,
        },
        default: Some("0"),
    },
    ParamDef {
        name: ParamName::PinholeSize,
        group: ParamGroup::Capturing,
        domain: ParamDomain::ChannelNumeric {
            min: Some(0.0),
            max: None,
            min_included: false,
            max_included: true,
        },
        default: None,
    },
    ParamDef {
        name: ParamName::PinholeSpacing,
        group: ParamGroup::Capturing,
        domain: ParamDomain::Numeric {
            min: Some(0.0),
            max: None,
            min_included: false,
            max_included: true,
            integral: false,
        },
        default: None,
    },
    ParamDef {
        name: ParamName::Binning,
        group: ParamGroup::Capturing,
        domain: ParamDomain::Choice {
            values: &["1", "2", "4", "8", "16"],
        },
        default: Some("1"),
    },
    // ---- Pixel size calculator ------------------------------------------
    ParamDef {
        // Physical CCD pixel size, nm.
        name: ParamName::CcdCaptorSize,
        group: ParamGroup::PixelSizeCalculation,
        domain: ParamDomain::Numeric {
            min: Some(0.0),
            max: Some(100_000.0),
            min_included: false,
            max_included: true,
            integral: false,
        },
        default: None,
    },
    ParamDef {
        name: ParamName::ObjectiveMagnification,
        group: ParamGroup::PixelSizeCalculation,
        domain: ParamDomain::Choice {
            values: &["10", "20", "25", "32", "40", "63", "100"],
        },
        default: None,
    },
    ParamDef {
        name: ParamName::CMount,
        group: ParamGroup::PixelSizeCalculation,
        domain: ParamDomain::Numeric {
            min: Some(0.4),
            max: Some(1.0),
            min_included: true,
            max_included: true,
            integral: false,
        },
        default: Some("1.0"),
    },
    ParamDef {
        name: ParamName::TubeFactor,
        group: ParamGroup::PixelSizeCalculation,
        domain: ParamDomain::Numeric {
            min: Some(1.0),
            max: Some(2.0),
            min_included: true,
            max_included: true,
            integral: false,
        },
        default: Some("1.0"),
    },
    // ---- STED -----------------------------------------------------------
    ParamDef {
        name: ParamName::StedDepletionMode,
        group: ParamGroup::Sted,
        domain: ParamDomain::ChannelChoice {
            values: STED_DEPLETION_MODES,
        },
        default: Some("off (confocal)"),
    },
    ParamDef {
        name: ParamName::StedWavelength,
        group: ParamGroup::Sted,
        domain: ParamDomain::ChannelNumeric {
            min: Some(400.0),
            max: Some(900.0),
            min_included: true,
            max_included: true,
        },
        default: None,
    },
    ParamDef {
        name: ParamName::StedSaturationFactor,
        group: ParamGroup::Sted,
        domain: ParamDomain::ChannelNumeric {
            min: Some(0.0),
            max: None,
            min_included: true,
            max_included: true,
        },
        default: None,
    },
    ParamDef {
        // Percentage of the dye immune to depletion.
        name: ParamName::StedImmunity,
        group: ParamGroup::Sted,
        domain: ParamDomain::ChannelNumeric {
            min: Some(0.0),
            max: Some(100.0),
            min_included: true,
            max_included: true,
        },
        default: None,
    },
    ParamDef {
        // Percentage of the depletion applied along z.
        name: ParamName::Sted3D,
        group: ParamGroup::Sted,
        domain: ParamDomain::ChannelNumeric {
            min: Some(0.0),
            max: Some(100.0),
            min_included: true,
            max_included: true,
        },
        default: None,
    },
    // ---- Measured PSF ---------------------------------------------------
    ParamDef {
        name: ParamName::Psf,
        group: ParamGroup::PsfFile,
        domain: ParamDomain::ChannelText,
        default: None,
    },
    // ---- Aberration correction ------------------------------------------
    ParamDef {
        name: ParamName::AberrationCorrectionNecessary,
        group: ParamGroup::Correction,
        domain: ParamDomain::Boolean,
        default: Some("0"),
    },
    ParamDef {
        name: ParamName::PerformAberrationCorrection,
        group: ParamGroup::Correction,
        domain: ParamDomain::Boolean,
        default: Some("0"),
    },
    ParamDef {
        name: ParamName::CoverslipRelativePosition,
        group: ParamGroup::Correction,
        domain: ParamDomain::Choice {
            values: &["closest", "farthest", "center"],
        },
        default: None,
    },
    ParamDef {
        name: ParamName::AberrationCorrectionMode,
        group: ParamGroup::Correction,
        domain: ParamDomain::Choice {
            values: &["automatic", "advanced"],
        },
        default: None,
    },
    ParamDef {
        name: ParamName::AdvancedCorrectionOptions,
        group: ParamGroup::Correction,
        domain: ParamDomain::Choice {
            values: &["user", "slice", "few"],
        },
        default: None,
    },
    ParamDef {
        name: ParamName::PsfGenerationDepth,
        group: ParamGroup::Correction,
        domain: ParamDomain::Numeric {
            min: Some(0.0),
            max: None,
            min_included: true,
            max_included: true,
            integral: false,
        },
        default: Some("0"),
    },
    // ---- Restoration ----------------------------------------------------
    ParamDef {
        name: ParamName::DeconvolutionAlgorithm,
        group: ParamGroup::Restoration,
        domain: ParamDomain::ChannelChoice {
            values: DECONVOLUTION_ALGORITHMS,
        },
        default: Some("cmle"),
    },
    ParamDef {
        name: ParamName::SignalNoiseRatio,
        group: ParamGroup::Restoration,
        domain: ParamDomain::ChannelNumeric {
            min: Some(0.0),
            max: None,
            min_included: false,
            max_included: true,
        },
        default: None,
    },
    ParamDef {
        name: ParamName::BackgroundOffsetPercent,
        group: ParamGroup::Restoration,
        domain: ParamDomain::ChannelNumericOrKeyword {
            keywords: &["auto", "object"],
        },
        default: Some("auto"),
    },
    ParamDef {
        name: ParamName::NumberOfIterations,
        group: ParamGroup::Restoration,
        domain: ParamDomain::Numeric {
            min: Some(1.0),
            max: Some(1000.0),
            min_included: true,
            max_included: true,
            integral: true,
        },
        default: Some("40"),
    },
    ParamDef {
        name: ParamName::QualityChangeStoppingCriterion,
        group: ParamGroup::Restoration,
        domain: ParamDomain::Numeric {
            min: Some(0.0),
            max: None,
            min_included: true,
            max_included: true,
            integral: false,
        },
        default: Some("0.1"),
    },
    ParamDef {
        name: ParamName::OutputFileFormat,
        group: ParamGroup::Restoration,
        domain: ParamDomain::Choice {
            values: OUTPUT_FILE_FORMATS,
        },
        default: Some("ics"),
    },
    ParamDef {
        name: ParamName::MultiChannelOutput,
        group: ParamGroup::Restoration,
        domain: ParamDomain::Boolean,
        default: Some("true"),
    },
    ParamDef {
        name: ParamName::ZStabilization,
        group: ParamGroup::Restoration,
        domain: ParamDomain::Boolean,
        default: Some("0"),
    },
    ParamDef {
        // Per channel: shift x, shift y, shift z, rotation, scale.
        name: ParamName::ChromaticAberration,
        group: ParamGroup::Restoration,
        domain: ParamDomain::ChannelVector { components: 5 },
        default: None,
    },
    // ---- Analysis -------------------------------------------------------
    ParamDef {
        name: ParamName::ColocAnalysis,
        group: ParamGroup::Analysis,
        domain: ParamDomain::Boolean,
        default: Some("0"),
    },
    ParamDef {
        name: ParamName::ColocChannel,
        group: ParamGroup::Analysis,
        domain: ParamDomain::ChannelSelection { min_select: 2 },
        default: None,
    },
    ParamDef {
        name: ParamName::ColocCoefficient,
        group: ParamGroup::Analysis,
        domain: ParamDomain::MultiChoice {
            values: COLOC_COEFFICIENTS,
            min_select: 1,
        },
        default: None,
    },
    ParamDef {
        name: ParamName::ColocThreshold,
        group: ParamGroup::Analysis,
        domain: ParamDomain::ChannelNumericOrKeyword { keywords: &["auto"] },
        default: None,
    },
    ParamDef {
        name: ParamName::ColocMap,
        group: ParamGroup::Analysis,
        domain: ParamDomain::Choice {
            values: &["none", "pearson", "spearman"],
        },
        default: Some("none"),
    },
];

static CATALOG_INDEX: Lazy<HashMap<ParamName, &'static ParamDef>> =
    Lazy::new(|| CATALOG.iter().map(|d| (d.name, d)).collect());

/// Catalog row for a parameter name.
pub fn def(name: ParamName) -> &'static ParamDef {
    CATALOG_INDEX
        .get(&name)
        .expect("parameter catalog covers every ParamName")
}

/// All parameters in a wizard group, in catalog order.
pub fn group_members(group: ParamGroup) -> impl Iterator<Item = ParamName> {
    CATALOG
        .iter()
        .filter(move |d| d.group == group)
        .map(|d| d.name)
}

/// Refractive index for the lens immersion media and sample embedding
/// media choices; `None` when the choice carries no known index.
pub fn refractive_index(name: ParamName, value: &str) -> Option<f64> {
    match name {
        ParamName::ObjectiveType => match value {
            "oil" => Some(1.515),
            "water" => Some(1.3381),
            "glycerol" => Some(1.4729),
            "air" => Some(1.0),
            _ => None,
        },
        ParamName::SampleMedium => match value {
            "water / buffer" => Some(1.339),
            "liquid vectashield" => Some(1.4548),
            "90% glycerol" => Some(1.4575),
            "fructose" => Some(1.486),
            _ => None,
        },
        _ => None,
    }
}
