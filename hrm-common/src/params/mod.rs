//! Typed acquisition and restoration parameters
//!
//! Every parameter the wizard can collect is declared once in the
//! static catalog (see [`catalog`]): its wire name, validation domain,
//! default value and wizard group. Unknown parameter names are a
//! programming error and fail fast; there is no dynamic, stringly-typed
//! fallback path.
//!
//! A [`Parameter`] holds the raw posted representation of its value.
//! `set_*` never validates eagerly; [`Parameter::check`] validates the
//! stored value against the declared domain, records a human-readable
//! message and leaves the value in place so a form can be redisplayed.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::confidence::ConfidenceLevel;

pub mod catalog;
#[cfg(test)]
mod tests;

pub use catalog::{ParamDef, ParamDomain, ParamGroup};

/// Hard ceiling on the number of channels a setting can describe.
pub const MAX_CHANNELS: usize = 6;

/// Closed enumeration of all parameter identifiers.
///
/// Variant order is wizard page order; it drives the ordering of
/// parameter maps and of display summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParamName {
    // Image selection
    ImageFileFormat,
    NumberOfChannels,
    PointSpreadFunction,
    // Microscope
    MicroscopeType,
    NumericalAperture,
    ObjectiveType,
    SampleMedium,
    ExcitationWavelength,
    EmissionWavelength,
    // Capturing
    CcdCaptorSizeX,
    ZStepSize,
    TimeInterval,
    PinholeSize,
    PinholeSpacing,
    Binning,
    // Pixel size calculator
    CcdCaptorSize,
    ObjectiveMagnification,
    CMount,
    TubeFactor,
    // STED
    StedDepletionMode,
    StedWavelength,
    StedSaturationFactor,
    StedImmunity,
    Sted3D,
    // Measured PSF files
    Psf,
    // Aberration correction
    AberrationCorrectionNecessary,
    PerformAberrationCorrection,
    CoverslipRelativePosition,
    AberrationCorrectionMode,
    AdvancedCorrectionOptions,
    PsfGenerationDepth,
    // Restoration
    DeconvolutionAlgorithm,
    SignalNoiseRatio,
    BackgroundOffsetPercent,
    NumberOfIterations,
    QualityChangeStoppingCriterion,
    OutputFileFormat,
    MultiChannelOutput,
    ZStabilization,
    ChromaticAberration,
    // Analysis
    ColocAnalysis,
    ColocChannel,
    ColocCoefficient,
    ColocThreshold,
    ColocMap,
}

impl ParamName {
    /// All parameter identifiers, in catalog order.
    pub const ALL: [ParamName; 45] = [
        ParamName::ImageFileFormat,
        ParamName::NumberOfChannels,
        ParamName::PointSpreadFunction,
        ParamName::MicroscopeType,
        ParamName::NumericalAperture,
        ParamName::ObjectiveType,
        ParamName::SampleMedium,
        ParamName::ExcitationWavelength,
        ParamName::EmissionWavelength,
        ParamName::CcdCaptorSizeX,
        ParamName::ZStepSize,
        ParamName::TimeInterval,
        ParamName::PinholeSize,
        ParamName::PinholeSpacing,
        ParamName::Binning,
        ParamName::CcdCaptorSize,
        ParamName::ObjectiveMagnification,
        ParamName::CMount,
        ParamName::TubeFactor,
        ParamName::StedDepletionMode,
        ParamName::StedWavelength,
        ParamName::StedSaturationFactor,
        ParamName::StedImmunity,
        ParamName::Sted3D,
        ParamName::Psf,
        ParamName::AberrationCorrectionNecessary,
        ParamName::PerformAberrationCorrection,
        ParamName::CoverslipRelativePosition,
        ParamName::AberrationCorrectionMode,
        ParamName::AdvancedCorrectionOptions,
        ParamName::PsfGenerationDepth,
        ParamName::DeconvolutionAlgorithm,
        ParamName::SignalNoiseRatio,
        ParamName::BackgroundOffsetPercent,
        ParamName::NumberOfIterations,
        ParamName::QualityChangeStoppingCriterion,
        ParamName::OutputFileFormat,
        ParamName::MultiChannelOutput,
        ParamName::ZStabilization,
        ParamName::ChromaticAberration,
        ParamName::ColocAnalysis,
        ParamName::ColocChannel,
        ParamName::ColocCoefficient,
        ParamName::ColocThreshold,
        ParamName::ColocMap,
    ];

    /// Wire name, as posted by forms and stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamName::ImageFileFormat => "ImageFileFormat",
            ParamName::NumberOfChannels => "NumberOfChannels",
            ParamName::PointSpreadFunction => "PointSpreadFunction",
            ParamName::MicroscopeType => "MicroscopeType",
            ParamName::NumericalAperture => "NumericalAperture",
            ParamName::ObjectiveType => "ObjectiveType",
            ParamName::SampleMedium => "SampleMedium",
            ParamName::ExcitationWavelength => "ExcitationWavelength",
            ParamName::EmissionWavelength => "EmissionWavelength",
            ParamName::CcdCaptorSizeX => "CCDCaptorSizeX",
            ParamName::ZStepSize => "ZStepSize",
            ParamName::TimeInterval => "TimeInterval",
            ParamName::PinholeSize => "PinholeSize",
            ParamName::PinholeSpacing => "PinholeSpacing",
            ParamName::Binning => "Binning",
            ParamName::CcdCaptorSize => "CCDCaptorSize",
            ParamName::ObjectiveMagnification => "ObjectiveMagnification",
            ParamName::CMount => "CMount",
            ParamName::TubeFactor => "TubeFactor",
            ParamName::StedDepletionMode => "StedDepletionMode",
            ParamName::StedWavelength => "StedWavelength",
            ParamName::StedSaturationFactor => "StedSaturationFactor",
            ParamName::StedImmunity => "StedImmunity",
            ParamName::Sted3D => "Sted3D",
            ParamName::Psf => "PSF",
            ParamName::AberrationCorrectionNecessary => "AberrationCorrectionNecessary",
            ParamName::PerformAberrationCorrection => "PerformAberrationCorrection",
            ParamName::CoverslipRelativePosition => "CoverslipRelativePosition",
            ParamName::AberrationCorrectionMode => "AberrationCorrectionMode",
            ParamName::AdvancedCorrectionOptions => "AdvancedCorrectionOptions",
            ParamName::PsfGenerationDepth => "PSFGenerationDepth",
            ParamName::DeconvolutionAlgorithm => "DeconvolutionAlgorithm",
            ParamName::SignalNoiseRatio => "SignalNoiseRatio",
            ParamName::BackgroundOffsetPercent => "BackgroundOffsetPercent",
            ParamName::NumberOfIterations => "NumberOfIterations",
            ParamName::QualityChangeStoppingCriterion => "QualityChangeStoppingCriterion",
            ParamName::OutputFileFormat => "OutputFileFormat",
            ParamName::MultiChannelOutput => "MultiChannelOutput",
            ParamName::ZStabilization => "ZStabilization",
            ParamName::ChromaticAberration => "ChromaticAberration",
            ParamName::ColocAnalysis => "ColocAnalysis",
            ParamName::ColocChannel => "ColocChannel",
            ParamName::ColocCoefficient => "ColocCoefficient",
            ParamName::ColocThreshold => "ColocThreshold",
            ParamName::ColocMap => "ColocMap",
        }
    }

    /// Parse a wire name. Returns `None` for unknown names; callers
    /// that treat this as a hard error wrap it in
    /// [`crate::Error::UnknownParameter`].
    pub fn parse(name: &str) -> Option<ParamName> {
        ParamName::ALL.iter().copied().find(|p| p.as_str() == name)
    }

    /// Human-readable form of the camel-case wire name, e.g.
    /// `PointSpreadFunction` becomes `point spread function`.
    pub fn human_name(&self) -> String {
        let chars: Vec<char> = self.as_str().chars().collect();
        let mut out = String::new();
        for (i, &c) in chars.iter().enumerate() {
            if c.is_ascii_uppercase() {
                // Word boundary: after a lowercase letter, or at the end
                // of an acronym run (CCDCaptor splits before Captor).
                let prev_lower = i > 0 && chars[i - 1].is_ascii_lowercase();
                let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
                if i > 0 && (prev_lower || next_lower) {
                    out.push(' ');
                }
                out.push(c.to_ascii_lowercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl fmt::Display for ParamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ParamName {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ParamName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ParamName::parse(&s).ok_or_else(|| D::Error::custom(format!("unknown parameter: {}", s)))
    }
}

/// Raw stored representation of a parameter value.
///
/// Values keep the textual form they were posted in; interpretation
/// happens against the parameter's declared domain. Missing entries are
/// `None`, mirroring unfilled form fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum ParamValue {
    /// Single scalar field (numeric, choice, boolean, text).
    Scalar(Option<String>),
    /// One entry per channel, index 0..numberOfChannels-1.
    PerChannel(Vec<Option<String>>),
    /// Unordered multi-selection (e.g. colocalization coefficients).
    Multi(Vec<String>),
}

impl ParamValue {
    fn is_empty_entry(v: &Option<String>) -> bool {
        v.as_deref().map(str::trim).unwrap_or("").is_empty()
    }

    /// True when no value has been supplied at all.
    pub fn is_unset(&self) -> bool {
        match self {
            ParamValue::Scalar(v) => Self::is_empty_entry(v),
            ParamValue::PerChannel(vs) => vs.iter().all(Self::is_empty_entry),
            ParamValue::Multi(vs) => vs.is_empty(),
        }
    }
}

/// One named, typed configuration value with its confidence tag and
/// last validation message.
#[derive(Debug, Clone)]
pub struct Parameter {
    def: &'static ParamDef,
    value: ParamValue,
    channels: usize,
    confidence: ConfidenceLevel,
    message: String,
}

impl Parameter {
    /// Instantiate a parameter from the catalog, carrying its default
    /// value and a single channel.
    pub fn new(name: ParamName) -> Parameter {
        let def = catalog::def(name);
        Parameter {
            def,
            value: def.default_value(1),
            channels: 1,
            confidence: ConfidenceLevel::Default,
            message: String::new(),
        }
    }

    pub fn name(&self) -> ParamName {
        self.def.name
    }

    pub fn def(&self) -> &'static ParamDef {
        self.def
    }

    pub fn value(&self) -> &ParamValue {
        &self.value
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn confidence(&self) -> ConfidenceLevel {
        self.confidence
    }

    pub fn set_confidence(&mut self, level: ConfidenceLevel) {
        self.confidence = level;
    }

    /// True when the confidence level demands an explicit user-supplied
    /// value: there is no safe default and no metadata to fall back on.
    pub fn must_provide(&self) -> bool {
        self.confidence.must_provide()
    }

    pub fn is_set(&self) -> bool {
        !self.value.is_unset()
    }

    pub fn is_per_channel(&self) -> bool {
        matches!(self.value, ParamValue::PerChannel(_))
    }

    /// Number of channels this parameter currently describes.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Replace the stored value. No eager validation.
    pub fn set_value(&mut self, value: ParamValue) {
        self.value = value;
        // Keep the per-channel shape consistent with the channel count.
        if let ParamValue::PerChannel(ref mut vs) = self.value {
            vs.resize(self.channels, None);
        }
    }

    /// Store a scalar textual value. No eager validation.
    pub fn set_text(&mut self, v: &str) {
        match &mut self.value {
            ParamValue::Scalar(s) => *s = Some(v.to_string()),
            // A scalar post against a per-channel parameter fills
            // channel 0 only; the remaining channels stay untouched.
            ParamValue::PerChannel(vs) => {
                if let Some(first) = vs.first_mut() {
                    *first = Some(v.to_string());
                }
            }
            ParamValue::Multi(vs) => *vs = vec![v.to_string()],
        }
    }

    /// Store the value for one channel. Out-of-range indices are
    /// ignored; the form can never address channels beyond the count.
    pub fn set_channel_text(&mut self, index: usize, v: &str) {
        if let ParamValue::PerChannel(vs) = &mut self.value {
            if index < vs.len() {
                vs[index] = Some(v.to_string());
            }
        }
    }

    /// Store a multi-selection value. No eager validation.
    pub fn set_multi(&mut self, vs: Vec<String>) {
        self.value = ParamValue::Multi(vs);
    }

    /// Resize the per-channel value array to `n` entries, preserving
    /// entries below `n` and default-filling new indices. `n` is
    /// clamped to `1..=MAX_CHANNELS`.
    pub fn set_channels(&mut self, n: usize) {
        let n = n.clamp(1, MAX_CHANNELS);
        self.channels = n;
        if let ParamValue::PerChannel(vs) = &mut self.value {
            let fill = self.def.default.map(str::to_string);
            vs.resize_with(n, || fill.clone());
        }
    }

    /// Scalar value as text, if set.
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            ParamValue::Scalar(v) => v.as_deref().map(str::trim).filter(|s| !s.is_empty()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_str().and_then(|s| s.parse().ok())
    }

    pub fn as_usize(&self) -> Option<usize> {
        self.as_str().and_then(|s| s.parse().ok())
    }

    /// Boolean view; accepts the wire forms `true`/`false` and `1`/`0`.
    pub fn as_bool(&self) -> Option<bool> {
        match self.as_str() {
            Some("true") | Some("1") => Some(true),
            Some("false") | Some("0") => Some(false),
            _ => None,
        }
    }

    /// Per-channel textual entries, unset channels as `None`.
    pub fn channel_values(&self) -> &[Option<String>] {
        match &self.value {
            ParamValue::PerChannel(vs) => vs,
            _ => &[],
        }
    }

    pub fn channel_f64(&self, index: usize) -> Option<f64> {
        self.channel_values()
            .get(index)
            .and_then(|v| v.as_deref())
            .and_then(|s| s.trim().parse().ok())
    }

    pub fn channel_str(&self, index: usize) -> Option<&str> {
        self.channel_values()
            .get(index)
            .and_then(|v| v.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Multi-selection entries.
    pub fn multi_values(&self) -> &[String] {
        match &self.value {
            ParamValue::Multi(vs) => vs,
            _ => &[],
        }
    }

    /// Validate the stored value against the declared domain.
    ///
    /// Never panics and never raises: on failure the message is stored
    /// for retrieval via [`Parameter::message`] and the offending value
    /// stays in place so the form can be redisplayed.
    pub fn check(&mut self) -> bool {
        self.message.clear();

        // An entirely unset value only fails when the confidence level
        // requires the user to provide one.
        if self.value.is_unset() {
            if self.must_provide() {
                self.message = format!("Please provide a value for the {}!", self.human_name());
                return false;
            }
            return true;
        }

        let result = match &self.def.domain {
            ParamDomain::Numeric {
                min,
                max,
                min_included,
                max_included,
                integral,
            } => match self.as_str() {
                Some(s) => {
                    check_numeric(s, *min, *max, *min_included, *max_included, *integral)
                }
                None => Err("Scalar expected.".to_string()),
            },
            ParamDomain::Choice { values } => match self.as_str() {
                Some(s) => check_choice(s, values, self.def.name),
                None => Err("Scalar expected.".to_string()),
            },
            ParamDomain::Boolean => match self.as_str() {
                Some("true") | Some("false") | Some("1") | Some("0") => Ok(()),
                Some(s) => Err(format!("Bad value {} for {}.", s, self.def.name)),
                None => Err("Scalar expected.".to_string()),
            },
            ParamDomain::ChannelNumeric {
                min,
                max,
                min_included,
                max_included,
            } => self.check_channel_entries(|s| {
                check_numeric(s, *min, *max, *min_included, *max_included, false)
            }),
            ParamDomain::ChannelChoice { values } => {
                self.check_channel_entries(|s| check_choice(s, values, self.def.name))
            }
            ParamDomain::ChannelNumericOrKeyword { keywords } => {
                self.check_channel_entries(|s| {
                    if keywords.contains(&s) {
                        Ok(())
                    } else {
                        check_numeric(s, Some(0.0), None, true, true, false)
                    }
                })
            }
            ParamDomain::ChannelVector { components } => self.check_channel_entries(|s| {
                let parts: Vec<&str> = s.split(',').map(str::trim).collect();
                if parts.len() != *components {
                    return Err(format!(
                        "Expected {} comma-separated components per channel.",
                        components
                    ));
                }
                for p in parts {
                    check_numeric(p, None, None, true, true, false)?;
                }
                Ok(())
            }),
            ParamDomain::ChannelText => self.check_channel_entries(|_| Ok(())),
            ParamDomain::MultiChoice { values, min_select } => {
                let picked = self.multi_values();
                if picked.len() < *min_select {
                    Err(format!(
                        "Please select at least {} values for the {}!",
                        min_select,
                        self.human_name()
                    ))
                } else {
                    picked
                        .iter()
                        .try_for_each(|v| check_choice(v, values, self.def.name))
                }
            }
            ParamDomain::ChannelSelection { min_select } => {
                let picked = self.multi_values();
                if picked.len() < *min_select {
                    Err(format!(
                        "Please select at least {} channels for the {}!",
                        min_select,
                        self.human_name()
                    ))
                } else {
                    picked.iter().try_for_each(|v| {
                        match v.trim().parse::<usize>() {
                            Ok(i) if i < self.channels => Ok(()),
                            _ => Err(format!("Bad channel {} for {}.", v, self.def.name)),
                        }
                    })
                }
            }
        };

        match result {
            Ok(()) => true,
            Err(msg) => {
                self.message = msg;
                false
            }
        }
    }

    /// Shared per-channel completeness rule: either all channels carry
    /// a value or none do. A partially filled array always fails; a
    /// fully empty one was already handled by the caller.
    fn check_channel_entries<F>(&self, check_one: F) -> std::result::Result<(), String>
    where
        F: Fn(&str) -> std::result::Result<(), String>,
    {
        let vs = self.channel_values();
        let missing = vs.iter().any(ParamValue::is_empty_entry);
        if missing {
            if self.must_provide() {
                return Err("Some of the values are missing!".to_string());
            }
            return Err("You can omit typing values for this parameter. If you decide to \
                 provide them, though, you must provide them all."
                .to_string());
        }
        for v in vs.iter().flatten() {
            check_one(v.trim())?;
        }
        Ok(())
    }

    fn human_name(&self) -> String {
        self.def.name.human_name()
    }

    /// One line of the plain-text summary: padded human name, then the
    /// value or `*not set*`.
    pub fn display_line(&self) -> String {
        const PAD: usize = 38;
        let mut line = format!("{}:", self.human_name());
        while line.len() < PAD {
            line.push(' ');
        }
        if !self.is_set() {
            line.push_str("*not set*");
        } else {
            match &self.value {
                ParamValue::Scalar(v) => line.push_str(v.as_deref().unwrap_or("")),
                ParamValue::PerChannel(vs) => {
                    let joined: Vec<&str> =
                        vs.iter().map(|v| v.as_deref().unwrap_or("")).collect();
                    line.push_str(&joined.join(", "));
                }
                ParamValue::Multi(vs) => line.push_str(&vs.join(", ")),
            }
        }
        line.push('\n');
        line
    }
}

pub(crate) fn check_numeric(
    s: &str,
    min: Option<f64>,
    max: Option<f64>,
    min_included: bool,
    max_included: bool,
    integral: bool,
) -> std::result::Result<(), String> {
    let v: f64 = s
        .trim()
        .parse()
        .map_err(|_| "The value must be numeric.".to_string())?;
    if integral && v.fract() != 0.0 {
        return Err("The value must be an integer.".to_string());
    }
    if let Some(min) = min {
        if min_included && v < min {
            return Err(format!("The value must be >= {}.", min));
        }
        if !min_included && v <= min {
            return Err(format!("The value must be > {}.", min));
        }
    }
    if let Some(max) = max {
        if max_included && v > max {
            return Err(format!("The value must be <= {}.", max));
        }
        if !max_included && v >= max {
            return Err(format!("The value must be < {}.", max));
        }
    }
    Ok(())
}

pub(crate) fn check_choice(
    s: &str,
    values: &[&str],
    name: ParamName,
) -> std::result::Result<(), String> {
    if values.contains(&s) {
        Ok(())
    } else {
        Err(format!("Bad value {} for {}.", s, name))
    }
}

/// Posted form fields: wire name to one or more raw values.
///
/// Multi-selections post the same key repeatedly; per-channel fields
/// post channel-suffixed keys (`EmissionWavelength0`, ...).
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    fields: BTreeMap<String, Vec<String>>,
}

impl FieldMap {
    pub fn new() -> FieldMap {
        FieldMap::default()
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.fields
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }

    pub fn from_pairs<'a, I>(pairs: I) -> FieldMap
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut map = FieldMap::new();
        for (k, v) in pairs {
            map.insert(k, v);
        }
        map
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// First value for a key, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(|vs| vs.first())
            .map(String::as_str)
    }

    /// All values posted under a key.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.fields.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Channel-suffixed lookup: `key0`, `key1`, ...
    pub fn get_channel(&self, key: &str, index: usize) -> Option<&str> {
        self.get(&format!("{}{}", key, index))
    }

    /// True when the key was posted at all, even with an empty value.
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// True when any field for this parameter was posted, including
    /// channel-suffixed variants.
    pub fn mentions(&self, name: ParamName) -> bool {
        let key = name.as_str();
        self.contains(key)
            || (0..MAX_CHANNELS).any(|i| self.contains(&format!("{}{}", key, i)))
    }
}
