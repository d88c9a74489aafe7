//! Page-scoped validation of posted form data.
//!
//! Each wizard page owns a fixed subset of parameters. Its
//! `check_posted_*` method extracts the posted candidate values for
//! that subset, stores them unconditionally (so a failing form
//! redisplays what the user typed), then validates the stored values.
//! Failures accumulate into [`Setting::message`]; parameters that pass
//! keep their new values even when siblings on the same page fail.

use crate::params::catalog::{self, ParamDomain};
use crate::params::{check_choice, check_numeric, FieldMap, ParamName};

use super::{Setting, SettingKind};

/// Depletion mode value meaning "this channel is plain confocal".
const DEPLETION_OFF: &str = "off (confocal)";

impl Setting {
    /// Store posted values for one parameter, honoring its shape.
    /// Returns whether the form mentioned the parameter at all.
    fn collect_posted(&mut self, name: ParamName, posted: &FieldMap) -> bool {
        let key = name.as_str();
        let domain = &catalog::def(name).domain;
        match domain {
            ParamDomain::ChannelNumeric { .. }
            | ParamDomain::ChannelChoice { .. }
            | ParamDomain::ChannelNumericOrKeyword { .. }
            | ParamDomain::ChannelVector { .. }
            | ParamDomain::ChannelText => {
                let n = self.number_of_channels;
                let mut any = false;
                for i in 0..n {
                    if let Some(v) = posted.get_channel(key, i) {
                        let v = v.to_string();
                        self.param_mut(name).set_channel_text(i, &v);
                        any = true;
                    }
                }
                any
            }
            ParamDomain::MultiChoice { .. } | ParamDomain::ChannelSelection { .. } => {
                if posted.contains(key) {
                    let vs = posted.get_all(key).to_vec();
                    self.param_mut(name).set_multi(vs);
                    true
                } else {
                    false
                }
            }
            _ => match posted.get(key) {
                Some(v) => {
                    let v = v.to_string();
                    self.param_mut(name).set_text(&v);
                    true
                }
                None => false,
            },
        }
    }

    /// Collect and validate the posted members of a page subset.
    /// Parameters the form does not mention are left untouched and
    /// unjudged; completeness is enforced at save time, not per post.
    fn check_posted_group(&mut self, names: &[ParamName], posted: &FieldMap) -> Vec<String> {
        let mut errors = Vec::new();
        for &name in names {
            if !self.collect_posted(name, posted) {
                continue;
            }
            if !self.param_mut(name).check() {
                errors.push(self.param(name).message().to_string());
            }
        }
        errors
    }

    /// Store the accumulated outcome and report success.
    fn finish(&mut self, errors: Vec<String>) -> bool {
        self.message = errors.join(" ");
        errors.is_empty()
    }

    /// Validate a single stored channel entry against the parameter's
    /// domain. `None` when the entry is empty.
    fn check_channel_entry(
        &self,
        name: ParamName,
        index: usize,
    ) -> Option<std::result::Result<(), String>> {
        let s = self.param(name).channel_str(index)?;
        let result = match &catalog::def(name).domain {
            ParamDomain::ChannelNumeric {
                min,
                max,
                min_included,
                max_included,
            } => check_numeric(s, *min, *max, *min_included, *max_included, false),
            ParamDomain::ChannelChoice { values } => check_choice(s, values, name),
            ParamDomain::ChannelNumericOrKeyword { keywords } => {
                if keywords.contains(&s) {
                    Ok(())
                } else {
                    check_numeric(s, Some(0.0), None, true, true, false)
                }
            }
            _ => Ok(()),
        };
        Some(result)
    }

    /// Image page: file format, channel count, PSF mode.
    ///
    /// On success the posted channel count is propagated to every
    /// per-channel parameter of the setting.
    pub fn check_posted_image_parameters(&mut self, posted: &FieldMap) -> bool {
        debug_assert_eq!(self.kind, SettingKind::Image);
        if posted.is_empty() {
            self.message.clear();
            return false;
        }
        let errors = self.check_posted_group(
            &[
                ParamName::ImageFileFormat,
                ParamName::NumberOfChannels,
                ParamName::PointSpreadFunction,
            ],
            posted,
        );
        if errors.is_empty() {
            if let Some(n) = self.param(ParamName::NumberOfChannels).as_usize() {
                self.set_number_of_channels(n);
            }
        }
        self.finish(errors)
    }

    /// Microscopy page: optics and per-channel wavelengths, with a
    /// cross-check that the Stokes shift points the right way for the
    /// selected microscope type.
    pub fn check_posted_microscopy_parameters(&mut self, posted: &FieldMap) -> bool {
        debug_assert_eq!(self.kind, SettingKind::Image);
        if posted.is_empty() {
            self.message.clear();
            return false;
        }
        let mut errors = self.check_posted_group(
            &[
                ParamName::MicroscopeType,
                ParamName::NumericalAperture,
                ParamName::ObjectiveType,
                ParamName::SampleMedium,
                ParamName::ExcitationWavelength,
                ParamName::EmissionWavelength,
            ],
            posted,
        );
        if errors.is_empty() {
            let two_photon = self.is_two_photon();
            for i in 0..self.number_of_channels {
                let ex = self.param(ParamName::ExcitationWavelength).channel_f64(i);
                let em = self.param(ParamName::EmissionWavelength).channel_f64(i);
                if let (Some(ex), Some(em)) = (ex, em) {
                    if two_photon && ex <= em {
                        errors.push(format!(
                            "The excitation wavelength should be larger than the emission \
                             wavelength for channel {} with a two photon microscope.",
                            i
                        ));
                    }
                    if !two_photon && ex >= em {
                        errors.push(format!(
                            "The excitation wavelength should be smaller than the emission \
                             wavelength for channel {}.",
                            i
                        ));
                    }
                }
            }
        }
        self.finish(errors)
    }

    /// Capturing page: voxel geometry and, for confocal variants, the
    /// pinhole description. Non-applicable parameters are not part of
    /// the page subset and are ignored even if posted.
    pub fn check_posted_capturing_parameters(&mut self, posted: &FieldMap) -> bool {
        debug_assert_eq!(self.kind, SettingKind::Image);
        if posted.is_empty() {
            self.message.clear();
            return false;
        }
        let mut names = vec![
            ParamName::CcdCaptorSizeX,
            ParamName::ZStepSize,
            ParamName::TimeInterval,
        ];
        if self.has_pinhole() {
            names.push(ParamName::PinholeSize);
        }
        if self.microscope_type() == Some("multipoint confocal (spinning disk)") {
            names.push(ParamName::PinholeSpacing);
        }
        let errors = self.check_posted_group(&names, posted);
        self.finish(errors)
    }

    /// STED page: the depletion mode gates the per-channel
    /// requirements. A channel running in confocal mode needs no
    /// depletion wavelength, saturation factor or immunity fraction;
    /// every STED channel needs them all.
    pub fn check_posted_sted_parameters(&mut self, posted: &FieldMap) -> bool {
        debug_assert_eq!(self.kind, SettingKind::Image);
        if posted.is_empty() {
            self.message.clear();
            return false;
        }
        for name in [
            ParamName::StedDepletionMode,
            ParamName::StedWavelength,
            ParamName::StedSaturationFactor,
            ParamName::StedImmunity,
            ParamName::Sted3D,
        ] {
            self.collect_posted(name, posted);
        }

        let mut errors = Vec::new();
        let n = self.number_of_channels;

        let mut modes: Vec<Option<String>> = Vec::with_capacity(n);
        for i in 0..n {
            match self.check_channel_entry(ParamName::StedDepletionMode, i) {
                None => {
                    modes.push(None);
                    errors.push(format!(
                        "Please set the STED depletion mode for channel {}!",
                        i
                    ));
                }
                Some(Err(msg)) => {
                    modes.push(None);
                    errors.push(msg);
                }
                Some(Ok(())) => {
                    modes.push(
                        self.param(ParamName::StedDepletionMode)
                            .channel_str(i)
                            .map(str::to_string),
                    );
                }
            }
        }

        let mut per_sted_channel = vec![
            ParamName::StedWavelength,
            ParamName::StedSaturationFactor,
            ParamName::StedImmunity,
        ];
        if self.is_sted_3d() {
            per_sted_channel.push(ParamName::Sted3D);
        }
        for name in per_sted_channel {
            for (i, mode) in modes.iter().enumerate() {
                match mode.as_deref() {
                    Some(DEPLETION_OFF) | None => continue,
                    Some(_) => {}
                }
                match self.check_channel_entry(name, i) {
                    None => errors.push(format!(
                        "Please set the {} for channel {}!",
                        name.human_name(),
                        i
                    )),
                    Some(Err(msg)) => errors.push(format!(
                        "{}, channel {}: {}",
                        name.human_name(),
                        i,
                        msg
                    )),
                    Some(Ok(())) => {}
                }
            }
        }
        self.finish(errors)
    }

    /// PSF selection page: with a measured PSF every channel needs a
    /// distilled PSF file.
    pub fn check_posted_psf_parameters(&mut self, posted: &FieldMap) -> bool {
        debug_assert_eq!(self.kind, SettingKind::Image);
        if posted.is_empty() {
            self.message.clear();
            return false;
        }
        self.collect_posted(ParamName::Psf, posted);
        let mut errors = Vec::new();
        for i in 0..self.number_of_channels {
            if self.param(ParamName::Psf).channel_str(i).is_none() {
                errors.push(format!("Please select a PSF file for channel {}!", i));
            }
        }
        self.finish(errors)
    }

    /// Aberration correction page. Everything below the on/off switch
    /// only matters when correction is actually requested; the depth
    /// parameter only when the advanced mode asks for a slice-wise
    /// correction.
    pub fn check_posted_aberration_correction_parameters(&mut self, posted: &FieldMap) -> bool {
        debug_assert_eq!(self.kind, SettingKind::Image);
        if posted.is_empty() {
            self.message.clear();
            return false;
        }
        for name in [
            ParamName::PerformAberrationCorrection,
            ParamName::CoverslipRelativePosition,
            ParamName::AberrationCorrectionMode,
            ParamName::AdvancedCorrectionOptions,
            ParamName::PsfGenerationDepth,
        ] {
            self.collect_posted(name, posted);
        }

        let mut errors = Vec::new();
        if !self.param_mut(ParamName::PerformAberrationCorrection).check() {
            errors.push(
                self.param(ParamName::PerformAberrationCorrection)
                    .message()
                    .to_string(),
            );
            return self.finish(errors);
        }
        if self.param(ParamName::PerformAberrationCorrection).as_bool() != Some(true) {
            return self.finish(errors);
        }

        if !self.param(ParamName::CoverslipRelativePosition).is_set() {
            errors.push("Please indicate the relative position of the coverslip!".to_string());
        } else if !self.param_mut(ParamName::CoverslipRelativePosition).check() {
            errors.push(
                self.param(ParamName::CoverslipRelativePosition)
                    .message()
                    .to_string(),
            );
        }

        if !self.param(ParamName::AberrationCorrectionMode).is_set() {
            errors.push("Please indicate the correction mode!".to_string());
            return self.finish(errors);
        }
        if !self.param_mut(ParamName::AberrationCorrectionMode).check() {
            errors.push(
                self.param(ParamName::AberrationCorrectionMode)
                    .message()
                    .to_string(),
            );
            return self.finish(errors);
        }

        if self.param(ParamName::AberrationCorrectionMode).as_str() == Some("advanced") {
            if !self.param(ParamName::AdvancedCorrectionOptions).is_set() {
                errors.push("Please indicate the options for the advanced correction!".to_string());
            } else if !self.param_mut(ParamName::AdvancedCorrectionOptions).check() {
                errors.push(
                    self.param(ParamName::AdvancedCorrectionOptions)
                        .message()
                        .to_string(),
                );
            } else if self.param(ParamName::AdvancedCorrectionOptions).as_str() == Some("slice") {
                if !self.param(ParamName::PsfGenerationDepth).is_set() {
                    errors.push("Please provide a depth for the PSF generation!".to_string());
                } else if !self.param_mut(ParamName::PsfGenerationDepth).check() {
                    errors.push(
                        self.param(ParamName::PsfGenerationDepth).message().to_string(),
                    );
                }
            }
        }
        self.finish(errors)
    }

    /// Pixel size calculator: all five inputs are required, and on
    /// success the computed lateral pixel size is written into the
    /// voxel-size parameter and validated in its stead.
    pub fn check_posted_calculate_pixel_size_parameters(&mut self, posted: &FieldMap) -> bool {
        debug_assert_eq!(self.kind, SettingKind::Image);
        if posted.is_empty() {
            self.message.clear();
            return false;
        }
        const INPUTS: [ParamName; 5] = [
            ParamName::CcdCaptorSize,
            ParamName::Binning,
            ParamName::ObjectiveMagnification,
            ParamName::CMount,
            ParamName::TubeFactor,
        ];
        let mut errors = Vec::new();
        for name in INPUTS {
            self.collect_posted(name, posted);
            if !self.param(name).is_set() {
                errors.push(format!("Please set the {}!", name.human_name()));
            } else if !self.param_mut(name).check() {
                errors.push(self.param(name).message().to_string());
            }
        }
        if !errors.is_empty() {
            return self.finish(errors);
        }

        // pixel size = captor element size * binning
        //            / (magnification * c-mount * tube factor)
        let ccd = self.param(ParamName::CcdCaptorSize).as_f64();
        let binning = self.param(ParamName::Binning).as_f64();
        let magnification = self.param(ParamName::ObjectiveMagnification).as_f64();
        let c_mount = self.param(ParamName::CMount).as_f64();
        let tube = self.param(ParamName::TubeFactor).as_f64();
        match (ccd, binning, magnification, c_mount, tube) {
            (Some(ccd), Some(binning), Some(magnification), Some(c_mount), Some(tube)) => {
                let pixel_size = (ccd * binning) / (magnification * c_mount * tube);
                let text = if pixel_size.fract() == 0.0 {
                    format!("{}", pixel_size as i64)
                } else {
                    format!("{}", pixel_size)
                };
                self.param_mut(ParamName::CcdCaptorSizeX).set_text(&text);
                if !self.param_mut(ParamName::CcdCaptorSizeX).check() {
                    errors.push(self.param(ParamName::CcdCaptorSizeX).message().to_string());
                }
            }
            _ => errors.push("The pixel size could not be calculated.".to_string()),
        }
        self.finish(errors)
    }

    /// Restoration page. The signal-to-noise ratio only applies to
    /// channels deconvolved with an algorithm that uses it.
    pub fn check_posted_restoration_parameters(&mut self, posted: &FieldMap) -> bool {
        debug_assert_eq!(self.kind, SettingKind::Restoration);
        if posted.is_empty() {
            self.message.clear();
            return false;
        }
        for name in [
            ParamName::DeconvolutionAlgorithm,
            ParamName::SignalNoiseRatio,
            ParamName::BackgroundOffsetPercent,
        ] {
            self.collect_posted(name, posted);
        }
        let mut errors = self.check_posted_group(
            &[
                ParamName::NumberOfIterations,
                ParamName::QualityChangeStoppingCriterion,
                ParamName::OutputFileFormat,
                ParamName::MultiChannelOutput,
                ParamName::ZStabilization,
                ParamName::ChromaticAberration,
            ],
            posted,
        );

        let n = self.number_of_channels;
        let mut algorithms: Vec<Option<String>> = Vec::with_capacity(n);
        for i in 0..n {
            match self.check_channel_entry(ParamName::DeconvolutionAlgorithm, i) {
                None => {
                    algorithms.push(None);
                    errors.push(format!(
                        "Please select a deconvolution algorithm for channel {}!",
                        i
                    ));
                }
                Some(Err(msg)) => {
                    algorithms.push(None);
                    errors.push(msg);
                }
                Some(Ok(())) => algorithms.push(
                    self.param(ParamName::DeconvolutionAlgorithm)
                        .channel_str(i)
                        .map(str::to_string),
                ),
            }
        }
        for (i, algorithm) in algorithms.iter().enumerate() {
            // qmle estimates its own noise model; skipped channels need
            // no restoration parameters at all.
            let needs_snr = matches!(algorithm.as_deref(), Some("cmle") | Some("gmle"));
            match self.check_channel_entry(ParamName::SignalNoiseRatio, i) {
                None if needs_snr => errors.push(format!(
                    "Please set the signal to noise ratio for channel {}!",
                    i
                )),
                Some(Err(msg)) if needs_snr => {
                    errors.push(format!("Signal to noise ratio, channel {}: {}", i, msg))
                }
                _ => {}
            }
            match self.check_channel_entry(ParamName::BackgroundOffsetPercent, i) {
                Some(Err(msg)) => {
                    errors.push(format!("Background estimation, channel {}: {}", i, msg))
                }
                _ => {}
            }
        }
        self.finish(errors)
    }

    /// Analysis page. Everything is gated on the colocalization
    /// switch; with the switch off an empty page is a valid page.
    pub fn check_posted_analysis_parameters(&mut self, posted: &FieldMap) -> bool {
        debug_assert_eq!(self.kind, SettingKind::Analysis);
        if posted.is_empty() {
            self.message.clear();
            return false;
        }
        for name in [
            ParamName::ColocAnalysis,
            ParamName::ColocChannel,
            ParamName::ColocCoefficient,
            ParamName::ColocThreshold,
            ParamName::ColocMap,
        ] {
            self.collect_posted(name, posted);
        }

        let mut errors = Vec::new();
        if !self.param_mut(ParamName::ColocAnalysis).check() {
            errors.push(self.param(ParamName::ColocAnalysis).message().to_string());
            return self.finish(errors);
        }
        if self.param(ParamName::ColocAnalysis).as_bool() != Some(true) {
            return self.finish(errors);
        }

        if !self.param(ParamName::ColocChannel).is_set() {
            errors.push(
                "Please indicate the channels (at least two) for colocalization analysis."
                    .to_string(),
            );
        } else if !self.param_mut(ParamName::ColocChannel).check() {
            errors.push(self.param(ParamName::ColocChannel).message().to_string());
        }

        if !self.param(ParamName::ColocCoefficient).is_set() {
            errors.push("Please indicate the colocalization coefficients to calculate.".to_string());
        } else if !self.param_mut(ParamName::ColocCoefficient).check() {
            errors.push(self.param(ParamName::ColocCoefficient).message().to_string());
        }

        match posted.get("ColocThresholdMode") {
            Some("auto") => {
                let n = self.number_of_channels;
                for i in 0..n {
                    self.param_mut(ParamName::ColocThreshold)
                        .set_channel_text(i, "auto");
                }
            }
            _ => {
                // Manual thresholds: one value per channel.
                for i in 0..self.number_of_channels {
                    match self.check_channel_entry(ParamName::ColocThreshold, i) {
                        None => errors.push(format!(
                            "Please provide a threshold value for channel {}!",
                            i
                        )),
                        Some(Err(msg)) => {
                            errors.push(format!("Threshold, channel {}: {}", i, msg))
                        }
                        Some(Ok(())) => {}
                    }
                }
            }
        }

        if self.param(ParamName::ColocMap).is_set()
            && !self.param_mut(ParamName::ColocMap).check()
        {
            errors.push(self.param(ParamName::ColocMap).message().to_string());
        }
        self.finish(errors)
    }

    /// Whole-setting completeness check, run before a setting is used
    /// or offered for selection. Unlike the page checks, this enforces
    /// presence of every relevant parameter whose confidence level
    /// demands a user-provided value.
    pub fn check_setting(&mut self) -> bool {
        let mut missing = Vec::new();
        let mut errors = Vec::new();
        let names: Vec<ParamName> = self
            .parameter_names()
            .filter(|&n| self.relevant(n))
            .collect();
        for name in names {
            // Parameters whose channels are individually gated by a
            // sibling cannot use the all-or-none channel rule: a
            // confocal channel of a STED stack carries no depletion
            // values, a skipped channel no restoration values.
            if let Some(required) = self.channel_gate(name) {
                for (i, required) in required.into_iter().enumerate() {
                    match self.check_channel_entry(name, i) {
                        None if required => errors.push(format!(
                            "Please set the {} for channel {}!",
                            name.human_name(),
                            i
                        )),
                        Some(Err(msg)) => errors.push(format!(
                            "{}, channel {}: {}",
                            name.human_name(),
                            i,
                            msg
                        )),
                        _ => {}
                    }
                }
                continue;
            }
            let parameter = self.param_mut(name);
            if !parameter.is_set() {
                if parameter.must_provide() {
                    missing.push(name.human_name());
                }
                continue;
            }
            if !parameter.check() {
                let msg = parameter.message().to_string();
                errors.push(format!("{}: {}", name.human_name(), msg));
            }
        }
        if !missing.is_empty() {
            let format = self
                .parameters
                .get(&ParamName::ImageFileFormat)
                .and_then(|p| p.as_str())
                .unwrap_or("selected")
                .to_string();
            errors.insert(
                0,
                format!(
                    "The setting contains empty values which the {} file format misses in \
                     its metadata. Please provide: {}.",
                    format,
                    missing.join(", ")
                ),
            );
        }
        self.message = errors.join(" ");
        errors.is_empty()
    }

    /// Per-channel requirement mask for parameters whose channels are
    /// gated by another parameter's value on the same channel; `None`
    /// for everything else.
    fn channel_gate(&self, name: ParamName) -> Option<Vec<bool>> {
        let n = self.number_of_channels;
        let depleted = |i: usize| {
            self.param(ParamName::StedDepletionMode)
                .channel_str(i)
                .is_some_and(|mode| mode != DEPLETION_OFF)
        };
        match name {
            ParamName::StedWavelength
            | ParamName::StedSaturationFactor
            | ParamName::StedImmunity => Some((0..n).map(depleted).collect()),
            ParamName::Sted3D => {
                let z = self.is_sted_3d();
                Some((0..n).map(|i| z && depleted(i)).collect())
            }
            ParamName::SignalNoiseRatio => Some(
                (0..n)
                    .map(|i| {
                        matches!(
                            self.param(ParamName::DeconvolutionAlgorithm).channel_str(i),
                            Some("cmle") | Some("gmle")
                        )
                    })
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Whether a parameter matters for the current state of the
    /// setting. Irrelevant parameters are neither displayed nor
    /// required.
    fn relevant(&self, name: ParamName) -> bool {
        use crate::params::catalog::ParamGroup;
        match catalog::def(name).group {
            ParamGroup::PixelSizeCalculation => false,
            ParamGroup::Sted => self.is_sted(),
            ParamGroup::PsfFile => self.uses_measured_psf(),
            ParamGroup::Correction => {
                let necessary = self
                    .param(ParamName::AberrationCorrectionNecessary)
                    .as_bool()
                    .unwrap_or(false);
                let performed = necessary
                    && self
                        .param(ParamName::PerformAberrationCorrection)
                        .as_bool()
                        .unwrap_or(false);
                match name {
                    ParamName::AberrationCorrectionNecessary => true,
                    ParamName::PerformAberrationCorrection => necessary,
                    ParamName::CoverslipRelativePosition
                    | ParamName::AberrationCorrectionMode => performed,
                    ParamName::AdvancedCorrectionOptions => {
                        performed
                            && self.param(ParamName::AberrationCorrectionMode).as_str()
                                == Some("advanced")
                    }
                    ParamName::PsfGenerationDepth => {
                        performed
                            && self.param(ParamName::AdvancedCorrectionOptions).as_str()
                                == Some("slice")
                    }
                    _ => necessary,
                }
            }
            ParamGroup::Capturing => match name {
                ParamName::PinholeSize => self.has_pinhole(),
                ParamName::PinholeSpacing => {
                    self.microscope_type() == Some("multipoint confocal (spinning disk)")
                }
                _ => true,
            },
            _ => true,
        }
    }
}
