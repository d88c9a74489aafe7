//! Wizard page sequencing.
//!
//! A wizard walks one setting through its pages. Every form submission
//! funnels through [`submit`], which validates the posted data against
//! the page's parameter subset and returns an explicit [`NextStep`]:
//! redisplay the same page with an error message, advance to a named
//! page, or finish. Branching after the optics pages depends on the
//! PSF mode and on how well the sample medium matches the lens
//! immersion medium.

use serde::{Deserialize, Serialize};

use crate::params::{FieldMap, ParamName};
use crate::setting::{Setting, SettingKind};

/// Relative refractive-index mismatch below which spherical
/// aberration correction brings no visible benefit.
const ABERRATION_DEVIATION_THRESHOLD: f64 = 0.01;

/// The pages a wizard can show, across all three setting kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardPage {
    ImageFormat,
    MicroscopeParameters,
    CapturingParameters,
    CalculatePixelSize,
    StedParameters,
    SelectPsf,
    AberrationCorrection,
    RestorationParameters,
    AnalysisParameters,
}

impl WizardPage {
    pub fn slug(&self) -> &'static str {
        match self {
            WizardPage::ImageFormat => "image_format",
            WizardPage::MicroscopeParameters => "microscope_parameters",
            WizardPage::CapturingParameters => "capturing_parameters",
            WizardPage::CalculatePixelSize => "calculate_pixel_size",
            WizardPage::StedParameters => "sted_parameters",
            WizardPage::SelectPsf => "select_psf",
            WizardPage::AberrationCorrection => "aberration_correction",
            WizardPage::RestorationParameters => "restoration_parameters",
            WizardPage::AnalysisParameters => "analysis_parameters",
        }
    }

    pub fn parse(s: &str) -> Option<WizardPage> {
        Some(match s {
            "image_format" => WizardPage::ImageFormat,
            "microscope_parameters" => WizardPage::MicroscopeParameters,
            "capturing_parameters" => WizardPage::CapturingParameters,
            "calculate_pixel_size" => WizardPage::CalculatePixelSize,
            "sted_parameters" => WizardPage::StedParameters,
            "select_psf" => WizardPage::SelectPsf,
            "aberration_correction" => WizardPage::AberrationCorrection,
            "restoration_parameters" => WizardPage::RestorationParameters,
            "analysis_parameters" => WizardPage::AnalysisParameters,
            _ => return None,
        })
    }

    /// The setting kind this page edits.
    pub fn kind(&self) -> SettingKind {
        match self {
            WizardPage::RestorationParameters => SettingKind::Restoration,
            WizardPage::AnalysisParameters => SettingKind::Analysis,
            _ => SettingKind::Image,
        }
    }

    /// The page a fresh wizard of the given kind starts on.
    pub fn first(kind: SettingKind) -> WizardPage {
        match kind {
            SettingKind::Image => WizardPage::ImageFormat,
            SettingKind::Restoration => WizardPage::RestorationParameters,
            SettingKind::Analysis => WizardPage::AnalysisParameters,
        }
    }
}

impl std::fmt::Display for WizardPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// Outcome of one form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    /// Validation failed; show the same page again with this message.
    Redisplay(String),
    /// Validation passed; continue on the named page.
    Advance(WizardPage),
    /// Validation passed and the wizard is complete; the setting is
    /// ready to be persisted.
    Persisted,
}

/// Where a setting stands in its editing lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingPhase {
    /// Freshly created, nothing posted yet.
    Empty,
    /// At least one page submitted; may hold invalid values.
    Editing,
    /// Every page accepted; not yet written to the database.
    Validated,
    /// Written to the database in its validated form.
    Persisted,
}

impl SettingPhase {
    /// Phase after a wizard submission produced `step`.
    pub fn after(self, step: &NextStep) -> SettingPhase {
        match step {
            NextStep::Redisplay(_) | NextStep::Advance(_) => SettingPhase::Editing,
            NextStep::Persisted => SettingPhase::Validated,
        }
    }

    /// Phase after a successful database save.
    pub fn saved(self) -> SettingPhase {
        SettingPhase::Persisted
    }
}

/// Validate one posted form against its page and decide where the
/// wizard goes next. Pure with respect to the database: the caller is
/// responsible for saving when `Persisted` comes back.
pub fn submit(setting: &mut Setting, page: WizardPage, posted: &FieldMap) -> NextStep {
    let ok = match page {
        WizardPage::ImageFormat => setting.check_posted_image_parameters(posted),
        WizardPage::MicroscopeParameters => setting.check_posted_microscopy_parameters(posted),
        WizardPage::CapturingParameters => setting.check_posted_capturing_parameters(posted),
        WizardPage::CalculatePixelSize => {
            setting.check_posted_calculate_pixel_size_parameters(posted)
        }
        WizardPage::StedParameters => setting.check_posted_sted_parameters(posted),
        WizardPage::SelectPsf => setting.check_posted_psf_parameters(posted),
        WizardPage::AberrationCorrection => {
            setting.check_posted_aberration_correction_parameters(posted)
        }
        WizardPage::RestorationParameters => setting.check_posted_restoration_parameters(posted),
        WizardPage::AnalysisParameters => setting.check_posted_analysis_parameters(posted),
    };
    if !ok {
        return NextStep::Redisplay(setting.message().to_string());
    }

    match page {
        WizardPage::ImageFormat => NextStep::Advance(WizardPage::MicroscopeParameters),
        WizardPage::MicroscopeParameters => NextStep::Advance(WizardPage::CapturingParameters),
        // The calculator feeds its result back into the capturing page.
        WizardPage::CalculatePixelSize => NextStep::Advance(WizardPage::CapturingParameters),
        WizardPage::CapturingParameters => {
            if setting.is_sted() {
                NextStep::Advance(WizardPage::StedParameters)
            } else {
                branch_after_optics(setting)
            }
        }
        WizardPage::StedParameters => branch_after_optics(setting),
        WizardPage::SelectPsf
        | WizardPage::AberrationCorrection
        | WizardPage::RestorationParameters
        | WizardPage::AnalysisParameters => NextStep::Persisted,
    }
}

/// Decide where the image wizard goes once the optical description is
/// complete.
///
/// A measured PSF already embodies the aberrations of the rig, so any
/// software correction is switched off and the wizard goes to PSF file
/// selection instead. With a theoretical PSF the refractive-index
/// mismatch between sample and immersion medium decides: an unknown
/// mismatch or a relevant one routes through the correction page, a
/// negligible one finishes the wizard with correction disabled.
fn branch_after_optics(setting: &mut Setting) -> NextStep {
    if setting.uses_measured_psf() {
        setting
            .param_mut(ParamName::AberrationCorrectionNecessary)
            .set_text("0");
        setting
            .param_mut(ParamName::PerformAberrationCorrection)
            .set_text("0");
        return NextStep::Advance(WizardPage::SelectPsf);
    }

    match setting.refractive_index_deviation() {
        None => {
            setting
                .param_mut(ParamName::AberrationCorrectionNecessary)
                .set_text("1");
            NextStep::Advance(WizardPage::AberrationCorrection)
        }
        Some(deviation) if deviation < ABERRATION_DEVIATION_THRESHOLD => {
            setting
                .param_mut(ParamName::AberrationCorrectionNecessary)
                .set_text("0");
            setting
                .param_mut(ParamName::PerformAberrationCorrection)
                .set_text("0");
            NextStep::Persisted
        }
        Some(_) => {
            setting
                .param_mut(ParamName::AberrationCorrectionNecessary)
                .set_text("1");
            NextStep::Advance(WizardPage::AberrationCorrection)
        }
    }
}
