//! Setting-level validation behavior across wizard pages.

use hrm_common::params::{FieldMap, ParamName};
use hrm_common::{ConfidencePolicy, Setting, SettingKind};

fn image_setting() -> Setting {
    Setting::new(SettingKind::Image)
}

fn microscopy_fields() -> FieldMap {
    FieldMap::from_pairs([
        ("MicroscopeType", "single point confocal"),
        ("NumericalAperture", "1.4"),
        ("ObjectiveType", "oil"),
        ("SampleMedium", "water / buffer"),
        ("ExcitationWavelength0", "488"),
        ("EmissionWavelength0", "520"),
    ])
}

#[test]
fn posting_a_channel_count_resizes_every_per_channel_parameter() {
    let mut setting = image_setting();
    let posted = FieldMap::from_pairs([("NumberOfChannels", "3")]);
    assert!(setting.check_posted_image_parameters(&posted));
    assert_eq!(setting.number_of_channels(), 3);
    assert_eq!(
        setting
            .parameter(ParamName::ExcitationWavelength)
            .unwrap()
            .channel_values()
            .len(),
        3
    );
}

#[test]
fn revalidating_identical_input_is_idempotent() {
    let mut setting = image_setting();
    let posted = FieldMap::from_pairs([
        ("ImageFileFormat", "ics"),
        ("NumberOfChannels", "2"),
        ("PointSpreadFunction", "theoretical"),
    ]);
    assert!(setting.check_posted_image_parameters(&posted));
    let display = setting.display_string();
    assert!(setting.check_posted_image_parameters(&posted));
    assert_eq!(setting.display_string(), display);
    assert_eq!(setting.message(), "");
}

#[test]
fn failing_parameters_do_not_roll_back_passing_siblings() {
    let mut setting = image_setting();
    let posted = FieldMap::from_pairs([
        ("MicroscopeType", "single point confocal"),
        ("NumericalAperture", "99"),
        ("ObjectiveType", "oil"),
    ]);
    assert!(!setting.check_posted_microscopy_parameters(&posted));
    assert!(setting.message().contains("<= 1.7"));
    // The valid values survive the failed page check.
    assert_eq!(
        setting.parameter(ParamName::ObjectiveType).unwrap().as_str(),
        Some("oil")
    );
    assert_eq!(setting.microscope_type(), Some("single point confocal"));
    // And the offending value stays visible for the redisplayed form.
    assert_eq!(
        setting
            .parameter(ParamName::NumericalAperture)
            .unwrap()
            .as_str(),
        Some("99")
    );
}

#[test]
fn unposted_parameters_do_not_block_a_page() {
    let mut setting = image_setting();
    setting.check_posted_microscopy_parameters(&microscopy_fields());
    // The pinhole size is absent from the post; the capturing page
    // still passes because nothing demands the value yet.
    let posted = FieldMap::from_pairs([("CCDCaptorSizeX", "65"), ("ZStepSize", "200")]);
    assert!(setting.check_posted_capturing_parameters(&posted));
}

#[test]
fn wavelength_order_is_checked_against_the_microscope_type() {
    let mut setting = image_setting();
    let posted = FieldMap::from_pairs([
        ("MicroscopeType", "single point confocal"),
        ("NumericalAperture", "1.4"),
        ("ObjectiveType", "oil"),
        ("SampleMedium", "water / buffer"),
        ("ExcitationWavelength0", "600"),
        ("EmissionWavelength0", "520"),
    ]);
    assert!(!setting.check_posted_microscopy_parameters(&posted));
    assert!(setting.message().contains("smaller than the emission"));

    let mut setting = image_setting();
    let posted = FieldMap::from_pairs([
        ("MicroscopeType", "two photon"),
        ("NumericalAperture", "1.4"),
        ("ObjectiveType", "oil"),
        ("SampleMedium", "water / buffer"),
        ("ExcitationWavelength0", "800"),
        ("EmissionWavelength0", "520"),
    ]);
    assert!(setting.check_posted_microscopy_parameters(&posted));
}

#[test]
fn pixel_size_is_computed_from_the_captor_description() {
    let mut setting = image_setting();
    let posted = FieldMap::from_pairs([
        ("CCDCaptorSize", "6450"),
        ("Binning", "2"),
        ("ObjectiveMagnification", "100"),
        ("CMount", "1.0"),
        ("TubeFactor", "1.0"),
    ]);
    assert!(setting.check_posted_calculate_pixel_size_parameters(&posted));
    assert_eq!(
        setting.parameter(ParamName::CcdCaptorSizeX).unwrap().as_str(),
        Some("129")
    );
}

#[test]
fn pixel_size_calculation_requires_every_input() {
    let mut setting = image_setting();
    // Binning, c-mount and tube factor fall back to their defaults,
    // but the captor size and magnification have none.
    let posted = FieldMap::from_pairs([("CCDCaptorSize", "6450")]);
    assert!(!setting.check_posted_calculate_pixel_size_parameters(&posted));
    assert!(setting
        .message()
        .contains("Please set the objective magnification!"));
    // No result is written on failure.
    assert!(!setting.parameter(ParamName::CcdCaptorSizeX).unwrap().is_set());
}

#[test]
fn confocal_sted_channels_need_no_depletion_values() {
    let mut setting = image_setting();
    let posted = FieldMap::from_pairs([
        ("ImageFileFormat", "ics"),
        ("NumberOfChannels", "2"),
        ("PointSpreadFunction", "theoretical"),
    ]);
    setting.check_posted_image_parameters(&posted);
    let posted = FieldMap::from_pairs([
        ("MicroscopeType", "STED"),
        ("NumericalAperture", "1.4"),
        ("ObjectiveType", "oil"),
        ("SampleMedium", "water / buffer"),
        ("ExcitationWavelength0", "488"),
        ("ExcitationWavelength1", "640"),
        ("EmissionWavelength0", "520"),
        ("EmissionWavelength1", "660"),
    ]);
    setting.check_posted_microscopy_parameters(&posted);

    // Channel 0 runs confocal, channel 1 is depleted. Only channel 1
    // needs the STED values.
    let posted = FieldMap::from_pairs([
        ("StedDepletionMode0", "off (confocal)"),
        ("StedDepletionMode1", "pulsed"),
        ("StedWavelength1", "775"),
        ("StedSaturationFactor1", "30"),
        ("StedImmunity1", "10"),
    ]);
    assert!(
        setting.check_posted_sted_parameters(&posted),
        "message: {}",
        setting.message()
    );

    let posted = FieldMap::from_pairs([
        ("StedDepletionMode0", "pulsed"),
        ("StedDepletionMode1", "pulsed"),
        ("StedWavelength1", "775"),
        ("StedSaturationFactor1", "30"),
        ("StedImmunity1", "10"),
    ]);
    assert!(!setting.check_posted_sted_parameters(&posted));
    assert!(setting.message().contains("channel 0"));
}

#[test]
fn aberration_page_is_gated_on_the_correction_switch() {
    let mut setting = image_setting();
    let posted = FieldMap::from_pairs([("PerformAberrationCorrection", "0")]);
    assert!(setting.check_posted_aberration_correction_parameters(&posted));

    let posted = FieldMap::from_pairs([("PerformAberrationCorrection", "1")]);
    assert!(!setting.check_posted_aberration_correction_parameters(&posted));
    assert!(setting.message().contains("coverslip"));

    let posted = FieldMap::from_pairs([
        ("PerformAberrationCorrection", "1"),
        ("CoverslipRelativePosition", "closest"),
        ("AberrationCorrectionMode", "advanced"),
        ("AdvancedCorrectionOptions", "slice"),
        ("PSFGenerationDepth", "10"),
    ]);
    assert!(
        setting.check_posted_aberration_correction_parameters(&posted),
        "message: {}",
        setting.message()
    );
}

#[test]
fn completeness_does_not_demand_the_advanced_correction_options() {
    let policy = ConfidencePolicy::built_in();
    let mut setting = image_setting();
    assert!(setting.check_posted_image_parameters(&FieldMap::from_pairs([
        ("ImageFileFormat", "ics"),
        ("NumberOfChannels", "1"),
        ("PointSpreadFunction", "theoretical"),
    ])));
    assert!(setting.check_posted_microscopy_parameters(&microscopy_fields()));
    assert!(setting.check_posted_capturing_parameters(&FieldMap::from_pairs([
        ("CCDCaptorSizeX", "65"),
        ("ZStepSize", "200"),
        ("TimeInterval", "0"),
        ("PinholeSize0", "80"),
    ])));
    setting
        .parameter_mut(ParamName::AberrationCorrectionNecessary)
        .unwrap()
        .set_text("1");
    // Automatic correction needs no advanced options and no depth.
    assert!(
        setting.check_posted_aberration_correction_parameters(&FieldMap::from_pairs([
            ("PerformAberrationCorrection", "1"),
            ("CoverslipRelativePosition", "closest"),
            ("AberrationCorrectionMode", "automatic"),
        ])),
        "message: {}",
        setting.message()
    );
    setting.apply_confidence(&policy);
    assert!(setting.check_setting(), "message: {}", setting.message());
}

#[test]
fn analysis_page_passes_trivially_with_colocalization_off() {
    let mut setting = Setting::new(SettingKind::Analysis);
    let posted = FieldMap::from_pairs([("ColocAnalysis", "0")]);
    assert!(setting.check_posted_analysis_parameters(&posted));
}

#[test]
fn colocalization_needs_channels_and_coefficients() {
    let mut setting = Setting::new(SettingKind::Analysis);
    setting.set_number_of_channels(3);
    let posted = FieldMap::from_pairs([("ColocAnalysis", "1"), ("ColocThresholdMode", "auto")]);
    assert!(!setting.check_posted_analysis_parameters(&posted));
    assert!(setting.message().contains("at least two"));
    assert!(setting.message().contains("coefficients"));

    let mut posted = FieldMap::new();
    posted.insert("ColocAnalysis", "1");
    posted.insert("ColocChannel", "0");
    posted.insert("ColocChannel", "2");
    posted.insert("ColocCoefficient", "pearson");
    posted.insert("ColocThresholdMode", "auto");
    assert!(
        setting.check_posted_analysis_parameters(&posted),
        "message: {}",
        setting.message()
    );
    // Auto mode fills every channel threshold.
    assert_eq!(
        setting
            .parameter(ParamName::ColocThreshold)
            .unwrap()
            .channel_str(2),
        Some("auto")
    );
}

#[test]
fn snr_is_only_required_where_the_algorithm_uses_it() {
    let mut setting = Setting::new(SettingKind::Restoration);
    setting.set_number_of_channels(2);
    let posted = FieldMap::from_pairs([
        ("DeconvolutionAlgorithm0", "cmle"),
        ("DeconvolutionAlgorithm1", "skip"),
        ("SignalNoiseRatio0", "20"),
        ("NumberOfIterations", "40"),
        ("QualityChangeStoppingCriterion", "0.01"),
        ("OutputFileFormat", "ics"),
    ]);
    assert!(
        setting.check_posted_restoration_parameters(&posted),
        "message: {}",
        setting.message()
    );

    let posted = FieldMap::from_pairs([
        ("DeconvolutionAlgorithm0", "cmle"),
        ("DeconvolutionAlgorithm1", "cmle"),
        ("SignalNoiseRatio0", "20"),
    ]);
    assert!(!setting.check_posted_restoration_parameters(&posted));
    assert!(setting.message().contains("signal to noise ratio for channel 1"));
}

#[test]
fn display_string_is_deterministic_and_hides_irrelevant_groups() {
    let build = || {
        let mut setting = image_setting();
        let posted = FieldMap::from_pairs([
            ("ImageFileFormat", "ics"),
            ("NumberOfChannels", "1"),
            ("PointSpreadFunction", "theoretical"),
        ]);
        setting.check_posted_image_parameters(&posted);
        setting.check_posted_microscopy_parameters(&microscopy_fields());
        setting
    };
    let a = build().display_string();
    let b = build().display_string();
    assert_eq!(a, b);
    // A confocal setting shows no STED lines and no calculator inputs.
    assert!(!a.contains("sted"));
    assert!(!a.contains("c mount"));
    assert!(a.contains("microscope type"));
}

#[test]
fn completeness_check_names_the_missing_parameters() {
    let policy = ConfidencePolicy::built_in();
    let mut setting = image_setting();
    let posted = FieldMap::from_pairs([
        ("ImageFileFormat", "ics"),
        ("NumberOfChannels", "1"),
    ]);
    setting.check_posted_image_parameters(&posted);
    setting.apply_confidence(&policy);
    assert!(!setting.check_setting());
    assert!(setting.message().contains("point spread function"));
}

#[test]
fn mixed_sted_channels_pass_the_completeness_check() {
    let policy = ConfidencePolicy::built_in();
    let mut setting = image_setting();
    assert!(setting.check_posted_image_parameters(&FieldMap::from_pairs([
        ("ImageFileFormat", "ics"),
        ("NumberOfChannels", "2"),
        ("PointSpreadFunction", "theoretical"),
    ])));
    assert!(setting.check_posted_microscopy_parameters(&FieldMap::from_pairs([
        ("MicroscopeType", "STED"),
        ("NumericalAperture", "1.4"),
        ("ObjectiveType", "water"),
        ("SampleMedium", "water / buffer"),
        ("ExcitationWavelength0", "488"),
        ("ExcitationWavelength1", "640"),
        ("EmissionWavelength0", "520"),
        ("EmissionWavelength1", "660"),
    ])));
    assert!(setting.check_posted_capturing_parameters(&FieldMap::from_pairs([
        ("CCDCaptorSizeX", "40"),
        ("ZStepSize", "200"),
        ("TimeInterval", "0"),
    ])));
    // Channel 0 runs confocal and carries no depletion values; the
    // accepted page must also pass the final completeness check.
    assert!(setting.check_posted_sted_parameters(&FieldMap::from_pairs([
        ("StedDepletionMode0", "off (confocal)"),
        ("StedDepletionMode1", "pulsed"),
        ("StedWavelength1", "775"),
        ("StedSaturationFactor1", "30"),
        ("StedImmunity1", "10"),
    ])));
    setting.apply_confidence(&policy);
    assert!(setting.check_setting(), "message: {}", setting.message());
}

#[test]
fn mixed_algorithms_pass_the_completeness_check() {
    let policy = ConfidencePolicy::built_in();
    let mut setting = Setting::new(SettingKind::Restoration);
    setting.set_number_of_channels(2);
    assert!(
        setting.check_posted_restoration_parameters(&FieldMap::from_pairs([
            ("DeconvolutionAlgorithm0", "cmle"),
            ("DeconvolutionAlgorithm1", "skip"),
            ("SignalNoiseRatio0", "20"),
            ("NumberOfIterations", "40"),
        ])),
        "message: {}",
        setting.message()
    );
    setting.apply_confidence(&policy);
    assert!(setting.check_setting(), "message: {}", setting.message());

    // Switching the skipped channel to cmle makes its missing ratio a
    // completeness failure again.
    setting
        .parameter_mut(ParamName::DeconvolutionAlgorithm)
        .unwrap()
        .set_channel_text(1, "cmle");
    assert!(!setting.check_setting());
    assert!(setting.message().contains("channel 1"));
}

#[test]
fn values_survive_a_storage_round_trip() {
    let mut setting = image_setting();
    let posted = FieldMap::from_pairs([
        ("ImageFileFormat", "ics"),
        ("NumberOfChannels", "2"),
        ("PointSpreadFunction", "theoretical"),
    ]);
    setting.check_posted_image_parameters(&posted);
    setting.check_posted_microscopy_parameters(&FieldMap::from_pairs([
        ("MicroscopeType", "single point confocal"),
        ("NumericalAperture", "1.4"),
        ("ObjectiveType", "oil"),
        ("SampleMedium", "water / buffer"),
        ("ExcitationWavelength0", "488"),
        ("ExcitationWavelength1", "561"),
        ("EmissionWavelength0", "520"),
        ("EmissionWavelength1", "600"),
    ]));

    let json = setting.values_to_json().unwrap();
    let mut restored = Setting::new(SettingKind::Image);
    restored.values_from_json(&json).unwrap();
    assert_eq!(restored.number_of_channels(), 2);
    assert_eq!(restored.display_string(), setting.display_string());
}

#[test]
fn per_channel_values_survive_without_a_channel_count_parameter() {
    // Restoration settings carry no channel-count parameter of their
    // own; the stored per-channel arrays alone decide the shape.
    let mut setting = Setting::new(SettingKind::Restoration);
    setting.set_number_of_channels(2);
    assert!(
        setting.check_posted_restoration_parameters(&FieldMap::from_pairs([
            ("DeconvolutionAlgorithm0", "cmle"),
            ("DeconvolutionAlgorithm1", "qmle"),
            ("SignalNoiseRatio0", "20"),
        ])),
        "message: {}",
        setting.message()
    );

    let json = setting.values_to_json().unwrap();
    let mut restored = Setting::new(SettingKind::Restoration);
    restored.values_from_json(&json).unwrap();
    assert_eq!(restored.number_of_channels(), 2);
    assert_eq!(
        restored
            .parameter(ParamName::DeconvolutionAlgorithm)
            .unwrap()
            .channel_str(1),
        Some("qmle")
    );
}

#[test]
fn unknown_parameter_names_fail_loudly_on_load() {
    let mut setting = Setting::new(SettingKind::Image);
    let err = setting
        .values_from_json(r#"{"NoSuchParameter":{"t":"Scalar","v":"1"}}"#)
        .unwrap_err();
    assert!(err.to_string().contains("NoSuchParameter"));
}
