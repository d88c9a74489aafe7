use super::*;
use crate::params::catalog;

fn provided(name: ParamName) -> Parameter {
    let mut p = Parameter::new(name);
    p.set_confidence(ConfidenceLevel::Provided);
    p
}

#[test]
fn numeric_bounds_produce_the_expected_messages() {
    let mut p = provided(ParamName::NumericalAperture);
    p.set_text("1.4");
    assert!(p.check());

    p.set_text("0.1");
    assert!(!p.check());
    assert_eq!(p.message(), "The value must be >= 0.2.");

    p.set_text("hello");
    assert!(!p.check());
    assert_eq!(p.message(), "The value must be numeric.");
}

#[test]
fn open_lower_bound_rejects_the_bound_itself() {
    let mut p = provided(ParamName::CcdCaptorSizeX);
    p.set_text("0");
    assert!(!p.check());
    assert_eq!(p.message(), "The value must be > 0.");
    p.set_text("65");
    assert!(p.check());
}

#[test]
fn integral_domains_reject_fractions() {
    let mut p = provided(ParamName::NumberOfChannels);
    p.set_text("2.5");
    assert!(!p.check());
    assert_eq!(p.message(), "The value must be an integer.");
    p.set_text("2");
    assert!(p.check());
}

#[test]
fn choice_membership_is_enforced() {
    let mut p = provided(ParamName::MicroscopeType);
    p.set_text("widefield");
    assert!(p.check());
    p.set_text("electron");
    assert!(!p.check());
    assert_eq!(p.message(), "Bad value electron for MicroscopeType.");
}

#[test]
fn booleans_accept_both_wire_forms() {
    let mut p = provided(ParamName::PerformAberrationCorrection);
    for v in ["true", "false", "1", "0"] {
        p.set_text(v);
        assert!(p.check(), "{} should be a valid boolean", v);
    }
    p.set_text("yes");
    assert!(!p.check());
}

#[test]
fn unset_parameter_passes_unless_a_value_must_be_provided() {
    let mut p = Parameter::new(ParamName::PinholeSize);
    assert!(!p.is_set());
    assert!(p.check());

    p.set_confidence(ConfidenceLevel::Provided);
    assert!(!p.check());
    assert_eq!(
        p.message(),
        "Please provide a value for the pinhole size!"
    );
}

#[test]
fn partially_filled_channels_fail_with_confidence_specific_messages() {
    let mut p = Parameter::new(ParamName::ExcitationWavelength);
    p.set_channels(3);
    p.set_channel_text(0, "488");
    p.set_channel_text(2, "561");

    assert!(!p.check());
    assert_eq!(
        p.message(),
        "You can omit typing values for this parameter. If you decide to \
         provide them, though, you must provide them all."
    );

    p.set_confidence(ConfidenceLevel::Provided);
    assert!(!p.check());
    assert_eq!(p.message(), "Some of the values are missing!");

    p.set_channel_text(1, "514");
    assert!(p.check());
}

#[test]
fn channel_resize_preserves_the_common_prefix() {
    let mut p = Parameter::new(ParamName::EmissionWavelength);
    p.set_channels(3);
    p.set_channel_text(0, "520");
    p.set_channel_text(1, "600");
    p.set_channel_text(2, "680");

    p.set_channels(2);
    assert_eq!(p.channel_str(0), Some("520"));
    assert_eq!(p.channel_str(1), Some("600"));
    assert_eq!(p.channel_values().len(), 2);

    p.set_channels(3);
    assert_eq!(p.channel_str(0), Some("520"));
    assert_eq!(p.channel_str(1), Some("600"));
    // The re-added channel comes back at the default, not the old value.
    assert_eq!(p.channel_str(2), None);
}

#[test]
fn channel_count_is_clamped() {
    let mut p = Parameter::new(ParamName::ExcitationWavelength);
    p.set_channels(99);
    assert_eq!(p.channels(), MAX_CHANNELS);
    p.set_channels(0);
    assert_eq!(p.channels(), 1);
}

#[test]
fn channel_selection_requires_two_valid_channels() {
    let mut p = provided(ParamName::ColocChannel);
    p.set_channels(3);

    p.set_multi(vec!["0".to_string()]);
    assert!(!p.check());

    p.set_multi(vec!["0".to_string(), "5".to_string()]);
    assert!(!p.check());
    assert_eq!(p.message(), "Bad channel 5 for ColocChannel.");

    p.set_multi(vec!["0".to_string(), "2".to_string()]);
    assert!(p.check());
}

#[test]
fn channel_vectors_require_the_declared_component_count() {
    let mut p = provided(ParamName::ChromaticAberration);
    p.set_channel_text(0, "0, 0, 0, 1, 2");
    assert!(p.check());
    p.set_channel_text(0, "1, 2");
    assert!(!p.check());
}

#[test]
fn keyword_domains_accept_keywords_and_numbers() {
    let mut p = provided(ParamName::BackgroundOffsetPercent);
    p.set_channel_text(0, "auto");
    assert!(p.check());
    p.set_channel_text(0, "12.5");
    assert!(p.check());
    p.set_channel_text(0, "-3");
    assert!(!p.check());
}

#[test]
fn wire_names_round_trip() {
    for name in ParamName::ALL {
        assert_eq!(ParamName::parse(name.as_str()), Some(name));
    }
    assert_eq!(ParamName::parse("NoSuchParameter"), None);
}

#[test]
fn human_names_split_camel_case_and_keep_acronyms() {
    assert_eq!(
        ParamName::PointSpreadFunction.human_name(),
        "point spread function"
    );
    assert_eq!(ParamName::CcdCaptorSizeX.human_name(), "ccd captor size x");
    assert_eq!(ParamName::CMount.human_name(), "c mount");
    assert_eq!(
        ParamName::PsfGenerationDepth.human_name(),
        "psf generation depth"
    );
}

#[test]
fn values_survive_json_round_trips() {
    let values = [
        ParamValue::Scalar(Some("1.4".to_string())),
        ParamValue::Scalar(None),
        ParamValue::PerChannel(vec![Some("488".to_string()), None]),
        ParamValue::Multi(vec!["pearson".to_string(), "manders".to_string()]),
    ];
    for value in values {
        let json = serde_json::to_string(&value).unwrap();
        let back: ParamValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}

#[test]
fn field_maps_expose_scalar_channel_and_multi_fields() {
    let posted = FieldMap::from_pairs([
        ("NumberOfChannels", "2"),
        ("ExcitationWavelength0", "488"),
        ("ExcitationWavelength1", "561"),
        ("ColocCoefficient", "pearson"),
        ("ColocCoefficient", "manders"),
    ]);
    assert_eq!(posted.get("NumberOfChannels"), Some("2"));
    assert_eq!(posted.get_channel("ExcitationWavelength", 1), Some("561"));
    assert_eq!(posted.get_all("ColocCoefficient").len(), 2);
    assert!(posted.mentions(ParamName::ExcitationWavelength));
    assert!(!posted.mentions(ParamName::EmissionWavelength));
}

#[test]
fn refractive_indices_cover_the_common_media() {
    assert_eq!(
        catalog::refractive_index(ParamName::ObjectiveType, "oil"),
        Some(1.515)
    );
    assert_eq!(
        catalog::refractive_index(ParamName::SampleMedium, "water / buffer"),
        Some(1.339)
    );
    assert_eq!(
        catalog::refractive_index(ParamName::SampleMedium, "vacuum"),
        None
    );
}

#[test]
fn display_lines_pad_and_mark_unset_values() {
    let mut p = Parameter::new(ParamName::NumericalAperture);
    assert!(p.display_line().contains("*not set*"));
    p.set_text("1.4");
    let line = p.display_line();
    assert!(line.starts_with("numerical aperture:"));
    assert!(line.ends_with("1.4\n"));
}
