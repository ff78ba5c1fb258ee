use std::fs;
use std::path::PathBuf;
use svtenc::engine::options::{OptionModel, RateControl, validate};
use tempfile::TempDir;

/// Fixture: a temp dir holding a real input file, with output targeted
/// at the same dir.
fn fixture() -> (TempDir, OptionModel) {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.mp4");
    fs::write(&input, b"not really video").unwrap();
    let model = OptionModel::new(input, dir.path().join("output.hevc.mp4"));
    (dir, model)
}

fn assert_field(model: &OptionModel, field: &str) {
    let err = validate(model).unwrap_err();
    assert_eq!(err.field, field, "unexpected error: {}", err);
}

#[test]
fn valid_model_passes() {
    let (_dir, model) = fixture();
    assert!(validate(&model).is_ok());
}

#[test]
fn missing_input_rejected() {
    let (_dir, mut model) = fixture();
    model.input_path = PathBuf::from("/nonexistent/in.mp4");
    assert_field(&model, "input_path");
}

#[test]
fn input_error_wins_over_later_rules() {
    // Several rules violated at once; the fixed rule order means the
    // input check always reports first.
    let (_dir, mut model) = fixture();
    model.input_path = PathBuf::from("/nonexistent/in.mp4");
    model.quality = 99;
    model.resolution_scale = Some(2.0);
    assert_field(&model, "input_path");
}

#[test]
fn missing_output_directory_rejected() {
    let (_dir, mut model) = fixture();
    model.output_path = PathBuf::from("/nonexistent/dir/out.mkv");
    assert_field(&model, "output_path");
}

#[test]
fn output_equal_to_input_rejected() {
    let (_dir, mut model) = fixture();
    model.output_path = model.input_path.clone();
    assert_field(&model, "output_path");
}

#[test]
fn aliased_output_path_equal_to_input_rejected() {
    // Same file spelled differently; overwrite keeps rule 6 out of the
    // way, so the identity check alone must catch it.
    let (dir, mut model) = fixture();
    model.output_path = dir.path().join(".").join("input.mp4");
    model.overwrite = true;
    assert_field(&model, "output_path");
}

#[test]
fn crf_out_of_range_rejected() {
    let (_dir, mut model) = fixture();
    model.quality = 52;
    assert_field(&model, "quality");

    model.quality = -1;
    assert_field(&model, "quality");

    model.quality = 51;
    assert!(validate(&model).is_ok());
}

#[test]
fn nonpositive_bitrate_rejected() {
    let (_dir, mut model) = fixture();
    model.rate_control = RateControl::Cbr;
    model.quality = 0;
    assert_field(&model, "quality");

    // Values illegal for CRF are fine as bitrates.
    model.quality = 8000;
    assert!(validate(&model).is_ok());
}

#[test]
fn scale_outside_unit_interval_rejected() {
    let (_dir, mut model) = fixture();
    model.resolution_scale = Some(0.0);
    assert_field(&model, "resolution_scale");

    model.resolution_scale = Some(1.5);
    assert_field(&model, "resolution_scale");

    model.resolution_scale = Some(1.0);
    assert!(validate(&model).is_ok());
}

#[test]
fn existing_output_needs_overwrite() {
    let (_dir, mut model) = fixture();
    fs::write(&model.output_path, b"stale").unwrap();
    assert_field(&model, "output_path");

    model.overwrite = true;
    assert!(validate(&model).is_ok());
}
