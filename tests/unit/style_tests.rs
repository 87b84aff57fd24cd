// Style parsing unit tests
// Exercises the public parsing API the request layer relies on

use rstest::rstest;
use serde_json::json;
use tilemark::watermark::{parse_style, FontScale, RawStyleParams, WatermarkError};

fn signals() -> RawStyleParams {
    RawStyleParams::new()
        .with("text", "Confidential")
        .with("font.size", "2px")
        .with("color", "#000000")
        .with("stroke", "#FFFFFF")
}

#[rstest]
#[case("1px", 1, 20.0)]
#[case("2px", 2, 40.0)]
#[case("3px", 3, 60.0)]
#[case("4px", 4, 80.0)]
#[case("5px", 5, 100.0)]
#[case("10px", 10, 200.0)]
#[case(" 2PX ", 2, 40.0)]
#[case("5", 5, 100.0)]
fn test_recognized_size_tokens(#[case] token: &str, #[case] factor: u32, #[case] points: f32) {
    let scale: FontScale = token.parse().unwrap();
    assert_eq!(scale.factor(), factor);
    assert_eq!(scale.point_size(), points);
}

#[rstest]
#[case("0px")]
#[case("6px")]
#[case("7px")]
#[case("20px")]
#[case("2.5px")]
#[case("-2px")]
#[case("px")]
#[case("large")]
#[case("")]
fn test_unrecognized_size_tokens(#[case] token: &str) {
    let result = parse_style(&signals().with("font.size", token));
    match result {
        Err(WatermarkError::InvalidStyleParameter { param, .. }) => assert_eq!(param, "font.size"),
        other => panic!("expected font.size error for {:?}, got {:?}", token, other),
    }
}

#[rstest]
#[case("", 0.0)]
#[case("   ", 0.0)]
#[case("10", 10.0)]
#[case("-10", -10.0)]
#[case("12.5", 12.5)]
#[case("50", 50.0)]
#[case("75", 50.0)]
#[case("-720", -50.0)]
fn test_rotation_values(#[case] value: &str, #[case] expected: f32) {
    let style = parse_style(&signals().with("rotation", value)).unwrap();
    assert_eq!(style.rotation_degrees, expected);
    assert_eq!(style.internal_rotation(), -expected);
}

#[rstest]
#[case("NaN")]
#[case("inf")]
#[case("-infinity")]
#[case("forty-five")]
fn test_rotation_rejects_non_finite(#[case] value: &str) {
    let err = parse_style(&signals().with("rotation", value)).unwrap_err();
    assert!(matches!(
        err,
        WatermarkError::InvalidStyleParameter { ref param, .. } if param == "rotation"
    ));
    assert_eq!(err.to_http_status(), 400);
}

#[test]
fn test_absent_rotation_is_zero() {
    let style = parse_style(&signals()).unwrap();
    assert_eq!(style.rotation_degrees, 0.0);
}

#[test]
fn test_text_passes_through_untouched() {
    for text in ["", "  padded  ", "Ünïcödé ✓", "line\nbreak"] {
        let style = parse_style(&signals().with("text", text)).unwrap();
        assert_eq!(style.text, text);
    }

    let style = parse_style(&signals().with("text", "x")).unwrap();
    assert_eq!(style.fill_color, "#000000");
    assert_eq!(style.stroke_color, "#FFFFFF");
}

#[test]
fn test_missing_text_is_empty() {
    let raw = RawStyleParams::new()
        .with("font.size", "1px")
        .with("color", "red")
        .with("stroke", "blue");
    assert_eq!(parse_style(&raw).unwrap().text, "");
}

#[test]
fn test_signals_from_browser_json() {
    let raw = RawStyleParams::from_signals(&json!({
        "text": "Draft",
        "font": { "size": "3px" },
        "color": "#112233",
        "stroke": "white",
        "rotation": 30,
        "photoNames": ["a.png"],
        "unused": null
    }));

    assert_eq!(raw.get("font.size"), Some("3px"));
    assert_eq!(raw.get("rotation"), Some("30"));
    assert_eq!(raw.get("photoNames"), None);
    assert_eq!(raw.get("unused"), None);

    let style = parse_style(&raw).unwrap();
    assert_eq!(style.font_scale.factor(), 3);
    assert_eq!(style.point_size(), 60.0);
    assert_eq!(style.rotation_degrees, 30.0);
}
