// Render pipeline integration tests
// Font-dependent cases locate a system font and return early without one

use std::io::Cursor;
use std::sync::Arc;

use image::{ImageFormat, Rgb, Rgba, RgbaImage};
use tilemark::constants::{DEFAULT_FONT_CANDIDATES, TILE_GUTTER};
use tilemark::watermark::{
    calculate_tiled_positions, parse_style, FileFontProvider, ImageDimensions, RawStyleParams,
    RenderLimits, TiledOverlay, WatermarkDimensions, WatermarkError, WatermarkRenderer,
};

fn renderer() -> Option<WatermarkRenderer> {
    let font = FileFontProvider::discover(DEFAULT_FONT_CANDIDATES).ok()?;
    Some(WatermarkRenderer::new(Arc::new(font), RenderLimits::default()))
}

fn raw(text: &str, size: &str, rotation: &str) -> RawStyleParams {
    RawStyleParams::new()
        .with("text", text)
        .with("font.size", size)
        .with("color", "#000000")
        .with("stroke", "#FFFFFF")
        .with("rotation", rotation)
}

fn write_png(path: &std::path::Path, width: u32, height: u32, color: Rgba<u8>) {
    let image = RgbaImage::from_pixel(width, height, color);
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png).unwrap();
    std::fs::write(path, buffer.into_inner()).unwrap();
}

fn ceil_div(a: u32, b: u32) -> u32 {
    (a + b - 1) / b
}

#[test]
fn test_tile_count_matches_ceiling_formula() {
    let cases = [
        (800, 600, 300, 100),
        (800, 600, 1, 1),
        (1, 1, 500, 500),
        (1000, 1000, 960, 960),
        (1000, 1000, 961, 959),
        (123, 457, 17, 33),
    ];

    for (w, h, tw, th) in cases {
        let tile = RgbaImage::from_pixel(tw, th, Rgba([0, 0, 0, 255]));
        let overlay = TiledOverlay::build(&tile, w, h, TILE_GUTTER);

        let columns = ceil_div(w, tw + TILE_GUTTER);
        let rows = ceil_div(h, th + TILE_GUTTER);
        assert_eq!(overlay.grid().columns, columns, "{:?}", (w, h, tw, th));
        assert_eq!(overlay.grid().rows, rows, "{:?}", (w, h, tw, th));
        assert_eq!(overlay.tile_count(), (columns * rows) as usize);
    }
}

#[test]
fn test_positions_start_at_origin_and_stay_inside() {
    let image = ImageDimensions {
        width: 800,
        height: 600,
    };
    let tile = WatermarkDimensions {
        width: 250,
        height: 90,
    };

    let positions = calculate_tiled_positions(&image, &tile, TILE_GUTTER);

    assert_eq!((positions[0].x, positions[0].y), (0, 0));
    assert!(positions
        .iter()
        .all(|p| p.x >= 0 && p.y >= 0 && (p.x as u32) < 800 && (p.y as u32) < 600));
    assert!(positions.iter().any(|p| p.x == 290));
    assert!(positions.iter().any(|p| p.y == 130));
}

#[test]
fn test_confidential_800x600_end_to_end() {
    let Some(renderer) = renderer() else { return };
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("sess-800");
    write_png(&source, 800, 600, Rgba([200, 180, 160, 255]));

    let style = parse_style(&raw("Confidential", "2px", "45")).unwrap();
    let output = renderer
        .render_file(&source, &style, dir.path(), "sess-800")
        .unwrap();

    assert_eq!(output.filename, "watermarked_sess-800.png");
    assert_eq!(output.path, dir.path().join("watermarked_sess-800.png"));
    assert_eq!((output.width, output.height), (800, 600));
    assert!(output.tile_count >= 1);

    let decoded = image::open(&output.path).unwrap();
    assert_eq!(decoded.color(), image::ColorType::Rgb8);
    let rgb = decoded.to_rgb8();
    assert_eq!(rgb.dimensions(), (800, 600));

    // Untouched photo remains visible between tiles, text ink shows up
    assert!(rgb.pixels().any(|p| *p == Rgb([200, 180, 160])));
    assert!(rgb
        .pixels()
        .any(|p| (p[0] as u32 + p[1] as u32 + p[2] as u32) < 96));
}

#[test]
fn test_same_input_renders_identical_pixels() {
    let Some(renderer) = renderer() else { return };
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("repeat");
    write_png(&source, 320, 240, Rgba([20, 40, 60, 255]));
    let style = parse_style(&raw("Proof", "1px", "-30")).unwrap();

    let first = renderer.render_file(&source, &style, dir.path(), "repeat").unwrap();
    let first_pixels = image::open(&first.path).unwrap().to_rgb8();
    let second = renderer.render_file(&source, &style, dir.path(), "repeat").unwrap();
    let second_pixels = image::open(&second.path).unwrap().to_rgb8();

    assert_eq!(first_pixels, second_pixels);
}

#[test]
fn test_empty_text_leaves_photo_unchanged() {
    let Some(renderer) = renderer() else { return };
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("blank");
    write_png(&source, 50, 40, Rgba([9, 99, 199, 255]));

    for text in ["", "   "] {
        let style = parse_style(&raw(text, "10px", "20")).unwrap();
        let output = renderer.render_file(&source, &style, dir.path(), "blank").unwrap();
        let rgb = image::open(&output.path).unwrap().to_rgb8();
        assert!(rgb.pixels().all(|p| *p == Rgb([9, 99, 199])));
    }
}

#[test]
fn test_source_smaller_than_tile_holds_one_instance() {
    let Some(renderer) = renderer() else { return };
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("tiny");
    write_png(&source, 12, 8, Rgba([255, 0, 0, 255]));

    let style = parse_style(&raw("Much too long for this", "10px", "0")).unwrap();
    let output = renderer.render_file(&source, &style, dir.path(), "tiny").unwrap();

    assert_eq!(output.tile_count, 1);
    assert_eq!((output.width, output.height), (12, 8));
}

#[test]
fn test_larger_size_gives_larger_tile() {
    let Some(renderer) = renderer() else { return };

    let small = renderer
        .render_tile(&parse_style(&raw("Size", "1px", "0")).unwrap())
        .unwrap();
    let large = renderer
        .render_tile(&parse_style(&raw("Size", "5px", "0")).unwrap())
        .unwrap();

    assert!(large.width() > small.width() * 3);
    assert!(large.height() > small.height() * 3);
}

#[test]
fn test_corrupt_source_is_render_error() {
    let Some(renderer) = renderer() else { return };
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("corrupt");
    std::fs::write(&source, b"\x89PNG\r\n\x1a\nnot really").unwrap();

    let style = parse_style(&raw("x", "2px", "0")).unwrap();
    let err = renderer
        .render_file(&source, &style, dir.path(), "corrupt")
        .unwrap_err();

    assert!(matches!(err, WatermarkError::Render(_)));
    assert!(!dir.path().join("watermarked_corrupt.png").exists());
}

#[test]
fn test_oversized_source_is_rejected() {
    let Some(font) = FileFontProvider::discover(DEFAULT_FONT_CANDIDATES).ok() else {
        return;
    };
    let renderer = WatermarkRenderer::new(
        Arc::new(font),
        RenderLimits {
            max_source_width: 100,
            max_source_height: 100,
            max_source_pixels: 10_000,
        },
    );
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("huge");
    write_png(&source, 101, 50, Rgba([0, 0, 0, 255]));

    let style = parse_style(&raw("x", "2px", "0")).unwrap();
    let err = renderer
        .render_file(&source, &style, dir.path(), "huge")
        .unwrap_err();
    assert!(matches!(err, WatermarkError::ImageTooLarge { width: 101, height: 50, .. }));
    assert_eq!(err.to_http_status(), 413);
}
