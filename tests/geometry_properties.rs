// 几何不变量的性质测试：覆盖约束、夹紧幂等、最小缩放、封面横向锁定、导出分辨率。
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use proptest::prelude::*;

use profile_image_editor::image_editor::{
    CanvasSurface,
    CropFrame,
    DragController,
    EditorConfig,
    ImageSize,
    ImageTransform,
    MaskKind,
    MaskSpec,
    PanOffset,
    PointerSample,
    clamp_position,
    crop_region,
    min_cover_zoom,
};

fn frame_for(kind: MaskKind, width: u32, height: u32, container_width: f64) -> CropFrame {
    let config = EditorConfig::default();
    CropFrame::new(
        ImageSize::new(width, height),
        MaskSpec::for_kind(kind, Some(container_width), &config),
    )
}

fn mask_kind() -> impl Strategy<Value = MaskKind> {
    prop_oneof![Just(MaskKind::Profile), Just(MaskKind::Cover)]
}

proptest! {
    #[test]
    fn rendered_image_always_covers_mask(
        kind in mask_kind(),
        width in 1u32..4000,
        height in 1u32..4000,
        container_width in 200.0f64..2000.0,
        zoom_t in 0.0f64..=1.0,
        raw_x in -5000.0f64..5000.0,
        raw_y in -5000.0f64..5000.0,
    ) {
        let frame = frame_for(kind, width, height, container_width);
        let fitted = ImageTransform::fit(&frame, 3.0);
        let zoom = fitted.min_zoom() + zoom_t * (fitted.max_zoom() - fitted.min_zoom());

        let transform = fitted
            .with_zoom(zoom, &frame)
            .with_pan(PanOffset::new(raw_x, raw_y), &frame);

        prop_assert!(transform.zoom() >= transform.min_zoom());
        prop_assert!(transform.covers_mask(&frame));
    }

    #[test]
    fn clamping_is_idempotent(
        kind in mask_kind(),
        width in 1u32..4000,
        height in 1u32..4000,
        zoom_t in 0.0f64..=1.0,
        raw_x in -5000.0f64..5000.0,
        raw_y in -5000.0f64..5000.0,
    ) {
        let frame = frame_for(kind, width, height, 900.0);
        let fitted = ImageTransform::fit(&frame, 3.0);
        let zoom = fitted.min_zoom() + zoom_t * (fitted.max_zoom() - fitted.min_zoom());

        let once = clamp_position(PanOffset::new(raw_x, raw_y), zoom, &frame);
        let twice = clamp_position(once, zoom, &frame);
        prop_assert_eq!(once, twice);

        let transform = fitted.with_zoom(zoom, &frame).with_pan(PanOffset::new(raw_x, raw_y), &frame);
        prop_assert_eq!(transform.clamped(&frame), transform);
    }

    #[test]
    fn min_zoom_exactly_covers_one_dimension(
        kind in mask_kind(),
        width in 1u32..4000,
        height in 1u32..4000,
        container_width in 200.0f64..2000.0,
    ) {
        let frame = frame_for(kind, width, height, container_width);
        let zoom = min_cover_zoom(frame.natural, &frame.mask);
        let (rendered_w, rendered_h) = frame.rendered_size(zoom);

        let slack_w = rendered_w - frame.mask.width;
        let slack_h = rendered_h - frame.mask.height;
        let tolerance = 1e-9 * rendered_w.max(rendered_h).max(1.0);

        prop_assert!(slack_w >= -tolerance);
        prop_assert!(slack_h >= -tolerance);
        prop_assert!(slack_w.abs() <= tolerance || slack_h.abs() <= tolerance);
    }

    #[test]
    fn cover_drags_never_move_horizontally(
        width in 1u32..3000,
        height in 1u32..3000,
        zoom_t in 0.0f64..=1.0,
        moves in proptest::collection::vec((-3000.0f64..3000.0, -3000.0f64..3000.0), 1..20),
    ) {
        let frame = frame_for(MaskKind::Cover, width, height, 1200.0);
        let fitted = ImageTransform::fit(&frame, 3.0);
        let zoom = fitted.min_zoom() + zoom_t * (fitted.max_zoom() - fitted.min_zoom());
        let mut transform = fitted.with_zoom(zoom, &frame);

        let mut drag = DragController::new();
        let origin = PointerSample { x: 0.0, y: 0.0 };
        prop_assert!(drag.begin(&origin, &transform));
        for (x, y) in moves {
            if let Some(next) = drag.update(&PointerSample { x, y }, transform, &frame) {
                transform = next;
            }
            prop_assert_eq!(transform.position().x, 0.0);
        }
        drag.end();
        prop_assert!(!drag.is_dragging());
    }

    #[test]
    fn export_surface_matches_output_resolution(
        kind in mask_kind(),
        width in 1u32..48,
        height in 1u32..48,
        zoom_t in 0.0f64..=1.0,
        raw_x in -500.0f64..500.0,
        raw_y in -500.0f64..500.0,
    ) {
        let frame = frame_for(kind, width, height, 600.0);
        let fitted = ImageTransform::fit(&frame, 3.0);
        let zoom = fitted.min_zoom() + zoom_t * (fitted.max_zoom() - fitted.min_zoom());
        let transform = fitted.with_zoom(zoom, &frame).with_pan(PanOffset::new(raw_x, raw_y), &frame);

        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([30, 60, 90])));
        let mut surface = CanvasSurface::new(frame.mask.output_width, frame.mask.output_height)
            .expect("surface should be created");
        surface
            .draw_region(&source, crop_region(&frame, &transform), FilterType::Triangle)
            .expect("draw should succeed");

        let pixels = surface.into_pixels();
        prop_assert_eq!(pixels.dimensions(), (frame.mask.output_width, frame.mask.output_height));
    }
}
