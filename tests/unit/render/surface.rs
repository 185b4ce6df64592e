use super::*;

#[test]
fn extent_scales_and_rounds_up() {
    assert_eq!(pixel_extent(Size::new(100.0, 50.0), 1.0).unwrap(), (100, 50));
    assert_eq!(pixel_extent(Size::new(100.0, 50.0), 2.0).unwrap(), (200, 100));
    assert_eq!(pixel_extent(Size::new(10.2, 10.0), 1.5).unwrap(), (16, 15));
}

#[test]
fn extent_rejects_unmeasured_boxes_and_bad_scale() {
    assert!(pixel_extent(Size::new(0.0, 10.0), 1.0).is_err());
    assert!(pixel_extent(Size::new(10.0, f64::NAN), 1.0).is_err());
    assert!(pixel_extent(Size::new(10.0, 10.0), 0.0).is_err());
    assert!(!is_measured(Size::ZERO));
    assert!(is_measured(Size::new(1.0, 1.0)));
}

#[test]
fn unpremultiply_restores_straight_color() {
    let frame = FrameRGBA {
        width: 2,
        height: 1,
        data: vec![64, 32, 0, 128, 255, 255, 255, 255],
        premultiplied: true,
    };
    let straight = frame.to_straight_rgba8();
    assert_eq!(&straight[4..], &[255, 255, 255, 255]);
    assert_eq!(straight[3], 128);
    assert_eq!(straight[0], 128);
    assert_eq!(straight[1], 64);
}
