//! Decode → normalize → overlay over a folder of mixed-size photos.

use std::time::{Duration, UNIX_EPOCH};

use folderlapse_common::clock::format_overlay_timestamp;
use folderlapse_processing_core::{CanvasSize, Frame, FrameNormalizer, OverlayRenderer};
use image::{Rgb, RgbImage};

fn photo(width: u32, height: u32, shade: u8) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([shade, shade / 2, 255 - shade]))
}

#[test]
fn mixed_sizes_share_one_canvas() {
    let dir = tempfile::tempdir().unwrap();
    let sources = [
        ("landscape.png", photo(400, 300, 40)),
        ("widescreen.png", photo(192, 108, 120)),
        ("portrait.jpg", photo(90, 160, 200)),
    ];

    let renderer = OverlayRenderer::bundled().unwrap();
    let mut normalizer = FrameNormalizer::new(128);
    let stamp = UNIX_EPOCH + Duration::from_secs(1_690_412_400);

    let mut sizes = Vec::new();
    for (name, image) in &sources {
        let path = dir.path().join(name);
        image.save(&path).unwrap();

        let frame = Frame::load(&path, stamp).unwrap();
        let mut canvas = normalizer.normalize(frame.image);
        renderer.annotate(
            &mut canvas,
            Some(&format_overlay_timestamp(frame.timestamp)),
            Some("roof cam"),
        );
        sizes.push(canvas.dimensions());
    }

    assert_eq!(normalizer.canvas(), Some(CanvasSize::new(128, 96)));
    assert!(sizes.iter().all(|&s| s == (128, 96)));
}

#[test]
fn zero_width_keeps_first_frame_geometry() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("a.png");
    let second = dir.path().join("b.png");
    photo(33, 21, 10).save(&first).unwrap();
    photo(64, 64, 10).save(&second).unwrap();

    let mut normalizer = FrameNormalizer::new(0);
    let a = normalizer.normalize(Frame::load(&first, UNIX_EPOCH).unwrap().image);
    let b = normalizer.normalize(Frame::load(&second, UNIX_EPOCH).unwrap().image);

    assert_eq!(a.dimensions(), (33, 21));
    assert_eq!(b.dimensions(), (33, 21));
    // 64x64 fits as 21x21, centered with the odd pixel on the right: columns 6..27.
    assert_eq!(b.get_pixel(5, 10), &Rgb([0, 0, 0]));
    assert_eq!(b.get_pixel(27, 10), &Rgb([0, 0, 0]));
    assert_ne!(b.get_pixel(16, 10), &Rgb([0, 0, 0]));
}
