use image::{imageops, DynamicImage, Pixel, Rgba, RgbaImage};
use imageproc::drawing;
use once_cell::sync::Lazy;

use crate::frame::Frame;

/// Draw every keypoint of `frame` as a circle of its size.
pub fn draw_keypoints(frame: &Frame) -> RgbaImage {
    let mut canvas = DynamicImage::ImageLuma8(frame.image.clone()).to_rgba8();
    for keypoint in frame.keypoints() {
        drawing::draw_hollow_circle_mut(
            &mut canvas,
            (keypoint.point.x as i32, keypoint.point.y as i32),
            radius(keypoint.size),
            *GREEN,
        );
    }
    canvas
}

/// Put `previous` and `current` side by side and connect matched keypoints.
pub fn draw_matches(previous: &Frame, current: &Frame) -> RgbaImage {
    let offset = previous.image.width();
    let mut canvas = RgbaImage::new(
        offset + current.image.width(),
        previous.image.height().max(current.image.height()),
    );
    imageops::overlay(
        &mut canvas,
        &DynamicImage::ImageLuma8(previous.image.clone()).to_rgba8(),
        0,
        0,
    );
    imageops::overlay(
        &mut canvas,
        &DynamicImage::ImageLuma8(current.image.clone()).to_rgba8(),
        offset as i64,
        0,
    );

    for (kp1, kp2) in current.matched_keypoints(previous) {
        let from = (kp1.point.x, kp1.point.y);
        let to = (kp2.point.x + offset as f32, kp2.point.y);

        drawing::draw_hollow_circle_mut(&mut canvas, (from.0 as i32, from.1 as i32), 2, *RED);
        drawing::draw_hollow_circle_mut(&mut canvas, (to.0 as i32, to.1 as i32), 2, *GREEN);
        // draw line connecting past to present features
        drawing::draw_line_segment_mut(&mut canvas, from, to, *BLUE);
    }
    canvas
}

fn radius(size: f32) -> i32 {
    ((size / 2.0).round() as i32).max(1)
}

static RED: Lazy<Rgba<u8>> = Lazy::new(|| *Rgba::from_slice(&[255, 0, 0, 255]));
static BLUE: Lazy<Rgba<u8>> = Lazy::new(|| *Rgba::from_slice(&[0, 0, 255, 255]));
static GREEN: Lazy<Rgba<u8>> = Lazy::new(|| *Rgba::from_slice(&[0, 255, 0, 255]));
