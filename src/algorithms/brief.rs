use image::GrayImage;
use once_cell::sync::Lazy;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::frame::{Descriptor, DESCRIPTOR_SIZE};

/// Side of the square patch the sampling pattern lives in.
pub const PATCH_SIZE: u32 = 31;

/// Every sample offset lies within this distance of the keypoint, rotated or not.
pub const PATCH_RADIUS: i32 = (PATCH_SIZE / 2) as i32;

const NUM_TESTS: usize = DESCRIPTOR_SIZE * u8::BITS as usize;

/// Compute the BRIEF (Binary Robust Independent Elementary Features) descriptor
/// of the keypoint at `(x, y)` on a smoothed grayscale image.
///
/// When `angle` is given the sampling pattern is rotated by it first, which is
/// the steered BRIEF used by ORB.
///
/// Returns `None` when the patch does not fit inside the image.
pub fn compute_descriptor(
    x: f32,
    y: f32,
    angle: Option<f32>,
    image: &GrayImage,
) -> Option<Descriptor> {
    let (cx, cy) = (x.round() as i32, y.round() as i32);
    if !patch_fits(cx, cy, image) {
        return None;
    }

    let (sin, cos) = angle.unwrap_or(0.0).sin_cos();
    let rotate = |px: f32, py: f32| {
        (
            cx + (cos * px - sin * py).round() as i32,
            cy + (sin * px + cos * py).round() as i32,
        )
    };

    let mut bytes = [0u8; DESCRIPTOR_SIZE];
    for (bit, [p1x, p1y, p2x, p2y]) in BRIEF512_SAMPLES.iter().enumerate() {
        let (x1, y1) = rotate(*p1x, *p1y);
        let (x2, y2) = rotate(*p2x, *p2y);

        // patch_fits() keeps every rotated sample inside the image
        let first = image.get_pixel(x1 as u32, y1 as u32).0[0];
        let second = image.get_pixel(x2 as u32, y2 as u32).0[0];

        if first < second {
            bytes[bit / u8::BITS as usize] |= 1 << (bit % u8::BITS as usize);
        }
    }

    Some(Descriptor::new(bytes))
}

/// Orientation of the intensity centroid of the disc around `(x, y)`.
///
/// Returns `0.0` when the patch does not fit or carries no intensity.
pub fn intensity_centroid_angle(x: f32, y: f32, image: &GrayImage) -> f32 {
    let (cx, cy) = (x.round() as i32, y.round() as i32);
    if !patch_fits(cx, cy, image) {
        return 0.0;
    }

    let (mut m01, mut m10) = (0f32, 0f32);
    for dy in -PATCH_RADIUS..=PATCH_RADIUS {
        for dx in -PATCH_RADIUS..=PATCH_RADIUS {
            if dx * dx + dy * dy > PATCH_RADIUS * PATCH_RADIUS {
                continue;
            }
            let intensity = image.get_pixel((cx + dx) as u32, (cy + dy) as u32).0[0] as f32;
            m10 += dx as f32 * intensity;
            m01 += dy as f32 * intensity;
        }
    }

    if m01 == 0.0 && m10 == 0.0 {
        0.0
    } else {
        m01.atan2(m10)
    }
}

fn patch_fits(cx: i32, cy: i32, image: &GrayImage) -> bool {
    cx - PATCH_RADIUS >= 0
        && cy - PATCH_RADIUS >= 0
        && cx + PATCH_RADIUS < image.width() as i32
        && cy + PATCH_RADIUS < image.height() as i32
}

/// Precomputed point pairs for the 512 BRIEF tests.
/// The values remain consistent accross frames, because descriptors of the
/// same point have to be comparable between frames.
static BRIEF512_SAMPLES: Lazy<Vec<[f32; 4]>> = Lazy::new(|| {
    // use reproducible random numbers so that every run shares one pattern
    let mut rng = StdRng::seed_from_u64(42);

    // isotropic Gaussian with sigma = S / 5, as recommended by the BRIEF paper
    let sigma = PATCH_SIZE as f32 / 5.0;
    let normal_dist = Normal::new(0f32, sigma).expect("sigma is finite and positive");
    let radius = PATCH_RADIUS as f32;

    // keep points inside the disc so that any rotation stays in the patch
    let mut sample_point = || loop {
        let (px, py) = (normal_dist.sample(&mut rng), normal_dist.sample(&mut rng));
        if px * px + py * py <= radius * radius {
            return (px, py);
        }
    };

    (0..NUM_TESTS)
        .map(|_| {
            let (p1x, p1y) = sample_point();
            let (p2x, p2y) = sample_point();
            [p1x, p1y, p2x, p2y]
        })
        .collect()
});
