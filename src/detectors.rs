use std::{fmt, str::FromStr, time::Instant};

use akaze::Akaze;
use image::{DynamicImage, GrayImage};
use imageproc::corners::{corners_fast9, Corner};
use log::*;
use nalgebra::Point2;

use crate::{
    algorithms::{
        brief::{intensity_centroid_angle, PATCH_SIZE},
        corners::{harris_response, min_eigenvalue_response},
    },
    config::DetectorConfig,
    frame::{Descriptor, KeyPoint},
    Error,
};

/// Diameter of the Bresenham circle FAST tests against.
const FAST_DIAMETER: f32 = 7.0;

/// Keypoint detector families, keyed by their conventional names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorType {
    ShiTomasi,
    Harris,
    Fast,
    Brisk,
    Orb,
    Akaze,
    Sift,
}

impl DetectorType {
    pub fn name(self) -> &'static str {
        match self {
            Self::ShiTomasi => "SHITOMASI",
            Self::Harris => "HARRIS",
            Self::Fast => "FAST",
            Self::Brisk => "BRISK",
            Self::Orb => "ORB",
            Self::Akaze => "AKAZE",
            Self::Sift => "SIFT",
        }
    }
}

impl fmt::Display for DetectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DetectorType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "SHITOMASI" => Self::ShiTomasi,
            "HARRIS" => Self::Harris,
            "FAST" => Self::Fast,
            "BRISK" => Self::Brisk,
            "ORB" => Self::Orb,
            "AKAZE" => Self::Akaze,
            "SIFT" => Self::Sift,
            _ => return Err(Error::UnknownDetector(s.to_owned())),
        })
    }
}

/// Detect keypoints in a grayscale image with the selected detector.
pub fn detect_keypoints(
    image: &GrayImage,
    detector: DetectorType,
    config: &DetectorConfig,
) -> Result<Vec<KeyPoint>, Error> {
    let start = Instant::now();

    let keypoints = match detector {
        DetectorType::ShiTomasi => shi_tomasi_keypoints(image, config),
        DetectorType::Harris => harris_keypoints(image, config),
        DetectorType::Fast => fast_keypoints(image, config.fast_threshold),
        DetectorType::Orb => orb_keypoints(image, config),
        DetectorType::Akaze => akaze_keypoints(image, config.akaze_threshold),
        DetectorType::Brisk => return Err(Error::Unsupported("BRISK detector")),
        DetectorType::Sift => return Err(Error::Unsupported("SIFT detector")),
    };

    info!(
        "{} detection with n={} keypoints in {:.3} ms",
        detector,
        keypoints.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    Ok(keypoints)
}

/// Shi-Tomasi "good features to track": strongest local maxima of the minimum
/// eigenvalue, kept at least `min_distance` apart.
fn shi_tomasi_keypoints(image: &GrayImage, config: &DetectorConfig) -> Vec<KeyPoint> {
    let min_distance = config.min_distance();
    let max_corners =
        (image.width() * image.height()) as usize / min_distance.max(1.0) as usize;

    let response = min_eigenvalue_response(image, config.block_size);
    let threshold = config.quality_level * response.max();
    if threshold <= 0.0 {
        return Vec::new();
    }

    let mut candidates: Vec<(u32, u32, f32)> = Vec::new();
    for y in 0..response.height {
        for x in 0..response.width {
            let value = response.get(x, y);
            if value > threshold && response.is_local_max(x, y) {
                candidates.push((x, y, value));
            }
        }
    }
    candidates.sort_by(|a, b| b.2.total_cmp(&a.2));
    trace!("{} Shi-Tomasi candidates above {}", candidates.len(), threshold);

    let min_distance_sq = min_distance * min_distance;
    let mut keypoints: Vec<KeyPoint> = Vec::new();
    for (x, y, value) in candidates {
        if keypoints.len() >= max_corners {
            break;
        }
        let (x, y) = (x as f32, y as f32);
        let crowded = keypoints.iter().any(|kp| {
            let (dx, dy) = (kp.point.x - x, kp.point.y - y);
            dx * dx + dy * dy < min_distance_sq
        });
        if !crowded {
            keypoints.push(KeyPoint::new(x, y, config.block_size as f32).with_response(value));
        }
    }
    keypoints
}

/// Every pixel whose normalized Harris response exceeds the threshold.
fn harris_keypoints(image: &GrayImage, config: &DetectorConfig) -> Vec<KeyPoint> {
    let response = harris_response(image, config.block_size, config.harris_k);
    let (min, max) = (response.min(), response.max());
    if max - min <= f32::EPSILON {
        return Vec::new();
    }

    let mut keypoints = Vec::new();
    for y in 0..response.height {
        for x in 0..response.width {
            let normalized = (response.get(x, y) - min) * 255.0 / (max - min);
            if above_harris_threshold(normalized, config.harris_threshold) {
                keypoints.push(KeyPoint::new(x as f32, y as f32, 1.0).with_response(normalized));
            }
        }
    }
    keypoints
}

// the normalized response is truncated before it is compared
fn above_harris_threshold(normalized: f32, threshold: i32) -> bool {
    normalized as i32 > threshold
}

/// Uses FAST (Features from Accelerated Segment Test)
/// as a keypoint detector for features like corners in a grayscale image
fn fast_keypoints(image: &GrayImage, threshold: u8) -> Vec<KeyPoint> {
    corners_fast9(image, threshold)
        .into_iter()
        .map(|Corner { x, y, score }| {
            KeyPoint::new(x as f32, y as f32, FAST_DIAMETER).with_response(score)
        })
        .collect()
}

/// FAST corners ranked by their Harris response, with an intensity centroid
/// orientation for steering the descriptor.
fn orb_keypoints(image: &GrayImage, config: &DetectorConfig) -> Vec<KeyPoint> {
    const ORB_HARRIS_BLOCK: u32 = 7;

    let response = harris_response(image, ORB_HARRIS_BLOCK, config.harris_k);
    let mut keypoints: Vec<KeyPoint> = corners_fast9(image, config.fast_threshold)
        .into_iter()
        .map(|Corner { x, y, .. }| {
            KeyPoint::new(x as f32, y as f32, PATCH_SIZE as f32).with_response(response.get(x, y))
        })
        .collect();

    keypoints.sort_by(|a, b| b.response.total_cmp(&a.response));
    keypoints.truncate(config.orb_max_features);

    for keypoint in &mut keypoints {
        keypoint.angle = Some(intensity_centroid_angle(
            keypoint.point.x,
            keypoint.point.y,
            image,
        ));
    }
    keypoints
}

fn akaze_keypoints(image: &GrayImage, threshold: f64) -> Vec<KeyPoint> {
    akaze_features(image, threshold).0
}

/// Run AKAZE end to end, converting its output into this crate's types.
pub(crate) fn akaze_features(
    image: &GrayImage,
    threshold: f64,
) -> (Vec<KeyPoint>, Vec<Descriptor>) {
    let (keypoints, descriptors) =
        Akaze::new(threshold).extract(&DynamicImage::ImageLuma8(image.clone()));

    let keypoints = keypoints
        .into_iter()
        .map(|kp| KeyPoint {
            point: Point2::new(kp.point.0, kp.point.1),
            size: kp.size,
            angle: Some(kp.angle),
            response: kp.response,
            octave: kp.octave,
        })
        .collect();
    let descriptors = descriptors
        .iter()
        .map(|descriptor| Descriptor::new(*descriptor.bytes()))
        .collect();

    (keypoints, descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::{drawing::draw_filled_rect_mut, rect::Rect};

    const SQUARE_CORNERS: [(f32, f32); 4] = [(20.0, 20.0), (43.0, 20.0), (20.0, 43.0), (43.0, 43.0)];

    fn white_square() -> GrayImage {
        let mut image = GrayImage::new(64, 64);
        draw_filled_rect_mut(&mut image, Rect::at(20, 20).of_size(24, 24), Luma([255]));
        image
    }

    fn near_square_corner(kp: &KeyPoint, tolerance: f32) -> bool {
        SQUARE_CORNERS.iter().any(|&(x, y)| {
            (kp.point.x - x).abs() <= tolerance && (kp.point.y - y).abs() <= tolerance
        })
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("shitomasi".parse::<DetectorType>().unwrap(), DetectorType::ShiTomasi);
        assert_eq!("AKAZE".parse::<DetectorType>().unwrap(), DetectorType::Akaze);
        for detector in [DetectorType::Harris, DetectorType::Fast, DetectorType::Orb] {
            assert_eq!(detector.to_string().parse::<DetectorType>().unwrap(), detector);
        }
        assert!(matches!(
            "SURF".parse::<DetectorType>(),
            Err(Error::UnknownDetector(name)) if name == "SURF"
        ));
    }

    #[test]
    fn unsupported_detectors_fail() {
        let image = white_square();
        let config = DetectorConfig::default();
        assert!(matches!(
            detect_keypoints(&image, DetectorType::Brisk, &config),
            Err(Error::Unsupported(_))
        ));
        assert!(matches!(
            detect_keypoints(&image, DetectorType::Sift, &config),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn shi_tomasi_finds_square_corners() {
        let keypoints =
            detect_keypoints(&white_square(), DetectorType::ShiTomasi, &DetectorConfig::default())
                .unwrap();
        assert!(!keypoints.is_empty());
        assert!(keypoints.iter().all(|kp| near_square_corner(kp, 4.0)));
        for &(x, y) in &SQUARE_CORNERS {
            assert!(keypoints
                .iter()
                .any(|kp| (kp.point.x - x).abs() <= 4.0 && (kp.point.y - y).abs() <= 4.0));
        }
        assert!(keypoints.iter().all(|kp| kp.size == 4.0));
    }

    #[test]
    fn shi_tomasi_respects_min_distance() {
        let config = DetectorConfig::default();
        let keypoints = detect_keypoints(&white_square(), DetectorType::ShiTomasi, &config).unwrap();
        for (i, a) in keypoints.iter().enumerate() {
            for b in &keypoints[i + 1..] {
                let d = (a.point - b.point).norm();
                assert!(d >= config.min_distance(), "{:?} and {:?} too close", a, b);
            }
        }
    }

    #[test]
    fn harris_finds_square_corners() {
        let keypoints =
            detect_keypoints(&white_square(), DetectorType::Harris, &DetectorConfig::default())
                .unwrap();
        assert!(!keypoints.is_empty());
        assert!(keypoints.iter().all(|kp| near_square_corner(kp, 5.0)));
        assert!(keypoints.iter().all(|kp| kp.size == 1.0));
        assert!(keypoints.iter().all(|kp| kp.response >= 201.0));
    }

    #[test]
    fn harris_threshold_truncates_response() {
        assert!(!above_harris_threshold(200.0, 200));
        assert!(!above_harris_threshold(200.9, 200));
        assert!(above_harris_threshold(201.0, 200));
        assert!(above_harris_threshold(255.0, 200));
    }

    #[test]
    fn flat_image_has_no_corners() {
        let image = GrayImage::from_pixel(48, 48, Luma([128]));
        let config = DetectorConfig::default();
        for detector in [
            DetectorType::ShiTomasi,
            DetectorType::Harris,
            DetectorType::Fast,
            DetectorType::Orb,
        ] {
            assert!(detect_keypoints(&image, detector, &config).unwrap().is_empty());
        }
    }

    #[test]
    fn akaze_finds_oriented_keypoints() {
        let mut image = GrayImage::from_pixel(160, 160, Luma([30]));
        draw_filled_rect_mut(&mut image, Rect::at(50, 50).of_size(40, 30), Luma([240]));
        imageproc::drawing::draw_filled_circle_mut(&mut image, (110, 115), 10, Luma([220]));

        let keypoints =
            detect_keypoints(&image, DetectorType::Akaze, &DetectorConfig::default()).unwrap();
        assert!(!keypoints.is_empty());
        assert!(keypoints.iter().all(|kp| kp.angle.is_some() && kp.size > 0.0));
        assert!(keypoints.iter().all(|kp| {
            (0.0..160.0).contains(&kp.point.x) && (0.0..160.0).contains(&kp.point.y)
        }));
    }

    #[test]
    fn orb_keeps_strongest_oriented_corners() {
        let config = DetectorConfig {
            orb_max_features: 2,
            ..Default::default()
        };
        let keypoints = detect_keypoints(&white_square(), DetectorType::Orb, &config).unwrap();
        assert!(keypoints.len() <= 2);
        assert!(keypoints.iter().all(|kp| kp.angle.is_some()));
        assert!(keypoints
            .windows(2)
            .all(|pair| pair[0].response >= pair[1].response));
    }
}
