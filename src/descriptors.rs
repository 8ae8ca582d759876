use std::{collections::HashMap, fmt, str::FromStr, time::Instant};

use image::GrayImage;
use imageproc::filter::gaussian_blur_f32;
use log::*;

use crate::{
    algorithms::brief::{compute_descriptor, intensity_centroid_angle},
    config::DescriptorConfig,
    detectors::akaze_features,
    frame::{Descriptor, KeyPoint},
    Error,
};

/// Descriptor extractor families, keyed by their conventional names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorType {
    Brisk,
    Brief,
    Orb,
    Freak,
    Akaze,
    Sift,
}

impl DescriptorType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Brisk => "BRISK",
            Self::Brief => "BRIEF",
            Self::Orb => "ORB",
            Self::Freak => "FREAK",
            Self::Akaze => "AKAZE",
            Self::Sift => "SIFT",
        }
    }
}

impl fmt::Display for DescriptorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DescriptorType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "BRISK" => Self::Brisk,
            "BRIEF" => Self::Brief,
            "ORB" => Self::Orb,
            "FREAK" => Self::Freak,
            "AKAZE" => Self::Akaze,
            "SIFT" => Self::Sift,
            _ => return Err(Error::UnknownDescriptor(s.to_owned())),
        })
    }
}

/// Describe `keypoints` of `image` with the selected extractor.
///
/// Returns the keypoints that could be described together with their
/// descriptors, one descriptor per keypoint in the same order. Keypoints
/// whose patch leaves the image are dropped.
pub fn describe_keypoints(
    keypoints: Vec<KeyPoint>,
    image: &GrayImage,
    descriptor: DescriptorType,
    config: &DescriptorConfig,
) -> Result<(Vec<KeyPoint>, Vec<Descriptor>), Error> {
    let start = Instant::now();
    let requested = keypoints.len();

    let (keypoints, descriptors) = match descriptor {
        DescriptorType::Brief => brief_features(keypoints, image, config, false),
        DescriptorType::Orb => brief_features(keypoints, image, config, true),
        DescriptorType::Akaze => akaze_descriptors(keypoints, image, config),
        DescriptorType::Brisk => return Err(Error::Unsupported("BRISK descriptor")),
        DescriptorType::Freak => return Err(Error::Unsupported("FREAK descriptor")),
        DescriptorType::Sift => return Err(Error::Unsupported("SIFT descriptor")),
    };

    debug!("{} of {} keypoints described", descriptors.len(), requested);
    info!(
        "{} descriptor extraction in {:.3} ms",
        descriptor,
        start.elapsed().as_secs_f64() * 1000.0
    );

    Ok((keypoints, descriptors))
}

/// Applies BRIEF (Binary Robust Independent Elementary Features) to compute
/// descriptors for keypoints, optionally steered by the keypoint orientation.
fn brief_features(
    keypoints: Vec<KeyPoint>,
    image: &GrayImage,
    config: &DescriptorConfig,
    steered: bool,
) -> (Vec<KeyPoint>, Vec<Descriptor>) {
    // apply a gaussian blur to the image before sampling the tests,
    // that way the descriptor is not overly sensitive to high frequency noise.
    let smoothed_image = gaussian_blur_f32(image, config.smoothing_sigma);

    keypoints
        .into_iter()
        .filter_map(|mut keypoint| {
            let angle = if steered {
                let angle = keypoint.angle.unwrap_or_else(|| {
                    intensity_centroid_angle(keypoint.point.x, keypoint.point.y, image)
                });
                keypoint.angle = Some(angle);
                Some(angle)
            } else {
                None
            };
            let descriptor =
                compute_descriptor(keypoint.point.x, keypoint.point.y, angle, &smoothed_image)?;
            Some((keypoint, descriptor))
        })
        .unzip()
}

/// AKAZE descriptors can only be computed inside AKAZE's own scale space, so
/// the image is run through AKAZE again and the descriptors of coinciding
/// keypoints are kept.
fn akaze_descriptors(
    keypoints: Vec<KeyPoint>,
    image: &GrayImage,
    config: &DescriptorConfig,
) -> (Vec<KeyPoint>, Vec<Descriptor>) {
    let (akaze_keypoints, akaze_descriptors) = akaze_features(image, config.akaze_threshold);

    let by_location: HashMap<(u32, u32), usize> = akaze_keypoints
        .iter()
        .enumerate()
        .map(|(i, kp)| ((kp.point.x.to_bits(), kp.point.y.to_bits()), i))
        .collect();

    let requested = keypoints.len();
    let (keypoints, descriptors): (Vec<KeyPoint>, Vec<Descriptor>) = keypoints
        .into_iter()
        .filter_map(|keypoint| {
            let i = by_location.get(&(keypoint.point.x.to_bits(), keypoint.point.y.to_bits()))?;
            Some((keypoint, akaze_descriptors[*i]))
        })
        .unzip();

    if keypoints.len() < requested {
        warn!(
            "AKAZE descriptors need AKAZE keypoints, dropped {} keypoints",
            requested - keypoints.len()
        );
    }
    (keypoints, descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::draw_filled_circle_mut;

    fn textured_image() -> GrayImage {
        GrayImage::from_fn(80, 80, |x, y| Luma([((x * 7) ^ (y * 13)) as u8]))
    }

    fn blobs() -> GrayImage {
        let mut image = GrayImage::from_pixel(160, 160, Luma([30]));
        for (center, radius, value) in [
            ((40, 40), 8, 220),
            ((110, 45), 12, 250),
            ((60, 110), 6, 200),
            ((115, 115), 10, 240),
        ] {
            draw_filled_circle_mut(&mut image, center, radius, Luma([value]));
        }
        image
    }

    #[test]
    fn parses_names() {
        assert_eq!("brief".parse::<DescriptorType>().unwrap(), DescriptorType::Brief);
        assert_eq!("FREAK".parse::<DescriptorType>().unwrap(), DescriptorType::Freak);
        assert!(matches!(
            "BREIF".parse::<DescriptorType>(),
            Err(Error::UnknownDescriptor(_))
        ));
    }

    #[test]
    fn unsupported_descriptors_fail() {
        let config = DescriptorConfig::default();
        for descriptor in [
            DescriptorType::Brisk,
            DescriptorType::Freak,
            DescriptorType::Sift,
        ] {
            assert!(matches!(
                describe_keypoints(Vec::new(), &textured_image(), descriptor, &config),
                Err(Error::Unsupported(_))
            ));
        }
    }

    #[test]
    fn border_keypoints_are_dropped_in_step() {
        let keypoints = vec![
            KeyPoint::new(2.0, 2.0, 7.0),
            KeyPoint::new(40.0, 40.0, 7.0),
            KeyPoint::new(79.0, 40.0, 7.0),
            KeyPoint::new(30.0, 50.0, 7.0),
        ];
        let (kept, descriptors) = describe_keypoints(
            keypoints,
            &textured_image(),
            DescriptorType::Brief,
            &DescriptorConfig::default(),
        )
        .unwrap();
        assert_eq!(kept.len(), descriptors.len());
        assert_eq!(
            kept.iter().map(|kp| (kp.point.x, kp.point.y)).collect::<Vec<_>>(),
            vec![(40.0, 40.0), (30.0, 50.0)]
        );
    }

    #[test]
    fn orb_assigns_orientation() {
        let (kept, _) = describe_keypoints(
            vec![KeyPoint::new(40.0, 40.0, 31.0)],
            &textured_image(),
            DescriptorType::Orb,
            &DescriptorConfig::default(),
        )
        .unwrap();
        assert_eq!(kept.len(), 1);
        assert!(kept[0].angle.is_some());
    }

    #[test]
    fn akaze_keypoints_keep_their_descriptors() {
        let image = blobs();
        let keypoints = crate::detect_keypoints(
            &image,
            crate::DetectorType::Akaze,
            &crate::DetectorConfig::default(),
        )
        .unwrap();
        assert!(!keypoints.is_empty());

        let (kept, descriptors) = describe_keypoints(
            keypoints.clone(),
            &image,
            DescriptorType::Akaze,
            &DescriptorConfig::default(),
        )
        .unwrap();
        assert_eq!(kept.len(), keypoints.len());
        assert_eq!(kept.len(), descriptors.len());

        // the same keypoints come back with the descriptors AKAZE computed for them
        let (akaze_keypoints, akaze_descriptors) =
            akaze_features(&image, DescriptorConfig::default().akaze_threshold);
        for (keypoint, descriptor) in kept.iter().zip(&descriptors) {
            let i = akaze_keypoints
                .iter()
                .position(|kp| kp.point == keypoint.point)
                .unwrap();
            assert_eq!(*descriptor, akaze_descriptors[i]);
        }
    }

    #[test]
    fn akaze_drops_foreign_keypoints() {
        let (kept, descriptors) = describe_keypoints(
            vec![KeyPoint::new(3.25, 150.75, 7.0)],
            &blobs(),
            DescriptorType::Akaze,
            &DescriptorConfig::default(),
        )
        .unwrap();
        assert!(kept.is_empty());
        assert!(descriptors.is_empty());
    }
}
