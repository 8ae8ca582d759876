use bitarray::BitArray;
use image::GrayImage;
use nalgebra::Point2;

use crate::Error;

/// Number of bytes in a binary descriptor (512 bits).
pub const DESCRIPTOR_SIZE: usize = 512 / u8::BITS as usize;

/// Binary descriptor shared by every supported extractor.
pub type Descriptor = BitArray<DESCRIPTOR_SIZE>;

/// A point of interest in an image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyPoint {
    /// Pixel location, +x to the right and +y down from the top left corner.
    pub point: Point2<f32>,
    /// Diameter of the meaningful neighbourhood around the point.
    pub size: f32,
    /// Orientation in radians, `None` when the detector does not compute one.
    pub angle: Option<f32>,
    /// Detector response, higher is stronger.
    pub response: f32,
    /// Scale space level the point was found in.
    pub octave: usize,
}

impl KeyPoint {
    pub fn new(x: f32, y: f32, size: f32) -> Self {
        Self {
            point: Point2::new(x, y),
            size,
            angle: None,
            response: 0.0,
            octave: 0,
        }
    }

    pub fn with_response(mut self, response: f32) -> Self {
        self.response = response;
        self
    }
}

/// Correspondence between a keypoint of the previous frame (`source`) and a
/// keypoint of the current frame (`reference`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureMatch {
    pub source: usize,
    pub reference: usize,
    /// Hamming distance between the two descriptors.
    pub distance: u32,
}

/// Sensor state at one time instant.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: GrayImage,
    keypoints: Vec<KeyPoint>,
    descriptors: Vec<Descriptor>,
    /// Matches from the previous frame onto this one.
    pub matches: Vec<FeatureMatch>,
}

impl Frame {
    pub fn new(image: GrayImage) -> Self {
        Self {
            image,
            keypoints: Vec::new(),
            descriptors: Vec::new(),
            matches: Vec::new(),
        }
    }

    /// Stores keypoints together with their descriptors, one row per keypoint.
    pub fn set_features(
        &mut self,
        keypoints: Vec<KeyPoint>,
        descriptors: Vec<Descriptor>,
    ) -> Result<(), Error> {
        if keypoints.len() != descriptors.len() {
            return Err(Error::MisalignedDescriptors {
                keypoints: keypoints.len(),
                descriptors: descriptors.len(),
            });
        }
        self.keypoints = keypoints;
        self.descriptors = descriptors;
        Ok(())
    }

    pub fn keypoints(&self) -> &[KeyPoint] {
        &self.keypoints
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    /// Keypoint pairs `(previous, current)` for every stored match.
    pub fn matched_keypoints<'a>(
        &'a self,
        previous: &'a Frame,
    ) -> impl Iterator<Item = (&'a KeyPoint, &'a KeyPoint)> + 'a {
        self.matches.iter().filter_map(move |m| {
            Some((
                previous.keypoints.get(m.source)?,
                self.keypoints.get(m.reference)?,
            ))
        })
    }
}
