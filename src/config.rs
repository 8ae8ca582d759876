use crate::{
    descriptors::DescriptorType,
    detectors::DetectorType,
    matching::{MatcherType, SelectorType},
};

/// Parameters of the keypoint detectors.
#[derive(Debug, Clone, Copy)]
pub struct DetectorConfig {
    /// Window over which the structure tensor is summed (Shi-Tomasi, Harris)
    pub block_size: u32,
    /// Permitted overlap between Shi-Tomasi corners, in `[0, 1]`
    pub max_overlap: f32,
    /// Shi-Tomasi corners weaker than this fraction of the best one are dropped
    pub quality_level: f32,
    /// Harris free parameter `k`
    pub harris_k: f32,
    /// Harris threshold on the response normalized to `[0, 255]` and truncated
    /// to an integer
    pub harris_threshold: i32,
    /// Intensity difference threshold of FAST
    pub fast_threshold: u8,
    /// Number of features ORB keeps
    pub orb_max_features: usize,
    /// AKAZE detector response threshold
    pub akaze_threshold: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            block_size: 4,
            max_overlap: 0.0,
            quality_level: 0.01,
            harris_k: 0.04,
            harris_threshold: 200,
            fast_threshold: 30,
            orb_max_features: 500,
            akaze_threshold: 0.001,
        }
    }
}

impl DetectorConfig {
    /// Minimum distance between Shi-Tomasi corners.
    pub fn min_distance(&self) -> f32 {
        (1.0 - self.max_overlap) * self.block_size as f32
    }
}

/// Parameters of the descriptor extractors.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorConfig {
    /// Sigma of the Gaussian blur applied before sampling BRIEF tests
    pub smoothing_sigma: f32,
    /// AKAZE detector threshold used when recomputing AKAZE descriptors
    pub akaze_threshold: f64,
}

impl Default for DescriptorConfig {
    fn default() -> Self {
        Self {
            smoothing_sigma: 2.0,
            akaze_threshold: DetectorConfig::default().akaze_threshold,
        }
    }
}

/// Parameters of descriptor matching.
#[derive(Debug, Clone, Copy)]
pub struct MatcherConfig {
    /// Lowe's ratio: a kNN match is accepted when `d1 < ratio * d2`
    pub ratio: f32,
    /// Only keep matches that are the best match in both directions
    pub cross_check: bool,
    /// Number of LSH tables of the approximate matcher
    pub lsh_tables: usize,
    /// Bits per LSH key
    pub lsh_key_bits: usize,
    /// Seed of the LSH bit selection
    pub lsh_seed: u64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            ratio: 0.8,
            cross_check: false,
            lsh_tables: 12,
            lsh_key_bits: 20,
            lsh_seed: 42,
        }
    }
}

/// Everything the [`Tracker`](crate::Tracker) needs to process frames.
#[derive(Debug, Clone, Copy)]
pub struct TrackerConfig {
    pub detector: DetectorType,
    pub descriptor: DescriptorType,
    pub matcher: MatcherType,
    pub selector: SelectorType,
    /// Number of frames held in memory at the same time
    pub buffer_size: usize,
    pub detector_config: DetectorConfig,
    pub descriptor_config: DescriptorConfig,
    pub matcher_config: MatcherConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            detector: DetectorType::ShiTomasi,
            descriptor: DescriptorType::Brief,
            matcher: MatcherType::BruteForce,
            selector: SelectorType::KNearestNeighbors,
            buffer_size: 2,
            detector_config: DetectorConfig::default(),
            descriptor_config: DescriptorConfig::default(),
            matcher_config: MatcherConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Convenience constructor for the common case of picking the algorithms
    /// and keeping every parameter at its default.
    pub fn new(
        detector: DetectorType,
        descriptor: DescriptorType,
        matcher: MatcherType,
        selector: SelectorType,
    ) -> Self {
        Self {
            detector,
            descriptor,
            matcher,
            selector,
            ..Default::default()
        }
    }
}
