//! Collection of general algorithms the detectors, extractors and
//! matchers are assembled from

pub mod brief;
pub mod corners;
pub mod lsh;
