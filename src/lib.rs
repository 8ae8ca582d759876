//! Keypoint detection, description and matching over a stream of camera frames.
//!
//! Every image handed to the [`Tracker`] becomes a [`Frame`] holding its
//! keypoints, their descriptors and the matches against the previous frame.
//! Only the most recent frames are kept, in a fixed capacity [`RingBuffer`].
//!
//! ```no_run
//! use kptrack::{Tracker, TrackerConfig};
//!
//! let mut tracker = Tracker::new(TrackerConfig::default())?;
//! for path in ["0000.png", "0001.png"] {
//!     let frame = tracker.track(image::open(path)?.to_luma8())?;
//!     println!("{} matches", frame.matches.len());
//! }
//! # Ok::<(), kptrack::Error>(())
//! ```

pub mod algorithms;
pub mod config;
pub mod descriptors;
pub mod detectors;
mod error;
pub mod frame;
pub mod matching;
pub mod ring_buffer;
mod tracker;
pub mod visualize;

pub use config::{DescriptorConfig, DetectorConfig, MatcherConfig, TrackerConfig};
pub use descriptors::{describe_keypoints, DescriptorType};
pub use detectors::{detect_keypoints, DetectorType};
pub use error::Error;
pub use frame::{Descriptor, FeatureMatch, Frame, KeyPoint};
pub use matching::{match_descriptors, MatcherType, SelectorType};
pub use ring_buffer::RingBuffer;
pub use tracker::Tracker;
