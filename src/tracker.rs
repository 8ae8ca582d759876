use std::time::Instant;

use image::GrayImage;
use log::*;

use crate::{
    config::TrackerConfig,
    descriptors::describe_keypoints,
    detectors::detect_keypoints,
    frame::Frame,
    matching::match_descriptors,
    ring_buffer::RingBuffer,
    Error,
};

/// Turns a stream of images into frames matched against their predecessor.
///
/// Only the most recent `buffer_size` frames are kept in memory.
pub struct Tracker {
    config: TrackerConfig,
    history: RingBuffer<Frame>,
    frames_seen: usize,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Result<Self, Error> {
        Ok(Self {
            history: RingBuffer::new(config.buffer_size)?,
            config,
            frames_seen: 0,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Frames held in memory, oldest first.
    pub fn history(&self) -> &RingBuffer<Frame> {
        &self.history
    }

    /// Number of frames tracked since construction, evicted ones included.
    pub fn frames_seen(&self) -> usize {
        self.frames_seen
    }

    /// Detect, describe and match the keypoints of `image`, then push it into
    /// the history. Returns the new frame.
    pub fn track(&mut self, image: GrayImage) -> Result<&Frame, Error> {
        let start = Instant::now();
        let config = &self.config;

        let keypoints = detect_keypoints(&image, config.detector, &config.detector_config)?;
        let (keypoints, descriptors) = describe_keypoints(
            keypoints,
            &image,
            config.descriptor,
            &config.descriptor_config,
        )?;

        let mut frame = Frame::new(image);
        frame.set_features(keypoints, descriptors)?;

        // Match the previous frame onto the new one
        if let Some(previous) = self.history.newest() {
            frame.matches = match_descriptors(
                previous.descriptors(),
                frame.descriptors(),
                config.matcher,
                config.selector,
                &config.matcher_config,
            );
        }

        info!(
            "frame {}: {} keypoints, {} matches in {:.3} ms",
            self.frames_seen,
            frame.keypoints().len(),
            frame.matches.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        if self.history.push(frame).is_some() {
            trace!("evicted oldest frame from history");
        }
        self.frames_seen += 1;

        self.history.newest().ok_or(Error::EmptyContainer)
    }

    /// Drop every frame from the history.
    pub fn reset(&mut self) {
        self.history.clear();
    }
}
