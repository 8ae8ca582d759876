use thiserror::Error;

/// Everything that can go wrong while building or tracking frames.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("attempted to remove an element from an empty container")]
    EmptyContainer,
    #[error("unknown detector type `{0}`")]
    UnknownDetector(String),
    #[error("unknown descriptor type `{0}`")]
    UnknownDescriptor(String),
    #[error("unknown matcher type `{0}`")]
    UnknownMatcher(String),
    #[error("unknown selector type `{0}`")]
    UnknownSelector(String),
    #[error("{0} is not available in this build")]
    Unsupported(&'static str),
    #[error("{keypoints} keypoints cannot be paired with {descriptors} descriptors")]
    MisalignedDescriptors { keypoints: usize, descriptors: usize },
    #[error(transparent)]
    Image(#[from] image::ImageError),
}
