use std::io;
use thiserror::Error;

/// Everything that can go wrong while reading a .bvh document or posing its skeleton.
#[derive(Error, Debug)]
pub enum BvhError {
    /// I/O error while reading a .bvh file from disk
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The document does not follow the .bvh grammar. `line` is 1-based.
    #[error("Parse error at line {line}: {message} (`{text}`)")]
    Parse {
        line: usize,
        text: String,
        message: String,
    },

    /// Requested frame is not in `[0, num_frames)`
    #[error("Frame {frame} is out of range, motion has {num_frames} frames")]
    FrameOutOfRange { frame: usize, num_frames: usize },

    /// A motion row is too short for the number of joints being posed
    #[error("Channel mismatch: {needed} channels needed, motion row has {available}")]
    ChannelMismatch { needed: usize, available: usize },

    /// Parent and offset tables passed to forward kinematics differ in length
    #[error("Shape mismatch: {parents} parent entries but {offsets} offsets")]
    ShapeMismatch { parents: usize, offsets: usize },

    /// Parent table breaks the parent-before-child or single-root ordering
    #[error("Invalid hierarchy: {0}")]
    InvalidHierarchy(String),
}

impl BvhError {
    pub(crate) fn parse(line_index: usize, text: &str, message: impl Into<String>) -> Self {
        BvhError::Parse {
            line: line_index + 1,
            text: text.trim().to_string(),
            message: message.into(),
        }
    }
}

/// Result type using BvhError
pub type Result<T> = std::result::Result<T, BvhError>;
