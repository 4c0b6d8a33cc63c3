//! Errors
//!
//! Custom error types used throughout the `cartree` crate.
use thiserror::Error;

/// Errors that can occur while decoding a CART export or assembling a tree.
#[derive(Debug, Error)]
pub enum CartError {
    /// Input tables disagree with each other or with the export format.
    #[error("Malformed model input: {0}.")]
    MalformedInput(String),
    /// A split node addresses a child position missing from the node table.
    #[error("Node {parent} is a split node, but child position {child} is missing from the node table.")]
    MissingChild { parent: u64, child: u64 },
    /// Binary indices do not describe a valid rooted binary tree.
    #[error("Invalid binary index addressing: {0}.")]
    InvalidIndex(String),
    /// An operation was applied to a node that does not satisfy its preconditions.
    #[error("Precondition failed: {0}.")]
    Precondition(String),
    /// Unable to read model from a file or string.
    #[error("Unable to read model: {0}")]
    UnableToRead(String),
    /// Unable to write model to a file.
    #[error("Unable to write model to file: {0}")]
    UnableToWrite(String),
}
