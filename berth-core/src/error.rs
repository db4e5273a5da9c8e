/// Errors produced by the `berth-core` crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CoreError {
    /// An image reference could not be split into repository, tag and digest.
    #[error("invalid image reference '{reference}': {reason}")]
    InvalidImageReference { reference: String, reason: String },

    /// A requested container state is not one of `running` or `stopped`.
    #[error("Invalid status")]
    InvalidDesiredState { value: String },

    /// A container command line could not be split into words.
    #[error("invalid command '{command}': {reason}")]
    InvalidCommand { command: String, reason: String },
}
