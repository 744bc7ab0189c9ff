use thiserror::Error;

pub type CodecResult<T> = Result<T, CodecError>;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised only during decryption: the source is not a well-formed
    /// encrypted file, or the passphrase is wrong. Without an integrity tag
    /// the two cannot be told apart.
    #[error("format error: {0}")]
    Format(String),
}
