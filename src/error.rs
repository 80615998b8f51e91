use thiserror::Error;

/// Errors raised while decoding an asset buffer.
///
/// Every variant aborts the parse that raised it and leaves the target
/// undecoded; the decoders never panic on malformed input. Looking up a
/// missing animation action is not an error — it is logged and ignored.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Bad magic signature, bad version or malformed header grammar.
    #[error("invalid format: {0}")]
    Format(String),

    /// Zero or irreconcilable dimensions or element counts.
    #[error("invalid dimensions: {0}")]
    Dimension(String),

    /// The container uses an encoding this crate does not decode.
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// The buffer ended before the declared data did.
    #[error("unexpected end of buffer at offset {offset}")]
    UnexpectedEof { offset: usize },
}
