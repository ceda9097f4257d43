use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("message is empty")]
    Empty,

    #[error("message does not start with an MSH segment")]
    MissingHeader,

    #[error("MSH header is truncated")]
    TruncatedHeader,

    #[error("MSH-2 must carry four distinct encoding characters")]
    InvalidEncodingCharacters,

    #[error("invalid segment code '{0}'")]
    InvalidSegmentCode(String),
}
