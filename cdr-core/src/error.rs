use thiserror::Error;

/// Main error type for CDR encoding and decoding
///
/// Every failure of the engine is reported through one of these kinds. The
/// engine wraps the innermost failure once in [`CdrError::Context`], which
/// carries the dotted field path and the byte offset where it happened; use
/// [`CdrError::root`] to get at the underlying kind.
#[derive(Error, Debug)]
pub enum CdrError {
    #[error("Out of data: need {needed} bits, {remaining} bits remaining")]
    OutOfData { needed: u64, remaining: u64 },

    #[error("Alignment padding bits are not zero")]
    NonZeroPadding,

    #[error("Invalid length encoding: {0}")]
    InvalidLengthEncoding(String),

    #[error("Constraint range {0} is larger than 65536")]
    RangeTooLarge(u128),

    #[error("Invalid CHOICE index {index} ({alternatives} alternatives declared)")]
    InvalidChoiceIndex { index: u64, alternatives: usize },

    #[error("Open type reference value {0} matches no alternative")]
    OpenTypeReferenceMismatch(i64),

    #[error("Unsupported ASN.1 type: {0}")]
    UnsupportedType(String),

    #[error("Malformed schema: {0}")]
    UnexportedOrMalformedSchema(String),

    #[error("Value does not match schema: {0}")]
    ValueMismatch(String),

    #[error("Value out of range: {0}")]
    ValueOutOfRange(String),

    #[error("Unexpected tag: expected {expected}, found {found}")]
    UnexpectedTag { expected: String, found: String },

    #[error("{0} trailing bytes after the decoded value")]
    TrailingData(u64),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{source} (at `{path}`, byte offset {offset})")]
    Context {
        path: String,
        offset: u64,
        #[source]
        source: Box<CdrError>,
    },
}

impl CdrError {
    /// Shorthand for [`CdrError::OutOfData`]
    pub fn out_of_data(needed: u64, remaining: u64) -> Self {
        CdrError::OutOfData { needed, remaining }
    }

    /// Attach a field path segment and byte offset
    ///
    /// The offset of the innermost failure is kept; path segments added by
    /// enclosing containers are prepended, so the final error reads like
    /// `listOfMultipleUnitUsage.0.ratingGroup`.
    pub fn with_context(self, segment: &str, offset: u64) -> Self {
        match self {
            CdrError::Context { path, offset: inner, source } => CdrError::Context {
                path: join_path(segment, &path),
                offset: inner,
                source,
            },
            other => CdrError::Context {
                path: segment.to_string(),
                offset,
                source: Box::new(other),
            },
        }
    }

    /// The error kind without any context wrapping
    pub fn root(&self) -> &CdrError {
        match self {
            CdrError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Dotted field path of the failure, if known
    pub fn path(&self) -> Option<&str> {
        match self {
            CdrError::Context { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Byte offset of the failure, if known
    pub fn offset(&self) -> Option<u64> {
        match self {
            CdrError::Context { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

fn join_path(outer: &str, inner: &str) -> String {
    match (outer.is_empty(), inner.is_empty()) {
        (true, _) => inner.to_string(),
        (_, true) => outer.to_string(),
        _ => format!("{}.{}", outer, inner),
    }
}

/// Result type alias for CDR operations
pub type CdrResult<T> = Result<T, CdrError>;
