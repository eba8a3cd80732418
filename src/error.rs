pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while building or querying a consumer.
///
/// Construction and decode failures are fatal for the whole consumer: there
/// is no partial-success mode. Lookup misses are *not* errors; queries report
/// them as `Ok(None)` or an empty collection.
///
/// The enum is `Clone` because the mappings string is decoded lazily and a
/// cached failure is returned to every query that touches it.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("source map syntax error: {0}")]
    Syntax(String),
    #[error("unsupported source map version: {0:?}")]
    UnsupportedVersion(Option<u32>),
    #[error("invalid base64 character {0:?} in mappings")]
    InvalidBase64(char),
    #[error("a mapping is malformed: {0:?}")]
    MappingMalformed(String),
    #[error("a mapping references unknown source #{0}")]
    UnknownSourceReference(u32),
    #[error("a mapping references unknown name #{0}")]
    UnknownNameReference(u32),
    #[error("section #{0} breaks the offset order, offsets must be non-decreasing")]
    UnorderedSections(u32),
    #[error("section #{0} references its map by url, which is not supported")]
    SectionUrlUnsupported(u32),
    #[error("section #{0} has no inline map")]
    SectionWithoutMap(u32),
    #[error("line numbers are 1-based, got {0}")]
    LineOutOfRange(u32),
    #[error("{0:?} is not in the source map")]
    SourceMissing(String),
}

impl From<simd_json::Error> for Error {
    fn from(value: simd_json::Error) -> Self {
        Self::Syntax(value.to_string())
    }
}
