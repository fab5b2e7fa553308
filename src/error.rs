use std::fmt::{self, Display};

/// Every error the library can report, as a single flat tag.
///
/// The parser only ever *returns* [`Error::OutOfMemory`] and
/// [`Error::ParseAborted`]; the remaining parse conditions are recoverable
/// and reach the caller through the error-logger callback together with the
/// line they occurred on. Retrieval and value errors are returned
/// synchronously from the API that detected them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The arena backing the document is exhausted.
    OutOfMemory,
    /// The error logger asked the parser to stop.
    ParseAborted,

    /// A section, key, or index was not present.
    NotFound,
    /// An empty name was given where a non-empty one is required.
    InvalidKey,
    /// The section handle does not belong to this document.
    InvalidSection,
    /// The section is not of the requested kind.
    SectionType,

    /// A value string does not match the format it was interpreted as.
    ValueFormat,
    /// A value was out of range for the requested type and has been clamped.
    ValueRange,

    MissingEndQuote,
    TextInvalidEscape,
    TextOutsideSection,
    TextAfterEndQuote,
    TextAfterSectionHeader,
    SectionHeaderUnclosed,
    SectionNameEmpty,
    SectionNameReused,
    TableKeyReused,
    TableEntryMissingEquals,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Error::OutOfMemory => "out of memory",
            Error::ParseAborted => "parse aborted",
            Error::NotFound => "not found",
            Error::InvalidKey => "invalid key",
            Error::InvalidSection => "invalid section",
            Error::SectionType => "incorrect section type",
            Error::ValueFormat => "incorrect value format",
            Error::ValueRange => "value out of range",
            Error::MissingEndQuote => "missing end quote",
            Error::TextInvalidEscape => "invalid escape sequence",
            Error::TextOutsideSection => "text outside section",
            Error::TextAfterEndQuote => "text after end quote",
            Error::TextAfterSectionHeader => "text after section header",
            Error::SectionHeaderUnclosed => "section header unclosed",
            Error::SectionNameEmpty => "section name empty",
            Error::SectionNameReused => "section name reused",
            Error::TableKeyReused => "table key reused",
            Error::TableEntryMissingEquals => "table entry missing '='",
        };
        f.write_str(text)
    }
}

impl std::error::Error for Error {}
