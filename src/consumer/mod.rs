mod description;
mod flat;
mod indexed;

pub use description::{MapDescription, OffsetDescription, SectionDescription};
pub use flat::FlatConsumer;
pub use indexed::IndexedConsumer;

use crate::mapping::Mapping;
use crate::search::Bias;
use crate::{Error, Result};

/// Which of the two sorted views an enumeration walks.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum MappingOrder {
    /// By position in the generated artifact; every mapping appears.
    #[default]
    Generated,
    /// By (source, line, column) in the original files; only mappings that
    /// carry original positions appear.
    Original,
}

/// Answer to [`Consumer::original_position_for`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct OriginalPosition {
    /// The original source path, joined onto the source root when one is set.
    pub source: String,
    pub line: u32,
    pub column: u32,
    /// The original identifier at that position, when the map recorded one.
    pub name: Option<String>,
}

/// A generated position plus the inclusive end of its contiguous span.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct GeneratedSpan {
    pub line: u32,
    pub column: u32,
    /// Inclusive end column; `None` means the span runs to the end of the
    /// line.
    pub last_column: Option<u32>,
}

impl GeneratedSpan {
    pub(crate) fn of(mapping: &Mapping) -> Self {
        let generated = mapping.generated();
        Self {
            line: generated.line,
            column: generated.column,
            last_column: mapping.last_column(),
        }
    }
}

/// One mapping with its source and name ids resolved to strings, as handed
/// to [`Consumer::each_mapping`] callbacks.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ResolvedMapping {
    pub generated_line: u32,
    pub generated_column: u32,
    pub source: Option<String>,
    pub original_line: Option<u32>,
    pub original_column: Option<u32>,
    pub name: Option<String>,
}

/// A parsed source map, ready for position queries.
///
/// The two shapes a version-3 document can take map onto the two variants:
/// a flat map decodes its own `mappings` string, an indexed map composes
/// inner consumers recursively, one per section. [`Consumer::new`] picks the
/// variant by the presence of `sections`; there are no other shapes.
///
/// All queries are `&self` and safe to issue concurrently; the mapping
/// arrays are decoded once, on whichever query touches them first.
#[derive(Debug, Clone)]
pub enum Consumer {
    Flat(FlatConsumer),
    Indexed(IndexedConsumer),
}

impl Consumer {
    /// Builds a consumer from an already-deserialized description.
    pub fn new(description: MapDescription) -> Result<Self> {
        if description.sections.is_some() {
            IndexedConsumer::new(description).map(Self::Indexed)
        } else {
            FlatConsumer::new(description).map(Self::Flat)
        }
    }

    /// Deserializes and builds a consumer from a JSON buffer.
    pub fn from(json: Vec<u8>) -> Result<Self> {
        let mut json = json;
        Self::from_slice(&mut json)
    }

    /// Deserializes and builds a consumer from a JSON buffer slice.
    ///
    /// The slice is mutable to facilitate in-place replacement of escape
    /// characters in the JSON strings.
    pub fn from_slice(json: &mut [u8]) -> Result<Self> {
        Self::new(MapDescription::from_slice(json)?)
    }
}

impl Consumer {
    /// Maps a generated position back to an original source position.
    ///
    /// `Ok(None)` when no mapping on the requested generated line matches,
    /// or the matching mapping carries no original position.
    pub fn original_position_for(
        &self,
        line: u32,
        column: u32,
        bias: Bias,
    ) -> Result<Option<OriginalPosition>> {
        match self {
            Self::Flat(flat) => flat.original_position_for(line, column, bias),
            Self::Indexed(indexed) => indexed.original_position_for(line, column, bias),
        }
    }

    /// Maps an original source position to its generated position.
    ///
    /// `Ok(None)` when the source is not in the map or no mapping of that
    /// source matches.
    pub fn generated_position_for(
        &self,
        source: &str,
        line: u32,
        column: u32,
        bias: Bias,
    ) -> Result<Option<GeneratedSpan>> {
        match self {
            Self::Flat(flat) => flat.generated_position_for(source, line, column, bias),
            Self::Indexed(indexed) => indexed.generated_position_for(source, line, column, bias),
        }
    }

    /// Collects every generated position for an original line, or for an
    /// exact original (line, column) when `column` is given.
    pub fn all_generated_positions_for(
        &self,
        source: &str,
        line: u32,
        column: Option<u32>,
    ) -> Result<Vec<GeneratedSpan>> {
        match self {
            Self::Flat(flat) => flat.all_generated_positions_for(source, line, column),
            Self::Indexed(indexed) => indexed.all_generated_positions_for(source, line, column),
        }
    }

    /// True when embedded content is available for every source of the map.
    pub fn has_contents_of_all_sources(&self) -> bool {
        match self {
            Self::Flat(flat) => flat.has_contents_of_all_sources(),
            Self::Indexed(indexed) => indexed.has_contents_of_all_sources(),
        }
    }

    /// Returns the embedded content of `source`.
    ///
    /// A miss is `Ok(None)` when `null_on_missing` is set and
    /// [`Error::SourceMissing`] otherwise.
    pub fn source_content_for(&self, source: &str, null_on_missing: bool) -> Result<Option<&str>> {
        match self {
            Self::Flat(flat) => flat.source_content_for(source, null_on_missing),
            Self::Indexed(indexed) => indexed.source_content_for(source, null_on_missing),
        }
    }

    /// The full ordered source list, duplicates included, joined onto the
    /// source root where one is set.
    pub fn sources(&self) -> Vec<String> {
        match self {
            Self::Flat(flat) => flat.sources(),
            Self::Indexed(indexed) => indexed.sources(),
        }
    }

    /// The `file` field of the document, if present.
    pub fn file(&self) -> Option<&str> {
        match self {
            Self::Flat(flat) => flat.file(),
            Self::Indexed(indexed) => indexed.file(),
        }
    }

    /// All mappings sorted by generated position.
    pub fn generated_mappings(&self) -> Result<&[Mapping]> {
        match self {
            Self::Flat(flat) => flat.generated_mappings(),
            Self::Indexed(indexed) => indexed.generated_mappings(),
        }
    }

    /// Mappings that carry original positions, sorted by original position.
    pub fn original_mappings(&self) -> Result<&[Mapping]> {
        match self {
            Self::Flat(flat) => flat.original_mappings(),
            Self::Indexed(indexed) => indexed.original_mappings(),
        }
    }

    /// Walks the map in the requested order, resolving ids to strings.
    pub fn each_mapping<F>(&self, order: MappingOrder, callback: F) -> Result<()>
    where
        F: FnMut(ResolvedMapping),
    {
        match self {
            Self::Flat(flat) => flat.each_mapping(order, callback),
            Self::Indexed(indexed) => indexed.each_mapping(order, callback),
        }
    }

    pub(crate) fn source_string(&self, id: u32) -> Result<Option<String>> {
        match self {
            Self::Flat(flat) => Ok(flat.source_string(id)),
            Self::Indexed(indexed) => indexed.source_string(id),
        }
    }

    pub(crate) fn name_string(&self, id: u32) -> Result<Option<String>> {
        match self {
            Self::Flat(flat) => Ok(flat.name_string(id)),
            Self::Indexed(indexed) => indexed.name_string(id),
        }
    }
}

pub(crate) fn check_line(line: u32) -> Result<()> {
    if line == 0 {
        return Err(Error::LineOutOfRange(line));
    }
    Ok(())
}

/// Fills in the inclusive span ends of a generated-ordered array.
///
/// Mappings carry no end column on the wire; runs are assumed contiguous, so
/// a mapping ends one column before its successor on the same line and the
/// last mapping of a line spans the rest of it.
pub(crate) fn compute_column_spans(generated: &mut [Mapping]) {
    for idx in 0..generated.len() {
        let next_on_same_line = match generated.get(idx + 1) {
            Some(next) if next.generated().line == generated[idx].generated().line => {
                Some(next.generated().column)
            }
            _ => None,
        };
        match next_on_same_line {
            Some(next_column) => generated[idx].set_last_column(next_column.saturating_sub(1)),
            None => generated[idx].clear_last_column(),
        }
    }
}
