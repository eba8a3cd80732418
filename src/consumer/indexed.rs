use crate::consumer::description::MapDescription;
use crate::consumer::{
    check_line, compute_column_spans, Consumer, GeneratedSpan, MappingOrder, OriginalPosition,
    ResolvedMapping,
};
use crate::mapping::{Mapping, Position};
use crate::search::{search, Bias};
use crate::set::ArraySet;
use crate::{Error, Result};
use std::sync::OnceLock;

/// A consumer over an indexed map: an ordered list of sections, each a
/// nested map anchored at an offset in the outer generated artifact.
///
/// Position queries route to the owning section and translate coordinates at
/// the boundary; the merged mapping arrays exist only for the enumeration
/// APIs and are built lazily from the sections' already-decoded mappings.
#[derive(Debug, Clone)]
pub struct IndexedConsumer {
    file: Option<String>,
    sections: Vec<Section>,
    merged: OnceLock<Result<MergedMappings>>,
}

#[derive(Debug, Clone)]
struct Section {
    // line converted to 1-based from the 0-based wire offset; the column
    // stays 0-based like every other column in the crate
    offset: Position,
    consumer: Consumer,
}

#[derive(Debug, Clone)]
struct MergedMappings {
    sources: ArraySet,
    names: ArraySet,
    generated: Vec<Mapping>,
    original: Vec<Mapping>,
}

impl IndexedConsumer {
    pub(crate) fn new(description: MapDescription) -> Result<Self> {
        if description.version != Some(3) {
            return Err(Error::UnsupportedVersion(description.version));
        }

        let raw_sections = description.sections.unwrap_or_default();
        let mut sections = Vec::with_capacity(raw_sections.len());
        let mut last_offset: Option<(u32, u32)> = None;

        for (section_id, section) in raw_sections.into_iter().enumerate() {
            let section_id = section_id as u32;
            if section.url.is_some() {
                // resolving external maps would need I/O this engine does
                // not perform; refuse instead of silently dropping data
                return Err(Error::SectionUrlUnsupported(section_id));
            }

            let offset = (section.offset.line, section.offset.column);
            if matches!(last_offset, Some(last) if offset < last) {
                return Err(Error::UnorderedSections(section_id));
            }
            last_offset = Some(offset);

            let map = section.map.ok_or(Error::SectionWithoutMap(section_id))?;
            sections.push(Section {
                offset: Position::new(section.offset.line + 1, section.offset.column),
                consumer: Consumer::new(map)?,
            });
        }

        Ok(Self {
            file: description.file,
            sections,
            merged: OnceLock::new(),
        })
    }

    #[inline]
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// Source lists of every section, concatenated in section order.
    pub fn sources(&self) -> Vec<String> {
        self.sections
            .iter()
            .flat_map(|section| section.consumer.sources())
            .collect()
    }
}

impl IndexedConsumer {
    /// See [`Consumer::original_position_for`](crate::Consumer::original_position_for).
    pub fn original_position_for(
        &self,
        line: u32,
        column: u32,
        bias: Bias,
    ) -> Result<Option<OriginalPosition>> {
        check_line(line)?;

        let needle = Position::new(line, column);
        let Some(idx) = search(
            &self.sections,
            |section| section.offset.cmp(&needle),
            Bias::GreatestLowerBound,
        ) else {
            // before the first section
            return Ok(None);
        };
        let section = &self.sections[idx];

        // Translate into the section's coordinate space. The column offset
        // only applies on the section's first line; later lines start their
        // columns from 0 like any other line.
        let local_line = line - (section.offset.line - 1);
        let local_column = if section.offset.line == line {
            column - section.offset.column
        } else {
            column
        };
        section
            .consumer
            .original_position_for(local_line, local_column, bias)
    }

    /// See [`Consumer::generated_position_for`](crate::Consumer::generated_position_for).
    pub fn generated_position_for(
        &self,
        source: &str,
        line: u32,
        column: u32,
        bias: Bias,
    ) -> Result<Option<GeneratedSpan>> {
        check_line(line)?;

        for section in &self.sections {
            // only sections that know the source can answer for it
            if !section.consumer.sources().iter().any(|s| s == source) {
                continue;
            }
            let Some(position) = section
                .consumer
                .generated_position_for(source, line, column, bias)?
            else {
                continue;
            };
            return Ok(Some(translate_out(section, position)));
        }
        Ok(None)
    }

    /// See [`Consumer::all_generated_positions_for`](crate::Consumer::all_generated_positions_for).
    pub fn all_generated_positions_for(
        &self,
        source: &str,
        line: u32,
        column: Option<u32>,
    ) -> Result<Vec<GeneratedSpan>> {
        check_line(line)?;

        let mut spans = Vec::new();
        for section in &self.sections {
            if !section.consumer.sources().iter().any(|s| s == source) {
                continue;
            }
            for position in section
                .consumer
                .all_generated_positions_for(source, line, column)?
            {
                spans.push(translate_out(section, position));
            }
        }
        Ok(spans)
    }

    /// See [`Consumer::has_contents_of_all_sources`](crate::Consumer::has_contents_of_all_sources).
    pub fn has_contents_of_all_sources(&self) -> bool {
        self.sections
            .iter()
            .all(|section| section.consumer.has_contents_of_all_sources())
    }

    /// See [`Consumer::source_content_for`](crate::Consumer::source_content_for).
    ///
    /// Sections are probed in order and the first hit wins; only this outer
    /// call honors `null_on_missing`.
    pub fn source_content_for(&self, source: &str, null_on_missing: bool) -> Result<Option<&str>> {
        for section in &self.sections {
            if let Some(content) = section.consumer.source_content_for(source, true)? {
                return Ok(Some(content));
            }
        }
        if null_on_missing {
            Ok(None)
        } else {
            Err(Error::SourceMissing(source.to_owned()))
        }
    }
}

impl IndexedConsumer {
    fn merged(&self) -> Result<&MergedMappings> {
        self.merged
            .get_or_init(|| self.merge_sections())
            .as_ref()
            .map_err(Error::clone)
    }

    /// Rebuilds this consumer's own sorted arrays from the sections'
    /// already-decoded mappings, re-interning every source and name string
    /// and shifting generated coordinates into the outer space.
    fn merge_sections(&self) -> Result<MergedMappings> {
        let mut sources = ArraySet::new();
        let mut names = ArraySet::new();
        let mut generated = Vec::new();

        for section in &self.sections {
            for mapping in section.consumer.generated_mappings()? {
                let position = mapping.generated();
                let outer_line = position.line + (section.offset.line - 1);
                let outer_column = position.column
                    + if position.line == 1 {
                        section.offset.column
                    } else {
                        0
                    };
                let mut adjusted = Mapping::new(outer_line, outer_column);

                if let Some(info) = mapping.source_info() {
                    let source = section
                        .consumer
                        .source_string(info.id)?
                        .ok_or(Error::UnknownSourceReference(info.id))?;
                    // same string, same index: duplicates here would corrupt
                    // the id arithmetic of already-merged mappings
                    let source_id = sources.add(source, false);
                    adjusted =
                        adjusted.with_source(source_id, info.position.line, info.position.column);

                    if let Some(name_id) = mapping.name_info() {
                        let name = section
                            .consumer
                            .name_string(name_id)?
                            .ok_or(Error::UnknownNameReference(name_id))?;
                        adjusted = adjusted.with_name(names.add(name, false));
                    }
                }

                generated.push(adjusted);
            }
        }

        generated.sort_unstable_by(|a, b| Mapping::cmp_by_generated(a, b, true));
        compute_column_spans(&mut generated);

        let mut original: Vec<Mapping> = generated
            .iter()
            .filter(|mapping| mapping.has_source())
            .cloned()
            .collect();
        original.sort_unstable_by(|a, b| Mapping::cmp_by_original(a, b, true));

        log::debug!(
            "merged {} mappings from {} sections",
            generated.len(),
            self.sections.len(),
        );

        Ok(MergedMappings {
            sources,
            names,
            generated,
            original,
        })
    }

    pub fn generated_mappings(&self) -> Result<&[Mapping]> {
        Ok(&self.merged()?.generated)
    }

    pub fn original_mappings(&self) -> Result<&[Mapping]> {
        Ok(&self.merged()?.original)
    }

    /// See [`Consumer::each_mapping`](crate::Consumer::each_mapping).
    pub fn each_mapping<F>(&self, order: MappingOrder, mut callback: F) -> Result<()>
    where
        F: FnMut(ResolvedMapping),
    {
        let merged = self.merged()?;
        let mappings = match order {
            MappingOrder::Generated => &merged.generated,
            MappingOrder::Original => &merged.original,
        };
        for mapping in mappings {
            let generated = mapping.generated();
            let info = mapping.source_info();
            callback(ResolvedMapping {
                generated_line: generated.line,
                generated_column: generated.column,
                source: info
                    .and_then(|info| merged.sources.at(info.id))
                    .map(str::to_owned),
                original_line: info.map(|info| info.position.line),
                original_column: info.map(|info| info.position.column),
                name: mapping
                    .name_info()
                    .and_then(|id| merged.names.at(id))
                    .map(str::to_owned),
            });
        }
        Ok(())
    }

    pub(crate) fn source_string(&self, id: u32) -> Result<Option<String>> {
        Ok(self.merged()?.sources.at(id).map(str::to_owned))
    }

    pub(crate) fn name_string(&self, id: u32) -> Result<Option<String>> {
        Ok(self.merged()?.names.at(id).map(str::to_owned))
    }
}

// Shifts a section-local generated position into the outer coordinate
// space: the exact inverse of the lookup-side translation, column offset on
// the section's first line only.
fn translate_out(section: &Section, position: GeneratedSpan) -> GeneratedSpan {
    let column_offset = if position.line == 1 {
        section.offset.column
    } else {
        0
    };
    GeneratedSpan {
        line: position.line + (section.offset.line - 1),
        column: position.column + column_offset,
        last_column: position.last_column.map(|column| column + column_offset),
    }
}
