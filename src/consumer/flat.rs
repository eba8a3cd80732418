use crate::consumer::description::MapDescription;
use crate::consumer::{
    check_line, compute_column_spans, GeneratedSpan, MappingOrder, OriginalPosition,
    ResolvedMapping,
};
use crate::mapping::Mapping;
use crate::search::{search, Bias};
use crate::set::ArraySet;
use crate::splitter::LineSplitter;
use crate::vlq::SegmentDecoder;
use crate::{resolve, Error, Result};
use std::collections::HashMap;
use std::sync::OnceLock;

/// A consumer over a single `mappings` string.
///
/// Construction validates and normalizes the document; the mappings string
/// itself is decoded on the first query that needs it and the two sorted
/// views are kept for the consumer's lifetime.
#[derive(Debug, Clone)]
pub struct FlatConsumer {
    file: Option<String>,
    source_root: Option<String>,
    sources: ArraySet,
    names: ArraySet,
    sources_content: Option<Vec<Option<String>>>,
    raw_mappings: String,
    parsed: OnceLock<Result<ParsedMappings>>,
}

#[derive(Debug, Clone)]
struct ParsedMappings {
    generated: Vec<Mapping>,
    original: Vec<Mapping>,
}

impl FlatConsumer {
    pub(crate) fn new(description: MapDescription) -> Result<Self> {
        if description.version != Some(3) {
            return Err(Error::UnsupportedVersion(description.version));
        }

        let source_root = description.source_root.filter(|root| !root.is_empty());

        // Some toolchains emit "./foo.js"-style entries; normalize before
        // anything compares source paths. Absolute sources under an absolute
        // root are stored root-relative.
        let sources = description
            .sources
            .unwrap_or_default()
            .into_iter()
            .map(|source| {
                let source = resolve::normalize(&source);
                match &source_root {
                    Some(root)
                        if resolve::is_absolute(root) && resolve::is_absolute(&source) =>
                    {
                        resolve::relative(root, &source)
                    }
                    _ => source,
                }
            });

        // duplicate sources and names appear in the wild; keep every entry
        // enumerable and let lookups resolve to the first occurrence
        let sources = ArraySet::from_items(sources, true);
        let names = ArraySet::from_items(description.names.unwrap_or_default(), true);

        Ok(Self {
            file: description.file,
            source_root,
            sources,
            names,
            sources_content: description.sources_content,
            raw_mappings: description.mappings.unwrap_or_default(),
            parsed: OnceLock::new(),
        })
    }

    #[inline]
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    #[inline]
    pub fn source_root(&self) -> Option<&str> {
        self.source_root.as_deref()
    }

    /// The full ordered source list, duplicates included, joined onto the
    /// source root where one is set.
    pub fn sources(&self) -> Vec<String> {
        self.sources
            .iter()
            .map(|source| self.join_root(source))
            .collect()
    }

    fn join_root(&self, source: &str) -> String {
        match &self.source_root {
            Some(root) => resolve::join(root, source),
            None => source.to_owned(),
        }
    }

    fn relative_to_root(&self, source: &str) -> String {
        match &self.source_root {
            Some(root) => resolve::relative(root, source),
            None => source.to_owned(),
        }
    }

    pub(crate) fn source_string(&self, id: u32) -> Option<String> {
        self.sources.at(id).map(|source| self.join_root(source))
    }

    pub(crate) fn name_string(&self, id: u32) -> Option<String> {
        self.names.at(id).map(str::to_owned)
    }
}

impl FlatConsumer {
    fn parsed(&self) -> Result<&ParsedMappings> {
        self.parsed
            .get_or_init(|| self.parse_mappings())
            .as_ref()
            .map_err(Error::clone)
    }

    fn parse_mappings(&self) -> Result<ParsedMappings> {
        let mut generated_line: u32 = 1;
        let mut source_id: i64 = 0;
        let mut original_line: i64 = 0;
        let mut original_column: i64 = 0;
        let mut name_id: i64 = 0;

        let mut decoder = SegmentDecoder::new();
        // Delta encoding makes identical segment texts very common in
        // minified output; cache the decoded fields per raw segment so a
        // repeated run costs one hash lookup instead of a re-decode. The
        // cache holds the field tuple, not a record: line numbers and the
        // running totals still differ between occurrences.
        let mut cached_segments: HashMap<&str, ([i64; 5], usize)> = HashMap::new();

        let mut generated = Vec::new();

        for line in LineSplitter::new(&self.raw_mappings) {
            // the generated column is the only total that resets per line
            let mut generated_column: i64 = 0;
            for segment in line.split(',') {
                if segment.is_empty() {
                    continue;
                }

                let (fields, len) = match cached_segments.get(segment) {
                    Some(&hit) => hit,
                    None => {
                        let decoded = decoder.decode(segment)?;
                        let mut fields = [0i64; 5];
                        fields[..decoded.len()].copy_from_slice(decoded);
                        cached_segments.insert(segment, (fields, decoded.len()));
                        (fields, decoded.len())
                    }
                };

                generated_column += fields[0];
                let column = checked_coord(generated_column, segment)?;
                let mut mapping = Mapping::new(generated_line, column);

                if len > 1 {
                    source_id += fields[1];
                    if source_id < 0 {
                        return Err(Error::MappingMalformed(segment.to_owned()));
                    }
                    if source_id >= i64::from(self.sources.len()) {
                        return Err(Error::UnknownSourceReference(source_id as u32));
                    }

                    original_line += fields[2];
                    original_column += fields[3];
                    let line = checked_coord(original_line, segment)?
                        .checked_add(1)
                        .ok_or_else(|| Error::MappingMalformed(segment.to_owned()))?;
                    let column = checked_coord(original_column, segment)?;
                    mapping = mapping.with_source(source_id as u32, line, column);

                    if len == 5 {
                        name_id += fields[4];
                        if name_id < 0 {
                            return Err(Error::MappingMalformed(segment.to_owned()));
                        }
                        if name_id >= i64::from(self.names.len()) {
                            return Err(Error::UnknownNameReference(name_id as u32));
                        }
                        mapping = mapping.with_name(name_id as u32);
                    }
                }

                generated.push(mapping);
            }
            generated_line += 1;
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
            "decoded {} mappings ({} with original positions) over {} generated lines",
            generated.len(),
            original.len(),
            generated_line - 1,
        );

        Ok(ParsedMappings {
            generated,
            original,
        })
    }

    pub fn generated_mappings(&self) -> Result<&[Mapping]> {
        Ok(&self.parsed()?.generated)
    }

    pub fn original_mappings(&self) -> Result<&[Mapping]> {
        Ok(&self.parsed()?.original)
    }
}

impl FlatConsumer {
    /// See [`Consumer::original_position_for`](crate::Consumer::original_position_for).
    pub fn original_position_for(
        &self,
        line: u32,
        column: u32,
        bias: Bias,
    ) -> Result<Option<OriginalPosition>> {
        check_line(line)?;
        let parsed = self.parsed()?;

        let needle = Mapping::new(line, column);
        let Some(idx) = search(
            &parsed.generated,
            |probe| Mapping::cmp_by_generated(probe, &needle, false),
            bias,
        ) else {
            return Ok(None);
        };

        let mapping = &parsed.generated[idx];
        // the bias may have drifted onto a neighboring line; that is a miss
        if mapping.generated().line != line {
            return Ok(None);
        }
        let Some(info) = mapping.source_info() else {
            return Ok(None);
        };

        let source = self
            .source_string(info.id)
            .ok_or(Error::UnknownSourceReference(info.id))?;
        Ok(Some(OriginalPosition {
            source,
            line: info.position.line,
            column: info.position.column,
            name: mapping.name_info().and_then(|id| self.name_string(id)),
        }))
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
        let Some(source_id) = self.sources.index_of(&self.relative_to_root(source)) else {
            return Ok(None);
        };
        let parsed = self.parsed()?;

        let needle = Mapping::new(1, 0).with_source(source_id, line, column);
        let Some(idx) = search(
            &parsed.original,
            |probe| Mapping::cmp_by_original(probe, &needle, false),
            bias,
        ) else {
            return Ok(None);
        };

        let mapping = &parsed.original[idx];
        // a bias-selected neighbor from another source is a miss
        if mapping.source_info().map(|info| info.id) != Some(source_id) {
            return Ok(None);
        }
        Ok(Some(GeneratedSpan::of(mapping)))
    }

    /// See [`Consumer::all_generated_positions_for`](crate::Consumer::all_generated_positions_for).
    pub fn all_generated_positions_for(
        &self,
        source: &str,
        line: u32,
        column: Option<u32>,
    ) -> Result<Vec<GeneratedSpan>> {
        check_line(line)?;
        let Some(source_id) = self.sources.index_of(&self.relative_to_root(source)) else {
            return Ok(Vec::new());
        };
        let parsed = self.parsed()?;

        // With the column defaulted to 0 a least-upper-bound search lands on
        // the first mapping at or after the requested line, and the sort
        // order groups everything we want contiguously after it.
        let needle = Mapping::new(1, 0).with_source(source_id, line, column.unwrap_or(0));
        let Some(start) = search(
            &parsed.original,
            |probe| Mapping::cmp_by_original(probe, &needle, false),
            Bias::LeastUpperBound,
        ) else {
            return Ok(Vec::new());
        };

        let run = &parsed.original[start..];
        let Some(found) = run.first().and_then(Mapping::source_info) else {
            return Ok(Vec::new());
        };
        if found.id != source_id {
            return Ok(Vec::new());
        }

        let mut spans = Vec::new();
        for mapping in run {
            let Some(info) = mapping.source_info() else {
                break;
            };
            if info.id != source_id {
                break;
            }
            let keep = match column {
                // the found line: the requested one, or the next that has
                // any mappings at all
                None => info.position.line == found.position.line,
                Some(_) => {
                    info.position.line == line && info.position.column == found.position.column
                }
            };
            if !keep {
                break;
            }
            spans.push(GeneratedSpan::of(mapping));
        }
        Ok(spans)
    }

    /// See [`Consumer::has_contents_of_all_sources`](crate::Consumer::has_contents_of_all_sources).
    pub fn has_contents_of_all_sources(&self) -> bool {
        match &self.sources_content {
            Some(contents) => {
                contents.len() as u32 >= self.sources.len()
                    && contents.iter().all(Option::is_some)
            }
            None => false,
        }
    }

    /// See [`Consumer::source_content_for`](crate::Consumer::source_content_for).
    pub fn source_content_for(&self, source: &str, null_on_missing: bool) -> Result<Option<&str>> {
        let Some(contents) = &self.sources_content else {
            return Ok(None);
        };

        let source = self.relative_to_root(source);
        if let Some(idx) = self.sources.index_of(&source) {
            return Ok(content_at(contents, idx));
        }

        if let Some(url) = self.source_root.as_deref().and_then(resolve::url_parse) {
            // Absolute file:// sources are often looked up the way a local
            // HTTP server would address them, and vice versa.
            if url.scheme == "file" {
                let file_path = source.strip_prefix("file://").unwrap_or(source.as_str());
                if let Some(idx) = self.sources.index_of(file_path) {
                    return Ok(content_at(contents, idx));
                }
            }
            if url.path == "/" {
                if let Some(idx) = self.sources.index_of(&format!("/{source}")) {
                    return Ok(content_at(contents, idx));
                }
            }
        }

        if null_on_missing {
            Ok(None)
        } else {
            Err(Error::SourceMissing(source))
        }
    }

    /// See [`Consumer::each_mapping`](crate::Consumer::each_mapping).
    pub fn each_mapping<F>(&self, order: MappingOrder, mut callback: F) -> Result<()>
    where
        F: FnMut(ResolvedMapping),
    {
        let parsed = self.parsed()?;
        let mappings = match order {
            MappingOrder::Generated => &parsed.generated,
            MappingOrder::Original => &parsed.original,
        };
        for mapping in mappings {
            let generated = mapping.generated();
            let info = mapping.source_info();
            callback(ResolvedMapping {
                generated_line: generated.line,
                generated_column: generated.column,
                source: info.and_then(|info| self.source_string(info.id)),
                original_line: info.map(|info| info.position.line),
                original_column: info.map(|info| info.position.column),
                name: mapping.name_info().and_then(|id| self.name_string(id)),
            });
        }
        Ok(())
    }
}

fn content_at(contents: &[Option<String>], idx: u32) -> Option<&str> {
    contents.get(idx as usize).and_then(|c| c.as_deref())
}

fn checked_coord(value: i64, segment: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::MappingMalformed(segment.to_owned()))
}
