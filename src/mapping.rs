use std::cmp::Ordering;
use std::fmt::{Debug, Formatter};

/// A position in the generated artifact: 1-based line, 0-based column.
///
/// Original positions use the same convention — the VLQ stream carries
/// 0-based line deltas, which are shifted to 1-based once on decode.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl From<(u32, u32)> for Position {
    fn from((line, column): (u32, u32)) -> Self {
        Self::new(line, column)
    }
}

/// A specific position in a specific original source file.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct SourceInfo {
    pub id: u32,
    pub position: Position,
}

impl SourceInfo {
    pub const fn new(id: u32, position: Position) -> Self {
        Self { id, position }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct OptionNum<const N: usize>([u32; N]);

impl<const N: usize> OptionNum<N> {
    const MISSING: u32 = 0xFFFF_FFFF;

    #[inline]
    const fn missing() -> Self {
        Self([Self::MISSING; N])
    }

    #[inline]
    const fn new(v: [u32; N]) -> Self {
        Self(v)
    }

    #[inline]
    const fn get(&self) -> Option<&[u32; N]> {
        if self.is_missing() {
            None
        } else {
            Some(&self.0)
        }
    }

    #[inline]
    const fn is_missing(&self) -> bool {
        self.0[0] == Self::MISSING
    }
}

/// Marks a span end that runs to the end of its generated line.
const SPAN_OPEN: u32 = u32::MAX;

/// One decoded entry of the `mappings` stream.
///
/// The source triple (source id, original line, original column) is present
/// all-or-nothing; a name id may ride along when the triple is present.
#[derive(Clone, Eq, PartialEq)]
pub struct Mapping {
    generated: Position,

    // [source_id, original_line, original_column]
    source: OptionNum<3>,

    // [name_id]
    name: OptionNum<1>,

    // inclusive end of the generated span, SPAN_OPEN = rest of line
    last_generated_column: u32,
}

impl Debug for Mapping {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.generated.line, self.generated.column)?;
        if let Some(source_info) = self.source_info() {
            write!(
                f,
                " -> {}:{}:{}",
                source_info.id, source_info.position.line, source_info.position.column,
            )?;
            if let Some(name_id) = self.name_info() {
                write!(f, " ({})", name_id)?;
            }
        }
        Ok(())
    }
}

impl Mapping {
    #[inline(always)]
    pub const fn new(generated_line: u32, generated_column: u32) -> Self {
        Self {
            generated: Position {
                line: generated_line,
                column: generated_column,
            },
            source: OptionNum::missing(),
            name: OptionNum::missing(),
            last_generated_column: SPAN_OPEN,
        }
    }

    #[inline(always)]
    pub const fn with_source(self, source_id: u32, original_line: u32, original_column: u32) -> Self {
        Self {
            source: OptionNum::new([source_id, original_line, original_column]),
            ..self
        }
    }

    #[inline(always)]
    pub const fn with_name(self, name_id: u32) -> Self {
        Self {
            name: OptionNum::new([name_id]),
            ..self
        }
    }
}

impl Mapping {
    /// Returns the generated position of the mapping.
    #[inline]
    pub fn generated(&self) -> Position {
        self.generated
    }

    /// Returns the original source position, if the segment carried one.
    #[inline]
    pub fn source_info(&self) -> Option<SourceInfo> {
        self.source
            .get()
            .map(|&[source_id, original_line, original_column]| {
                SourceInfo::new(source_id, Position::new(original_line, original_column))
            })
    }

    #[inline]
    pub fn has_source(&self) -> bool {
        !self.source.is_missing()
    }

    /// Returns the name id, available only alongside source information.
    #[inline]
    pub fn name_info(&self) -> Option<u32> {
        self.name.get().map(|&[v]| v)
    }

    #[inline]
    pub fn has_name(&self) -> bool {
        !self.name.is_missing()
    }

    /// Inclusive end column of the generated span, `None` when the span runs
    /// to the end of its line.
    #[inline]
    pub fn last_column(&self) -> Option<u32> {
        (self.last_generated_column != SPAN_OPEN).then_some(self.last_generated_column)
    }

    #[inline]
    pub(crate) fn set_last_column(&mut self, column: u32) {
        self.last_generated_column = column;
    }

    #[inline]
    pub(crate) fn clear_last_column(&mut self) {
        self.last_generated_column = SPAN_OPEN;
    }

    fn source_key(&self) -> [u32; 3] {
        // absent fields order as 0
        self.source.get().copied().unwrap_or([0; 3])
    }

    fn name_key(&self) -> u32 {
        self.name.get().map(|&[v]| v).unwrap_or(0)
    }
}

impl Mapping {
    /// Orders by generated position.
    ///
    /// Restricted mode (`full = false`) compares the generated line and
    /// column only; full mode breaks remaining ties on the source triple and
    /// name id so no two distinct records ever compare equal.
    pub(crate) fn cmp_by_generated(a: &Self, b: &Self, full: bool) -> Ordering {
        let cmp = a
            .generated
            .line
            .cmp(&b.generated.line)
            .then(a.generated.column.cmp(&b.generated.column));
        if !full {
            return cmp;
        }
        cmp.then_with(|| a.source_key().cmp(&b.source_key()))
            .then_with(|| a.name_key().cmp(&b.name_key()))
    }

    /// Orders by original position (source id, then line, then column).
    ///
    /// Full mode breaks ties on the generated column BEFORE the generated
    /// line, then on the name id; the column-first order is part of the
    /// published ordering of this format.
    pub(crate) fn cmp_by_original(a: &Self, b: &Self, full: bool) -> Ordering {
        let cmp = a.source_key().cmp(&b.source_key());
        if !full {
            return cmp;
        }
        cmp.then_with(|| a.generated.column.cmp(&b.generated.column))
            .then_with(|| a.generated.line.cmp(&b.generated.line))
            .then_with(|| a.name_key().cmp(&b.name_key()))
    }
}

#[cfg(test)]
mod tests {
    use super::Mapping;
    use std::cmp::Ordering;

    #[test]
    fn test_orderings() {
        let plain = Mapping::new(1, 4);
        let sourced = Mapping::new(1, 4).with_source(0, 2, 0);
        let named = Mapping::new(1, 4).with_source(0, 2, 0).with_name(3);

        // restricted mode sees only the generated position
        assert_eq!(
            Mapping::cmp_by_generated(&plain, &sourced, false),
            Ordering::Equal
        );
        // full mode discriminates on the source triple, then the name
        assert_eq!(
            Mapping::cmp_by_generated(&plain, &sourced, true),
            Ordering::Less
        );
        assert_eq!(
            Mapping::cmp_by_generated(&sourced, &named, true),
            Ordering::Less
        );

        let earlier = Mapping::new(2, 0).with_source(0, 1, 0);
        let later = Mapping::new(1, 0).with_source(0, 3, 0);
        assert_eq!(
            Mapping::cmp_by_original(&earlier, &later, false),
            Ordering::Less
        );

        // full original ordering ranks the generated column before the line
        let col_heavy = Mapping::new(1, 9).with_source(0, 1, 0);
        let line_heavy = Mapping::new(5, 2).with_source(0, 1, 0);
        assert_eq!(
            Mapping::cmp_by_original(&line_heavy, &col_heavy, true),
            Ordering::Less
        );
    }

    #[test]
    fn test_debug_format() {
        let mapping = Mapping::new(10, 12).with_source(1, 6, 8).with_name(2);
        insta::assert_snapshot!(format!("{mapping:?}"), @"10:12 -> 1:6:8 (2)");
        insta::assert_snapshot!(format!("{:?}", Mapping::new(3, 0)), @"3:0");
    }
}
