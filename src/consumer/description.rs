use simd_json_derive::Deserialize;

/// An already-deserialized source map document.
///
/// This is the engine's input contract: an external JSON layer produces it,
/// the [`Consumer`](crate::Consumer) validates and queries it. The
/// [`from_slice`](MapDescription::from_slice) convenience wires that layer up
/// with simd-json for callers starting from raw bytes.
///
/// A `sections` field selects the indexed variant; everything else describes
/// a flat map.
#[derive(Debug, Default, Clone, Deserialize)]
#[simd_json(rename_all = "camelCase")]
pub struct MapDescription {
    pub version: Option<u32>,
    pub file: Option<String>,
    pub source_root: Option<String>,
    pub sources: Option<Vec<String>>,
    pub sources_content: Option<Vec<Option<String>>>,
    pub names: Option<Vec<String>>,
    pub mappings: Option<String>,
    pub sections: Option<Vec<SectionDescription>>,
}

/// One entry of an indexed map's `sections` list.
///
/// `offset` is 0-based on the wire. Exactly one of `map` (inline document)
/// or `url` (external reference) is supposed to be present; only inline maps
/// are supported.
#[derive(Debug, Clone, Deserialize)]
#[simd_json(rename_all = "camelCase")]
pub struct SectionDescription {
    pub offset: OffsetDescription,
    pub map: Option<MapDescription>,
    pub url: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[simd_json(rename_all = "camelCase")]
pub struct OffsetDescription {
    pub line: u32,
    pub column: u32,
}

impl MapDescription {
    /// Deserializes a description from a JSON buffer.
    ///
    /// The buffer is mutable because string escapes are unescaped in place.
    /// A leading `)]}'` XSSI guard line is skipped when present.
    pub fn from_slice(json: &mut [u8]) -> crate::Result<Self> {
        let start = xssi_guard_len(json);
        Ok(<Self as Deserialize>::from_slice(&mut json[start..])?)
    }
}

// Some servers prefix JSON responses with `)]}'` (plus arbitrary junk up to
// the newline) to keep them from parsing as script.
fn xssi_guard_len(json: &[u8]) -> usize {
    if !json.starts_with(b")]}") {
        return 0;
    }
    match json.iter().position(|&b| b == b'\n') {
        Some(idx) => idx + 1,
        None => json.len(),
    }
}
