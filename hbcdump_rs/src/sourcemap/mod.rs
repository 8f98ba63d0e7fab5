//! Source map v3 parsing and lookup.
//!
//! Bytecode source maps put the whole segment on generated line 1 and use the
//! virtual offset as the generated column, so resolving a function is a
//! lookup of `(0, virtual_offset)` in zero-based terms.

pub mod vlq;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceMapError {
    #[error("invalid source map JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported source map version: {0}")]
    UnsupportedVersion(u32),

    #[error("malformed mapping segment {segment:?} on generated line {line}")]
    BadSegment { line: usize, segment: String },

    #[error("mapping on generated line {line} refers to missing source {index}")]
    MissingSource { line: usize, index: i64 },
}

#[derive(Debug, Deserialize)]
struct RawSourceMap {
    version: u32,
    #[serde(default)]
    sources: Vec<String>,
    #[serde(default)]
    names: Vec<String>,
    mappings: String,
    #[serde(default, rename = "sourceRoot")]
    source_root: Option<String>,
}

/// One decoded mapping segment. All positions are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub generated_column: u32,
    pub source: Option<OriginalPosition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OriginalPosition {
    pub source_index: u32,
    pub line: u32,
    pub column: u32,
    pub name_index: Option<u32>,
}

/// A resolved original location; line and column are one-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SourceMap {
    sources: Vec<String>,
    names: Vec<String>,
    /// Segments per generated line, sorted by generated column.
    lines: Vec<Vec<Mapping>>,
}

impl SourceMap {
    /// Parse a source map file buffer.
    pub fn parse(bytes: &[u8]) -> Result<Self, SourceMapError> {
        let raw: RawSourceMap = serde_json::from_slice(bytes)?;
        if raw.version != 3 {
            return Err(SourceMapError::UnsupportedVersion(raw.version));
        }

        let sources = raw
            .sources
            .iter()
            .map(|s| match raw.source_root.as_deref() {
                Some(root) if !root.is_empty() => {
                    format!("{}/{}", root.trim_end_matches('/'), s)
                }
                _ => s.clone(),
            })
            .collect::<Vec<_>>();
        let lines = parse_mappings(&raw.mappings, sources.len())?;

        Ok(Self {
            sources,
            names: raw.names,
            lines,
        })
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn segments(&self, generated_line: usize) -> &[Mapping] {
        self.lines
            .get(generated_line)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Original location of the last segment at or before `generated_column`
    /// on zero-based `generated_line`.
    pub fn lookup(&self, generated_line: usize, generated_column: u32) -> Option<SourceLocation> {
        let segments = self.segments(generated_line);
        let idx = segments.partition_point(|m| m.generated_column <= generated_column);
        let original = segments[..idx].iter().rev().find_map(|m| m.source)?;
        Some(SourceLocation {
            file: self.sources.get(original.source_index as usize)?.clone(),
            line: original.line + 1,
            column: original.column + 1,
            name: original
                .name_index
                .and_then(|n| self.names.get(n as usize))
                .cloned(),
        })
    }

    /// Resolve a bytecode virtual offset.
    pub fn lookup_virtual_offset(&self, virtual_offset: u32) -> Option<SourceLocation> {
        self.lookup(0, virtual_offset)
    }
}

fn parse_mappings(mappings: &str, source_count: usize) -> Result<Vec<Vec<Mapping>>, SourceMapError> {
    let mut lines = Vec::new();
    let mut source_index = 0i64;
    let mut source_line = 0i64;
    let mut source_column = 0i64;
    let mut name_index = 0i64;

    for (line_no, line) in mappings.split(';').enumerate() {
        let mut generated_column = 0i64;
        let mut segments = Vec::new();
        for segment in line.split(',').filter(|s| !s.is_empty()) {
            let bad = || SourceMapError::BadSegment {
                line: line_no,
                segment: segment.to_string(),
            };
            let fields = vlq::decode_segment(segment).ok_or_else(bad)?;
            if !matches!(fields.len(), 1 | 4 | 5) {
                return Err(bad());
            }
            generated_column += i64::from(fields[0]);
            let column = u32::try_from(generated_column).map_err(|_| bad())?;

            let source = if fields.len() >= 4 {
                source_index += i64::from(fields[1]);
                source_line += i64::from(fields[2]);
                source_column += i64::from(fields[3]);
                let name = if fields.len() == 5 {
                    name_index += i64::from(fields[4]);
                    Some(u32::try_from(name_index).map_err(|_| bad())?)
                } else {
                    None
                };
                if source_index < 0 || source_index as usize >= source_count {
                    return Err(SourceMapError::MissingSource {
                        line: line_no,
                        index: source_index,
                    });
                }
                Some(OriginalPosition {
                    source_index: source_index as u32,
                    line: u32::try_from(source_line).map_err(|_| bad())?,
                    column: u32::try_from(source_column).map_err(|_| bad())?,
                    name_index: name,
                })
            } else {
                None
            };

            segments.push(Mapping {
                generated_column: column,
                source,
            });
        }
        segments.sort_by_key(|m| m.generated_column);
        lines.push(segments);
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP: &str = r#"{
        "version": 3,
        "sources": ["main.ts", "util.ts"],
        "names": ["add"],
        "mappings": "AAAA,qBAEA,MCAAA;AAAA"
    }"#;

    #[test]
    fn parses_and_resolves_segments() {
        let map = SourceMap::parse(MAP.as_bytes()).unwrap();
        assert_eq!(map.sources(), ["main.ts", "util.ts"]);
        assert_eq!(map.segments(0).len(), 3);

        let at_zero = map.lookup_virtual_offset(0).unwrap();
        assert_eq!((at_zero.file.as_str(), at_zero.line, at_zero.column), ("main.ts", 1, 1));

        // Column 21 starts the second segment: two lines further down.
        let second = map.lookup_virtual_offset(25).unwrap();
        assert_eq!((second.file.as_str(), second.line), ("main.ts", 3));

        // Column 27 switches to util.ts and names `add`.
        let third = map.lookup_virtual_offset(40).unwrap();
        assert_eq!(third.file, "util.ts");
        assert_eq!(third.name.as_deref(), Some("add"));
    }

    #[test]
    fn applies_source_root() {
        let json = r#"{"version":3,"sourceRoot":"src/","sources":["a.ts"],"mappings":"AAAA"}"#;
        let map = SourceMap::parse(json.as_bytes()).unwrap();
        assert_eq!(map.lookup_virtual_offset(3).unwrap().file, "src/a.ts");
    }

    #[test]
    fn rejects_wrong_version_and_bad_json() {
        let json = r#"{"version":2,"sources":[],"mappings":""}"#;
        assert!(matches!(
            SourceMap::parse(json.as_bytes()),
            Err(SourceMapError::UnsupportedVersion(2))
        ));
        assert!(matches!(
            SourceMap::parse(b"not json"),
            Err(SourceMapError::Json(_))
        ));
    }

    #[test]
    fn rejects_dangling_source_index() {
        let json = r#"{"version":3,"sources":["a.ts"],"mappings":"ACAA"}"#;
        assert!(matches!(
            SourceMap::parse(json.as_bytes()),
            Err(SourceMapError::MissingSource { line: 0, index: 1 })
        ));
    }

    #[test]
    fn lookup_before_first_segment_is_none() {
        let json = r#"{"version":3,"sources":["a.ts"],"mappings":"KAAA"}"#;
        let map = SourceMap::parse(json.as_bytes()).unwrap();
        assert!(map.lookup_virtual_offset(4).is_none());
        assert!(map.lookup_virtual_offset(5).is_some());
    }
}
