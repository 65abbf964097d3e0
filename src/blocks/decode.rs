//! Lenient block decoding.
//!
//! A response payload is decoded entry by entry. Entries with an unknown
//! tag, a bad shape, or a broken invariant become [`Block::Unsupported`]
//! and are reported as anomalies; the rest of the tree survives. Only a
//! payload that is not a block list at all is a hard failure.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use super::model::{Block, BlockKind, RowBlock};
use crate::error::BlockError;

/// A block entry that was neutralized during decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockAnomaly {
    /// Index path from the top-level list, e.g. `[1, 0]` for the first
    /// child of the second block.
    pub path: Vec<usize>,
    pub error: BlockError,
}

impl std::fmt::Display for BlockAnomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path: Vec<String> = self.path.iter().map(|i| i.to_string()).collect();
        write!(f, "blocks[{}]: {}", path.join("]["), self.error)
    }
}

/// Result of decoding a block list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedBlocks {
    pub blocks: Vec<Block>,
    pub anomalies: Vec<BlockAnomaly>,
}

impl DecodedBlocks {
    pub fn is_clean(&self) -> bool {
        self.anomalies.is_empty()
    }
}

/// Decode a chat response body: either `{ "blocks": [...] }` or a bare
/// array of blocks.
pub fn decode_response(payload: &Value) -> Result<DecodedBlocks, BlockError> {
    let list = match payload {
        Value::Array(_) => payload,
        Value::Object(obj) => obj
            .get("blocks")
            .ok_or_else(|| BlockError::MalformedPayload("missing 'blocks' field".into()))?,
        other => {
            return Err(BlockError::MalformedPayload(format!(
                "expected object or array, got {}",
                json_type(other)
            )));
        }
    };
    decode_blocks(list)
}

/// Decode a JSON array of blocks.
pub fn decode_blocks(list: &Value) -> Result<DecodedBlocks, BlockError> {
    let entries = list.as_array().ok_or_else(|| {
        BlockError::MalformedPayload(format!("'blocks' is {}, not an array", json_type(list)))
    })?;

    let mut decoded = DecodedBlocks::default();
    let mut path = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        path.push(i);
        let block = decode_entry(entry, &mut path, &mut decoded.anomalies);
        decoded.blocks.push(block);
        path.pop();
    }

    for anomaly in &decoded.anomalies {
        warn!(anomaly = %anomaly, "Neutralized malformed block");
    }
    Ok(decoded)
}

/// Decode a single block value. Never fails; problems are reported in the
/// returned anomaly list.
pub fn decode_block(value: &Value) -> (Block, Vec<BlockAnomaly>) {
    let mut anomalies = Vec::new();
    let block = decode_entry(value, &mut Vec::new(), &mut anomalies);
    (block, anomalies)
}

fn decode_entry(value: &Value, path: &mut Vec<usize>, anomalies: &mut Vec<BlockAnomaly>) -> Block {
    match try_decode(value, path, anomalies) {
        Ok(block) => block,
        Err(error) => {
            anomalies.push(BlockAnomaly {
                path: path.clone(),
                error,
            });
            Block::Unsupported
        }
    }
}

fn try_decode(
    value: &Value,
    path: &mut Vec<usize>,
    anomalies: &mut Vec<BlockAnomaly>,
) -> Result<Block, BlockError> {
    let tag = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(BlockError::MissingType)?;
    let kind = BlockKind::from_tag(tag).ok_or_else(|| BlockError::UnknownType(tag.to_string()))?;

    let block = match kind {
        BlockKind::Markdown => Block::Markdown(shape(kind, value)?),
        BlockKind::Image => Block::Image(shape(kind, value)?),
        BlockKind::Chart => Block::Chart(shape(kind, value)?),
        BlockKind::Table => Block::Table(shape(kind, value)?),
        BlockKind::Map => Block::Map(shape(kind, value)?),
        BlockKind::AirQuality => Block::AirQuality(shape(kind, value)?),
        BlockKind::Row => return decode_row(value, path, anomalies),
        BlockKind::Unsupported => return Err(BlockError::UnknownType(tag.to_string())),
    };
    block.validate()?;
    Ok(block)
}

/// Rows are decoded by hand so that a bad child only neutralizes itself.
fn decode_row(
    value: &Value,
    path: &mut Vec<usize>,
    anomalies: &mut Vec<BlockAnomaly>,
) -> Result<Block, BlockError> {
    let invalid = |reason: &str| BlockError::InvalidShape {
        kind: "row".into(),
        reason: reason.to_string(),
    };

    let id = optional_string(value, "id").map_err(|_| invalid("'id' must be a string"))?;
    let gap = optional_string(value, "gap").map_err(|_| invalid("'gap' must be a string"))?;
    let children = value
        .get("children")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("'children' must be an array"))?;

    let mut decoded = Vec::with_capacity(children.len());
    for (i, child) in children.iter().enumerate() {
        path.push(i);
        decoded.push(decode_entry(child, path, anomalies));
        path.pop();
    }

    Ok(Block::Row(RowBlock {
        id,
        gap,
        children: decoded,
    }))
}

fn shape<T: DeserializeOwned>(kind: BlockKind, value: &Value) -> Result<T, BlockError> {
    T::deserialize(value).map_err(|e| BlockError::InvalidShape {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}

fn optional_string(value: &Value, field: &str) -> Result<Option<String>, ()> {
    match value.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(()),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::blocks::model::{ChartKind, MarkerCategory};

    fn sample_response() -> Value {
        json!({
            "blocks": [
                { "id": "1", "type": "markdown", "content": "### 분석 결과" },
                {
                    "id": "2", "type": "row", "gap": "12px",
                    "children": [
                        { "id": "2-1", "type": "image", "url": "https://img/salad.jpg", "alt": "샐러드", "caption": "식단" },
                        { "id": "2-2", "type": "chart", "chartType": "doughnut", "title": "영양소 비율",
                          "data": { "labels": ["탄수화물", "단백질", "지방"], "values": [45, 30, 25] } }
                    ]
                },
                { "id": "3", "type": "table", "title": "상세 영양 성분", "headers": ["항목", "함량"],
                  "rows": [["칼로리", "450kcal"], ["단백질", "28g"]] },
                { "id": "5", "type": "map", "title": "그린 샐러드", "center": { "lat": 37.4979, "lng": 127.0276 },
                  "zoom": 16, "markers": [{ "lat": 37.4979, "lng": 127.0276, "label": "G", "type": "restaurant" }] },
                { "type": "air_quality", "title": "오늘의 공기", "aqi": 42, "status": "good" }
            ]
        })
    }

    #[test]
    fn decodes_full_response_cleanly() {
        let decoded = decode_response(&sample_response()).unwrap();
        assert!(decoded.is_clean(), "{:?}", decoded.anomalies);
        assert_eq!(decoded.blocks.len(), 5);

        let Block::Row(row) = &decoded.blocks[1] else {
            panic!("expected row");
        };
        assert_eq!(row.gap.as_deref(), Some("12px"));
        assert_eq!(row.children.len(), 2);
        let Block::Chart(chart) = &row.children[1] else {
            panic!("expected chart");
        };
        assert_eq!(chart.chart_type, ChartKind::Doughnut);
        assert_eq!(chart.data.values, vec![45.0, 30.0, 25.0]);

        let Block::Map(map) = &decoded.blocks[3] else {
            panic!("expected map");
        };
        assert_eq!(map.markers[0].category, Some(MarkerCategory::Restaurant));
    }

    #[test]
    fn accepts_bare_array() {
        let decoded = decode_response(&json!([{ "type": "markdown", "content": "hi" }])).unwrap();
        assert_eq!(decoded.blocks, vec![Block::Markdown(crate::blocks::MarkdownBlock {
            id: None,
            content: "hi".into(),
        })]);
    }

    #[test]
    fn rejects_non_list_payloads() {
        assert!(matches!(
            decode_response(&json!({ "status": "ok" })),
            Err(BlockError::MalformedPayload(_))
        ));
        assert!(decode_response(&json!({ "blocks": "nope" })).is_err());
        assert!(decode_response(&json!(42)).is_err());
    }

    #[test]
    fn unknown_and_untyped_entries_become_unsupported() {
        let decoded = decode_blocks(&json!([
            { "type": "video", "url": "x" },
            { "content": "no tag" },
            { "type": "markdown", "content": "kept" }
        ]))
        .unwrap();

        assert_eq!(decoded.blocks[0], Block::Unsupported);
        assert_eq!(decoded.blocks[1], Block::Unsupported);
        assert_eq!(decoded.blocks[2].kind(), BlockKind::Markdown);
        assert_eq!(decoded.anomalies.len(), 2);
        assert_eq!(decoded.anomalies[0].error, BlockError::UnknownType("video".into()));
        assert_eq!(decoded.anomalies[1].error, BlockError::MissingType);
    }

    #[test]
    fn invariant_violations_are_neutralized() {
        let decoded = decode_blocks(&json!([
            { "type": "chart", "chartType": "bar", "title": "t",
              "data": { "labels": ["a", "b"], "values": [1] } },
            { "type": "table", "title": "t", "headers": ["a", "b"], "rows": [["1", "2"], ["3"]] },
            { "type": "chart", "chartType": "scatter", "title": "t",
              "data": { "labels": [], "values": [] } }
        ]))
        .unwrap();

        assert!(decoded.blocks.iter().all(|b| *b == Block::Unsupported));
        assert!(matches!(decoded.anomalies[0].error, BlockError::ChartLengthMismatch { .. }));
        assert!(matches!(decoded.anomalies[1].error, BlockError::TableRowMismatch { .. }));
        assert!(matches!(decoded.anomalies[2].error, BlockError::InvalidShape { .. }));
    }

    #[test]
    fn bad_nested_child_only_neutralizes_itself() {
        let decoded = decode_blocks(&json!([
            { "type": "row", "children": [
                { "type": "markdown", "content": "left" },
                { "type": "row", "children": [
                    { "type": "markdown", "content": "deep" },
                    { "type": "sparkline" }
                ]}
            ]}
        ]))
        .unwrap();

        assert_eq!(decoded.anomalies.len(), 1);
        assert_eq!(decoded.anomalies[0].path, vec![0, 1, 1]);
        assert_eq!(decoded.anomalies[0].to_string(), "blocks[0][1][1]: Unknown block type: sparkline");

        let Block::Row(outer) = &decoded.blocks[0] else {
            panic!("expected row");
        };
        let Block::Row(inner) = &outer.children[1] else {
            panic!("expected nested row");
        };
        assert_eq!(inner.children[0].kind(), BlockKind::Markdown);
        assert_eq!(inner.children[1], Block::Unsupported);
    }

    #[test]
    fn row_without_children_is_an_anomaly() {
        let (block, anomalies) = decode_block(&json!({ "type": "row", "gap": "8px" }));
        assert_eq!(block, Block::Unsupported);
        assert_eq!(anomalies.len(), 1);
        assert!(anomalies[0].path.is_empty());
    }

    #[test]
    fn fractional_map_zoom_is_accepted() {
        let (block, anomalies) = decode_block(&json!({
            "type": "map", "title": "m", "center": { "lat": 37.5, "lng": 127.0 }, "zoom": 15.5
        }));
        assert!(anomalies.is_empty(), "{anomalies:?}");
        let Block::Map(map) = block else {
            panic!("expected map");
        };
        assert_eq!(map.zoom, Some(15.5));
    }
}
