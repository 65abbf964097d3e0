//! Content block data model — the recursive tagged union the coaching
//! backend returns as chat content.

use serde::{Deserialize, Serialize};

use crate::error::BlockError;

/// A unit of renderable content.
///
/// Serialized with an internal `type` tag, matching the backend wire format.
/// `Row` is the only composite variant; it owns its children outright.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Markdown(MarkdownBlock),
    Image(ImageBlock),
    Chart(ChartBlock),
    Table(TableBlock),
    Map(MapBlock),
    AirQuality(AirQualityBlock),
    Row(RowBlock),
    /// Placeholder for an entry that failed to decode. Renders nothing.
    #[serde(other)]
    Unsupported,
}

/// Tag of a block variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Markdown,
    Image,
    Chart,
    Table,
    Map,
    AirQuality,
    Row,
    Unsupported,
}

impl BlockKind {
    /// Parse a wire tag. Returns `None` for tags this client does not know.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "markdown" => Some(Self::Markdown),
            "image" => Some(Self::Image),
            "chart" => Some(Self::Chart),
            "table" => Some(Self::Table),
            "map" => Some(Self::Map),
            "air_quality" => Some(Self::AirQuality),
            "row" => Some(Self::Row),
            _ => None,
        }
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Markdown => "markdown",
            Self::Image => "image",
            Self::Chart => "chart",
            Self::Table => "table",
            Self::Map => "map",
            Self::AirQuality => "air_quality",
            Self::Row => "row",
            Self::Unsupported => "unsupported",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkdownBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub url: String,
    pub alt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartKind {
    Bar,
    Line,
    Doughnut,
    Pie,
    Radar,
    PolarArea,
}

impl std::fmt::Display for ChartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Bar => "bar",
            Self::Line => "line",
            Self::Doughnut => "doughnut",
            Self::Pie => "pie",
            Self::Radar => "radar",
            Self::PolarArea => "polarArea",
        };
        write!(f, "{s}")
    }
}

/// Parallel label/value series. `labels.len() == values.len()` for any
/// block that passed validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "chartType")]
    pub chart_type: ChartKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub data: ChartData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerCategory {
    Restaurant,
    Attraction,
    Transit,
    Facility,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapMarker {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<MarkerCategory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub center: LatLng,
    /// Map zoom level. Fractional values are accepted and rounded when a
    /// static image is requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<MapMarker>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AirQualityStatus {
    Good,
    Moderate,
    Unhealthy,
    Hazardous,
}

impl std::fmt::Display for AirQualityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Good => write!(f, "good"),
            Self::Moderate => write!(f, "moderate"),
            Self::Unhealthy => write!(f, "unhealthy"),
            Self::Hazardous => write!(f, "hazardous"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub aqi: f64,
    pub status: AirQualityStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Horizontal group of child blocks, laid out in array order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// CSS-style gap such as `"12px"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap: Option<String>,
    pub children: Vec<Block>,
}

impl Block {
    /// Shorthand for a markdown block.
    pub fn markdown(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Markdown(MarkdownBlock {
            id: Some(id.into()),
            content: content.into(),
        })
    }

    pub fn kind(&self) -> BlockKind {
        match self {
            Self::Markdown(_) => BlockKind::Markdown,
            Self::Image(_) => BlockKind::Image,
            Self::Chart(_) => BlockKind::Chart,
            Self::Table(_) => BlockKind::Table,
            Self::Map(_) => BlockKind::Map,
            Self::AirQuality(_) => BlockKind::AirQuality,
            Self::Row(_) => BlockKind::Row,
            Self::Unsupported => BlockKind::Unsupported,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Markdown(b) => b.id.as_deref(),
            Self::Image(b) => b.id.as_deref(),
            Self::Chart(b) => b.id.as_deref(),
            Self::Table(b) => b.id.as_deref(),
            Self::Map(b) => b.id.as_deref(),
            Self::AirQuality(b) => b.id.as_deref(),
            Self::Row(b) => b.id.as_deref(),
            Self::Unsupported => None,
        }
    }

    /// Visit this block and all descendants depth-first, in order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Block)) {
        visit(self);
        if let Self::Row(row) = self {
            for child in &row.children {
                child.walk(visit);
            }
        }
    }

    /// Check the per-variant invariants of this block and, for rows, of
    /// every descendant.
    pub fn validate(&self) -> Result<(), BlockError> {
        match self {
            Self::Markdown(_) | Self::Image(_) | Self::Unsupported => Ok(()),
            Self::Chart(chart) => chart.validate(),
            Self::Table(table) => table.validate(),
            Self::Map(map) => map.validate(),
            Self::AirQuality(aq) => aq.validate(),
            Self::Row(row) => row.children.iter().try_for_each(Block::validate),
        }
    }
}

impl ChartBlock {
    pub fn validate(&self) -> Result<(), BlockError> {
        let (labels, values) = (self.data.labels.len(), self.data.values.len());
        if labels != values {
            return Err(BlockError::ChartLengthMismatch {
                title: self.title.clone(),
                labels,
                values,
            });
        }
        if self.data.values.iter().any(|v| !v.is_finite()) {
            return Err(BlockError::NonFinite {
                kind: "chart".into(),
                field: "values".into(),
            });
        }
        Ok(())
    }

    /// Label/value pairs in series order.
    pub fn points(&self) -> impl Iterator<Item = (&str, f64)> {
        self.data
            .labels
            .iter()
            .map(String::as_str)
            .zip(self.data.values.iter().copied())
    }
}

impl TableBlock {
    pub fn validate(&self) -> Result<(), BlockError> {
        let headers = self.headers.len();
        for (row, cells) in self.rows.iter().enumerate() {
            if cells.len() != headers {
                return Err(BlockError::TableRowMismatch {
                    title: self.title.clone(),
                    row,
                    cells: cells.len(),
                    headers,
                });
            }
        }
        Ok(())
    }
}

impl LatLng {
    pub fn validate(&self) -> Result<(), BlockError> {
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(BlockError::NonFinite {
                kind: "map".into(),
                field: "coordinate".into(),
            });
        }
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lng) {
            return Err(BlockError::CoordinateOutOfRange {
                lat: self.lat,
                lng: self.lng,
            });
        }
        Ok(())
    }
}

impl MapBlock {
    pub fn validate(&self) -> Result<(), BlockError> {
        self.center.validate()?;
        if self.zoom.is_some_and(|z| !z.is_finite()) {
            return Err(BlockError::NonFinite {
                kind: "map".into(),
                field: "zoom".into(),
            });
        }
        self.markers.iter().try_for_each(|m| {
            LatLng {
                lat: m.lat,
                lng: m.lng,
            }
            .validate()
        })
    }
}

impl AirQualityBlock {
    pub fn validate(&self) -> Result<(), BlockError> {
        if !self.aqi.is_finite() {
            return Err(BlockError::NonFinite {
                kind: "air_quality".into(),
                field: "aqi".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(labels: &[&str], values: &[f64]) -> Block {
        Block::Chart(ChartBlock {
            id: None,
            chart_type: ChartKind::Bar,
            title: "steps".into(),
            description: None,
            data: ChartData {
                labels: labels.iter().map(|s| s.to_string()).collect(),
                values: values.to_vec(),
            },
        })
    }

    #[test]
    fn serializes_with_type_tag_and_wire_names() {
        let json = serde_json::to_value(chart(&["월"], &[1.0])).unwrap();
        assert_eq!(json["type"], "chart");
        assert_eq!(json["chartType"], "bar");
        assert_eq!(json["data"]["labels"][0], "월");
        assert!(json.get("id").is_none());

        let polar: ChartKind = serde_json::from_str("\"polarArea\"").unwrap();
        assert_eq!(polar, ChartKind::PolarArea);
        assert_eq!(polar.to_string(), "polarArea");
    }

    #[test]
    fn air_quality_tag_is_snake_case() {
        let block = Block::AirQuality(AirQualityBlock {
            id: Some("aq".into()),
            title: "서울".into(),
            aqi: 42.0,
            status: AirQualityStatus::Good,
            description: None,
        });
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "air_quality");
        assert_eq!(json["status"], "good");
        assert_eq!(block.kind().to_string(), "air_quality");
    }

    #[test]
    fn chart_parity_is_enforced() {
        assert!(chart(&["a", "b"], &[1.0, 2.0]).validate().is_ok());
        let err = chart(&["a", "b"], &[1.0]).validate().unwrap_err();
        assert!(matches!(
            err,
            BlockError::ChartLengthMismatch { labels: 2, values: 1, .. }
        ));
        assert!(chart(&["a"], &[f64::NAN]).validate().is_err());
    }

    #[test]
    fn table_row_width_is_enforced() {
        let mut table = TableBlock {
            id: None,
            title: "summary".into(),
            description: None,
            headers: vec!["항목".into(), "값".into()],
            rows: vec![vec!["걸음".into(), "8,957".into()]],
        };
        assert!(table.validate().is_ok());

        table.rows.push(vec!["수면".into()]);
        assert_eq!(
            table.validate().unwrap_err(),
            BlockError::TableRowMismatch {
                title: "summary".into(),
                row: 1,
                cells: 1,
                headers: 2,
            }
        );
    }

    #[test]
    fn row_validation_recurses() {
        let nested = Block::Row(RowBlock {
            id: None,
            gap: None,
            children: vec![Block::Row(RowBlock {
                id: None,
                gap: None,
                children: vec![chart(&["a"], &[])],
            })],
        });
        assert!(nested.validate().is_err());
    }

    #[test]
    fn walk_visits_in_document_order() {
        let tree = Block::Row(RowBlock {
            id: Some("outer".into()),
            gap: None,
            children: vec![
                Block::markdown("a", "A"),
                Block::Row(RowBlock {
                    id: Some("inner".into()),
                    gap: None,
                    children: vec![Block::markdown("b", "B")],
                }),
                Block::markdown("c", "C"),
            ],
        });
        let mut ids = Vec::new();
        tree.walk(&mut |b| ids.push(b.id().unwrap_or("-")));
        assert_eq!(ids, ["outer", "a", "inner", "b", "c"]);
    }

    #[test]
    fn map_coordinates_must_be_in_range() {
        let map = MapBlock {
            id: None,
            title: "t".into(),
            description: None,
            center: LatLng {
                lat: 37.4979,
                lng: 127.0276,
            },
            zoom: Some(16.0),
            markers: vec![MapMarker {
                lat: 95.0,
                lng: 0.0,
                label: None,
                category: Some(MarkerCategory::Restaurant),
            }],
        };
        assert!(matches!(
            map.validate(),
            Err(BlockError::CoordinateOutOfRange { .. })
        ));
    }
}
