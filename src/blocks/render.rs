//! Block renderer — maps each block variant to a terminal rendering.
//!
//! Rendering is a pure function of the block (and the optional map image
//! source): it never mutates a block and never touches session state.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};

use super::model::{
    AirQualityBlock, Block, BlockKind, ChartBlock, ImageBlock, MapBlock, MarkdownBlock, RowBlock,
    TableBlock,
};
use crate::error::MapImageError;

/// Gap used for rows that do not specify one, in pixels.
const DEFAULT_ROW_GAP_PX: f64 = 16.0;

/// Pixels per blank line when laying rows out as text.
const PX_PER_GAP_LINE: f64 = 12.0;

/// Width of the longest bar in a text chart.
const CHART_BAR_WIDTH: usize = 20;

const STATIC_MAP_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/staticmap";
const DEFAULT_MAP_ZOOM: u8 = 15;
const MAX_MAP_ZOOM: f64 = 21.0;

static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid regex"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s+").expect("valid regex"));
static GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*(?:px)?\s*$").expect("valid regex"));

/// Rendered form of a block tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    /// Renders nothing (unsupported blocks).
    Empty,
    /// A leaf block as display lines.
    Node { kind: BlockKind, lines: Vec<String> },
    /// A row: children in array order, separated by `gap_px`.
    Row { gap_px: f64, children: Vec<Rendered> },
}

impl Rendered {
    /// Lay the tree out as terminal text. Rows stack their children in
    /// order; empty nodes contribute nothing.
    pub fn to_text(&self) -> String {
        let mut lines = Vec::new();
        self.collect_lines(&mut lines);
        lines.join("\n")
    }

    fn collect_lines(&self, out: &mut Vec<String>) {
        match self {
            Self::Empty => {}
            Self::Node { lines, .. } => out.extend(lines.iter().cloned()),
            Self::Row { gap_px, children } => {
                let spacer = (gap_px / PX_PER_GAP_LINE).round().clamp(0.0, 3.0) as usize;
                let mut first = true;
                for child in children {
                    if matches!(child, Self::Empty) {
                        continue;
                    }
                    if !first {
                        out.extend(std::iter::repeat_n(String::new(), spacer));
                    }
                    child.collect_lines(out);
                    first = false;
                }
            }
        }
    }
}

/// Resolves a static image for a map block.
pub trait MapImageSource: Send + Sync {
    fn static_image_url(&self, map: &MapBlock) -> Result<String, MapImageError>;
}

/// Google Static Maps URL builder.
pub struct StaticMapUrl {
    api_key: SecretString,
}

impl StaticMapUrl {
    pub fn new(api_key: SecretString) -> Self {
        Self { api_key }
    }
}

impl MapImageSource for StaticMapUrl {
    fn static_image_url(&self, map: &MapBlock) -> Result<String, MapImageError> {
        let key = self.api_key.expose_secret();
        if key.trim().is_empty() {
            return Err(MapImageError::MissingKey);
        }
        map.center
            .validate()
            .map_err(|_| MapImageError::InvalidCenter)?;

        let center = format!("{},{}", map.center.lat, map.center.lng);
        let zoom = zoom_level(map.zoom).to_string();
        let markers = format!("color:red|{center}");
        let url = reqwest::Url::parse_with_params(
            STATIC_MAP_ENDPOINT,
            &[
                ("center", center.as_str()),
                ("zoom", zoom.as_str()),
                ("size", "600x400"),
                ("markers", markers.as_str()),
                ("key", key),
            ],
        )
        .map_err(|e| MapImageError::Url(e.to_string()))?;
        Ok(url.into())
    }
}

/// Dispatches blocks to per-variant rendering strategies.
#[derive(Clone, Default)]
pub struct BlockRenderer {
    map_source: Option<Arc<dyn MapImageSource>>,
}

impl BlockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_map_source(mut self, source: Arc<dyn MapImageSource>) -> Self {
        self.map_source = Some(source);
        self
    }

    /// Render one block. A leaf that breaks its invariants renders as
    /// [`Rendered::Empty`], however it was constructed.
    pub fn render(&self, block: &Block) -> Rendered {
        if !matches!(block, Block::Row(_)) {
            if let Err(e) = block.validate() {
                tracing::debug!(kind = %block.kind(), error = %e, "Skipping invalid block");
                return Rendered::Empty;
            }
        }
        match block {
            Block::Markdown(b) => render_markdown(b),
            Block::Image(b) => render_image(b),
            Block::Chart(b) => render_chart(b),
            Block::Table(b) => render_table(b),
            Block::Map(b) => self.render_map(b),
            Block::AirQuality(b) => render_air_quality(b),
            Block::Row(b) => self.render_row(b),
            Block::Unsupported => Rendered::Empty,
        }
    }

    /// Render a message body (a block list) as terminal text.
    pub fn render_text(&self, blocks: &[Block]) -> String {
        blocks
            .iter()
            .map(|b| self.render(b))
            .filter(|r| !matches!(r, Rendered::Empty))
            .map(|r| r.to_text())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn render_row(&self, row: &RowBlock) -> Rendered {
        Rendered::Row {
            gap_px: parse_gap(row.gap.as_deref()),
            children: row.children.iter().map(|c| self.render(c)).collect(),
        }
    }

    fn render_map(&self, map: &MapBlock) -> Rendered {
        let mut lines = vec![format!("🗺️  {}", map.title)];

        let image = self
            .map_source
            .as_ref()
            .map(|source| source.static_image_url(map));
        match image {
            Some(Ok(url)) => lines.push(url),
            Some(Err(e)) => {
                tracing::debug!(error = %e, "Static map unavailable, using placeholder");
                lines.push(map_placeholder(map));
            }
            None => lines.push(map_placeholder(map)),
        }

        for marker in &map.markers {
            let label = marker.label.as_deref().unwrap_or("•");
            lines.push(format!("📍 {label} ({:.3}, {:.3})", marker.lat, marker.lng));
        }
        if let Some(ref description) = map.description {
            lines.push(description.clone());
        }
        Rendered::Node {
            kind: BlockKind::Map,
            lines,
        }
    }
}

/// Integer zoom for the static map API, rounded and clamped to 0..=21.
fn zoom_level(zoom: Option<f64>) -> u8 {
    match zoom {
        Some(z) if z.is_finite() => z.round().clamp(0.0, MAX_MAP_ZOOM) as u8,
        _ => DEFAULT_MAP_ZOOM,
    }
}

/// Placeholder shown when no static map image is available.
pub fn map_placeholder(map: &MapBlock) -> String {
    format!("🗺️ 지도 ({:.3}, {:.3})", map.center.lat, map.center.lng)
}

fn parse_gap(gap: Option<&str>) -> f64 {
    gap.and_then(|g| GAP.captures(g))
        .and_then(|c| c[1].parse::<f64>().ok())
        .unwrap_or(DEFAULT_ROW_GAP_PX)
}

/// Strip markdown emphasis and heading markers for plain terminal output.
fn plain_markdown(content: &str) -> String {
    let without_headings = HEADING.replace_all(content, "");
    BOLD.replace_all(&without_headings, "$1").into_owned()
}

fn render_markdown(block: &MarkdownBlock) -> Rendered {
    Rendered::Node {
        kind: BlockKind::Markdown,
        lines: plain_markdown(&block.content)
            .lines()
            .map(str::to_string)
            .collect(),
    }
}

fn render_image(block: &ImageBlock) -> Rendered {
    let mut lines = vec![format!("🖼️  [{}] {}", block.alt, block.url)];
    if let Some(ref caption) = block.caption {
        lines.push(caption.clone());
    }
    Rendered::Node {
        kind: BlockKind::Image,
        lines,
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value:.2}")
    }
}

fn render_chart(block: &ChartBlock) -> Rendered {
    let mut lines = vec![format!("📊 {} ({})", block.title, block.chart_type)];

    let label_width = block
        .data
        .labels
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0);
    let max = block
        .data
        .values
        .iter()
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));

    for (label, value) in block.points() {
        let len = if max > 0.0 && value > 0.0 {
            ((value / max) * CHART_BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        let pad = label_width.saturating_sub(label.chars().count());
        lines.push(format!(
            "  {label}{} {} {}",
            " ".repeat(pad),
            "█".repeat(len),
            format_number(value)
        ));
    }
    if let Some(ref description) = block.description {
        lines.push(description.clone());
    }
    Rendered::Node {
        kind: BlockKind::Chart,
        lines,
    }
}

fn render_table(block: &TableBlock) -> Rendered {
    let mut widths: Vec<usize> = block.headers.iter().map(|h| h.chars().count()).collect();
    for row in &block.rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let format_row = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| {
                let pad = w.saturating_sub(cell.chars().count());
                format!("{cell}{}", " ".repeat(pad))
            })
            .collect::<Vec<_>>()
            .join(" | ")
    };

    let mut lines = vec![format!("📋 {}", block.title)];
    if let Some(ref description) = block.description {
        lines.push(description.clone());
    }
    lines.push(format_row(&block.headers));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in &block.rows {
        lines.push(format_row(row));
    }
    Rendered::Node {
        kind: BlockKind::Table,
        lines,
    }
}

fn render_air_quality(block: &AirQualityBlock) -> Rendered {
    let mut lines = vec![
        format!("🌫️  {}", block.title),
        format!(
            "AQI {} · {}",
            format_number(block.aqi),
            block.status.to_string().to_uppercase()
        ),
    ];
    if let Some(ref description) = block.description {
        lines.push(description.clone());
    }
    Rendered::Node {
        kind: BlockKind::AirQuality,
        lines,
    }
}
