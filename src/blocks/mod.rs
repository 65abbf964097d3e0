//! Structured chat content returned by the coaching backend.
//!
//! The backend answers with a list of typed blocks (markdown, charts,
//! tables, images, maps, air-quality cards) that may be grouped into
//! arbitrarily nested rows. `decode` turns untrusted JSON into a block tree,
//! neutralizing bad entries; `render` turns a tree into terminal output.

pub mod decode;
pub mod model;
pub mod render;

pub use decode::{BlockAnomaly, DecodedBlocks, decode_block, decode_blocks, decode_response};
pub use model::{
    AirQualityBlock, AirQualityStatus, Block, BlockKind, ChartBlock, ChartData, ChartKind,
    ImageBlock, LatLng, MapBlock, MapMarker, MarkdownBlock, MarkerCategory, RowBlock, TableBlock,
};
pub use render::{BlockRenderer, MapImageSource, Rendered, StaticMapUrl, map_placeholder};
