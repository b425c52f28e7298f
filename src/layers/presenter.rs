use tracing::debug;

use super::{Layer, LayerContent, LayerKind};
use crate::collection::CollectionError;
use crate::control::SelectionState;
use crate::pipeline::FloodPipeline;
use crate::water::WaterIndex;

/// Computes the layer for `state`.
///
/// Returns `Ok(None)` for a layer name outside the dropdown: nothing is
/// drawn. An empty seasonal window still yields a (blank) layer.
pub fn render(
    pipeline: &FloodPipeline,
    state: &SelectionState,
) -> Result<Option<Layer>, CollectionError> {
    let Ok(kind) = state.layer.parse::<LayerKind>() else {
        debug!(layer = %state.layer, "no product for layer name");
        return Ok(None);
    };

    let year = state.year;
    let content = match kind {
        LayerKind::PermanentWater => LayerContent::Mask(pipeline.permanent_water()?.self_mask()),
        LayerKind::MonsoonFlood => LayerContent::Mask(pipeline.monsoon_flood(year)?),
        LayerKind::NdwiWater => LayerContent::Mask(pipeline.index_water(year, WaterIndex::Ndwi)?),
        LayerKind::MndwiWater => LayerContent::Mask(pipeline.index_water(year, WaterIndex::Mndwi)?),
        LayerKind::SentinelVv => {
            let composite = pipeline.backscatter_composite(year)?;
            LayerContent::Values {
                grid: *composite.grid(),
                data: composite.band(pipeline.polarisation())?.to_vec(),
            }
        }
    };

    let mut layer = Layer::new(kind, year, content);
    if kind == LayerKind::SentinelVv {
        // Dropdown label stays "Sentinel VV"
        layer = layer.named(format!("Sentinel-1 {} {}", pipeline.polarisation(), year));
    }
    debug!(layer = %layer.name, summary = %layer.content.summary(), "rendered layer");

    Ok(Some(layer))
}
