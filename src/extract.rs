//! Per-element extraction: one row per measurable element, one diagnostic per
//! element whose geometry could not be measured.

use crate::geometry::{self, GeometryEngine, GeometrySettings};
use crate::material::resolve_material;
use crate::model::{format_metric, Element, ElementRow, SkippedElement, NOT_AVAILABLE};
use crate::parser::IfcModel;

/// Outcome of a run over all elements.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub rows: Vec<ElementRow>,
    pub skipped: Vec<SkippedElement>,
}

/// Builds rows for every element that carries a representation.
///
/// Elements without a representation are left out without a diagnostic.
#[must_use]
pub fn extract(model: &IfcModel, settings: GeometrySettings) -> Extraction {
    let engine = GeometryEngine::new(model, settings);
    let mut extraction = Extraction::default();

    for element in model.elements() {
        if !element.has_representation() {
            continue;
        }

        match element_row(model, &engine, &element) {
            Ok(row) => extraction.rows.push(row),
            Err(skipped) => {
                tracing::debug!(
                    element = skipped.object_id,
                    global_id = %skipped.global_id,
                    reason = %skipped.reason,
                    "Skipping element"
                );
                extraction.skipped.push(skipped);
            }
        }
    }

    tracing::info!(
        rows = extraction.rows.len(),
        skipped = extraction.skipped.len(),
        "Extraction finished"
    );
    extraction
}

fn element_row(
    model: &IfcModel,
    engine: &GeometryEngine<'_>,
    element: &Element,
) -> Result<ElementRow, SkippedElement> {
    let or_na = |value: &Option<String>| value.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let material = resolve_material(model, element);

    let metrics = measure(engine, element).map_err(|err| SkippedElement {
        object_id: element.id,
        global_id: element.global_id.clone(),
        reason: err.to_string(),
    })?;

    let [volume, surface_area, top_elevation, bottom_elevation] = metrics.map(format_metric);
    Ok(ElementRow {
        object_id: element.id,
        global_id: element.global_id.clone(),
        name: or_na(&element.name),
        description: or_na(&element.description),
        object_type: or_na(&element.object_type),
        material,
        volume,
        surface_area,
        top_elevation,
        bottom_elevation,
    })
}

/// Volume, surface area, top and bottom elevation, in that order.
fn measure(engine: &GeometryEngine<'_>, element: &Element) -> geometry::Result<[f64; 4]> {
    let shape = engine.create_shape(element)?;
    Ok([
        shape.volume()?,
        shape.area()?,
        shape.top_elevation()?,
        shape.bottom_elevation()?,
    ])
}
