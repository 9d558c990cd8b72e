use super::boolean::{self, Operator};
use super::mesh::Shape;
use super::placement::{axis2_placement_3d, object_placement, transformation_operator};
use super::{extrusion, faces, invalid, resolve, resolve_attr, Result};
use crate::error::GeometryError;
use crate::model::Element;
use crate::parser::{IfcModel, StepEntity, StepValue};
use nalgebra::Matrix4;

/// Mapped items and boolean operands nested beyond this depth are treated as
/// malformed.
const MAX_NESTING_DEPTH: usize = 20;

const HALF_SPACE_TYPES: &[&str] = &[
    "IFCHALFSPACESOLID",
    "IFCBOXEDHALFSPACE",
    "IFCPOLYGONALBOUNDEDHALFSPACE",
];

/// Representation types holding solid geometry, used when no `Body`
/// identifier is present.
const SOLID_REPRESENTATION_TYPES: &[&str] = &[
    "SweptSolid",
    "AdvancedSweptSolid",
    "Brep",
    "AdvancedBrep",
    "Tessellation",
    "SurfaceModel",
    "Clipping",
    "CSG",
    "MappedRepresentation",
];

#[derive(Debug, Clone)]
pub struct GeometrySettings {
    /// Apply the element's object placement, producing world coordinates.
    pub use_world_coords: bool,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self {
            use_world_coords: true,
        }
    }
}

/// Builds metre-scaled shapes for the elements of one model.
pub struct GeometryEngine<'m> {
    model: &'m IfcModel,
    settings: GeometrySettings,
}

impl<'m> GeometryEngine<'m> {
    #[must_use]
    pub fn new(model: &'m IfcModel, settings: GeometrySettings) -> Self {
        Self { model, settings }
    }

    /// Tessellates the element's body representation and cuts its openings
    /// out of it.
    ///
    /// # Errors
    ///
    /// Fails when the element has no usable body representation, when an item
    /// is of an unsupported type, or when referenced entities are malformed.
    pub fn create_shape(&self, element: &Element) -> Result<Shape> {
        let openings = self.model.openings_of(element.id);
        let placement = if self.settings.use_world_coords || !openings.is_empty() {
            self.placement(element)?
        } else {
            None
        };

        let mut shape = self.local_shape(element)?;
        if !openings.is_empty() {
            shape = self.subtract_openings(element, shape, placement.as_ref(), openings)?;
        }

        if self.settings.use_world_coords {
            if let Some(placement) = &placement {
                shape.transform(placement);
            }
        }
        shape.scale(self.model.length_unit_scale());

        tracing::debug!(
            element = element.id,
            triangles = shape.triangle_count(),
            "Tessellated element"
        );
        Ok(shape)
    }

    /// Body geometry in the element's own coordinate system, in model units.
    fn local_shape(&self, element: &Element) -> Result<Shape> {
        let representation_id = element
            .representation
            .ok_or(GeometryError::NoRepresentation(element.id))?;
        let product_shape = resolve(self.model, representation_id)?;
        let representation = self.body_representation(element, product_shape)?;
        self.representation_shape(representation, 0)
    }

    fn placement(&self, element: &Element) -> Result<Option<Matrix4<f64>>> {
        element
            .placement
            .map(|id| object_placement(self.model, resolve(self.model, id)?))
            .transpose()
    }

    /// Subtracts each voiding opening, moved into the host's coordinate
    /// system. Openings without a representation cut nothing.
    fn subtract_openings(
        &self,
        element: &Element,
        mut shape: Shape,
        host_placement: Option<&Matrix4<f64>>,
        openings: &[u64],
    ) -> Result<Shape> {
        let to_host = match host_placement {
            Some(placement) => placement.try_inverse().ok_or_else(|| GeometryError::InvalidEntity {
                id: element.id,
                entity_type: element.entity_type.clone(),
                message: "ObjectPlacement is not invertible".to_string(),
            })?,
            None => Matrix4::identity(),
        };

        for &opening_id in openings {
            let opening = self
                .model
                .element(opening_id)
                .ok_or(GeometryError::MissingEntity(opening_id))?;
            if !opening.has_representation() {
                continue;
            }
            let mut cutter = self.local_shape(&opening)?;
            if let Some(placement) = self.placement(&opening)? {
                cutter.transform(&(to_host * placement));
            } else {
                cutter.transform(&to_host);
            }
            shape = boolean::apply(Operator::Difference, shape, &cutter);
        }

        tracing::debug!(element = element.id, openings = openings.len(), "Subtracted openings");
        Ok(shape)
    }

    /// IfcProductDefinitionShape: Name, Description, Representations.
    fn body_representation(
        &self,
        element: &Element,
        product_shape: &'m StepEntity,
    ) -> Result<&'m StepEntity> {
        let representations = product_shape
            .get_ref_list(2)
            .into_iter()
            .map(|id| resolve(self.model, id))
            .collect::<Result<Vec<_>>>()?;

        // IfcShapeRepresentation: ContextOfItems, RepresentationIdentifier,
        // RepresentationType, Items
        let by_identifier = |identifier: &str| {
            representations
                .iter()
                .find(|r| r.get_str(1) == Some(identifier))
                .copied()
        };
        let by_type = || {
            representations
                .iter()
                .find(|r| {
                    r.get_str(2)
                        .is_some_and(|t| SOLID_REPRESENTATION_TYPES.contains(&t))
                })
                .copied()
        };

        by_identifier("Body")
            .or_else(|| by_identifier("Facetation"))
            .or_else(by_type)
            .ok_or(GeometryError::NoBodyRepresentation(element.id))
    }

    fn representation_shape(&self, representation: &StepEntity, depth: usize) -> Result<Shape> {
        let mut shape = Shape::new();
        for item_id in representation.get_ref_list(3) {
            let item = resolve(self.model, item_id)?;
            shape.append(self.item_shape(item, depth)?);
        }
        Ok(shape)
    }

    fn item_shape(&self, item: &StepEntity, depth: usize) -> Result<Shape> {
        match item.entity_type.as_str() {
            "IFCEXTRUDEDAREASOLID" => extrusion::extruded_area_solid(self.model, item),
            "IFCFACETEDBREP" | "IFCFACETEDBREPWITHVOIDS" => faces::faceted_brep(self.model, item),
            "IFCTRIANGULATEDFACESET" => faces::triangulated_face_set(self.model, item),
            "IFCPOLYGONALFACESET" => faces::polygonal_face_set(self.model, item),
            "IFCMAPPEDITEM" => self.mapped_item(item, depth),
            "IFCBOOLEANRESULT" | "IFCBOOLEANCLIPPINGRESULT" => self.boolean_result(item, depth),
            _ => Err(GeometryError::Unsupported {
                id: item.id,
                entity_type: item.entity_type.clone(),
            }),
        }
    }

    /// IfcMappedItem: MappingSource, MappingTarget.
    fn mapped_item(&self, item: &StepEntity, depth: usize) -> Result<Shape> {
        if depth >= MAX_NESTING_DEPTH {
            return Err(invalid(item, "mapped items nested too deeply"));
        }

        // IfcRepresentationMap: MappingOrigin, MappedRepresentation
        let source = resolve_attr(self.model, item, 0, "MappingSource")?;
        let origin = resolve_attr(self.model, source, 0, "MappingOrigin")?;
        let mapped = resolve_attr(self.model, source, 1, "MappedRepresentation")?;
        let target = resolve_attr(self.model, item, 1, "MappingTarget")?;

        let mut shape = self.representation_shape(mapped, depth + 1)?;
        let origin_matrix = match origin.entity_type.as_str() {
            "IFCAXIS2PLACEMENT3D" => axis2_placement_3d(self.model, origin)?,
            _ => {
                return Err(GeometryError::Unsupported {
                    id: origin.id,
                    entity_type: origin.entity_type.clone(),
                })
            }
        };
        shape.transform(&(transformation_operator(self.model, target)? * origin_matrix));
        Ok(shape)
    }

    /// IfcBooleanResult: Operator, FirstOperand, SecondOperand.
    fn boolean_result(&self, item: &StepEntity, depth: usize) -> Result<Shape> {
        if depth >= MAX_NESTING_DEPTH {
            return Err(invalid(item, "boolean operands nested too deeply"));
        }
        let operator = item
            .get(0)
            .and_then(StepValue::as_enum)
            .and_then(Operator::from_step)
            .ok_or_else(|| invalid(item, "Operator is not UNION, INTERSECTION or DIFFERENCE"))?;

        let first = self.item_shape(resolve_attr(self.model, item, 1, "FirstOperand")?, depth + 1)?;
        let operand = resolve_attr(self.model, item, 2, "SecondOperand")?;

        let second = if HALF_SPACE_TYPES.contains(&operand.entity_type.as_str()) {
            // An unbounded operand is cut down to the region of the first
            match first.bounds() {
                Some(extent) => boolean::half_space(self.model, operand, &extent)?,
                None => Shape::new(),
            }
        } else {
            self.item_shape(operand, depth + 1)?
        };

        Ok(boolean::apply(operator, first, &second))
    }
}
