//! Solid booleans: IfcBooleanResult operands, half-space clipping and
//! opening subtraction.
//!
//! Overlapping operands go through `csgrs`; operands whose bounding boxes are
//! disjoint are combined directly.

use super::extrusion::extrude;
use super::faces::push_face;
use super::mesh::Shape;
use super::placement::axis2_placement_3d;
use super::profile::{curve_points, Profile};
use super::{invalid, resolve_attr, Result};
use crate::error::GeometryError;
use crate::parser::{IfcModel, StepEntity, StepValue};
use csgrs::mesh::{polygon::Polygon, vertex::Vertex, Mesh as CsgMesh};
use csgrs::traits::CSG;
use nalgebra::{Matrix4, Point2, Point3, Vector3};

type Bounds = (Point3<f64>, Point3<f64>);

/// IfcBooleanOperator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Union,
    Intersection,
    Difference,
}

impl Operator {
    #[must_use]
    pub fn from_step(value: &str) -> Option<Self> {
        match value {
            "UNION" => Some(Self::Union),
            "INTERSECTION" => Some(Self::Intersection),
            "DIFFERENCE" => Some(Self::Difference),
            _ => None,
        }
    }
}

/// Combines two closed shapes.
#[must_use]
pub fn apply(operator: Operator, mut first: Shape, second: &Shape) -> Shape {
    let overlapping = match (first.bounds(), second.bounds()) {
        (Some(a), Some(b)) => overlaps(&a, &b),
        _ => false,
    };

    match (operator, overlapping) {
        (Operator::Difference, false) => first,
        (Operator::Intersection, false) => Shape::new(),
        (Operator::Union, false) => {
            first.append(second.clone());
            first
        }
        (Operator::Difference, true) => from_csg(&to_csg(&first).difference(&to_csg(second))),
        (Operator::Intersection, true) => from_csg(&to_csg(&first).intersection(&to_csg(second))),
        (Operator::Union, true) => from_csg(&to_csg(&first).union(&to_csg(second))),
    }
}

fn overlaps((a_min, a_max): &Bounds, (b_min, b_max): &Bounds) -> bool {
    (0..3).all(|i| a_min[i] <= b_max[i] && b_min[i] <= a_max[i])
}

fn to_csg(shape: &Shape) -> CsgMesh<()> {
    let polygons: Vec<Polygon<()>> = shape
        .triangles()
        .filter_map(|&[a, b, c]| {
            // Degenerate triangles carry no normal
            let normal = (b - a).cross(&(c - a)).try_normalize(1e-12)?;
            Some(Polygon::new(
                vec![
                    Vertex::new(a, normal),
                    Vertex::new(b, normal),
                    Vertex::new(c, normal),
                ],
                None,
            ))
        })
        .collect();
    CsgMesh::from_polygons(&polygons, None)
}

fn from_csg(mesh: &CsgMesh<()>) -> Shape {
    let mut shape = Shape::new();
    for polygon in &mesh.polygons {
        let points: Vec<Point3<f64>> = polygon.vertices.iter().map(|v| v.pos).collect();
        if let Err(err) = push_face(&mut shape, &points, &[]) {
            tracing::debug!(error = %err, vertices = points.len(), "Dropping boolean face");
        }
    }
    shape
}

/// The material of a half-space operand, bounded to a box that covers
/// `extent` with margin.
///
/// IfcHalfSpaceSolid: BaseSurface, AgreementFlag. IfcBoxedHalfSpace adds an
/// Enclosure that only speeds up viewers; IfcPolygonalBoundedHalfSpace adds
/// Position and PolygonalBoundary.
pub fn half_space(model: &IfcModel, entity: &StepEntity, extent: &Bounds) -> Result<Shape> {
    let surface = resolve_attr(model, entity, 0, "BaseSurface")?;
    if surface.entity_type != "IFCPLANE" {
        return Err(GeometryError::Unsupported {
            id: surface.id,
            entity_type: surface.entity_type.clone(),
        });
    }
    // IfcPlane: Position
    let plane = axis2_placement_3d(model, resolve_attr(model, surface, 0, "Position")?)?;
    let agreement = match entity.get(1) {
        Some(StepValue::Boolean(flag)) => *flag,
        _ => return Err(invalid(entity, "AgreementFlag is not a boolean")),
    };

    let margin = margin(extent);
    let (min, max) = local_bounds(&plane, extent, entity)?;
    let (low, high) = (min.x.min(min.y) - margin, max.x.max(max.y) + margin);
    // The base surface normal points away from the material when the flag is set
    let (bottom, top) = if agreement {
        (min.z.min(0.0) - margin, 0.0)
    } else {
        (0.0, max.z.max(0.0) + margin)
    };
    let mut material = cuboid(
        &Point3::new(low, low, bottom),
        &Point3::new(high, high, top),
    )?;
    material.transform(&plane);

    if entity.entity_type != "IFCPOLYGONALBOUNDEDHALFSPACE" {
        return Ok(material);
    }

    let position = axis2_placement_3d(model, resolve_attr(model, entity, 2, "Position")?)?;
    let boundary = curve_points(model, resolve_attr(model, entity, 3, "PolygonalBoundary")?)?;
    if boundary.len() < 3 {
        return Err(invalid(entity, "PolygonalBoundary needs at least three points"));
    }
    let (min, max) = local_bounds(&position, extent, entity)?;
    let (bottom, top) = (min.z.min(0.0) - margin, max.z.max(0.0) + margin);
    let mut prism = extrude(
        &Profile::new(boundary, Vec::new()),
        Vector3::new(0.0, 0.0, top - bottom),
    )?;
    prism.transform(&(position * Matrix4::new_translation(&Vector3::new(0.0, 0.0, bottom))));

    Ok(apply(Operator::Intersection, material, &prism))
}

fn margin((min, max): &Bounds) -> f64 {
    (max - min).norm().max(1e-3)
}

/// Bounds of `extent`'s corners expressed in the frame `placement`.
fn local_bounds(placement: &Matrix4<f64>, (min, max): &Bounds, owner: &StepEntity) -> Result<Bounds> {
    let to_local = placement
        .try_inverse()
        .ok_or_else(|| invalid(owner, "placement is not invertible"))?;
    let corners = (0..8).map(|i| {
        Point3::new(
            if i & 1 == 0 { min.x } else { max.x },
            if i & 2 == 0 { min.y } else { max.y },
            if i & 4 == 0 { min.z } else { max.z },
        )
    });
    let mut local = corners.map(|p| to_local.transform_point(&p));
    let first = local
        .next()
        .ok_or_else(|| invalid(owner, "empty extent"))?;
    Ok(local.fold((first, first), |(lo, hi), p| (lo.inf(&p), hi.sup(&p))))
}

/// Axis-aligned box with outward winding.
fn cuboid(min: &Point3<f64>, max: &Point3<f64>) -> Result<Shape> {
    let base = Profile::new(
        vec![
            Point2::new(min.x, min.y),
            Point2::new(max.x, min.y),
            Point2::new(max.x, max.y),
            Point2::new(min.x, max.y),
        ],
        Vec::new(),
    );
    let mut shape = extrude(&base, Vector3::new(0.0, 0.0, max.z - min.z))?;
    shape.transform(&Matrix4::new_translation(&Vector3::new(0.0, 0.0, min.z)));
    Ok(shape)
}
