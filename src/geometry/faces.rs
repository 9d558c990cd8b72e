//! Boundary representations: faceted B-reps and indexed face sets.

use super::mesh::Shape;
use super::placement::{point3, point_list};
use super::triangulation::{newell_normal, open_ring, project, triangulate};
use super::{invalid, resolve, resolve_attr, Result};
use crate::error::GeometryError;
use crate::parser::{IfcModel, StepEntity, StepValue};
use nalgebra::Point3;

/// Adds a planar polygon face, winding triangles to agree with the outer
/// loop's orientation. Degenerate faces are dropped.
pub fn push_face(shape: &mut Shape, outer: &[Point3<f64>], holes: &[Vec<Point3<f64>>]) -> Result<()> {
    let outer = open_ring(outer);
    if outer.len() < 3 {
        return Ok(());
    }
    if outer.len() == 3 && holes.is_empty() {
        shape.push_triangle(outer[0], outer[1], outer[2]);
        return Ok(());
    }

    let normal = newell_normal(&outer);
    let Some(normal) = normal.try_normalize(1e-12) else {
        return Ok(());
    };

    let holes: Vec<Vec<Point3<f64>>> = holes
        .iter()
        .map(|h| open_ring(h))
        .filter(|h| h.len() >= 3)
        .collect();
    let points: Vec<Point3<f64>> = outer.iter().chain(holes.iter().flatten()).copied().collect();

    let outer_2d = project(&outer, &normal);
    let holes_2d: Vec<_> = holes.iter().map(|h| project(h, &normal)).collect();

    for [a, b, c] in triangulate(&outer_2d, &holes_2d)? {
        let (pa, pb, pc) = (points[a], points[b], points[c]);
        if (pb - pa).cross(&(pc - pa)).dot(&normal) < 0.0 {
            shape.push_triangle(pa, pc, pb);
        } else {
            shape.push_triangle(pa, pb, pc);
        }
    }

    Ok(())
}

/// IfcFacetedBrep: Outer; IfcFacetedBrepWithVoids adds Voids.
pub fn faceted_brep(model: &IfcModel, entity: &StepEntity) -> Result<Shape> {
    let mut shape = closed_shell(model, resolve_attr(model, entity, 0, "Outer")?)?;

    if entity.entity_type == "IFCFACETEDBREPWITHVOIDS" {
        for void_id in entity.get_ref_list(1) {
            // Void shells bound the cavity, so their faces point away from the solid
            let mut void = closed_shell(model, resolve(model, void_id)?)?;
            void.flip();
            shape.append(void);
        }
    }

    Ok(shape)
}

/// IfcClosedShell / IfcOpenShell: CfsFaces.
fn closed_shell(model: &IfcModel, shell: &StepEntity) -> Result<Shape> {
    let mut shape = Shape::new();
    for face_id in shell.get_ref_list(0) {
        face(model, resolve(model, face_id)?, &mut shape)?;
    }
    Ok(shape)
}

/// IfcFace: Bounds.
fn face(model: &IfcModel, face: &StepEntity, shape: &mut Shape) -> Result<()> {
    let mut outer: Option<Vec<Point3<f64>>> = None;
    let mut holes = Vec::new();

    for bound_id in face.get_ref_list(0) {
        // IfcFaceBound / IfcFaceOuterBound: Bound, Orientation
        let bound = resolve(model, bound_id)?;
        let mut points = poly_loop(model, resolve_attr(model, bound, 0, "Bound")?)?;
        if bound.get(1) == Some(&StepValue::Boolean(false)) {
            points.reverse();
        }

        if bound.entity_type == "IFCFACEOUTERBOUND" && outer.is_none() {
            outer = Some(points);
        } else {
            holes.push(points);
        }
    }

    // Without an explicit outer bound the first bound is the outer one
    let outer = match outer {
        Some(outer) => outer,
        None if !holes.is_empty() => holes.remove(0),
        None => return Err(invalid(face, "face has no bounds")),
    };

    push_face(shape, &outer, &holes)
}

/// IfcPolyLoop: Polygon.
fn poly_loop(model: &IfcModel, entity: &StepEntity) -> Result<Vec<Point3<f64>>> {
    if entity.entity_type != "IFCPOLYLOOP" {
        return Err(GeometryError::Unsupported {
            id: entity.id,
            entity_type: entity.entity_type.clone(),
        });
    }
    entity
        .get_ref_list(0)
        .into_iter()
        .map(|id| point3(resolve(model, id)?))
        .collect()
}

/// 1-based coordinate indices, optionally remapped through PnIndex.
struct IndexedPoints<'a> {
    owner: &'a StepEntity,
    points: Vec<Point3<f64>>,
    pn_index: Option<Vec<usize>>,
}

impl<'a> IndexedPoints<'a> {
    fn new(model: &IfcModel, owner: &'a StepEntity, pn_index: Option<&[StepValue]>) -> Result<Self> {
        let points = point_list(resolve_attr(model, owner, 0, "Coordinates")?)?;
        let pn_index = pn_index
            .map(|list| {
                list.iter()
                    .map(|v| one_based(owner, v))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;
        Ok(Self {
            owner,
            points,
            pn_index,
        })
    }

    fn point(&self, value: &StepValue) -> Result<Point3<f64>> {
        let mut index = one_based(self.owner, value)?;
        if let Some(pn_index) = &self.pn_index {
            index = *pn_index
                .get(index)
                .ok_or_else(|| invalid(self.owner, "index outside PnIndex"))?;
        }
        self.points
            .get(index)
            .copied()
            .ok_or_else(|| invalid(self.owner, "index outside coordinate list"))
    }

    fn polygon(&self, indices: &StepValue) -> Result<Vec<Point3<f64>>> {
        indices
            .as_list()
            .ok_or_else(|| invalid(self.owner, "index list expected"))?
            .iter()
            .map(|v| self.point(v))
            .collect()
    }
}

fn one_based(owner: &StepEntity, value: &StepValue) -> Result<usize> {
    match value.as_f64() {
        Some(i) if i >= 1.0 => Ok(i as usize - 1),
        _ => Err(invalid(owner, "indices are 1-based integers")),
    }
}

/// IfcTriangulatedFaceSet: Coordinates, Normals, Closed, CoordIndex, PnIndex.
pub fn triangulated_face_set(model: &IfcModel, entity: &StepEntity) -> Result<Shape> {
    let points = IndexedPoints::new(model, entity, entity.get_list(4))?;
    let triangles = entity
        .get_list(3)
        .ok_or_else(|| invalid(entity, "CoordIndex is not a list"))?;

    let mut shape = Shape::new();
    for triangle in triangles {
        match points.polygon(triangle)?.as_slice() {
            [a, b, c] => shape.push_triangle(*a, *b, *c),
            _ => return Err(invalid(entity, "CoordIndex entries must have 3 indices")),
        }
    }
    Ok(shape)
}

/// IfcPolygonalFaceSet: Coordinates, Closed, Faces, PnIndex.
pub fn polygonal_face_set(model: &IfcModel, entity: &StepEntity) -> Result<Shape> {
    let points = IndexedPoints::new(model, entity, entity.get_list(3))?;

    let mut shape = Shape::new();
    for face_id in entity.get_ref_list(2) {
        // IfcIndexedPolygonalFace: CoordIndex; ...WithVoids adds InnerCoordIndices
        let face = resolve(model, face_id)?;
        let outer = points.polygon(
            face.get(0)
                .ok_or_else(|| invalid(face, "missing CoordIndex"))?,
        )?;
        let holes = match face.get_list(1) {
            Some(inner) => inner
                .iter()
                .map(|indices| points.polygon(indices))
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        push_face(&mut shape, &outer, &holes)?;
    }
    Ok(shape)
}
