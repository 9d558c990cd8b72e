//! IfcExtrudedAreaSolid: a profile swept along a direction.

use super::mesh::Shape;
use super::placement::{axis2_placement_3d, direction3};
use super::profile::{profile, Profile};
use super::triangulation::{signed_area, triangulate};
use super::{invalid, resolve, resolve_attr, Result};
use crate::parser::{IfcModel, StepEntity};
use nalgebra::{Point2, Point3, Vector3};

/// Builds the solid in the coordinate system its Position places it in.
///
/// IfcExtrudedAreaSolid: SweptArea, Position, ExtrudedDirection, Depth.
pub fn extruded_area_solid(model: &IfcModel, entity: &StepEntity) -> Result<Shape> {
    let swept_area = profile(model, resolve_attr(model, entity, 0, "SweptArea")?)?;
    let direction = direction3(resolve_attr(model, entity, 2, "ExtrudedDirection")?)?;
    let depth = match entity.get_f64(3) {
        Some(depth) if depth > 0.0 => depth,
        _ => return Err(invalid(entity, "Depth must be positive")),
    };
    if direction.z.abs() < 1e-9 {
        return Err(invalid(entity, "ExtrudedDirection lies in the profile plane"));
    }

    let mut shape = extrude(&swept_area, direction * depth)?;

    // Position is optional since IFC4
    if let Some(id) = entity.get_ref(1) {
        shape.transform(&axis2_placement_3d(model, resolve(model, id)?)?);
    }

    Ok(shape)
}

/// Extrudes `profile` from z = 0 by `offset`, with outward-facing triangles.
pub fn extrude(profile: &Profile, offset: Vector3<f64>) -> Result<Shape> {
    let points: Vec<Point2<f64>> = profile.rings().flatten().copied().collect();
    let bottom = |p: &Point2<f64>| Point3::new(p.x, p.y, 0.0);
    let top = |p: &Point2<f64>| Point3::new(p.x, p.y, 0.0) + offset;

    let mut shape = Shape::new();

    for [a, b, c] in triangulate(&profile.outer, &profile.holes)? {
        let (pa, pb, pc) = (&points[a], &points[b], &points[c]);
        let (pb, pc) = if signed_area(&[*pa, *pb, *pc]) < 0.0 {
            (pc, pb)
        } else {
            (pb, pc)
        };
        // Bottom faces -Z, top faces +Z
        shape.push_triangle(bottom(pa), bottom(pc), bottom(pb));
        shape.push_triangle(top(pa), top(pb), top(pc));
    }

    // Outer ring is counter-clockwise and holes clockwise, so (edge, offset)
    // always yields an outward normal.
    for ring in profile.rings() {
        for (p, q) in ring.iter().zip(ring.iter().cycle().skip(1)) {
            shape.push_triangle(bottom(p), bottom(q), top(q));
            shape.push_triangle(bottom(p), top(q), top(p));
        }
    }

    if offset.z < 0.0 {
        shape.flip();
    }

    Ok(shape)
}
