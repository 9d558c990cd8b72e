//! Polygon triangulation on top of earcutr.

use super::Result;
use crate::error::GeometryError;
use nalgebra::{Point2, Point3, Vector3};

/// Twice the signed area; positive for counter-clockwise rings.
#[must_use]
pub fn signed_area(ring: &[Point2<f64>]) -> f64 {
    ring.iter()
        .zip(ring.iter().cycle().skip(1))
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum()
}

/// Drops a repeated closing point and consecutive duplicates.
#[must_use]
pub fn open_ring<P: Copy + PartialEq>(points: &[P]) -> Vec<P> {
    let mut ring: Vec<P> = Vec::with_capacity(points.len());
    for &p in points {
        if ring.last() != Some(&p) {
            ring.push(p);
        }
    }
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

/// Triangulates a polygon with holes.
///
/// Indices address the concatenation `outer ++ holes[0] ++ holes[1] ...`.
pub fn triangulate(outer: &[Point2<f64>], holes: &[Vec<Point2<f64>>]) -> Result<Vec<[usize; 3]>> {
    if outer.len() < 3 {
        return Err(GeometryError::Triangulation(format!(
            "polygon needs at least 3 points, got {}",
            outer.len()
        )));
    }

    let holes: Vec<&Vec<Point2<f64>>> = holes.iter().filter(|h| h.len() >= 3).collect();
    if outer.len() == 3 && holes.is_empty() {
        return Ok(vec![[0, 1, 2]]);
    }

    let total = outer.len() + holes.iter().map(|h| h.len()).sum::<usize>();
    let mut vertices = Vec::with_capacity(total * 2);
    let mut hole_starts = Vec::with_capacity(holes.len());

    for p in outer {
        vertices.extend([p.x, p.y]);
    }
    for hole in holes {
        hole_starts.push(vertices.len() / 2);
        for p in hole {
            vertices.extend([p.x, p.y]);
        }
    }

    let indices = earcutr::earcut(&vertices, &hole_starts, 2)
        .map_err(|e| GeometryError::Triangulation(format!("{e:?}")))?;

    Ok(indices
        .chunks_exact(3)
        .map(|t| [t[0], t[1], t[2]])
        .collect())
}

/// Newell normal of a planar 3D ring (not normalized).
#[must_use]
pub fn newell_normal(ring: &[Point3<f64>]) -> Vector3<f64> {
    ring.iter()
        .zip(ring.iter().cycle().skip(1))
        .fold(Vector3::zeros(), |n, (a, b)| {
            n + Vector3::new(
                (a.y - b.y) * (a.z + b.z),
                (a.z - b.z) * (a.x + b.x),
                (a.x - b.x) * (a.y + b.y),
            )
        })
}

/// Projects points onto the plane with normal `normal`, in a 2D basis whose
/// counter-clockwise direction matches the normal.
#[must_use]
pub fn project(points: &[Point3<f64>], normal: &Vector3<f64>) -> Vec<Point2<f64>> {
    let reference = if normal.x.abs() <= normal.y.abs() && normal.x.abs() <= normal.z.abs() {
        Vector3::x()
    } else if normal.y.abs() <= normal.z.abs() {
        Vector3::y()
    } else {
        Vector3::z()
    };
    let u = normal.cross(&reference).normalize();
    let v = normal.cross(&u).normalize();

    points
        .iter()
        .map(|p| Point2::new(p.coords.dot(&u), p.coords.dot(&v)))
        .collect()
}
