//! Triangulated shapes and the metrics measured on them.

use super::Result;
use crate::error::GeometryError;
use nalgebra::{Matrix4, Point3};

/// Triangle soup in a single coordinate system.
///
/// Triangles are expected to wind counter-clockwise seen from outside, which
/// makes [`Shape::volume`] positive for closed solids.
#[derive(Debug, Clone, Default)]
pub struct Shape {
    triangles: Vec<[Point3<f64>; 3]>,
}

impl Shape {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn triangles(&self) -> impl Iterator<Item = &[Point3<f64>; 3]> {
        self.triangles.iter()
    }

    pub fn push_triangle(&mut self, a: Point3<f64>, b: Point3<f64>, c: Point3<f64>) {
        self.triangles.push([a, b, c]);
    }

    pub fn append(&mut self, other: Shape) {
        self.triangles.extend(other.triangles);
    }

    /// Reverses the winding of every triangle.
    pub fn flip(&mut self) {
        for triangle in &mut self.triangles {
            triangle.swap(1, 2);
        }
    }

    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        for triangle in &mut self.triangles {
            for vertex in triangle.iter_mut() {
                *vertex = matrix.transform_point(vertex);
            }
        }
        // Mirroring transforms turn the solid inside out
        if matrix.fixed_view::<3, 3>(0, 0).determinant() < 0.0 {
            self.flip();
        }
    }

    pub fn scale(&mut self, factor: f64) {
        if (factor - 1.0).abs() < f64::EPSILON {
            return;
        }
        for triangle in &mut self.triangles {
            for vertex in triangle.iter_mut() {
                vertex.coords *= factor;
            }
        }
    }

    /// Enclosed volume as the signed sum of origin-based tetrahedra.
    pub fn volume(&self) -> Result<f64> {
        self.ensure_not_empty()?;
        Ok(self
            .triangles
            .iter()
            .map(|[a, b, c]| a.coords.dot(&b.coords.cross(&c.coords)) / 6.0)
            .sum())
    }

    /// Total surface area of all triangles.
    pub fn area(&self) -> Result<f64> {
        self.ensure_not_empty()?;
        Ok(self
            .triangles
            .iter()
            .map(|[a, b, c]| (b - a).cross(&(c - a)).norm() / 2.0)
            .sum())
    }

    /// Highest vertex Z.
    pub fn top_elevation(&self) -> Result<f64> {
        self.ensure_not_empty()?;
        Ok(self.vertex_z().fold(f64::NEG_INFINITY, f64::max))
    }

    /// Lowest vertex Z.
    pub fn bottom_elevation(&self) -> Result<f64> {
        self.ensure_not_empty()?;
        Ok(self.vertex_z().fold(f64::INFINITY, f64::min))
    }

    /// Axis-aligned bounding box, `None` for an empty shape.
    #[must_use]
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let mut vertices = self.triangles.iter().flatten();
        let first = *vertices.next()?;
        Some(vertices.fold((first, first), |(min, max), p| (min.inf(p), max.sup(p))))
    }

    fn vertex_z(&self) -> impl Iterator<Item = f64> + '_ {
        self.triangles.iter().flatten().map(|p| p.z)
    }

    fn ensure_not_empty(&self) -> Result<()> {
        if self.is_empty() {
            Err(GeometryError::EmptyMesh)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    /// Axis-aligned box with outward winding.
    fn cuboid(min: Point3<f64>, max: Point3<f64>) -> Shape {
        let corner = |x: bool, y: bool, z: bool| {
            Point3::new(
                if x { max.x } else { min.x },
                if y { max.y } else { min.y },
                if z { max.z } else { min.z },
            )
        };
        let quads = [
            // bottom, top
            [(0, 0, 0), (0, 1, 0), (1, 1, 0), (1, 0, 0)],
            [(0, 0, 1), (1, 0, 1), (1, 1, 1), (0, 1, 1)],
            // front, back
            [(0, 0, 0), (1, 0, 0), (1, 0, 1), (0, 0, 1)],
            [(0, 1, 0), (0, 1, 1), (1, 1, 1), (1, 1, 0)],
            // left, right
            [(0, 0, 0), (0, 0, 1), (0, 1, 1), (0, 1, 0)],
            [(1, 0, 0), (1, 1, 0), (1, 1, 1), (1, 0, 1)],
        ];
        let mut shape = Shape::new();
        for quad in quads {
            let p: Vec<Point3<f64>> = quad
                .iter()
                .map(|&(x, y, z)| corner(x == 1, y == 1, z == 1))
                .collect();
            shape.push_triangle(p[0], p[1], p[2]);
            shape.push_triangle(p[0], p[2], p[3]);
        }
        shape
    }

    #[test]
    fn box_metrics() {
        let shape = cuboid(Point3::new(0.0, 0.0, 1.0), Point3::new(2.0, 0.2, 4.0));

        assert_relative_eq!(shape.volume().unwrap(), 1.2, epsilon = 1e-9);
        assert_relative_eq!(shape.area().unwrap(), 14.0, epsilon = 1e-9);
        assert_relative_eq!(shape.top_elevation().unwrap(), 4.0);
        assert_relative_eq!(shape.bottom_elevation().unwrap(), 1.0);
    }

    #[test]
    fn volume_does_not_depend_on_position() {
        let mut shape = cuboid(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        shape.transform(&Matrix4::new_translation(&Vector3::new(100.0, -50.0, 7.0)));
        assert_relative_eq!(shape.volume().unwrap(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(shape.bottom_elevation().unwrap(), 7.0);
    }

    #[test]
    fn mirroring_keeps_volume_positive() {
        let mut shape = cuboid(Point3::origin(), Point3::new(1.0, 2.0, 3.0));
        shape.transform(&Matrix4::new_nonuniform_scaling(&Vector3::new(-1.0, 1.0, 1.0)));
        assert_relative_eq!(shape.volume().unwrap(), 6.0, epsilon = 1e-9);
    }

    #[test]
    fn scaling_converts_units() {
        let mut shape = cuboid(Point3::origin(), Point3::new(1000.0, 1000.0, 1000.0));
        shape.scale(0.001);
        assert_relative_eq!(shape.volume().unwrap(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(shape.area().unwrap(), 6.0, epsilon = 1e-9);
    }

    #[test]
    fn bounds_cover_every_vertex() {
        let shape = cuboid(Point3::new(-1.0, 0.0, 2.0), Point3::new(1.0, 3.0, 4.0));
        assert_eq!(
            shape.bounds(),
            Some((Point3::new(-1.0, 0.0, 2.0), Point3::new(1.0, 3.0, 4.0)))
        );
        assert_eq!(Shape::new().bounds(), None);
    }

    #[test]
    fn empty_shape_has_no_metrics() {
        let shape = Shape::new();
        assert!(matches!(shape.volume(), Err(GeometryError::EmptyMesh)));
        assert!(matches!(shape.top_elevation(), Err(GeometryError::EmptyMesh)));
    }
}
