//! Points, directions and placements.
//!
//! Every placement is returned as the matrix taking local coordinates into
//! the parent system.

use super::{invalid, resolve, resolve_attr, Result};
use crate::error::GeometryError;
use crate::parser::{IfcModel, StepEntity, StepValue};
use nalgebra::{Matrix3, Matrix4, Point2, Point3, Vector2, Vector3};

/// Placement chains deeper than this are treated as malformed.
const MAX_PLACEMENT_DEPTH: usize = 100;

fn coordinates(entity: &StepEntity) -> Result<Vec<f64>> {
    let list = entity
        .get_list(0)
        .ok_or_else(|| invalid(entity, "coordinates are not a list"))?;
    list.iter()
        .map(|v| v.as_f64().ok_or_else(|| invalid(entity, "non-numeric coordinate")))
        .collect()
}

/// IfcCartesianPoint with 2 or 3 coordinates; a missing Z is zero.
pub fn point3(entity: &StepEntity) -> Result<Point3<f64>> {
    match coordinates(entity)?.as_slice() {
        [x, y] => Ok(Point3::new(*x, *y, 0.0)),
        [x, y, z] => Ok(Point3::new(*x, *y, *z)),
        _ => Err(invalid(entity, "expected 2 or 3 coordinates")),
    }
}

pub fn point2(entity: &StepEntity) -> Result<Point2<f64>> {
    match coordinates(entity)?.as_slice() {
        [x, y] | [x, y, _] => Ok(Point2::new(*x, *y)),
        _ => Err(invalid(entity, "expected 2 coordinates")),
    }
}

/// IfcDirection, normalized.
pub fn direction3(entity: &StepEntity) -> Result<Vector3<f64>> {
    let v = match coordinates(entity)?.as_slice() {
        [x, y] => Vector3::new(*x, *y, 0.0),
        [x, y, z] => Vector3::new(*x, *y, *z),
        _ => return Err(invalid(entity, "expected 2 or 3 direction ratios")),
    };
    v.try_normalize(1e-12)
        .ok_or_else(|| invalid(entity, "zero-length direction"))
}

fn optional_direction3(
    model: &IfcModel,
    owner: &StepEntity,
    index: usize,
    default: Vector3<f64>,
) -> Result<Vector3<f64>> {
    match owner.get_ref(index) {
        Some(id) => direction3(resolve(model, id)?),
        None => Ok(default),
    }
}

/// Right-handed orthonormal frame from a Z axis and an approximate X axis.
fn frame(z_axis: Vector3<f64>, x_hint: Vector3<f64>) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
    let z = z_axis.normalize();
    let projected = x_hint - z * x_hint.dot(&z);
    let x = projected.try_normalize(1e-6).unwrap_or_else(|| {
        // X parallel to Z: pick any perpendicular
        if z.z.abs() < 0.9 {
            Vector3::z().cross(&z).normalize()
        } else {
            Vector3::x().cross(&z).normalize()
        }
    });
    let y = z.cross(&x);
    (x, y, z)
}

fn matrix_from_frame(
    x: Vector3<f64>,
    y: Vector3<f64>,
    z: Vector3<f64>,
    origin: Point3<f64>,
) -> Matrix4<f64> {
    Matrix4::new(
        x.x, y.x, z.x, origin.x, //
        x.y, y.y, z.y, origin.y, //
        x.z, y.z, z.z, origin.z, //
        0.0, 0.0, 0.0, 1.0,
    )
}

/// IfcAxis2Placement3D: Location, Axis, RefDirection.
pub fn axis2_placement_3d(model: &IfcModel, placement: &StepEntity) -> Result<Matrix4<f64>> {
    if placement.entity_type != "IFCAXIS2PLACEMENT3D" {
        return Err(invalid(placement, "expected IFCAXIS2PLACEMENT3D"));
    }
    let location = point3(resolve_attr(model, placement, 0, "Location")?)?;
    let z_axis = optional_direction3(model, placement, 1, Vector3::z())?;
    let x_axis = optional_direction3(model, placement, 2, Vector3::x())?;

    let (x, y, z) = frame(z_axis, x_axis);
    Ok(matrix_from_frame(x, y, z, location))
}

/// IfcAxis2Placement2D: Location, RefDirection.
pub fn axis2_placement_2d(model: &IfcModel, placement: &StepEntity) -> Result<Matrix3<f64>> {
    let location = point2(resolve_attr(model, placement, 0, "Location")?)?;
    let x = match placement.get_ref(1) {
        Some(id) => {
            let d = direction3(resolve(model, id)?)?;
            Vector2::new(d.x, d.y)
                .try_normalize(1e-12)
                .ok_or_else(|| invalid(placement, "RefDirection is not planar"))?
        }
        None => Vector2::x(),
    };

    Ok(Matrix3::new(
        x.x, -x.y, location.x, //
        x.y, x.x, location.y, //
        0.0, 0.0, 1.0,
    ))
}

/// Resolves an IfcLocalPlacement chain into a single object-to-world matrix.
pub fn object_placement(model: &IfcModel, placement: &StepEntity) -> Result<Matrix4<f64>> {
    let mut matrix = Matrix4::identity();
    let mut current = Some(placement);
    let mut depth = 0;

    while let Some(placement) = current {
        if depth > MAX_PLACEMENT_DEPTH {
            return Err(invalid(placement, "placement chain too deep"));
        }
        if placement.entity_type != "IFCLOCALPLACEMENT" {
            return Err(GeometryError::Unsupported {
                id: placement.id,
                entity_type: placement.entity_type.clone(),
            });
        }

        // IfcLocalPlacement: PlacementRelTo, RelativePlacement
        let relative = resolve_attr(model, placement, 1, "RelativePlacement")?;
        matrix = axis2_placement_3d(model, relative)? * matrix;

        current = match placement.get_ref(0) {
            Some(parent) => Some(resolve(model, parent)?),
            None => None,
        };
        depth += 1;
    }

    Ok(matrix)
}

/// IfcCartesianTransformationOperator3D (and the non-uniform variant):
/// Axis1, Axis2, LocalOrigin, Scale, Axis3[, Scale2, Scale3].
pub fn transformation_operator(model: &IfcModel, operator: &StepEntity) -> Result<Matrix4<f64>> {
    let x_hint = optional_direction3(model, operator, 0, Vector3::x())?;
    let origin = point3(resolve_attr(model, operator, 2, "LocalOrigin")?)?;
    let scale = operator.get_f64(3).unwrap_or(1.0);
    let z_axis = optional_direction3(model, operator, 4, Vector3::z())?;

    let (scale_y, scale_z) = if operator.entity_type == "IFCCARTESIANTRANSFORMATIONOPERATOR3DNONUNIFORM"
    {
        (
            operator.get_f64(5).unwrap_or(scale),
            operator.get_f64(6).unwrap_or(scale),
        )
    } else {
        (scale, scale)
    };

    let (x, y, z) = frame(z_axis, x_hint);
    Ok(matrix_from_frame(x * scale, y * scale_y, z * scale_z, origin))
}

/// Reads an IfcCartesianPointList2D/3D coordinate list.
pub fn point_list(entity: &StepEntity) -> Result<Vec<Point3<f64>>> {
    let rows = entity
        .get_list(0)
        .ok_or_else(|| invalid(entity, "CoordList is not a list"))?;

    rows.iter()
        .map(|row| {
            let coords: Option<Vec<f64>> = row
                .as_list()
                .and_then(|items| items.iter().map(StepValue::as_f64).collect());
            match coords.as_deref() {
                Some([x, y]) => Ok(Point3::new(*x, *y, 0.0)),
                Some([x, y, z]) => Ok(Point3::new(*x, *y, *z)),
                _ => Err(invalid(entity, "malformed coordinate tuple")),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn model(data: &str) -> IfcModel {
        let content = format!(
            "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('IFC4'));\nENDSEC;\nDATA;\n{data}\nENDSEC;\nEND-ISO-10303-21;\n"
        );
        IfcModel::from_step_text(&content).unwrap()
    }

    #[test]
    fn default_axes_translate_only() {
        let model = model(
            "#1=IFCCARTESIANPOINT((1.,2.,3.));
#2=IFCAXIS2PLACEMENT3D(#1,$,$);",
        );
        let matrix = axis2_placement_3d(&model, model.entity(2).unwrap()).unwrap();
        let p = matrix.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3::new(2.0, 2.0, 3.0));
    }

    #[test]
    fn ref_direction_rotates_about_z() {
        let model = model(
            "#1=IFCCARTESIANPOINT((0.,0.,0.));
#2=IFCDIRECTION((0.,0.,1.));
#3=IFCDIRECTION((0.,1.,0.));
#4=IFCAXIS2PLACEMENT3D(#1,#2,#3);",
        );
        let matrix = axis2_placement_3d(&model, model.entity(4).unwrap()).unwrap();
        let p = matrix.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn local_placements_compose_parent_first() {
        let model = model(
            "#1=IFCCARTESIANPOINT((0.,0.,3.));
#2=IFCAXIS2PLACEMENT3D(#1,$,$);
#3=IFCLOCALPLACEMENT($,#2);
#4=IFCCARTESIANPOINT((5.,0.,0.));
#5=IFCDIRECTION((0.,1.,0.));
#6=IFCAXIS2PLACEMENT3D(#4,$,#5);
#7=IFCLOCALPLACEMENT(#3,#6);",
        );
        let matrix = object_placement(&model, model.entity(7).unwrap()).unwrap();
        let p = matrix.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3::new(5.0, 1.0, 3.0), epsilon = 1e-12);
    }

    #[test]
    fn cyclic_placements_are_rejected() {
        let model = model(
            "#1=IFCCARTESIANPOINT((0.,0.,0.));
#2=IFCAXIS2PLACEMENT3D(#1,$,$);
#3=IFCLOCALPLACEMENT(#4,#2);
#4=IFCLOCALPLACEMENT(#3,#2);",
        );
        assert!(object_placement(&model, model.entity(3).unwrap()).is_err());
    }

    #[test]
    fn placement_2d_maps_profile_points() {
        let model = model(
            "#1=IFCCARTESIANPOINT((10.,0.));
#2=IFCDIRECTION((0.,1.));
#3=IFCAXIS2PLACEMENT2D(#1,#2);",
        );
        let matrix = axis2_placement_2d(&model, model.entity(3).unwrap()).unwrap();
        let p = matrix.transform_point(&Point2::new(1.0, 0.0));
        assert_relative_eq!(p, Point2::new(10.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn uniform_operator_scales_and_moves() {
        let model = model(
            "#1=IFCCARTESIANPOINT((1.,1.,1.));
#2=IFCCARTESIANTRANSFORMATIONOPERATOR3D($,$,#1,2.,$);",
        );
        let matrix = transformation_operator(&model, model.entity(2).unwrap()).unwrap();
        let p = matrix.transform_point(&Point3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(p, Point3::new(3.0, 3.0, 3.0), epsilon = 1e-12);
    }
}
