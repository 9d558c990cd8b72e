//! 2D profile definitions used by swept solids.

use super::placement::{axis2_placement_2d, point2, point_list};
use super::triangulation::{open_ring, signed_area};
use super::{invalid, resolve, resolve_attr, Result};
use crate::error::GeometryError;
use crate::parser::{IfcModel, StepEntity, StepValue};
use nalgebra::{Point2, Vector2};
use std::f64::consts::PI;

/// Segments used to approximate a full circle.
const CIRCLE_SEGMENTS: usize = 24;
/// Segments used to approximate an arc segment of an indexed polycurve.
const ARC_SEGMENTS: usize = 12;

/// Closed profile: counter-clockwise outer ring and clockwise holes, without
/// repeated closing points.
#[derive(Debug, Clone)]
pub struct Profile {
    pub outer: Vec<Point2<f64>>,
    pub holes: Vec<Vec<Point2<f64>>>,
}

impl Profile {
    pub(crate) fn new(outer: Vec<Point2<f64>>, holes: Vec<Vec<Point2<f64>>>) -> Self {
        let mut outer = open_ring(&outer);
        if signed_area(&outer) < 0.0 {
            outer.reverse();
        }
        let holes = holes
            .iter()
            .map(|hole| {
                let mut hole = open_ring(hole);
                if signed_area(&hole) > 0.0 {
                    hole.reverse();
                }
                hole
            })
            .filter(|hole| hole.len() >= 3)
            .collect();
        Self { outer, holes }
    }

    /// All rings, outer first.
    pub fn rings(&self) -> impl Iterator<Item = &Vec<Point2<f64>>> {
        std::iter::once(&self.outer).chain(self.holes.iter())
    }

    fn transformed(self, matrix: &nalgebra::Matrix3<f64>) -> Self {
        let map = |ring: Vec<Point2<f64>>| -> Vec<Point2<f64>> {
            ring.iter().map(|p| matrix.transform_point(p)).collect()
        };
        Self {
            outer: map(self.outer),
            holes: self.holes.into_iter().map(map).collect(),
        }
    }
}

/// Reads an IfcProfileDef into a [`Profile`] in the profile's parent system.
pub fn profile(model: &IfcModel, entity: &StepEntity) -> Result<Profile> {
    let parameterized = match entity.entity_type.as_str() {
        "IFCRECTANGLEPROFILEDEF" => {
            let (x, y) = (positive(entity, 3, "XDim")?, positive(entity, 4, "YDim")?);
            Profile::new(rectangle(x, y), Vec::new())
        }
        "IFCRECTANGLEHOLLOWPROFILEDEF" => {
            let (x, y) = (positive(entity, 3, "XDim")?, positive(entity, 4, "YDim")?);
            let wall = positive(entity, 5, "WallThickness")?;
            if 2.0 * wall >= x.min(y) {
                return Err(invalid(entity, "WallThickness leaves no opening"));
            }
            Profile::new(rectangle(x, y), vec![rectangle(x - 2.0 * wall, y - 2.0 * wall)])
        }
        "IFCCIRCLEPROFILEDEF" => {
            let radius = positive(entity, 3, "Radius")?;
            Profile::new(circle(radius), Vec::new())
        }
        "IFCCIRCLEHOLLOWPROFILEDEF" => {
            let radius = positive(entity, 3, "Radius")?;
            let wall = positive(entity, 4, "WallThickness")?;
            if wall >= radius {
                return Err(invalid(entity, "WallThickness exceeds Radius"));
            }
            Profile::new(circle(radius), vec![circle(radius - wall)])
        }
        // IfcIShapeProfileDef: OverallWidth, OverallDepth, WebThickness, FlangeThickness
        "IFCISHAPEPROFILEDEF" => {
            let width = positive(entity, 3, "OverallWidth")?;
            let depth = positive(entity, 4, "OverallDepth")?;
            let web = positive(entity, 5, "WebThickness")?;
            let flange = positive(entity, 6, "FlangeThickness")?;
            if web >= width || 2.0 * flange >= depth {
                return Err(invalid(entity, "web or flanges exceed the overall size"));
            }
            Profile::new(i_shape(width, depth, web, flange), Vec::new())
        }
        // IfcLShapeProfileDef: Depth, Width, Thickness
        "IFCLSHAPEPROFILEDEF" => {
            let depth = positive(entity, 3, "Depth")?;
            let width = entity.get_f64(4).unwrap_or(depth);
            let thickness = positive(entity, 5, "Thickness")?;
            if thickness >= width.min(depth) {
                return Err(invalid(entity, "Thickness exceeds the leg length"));
            }
            Profile::new(l_shape(depth, width, thickness), Vec::new())
        }
        // IfcUShapeProfileDef: Depth, FlangeWidth, WebThickness, FlangeThickness
        "IFCUSHAPEPROFILEDEF" => {
            let (depth, flange_width, web, flange) = flanged(entity)?;
            Profile::new(u_shape(depth, flange_width, web, flange), Vec::new())
        }
        // IfcTShapeProfileDef: Depth, FlangeWidth, WebThickness, FlangeThickness
        "IFCTSHAPEPROFILEDEF" => {
            let (depth, flange_width, web, flange) = flanged(entity)?;
            Profile::new(t_shape(depth, flange_width, web, flange), Vec::new())
        }
        // IfcZShapeProfileDef: Depth, FlangeWidth, WebThickness, FlangeThickness
        "IFCZSHAPEPROFILEDEF" => {
            let (depth, flange_width, web, flange) = flanged(entity)?;
            Profile::new(z_shape(depth, flange_width, web, flange), Vec::new())
        }
        // IfcCShapeProfileDef: Depth, Width, WallThickness, Girth
        "IFCCSHAPEPROFILEDEF" => {
            let depth = positive(entity, 3, "Depth")?;
            let width = positive(entity, 4, "Width")?;
            let wall = positive(entity, 5, "WallThickness")?;
            let girth = entity.get_f64(6).unwrap_or(2.0 * wall);
            if 2.0 * wall >= width.min(depth) || girth < wall || 2.0 * girth >= depth {
                return Err(invalid(entity, "WallThickness or Girth exceed the section"));
            }
            Profile::new(c_shape(depth, width, wall, girth), Vec::new())
        }
        // IfcArbitraryClosedProfileDef: ProfileType, ProfileName, OuterCurve
        "IFCARBITRARYCLOSEDPROFILEDEF" => {
            let outer = curve_points(model, resolve_attr(model, entity, 2, "OuterCurve")?)?;
            return Ok(Profile::new(outer, Vec::new()));
        }
        // ... with InnerCurves
        "IFCARBITRARYPROFILEDEFWITHVOIDS" => {
            let outer = curve_points(model, resolve_attr(model, entity, 2, "OuterCurve")?)?;
            let holes = entity
                .get_ref_list(3)
                .into_iter()
                .map(|id| curve_points(model, resolve(model, id)?))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Profile::new(outer, holes));
        }
        _ => {
            return Err(GeometryError::Unsupported {
                id: entity.id,
                entity_type: entity.entity_type.clone(),
            })
        }
    };

    // Parameterized profiles: optional Position at index 2
    match entity.get_ref(2) {
        Some(id) => Ok(parameterized.transformed(&axis2_placement_2d(model, resolve(model, id)?)?)),
        None => Ok(parameterized),
    }
}

fn positive(entity: &StepEntity, index: usize, name: &str) -> Result<f64> {
    match entity.get_f64(index) {
        Some(v) if v > 0.0 => Ok(v),
        Some(_) => Err(invalid(entity, format!("{name} must be positive"))),
        None => Err(invalid(entity, format!("missing {name}"))),
    }
}

/// Depth, FlangeWidth, WebThickness and FlangeThickness of U, T and Z sections.
fn flanged(entity: &StepEntity) -> Result<(f64, f64, f64, f64)> {
    let depth = positive(entity, 3, "Depth")?;
    let flange_width = positive(entity, 4, "FlangeWidth")?;
    let web = positive(entity, 5, "WebThickness")?;
    let flange = positive(entity, 6, "FlangeThickness")?;
    if web >= flange_width || 2.0 * flange >= depth {
        return Err(invalid(entity, "web or flanges exceed the overall size"));
    }
    Ok((depth, flange_width, web, flange))
}

/// Moves a section drawn from the origin so its bounding box is centred.
fn centred(points: Vec<Point2<f64>>) -> Vec<Point2<f64>> {
    let (min, max) = points.iter().fold(
        (Point2::new(f64::MAX, f64::MAX), Point2::new(f64::MIN, f64::MIN)),
        |(min, max), p| (min.inf(p), max.sup(p)),
    );
    let shift = nalgebra::center(&min, &max).coords;
    points.into_iter().map(|p| p - shift).collect()
}

fn i_shape(width: f64, depth: f64, web: f64, flange: f64) -> Vec<Point2<f64>> {
    let (hw, hd, ht) = (width / 2.0, depth / 2.0, web / 2.0);
    vec![
        Point2::new(-hw, -hd),
        Point2::new(hw, -hd),
        Point2::new(hw, -hd + flange),
        Point2::new(ht, -hd + flange),
        Point2::new(ht, hd - flange),
        Point2::new(hw, hd - flange),
        Point2::new(hw, hd),
        Point2::new(-hw, hd),
        Point2::new(-hw, hd - flange),
        Point2::new(-ht, hd - flange),
        Point2::new(-ht, -hd + flange),
        Point2::new(-hw, -hd + flange),
    ]
}

fn l_shape(depth: f64, width: f64, thickness: f64) -> Vec<Point2<f64>> {
    centred(vec![
        Point2::new(0.0, 0.0),
        Point2::new(width, 0.0),
        Point2::new(width, thickness),
        Point2::new(thickness, thickness),
        Point2::new(thickness, depth),
        Point2::new(0.0, depth),
    ])
}

fn u_shape(depth: f64, flange_width: f64, web: f64, flange: f64) -> Vec<Point2<f64>> {
    centred(vec![
        Point2::new(0.0, 0.0),
        Point2::new(flange_width, 0.0),
        Point2::new(flange_width, flange),
        Point2::new(web, flange),
        Point2::new(web, depth - flange),
        Point2::new(flange_width, depth - flange),
        Point2::new(flange_width, depth),
        Point2::new(0.0, depth),
    ])
}

fn t_shape(depth: f64, flange_width: f64, web: f64, flange: f64) -> Vec<Point2<f64>> {
    let (hf, ht) = (flange_width / 2.0, web / 2.0);
    centred(vec![
        Point2::new(-ht, 0.0),
        Point2::new(ht, 0.0),
        Point2::new(ht, depth - flange),
        Point2::new(hf, depth - flange),
        Point2::new(hf, depth),
        Point2::new(-hf, depth),
        Point2::new(-hf, depth - flange),
        Point2::new(-ht, depth - flange),
    ])
}

/// Bottom flange to the left of the web, top flange to the right. FlangeWidth
/// includes the web.
fn z_shape(depth: f64, flange_width: f64, web: f64, flange: f64) -> Vec<Point2<f64>> {
    let (hd, ht) = (depth / 2.0, web / 2.0);
    vec![
        Point2::new(ht - flange_width, -hd),
        Point2::new(ht, -hd),
        Point2::new(ht, hd - flange),
        Point2::new(flange_width - ht, hd - flange),
        Point2::new(flange_width - ht, hd),
        Point2::new(-ht, hd),
        Point2::new(-ht, -hd + flange),
        Point2::new(ht - flange_width, -hd + flange),
    ]
}

/// Lipped channel opening to +x.
fn c_shape(depth: f64, width: f64, wall: f64, girth: f64) -> Vec<Point2<f64>> {
    centred(vec![
        Point2::new(0.0, 0.0),
        Point2::new(width, 0.0),
        Point2::new(width, girth),
        Point2::new(width - wall, girth),
        Point2::new(width - wall, wall),
        Point2::new(wall, wall),
        Point2::new(wall, depth - wall),
        Point2::new(width - wall, depth - wall),
        Point2::new(width - wall, depth - girth),
        Point2::new(width, depth - girth),
        Point2::new(width, depth),
        Point2::new(0.0, depth),
    ])
}

fn rectangle(x_dim: f64, y_dim: f64) -> Vec<Point2<f64>> {
    let (hx, hy) = (x_dim / 2.0, y_dim / 2.0);
    vec![
        Point2::new(-hx, -hy),
        Point2::new(hx, -hy),
        Point2::new(hx, hy),
        Point2::new(-hx, hy),
    ]
}

fn circle(radius: f64) -> Vec<Point2<f64>> {
    (0..CIRCLE_SEGMENTS)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / CIRCLE_SEGMENTS as f64;
            Point2::new(radius * angle.cos(), radius * angle.sin())
        })
        .collect()
}

/// Points of a bounded 2D curve, in curve order.
pub fn curve_points(model: &IfcModel, curve: &StepEntity) -> Result<Vec<Point2<f64>>> {
    match curve.entity_type.as_str() {
        // IfcPolyline: Points
        "IFCPOLYLINE" => curve
            .get_ref_list(0)
            .into_iter()
            .map(|id| point2(resolve(model, id)?))
            .collect(),
        // IfcIndexedPolyCurve: Points, Segments, SelfIntersect
        "IFCINDEXEDPOLYCURVE" => indexed_poly_curve(model, curve),
        // IfcCompositeCurve: Segments, SelfIntersect
        "IFCCOMPOSITECURVE" => {
            let mut points: Vec<Point2<f64>> = Vec::new();
            for segment_id in curve.get_ref_list(0) {
                // IfcCompositeCurveSegment: Transition, SameSense, ParentCurve
                let segment = resolve(model, segment_id)?;
                let mut segment_points =
                    curve_points(model, resolve_attr(model, segment, 2, "ParentCurve")?)?;
                if segment.get(1) == Some(&StepValue::Boolean(false)) {
                    segment_points.reverse();
                }
                points.extend(segment_points);
            }
            Ok(points)
        }
        _ => Err(GeometryError::Unsupported {
            id: curve.id,
            entity_type: curve.entity_type.clone(),
        }),
    }
}

fn indexed_poly_curve(model: &IfcModel, curve: &StepEntity) -> Result<Vec<Point2<f64>>> {
    let coords: Vec<Point2<f64>> = point_list(resolve_attr(model, curve, 0, "Points")?)?
        .into_iter()
        .map(|p| Point2::new(p.x, p.y))
        .collect();

    let Some(segments) = curve.get_list(1) else {
        return Ok(coords);
    };

    let lookup = |index: &StepValue| -> Result<Point2<f64>> {
        index
            .as_f64()
            .filter(|i| *i >= 1.0)
            .and_then(|i| coords.get(i as usize - 1).copied())
            .ok_or_else(|| invalid(curve, "segment index out of range"))
    };

    let mut points: Vec<Point2<f64>> = Vec::new();
    for segment in segments {
        let indices = segment
            .as_list()
            .ok_or_else(|| invalid(curve, "segment is not an index list"))?;
        let segment_points = indices.iter().map(lookup).collect::<Result<Vec<_>>>()?;

        match (segment.type_name(), segment_points.as_slice()) {
            (Some("IFCARCINDEX"), [start, middle, end]) => {
                let arc = arc_through(*start, *middle, *end);
                extend_segment(&mut points, &arc);
            }
            (Some("IFCLINEINDEX") | None, _) => extend_segment(&mut points, &segment_points),
            _ => return Err(invalid(curve, "unsupported segment")),
        }
    }

    Ok(points)
}

/// Appends a segment, skipping its first point when it repeats the last one.
fn extend_segment(points: &mut Vec<Point2<f64>>, segment: &[Point2<f64>]) {
    let skip = usize::from(points.last().is_some() && points.last() == segment.first());
    points.extend_from_slice(&segment[skip..]);
}

/// Polyline approximation of the circular arc through three points.
fn arc_through(start: Point2<f64>, middle: Point2<f64>, end: Point2<f64>) -> Vec<Point2<f64>> {
    let (a, b, c) = (start.coords, middle.coords, end.coords);
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
    if d.abs() < 1e-12 {
        // Collinear: the arc is a straight line
        return vec![start, end];
    }

    let sq = |v: Vector2<f64>| v.norm_squared();
    let center = Point2::new(
        (sq(a) * (b.y - c.y) + sq(b) * (c.y - a.y) + sq(c) * (a.y - b.y)) / d,
        (sq(a) * (c.x - b.x) + sq(b) * (a.x - c.x) + sq(c) * (b.x - a.x)) / d,
    );
    let radius = (start - center).norm();
    let angle = |p: Point2<f64>| (p.y - center.y).atan2(p.x - center.x);

    let start_angle = angle(start);
    let mut sweep = angle(end) - start_angle;
    // d > 0 means counter-clockwise travel
    if d > 0.0 && sweep < 0.0 {
        sweep += 2.0 * PI;
    } else if d < 0.0 && sweep > 0.0 {
        sweep -= 2.0 * PI;
    }

    (0..=ARC_SEGMENTS)
        .map(|i| {
            let t = start_angle + sweep * i as f64 / ARC_SEGMENTS as f64;
            Point2::new(center.x + radius * t.cos(), center.y + radius * t.sin())
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

    fn area(profile: &Profile) -> f64 {
        profile.rings().map(|r| signed_area(r) / 2.0).sum()
    }

    #[test]
    fn rectangle_profile_is_centered() {
        let model = model("#1=IFCRECTANGLEPROFILEDEF(.AREA.,$,$,100.,200.);");
        let profile = profile(&model, model.entity(1).unwrap()).unwrap();

        assert_eq!(profile.outer.len(), 4);
        assert_relative_eq!(area(&profile), 20_000.0);
        assert_relative_eq!(profile.outer[0], Point2::new(-50.0, -100.0));
    }

    #[test]
    fn position_moves_the_profile() {
        let model = model(
            "#1=IFCCARTESIANPOINT((10.,5.));
#2=IFCAXIS2PLACEMENT2D(#1,$);
#3=IFCRECTANGLEPROFILEDEF(.AREA.,$,#2,2.,2.);",
        );
        let profile = profile(&model, model.entity(3).unwrap()).unwrap();
        assert_relative_eq!(profile.outer[0], Point2::new(9.0, 4.0));
    }

    #[test]
    fn hollow_rectangle_subtracts_the_opening() {
        let model = model("#1=IFCRECTANGLEHOLLOWPROFILEDEF(.AREA.,$,$,10.,10.,1.,$,$);");
        let profile = profile(&model, model.entity(1).unwrap()).unwrap();
        assert_eq!(profile.holes.len(), 1);
        assert_relative_eq!(area(&profile), 36.0, epsilon = 1e-9);
    }

    #[test]
    fn clockwise_polyline_is_reoriented() {
        let model = model(
            "#1=IFCCARTESIANPOINT((0.,0.));
#2=IFCCARTESIANPOINT((0.,3.));
#3=IFCCARTESIANPOINT((4.,3.));
#4=IFCCARTESIANPOINT((4.,0.));
#5=IFCPOLYLINE((#1,#2,#3,#4,#1));
#6=IFCARBITRARYCLOSEDPROFILEDEF(.AREA.,$,#5);",
        );
        let profile = profile(&model, model.entity(6).unwrap()).unwrap();
        assert_eq!(profile.outer.len(), 4);
        assert_relative_eq!(area(&profile), 12.0);
    }

    #[test]
    fn indexed_polycurve_with_line_segments() {
        let model = model(
            "#1=IFCCARTESIANPOINTLIST2D(((0.,0.),(2.,0.),(2.,2.),(0.,2.)));
#2=IFCINDEXEDPOLYCURVE(#1,(IFCLINEINDEX((1,2,3)),IFCLINEINDEX((3,4,1))),.F.);
#3=IFCARBITRARYCLOSEDPROFILEDEF(.AREA.,$,#2);",
        );
        let profile = profile(&model, model.entity(3).unwrap()).unwrap();
        assert_eq!(profile.outer.len(), 4);
        assert_relative_eq!(area(&profile), 4.0);
    }

    #[test]
    fn arc_segment_approximates_a_half_disc() {
        let model = model(
            "#1=IFCCARTESIANPOINTLIST2D(((-1.,0.),(0.,-1.),(1.,0.)));
#2=IFCINDEXEDPOLYCURVE(#1,(IFCARCINDEX((1,2,3)),IFCLINEINDEX((3,1))),.F.);
#3=IFCARBITRARYCLOSEDPROFILEDEF(.AREA.,$,#2);",
        );
        let profile = profile(&model, model.entity(3).unwrap()).unwrap();
        assert_relative_eq!(area(&profile), PI / 2.0, epsilon = 0.02);
    }

    #[test]
    fn i_section_area() {
        let model = model("#1=IFCISHAPEPROFILEDEF(.AREA.,'HEA200',$,200.,190.,6.5,10.,18.,$,$);");
        let profile = profile(&model, model.entity(1).unwrap()).unwrap();

        assert_eq!(profile.outer.len(), 12);
        // Two flanges plus the web between them, fillets ignored
        let expected = 2.0 * 200.0 * 10.0 + 6.5 * (190.0 - 20.0);
        assert_relative_eq!(area(&profile), expected, epsilon = 1e-9);
    }

    #[test]
    fn steel_sections_are_centred_on_their_bounding_box() {
        let model = model(
            "#1=IFCLSHAPEPROFILEDEF(.AREA.,$,$,100.,80.,10.,$,$,$,$);
#2=IFCUSHAPEPROFILEDEF(.AREA.,$,$,200.,75.,8.5,11.5,$,$,$);
#3=IFCTSHAPEPROFILEDEF(.AREA.,$,$,100.,100.,11.,11.,$,$,$,$,$);
#4=IFCZSHAPEPROFILEDEF(.AREA.,$,$,200.,80.,6.,10.,$,$);
#5=IFCCSHAPEPROFILEDEF(.AREA.,$,$,150.,60.,2.,15.,$);",
        );
        let expected_areas = [
            100.0 * 10.0 + 70.0 * 10.0,
            2.0 * 75.0 * 11.5 + 8.5 * 177.0,
            100.0 * 11.0 + 11.0 * 89.0,
            2.0 * 80.0 * 10.0 + 6.0 * 180.0,
            2.0 * (60.0 * 2.0 + 13.0 * 2.0) + 2.0 * 146.0,
        ];

        for (id, expected) in (1..=5).zip(expected_areas) {
            let profile = profile(&model, model.entity(id).unwrap()).unwrap();
            assert_relative_eq!(area(&profile), expected, epsilon = 1e-9);

            let (min_x, max_x) = profile
                .outer
                .iter()
                .fold((f64::MAX, f64::MIN), |(lo, hi), p| (lo.min(p.x), hi.max(p.x)));
            let (min_y, max_y) = profile
                .outer
                .iter()
                .fold((f64::MAX, f64::MIN), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
            assert_relative_eq!(min_x + max_x, 0.0, epsilon = 1e-9);
            assert_relative_eq!(min_y + max_y, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn oversized_web_is_rejected() {
        let model = model("#1=IFCISHAPEPROFILEDEF(.AREA.,$,$,100.,200.,120.,10.,$,$,$);");
        assert!(matches!(
            profile(&model, model.entity(1).unwrap()),
            Err(GeometryError::InvalidEntity { .. })
        ));
    }

    #[test]
    fn unknown_profile_is_unsupported() {
        let model = model("#1=IFCELLIPSEPROFILEDEF(.AREA.,$,$,200.,100.);");
        assert!(matches!(
            profile(&model, model.entity(1).unwrap()),
            Err(GeometryError::Unsupported { .. })
        ));
    }
}
