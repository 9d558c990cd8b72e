use ifc_metrics::export::{export_csv, ExportOptions};
use ifc_metrics::extract::extract;
use ifc_metrics::geometry::GeometrySettings;
use ifc_metrics::parser::open_ifc_file;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

const HEADER: &str = "ObjectID,GlobalId,Name,Description,ObjectType,Material,Volume (m³),Surface Area (m²),Top Elevation (m),Bottom Elevation (m)";

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/small_building.ifc")
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ifc-metrics-it-{}-{name}", std::process::id()))
}

#[test]
fn fixture_rows_and_diagnostics() {
    let model = open_ifc_file(fixture()).unwrap();
    assert_eq!(model.schema(), "IFC4");

    let extraction = extract(&model, GeometrySettings::default());

    let records: Vec<Vec<String>> = extraction
        .rows
        .iter()
        .map(|row| row.to_record().to_vec())
        .collect();
    assert_eq!(
        records,
        vec![
            // 1.20 m³ less the 1 x 0.2 x 2 opening
            vec![
                "25",
                "2O2Fr$t4X7Zf8NOew3FLOH",
                "Basic Wall:Exterior",
                "N/A",
                "Basic Wall",
                "Insulation, Brick",
                "0.80",
                "11.20",
                "3.00",
                "0.00",
            ],
            vec![
                "34",
                "1xS3BCk291UvhgP2a6eflN",
                "Floor:Slab",
                "N/A",
                "N/A",
                "Concrete",
                "0.25",
                "3.00",
                "3.25",
                "3.00",
            ],
            vec![
                "74",
                "3cUkl32yn9qRSPvBJVyWWf",
                "Opening",
                "N/A",
                "N/A",
                "No material assigned",
                "0.80",
                "6.40",
                "2.50",
                "0.50",
            ],
            // HEA200: 5105 mm² section, 1167 mm perimeter
            vec![
                "85",
                "2hQBAVPOr5VxhS3Jl0O47h",
                "Column:HEA200",
                "N/A",
                "HEA200",
                "HEA200",
                "0.02",
                "3.51",
                "3.00",
                "0.00",
            ],
        ]
        .into_iter()
        .map(|r| r.into_iter().map(String::from).collect::<Vec<_>>())
        .collect::<Vec<_>>()
    );

    let skipped: Vec<(u64, &str)> = extraction
        .skipped
        .iter()
        .map(|s| (s.object_id, s.reason.as_str()))
        .collect();
    assert_eq!(
        skipped,
        vec![
            (54, "unsupported representation item IFCSWEPTDISKSOLID (#50)"),
            (93, "shape contains no triangles"),
        ]
    );
}

#[test]
fn local_coordinates_drop_the_storey_offset() {
    let model = open_ifc_file(fixture()).unwrap();
    let settings = GeometrySettings {
        use_world_coords: false,
    };
    let extraction = extract(&model, settings);

    let slab = extraction.rows.iter().find(|r| r.object_id == 34).unwrap();
    assert_eq!(slab.bottom_elevation, "0.00");
    assert_eq!(slab.top_elevation, "0.25");
}

#[test]
fn csv_file_has_header_and_one_line_per_row() {
    let model = open_ifc_file(fixture()).unwrap();
    let extraction = extract(&model, GeometrySettings::default());
    let path = temp_path("rows.csv");

    export_csv(&extraction.rows, &path, &ExportOptions::default()).unwrap();

    let written = fs::read_to_string(&path).unwrap();
    fs::remove_file(&path).ok();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], HEADER);
    assert_eq!(
        lines[1],
        "25,2O2Fr$t4X7Zf8NOew3FLOH,Basic Wall:Exterior,N/A,Basic Wall,\"Insulation, Brick\",0.80,11.20,3.00,0.00"
    );
}

#[test]
fn missing_model_is_an_error() {
    assert!(open_ifc_file(temp_path("does-not-exist.ifc")).is_err());
}

#[test]
fn binary_reports_skips_and_completion() {
    let output_path = temp_path("cli.csv");
    let output = Command::new(env!("CARGO_BIN_EXE_ifc-metrics"))
        .arg(fixture())
        .arg("--output")
        .arg(&output_path)
        .arg("--delimiter")
        .arg(";")
        .output()
        .unwrap();

    assert!(output.status.success());
    // Skips are reported on stdout only
    assert_eq!(String::from_utf8_lossy(&output.stderr), "");
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(
        stdout.lines().collect::<Vec<_>>(),
        vec![
            "Error processing element 54 (3Rq$w2zEn8BvYKyQuD8S1k): unsupported representation item IFCSWEPTDISKSOLID (#50)".to_string(),
            "Error processing element 93 (1f0sY4vXf1TwTQ2yFhKZqE): shape contains no triangles".to_string(),
            format!("Export complete! File saved to {}", output_path.display()),
        ]
    );

    let written = fs::read_to_string(&output_path).unwrap();
    fs::remove_file(&output_path).ok();
    assert_eq!(
        written.lines().next(),
        Some(HEADER.replace(',', ";").as_str())
    );
}
