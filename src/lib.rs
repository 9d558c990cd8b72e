//! # IFC Metrics
//!
//! Batch exporter of per-element metadata and geometric metrics from IFC files.
//!
//! ## Features
//!
//! - Parse IFC files (IFC2x3 and IFC4 schemas)
//! - Resolve each element's associated material
//! - Tessellate body geometry and measure volume, surface area and elevations
//! - Export to CSV and JSON
//!
//! ## Example
//!
//! ```no_run
//! use ifc_metrics::export::{export_csv, ExportOptions};
//! use ifc_metrics::extract::extract;
//! use ifc_metrics::geometry::GeometrySettings;
//! use ifc_metrics::parser::open_ifc_file;
//!
//! let model = open_ifc_file("model.ifc").expect("Failed to parse");
//! let extraction = extract(&model, GeometrySettings::default());
//! export_csv(&extraction.rows, "output.csv", &ExportOptions::default()).expect("Failed to export");
//! println!("Rows: {}", extraction.rows.len());
//! ```

pub mod error;
pub mod export;
pub mod extract;
pub mod geometry;
pub mod material;
pub mod model;
pub mod parser;
