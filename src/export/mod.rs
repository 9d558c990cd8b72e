pub mod csv;
pub mod json;

pub use crate::error::ExportError;
pub use self::csv::{export_csv, ExportOptions};
pub use self::json::export_json;
