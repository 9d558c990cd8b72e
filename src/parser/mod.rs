pub mod ifc;
pub mod step;

pub use crate::error::ParseError;
pub use ifc::{open_ifc_file, IfcModel};
pub use step::{StepEntity, StepFile, StepValue};
