//! Element geometry: representation items are tessellated into a [`Shape`]
//! from which volume, area and elevations are measured.

pub mod boolean;
pub mod engine;
pub mod extrusion;
pub mod faces;
pub mod mesh;
pub mod placement;
pub mod profile;
pub mod triangulation;

pub use crate::error::GeometryError;
pub use engine::{GeometryEngine, GeometrySettings};
pub use mesh::Shape;

use crate::parser::{IfcModel, StepEntity};

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, GeometryError>;

fn resolve(model: &IfcModel, id: u64) -> Result<&StepEntity> {
    model.entity(id).ok_or(GeometryError::MissingEntity(id))
}

/// Resolves the entity referenced by attribute `index` of `owner`.
fn resolve_attr<'m>(
    model: &'m IfcModel,
    owner: &StepEntity,
    index: usize,
    name: &str,
) -> Result<&'m StepEntity> {
    let id = owner
        .get_ref(index)
        .ok_or_else(|| invalid(owner, format!("{name} is not a reference")))?;
    resolve(model, id)
}

fn invalid(entity: &StepEntity, message: impl Into<String>) -> GeometryError {
    GeometryError::InvalidEntity {
        id: entity.id,
        entity_type: entity.entity_type.clone(),
        message: message.into(),
    }
}
