//! Material lookup through an element's relationships.

use crate::error::MaterialError;
use crate::model::{Element, Material};
use crate::parser::{IfcModel, StepEntity, StepValue};

/// Material selects carrying a `Name`, with the attribute index it sits at.
const NAMED_MATERIALS: &[(&str, usize)] = &[
    ("IFCMATERIAL", 0),
    ("IFCMATERIALCONSTITUENTSET", 0),
    ("IFCMATERIALPROFILESET", 0),
    ("IFCMATERIALCONSTITUENT", 0),
    ("IFCMATERIALPROFILE", 0),
    // Material, LayerThickness, IsVentilated, Name
    ("IFCMATERIALLAYER", 3),
];

fn name_index(entity_type: &str) -> Option<usize> {
    NAMED_MATERIALS
        .iter()
        .find(|(named, _)| *named == entity_type)
        .map(|&(_, index)| index)
}

/// Resolves the material column for `element`.
///
/// Never fails: resolution errors are rendered as
/// `Error retrieving material: <cause>`.
#[must_use]
pub fn resolve_material(model: &IfcModel, element: &Element) -> String {
    match try_resolve_material(model, element) {
        Ok(material) => material.to_string(),
        Err(err) => {
            tracing::debug!(element = element.id, error = %err, "Material lookup failed");
            format!("Error retrieving material: {err}")
        }
    }
}

/// Walks the element's relationships in order and returns the first usable
/// relating material.
pub fn try_resolve_material(model: &IfcModel, element: &Element) -> Result<Material, MaterialError> {
    for &rel_id in model.relations_of(element.id) {
        let rel = model
            .entity(rel_id)
            .ok_or(MaterialError::MissingEntity(rel_id))?;

        // Only IfcRelAssociatesMaterial has a RelatingMaterial (index 5)
        if rel.entity_type != "IFCRELASSOCIATESMATERIAL" {
            continue;
        }
        let material_id = rel
            .get_ref(5)
            .ok_or_else(|| malformed(rel, "RelatingMaterial is not a reference"))?;
        let material = model
            .entity(material_id)
            .ok_or(MaterialError::MissingEntity(material_id))?;

        if let Some(index) = name_index(&material.entity_type) {
            return material_name(material, index)
                .map(|name| Material::Named(name.unwrap_or_default()));
        }
        if material.entity_type == "IFCMATERIALLIST" {
            return material_list(model, material).map(Material::Composite);
        }

        tracing::debug!(
            element = element.id,
            material = material.id,
            entity_type = %material.entity_type,
            "Relating material has neither a name nor a material list"
        );
    }

    Ok(Material::Unassigned)
}

fn material_name(material: &StepEntity, index: usize) -> Result<Option<String>, MaterialError> {
    match material.get(index) {
        Some(StepValue::String(name)) => Ok(Some(name.clone())),
        Some(StepValue::Null) | None => Ok(None),
        Some(_) => Err(malformed(material, "Name is not a string")),
    }
}

fn material_list(model: &IfcModel, list: &StepEntity) -> Result<Vec<String>, MaterialError> {
    // IfcMaterialList: Materials
    let entries = list
        .get_list(0)
        .ok_or_else(|| malformed(list, "Materials is not a list"))?;

    entries
        .iter()
        .map(|entry| {
            let id = entry
                .as_reference()
                .ok_or_else(|| malformed(list, "Materials contains a non-reference"))?;
            let material = model.entity(id).ok_or(MaterialError::MissingEntity(id))?;
            // IfcMaterialList only holds IfcMaterial
            material_name(material, 0)?.ok_or(MaterialError::UnnamedMaterial(id))
        })
        .collect()
}

fn malformed(entity: &StepEntity, message: &str) -> MaterialError {
    MaterialError::Malformed {
        id: entity.id,
        entity_type: entity.entity_type.clone(),
        message: message.to_string(),
    }
}
