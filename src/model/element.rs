use serde::Serialize;

/// A physical element read from the model (an `IfcElement` subtype instance).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    /// STEP instance id (`#123`).
    pub id: u64,
    pub entity_type: String,
    pub global_id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub object_type: Option<String>,
    /// `IfcObjectPlacement` reference.
    pub placement: Option<u64>,
    /// `IfcProductRepresentation` reference.
    pub representation: Option<u64>,
}

impl Element {
    #[must_use]
    pub fn has_representation(&self) -> bool {
        self.representation.is_some()
    }
}
