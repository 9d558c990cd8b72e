use std::fmt;

pub const NO_MATERIAL: &str = "No material assigned";

/// Material assigned to an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Material {
    Named(String),
    /// Ordered sub-material names of a material list.
    Composite(Vec<String>),
    Unassigned,
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Material::Named(name) => f.write_str(name),
            Material::Composite(names) => f.write_str(&names.join(", ")),
            Material::Unassigned => f.write_str(NO_MATERIAL),
        }
    }
}
