use serde::Serialize;

/// Column headers of the export, in row order.
pub const HEADERS: [&str; 10] = [
    "ObjectID",
    "GlobalId",
    "Name",
    "Description",
    "ObjectType",
    "Material",
    "Volume (m³)",
    "Surface Area (m²)",
    "Top Elevation (m)",
    "Bottom Elevation (m)",
];

/// Placeholder for absent Name, Description and ObjectType attributes.
pub const NOT_AVAILABLE: &str = "N/A";

/// One exported line. Metrics are already rendered with two decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementRow {
    #[serde(rename = "ObjectID")]
    pub object_id: u64,
    #[serde(rename = "GlobalId")]
    pub global_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "ObjectType")]
    pub object_type: String,
    #[serde(rename = "Material")]
    pub material: String,
    #[serde(rename = "Volume (m³)")]
    pub volume: String,
    #[serde(rename = "Surface Area (m²)")]
    pub surface_area: String,
    #[serde(rename = "Top Elevation (m)")]
    pub top_elevation: String,
    #[serde(rename = "Bottom Elevation (m)")]
    pub bottom_elevation: String,
}

impl ElementRow {
    #[must_use]
    pub fn to_record(&self) -> [String; 10] {
        [
            self.object_id.to_string(),
            self.global_id.clone(),
            self.name.clone(),
            self.description.clone(),
            self.object_type.clone(),
            self.material.clone(),
            self.volume.clone(),
            self.surface_area.clone(),
            self.top_elevation.clone(),
            self.bottom_elevation.clone(),
        ]
    }
}

/// An element dropped from the export because its geometry failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedElement {
    pub object_id: u64,
    pub global_id: String,
    pub reason: String,
}

#[must_use]
pub fn format_metric(value: f64) -> String {
    format!("{value:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_use_two_decimals() {
        assert_eq!(format_metric(1.2), "1.20");
        assert_eq!(format_metric(14.799_999), "14.80");
        assert_eq!(format_metric(-0.004), "-0.00");
        assert_eq!(format_metric(3.0), "3.00");
    }
}
