pub mod element;
pub mod material;
pub mod row;

pub use element::Element;
pub use material::{Material, NO_MATERIAL};
pub use row::{format_metric, ElementRow, SkippedElement, HEADERS, NOT_AVAILABLE};
