//! Error types for IFC Metrics.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when parsing IFC files.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Failed to read the IFC file from disk.
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The STEP format is invalid or malformed.
    #[error("invalid STEP format: {message}")]
    InvalidStep { message: String },
}

/// Errors raised while resolving an element's material.
///
/// These never leave the material resolver: they are rendered into the
/// material column as `Error retrieving material: <cause>`.
#[derive(Debug, Error, PartialEq)]
pub enum MaterialError {
    #[error("entity #{0} does not exist")]
    MissingEntity(u64),

    #[error("material #{0} has no name")]
    UnnamedMaterial(u64),

    #[error("{entity_type} #{id} is malformed: {message}")]
    Malformed {
        id: u64,
        entity_type: String,
        message: String,
    },
}

/// Errors that can occur while building or measuring an element's shape.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("element #{0} has no representation")]
    NoRepresentation(u64),

    #[error("element #{0} has no body representation")]
    NoBodyRepresentation(u64),

    #[error("entity #{0} does not exist")]
    MissingEntity(u64),

    #[error("unsupported representation item {entity_type} (#{id})")]
    Unsupported { id: u64, entity_type: String },

    #[error("invalid {entity_type} #{id}: {message}")]
    InvalidEntity {
        id: u64,
        entity_type: String,
        message: String,
    },

    #[error("triangulation failed: {0}")]
    Triangulation(String),

    #[error("shape contains no triangles")]
    EmptyMesh,
}

/// Errors that can occur when exporting data.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Failed to create the output file.
    #[error("failed to create file '{path}': {source}")]
    FileCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write data to the file.
    #[error("failed to write data: {message}")]
    WriteError { message: String },

    /// Failed to serialize data to JSON.
    #[error("JSON serialization failed: {source}")]
    JsonSerialize {
        #[from]
        source: serde_json::Error,
    },

    /// Failed to write CSV data.
    #[error("CSV write failed: {source}")]
    CsvWrite {
        #[from]
        source: csv::Error,
    },
}
