use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ExportError;
use crate::feature_source::{FeatureSource, Query, ShapefileSource};
use crate::record_to_json::attributes_to_json;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedRecord {
    pub id: String,
    pub attributes: Map<String, Value>,
}

/// All exported records, in source order. Serializes as a bare JSON array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExportDocument(pub Vec<ExportedRecord>);

impl ExportDocument {
    pub fn records(&self) -> &[ExportedRecord] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What to do with a record whose geometry has no `(((...)))` ring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeometryPolicy {
    #[default]
    Abort,
    Skip,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportOptions {
    pub query: Query,
    pub on_invalid_geometry: GeometryPolicy,
    pub pretty: bool,
}

/// Reads every feature of the shapefile at `path` into a document.
pub fn convert(path: impl AsRef<Path>) -> Result<ExportDocument, ExportError> {
    convert_with(path, &ExportOptions::default())
}

pub fn convert_with(
    path: impl AsRef<Path>,
    options: &ExportOptions,
) -> Result<ExportDocument, ExportError> {
    let source = ShapefileSource::open(path)?;
    convert_source(&source, options)
}

/// Converts the records of `source` in iteration order. With
/// `GeometryPolicy::Abort` the first bad geometry fails the whole call and
/// no partial document is returned.
pub fn convert_source(
    source: &dyn FeatureSource,
    options: &ExportOptions,
) -> Result<ExportDocument, ExportError> {
    let mut records = Vec::new();
    let mut skipped = 0usize;

    source.read_features(&options.query, &mut |feature| {
        match attributes_to_json(&feature) {
            Ok(attributes) => records.push(ExportedRecord {
                id: feature.id,
                attributes,
            }),
            Err(ExportError::GeometryFormat { id })
                if options.on_invalid_geometry == GeometryPolicy::Skip =>
            {
                log::warn!("Skipping feature {}: geometry has no polygon ring", id);
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    })?;

    log::info!(
        "Converted {} features of {} ({} skipped)",
        records.len(),
        source.schema().type_name,
        skipped
    );
    Ok(ExportDocument(records))
}

/// Writes `document` as UTF-8 JSON to `destination`, replacing any existing
/// file. The bytes are produced in full before the file is touched.
pub fn write_document(
    document: &ExportDocument,
    destination: impl AsRef<Path>,
) -> Result<(), ExportError> {
    write_document_with(document, destination, false)
}

pub fn write_document_with(
    document: &ExportDocument,
    destination: impl AsRef<Path>,
    pretty: bool,
) -> Result<(), ExportError> {
    let destination = destination.as_ref();
    let write_error = |source: std::io::Error| ExportError::Write {
        path: destination.to_path_buf(),
        source,
    };

    let bytes = if pretty {
        serde_json::to_vec_pretty(document)
    } else {
        serde_json::to_vec(document)
    }
    .map_err(|e| write_error(e.into()))?;
    std::fs::write(destination, bytes).map_err(write_error)?;

    log::info!(
        "Wrote {} records to {:?}",
        document.len(),
        destination
    );
    Ok(())
}
