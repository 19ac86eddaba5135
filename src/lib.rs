//! Exports the features of an ESRI shapefile to a JSON array of
//! `{ "id", "attributes" }` objects, with the geometry reduced to the text
//! of its first polygon ring.

pub mod error;
pub mod exporter;
pub mod feature_source;
pub mod geometry_text;
pub mod record_to_json;
pub mod session;

pub use error::ExportError;
pub use exporter::{
    convert, convert_source, convert_with, write_document, write_document_with, ExportDocument,
    ExportOptions, ExportedRecord, GeometryPolicy,
};
pub use feature_source::{
    AttributeValue, FeatureRecord, FeatureSource, NumericKind, Query, Schema, ShapefileSource,
};
pub use session::{ExportSession, ExportSummary};
