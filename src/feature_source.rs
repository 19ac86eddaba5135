use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use shapefile::dbase::{self, FieldValue};

use crate::error::ExportError;
use crate::geometry_text::{shape_to_geometry, to_wkt};

/// Name of the attribute that carries a feature's geometry.
pub const GEOMETRY_ATTRIBUTE: &str = "the_geom";

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(String),
    Geometry(geo::Geometry<f64>),
}

impl AttributeValue {
    /// Textual form of the value; geometries render as WKT.
    pub fn to_text(&self) -> String {
        match self {
            AttributeValue::Null => "null".to_string(),
            AttributeValue::Text(s) | AttributeValue::Date(s) => s.clone(),
            AttributeValue::Integer(i) => i.to_string(),
            AttributeValue::Float(f) => f.to_string(),
            AttributeValue::Boolean(b) => b.to_string(),
            AttributeValue::Geometry(g) => to_wkt(g),
        }
    }
}

/// One row of a dataset. Attributes are in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub id: String,
    pub attributes: Vec<(String, AttributeValue)>,
}

/// JSON type of a dbf `N` column, fixed by its declared decimal count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    Integer,
    Decimal,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub type_name: String,
    pub attributes: Vec<String>,
    /// Kind of every numeric column, keyed by attribute name.
    pub numeric_kinds: HashMap<String, NumericKind>,
}

impl Schema {
    /// Columns without a declared kind are treated as decimal.
    pub fn numeric_kind(&self, attribute: &str) -> NumericKind {
        self.numeric_kinds
            .get(attribute)
            .copied()
            .unwrap_or(NumericKind::Decimal)
    }
}

/// Selects every attribute of every record, optionally capped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub max_features: Option<usize>,
}

impl Query {
    pub fn all() -> Self {
        Query { max_features: None }
    }
}

/// A dataset that yields feature records in a stable order.
///
/// `read_features` hands each record to `visit` in source order. Any reader
/// it opens lives only for the duration of the call, so it is closed whether
/// iteration finishes, the source fails, or `visit` returns an error.
pub trait FeatureSource {
    fn schema(&self) -> &Schema;

    fn read_features(
        &self,
        query: &Query,
        visit: &mut dyn FnMut(FeatureRecord) -> Result<(), ExportError>,
    ) -> Result<(), ExportError>;
}

/// A `.shp`/`.shx`/`.dbf` triple on disk.
#[derive(Debug)]
pub struct ShapefileSource {
    path: PathBuf,
    schema: Schema,
}

impl ShapefileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let path = path.as_ref().to_path_buf();
        // Opening the shape file checks the header, so a missing or foreign
        // file fails here rather than half way through an export.
        shapefile::ShapeReader::from_path(&path)
            .map_err(|e| ExportError::data_source(&path, e))?;
        let dbf_path = path.with_extension("dbf");
        let dbf = dbase::Reader::from_path(&dbf_path)
            .map_err(|e| ExportError::data_source(&path, shapefile::Error::DbaseError(e)))?;
        let numeric_kinds = read_numeric_kinds(&dbf_path)
            .map_err(|e| ExportError::data_source(&path, shapefile::Error::IoError(e)))?;

        let mut attributes = vec![GEOMETRY_ATTRIBUTE.to_string()];
        attributes.extend(
            dbf.fields()
                .iter()
                .map(|field| field.name().to_string())
                .filter(|name| name != "DeletionFlag"),
        );
        let type_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        log::info!(
            "Opened shapefile {:?} with {} attributes",
            path,
            attributes.len()
        );
        log::debug!("Schema of {}: {:?}", type_name, attributes);

        Ok(ShapefileSource {
            path,
            schema: Schema {
                type_name,
                attributes,
                numeric_kinds,
            },
        })
    }
}

// dBASE header layout: the header length sits at bytes 8..10 of the 32 byte
// file header, followed by one 32 byte descriptor per field and a 0x0D
// terminator. Within a descriptor the type is at byte 11 and the decimal
// count at byte 17.
const DBF_PREFIX_LEN: usize = 32;
const FIELD_DESCRIPTOR_LEN: usize = 32;
const FIELD_NAME_LEN: usize = 11;
const FIELD_TYPE_OFFSET: usize = 11;
const FIELD_DECIMALS_OFFSET: usize = 17;
const HEADER_TERMINATOR: u8 = 0x0D;

/// Reads the declared decimal count of every `N` column. The dbase reader
/// does not expose it, so the field descriptors are read directly.
fn read_numeric_kinds(dbf_path: &Path) -> io::Result<HashMap<String, NumericKind>> {
    let mut file = File::open(dbf_path)?;
    let mut prefix = [0u8; DBF_PREFIX_LEN];
    file.read_exact(&mut prefix)?;
    let header_len = usize::from(u16::from_le_bytes([prefix[8], prefix[9]]));
    let mut descriptors = vec![0u8; header_len.saturating_sub(DBF_PREFIX_LEN)];
    file.read_exact(&mut descriptors)?;

    let mut kinds = HashMap::new();
    for descriptor in descriptors.chunks_exact(FIELD_DESCRIPTOR_LEN) {
        if descriptor[0] == HEADER_TERMINATOR {
            break;
        }
        if descriptor[FIELD_TYPE_OFFSET] != b'N' {
            continue;
        }
        let name = &descriptor[..FIELD_NAME_LEN];
        let name_len = name.iter().position(|&b| b == 0).unwrap_or(FIELD_NAME_LEN);
        let name = String::from_utf8_lossy(&name[..name_len]).trim().to_string();
        let kind = if descriptor[FIELD_DECIMALS_OFFSET] == 0 {
            NumericKind::Integer
        } else {
            NumericKind::Decimal
        };
        kinds.insert(name, kind);
    }
    Ok(kinds)
}

impl FeatureSource for ShapefileSource {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn read_features(
        &self,
        query: &Query,
        visit: &mut dyn FnMut(FeatureRecord) -> Result<(), ExportError>,
    ) -> Result<(), ExportError> {
        let mut reader = shapefile::Reader::from_path(&self.path)
            .map_err(|e| ExportError::data_source(&self.path, e))?;
        let limit = query.max_features.unwrap_or(usize::MAX);

        for (index, result) in reader.iter_shapes_and_records().take(limit).enumerate() {
            let (shape, mut record) =
                result.map_err(|e| ExportError::data_source(&self.path, e))?;
            let mut shape = Some(shape);

            let mut attributes = Vec::with_capacity(self.schema.attributes.len());
            for name in &self.schema.attributes {
                let value = if name == GEOMETRY_ATTRIBUTE {
                    shape
                        .take()
                        .and_then(shape_to_geometry)
                        .map(AttributeValue::Geometry)
                        .unwrap_or(AttributeValue::Null)
                } else {
                    record
                        .remove(name)
                        .map(|value| {
                            field_value_to_attribute(value, self.schema.numeric_kind(name))
                        })
                        .unwrap_or(AttributeValue::Null)
                };
                attributes.push((name.clone(), value));
            }

            visit(FeatureRecord {
                id: format!("{}.{}", self.schema.type_name, index + 1),
                attributes,
            })?;
        }
        Ok(())
    }
}

// Magnitude below which every integer is exactly representable in f64.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

fn numeric(value: f64, kind: NumericKind) -> AttributeValue {
    match kind {
        NumericKind::Integer if value.abs() < MAX_EXACT_INTEGER => {
            AttributeValue::Integer(value.trunc() as i64)
        }
        _ => AttributeValue::Float(value),
    }
}

fn field_value_to_attribute(value: FieldValue, kind: NumericKind) -> AttributeValue {
    match value {
        FieldValue::Character(Some(s)) | FieldValue::Memo(s) => AttributeValue::Text(s),
        FieldValue::Numeric(Some(n)) => numeric(n, kind),
        FieldValue::Float(Some(f)) => AttributeValue::Float(f64::from(f)),
        FieldValue::Double(d) | FieldValue::Currency(d) => AttributeValue::Float(d),
        FieldValue::Integer(i) => AttributeValue::Integer(i64::from(i)),
        FieldValue::Logical(Some(b)) => AttributeValue::Boolean(b),
        FieldValue::Date(Some(date)) => AttributeValue::Date(format!(
            "{:04}-{:02}-{:02}",
            date.year(),
            date.month(),
            date.day()
        )),
        FieldValue::DateTime(datetime) => {
            let (date, time) = (datetime.date(), datetime.time());
            AttributeValue::Date(format!(
                "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
                date.year(),
                date.month(),
                date.day(),
                time.hours(),
                time.minutes(),
                time.seconds()
            ))
        }
        FieldValue::Character(None)
        | FieldValue::Numeric(None)
        | FieldValue::Float(None)
        | FieldValue::Logical(None)
        | FieldValue::Date(None) => AttributeValue::Null,
        #[allow(unreachable_patterns)]
        other => AttributeValue::Text(format!("{:?}", other)),
    }
}
