use serde_json::json;
use serde_json::{Map, Value};

use crate::error::ExportError;
use crate::feature_source::{AttributeValue, FeatureRecord, GEOMETRY_ATTRIBUTE};
use crate::geometry_text::{extract_ring, to_wkt};

/// Key the extracted geometry ring is stored under.
pub const POLYGON_KEY: &str = "POLYGON";

/// Converts an attribute value into its native JSON type.
pub fn attribute_to_json(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::Null => Value::Null,
        AttributeValue::Text(s) | AttributeValue::Date(s) => json!(s),
        AttributeValue::Integer(i) => json!(i),
        // NaN and infinities have no JSON form and become null.
        AttributeValue::Float(f) => json!(f),
        AttributeValue::Boolean(b) => json!(b),
        AttributeValue::Geometry(g) => json!(to_wkt(g)),
    }
}

/// Builds the attribute object of one exported record.
///
/// Attributes keep the order of the record. `the_geom` is replaced by
/// `POLYGON`, holding the first `(((...)))` ring of the geometry text;
/// every other attribute is copied under its own name.
pub fn attributes_to_json(record: &FeatureRecord) -> Result<Map<String, Value>, ExportError> {
    let mut map = Map::new();
    for (name, value) in &record.attributes {
        if name == GEOMETRY_ATTRIBUTE {
            let text = value.to_text();
            let ring = extract_ring(&text).ok_or_else(|| ExportError::GeometryFormat {
                id: record.id.clone(),
            })?;
            map.insert(POLYGON_KEY.to_string(), json!(ring));
        } else {
            map.insert(name.clone(), attribute_to_json(value));
        }
    }
    Ok(map)
}
