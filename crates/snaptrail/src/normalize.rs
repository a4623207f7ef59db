use crate::DEFAULT_SEQUENCE_FIELD;
use crate::types::{Document, Fields};
use serde_json::{Map, Value};

/// How a snapshot is exploded into rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Top-level field holding the observation sequence.
    pub sequence_field: String,
    /// When set, nested objects inside observations (and inside a document
    /// without a sequence) become `parent<sep>child` columns. Metadata is
    /// never flattened.
    pub flatten_separator: Option<String>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        NormalizeOptions {
            sequence_field: DEFAULT_SEQUENCE_FIELD.to_string(),
            flatten_separator: None,
        }
    }
}

/// Explode a snapshot into one set of fields per observation.
///
/// If the sequence field holds an array, every element yields a row made of
/// the element's own fields followed by every other top-level field of the
/// document. On a name collision the element's value wins. An empty array
/// yields no rows.
///
/// Without an array under the sequence field the whole document becomes a
/// single row.
pub fn normalize(document: &Document, options: &NormalizeOptions) -> Vec<Fields> {
    let separator = options.flatten_separator.as_deref();

    let Some(Value::Array(elements)) = document.get(&options.sequence_field) else {
        return vec![flatten(document, separator)];
    };

    let metadata: Vec<(&String, &Value)> = document
        .iter()
        .filter(|(name, _)| **name != options.sequence_field)
        .collect();

    elements
        .iter()
        .map(|element| {
            let mut fields = match element {
                Value::Object(map) => flatten(map, separator),
                // Bare values have no names of their own.
                other => {
                    let mut fields = Fields::new();
                    fields.insert(options.sequence_field.clone(), other.clone());
                    fields
                }
            };
            for (name, value) in &metadata {
                if !fields.contains_key(name.as_str()) {
                    fields.insert((*name).clone(), (*value).clone());
                }
            }
            fields
        })
        .collect()
}

fn flatten(map: &Map<String, Value>, separator: Option<&str>) -> Fields {
    match separator {
        None => map.clone(),
        Some(sep) => {
            let mut out = Fields::new();
            flatten_into(&mut out, None, map, sep);
            out
        }
    }
}

fn flatten_into(out: &mut Fields, prefix: Option<&str>, map: &Map<String, Value>, sep: &str) {
    for (name, value) in map {
        let column = match prefix {
            Some(prefix) => format!("{}{}{}", prefix, sep, name),
            None => name.clone(),
        };
        match value {
            Value::Object(inner) if !inner.is_empty() => {
                flatten_into(out, Some(&column), inner, sep)
            }
            _ => {
                out.insert(column, value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("test document must be an object"),
        }
    }

    fn keys(fields: &Fields) -> Vec<&str> {
        fields.keys().map(|k| k.as_str()).collect()
    }

    #[test]
    fn test_explodes_sequence_with_metadata() {
        let d = doc(json!({
            "region": "X",
            "lat": 55.7,
            "timeserie": [{"t": 1, "v": 10}, {"t": 2, "v": 11}, {"t": 3, "v": 12}],
        }));
        let rows = normalize(&d, &NormalizeOptions::default());

        assert_eq!(rows.len(), 3);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(keys(row), vec!["t", "v", "region", "lat"]);
            assert_eq!(row["t"], (i + 1) as u64);
            assert_eq!(row["region"], "X");
            assert_eq!(row["lat"], 55.7);
        }
        assert_eq!(rows[2]["v"], 12);
    }

    #[test]
    fn test_element_overrides_metadata() {
        let d = doc(json!({
            "v": "document",
            "region": "X",
            "timeserie": [{"t": 1, "v": 10}, {"t": 2}],
        }));
        let rows = normalize(&d, &NormalizeOptions::default());

        assert_eq!(rows[0]["v"], 10);
        assert_eq!(keys(&rows[0]), vec!["t", "v", "region"]);
        // An element without the field still receives the metadata value.
        assert_eq!(rows[1]["v"], "document");
    }

    #[test]
    fn test_empty_sequence_yields_no_rows() {
        let d = doc(json!({"region": "X", "timeserie": []}));
        assert!(normalize(&d, &NormalizeOptions::default()).is_empty());
    }

    #[test]
    fn test_missing_sequence_yields_single_row() {
        let d = doc(json!({"region": "X", "count": 3}));
        let rows = normalize(&d, &NormalizeOptions::default());
        assert_eq!(rows.len(), 1);
        assert_eq!(keys(&rows[0]), vec!["region", "count"]);
    }

    #[test]
    fn test_non_array_sequence_yields_single_row() {
        let d = doc(json!({"region": "X", "timeserie": {"t": 1}}));
        let rows = normalize(&d, &NormalizeOptions::default());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["timeserie"], json!({"t": 1}));
    }

    #[test]
    fn test_nested_values_stay_opaque() {
        let d = doc(json!({
            "aggData": {"min": 1, "max": 5},
            "timeserie": [{"t": 1, "wind": {"speed": 4, "dir": "N"}}],
        }));
        let rows = normalize(&d, &NormalizeOptions::default());
        assert_eq!(rows[0]["wind"], json!({"speed": 4, "dir": "N"}));
        assert_eq!(rows[0]["aggData"], json!({"min": 1, "max": 5}));
    }

    #[test]
    fn test_flatten_separator_flattens_elements_only() {
        let d = doc(json!({
            "aggData": {"min": 1},
            "timeserie": [{"t": 1, "wind": {"speed": 4, "gust": {"max": 9}}, "tags": [1, 2]}],
        }));
        let options = NormalizeOptions {
            flatten_separator: Some(".".into()),
            ..Default::default()
        };
        let rows = normalize(&d, &options);

        assert_eq!(
            keys(&rows[0]),
            vec!["t", "wind.speed", "wind.gust.max", "tags", "aggData"]
        );
        assert_eq!(rows[0]["wind.gust.max"], 9);
        assert_eq!(rows[0]["tags"], json!([1, 2]));
        assert_eq!(rows[0]["aggData"], json!({"min": 1}));
    }

    #[test]
    fn test_flatten_separator_applies_to_fallback_row() {
        let d = doc(json!({"station": {"id": 7, "name": "A"}, "empty": {}}));
        let options = NormalizeOptions {
            flatten_separator: Some("_".into()),
            ..Default::default()
        };
        let rows = normalize(&d, &options);
        assert_eq!(keys(&rows[0]), vec!["station_id", "station_name", "empty"]);
        assert_eq!(rows[0]["empty"], json!({}));
    }

    #[test]
    fn test_scalar_elements_use_sequence_name() {
        let d = doc(json!({"region": "X", "timeserie": [1.5, 2.5]}));
        let rows = normalize(&d, &NormalizeOptions::default());
        assert_eq!(rows.len(), 2);
        assert_eq!(keys(&rows[0]), vec!["timeserie", "region"]);
        assert_eq!(rows[1]["timeserie"], 2.5);
    }

    #[test]
    fn test_custom_sequence_field() {
        let d = doc(json!({"timeserie": [1], "points": [{"t": 1}, {"t": 2}]}));
        let options = NormalizeOptions {
            sequence_field: "points".into(),
            ..Default::default()
        };
        let rows = normalize(&d, &options);
        assert_eq!(rows.len(), 2);
        // The default sequence name is plain metadata here.
        assert_eq!(rows[0]["timeserie"], json!([1]));
    }
}
