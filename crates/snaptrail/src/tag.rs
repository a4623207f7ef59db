use crate::error::TimeError;
use crate::types::{Fields, Revision, Row, TimeZoneMode};
use crate::{COMMIT_TIME_COLUMN, REVISION_COLUMN};

/// Stamp rows with the identity and commit time of the revision they came from.
///
/// Document fields that use a reserved column name are replaced by the
/// revision's values.
pub fn tag(
    rows: Vec<Fields>,
    revision: &Revision,
    zone: TimeZoneMode,
) -> Result<Vec<Row>, TimeError> {
    let commit_time = revision.time.in_zone(zone)?;

    Ok(rows
        .into_iter()
        .map(|mut fields| {
            fields.retain(|name, _| name != REVISION_COLUMN && name != COMMIT_TIME_COLUMN);
            Row {
                revision: revision.id.clone(),
                commit_time,
                fields,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CommitTime;
    use serde_json::{Value, json};

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("fields must be an object"),
        }
    }

    #[test]
    fn test_tag_every_row() {
        let revision = Revision::new("abc123", CommitTime::new(1_700_000_000, 60));
        let rows = vec![fields(json!({"t": 1})), fields(json!({"t": 2}))];

        let tagged = tag(rows, &revision, TimeZoneMode::Utc).unwrap();
        assert_eq!(tagged.len(), 2);
        for row in &tagged {
            assert_eq!(row.revision, "abc123");
            assert_eq!(row.commit_time.timestamp(), 1_700_000_000);
        }
        assert_eq!(tagged[1].get("t"), Some(&json!(2)));
    }

    #[test]
    fn test_tag_replaces_reserved_columns() {
        let revision = Revision::new("abc123", CommitTime::new(0, 0));
        let rows = vec![fields(json!({
            "t": 1,
            "commit_hash": "forged",
            "commit_time": "yesterday",
            "v": 2,
        }))];

        let tagged = tag(rows, &revision, TimeZoneMode::Utc).unwrap();
        let names: Vec<&str> = tagged[0].fields.keys().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["t", "v"]);
        assert_eq!(tagged[0].revision, "abc123");
    }

    #[test]
    fn test_tag_empty_rows() {
        let revision = Revision::new("abc123", CommitTime::new(0, 0));
        assert!(tag(Vec::new(), &revision, TimeZoneMode::Local).unwrap().is_empty());
    }

    #[test]
    fn test_tag_out_of_range_time() {
        let revision = Revision::new("abc123", CommitTime::new(i64::MIN, 0));
        let err = tag(vec![Fields::new()], &revision, TimeZoneMode::Utc).unwrap_err();
        assert_eq!(err.seconds, i64::MIN);
    }
}
