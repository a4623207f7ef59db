use crate::error::Result;
use crate::merge::Table;
use crate::types::Row;
use crate::{COMMIT_TIME_COLUMN, COMMIT_TIME_FORMAT, REVISION_COLUMN};
use serde_json::{Map, Value};
use std::io::Write;

/// Render one cell of a row as delimited text.
///
/// Absent and null values render empty, strings raw, and numbers, booleans
/// and nested values in compact JSON form.
pub fn render_cell(row: &Row, column: &str) -> String {
    match column {
        REVISION_COLUMN => row.revision.clone(),
        COMMIT_TIME_COLUMN => row.commit_time.format(COMMIT_TIME_FORMAT).to_string(),
        _ => match row.get(column) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        },
    }
}

/// Write the table as CSV: a header row of column names, then one record per row.
///
/// An empty table has no columns and writes nothing.
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    if !table.columns.is_empty() {
        out.write_record(&table.columns)?;
        for row in &table.rows {
            out.write_record(table.columns.iter().map(|column| render_cell(row, column)))?;
        }
    }
    out.flush()?;
    Ok(())
}

/// The table as a JSON array of objects, one per row, with every column in
/// table order and absent values as `null`.
pub fn to_json_value(table: &Table) -> Value {
    let rows = table
        .rows
        .iter()
        .map(|row| {
            let mut object = Map::new();
            for column in &table.columns {
                let value = match column.as_str() {
                    REVISION_COLUMN | COMMIT_TIME_COLUMN => Value::String(render_cell(row, column)),
                    _ => row.get(column).cloned().unwrap_or(Value::Null),
                };
                object.insert(column.clone(), value);
            }
            Value::Object(object)
        })
        .collect();
    Value::Array(rows)
}

/// Serialize the table with [`to_json_value`].
pub fn to_json(table: &Table, pretty: bool) -> Result<String> {
    let value = to_json_value(table);
    let json = if pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::{DedupPolicy, merge};
    use crate::types::{CommitTime, Fields, TimeZoneMode};
    use serde_json::json;

    fn row(revision: &str, seconds: i64, value: Value) -> Row {
        let fields: Fields = match value {
            Value::Object(map) => map,
            _ => panic!("row fields must be an object"),
        };
        Row {
            revision: revision.into(),
            commit_time: CommitTime::new(seconds, 0)
                .in_zone(TimeZoneMode::Utc)
                .unwrap(),
            fields,
        }
    }

    fn sample_table() -> Table {
        merge(
            vec![
                row("aaa", 0, json!({"t": 1, "v": 10.5, "name": "a, b"})),
                row("bbb", 60, json!({"t": 2, "ok": true, "wind": {"dir": "N"}})),
            ],
            &[],
            &DedupPolicy::KeepAll,
        )
    }

    fn csv_string(table: &Table) -> String {
        let mut buf = Vec::new();
        write_csv(table, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_render_cell_kinds() {
        let r = row("aaa", 0, json!({"s": "x", "n": 2, "b": false, "z": null, "o": [1, 2]}));
        assert_eq!(render_cell(&r, "s"), "x");
        assert_eq!(render_cell(&r, "n"), "2");
        assert_eq!(render_cell(&r, "b"), "false");
        assert_eq!(render_cell(&r, "z"), "");
        assert_eq!(render_cell(&r, "o"), "[1,2]");
        assert_eq!(render_cell(&r, "missing"), "");
        assert_eq!(render_cell(&r, REVISION_COLUMN), "aaa");
        assert_eq!(render_cell(&r, COMMIT_TIME_COLUMN), "1970-01-01 00:00:00");
    }

    #[test]
    fn test_write_csv_layout() {
        let out = csv_string(&sample_table());
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "t,v,name,ok,wind,commit_hash,commit_time");
        assert_eq!(lines[1], "1,10.5,\"a, b\",,,aaa,1970-01-01 00:00:00");
        assert_eq!(lines[2], "2,,,true,\"{\"\"dir\"\":\"\"N\"\"}\",bbb,1970-01-01 00:01:00");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_write_csv_empty_table() {
        assert_eq!(csv_string(&Table::default()), "");
    }

    #[test]
    fn test_write_csv_is_deterministic() {
        assert_eq!(csv_string(&sample_table()), csv_string(&sample_table()));
    }

    #[test]
    fn test_to_json_value_fills_absent_with_null() {
        let value = to_json_value(&sample_table());
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["ok"], Value::Null);
        assert_eq!(rows[1]["wind"], json!({"dir": "N"}));
        assert_eq!(rows[1]["commit_hash"], "bbb");
        let keys: Vec<&str> = rows[0].as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["t", "v", "name", "ok", "wind", "commit_hash", "commit_time"]);
    }

    #[test]
    fn test_to_json_pretty() {
        let table = sample_table();
        let compact = to_json(&table, false).unwrap();
        let pretty = to_json(&table, true).unwrap();
        assert!(!compact.contains('\n'));
        assert!(pretty.contains('\n'));
        let a: Value = serde_json::from_str(&compact).unwrap();
        let b: Value = serde_json::from_str(&pretty).unwrap();
        assert_eq!(a, b);
    }
}
