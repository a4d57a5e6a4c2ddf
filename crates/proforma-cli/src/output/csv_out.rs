use serde_json::{Map, Value};
use std::io::{self, Write};

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    if let Err(e) = write_csv(value, stdout.lock()) {
        eprintln!("CSV output error: {e}");
    }
}

/// Arrays of records become one row per record; objects become
/// `field,value` pairs.
pub fn write_csv<W: Write>(value: &Value, writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);

    match value {
        Value::Object(map) => {
            if let Some(Value::Array(results)) = map.get("results") {
                write_records(&mut wtr, results)?;
            } else if let Some(Value::Object(result)) = map.get("result") {
                write_fields(&mut wtr, result)?;
            } else {
                write_fields(&mut wtr, map)?;
            }
        }
        Value::Array(arr) => write_records(&mut wtr, arr)?,
        _ => wtr.write_record([format_csv_value(value)])?,
    }

    wtr.flush()?;
    Ok(())
}

fn write_fields<W: Write>(wtr: &mut csv::Writer<W>, map: &Map<String, Value>) -> Result<(), csv::Error> {
    wtr.write_record(["field", "value"])?;
    for (key, val) in map {
        wtr.write_record([key.as_str(), &format_csv_value(val)])?;
    }
    Ok(())
}

fn write_records<W: Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) -> Result<(), csv::Error> {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            wtr.write_record([format_csv_value(item)])?;
        }
        return Ok(());
    };

    let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
    wtr.write_record(&headers)?;
    for item in arr {
        let row: Vec<String> = headers
            .iter()
            .map(|h| item.get(*h).map(format_csv_value).unwrap_or_default())
            .collect();
        wtr.write_record(&row)?;
    }
    Ok(())
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(value: &Value) -> String {
        let mut buf = Vec::new();
        write_csv(value, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_sweep_results_become_rows() {
        let value = json!({
            "var1_name": "wacc",
            "results": [
                { "var1_value": "0.10", "enterprise_value": "1000", "error": null },
                { "var1_value": "0.11", "enterprise_value": null, "error": "bad" }
            ]
        });
        let out = render(&value);

        let mut reader = csv::Reader::from_reader(out.as_bytes());
        let headers = reader.headers().unwrap().clone();
        let ev = headers.iter().position(|h| h == "enterprise_value").unwrap();
        let err = headers.iter().position(|h| h == "error").unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();

        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][ev], "1000");
        assert_eq!(&rows[0][err], "");
        assert_eq!(&rows[1][ev], "");
        assert_eq!(&rows[1][err], "bad");
    }

    #[test]
    fn test_result_envelope_becomes_field_value_pairs() {
        let value = json!({ "result": { "share_price": "12.5" }, "warnings": [] });
        assert_eq!(render(&value), "field,value\nshare_price,12.5\n");
    }
}
