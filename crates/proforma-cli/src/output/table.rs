use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    print!("{}", render(value));
}

/// Scalar fields go into one `Field | Value` table; every array of records
/// (yearly statements, sweep results) gets its own table.
pub fn render(value: &Value) -> String {
    let mut out = String::new();
    match value {
        Value::Object(map) => {
            if let Some(Value::Array(results)) = map.get("results") {
                out.push_str(&array_table(results));
            } else if let Some(result) = map.get("result") {
                out.push_str(&render_section(result));
            } else {
                out.push_str(&render_section(value));
            }
            out.push_str(&footer(map));
        }
        Value::Array(arr) => out.push_str(&array_table(arr)),
        _ => out.push_str(&format!("{value}\n")),
    }
    out
}

fn render_section(value: &Value) -> String {
    let Value::Object(map) = value else {
        return array_or_scalar(value);
    };

    let mut out = String::new();
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut nested: Vec<(&String, &Vec<Value>)> = Vec::new();

    for (key, val) in map {
        match val {
            Value::Array(items) if items.first().is_some_and(Value::is_object) => {
                nested.push((key, items));
            }
            _ => builder.push_record([key.as_str(), &format_value(val)]),
        }
    }
    out.push_str(&format!("{}\n", Table::from(builder)));

    for (key, items) in nested {
        out.push_str(&format!("\n{key}:\n"));
        out.push_str(&array_table(items));
    }
    out
}

fn array_or_scalar(value: &Value) -> String {
    match value {
        Value::Array(arr) => array_table(arr),
        other => format!("{}\n", format_value(other)),
    }
}

fn array_table(arr: &[Value]) -> String {
    let Some(Value::Object(first)) = arr.first() else {
        if arr.is_empty() {
            return "(empty)\n".to_string();
        }
        return arr.iter().map(|v| format!("{}\n", format_value(v))).collect();
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);
    for item in arr {
        let row: Vec<String> = headers
            .iter()
            .map(|h| item.get(h.as_str()).map(format_value).unwrap_or_default())
            .collect();
        builder.push_record(row);
    }
    format!("{}\n", Table::from(builder))
}

fn footer(envelope: &Map<String, Value>) -> String {
    let mut out = String::new();
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            out.push_str("\nWarnings:\n");
            for w in warnings.iter().filter_map(Value::as_str) {
                out.push_str(&format!("  - {w}\n"));
            }
        }
    }
    if let Some(Value::String(meth)) = envelope.get("methodology") {
        out.push_str(&format!("\nMethodology: {meth}\n"));
    }
    out
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_yearly_arrays_get_their_own_table() {
        let value = json!({
            "result": {
                "share_price": "12.5",
                "free_cash_flows": [
                    { "year": 2026, "fcff": "786800" },
                    { "year": 2027, "fcff": "900000" }
                ]
            },
            "warnings": ["[DCF] Terminal value represents 80.0% of enterprise value"],
            "methodology": "test"
        });
        let out = render(&value);

        assert!(out.contains("share_price"));
        assert!(out.contains("free_cash_flows:"));
        assert!(out.contains("786800"));
        assert!(out.contains("Warnings:"));
        assert!(out.contains("Methodology: test"));
    }

    #[test]
    fn test_empty_array() {
        assert_eq!(render(&json!([])), "(empty)\n");
    }
}
