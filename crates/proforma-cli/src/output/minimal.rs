use serde_json::Value;

/// Fields tried in order; the first non-null one found is printed.
const PRIORITY_KEYS: [&str; 4] = ["share_price", "enterprise_value", "equity_value", "terminal_value"];

/// Print just the headline number from the output.
///
/// Looks in the `result` envelope, then in its nested `valuation`. Sweep
/// output prints one line per point.
pub fn print_minimal(value: &Value) {
    if let Some(Value::Array(rows)) = value.get("results") {
        for row in rows {
            println!("{}", sweep_line(row));
        }
        return;
    }

    let result_obj = value.get("result").unwrap_or(value);
    let scopes = [Some(result_obj), result_obj.get("valuation")];

    for scope in scopes.into_iter().flatten() {
        for key in PRIORITY_KEYS {
            if let Some(val) = scope.get(key) {
                if !val.is_null() {
                    println!("{}", format_minimal(val));
                    return;
                }
            }
        }
    }

    if let Value::Array(rows) = result_obj {
        println!("{} rows", rows.len());
        return;
    }
    println!("{}", format_minimal(result_obj));
}

fn sweep_line(row: &Value) -> String {
    let mut parts = Vec::new();
    for key in ["var1_value", "var2_value", "enterprise_value"] {
        if let Some(val) = row.get(key) {
            parts.push(format_minimal(val));
        }
    }
    parts.join(" ")
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
