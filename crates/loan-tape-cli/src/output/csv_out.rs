use serde_json::Value;
use std::io;

/// Write the analysis as two-column CSV to stdout. Nested objects flatten
/// to dotted field names; bucketed tables serialize as JSON cells.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let rows = match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => result,
            _ => map,
        },
        _ => {
            let _ = wtr.write_record([&format_csv_value(value)]);
            let _ = wtr.flush();
            return;
        }
    };

    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in rows {
        match val {
            Value::Object(inner) => {
                for (inner_key, inner_val) in inner {
                    let dotted = format!("{}.{}", key, inner_key);
                    let _ = wtr.write_record([dotted.as_str(), &format_csv_value(inner_val)]);
                }
            }
            _ => {
                let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
            }
        }
    }

    let _ = wtr.flush();
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
