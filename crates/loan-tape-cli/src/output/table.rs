use serde_json::Value;
use tabled::{builder::Builder, Table};

/// Render the analysis envelope: scalar fields in one table, each bucketed
/// section in its own table, then warnings and methodology.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_report(result, map);
            } else {
                print_scalar_table(value);
            }
        }
        Value::Array(arr) => print_section_table(arr),
        _ => {
            println!("{}", value);
        }
    }
}

fn print_report(result: &Value, envelope: &serde_json::Map<String, Value>) {
    print_scalar_table(result);

    if let Value::Object(map) = result {
        for (key, val) in map {
            if let Value::Array(rows) = val {
                println!("\n{}:", key);
                print_section_table(rows);
            }
        }
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

/// Scalar fields in a two-column table. Nested objects flatten to dotted
/// keys; arrays are skipped here and printed as their own sections.
fn print_scalar_table(value: &Value) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            match val {
                Value::Array(_) => continue,
                Value::Object(inner) => {
                    for (inner_key, inner_val) in inner {
                        let dotted = format!("{}.{}", key, inner_key);
                        builder.push_record([dotted.as_str(), &format_value(inner_val)]);
                    }
                }
                _ => {
                    builder.push_record([key.as_str(), &format_value(val)]);
                }
            }
        }
        let table = Table::from(builder);
        println!("{}", table);
    }
}

fn print_section_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| {
                        map.get(h.as_str())
                            .map(|v| format_value(v))
                            .unwrap_or_default()
                    })
                    .collect();
                builder.push_record(row);
            }
        }

        let table = Table::from(builder);
        println!("{}", table);
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
