//! JSON → XML rendering for `XmlFromJson` responses.
//!
//! Objects become child elements, arrays repeat their element name, scalars
//! become escaped text and `null` an empty element. Inside an object, keys
//! starting with `@` are written as attributes and the `#text` key as text
//! content.

use serde_json::Value;

const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Render `value` as an XML document with root element `root`.
pub fn render(root: &str, value: &Value) -> String {
    let mut out = String::from(DECLARATION);
    match value {
        // A top-level array needs a single root to stay well formed.
        Value::Array(items) => {
            let root = element_name(root);
            out.push_str(&format!("<{root}>"));
            for item in items {
                write_element(&mut out, "item", item);
            }
            out.push_str(&format!("</{root}>"));
        }
        _ => write_element(&mut out, root, value),
    }
    out
}

fn write_element(out: &mut String, name: &str, value: &Value) {
    let name = element_name(name);
    match value {
        Value::Null => out.push_str(&format!("<{name}/>")),
        Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            out.push_str(&format!("<{name}>{}</{name}>", escape(&scalar(value))));
        }
        Value::Array(items) => {
            for item in items {
                write_element(out, &name, item);
            }
        }
        Value::Object(map) => {
            out.push('<');
            out.push_str(&name);
            for (key, attr) in map.iter().filter(|(k, _)| k.starts_with('@')) {
                out.push_str(&format!(
                    " {}=\"{}\"",
                    element_name(&key[1..]),
                    escape(&scalar(attr))
                ));
            }
            let children: Vec<_> = map.iter().filter(|(k, _)| !k.starts_with('@')).collect();
            if children.is_empty() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for (key, child) in children {
                if key == "#text" {
                    out.push_str(&escape(&scalar(child)));
                } else {
                    write_element(out, key, child);
                }
            }
            out.push_str(&format!("</{name}>"));
        }
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Replace characters that are not valid in an XML name.
fn element_name(raw: &str) -> String {
    let mut name: String = raw
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':') {
                c
            } else {
                '_'
            }
        })
        .collect();
    match name.chars().next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => name.insert(0, '_'),
    }
    name
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
