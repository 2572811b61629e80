// Front matter extraction.
// Splits a leading YAML block from the markdown body and parses it as opaque attributes.

use serde_json::{Map, Value};

use crate::error::Result;

const OPEN: &str = "---";
const CLOSE: [&str; 2] = ["---", "..."];

/// Split `input` into its front matter block (if any) and body.
///
/// The block must start on the first line with `---` and end at the next
/// `---` or `...` line. Without a closing fence the whole input is body.
pub fn split(input: &str) -> (Option<&str>, &str) {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);

    let mut lines = input.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return (None, input);
    };
    if first.trim_end() != OPEN {
        return (None, input);
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if CLOSE.contains(&line.trim_end()) {
            let yaml = &input[yaml_start..offset];
            let body = &input[offset + line.len()..];
            return (Some(yaml), body);
        }
        offset += line.len();
    }

    (None, input)
}

/// Parse a front matter block. Empty or null blocks give an empty object.
pub fn parse_attributes(yaml: Option<&str>) -> Result<Value> {
    let Some(yaml) = yaml.filter(|y| !y.trim().is_empty()) else {
        return Ok(Value::Object(Map::new()));
    };

    match serde_yaml::from_str::<Value>(yaml)? {
        Value::Null => Ok(Value::Object(Map::new())),
        value => Ok(value),
    }
}
