//! `varnishstat -j` source
//!
//! Two layouts exist. Varnish 6.5 and later nest counters under a `counters`
//! key next to `version` and `timestamp`; older releases put every counter at
//! the top level beside `timestamp`. Both are read in document order.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::trace;
use vscprom_core::{Counter, Kind};

use super::{Error, Input, Source};

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    description: String,
    value: Value,
}

/// Counters from `varnishstat -j` output.
#[derive(Debug)]
pub struct Json {
    input: Input,
}

impl Json {
    /// Create a new [`Json`] source reading from `input`.
    #[must_use]
    pub fn new(input: Input) -> Self {
        Self { input }
    }
}

impl Source for Json {
    fn counters(&mut self) -> Result<Vec<Counter>, Error> {
        let text = self.input.read()?;
        parse(&text)
    }
}

/// Decode `varnishstat -j` output.
///
/// Counters whose value is not an unsigned integer keep the JSON type name as
/// their [`Kind`], which the classifier refuses.
///
/// # Errors
///
/// Returns an error if `text` is not a JSON object or a counter entry lacks a
/// `value`.
pub fn parse(text: &str) -> Result<Vec<Counter>, Error> {
    let root: Map<String, Value> = serde_json::from_str(text)?;
    let counters = match root.get("counters") {
        Some(Value::Object(counters)) => counters,
        _ => &root,
    };

    let mut out = Vec::with_capacity(counters.len());
    for (name, value) in counters {
        // `timestamp` and `version` are scalars
        if !value.is_object() {
            trace!("skipping non-counter key {name}");
            continue;
        }

        let entry = Entry::deserialize(value)?;
        let counter = match entry.value.as_u64() {
            Some(v) => Counter::uint64(name.as_str(), entry.description, v),
            None => Counter::new(
                name.as_str(),
                entry.description,
                Kind::Other(type_name(&entry.value).to_string()),
                0,
            ),
        };
        out.push(counter);
    }

    Ok(out)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERSIONED: &str = r#"{
  "version": 1,
  "timestamp": "2024-05-02T10:15:27",
  "counters": {
    "MGT.uptime": {
      "description": "Management process uptime",
      "flag": "c",
      "format": "d",
      "value": 1000
    },
    "MAIN.cache_hit": {
      "description": "Cache hits",
      "flag": "c",
      "format": "i",
      "value": 42
    },
    "VBE.boot.default.happy": {
      "description": "Happy health probes",
      "flag": "b",
      "format": "b",
      "value": 18446744073709551615
    }
  }
}"#;

    const LEGACY: &str = r#"{
  "timestamp": "2019-01-01T00:00:00",
  "MAIN.uptime": {
    "description": "Child process uptime",
    "type": "MAIN", "flag": "c", "format": "d",
    "value": 5
  },
  "LCK.sma.creat": {
    "description": "Created locks",
    "type": "LCK", "ident": "sma", "flag": "c", "format": "i",
    "value": 1
  }
}"#;

    #[test]
    fn versioned_layout() {
        let counters = parse(VERSIONED).unwrap();
        assert_eq!(
            counters,
            vec![
                Counter::uint64("MGT.uptime", "Management process uptime", 1000),
                Counter::uint64("MAIN.cache_hit", "Cache hits", 42),
                Counter::uint64("VBE.boot.default.happy", "Happy health probes", u64::MAX),
            ]
        );
    }

    #[test]
    fn legacy_layout() {
        let counters = parse(LEGACY).unwrap();
        assert_eq!(
            counters,
            vec![
                Counter::uint64("MAIN.uptime", "Child process uptime", 5),
                Counter::uint64("LCK.sma.creat", "Created locks", 1),
            ]
        );
    }

    #[test]
    fn document_order_is_kept() {
        let text = r#"{"z.a": {"value": 1}, "a.b": {"value": 2}, "m.c": {"value": 3}}"#;
        let names: Vec<String> = parse(text).unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["z.a", "a.b", "m.c"]);
    }

    #[test]
    fn non_integer_values_are_marked() {
        let text = r#"{"A.neg": {"value": -1}, "A.float": {"value": 1.5}, "A.str": {"value": "x"}}"#;
        let kinds: Vec<Kind> = parse(text).unwrap().into_iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                Kind::Other("number".to_string()),
                Kind::Other("number".to_string()),
                Kind::Other("string".to_string()),
            ]
        );
    }

    #[test]
    fn missing_description_is_empty() {
        let counters = parse(r#"{"MAIN.x": {"value": 3}}"#).unwrap();
        assert_eq!(counters, vec![Counter::uint64("MAIN.x", "", 3)]);
    }

    #[test]
    fn entry_without_value_is_an_error() {
        assert!(matches!(
            parse(r#"{"MAIN.x": {"description": "no value"}}"#),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn not_an_object_is_an_error() {
        assert!(matches!(parse("[1, 2]"), Err(Error::Json(_))));
        assert!(matches!(parse("garbage"), Err(Error::Json(_))));
    }
}
