//! Query string decoding.
//!
//! # Rules
//! - `key=value` → string (percent-decoded, `+` is a space)
//! - `key=true` / `key=false` → boolean
//! - `key` → `true`, `key=` → null
//! - `key[]=v` appends to a sequence in encounter order
//! - `key[sub]=v` fills a mapping; first occurrence fixes the order, later
//!   occurrences overwrite; brackets nest (`a[b][c]=v`)
//! - More than `MAX_DEPTH` bracket groups make the whole name a plain key
//! - Empty fragments and empty keys are ignored; nothing here fails

pub mod value;

use indexmap::IndexMap;
use percent_encoding::percent_decode_str;

pub use value::QueryValue;

/// Most bracket groups a key may carry before it is taken literally.
pub const MAX_DEPTH: usize = 16;

/// A decoded query string, keyed in first-seen order.
pub type Query = IndexMap<String, QueryValue>;

/// Decode the raw query string (the part after `?`).
pub fn decode(input: &str) -> Query {
    let mut query = Query::new();

    for part in input.split('&').filter(|p| !p.is_empty()) {
        let (raw_name, value) = match part.split_once('=') {
            Some((name, raw)) => (name, parse_value(raw)),
            None => (part, QueryValue::Bool(true)),
        };

        let name = decode_component(raw_name);
        let path = key_path(&name);
        if path[0].is_empty() {
            continue;
        }

        assign(&mut query, &path, value);
    }

    query
}

/// Decode into a JSON object (used for urlencoded request bodies).
pub fn decode_to_json(input: &str) -> serde_json::Value {
    QueryValue::Map(decode(input)).into()
}

fn parse_value(raw: &str) -> QueryValue {
    let decoded = decode_component(raw);
    match decoded.as_str() {
        "true" => QueryValue::Bool(true),
        "false" => QueryValue::Bool(false),
        "" => QueryValue::Null,
        _ => QueryValue::String(decoded),
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Split `a[b][]` into `["a", "b", ""]`. Anything that is not a clean run of
/// at most `MAX_DEPTH` bracket groups is treated as a plain key.
fn key_path(name: &str) -> Vec<&str> {
    let Some(open) = name.find('[') else {
        return vec![name];
    };

    let (base, mut rest) = name.split_at(open);
    let mut path = vec![base];

    while !rest.is_empty() {
        let Some(inner) = rest.strip_prefix('[') else {
            return vec![name];
        };
        let Some(close) = inner.find(']') else {
            return vec![name];
        };

        if path.len() > MAX_DEPTH {
            return vec![name];
        }

        let segment = &inner[..close];
        if !segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return vec![name];
        }

        path.push(segment);
        rest = &inner[close + 1..];
    }

    path
}

fn assign(target: &mut Query, path: &[&str], value: QueryValue) {
    let (key, rest) = (path[0], &path[1..]);
    if rest.is_empty() {
        target.insert(key.to_string(), value);
        return;
    }

    let slot = target.entry(key.to_string()).or_insert(QueryValue::Null);
    assign_nested(slot, rest, value);
}

fn assign_nested(slot: &mut QueryValue, path: &[&str], value: QueryValue) {
    let (key, rest) = (path[0], &path[1..]);

    if key.is_empty() {
        if !rest.is_empty() {
            // `a[][b]`: the empty group carries no key.
            assign_nested(slot, rest, value);
            return;
        }

        match slot {
            QueryValue::Seq(items) => items.push(value),
            other => *other = QueryValue::Seq(vec![value]),
        }
        return;
    }

    if !matches!(slot, QueryValue::Map(_)) {
        *slot = QueryValue::Map(IndexMap::new());
    }
    if let QueryValue::Map(map) = slot {
        assign(map, path, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn to_json(input: &str) -> serde_json::Value {
        serde_json::to_value(decode(input)).unwrap()
    }

    #[test]
    fn test_simple_values() {
        assert_eq!(
            to_json("a=b&t=true&f=false&null=&single_bool"),
            json!({ "a": "b", "t": true, "f": false, "null": null, "single_bool": true })
        );
    }

    #[test]
    fn test_array_accumulates_in_order() {
        assert_eq!(
            to_json("array[]=1&array[]=2&array[]=3"),
            json!({ "array": ["1", "2", "3"] })
        );
    }

    #[test]
    fn test_object_keeps_first_seen_order() {
        let query = decode("obj[a]=1&obj[b]=2&obj[c]=3&obj[a]=4");
        let obj = query["obj"].as_map().unwrap();
        assert_eq!(obj.keys().collect::<Vec<_>>(), ["a", "b", "c"]);
        assert_eq!(obj["a"], QueryValue::from("4"));

        assert_eq!(
            to_json("obj[a]=1&obj[b]=2&obj[c]=3"),
            json!({ "obj": { "a": "1", "b": "2", "c": "3" } })
        );
    }

    #[test]
    fn test_nested_brackets() {
        assert_eq!(
            to_json("user[name]=ann&user[tags][]=x&user[tags][]=y"),
            json!({ "user": { "name": "ann", "tags": ["x", "y"] } })
        );
    }

    #[test]
    fn test_later_plain_key_overrides() {
        assert_eq!(to_json("a=1&b=2&a=3"), json!({ "a": "3", "b": "2" }));
        assert_eq!(to_json("a=1&a[]=2"), json!({ "a": ["2"] }));
    }

    #[test]
    fn test_percent_decoding() {
        let query = decode("name=John%20Doe&q=a+b&k%5Bx%5D=1");
        assert_eq!(query["name"].as_str(), Some("John Doe"));
        assert_eq!(query["q"].as_str(), Some("a b"));
        assert_eq!(query["k"].get("x"), Some(&QueryValue::from("1")));
    }

    #[test]
    fn test_permissive_on_malformed_input() {
        assert!(decode("").is_empty());
        assert_eq!(to_json("&&a=1&&=2&[x]=3"), json!({ "a": "1" }));
        // Unclosed or unusual brackets become plain keys.
        assert_eq!(to_json("a[b=1&c[d e]=2"), json!({ "a[b": "1", "c[d e]": "2" }));
        // Only the first `=` splits.
        assert_eq!(to_json("token=abc=="), json!({ "token": "abc==" }));
    }

    fn depth(value: &QueryValue) -> usize {
        match value {
            QueryValue::Seq(items) => 1 + items.iter().map(depth).max().unwrap_or(0),
            QueryValue::Map(map) => 1 + map.values().map(depth).max().unwrap_or(0),
            _ => 0,
        }
    }

    #[test]
    fn test_bracket_depth_is_capped() {
        let deepest = format!("a{}=1", "[x]".repeat(MAX_DEPTH));
        assert_eq!(depth(&decode(&deepest)["a"]), MAX_DEPTH);

        let too_deep = format!("a{}=1", "[x]".repeat(MAX_DEPTH + 1));
        let query = decode(&too_deep);
        assert!(!query.contains_key("a"));
        assert_eq!(query[&too_deep[..too_deep.len() - 2]].as_str(), Some("1"));
    }

    #[test]
    fn test_huge_bracket_runs_stay_flat() {
        // Decoding on a small stack must not recurse per bracket group.
        let handle = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(|| {
                for group in ["[]", "[x]"] {
                    let name = format!("a{}", group.repeat(100_000));
                    let query = decode(&format!("{name}=1"));
                    assert_eq!(query.len(), 1);
                    assert_eq!(query[name.as_str()].as_str(), Some("1"));

                    let json = decode_to_json(&format!("{name}=1&b=2"));
                    assert_eq!(json["b"], "2");
                }
            })
            .unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_decode_to_json() {
        assert_eq!(
            decode_to_json("x=1&flag"),
            json!({ "x": "1", "flag": true })
        );
    }
}
