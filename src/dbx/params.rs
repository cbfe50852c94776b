use indexmap::IndexMap;
use serde_json::Value;

/// Named bind parameters, in insertion order. Placeholders are rendered as `:name`.
pub type Params = IndexMap<String, Value>;

/// Binds `value` under the next free `p{n}` name, where `n` starts at the sink size.
pub fn bind_next(params: &mut Params, value: Value) -> String {
    let mut n = params.len();
    let mut name = format!("p{n}");
    while params.contains_key(&name) {
        n += 1;
        name = format!("p{n}");
    }
    params.insert(name.clone(), value);
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_by_sink_size() {
        let mut params = Params::new();
        assert_eq!(bind_next(&mut params, json!(1)), "p0");
        params.insert("t0".into(), json!("x"));
        assert_eq!(bind_next(&mut params, json!(2)), "p2");
    }

    #[test]
    fn skips_taken_names() {
        let mut params = Params::new();
        params.insert("p1".into(), json!(1));
        assert_eq!(bind_next(&mut params, json!(2)), "p2");
        assert_eq!(params.len(), 2);
    }
}
