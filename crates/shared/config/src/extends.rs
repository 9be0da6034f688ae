use serde_json::{Map, Value};

use crate::{ConfigError, ConfigResult};

/// Merge `child` over `parent`. Nested objects merge recursively; any other
/// value in `child` replaces the parent's.
pub fn deep_merge(parent: &Value, child: &Value) -> Value {
    match (parent, child) {
        (Value::Object(parent), Value::Object(child)) => Value::Object(merge_objects(parent, child)),
        _ => child.clone(),
    }
}

fn merge_objects(parent: &Map<String, Value>, child: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = parent.clone();
    for (key, value) in child {
        let next = match merged.get(key) {
            Some(existing) => deep_merge(existing, value),
            None => value.clone(),
        };
        merged.insert(key.clone(), next);
    }
    merged
}

/// Resolve the `extends` chain of `target`, the settings object named `name`
/// inside `whole`.
///
/// Each ancestor contributes every field except those in `excludes`; the
/// descendant always wins. The returned object has no `extends` key.
pub fn json_extends(
    whole: &Map<String, Value>,
    name: &str,
    target: &Map<String, Value>,
    excludes: &[&str],
) -> ConfigResult<Map<String, Value>> {
    let mut result = target.clone();
    let mut history: Vec<String> = vec![name.to_string()];

    while let Some(parent_value) = result.remove("extends") {
        let parent_name = parent_value
            .as_str()
            .ok_or_else(|| ConfigError::InvalidType {
                key: format!("{name}.extends"),
                expected: "a string",
            })?
            .to_string();
        let parent = whole
            .get(&parent_name)
            .and_then(Value::as_object)
            .ok_or_else(|| ConfigError::UnknownParent {
                child: name.to_string(),
                parent: parent_name.clone(),
            })?;
        if history.contains(&parent_name) {
            return Err(ConfigError::ExtendsCycle(name.to_string()));
        }
        history.push(parent_name);

        let inherited: Map<String, Value> = parent
            .iter()
            .filter(|(key, _)| !excludes.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        result = merge_objects(&inherited, &result);
    }

    Ok(result)
}
