use crate::registry::PolicyRegistry;
use crate::value::Value;

/// Returns true when `value` is indistinguishable from the default registered
/// for `field` and can be left out of the output.
///
/// Scalars compare type-aware (`420` is not `"420"`). Sequences compare as
/// multisets: same length, same elements, any order. Shape mismatches never
/// match.
pub fn is_default(registry: &PolicyRegistry, field: &str, value: &Value) -> bool {
    let Some(default) = registry.default_for(field) else {
        return false;
    };

    match (default, value) {
        (Value::Scalar(expected), Value::Scalar(actual)) => expected == actual,
        (Value::Sequence(expected), Value::Sequence(actual)) => same_elements(expected, actual),
        _ => false,
    }
}

fn same_elements(expected: &[Value], actual: &[Value]) -> bool {
    if expected.len() != actual.len() {
        return false;
    }

    let mut unmatched: Vec<&Value> = actual.iter().collect();
    for item in expected {
        match unmatched.iter().position(|candidate| *candidate == item) {
            Some(idx) => {
                unmatched.swap_remove(idx);
            }
            None => return false,
        }
    }
    unmatched.is_empty()
}
