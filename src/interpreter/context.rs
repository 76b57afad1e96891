use std::collections::HashMap;

use crate::value::Value;

/// The run-time variable store: a flat identifier-to-value map. Each
/// interpreter frame owns exactly one; it is the only mutable state in the
/// engine.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Context {
    values: HashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name`, overwriting any previous binding.
    pub fn bind(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Absorbs a finished sub-program's bindings. The callee wins on key
    /// collision.
    pub fn merge(&mut self, other: Context) {
        self.values.extend(other.values);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Value)> for Context {
    fn from_iter<T: IntoIterator<Item = (S, Value)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn bind_overwrites() {
        let mut context = Context::new();
        context.bind("x", Value::Integer(0));
        context.bind("x", Value::Integer(1));
        assert_eq!(context.get("x"), Some(&Value::Integer(1)));
    }

    #[test]
    fn merge_prefers_the_callee() {
        let mut caller: Context = [("x", Value::Integer(0)), ("y", Value::Integer(2))]
            .into_iter()
            .collect();
        let callee: Context = [("x", Value::Integer(1)), ("z", Value::Boolean(true))]
            .into_iter()
            .collect();
        caller.merge(callee);
        assert_eq!(caller.get("x"), Some(&Value::Integer(1)));
        assert_eq!(caller.get("y"), Some(&Value::Integer(2)));
        assert_eq!(caller.get("z"), Some(&Value::Boolean(true)));
    }
}
