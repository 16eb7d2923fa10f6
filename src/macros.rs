/// Builds a [`Value`](crate::Value) from JSON-like literal syntax.
///
/// Objects keep the key order they are written in, which makes the macro a
/// convenient way to write records.
///
/// # Examples
///
/// ```rust
/// use eton::{eton, Value};
///
/// let record = eton!({
///     "id": 1,
///     "name": "Alice",
///     "tags": ["admin", "ops"],
///     "manager": null
/// });
///
/// let map = record.as_object().unwrap();
/// assert_eq!(map.keys().collect::<Vec<_>>(), vec!["id", "name", "tags", "manager"]);
/// assert_eq!(map.get("manager"), Some(&Value::Null));
/// ```
#[macro_export]
macro_rules! eton {
    (null) => {
        $crate::Value::Null
    };

    (true) => {
        $crate::Value::Bool(true)
    };

    (false) => {
        $crate::Value::Bool(false)
    };

    ([]) => {
        $crate::Value::Array(vec![])
    };

    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::Array(vec![$($crate::eton!($elem)),*])
    };

    ({}) => {
        $crate::Value::Object($crate::Map::new())
    };

    ({ $($key:literal : $value:tt),* $(,)? }) => {{
        let mut object = $crate::Map::new();
        $(
            object.insert($key.to_string(), $crate::eton!($value));
        )*
        $crate::Value::Object(object)
    }};

    // Any other expression goes through serde.
    ($s:expr) => {{
        $crate::to_value(&$s).unwrap_or($crate::Value::Null)
    }};
}
