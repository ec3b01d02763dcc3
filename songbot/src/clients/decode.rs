use serde::{Deserialize, Deserializer};

/// Decode `null` (or a missing field, with `#[serde(default)]`) as `T::default()`.
/// Providers send `null` in places where a list or object is documented.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
