use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps traveller or cardholder data so it never shows up verbatim in `Debug`/`Display` output.
///
/// Serialization is transparent: API responses and database payloads carry the real value,
/// only formatting through `{:?}` / `{}` (i.e. every `tracing` macro) is masked.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<T> for Masked<T> {
    fn from(value: T) -> Self {
        Masked(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_output_is_masked() {
        let passport = Masked("X1234567".to_string());
        assert_eq!(format!("{:?}", passport), "********");
        assert_eq!(format!("{}", passport), "********");
    }

    #[test]
    fn test_serialization_is_transparent() {
        let passport: Option<Masked<String>> = Some(Masked("X1234567".to_string()));
        let json = serde_json::to_string(&passport).unwrap();
        assert_eq!(json, "\"X1234567\"");

        let back: Masked<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.expose(), "X1234567");
    }
}
