pub mod assessments;
pub mod flashcards;
pub mod plans;
pub mod profiles;
pub mod tasks;
pub mod tracking;
pub mod users;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Decodes a JSON text column, falling back to the default on corrupt data.
pub(crate) fn parse_json_column<T>(raw: Option<String>, column: &'static str) -> T
where
    T: DeserializeOwned + Default,
{
    let Some(raw) = raw else { return T::default() };
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(column, error = %err, "invalid JSON column, using default");
            T::default()
        }
    }
}

pub(crate) fn to_json_column<T: Serialize>(value: &T) -> Result<String, sqlx::Error> {
    serde_json::to_string(value).map_err(|e| sqlx::Error::Protocol(format!("failed to encode JSON column: {e}")))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_json_column_round_trip() {
        let encoded = to_json_column(&vec!["quiz", "write"]).unwrap();
        assert_eq!(encoded, r#"["quiz","write"]"#);
        let decoded: Vec<String> = parse_json_column(Some(encoded), "test.modes");
        assert_eq!(decoded, vec!["quiz".to_string(), "write".to_string()]);
    }

    #[test]
    fn test_unencodable_value_is_a_sql_error() {
        // JSON object keys must be strings
        let mut map = BTreeMap::new();
        map.insert(vec![1u8], 1);
        let err = to_json_column(&map).unwrap_err();
        assert!(matches!(err, sqlx::Error::Protocol(_)));
    }

    #[test]
    fn test_corrupt_column_falls_back_to_default() {
        let decoded: Vec<String> = parse_json_column(Some("{not json".to_string()), "test.modes");
        assert!(decoded.is_empty());
        let missing: Vec<String> = parse_json_column(None, "test.modes");
        assert!(missing.is_empty());
    }
}
