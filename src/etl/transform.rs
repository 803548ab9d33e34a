//! Record transformation between fetch and insert

use eyre::Result;
use serde_json::{Map, Value};

/// Transformer trait for turning staged records into warehouse rows
///
/// Transformers are pure: they never touch storage, so the loader can run
/// them between the fetch and the insert without affecting retry behaviour.
///
/// # Example
/// ```no_run
/// use etl_node::etl::Transformer;
/// use etl_node::model::Record;
/// use eyre::Result;
///
/// /// Keep only the value of each record
/// struct ValueOnly;
///
/// impl Transformer for ValueOnly {
///     type Input = Record;
///     type Output = serde_json::Value;
///
///     fn transform(&self, input: Record) -> Result<serde_json::Value> {
///         Ok(serde_json::json!({ "value": input.value }))
///     }
/// }
/// ```
pub trait Transformer: Send + Sync {
    /// Input item type
    type Input: Send;

    /// Output item type after transformation
    type Output: Send;

    /// Transform a single item
    ///
    /// # Errors
    /// Returns an error if the item cannot be converted
    fn transform(&self, input: Self::Input) -> Result<Self::Output>;

    /// Transform a whole batch, stopping at the first failure
    fn transform_many(&self, inputs: Vec<Self::Input>) -> Result<Vec<Self::Output>> {
        inputs.into_iter().map(|i| self.transform(i)).collect()
    }
}

/// Fields every staged record must carry
pub const REQUIRED_FIELDS: &[&str] = &["id", "value", "timestamp"];

/// Turns a staged record into the JSON document stored in the raw table
///
/// The record is kept whole: extra fields and the timestamp's original format
/// end up in the raw row unchanged. Only the presence of [`REQUIRED_FIELDS`]
/// is checked.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordValidator;

impl Transformer for RecordValidator {
    type Input = Map<String, Value>;
    type Output = Value;

    fn transform(&self, input: Self::Input) -> Result<Self::Output> {
        if let Some(missing) = REQUIRED_FIELDS.iter().find(|f| !input.contains_key(**f)) {
            eyre::bail!("record is missing required field `{}`", missing);
        }
        Ok(Value::Object(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {}", other),
        }
    }

    #[test]
    fn test_record_kept_whole() {
        let input = r#"{"id":1,"value":10,"timestamp":"2024-01-01T12:34:56.789012","region":"tokyo"}"#;
        let map: Map<String, Value> = serde_json::from_str(input).unwrap();

        let row = RecordValidator.transform(map).unwrap();
        assert_eq!(serde_json::to_string(&row).unwrap(), input);
    }

    #[test]
    fn test_missing_field_rejected() {
        let err = RecordValidator
            .transform(record(json!({"id": 1, "timestamp": "2024-01-01T00:00:00Z"})))
            .unwrap_err();
        assert!(err.to_string().contains("`value`"));
    }

    #[test]
    fn test_transform_many_stops_at_first_failure() {
        let rows = RecordValidator.transform_many(vec![
            record(json!({"id": 1, "value": 10, "timestamp": "t"})),
            record(json!({"id": 2})),
        ]);
        assert!(rows.is_err());
        assert!(RecordValidator.transform_many(Vec::new()).unwrap().is_empty());
    }
}
