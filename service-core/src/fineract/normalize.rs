//! Normalisation of Fineract's list response shapes.
//!
//! Depending on the endpoint a list comes back as a bare array, a paginated
//! `{ totalFilteredRecords, pageItems }` wrapper, a Spring-style
//! `{ totalElements, content }` page, a single-key wrapper such as
//! `{ cashiers: [...] }`, or an object keyed by id.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::error::FineractError;

/// Wrapper keys that hold the list itself.
const LIST_KEYS: &[&str] = &["pageItems", "content", "cashiers", "definitions", "data", "ranges"];

/// Wrapper keys that hold the unfiltered total.
const TOTAL_KEYS: &[&str] = &["totalFilteredRecords", "totalElements", "total"];

/// One page of a list together with the server-side total.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub total: u64,
    pub items: Vec<T>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            total: 0,
            items: Vec::new(),
        }
    }
}

impl<T> Page<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Decode any supported list shape into its items.
pub fn into_items<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, FineractError> {
    into_page(value).map(|page| page.items)
}

/// Decode any supported list shape, keeping the reported total.
pub fn into_page<T: DeserializeOwned>(value: Value) -> Result<Page<T>, FineractError> {
    let (total, raw) = split_list(value)?;
    let items = raw
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<T>, _>>()?;
    let total = total.unwrap_or(items.len() as u64);
    Ok(Page { total, items })
}

fn split_list(value: Value) -> Result<(Option<u64>, Vec<Value>), FineractError> {
    match value {
        Value::Null => Ok((Some(0), Vec::new())),
        Value::Array(items) => Ok((None, items)),
        Value::Object(mut map) => {
            let total = TOTAL_KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_u64));

            if let Some(key) = LIST_KEYS.iter().find(|key| map.get(**key).is_some_and(Value::is_array)) {
                if let Some(Value::Array(items)) = map.remove(*key) {
                    return Ok((total, items));
                }
            }

            if !map.is_empty() && map.values().all(Value::is_object) {
                // Keyed by id; serde_json keeps keys sorted without preserve_order.
                return Ok((None, map.into_iter().map(|(_, v)| v).collect()));
            }

            Err(FineractError::Decode(format!(
                "expected a list, got an object with keys [{}]",
                map.keys().cloned().collect::<Vec<_>>().join(", ")
            )))
        }
        other => Err(FineractError::Decode(format!(
            "expected a list, got {}",
            type_name(&other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: i64,
    }

    #[test]
    fn bare_array() {
        let page: Page<Item> = into_page(json!([{"id": 1}, {"id": 2}])).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items, vec![Item { id: 1 }, Item { id: 2 }]);
    }

    #[test]
    fn paginated_wrapper_keeps_total() {
        let value = json!({"totalFilteredRecords": 57, "pageItems": [{"id": 3}]});
        let page: Page<Item> = into_page(value).unwrap();
        assert_eq!(page.total, 57);
        assert_eq!(page.items, vec![Item { id: 3 }]);
    }

    #[test]
    fn spring_page() {
        let value = json!({"totalElements": 4, "content": [{"id": 9}], "empty": false});
        let page: Page<Item> = into_page(value).unwrap();
        assert_eq!(page.total, 4);
        assert_eq!(page.items.len(), 1);
    }

    #[test]
    fn named_wrapper() {
        let value = json!({"tellerId": 1, "tellerName": "T1", "cashiers": [{"id": 5}]});
        let items: Vec<Item> = into_items(value).unwrap();
        assert_eq!(items, vec![Item { id: 5 }]);
    }

    #[test]
    fn keyed_map() {
        let value = json!({"2": {"id": 2}, "1": {"id": 1}});
        let items: Vec<Item> = into_items(value).unwrap();
        assert_eq!(items, vec![Item { id: 1 }, Item { id: 2 }]);
    }

    #[test]
    fn null_is_empty() {
        let page: Page<Item> = into_page(Value::Null).unwrap();
        assert!(page.is_empty());
        assert_eq!(page.total, 0);
    }

    #[test]
    fn scalar_is_rejected() {
        let err = into_items::<Item>(json!("nope")).unwrap_err();
        assert!(matches!(err, FineractError::Decode(_)));
    }

    #[test]
    fn object_without_list_is_rejected() {
        let err = into_items::<Item>(json!({"id": 1, "name": "x"})).unwrap_err();
        assert!(matches!(err, FineractError::Decode(_)));
    }
}
