/// Data models for recommendation-service
///
/// Recipes and ratings are keyed by the external ingredient-search API's
/// integer ids, not by locally generated ids.
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub title: String,
    /// Accepted either as a JSON list of names or as a string that itself
    /// encodes such a list (the persisted form). Undecodable input becomes
    /// an empty list for this record only.
    #[serde(default, deserialize_with = "lenient_ingredients")]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: String,
    #[serde(default = "empty_object")]
    pub nutrition: Value,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: i64,
    pub recipe_id: i64,
    pub rating: f32,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Decode an ingredients field that may be a list of strings or a
/// JSON-encoded string of such a list.
pub fn decode_ingredients(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_owned))
            .collect(),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_owned))
                .collect(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn lenient_ingredients<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(decode_ingredients(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_ingredients_list() {
        let value = json!(["chicken", "water"]);
        assert_eq!(decode_ingredients(&value), vec!["chicken", "water"]);
    }

    #[test]
    fn test_decode_ingredients_encoded_string() {
        let value = json!("[\"tomato\", \"basil\"]");
        assert_eq!(decode_ingredients(&value), vec!["tomato", "basil"]);
    }

    #[test]
    fn test_decode_ingredients_garbage_is_empty() {
        assert!(decode_ingredients(&json!("not json at all")).is_empty());
        assert!(decode_ingredients(&json!(42)).is_empty());
        assert!(decode_ingredients(&json!({"name": "chicken"})).is_empty());
    }

    #[test]
    fn test_recipe_accepts_both_ingredient_shapes() {
        let parsed: Recipe = serde_json::from_value(json!({
            "id": 1,
            "title": "Chicken Soup",
            "ingredients": ["chicken", "water"]
        }))
        .unwrap();
        assert_eq!(parsed.ingredients, vec!["chicken", "water"]);

        let persisted: Recipe = serde_json::from_value(json!({
            "id": 1,
            "title": "Chicken Soup",
            "ingredients": "[\"chicken\",\"water\"]"
        }))
        .unwrap();
        assert_eq!(persisted.ingredients, vec!["chicken", "water"]);
    }

    #[test]
    fn test_recipe_malformed_ingredients_kept_with_empty_list() {
        let recipe: Recipe = serde_json::from_value(json!({
            "id": 7,
            "title": "Mystery Stew",
            "ingredients": "{{{"
        }))
        .unwrap();
        assert!(recipe.ingredients.is_empty());
        assert_eq!(recipe.title, "Mystery Stew");
    }
}
