use std::str::FromStr;

use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::models::Product;

/// Admin input for creating or editing a product.
///
/// Numeric fields take JSON numbers or strings, and a comma works as the
/// decimal separator (`"49,99"`). Blank or unparsable values count as absent,
/// except for `prixPromo`, where `null` or `""` clears the promo price.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    pub nom: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "flexible_decimal")]
    #[schema(value_type = Option<f64>)]
    pub prix: Option<Decimal>,
    /// `None` leaves the promo untouched, `Some(None)` removes it.
    #[serde(default, deserialize_with = "clearable_decimal")]
    #[schema(value_type = Option<f64>, nullable)]
    pub prix_promo: Option<Option<Decimal>>,
    pub categorie: Option<String>,
    pub sous_categorie: Option<String>,
    pub tailles: Option<Vec<String>>,
    pub couleurs: Option<Vec<String>>,
    #[serde(default, deserialize_with = "flexible_integer")]
    #[schema(value_type = Option<i32>)]
    pub stock: Option<i32>,
    pub images: Option<Vec<String>>,
    pub marque: Option<String>,
    pub en_vedette: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RateProductRequest {
    /// Must be a JSON number between 0 and 5.
    #[serde(default)]
    #[schema(value_type = f64)]
    pub note: Value,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

/// Parse a user-entered amount, accepting `49,99` as well as `49.99`.
pub fn parse_decimal_input(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalized = trimmed.replacen(',', ".", 1);
    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .ok()
}

fn decimal_from_json(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal_input(&n.to_string()),
        Value::String(s) => parse_decimal_input(s),
        _ => None,
    }
}

fn flexible_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(decimal_from_json))
}

fn clearable_decimal<'de, D>(deserializer: D) -> Result<Option<Option<Decimal>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match &value {
        Value::Null => Some(None),
        Value::String(s) if s.trim().is_empty() => Some(None),
        other => decimal_from_json(other).map(Some),
    })
}

fn flexible_integer<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(decimal_from_json)
        .filter(|d| d.fract().is_zero())
        .and_then(|d| d.to_i32()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn comma_and_dot_decimals_parse_alike() {
        assert_eq!(parse_decimal_input("49,99"), Some(dec!(49.99)));
        assert_eq!(parse_decimal_input(" 49.99 "), Some(dec!(49.99)));
        assert_eq!(parse_decimal_input("12"), Some(dec!(12)));
        assert_eq!(parse_decimal_input(""), None);
        assert_eq!(parse_decimal_input("douze"), None);
    }

    #[test]
    fn payload_accepts_numbers_and_comma_strings() {
        let payload: ProductPayload = serde_json::from_value(serde_json::json!({
            "nom": "Jean Slim Homme",
            "prix": "79,99",
            "prixPromo": 59.99,
            "stock": "30",
        }))
        .unwrap();
        assert_eq!(payload.prix, Some(dec!(79.99)));
        assert_eq!(payload.prix_promo, Some(Some(dec!(59.99))));
        assert_eq!(payload.stock, Some(30));
    }

    #[test]
    fn blank_or_garbage_numbers_are_treated_as_absent() {
        let payload: ProductPayload = serde_json::from_value(serde_json::json!({
            "prix": "",
            "prixPromo": "gratuit",
            "stock": "2,5",
        }))
        .unwrap();
        assert_eq!(payload.prix, None);
        assert_eq!(payload.prix_promo, None);
        assert_eq!(payload.stock, None);

        let payload: ProductPayload = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(payload.prix, None);
        assert_eq!(payload.prix_promo, None);
    }

    #[test]
    fn null_or_blank_promo_means_clear() {
        for raw in [serde_json::Value::Null, serde_json::json!(""), serde_json::json!("  ")] {
            let payload: ProductPayload =
                serde_json::from_value(serde_json::json!({ "prixPromo": raw })).unwrap();
            assert_eq!(payload.prix_promo, Some(None));
        }
    }
}
