//! String-backed enums shared by the entities and the JSON surface.
//!
//! The string values are the stored tokens and must never change.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Parse a stored or user-supplied token, `None` when unknown.
pub fn parse_token<E>(raw: &str) -> Option<E>
where
    E: ActiveEnum<Value = String>,
{
    E::try_from_value(&raw.trim().to_string()).ok()
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum OrderStatus {
    #[sea_orm(string_value = "en_attente")]
    #[serde(rename = "en_attente")]
    Pending,
    #[sea_orm(string_value = "confirmee")]
    #[serde(rename = "confirmee")]
    Confirmed,
    #[sea_orm(string_value = "en_preparation")]
    #[serde(rename = "en_preparation")]
    Preparing,
    #[sea_orm(string_value = "expediee")]
    #[serde(rename = "expediee")]
    Shipped,
    #[sea_orm(string_value = "livree")]
    #[serde(rename = "livree")]
    Delivered,
    #[sea_orm(string_value = "annulee")]
    #[serde(rename = "annulee")]
    Cancelled,
}

impl OrderStatus {
    /// Once an order has left the warehouse it can no longer be cancelled.
    pub fn is_cancellable(self) -> bool {
        !matches!(self, OrderStatus::Shipped | OrderStatus::Delivered)
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "cash_on_delivery")]
    CashOnDelivery,
    #[sea_orm(string_value = "card")]
    Card,
    #[sea_orm(string_value = "bank_transfer")]
    BankTransfer,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[sea_orm(string_value = "client")]
    Client,
    #[sea_orm(string_value = "admin")]
    Admin,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[sea_orm(string_value = "homme")]
    Homme,
    #[sea_orm(string_value = "femme")]
    Femme,
    #[sea_orm(string_value = "enfant")]
    Enfant,
    #[sea_orm(string_value = "accessoires")]
    Accessoires,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum SubCategory {
    #[sea_orm(string_value = "t-shirt")]
    #[serde(rename = "t-shirt")]
    TShirt,
    #[sea_orm(string_value = "pantalon")]
    #[serde(rename = "pantalon")]
    Pantalon,
    #[sea_orm(string_value = "robe")]
    #[serde(rename = "robe")]
    Robe,
    #[sea_orm(string_value = "jupe")]
    #[serde(rename = "jupe")]
    Jupe,
    #[sea_orm(string_value = "veste")]
    #[serde(rename = "veste")]
    Veste,
    #[sea_orm(string_value = "chaussures")]
    #[serde(rename = "chaussures")]
    Chaussures,
    #[sea_orm(string_value = "sac")]
    #[serde(rename = "sac")]
    Sac,
    #[sea_orm(string_value = "autre")]
    #[serde(rename = "autre")]
    Autre,
}

/// Garment, trouser, shoe and children sizes share one vocabulary.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum Size {
    #[sea_orm(string_value = "XS")]
    #[serde(rename = "XS")]
    Xs,
    #[sea_orm(string_value = "S")]
    #[serde(rename = "S")]
    S,
    #[sea_orm(string_value = "M")]
    #[serde(rename = "M")]
    M,
    #[sea_orm(string_value = "L")]
    #[serde(rename = "L")]
    L,
    #[sea_orm(string_value = "XL")]
    #[serde(rename = "XL")]
    Xl,
    #[sea_orm(string_value = "XXL")]
    #[serde(rename = "XXL")]
    Xxl,
    #[sea_orm(string_value = "30")]
    #[serde(rename = "30")]
    W30,
    #[sea_orm(string_value = "32")]
    #[serde(rename = "32")]
    W32,
    #[sea_orm(string_value = "34")]
    #[serde(rename = "34")]
    W34,
    #[sea_orm(string_value = "36")]
    #[serde(rename = "36")]
    W36,
    #[sea_orm(string_value = "37")]
    #[serde(rename = "37")]
    Eu37,
    #[sea_orm(string_value = "38")]
    #[serde(rename = "38")]
    W38,
    #[sea_orm(string_value = "39")]
    #[serde(rename = "39")]
    Eu39,
    #[sea_orm(string_value = "40")]
    #[serde(rename = "40")]
    Eu40,
    #[sea_orm(string_value = "41")]
    #[serde(rename = "41")]
    Eu41,
    #[sea_orm(string_value = "42")]
    #[serde(rename = "42")]
    Eu42,
    #[sea_orm(string_value = "43")]
    #[serde(rename = "43")]
    Eu43,
    #[sea_orm(string_value = "44")]
    #[serde(rename = "44")]
    Eu44,
    #[sea_orm(string_value = "4ans")]
    #[serde(rename = "4ans")]
    Age4,
    #[sea_orm(string_value = "6ans")]
    #[serde(rename = "6ans")]
    Age6,
    #[sea_orm(string_value = "8ans")]
    #[serde(rename = "8ans")]
    Age8,
    #[sea_orm(string_value = "10ans")]
    #[serde(rename = "10ans")]
    Age10,
    #[sea_orm(string_value = "12ans")]
    #[serde(rename = "12ans")]
    Age12,
    #[sea_orm(string_value = "Unique")]
    #[serde(rename = "Unique")]
    Unique,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum ArticleCategory {
    #[sea_orm(string_value = "Homme")]
    Homme,
    #[sea_orm(string_value = "Femme")]
    Femme,
    #[sea_orm(string_value = "Enfant")]
    Enfant,
    #[sea_orm(string_value = "Accessoires")]
    Accessoires,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_tokens_round_trip_through_serde_and_storage() {
        for (status, token) in [
            (OrderStatus::Pending, "en_attente"),
            (OrderStatus::Confirmed, "confirmee"),
            (OrderStatus::Preparing, "en_preparation"),
            (OrderStatus::Shipped, "expediee"),
            (OrderStatus::Delivered, "livree"),
            (OrderStatus::Cancelled, "annulee"),
        ] {
            assert_eq!(status.to_value(), token);
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                serde_json::json!(token)
            );
            assert_eq!(parse_token::<OrderStatus>(token), Some(status));
        }
    }

    #[test]
    fn unknown_tokens_do_not_parse() {
        assert_eq!(parse_token::<OrderStatus>("shipped"), None);
        assert_eq!(parse_token::<Category>("Homme"), None);
        assert_eq!(parse_token::<ArticleCategory>("Homme"), Some(ArticleCategory::Homme));
    }

    #[test]
    fn only_shipped_and_delivered_block_cancellation() {
        assert!(OrderStatus::Pending.is_cancellable());
        assert!(OrderStatus::Confirmed.is_cancellable());
        assert!(OrderStatus::Preparing.is_cancellable());
        assert!(OrderStatus::Cancelled.is_cancellable());
        assert!(!OrderStatus::Shipped.is_cancellable());
        assert!(!OrderStatus::Delivered.is_cancellable());
    }

    #[test]
    fn catalog_tokens_match_stored_values() {
        assert_eq!(SubCategory::TShirt.to_value(), "t-shirt");
        assert_eq!(Size::Age10.to_value(), "10ans");
        assert_eq!(
            serde_json::to_value(Size::Unique).unwrap(),
            serde_json::json!("Unique")
        );
        assert_eq!(
            serde_json::to_value(PaymentMethod::CashOnDelivery).unwrap(),
            serde_json::json!("cash_on_delivery")
        );
        assert_eq!(Role::Admin.to_value(), "admin");
    }
}
