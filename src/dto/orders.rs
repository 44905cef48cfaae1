use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity::enums::OrderStatus,
    error::{AppError, AppResult},
    models::{Order, ShippingAddress},
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderItemRequest {
    pub product: Uuid,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// Every field is optional on the wire so a partial address reaches
/// validation instead of failing JSON extraction.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddressInput {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub additional_info: Option<String>,
}

impl ShippingAddressInput {
    /// Name, phone, street and city are mandatory; blank strings count as missing.
    pub fn into_complete(self) -> AppResult<ShippingAddress> {
        fn required(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        let incomplete = || AppError::BadRequest("Incomplete shipping address".into());
        Ok(ShippingAddress {
            name: required(self.name).ok_or_else(incomplete)?,
            phone: required(self.phone).ok_or_else(incomplete)?,
            street: required(self.street).ok_or_else(incomplete)?,
            city: required(self.city).ok_or_else(incomplete)?,
            postal_code: required(self.postal_code),
            additional_info: required(self.additional_info),
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub items: Vec<OrderItemRequest>,
    pub shipping_address: Option<ShippingAddressInput>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
    pub comment: Option<String>,
}

impl UpdateOrderStatusRequest {
    pub fn parsed_status(&self) -> AppResult<OrderStatus> {
        crate::entity::enums::parse_token(&self.status)
            .ok_or_else(|| AppError::BadRequest("Invalid status".into()))
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct OrderList {
    #[schema(value_type = Vec<Order>)]
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CancelOrderResponse {
    pub message: String,
    pub order: Order,
}
