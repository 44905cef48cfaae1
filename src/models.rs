use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::enums::{
    ArticleCategory, Category, OrderStatus, PaymentMethod, Role, Size, SubCategory,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub rue: Option<String>,
    pub ville: Option<String>,
    pub code_postal: Option<String>,
    pub pays: Option<String>,
}

/// A user as exposed over the API; the password hash never leaves the service.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub nom: String,
    pub prenom: String,
    pub email: String,
    pub telephone: Option<String>,
    pub adresse: Address,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub nom: String,
    pub description: String,
    pub prix: Decimal,
    pub prix_promo: Option<Decimal>,
    pub categorie: Category,
    pub sous_categorie: SubCategory,
    pub tailles: Vec<Size>,
    pub couleurs: Vec<String>,
    pub stock: i32,
    pub images: Vec<String>,
    pub marque: Option<String>,
    pub en_vedette: bool,
    pub note: f64,
    pub nombre_avis: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product fields populated into order line items.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductRef {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub nom: String,
    pub images: Vec<String>,
}

/// Owner fields populated into orders for the detail and admin views.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserRef {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub nom: String,
    pub prenom: String,
    pub email: String,
    pub telephone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub name: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub postal_code: Option<String>,
    pub additional_info: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: Uuid,
    /// `None` once the product has been deleted from the catalog.
    pub product: Option<ProductRef>,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusEntry {
    pub status: OrderStatus,
    pub date: DateTime<Utc>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub user: Option<UserRef>,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total_amount: Decimal,
    pub notes: Option<String>,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub status_history: Vec<StatusEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub nom: String,
    pub description: String,
    pub prix: Decimal,
    pub image: String,
    pub categorie: ArticleCategory,
    pub taille: Option<String>,
    pub couleur: Option<String>,
    pub stock: i32,
    pub en_vedette: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
