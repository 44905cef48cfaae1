use sea_orm::entity::prelude::*;

use super::enums::{Category, SubCategory};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub nom: String,
    pub description: String,
    pub prix: Decimal,
    pub prix_promo: Option<Decimal>,
    pub categorie: Category,
    pub sous_categorie: SubCategory,
    pub tailles: Vec<String>,
    pub couleurs: Vec<String>,
    pub stock: i32,
    pub images: Vec<String>,
    pub marque: Option<String>,
    pub en_vedette: bool,
    #[sea_orm(column_type = "Double")]
    pub note: f64,
    pub nombre_avis: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
