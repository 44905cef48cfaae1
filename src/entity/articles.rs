use sea_orm::entity::prelude::*;

use super::enums::ArticleCategory;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "articles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
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
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
