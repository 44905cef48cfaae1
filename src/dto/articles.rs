use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Article;

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePayload {
    pub nom: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub prix: Option<Decimal>,
    pub image: Option<String>,
    pub categorie: Option<String>,
    pub taille: Option<String>,
    pub couleur: Option<String>,
    pub stock: Option<i32>,
    pub en_vedette: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ArticleList {
    #[schema(value_type = Vec<Article>)]
    pub items: Vec<Article>,
}
