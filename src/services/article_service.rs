use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    dto::articles::{ArticleList, ArticlePayload},
    entity::{
        articles::{ActiveModel, Column, Entity as Articles, Model as ArticleModel},
        enums::{ArticleCategory, parse_token},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Article,
    response::{ApiResponse, Meta},
    routes::params::ArticleQuery,
    services::product_service::escape_like,
    state::AppState,
};

const ARTICLE_SIZES: [&str; 6] = ["XS", "S", "M", "L", "XL", "XXL"];

pub async fn list_articles(
    state: &AppState,
    query: ArticleQuery,
) -> AppResult<ApiResponse<ArticleList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(raw) = query.categorie.as_deref().filter(|s| !s.is_empty()) {
        let categorie = parse_category(raw)?;
        condition = condition.add(Column::Categorie.eq(categorie));
    }

    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        condition = condition.add(Expr::col(Column::Nom).ilike(format!("%{}%", escape_like(search))));
    }

    let finder = Articles::find()
        .filter(condition)
        .order_by_desc(Column::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(article_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Articles", ArticleList { items }, Some(meta)))
}

pub async fn get_article(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Article>> {
    let article = Articles::find_by_id(id).one(&state.orm).await?;
    match article {
        Some(a) => Ok(ApiResponse::success("Article", article_from_entity(a), None)),
        None => Err(AppError::NotFound),
    }
}

pub async fn create_article(
    state: &AppState,
    user: &AuthUser,
    payload: ArticlePayload,
) -> AppResult<ApiResponse<Article>> {
    ensure_admin(user)?;

    let image = filled(payload.image)
        .ok_or_else(|| AppError::BadRequest("Image is required".into()))?;
    let nom = filled(payload.nom).ok_or_else(|| AppError::BadRequest("Name is required".into()))?;
    let description = filled(payload.description)
        .ok_or_else(|| AppError::BadRequest("Description is required".into()))?;
    let prix = payload
        .prix
        .ok_or_else(|| AppError::BadRequest("Price is required".into()))?;
    let categorie = payload
        .categorie
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Category is required".into()))
        .and_then(parse_category)?;
    let taille = parse_size(payload.taille)?;
    let stock = payload.stock.unwrap_or(0);
    if prix.is_sign_negative() || stock < 0 {
        return Err(AppError::BadRequest("Price and stock must be positive".into()));
    }

    let now = Utc::now();
    let article = ActiveModel {
        id: Set(Uuid::new_v4()),
        nom: Set(nom),
        description: Set(description),
        prix: Set(prix),
        image: Set(image),
        categorie: Set(categorie),
        taille: Set(taille),
        couleur: Set(filled(payload.couleur)),
        stock: Set(stock),
        en_vedette: Set(payload.en_vedette.unwrap_or(false)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::ArticleCreate,
        serde_json::json!({ "article_id": article.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Article created",
        article_from_entity(article),
        Some(Meta::empty()),
    ))
}

pub async fn update_article(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: ArticlePayload,
) -> AppResult<ApiResponse<Article>> {
    ensure_admin(user)?;

    let existing = Articles::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(a) => a,
        None => return Err(AppError::NotFound),
    };

    let mut active: ActiveModel = existing.into();
    if let Some(nom) = filled(payload.nom) {
        active.nom = Set(nom);
    }
    if let Some(description) = filled(payload.description) {
        active.description = Set(description);
    }
    if let Some(prix) = payload.prix {
        if prix.is_sign_negative() {
            return Err(AppError::BadRequest("Price must be positive".into()));
        }
        active.prix = Set(prix);
    }
    if let Some(image) = filled(payload.image) {
        active.image = Set(image);
    }
    if let Some(raw) = payload.categorie.as_deref().filter(|s| !s.is_empty()) {
        active.categorie = Set(parse_category(raw)?);
    }
    if payload.taille.is_some() {
        active.taille = Set(parse_size(payload.taille)?);
    }
    if let Some(couleur) = filled(payload.couleur) {
        active.couleur = Set(Some(couleur));
    }
    if let Some(stock) = payload.stock {
        if stock < 0 {
            return Err(AppError::BadRequest("Stock cannot be negative".into()));
        }
        active.stock = Set(stock);
    }
    if let Some(en_vedette) = payload.en_vedette {
        active.en_vedette = Set(en_vedette);
    }
    active.updated_at = Set(Utc::now().into());

    let article = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::ArticleUpdate,
        serde_json::json!({ "article_id": article.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Article updated",
        article_from_entity(article),
        Some(Meta::empty()),
    ))
}

pub async fn delete_article(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Articles::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::ArticleDelete,
        serde_json::json!({ "article_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Article deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn filled(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_category(raw: &str) -> AppResult<ArticleCategory> {
    parse_token(raw).ok_or_else(|| AppError::BadRequest(format!("Invalid category: {raw}")))
}

/// An empty size is allowed and stored as no size.
fn parse_size(raw: Option<String>) -> AppResult<Option<String>> {
    match filled(raw) {
        None => Ok(None),
        Some(size) if ARTICLE_SIZES.contains(&size.as_str()) => Ok(Some(size)),
        Some(size) => Err(AppError::BadRequest(format!("Invalid size: {size}"))),
    }
}

fn article_from_entity(model: ArticleModel) -> Article {
    Article {
        id: model.id,
        nom: model.nom,
        description: model.description,
        prix: model.prix,
        image: model.image,
        categorie: model.categorie,
        taille: model.taille,
        couleur: model.couleur,
        stock: model.stock,
        en_vedette: model.en_vedette,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_sizes_allow_blank_but_not_shoe_sizes() {
        assert_eq!(parse_size(None).unwrap(), None);
        assert_eq!(parse_size(Some("".into())).unwrap(), None);
        assert_eq!(parse_size(Some("XL".into())).unwrap(), Some("XL".into()));
        assert!(parse_size(Some("42".into())).is_err());
    }

    #[test]
    fn article_categories_are_capitalized() {
        assert_eq!(parse_category("Enfant").unwrap(), ArticleCategory::Enfant);
        assert!(parse_category("enfant").is_err());
    }
}
