use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    dto::products::{ProductList, ProductPayload, RateProductRequest, parse_decimal_input},
    entity::{
        enums::{Category, Size, SubCategory, parse_token},
        products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::ProductQuery,
    state::AppState,
};

const FEATURED_LIMIT: u64 = 8;

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let mut condition = Condition::all();

    if let Some(raw) = non_blank(query.categorie.as_deref()) {
        // An unknown category cannot match anything.
        match parse_token::<Category>(raw) {
            Some(categorie) => condition = condition.add(Column::Categorie.eq(categorie)),
            None => return Ok(empty_listing()),
        }
    }

    if let Some(raw) = non_blank(query.sous_categorie.as_deref()) {
        match parse_token::<SubCategory>(raw) {
            Some(sous_categorie) => {
                condition = condition.add(Column::SousCategorie.eq(sous_categorie))
            }
            None => return Ok(empty_listing()),
        }
    }

    if let Some(search) = non_blank(query.search.as_deref()) {
        let pattern = format!("%{}%", escape_like(search));
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Nom).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    if let Some(min) = query.min_prix.as_deref().and_then(parse_decimal_input) {
        condition = condition.add(Column::Prix.gte(min));
    }

    if let Some(max) = query.max_prix.as_deref().and_then(parse_decimal_input) {
        condition = condition.add(Column::Prix.lte(max));
    }

    let items: Vec<Product> = Products::find()
        .filter(condition)
        .order_by_desc(Column::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let meta = Meta::counted(items.len() as i64);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn list_featured(state: &AppState) -> AppResult<ApiResponse<ProductList>> {
    let items: Vec<Product> = Products::find()
        .filter(Column::EnVedette.eq(true))
        .order_by_desc(Column::CreatedAt)
        .limit(FEATURED_LIMIT)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let meta = Meta::counted(items.len() as i64);
    Ok(ApiResponse::success("Featured products", ProductList { items }, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let result = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(product_from_entity);
    let result = match result {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Product", result, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: ProductPayload,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;

    let nom = required_text(payload.nom, "Product name is required")?;
    let description = required_text(payload.description, "Description is required")?;
    let prix = payload
        .prix
        .ok_or_else(|| AppError::BadRequest("Price is required".into()))?;
    let categorie = payload
        .categorie
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Category is required".into()))
        .and_then(parse_category)?;
    let sous_categorie = payload
        .sous_categorie
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Sub-category is required".into()))
        .and_then(parse_sub_category)?;
    let tailles = parse_sizes(payload.tailles.unwrap_or_default())?;
    let stock = payload.stock.unwrap_or(0);
    check_amounts(Some(prix), payload.prix_promo.flatten(), Some(stock))?;

    let now = Utc::now();
    let product = ActiveModel {
        id: Set(Uuid::new_v4()),
        nom: Set(nom),
        description: Set(description),
        prix: Set(prix),
        prix_promo: Set(payload.prix_promo.flatten()),
        categorie: Set(categorie),
        sous_categorie: Set(sous_categorie),
        tailles: Set(tailles),
        couleurs: Set(payload.couleurs.unwrap_or_default()),
        stock: Set(stock),
        images: Set(payload.images.unwrap_or_default()),
        marque: Set(payload.marque.map(|m| m.trim().to_string()).filter(|m| !m.is_empty())),
        en_vedette: Set(payload.en_vedette.unwrap_or(false)),
        note: Set(0.0),
        nombre_avis: Set(0),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(product_id = %product.id, nom = %product.nom, "product created");
    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::ProductCreate,
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: ProductPayload,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    check_amounts(payload.prix, payload.prix_promo.flatten(), payload.stock)?;

    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let mut active: ActiveModel = existing.into();
    if let Some(nom) = non_blank(payload.nom.as_deref()) {
        active.nom = Set(nom.to_string());
    }
    if let Some(description) = non_blank(payload.description.as_deref()) {
        active.description = Set(description.to_string());
    }
    if let Some(prix) = payload.prix {
        active.prix = Set(prix);
    }
    if let Some(prix_promo) = payload.prix_promo {
        active.prix_promo = Set(prix_promo);
    }
    if let Some(raw) = payload.categorie.as_deref() {
        active.categorie = Set(parse_category(raw)?);
    }
    if let Some(raw) = payload.sous_categorie.as_deref() {
        active.sous_categorie = Set(parse_sub_category(raw)?);
    }
    if let Some(tailles) = payload.tailles {
        active.tailles = Set(parse_sizes(tailles)?);
    }
    if let Some(couleurs) = payload.couleurs {
        active.couleurs = Set(couleurs);
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    if let Some(images) = payload.images {
        active.images = Set(images);
    }
    if let Some(marque) = payload.marque {
        active.marque = Set(Some(marque.trim().to_string()).filter(|m| !m.is_empty()));
    }
    if let Some(en_vedette) = payload.en_vedette {
        active.en_vedette = Set(en_vedette);
    }
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&state.orm).await?;

    tracing::info!(product_id = %product.id, stock = product.stock, "product updated");
    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::ProductUpdate,
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Products::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    tracing::info!(product_id = %id, "product deleted");
    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::ProductDelete,
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn rate_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: RateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let note = payload
        .note
        .as_f64()
        .filter(|n| (0.0..=5.0).contains(n))
        .ok_or_else(|| AppError::BadRequest("Rating must be a number between 0 and 5".into()))?;

    let txn = state.orm.begin().await?;

    let product = Products::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let (average, count) = apply_rating(product.note, product.nombre_avis, note);

    let mut active: ActiveModel = product.into();
    active.note = Set(average);
    active.nombre_avis = Set(count);
    active.updated_at = Set(Utc::now().into());
    let product = active.update(&txn).await?;

    txn.commit().await?;

    tracing::debug!(product_id = %product.id, user_id = %user.user_id, note, "product rated");

    Ok(ApiResponse::success(
        "Rating recorded",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

/// Fold one more rating into a running average.
pub fn apply_rating(current: f64, count: i32, rating: f64) -> (f64, i32) {
    let count = count.max(0);
    let new_count = count + 1;
    let average = (current * f64::from(count) + rating) / f64::from(new_count);
    (average.clamp(0.0, 5.0), new_count)
}

fn empty_listing() -> ApiResponse<ProductList> {
    ApiResponse::success(
        "Products",
        ProductList { items: Vec::new() },
        Some(Meta::counted(0)),
    )
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn required_text(value: Option<String>, message: &str) -> AppResult<String> {
    non_blank(value.as_deref())
        .map(str::to_string)
        .ok_or_else(|| AppError::BadRequest(message.into()))
}

/// `%` and `_` in a search term match themselves.
pub(crate) fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn parse_category(raw: &str) -> AppResult<Category> {
    parse_token(raw).ok_or_else(|| AppError::BadRequest(format!("Invalid category: {raw}")))
}

fn parse_sub_category(raw: &str) -> AppResult<SubCategory> {
    parse_token(raw).ok_or_else(|| AppError::BadRequest(format!("Invalid sub-category: {raw}")))
}

/// Sizes are stored as their tokens after checking them against [`Size`].
fn parse_sizes(raw: Vec<String>) -> AppResult<Vec<String>> {
    raw.into_iter()
        .map(|s| {
            parse_token::<Size>(&s)
                .map(|size| size.to_value())
                .ok_or_else(|| AppError::BadRequest(format!("Invalid size: {s}")))
        })
        .collect()
}

fn check_amounts(
    prix: Option<Decimal>,
    prix_promo: Option<Decimal>,
    stock: Option<i32>,
) -> AppResult<()> {
    if prix.is_some_and(|p| p.is_sign_negative()) {
        return Err(AppError::BadRequest("Price cannot be negative".into()));
    }
    if prix_promo.is_some_and(|p| p.is_sign_negative()) {
        return Err(AppError::BadRequest("Promo price cannot be negative".into()));
    }
    if stock.is_some_and(|s| s < 0) {
        return Err(AppError::BadRequest("Stock cannot be negative".into()));
    }
    Ok(())
}

fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        nom: model.nom,
        description: model.description,
        prix: model.prix,
        prix_promo: model.prix_promo,
        categorie: model.categorie,
        sous_categorie: model.sous_categorie,
        tailles: model
            .tailles
            .iter()
            .filter_map(|t| parse_token::<Size>(t))
            .collect(),
        couleurs: model.couleurs,
        stock: model.stock,
        images: model.images,
        marque: model.marque,
        en_vedette: model.en_vedette,
        note: model.note,
        nombre_avis: model.nombre_avis,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
