#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use storefront_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    dto::orders::{CreateOrderRequest, OrderItemRequest, ShippingAddressInput},
    entity::{
        enums::{Category, Role, SubCategory},
        products::ActiveModel as ProductActive,
        users::ActiveModel as UserActive,
    },
    middleware::auth::AuthUser,
    state::AppState,
};
use tokio::sync::OnceCell;
use uuid::Uuid;

static MIGRATED: OnceCell<()> = OnceCell::const_new();

/// `None` when no database is configured; callers skip.
pub fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests.");
            None
        }
    }
}

pub async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let orm = create_orm_conn(database_url).await?;
    MIGRATED
        .get_or_try_init(|| async { run_migrations(&orm).await })
        .await?;
    let pool = create_pool(database_url).await?;

    Ok(AppState {
        pool,
        orm,
        config: Arc::new(AppConfig {
            database_url: database_url.to_string(),
            host: "127.0.0.1".into(),
            port: 0,
            jwt_secret: "integration-secret".into(),
            jwt_ttl_hours: 1,
        }),
    })
}

/// Users get a unique email so tests can share one database.
pub async fn create_user(state: &AppState, role: Role) -> anyhow::Result<AuthUser> {
    let now = Utc::now();
    let id = Uuid::new_v4();
    UserActive {
        id: Set(id),
        nom: Set("Test".into()),
        prenom: Set("Client".into()),
        email: Set(format!("{id}@test.local")),
        password_hash: Set("not-a-real-hash".into()),
        telephone: Set(Some("21698765432".into())),
        rue: Set(None),
        ville: Set(None),
        code_postal: Set(None),
        pays: Set("Tunisie".into()),
        role: Set(role),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(AuthUser { user_id: id, role })
}

pub async fn create_product(
    state: &AppState,
    nom: &str,
    prix: Decimal,
    prix_promo: Option<Decimal>,
    stock: i32,
) -> anyhow::Result<Uuid> {
    let now = Utc::now();
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        nom: Set(nom.to_string()),
        description: Set("Produit de test".into()),
        prix: Set(prix),
        prix_promo: Set(prix_promo),
        categorie: Set(Category::Homme),
        sous_categorie: Set(SubCategory::TShirt),
        tailles: Set(vec!["M".into(), "L".into()]),
        couleurs: Set(vec!["Noir".into()]),
        stock: Set(stock),
        images: Set(vec!["/uploads/test.jpg".into()]),
        marque: Set(None),
        en_vedette: Set(false),
        note: Set(0.0),
        nombre_avis: Set(0),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(product.id)
}

pub fn address() -> ShippingAddressInput {
    ShippingAddressInput {
        name: Some("Amira Ben Salah".into()),
        phone: Some("21620000000".into()),
        street: Some("12 rue de Marseille".into()),
        city: Some("Tunis".into()),
        postal_code: Some("1000".into()),
        additional_info: None,
    }
}

pub fn order_of(lines: &[(Uuid, i32)]) -> CreateOrderRequest {
    CreateOrderRequest {
        items: lines
            .iter()
            .map(|(product, quantity)| OrderItemRequest {
                product: *product,
                quantity: *quantity,
                size: Some("M".into()),
                color: Some("Noir".into()),
            })
            .collect(),
        shipping_address: Some(address()),
        notes: None,
    }
}

pub async fn stock_of(state: &AppState, product_id: Uuid) -> anyhow::Result<i32> {
    use sea_orm::EntityTrait;
    use storefront_api::entity::Products;

    let product = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product {product_id} vanished"))?;
    Ok(product.stock)
}
