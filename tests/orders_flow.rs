mod common;

use common::{create_product, create_user, database_url, order_of, setup_state, stock_of};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ColumnTrait, EntityTrait, QueryFilter, QuerySelect, TransactionTrait, sea_query::LockType,
};
use std::time::Duration;
use storefront_api::{
    dto::orders::UpdateOrderStatusRequest,
    entity::{
        AuditLogs, Products, audit_logs,
        enums::{OrderStatus, Role},
    },
    error::AppError,
    middleware::auth::AuthUser,
    routes::params::OrderListQuery,
    services::{order_service, product_service},
    state::AppState,
};
use uuid::Uuid;

async fn set_status(
    state: &AppState,
    admin: &AuthUser,
    order_id: Uuid,
    status: &str,
) -> anyhow::Result<()> {
    order_service::update_order_status(
        state,
        admin,
        order_id,
        UpdateOrderStatusRequest {
            status: status.into(),
            comment: None,
        },
    )
    .await?;
    Ok(())
}

// Place an order at the promo price, then cancel it and get the stock back.
#[tokio::test]
async fn promo_priced_order_reserves_and_cancel_restores_stock() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url).await?;
    let client = create_user(&state, Role::Client).await?;
    let product = create_product(&state, "T-shirt Promo", dec!(20), Some(dec!(15)), 10).await?;

    let created = order_service::create_order(&state, &client, order_of(&[(product, 3)])).await?;
    let order = created.data.expect("order data");

    assert_eq!(order.subtotal, dec!(45));
    assert_eq!(order.shipping_cost, dec!(7));
    assert_eq!(order.total_amount, dec!(52));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].price, dec!(15));
    assert!(order.order_number.starts_with("CMD-"));
    assert_eq!(order.status_history.len(), 1);
    assert_eq!(stock_of(&state, product).await?, 7);

    let trail = AuditLogs::find()
        .filter(audit_logs::Column::UserId.eq(client.user_id))
        .filter(audit_logs::Column::Action.eq("order_create"))
        .all(&state.orm)
        .await?;
    assert_eq!(trail.len(), 1);

    let cancelled = order_service::cancel_order(&state, &client, order.id).await?;
    let cancelled = cancelled.data.expect("cancel data");
    assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
    assert_eq!(stock_of(&state, product).await?, 10);

    // A second cancel is accepted and does not restock again.
    order_service::cancel_order(&state, &client, order.id).await?;
    assert_eq!(stock_of(&state, product).await?, 10);

    Ok(())
}

#[tokio::test]
async fn rejected_cart_leaves_every_stock_untouched() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url).await?;
    let client = create_user(&state, Role::Client).await?;
    let plenty = create_product(&state, "Robe", dec!(89.99), None, 5).await?;
    let scarce = create_product(&state, "Jean Slim", dec!(79.99), None, 1).await?;

    let err = order_service::create_order(&state, &client, order_of(&[(plenty, 2), (scarce, 3)]))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Insufficient stock for Jean Slim. Available: 1");
    assert_eq!(stock_of(&state, plenty).await?, 5);
    assert_eq!(stock_of(&state, scarce).await?, 1);

    let ghost = Uuid::new_v4();
    let err = order_service::create_order(&state, &client, order_of(&[(plenty, 1), (ghost, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ProductNotFound(id) if id == ghost));
    assert_eq!(stock_of(&state, plenty).await?, 5);

    Ok(())
}

#[tokio::test]
async fn orders_need_items_and_a_complete_address() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url).await?;
    let client = create_user(&state, Role::Client).await?;
    let product = create_product(&state, "Veste", dec!(120), None, 4).await?;

    let err = order_service::create_order(&state, &client, order_of(&[]))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "No items in order");

    let mut request = order_of(&[(product, 1)]);
    request.shipping_address.as_mut().expect("address").city = Some("  ".into());
    let err = order_service::create_order(&state, &client, request)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Incomplete shipping address");
    assert_eq!(stock_of(&state, product).await?, 4);

    // Large carts ship for free.
    let order = order_service::create_order(&state, &client, order_of(&[(product, 1)]))
        .await?
        .data
        .expect("order data");
    assert_eq!(order.shipping_cost, Decimal::ZERO);
    assert_eq!(order.total_amount, dec!(120));

    Ok(())
}

#[tokio::test]
async fn shipped_orders_cannot_be_cancelled() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url).await?;
    let client = create_user(&state, Role::Client).await?;
    let admin = create_user(&state, Role::Admin).await?;
    let product = create_product(&state, "Baskets", dec!(89.99), Some(dec!(69.99)), 6).await?;

    let order = order_service::create_order(&state, &client, order_of(&[(product, 2)]))
        .await?
        .data
        .expect("order data");

    order_service::update_order_status(
        &state,
        &admin,
        order.id,
        UpdateOrderStatusRequest {
            status: "expediee".into(),
            comment: None,
        },
    )
    .await?;

    let err = order_service::cancel_order(&state, &client, order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(stock_of(&state, product).await?, 4);

    Ok(())
}

#[tokio::test]
async fn confirmed_orders_cancel_but_delivered_ones_do_not() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url).await?;
    let client = create_user(&state, Role::Client).await?;
    let admin = create_user(&state, Role::Admin).await?;
    let product = create_product(&state, "Pull Laine", dec!(45), None, 8).await?;

    let confirmed = order_service::create_order(&state, &client, order_of(&[(product, 2)]))
        .await?
        .data
        .expect("order data");
    set_status(&state, &admin, confirmed.id, "confirmee").await?;
    assert_eq!(stock_of(&state, product).await?, 6);

    let cancelled = order_service::cancel_order(&state, &client, confirmed.id)
        .await?
        .data
        .expect("cancel data");
    assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
    assert_eq!(stock_of(&state, product).await?, 8);

    let delivered = order_service::create_order(&state, &client, order_of(&[(product, 3)]))
        .await?
        .data
        .expect("order data");
    set_status(&state, &admin, delivered.id, "livree").await?;

    let err = order_service::cancel_order(&state, &client, delivered.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(stock_of(&state, product).await?, 5);

    let still = order_service::get_order(&state, &client, delivered.id)
        .await?
        .data
        .expect("order data");
    assert_eq!(still.status, OrderStatus::Delivered);

    Ok(())
}

#[tokio::test]
async fn cancel_skips_deleted_products_and_restocks_the_rest() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url).await?;
    let client = create_user(&state, Role::Client).await?;
    let admin = create_user(&state, Role::Admin).await?;
    let kept = create_product(&state, "Casquette", dec!(15), None, 4).await?;
    let removed = create_product(&state, "Echarpe", dec!(25), None, 4).await?;

    let order = order_service::create_order(&state, &client, order_of(&[(kept, 1), (removed, 2)]))
        .await?
        .data
        .expect("order data");
    product_service::delete_product(&state, &admin, removed).await?;

    let cancelled = order_service::cancel_order(&state, &client, order.id)
        .await?
        .data
        .expect("cancel data");
    assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
    assert_eq!(stock_of(&state, kept).await?, 4);
    assert!(Products::find_by_id(removed).one(&state.orm).await?.is_none());

    Ok(())
}

// Another transaction holds the lower id while the order lists the higher id
// first; cancel must queue behind it and finish once it commits.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancel_restocks_in_the_same_lock_order_as_checkout() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url).await?;
    let client = create_user(&state, Role::Client).await?;
    let a = create_product(&state, "Chaussettes", dec!(5), None, 10).await?;
    let b = create_product(&state, "Bonnet", dec!(12), None, 10).await?;
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };

    let order = order_service::create_order(&state, &client, order_of(&[(hi, 1), (lo, 1)]))
        .await?
        .data
        .expect("order data");

    let txn = state.orm.begin().await?;
    Products::find_by_id(lo)
        .lock(LockType::Update)
        .one(&txn)
        .await?;

    let cancel = {
        let state = state.clone();
        let client = client.clone();
        tokio::spawn(async move { order_service::cancel_order(&state, &client, order.id).await })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;

    Products::find_by_id(hi)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    txn.commit().await?;

    let cancelled = cancel.await??.data.expect("cancel data");
    assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
    assert_eq!(stock_of(&state, lo).await?, 10);
    assert_eq!(stock_of(&state, hi).await?, 10);

    Ok(())
}

#[tokio::test]
async fn only_the_owner_or_an_admin_sees_an_order() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url).await?;
    let owner = create_user(&state, Role::Client).await?;
    let stranger = create_user(&state, Role::Client).await?;
    let admin = create_user(&state, Role::Admin).await?;
    let product = create_product(&state, "Jupe", dec!(59.99), None, 3).await?;

    let order = order_service::create_order(&state, &owner, order_of(&[(product, 1)]))
        .await?
        .data
        .expect("order data");

    let err = order_service::get_order(&state, &stranger, order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    let err = order_service::cancel_order(&state, &stranger, order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    assert_eq!(stock_of(&state, product).await?, 2);

    let seen = order_service::get_order(&state, &admin, order.id)
        .await?
        .data
        .expect("order data");
    assert_eq!(seen.user.expect("populated owner").id, owner.user_id);

    let mine = order_service::list_my_orders(&state, &owner)
        .await?
        .data
        .expect("order list");
    assert_eq!(mine.items.len(), 1);
    let theirs = order_service::list_my_orders(&state, &stranger)
        .await?
        .data
        .expect("order list");
    assert!(theirs.items.is_empty());

    let err = order_service::get_order(&state, &owner, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    Ok(())
}

#[tokio::test]
async fn status_updates_append_history_with_comments() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url).await?;
    let client = create_user(&state, Role::Client).await?;
    let admin = create_user(&state, Role::Admin).await?;
    let product = create_product(&state, "Sweat", dec!(49.99), None, 10).await?;

    let order = order_service::create_order(&state, &client, order_of(&[(product, 1)]))
        .await?
        .data
        .expect("order data");

    let err = order_service::update_order_status(
        &state,
        &client,
        order.id,
        UpdateOrderStatusRequest {
            status: "confirmee".into(),
            comment: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let err = order_service::update_order_status(
        &state,
        &admin,
        order.id,
        UpdateOrderStatusRequest {
            status: "perdue".into(),
            comment: None,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "Invalid status");

    order_service::update_order_status(
        &state,
        &admin,
        order.id,
        UpdateOrderStatusRequest {
            status: "confirmee".into(),
            comment: Some("Paiement vérifié".into()),
        },
    )
    .await?;
    let delivered = order_service::update_order_status(
        &state,
        &admin,
        order.id,
        UpdateOrderStatusRequest {
            status: "livree".into(),
            comment: None,
        },
    )
    .await?
    .data
    .expect("order data");

    assert_eq!(delivered.status, OrderStatus::Delivered);
    assert!(delivered.delivered_at.is_some());
    let statuses: Vec<OrderStatus> = delivered.status_history.iter().map(|e| e.status).collect();
    assert_eq!(
        statuses,
        vec![OrderStatus::Pending, OrderStatus::Confirmed, OrderStatus::Delivered]
    );
    assert_eq!(
        delivered.status_history[1].comment.as_deref(),
        Some("Paiement vérifié")
    );

    Ok(())
}

#[tokio::test]
async fn admin_listing_is_paginated_and_filtered() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url).await?;
    let client = create_user(&state, Role::Client).await?;
    let admin = create_user(&state, Role::Admin).await?;
    let product = create_product(&state, "T-shirt", dec!(29.99), None, 20).await?;

    for _ in 0..3 {
        order_service::create_order(&state, &client, order_of(&[(product, 1)])).await?;
    }

    let err = order_service::list_orders(&state, &client, OrderListQuery::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let page = order_service::list_orders(
        &state,
        &admin,
        OrderListQuery {
            page: Some(1),
            limit: Some(2),
            status: Some("en_attente".into()),
        },
    )
    .await?;
    let meta = page.meta.expect("meta");
    assert_eq!(meta.page, Some(1));
    assert_eq!(meta.per_page, Some(2));
    assert!(meta.total.unwrap_or_default() >= 3);
    let items = page.data.expect("order list").items;
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|o| o.status == OrderStatus::Pending));
    assert!(items.iter().all(|o| o.user.is_some()));

    let err = order_service::list_orders(
        &state,
        &admin,
        OrderListQuery {
            status: Some("unknown".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_orders_never_oversell() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url).await?;
    let client = create_user(&state, Role::Client).await?;
    let product = create_product(&state, "Dernières pièces", dec!(10), None, 5).await?;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let state = state.clone();
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            order_service::create_order(&state, &client, order_of(&[(product, 1)])).await
        }));
    }

    let mut placed = 0;
    for handle in handles {
        if handle.await?.is_ok() {
            placed += 1;
        }
    }

    assert_eq!(placed, 5);
    assert_eq!(stock_of(&state, product).await?, 0);

    Ok(())
}
