use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    checkout::{Reservation, plan_reservation, restock_plan},
    dto::orders::{CancelOrderResponse, CreateOrderRequest, OrderList, UpdateOrderStatusRequest},
    entity::{
        enums::{OrderStatus, PaymentMethod, parse_token},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        order_status_history::{
            ActiveModel as HistoryActive, Column as HistoryCol, Entity as OrderStatusHistory,
            Model as HistoryModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products},
        users::{Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderItem, ProductRef, ShippingAddress, StatusEntry, UserRef},
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    state::AppState,
};

const NOT_CANCELLABLE: &str =
    "This order can no longer be cancelled. Please contact customer service.";

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    let CreateOrderRequest {
        items,
        shipping_address,
        notes,
    } = payload;

    if items.is_empty() {
        return Err(AppError::BadRequest("No items in order".into()));
    }
    let address = shipping_address.unwrap_or_default().into_complete()?;

    let txn = state.orm.begin().await?;

    // One query locks every product of the cart, in id order, so two carts
    // sharing products always lock them in the same sequence.
    let product_ids: BTreeSet<Uuid> = items.iter().map(|item| item.product).collect();
    let products = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .order_by_asc(ProdCol::Id)
        .lock(LockType::Update)
        .all(&txn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect::<HashMap<_, _>>();

    let reservation = plan_reservation(&items, &products)?;
    commit_decrements(&txn, &reservation).await?;

    let now = Utc::now();
    let order_id = Uuid::new_v4();
    let order = OrderActive {
        id: Set(order_id),
        user_id: Set(user.user_id),
        order_number: Set(build_order_number(order_id)),
        shipping_name: Set(address.name),
        shipping_phone: Set(address.phone),
        shipping_street: Set(address.street),
        shipping_city: Set(address.city),
        shipping_postal_code: Set(address.postal_code),
        shipping_additional_info: Set(address.additional_info),
        subtotal: Set(reservation.totals.subtotal),
        shipping_cost: Set(reservation.totals.shipping_cost),
        total_amount: Set(reservation.totals.total_amount),
        notes: Set(notes.filter(|n| !n.trim().is_empty())),
        status: Set(OrderStatus::Pending),
        payment_method: Set(PaymentMethod::CashOnDelivery),
        is_paid: Set(false),
        paid_at: Set(None),
        delivered_at: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    let rows = reservation
        .lines
        .iter()
        .enumerate()
        .map(|(position, line)| OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            position: Set(position as i32),
            product_id: Set(line.product_id),
            name: Set(line.name.clone()),
            price: Set(line.price),
            quantity: Set(line.quantity),
            size: Set(line.size.clone()),
            color: Set(line.color.clone()),
            image: Set(line.image.clone()),
        });
    OrderItems::insert_many(rows).exec(&txn).await?;

    append_history(&txn, order.id, OrderStatus::Pending, None).await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        order_number = %order.order_number,
        user_id = %user.user_id,
        total = %order.total_amount,
        "order created"
    );
    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::OrderCreate,
        serde_json::json!({ "order_id": order.id, "order_number": order.order_number }),
    )
    .await;

    let order = load_one(&state.orm, order, false).await?;
    Ok(ApiResponse::success("Order created", order, Some(Meta::empty())))
}

/// Apply the planned decrements. The `stock >= qty` guard keeps stock
/// non-negative even if a row somehow escaped the lock.
async fn commit_decrements(txn: &DatabaseTransaction, reservation: &Reservation) -> AppResult<()> {
    let now = Utc::now().fixed_offset();
    for (product_id, quantity) in &reservation.decrements {
        let result = Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(*quantity))
            .col_expr(ProdCol::UpdatedAt, Expr::value(now))
            .filter(ProdCol::Id.eq(*product_id))
            .filter(ProdCol::Stock.gte(*quantity))
            .exec(txn)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for product {product_id}"
            )));
        }
    }
    Ok(())
}

pub async fn list_my_orders(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<OrderList>> {
    let orders = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let items = load_details(&state.orm, orders, false).await?;
    let meta = Meta::counted(items.len() as i64);
    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

pub async fn get_order(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<Order>> {
    let order = Orders::find_by_id(id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    if !user.can_access(order.user_id) {
        return Err(AppError::Forbidden);
    }

    let order = load_one(&state.orm, order, true).await?;
    Ok(ApiResponse::success("OK", order, Some(Meta::empty())))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(raw) = query.status.as_deref().filter(|s| !s.trim().is_empty()) {
        let status: OrderStatus =
            parse_token(raw).ok_or_else(|| AppError::BadRequest("Invalid status".into()))?;
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let finder = Orders::find()
        .filter(condition)
        .order_by_desc(OrderCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let items = load_details(&state.orm, orders, true).await?;
    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let status = payload.parsed_status()?;
    let comment = payload
        .comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };
    let previous = order.status;

    let now = Utc::now();
    let mut active: OrderActive = order.into();
    active.status = Set(status);
    if status == OrderStatus::Delivered {
        active.delivered_at = Set(Some(now.into()));
    }
    active.updated_at = Set(now.into());
    let order = active.update(&txn).await?;

    append_history(&txn, order.id, status, comment).await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        from = %previous.to_value(),
        to = %status.to_value(),
        "order status updated"
    );
    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::OrderStatusUpdate,
        serde_json::json!({ "order_id": order.id, "status": status }),
    )
    .await;

    let order = load_one(&state.orm, order, true).await?;
    Ok(ApiResponse::success("Status updated", order, Some(Meta::empty())))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<CancelOrderResponse>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    if !user.can_access(order.user_id) {
        return Err(AppError::Forbidden);
    }

    if !order.status.is_cancellable() {
        return Err(AppError::BadRequest(NOT_CANCELLABLE.into()));
    }

    // Stock was already given back the first time round.
    if order.status == OrderStatus::Cancelled {
        txn.commit().await?;
        let order = load_one(&state.orm, order, false).await?;
        return Ok(ApiResponse::success(
            "Order already cancelled",
            CancelOrderResponse {
                message: "Order already cancelled".into(),
                order,
            },
            Some(Meta::empty()),
        ));
    }

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&txn)
        .await?;

    // Restock in product id order, the same order create_order locks in.
    let now = Utc::now();
    let restock = restock_plan(items.iter().map(|item| (item.product_id, item.quantity)));
    for (product_id, quantity) in restock {
        let result = Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(quantity))
            .col_expr(ProdCol::UpdatedAt, Expr::value(now.fixed_offset()))
            .filter(ProdCol::Id.eq(product_id))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            tracing::debug!(
                order_id = %order.id,
                product_id = %product_id,
                "product gone, stock not restored"
            );
        }
    }

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Cancelled);
    active.updated_at = Set(now.into());
    let order = active.update(&txn).await?;

    append_history(&txn, order.id, OrderStatus::Cancelled, None).await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, user_id = %user.user_id, "order cancelled");
    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::OrderCancel,
        serde_json::json!({ "order_id": order.id }),
    )
    .await;

    let order = load_one(&state.orm, order, false).await?;
    Ok(ApiResponse::success(
        "Order cancelled",
        CancelOrderResponse {
            message: "Order cancelled".into(),
            order,
        },
        Some(Meta::empty()),
    ))
}

async fn append_history<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    status: OrderStatus,
    comment: Option<String>,
) -> AppResult<()> {
    HistoryActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        status: Set(status),
        comment: Set(comment),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await?;
    Ok(())
}

async fn load_one<C: ConnectionTrait>(conn: &C, order: OrderModel, with_owner: bool) -> AppResult<Order> {
    load_details(conn, vec![order], with_owner)
        .await?
        .pop()
        .ok_or(AppError::NotFound)
}

/// Attach line items, status history and populated references, keeping the
/// input order.
async fn load_details<C: ConnectionTrait>(
    conn: &C,
    orders: Vec<OrderModel>,
    with_owner: bool,
) -> AppResult<Vec<Order>> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }
    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();

    let mut items_by_order: HashMap<Uuid, Vec<OrderItemModel>> = HashMap::new();
    for item in OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(order_ids.clone()))
        .order_by_asc(OrderItemCol::Position)
        .all(conn)
        .await?
    {
        items_by_order.entry(item.order_id).or_default().push(item);
    }

    let mut history_by_order: HashMap<Uuid, Vec<HistoryModel>> = HashMap::new();
    for entry in OrderStatusHistory::find()
        .filter(HistoryCol::OrderId.is_in(order_ids))
        .order_by_asc(HistoryCol::CreatedAt)
        .all(conn)
        .await?
    {
        history_by_order.entry(entry.order_id).or_default().push(entry);
    }

    let product_ids: BTreeSet<Uuid> = items_by_order
        .values()
        .flatten()
        .map(|item| item.product_id)
        .collect();
    let products: HashMap<Uuid, ProductRef> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|p| {
            (
                p.id,
                ProductRef {
                    id: p.id,
                    nom: p.nom,
                    images: p.images,
                },
            )
        })
        .collect();

    let mut owners: HashMap<Uuid, UserRef> = HashMap::new();
    if with_owner {
        let user_ids: BTreeSet<Uuid> = orders.iter().map(|o| o.user_id).collect();
        owners = Users::find()
            .filter(UserCol::Id.is_in(user_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|u| {
                (
                    u.id,
                    UserRef {
                        id: u.id,
                        nom: u.nom,
                        prenom: u.prenom,
                        email: u.email,
                        telephone: u.telephone,
                    },
                )
            })
            .collect();
    }

    Ok(orders
        .into_iter()
        .map(|order| {
            let items = items_by_order
                .remove(&order.id)
                .unwrap_or_default()
                .into_iter()
                .map(|item| order_item_from_entity(item, &products))
                .collect();
            let history = history_by_order
                .remove(&order.id)
                .unwrap_or_default()
                .into_iter()
                .map(status_entry_from_entity)
                .collect();
            let owner = owners.get(&order.user_id).cloned();
            order_from_entity(order, items, history, owner)
        })
        .collect())
}

fn order_from_entity(
    model: OrderModel,
    items: Vec<OrderItem>,
    status_history: Vec<StatusEntry>,
    user: Option<UserRef>,
) -> Order {
    Order {
        id: model.id,
        order_number: model.order_number,
        user_id: model.user_id,
        user,
        items,
        shipping_address: ShippingAddress {
            name: model.shipping_name,
            phone: model.shipping_phone,
            street: model.shipping_street,
            city: model.shipping_city,
            postal_code: model.shipping_postal_code,
            additional_info: model.shipping_additional_info,
        },
        subtotal: model.subtotal,
        shipping_cost: model.shipping_cost,
        total_amount: model.total_amount,
        notes: model.notes,
        status: model.status,
        payment_method: model.payment_method,
        is_paid: model.is_paid,
        paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
        delivered_at: model.delivered_at.map(|dt| dt.with_timezone(&Utc)),
        status_history,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn order_item_from_entity(model: OrderItemModel, products: &HashMap<Uuid, ProductRef>) -> OrderItem {
    OrderItem {
        product_id: model.product_id,
        product: products.get(&model.product_id).cloned(),
        name: model.name,
        price: model.price,
        quantity: model.quantity,
        size: model.size,
        color: model.color,
        image: model.image,
    }
}

fn status_entry_from_entity(model: HistoryModel) -> StatusEntry {
    StatusEntry {
        status: model.status,
        date: model.created_at.with_timezone(&Utc),
        comment: model.comment,
    }
}

/// The whole id goes into the number, so it is as unique as the primary key.
fn build_order_number(order_id: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let simple = order_id.simple().to_string().to_uppercase();
    format!("CMD-{date}-{simple}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_numbers_carry_date_and_full_id() {
        let id = Uuid::parse_str("3f2a9c1e-0000-4000-8000-000000000000").unwrap();
        let number = build_order_number(id);
        assert!(number.starts_with("CMD-"));
        assert!(number.ends_with("-3F2A9C1E000040008000000000000000"));
        assert_eq!(number.len(), "CMD-20260101-".len() + 32);
    }

    #[test]
    fn ids_sharing_a_prefix_get_distinct_numbers() {
        let a = Uuid::parse_str("3f2a9c1e-0000-4000-8000-000000000001").unwrap();
        let b = Uuid::parse_str("3f2a9c1e-ffff-4000-8000-000000000002").unwrap();
        assert_ne!(build_order_number(a), build_order_number(b));
    }
}
