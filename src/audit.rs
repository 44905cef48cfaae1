//! Append-only audit trail of mutating actions.

use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    UserRegister,
    UserLogin,
    UserUpdate,
    ProductCreate,
    ProductUpdate,
    ProductDelete,
    OrderCreate,
    OrderStatusUpdate,
    OrderCancel,
    ArticleCreate,
    ArticleUpdate,
    ArticleDelete,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::UserRegister => "user_register",
            AuditAction::UserLogin => "user_login",
            AuditAction::UserUpdate => "user_update",
            AuditAction::ProductCreate => "product_create",
            AuditAction::ProductUpdate => "product_update",
            AuditAction::ProductDelete => "product_delete",
            AuditAction::OrderCreate => "order_create",
            AuditAction::OrderStatusUpdate => "order_status_update",
            AuditAction::OrderCancel => "order_cancel",
            AuditAction::ArticleCreate => "article_create",
            AuditAction::ArticleUpdate => "article_update",
            AuditAction::ArticleDelete => "article_delete",
        }
    }

    /// Table the action touched.
    pub fn resource(self) -> &'static str {
        match self {
            AuditAction::UserRegister | AuditAction::UserLogin | AuditAction::UserUpdate => "users",
            AuditAction::ProductCreate | AuditAction::ProductUpdate | AuditAction::ProductDelete => {
                "products"
            }
            AuditAction::OrderCreate | AuditAction::OrderStatusUpdate | AuditAction::OrderCancel => {
                "orders"
            }
            AuditAction::ArticleCreate | AuditAction::ArticleUpdate | AuditAction::ArticleDelete => {
                "articles"
            }
        }
    }
}

pub async fn log_audit(
    pool: &DbPool,
    user_id: Uuid,
    action: AuditAction,
    metadata: Value,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO audit_logs (id, user_id, action, resource, metadata) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(action.as_str())
    .bind(action.resource())
    .bind(metadata)
    .execute(pool)
    .await?;

    Ok(())
}

/// A failed audit write is logged and never fails the request.
pub async fn record(pool: &DbPool, user_id: Uuid, action: AuditAction, metadata: Value) {
    if let Err(err) = log_audit(pool, user_id, action, metadata).await {
        tracing::warn!(error = %err, action = action.as_str(), "audit log failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_actions_land_on_the_orders_table() {
        for action in [
            AuditAction::OrderCreate,
            AuditAction::OrderStatusUpdate,
            AuditAction::OrderCancel,
        ] {
            assert_eq!(action.resource(), "orders");
        }
        assert_eq!(AuditAction::OrderCancel.as_str(), "order_cancel");
    }
}
