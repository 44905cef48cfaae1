use utoipa::{
    Modify, OpenApi,
    openapi::{
        self, OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        articles::{ArticleList, ArticlePayload},
        auth::{AuthResponse, LoginRequest, RegisterRequest, UpdateProfileRequest},
        orders::{
            CancelOrderResponse, CreateOrderRequest, OrderItemRequest, OrderList,
            ShippingAddressInput, UpdateOrderStatusRequest,
        },
        products::{ProductList, ProductPayload, RateProductRequest},
    },
    entity::enums::{
        ArticleCategory, Category, OrderStatus, PaymentMethod, Role, Size, SubCategory,
    },
    models::{
        Address, Article, Order, OrderItem, Product, ProductRef, ShippingAddress, StatusEntry,
        User, UserRef,
    },
    response::{ApiResponse, Meta},
    routes::{articles, auth, health, orders, params, products},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::profile,
        auth::update_profile,
        products::list_products,
        products::featured_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::rate_product,
        orders::create_order,
        orders::my_orders,
        orders::list_orders,
        orders::get_order,
        orders::update_order_status,
        orders::cancel_order,
        articles::list_articles,
        articles::get_article,
        articles::create_article,
        articles::update_article,
        articles::delete_article
    ),
    components(
        schemas(
            User,
            Address,
            Product,
            ProductRef,
            UserRef,
            Order,
            OrderItem,
            ShippingAddress,
            StatusEntry,
            Article,
            OrderStatus,
            PaymentMethod,
            Role,
            Category,
            SubCategory,
            Size,
            ArticleCategory,
            RegisterRequest,
            LoginRequest,
            UpdateProfileRequest,
            AuthResponse,
            ProductPayload,
            RateProductRequest,
            ProductList,
            CreateOrderRequest,
            OrderItemRequest,
            ShippingAddressInput,
            UpdateOrderStatusRequest,
            CancelOrderResponse,
            OrderList,
            ArticlePayload,
            ArticleList,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            params::ArticleQuery,
            health::HealthData,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<Article>,
            ApiResponse<AuthResponse>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and profile"),
        (name = "Products", description = "Clothing catalog"),
        (name = "Orders", description = "Order placement and fulfilment"),
        (name = "Articles", description = "Standalone article catalog"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_the_order_workflow() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/orders",
            "/api/orders/myorders",
            "/api/orders/{id}",
            "/api/orders/{id}/status",
            "/api/orders/{id}/cancel",
            "/api/products/{id}/rate",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
