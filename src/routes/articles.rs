use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};

use crate::{
    dto::articles::{ArticleList, ArticlePayload},
    error::AppResult,
    middleware::{auth::AuthUser, json::AppJson},
    models::Article,
    response::ApiResponse,
    routes::params::{ArticleQuery, parse_id},
    services::article_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_articles).post(create_article))
        .route(
            "/{id}",
            get(get_article).put(update_article).delete(delete_article),
        )
}

#[utoipa::path(
    get,
    path = "/api/articles",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("limit" = Option<i64>, Query, description = "Items per page, default 20"),
        ("categorie" = Option<String>, Query, description = "Homme, Femme, Enfant or Accessoires"),
        ("search" = Option<String>, Query, description = "Case-insensitive name match"),
    ),
    responses(
        (status = 200, description = "List articles", body = ApiResponse<ArticleList>)
    ),
    tag = "Articles"
)]
pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<ArticleQuery>,
) -> AppResult<Json<ApiResponse<ArticleList>>> {
    let resp = article_service::list_articles(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/articles/{id}",
    params(("id" = String, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Get article", body = ApiResponse<Article>),
        (status = 404, description = "Article not found"),
    ),
    tag = "Articles"
)]
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Article>>> {
    let id = parse_id(&id)?;
    let resp = article_service::get_article(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/articles",
    request_body = ArticlePayload,
    responses(
        (status = 201, description = "Create article", body = ApiResponse<Article>),
        (status = 400, description = "Missing or invalid field"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Articles"
)]
pub async fn create_article(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<ArticlePayload>,
) -> AppResult<(StatusCode, Json<ApiResponse<Article>>)> {
    let resp = article_service::create_article(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/articles/{id}",
    params(("id" = String, Path, description = "Article ID")),
    request_body = ArticlePayload,
    responses(
        (status = 200, description = "Updated article", body = ApiResponse<Article>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Article not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Articles"
)]
pub async fn update_article(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    AppJson(payload): AppJson<ArticlePayload>,
) -> AppResult<Json<ApiResponse<Article>>> {
    let id = parse_id(&id)?;
    let resp = article_service::update_article(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/articles/{id}",
    params(("id" = String, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Deleted article"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Article not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Articles"
)]
pub async fn delete_article(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let id = parse_id(&id)?;
    let resp = article_service::delete_article(&state, &user, id).await?;
    Ok(Json(resp))
}
