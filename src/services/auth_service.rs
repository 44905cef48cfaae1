use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit::{self, AuditAction},
    config::AppConfig,
    dto::auth::{
        AuthResponse, Claims, LoginRequest, RegisterRequest, UpdateProfileRequest, normalize_email,
    },
    entity::{
        enums::Role,
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Address, User},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub const DEFAULT_COUNTRY: &str = "Tunisie";

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<AuthResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let RegisterRequest {
        nom,
        prenom,
        email,
        password,
        telephone,
        adresse,
    } = payload;
    let email = normalize_email(&email);

    let exist = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;
    if exist.is_some() {
        return Err(AppError::BadRequest("Email is already taken".to_string()));
    }

    let password_hash = hash_password(&password)?;
    let adresse = adresse.unwrap_or_default();

    let now = Utc::now();
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        nom: Set(nom.trim().to_string()),
        prenom: Set(prenom.trim().to_string()),
        email: Set(email),
        password_hash: Set(password_hash),
        telephone: Set(telephone.map(|t| t.trim().to_string())),
        rue: Set(adresse.rue),
        ville: Set(adresse.ville),
        code_postal: Set(adresse.code_postal),
        pays: Set(adresse.pays.unwrap_or_else(|| DEFAULT_COUNTRY.to_string())),
        role: Set(Role::Client),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(user_id = %user.id, "user registered");
    audit::record(
        &state.pool,
        user.id,
        AuditAction::UserRegister,
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    let resp = auth_response(&state.config, &user)?;
    Ok(ApiResponse::success("User created", resp, Some(Meta::empty())))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<AuthResponse>> {
    let LoginRequest { email, password } = payload;
    let user = Users::find()
        .filter(UserCol::Email.eq(normalize_email(&email)))
        .one(&state.orm)
        .await?;

    let user = match user {
        Some(u) => u,
        None => return Err(invalid_credentials()),
    };

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    let argon2 = Argon2::default();
    if argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(invalid_credentials());
    }

    audit::record(
        &state.pool,
        user.id,
        AuditAction::UserLogin,
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    let resp = auth_response(&state.config, &user)?;
    Ok(ApiResponse::success("Logged in", resp, Some(Meta::empty())))
}

pub async fn get_profile(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let found = Users::find_by_id(user.user_id).one(&state.orm).await?;
    let found = match found {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Profile", user_from_entity(found), None))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<AuthResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let existing = Users::find_by_id(user.user_id).one(&state.orm).await?;
    let existing = match existing {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };

    let mut active: UserActive = existing.into();
    if let Some(nom) = filled(payload.nom) {
        active.nom = Set(nom);
    }
    if let Some(prenom) = filled(payload.prenom) {
        active.prenom = Set(prenom);
    }
    if let Some(email) = filled(payload.email).map(|e| normalize_email(&e)) {
        let taken = Users::find()
            .filter(UserCol::Email.eq(email.as_str()))
            .filter(UserCol::Id.ne(user.user_id))
            .one(&state.orm)
            .await?;
        if taken.is_some() {
            return Err(AppError::BadRequest("Email is already taken".to_string()));
        }
        active.email = Set(email);
    }
    if let Some(telephone) = filled(payload.telephone) {
        active.telephone = Set(Some(telephone));
    }
    if let Some(adresse) = payload.adresse {
        active.rue = Set(adresse.rue);
        active.ville = Set(adresse.ville);
        active.code_postal = Set(adresse.code_postal);
        active.pays = Set(adresse.pays.unwrap_or_else(|| DEFAULT_COUNTRY.to_string()));
    }
    if let Some(password) = payload.password.filter(|p| !p.is_empty()) {
        active.password_hash = Set(hash_password(&password)?);
    }
    active.updated_at = Set(Utc::now().into());

    let updated = active.update(&state.orm).await?;

    tracing::info!(user_id = %updated.id, "profile updated");
    audit::record(
        &state.pool,
        updated.id,
        AuditAction::UserUpdate,
        serde_json::json!({ "user_id": updated.id }),
    )
    .await;

    let resp = auth_response(&state.config, &updated)?;
    Ok(ApiResponse::success("Profile updated", resp, Some(Meta::empty())))
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

pub fn issue_token(config: &AppConfig, user_id: Uuid, role: Role) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(config.jwt_ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn auth_response(config: &AppConfig, user: &UserModel) -> AppResult<AuthResponse> {
    Ok(AuthResponse {
        id: user.id,
        nom: user.nom.clone(),
        prenom: user.prenom.clone(),
        email: user.email.clone(),
        role: user.role,
        token: issue_token(config, user.id, user.role)?,
    })
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid email or password".into())
}

fn filled(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn user_from_entity(model: UserModel) -> User {
    User {
        id: model.id,
        nom: model.nom,
        prenom: model.prenom,
        email: model.email,
        telephone: model.telephone,
        adresse: Address {
            rue: model.rue,
            ville: model.ville,
            code_postal: model.code_postal,
            pays: Some(model.pays),
        },
        role: model.role,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
