//! API Routes
//!
//! HTTP endpoint definitions. Mutating operations delegate to the command
//! handlers; read endpoints query the store directly.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Phone;
use crate::error::AppError;
use crate::handlers::{
    BizumCommand, BizumHandler, BizumResult, CardHandler, CardView, CreateCardCommand,
    DecideLoanCommand, LoanHandler, LoanView, LoginCommand, LoginHandler, LoginResult,
    RegisterCommand, RegisterHandler, RequestLoanCommand, TransferCommand, TransferHandler,
    TransferResult,
};
use crate::ledger::{Account, Direction, LedgerStore};
use crate::notify::{Notification, NotificationService};

use super::middleware::{AuthUser, Role};
use super::AppState;

// =========================================================================
// Response types
// =========================================================================

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub iban: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub birth_date: NaiveDate,
    pub dni: String,
    pub country: String,
    pub city: String,
    pub address: String,
    pub postal_code: String,
    pub email: String,
    pub phone: String,
    pub main_currency: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AccountsResponse {
    pub accounts: Vec<Account>,
}

#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub transfer: TransferResult,
}

/// A transfer as seen from one account's history
#[derive(Debug, Serialize)]
pub struct TransferListEntry {
    pub id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub concept: String,
    pub counterpart_name: Option<String>,
    pub counterpart_iban: Option<String>,
    pub status: String,
    pub direction: Direction,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TransfersResponse {
    pub transfers: Vec<TransferListEntry>,
}

#[derive(Debug, Serialize)]
pub struct BizumResponse {
    pub bizum: BizumResult,
}

/// A bizum as seen from one user's history
#[derive(Debug, Serialize)]
pub struct BizumListEntry {
    pub id: Uuid,
    pub amount: Decimal,
    pub concept: String,
    pub to_phone: String,
    pub status: String,
    pub direction: Direction,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct BizumsResponse {
    pub bizums: Vec<BizumListEntry>,
}

#[derive(Debug, Serialize)]
pub struct LoanRequestResponse {
    pub loan_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct LoanResponse {
    pub loan: LoanView,
}

#[derive(Debug, Serialize)]
pub struct LoansResponse {
    pub loans: Vec<LoanView>,
}

#[derive(Debug, Serialize)]
pub struct CardResponse {
    pub card: CardView,
}

#[derive(Debug, Serialize)]
pub struct CardsResponse {
    pub cards: Vec<CardView>,
}

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Serialize)]
pub struct AdminUserEntry {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub dni: String,
    pub email: String,
    pub phone: String,
    pub main_currency: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AdminUsersResponse {
    pub users: Vec<AdminUserEntry>,
}

#[derive(Debug, Deserialize)]
pub struct AdminUpdateUserRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub main_currency: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

// =========================================================================
// Routers
// =========================================================================

/// Routes reachable without a token
pub fn create_public_router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

/// Routes behind the bearer-token middleware
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(me))
        .route("/accounts", get(list_accounts))
        .route("/transfers", post(create_transfer).get(list_transfers))
        .route("/bizums", post(create_bizum).get(list_bizums))
        .route("/loans", post(request_loan).get(list_my_loans))
        .route("/loans/:loan_id/decide", post(decide_loan))
        .route("/cards", post(create_card).get(list_cards))
        .route("/cards/:card_id", delete(delete_card))
        .route("/notifications", get(list_notifications))
        .route(
            "/notifications/:notification_id/read",
            post(mark_notification_read),
        )
        .route("/admin/loans/pending", get(admin_pending_loans))
        .route("/admin/users", get(admin_list_users))
        .route("/admin/users/:user_id", patch(admin_update_user))
}

// =========================================================================
// Auth
// =========================================================================

/// Register a new user and provision their main account
async fn register(
    State(state): State<AppState>,
    Json(command): Json<RegisterCommand>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let result = RegisterHandler::new(state.pool.clone()).execute(command).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: result.user_id,
            account_id: result.account_id,
            iban: result.iban,
        }),
    ))
}

/// Exchange credentials for a bearer token
async fn login(
    State(state): State<AppState>,
    Json(command): Json<LoginCommand>,
) -> Result<Json<LoginResult>, AppError> {
    let result = LoginHandler::new(state.pool.clone())
        .execute(command, state.config.token_ttl_days)
        .await?;

    Ok(Json(result))
}

/// The authenticated user's profile
async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<MeResponse>, AppError> {
    let row: Option<(
        Uuid,
        String,
        String,
        NaiveDate,
        String,
        String,
        String,
        String,
        String,
        String,
        String,
        String,
        String,
        DateTime<Utc>,
    )> = sqlx::query_as(
        r#"
        SELECT id, name, surname, birth_date, dni, country, city, address,
               postal_code, email, phone, main_currency, role, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(auth.user_id)
    .fetch_optional(&state.pool)
    .await?;

    let (
        id,
        name,
        surname,
        birth_date,
        dni,
        country,
        city,
        address,
        postal_code,
        email,
        phone,
        main_currency,
        role,
        created_at,
    ) = row.ok_or_else(|| AppError::UserNotFound(auth.user_id.to_string()))?;

    Ok(Json(MeResponse {
        id,
        name,
        surname,
        birth_date,
        dni,
        country,
        city,
        address,
        postal_code,
        email,
        phone,
        main_currency,
        role,
        created_at,
    }))
}

// =========================================================================
// Accounts
// =========================================================================

/// The caller's accounts, main account first
async fn list_accounts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<AccountsResponse>, AppError> {
    let accounts = LedgerStore::new(state.pool.clone())
        .list_accounts(auth.user_id)
        .await?;

    Ok(Json(AccountsResponse { accounts }))
}

// =========================================================================
// Transfers
// =========================================================================

/// Transfer money to an IBAN from the caller's main account
async fn create_transfer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(command): Json<TransferCommand>,
) -> Result<(StatusCode, Json<TransferResponse>), AppError> {
    let result = TransferHandler::new(state.pool.clone())
        .execute(command, auth.user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(TransferResponse { transfer: result })))
}

/// The caller's transfer history, relative to their main account
async fn list_transfers(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<TransfersResponse>, AppError> {
    let ledger = LedgerStore::new(state.pool.clone());

    let Some(account) = ledger.find_main_account(auth.user_id).await? else {
        return Ok(Json(TransfersResponse { transfers: vec![] }));
    };

    let rows: Vec<(
        Uuid,
        Uuid,
        Uuid,
        Decimal,
        String,
        String,
        Option<String>,
        Option<String>,
        String,
        DateTime<Utc>,
    )> = sqlx::query_as(
        r#"
        SELECT id, from_account, to_account, amount, currency, concept,
               counterpart_name, counterpart_iban, status, created_at
        FROM transfers
        WHERE from_account = $1 OR to_account = $1
        ORDER BY created_at DESC
        LIMIT 50
        "#,
    )
    .bind(account.id)
    .fetch_all(&state.pool)
    .await?;

    let transfers = rows
        .into_iter()
        .map(
            |(
                id,
                from_account,
                _to_account,
                amount,
                currency,
                concept,
                counterpart_name,
                counterpart_iban,
                status,
                created_at,
            )| {
                let direction = if from_account == account.id {
                    Direction::Out
                } else {
                    Direction::In
                };
                TransferListEntry {
                    id,
                    amount,
                    currency,
                    concept,
                    counterpart_name,
                    counterpart_iban,
                    status,
                    direction,
                    created_at,
                }
            },
        )
        .collect();

    Ok(Json(TransfersResponse { transfers }))
}

// =========================================================================
// Bizums
// =========================================================================

/// Send a bizum to a phone number
async fn create_bizum(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(command): Json<BizumCommand>,
) -> Result<(StatusCode, Json<BizumResponse>), AppError> {
    let result = BizumHandler::new(state.pool.clone())
        .execute(command, auth.user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(BizumResponse { bizum: result })))
}

/// The caller's bizum history
async fn list_bizums(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<BizumsResponse>, AppError> {
    let rows: Vec<(Uuid, Uuid, Decimal, String, String, String, DateTime<Utc>)> = sqlx::query_as(
        r#"
        SELECT id, from_user, amount, concept, to_phone, status, created_at
        FROM bizums
        WHERE from_user = $1 OR to_user = $1
        ORDER BY created_at DESC
        LIMIT 50
        "#,
    )
    .bind(auth.user_id)
    .fetch_all(&state.pool)
    .await?;

    let bizums = rows
        .into_iter()
        .map(
            |(id, from_user, amount, concept, to_phone, status, created_at)| {
                let direction = if from_user == auth.user_id {
                    Direction::Out
                } else {
                    Direction::In
                };
                BizumListEntry {
                    id,
                    amount,
                    concept,
                    to_phone,
                    status,
                    direction,
                    created_at,
                }
            },
        )
        .collect();

    Ok(Json(BizumsResponse { bizums }))
}

// =========================================================================
// Loans
// =========================================================================

/// Request a consumer loan
async fn request_loan(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(command): Json<RequestLoanCommand>,
) -> Result<(StatusCode, Json<LoanRequestResponse>), AppError> {
    let loan_id = LoanHandler::new(state.pool.clone())
        .request(command, auth.user_id, state.config.admin_notify_user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(LoanRequestResponse { loan_id })))
}

/// The caller's open loans
async fn list_my_loans(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<LoansResponse>, AppError> {
    let loans = LoanHandler::new(state.pool.clone())
        .list_for_user(auth.user_id)
        .await?;

    Ok(Json(LoansResponse { loans }))
}

/// Decide a pending loan (admin only)
async fn decide_loan(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(loan_id): Path<Uuid>,
    Json(command): Json<DecideLoanCommand>,
) -> Result<Json<LoanResponse>, AppError> {
    auth.require_admin()?;

    let loan = LoanHandler::new(state.pool.clone())
        .decide(loan_id, command, auth.user_id)
        .await?;

    Ok(Json(LoanResponse { loan }))
}

/// Pending loan queue (admin only)
async fn admin_pending_loans(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<LoansResponse>, AppError> {
    auth.require_admin()?;

    let loans = LoanHandler::new(state.pool.clone()).list_pending().await?;

    Ok(Json(LoansResponse { loans }))
}

// =========================================================================
// Cards
// =========================================================================

/// Issue a new card
async fn create_card(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(command): Json<CreateCardCommand>,
) -> Result<(StatusCode, Json<CardResponse>), AppError> {
    let card = CardHandler::new(state.pool.clone())
        .create(command, auth.user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(CardResponse { card })))
}

/// The caller's cards
async fn list_cards(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<CardsResponse>, AppError> {
    let cards = CardHandler::new(state.pool.clone())
        .list_for_user(auth.user_id)
        .await?;

    Ok(Json(CardsResponse { cards }))
}

/// Delete one of the caller's cards
async fn delete_card(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(card_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    CardHandler::new(state.pool.clone())
        .delete(card_id, auth.user_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// Notifications
// =========================================================================

/// The caller's notifications, newest first
async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<NotificationsResponse>, AppError> {
    let notifications = NotificationService::new(state.pool.clone())
        .list_for_user(auth.user_id)
        .await?;

    Ok(Json(NotificationsResponse { notifications }))
}

/// Mark a notification as read
async fn mark_notification_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let updated = NotificationService::new(state.pool.clone())
        .mark_read(auth.user_id, notification_id)
        .await?;

    if !updated {
        return Err(AppError::NotificationNotFound(notification_id.to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// Admin: users
// =========================================================================

type AdminUserTuple = (
    Uuid,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    DateTime<Utc>,
);

fn admin_user_from_tuple(row: AdminUserTuple) -> AdminUserEntry {
    let (id, name, surname, dni, email, phone, main_currency, role, created_at) = row;
    AdminUserEntry {
        id,
        name,
        surname,
        dni,
        email,
        phone,
        main_currency,
        role,
        created_at,
    }
}

const ADMIN_USER_COLUMNS: &str =
    "id, name, surname, dni, email, phone, main_currency, role, created_at";

/// List all users (admin only)
async fn admin_list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<AdminUsersResponse>, AppError> {
    auth.require_admin()?;

    let rows: Vec<AdminUserTuple> = sqlx::query_as(&format!(
        "SELECT {ADMIN_USER_COLUMNS} FROM users ORDER BY created_at DESC"
    ))
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(AdminUsersResponse {
        users: rows.into_iter().map(admin_user_from_tuple).collect(),
    }))
}

/// Update a user's profile or role (admin only)
async fn admin_update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<AdminUpdateUserRequest>,
) -> Result<Json<AdminUserEntry>, AppError> {
    auth.require_admin()?;

    if let Some(ref role) = request.role {
        if Role::parse(role).is_none() {
            return Err(AppError::InvalidRequest(format!("Unknown role: {}", role)));
        }
    }
    let phone = match request.phone.as_deref() {
        Some(raw) => Some(Phone::parse(raw)?.to_string()),
        None => None,
    };

    let row: Option<AdminUserTuple> = sqlx::query_as(&format!(
        r#"
        UPDATE users SET
            name = COALESCE($2, name),
            surname = COALESCE($3, surname),
            country = COALESCE($4, country),
            city = COALESCE($5, city),
            address = COALESCE($6, address),
            postal_code = COALESCE($7, postal_code),
            email = COALESCE($8, email),
            phone = COALESCE($9, phone),
            main_currency = COALESCE($10, main_currency),
            role = COALESCE($11, role),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {ADMIN_USER_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(request.name)
    .bind(request.surname)
    .bind(request.country)
    .bind(request.city)
    .bind(request.address)
    .bind(request.postal_code)
    .bind(request.email)
    .bind(phone)
    .bind(request.main_currency)
    .bind(request.role)
    .fetch_optional(&state.pool)
    .await?;

    let row = row.ok_or_else(|| AppError::UserNotFound(user_id.to_string()))?;

    Ok(Json(admin_user_from_tuple(row)))
}
