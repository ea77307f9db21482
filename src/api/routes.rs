//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::auth::Registration;
use crate::domain::{
    AccountId, AmountError, LedgerError, Transaction, TransactionId, TransactionKind, TransferCode,
};
use crate::error::AppError;
use crate::handlers::{CashInCommand, TransferCommand};
use crate::queries::HistoryQuery;

use super::middleware::{session_middleware, RequestAccount};
use super::AppState;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub account_id: AccountId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Email or phone number
    pub identifier: String,
    pub pin: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub account_id: AccountId,
    pub token: String,
    pub expires_in_minutes: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChangePinRequest {
    pub old_pin: String,
    pub new_pin: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub account_id: AccountId,
    pub balance: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CashInRequest {
    /// Amount to credit (as string for precise decimal)
    pub amount: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CashInResponse {
    pub account_id: AccountId,
    pub amount: Decimal,
    pub balance: Decimal,
    pub transaction_id: TransactionId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    pub to_account_id: AccountId,
    /// Amount to transfer (as string for precise decimal)
    pub amount: String,
}

#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: Decimal,
    pub from_balance: Decimal,
    pub code: TransferCode,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: TransactionId,
    pub amount: Decimal,
    pub label: String,
    pub kind: TransactionKind,
    pub account_id: AccountId,
    pub created_at: DateTime<Utc>,
    pub transfer_to_id: Option<AccountId>,
    pub transfer_from_id: Option<AccountId>,
}

impl From<Transaction> for TransactionResponse {
    fn from(record: Transaction) -> Self {
        Self {
            kind: record.kind(),
            id: record.id,
            amount: record.amount,
            label: record.label,
            account_id: record.account_id,
            created_at: record.created_at,
            transfer_to_id: record.transfer_to_id,
            transfer_from_id: record.transfer_from_id,
        }
    }
}

/// Parse a request amount; malformed input is an invalid amount, not a bad body
fn parse_amount(raw: &str) -> Result<Decimal, AppError> {
    Decimal::from_str(raw.trim())
        .map_err(|e| AppError::Ledger(LedgerError::InvalidAmount(AmountError::ParseError(e.to_string()))))
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
///
/// Registration and login are open; everything else needs a session.
pub fn create_router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/sessions/current", delete(logout))
        .route("/accounts/pin", put(change_pin))
        .route("/balance", get(get_balance))
        .route("/cash-in", post(cash_in))
        .route("/transfers", post(transfer))
        .route("/transactions", get(list_transactions))
        .route("/transactions/:transaction_id", get(get_transaction))
        .route_layer(middleware::from_fn_with_state(state, session_middleware));

    Router::new()
        .route("/accounts", post(register))
        .route("/sessions", post(login))
        .merge(protected)
}

// =========================================================================
// POST /accounts
// =========================================================================

/// Register a new account
async fn register(
    State(state): State<AppState>,
    Json(request): Json<Registration>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let account_id = state.auth.register(request).await?;

    Ok((StatusCode::CREATED, Json(RegisterResponse { account_id })))
}

// =========================================================================
// POST /sessions, DELETE /sessions/current
// =========================================================================

/// Log in with email or phone number and PIN
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let session = state.auth.login(&request.identifier, &request.pin).await?;

    Ok(Json(LoginResponse {
        account_id: session.account_id,
        token: session.token,
        expires_in_minutes: state.sessions.timeout().num_minutes(),
    }))
}

/// End the caller's session
async fn logout(
    State(state): State<AppState>,
    Extension(caller): Extension<RequestAccount>,
) -> StatusCode {
    state.auth.logout(caller.account_id);
    StatusCode::NO_CONTENT
}

// =========================================================================
// PUT /accounts/pin
// =========================================================================

async fn change_pin(
    State(state): State<AppState>,
    Extension(caller): Extension<RequestAccount>,
    Json(request): Json<ChangePinRequest>,
) -> Result<StatusCode, AppError> {
    state
        .auth
        .change_pin(caller.account_id, &request.old_pin, &request.new_pin)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// GET /balance
// =========================================================================

/// Get the caller's balance
async fn get_balance(
    State(state): State<AppState>,
    Extension(caller): Extension<RequestAccount>,
) -> Result<Json<BalanceResponse>, AppError> {
    let balance = state
        .ledger
        .get_balance(caller.account_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("balance for account {}", caller.account_id)))?;

    Ok(Json(BalanceResponse {
        account_id: balance.account_id,
        balance: balance.amount,
    }))
}

// =========================================================================
// POST /cash-in
// =========================================================================

/// Credit the caller's account
async fn cash_in(
    State(state): State<AppState>,
    Extension(caller): Extension<RequestAccount>,
    Json(request): Json<CashInRequest>,
) -> Result<(StatusCode, Json<CashInResponse>), AppError> {
    let amount = parse_amount(&request.amount)?;

    let result = state
        .ledger
        .cash_in_handler()
        .execute(CashInCommand::new(caller.account_id, amount))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CashInResponse {
            account_id: result.account_id,
            amount: result.amount,
            balance: result.balance,
            transaction_id: result.transaction_id,
        }),
    ))
}

// =========================================================================
// POST /transfers
// =========================================================================

/// Transfer from the caller to another account
async fn transfer(
    State(state): State<AppState>,
    Extension(caller): Extension<RequestAccount>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<TransferResponse>, AppError> {
    let amount = parse_amount(&request.amount)?;

    let command = TransferCommand::new(caller.account_id, request.to_account_id, amount);
    let result = state.ledger.transfer_handler().execute(command).await?;

    Ok(Json(TransferResponse {
        from_account_id: result.from_account_id,
        to_account_id: result.to_account_id,
        amount: result.amount,
        from_balance: result.from_balance,
        code: TransferCode::Success,
        status: "completed".to_string(),
    }))
}

// =========================================================================
// GET /transactions, GET /transactions/:transaction_id
// =========================================================================

/// The caller's history, newest first
async fn list_transactions(
    State(state): State<AppState>,
    Extension(caller): Extension<RequestAccount>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<TransactionResponse>>, AppError> {
    let records = state
        .ledger
        .history_reader()
        .list_by_account(caller.account_id, &query)
        .await?;

    Ok(Json(records.into_iter().map(TransactionResponse::from).collect()))
}

/// One of the caller's records
async fn get_transaction(
    State(state): State<AppState>,
    Extension(caller): Extension<RequestAccount>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<TransactionResponse>, AppError> {
    let record = state
        .ledger
        .get_transaction(transaction_id)
        .await?
        .filter(|record| record.account_id == caller.account_id)
        .ok_or(LedgerError::TransactionNotFound(transaction_id))?;

    Ok(Json(record.into()))
}
