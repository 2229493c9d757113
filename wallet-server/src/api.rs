//! # REST API
//!
//! Builds the axum router that exposes the wallet's HTTP interface.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                       | Auth   | Description                      |
//! |--------|----------------------------|--------|----------------------------------|
//! | GET    | `/health`                  | no     | Liveness probe                   |
//! | POST   | `/api/v1/register`         | no     | Create a user with empty wallet  |
//! | POST   | `/api/v1/login`            | no     | Issue a session token            |
//! | GET    | `/api/v1/balance`          | bearer | Current balances                 |
//! | POST   | `/api/v1/wallet/deposit`   | bearer | Credit an amount                 |
//! | POST   | `/api/v1/wallet/withdraw`  | bearer | Debit an amount                  |
//! | POST   | `/api/v1/exchange`         | bearer | Convert between currencies       |
//! | GET    | `/api/v1/exchange/rates`   | bearer | Current rate table               |

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use wallet_core::{Balances, Currency, Error, Registration, WalletContext};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone; the context lives behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<WalletContext>,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let api = Router::new()
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route("/balance", get(balance_handler))
        .route("/wallet/deposit", post(deposit_handler))
        .route("/wallet/withdraw", post(withdraw_handler))
        .route("/exchange", post(exchange_handler))
        .route("/exchange/rates", get(rates_handler));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api/v1", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// The authenticated caller, resolved from the `Authorization` header.
///
/// Handlers take this extractor instead of touching credentials; a missing
/// or invalid bearer token rejects the request with 401 before the handler
/// runs.
pub struct AuthUser(pub String);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Response> {
        let value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        let token = value
            .strip_prefix("Bearer ")
            .ok_or_else(|| error_response(Error::unauthenticated("missing bearer token")))?;

        let username = state
            .ctx
            .accounts
            .authenticate(token)
            .map_err(error_response)?;
        Ok(AuthUser(username))
    }
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/v1/login`.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response payload for `POST /api/v1/login`.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Response payload for `POST /api/v1/register`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: String,
    pub username: String,
}

/// Response payload for `GET /api/v1/balance`.
#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub balance: Balances,
}

/// Request body for deposit and withdraw.
///
/// The currency code travels as a string so that an unknown code maps to a
/// 400 with a descriptive error instead of a generic body-rejection.
#[derive(Debug, Serialize, Deserialize)]
pub struct AmountRequest {
    pub amount: Decimal,
    pub currency: String,
}

/// Response payload for deposit and withdraw.
#[derive(Debug, Serialize, Deserialize)]
pub struct MutationResponse {
    pub message: String,
    pub new_balance: Balances,
}

/// Request body for `POST /api/v1/exchange`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExchangeRequest {
    pub from_currency: String,
    pub to_currency: String,
    pub amount: Decimal,
}

/// Response payload for `POST /api/v1/exchange`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExchangeResponse {
    pub message: String,
    pub exchanged_amount: Decimal,
    pub new_balance: Balances,
}

/// Response payload for `GET /api/v1/exchange/rates`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RatesResponse {
    pub rates: HashMap<Currency, Decimal>,
    pub stale: bool,
}

/// Generic error body returned on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Error Mapping
// ---------------------------------------------------------------------------

/// Maps a core error to its HTTP response.
///
/// Infrastructure failures are logged and returned as an opaque 500; the
/// caller never sees database or IO details.
fn error_response(err: Error) -> Response {
    let status = match &err {
        Error::InvalidAmount(_)
        | Error::UnsupportedCurrency(_)
        | Error::InsufficientFunds { .. }
        | Error::InvalidRate(_)
        | Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Conflict(_) => StatusCode::CONFLICT,
        Error::RateServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "request failed");
        "internal server error".to_string()
    } else {
        err.to_string()
    };

    (status, Json(ErrorResponse { error: message })).into_response()
}

fn parse_currency(code: &str) -> Result<Currency, Response> {
    code.parse::<Currency>().map_err(error_response)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — liveness probe for orchestrators.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `POST /api/v1/register` — create a user with an empty wallet.
async fn register_handler(
    State(state): State<AppState>,
    Json(req): Json<Registration>,
) -> Response {
    match state.ctx.accounts.register(&req).await {
        Ok(user) => (
            StatusCode::CREATED,
            Json(RegisterResponse {
                user_id: user.id.to_string(),
                username: user.username,
            }),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

/// `POST /api/v1/login` — verify credentials and issue a token.
async fn login_handler(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Response {
    match state.ctx.accounts.login(&req.username, &req.password).await {
        Ok(token) => Json(LoginResponse { token }).into_response(),
        Err(err) => error_response(err),
    }
}

/// `GET /api/v1/balance` — current balances for the authenticated user.
async fn balance_handler(AuthUser(username): AuthUser, State(state): State<AppState>) -> Response {
    match state.ctx.ledger.balances(&username).await {
        Ok(balance) => Json(BalanceResponse { balance }).into_response(),
        Err(err) => error_response(err),
    }
}

/// `POST /api/v1/wallet/deposit` — credit an amount.
async fn deposit_handler(
    AuthUser(username): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<AmountRequest>,
) -> Response {
    let currency = match parse_currency(&req.currency) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match state.ctx.ledger.deposit(&username, currency, req.amount).await {
        Ok(new_balance) => Json(MutationResponse {
            message: "Account topped up successfully".to_string(),
            new_balance,
        })
        .into_response(),
        Err(err) => error_response(err),
    }
}

/// `POST /api/v1/wallet/withdraw` — debit an amount.
async fn withdraw_handler(
    AuthUser(username): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<AmountRequest>,
) -> Response {
    let currency = match parse_currency(&req.currency) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match state
        .ctx
        .ledger
        .withdraw(&username, currency, req.amount)
        .await
    {
        Ok(new_balance) => Json(MutationResponse {
            message: "Withdrawal successful".to_string(),
            new_balance,
        })
        .into_response(),
        Err(err) => error_response(err),
    }
}

/// `POST /api/v1/exchange` — convert between currencies at the current rate.
async fn exchange_handler(
    AuthUser(username): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ExchangeRequest>,
) -> Response {
    let from = match parse_currency(&req.from_currency) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let to = match parse_currency(&req.to_currency) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match state
        .ctx
        .ledger
        .exchange(&username, from, to, req.amount)
        .await
    {
        Ok(outcome) => Json(ExchangeResponse {
            message: "Exchange successful".to_string(),
            exchanged_amount: outcome.credited,
            new_balance: outcome.balances,
        })
        .into_response(),
        Err(err) => error_response(err),
    }
}

/// `GET /api/v1/exchange/rates` — current rate table.
///
/// `stale` is true when the external rate service was unreachable and the
/// table is a last-known-good copy.
async fn rates_handler(AuthUser(_): AuthUser, State(state): State<AppState>) -> Response {
    match state.ctx.rates.get_rates().await {
        Ok(table) => Json(RatesResponse {
            rates: table.rates,
            stale: table.stale,
        })
        .into_response(),
        Err(err) => error_response(err),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
