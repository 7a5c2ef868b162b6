//! HTTP handlers for subscription endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

use crate::adapters::payments::PaymentGateways;
use crate::application::handlers::subscription::{
    CreateOrderCommand, CreateOrderHandler, GetSubscriptionMonitorHandler,
    GetSubscriptionStatusHandler, GetSubscriptionStatusQuery, ListManualReviewsHandler,
    PlanPricing, ProcessWebhookCommand, ProcessWebhookHandler, ResolveManualReviewCommand,
    ResolveManualReviewHandler, SubscriptionActivator, VerifyPaymentCommand, VerifyPaymentHandler,
    VerifyPaymentResult, WebhookVerifiers,
};
use crate::domain::foundation::AccountId;
use crate::domain::subscription::webhook_event::{SIGNATURE_HEADER, TIMESTAMP_HEADER, VERIFY_HEADER};
use crate::domain::subscription::{
    PaymentProvider, ReviewDecision, SubscriptionError, WebhookError, WebhookHeaders,
};
use crate::ports::{AccountRepository, ManualReviewQueue};

use super::dto::{
    required_field, CreateOrderRequest, CreateOrderResponse, ErrorResponse,
    ManualReviewListResponse, ManualReviewResponse, ResolveManualReviewResponse,
    SubscriptionMonitorResponse, SubscriptionStatusResponse, VerifyPaymentRequest,
    VerifyPaymentResponse, WebhookAckResponse,
};

/// Header carrying the authenticated account id, set by the upstream session layer.
pub const ACCOUNT_ID_HEADER: &str = "X-Account-Id";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned for each request; every dependency is behind an `Arc`.
#[derive(Clone)]
pub struct SubscriptionAppState {
    pub account_repository: Arc<dyn AccountRepository>,
    pub manual_review_queue: Arc<dyn ManualReviewQueue>,
    pub payment_gateways: PaymentGateways,
    pub webhook_verifiers: Arc<WebhookVerifiers>,
    pub pricing: PlanPricing,
    /// Bearer key for admin endpoints. `None` disables them.
    pub admin_api_key: Option<Arc<SecretString>>,
    /// Include raw provider diagnostics in error bodies.
    pub expose_error_details: bool,
}

impl SubscriptionAppState {
    pub fn new(
        account_repository: Arc<dyn AccountRepository>,
        manual_review_queue: Arc<dyn ManualReviewQueue>,
        payment_gateways: PaymentGateways,
        webhook_verifiers: WebhookVerifiers,
        pricing: PlanPricing,
    ) -> Self {
        Self {
            account_repository,
            manual_review_queue,
            payment_gateways,
            webhook_verifiers: Arc::new(webhook_verifiers),
            pricing,
            admin_api_key: None,
            expose_error_details: false,
        }
    }

    pub fn with_admin_api_key(mut self, key: SecretString) -> Self {
        self.admin_api_key = Some(Arc::new(key));
        self
    }

    pub fn with_error_details(mut self, expose: bool) -> Self {
        self.expose_error_details = expose;
        self
    }

    fn activator(&self) -> SubscriptionActivator {
        SubscriptionActivator::new(self.account_repository.clone())
    }

    /// Create handlers on demand from the shared state.
    pub fn create_order_handler(&self) -> CreateOrderHandler {
        CreateOrderHandler::new(
            self.account_repository.clone(),
            self.payment_gateways.clone(),
            self.pricing.clone(),
        )
    }

    pub fn verify_payment_handler(&self) -> VerifyPaymentHandler {
        VerifyPaymentHandler::new(
            self.payment_gateways.clone(),
            self.activator(),
            self.manual_review_queue.clone(),
        )
    }

    pub fn status_handler(&self) -> GetSubscriptionStatusHandler {
        GetSubscriptionStatusHandler::new(self.account_repository.clone())
    }

    pub fn monitor_handler(&self) -> GetSubscriptionMonitorHandler {
        GetSubscriptionMonitorHandler::new(self.account_repository.clone())
    }

    pub fn list_reviews_handler(&self) -> ListManualReviewsHandler {
        ListManualReviewsHandler::new(self.manual_review_queue.clone())
    }

    pub fn resolve_review_handler(&self) -> ResolveManualReviewHandler {
        ResolveManualReviewHandler::new(self.manual_review_queue.clone(), self.activator())
    }

    pub fn webhook_handler(&self) -> ProcessWebhookHandler {
        ProcessWebhookHandler::new(self.webhook_verifiers.clone(), self.activator())
    }

    fn api_error(&self, error: SubscriptionError) -> SubscriptionApiError {
        SubscriptionApiError::new(error, self.expose_error_details)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Caller Identity
// ════════════════════════════════════════════════════════════════════════════════

/// Authenticated account extracted from the request.
///
/// Session validation happens upstream; this layer trusts the account id
/// header the session layer sets.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedAccount {
    pub account_id: AccountId,
}

/// Rejection type for AuthenticatedAccount extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

impl<S> axum::extract::FromRequestParts<S> for AuthenticatedAccount
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let account_id = parts
                .headers
                .get(ACCOUNT_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<AccountId>().ok())
                .ok_or(AuthenticationRequired)?;

            Ok(AuthenticatedAccount { account_id })
        })
    }
}

/// Proof that the request carried the configured admin bearer key.
#[derive(Debug, Clone, Copy)]
pub struct AdminAccess;

/// Rejection type for AdminAccess extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAccessDenied {
    /// No admin key is configured; admin endpoints are off.
    Disabled,
    /// Missing or wrong bearer key.
    InvalidKey,
}

impl IntoResponse for AdminAccessDenied {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AdminAccessDenied::Disabled => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse::new("ADMIN_DISABLED", "Admin endpoints are not configured"),
            ),
            AdminAccessDenied::InvalidKey => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("UNAUTHORIZED", "Valid admin credentials are required"),
            ),
        };
        (status, Json(error)).into_response()
    }
}

/// Compares a presented bearer token against the configured key in constant time.
fn admin_key_matches(configured: &SecretString, presented: &str) -> bool {
    configured
        .expose_secret()
        .as_bytes()
        .ct_eq(presented.as_bytes())
        .into()
}

impl axum::extract::FromRequestParts<SubscriptionAppState> for AdminAccess {
    type Rejection = AdminAccessDenied;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        state: &'life1 SubscriptionAppState,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let configured = state
                .admin_api_key
                .as_deref()
                .ok_or(AdminAccessDenied::Disabled)?;

            let presented = parts
                .headers
                .get(axum::http::header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer "))
                .ok_or(AdminAccessDenied::InvalidKey)?;

            if !admin_key_matches(configured, presented.trim()) {
                tracing::warn!(target: "security", "Admin request with invalid key");
                return Err(AdminAccessDenied::InvalidKey);
            }

            Ok(AdminAccess)
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Account Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/subscription/orders - Create a payment order
pub async fn create_order(
    State(state): State<SubscriptionAppState>,
    caller: AuthenticatedAccount,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    let provider = required_field(request.provider, "provider")
        .and_then(|p| p.parse::<PaymentProvider>())
        .map_err(|e| state.api_error(e))?;

    let handler = state.create_order_handler();
    let cmd = CreateOrderCommand {
        account_id: caller.account_id,
        provider,
    };

    let result = handler.handle(cmd).await.map_err(|e| state.api_error(e))?;

    Ok((StatusCode::CREATED, Json(CreateOrderResponse::from(result))))
}

/// POST /api/subscription/verify - Verify a payment on client return
pub async fn verify_payment(
    State(state): State<SubscriptionAppState>,
    caller: AuthenticatedAccount,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    let order_id = required_field(request.order_id, "order_id").map_err(|e| state.api_error(e))?;
    let provider = required_field(request.provider, "provider")
        .and_then(|p| p.parse::<PaymentProvider>())
        .map_err(|e| state.api_error(e))?;

    let handler = state.verify_payment_handler();
    let cmd = VerifyPaymentCommand {
        account_id: caller.account_id,
        order_id,
        provider,
    };

    let result = handler.handle(cmd).await.map_err(|e| state.api_error(e))?;

    let status = match &result {
        VerifyPaymentResult::Activated { .. } => StatusCode::OK,
        VerifyPaymentResult::Pending { .. } => StatusCode::ACCEPTED,
        VerifyPaymentResult::Rejected { .. } => StatusCode::PAYMENT_REQUIRED,
    };

    Ok((status, Json(VerifyPaymentResponse::from(result))))
}

/// GET /api/subscription/status - Current subscription, with lazy expiry
pub async fn get_status(
    State(state): State<SubscriptionAppState>,
    caller: AuthenticatedAccount,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    let handler = state.status_handler();
    let query = GetSubscriptionStatusQuery {
        account_id: caller.account_id,
    };

    let snapshot = handler.handle(query).await.map_err(|e| state.api_error(e))?;

    Ok(Json(SubscriptionStatusResponse::from(snapshot)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Admin Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/admin/subscriptions/monitor - Aggregate subscription counts
pub async fn get_monitor(
    State(state): State<SubscriptionAppState>,
    _admin: AdminAccess,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    let overview = state
        .monitor_handler()
        .handle()
        .await
        .map_err(|e| state.api_error(e))?;

    Ok(Json(SubscriptionMonitorResponse::from(overview)))
}

/// GET /api/admin/subscriptions/manual-reviews - Payments awaiting confirmation
pub async fn list_manual_reviews(
    State(state): State<SubscriptionAppState>,
    _admin: AdminAccess,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    let reviews = state
        .list_reviews_handler()
        .handle()
        .await
        .map_err(|e| state.api_error(e))?;

    Ok(Json(ManualReviewListResponse {
        reviews: reviews.into_iter().map(ManualReviewResponse::from).collect(),
    }))
}

/// POST /api/admin/subscriptions/manual-reviews/:order_id/approve
pub async fn approve_manual_review(
    State(state): State<SubscriptionAppState>,
    _admin: AdminAccess,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    resolve_review(state, order_id, ReviewDecision::Approve).await
}

/// POST /api/admin/subscriptions/manual-reviews/:order_id/reject
pub async fn reject_manual_review(
    State(state): State<SubscriptionAppState>,
    _admin: AdminAccess,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    resolve_review(state, order_id, ReviewDecision::Reject).await
}

async fn resolve_review(
    state: SubscriptionAppState,
    order_id: String,
    decision: ReviewDecision,
) -> Result<Json<ResolveManualReviewResponse>, SubscriptionApiError> {
    let cmd = ResolveManualReviewCommand { order_id, decision };
    let result = state
        .resolve_review_handler()
        .handle(cmd)
        .await
        .map_err(|e| state.api_error(e))?;

    Ok(Json(ResolveManualReviewResponse::from(result)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Provider Webhooks
// ════════════════════════════════════════════════════════════════════════════════

/// Collects the signature headers of both schemes.
pub fn webhook_headers(headers: &HeaderMap) -> WebhookHeaders {
    WebhookHeaders {
        signature: headers.get(SIGNATURE_HEADER).map(|v| v.as_bytes().to_vec()),
        timestamp: headers
            .get(TIMESTAMP_HEADER)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned()),
        x_verify: headers.get(VERIFY_HEADER).map(|v| v.as_bytes().to_vec()),
    }
}

/// POST /api/webhooks/payments - Provider payment callbacks
///
/// The body is taken as raw bytes; signatures cover the exact bytes sent.
pub async fn handle_payment_webhook(
    State(state): State<SubscriptionAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let cmd = ProcessWebhookCommand {
        headers: webhook_headers(&headers),
        body: body.to_vec(),
    };

    let result = state.webhook_handler().handle(cmd).await?;

    Ok((StatusCode::OK, Json(WebhookAckResponse::from(&result))))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts subscription errors to HTTP responses.
#[derive(Debug)]
pub struct SubscriptionApiError {
    error: SubscriptionError,
    expose_details: bool,
}

impl SubscriptionApiError {
    pub fn new(error: SubscriptionError, expose_details: bool) -> Self {
        Self {
            error,
            expose_details,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match &self.error {
            SubscriptionError::AccountNotFound(_) | SubscriptionError::ReviewNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            SubscriptionError::InvalidOrderId { .. }
            | SubscriptionError::InvalidProvider(_)
            | SubscriptionError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            SubscriptionError::Forbidden { .. } => StatusCode::FORBIDDEN,
            SubscriptionError::InvalidState { .. } => StatusCode::CONFLICT,
            SubscriptionError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            SubscriptionError::OrderCreationFailed { .. }
            | SubscriptionError::AmbiguousProviderFailure { .. } => StatusCode::BAD_GATEWAY,
            SubscriptionError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SubscriptionError> for SubscriptionApiError {
    fn from(error: SubscriptionError) -> Self {
        Self::new(error, false)
    }
}

impl IntoResponse for SubscriptionApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = &self.error;

        match error {
            SubscriptionError::ProviderUnavailable(provider) => {
                tracing::error!(provider = %provider, "Payment provider not configured");
            }
            SubscriptionError::Infrastructure(msg) => {
                tracing::error!(error = %msg, "Subscription request failed");
            }
            SubscriptionError::OrderCreationFailed { provider, detail }
            | SubscriptionError::AmbiguousProviderFailure { provider, detail } => {
                tracing::warn!(provider = %provider, code = %error.code(), detail = %detail, "Provider call failed");
            }
            _ => {}
        }

        let mut body = ErrorResponse::new(error.code().to_string(), error.message());
        if matches!(
            error,
            SubscriptionError::OrderCreationFailed { .. }
                | SubscriptionError::AmbiguousProviderFailure { .. }
        ) {
            body = body.with_retryable(error.is_retryable());
        }
        if self.expose_details {
            if let Some(detail) = error.detail() {
                body = body.with_details(detail);
            }
        }

        (status, Json(body)).into_response()
    }
}

/// Webhook error wrapper. Status codes steer provider redelivery.
#[derive(Debug)]
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Webhook processing failed, provider will retry");
        }

        let body = ErrorResponse::new(self.0.code(), self.0.to_string());
        (status, Json(body)).into_response()
    }
}
