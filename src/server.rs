// 🌐 HTTP boundary - dashboard endpoints over the aggregation engine
//
// Identity comes from the X-User-ID header set by the upstream identity
// gateway. Engine errors map to status codes here and nowhere else.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

use crate::analytics::{AnalyticsEngine, DashboardAnalytics, RollingPoint, YearOverYear};
use crate::error::AnalyticsError;
use crate::filter::{parse_window, AnalyticsFilter, FilterParams};
use crate::models::UserId;

pub const USER_ID_HEADER: &str = "X-User-ID";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: AnalyticsEngine,
}

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

impl IntoResponse for AnalyticsError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AnalyticsError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            AnalyticsError::InvalidFilter { .. } => (StatusCode::BAD_REQUEST, self.to_string()),
            AnalyticsError::StoreUnavailable(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        if status.is_server_error() {
            error!(error = %self, "Dashboard request failed");
        } else {
            warn!(error = %self, status = status.as_u16(), "Dashboard request rejected");
        }

        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

// ============================================================================
// Identity
// ============================================================================

/// A caller whose identity resolved to a known user
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub UserId);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AnalyticsError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok());

        let user_id = state.engine.resolve_identity(raw).await?;
        debug!(user_id = %user_id, "Resolved caller identity");

        Ok(AuthenticatedUser(user_id))
    }
}

// ============================================================================
// API Handlers
// ============================================================================

type ApiResult<T> = Result<Json<ApiResponse<T>>, AnalyticsError>;

/// GET /health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /dashboard/analytics - Category trends + summary
async fn dashboard_analytics(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Query(params): Query<FilterParams>,
) -> ApiResult<DashboardAnalytics> {
    let filter = AnalyticsFilter::from_params(&params)?;
    let analytics = state.engine.dashboard(&user_id, &filter).await?;
    Ok(Json(ApiResponse::ok(analytics)))
}

/// GET /dashboard/categories - Distinct category labels
async fn dashboard_categories(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> ApiResult<Vec<String>> {
    let categories = state.engine.categories(&user_id).await?;
    Ok(Json(ApiResponse::ok(categories)))
}

/// GET /dashboard/rolling-average?category=&window= - Rolling average series
async fn rolling_average(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Query(params): Query<FilterParams>,
) -> ApiResult<Vec<RollingPoint>> {
    let filter = AnalyticsFilter::from_params(&params)?;
    let window = parse_window(params.window.as_deref())?;
    let series = state.engine.rolling_average(&user_id, &filter, window).await?;
    Ok(Json(ApiResponse::ok(series)))
}

/// GET /dashboard/year-over-year - Year-aligned series per category
async fn year_over_year(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Query(params): Query<FilterParams>,
) -> ApiResult<Vec<YearOverYear>> {
    let filter = AnalyticsFilter::from_params(&params)?;
    let series = state.engine.year_over_year(&user_id, &filter).await?;
    Ok(Json(ApiResponse::ok(series)))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/dashboard/analytics", get(dashboard_analytics))
        .route("/dashboard/categories", get(dashboard_categories))
        .route("/dashboard/rolling-average", get(rolling_average))
        .route("/dashboard/year-over-year", get(year_over_year))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
