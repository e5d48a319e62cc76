//! HTTP处理器

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use hqms_core::{
    CheckInRequest, Department, EntryFilter, EntryPatch, HqmsError, QueueStatus,
};
use hqms_queue::{CallOutcome, QueueEngine};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// 共享应用状态
pub type AppState = Arc<tokio::sync::RwLock<QueueEngine>>;

/// HTTP错误包装，把统一错误映射到状态码
pub struct ApiError(pub HqmsError);

impl From<HqmsError> for ApiError {
    fn from(err: HqmsError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            HqmsError::Validation(_) => StatusCode::BAD_REQUEST,
            HqmsError::NotFound(_) => StatusCode::NOT_FOUND,
            HqmsError::InvalidStateTransition { .. } => StatusCode::CONFLICT,
            HqmsError::Announcement(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": true,
            "message": self.0.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// API根路径处理器
pub async fn api_root() -> impl IntoResponse {
    Json(json!({
        "service": "HQMS Queue API",
        "version": "1.0.0",
        "status": "running",
        "endpoints": {
            "health": "/health",
            "api": "/api/v1",
            "display": "/api/v1/display"
        }
    }))
}

/// 健康检查处理器
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": "1.0.0"
    }))
}

/// 队列查询参数
#[derive(Debug, Deserialize)]
pub struct QueueQueryParams {
    pub department: Option<Department>,
    pub status: Option<QueueStatus>,
    /// true 时按调度顺序返回
    pub ranked: Option<bool>,
}

impl QueueQueryParams {
    fn filter(&self) -> EntryFilter {
        EntryFilter {
            department: self.department,
            statuses: self.status.map(|s| vec![s]),
        }
    }
}

/// 队列查询处理器
pub async fn list_queue(
    State(state): State<AppState>,
    Query(params): Query<QueueQueryParams>,
) -> ApiResult<impl IntoResponse> {
    info!("Listing queue with query: {:?}", params);

    let engine = state.read().await;
    let filter = params.filter();
    let entries = if params.ranked.unwrap_or(false) {
        engine.list_ranked(&filter).await
    } else {
        engine.list(&filter).await
    };

    let total = entries.len();
    Ok(Json(json!({
        "entries": entries,
        "total": total
    })))
}

/// 患者签到处理器
pub async fn check_in(
    State(state): State<AppState>,
    Json(draft): Json<CheckInRequest>,
) -> ApiResult<impl IntoResponse> {
    let engine = state.read().await;
    let entry = engine.check_in(draft).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// 条目补丁请求体（仅非生命周期字段）
#[derive(Debug, Deserialize)]
pub struct AmendBody {
    pub patient_id: Option<String>,
    pub assigned_staff: Option<String>,
    pub notes: Option<String>,
}

/// 条目修订处理器
pub async fn amend_entry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AmendBody>,
) -> ApiResult<impl IntoResponse> {
    let engine = state.read().await;
    let entry = engine
        .amend(
            id,
            EntryPatch {
                patient_id: body.patient_id,
                assigned_staff: body.assigned_staff,
                notes: body.notes,
                ..Default::default()
            },
        )
        .await?;
    Ok(Json(entry))
}

/// 开始服务处理器
pub async fn start_service(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let engine = state.read().await;
    let entry = engine.start_service(id).await?;
    Ok(Json(entry))
}

/// 完成服务处理器
pub async fn complete_service(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let engine = state.read().await;
    let entry = engine.complete_service(id).await?;
    Ok(Json(entry))
}

/// 取消处理器（操作员确认发生在前端）
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let engine = state.read().await;
    let entry = engine.cancel(id).await?;
    Ok(Json(entry))
}

/// 叫号请求体
#[derive(Debug, Deserialize)]
pub struct CallNextBody {
    pub department: Department,
}

/// 叫号处理器
pub async fn call_next(
    State(state): State<AppState>,
    Json(body): Json<CallNextBody>,
) -> ApiResult<impl IntoResponse> {
    // 叫号修改协调器内部历史，需要写锁
    let mut engine = state.write().await;
    let outcome = engine.call_next(body.department).await?;

    let response = match outcome {
        CallOutcome::Called(entry) => json!({
            "called": true,
            "entry": entry
        }),
        CallOutcome::NothingToCall => json!({
            "called": false,
            "message": format!("No waiting patients for {}", body.department)
        }),
    };
    Ok(Json(response))
}

/// 统计查询处理器
pub async fn stats(
    State(state): State<AppState>,
    Query(params): Query<QueueQueryParams>,
) -> ApiResult<impl IntoResponse> {
    let engine = state.read().await;
    let stats = engine.stats(&params.filter()).await;
    Ok(Json(stats))
}

/// 最近叫号历史处理器
pub async fn recently_called(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let engine = state.read().await;
    Ok(Json(engine.recently_called()))
}

/// 大屏视图处理器
pub async fn display_board(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let engine = state.read().await;
    Ok(Json(engine.display_board().await))
}
