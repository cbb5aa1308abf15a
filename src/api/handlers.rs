//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};

use super::AppState;
use super::types::{BacktestQuery, DispatchQuery, DispatchResponse, ErrorResponse};
use crate::devices::GenerationEstimate;
use crate::error::DispatchError;
use crate::market::{MarketSnapshot, SourceError};
use crate::report::{BacktestSummary, DashboardReport};
use crate::sim::{LookbackWindow, dispatch};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: message.into() }))
}

fn from_dispatch(err: DispatchError) -> ApiError {
    let status = match err {
        DispatchError::AccessDenied => StatusCode::UNAUTHORIZED,
        DispatchError::InvalidObservation { .. } => StatusCode::BAD_REQUEST,
        DispatchError::InvalidConfiguration { .. } | DispatchError::UnorderedSeries { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    };
    error(status, err.to_string())
}

fn from_source(err: SourceError) -> ApiError {
    error(StatusCode::SERVICE_UNAVAILABLE, err.to_string())
}

/// Fetches a snapshot on the blocking pool; sources may read files.
async fn fetch_snapshot(state: &Arc<AppState>) -> Result<MarketSnapshot, ApiError> {
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || state.source.fetch())
        .await
        .map_err(|e| {
            error(StatusCode::INTERNAL_SERVER_ERROR, format!("snapshot task failed: {e}"))
        })?
        .map_err(from_source)
}

/// Checks the session and fetches a snapshot.
async fn authorize_and_fetch(
    state: &Arc<AppState>,
    headers: &HeaderMap,
) -> Result<MarketSnapshot, ApiError> {
    state.session(headers).require().map_err(from_dispatch)?;
    fetch_snapshot(state).await
}

/// Returns the full dashboard report.
///
/// `GET /report` → 200 + `DashboardReport` JSON, 401 without a valid password
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<DashboardReport>, ApiError> {
    let session = state.session(&headers);
    session.require().map_err(from_dispatch)?;
    let snapshot = fetch_snapshot(&state).await?;
    DashboardReport::evaluate(&session, &state.config, &snapshot)
        .map(Json)
        .map_err(from_dispatch)
}

/// Evaluates the dispatch policy at a what-if price with current weather.
///
/// `GET /dispatch?price=-12.5` → 200 + `DispatchResponse` JSON
/// `GET /dispatch` or `?price=abc` → 400 + `ErrorResponse`
pub async fn get_dispatch(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<DispatchQuery>,
) -> Result<Json<DispatchResponse>, ApiError> {
    let snapshot = authorize_and_fetch(&state, &headers).await?;
    let raw = query
        .price
        .ok_or_else(|| error(StatusCode::BAD_REQUEST, "missing `price` query parameter"))?;
    let price: f64 = raw.trim().parse().map_err(|_| {
        error(StatusCode::BAD_REQUEST, format!("`price` \"{raw}\" is not a number"))
    })?;

    let config = &state.config;
    let breakeven = config.economics.breakeven().map_err(from_dispatch)?;
    let generation =
        GenerationEstimate::estimate(&snapshot.weather, &config.plant).map_err(from_dispatch)?;
    let result =
        dispatch(price, breakeven, generation.total_mw(), &config.plant).map_err(from_dispatch)?;

    Ok(Json(DispatchResponse {
        price_usd_per_mwh: price,
        breakeven,
        generation_mw: generation.total_mw(),
        total_usd_per_hr: result.total_usd_per_hr(),
        result,
    }))
}

/// Runs the state-of-charge backtest over a trailing window.
///
/// `GET /backtest?window=7d` → 200 + `BacktestSummary` JSON
/// `GET /backtest?window=soon` → 400 + `ErrorResponse`
pub async fn get_backtest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BacktestQuery>,
) -> Result<Json<BacktestSummary>, ApiError> {
    let snapshot = authorize_and_fetch(&state, &headers).await?;
    let window = query
        .window
        .as_deref()
        .map(str::parse::<LookbackWindow>)
        .transpose()
        .map_err(|e| error(StatusCode::BAD_REQUEST, e))?;

    let config = &state.config;
    let breakeven = config.economics.breakeven().map_err(from_dispatch)?;
    let generation =
        GenerationEstimate::estimate(&snapshot.weather, &config.plant).map_err(from_dispatch)?;
    let points = match window {
        Some(w) => snapshot.history.trailing(w),
        None => snapshot.history.points(),
    };
    BacktestSummary::run(config, breakeven, generation.total_mw(), points, window)
        .map(Json)
        .map_err(from_dispatch)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{TimeDelta, TimeZone, Utc};
    use tower::util::ServiceExt;

    use super::*;
    use crate::api::{PASSWORD_HEADER, router};
    use crate::config::ScenarioConfig;
    use crate::devices::WeatherObservation;
    use crate::market::{SnapshotSource, StaticSource};
    use crate::sim::{PricePoint, PriceSeries};

    fn make_test_state(password: Option<&str>) -> Arc<AppState> {
        let mut config = ScenarioConfig::west_texas();
        config.access.password = password.map(str::to_string);
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let points = (0..72)
            .map(|i| {
                let price = if i % 3 == 0 { -5.0 } else { 120.0 };
                PricePoint::new(start + TimeDelta::hours(i), price)
            })
            .collect();
        let snapshot = MarketSnapshot {
            price_usd_per_mwh: 42.0,
            weather: WeatherObservation::new(500.0, 21.6),
            history: PriceSeries::new(points).unwrap(),
        };
        Arc::new(AppState::new(config, StaticSource(snapshot)))
    }

    async fn get(
        state: Arc<AppState>,
        uri: &str,
        password: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        let mut req = Request::builder().uri(uri);
        if let Some(p) = password {
            req = req.header(PASSWORD_HEADER, p);
        }
        let resp = router(state).oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn report_returns_200() {
        let (status, json) = get(make_test_state(None), "/report", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["live"]["state"], "LOW");
        assert_eq!(json["periods"].as_array().map(Vec::len), Some(3));
        assert!(json.get("backtest").is_some());
        assert!(json["backtest"].get("steps").is_none());
    }

    #[tokio::test]
    async fn report_requires_password_when_configured() {
        let state = make_test_state(Some("1234"));
        let (status, json) = get(state.clone(), "/report", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(json.get("error").is_some());

        let (status, _) = get(state.clone(), "/report", Some("wrong")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = get(state, "/report", Some("1234")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn dispatch_at_negative_price() {
        let (status, json) = get(make_test_state(None), "/dispatch?price=-10", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["result"]["state"], "NEGATIVE");
        assert_eq!(json["price_usd_per_mwh"], -10.0);
    }

    #[tokio::test]
    async fn dispatch_without_price_returns_400() {
        let (status, json) = get(make_test_state(None), "/dispatch", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json.get("error").is_some());
    }

    #[tokio::test]
    async fn dispatch_with_garbage_price_returns_400() {
        let (status, _) = get(make_test_state(None), "/dispatch?price=cheap", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = get(make_test_state(None), "/dispatch?price=NaN", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn backtest_window_limits_points() {
        let (status, json) = get(make_test_state(None), "/backtest?window=24h", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["window"], "24h");
        assert_eq!(json["kpi"]["points"], 24);

        let (_, json) = get(make_test_state(None), "/backtest", None).await;
        assert!(json["window"].is_null());
        assert_eq!(json["kpi"]["points"], 72);
    }

    #[tokio::test]
    async fn backtest_window_beyond_time_range_returns_400() {
        let (status, json) =
            get(make_test_state(None), "/backtest?window=3000000000h", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().is_some_and(|e| e.contains("between 1h and")));

        let (status, json) = get(make_test_state(None), "/backtest?window=36525d", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["kpi"]["points"], 72);
    }

    /// Drives a nested `block_on`, which panics on an async worker thread.
    struct RuntimeBlockingSource(MarketSnapshot);

    impl SnapshotSource for RuntimeBlockingSource {
        fn fetch(&self) -> Result<MarketSnapshot, SourceError> {
            let snapshot = self.0.clone();
            Ok(tokio::runtime::Handle::current().block_on(async move { snapshot }))
        }
    }

    #[tokio::test]
    async fn sources_are_fetched_off_the_async_worker() {
        let snapshot = MarketSnapshot {
            price_usd_per_mwh: 150.0,
            ..MarketSnapshot::fallback()
        };
        let state = Arc::new(AppState::new(
            ScenarioConfig::west_texas(),
            RuntimeBlockingSource(snapshot),
        ));
        let (status, json) = get(state.clone(), "/report", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["live"]["state"], "HIGH");
        let (status, _) = get(state, "/dispatch?price=10", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn backtest_invalid_window_returns_400() {
        let (status, json) = get(make_test_state(None), "/backtest?window=soon", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json.get("error").is_some());
    }
}
