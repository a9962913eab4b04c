//! REST API routes.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use route_core::{
    route_between, ClassifierStats, Coordinate, GraphPath, GraphStats, PathSegment, RouteError,
    RouteResult, TerrainCategory, TravelMode, TravelTimeResult,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::ApiError;
use crate::state::AppState;

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/v1/routes", post(find_route))
        .route("/v1/travel-times", post(travel_times))
        .route("/v1/travel-modes", get(list_travel_modes))
        .route("/v1/terrain", get(probe_terrain))
        .route("/v1/roads", get(road_status))
        .route("/v1/roads/reload", post(reload_roads))
        .route("/v1/roads/cache", delete(clear_road_cache))
        .route("/v1/roads/path", post(road_path))
}

fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn validate(coordinates: &[Coordinate]) -> Result<(), ApiError> {
    for coordinate in coordinates {
        coordinate
            .validate()
            .map_err(|err| ApiError::BadRequest(err.to_string()))?;
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    pub start: Coordinate,
    pub end: Coordinate,
}

#[derive(Debug, Serialize)]
pub struct RouteResponse {
    #[serde(flatten)]
    pub route: RouteResult,
    pub travel_times: Vec<TravelTimeResult>,
}

async fn find_route(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RouteRequest>, JsonRejection>,
) -> Result<Json<RouteResponse>, ApiError> {
    let request = parse_body(payload)?;
    validate(&[request.start, request.end])?;

    let mut pathfinder = state.pathfinder().lock().await;
    let route = pathfinder.find_route(request.start, request.end).await;
    let travel_times = if route.success {
        pathfinder.estimate_all(&route)
    } else {
        Vec::new()
    };
    Ok(Json(RouteResponse {
        route,
        travel_times,
    }))
}

#[derive(Debug, Deserialize)]
pub struct TravelTimesRequest {
    pub land_distance_km: f64,
    pub water_distance_km: f64,
    /// Single mode to evaluate, infeasible results included.
    #[serde(default)]
    pub mode: Option<String>,
}

impl TravelTimesRequest {
    fn as_route(&self) -> RouteResult {
        let segment = |category, distance_km| PathSegment {
            category,
            coordinates: Vec::new(),
            distance_km,
        };
        RouteResult::from_segments(
            Vec::new(),
            vec![
                segment(TerrainCategory::Land, self.land_distance_km),
                segment(TerrainCategory::Water, self.water_distance_km),
            ],
        )
    }
}

async fn travel_times(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TravelTimesRequest>, JsonRejection>,
) -> Result<Json<Vec<TravelTimeResult>>, ApiError> {
    let request = parse_body(payload)?;
    let distances = [request.land_distance_km, request.water_distance_km];
    if distances.iter().any(|d| !d.is_finite() || *d < 0.0) {
        return Err(ApiError::BadRequest(
            "distances must be finite and non-negative".to_string(),
        ));
    }

    let route = request.as_route();
    let estimator = state.estimator();
    match request.mode.as_deref() {
        Some(id) => {
            let mode = estimator
                .mode(id)
                .ok_or_else(|| ApiError::NotFound(format!("unknown travel mode '{}'", id)))?;
            Ok(Json(vec![estimator.estimate(&route, mode)]))
        }
        None => Ok(Json(estimator.estimate_all(&route))),
    }
}

async fn list_travel_modes(State(state): State<Arc<AppState>>) -> Json<Vec<TravelMode>> {
    Json(state.travel_modes().to_vec())
}

#[derive(Debug, Deserialize)]
pub struct TerrainQuery {
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Serialize)]
pub struct TerrainResponse {
    pub coordinate: Coordinate,
    pub category: TerrainCategory,
    pub fallback_category: TerrainCategory,
    pub classifier: ClassifierStats,
}

async fn probe_terrain(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TerrainQuery>,
) -> Result<Json<TerrainResponse>, ApiError> {
    let coordinate = Coordinate::new(query.lon, query.lat);
    validate(&[coordinate])?;

    let mut pathfinder = state.pathfinder().lock().await;
    let category = pathfinder.classify_point(coordinate);
    Ok(Json(TerrainResponse {
        coordinate,
        category,
        fallback_category: pathfinder.classifier().classify_fallback(coordinate),
        classifier: pathfinder.classifier().stats(),
    }))
}

#[derive(Debug, Serialize)]
pub struct RoadStatus {
    pub loaded: bool,
    pub stats: GraphStats,
}

async fn road_status(State(state): State<Arc<AppState>>) -> Json<RoadStatus> {
    let roads = state.roads().read().await;
    Json(RoadStatus {
        loaded: roads.is_loaded(),
        stats: roads.graph().stats(),
    })
}

async fn reload_roads(State(state): State<Arc<AppState>>) -> Result<Json<RoadStatus>, ApiError> {
    let mut roads = state.roads().write().await;
    let stats = roads.reload(state.map().as_ref()).await.map_err(|err| match err {
        RouteError::MapUnavailable => ApiError::Unavailable(err.to_string()),
        other => ApiError::Internal(other.to_string()),
    })?;
    Ok(Json(RoadStatus {
        loaded: roads.is_loaded(),
        stats,
    }))
}

async fn clear_road_cache(State(state): State<Arc<AppState>>) -> Result<StatusCode, ApiError> {
    let roads = state.roads().read().await;
    roads
        .clear_cache()
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct RoadPathRequest {
    pub start: Coordinate,
    pub end: Coordinate,
    #[serde(default)]
    pub max_snap_km: Option<f64>,
}

async fn road_path(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RoadPathRequest>, JsonRejection>,
) -> Result<Json<GraphPath>, ApiError> {
    let request = parse_body(payload)?;
    validate(&[request.start, request.end])?;

    let roads = state.roads().read().await;
    if !roads.is_loaded() {
        return Err(ApiError::Unavailable("road network is not loaded".to_string()));
    }
    let max_snap_km = request
        .max_snap_km
        .filter(|km| km.is_finite() && *km > 0.0)
        .unwrap_or(state.config().road_snap_km);
    route_between(roads.graph(), request.start, request.end, max_snap_km)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("no road path between the given points".to_string()))
}
