use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::postgres::PgPool;

use crate::error::AppError;
use crate::model::{CurrencyPair, DailyRatePayload, NewObservation, PairPayload, TrackPayload, parse_date};
use crate::observations::ObservationStore;
use crate::registry::{Page, PairRegistry};
use crate::tracker::RateTracker;

/// Components sharing the one storage pool of the process.
#[derive(Debug, Clone)]
pub struct AppState {
    pub registry: PairRegistry,
    pub observations: ObservationStore,
    pub tracker: RateTracker,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        Self {
            registry: PairRegistry::new(pool.clone()),
            observations: ObservationStore::new(pool.clone()),
            tracker: RateTracker::new(pool),
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| {
        AppError::validation(format!("Invalid request payload: {}", err)).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _| {
        AppError::validation(format!("Invalid id: {}", err)).into()
    }))
    .service(web::resource("/rates").route(web::get().to(list_pairs)))
    .service(
        web::resource("/rate")
            .route(web::post().to(create_pair))
            .route(web::delete().to(delete_pair_by_codes)),
    )
    .service(web::resource("/rate/daily").route(web::post().to(record_daily)))
    .service(web::resource("/rate/track").route(web::post().to(track)))
    .service(
        web::resource("/rate/{id}")
            .route(web::get().to(get_pair))
            .route(web::put().to(update_pair))
            .route(web::delete().to(delete_pair)),
    )
    .service(web::resource("/rate/{id}/daily").route(web::get().to(pair_history)));
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(alias = "offset")]
    start: Option<String>,
    #[serde(alias = "limit")]
    count: Option<String>,
}

fn success() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "result": "success" }))
}

async fn list_pairs(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let page = Page::from_query(query.start.as_deref(), query.count.as_deref());
    let pairs = state.registry.list(page).await?;
    Ok(HttpResponse::Ok().json(pairs))
}

async fn get_pair(state: web::Data<AppState>, id: web::Path<i64>) -> Result<HttpResponse, AppError> {
    let pair = state.registry.get(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(pair))
}

async fn create_pair(
    state: web::Data<AppState>,
    payload: web::Json<PairPayload>,
) -> Result<HttpResponse, AppError> {
    let pair = CurrencyPair::try_from(payload.into_inner())?;
    let created = state.registry.create(&pair).await?;
    Ok(HttpResponse::Created().json(created))
}

async fn update_pair(
    state: web::Data<AppState>,
    id: web::Path<i64>,
    payload: web::Json<PairPayload>,
) -> Result<HttpResponse, AppError> {
    let pair = CurrencyPair::try_from(payload.into_inner())?;
    let updated = state.registry.update(id.into_inner(), &pair).await?;
    Ok(HttpResponse::Ok().json(updated))
}

async fn delete_pair(state: web::Data<AppState>, id: web::Path<i64>) -> Result<HttpResponse, AppError> {
    state.registry.delete(id.into_inner()).await?;
    Ok(success())
}

async fn delete_pair_by_codes(
    state: web::Data<AppState>,
    payload: web::Json<PairPayload>,
) -> Result<HttpResponse, AppError> {
    let pair = CurrencyPair::try_from(payload.into_inner())?;
    state.registry.delete_by_pair(&pair).await?;
    Ok(success())
}

async fn pair_history(
    state: web::Data<AppState>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let pair = state.registry.get(id.into_inner()).await?;
    let observations = state.observations.for_pair(pair.id).await?;
    Ok(HttpResponse::Ok().json(observations))
}

async fn record_daily(
    state: web::Data<AppState>,
    payload: web::Json<DailyRatePayload>,
) -> Result<HttpResponse, AppError> {
    let observation = NewObservation::try_from(payload.into_inner())?;
    state.observations.upsert(&observation).await?;
    Ok(HttpResponse::Created().json(observation))
}

async fn track(
    state: web::Data<AppState>,
    payload: web::Json<TrackPayload>,
) -> Result<HttpResponse, AppError> {
    let date = parse_date(&payload.date)?;
    let rows = state.tracker.track(date).await?;
    Ok(HttpResponse::Ok().json(rows))
}
