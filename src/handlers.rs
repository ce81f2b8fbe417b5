use crate::dates::parse_delivery_date;
use crate::errors::AppError;
use crate::extract::{AppJson, AppQuery};
use crate::models::{
    AggregationResult, ApiResponse, Driver, NewShipment, ShipmentRecord, ShipmentUpdate,
    ViewerContext, ViewerRole,
};
use crate::query::ShipmentQuery;
use crate::state::AppState;
use crate::stats::aggregate;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{Local, NaiveDate};
use serde_json::Map;
use tracing::info;

pub const ROLE_HEADER: &str = "x-viewer-role";
pub const NAME_HEADER: &str = "x-viewer-name";

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

pub async fn get_dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppQuery(query): AppQuery<ShipmentQuery>,
) -> ApiResult<AggregationResult> {
    let filter = query.to_filter()?;
    let viewer = viewer_from_headers(&headers);
    let records = state.shipments(&filter).await;
    Ok(Json(ApiResponse::data(aggregate(&records, &viewer))))
}

/// Lists stored shipments narrowed by the query only; not scoped to the viewer.
pub async fn list_shipments(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ShipmentQuery>,
) -> ApiResult<Vec<ShipmentRecord>> {
    let filter = query.to_filter()?;
    Ok(Json(ApiResponse::data(state.shipments(&filter).await)))
}

pub async fn add_shipment(
    State(state): State<AppState>,
    AppJson(payload): AppJson<NewShipment>,
) -> Result<(StatusCode, Json<ApiResponse<ShipmentRecord>>), AppError> {
    let submit_id = required(&payload.submit_id, "submitId")?;
    let driver_name = required(&payload.driver_name, "driverName")?;
    let delivery_date = delivery_date(&payload.delivery_date)?;
    check_counts(payload.store_count, payload.delivered_count)?;

    let record = ShipmentRecord {
        submit_id,
        submit_date: payload
            .submit_date
            .unwrap_or_else(|| Local::now().date_naive().to_string()),
        driver_id: payload.driver_id.trim().to_string(),
        driver_name,
        delivery_date: delivery_date.to_string(),
        shipment_code: payload.shipment_code.trim().to_string(),
        store_count: payload.store_count,
        delivered_count: payload.delivered_count,
        failed_count: payload.store_count - payload.delivered_count,
        failure_reason: payload.failure_reason,
        extra: Map::new(),
    };

    let saved = state
        .update(|data| {
            if data
                .shipments
                .iter()
                .any(|existing| existing.submit_id == record.submit_id)
            {
                return Err(AppError::conflict(format!(
                    "shipment {} already exists",
                    record.submit_id
                )));
            }
            data.shipments.push(record.clone());
            Ok(record)
        })
        .await?;

    info!(submit_id = %saved.submit_id, driver = %saved.driver_name, "shipment added");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Shipment saved", saved)),
    ))
}

pub async fn update_shipment(
    State(state): State<AppState>,
    Path(submit_id): Path<String>,
    AppJson(payload): AppJson<ShipmentUpdate>,
) -> ApiResult<ShipmentRecord> {
    let delivery_date = delivery_date(&payload.delivery_date)?;
    check_counts(payload.store_count, payload.delivered_count)?;

    let updated = state
        .update(|data| {
            let record = data
                .shipments
                .iter_mut()
                .find(|record| record.submit_id == submit_id)
                .ok_or_else(|| AppError::not_found(format!("shipment {submit_id} not found")))?;

            record.delivery_date = delivery_date.to_string();
            record.shipment_code = payload.shipment_code.trim().to_string();
            record.store_count = payload.store_count;
            record.delivered_count = payload.delivered_count;
            record.failed_count = payload.store_count - payload.delivered_count;
            record.failure_reason = payload.failure_reason;
            Ok(record.clone())
        })
        .await?;

    info!(submit_id = %updated.submit_id, "shipment updated");
    Ok(Json(ApiResponse::with_message("Shipment updated", updated)))
}

pub async fn delete_shipment(
    State(state): State<AppState>,
    Path(submit_id): Path<String>,
) -> ApiResult<()> {
    state
        .update(|data| {
            let before = data.shipments.len();
            data.shipments.retain(|record| record.submit_id != submit_id);
            if data.shipments.len() == before {
                return Err(AppError::not_found(format!("shipment {submit_id} not found")));
            }
            Ok(())
        })
        .await?;

    info!(%submit_id, "shipment deleted");
    Ok(Json(ApiResponse::message("Shipment deleted")))
}

pub async fn list_drivers(State(state): State<AppState>) -> ApiResult<Vec<Driver>> {
    let data = state.data.lock().await;
    Ok(Json(ApiResponse::data(data.drivers.clone())))
}

/// Adds a driver, or replaces the one already stored under the same id.
pub async fn upsert_driver(
    State(state): State<AppState>,
    AppJson(payload): AppJson<Driver>,
) -> ApiResult<Driver> {
    let driver_id = required(&payload.driver_id, "driverId")?;
    let name = required(&payload.name, "name")?;
    let driver = Driver {
        driver_id,
        name,
        ..payload
    };

    let saved = state
        .update(|data| {
            match data
                .drivers
                .iter_mut()
                .find(|existing| existing.driver_id == driver.driver_id)
            {
                Some(existing) => *existing = driver.clone(),
                None => data.drivers.push(driver.clone()),
            }
            Ok(driver)
        })
        .await?;

    info!(driver_id = %saved.driver_id, "driver saved");
    Ok(Json(ApiResponse::with_message("Driver saved", saved)))
}

pub async fn delete_driver(
    State(state): State<AppState>,
    Path(driver_id): Path<String>,
) -> ApiResult<()> {
    state
        .update(|data| {
            let before = data.drivers.len();
            data.drivers.retain(|driver| driver.driver_id != driver_id);
            if data.drivers.len() == before {
                return Err(AppError::not_found(format!("driver {driver_id} not found")));
            }
            Ok(())
        })
        .await?;

    info!(%driver_id, "driver deleted");
    Ok(Json(ApiResponse::message("Driver deleted")))
}

/// Builds the viewer from the headers set by the session layer. A missing
/// role header counts as an unrecognized role.
pub fn viewer_from_headers(headers: &HeaderMap) -> ViewerContext {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    ViewerContext {
        role: header(ROLE_HEADER)
            .map(ViewerRole::parse)
            .unwrap_or(ViewerRole::Unrecognized),
        display_name: header(NAME_HEADER).map(str::to_string),
    }
}

fn required(value: &str, field: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::bad_request(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn delivery_date(raw: &str) -> Result<NaiveDate, AppError> {
    parse_delivery_date(raw)
        .ok_or_else(|| AppError::bad_request("deliveryDate must be a date (YYYY-MM-DD)"))
}

fn check_counts(store: u64, delivered: u64) -> Result<(), AppError> {
    if delivered > store {
        return Err(AppError::bad_request(
            "deliveredCount cannot exceed storeCount",
        ));
    }
    Ok(())
}
