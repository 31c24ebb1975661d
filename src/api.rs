use actix_web::{web, HttpResponse, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};

use crate::config::PortalConfig;
use crate::history::AttemptLog;
use crate::report;
use crate::session;

#[derive(Clone)]
pub struct AppState {
    pub config: PortalConfig,
    pub history: Arc<Mutex<AttemptLog>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutsRequest {
    pub userid: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RenewRequest {
    pub userid: String,
    pub password: String,
    pub item_id: i64,
}

pub async fn health_check() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "koha-opac-client"
    })))
}

pub async fn checkouts_handler(
    state: web::Data<AppState>,
    req: web::Json<CheckoutsRequest>,
) -> Result<HttpResponse> {
    log::info!("Checkout listing requested for user {}", req.userid);

    let report = match session::get_book_info(&state.config, &req.userid, &req.password).await {
        Ok(report) => report,
        Err(e) => {
            log::error!("Checkout listing failed: {}", e);
            report::error(&format!("Checkout listing failed: {}", e))
        }
    };

    record_attempt(&state, &req.userid, "login", &report, None);
    Ok(HttpResponse::Ok().json(report))
}

pub async fn renew_handler(
    state: web::Data<AppState>,
    req: web::Json<RenewRequest>,
) -> Result<HttpResponse> {
    log::info!(
        "Renewal of item {} requested for user {}",
        req.item_id,
        req.userid
    );

    let report =
        match session::renew_book(&state.config, &req.userid, &req.password, req.item_id).await {
            Ok(report) => report,
            Err(e) => {
                log::error!("Renewal failed: {}", e);
                report::error(&format!("Renewal failed: {}", e))
            }
        };

    record_attempt(&state, &req.userid, "renew", &report, Some(req.item_id));
    Ok(HttpResponse::Ok().json(report))
}

pub async fn history_handler(state: web::Data<AppState>) -> Result<HttpResponse> {
    match state.history.lock().unwrap().recent(50) {
        Ok(records) => Ok(HttpResponse::Ok().json(records)),
        Err(e) => {
            log::error!("Failed to read history: {}", e);
            Ok(HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to read history"
            })))
        }
    }
}

pub async fn clear_history_handler(state: web::Data<AppState>) -> Result<HttpResponse> {
    match state.history.lock().unwrap().clear() {
        Ok(removed) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "History cleared",
            "removed": removed
        }))),
        Err(e) => {
            log::error!("Failed to clear history: {}", e);
            Ok(HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to clear history"
            })))
        }
    }
}

fn record_attempt(state: &AppState, userid: &str, action: &str, report: &Value, item_id: Option<i64>) {
    let outcome = report
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    if let Err(e) = state
        .history
        .lock()
        .unwrap()
        .record(userid, action, outcome, item_id)
    {
        log::warn!("Failed to record {} attempt: {}", action, e);
    }
}
