// src/api/handlers/dashboard.rs
use actix_web::{
    web::{self, Data},
    HttpResponse,
};
use tracing::{error, info};

use crate::api::types::{
    ApiError, ApiResult, RefreshResponse, TransactionsResponse, VerificationResponse,
};
use crate::core::dashboard::Dashboard;

/// Dashboard routes sit directly under the API root.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/verification").route(web::get().to(get_verification)))
        .service(web::resource("/transactions").route(web::get().to(get_transactions)))
        .service(web::resource("/dashboard/refresh").route(web::post().to(refresh)));
}

async fn get_verification(dashboard: Data<Dashboard>) -> ApiResult {
    let submission = dashboard.submission_view().await.map_err(|e| {
        error!("Failed to load verification status: {}", e);
        ApiError(e)
    })?;

    Ok(HttpResponse::Ok().json(VerificationResponse { submission }))
}

async fn get_transactions(dashboard: Data<Dashboard>) -> ApiResult {
    let transactions = dashboard.recent_transactions().await?;
    Ok(HttpResponse::Ok().json(TransactionsResponse { transactions }))
}

async fn refresh(dashboard: Data<Dashboard>) -> ApiResult {
    info!("Refreshing wallet data");
    let (session, transactions) = dashboard.refresh().await?;
    Ok(HttpResponse::Ok().json(RefreshResponse {
        session,
        transactions,
    }))
}
