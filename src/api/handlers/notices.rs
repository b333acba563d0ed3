// src/api/handlers/notices.rs
use actix_web::{
    web::{self, Data, Query},
    HttpResponse,
};
use serde::Deserialize;

use crate::api::types::NoticesResponse;
use crate::core::notify::NotificationCenter;

#[derive(Debug, Deserialize)]
pub struct NoticesQuery {
    /// Last id the client has already shown.
    pub after: Option<u64>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/notices").route(web::get().to(get_notices)));
}

async fn get_notices(
    notifications: Data<NotificationCenter>,
    query: Query<NoticesQuery>,
) -> HttpResponse {
    let notices = notifications.recent(query.after);
    let latest_id = notices.last().map(|posted| posted.id).or(query.after);
    HttpResponse::Ok().json(NoticesResponse { notices, latest_id })
}
