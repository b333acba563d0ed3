// src/api/rest.rs
use actix_cors::Cors;
use actix_web::{dev::Server, http::header, web, App, HttpServer};
use std::sync::Arc;
use tracing::info;

use super::handlers::{self, wizard::SharedWizard};
use crate::core::dashboard::Dashboard;
use crate::core::notify::NotificationCenter;
use crate::core::presentation::Explorer;
use crate::core::wallet::session::WalletSessionHandle;
use crate::core::wizard::WizardMonitor;
use crate::utils::error::{Result, VerifyError};

/// Everything the handlers extract from the app data.
#[derive(Clone)]
pub struct ApiState {
    pub session: WalletSessionHandle,
    pub wizard: Arc<SharedWizard>,
    pub monitor: WizardMonitor,
    pub dashboard: Arc<Dashboard>,
    pub notifications: Arc<NotificationCenter>,
    pub explorer: Explorer,
}

/// Mounts all routes under `/api`.
pub fn configure(state: &ApiState) -> impl Fn(&mut web::ServiceConfig) + Clone {
    let state = state.clone();
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(web::Data::new(state.session.clone()))
            .app_data(web::Data::from(state.wizard.clone()))
            .app_data(web::Data::new(state.monitor.clone()))
            .app_data(web::Data::from(state.dashboard.clone()))
            .app_data(web::Data::from(state.notifications.clone()))
            .app_data(web::Data::new(state.explorer.clone()))
            .service(
                web::scope("/api")
                    .service(handlers::session::scope())
                    .service(handlers::wizard::scope())
                    .configure(handlers::dashboard::configure)
                    .configure(handlers::notices::configure),
            );
    }
}

pub struct RestApi {
    host: String,
    port: u16,
    allowed_origins: Vec<String>,
    state: ApiState,
}

impl RestApi {
    pub fn new(host: String, port: u16, allowed_origins: Vec<String>, state: ApiState) -> Self {
        Self {
            host,
            port,
            allowed_origins,
            state,
        }
    }

    /// Binds the listener; the returned server must be awaited or spawned.
    pub fn start(&self) -> Result<Server> {
        let routes = configure(&self.state);
        let origins = self.allowed_origins.clone();

        let server = HttpServer::new(move || {
            let cors = origins
                .iter()
                .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
                .allowed_methods(vec!["GET", "POST"])
                .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
                .max_age(3600);

            App::new().wrap(cors).configure(routes.clone())
        })
        .bind((self.host.as_str(), self.port))
        .map_err(|e| VerifyError::Config(format!("Failed to bind API server: {}", e)))?
        .run();

        info!("API listening on {}:{}", self.host, self.port);
        Ok(server)
    }
}
