// src/api/handlers/session.rs
use actix_web::{
    web::{self, Data},
    HttpResponse, Scope,
};
use tracing::{error, info};

use crate::api::types::{ApiError, ApiResult};
use crate::core::presentation::SessionView;
use crate::core::wallet::session::WalletSessionHandle;

pub fn scope() -> Scope {
    web::scope("/session")
        .service(web::resource("").route(web::get().to(get_session)))
        .service(web::resource("/connect").route(web::post().to(connect)))
        .service(web::resource("/disconnect").route(web::post().to(disconnect)))
        .service(web::resource("/refresh").route(web::post().to(refresh)))
}

fn view(session: &WalletSessionHandle) -> HttpResponse {
    HttpResponse::Ok().json(SessionView::from(&session.snapshot()))
}

async fn get_session(session: Data<WalletSessionHandle>) -> HttpResponse {
    view(&session)
}

async fn connect(session: Data<WalletSessionHandle>) -> ApiResult {
    info!("Received wallet connect request");

    session.connect().await.map_err(|e| {
        error!("Wallet connect failed: {}", e);
        ApiError(e)
    })?;

    Ok(view(&session))
}

async fn disconnect(session: Data<WalletSessionHandle>) -> HttpResponse {
    info!("Received wallet disconnect request");
    session.disconnect().await;
    view(&session)
}

async fn refresh(session: Data<WalletSessionHandle>) -> HttpResponse {
    session.refresh_balance().await;
    view(&session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::solana::MockNetworkRpc;
    use crate::core::notify::NotificationCenter;
    use crate::core::wallet::extension::MockWalletExtension;
    use crate::storage::local::MemoryLocalStorage;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::Value;
    use solana_sdk::pubkey::Pubkey;
    use std::sync::Arc;
    use std::time::Duration;

    fn session(available: bool) -> WalletSessionHandle {
        let address = Pubkey::new_unique();
        let mut extension = MockWalletExtension::new();
        extension.expect_is_available().return_const(available);
        extension.expect_connect().returning(move |_| Ok(address));
        extension.expect_disconnect().returning(|| Ok(()));
        extension.expect_account_changes().returning(|| None);
        let mut rpc = MockNetworkRpc::new();
        rpc.expect_get_balance().returning(|_| Ok(2_000_000_000));

        WalletSessionHandle::new(
            Arc::new(extension),
            Arc::new(rpc),
            Arc::new(MemoryLocalStorage::new()),
            Arc::new(NotificationCenter::new()),
            Duration::from_secs(30),
        )
    }

    #[actix_web::test]
    async fn test_connect_then_disconnect() {
        let handle = session(true);
        let app = test::init_service(
            App::new()
                .app_data(Data::new(handle.clone()))
                .service(scope()),
        )
        .await;

        let req = test::TestRequest::post().uri("/session/connect").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["connected"], true);
        assert_eq!(body["balance"], "2.0000 SOL");

        let req = test::TestRequest::post().uri("/session/disconnect").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["connected"], false);
        assert_eq!(body["headline"], "Connect Your Wallet");
    }

    #[actix_web::test]
    async fn test_connect_without_wallet_is_conflict() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(session(false)))
                .service(scope()),
        )
        .await;

        let req = test::TestRequest::post().uri("/session/connect").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Wallet not found");
    }
}
