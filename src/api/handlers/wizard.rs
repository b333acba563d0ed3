// src/api/handlers/wizard.rs
use actix_web::{
    web::{self, Data, Json},
    HttpResponse, Scope,
};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::api::types::{ApiError, ApiResult};
use crate::core::identity::types::PersonalDetails;
use crate::core::presentation::{Explorer, WizardView};
use crate::core::wizard::{VerificationWizard, WizardMonitor};
use crate::utils::error::VerifyError;

/// One wizard per server; stage actions run one at a time. Reads go through
/// the `WizardMonitor` app data so they never queue behind a running action.
pub type SharedWizard = Mutex<VerificationWizard>;

pub fn scope() -> Scope {
    web::scope("/wizard")
        .service(web::resource("").route(web::get().to(get_wizard)))
        .service(web::resource("/connect").route(web::post().to(connect_wallet)))
        .service(web::resource("/details").route(web::post().to(submit_details)))
        .service(
            web::resource("/scan")
                .route(web::get().to(scan_progress))
                .route(web::post().to(run_biometric)),
        )
        .service(web::resource("/transaction").route(web::post().to(make_transaction)))
        .service(web::resource("/confirm").route(web::post().to(confirm_transaction)))
        .service(web::resource("/retry").route(web::post().to(retry)))
        .service(web::resource("/restart").route(web::post().to(restart)))
}

fn view(monitor: &WizardMonitor, explorer: &Explorer) -> HttpResponse {
    HttpResponse::Ok().json(WizardView::new(
        &monitor.state(),
        &monitor.transaction_attempt(),
        explorer,
    ))
}

fn stage_failed(e: VerifyError) -> ApiError {
    error!("Wizard action failed: {}", e);
    ApiError(e)
}

async fn get_wizard(
    wizard: Data<SharedWizard>,
    monitor: Data<WizardMonitor>,
    explorer: Data<Explorer>,
) -> HttpResponse {
    // Skip the auto-advance check while a stage action holds the wizard.
    if let Ok(mut wizard) = wizard.try_lock() {
        wizard.observe_session();
    }
    view(&monitor, &explorer)
}

async fn connect_wallet(
    wizard: Data<SharedWizard>,
    monitor: Data<WizardMonitor>,
    explorer: Data<Explorer>,
) -> ApiResult {
    wizard
        .lock()
        .await
        .connect_wallet()
        .await
        .map_err(stage_failed)?;
    Ok(view(&monitor, &explorer))
}

async fn submit_details(
    wizard: Data<SharedWizard>,
    monitor: Data<WizardMonitor>,
    explorer: Data<Explorer>,
    request: Json<PersonalDetails>,
) -> ApiResult {
    info!("Received verification details");

    {
        let mut wizard = wizard.lock().await;
        wizard.observe_session();
        wizard.submit_details(&request).await.map_err(stage_failed)?;
    }
    Ok(view(&monitor, &explorer))
}

async fn scan_progress(monitor: Data<WizardMonitor>) -> HttpResponse {
    HttpResponse::Ok().json(monitor.scan_progress())
}

async fn run_biometric(
    wizard: Data<SharedWizard>,
    monitor: Data<WizardMonitor>,
    explorer: Data<Explorer>,
) -> ApiResult {
    wizard
        .lock()
        .await
        .run_biometric()
        .await
        .map_err(stage_failed)?;
    Ok(view(&monitor, &explorer))
}

async fn make_transaction(
    wizard: Data<SharedWizard>,
    monitor: Data<WizardMonitor>,
    explorer: Data<Explorer>,
) -> ApiResult {
    info!("Submitting attestation transaction");

    wizard
        .lock()
        .await
        .make_transaction()
        .await
        .map_err(stage_failed)?;
    Ok(view(&monitor, &explorer))
}

async fn confirm_transaction(
    wizard: Data<SharedWizard>,
    monitor: Data<WizardMonitor>,
    explorer: Data<Explorer>,
) -> ApiResult {
    wizard
        .lock()
        .await
        .confirm_transaction()
        .await
        .map_err(stage_failed)?;
    Ok(view(&monitor, &explorer))
}

async fn retry(
    wizard: Data<SharedWizard>,
    monitor: Data<WizardMonitor>,
    explorer: Data<Explorer>,
) -> ApiResult {
    wizard.lock().await.retry()?;
    Ok(view(&monitor, &explorer))
}

async fn restart(
    wizard: Data<SharedWizard>,
    monitor: Data<WizardMonitor>,
    explorer: Data<Explorer>,
) -> HttpResponse {
    wizard.lock().await.restart();
    view(&monitor, &explorer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::solana::MockNetworkRpc;
    use crate::core::identity::biometric::{BiometricSimulator, ScanKind, ScanTiming};
    use crate::core::identity::form::{GeneratedIdentity, VerificationForm};
    use crate::core::notify::NotificationCenter;
    use crate::core::transactions::submitter::{ConfirmationSettings, TransactionSubmitter};
    use crate::core::wallet::extension::MockWalletExtension;
    use crate::core::wallet::session::WalletSessionHandle;
    use crate::core::wizard::WizardSettings;
    use crate::storage::local::MemoryLocalStorage;
    use crate::storage::records::MemoryRecordStore;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};
    use solana_sdk::pubkey::Pubkey;
    use std::sync::Arc;
    use std::time::Duration;

    fn wizard(timing: ScanTiming) -> VerificationWizard {
        let address = Pubkey::new_unique();
        let mut extension = MockWalletExtension::new();
        extension.expect_is_available().return_const(true);
        extension.expect_connect().returning(move |_| Ok(address));
        extension.expect_account_changes().returning(|| None);
        let extension = Arc::new(extension);
        let mut rpc = MockNetworkRpc::new();
        rpc.expect_get_balance().returning(|_| Ok(1_000_000_000));
        let rpc = Arc::new(rpc);

        let center = Arc::new(NotificationCenter::new());
        let local = Arc::new(MemoryLocalStorage::new());
        let session = WalletSessionHandle::new(
            extension.clone(),
            rpc.clone(),
            local.clone(),
            center.clone(),
            Duration::from_secs(30),
        );
        let form = VerificationForm::new(
            Arc::new(MemoryRecordStore::new()),
            local,
            Arc::new(GeneratedIdentity),
            center.clone(),
        );
        let biometric =
            BiometricSimulator::new(ScanKind::Face, timing, center.clone());
        let submitter = TransactionSubmitter::new(
            rpc,
            extension,
            center.clone(),
            ConfirmationSettings::default(),
        );

        VerificationWizard::new(
            session,
            Arc::new(form),
            Arc::new(biometric),
            Arc::new(submitter),
            center,
            WizardSettings {
                recipient: Pubkey::new_unique(),
                lamports: 1_000_000,
                completion_delay: Duration::from_millis(10),
            },
        )
    }

    fn details() -> Value {
        json!({
            "full_name": "Jane Doe",
            "email": "jane@example.com",
            "date_of_birth": "1990-01-01",
            "id_number": "ID1234",
        })
    }

    fn app_data(timing: ScanTiming) -> (Data<SharedWizard>, Data<WizardMonitor>) {
        let wizard = wizard(timing);
        let monitor = Data::new(wizard.monitor());
        (Data::new(Mutex::new(wizard)), monitor)
    }

    #[actix_web::test]
    async fn test_stage_actions_over_http() {
        let (wizard, monitor) = app_data(ScanTiming::default());
        let app = test::init_service(
            App::new()
                .app_data(wizard)
                .app_data(monitor)
                .app_data(Data::new(Explorer::default()))
                .service(scope()),
        )
        .await;

        let req = test::TestRequest::get().uri("/wizard").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["stage"], "connect_wallet");

        let details = details();

        // Details before the wallet is connected belong to another stage.
        let req = test::TestRequest::post()
            .uri("/wizard/details")
            .set_json(&details)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::post().uri("/wizard/connect").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["stage"], "personal_info");

        let req = test::TestRequest::post()
            .uri("/wizard/details")
            .set_json(json!({
                "full_name": "J",
                "email": "jane@",
                "date_of_birth": null,
                "id_number": "12",
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["fields"].as_array().map(Vec::len), Some(4));

        let req = test::TestRequest::post()
            .uri("/wizard/details")
            .set_json(&details)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["stage"], "biometric");
        assert!(body["submission_id"].is_string());

        let req = test::TestRequest::post().uri("/wizard/retry").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn test_progress_readable_while_scan_runs() {
        let (wizard, monitor) = app_data(ScanTiming {
            tick: Duration::from_millis(50),
            increment: 10,
            settle: Duration::from_millis(50),
        });
        let app = test::init_service(
            App::new()
                .app_data(wizard)
                .app_data(monitor)
                .app_data(Data::new(Explorer::default()))
                .service(scope()),
        )
        .await;

        let req = test::TestRequest::post().uri("/wizard/connect").to_request();
        assert!(test::call_service(&app, req).await.status().is_success());
        let req = test::TestRequest::post()
            .uri("/wizard/details")
            .set_json(details())
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());

        let scan = async {
            let req = test::TestRequest::post().uri("/wizard/scan").to_request();
            let body: Value = test::call_and_read_body_json(&app, req).await;
            body
        };
        let poll = async {
            tokio::time::sleep(Duration::from_millis(175)).await;
            let req = test::TestRequest::get().uri("/wizard/scan").to_request();
            let progress: Value = tokio::time::timeout(
                Duration::from_millis(100),
                test::call_and_read_body_json(&app, req),
            )
            .await
            .expect("progress must not wait for the scan");

            let req = test::TestRequest::get().uri("/wizard").to_request();
            let view: Value = tokio::time::timeout(
                Duration::from_millis(100),
                test::call_and_read_body_json(&app, req),
            )
            .await
            .expect("wizard view must not wait for the scan");
            (progress, view)
        };

        let (finished, (progress, view)) = tokio::join!(scan, poll);

        let percent = progress["percent"].as_u64().unwrap();
        assert!(percent > 0 && percent < 100, "percent was {}", percent);
        assert_eq!(progress["scanning"], true);
        assert_eq!(view["stage"], "biometric");
        assert_eq!(finished["stage"], "make_transaction");
    }
}
