#![allow(clippy::unwrap_used)]
// Integration tests for `Hub` against a wiremock Home Connect API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{body_json, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hconnect_api::Token;
use hconnect_core::{
    AccountConfig, AccountSession, Command, CoreError, DispatchOutcome, EntityCategory,
    EntityPlatforms, Hub, HubConfig, KeyValueRequest, PlatformHost, PollOutcome, ProgramRequest,
};

const DISHWASHER: &str = "SIEMENS-HCS02DWH1-6BE58C26DCC1";
const OVEN: &str = "BOSCH-HCS01OVN1-43E0065FE245";

// ── Helpers ─────────────────────────────────────────────────────────

fn appliance(ha_id: &str, kind: &str) -> Value {
    json!({ "haId": ha_id, "name": kind, "type": kind, "connected": true })
}

fn listing(appliances: &[Value]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "data": { "homeappliances": appliances } }))
}

/// Status, settings and "no active program" for every appliance.
async fn mount_device_state(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/homeappliances/[^/]+/status$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "status": [
                { "key": "BSH.Common.Status.OperationState",
                  "value": "BSH.Common.EnumType.OperationState.Ready" }
            ]}
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/api/homeappliances/[^/]+/settings$"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "settings": [] } })),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/api/homeappliances/[^/]+/programs/active$"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "key": "SDK.Error.NoProgramActive" }
        })))
        .mount(server)
        .await;
}

fn account(server: &MockServer, id: &str) -> AccountConfig {
    let token = Token::new(
        SecretString::from("access".to_owned()),
        None,
        Utc::now() + chrono::Duration::days(1),
    );
    AccountConfig::new(id, token, None)
        .unwrap()
        .with_api_url(Url::parse(&server.uri()).unwrap())
}

fn hub_with(platforms: Arc<dyn PlatformHost>) -> Hub {
    Hub::new(HubConfig::default(), platforms)
}

/// A hub with one account ("home") owning a dishwasher and an oven.
async fn setup() -> (MockServer, Hub) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/homeappliances"))
        .respond_with(listing(&[
            appliance(DISHWASHER, "Dishwasher"),
            appliance(OVEN, "Oven"),
        ]))
        .mount(&server)
        .await;
    mount_device_state(&server).await;

    let hub = hub_with(Arc::new(EntityPlatforms::new()));
    hub.setup_account(account(&server, "home")).await.unwrap();
    (server, hub)
}

fn appliance_path(ha_id: &str, suffix: &str) -> String {
    format!("/api/homeappliances/{ha_id}/{suffix}")
}

// ── Setup ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_setup_polls_and_loads_platforms() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/homeappliances"))
        .respond_with(listing(&[appliance(DISHWASHER, "Dishwasher")]))
        .expect(1)
        .mount(&server)
        .await;
    mount_device_state(&server).await;

    let platforms = Arc::new(EntityPlatforms::new());
    let hub = hub_with(platforms.clone());
    let session = hub.setup_account(account(&server, "home")).await.unwrap();

    let devices = session.devices();
    assert_eq!(devices.len(), 1);
    assert!(devices[0].state().initialized_at.is_some());
    assert!(devices[0].state().active_program.is_none());
    assert_eq!(
        devices[0]
            .state()
            .value_of("BSH.Common.Status.OperationState"),
        Some(&json!("BSH.Common.EnumType.OperationState.Ready"))
    );

    assert_eq!(platforms.loaded("home"), EntityCategory::ALL.to_vec());
    let doors: Vec<String> = platforms
        .entities("home", EntityCategory::BinarySensor)
        .into_iter()
        .map(|e| e.entity_id)
        .collect();
    assert_eq!(
        doors,
        vec![
            "binary_sensor.dishwasher_remote_control",
            "binary_sensor.dishwasher_door"
        ]
    );
}

#[tokio::test]
async fn test_duplicate_account_is_rejected() {
    let (server, hub) = setup().await;
    let err = hub.setup_account(account(&server, "home")).await.unwrap_err();
    assert!(matches!(err, CoreError::AccountExists { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_setup_with_unreachable_list_still_registers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/homeappliances"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let hub = hub_with(Arc::new(EntityPlatforms::new()));
    let session = hub
        .setup_account(account(&server, "home").with_title("Holiday home"))
        .await
        .unwrap();
    assert!(session.devices().is_empty());
    assert_eq!(session.title(), "Holiday home");
    assert_eq!(hub.accounts(), vec!["home".to_owned()]);
}

// ── Resolution ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_unknown_entity_performs_no_call() {
    let (server, hub) = setup().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = hub
        .dispatch(Command::Pause {
            entity_id: "switch.toaster_power".into(),
        })
        .await
        .unwrap();
    assert_eq!(outcome, DispatchOutcome::Skipped);
}

#[tokio::test]
async fn test_invalid_entity_id_is_rejected_before_resolution() {
    let (_server, hub) = setup().await;
    let err = hub
        .dispatch(Command::Resume {
            entity_id: "Not An Entity".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }), "got {err:?}");
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_pause_targets_owning_appliance() {
    let (server, hub) = setup().await;

    Mock::given(method("PUT"))
        .and(path(appliance_path(
            OVEN,
            "commands/BSH.Common.Command.PauseProgram",
        )))
        .and(body_json(json!({
            "data": { "key": "BSH.Common.Command.PauseProgram", "value": true }
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = hub
        .dispatch(Command::Pause {
            entity_id: "binary_sensor.oven_door".into(),
        })
        .await
        .unwrap();
    assert_eq!(outcome, DispatchOutcome::Completed);
}

#[tokio::test]
async fn test_key_value_commands_pass_through_unmodified() {
    let (server, hub) = setup().await;
    let key = "BSH.Common.Setting.PowerState";
    let value = "BSH.Common.EnumType.PowerState.Standby";
    let body = json!({ "data": { "key": key, "value": value } });

    for suffix in [
        format!("settings/{key}"),
        format!("programs/active/options/{key}"),
        format!("programs/selected/options/{key}"),
    ] {
        Mock::given(method("PUT"))
            .and(path(appliance_path(DISHWASHER, &suffix)))
            .and(body_json(body.clone()))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
    }

    let req = KeyValueRequest {
        entity_id: "switch.dishwasher_power".into(),
        key: key.into(),
        value: value.into(),
    };
    for command in [
        Command::ChangeSetting(req.clone()),
        Command::SetOptionActive(req.clone()),
        Command::SetOptionSelected(req),
    ] {
        assert_eq!(hub.dispatch(command).await.unwrap(), DispatchOutcome::Completed);
    }
}

#[tokio::test]
async fn test_start_program_option_payloads() {
    let (server, hub) = setup().await;
    let program = "Dishcare.Dishwasher.Program.Eco50";
    let entity = "sensor.dishwasher_program_progress";

    let cases = [
        (
            ProgramRequest::new(entity, program).with_option("Temperature", 60_i64, Some("C".into())),
            json!({ "data": { "key": program, "options": [
                { "key": "Temperature", "value": 60, "unit": "C" }
            ]}}),
        ),
        (
            ProgramRequest::new(entity, program).with_option("Temperature", 60_i64, None),
            json!({ "data": { "key": program, "options": [
                { "key": "Temperature", "value": 60 }
            ]}}),
        ),
        (
            ProgramRequest::new(entity, program),
            json!({ "data": { "key": program } }),
        ),
    ];

    for (request, expected) in cases {
        let guard = Mock::given(method("PUT"))
            .and(path(appliance_path(DISHWASHER, "programs/active")))
            .and(body_json(expected))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount_as_scoped(&server)
            .await;

        let outcome = hub.dispatch(Command::StartProgram(request)).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Completed);
        drop(guard);
    }
}

#[tokio::test]
async fn test_select_program_via_service_call() {
    let (server, hub) = setup().await;

    Mock::given(method("PUT"))
        .and(path(appliance_path(OVEN, "programs/selected")))
        .and(body_json(json!({ "data": {
            "key": "Cooking.Oven.Program.HeatingMode.PreHeating",
            "options": [{ "key": "Cooking.Oven.Option.SetpointTemperature", "value": 180 }]
        }})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = hub
        .call_service(
            "select_program",
            json!({
                "entity_id": "switch.oven_power",
                "program": "Cooking.Oven.Program.HeatingMode.PreHeating",
                "option_key": "Cooking.Oven.Option.SetpointTemperature",
                "option_value": 180
            }),
        )
        .await
        .unwrap();
    assert_eq!(outcome, DispatchOutcome::Completed);
}

#[tokio::test]
async fn test_vendor_failure_is_returned_without_retry() {
    let (server, hub) = setup().await;

    Mock::given(method("PUT"))
        .and(path(appliance_path(
            DISHWASHER,
            "commands/BSH.Common.Command.ResumeProgram",
        )))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": {
                "key": "SDK.Error.UnsupportedCommand",
                "description": "Command not available in current state"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = hub
        .dispatch(Command::Resume {
            entity_id: "binary_sensor.dishwasher_door".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(409));
}

// ── Polling ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_polls_inside_window_fetch_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/homeappliances"))
        .respond_with(listing(&[appliance(OVEN, "Oven")]))
        .expect(1)
        .mount(&server)
        .await;
    mount_device_state(&server).await;

    let hub = hub_with(Arc::new(EntityPlatforms::new()));
    hub.setup_account(account(&server, "home")).await.unwrap();

    assert_eq!(
        hub.poll_account("home", false).await.unwrap(),
        PollOutcome::Throttled
    );
    assert_eq!(
        hub.poll_account("home", false).await.unwrap(),
        PollOutcome::Throttled
    );
}

#[tokio::test]
async fn test_list_failure_keeps_previous_devices() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/homeappliances"))
        .respond_with(listing(&[
            appliance(DISHWASHER, "Dishwasher"),
            appliance(OVEN, "Oven"),
        ]))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/homeappliances"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_device_state(&server).await;

    let hub = hub_with(Arc::new(EntityPlatforms::new()));
    let session = hub.setup_account(account(&server, "home")).await.unwrap();
    let before = session.devices();
    assert_eq!(before.len(), 2);

    let outcome = hub.poll_account("home", true).await.unwrap();
    assert_eq!(outcome, PollOutcome::Failed);

    let after = session.devices();
    assert!(Arc::ptr_eq(&before, &after));
    assert!(hub.registry().resolve("switch.oven_power").is_some());
}

#[tokio::test]
async fn test_init_failure_publishes_partial_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/homeappliances"))
        .respond_with(listing(&[
            appliance(DISHWASHER, "Dishwasher"),
            appliance(OVEN, "Oven"),
        ]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(appliance_path(OVEN, "status")))
        .respond_with(ResponseTemplate::new(500))
        .with_priority(1)
        .mount(&server)
        .await;
    mount_device_state(&server).await;

    let hub = hub_with(Arc::new(EntityPlatforms::new()));
    let session = hub.setup_account(account(&server, "home")).await.unwrap();

    let devices = session.devices();
    assert_eq!(devices.len(), 2);
    assert!(devices[0].state().initialized_at.is_some());
    assert!(devices[1].state().initialized_at.is_none());

    let outcome = hub.poll_account("home", true).await.unwrap();
    assert_eq!(
        outcome,
        PollOutcome::Refreshed {
            devices: 2,
            initialized: 1
        }
    );
}

#[tokio::test]
async fn test_refresh_replaces_device_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/homeappliances"))
        .respond_with(listing(&[
            appliance(DISHWASHER, "Dishwasher"),
            appliance(OVEN, "Oven"),
        ]))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/homeappliances"))
        .respond_with(listing(&[appliance("NEFF-HOOD-1", "Hood")]))
        .mount(&server)
        .await;
    mount_device_state(&server).await;

    let hub = hub_with(Arc::new(EntityPlatforms::new()));
    hub.setup_account(account(&server, "home")).await.unwrap();
    assert_eq!(hub.devices("home").unwrap().len(), 2);

    hub.poll_account("home", true).await.unwrap();

    let devices = hub.devices("home").unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].ha_id(), "NEFF-HOOD-1");
    assert!(hub.registry().resolve("switch.oven_power").is_none());
    assert!(hub.registry().resolve("light.hood_ambient_light").is_some());
}

#[tokio::test]
async fn test_same_named_appliances_in_two_accounts_get_distinct_ids() {
    let home = MockServer::start().await;
    let cabin = MockServer::start().await;
    for (server, ha_id) in [(&home, "OVEN-A"), (&cabin, "OVEN-B")] {
        Mock::given(method("GET"))
            .and(path("/api/homeappliances"))
            .respond_with(listing(&[appliance(ha_id, "Oven")]))
            .mount(server)
            .await;
        mount_device_state(server).await;
    }
    Mock::given(method("PUT"))
        .and(path(appliance_path(
            "OVEN-B",
            "commands/BSH.Common.Command.PauseProgram",
        )))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&cabin)
        .await;

    let hub = hub_with(Arc::new(EntityPlatforms::new()));
    hub.setup_account(account(&home, "home")).await.unwrap();
    hub.setup_account(account(&cabin, "cabin")).await.unwrap();

    let mut switches: Vec<String> = hub
        .entities()
        .into_iter()
        .filter(|e| e.category == EntityCategory::Switch)
        .map(|e| e.entity_id)
        .collect();
    switches.sort();
    assert_eq!(switches, vec!["switch.oven_power", "switch.oven_power_2"]);

    assert_eq!(
        hub.registry().resolve("switch.oven_power").unwrap().ha_id(),
        "OVEN-A"
    );
    let outcome = hub
        .dispatch(Command::Pause {
            entity_id: "switch.oven_power_2".into(),
        })
        .await
        .unwrap();
    assert_eq!(outcome, DispatchOutcome::Completed);
}

#[tokio::test]
async fn test_entity_ids_survive_listing_reorder() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/homeappliances"))
        .respond_with(listing(&[
            appliance("OVEN-A", "Oven"),
            appliance("OVEN-B", "Oven"),
        ]))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/homeappliances"))
        .respond_with(listing(&[
            appliance("OVEN-B", "Oven"),
            appliance("OVEN-A", "Oven"),
        ]))
        .mount(&server)
        .await;
    mount_device_state(&server).await;

    let hub = hub_with(Arc::new(EntityPlatforms::new()));
    hub.setup_account(account(&server, "home")).await.unwrap();
    assert_eq!(
        hub.registry().resolve("switch.oven_power_2").unwrap().ha_id(),
        "OVEN-B"
    );

    hub.poll_account("home", true).await.unwrap();

    assert_eq!(hub.devices("home").unwrap()[0].ha_id(), "OVEN-B");
    assert_eq!(
        hub.registry().resolve("switch.oven_power").unwrap().ha_id(),
        "OVEN-A"
    );
    assert_eq!(
        hub.registry().resolve("switch.oven_power_2").unwrap().ha_id(),
        "OVEN-B"
    );
}

#[tokio::test]
async fn test_setup_again_after_unload_starts_fresh() {
    let (server, hub) = setup().await;
    assert!(hub.unload_account("home").await.unwrap());

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/api/homeappliances"))
        .respond_with(listing(&[appliance(OVEN, "Oven")]))
        .mount(&server)
        .await;
    mount_device_state(&server).await;

    hub.setup_account(account(&server, "home")).await.unwrap();
    let devices = hub.devices("home").unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].ha_id(), OVEN);
}

#[tokio::test]
async fn test_background_polling_runs_until_shutdown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/homeappliances"))
        .respond_with(listing(&[]))
        .mount(&server)
        .await;

    let config = HubConfig {
        scan_interval: Duration::from_millis(50),
        ..HubConfig::default()
    };
    let hub = Hub::new(config, Arc::new(EntityPlatforms::new()));
    hub.setup_account(account(&server, "home")).await.unwrap();

    hub.start_polling().await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    hub.shutdown().await;

    let polls = server.received_requests().await.unwrap().len();
    assert!(polls >= 3, "expected several scheduled polls, got {polls}");

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(server.received_requests().await.unwrap().len(), polls);
}

// ── Unload ──────────────────────────────────────────────────────────

/// Platform host whose `light` teardown fails.
#[derive(Default)]
struct StuckLights;

#[async_trait]
impl PlatformHost for StuckLights {
    async fn setup_platform(
        &self,
        _session: &AccountSession,
        _category: EntityCategory,
    ) -> Result<(), CoreError> {
        Ok(())
    }

    async fn unload_platform(&self, _account_id: &str, category: EntityCategory) -> bool {
        category != EntityCategory::Light
    }
}

#[tokio::test]
async fn test_unload_keeps_account_on_partial_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/homeappliances"))
        .respond_with(listing(&[appliance(OVEN, "Oven")]))
        .mount(&server)
        .await;
    mount_device_state(&server).await;

    let hub = hub_with(Arc::new(StuckLights));
    hub.setup_account(account(&server, "home")).await.unwrap();

    assert!(!hub.unload_account("home").await.unwrap());
    assert_eq!(hub.accounts(), vec!["home".to_owned()]);
    assert!(hub.registry().resolve("switch.oven_power").is_some());
}

#[tokio::test]
async fn test_unload_removes_account_when_all_platforms_unload() {
    let (_server, hub) = setup().await;
    assert!(hub.unload_account("home").await.unwrap());
    assert!(hub.accounts().is_empty());
    assert!(matches!(
        hub.devices("home"),
        Err(CoreError::AccountNotFound { .. })
    ));
}

#[tokio::test]
async fn test_platform_setup_failure_is_not_fatal() {
    struct Broken;

    #[async_trait]
    impl PlatformHost for Broken {
        async fn setup_platform(
            &self,
            _session: &AccountSession,
            category: EntityCategory,
        ) -> Result<(), CoreError> {
            Err(CoreError::Platform {
                category: category.to_string(),
                message: "boom".into(),
            })
        }

        async fn unload_platform(&self, _account_id: &str, _category: EntityCategory) -> bool {
            true
        }
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/homeappliances"))
        .respond_with(listing(&[]))
        .mount(&server)
        .await;

    let hub = hub_with(Arc::new(Broken));
    hub.setup_account(account(&server, "home")).await.unwrap();
    assert_eq!(hub.accounts(), vec!["home".to_owned()]);
}
