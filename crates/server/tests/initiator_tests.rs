//! Integration tests for the reconciliation engine.

mod common;

use common::{
    device_state_change, session_record, sip_line, tenant_record, user_record, TestHarness,
};
use presenced_authorities::records::LineRecord;
use presenced_server::InitError;
use presenced_store::repos::{DeviceRepo, LineRepo, SessionRepo, TenantRepo, UserRepo};
use uuid::Uuid;

#[tokio::test]
async fn converges_from_empty_store() {
    let harness = TestHarness::new().await;
    let tenant_uuid = Uuid::new_v4();
    let user_uuid = Uuid::new_v4();
    let session_uuid = Uuid::new_v4();

    harness.tenants.set(vec![tenant_record(tenant_uuid)]);
    harness.directory.set(vec![user_record(
        user_uuid,
        tenant_uuid,
        vec![sip_line(1, "100")],
    )]);
    harness
        .sessions
        .set(vec![session_record(session_uuid, user_uuid, tenant_uuid)]);
    harness
        .device_states
        .set(vec![device_state_change("PJSIP/100", "INUSE")]);

    let stats = harness.initiator.run().await.unwrap();
    assert_eq!(stats.tenants_created, 1);
    assert_eq!(stats.users_created, 1);
    assert_eq!(stats.lines_created, 1);
    assert_eq!(stats.sessions_created, 1);
    assert_eq!(stats.devices_replaced, 1);
    assert_eq!(stats.deletes(), 0);

    let store = &harness.store;
    assert_eq!(store.list_tenants().await.unwrap().len(), 1);

    let user = store
        .get_user(tenant_uuid, user_uuid)
        .await
        .unwrap()
        .expect("user created");
    assert_eq!(user.state, "unavailable");

    let line = store.get_line(1).await.unwrap().expect("line created");
    assert_eq!(line.endpoint_name.as_deref(), Some("PJSIP/100"));
    assert_eq!(line.user_uuid, user_uuid);

    assert!(store.get_session(session_uuid).await.unwrap().is_some());

    let device = store
        .get_device_by_name("PJSIP/100")
        .await
        .unwrap()
        .expect("device created");
    assert_eq!(device.state, "talking");
}

#[tokio::test]
async fn second_run_with_unchanged_snapshot_is_idempotent() {
    let harness = TestHarness::new().await;
    let tenant_uuid = Uuid::new_v4();
    let user_uuid = Uuid::new_v4();

    harness.tenants.set(vec![tenant_record(tenant_uuid)]);
    harness.directory.set(vec![user_record(
        user_uuid,
        tenant_uuid,
        vec![sip_line(1, "100")],
    )]);
    harness
        .sessions
        .set(vec![session_record(Uuid::new_v4(), user_uuid, tenant_uuid)]);
    harness
        .device_states
        .set(vec![device_state_change("PJSIP/100", "NOT_INUSE")]);

    let first = harness.initiator.run().await.unwrap();
    assert!(first.creates() > 0);

    let second = harness.initiator.run().await.unwrap();
    assert_eq!(second.creates(), 0);
    assert_eq!(second.deletes(), 0);
    // Devices are replaced wholesale every pass
    assert_eq!(second.devices_replaced, 1);
}

#[tokio::test]
async fn new_tenant_in_snapshot_is_created() {
    let harness = TestHarness::new().await;
    let tenant_a = Uuid::new_v4();
    let tenant_b = Uuid::new_v4();

    harness.tenants.set(vec![tenant_record(tenant_a)]);
    harness.initiator.run().await.unwrap();
    assert_eq!(harness.store.list_tenants().await.unwrap().len(), 1);

    harness
        .tenants
        .set(vec![tenant_record(tenant_a), tenant_record(tenant_b)]);
    let stats = harness.initiator.run().await.unwrap();
    assert_eq!(stats.tenants_created, 1);

    let mut uuids: Vec<Uuid> = harness
        .store
        .list_tenants()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.uuid)
        .collect();
    uuids.sort();
    let mut expected = vec![tenant_a, tenant_b];
    expected.sort();
    assert_eq!(uuids, expected);
}

#[tokio::test]
async fn user_with_tenant_missing_from_tenant_snapshot_is_still_created() {
    let harness = TestHarness::new().await;
    let tenant_uuid = Uuid::new_v4();
    let user_uuid = Uuid::new_v4();

    // Tenant authority has not reported this tenant, but the directory has;
    // find-or-create closes the gap.
    harness.tenants.set(vec![]);
    harness
        .directory
        .set(vec![user_record(user_uuid, tenant_uuid, vec![])]);

    harness.initiator.run().await.unwrap();
    assert!(harness
        .store
        .get_tenant(tenant_uuid)
        .await
        .unwrap()
        .is_some());
    assert!(harness
        .store
        .get_user(tenant_uuid, user_uuid)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn orphan_session_is_dropped_not_created() {
    let harness = TestHarness::new().await;
    let tenant_uuid = Uuid::new_v4();

    harness.tenants.set(vec![tenant_record(tenant_uuid)]);
    harness
        .sessions
        .set(vec![session_record(Uuid::new_v4(), Uuid::new_v4(), tenant_uuid)]);

    let stats = harness.initiator.run().await.unwrap();
    assert_eq!(stats.sessions_created, 0);
    assert!(stats.skipped >= 1);
    assert!(harness.store.list_sessions(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn removed_user_cascade_skips_line_removal() {
    let harness = TestHarness::new().await;
    let tenant_uuid = Uuid::new_v4();
    let user_uuid = Uuid::new_v4();

    harness.tenants.set(vec![tenant_record(tenant_uuid)]);
    harness.directory.set(vec![user_record(
        user_uuid,
        tenant_uuid,
        vec![sip_line(7, "700")],
    )]);
    harness.initiator.run().await.unwrap();

    // The user disappears from the snapshot; its line goes with it by cascade,
    // so the expired-line pass finds nothing to delete and logs the skip.
    harness.directory.set(vec![]);
    let stats = harness.initiator.run().await.unwrap();
    assert_eq!(stats.users_deleted, 1);
    assert_eq!(stats.lines_deleted, 0);
    assert!(stats.skipped >= 1);
    assert!(harness.store.get_line(7).await.unwrap().is_none());
    assert!(harness.store.list_users(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn device_states_map_and_associate_on_following_run() {
    let harness = TestHarness::new().await;
    let tenant_uuid = Uuid::new_v4();
    let user_uuid = Uuid::new_v4();

    harness.tenants.set(vec![tenant_record(tenant_uuid)]);
    harness.directory.set(vec![user_record(
        user_uuid,
        tenant_uuid,
        vec![sip_line(1, "100")],
    )]);
    harness
        .device_states
        .set(vec![device_state_change("PJSIP/100", "ONHOLD")]);

    // First run: lines are reconciled before devices exist, so the line
    // stays unassociated.
    harness.initiator.run().await.unwrap();
    let device = harness
        .store
        .get_device_by_name("PJSIP/100")
        .await
        .unwrap()
        .expect("device created");
    assert_eq!(device.state, "holding");
    let line = harness.store.get_line(1).await.unwrap().unwrap();
    assert_eq!(line.device_name, None);

    // Second run: the device survives from the previous pass and the line
    // picks up its state.
    harness.initiator.run().await.unwrap();
    let line = harness.store.get_line(1).await.unwrap().unwrap();
    assert_eq!(line.device_name.as_deref(), Some("PJSIP/100"));
    assert_eq!(line.state, "holding");
}

#[tokio::test]
async fn renamed_line_endpoint_is_refreshed_under_unchanged_key() {
    let harness = TestHarness::new().await;
    let tenant_uuid = Uuid::new_v4();
    let user_uuid = Uuid::new_v4();

    harness.tenants.set(vec![tenant_record(tenant_uuid)]);
    harness.directory.set(vec![user_record(
        user_uuid,
        tenant_uuid,
        vec![sip_line(1, "100")],
    )]);
    harness.initiator.run().await.unwrap();

    // The line keeps its key but is renamed; the next run rewrites the
    // derived endpoint name and associates against the matching device.
    harness.directory.set(vec![user_record(
        user_uuid,
        tenant_uuid,
        vec![sip_line(1, "200")],
    )]);
    harness
        .device_states
        .set(vec![device_state_change("PJSIP/200", "RINGING")]);
    let stats = harness.initiator.run().await.unwrap();
    assert_eq!(stats.creates(), 0);
    assert_eq!(stats.deletes(), 0);

    harness.initiator.run().await.unwrap();
    let line = harness.store.get_line(1).await.unwrap().unwrap();
    assert_eq!(line.endpoint_name.as_deref(), Some("PJSIP/200"));
    assert_eq!(line.device_name.as_deref(), Some("PJSIP/200"));
    assert_eq!(line.state, "ringing");

    // Dropping the endpoint technology clears the derived name.
    harness.directory.set(vec![user_record(
        user_uuid,
        tenant_uuid,
        vec![LineRecord {
            id: 1,
            name: Some("200".to_string()),
            endpoint_sip: None,
            endpoint_sccp: None,
            endpoint_custom: None,
        }],
    )]);
    harness.initiator.run().await.unwrap();
    let line = harness.store.get_line(1).await.unwrap().unwrap();
    assert_eq!(line.endpoint_name, None);
}

#[tokio::test]
async fn unknown_device_states_map_to_unavailable() {
    let harness = TestHarness::new().await;
    harness.device_states.set(vec![
        device_state_change("PJSIP/1", "BUSY"),
        device_state_change("PJSIP/2", "SOMETHING_NEW"),
    ]);

    harness.initiator.run().await.unwrap();
    for name in ["PJSIP/1", "PJSIP/2"] {
        let device = harness
            .store
            .get_device_by_name(name)
            .await
            .unwrap()
            .expect("device created");
        assert_eq!(device.state, "unavailable");
    }
}

#[tokio::test]
async fn non_change_events_are_ignored() {
    let harness = TestHarness::new().await;
    harness.device_states.set(vec![
        device_state_change("PJSIP/100", "RINGING"),
        presenced_authorities::records::DeviceStateEvent {
            event: "DeviceStateListComplete".to_string(),
            device: None,
            state: None,
        },
    ]);

    let stats = harness.initiator.run().await.unwrap();
    assert_eq!(stats.devices_replaced, 1);
    assert_eq!(harness.store.list_devices().await.unwrap().len(), 1);
}

#[tokio::test]
async fn mid_phase_constraint_failure_rolls_back_partial_creates() {
    let harness = TestHarness::new().await;
    let tenant_a = Uuid::new_v4();
    let tenant_b = Uuid::new_v4();
    let user_uuid = Uuid::new_v4();

    harness.tenants.set(vec![tenant_record(tenant_a)]);
    // The same user uuid reported under two tenants: whichever insert runs
    // second violates the users primary key mid-phase.
    harness.directory.set(vec![
        user_record(user_uuid, tenant_a, vec![]),
        user_record(user_uuid, tenant_b, vec![]),
    ]);

    let err = harness.initiator.run().await.unwrap_err();
    assert!(matches!(err, InitError::Store(_)));

    // Phase 1 stays committed; the user phase rolled back wholesale,
    // including the find-or-create of the second tenant.
    assert_eq!(harness.store.list_tenants().await.unwrap().len(), 1);
    assert!(harness.store.list_users(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn authority_failure_aborts_run_keeping_earlier_phases() {
    let harness = TestHarness::new().await;
    let tenant_uuid = Uuid::new_v4();

    harness.tenants.set(vec![tenant_record(tenant_uuid)]);
    harness.directory.set_fail(true);

    let err = harness.initiator.run().await.unwrap_err();
    assert!(matches!(err, InitError::Authority(_)));

    // Phase 1 committed before the failure; later phases never ran.
    assert_eq!(harness.store.list_tenants().await.unwrap().len(), 1);
    assert!(harness.store.list_users(None).await.unwrap().is_empty());

    // The next run converges once the outage clears.
    harness.directory.set_fail(false);
    harness.initiator.run().await.unwrap();
}

#[tokio::test]
async fn expired_entities_are_removed() {
    let harness = TestHarness::new().await;
    let tenant_uuid = Uuid::new_v4();
    let keep_user = Uuid::new_v4();
    let drop_user = Uuid::new_v4();
    let drop_session = Uuid::new_v4();

    harness.tenants.set(vec![tenant_record(tenant_uuid)]);
    harness.directory.set(vec![
        user_record(keep_user, tenant_uuid, vec![]),
        user_record(drop_user, tenant_uuid, vec![]),
    ]);
    harness
        .sessions
        .set(vec![session_record(drop_session, keep_user, tenant_uuid)]);
    harness.initiator.run().await.unwrap();

    harness
        .directory
        .set(vec![user_record(keep_user, tenant_uuid, vec![])]);
    harness.sessions.set(vec![]);
    let stats = harness.initiator.run().await.unwrap();

    assert_eq!(stats.users_deleted, 1);
    assert_eq!(stats.sessions_deleted, 1);
    assert!(harness
        .store
        .get_user(tenant_uuid, drop_user)
        .await
        .unwrap()
        .is_none());
    assert!(harness
        .store
        .get_session(drop_session)
        .await
        .unwrap()
        .is_none());
    assert!(harness
        .store
        .get_user(tenant_uuid, keep_user)
        .await
        .unwrap()
        .is_some());
}
