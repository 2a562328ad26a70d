//! System Model Tests
//!
//! Hostname, NTP, AAA, syslog and process paths of the bundled model:
//! - NTP source address stored as the owning interface
//! - shared control field consistency and cleanup
//! - AAA method tokens and server group routing
//! - composite selector keys
//! - read-only process table

use std::sync::Arc;

use serde_json::json;
use treexlate::config::{CONFIG_DB, STATE_DB};
use treexlate::models::reference_engine;
use treexlate::store::{FieldMap, InMemoryStore, KvStore};
use treexlate::{Engine, EngineConfig, QueryParameters, XlateErrorCode};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup() -> (Arc<InMemoryStore>, Engine) {
    let config = EngineConfig::default();
    let store = Arc::new(InMemoryStore::new(&config));
    store.insert_row(CONFIG_DB, "PORT", "Ethernet0", FieldMap::with("mtu", "9100")).unwrap();
    store.insert_row(CONFIG_DB, "INTERFACE", "Ethernet0", FieldMap::new()).unwrap();
    store
        .insert_row(CONFIG_DB, "INTERFACE", "Ethernet0|10.0.0.1/24", FieldMap::with("NULL", "NULL"))
        .unwrap();
    store
        .insert_row(CONFIG_DB, "LOOPBACK_INTERFACE", "Loopback0|1.1.1.1/32", FieldMap::with("NULL", "NULL"))
        .unwrap();
    let engine = reference_engine(config, store.clone()).unwrap();
    (store, engine)
}

fn get(engine: &Engine, path: &str) -> treexlate::XlateResult<serde_json::Value> {
    engine.get(path, &QueryParameters::new())
}

fn row(store: &InMemoryStore, db: &str, table: &str, key: &str) -> Option<FieldMap> {
    store.get_entry(db, table, key).unwrap()
}

fn add_ntp_server(engine: &Engine, address: &str, source: &str) -> treexlate::XlateResult<()> {
    engine
        .update(
            &format!("/system/ntp/servers/server[address={}]", address),
            &json!({"server": [{
                "address": address,
                "config": {"address": address, "iburst": true, "source-address": source}
            }]}),
        )
        .map(|_| ())
}

fn add_ntp_server_in(engine: &Engine, address: &str, vrf: &str) -> treexlate::XlateResult<()> {
    engine
        .update(
            &format!("/system/ntp/servers/server[address={}]/config", address),
            &json!({"config": {"address": address, "network-instance": vrf}}),
        )
        .map(|_| ())
}

// =============================================================================
// Hostname Tests
// =============================================================================

/// Hostname lives in the fixed DEVICE_METADATA row.
#[test]
fn test_hostname() {
    let (store, engine) = setup();
    engine
        .update("/system/config/hostname", &json!({"openconfig-system:hostname": "leaf-1"}))
        .unwrap();
    let stored = row(&store, CONFIG_DB, "DEVICE_METADATA", "localhost").unwrap();
    assert_eq!(stored.get("hostname"), Some("leaf-1"));
    assert_eq!(
        get(&engine, "/system/state/hostname").unwrap(),
        json!({"openconfig-system:hostname": "leaf-1"})
    );

    let err = engine
        .update("/system/config/hostname", &json!({"hostname": "-bad"}))
        .unwrap_err();
    assert_eq!(err.code(), XlateErrorCode::InvalidArgs);
}

// =============================================================================
// NTP Tests
// =============================================================================

/// The source address is stored as the interface that owns it.
#[test]
fn test_ntp_source_address() {
    let (store, engine) = setup();
    add_ntp_server(&engine, "10.1.1.1", "10.0.0.1").unwrap();

    let server = row(&store, CONFIG_DB, "NTP_SERVER", "10.1.1.1").unwrap();
    assert_eq!(server.get("iburst"), Some("on"));
    let global = row(&store, CONFIG_DB, "NTP", "global").unwrap();
    assert_eq!(global.get("src_intf"), Some("Ethernet0"));

    assert_eq!(
        get(&engine, "/system/ntp/servers/server[address=10.1.1.1]/state/source-address").unwrap(),
        json!({"openconfig-system:source-address": "10.0.0.1"})
    );
}

/// An address no interface owns is rejected.
#[test]
fn test_ntp_unknown_source_address() {
    let (store, engine) = setup();
    let err = add_ntp_server(&engine, "10.1.1.1", "192.0.2.1").unwrap_err();
    assert_eq!(err.code(), XlateErrorCode::InvalidArgs);
    assert_eq!(err.message(), "Failed to get source interface for given source address");
    assert!(row(&store, CONFIG_DB, "NTP_SERVER", "10.1.1.1").is_none());
}

/// A second server cannot move the source interface under the first.
#[test]
fn test_ntp_source_conflict() {
    let (_, engine) = setup();
    add_ntp_server(&engine, "10.1.1.1", "10.0.0.1").unwrap();

    let err = add_ntp_server(&engine, "10.1.1.2", "1.1.1.1").unwrap_err();
    assert_eq!(err.code(), XlateErrorCode::InvalidArgs);
    assert_eq!(
        err.message(),
        "Given source address's port doesn't match with already configured src_intf"
    );

    add_ntp_server(&engine, "10.1.1.2", "10.0.0.1").unwrap();
}

/// Deleting the last server clears the shared source interface.
#[test]
fn test_ntp_cleanup_on_last_delete() {
    let (store, engine) = setup();
    add_ntp_server(&engine, "10.1.1.1", "10.0.0.1").unwrap();
    add_ntp_server(&engine, "10.1.1.2", "10.0.0.1").unwrap();

    engine.delete("/system/ntp/servers/server[address=10.1.1.1]").unwrap();
    let global = row(&store, CONFIG_DB, "NTP", "global").unwrap();
    assert_eq!(global.get("src_intf"), Some("Ethernet0"));

    engine.delete("/system/ntp/servers/server[address=10.1.1.2]").unwrap();
    let global = row(&store, CONFIG_DB, "NTP", "global");
    assert!(global.map_or(true, |r| !r.contains("src_intf")));
    assert!(store.get_keys(CONFIG_DB, "NTP_SERVER").unwrap().is_empty());
}

/// The server VRF is stored once for all servers and reads back per server.
#[test]
fn test_ntp_network_instance() {
    let (store, engine) = setup();
    add_ntp_server_in(&engine, "10.1.1.1", "mgmt").unwrap();
    add_ntp_server_in(&engine, "10.1.1.2", "mgmt").unwrap();

    let global = row(&store, CONFIG_DB, "NTP", "global").unwrap();
    assert_eq!(global.get("vrf"), Some("mgmt"));
    assert_eq!(
        get(&engine, "/system/ntp/servers/server[address=10.1.1.2]/state/network-instance").unwrap(),
        json!({"openconfig-system:network-instance": "mgmt"})
    );
}

/// A server in another VRF is rejected while earlier servers remain.
#[test]
fn test_ntp_network_instance_conflict() {
    let (store, engine) = setup();
    add_ntp_server_in(&engine, "10.1.1.1", "mgmt").unwrap();

    let err = add_ntp_server_in(&engine, "10.1.1.2", "default").unwrap_err();
    assert_eq!(err.code(), XlateErrorCode::InvalidArgs);
    assert_eq!(
        err.message(),
        "Given network-instance name is different from already configured one for this/any other server"
    );
    assert!(row(&store, CONFIG_DB, "NTP_SERVER", "10.1.1.2").is_none());
    assert_eq!(row(&store, CONFIG_DB, "NTP", "global").unwrap().get("vrf"), Some("mgmt"));
}

/// The VRF goes with the last server and cannot be deleted on its own.
#[test]
fn test_ntp_network_instance_delete() {
    let (store, engine) = setup();
    add_ntp_server_in(&engine, "10.1.1.1", "mgmt").unwrap();

    let err = engine
        .delete("/system/ntp/servers/server[address=10.1.1.1]/config/network-instance")
        .unwrap_err();
    assert_eq!(err.code(), XlateErrorCode::InvalidArgs);
    assert_eq!(err.message(), "Delete server instead of network-instance removal");

    engine.delete("/system/ntp/servers/server[address=10.1.1.1]").unwrap();
    let global = row(&store, CONFIG_DB, "NTP", "global");
    assert!(global.map_or(true, |r| !r.contains("vrf")));

    add_ntp_server_in(&engine, "10.1.1.2", "default").unwrap();
    assert_eq!(row(&store, CONFIG_DB, "NTP", "global").unwrap().get("vrf"), Some("default"));
}

// =============================================================================
// AAA Tests
// =============================================================================

const AUTHENTICATION: &str = "/system/aaa/authentication/config";

/// Method identities map to stored tokens and back.
#[test]
fn test_aaa_methods() {
    let (store, engine) = setup();
    engine
        .update(
            AUTHENTICATION,
            &json!({"config": {"authentication-method": ["openconfig-aaa-types:TACACS_ALL", "default"]}}),
        )
        .unwrap();

    let stored = row(&store, CONFIG_DB, "AAA", "authentication").unwrap();
    assert_eq!(stored.get_list("login@", ","), vec!["tacacs+", "default"]);

    assert_eq!(
        get(&engine, "/system/aaa/authentication/state/authentication-method").unwrap(),
        json!({"openconfig-system:authentication-method": ["openconfig-aaa-types:TACACS_ALL", "default"]})
    );
}

/// Unknown method names are rejected before commit.
#[test]
fn test_aaa_unknown_method() {
    let (store, engine) = setup();
    let err = engine
        .update(AUTHENTICATION, &json!({"config": {"authentication-method": ["kerberos"]}}))
        .unwrap_err();
    assert_eq!(err.code(), XlateErrorCode::InvalidArgs);
    assert!(err.message().contains("kerberos"));
    assert!(row(&store, CONFIG_DB, "AAA", "authentication").is_none());
}

/// Replace of the method list swaps it.
#[test]
fn test_aaa_methods_replace() {
    let (store, engine) = setup();
    engine
        .update(AUTHENTICATION, &json!({"config": {"authentication-method": ["TACACS_ALL", "LOCAL"]}}))
        .unwrap();
    engine
        .replace(
            &format!("{}/authentication-method", AUTHENTICATION),
            &json!({"authentication-method": ["RADIUS_ALL"]}),
        )
        .unwrap();
    let stored = row(&store, CONFIG_DB, "AAA", "authentication").unwrap();
    assert_eq!(stored.get_list("login@", ","), vec!["radius"]);
}

/// Servers land in the table chosen by their group name.
#[test]
fn test_aaa_server_group_routing() {
    let (store, engine) = setup();
    engine
        .update(
            "/system/aaa/server-groups/server-group[name=TACACS]/servers/server[address=10.2.2.2]/config",
            &json!({"config": {"address": "10.2.2.2", "port": 49, "timeout": 5}}),
        )
        .unwrap();

    let server = row(&store, CONFIG_DB, "TACPLUS_SERVER", "10.2.2.2").unwrap();
    assert_eq!(server.get("port"), Some("49"));
    assert_eq!(server.get("timeout"), Some("5"));
    assert!(row(&store, CONFIG_DB, "AAA_SERVER_GROUP", "TACACS").is_some());
    assert!(store.get_keys(CONFIG_DB, "RADIUS_SERVER").unwrap().is_empty());

    assert_eq!(
        get(
            &engine,
            "/system/aaa/server-groups/server-group[name=TACACS]/servers/server[address=10.2.2.2]/state/port"
        )
        .unwrap(),
        json!({"openconfig-system:port": 49})
    );
}

/// Only the two known server groups exist.
#[test]
fn test_aaa_invalid_group() {
    let (_, engine) = setup();
    let err = engine
        .update(
            "/system/aaa/server-groups/server-group[name=LDAP]/config",
            &json!({"config": {"name": "LDAP"}}),
        )
        .unwrap_err();
    assert_eq!(err.code(), XlateErrorCode::InvalidArgs);
    assert!(err.message().contains("LDAP"));
}

// =============================================================================
// Logging Tests
// =============================================================================

/// Selector keys nest under the server key and join their own keys.
#[test]
fn test_syslog_selector_key() {
    let (store, engine) = setup();
    let path = "/system/logging/remote-servers/remote-server[host=10.9.9.9]/selectors/selector[facility=ALL][severity=INFORMATIONAL]";
    engine
        .update(
            path,
            &json!({"selector": [{
                "facility": "ALL",
                "severity": "INFORMATIONAL",
                "config": {"facility": "ALL", "severity": "INFORMATIONAL"}
            }]}),
        )
        .unwrap();

    assert!(row(&store, CONFIG_DB, "SYSLOG_SERVER", "10.9.9.9").is_some());
    assert!(row(&store, CONFIG_DB, "SYSLOG_SERVER_SELECTOR", "10.9.9.9|ALL:INFORMATIONAL").is_some());

    assert_eq!(
        get(&engine, &format!("{}/state/severity", path)).unwrap(),
        json!({"openconfig-system:severity": "INFORMATIONAL"})
    );
}

// =============================================================================
// Process Tests
// =============================================================================

/// Process name and arguments are split from the command line.
#[test]
fn test_process_state() {
    let (store, engine) = setup();
    store
        .insert_row(STATE_DB, "PROCESS_STATS", "1234", FieldMap::with("CMD", "/usr/sbin/sshd -D -e"))
        .unwrap();

    assert_eq!(
        get(&engine, "/system/processes/process[pid=1234]/state").unwrap(),
        json!({"openconfig-system:state": {
            "pid": 1234,
            "name": "/usr/sbin/sshd",
            "args": ["-D", "-e"]
        }})
    );

    let err = get(&engine, "/system/processes/process[pid=99]").unwrap_err();
    assert_eq!(err.code(), XlateErrorCode::NotFound);
}
