//! Interfaces Model Tests
//!
//! Drives the public engine with the bundled interfaces model:
//! - interface entries routed to tables by name
//! - physical port protection
//! - address subtrees with overlap validation
//! - trunk VLAN membership across two tables
//! - state leaves from STATE_DB and unmapped counters

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
    store.insert_row(CONFIG_DB, "PORT", "Ethernet4", FieldMap::with("mtu", "9100")).unwrap();
    store.insert_row(CONFIG_DB, "VLAN", "Vlan10", FieldMap::with("vlanid", "10")).unwrap();
    store.insert_row(CONFIG_DB, "VLAN", "Vlan20", FieldMap::with("vlanid", "20")).unwrap();
    let engine = reference_engine(config, store.clone()).unwrap();
    (store, engine)
}

fn get(engine: &Engine, path: &str) -> treexlate::XlateResult<serde_json::Value> {
    engine.get(path, &QueryParameters::new())
}

fn row(store: &InMemoryStore, db: &str, table: &str, key: &str) -> Option<FieldMap> {
    store.get_entry(db, table, key).unwrap()
}

// =============================================================================
// Interface Entry Tests
// =============================================================================

/// Create, partial delete and full delete of a creatable interface.
#[test]
fn test_loopback_lifecycle() {
    let (store, engine) = setup();
    engine
        .create(
            "/interfaces/interface[name=Loopback1]",
            &json!({"interface": [{
                "name": "Loopback1",
                "config": {"name": "Loopback1", "mtu": 9000, "description": "X", "enabled": false}
            }]}),
        )
        .unwrap();

    let stored = row(&store, CONFIG_DB, "LOOPBACK_INTERFACE", "Loopback1").unwrap();
    assert_eq!(stored.get("admin_status"), Some("down"));

    assert_eq!(
        get(&engine, "/interfaces/interface[name=Loopback1]/config").unwrap(),
        json!({"openconfig-interfaces:config": {
            "name": "Loopback1", "mtu": 9000, "description": "X", "enabled": false
        }})
    );

    engine.delete("/interfaces/interface[name=Loopback1]/config/enabled").unwrap();
    assert_eq!(
        get(&engine, "/interfaces/interface[name=Loopback1]/config/enabled").unwrap(),
        json!({"openconfig-interfaces:enabled": true})
    );

    engine.delete("/interfaces/interface[name=Loopback1]").unwrap();
    let err = get(&engine, "/interfaces/interface[name=Loopback1]").unwrap_err();
    assert_eq!(err.code(), XlateErrorCode::NotFound);
    assert!(row(&store, CONFIG_DB, "LOOPBACK_INTERFACE", "Loopback1").is_none());
}

/// Creating an interface that already exists fails and leaves it untouched.
#[test]
fn test_recreate_interface_already_exists() {
    let (store, engine) = setup();
    let payload = |mtu: u32| json!({"interface": [{"name": "Loopback1", "config": {"name": "Loopback1", "mtu": mtu}}]});
    engine.create("/interfaces/interface[name=Loopback1]", &payload(9000)).unwrap();

    let err = engine
        .create("/interfaces/interface[name=Loopback1]", &payload(1500))
        .unwrap_err();
    assert_eq!(err.code(), XlateErrorCode::AlreadyExists);
    assert_eq!(
        row(&store, CONFIG_DB, "LOOPBACK_INTERFACE", "Loopback1").unwrap().get("mtu"),
        Some("9000")
    );

    engine
        .update("/interfaces/interface[name=Loopback1]", &payload(1500))
        .unwrap();
    assert_eq!(
        row(&store, CONFIG_DB, "LOOPBACK_INTERFACE", "Loopback1").unwrap().get("mtu"),
        Some("1500")
    );
}

/// Leaves without a default are NotFound once deleted.
#[test]
fn test_deleted_leaf_without_default_is_not_found() {
    let (_, engine) = setup();
    engine
        .update(
            "/interfaces/interface[name=Ethernet0]/config/description",
            &json!({"description": "uplink"}),
        )
        .unwrap();
    engine.delete("/interfaces/interface[name=Ethernet0]/config/description").unwrap();
    let err = get(&engine, "/interfaces/interface[name=Ethernet0]/config/description").unwrap_err();
    assert_eq!(err.code(), XlateErrorCode::NotFound);
}

/// Listing interfaces reads every table the name routing can choose.
#[test]
fn test_list_spans_tables() {
    let (store, engine) = setup();
    store
        .insert_row(CONFIG_DB, "LOOPBACK_INTERFACE", "Loopback0", FieldMap::with("NULL", "NULL"))
        .unwrap();
    let got = engine
        .get("/interfaces/interface", &QueryParameters::new().with_depth(2))
        .unwrap();
    let names: Vec<&str> = got["openconfig-interfaces:interface"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 3);
    assert!(names.contains(&"Loopback0"));
    assert!(names.contains(&"Ethernet4"));
}

// =============================================================================
// Physical Port Tests
// =============================================================================

/// Physical ports cannot be created, deleted or replaced.
#[test]
fn test_physical_port_rules() {
    let (store, engine) = setup();

    let err = engine
        .update("/interfaces/interface[name=Ethernet8]/config", &json!({"config": {"mtu": 1500}}))
        .unwrap_err();
    assert_eq!(err.code(), XlateErrorCode::InvalidArgs);

    let err = engine.delete("/interfaces/interface[name=Ethernet0]").unwrap_err();
    assert_eq!(err.code(), XlateErrorCode::InvalidArgs);

    let err = engine
        .replace(
            "/interfaces/interface[name=Ethernet0]",
            &json!({"interface": [{"name": "Ethernet0"}]}),
        )
        .unwrap_err();
    assert_eq!(err.code(), XlateErrorCode::NotSupported);

    let err = engine.delete("/interfaces/interface").unwrap_err();
    assert_eq!(err.code(), XlateErrorCode::NotSupported);

    assert!(row(&store, CONFIG_DB, "PORT", "Ethernet8").is_none());
    assert!(row(&store, CONFIG_DB, "PORT", "Ethernet0").is_some());
}

/// Attributes of an existing port can be changed.
#[test]
fn test_update_port_mtu() {
    let (store, engine) = setup();
    engine
        .update("/interfaces/interface[name=Ethernet0]/config/mtu", &json!({"mtu": 1500}))
        .unwrap();
    assert_eq!(row(&store, CONFIG_DB, "PORT", "Ethernet0").unwrap().get("mtu"), Some("1500"));

    let err = engine
        .update("/interfaces/interface[name=Ethernet0]/config/mtu", &json!({"mtu": 10000}))
        .unwrap_err();
    assert_eq!(err.code(), XlateErrorCode::InvalidArgs);
}

/// Port speed is an identity stored as a number.
#[test]
fn test_port_speed_identity() {
    let (store, engine) = setup();
    engine
        .update(
            "/interfaces/interface[name=Ethernet0]/ethernet/config",
            &json!({"openconfig-if-ethernet:config": {
                "port-speed": "openconfig-if-ethernet:SPEED_100GB",
                "auto-negotiate": true
            }}),
        )
        .unwrap();

    let stored = row(&store, CONFIG_DB, "PORT", "Ethernet0").unwrap();
    assert_eq!(stored.get("speed"), Some("100000"));
    assert_eq!(stored.get("autoneg"), Some("on"));
    assert_eq!(
        get(&engine, "/interfaces/interface[name=Ethernet0]/ethernet/state/port-speed").unwrap(),
        json!({"openconfig-if-ethernet:port-speed": "openconfig-if-ethernet:SPEED_100GB"})
    );
}

// =============================================================================
// State Tests
// =============================================================================

/// Status leaves come from STATE_DB; counters have no mapping.
#[test]
fn test_state_leaves() {
    let (store, engine) = setup();
    let fields: FieldMap = [("admin_status", "up"), ("oper_status", "down")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    store.insert_row(STATE_DB, "PORT_TABLE", "Ethernet0", fields).unwrap();

    assert_eq!(
        get(&engine, "/interfaces/interface[name=Ethernet0]/state/oper-status").unwrap(),
        json!({"openconfig-interfaces:oper-status": "DOWN"})
    );
    assert_eq!(
        get(&engine, "/interfaces/interface[name=Ethernet0]/state/mtu").unwrap(),
        json!({"openconfig-interfaces:mtu": 9100})
    );

    let err = get(&engine, "/interfaces/interface[name=Ethernet0]/state/counters").unwrap_err();
    assert_eq!(err.code(), XlateErrorCode::NotSupported);
    assert_eq!(err.message(), "Not implemented");

    let err = engine
        .update("/interfaces/interface[name=Ethernet0]/state/mtu", &json!({"mtu": 1500}))
        .unwrap_err();
    assert_eq!(err.code(), XlateErrorCode::NotSupported);
}

// =============================================================================
// Address Tests
// =============================================================================

fn add_address(engine: &Engine, ifname: &str, family: &str, ip: &str, len: u8) -> treexlate::XlateResult<()> {
    engine
        .update(
            &format!(
                "/interfaces/interface[name={}]/{}/addresses/address[ip={}]/config",
                ifname, family, ip
            ),
            &json!({"config": {"ip": ip, "prefix-length": len}}),
        )
        .map(|_| ())
}

/// Addresses are marker rows keyed by interface and prefix.
#[test]
fn test_address_rows() {
    let (store, engine) = setup();
    add_address(&engine, "Ethernet0", "ipv4", "10.0.0.1", 24).unwrap();

    assert!(row(&store, CONFIG_DB, "INTERFACE", "Ethernet0").is_some());
    assert!(row(&store, CONFIG_DB, "INTERFACE", "Ethernet0|10.0.0.1/24").is_some());

    assert_eq!(
        get(&engine, "/interfaces/interface[name=Ethernet0]/ipv4/addresses").unwrap(),
        json!({"openconfig-if-ip:addresses": {"address": [{
            "ip": "10.0.0.1",
            "config": {"ip": "10.0.0.1", "prefix-length": 24},
            "state": {"ip": "10.0.0.1", "prefix-length": 24}
        }]}})
    );
    assert_eq!(
        get(
            &engine,
            "/interfaces/interface[name=Ethernet0]/ipv4/addresses/address[ip=10.0.0.1]/state/prefix-length"
        )
        .unwrap(),
        json!({"openconfig-if-ip:prefix-length": 24})
    );
}

/// A new prefix length replaces the old row for the same address.
#[test]
fn test_address_prefix_change() {
    let (store, engine) = setup();
    add_address(&engine, "Ethernet0", "ipv4", "10.0.0.1", 24).unwrap();
    add_address(&engine, "Ethernet0", "ipv4", "10.0.0.1", 16).unwrap();

    assert!(row(&store, CONFIG_DB, "INTERFACE", "Ethernet0|10.0.0.1/24").is_none());
    assert!(row(&store, CONFIG_DB, "INTERFACE", "Ethernet0|10.0.0.1/16").is_some());
}

/// The same subnet on two interfaces is rejected, naming the owner.
#[test]
fn test_overlapping_address_rejected() {
    let (store, engine) = setup();
    add_address(&engine, "Ethernet0", "ipv4", "10.0.0.1", 24).unwrap();

    let err = add_address(&engine, "Ethernet4", "ipv4", "10.0.0.2", 24).unwrap_err();
    assert_eq!(err.code(), XlateErrorCode::InvalidArgs);
    assert!(err.message().contains("10.0.0.2/24"));
    assert!(err.message().contains("Interface Ethernet4"));
    assert!(err.message().contains("Interface Ethernet0"));
    assert!(row(&store, CONFIG_DB, "INTERFACE", "Ethernet4|10.0.0.2/24").is_none());
    assert_eq!(engine.metrics().validation_failures, 1);

    add_address(&engine, "Ethernet4", "ipv6", "2001:db8::1", 64).unwrap();
    assert!(row(&store, CONFIG_DB, "INTERFACE", "Ethernet4|2001:db8::1/64").is_some());
}

/// An address of the wrong family is rejected by the subtree.
#[test]
fn test_address_family_mismatch() {
    let (_, engine) = setup();
    let err = engine
        .update(
            "/interfaces/interface[name=Ethernet0]/ipv6/addresses",
            &json!({"addresses": {"address": [{"ip": "10.0.0.1", "config": {"ip": "10.0.0.1", "prefix-length": 24}}]}}),
        )
        .unwrap_err();
    assert_eq!(err.code(), XlateErrorCode::InvalidArgs);
}

/// Address deletes: one entry, a missing entry, attributes, the container.
#[test]
fn test_address_deletes() {
    let (store, engine) = setup();
    add_address(&engine, "Ethernet0", "ipv4", "10.0.0.1", 24).unwrap();

    let err = engine
        .delete("/interfaces/interface[name=Ethernet0]/ipv4/addresses/address[ip=10.0.0.1]/config/prefix-length")
        .unwrap_err();
    assert_eq!(err.code(), XlateErrorCode::NotSupported);

    let err = engine.delete("/interfaces/interface[name=Ethernet0]/ipv4").unwrap_err();
    assert_eq!(err.code(), XlateErrorCode::NotSupported);

    let err = engine
        .delete("/interfaces/interface[name=Ethernet0]/ipv4/addresses/address[ip=10.9.9.9]")
        .unwrap_err();
    assert_eq!(err.code(), XlateErrorCode::NotFound);

    engine
        .delete("/interfaces/interface[name=Ethernet0]/ipv4/addresses/address[ip=10.0.0.1]")
        .unwrap();
    assert!(row(&store, CONFIG_DB, "INTERFACE", "Ethernet0|10.0.0.1/24").is_none());
    assert_eq!(get(&engine, "/interfaces/interface[name=Ethernet0]/ipv4/addresses").unwrap(), json!({}));
}

/// Replace of the address container swaps the whole set.
#[test]
fn test_address_replace_swaps() {
    let (store, engine) = setup();
    add_address(&engine, "Ethernet0", "ipv6", "2001:db8::1", 64).unwrap();
    add_address(&engine, "Ethernet0", "ipv6", "2001:db8:1::1", 64).unwrap();

    let payload = json!({"addresses": {"address": [
        {"ip": "2001:db8:2::1", "config": {"ip": "2001:db8:2::1", "prefix-length": 64}}
    ]}});
    let path = "/interfaces/interface[name=Ethernet0]/ipv6/addresses";
    engine.replace(path, &payload).unwrap();
    engine.replace(path, &payload).unwrap();

    let keys = store.get_keys(CONFIG_DB, "INTERFACE").unwrap();
    assert!(keys.contains(&"Ethernet0|2001:db8:2::1/64".to_string()));
    assert!(!keys.contains(&"Ethernet0|2001:db8::1/64".to_string()));
    assert!(!keys.contains(&"Ethernet0|2001:db8:1::1/64".to_string()));
}

// =============================================================================
// Trunk VLAN Tests
// =============================================================================

const TRUNK: &str = "/interfaces/interface[name=Ethernet0]/ethernet/switched-vlan/config";

/// Memberships land in VLAN_MEMBER and the VLAN members list.
#[test]
fn test_trunk_vlans_written_twice() {
    let (store, engine) = setup();
    engine
        .update(TRUNK, &json!({"config": {"trunk-vlans": [10, 20]}}))
        .unwrap();

    let member = row(&store, CONFIG_DB, "VLAN_MEMBER", "Vlan10|Ethernet0").unwrap();
    assert_eq!(member.get("tagging_mode"), Some("tagged"));
    let vlan = row(&store, CONFIG_DB, "VLAN", "Vlan20").unwrap();
    assert_eq!(vlan.get_list("members@", ","), vec!["Ethernet0"]);

    assert_eq!(
        get(&engine, &format!("{}/trunk-vlans", TRUNK)).unwrap(),
        json!({"openconfig-vlan:trunk-vlans": [10, 20]})
    );
}

/// Replace swaps memberships; member delete removes one.
#[test]
fn test_trunk_vlans_replace_and_member_delete() {
    let (store, engine) = setup();
    engine.update(TRUNK, &json!({"config": {"trunk-vlans": [10, 20]}})).unwrap();
    engine.replace(TRUNK, &json!({"config": {"trunk-vlans": [20]}})).unwrap();

    assert!(row(&store, CONFIG_DB, "VLAN_MEMBER", "Vlan10|Ethernet0").is_none());
    let vlan10 = row(&store, CONFIG_DB, "VLAN", "Vlan10").unwrap();
    assert!(!vlan10.contains("members@"));
    assert_eq!(vlan10.get("vlanid"), Some("10"));

    let err = engine
        .delete(&format!("{}/trunk-vlans[trunk-vlans=10]", TRUNK))
        .unwrap_err();
    assert_eq!(err.code(), XlateErrorCode::NotFound);

    engine.delete(&format!("{}/trunk-vlans[trunk-vlans=20]", TRUNK)).unwrap();
    assert!(store.get_keys(CONFIG_DB, "VLAN_MEMBER").unwrap().is_empty());
}

/// A membership in a VLAN that does not exist is rejected.
#[test]
fn test_trunk_vlan_must_exist() {
    let (store, engine) = setup();
    let err = engine
        .update(TRUNK, &json!({"config": {"trunk-vlans": [99]}}))
        .unwrap_err();
    assert_eq!(err.code(), XlateErrorCode::InvalidArgs);
    assert!(err.message().contains("Vlan99"));
    assert!(row(&store, CONFIG_DB, "VLAN", "Vlan99").is_none());
}
