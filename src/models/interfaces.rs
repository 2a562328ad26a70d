//! openconfig-interfaces
//!
//! | Path | Rows |
//! |---|---|
//! | `interface[name]/config` | `PORT`, `LOOPBACK_INTERFACE` or `PORTCHANNEL`, chosen by name |
//! | `interface[name]/state` | the same row, plus `STATE_DB` `PORT_TABLE` for status |
//! | `ipv4/addresses`, `ipv6/addresses` | `INTERFACE`-style tables keyed `<if>|<ip>/<len>` |
//! | `ethernet/config` | `speed` and `autoneg` of the port row |
//! | `ethernet/switched-vlan` | `VLAN.members@` and `VLAN_MEMBER|<vlan>|<if>` |
//!
//! Physical ports exist only when the platform created them: they cannot
//! be created, deleted or replaced through the tree.

use serde_json::{json, Value};

use crate::assembler::member;
use crate::config::{CONFIG_DB, STATE_DB};
use crate::errors::{XlateError, XlateErrorCode, XlateResult};
use crate::schema::{LeafType, SchemaNode};
use crate::store::{DbKey, FieldMap, KvStore, RowRef, TableMutation, TableRef};
use crate::transformer::{
    DenyOperations, HookRegistry, KeyedTableHook, Operation, PreHook, SubtreeHook, ValueMapCodec, XfmrContext,
};
use crate::validation::{Prefix, Reference, ReferencedRowExists, UniquePrefix, ValidationEngine};

pub const MODULE: &str = "openconfig-interfaces";
pub const ETHERNET_MODULE: &str = "openconfig-if-ethernet";
pub const IP_MODULE: &str = "openconfig-if-ip";
pub const VLAN_MODULE: &str = "openconfig-vlan";

const PORT: &str = "PORT";
const VLAN: &str = "VLAN";
const VLAN_MEMBER: &str = "VLAN_MEMBER";

/// Address table for each interface naming prefix
const IP_TABLES: [(&str, &str); 3] = [
    ("Ethernet", "INTERFACE"),
    ("Loopback", "LOOPBACK_INTERFACE"),
    ("PortChannel", "PORTCHANNEL_INTERFACE"),
];

const SPEEDS: [(&str, &str); 6] = [
    ("SPEED_1GB", "1000"),
    ("SPEED_10GB", "10000"),
    ("SPEED_25GB", "25000"),
    ("SPEED_40GB", "40000"),
    ("SPEED_50GB", "50000"),
    ("SPEED_100GB", "100000"),
];

/// Address table of an interface
pub fn ip_table(ifname: &str) -> Option<&'static str> {
    IP_TABLES
        .iter()
        .find(|(prefix, _)| ifname.starts_with(prefix))
        .map(|(_, table)| *table)
}

pub fn ip_tables() -> Vec<TableRef> {
    IP_TABLES.iter().map(|(_, t)| TableRef::new(CONFIG_DB, *t)).collect()
}

/// Every `(interface, prefix)` address row across the address tables
pub fn interface_addresses(store: &dyn KvStore, separator: &str) -> XlateResult<Vec<(String, Prefix)>> {
    let mut out = Vec::new();
    for table in ip_tables() {
        for key in store.get_keys(&table.db, &table.table)? {
            let parsed = DbKey::parse(&key, separator);
            if parsed.len() != 2 {
                continue;
            }
            if let (Some(ifname), Some(prefix)) = (parsed.get(0), parsed.get(1).and_then(Prefix::parse)) {
                out.push((ifname.to_string(), prefix));
            }
        }
    }
    Ok(out)
}

pub fn schema() -> SchemaNode {
    SchemaNode::container("interfaces").module(MODULE).child(
        SchemaNode::list("interface", &["name"])
            .create_exclusive()
            .table_hook("interface-table")
            .pre_hook("physical-port")
            .child(SchemaNode::leaf("name", interface_name()))
            .child(config())
            .child(state())
            .child(ip_family("ipv4", r"(\d{1,3}\.){3}\d{1,3}", 32).pre_hook("ipv4-delete"))
            .child(ip_family("ipv6", r"[0-9a-fA-F:]*:[0-9a-fA-F:.]*", 128))
            .child(ethernet()),
    )
}

fn interface_name() -> LeafType {
    LeafType::pattern(r"(Ethernet|Loopback|PortChannel)\d+")
}

fn config() -> SchemaNode {
    SchemaNode::container("config")
        .child(SchemaNode::leaf("name", interface_name()).from_key("name"))
        .child(SchemaNode::leaf("mtu", LeafType::uint(9216)))
        .child(SchemaNode::leaf("description", LeafType::string()))
        .child(
            SchemaNode::leaf("enabled", LeafType::Boolean)
                .field("admin_status")
                .codec("bool-up-down")
                .default_value(json!(true)),
        )
}

fn state() -> SchemaNode {
    let status = || LeafType::enumeration(&["UP", "DOWN", "TESTING"]);
    SchemaNode::container("state")
        .state()
        .child(SchemaNode::leaf("name", interface_name()).from_key("name"))
        .child(SchemaNode::leaf("mtu", LeafType::uint(9216)).field("mtu"))
        .child(SchemaNode::leaf("description", LeafType::string()).field("description"))
        .child(
            SchemaNode::leaf("enabled", LeafType::Boolean)
                .field("admin_status")
                .codec("bool-up-down")
                .default_value(json!(true)),
        )
        .child(
            SchemaNode::leaf("admin-status", status())
                .db(STATE_DB)
                .table("PORT_TABLE")
                .field("admin_status")
                .codec("oper-status"),
        )
        .child(
            SchemaNode::leaf("oper-status", status())
                .db(STATE_DB)
                .table("PORT_TABLE")
                .field("oper_status")
                .codec("oper-status"),
        )
        .child(
            SchemaNode::container("counters")
                .child(SchemaNode::leaf("in-octets", LeafType::uint(u64::MAX)))
                .child(SchemaNode::leaf("out-octets", LeafType::uint(u64::MAX)))
                .child(SchemaNode::leaf("in-errors", LeafType::uint(u64::MAX))),
        )
}

fn ip_family(family: &str, pattern: &str, max_len: u64) -> SchemaNode {
    let address_leaves = |node: SchemaNode| {
        node.child(SchemaNode::leaf("ip", LeafType::pattern(pattern)))
            .child(SchemaNode::leaf("prefix-length", LeafType::uint(max_len)))
    };
    SchemaNode::container(family).module(IP_MODULE).child(
        SchemaNode::container("addresses")
            .subtree_hook(format!("{}-addresses", family))
            .child(
                SchemaNode::list("address", &["ip"])
                    .child(SchemaNode::leaf("ip", LeafType::pattern(pattern)))
                    .child(address_leaves(SchemaNode::container("config")))
                    .child(address_leaves(SchemaNode::container("state").state())),
            ),
    )
}

fn ethernet() -> SchemaNode {
    let speed = || {
        let names: Vec<&str> = SPEEDS.iter().map(|(name, _)| *name).collect();
        LeafType::identityref(ETHERNET_MODULE, &names)
    };
    let leaves = |node: SchemaNode| {
        node.child(SchemaNode::leaf("port-speed", speed()).field("speed").codec("port-speed"))
            .child(
                SchemaNode::leaf("auto-negotiate", LeafType::Boolean)
                    .field("autoneg")
                    .codec("bool-on-off"),
            )
    };
    let vlans = || SchemaNode::leaf_list("trunk-vlans", LeafType::uint(4094));

    SchemaNode::container("ethernet")
        .module(ETHERNET_MODULE)
        .child(leaves(SchemaNode::container("config")))
        .child(leaves(SchemaNode::container("state").state()))
        .child(
            SchemaNode::container("switched-vlan")
                .module(VLAN_MODULE)
                .subtree_hook("trunk-vlans")
                .child(SchemaNode::container("config").child(vlans()))
                .child(SchemaNode::container("state").state().child(vlans())),
        )
}

pub fn register(hooks: &mut HookRegistry, validators: &mut ValidationEngine) {
    hooks
        .register_table_hook(
            "interface-table",
            KeyedTableHook::new("name")
                .prefix("Ethernet", PORT)
                .prefix("Loopback", "LOOPBACK_INTERFACE")
                .prefix("PortChannel", "PORTCHANNEL"),
        )
        .register_pre_hook("physical-port", PhysicalPortGuard)
        .register_pre_hook(
            "ipv4-delete",
            DenyOperations::new(
                &[Operation::Delete],
                XlateErrorCode::NotSupported,
                "Delete of the ipv4 container is not supported",
            ),
        )
        .register_subtree_hook("ipv4-addresses", IpAddresses::new(IpFamily::V4))
        .register_subtree_hook("ipv6-addresses", IpAddresses::new(IpFamily::V6))
        .register_subtree_hook("trunk-vlans", TrunkVlans)
        .register_codec("port-speed", ValueMapCodec::new(&SPEEDS))
        .register_codec("oper-status", ValueMapCodec::new(&[("UP", "up"), ("DOWN", "down")]));

    validators
        .register(UniquePrefix::new(ip_tables()))
        .register(ReferencedRowExists::new(
            TableRef::new(CONFIG_DB, VLAN_MEMBER),
            Reference::KeyComponent(0),
            TableRef::new(CONFIG_DB, VLAN),
        ));
}

/// Bound interface name of a hook context
fn interface_of(ctx: &XfmrContext) -> XlateResult<String> {
    ctx.key_text("name")
        .ok_or_else(|| XlateError::internal("interface name is not bound"))
}

/// Physical ports come from the platform
pub struct PhysicalPortGuard;

impl PreHook for PhysicalPortGuard {
    fn check(&self, ctx: &XfmrContext) -> XlateResult<()> {
        let Some(name) = ctx.key_text("name") else {
            if ctx.is_target() && matches!(ctx.oper, Operation::Replace | Operation::Delete) {
                return Err(XlateError::not_supported(format!(
                    "{} of the whole interface list is not supported",
                    ctx.oper
                )));
            }
            return Ok(());
        };
        if !name.starts_with("Ethernet") {
            return Ok(());
        }

        let exists = ctx.store.get_entry(&ctx.schema().db, PORT, &name)?.is_some();
        match ctx.oper {
            Operation::Delete if ctx.is_target() => Err(XlateError::invalid_args(format!(
                "Physical interface {} cannot be deleted",
                name
            ))),
            Operation::Replace if ctx.is_target() => Err(XlateError::not_supported(format!(
                "Replace of physical interface {} is not supported",
                name
            ))),
            oper if oper.is_set() && !exists => Err(XlateError::invalid_args(format!(
                "Physical interface {} does not exist and cannot be created",
                name
            ))),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    fn matches(&self, prefix: &Prefix) -> bool {
        match self {
            IpFamily::V4 => prefix.addr.is_ipv4(),
            IpFamily::V6 => prefix.addr.is_ipv6(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            IpFamily::V4 => "IPv4",
            IpFamily::V6 => "IPv6",
        }
    }
}

/// Interface addresses of one family
///
/// Each address is a marker-only row `<if>|<ip>/<len>` next to the bare
/// `<if>` row in the interface's address table.
pub struct IpAddresses {
    family: IpFamily,
}

impl IpAddresses {
    pub fn new(family: IpFamily) -> Self {
        Self { family }
    }

    fn table(ifname: &str) -> XlateResult<&'static str> {
        ip_table(ifname).ok_or_else(|| XlateError::invalid_args(format!("Interface {} cannot carry addresses", ifname)))
    }

    /// Stored addresses of this family on `ifname`, with their row keys
    fn owned(&self, ctx: &XfmrContext, ifname: &str) -> XlateResult<Vec<(String, Prefix)>> {
        let separator = ctx.key_separator()?;
        let table = Self::table(ifname)?;
        let mut out = Vec::new();
        for key in ctx.store.get_keys(&ctx.schema().db, table)? {
            let parsed = DbKey::parse(&key, separator);
            if parsed.len() != 2 || parsed.get(0) != Some(ifname) {
                continue;
            }
            if let Some(prefix) = parsed.get(1).and_then(Prefix::parse) {
                if self.family.matches(&prefix) {
                    out.push((key, prefix));
                }
            }
        }
        Ok(out)
    }

    /// Address bound by the request path, and whether the path goes
    /// below that address entry
    fn bound_address(ctx: &XfmrContext) -> Option<(String, bool)> {
        let list = ctx.index.child(ctx.node, "address")?;
        let elem = ctx.path.elem(list)?;
        let (_, ip) = elem.keys.first()?;
        let below = ctx.path.target() != list;
        Some((crate::transformer::value_text(ip), below))
    }

    fn parse_entry(&self, entry: &Value) -> XlateResult<Prefix> {
        let obj = entry
            .as_object()
            .ok_or_else(|| XlateError::invalid_args("Expected an object address entry"))?;
        let config = member(obj, "config").and_then(Value::as_object);

        let ip = member(obj, "ip")
            .or_else(|| config.and_then(|c| member(c, "ip")))
            .and_then(Value::as_str)
            .ok_or_else(|| XlateError::invalid_args("Address entry without ip"))?;
        if let Some(other) = config.and_then(|c| member(c, "ip")).and_then(Value::as_str) {
            if other != ip {
                return Err(XlateError::invalid_args(format!(
                    "Address {} does not match config ip {}",
                    ip, other
                )));
            }
        }

        let len = config
            .and_then(|c| member(c, "prefix-length"))
            .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
            .ok_or_else(|| XlateError::invalid_args(format!("Missing prefix-length for {}", ip)))?;

        Prefix::parse(&format!("{}/{}", ip, len))
            .filter(|p| self.family.matches(p))
            .ok_or_else(|| XlateError::invalid_args(format!("Invalid {} address {}/{}", self.family.name(), ip, len)))
    }
}

impl SubtreeHook for IpAddresses {
    fn to_db(&self, ctx: &XfmrContext, payload: Option<&Value>) -> XlateResult<Vec<TableMutation>> {
        let ifname = interface_of(ctx)?;
        let table = Self::table(&ifname)?;
        let db = ctx.schema().db.clone();
        let separator = ctx.key_separator()?;
        let owned = self.owned(ctx, &ifname)?;
        let row = |prefix: &Prefix| {
            let key = DbKey::new(vec![ifname.clone(), prefix.to_string()]);
            RowRef::new(db.clone(), table, key.join(separator))
        };
        let mut out = Vec::new();

        let Some(payload) = payload else {
            return match Self::bound_address(ctx) {
                Some((_, true)) => Err(XlateError::not_supported("Delete of address attributes is not supported")),
                Some((ip, false)) => {
                    let matching: Vec<_> = owned.iter().filter(|(_, p)| p.addr.to_string() == ip).collect();
                    if matching.is_empty() {
                        return Err(XlateError::resource_not_found());
                    }
                    Ok(matching
                        .into_iter()
                        .map(|(key, _)| TableMutation::delete_row(&RowRef::new(db.clone(), table, key.clone())))
                        .collect())
                }
                None => Ok(owned
                    .iter()
                    .map(|(key, _)| TableMutation::delete_row(&RowRef::new(db.clone(), table, key.clone())))
                    .collect()),
            };
        };

        let entries = match payload.as_object().and_then(|o| member(o, "address")) {
            Some(Value::Array(items)) => items.clone(),
            Some(entry @ Value::Object(_)) => vec![entry.clone()],
            Some(_) => return Err(XlateError::invalid_args("Expected a list of addresses")),
            None => Vec::new(),
        };

        out.push(TableMutation::upsert(&RowRef::new(db.clone(), table, ifname.clone()), FieldMap::new()));
        let mut kept = Vec::new();
        for entry in &entries {
            let prefix = self.parse_entry(entry)?;
            for (key, existing) in &owned {
                if existing.addr == prefix.addr && existing.len != prefix.len {
                    out.push(TableMutation::delete_row(&RowRef::new(db.clone(), table, key.clone())));
                }
            }
            out.push(TableMutation::upsert(&row(&prefix), FieldMap::new()));
            kept.push(prefix);
        }

        if ctx.oper == Operation::Replace && Self::bound_address(ctx).is_none() {
            for (key, existing) in &owned {
                if !kept.iter().any(|p| p.addr == existing.addr) {
                    out.push(TableMutation::delete_row(&RowRef::new(db.clone(), table, key.clone())));
                }
            }
        }
        Ok(out)
    }

    fn from_db(&self, ctx: &XfmrContext) -> XlateResult<Option<Value>> {
        let ifname = interface_of(ctx)?;
        let entries: Vec<Value> = self
            .owned(ctx, &ifname)?
            .into_iter()
            .map(|(_, p)| {
                let ip = p.addr.to_string();
                json!({
                    "ip": ip,
                    "config": {"ip": ip, "prefix-length": p.len},
                    "state": {"ip": ip, "prefix-length": p.len},
                })
            })
            .collect();
        if entries.is_empty() {
            return Ok(None);
        }
        Ok(Some(json!({ "address": entries })))
    }

    fn reads(&self) -> Vec<TableRef> {
        ip_tables()
    }
}

/// Trunk VLAN memberships of an interface
///
/// Stored twice: a `VLAN_MEMBER|Vlan<id>|<if>` row per membership and the
/// interface in the VLAN row's `members@` list.
pub struct TrunkVlans;

impl TrunkVlans {
    fn vlan_name(id: u64) -> String {
        format!("Vlan{}", id)
    }

    fn members_field(ctx: &XfmrContext) -> String {
        format!("members{}", ctx.config.leaf_list_suffix)
    }

    fn memberships(ctx: &XfmrContext, ifname: &str) -> XlateResult<Vec<u64>> {
        let separator = ctx.key_separator()?;
        let mut ids = Vec::new();
        for key in ctx.store.get_keys(&ctx.schema().db, VLAN_MEMBER)? {
            let parsed = DbKey::parse(&key, separator);
            if parsed.len() != 2 || parsed.get(1) != Some(ifname) {
                continue;
            }
            if let Some(id) = parsed.get(0).and_then(|v| v.strip_prefix("Vlan")).and_then(|v| v.parse().ok()) {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    fn vlan_ids(payload: &Value) -> XlateResult<Vec<u64>> {
        let Some(config) = payload.as_object().and_then(|o| member(o, "config")).and_then(Value::as_object) else {
            return Ok(Vec::new());
        };
        let Some(items) = member(config, "trunk-vlans") else {
            return Ok(Vec::new());
        };
        let items = match items {
            Value::Array(items) => items.clone(),
            single => vec![single.clone()],
        };
        let mut ids = Vec::new();
        for item in items {
            let id = LeafType::uint(4094)
                .check(&item)
                .ok()
                .and_then(|v| v.as_u64())
                .filter(|id| *id > 0)
                .ok_or_else(|| XlateError::invalid_args(format!("Invalid VLAN id {}", item)))?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Pending `members@` of a VLAN row: stored value with earlier edits of
    /// this request applied
    fn members(ctx: &XfmrContext, pending: &[TableMutation], vlan: &RowRef) -> XlateResult<Vec<String>> {
        let mut row = ctx.store.get_entry(&vlan.db, &vlan.table, &vlan.key)?;
        for m in pending.iter().filter(|m| m.row() == *vlan) {
            m.apply_to_row(&mut row);
        }
        Ok(row
            .map(|r| r.get_list(&Self::members_field(ctx), ctx.list_separator()))
            .unwrap_or_default())
    }

    fn add(ctx: &XfmrContext, ifname: &str, id: u64, out: &mut Vec<TableMutation>) -> XlateResult<()> {
        let db = ctx.schema().db.clone();
        let separator = ctx.key_separator()?;
        let vlan = RowRef::new(db.clone(), VLAN, Self::vlan_name(id));
        let membership = DbKey::new(vec![Self::vlan_name(id), ifname.to_string()]).join(separator);

        out.push(TableMutation::upsert(
            &RowRef::new(db, VLAN_MEMBER, membership),
            FieldMap::with("tagging_mode", "tagged"),
        ));
        let mut members = Self::members(ctx, out.as_slice(), &vlan)?;
        if !members.iter().any(|m| m == ifname) {
            members.push(ifname.to_string());
            let mut fields = FieldMap::new();
            fields.set_list(Self::members_field(ctx), &members, ctx.list_separator());
            out.push(TableMutation::upsert(&vlan, fields));
        }
        Ok(())
    }

    fn remove(ctx: &XfmrContext, ifname: &str, id: u64, out: &mut Vec<TableMutation>) -> XlateResult<()> {
        let db = ctx.schema().db.clone();
        let separator = ctx.key_separator()?;
        let vlan = RowRef::new(db.clone(), VLAN, Self::vlan_name(id));
        let membership = DbKey::new(vec![Self::vlan_name(id), ifname.to_string()]).join(separator);

        out.push(TableMutation::delete_row(&RowRef::new(db, VLAN_MEMBER, membership)));
        let members: Vec<String> = Self::members(ctx, out.as_slice(), &vlan)?
            .into_iter()
            .filter(|m| m != ifname)
            .collect();
        if members.is_empty() {
            out.push(TableMutation::delete_fields(&vlan, vec![Self::members_field(ctx)]));
        } else {
            let mut fields = FieldMap::new();
            fields.set_list(Self::members_field(ctx), &members, ctx.list_separator());
            out.push(TableMutation::upsert(&vlan, fields));
        }
        Ok(())
    }
}

impl SubtreeHook for TrunkVlans {
    fn to_db(&self, ctx: &XfmrContext, payload: Option<&Value>) -> XlateResult<Vec<TableMutation>> {
        let ifname = interface_of(ctx)?;
        let current = Self::memberships(ctx, &ifname)?;
        let mut out = Vec::new();

        let Some(payload) = payload else {
            let doomed = match ctx.path.leaf_list_value.as_ref().and_then(Value::as_u64) {
                Some(id) if current.contains(&id) => vec![id],
                Some(_) => return Err(XlateError::resource_not_found()),
                None => current,
            };
            for id in doomed {
                Self::remove(ctx, &ifname, id, &mut out)?;
            }
            return Ok(out);
        };

        let wanted = Self::vlan_ids(payload)?;
        for id in &wanted {
            Self::add(ctx, &ifname, *id, &mut out)?;
        }
        if ctx.oper == Operation::Replace {
            for id in current.iter().filter(|id| !wanted.contains(id)) {
                Self::remove(ctx, &ifname, *id, &mut out)?;
            }
        }
        Ok(out)
    }

    fn from_db(&self, ctx: &XfmrContext) -> XlateResult<Option<Value>> {
        let ifname = interface_of(ctx)?;
        let ids = Self::memberships(ctx, &ifname)?;
        if ids.is_empty() {
            return Ok(None);
        }
        Ok(Some(json!({
            "config": {"trunk-vlans": ids},
            "state": {"trunk-vlans": ids},
        })))
    }

    fn reads(&self) -> Vec<TableRef> {
        vec![TableRef::new(CONFIG_DB, VLAN), TableRef::new(CONFIG_DB, VLAN_MEMBER)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use crate::config::EngineConfig;

    #[test]
    fn test_ip_table() {
        assert_eq!(ip_table("Ethernet8"), Some("INTERFACE"));
        assert_eq!(ip_table("Loopback0"), Some("LOOPBACK_INTERFACE"));
        assert_eq!(ip_table("Vlan10"), None);
    }

    #[test]
    fn test_interface_addresses_skips_bare_rows() {
        let config = EngineConfig::default();
        let store = InMemoryStore::new(&config);
        store.insert_row(CONFIG_DB, "INTERFACE", "Ethernet0", FieldMap::new()).unwrap();
        store
            .insert_row(CONFIG_DB, "INTERFACE", "Ethernet0|10.0.0.1/24", FieldMap::with("NULL", "NULL"))
            .unwrap();
        store
            .insert_row(CONFIG_DB, "LOOPBACK_INTERFACE", "Loopback0|2001:db8::1/128", FieldMap::with("NULL", "NULL"))
            .unwrap();

        let mut found = interface_addresses(&store, "|").unwrap();
        found.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].0, "Ethernet0");
        assert_eq!(found[0].1.to_string(), "10.0.0.1/24");
        assert_eq!(found[1].1.to_string(), "2001:db8::1/128");
    }

    #[test]
    fn test_vlan_ids() {
        let ids = TrunkVlans::vlan_ids(&json!({"config": {"trunk-vlans": [10, "20", 10]}})).unwrap();
        assert_eq!(ids, vec![10, 20]);
        assert!(TrunkVlans::vlan_ids(&json!({"config": {"trunk-vlans": [5000]}})).is_err());
        assert!(TrunkVlans::vlan_ids(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn test_parse_entry_family() {
        let v4 = IpAddresses::new(IpFamily::V4);
        let entry = json!({"ip": "10.1.1.1", "config": {"ip": "10.1.1.1", "prefix-length": 24}});
        assert_eq!(v4.parse_entry(&entry).unwrap().to_string(), "10.1.1.1/24");

        let v6 = IpAddresses::new(IpFamily::V6);
        assert!(v6.parse_entry(&entry).is_err());

        let mismatch = json!({"ip": "10.1.1.1", "config": {"ip": "10.1.1.2", "prefix-length": 24}});
        assert!(v4.parse_entry(&mismatch).is_err());
    }
}
