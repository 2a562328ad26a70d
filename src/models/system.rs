//! openconfig-system
//!
//! Hostname, NTP servers with a shared source interface and VRF, AAA method lists
//! and server groups, remote syslog servers and the process table.

use serde_json::{json, Value};

use super::interfaces::{interface_addresses, ip_tables};
use crate::config::{CONFIG_DB, STATE_DB};
use crate::errors::{XlateError, XlateErrorCode, XlateResult};
use crate::schema::{LeafType, SchemaNode};
use crate::store::{DbKey, FieldMap, RowRef, TableRef};
use crate::transformer::{
    value_text, ClearOnLastRow, CompositeKey, DenyOperations, FieldHook, FieldUpdate, HookRegistry, KeyHook,
    KeyedTableHook, Operation, PreHook, ValueMapCodec, XfmrContext,
};
use crate::validation::{AllowedTokens, ConsistentControlField, ValidationEngine};

pub const MODULE: &str = "openconfig-system";
pub const AAA_TYPES_MODULE: &str = "openconfig-aaa-types";
pub const LOGGING_MODULE: &str = "openconfig-system-logging";

const NTP: &str = "NTP";
const NTP_SERVER: &str = "NTP_SERVER";
const AAA: &str = "AAA";

const SERVER_GROUPS: [&str; 2] = ["TACACS", "RADIUS"];

const FACILITIES: [&str; 15] = [
    "ALL", "KERNEL", "USER", "MAIL", "SYSTEM_DAEMON", "AUTH", "SYSLOG", "LOCAL0", "LOCAL1", "LOCAL2", "LOCAL3",
    "LOCAL4", "LOCAL5", "LOCAL6", "LOCAL7",
];

const SEVERITIES: [&str; 8] = [
    "EMERGENCY",
    "ALERT",
    "CRITICAL",
    "ERROR",
    "WARNING",
    "NOTICE",
    "INFORMATIONAL",
    "DEBUG",
];

pub fn schema() -> SchemaNode {
    SchemaNode::container("system")
        .module(MODULE)
        .child(hostname(SchemaNode::container("config")))
        .child(hostname(SchemaNode::container("state").state()))
        .child(ntp())
        .child(aaa())
        .child(logging())
        .child(processes())
}

fn hostname(node: SchemaNode) -> SchemaNode {
    node.table("DEVICE_METADATA")
        .row_key("localhost")
        .child(SchemaNode::leaf("hostname", LeafType::pattern(r"[A-Za-z0-9][A-Za-z0-9.\-]{0,62}")).field("hostname"))
}

fn ntp() -> SchemaNode {
    let leaves = |node: SchemaNode| {
        node.child(SchemaNode::leaf("address", LeafType::string()).from_key("address"))
            .child(SchemaNode::leaf("iburst", LeafType::Boolean).codec("bool-on-off"))
            .child(
                SchemaNode::leaf("source-address", LeafType::string())
                    .table(NTP)
                    .row_key("global")
                    .field_hook("ntp-source-address"),
            )
            .child(
                SchemaNode::leaf("network-instance", LeafType::string())
                    .table(NTP)
                    .row_key("global")
                    .field("vrf")
                    .pre_hook("ntp-vrf-delete"),
            )
    };
    SchemaNode::container("ntp").child(
        SchemaNode::container("servers").child(
            SchemaNode::list("server", &["address"])
                .table(NTP_SERVER)
                .post_hook("ntp-source-cleanup")
                .child(SchemaNode::leaf("address", LeafType::string()))
                .child(leaves(SchemaNode::container("config")))
                .child(leaves(SchemaNode::container("state").state())),
        ),
    )
}

fn aaa_method() -> LeafType {
    LeafType::Union {
        members: vec![
            LeafType::identityref(AAA_TYPES_MODULE, &["TACACS_ALL", "RADIUS_ALL", "LOCAL"]),
            LeafType::string(),
        ],
    }
}

fn aaa() -> SchemaNode {
    let method = |kind: &str| {
        let leaf = format!("{}-method", kind);
        let leaves = |node: SchemaNode| {
            node.child(
                SchemaNode::leaf_list(leaf.as_str(), aaa_method())
                    .field("login")
                    .codec("aaa-method"),
            )
        };
        SchemaNode::container(kind)
            .table(AAA)
            .row_key(kind)
            .child(leaves(SchemaNode::container("config")))
            .child(leaves(SchemaNode::container("state").state()))
    };

    let group_type = || LeafType::identityref("openconfig-aaa", &SERVER_GROUPS);
    let group_leaves = |node: SchemaNode| {
        node.child(SchemaNode::leaf("name", LeafType::string()).from_key("name"))
            .child(SchemaNode::leaf("type", group_type()).codec("identity"))
    };
    let server_leaves = |node: SchemaNode| {
        node.child(SchemaNode::leaf("address", LeafType::string()).from_key("address"))
            .child(SchemaNode::leaf("port", LeafType::uint(65535)).field("port"))
            .child(SchemaNode::leaf("timeout", LeafType::uint(300)).field("timeout"))
    };

    SchemaNode::container("aaa")
        .child(method("authentication"))
        .child(method("authorization"))
        .child(method("accounting"))
        .child(
            SchemaNode::container("server-groups").child(
                SchemaNode::list("server-group", &["name"])
                    .table("AAA_SERVER_GROUP")
                    .pre_hook("aaa-server-group-name")
                    .child(SchemaNode::leaf("name", LeafType::string()))
                    .child(group_leaves(SchemaNode::container("config")))
                    .child(group_leaves(SchemaNode::container("state").state()))
                    .child(
                        SchemaNode::container("servers").child(
                            SchemaNode::list("server", &["address"])
                                .table_hook("aaa-server-table")
                                .key_hook("aaa-server-address")
                                .child(SchemaNode::leaf("address", LeafType::string()))
                                .child(server_leaves(SchemaNode::container("config")))
                                .child(server_leaves(SchemaNode::container("state").state())),
                        ),
                    ),
            ),
        )
}

fn logging() -> SchemaNode {
    let server_leaves = |node: SchemaNode| {
        node.child(SchemaNode::leaf("host", LeafType::string()).from_key("host"))
            .child(SchemaNode::leaf("remote-port", LeafType::uint(65535)).field("port"))
    };
    let selector_leaves = |node: SchemaNode| {
        node.child(SchemaNode::leaf("facility", LeafType::identityref(LOGGING_MODULE, &FACILITIES)).from_key("facility"))
            .child(SchemaNode::leaf("severity", LeafType::enumeration(&SEVERITIES)).from_key("severity"))
    };

    SchemaNode::container("logging").child(
        SchemaNode::container("remote-servers").child(
            SchemaNode::list("remote-server", &["host"])
                .table("SYSLOG_SERVER")
                .child(SchemaNode::leaf("host", LeafType::string()))
                .child(server_leaves(SchemaNode::container("config")))
                .child(server_leaves(SchemaNode::container("state").state()))
                .child(
                    SchemaNode::container("selectors").child(
                        SchemaNode::list("selector", &["facility", "severity"])
                            .table("SYSLOG_SERVER_SELECTOR")
                            .key_hook("syslog-selector")
                            .child(SchemaNode::leaf("facility", LeafType::identityref(LOGGING_MODULE, &FACILITIES)))
                            .child(SchemaNode::leaf("severity", LeafType::enumeration(&SEVERITIES)))
                            .child(selector_leaves(SchemaNode::container("config")))
                            .child(selector_leaves(SchemaNode::container("state").state())),
                    ),
                ),
        ),
    )
}

fn processes() -> SchemaNode {
    SchemaNode::container("processes").state().child(
        SchemaNode::list("process", &["pid"])
            .db(STATE_DB)
            .table("PROCESS_STATS")
            .child(SchemaNode::leaf("pid", LeafType::uint(u64::from(u32::MAX))))
            .child(
                SchemaNode::container("state")
                    .child(SchemaNode::leaf("pid", LeafType::uint(u64::from(u32::MAX))).from_key("pid"))
                    .child(SchemaNode::leaf("name", LeafType::string()).field_hook("process-name"))
                    .child(SchemaNode::leaf_list("args", LeafType::string()).field_hook("process-args")),
            ),
    )
}

pub fn register(hooks: &mut HookRegistry, validators: &mut ValidationEngine) {
    let ntp_global = RowRef::new(CONFIG_DB, NTP, "global");

    hooks
        .register_field_hook("ntp-source-address", NtpSourceAddress)
        .register_post_hook(
            "ntp-source-cleanup",
            ClearOnLastRow::new(TableRef::new(CONFIG_DB, NTP_SERVER), ntp_global.clone(), &["src_intf", "vrf"]),
        )
        .register_pre_hook(
            "ntp-vrf-delete",
            DenyOperations::new(
                &[Operation::Delete],
                XlateErrorCode::InvalidArgs,
                "Delete server instead of network-instance removal",
            ),
        )
        .register_codec(
            "aaa-method",
            ValueMapCodec::new(&[("TACACS_ALL", "tacacs+"), ("RADIUS_ALL", "radius"), ("LOCAL", "local")]).passthrough(),
        )
        .register_pre_hook("aaa-server-group-name", ServerGroupName)
        .register_table_hook(
            "aaa-server-table",
            KeyedTableHook::new("name")
                .exact("TACACS", "TACPLUS_SERVER")
                .exact("RADIUS", "RADIUS_SERVER"),
        )
        .register_key_hook("aaa-server-address", OwnKey)
        .register_key_hook("syslog-selector", CompositeKey::new(':'))
        .register_field_hook("process-name", ProcessCommand::Name)
        .register_field_hook("process-args", ProcessCommand::Args);

    validators
        .register(
            ConsistentControlField::new(TableRef::new(CONFIG_DB, NTP_SERVER), ntp_global.clone(), "src_intf")
                .message("Given source address's port doesn't match with already configured src_intf"),
        )
        .register(
            ConsistentControlField::new(TableRef::new(CONFIG_DB, NTP_SERVER), ntp_global, "vrf").message(
                "Given network-instance name is different from already configured one for this/any other server",
            ),
        )
        .register(AllowedTokens::new(
            TableRef::new(CONFIG_DB, AAA),
            "login@",
            &["tacacs+", "radius", "local", "default"],
        ));
}

/// NTP source address, stored as the interface that owns it
pub struct NtpSourceAddress;

impl FieldHook for NtpSourceAddress {
    fn to_db(&self, ctx: &XfmrContext, value: Option<&Value>) -> XlateResult<FieldUpdate> {
        let Some(value) = value else {
            return Ok(FieldUpdate::delete(&["src_intf"]));
        };
        let ip = value_text(value);
        let owner = interface_addresses(ctx.store, ctx.key_separator()?)?
            .into_iter()
            .find(|(_, prefix)| prefix.addr.to_string() == ip)
            .map(|(ifname, _)| ifname)
            .ok_or_else(|| XlateError::invalid_args("Failed to get source interface for given source address"))?;
        Ok(FieldUpdate::set("src_intf", owner))
    }

    fn from_db(&self, ctx: &XfmrContext, row: Option<&FieldMap>) -> XlateResult<Option<Value>> {
        let Some(ifname) = row.and_then(|r| r.get("src_intf")) else {
            return Ok(None);
        };
        let mut owned: Vec<_> = interface_addresses(ctx.store, ctx.key_separator()?)?
            .into_iter()
            .filter(|(name, _)| name == ifname)
            .map(|(_, prefix)| prefix)
            .collect();
        // IPv4 first, then lowest address
        owned.sort_by_key(|p| (p.addr.is_ipv6(), p.addr));
        Ok(owned.first().map(|p| Value::String(p.addr.to_string())))
    }

    fn reads(&self) -> Vec<TableRef> {
        ip_tables()
    }
}

/// Only the TACACS and RADIUS server groups exist
pub struct ServerGroupName;

impl PreHook for ServerGroupName {
    fn check(&self, ctx: &XfmrContext) -> XlateResult<()> {
        match ctx.key_text("name") {
            Some(name) if !SERVER_GROUPS.contains(&name.as_str()) => Err(XlateError::invalid_args(format!(
                "Invalid server group name '{}'; must be TACACS or RADIUS",
                name
            ))),
            _ => Ok(()),
        }
    }
}

/// Row key made of the list's own single key, ignoring enclosing lists
pub struct OwnKey;

impl KeyHook for OwnKey {
    fn to_db(&self, ctx: &XfmrContext) -> XlateResult<String> {
        let bound = ctx
            .scope
            .for_list(ctx.node)
            .and_then(|l| l.values.first())
            .ok_or_else(|| XlateError::internal(format!("key of '{}' is not bound", ctx.schema().name)))?;
        Ok(value_text(&bound.1))
    }

    fn from_db(&self, ctx: &XfmrContext, key: &str) -> XlateResult<Option<Vec<(String, Value)>>> {
        let list = ctx.schema();
        let Some(name) = list.keys.first() else {
            return Ok(None);
        };
        if DbKey::parse(key, ctx.key_separator()?).len() != 1 {
            return Ok(None);
        }
        let leaf = ctx
            .index
            .child(ctx.node, name)
            .ok_or_else(|| XlateError::internal(format!("list '{}' lost key leaf '{}'", list.name, name)))?;
        Ok(ctx
            .index
            .node(leaf)
            .leaf_type()?
            .parse_text(key)
            .ok()
            .map(|v| vec![(name.clone(), v)]))
    }
}

/// Process name and arguments, split from the `CMD` field
#[derive(Debug, Clone, Copy)]
pub enum ProcessCommand {
    Name,
    Args,
}

impl ProcessCommand {
    fn extract(&self, cmd: &str) -> Option<Value> {
        let mut words = cmd.split_whitespace();
        let name = words.next()?;
        match self {
            ProcessCommand::Name => Some(Value::String(name.to_string())),
            ProcessCommand::Args => {
                let args: Vec<&str> = words.collect();
                (!args.is_empty()).then(|| json!(args))
            }
        }
    }
}

impl FieldHook for ProcessCommand {
    fn to_db(&self, _ctx: &XfmrContext, _value: Option<&Value>) -> XlateResult<FieldUpdate> {
        Err(XlateError::not_supported("Process data is read-only"))
    }

    fn from_db(&self, _ctx: &XfmrContext, row: Option<&FieldMap>) -> XlateResult<Option<Value>> {
        Ok(row.and_then(|r| r.get("CMD")).and_then(|cmd| self.extract(cmd)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_command() {
        let cmd = "/usr/bin/python3 -m  sonic.daemon --verbose";
        assert_eq!(ProcessCommand::Name.extract(cmd), Some(json!("/usr/bin/python3")));
        assert_eq!(
            ProcessCommand::Args.extract(cmd),
            Some(json!(["-m", "sonic.daemon", "--verbose"]))
        );
        assert_eq!(ProcessCommand::Args.extract("sshd"), None);
        assert_eq!(ProcessCommand::Name.extract("   "), None);
    }

    #[test]
    fn test_aaa_method_type() {
        let ty = aaa_method();
        assert_eq!(ty.check(&json!("openconfig-aaa-types:TACACS_ALL")).unwrap(), json!("TACACS_ALL"));
        assert_eq!(ty.check(&json!("default")).unwrap(), json!("default"));
        assert_eq!(ty.render(&json!("LOCAL")), json!("openconfig-aaa-types:LOCAL"));
    }
}
