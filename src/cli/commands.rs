//! CLI command implementations
//!
//! Each invocation builds the reference engine over an in-memory store,
//! optionally seeded from `--data`, runs one request and prints one JSON
//! response. Successful writes are saved back to `--data`.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::errors::{XlateError, XlateResult};
use crate::models::reference_engine;
use crate::query::QueryParameters;
use crate::store::{InMemoryStore, KvStore};
use crate::transformer::Operation;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_payload, write_error, write_response};

/// Parse arguments and run the command
pub fn run() -> CliResult<()> {
    run_command(Cli::parse_args())
}

pub fn run_command(cli: Cli) -> CliResult<()> {
    let config = load_config(cli.config.as_deref())?;
    let store = Arc::new(open_store(&config, cli.data.as_deref())?);
    let shared: Arc<dyn KvStore> = store.clone();
    let engine = reference_engine(config, shared).map_err(|e| CliError::config_error(e.to_string()))?;

    match execute(&engine, &cli.command) {
        Ok(data) => {
            if cli.command.is_write() {
                if let Some(path) = cli.data.as_deref() {
                    store
                        .save_file(path)
                        .map_err(|e| CliError::data_error(format!("Failed to save {}: {}", path.display(), e)))?;
                }
            }
            write_response(data)
        }
        Err(err) => {
            write_error(&err)?;
            Err(CliError::request_failed(&err))
        }
    }
}

fn load_config(path: Option<&Path>) -> CliResult<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path).map_err(|e| CliError::config_error(e.message())),
        None => Ok(EngineConfig::default()),
    }
}

/// Store seeded from a dump; a missing dump file starts empty
fn open_store(config: &EngineConfig, data: Option<&Path>) -> CliResult<InMemoryStore> {
    let store = InMemoryStore::new(config);
    if let Some(path) = data.filter(|p| p.exists()) {
        store
            .load_file(path)
            .map_err(|e| CliError::data_error(format!("Failed to load {}: {}", path.display(), e)))?;
    }
    Ok(store)
}

fn payload(arg: &str) -> XlateResult<Value> {
    read_payload(arg).map_err(|e| XlateError::invalid_args(e.message()))
}

/// Run one request against the engine
pub fn execute(engine: &Engine, command: &Command) -> XlateResult<Value> {
    match command {
        Command::Get {
            path,
            depth,
            content,
            fields,
        } => {
            let params = QueryParameters::parse(depth.as_deref(), content.as_deref(), fields)?;
            engine.get(path, &params)
        }
        Command::Create(args) => report(engine.create(&args.path, &payload(&args.payload)?)?),
        Command::Update(args) => report(engine.update(&args.path, &payload(&args.payload)?)?),
        Command::Replace(args) => report(engine.replace(&args.path, &payload(&args.payload)?)?),
        Command::Delete { path } => report(engine.delete(path)?),
        Command::Plan {
            operation,
            path,
            payload: arg,
        } => {
            let oper = Operation::from(*operation);
            let body = arg.as_deref().map(payload).transpose()?;
            let plan = engine.plan(oper, path, body.as_ref())?;
            Ok(serde_json::to_value(plan)?)
        }
    }
}

fn report(report: crate::executor::CommitReport) -> XlateResult<Value> {
    Ok(json!({
        "databases": report.databases,
        "mutations": report.mutations,
    }))
}

impl Command {
    /// Commands that change the store
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Command::Create(_) | Command::Update(_) | Command::Replace(_) | Command::Delete { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FieldMap;
    use clap::Parser;

    fn engine_with_port() -> (Arc<InMemoryStore>, Engine) {
        let config = EngineConfig::default();
        let store = Arc::new(InMemoryStore::new(&config));
        store
            .insert_row("CONFIG_DB", "PORT", "Ethernet0", FieldMap::with("mtu", "9100"))
            .unwrap();
        let engine = reference_engine(config, store.clone()).unwrap();
        (store, engine)
    }

    #[test]
    fn test_execute_get() {
        let (_, engine) = engine_with_port();
        let cli = Cli::try_parse_from([
            "treexlate",
            "get",
            "/interfaces/interface[name=Ethernet0]/config/mtu",
        ])
        .unwrap();
        let out = execute(&engine, &cli.command).unwrap();
        assert_eq!(out, json!({"openconfig-interfaces:mtu": 9100}));
    }

    #[test]
    fn test_execute_bad_payload() {
        let (_, engine) = engine_with_port();
        let cli = Cli::try_parse_from([
            "treexlate",
            "update",
            "/interfaces/interface[name=Ethernet0]/config",
            "--payload",
            "{oops",
        ])
        .unwrap();
        let err = execute(&engine, &cli.command).unwrap_err();
        assert_eq!(err.code(), crate::errors::XlateErrorCode::InvalidArgs);
    }

    #[test]
    fn test_plan_does_not_write() {
        let (store, engine) = engine_with_port();
        let cli = Cli::try_parse_from([
            "treexlate",
            "plan",
            "update",
            "/interfaces/interface[name=Ethernet0]/config/mtu",
            "--payload",
            r#"{"mtu": 1500}"#,
        ])
        .unwrap();
        let plan = execute(&engine, &cli.command).unwrap();
        assert_eq!(plan["oper"], "UPDATE");
        assert!(plan["mutations"].to_string().contains("1500"));
        let row = store.get_entry("CONFIG_DB", "PORT", "Ethernet0").unwrap().unwrap();
        assert_eq!(row.get("mtu"), Some("9100"));
    }

    #[test]
    fn test_run_command_saves_data() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("db.json");
        let cli = Cli::try_parse_from([
            "treexlate",
            "--data",
            data.to_str().unwrap(),
            "update",
            "/system/config",
            "--payload",
            r#"{"config": {"hostname": "leaf1"}}"#,
        ])
        .unwrap();
        run_command(cli).unwrap();

        let store = InMemoryStore::new(&EngineConfig::default());
        store.load_file(&data).unwrap();
        let row = store.get_entry("CONFIG_DB", "DEVICE_METADATA", "localhost").unwrap().unwrap();
        assert_eq!(row.get("hostname"), Some("leaf1"));
    }
}
