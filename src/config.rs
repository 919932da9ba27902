use crate::form_core::ValueMap;
use crate::model::{is_json_path, FormSchema};
use anyhow::{bail, Context, Result};
use clap::Parser;
use log::LevelFilter;
use serde_json::Value as JsonValue;
use std::fs;
use std::path::{Path, PathBuf};

pub const SCHEMA_FILE: &str = "form.yaml";
pub const SCHEMA_DIR: &str = ".dynform";

/// Command line. `DYNFORM_SCHEMA` stands in for the positional schema path.
#[derive(Debug, Parser)]
#[command(name = "dynform", version, about = "Fill in a schema-driven form in the terminal")]
pub struct Cli {
    /// Form schema (YAML or JSON); discovered from the working directory when omitted
    #[arg(env = "DYNFORM_SCHEMA")]
    pub schema: Option<PathBuf>,
    /// Initial values, a YAML or JSON mapping of field id to value
    #[arg(short, long)]
    pub data: Option<PathBuf>,
}

/// Everything the binary needs before it draws the first frame.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchConfig {
    pub schema_path: PathBuf,
    pub data_path: Option<PathBuf>,
    pub headless: bool,
    pub ticks: u64,
    /// Headless only: press Submit after the first frame.
    pub headless_submit: bool,
    pub log_level: LevelFilter,
}

impl LaunchConfig {
    pub fn from_env() -> Result<Self> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::resolve(Cli::parse(), |k| std::env::var(k).ok(), &cwd)
    }

    pub fn resolve(cli: Cli, env: impl Fn(&str) -> Option<String>, cwd: &Path) -> Result<Self> {
        let schema_path = match cli.schema {
            Some(p) => p,
            None => discover_schema(cwd).with_context(|| {
                format!(
                    "No schema found. Pass a schema path, set DYNFORM_SCHEMA, or place {SCHEMA_FILE} in CWD/{SCHEMA_DIR} and ancestors"
                )
            })?,
        };

        let headless = env_flag(env("DYNFORM_HEADLESS").as_deref());
        let ticks = env("DYNFORM_TICKS")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(10);
        let headless_submit = env_flag(env("DYNFORM_HEADLESS_SUBMIT").as_deref());
        let log_level = crate::logging::parse_level(env("DYNFORM_LOG").as_deref());

        Ok(Self {
            schema_path,
            data_path: cli.data,
            headless,
            ticks,
            headless_submit,
            log_level,
        })
    }
}

fn env_flag(v: Option<&str>) -> bool {
    v.map(|v| v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
        .unwrap_or(false)
}

/// `form.yaml` or `.dynform/form.yaml` in `start`, then `.dynform/form.yaml`
/// in each ancestor.
pub fn discover_schema(start: &Path) -> Option<PathBuf> {
    let candidates = [
        start.join(SCHEMA_FILE),
        start.join(SCHEMA_DIR).join(SCHEMA_FILE),
    ];
    if let Some(p) = candidates.into_iter().find(|p| p.exists()) {
        return Some(p);
    }
    let mut cur = start;
    while let Some(parent) = cur.parent() {
        let p = parent.join(SCHEMA_DIR).join(SCHEMA_FILE);
        if p.exists() {
            return Some(p);
        }
        cur = parent;
    }
    None
}

pub fn load_schema(path: &Path) -> Result<FormSchema> {
    FormSchema::load(path).with_context(|| format!("loading schema {path:?}"))
}

/// Initial values: a YAML or JSON mapping of field id to value.
pub fn load_values(path: &Path) -> Result<ValueMap> {
    let s = fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
    let doc: JsonValue = if is_json_path(path) {
        serde_json::from_str(&s).with_context(|| format!("parsing {path:?}"))?
    } else {
        serde_yaml::from_str(&s).with_context(|| format!("parsing {path:?}"))?
    };
    match doc {
        JsonValue::Object(map) => Ok(map.into_iter().collect()),
        JsonValue::Null => Ok(ValueMap::new()),
        other => bail!("{path:?}: expected a mapping of field values, got {other}"),
    }
}
