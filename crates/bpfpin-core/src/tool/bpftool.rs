//! `bpftool` invocation: argument construction and captured-output runs.

use std::path::{Path, PathBuf};
use std::process::Command;

use super::error::ToolError;
use super::{CreateMapRequest, MapAdmin, MapMeta};

/// Administrative transport backed by the `bpftool` binary.
#[derive(Debug, Clone)]
pub struct Bpftool {
    program: PathBuf,
}

impl Default for Bpftool {
    fn default() -> Self {
        Self::new("bpftool")
    }
}

impl Bpftool {
    /// Creates a transport invoking `program` (a name resolved via `PATH`
    /// or an absolute path).
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Runs the tool with `args`, returning captured stdout on success.
    ///
    /// On failure the error carries `context` plus the captured
    /// diagnostics (stderr, falling back to stdout when stderr is empty,
    /// as creation errors land there).
    fn run(&self, args: &[String], context: &str) -> Result<Vec<u8>, ToolError> {
        tracing::debug!("running {} {}", self.program.display(), args.join(" "));
        let output = Command::new(&self.program).args(args).output().map_err(|source| {
            ToolError::Launch {
                program: self.program.display().to_string(),
                source,
            }
        })?;

        if !output.status.success() {
            let mut diagnostics = String::from_utf8_lossy(&output.stderr).into_owned();
            if diagnostics.trim().is_empty() {
                diagnostics = String::from_utf8_lossy(&output.stdout).into_owned();
            }
            tracing::error!("{context}: {} failed: {}", self.program.display(), diagnostics.trim());
            return Err(ToolError::Failed {
                context: context.to_string(),
                program: self.program.display().to_string(),
                status: output.status.to_string(),
                diagnostics,
            });
        }

        Ok(output.stdout)
    }
}

impl MapAdmin for Bpftool {
    fn create_map(&self, req: &CreateMapRequest<'_>) -> Result<(), ToolError> {
        let context = format!("map create {}", req.pin.display());
        self.run(&create_args(req), &context)?;
        Ok(())
    }

    fn dump_map(&self, pin: &Path) -> Result<Vec<u8>, ToolError> {
        let context = format!("map dump {}", pin.display());
        self.run(&dump_args(pin), &context)
    }

    fn delete_entry(&self, pin: &Path, key: &[u8]) -> Result<(), ToolError> {
        let context = format!("map delete {} key {key:?}", pin.display());
        self.run(&delete_args(pin, key), &context)?;
        Ok(())
    }

    fn list_maps(&self) -> Result<Vec<MapMeta>, ToolError> {
        let out = self.run(&list_args(), "map list")?;
        serde_json::from_slice(&out).map_err(|source| ToolError::BadJson {
            context: "map list".to_string(),
            source,
        })
    }

    fn pin_by_id(&self, id: u32, pin: &Path) -> Result<(), ToolError> {
        let context = format!("map pin id {id} at {}", pin.display());
        self.run(&pin_args(id, pin), &context)?;
        Ok(())
    }
}

/// Arguments for dumping the map pinned at `pin` as a JSON document.
#[must_use]
pub fn dump_args(pin: &Path) -> Vec<String> {
    vec![
        "--json".to_string(),
        "--pretty".to_string(),
        "map".to_string(),
        "dump".to_string(),
        "pinned".to_string(),
        pin.display().to_string(),
    ]
}

fn create_args(req: &CreateMapRequest<'_>) -> Vec<String> {
    vec![
        "map".to_string(),
        "create".to_string(),
        req.pin.display().to_string(),
        "type".to_string(),
        req.kernel_type.to_string(),
        "key".to_string(),
        req.key_size.to_string(),
        "value".to_string(),
        req.value_size.to_string(),
        "entries".to_string(),
        req.max_entries.to_string(),
        "name".to_string(),
        req.name.to_string(),
        "flags".to_string(),
        req.flags.to_string(),
    ]
}

/// Keys are passed to the tool one decimal byte per argument.
fn delete_args(pin: &Path, key: &[u8]) -> Vec<String> {
    let mut args = Vec::with_capacity(5 + key.len());
    args.push("map".to_string());
    args.push("delete".to_string());
    args.push("pinned".to_string());
    args.push(pin.display().to_string());
    args.push("key".to_string());
    args.extend(key.iter().map(ToString::to_string));
    args
}

fn list_args() -> Vec<String> {
    vec!["map".to_string(), "list".to_string(), "-j".to_string()]
}

fn pin_args(id: u32, pin: &Path) -> Vec<String> {
    vec![
        "map".to_string(),
        "pin".to_string(),
        "id".to_string(),
        id.to_string(),
        pin.display().to_string(),
    ]
}
