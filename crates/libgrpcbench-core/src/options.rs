//! Composable run options
//!
//! Each constructor returns a [`RunOption`] that changes one concern of a
//! [`RunConfig`] while it is being assembled. Options run in the order given
//! and later options overwrite what earlier ones set.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::config::RunConfig;
use crate::error::{ConfigError, Result};

type ApplyFn = dyn Fn(&mut RunConfig) -> Result<()> + Send + Sync;

/// A named mutation applied to a configuration under construction
#[derive(Clone)]
pub struct RunOption {
    name: &'static str,
    apply: Arc<ApplyFn>,
}

impl RunOption {
    pub(crate) fn new<F>(name: &'static str, apply: F) -> Self
    where
        F: Fn(&mut RunConfig) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name,
            apply: Arc::new(apply),
        }
    }

    /// Short name of the concern this option sets
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn apply(&self, config: &mut RunConfig) -> Result<()> {
        (self.apply)(config)
    }
}

impl fmt::Debug for RunOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOption").field("name", &self.name).finish()
    }
}

/// Extension of the last path element, including the dot. A path ending in
/// a separator has an empty last element and so no extension.
fn extension(path: &str) -> Option<&str> {
    let file = path.rsplit(std::path::is_separator).next().unwrap_or(path);
    file.rfind('.').map(|i| &file[i..])
}

fn read_file(context: &'static str, path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| ConfigError::file(context, path, e))
}

/// Certificate file and the server name to verify it against
pub fn certificate(cert: impl Into<String>, cname: impl Into<String>) -> RunOption {
    let cert = cert.into().trim().to_string();
    let cname = cname.into();
    RunOption::new("certificate", move |c| {
        c.cert = cert.clone();
        c.cname = cname.clone();
        Ok(())
    })
}

pub fn insecure(insecure: bool) -> RunOption {
    RunOption::new("insecure", move |c| {
        c.insecure = insecure;
        Ok(())
    })
}

/// Number of requests to send in total
pub fn total_requests(n: u32) -> RunOption {
    RunOption::new("total_requests", move |c| {
        c.total_requests = n;
        Ok(())
    })
}

/// Number of requests in flight at once
pub fn concurrency(n: u32) -> RunOption {
    RunOption::new("concurrency", move |c| {
        c.concurrency = n;
        Ok(())
    })
}

/// Queries-per-second cap, 0 for no limit
pub fn qps(qps: u32) -> RunOption {
    RunOption::new("qps", move |c| {
        c.qps = qps;
        Ok(())
    })
}

/// Stop after this long instead of after the request count
pub fn run_duration(duration: Duration) -> RunOption {
    RunOption::new("run_duration", move |c| {
        c.run_duration = duration;
        Ok(())
    })
}

/// Timeout for each request
pub fn timeout(timeout: Duration) -> RunOption {
    RunOption::new("timeout", move |c| {
        c.timeout = timeout;
        Ok(())
    })
}

/// Timeout for establishing the initial connection
pub fn dial_timeout(timeout: Duration) -> RunOption {
    RunOption::new("dial_timeout", move |c| {
        c.dial_timeout = timeout;
        Ok(())
    })
}

pub fn keepalive(interval: Duration) -> RunOption {
    RunOption::new("keepalive", move |c| {
        c.keepalive = interval;
        Ok(())
    })
}

/// Serialized binary message sent as the request body
pub fn binary_data(data: impl Into<Vec<u8>>) -> RunOption {
    let data = data.into();
    RunOption::new("binary_data", move |c| {
        c.data = data.clone();
        c.binary = true;
        Ok(())
    })
}

pub fn binary_data_from_file(path: impl Into<PathBuf>) -> RunOption {
    let path = path.into();
    RunOption::new("binary_data_from_file", move |c| {
        c.data = read_file("read binary data file", &path)?;
        c.binary = true;
        Ok(())
    })
}

/// JSON request body given as text
pub fn json_data_from_str(data: impl Into<String>) -> RunOption {
    let data = data.into().into_bytes();
    RunOption::new("json_data_from_str", move |c| {
        c.data = data.clone();
        c.binary = false;
        Ok(())
    })
}

/// JSON request body serialized from any `Serialize` value
pub fn json_data<T>(data: T) -> RunOption
where
    T: Serialize + Send + Sync + 'static,
{
    RunOption::new("json_data", move |c| {
        c.data = serde_json::to_vec(&data)?;
        c.binary = false;
        Ok(())
    })
}

/// JSON request body read to the end of `reader`.
///
/// The reader is consumed by the first build that applies this option.
pub fn json_data_from_reader<R>(reader: R) -> RunOption
where
    R: Read + Send + 'static,
{
    let reader = Mutex::new(reader);
    RunOption::new("json_data_from_reader", move |c| {
        let mut reader = reader.lock().map_err(|_| ConfigError::Stream {
            context: "read JSON data",
            source: std::io::Error::other("reader lock poisoned"),
        })?;
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .map_err(|source| ConfigError::Stream {
                context: "read JSON data",
                source,
            })?;
        c.data = data;
        c.binary = false;
        Ok(())
    })
}

pub fn json_data_from_file(path: impl Into<PathBuf>) -> RunOption {
    let path = path.into();
    RunOption::new("json_data_from_file", move |c| {
        c.data = read_file("read JSON data file", &path)?;
        c.binary = false;
        Ok(())
    })
}

/// Call metadata as a JSON object string
pub fn metadata_from_json(metadata: impl Into<String>) -> RunOption {
    let metadata = metadata.into().into_bytes();
    RunOption::new("metadata_from_json", move |c| {
        c.metadata = metadata.clone();
        Ok(())
    })
}

/// Call metadata from key/value pairs, encoded as a JSON object
pub fn metadata<I, K, V>(pairs: I) -> RunOption
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let map: BTreeMap<String, String> = pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    RunOption::new("metadata", move |c| {
        c.metadata = serde_json::to_vec(&map)?;
        Ok(())
    })
}

pub fn metadata_from_file(path: impl Into<PathBuf>) -> RunOption {
    let path = path.into();
    RunOption::new("metadata_from_file", move |c| {
        c.metadata = read_file("read metadata file", &path)?;
        Ok(())
    })
}

/// Run name; blank names keep the generated default
pub fn name(name: impl Into<String>) -> RunOption {
    let name = name.into().trim().to_string();
    RunOption::new("name", move |c| {
        if name.is_empty() {
            debug!("blank run name, keeping default");
        } else {
            c.name = name.clone();
        }
        Ok(())
    })
}

/// Parallelism hint; 0 keeps the default
pub fn cpus(cpus: usize) -> RunOption {
    RunOption::new("cpus", move |c| {
        if cpus > 0 {
            c.cpus = cpus;
        } else {
            debug!("cpus is 0, keeping default of {}", c.cpus);
        }
        Ok(())
    })
}

/// `.proto` source file plus extra import paths.
///
/// The import path list becomes the file's directory (unless it is `.`),
/// then `.`, then `import_paths`. Duplicates are kept. A blank path is a
/// no-op.
pub fn proto_file(proto: impl Into<String>, import_paths: Vec<String>) -> RunOption {
    let proto = proto.into().trim().to_string();
    RunOption::new("proto_file", move |c| {
        if proto.is_empty() {
            debug!("blank proto path, ignoring");
            return Ok(());
        }

        if extension(&proto) != Some(".proto") {
            return Err(ConfigError::ProtoExtension(proto.clone()));
        }

        let path = Path::new(&proto);
        let mut paths = Vec::with_capacity(import_paths.len() + 2);
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_string_lossy().into_owned(),
            _ => ".".to_string(),
        };
        if dir != "." {
            paths.push(dir);
        }
        paths.push(".".to_string());
        paths.extend(import_paths.iter().cloned());

        c.proto = proto.clone();
        c.import_paths = paths;
        Ok(())
    })
}

/// Precompiled descriptor set file
pub fn protoset_file(protoset: impl Into<String>) -> RunOption {
    let protoset = protoset.into().trim().to_string();
    RunOption::new("protoset_file", move |c| {
        c.protoset = protoset.clone();
        Ok(())
    })
}
