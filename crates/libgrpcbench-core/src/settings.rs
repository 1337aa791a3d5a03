//! Run settings files (`.toml` or `.json`)
//!
//! A settings file mirrors the command line flags. Loading one yields the
//! call, the host and an ordered list of [`RunOption`]s; callers append their
//! own options after these so explicit flags win.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::options::{self, RunOption};

/// On-disk run settings, every field optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proto: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub import_paths: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protoset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qps: Option<u32>,
    /// Humantime duration, e.g. "30s" or "1m 30s"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keepalive: Option<String>,
    /// Structured JSON payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpus: Option<usize>,
}

/// Parse a humantime duration such as "20s" or "1m 30s"
pub fn parse_duration(value: &str) -> Result<Duration> {
    humantime::parse_duration(value.trim()).map_err(|source| ConfigError::Duration {
        value: value.to_string(),
        source,
    })
}

/// Load settings from a `.toml` or `.json` file, chosen by extension
pub fn load_settings(path: &Path) -> Result<RunSettings> {
    let bad = |message: String| ConfigError::Settings {
        path: path.to_path_buf(),
        message,
    };

    let format = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Format::Toml,
        Some("json") => Format::Json,
        _ => return Err(bad("expected a .toml or .json extension".to_string())),
    };

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::file("read settings file", path, e))?;

    match format {
        Format::Toml => toml::from_str(&content).map_err(|e| bad(e.to_string())),
        Format::Json => serde_json::from_str(&content).map_err(|e| bad(e.to_string())),
    }
}

enum Format {
    Toml,
    Json,
}

impl RunSettings {
    /// Options equivalent to these settings.
    ///
    /// Order follows the flag order of the CLI: source, security, load,
    /// timeouts, data, metadata, identity. Within data, the file sources come
    /// after the inline value.
    pub fn to_options(&self) -> Result<Vec<RunOption>> {
        let mut opts = Vec::new();

        if let Some(proto) = &self.proto {
            opts.push(options::proto_file(proto.clone(), self.import_paths.clone()));
        }
        if let Some(protoset) = &self.protoset {
            opts.push(options::protoset_file(protoset.clone()));
        }

        if self.cert.is_some() || self.cname.is_some() {
            opts.push(options::certificate(
                self.cert.clone().unwrap_or_default(),
                self.cname.clone().unwrap_or_default(),
            ));
        }
        if let Some(insecure) = self.insecure {
            opts.push(options::insecure(insecure));
        }

        if let Some(n) = self.total {
            opts.push(options::total_requests(n));
        }
        if let Some(c) = self.concurrency {
            opts.push(options::concurrency(c));
        }
        if let Some(q) = self.qps {
            opts.push(options::qps(q));
        }

        if let Some(d) = &self.duration {
            opts.push(options::run_duration(parse_duration(d)?));
        }
        if let Some(t) = &self.timeout {
            opts.push(options::timeout(parse_duration(t)?));
        }
        if let Some(t) = &self.connect_timeout {
            opts.push(options::dial_timeout(parse_duration(t)?));
        }
        if let Some(k) = &self.keepalive {
            opts.push(options::keepalive(parse_duration(k)?));
        }

        if let Some(data) = &self.data {
            opts.push(options::json_data(data.clone()));
        }
        if let Some(path) = &self.data_file {
            opts.push(options::json_data_from_file(path.clone()));
        }
        if let Some(path) = &self.binary_file {
            opts.push(options::binary_data_from_file(path.clone()));
        }

        if let Some(md) = &self.metadata {
            opts.push(options::metadata(md.clone()));
        }
        if let Some(path) = &self.metadata_file {
            opts.push(options::metadata_from_file(path.clone()));
        }

        if let Some(name) = &self.name {
            opts.push(options::name(name.clone()));
        }
        if let Some(cpus) = self.cpus {
            opts.push(options::cpus(cpus));
        }

        Ok(opts)
    }
}
