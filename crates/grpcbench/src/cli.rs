//! Command line flags and their translation into run options

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use libgrpcbench_core::{load_settings, options, RunOption, RunSettings};

use crate::error::Result;

#[derive(Parser, Debug)]
#[command(name = "grpcbench")]
#[command(about = "Resolve and validate a gRPC load-test run configuration")]
#[command(version)]
pub struct Cli {
    /// Target host and port, e.g. localhost:50051
    pub host: Option<String>,

    /// Fully-qualified method name, e.g. helloworld.Greeter.SayHello
    #[arg(long)]
    pub call: Option<String>,

    /// Path to the .proto file
    #[arg(long)]
    pub proto: Option<String>,

    /// Extra import paths, comma separated
    #[arg(short = 'i', long, value_delimiter = ',')]
    pub import_paths: Vec<String>,

    /// Path to a compiled protoset file
    #[arg(long)]
    pub protoset: Option<String>,

    /// TLS certificate file
    #[arg(long)]
    pub cert: Option<String>,

    /// Server name override for the certificate
    #[arg(long)]
    pub cname: Option<String>,

    /// Use plaintext, no TLS
    #[arg(long)]
    pub insecure: bool,

    /// Total number of requests
    #[arg(short = 'n', long)]
    pub total: Option<u32>,

    /// Number of requests in flight
    #[arg(short = 'c', long)]
    pub concurrency: Option<u32>,

    /// Rate limit in queries per second (0 = unlimited)
    #[arg(short = 'q', long)]
    pub qps: Option<u32>,

    /// Run for this long instead of a fixed request count, e.g. 30s
    #[arg(short = 'z', long, value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// Per-request timeout, e.g. 20s
    #[arg(short = 't', long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Connection timeout, e.g. 10s
    #[arg(long, value_parser = humantime::parse_duration)]
    pub connect_timeout: Option<Duration>,

    /// Keepalive interval (0s = disabled)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub keepalive: Option<Duration>,

    /// Request data as JSON, or '@' to read it from stdin
    #[arg(short = 'd', long)]
    pub data: Option<String>,

    /// File containing JSON request data
    #[arg(short = 'D', long)]
    pub data_file: Option<PathBuf>,

    /// Treat --data as a serialized binary message; with '@' stdin is read raw
    #[arg(short = 'b', long, requires = "data")]
    pub binary_data: bool,

    /// File containing a serialized binary message
    #[arg(short = 'B', long)]
    pub binary_file: Option<PathBuf>,

    /// Request metadata as a JSON object
    #[arg(short = 'm', long)]
    pub metadata: Option<String>,

    /// File containing request metadata as JSON
    #[arg(short = 'M', long)]
    pub metadata_file: Option<PathBuf>,

    /// Name of the run
    #[arg(long)]
    pub name: Option<String>,

    /// Number of CPUs to use (0 = all available)
    #[arg(long)]
    pub cpus: Option<usize>,

    /// Settings file (.toml or .json); flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

/// Everything needed to call the assembler
pub struct Resolved {
    pub call: String,
    pub host: String,
    pub options: Vec<RunOption>,
}

impl Cli {
    /// Merge the settings file (if any) with the flags, flags last
    pub fn resolve(&self) -> Result<Resolved> {
        self.resolve_with(std::io::stdin())
    }

    /// Like [`Cli::resolve`], reading `-d @` data from `stdin`
    pub fn resolve_with<R>(&self, stdin: R) -> Result<Resolved>
    where
        R: Read + Send + 'static,
    {
        let settings = match &self.config {
            Some(path) => load_settings(path)?,
            None => RunSettings::default(),
        };

        let mut opts = settings.to_options()?;
        opts.extend(self.flag_options(stdin)?);

        Ok(Resolved {
            call: self.call.clone().or(settings.call).unwrap_or_default(),
            host: self.host.clone().or(settings.host).unwrap_or_default(),
            options: opts,
        })
    }

    fn flag_options<R>(&self, mut stdin: R) -> Result<Vec<RunOption>>
    where
        R: Read + Send + 'static,
    {
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
        if self.insecure {
            opts.push(options::insecure(true));
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

        if let Some(d) = self.duration {
            opts.push(options::run_duration(d));
        }
        if let Some(t) = self.timeout {
            opts.push(options::timeout(t));
        }
        if let Some(t) = self.connect_timeout {
            opts.push(options::dial_timeout(t));
        }
        if let Some(k) = self.keepalive {
            opts.push(options::keepalive(k));
        }

        match (self.data.as_deref(), self.binary_data) {
            (Some("@"), true) => {
                let mut buf = Vec::new();
                stdin.read_to_end(&mut buf)?;
                opts.push(options::binary_data(buf));
            }
            (Some("@"), false) => opts.push(options::json_data_from_reader(stdin)),
            (Some(data), true) => opts.push(options::binary_data(data.as_bytes())),
            (Some(data), false) => opts.push(options::json_data_from_str(data)),
            (None, _) => {}
        }
        if let Some(path) = &self.data_file {
            opts.push(options::json_data_from_file(path.clone()));
        }
        if let Some(path) = &self.binary_file {
            opts.push(options::binary_data_from_file(path.clone()));
        }

        if let Some(md) = &self.metadata {
            opts.push(options::metadata_from_json(md.clone()));
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
