//! Run configuration and its assembler

use std::time::Duration;

use serde::ser::{Serialize, SerializeStruct, Serializer};
use tracing::{debug, info, warn};

use crate::defaults::RunDefaults;
use crate::error::{ConfigError, Result};
use crate::options::RunOption;

pub const DEFAULT_TOTAL_REQUESTS: u32 = 200;
pub const DEFAULT_CONCURRENCY: u32 = 50;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(10);

const SERIALIZED_FIELDS: usize = 20;

/// Validated settings for a single load-test run.
///
/// Only [`RunConfig::build`] and [`RunConfig::build_with_defaults`] produce a
/// value; after that it is read-only and can be shared between workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    // call
    pub(crate) call: String,
    pub(crate) host: String,
    pub(crate) proto: String,
    pub(crate) import_paths: Vec<String>,
    pub(crate) protoset: String,

    // security
    pub(crate) cert: String,
    pub(crate) cname: String,
    pub(crate) insecure: bool,

    // load
    pub(crate) total_requests: u32,
    pub(crate) concurrency: u32,
    pub(crate) qps: u32,
    pub(crate) run_duration: Duration,

    // timeouts
    pub(crate) timeout: Duration,
    pub(crate) dial_timeout: Duration,
    pub(crate) keepalive: Duration,

    // data
    pub(crate) data: Vec<u8>,
    pub(crate) binary: bool,
    pub(crate) metadata: Vec<u8>,

    // misc
    pub(crate) name: String,
    pub(crate) cpus: usize,
}

impl RunConfig {
    /// Build a configuration using defaults taken from the current process
    pub fn build(call: &str, host: &str, options: &[RunOption]) -> Result<Self> {
        Self::build_with_defaults(call, host, &RunDefaults::from_process(), options)
    }

    /// Build a configuration from explicit defaults.
    ///
    /// Options are applied in order and the first failure aborts the build;
    /// options after it are never invoked.
    pub fn build_with_defaults(
        call: &str,
        host: &str,
        defaults: &RunDefaults,
        options: &[RunOption],
    ) -> Result<Self> {
        let mut config = Self::seeded(call.trim(), host.trim(), defaults);

        for (position, option) in options.iter().enumerate() {
            debug!(option = option.name(), position, "applying run option");
            option.apply(&mut config)?;
        }

        config.validate()?;

        if config.insecure && !config.cert.is_empty() {
            warn!(cert = %config.cert, "insecure mode set; certificate will be ignored");
        }

        info!(
            name = %config.name,
            call = %config.call,
            host = %config.host,
            total = config.total_requests,
            concurrency = config.concurrency,
            "run configuration built"
        );

        Ok(config)
    }

    fn seeded(call: &str, host: &str, defaults: &RunDefaults) -> Self {
        Self {
            call: call.to_string(),
            host: host.to_string(),
            proto: String::new(),
            import_paths: Vec::new(),
            protoset: String::new(),
            cert: String::new(),
            cname: String::new(),
            insecure: false,
            total_requests: DEFAULT_TOTAL_REQUESTS,
            concurrency: DEFAULT_CONCURRENCY,
            qps: 0,
            run_duration: Duration::ZERO,
            timeout: DEFAULT_TIMEOUT,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            keepalive: Duration::ZERO,
            data: Vec::new(),
            binary: false,
            metadata: Vec::new(),
            name: defaults.generate_name(),
            cpus: defaults.cpus(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.call.is_empty() {
            return Err(ConfigError::CallRequired);
        }

        if self.host.is_empty() {
            return Err(ConfigError::HostRequired);
        }

        match (self.proto.is_empty(), self.protoset.is_empty()) {
            (true, true) => Err(ConfigError::SourceRequired),
            (false, false) => Err(ConfigError::ConflictingSources),
            _ => Ok(()),
        }
    }

    pub fn call(&self) -> &str {
        &self.call
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Path to the `.proto` source, empty when a protoset is used
    pub fn proto(&self) -> &str {
        &self.proto
    }

    /// Import paths derived from the proto source, in search order
    pub fn import_paths(&self) -> &[String] {
        &self.import_paths
    }

    pub fn protoset(&self) -> &str {
        &self.protoset
    }

    pub fn cert(&self) -> &str {
        &self.cert
    }

    /// Server name override for certificate verification
    pub fn cname(&self) -> &str {
        &self.cname
    }

    pub fn insecure(&self) -> bool {
        self.insecure
    }

    pub fn total_requests(&self) -> u32 {
        self.total_requests
    }

    pub fn concurrency(&self) -> u32 {
        self.concurrency
    }

    /// Rate limit in queries per second, 0 means unlimited
    pub fn qps(&self) -> u32 {
        self.qps
    }

    /// Total run duration, zero means the run is bounded by the request count
    pub fn run_duration(&self) -> Duration {
        self.run_duration
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn dial_timeout(&self) -> Duration {
        self.dial_timeout
    }

    /// Keepalive interval, zero disables keepalive
    pub fn keepalive(&self) -> Duration {
        self.keepalive
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether `data` is a serialized binary message rather than JSON
    pub fn is_binary(&self) -> bool {
        self.binary
    }

    pub fn metadata(&self) -> &[u8] {
        &self.metadata
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cpus(&self) -> usize {
        self.cpus
    }
}

fn format_duration(d: Duration) -> String {
    humantime::format_duration(d).to_string()
}

impl Serialize for RunConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("RunConfig", SERIALIZED_FIELDS)?;
        s.serialize_field("name", &self.name)?;
        s.serialize_field("call", &self.call)?;
        s.serialize_field("host", &self.host)?;
        s.serialize_field("proto", &self.proto)?;
        s.serialize_field("import_paths", &self.import_paths)?;
        s.serialize_field("protoset", &self.protoset)?;
        s.serialize_field("cert", &self.cert)?;
        s.serialize_field("cname", &self.cname)?;
        s.serialize_field("insecure", &self.insecure)?;
        s.serialize_field("total", &self.total_requests)?;
        s.serialize_field("concurrency", &self.concurrency)?;
        s.serialize_field("qps", &self.qps)?;
        s.serialize_field("duration", &format_duration(self.run_duration))?;
        s.serialize_field("timeout", &format_duration(self.timeout))?;
        s.serialize_field("connect_timeout", &format_duration(self.dial_timeout))?;
        s.serialize_field("keepalive", &format_duration(self.keepalive))?;
        s.serialize_field("binary", &self.binary)?;
        // Binary payloads are shown as hex, JSON payloads as text
        if self.binary {
            s.serialize_field("data", &hex::encode(&self.data))?;
        } else {
            s.serialize_field("data", &String::from_utf8_lossy(&self.data))?;
        }
        s.serialize_field("metadata", &String::from_utf8_lossy(&self.metadata))?;
        s.serialize_field("cpus", &self.cpus)?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tracing_test::traced_test;

    use super::*;
    use crate::options::*;

    fn fixed_defaults() -> RunDefaults {
        RunDefaults::new(4, || "test-run".to_string())
    }

    fn build(call: &str, host: &str, options: &[RunOption]) -> Result<RunConfig> {
        RunConfig::build_with_defaults(call, host, &fixed_defaults(), options)
    }

    #[test]
    fn test_defaults() {
        let options = [protoset_file("bundle.protoset")];
        let config = build("pkg.Svc.Call", "localhost:50051", &options).unwrap();
        assert_eq!(config.total_requests(), 200);
        assert_eq!(config.concurrency(), 50);
        assert_eq!(config.qps(), 0);
        assert_eq!(config.run_duration(), Duration::ZERO);
        assert_eq!(config.timeout(), Duration::from_secs(20));
        assert_eq!(config.dial_timeout(), Duration::from_secs(10));
        assert_eq!(config.keepalive(), Duration::ZERO);
        assert_eq!(config.name(), "test-run");
        assert_eq!(config.cpus(), 4);
        assert!(!config.insecure());
        assert!(!config.is_binary());
        assert!(config.data().is_empty());
    }

    #[test]
    fn test_call_and_host_are_trimmed() {
        let options = [proto_file("a.proto", vec![])];
        let config = build("  pkg.Svc.Call \n", "\tlocalhost:50051 ", &options).unwrap();
        assert_eq!(config.call(), "pkg.Svc.Call");
        assert_eq!(config.host(), "localhost:50051");
    }

    #[test]
    fn test_call_required() {
        let err = build("", "host", &[proto_file("a.proto", vec![])]).unwrap_err();
        assert!(matches!(err, ConfigError::CallRequired));

        let err = build("   ", "host", &[proto_file("a.proto", vec![])]).unwrap_err();
        assert!(matches!(err, ConfigError::CallRequired));
    }

    #[test]
    fn test_host_required() {
        let err = build("call", " ", &[proto_file("a.proto", vec![])]).unwrap_err();
        assert!(matches!(err, ConfigError::HostRequired));
    }

    #[test]
    fn test_source_required() {
        let err = build("call", "host", &[]).unwrap_err();
        assert!(matches!(err, ConfigError::SourceRequired));

        // an empty proto path is a no-op and does not count as a source
        let err = build("call", "host", &[proto_file("  ", vec![])]).unwrap_err();
        assert!(matches!(err, ConfigError::SourceRequired));
    }

    #[test]
    fn test_both_sources_rejected() {
        let err = build(
            "call",
            "host",
            &[proto_file("a.proto", vec![]), protoset_file("b.protoset")],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ConflictingSources));
        assert_eq!(err.error_code(), "required_field");
    }

    #[test]
    fn test_later_protoset_can_clear_earlier() {
        let config = build(
            "call",
            "host",
            &[protoset_file("b.protoset"), protoset_file(""), proto_file("a.proto", vec![])],
        )
        .unwrap();
        assert_eq!(config.proto(), "a.proto");
        assert_eq!(config.protoset(), "");
    }

    #[test]
    fn test_wrong_extension() {
        let err = build("call", "host", &[proto_file("x.txt", vec![])]).unwrap_err();
        assert!(matches!(err, ConfigError::ProtoExtension(_)));
        assert_eq!(err.error_code(), "invalid_format");
    }

    #[test]
    fn test_last_write_wins_json_after_binary() {
        let config = build(
            "call",
            "host",
            &[protoset_file("b.protoset"), binary_data(vec![1, 2, 3]), json_data_from_str("{}")],
        )
        .unwrap();
        assert_eq!(config.data(), b"{}");
        assert!(!config.is_binary());
    }

    #[test]
    fn test_last_write_wins_binary_after_json() {
        let config = build(
            "call",
            "host",
            &[protoset_file("b.protoset"), json_data_from_str("{}"), binary_data(vec![1, 2, 3])],
        )
        .unwrap();
        assert_eq!(config.data(), &[1, 2, 3]);
        assert!(config.is_binary());
    }

    #[traced_test]
    #[test]
    fn test_insecure_with_certificate_warns() {
        let config = build(
            "call",
            "host",
            &[
                protoset_file("b.protoset"),
                certificate("certs/ca.pem", ""),
                insecure(true),
            ],
        )
        .unwrap();
        assert!(config.insecure());
        assert_eq!(config.cert(), "certs/ca.pem");
        assert!(logs_contain("certificate will be ignored"));
    }

    #[traced_test]
    #[test]
    fn test_secure_with_certificate_does_not_warn() {
        build(
            "call",
            "host",
            &[protoset_file("b.protoset"), certificate("certs/ca.pem", "")],
        )
        .unwrap();
        assert!(!logs_contain("certificate will be ignored"));
        assert!(logs_contain("run configuration built"));
    }

    #[test]
    fn test_failure_stops_later_options() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let sentinel = RunOption::new("sentinel", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let err = build(
            "call",
            "host",
            &[
                protoset_file("b.protoset"),
                binary_data_from_file("/definitely/not/here.bin"),
                sentinel,
            ],
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::File { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_options_are_reusable() {
        let options = vec![protoset_file("b.protoset"), concurrency(7), name("shared")];
        let first = build("call", "host-a", &options).unwrap();
        let second = build("call", "host-b", &options).unwrap();
        assert_eq!(first.concurrency(), 7);
        assert_eq!(second.concurrency(), 7);
        assert_eq!(first.name(), second.name());
    }

    #[test]
    fn test_random_default_names_differ() {
        let options = [protoset_file("b.protoset")];
        let a = RunConfig::build("call", "host", &options).unwrap();
        let b = RunConfig::build("call", "host", &options).unwrap();
        assert!(!a.name().is_empty());
        assert_ne!(a.name(), b.name());
    }

    #[test]
    fn test_injected_name_generator_is_called_once_per_build() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let defaults = RunDefaults::new(1, move || {
            let n = seen.fetch_add(1, Ordering::SeqCst);
            format!("run-{}", n)
        });
        let options = [protoset_file("b.protoset")];

        let a = RunConfig::build_with_defaults("call", "host", &defaults, &options).unwrap();
        let b = RunConfig::build_with_defaults("call", "host", &defaults, &options).unwrap();
        assert_eq!(a.name(), "run-0");
        assert_eq!(b.name(), "run-1");
    }

    #[test]
    fn test_serialize_json_payload_as_text() {
        let config = build(
            "call",
            "host",
            &[
                protoset_file("b.protoset"),
                json_data_from_str(r#"{"a":1}"#),
                run_duration(Duration::from_secs(90)),
            ],
        )
        .unwrap();
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value.as_object().unwrap().len(), SERIALIZED_FIELDS);
        assert_eq!(value["data"], r#"{"a":1}"#);
        assert_eq!(value["binary"], false);
        assert_eq!(value["duration"], "1m 30s");
        assert_eq!(value["total"], 200);
    }

    #[test]
    fn test_serialize_binary_payload_as_hex() {
        let config = build(
            "call",
            "host",
            &[protoset_file("b.protoset"), binary_data(vec![0xde, 0xad])],
        )
        .unwrap();
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["data"], "dead");
        assert_eq!(value["binary"], true);
    }

    #[test]
    fn test_config_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RunConfig>();

        let config = build("call", "host", &[protoset_file("b.protoset")]).unwrap();
        let shared = Arc::new(config);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                std::thread::spawn(move || shared.total_requests())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 200);
        }
    }
}
