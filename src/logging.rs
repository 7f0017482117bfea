//! Structured logging for chart generation runs.
//!
//! Every record is one JSON line:
//! `{ts, run_id, seq, lvl, component, event, msg, data}`.
//!
//! The logger is an explicit instance owned by whoever drives a run and lent
//! to the code that needs it. Nothing in here is process-global, so tests can
//! build a logger over an in-memory buffer and inspect what was reported.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl Level {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            _ => None,
        }
    }

    pub fn from_env() -> Self {
        std::env::var("LOG_LEVEL")
            .ok()
            .and_then(|v| Level::parse(&v))
            .unwrap_or(Level::Info)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

// =============================================================================
// Log Domains
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Config, // Config parsing and pre-flight validation
    Data,   // Table loading
    Chart,  // Chart builders and the viewer facade
    Render, // HTML serialization and file output
    System, // Startup, shutdown
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Config => "config",
            Domain::Data => "data",
            Domain::Chart => "chart",
            Domain::Render => "render",
            Domain::System => "system",
        }
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// Shared capture of emitted lines, used by tests and embedding callers.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<String>>>);

impl LogBuffer {
    pub fn lines(&self) -> Vec<String> {
        self.0.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn records(&self) -> Vec<Value> {
        self.lines()
            .iter()
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect()
    }

    /// Records whose `msg` contains `needle`.
    pub fn messages_containing(&self, needle: &str) -> Vec<Value> {
        self.records()
            .into_iter()
            .filter(|r| {
                r.get("msg")
                    .and_then(Value::as_str)
                    .map(|m| m.contains(needle))
                    .unwrap_or(false)
            })
            .collect()
    }

    fn push(&self, line: &str) {
        if let Ok(mut l) = self.0.lock() {
            l.push(line.to_string());
        }
    }
}

#[derive(Debug)]
pub enum Sink {
    Stderr,
    File(Mutex<BufWriter<File>>),
    Memory(LogBuffer),
}

impl Sink {
    pub fn file(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Sink::File(Mutex::new(BufWriter::new(file))))
    }

    fn write_line(&self, line: &str) {
        match self {
            Sink::Stderr => eprintln!("{}", line),
            Sink::File(writer) => {
                if let Ok(mut w) = writer.lock() {
                    let _ = writeln!(w, "{}", line);
                    let _ = w.flush();
                }
            }
            Sink::Memory(buf) => buf.push(line),
        }
    }
}

// =============================================================================
// Logger
// =============================================================================

#[derive(Debug)]
pub struct Logger {
    min_level: Level,
    run_id: String,
    seq: AtomicU64,
    sinks: Vec<Sink>,
}

impl Logger {
    /// Logger with no sinks; add them with `with_sink`.
    pub fn new(min_level: Level) -> Self {
        Self {
            min_level,
            run_id: format!("r-{}-{}", ts_epoch_ms(), process::id()),
            seq: AtomicU64::new(0),
            sinks: Vec::new(),
        }
    }

    pub fn stderr(min_level: Level) -> Self {
        Self::new(min_level).with_sink(Sink::Stderr)
    }

    /// `LOG_LEVEL`, `LOG_FILE` and `RUN_ID` from the environment; always
    /// writes to stderr.
    pub fn from_env() -> io::Result<Self> {
        let mut logger = Self::stderr(Level::from_env());
        if let Ok(run_id) = std::env::var("RUN_ID") {
            logger = logger.with_run_id(&run_id);
        }
        if let Ok(path) = std::env::var("LOG_FILE") {
            logger = logger.with_sink(Sink::file(Path::new(&path))?);
        }
        Ok(logger)
    }

    pub fn in_memory(min_level: Level) -> (Self, LogBuffer) {
        let buf = LogBuffer::default();
        let logger = Self::new(min_level).with_sink(Sink::Memory(buf.clone()));
        (logger, buf)
    }

    pub fn with_run_id(mut self, run_id: &str) -> Self {
        self.run_id = run_id.to_string();
        self
    }

    pub fn with_sink(mut self, sink: Sink) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.min_level
    }

    /// Emit a structured log entry. A `msg` key in `fields` is lifted to the
    /// top level; the rest lands under `data`.
    pub fn log(&self, level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
        if !self.enabled(level) {
            return;
        }
        let (msg, data) = split_fields(fields);

        let mut entry = Map::new();
        entry.insert("ts".to_string(), json!(ts_now()));
        entry.insert("run_id".to_string(), json!(self.run_id));
        entry.insert("seq".to_string(), json!(self.next_seq()));
        entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
        entry.insert("component".to_string(), json!(domain.as_str()));
        entry.insert("event".to_string(), json!(event));
        entry.insert("msg".to_string(), msg);
        entry.insert("data".to_string(), Value::Object(data));

        let line = Value::Object(entry).to_string();
        for sink in &self.sinks {
            sink.write_line(&line);
        }
    }

    pub fn info(&self, domain: Domain, event: &str, msg: &str) {
        self.log(Level::Info, domain, event, obj(&[("msg", v_str(msg))]));
    }

    pub fn warn(&self, domain: Domain, event: &str, msg: &str) {
        self.log(Level::Warn, domain, event, obj(&[("msg", v_str(msg))]));
    }

    pub fn error(&self, domain: Domain, event: &str, msg: &str) {
        self.log(Level::Error, domain, event, obj(&[("msg", v_str(msg))]));
    }

    pub fn debug(&self, domain: Domain, event: &str, fields: Map<String, Value>) {
        self.log(Level::Debug, domain, event, fields);
    }

    /// Timing scope that logs `elapsed_ms` at debug level when dropped.
    pub fn scope<'a>(&'a self, domain: Domain, label: &'static str) -> ProfileScope<'a> {
        ProfileScope {
            logger: self,
            domain,
            label,
            started: Instant::now(),
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }
}

fn split_fields(mut fields: Map<String, Value>) -> (Value, Map<String, Value>) {
    let msg = fields
        .remove("msg")
        .unwrap_or(Value::String(String::new()));
    (msg, fields)
}

// =============================================================================
// Profiling Scope
// =============================================================================

pub struct ProfileScope<'a> {
    logger: &'a Logger,
    domain: Domain,
    label: &'static str,
    started: Instant,
}

impl Drop for ProfileScope<'_> {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        self.logger.debug(
            self.domain,
            "profile",
            obj(&[("label", v_str(self.label)), ("elapsed_ms", v_num(elapsed_ms))]),
        );
    }
}

// =============================================================================
// Utility Functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(Level::parse("DEBUG"), Some(Level::Debug));
        assert_eq!(Level::parse(" warning "), Some(Level::Warn));
        assert_eq!(Level::parse("loud"), None);
    }

    #[test]
    fn test_obj_helper() {
        let m = obj(&[("key", v_str("value")), ("num", v_num(42.0))]);
        assert_eq!(m.get("key").unwrap(), "value");
        assert_eq!(m.get("num").unwrap(), 42.0);
    }

    #[test]
    fn test_record_shape() {
        let (log, buf) = Logger::in_memory(Level::Info);
        let log = log.with_run_id("r-test");
        log.log(
            Level::Info,
            Domain::Chart,
            "written",
            obj(&[("msg", v_str("hello")), ("files", json!(2))]),
        );
        let records = buf.records();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r["run_id"], "r-test");
        assert_eq!(r["lvl"], "INFO");
        assert_eq!(r["component"], "chart");
        assert_eq!(r["event"], "written");
        assert_eq!(r["msg"], "hello");
        assert_eq!(r["data"]["files"], 2);
    }

    #[test]
    fn test_level_filter_and_seq() {
        let (log, buf) = Logger::in_memory(Level::Warn);
        log.info(Domain::System, "start", "dropped");
        log.warn(Domain::System, "slow", "kept");
        log.error(Domain::System, "boom", "kept too");
        let records = buf.records();
        assert_eq!(records.len(), 2);
        let s0 = records[0]["seq"].as_u64().unwrap();
        let s1 = records[1]["seq"].as_u64().unwrap();
        assert!(s1 > s0);
    }

    #[test]
    fn test_file_sink_appends() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("logs").join("run.jsonl");
        let log = Logger::new(Level::Info).with_sink(Sink::file(&path).unwrap());
        log.info(Domain::Data, "loaded", "one");
        log.info(Domain::Data, "loaded", "two");
        drop(log);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
