//! Structured logging
//!
//! Entries render as `LEVEL [module] message | key=value ...` and go to
//! stderr behind a UTC timestamp. Field values are masked by key: secrets
//! are hidden, pairing URIs keep only scheme and version, addresses and
//! hashes are shortened. Debug entries are dropped unless enabled.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

pub fn enable_debug() {
    DEBUG_ENABLED.store(true, Ordering::SeqCst);
}

pub fn disable_debug() {
    DEBUG_ENABLED.store(false, Ordering::SeqCst);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::SeqCst)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        })
    }
}

#[derive(Debug)]
pub struct LogEntry {
    pub level: LogLevel,
    pub module: &'static str,
    pub message: String,
    pub fields: Vec<(&'static str, String)>,
}

impl LogEntry {
    pub fn new(level: LogLevel, module: &'static str, message: impl Into<String>) -> Self {
        Self {
            level,
            module,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Attach a field, masked according to its key
    pub fn field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        let masked = Mask::for_key(key).apply(&value.to_string());
        self.fields.push((key, masked));
        self
    }

    /// The entry without its timestamp
    pub fn render(&self) -> String {
        let mut line = format!("{} [{}] {}", self.level, self.module, self.message);
        for (i, (key, value)) in self.fields.iter().enumerate() {
            line.push_str(if i == 0 { " | " } else { " " });
            line.push_str(key);
            line.push('=');
            line.push_str(value);
        }
        line
    }

    pub fn log(self) {
        if self.level == LogLevel::Debug && !is_debug_enabled() {
            return;
        }
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
        eprintln!("[{}] {}", timestamp, self.render());
    }
}

/// How a field value is shown, decided by the words of its key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mask {
    Secret,
    PairingUri,
    Address,
    Hash,
    Plain,
}

const SECRET_WORDS: &[&str] = &[
    "secret", "seed", "mnemonic", "password", "passphrase", "symkey", "privatekey",
];
const SECRET_PHRASES: &[&str] = &["private_key", "sym_key"];
const ADDRESS_WORDS: &[&str] = &["address", "recipient", "signer", "from", "to"];
const HASH_WORDS: &[&str] = &["signature", "hash", "digest", "raw"];

impl Mask {
    fn for_key(key: &str) -> Self {
        let key = key.to_ascii_lowercase();
        let words: Vec<&str> = key
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let has_word = |list: &[&str]| words.iter().any(|w| list.contains(w));

        if has_word(SECRET_WORDS) || SECRET_PHRASES.iter().any(|p| key.contains(p)) {
            Mask::Secret
        } else if has_word(&["uri"]) {
            Mask::PairingUri
        } else if has_word(ADDRESS_WORDS) {
            Mask::Address
        } else if has_word(HASH_WORDS) {
            Mask::Hash
        } else {
            Mask::Plain
        }
    }

    fn apply(self, value: &str) -> String {
        let value = value.trim();
        match self {
            Mask::Plain => value.to_string(),
            _ if value.is_empty() => "[EMPTY]".to_string(),
            Mask::Secret => conceal(value),
            Mask::PairingUri => mask_uri(value),
            Mask::Address => {
                let head = if value.starts_with("0x") { 8 } else { 6 };
                shorten(value, head, 4).unwrap_or_else(|| conceal(value))
            }
            Mask::Hash => {
                let head = if value.starts_with("0x") { 12 } else { 10 };
                shorten(value, head, 6).unwrap_or_else(|| value.to_string())
            }
        }
    }
}

fn conceal(value: &str) -> String {
    match value.chars().count() {
        0 => "[EMPTY]".to_string(),
        n if n <= 4 => "[REDACTED]".to_string(),
        n => format!("[REDACTED:{}chars]", n),
    }
}

/// `head...tail` counted in characters, `None` when too short to hide anything
fn shorten(value: &str, head: usize, tail: usize) -> Option<String> {
    let count = value.chars().count();
    if count <= head + tail + 3 {
        return None;
    }
    let prefix: String = value.chars().take(head).collect();
    let suffix: String = value.chars().skip(count - tail).collect();
    Some(format!("{}...{}", prefix, suffix))
}

/// `wc:<topic>@2?relay-protocol=irn&symKey=<key>` becomes `wc:[REDACTED]@2`
fn mask_uri(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once(':') else {
        return conceal(uri);
    };
    let version = rest
        .split_once('@')
        .and_then(|(_, tail)| tail.split('?').next())
        .unwrap_or_default();

    if version.is_empty() {
        format!("{}:[REDACTED]", scheme)
    } else {
        format!("{}:[REDACTED]@{}", scheme, version)
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_entry {
    ($level:ident, $module:expr, $msg:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::$level,
            $module,
            $msg,
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

/// `log_debug!("module", "message", key = value, ...)`
#[macro_export]
macro_rules! log_debug {
    ($($args:tt)*) => { $crate::__log_entry!(Debug, $($args)*) };
}

#[macro_export]
macro_rules! log_info {
    ($($args:tt)*) => { $crate::__log_entry!(Info, $($args)*) };
}

#[macro_export]
macro_rules! log_warn {
    ($($args:tt)*) => { $crate::__log_entry!(Warn, $($args)*) };
}

#[macro_export]
macro_rules! log_error {
    ($($args:tt)*) => { $crate::__log_entry!(Error, $($args)*) };
}
