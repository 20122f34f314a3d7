//! Logger collaborator contract and the built-in loggers.
//!
//! A [`Logger`] accepts a severity and a message and never fails: write
//! errors are swallowed (and reported through `tracing` where possible).

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

/// Severity of a log message.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Plain output requested by the application.
    Print,
    Trace,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Print => "print",
            Severity::Trace => "trace",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// Destination for runtime log messages.
pub trait Logger: Send + Sync + fmt::Debug {
    /// Write one message. Must not panic.
    fn write(&self, severity: Severity, message: &str);

    /// Prefix prepended to every message, usually the program name.
    fn prefix(&self) -> &str {
        ""
    }

    /// A logger writing to the same destination under a different prefix.
    fn clone_with_prefix(&self, prefix: &str) -> Arc<dyn Logger>;

    fn print(&self, message: &str) {
        self.write(Severity::Print, message);
    }

    fn trace(&self, category: &str, message: &str) {
        self.write(Severity::Trace, &format!("{}: {}", category, message));
    }

    fn warning(&self, message: &str) {
        self.write(Severity::Warning, message);
    }

    fn error(&self, message: &str) {
        self.write(Severity::Error, message);
    }
}

/// Default process logger: forwards every message to `tracing`.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    prefix: String,
}

impl TracingLogger {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl Logger for TracingLogger {
    fn write(&self, severity: Severity, message: &str) {
        let prefix = self.prefix.as_str();
        match severity {
            Severity::Print => tracing::info!(target: "rpc", prefix, "{}", message),
            Severity::Trace => tracing::debug!(target: "rpc", prefix, "{}", message),
            Severity::Warning => tracing::warn!(target: "rpc", prefix, "{}", message),
            Severity::Error => tracing::error!(target: "rpc", prefix, "{}", message),
        }
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn clone_with_prefix(&self, prefix: &str) -> Arc<dyn Logger> {
        Arc::new(TracingLogger::new(prefix))
    }
}

/// Appends timestamped lines to a file.
///
/// ```text
/// -- 03/14/25 09:26:53.589 server: trace: Network: accepted connection
/// -! 03/14/25 09:26:54.012 server: warning: connection reset
/// ```
#[derive(Debug)]
pub struct FileLogger {
    prefix: String,
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl FileLogger {
    /// Open (or create) `path` for appending.
    pub fn open(path: impl AsRef<Path>, prefix: impl Into<String>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            prefix: prefix.into(),
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn format_line(&self, severity: Severity, message: &str) -> String {
        let marker = match severity {
            Severity::Print | Severity::Trace => "--",
            Severity::Warning => "-!",
            Severity::Error => "!!",
        };
        let timestamp = chrono::Local::now().format("%m/%d/%y %H:%M:%S%.3f");
        let mut line = format!("{} {} ", marker, timestamp);
        if !self.prefix.is_empty() {
            line.push_str(&self.prefix);
            line.push_str(": ");
        }
        if severity != Severity::Print {
            line.push_str(&severity.to_string());
            line.push_str(": ");
        }
        line.push_str(message);
        line.push('\n');
        line
    }
}

impl Logger for FileLogger {
    fn write(&self, severity: Severity, message: &str) {
        let line = self.format_line(severity, message);
        let mut file = self.file.lock();
        if let Err(err) = file.write_all(line.as_bytes()) {
            tracing::error!(path = %self.path.display(), %err, "failed to write log file");
        }
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn clone_with_prefix(&self, prefix: &str) -> Arc<dyn Logger> {
        Arc::new(FileLogger {
            prefix: prefix.to_string(),
            path: self.path.clone(),
            file: Arc::clone(&self.file),
        })
    }
}

/// Sends messages to the local syslog daemon.
#[cfg(unix)]
#[derive(Debug)]
pub struct SyslogLogger {
    prefix: String,
    facility: u8,
    socket: std::os::unix::net::UnixDatagram,
}

#[cfg(unix)]
impl SyslogLogger {
    const SOCKET_PATH: &'static str = "/dev/log";

    /// Connect to `/dev/log` with the given facility name (`LOG_USER`,
    /// `LOG_LOCAL0`, ...).
    pub fn connect(facility: &str, prefix: impl Into<String>) -> std::io::Result<Self> {
        let facility = parse_facility(facility).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("unknown syslog facility `{}`", facility),
            )
        })?;
        let socket = std::os::unix::net::UnixDatagram::unbound()?;
        socket.connect(Self::SOCKET_PATH)?;
        Ok(Self {
            prefix: prefix.into(),
            facility,
            socket,
        })
    }
}

#[cfg(unix)]
impl Logger for SyslogLogger {
    fn write(&self, severity: Severity, message: &str) {
        let level = match severity {
            Severity::Error => 3,
            Severity::Warning => 4,
            Severity::Print => 6,
            Severity::Trace => 7,
        };
        let priority = u32::from(self.facility) * 8 + level;
        let datagram = if self.prefix.is_empty() {
            format!("<{}>{}", priority, message)
        } else {
            format!("<{}>{}: {}", priority, self.prefix, message)
        };
        if let Err(err) = self.socket.send(datagram.as_bytes()) {
            tracing::error!(%err, "failed to send syslog message");
        }
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn clone_with_prefix(&self, prefix: &str) -> Arc<dyn Logger> {
        match self.socket.try_clone() {
            Ok(socket) => Arc::new(SyslogLogger {
                prefix: prefix.to_string(),
                facility: self.facility,
                socket,
            }),
            Err(err) => {
                tracing::error!(%err, "failed to clone syslog socket, logging through tracing");
                Arc::new(TracingLogger::new(prefix))
            }
        }
    }
}

/// Map a syslog facility name to its numeric code.
pub fn parse_facility(name: &str) -> Option<u8> {
    let code = match name {
        "LOG_KERN" => 0,
        "LOG_USER" => 1,
        "LOG_MAIL" => 2,
        "LOG_DAEMON" => 3,
        "LOG_AUTH" => 4,
        "LOG_SYSLOG" => 5,
        "LOG_LPR" => 6,
        "LOG_NEWS" => 7,
        "LOG_UUCP" => 8,
        "LOG_CRON" => 9,
        "LOG_AUTHPRIV" => 10,
        "LOG_FTP" => 11,
        "LOG_LOCAL0" => 16,
        "LOG_LOCAL1" => 17,
        "LOG_LOCAL2" => 18,
        "LOG_LOCAL3" => 19,
        "LOG_LOCAL4" => 20,
        "LOG_LOCAL5" => 21,
        "LOG_LOCAL6" => 22,
        "LOG_LOCAL7" => 23,
        _ => return None,
    };
    Some(code)
}
