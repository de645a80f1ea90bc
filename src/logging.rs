//! Callback logging for encoded and decoded frames
//!
//! The codec itself reports diagnostics through `tracing`. Applications that
//! want a per-generator frame log (a bus monitor, a commissioning tool) attach
//! a [`CallbackLogger`] to the generator instead.

use std::sync::Arc;

use crate::error::ModbusError;
use crate::protocol::{ModbusRequest, ModbusResponse};
use crate::utils::format::bytes_to_hex;

/// Log levels for the callback logging system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Error messages
    Error,
    /// Warning messages
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
}

/// Logging mode for frame display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// Show raw frame bytes only
    Raw,
    /// Show interpreted frame contents
    Interpreted,
    /// Show both; raw bytes are logged at debug level
    Both,
}

impl LogLevel {
    /// Convert log level to string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

/// Type alias for log callback functions
///
/// The callback receives a log level and message string
pub type LogCallback = Box<dyn Fn(LogLevel, &str) + Send + Sync>;

/// Logger that uses callbacks for flexible logging
#[derive(Clone)]
pub struct CallbackLogger {
    callback: Option<Arc<LogCallback>>,
    min_level: LogLevel,
    mode: LoggingMode,
}

impl CallbackLogger {
    /// Create a new callback logger
    pub fn new(callback: Option<LogCallback>, min_level: LogLevel) -> Self {
        Self::with_mode(callback, min_level, LoggingMode::Interpreted)
    }

    /// Create a new callback logger with specific mode
    pub fn with_mode(callback: Option<LogCallback>, min_level: LogLevel, mode: LoggingMode) -> Self {
        Self {
            callback: callback.map(Arc::new),
            min_level,
            mode,
        }
    }

    /// Create a logger with timestamped console output
    pub fn console() -> Self {
        let callback: LogCallback = Box::new(|level, message| {
            let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f");
            match level {
                LogLevel::Error | LogLevel::Warn => eprintln!("[{}] {}: {}", timestamp, level.as_str(), message),
                LogLevel::Info | LogLevel::Debug => println!("[{}] {}: {}", timestamp, level.as_str(), message),
            }
        });
        Self::new(Some(callback), LogLevel::Info)
    }

    /// Create a logger that forwards to the `log` facade
    ///
    /// Filtering is left to the installed `log` backend, so every level is
    /// passed through.
    pub fn facade() -> Self {
        let callback: LogCallback = Box::new(|level, message| match level {
            LogLevel::Error => log::error!(target: "voltage_modbus_codec", "{}", message),
            LogLevel::Warn => log::warn!(target: "voltage_modbus_codec", "{}", message),
            LogLevel::Info => log::info!(target: "voltage_modbus_codec", "{}", message),
            LogLevel::Debug => log::debug!(target: "voltage_modbus_codec", "{}", message),
        });
        Self::new(Some(callback), LogLevel::Debug)
    }

    /// Create a logger that outputs nothing (disabled)
    pub fn disabled() -> Self {
        Self::new(None, LogLevel::Error)
    }

    /// Set logging mode
    pub fn set_mode(&mut self, mode: LoggingMode) {
        self.mode = mode;
    }

    /// Get current logging mode
    pub fn mode(&self) -> LoggingMode {
        self.mode
    }

    /// Check whether a callback is attached
    pub fn is_enabled(&self) -> bool {
        self.callback.is_some()
    }

    /// Log a message at the specified level
    pub fn log(&self, level: LogLevel, message: &str) {
        if self.should_log(level) {
            if let Some(ref callback) = self.callback {
                callback(level, message);
            }
        }
    }

    /// Log an error message
    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    /// Log a warning message
    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    /// Log an info message
    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Log a debug message
    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    fn should_log(&self, level: LogLevel) -> bool {
        self.callback.is_some() && level as u8 <= self.min_level as u8
    }

    /// Log an encoded request
    pub fn log_request(&self, unit_id: u8, request: &ModbusRequest, frame: &[u8]) {
        let interpreted = || {
            format!(
                "Modbus Request -> Unit: {}, Function: {}, Address: {}, Quantity: {}",
                unit_id,
                request.function(),
                request.address(),
                request.quantity()
            )
        };
        self.log_frame("Modbus Request ->", frame, interpreted);
    }

    /// Log a decoded response
    pub fn log_response(&self, unit_id: u8, response: &ModbusResponse, frame: &[u8]) {
        let interpreted = || format!("Modbus Response <- Unit: {}, {}", unit_id, response);
        self.log_frame("Modbus Response <-", frame, interpreted);
    }

    /// Log a frame that failed to decode
    pub fn log_decode_error(&self, error: &ModbusError, frame: &[u8]) {
        if !self.should_log(LogLevel::Warn) {
            return;
        }

        let message = format!("Modbus Response <- {} (raw: {})", error, bytes_to_hex(frame));
        self.warn(&message);
    }

    fn log_frame(&self, prefix: &str, frame: &[u8], interpreted: impl Fn() -> String) {
        if !self.is_enabled() {
            return;
        }

        match self.mode {
            LoggingMode::Raw => {
                self.info(&format!("{} Raw: {}", prefix, bytes_to_hex(frame)));
            }
            LoggingMode::Interpreted => {
                self.info(&interpreted());
            }
            LoggingMode::Both => {
                self.info(&interpreted());
                self.debug(&format!("{} Raw: {}", prefix, bytes_to_hex(frame)));
            }
        }
    }
}

impl Default for CallbackLogger {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Convenience macro for creating a simple console logger
#[macro_export]
macro_rules! console_logger {
    () => {
        $crate::logging::CallbackLogger::console()
    };
}

/// Convenience macro for creating a custom logger
#[macro_export]
macro_rules! custom_logger {
    ($callback:expr) => {
        $crate::logging::CallbackLogger::new(Some($callback), $crate::logging::LogLevel::Info)
    };
    ($callback:expr, $level:expr) => {
        $crate::logging::CallbackLogger::new(Some($callback), $level)
    };
    ($callback:expr, $level:expr, $mode:expr) => {
        $crate::logging::CallbackLogger::with_mode(Some($callback), $level, $mode)
    };
}
