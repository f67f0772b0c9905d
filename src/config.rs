//! Server configuration.
//!
//! Every setting can come from the command line or the environment.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `REGISTRY_HTTP_ADDR` | 127.0.0.1:8080 | HTTP listen address |
//! | `REGISTRY_GRPC_ADDR` | 127.0.0.1:8081 | gRPC listen address |
//! | `REGISTRY_LOG_LEVEL` | info | Log level |
//! | `REGISTRY_REQUEST_TIMEOUT` | 30 | Per-request deadline (seconds, at most one day) |
//! | `REGISTRY_DEFAULT_PAGE_SIZE` | 50 | Page size when a list asks for none |
//! | `REGISTRY_MAX_PAGE_SIZE` | 1000 | Largest page a list may return |
//! | `REGISTRY_CASCADE_POLICY` | abort | What a failed child deletion does to a delete |

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::cursor::{PageSizePolicy, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Longest per-request deadline the server accepts, one day.
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// What a cascading delete does when removing a descendant fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum CascadePolicy {
    /// Stop at the first failure and leave the target in place.
    #[default]
    Abort,
    /// Log the failure, keep going, and delete the target anyway.
    BestEffort,
}

/// Engine settings that do not depend on a transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineOptions {
    pub page_size: PageSizePolicy,
    pub cascade: CascadePolicy,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "registry-server")]
#[command(about = "Resource registry server")]
pub struct ServerConfig {
    /// HTTP listen address.
    #[arg(long, env = "REGISTRY_HTTP_ADDR", default_value = "127.0.0.1:8080")]
    pub http_addr: SocketAddr,

    /// gRPC listen address.
    #[arg(long, env = "REGISTRY_GRPC_ADDR", default_value = "127.0.0.1:8081")]
    pub grpc_addr: SocketAddr,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "REGISTRY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Request timeout in seconds.
    #[arg(long, env = "REGISTRY_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,

    /// Page size used when a list call asks for zero or fewer records.
    #[arg(long, env = "REGISTRY_DEFAULT_PAGE_SIZE", default_value = "50")]
    pub default_page_size: usize,

    /// Largest page a list call may return.
    #[arg(long, env = "REGISTRY_MAX_PAGE_SIZE", default_value = "1000")]
    pub max_page_size: usize,

    /// Behaviour of a cascading delete when a descendant cannot be removed.
    #[arg(long, env = "REGISTRY_CASCADE_POLICY", value_enum, default_value = "abort")]
    pub cascade_policy: CascadePolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            grpc_addr: SocketAddr::from(([127, 0, 0, 1], 8081)),
            log_level: "info".to_string(),
            request_timeout: 30,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            cascade_policy: CascadePolicy::Abort,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            page_size: PageSizePolicy {
                default: self.default_page_size,
                max: self.max_page_size,
            },
            cascade: self.cascade_policy,
        }
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.http_addr == self.grpc_addr {
            errors.push("HTTP and gRPC addresses must differ".to_string());
        }
        if self.request_timeout == 0 {
            errors.push("Request timeout cannot be 0".to_string());
        }
        if self.request_timeout > MAX_REQUEST_TIMEOUT_SECS {
            errors.push(format!(
                "Request timeout cannot exceed {} seconds",
                MAX_REQUEST_TIMEOUT_SECS
            ));
        }
        if self.default_page_size == 0 {
            errors.push("Default page size cannot be 0".to_string());
        }
        if self.max_page_size == 0 {
            errors.push("Max page size cannot be 0".to_string());
        }
        if self.default_page_size > self.max_page_size {
            errors.push("Default page size cannot exceed max page size".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
