//! Sysproxy Core - the part of the helper that actually touches the system.
//!
//! This crate provides:
//!
//! - [`request`]: the validated configuration requests (PAC, global, off)
//! - [`validation`]: the injection boundary for request-derived strings
//! - [`command`]: the `networksetup` command model and executor
//! - [`services`]: network service enumeration
//! - [`applier`]: per-service application and verdict aggregation
//!
//! ## Flow
//!
//! ```text
//! ConfigurationRequest ──► ServiceEnumerator::list ──► ProxyApplier::apply
//!        (validated)              │                          │
//!                                 ▼                          ▼
//!                         CommandExecutor ◄──────── plan(request, service)
//!                                                            │
//!                                                            ▼
//!                                                       ApplyReport
//! ```

pub mod applier;
pub mod command;
pub mod error;
pub mod request;
pub mod services;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod validation;

pub use applier::{plan, ApplyOutcome, ApplyReport, ApplyStatus, ProxyApplier};
pub use command::{CommandExecutor, NetworkCommand, NetworkSetup, DEFAULT_NETWORKSETUP};
pub use error::{EnumerationError, ExecutionError, ValidationError};
pub use request::{BypassList, ConfigurationRequest, GlobalProxy, NetworkService, PacTarget, RequestKind};
pub use services::{parse_service_order, ServiceEnumerator};
pub use validation::{validate_global_proxy, validate_pac_url, ARGUMENT_FORBIDDEN, URL_FORBIDDEN};
