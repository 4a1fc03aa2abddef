//! Sysproxy helper daemon support code.

pub mod logging;
