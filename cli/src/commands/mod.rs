// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the tagman CLI

pub mod analyze;
pub mod config;
pub mod enforce;
pub mod import;
pub mod policy;
pub mod report;
pub mod run;

pub use self::config::ConfigCommand;
pub use self::enforce::EnforceArgs;
pub use self::policy::PolicyCommand;
pub use self::report::ReportFormat;
pub use self::run::RunArgs;
