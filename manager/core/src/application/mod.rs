// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0

pub mod analyzer;
pub mod association;
pub mod dispatch;
pub mod enforcer;
pub mod records;
pub mod report;
pub mod repository_factory;
pub mod service;
pub mod value_resolver;

// Re-export the engine components for convenience
pub use analyzer::TagAnalyzer;
pub use association::AssociationResolver;
pub use dispatch::{DispatchReport, EnforcementDispatcher, RetryPolicy};
pub use enforcer::EnforcementPlanner;
pub use records::TagRecords;
pub use service::{AnalysisSummary, TagManagerService};
pub use value_resolver::ValueResolver;
