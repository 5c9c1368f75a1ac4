// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0
//! Tag Manager Service
//!
//! Orchestrates one analysis cycle and one enforcement run over the document
//! store:
//!
//! ```text
//! policy + snapshots -> TagAnalyzer -> AssociationResolver -> ANALYSIS-* records
//! ANALYSIS-* records + policy -> EnforcementPlanner -> EnforcementDispatcher -> TagWriter
//! ```
//!
//! The association pass runs only once every base analysis of the batch
//! exists.

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::application::analyzer::TagAnalyzer;
use crate::application::association::AssociationResolver;
use crate::application::dispatch::{DispatchReport, EnforcementDispatcher};
use crate::application::enforcer::EnforcementPlanner;
use crate::application::records::TagRecords;
use crate::domain::analysis::TagAnalysis;
use crate::domain::enforcement::{EnforcementAction, SentinelConvention, TagWriter};
use crate::domain::events::EventSink;
use crate::domain::manager_config::ManagerConfig;
use crate::domain::org::OrgLookup;
use crate::domain::policy::TagPolicyConfig;
use crate::domain::resource::ResourceSnapshot;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub resources: usize,
    pub compliant: usize,
    pub with_invalid_tags: usize,
    pub with_missing_tags: usize,
    pub superseded: usize,
}

impl AnalysisSummary {
    pub fn from_analyses(analyses: &[TagAnalysis]) -> Self {
        let mut summary = Self {
            resources: analyses.len(),
            ..Default::default()
        };
        for analysis in analyses {
            let invalid = !analysis.invalid_tags.is_empty();
            let missing = !analysis.unmatched_tags.is_empty();
            if invalid {
                summary.with_invalid_tags += 1;
            }
            if missing {
                summary.with_missing_tags += 1;
            }
            if !analysis.force_add_tags.is_empty() {
                summary.superseded += 1;
            }
            if !invalid && !missing && analysis.force_add_tags.is_empty() {
                summary.compliant += 1;
            }
        }
        summary
    }
}

pub struct TagManagerService {
    records: TagRecords,
    config: ManagerConfig,
    events: Arc<dyn EventSink>,
    analyzer: TagAnalyzer,
    association: AssociationResolver,
    planner: EnforcementPlanner,
}

impl TagManagerService {
    pub fn new(records: TagRecords, config: ManagerConfig, events: Arc<dyn EventSink>) -> Self {
        let sentinel = SentinelConvention::new(config.enforcement.sentinel_prefix.clone());
        Self {
            analyzer: TagAnalyzer::new(events.clone()),
            association: AssociationResolver::new(&config.association, events.clone()),
            planner: EnforcementPlanner::new(sentinel, events.clone()),
            records,
            config,
            events,
        }
    }

    pub fn records(&self) -> &TagRecords {
        &self.records
    }

    /// Classify every snapshot, then apply the association rules.
    pub fn analyze_batch(
        &self,
        snapshots: &[ResourceSnapshot],
        policy: &TagPolicyConfig,
        org_lookup: &OrgLookup,
    ) -> Vec<TagAnalysis> {
        let base = self.analyzer.classify_all(snapshots, policy);
        self.association.resolve(base, org_lookup, policy)
    }

    /// Load inputs, analyse, and replace the stored analysis set.
    pub async fn run_analysis_cycle(&self) -> Result<AnalysisSummary> {
        let policy = self.records.load_policy().await?;
        let org_lookup = self.records.load_org_lookup().await?;
        let snapshots = self.records.load_snapshots().await?;

        info!(resources = snapshots.len(), tags = policy.len(), "Starting analysis cycle");

        let analyses = self.analyze_batch(&snapshots, &policy, &org_lookup);
        self.records.replace_analyses(&analyses).await?;

        let summary = AnalysisSummary::from_analyses(&analyses);
        info!(
            resources = summary.resources,
            compliant = summary.compliant,
            superseded = summary.superseded,
            "Analysis cycle complete"
        );
        Ok(summary)
    }

    /// Actions for the stored analyses under the stored policy.
    pub async fn plan_enforcement(&self) -> Result<Vec<EnforcementAction>> {
        let policy = self.records.load_policy().await?;
        let analyses = self.records.load_analyses().await?;
        let actions = self.planner.compute_actions(&analyses, &policy);
        info!(analyses = analyses.len(), actions = actions.len(), "Planned enforcement");
        Ok(actions)
    }

    pub async fn run_enforcement(
        &self,
        writer: Arc<dyn TagWriter>,
        cancel: CancellationToken,
    ) -> Result<DispatchReport> {
        let actions = self.plan_enforcement().await?;
        Ok(self.dispatch_actions(actions, writer, cancel).await)
    }

    /// Dispatch actions that were already planned, without planning again.
    pub async fn dispatch_actions(
        &self,
        actions: Vec<EnforcementAction>,
        writer: Arc<dyn TagWriter>,
        cancel: CancellationToken,
    ) -> DispatchReport {
        let dispatcher =
            EnforcementDispatcher::new(writer, &self.config.enforcement, self.events.clone());
        dispatcher.dispatch(actions, cancel).await
    }
}
