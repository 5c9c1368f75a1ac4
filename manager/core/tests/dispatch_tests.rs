// Copyright (c) 2026 Fuse Platform Engineering
// SPDX-License-Identifier: AGPL-3.0

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tag_manager_core::application::{EnforcementDispatcher, RetryPolicy};
use tag_manager_core::domain::enforcement::{EnforcementAction, TagWriteError, TagWriter};
use tag_manager_core::domain::events::EngineEvent;
use tag_manager_core::domain::manager_config::EnforcementConfig;
use tag_manager_core::domain::resource::ResourceType;
use tag_manager_core::infrastructure::audit::RecordingEventSink;
use tokio_util::sync::CancellationToken;

fn action(id: &str) -> EnforcementAction {
    EnforcementAction {
        resource_id: id.to_string(),
        resource_type: ResourceType::Ec2,
        write_target: id.to_string(),
        tags_to_write: BTreeMap::from([("product".to_string(), "Care".to_string())]),
    }
}

fn fast_settings(max_in_flight: usize) -> EnforcementConfig {
    EnforcementConfig {
        max_in_flight,
        call_timeout_seconds: 5,
        max_retries: 2,
        base_backoff_ms: 1,
        max_backoff_ms: 4,
        jitter: false,
        ..Default::default()
    }
}

/// Scripted writer: each resource id fails with the queued errors, then succeeds.
#[derive(Default)]
struct ScriptedWriter {
    script: Mutex<HashMap<String, Vec<TagWriteError>>>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedWriter {
    fn with_script(script: HashMap<String, Vec<TagWriteError>>) -> Self {
        Self {
            script: Mutex::new(script),
            ..Default::default()
        }
    }

    fn calls_for(&self, id: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == id).count()
    }
}

#[async_trait]
impl TagWriter for ScriptedWriter {
    async fn write_tags(&self, action: &EnforcementAction) -> Result<(), TagWriteError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.lock().unwrap().push(action.resource_id.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = {
            let mut script = self.script.lock().unwrap();
            script.get_mut(&action.resource_id).and_then(|queue| {
                if queue.is_empty() {
                    None
                } else {
                    Some(queue.remove(0))
                }
            })
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match next {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[tokio::test]
async fn throttled_writes_are_retried_until_success() {
    let writer = Arc::new(ScriptedWriter::with_script(HashMap::from([(
        "i-1".to_string(),
        vec![
            TagWriteError::Throttled("slow down".into()),
            TagWriteError::Throttled("slow down".into()),
        ],
    )])));
    let sink = Arc::new(RecordingEventSink::new());
    let dispatcher = EnforcementDispatcher::new(writer.clone(), &fast_settings(1), sink.clone());

    let report = dispatcher
        .dispatch(vec![action("i-1")], CancellationToken::new())
        .await;

    assert_eq!(report.succeeded.len(), 1);
    assert_eq!(writer.calls_for("i-1"), 3);
    let retries = sink
        .events()
        .iter()
        .filter(|e| matches!(e, EngineEvent::WriteRetried { .. }))
        .count();
    assert_eq!(retries, 2);
}

#[tokio::test]
async fn retries_stop_at_the_limit() {
    let writer = Arc::new(ScriptedWriter::with_script(HashMap::from([(
        "i-1".to_string(),
        vec![TagWriteError::Throttled("x".into()); 5],
    )])));
    let dispatcher = EnforcementDispatcher::new(
        writer.clone(),
        &fast_settings(1),
        Arc::new(RecordingEventSink::new()),
    );

    let report = dispatcher
        .dispatch(vec![action("i-1")], CancellationToken::new())
        .await;

    assert_eq!(report.failed.len(), 1);
    assert_eq!(writer.calls_for("i-1"), 3);
}

#[tokio::test]
async fn failures_are_isolated_and_not_retried_when_rejected() {
    let writer = Arc::new(ScriptedWriter::with_script(HashMap::from([(
        "i-2".to_string(),
        vec![TagWriteError::Rejected("access denied".into())],
    )])));
    let sink = Arc::new(RecordingEventSink::new());
    let dispatcher = EnforcementDispatcher::new(writer.clone(), &fast_settings(2), sink.clone());

    let report = dispatcher
        .dispatch(
            vec![action("i-1"), action("i-2"), action("i-3")],
            CancellationToken::new(),
        )
        .await;

    assert_eq!(report.succeeded.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0.resource_id, "i-2");
    assert_eq!(report.attempted(), 3);
    assert_eq!(writer.calls_for("i-2"), 1);
    assert!(sink
        .events()
        .iter()
        .any(|e| matches!(e, EngineEvent::WriteFailed { .. })));
}

#[tokio::test]
async fn concurrency_never_exceeds_the_limit() {
    let writer = Arc::new(ScriptedWriter {
        delay: Some(Duration::from_millis(5)),
        ..Default::default()
    });
    let dispatcher = EnforcementDispatcher::new(
        writer.clone(),
        &fast_settings(2),
        Arc::new(RecordingEventSink::new()),
    );

    let actions = (0..8).map(|i| action(&format!("i-{i}"))).collect();
    let report = dispatcher.dispatch(actions, CancellationToken::new()).await;

    assert_eq!(report.succeeded.len(), 8);
    assert!(writer.peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn slow_calls_time_out() {
    let writer = Arc::new(ScriptedWriter {
        delay: Some(Duration::from_millis(200)),
        ..Default::default()
    });
    let dispatcher = EnforcementDispatcher::new(
        writer,
        &fast_settings(1),
        Arc::new(RecordingEventSink::new()),
    )
    .with_call_timeout(Duration::from_millis(10));

    let report = dispatcher
        .dispatch(vec![action("i-1")], CancellationToken::new())
        .await;

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].1, "Timed out after 10ms");
}

#[tokio::test]
async fn cancelled_token_stops_new_writes() {
    let writer = Arc::new(ScriptedWriter::default());
    let sink = Arc::new(RecordingEventSink::new());
    let dispatcher = EnforcementDispatcher::new(writer.clone(), &fast_settings(1), sink.clone())
        .with_retry_policy(RetryPolicy {
            max_retries: 0,
            base_backoff_ms: 1,
            max_backoff_ms: 1,
            jitter: false,
        });

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = dispatcher
        .dispatch(vec![action("i-1"), action("i-2")], cancel)
        .await;

    assert_eq!(report.cancelled.len(), 2);
    assert!(report.succeeded.is_empty());
    assert!(writer.calls.lock().unwrap().is_empty());
    assert!(sink
        .events()
        .iter()
        .any(|e| matches!(e, EngineEvent::DispatchCancelled { remaining: 2 })));
}

#[tokio::test]
async fn cancelling_mid_run_reports_the_remainder() {
    let writer = Arc::new(ScriptedWriter {
        delay: Some(Duration::from_millis(20)),
        ..Default::default()
    });
    let dispatcher = EnforcementDispatcher::new(
        writer.clone(),
        &fast_settings(1),
        Arc::new(RecordingEventSink::new()),
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let actions = (0..10).map(|i| action(&format!("i-{i}"))).collect();
    let report = dispatcher.dispatch(actions, cancel).await;

    assert!(!report.cancelled.is_empty());
    assert_eq!(report.succeeded.len() + report.failed.len() + report.cancelled.len(), 10);
    assert!(!report.is_clean());
}
