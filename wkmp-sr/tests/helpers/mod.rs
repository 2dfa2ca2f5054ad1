//! Test helpers for wkmp-sr integration tests
//!
//! Provides:
//! - `CandidateBuilder`: concise raw candidates
//! - `ScriptedSource`: per-query scripted candidate streams, optionally left open
//! - `TestScorer`: deterministic sub-scores (quality from bitrate, availability
//!   from queue depth, everything else 0)
//! - `build_engine` / `settle`: engine wiring with fast test timings

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wkmp_common::events::EventBus;
use wkmp_sr::config::{BatchingConfig, SearchConfig};
use wkmp_sr::ingest::{CandidateSource, CandidateStream, SourceError};
use wkmp_sr::models::{RankingContext, RawCandidate, ResultRecord};
use wkmp_sr::scoring::{FeatureScorer, SubScores};
use wkmp_sr::filter::Predicate;
use wkmp_sr::services::{DownloadManager, InMemoryDownloadManager};
use wkmp_sr::SearchEngine;

pub struct CandidateBuilder {
    candidate: RawCandidate,
}

impl CandidateBuilder {
    pub fn new(hash: &str) -> Self {
        Self {
            candidate: RawCandidate {
                filename: format!("Music\\Artist\\{}.mp3", hash),
                format: String::new(),
                bitrate: 320,
                queue_depth: 0,
                file_size: 5_000_000,
                peer_id: format!("peer-{}", hash),
                source_hash: hash.to_string(),
            },
        }
    }

    pub fn filename(mut self, filename: &str) -> Self {
        self.candidate.filename = filename.to_string();
        self
    }

    pub fn bitrate(mut self, bitrate: u32) -> Self {
        self.candidate.bitrate = bitrate;
        self
    }

    pub fn queue(mut self, queue_depth: u32) -> Self {
        self.candidate.queue_depth = queue_depth;
        self
    }

    pub fn format(mut self, format: &str) -> Self {
        self.candidate.format = format.to_string();
        self
    }

    pub fn build(self) -> RawCandidate {
        self.candidate
    }

    pub fn ok(self) -> Result<RawCandidate, SourceError> {
        Ok(self.candidate)
    }
}

#[derive(Clone, Default)]
struct Script {
    items: Vec<Result<RawCandidate, SourceError>>,
    open_ended: bool,
}

/// Candidate source that replays a fixed script per query
#[derive(Default)]
pub struct ScriptedSource {
    scripts: Mutex<HashMap<String, Script>>,
    queries: Mutex<Vec<String>>,
}

impl ScriptedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Stream `items` for `query`, then end
    pub fn script(&self, query: &str, items: Vec<Result<RawCandidate, SourceError>>) {
        self.scripts.lock().unwrap().insert(
            query.to_string(),
            Script {
                items,
                open_ended: false,
            },
        );
    }

    /// Stream `items` for `query`, then stay open until cancelled
    pub fn script_open(&self, query: &str, items: Vec<Result<RawCandidate, SourceError>>) {
        self.scripts.lock().unwrap().insert(
            query.to_string(),
            Script {
                items,
                open_ended: true,
            },
        );
    }

    /// Effective queries received so far
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl CandidateSource for ScriptedSource {
    fn search(&self, query: &str, _album_mode: bool) -> CandidateStream {
        self.queries.lock().unwrap().push(query.to_string());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default();

        Box::pin(async_stream::stream! {
            for item in script.items {
                yield item;
            }
            if script.open_ended {
                futures::future::pending::<()>().await;
            }
        })
    }
}

/// quality = bitrate / 1000, availability = 1 / (1 + queue), rest 0
pub struct TestScorer;

impl FeatureScorer for TestScorer {
    fn name(&self) -> &'static str {
        "test"
    }

    fn score(&self, record: &ResultRecord, _context: &RankingContext) -> SubScores {
        SubScores {
            quality: record.bitrate as f64 / 1000.0,
            availability: 1.0 / (1.0 + record.queue_depth as f64),
            musical: 0.0,
            metadata: 0.0,
            string: 0.0,
        }
    }
}

pub fn test_config() -> SearchConfig {
    SearchConfig {
        batching: BatchingConfig {
            flush_interval_ms: 20,
            max_batch_size: 50,
        },
        filter_debounce_ms: 30,
        event_capacity: 1024,
        ..Default::default()
    }
}

pub struct TestHarness {
    pub engine: SearchEngine,
    pub source: Arc<ScriptedSource>,
    pub downloads: Arc<InMemoryDownloadManager>,
    pub event_bus: Arc<EventBus>,
}

/// Engine over a scripted source, using [`TestScorer`]
pub fn build_engine(source: Arc<ScriptedSource>) -> TestHarness {
    let config = test_config();
    let event_bus = Arc::new(EventBus::new(config.event_capacity));
    let downloads = Arc::new(InMemoryDownloadManager::new(Some(Arc::clone(&event_bus))));
    let engine = SearchEngine::new(
        config,
        Arc::clone(&source) as Arc<dyn CandidateSource>,
        Arc::clone(&downloads) as Arc<dyn DownloadManager>,
        Arc::clone(&event_bus),
    )
    .with_scorer(Arc::new(TestScorer));

    TestHarness {
        engine,
        source,
        downloads,
        event_bus,
    }
}

/// Run the engine until ingestion and debounce are done
pub async fn settle(engine: &mut SearchEngine) {
    tokio::time::timeout(Duration::from_secs(5), engine.run_until_idle())
        .await
        .expect("engine did not settle");
}

/// Process inputs until at least `count` records are in the collection
pub async fn wait_for_found(engine: &mut SearchEngine, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while engine.found() < count {
            engine.process_next().await;
        }
    })
    .await
    .expect("records did not arrive");
}

/// View invariants that must hold after every mutation
pub fn assert_view_consistent(engine: &SearchEngine) {
    let visible = engine.visible_records();
    assert!(
        visible.windows(2).all(|w| w[0].rank >= w[1].rank),
        "visible view not sorted by rank"
    );
    assert_eq!(engine.hidden_count(), engine.found() - visible.len());

    if !engine.has_pending_filter() {
        let predicate = Predicate::compile(engine.filter());
        let visible_ids: Vec<_> = visible.iter().map(|r| r.id).collect();
        for record in engine.all_records() {
            assert_eq!(
                predicate.matches(record),
                visible_ids.contains(&record.id),
                "record {} visibility disagrees with the filter",
                record.id
            );
        }
    }
}
