// THEORY:
// The `pipeline` module is the top-level API of the annotation engine. It composes the
// four core stages into a single per-frame call and accumulates the resulting events
// for one input sequence.
//
// Per frame: Geometry Reducer -> Adjacency Detector -> Configuration Matcher ->
// Transition Debouncer -> event log. Frames must arrive in timestamp order; the
// debouncer's state is the only thing that crosses frame boundaries, and it belongs
// to this pipeline alone.

use crate::core_modules::adjacency::{AdjacencyDetector, ConnectionSet};
use crate::core_modules::catalog::{Catalog, Configuration};
use crate::core_modules::debouncer::TransitionDebouncer;
use crate::core_modules::frame::Frame;
use crate::core_modules::geometry::reduce_frame;
use crate::error::{CreaCubeError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

// Re-export key data structures for the public API.
pub use crate::core_modules::debouncer::{DebouncePolicy, DebounceState, Event};

const EDGE_TOLERANCE: f64 = 10.0;
const CENTER_TOLERANCE: f64 = 50.0;
const MISSING_FRAME_THRESHOLD: u32 = 2;
const EVENT_TIME_DIVISOR: f64 = 60.0;

/// Tunable constants of the annotation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Largest horizontal edge gap still counted as an x join.
    pub x_tolerance: f64,
    /// Largest vertical edge gap still counted as a y join.
    pub y_tolerance: f64,
    /// Largest center distance still counted as a z join.
    pub z_tolerance: f64,
    /// Number of differing frames a drop must outlast before `DropToAbsent` reports it.
    pub missing_frame_threshold: u32,
    /// Event times are `floor(timestamp / event_time_divisor)`.
    pub event_time_divisor: f64,
    pub debounce_policy: DebouncePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            x_tolerance: EDGE_TOLERANCE,
            y_tolerance: EDGE_TOLERANCE,
            z_tolerance: CENTER_TOLERANCE,
            missing_frame_threshold: MISSING_FRAME_THRESHOLD,
            event_time_divisor: EVENT_TIME_DIVISOR,
            debounce_policy: DebouncePolicy::Literal,
        }
    }
}

impl PipelineConfig {
    /// Checks that every tolerance and the event time divisor is a positive finite
    /// number.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("x_tolerance", self.x_tolerance),
            ("y_tolerance", self.y_tolerance),
            ("z_tolerance", self.z_tolerance),
            ("event_time_divisor", self.event_time_divisor),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(CreaCubeError::InvalidConfig {
                    field,
                    reason: format!("must be a positive finite number, got {value}"),
                });
            }
        }
        Ok(())
    }
}

/// Everything the pipeline learned about a single frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub timestamp: f64,
    pub visible_cubes: usize,
    pub connections: ConnectionSet,
    /// Label of the matched configuration, if the frame matched one.
    pub configuration: Option<String>,
    /// The event this frame produced, if it was a reportable transition.
    pub event: Option<Event>,
}

impl FrameReport {
    pub fn is_transition(&self) -> bool {
        self.event.is_some()
    }
}

/// Counters describing one processed sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub frames_processed: u64,
    pub frames_with_visible_cubes: u64,
    pub frames_matched: u64,
    pub events_emitted: u64,
    /// Frames whose timestamp was lower than the one before. They are still
    /// processed, but the debounce counter is only meaningful for ordered input.
    pub out_of_order_frames: u64,
}

/// The result of running one sequence to completion.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRun {
    pub events: Vec<Event>,
    pub summary: RunSummary,
}

/// The sequential annotation engine for one input sequence.
pub struct AnnotationPipeline {
    detector: AdjacencyDetector,
    catalog: Arc<Catalog>,
    debouncer: TransitionDebouncer,
    events: Vec<Event>,
    summary: RunSummary,
    last_timestamp: Option<f64>,
}

impl AnnotationPipeline {
    pub fn new(config: PipelineConfig, catalog: Arc<Catalog>) -> Self {
        Self {
            detector: AdjacencyDetector::new(&config),
            catalog,
            debouncer: TransitionDebouncer::new(
                config.missing_frame_threshold,
                config.event_time_divisor,
                config.debounce_policy,
            ),
            events: Vec::new(),
            summary: RunSummary::default(),
            last_timestamp: None,
        }
    }

    pub fn process_frame(&mut self, frame: &Frame) -> FrameReport {
        self.track_order(frame.timestamp);

        // Stage 1: Geometry Reduction
        let cubes = reduce_frame(frame);

        // Stage 2: Adjacency Detection
        let connections = self.detector.detect(&cubes);

        // Stage 3: Configuration Matching
        let configuration = self
            .catalog
            .match_configuration(&connections)
            .map(Configuration::label)
            .map(str::to_string);

        debug!(
            timestamp = frame.timestamp,
            visible = cubes.len(),
            connections = ?connections.codes(),
            configuration = configuration.as_deref().unwrap_or("-"),
            "frame analyzed"
        );

        // Stage 4: Debouncing
        let event = self
            .debouncer
            .observe(frame.timestamp, configuration.as_deref());

        self.summary.frames_processed += 1;
        if !cubes.is_empty() {
            self.summary.frames_with_visible_cubes += 1;
        }
        if configuration.is_some() {
            self.summary.frames_matched += 1;
        }
        if let Some(event) = &event {
            self.summary.events_emitted += 1;
            self.events.push(event.clone());
        }

        FrameReport {
            timestamp: frame.timestamp,
            visible_cubes: cubes.len(),
            connections,
            configuration,
            event,
        }
    }

    fn track_order(&mut self, timestamp: f64) {
        if let Some(previous) = self.last_timestamp {
            if timestamp < previous {
                self.summary.out_of_order_frames += 1;
                warn!(timestamp, previous, "frame arrived out of timestamp order");
            }
        }
        self.last_timestamp = Some(timestamp);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn debounce_state(&self) -> &DebounceState {
        self.debouncer.state()
    }

    pub fn finish(self) -> AnnotationRun {
        info!(
            frames = self.summary.frames_processed,
            matched = self.summary.frames_matched,
            events = self.summary.events_emitted,
            "sequence annotated"
        );
        AnnotationRun {
            events: self.events,
            summary: self.summary,
        }
    }
}

/// Runs a whole frame sequence through a fresh pipeline.
pub fn annotate(config: PipelineConfig, catalog: Arc<Catalog>, frames: &[Frame]) -> AnnotationRun {
    let mut pipeline = AnnotationPipeline::new(config, catalog);
    for frame in frames {
        pipeline.process_frame(frame);
    }
    pipeline.finish()
}
