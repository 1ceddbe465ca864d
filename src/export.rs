//! Export of activity segments and live updates.
//!
//! Two consumers are served:
//! - **Segment sinks**: persist every completed `ActivitySegment`. The
//!   pipeline never writes anything itself; callers forward
//!   `PipelineOutput::completed_segment` to a sink.
//! - **Streaming**: sequenced JSON messages for live dashboards, one per
//!   label change or completed segment.

use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;

use crate::error::ExportError;
use crate::types::*;

// ============================================================================
// SEGMENT SINKS
// ============================================================================

/// Destination for completed segments.
pub trait SegmentSink {
    fn append(&mut self, segment: &ActivitySegment) -> Result<(), ExportError>;

    /// Flush buffered output. Default is a no-op.
    fn flush(&mut self) -> Result<(), ExportError> {
        Ok(())
    }
}

/// In-memory segment history.
#[derive(Debug, Clone, Default)]
pub struct SegmentLog {
    segments: Vec<ActivitySegment>,
}

/// Time spent per label across a `SegmentLog`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DwellSummary {
    pub total_duration: f64,
    /// Seconds per label. Labels never seen are absent.
    pub per_label: BTreeMap<Label, f64>,
    pub segment_count: usize,
}

impl DwellSummary {
    /// Share of the total time spent in `label`, in [0, 1].
    pub fn fraction(&self, label: Label) -> f64 {
        if self.total_duration <= 0.0 {
            return 0.0;
        }
        self.per_label.get(&label).copied().unwrap_or(0.0) / self.total_duration
    }
}

impl SegmentLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[ActivitySegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&ActivitySegment> {
        self.segments.last()
    }

    pub fn summary(&self) -> DwellSummary {
        let mut summary = DwellSummary {
            segment_count: self.segments.len(),
            ..Default::default()
        };
        for segment in &self.segments {
            let duration = segment.duration().max(0.0);
            summary.total_duration += duration;
            *summary.per_label.entry(segment.label).or_insert(0.0) += duration;
        }
        summary
    }
}

impl SegmentSink for SegmentLog {
    fn append(&mut self, segment: &ActivitySegment) -> Result<(), ExportError> {
        self.segments.push(*segment);
        Ok(())
    }
}

/// Writes one JSON object per segment, newline separated.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: u64,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Segments written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SegmentSink for JsonLinesSink<W> {
    fn append(&mut self, segment: &ActivitySegment) -> Result<(), ExportError> {
        serde_json::to_writer(&mut self.writer, segment)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ExportError> {
        self.writer.flush()?;
        Ok(())
    }
}

// ============================================================================
// STREAMING EXPORT (live updates)
// ============================================================================

/// A single streaming update message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamingUpdate {
    #[serde(rename = "seq")]
    pub sequence: u64,
    #[serde(rename = "ts")]
    pub timestamp: f64,
    #[serde(flatten)]
    pub update_type: StreamingUpdateType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StreamingUpdateType {
    /// The stable label changed.
    LabelChange {
        from: Label,
        to: Label,
        features: FeatureSet,
    },
    /// A segment was closed.
    SegmentComplete(ActivitySegment),
}

impl StreamingUpdate {
    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Turns pipeline outputs into sequenced updates.
#[derive(Debug, Clone)]
pub struct StreamingExporter {
    sequence: u64,
    last_label: Label,
}

impl Default for StreamingExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamingExporter {
    pub fn new() -> Self {
        Self {
            sequence: 0,
            last_label: Label::default(),
        }
    }

    /// Updates produced by one pipeline output, segment first.
    pub fn updates(&mut self, timestamp: f64, output: &PipelineOutput) -> Vec<StreamingUpdate> {
        let mut updates = Vec::new();
        if let Some(segment) = output.completed_segment {
            updates.push(self.segment_update(timestamp, segment));
        }
        if output.current_label != self.last_label {
            updates.push(self.label_update(timestamp, output.current_label, output.features));
        }
        updates
    }

    pub fn label_update(&mut self, timestamp: f64, to: Label, features: FeatureSet) -> StreamingUpdate {
        let from = std::mem::replace(&mut self.last_label, to);
        self.next(timestamp, StreamingUpdateType::LabelChange { from, to, features })
    }

    pub fn segment_update(&mut self, timestamp: f64, segment: ActivitySegment) -> StreamingUpdate {
        self.next(timestamp, StreamingUpdateType::SegmentComplete(segment))
    }

    fn next(&mut self, timestamp: f64, update_type: StreamingUpdateType) -> StreamingUpdate {
        self.sequence += 1;
        StreamingUpdate {
            sequence: self.sequence,
            timestamp,
            update_type,
        }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

// ============================================================================
// TESTS
// ============================================================================
