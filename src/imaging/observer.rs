//! Pipeline checkpoints and the observers that watch them.
//!
//! The pipeline reports stage entry, stage exit and failure through a
//! [`PipelineObserver`] injected once into the [`Pipeline`](super::Pipeline),
//! instead of a verbosity flag threaded through every call. Any
//! `Fn(&PipelineEvent) + Sync` closure is an observer, which is what tests
//! use to collect events.

use super::calculations::Size;
use tracing::{debug, warn};

/// Pipeline stages, in the order a full chain visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Load,
    Resize,
    Crop,
    Adjust,
    Flatten,
    Encode,
    Optimize,
    Preset,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Load => "load",
            Stage::Resize => "resize",
            Stage::Crop => "crop",
            Stage::Adjust => "adjust",
            Stage::Flatten => "flatten",
            Stage::Encode => "encode",
            Stage::Optimize => "optimize",
            Stage::Preset => "preset",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Started {
        stage: Stage,
        detail: String,
    },
    Finished {
        stage: Stage,
        size: Size,
    },
    /// An encode stage fell back or a budget retry happened.
    Note {
        stage: Stage,
        message: String,
    },
    Failed {
        stage: Stage,
        error: String,
    },
}

impl PipelineEvent {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineEvent::Started { stage, .. }
            | PipelineEvent::Finished { stage, .. }
            | PipelineEvent::Note { stage, .. }
            | PipelineEvent::Failed { stage, .. } => *stage,
        }
    }
}

pub trait PipelineObserver: Sync {
    fn on_event(&self, event: &PipelineEvent);
}

impl<F> PipelineObserver for F
where
    F: Fn(&PipelineEvent) + Sync,
{
    fn on_event(&self, event: &PipelineEvent) {
        self(event)
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {
    fn on_event(&self, _event: &PipelineEvent) {}
}

/// Forwards events to `tracing`: progress at debug, failures at warn.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::Started { stage, detail } => {
                debug!(stage = stage.name(), %detail, "stage started");
            }
            PipelineEvent::Finished { stage, size } => {
                debug!(
                    stage = stage.name(),
                    width = size.width,
                    height = size.height,
                    "stage finished"
                );
            }
            PipelineEvent::Note { stage, message } => {
                debug!(stage = stage.name(), %message);
            }
            PipelineEvent::Failed { stage, error } => {
                warn!(stage = stage.name(), %error, "stage failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn closures_are_observers() {
        let seen = Mutex::new(Vec::new());
        let observer = |event: &PipelineEvent| seen.lock().unwrap().push(event.stage());

        observer.on_event(&PipelineEvent::Started {
            stage: Stage::Load,
            detail: "a.jpg".into(),
        });
        observer.on_event(&PipelineEvent::Failed {
            stage: Stage::Encode,
            error: "boom".into(),
        });

        assert_eq!(*seen.lock().unwrap(), vec![Stage::Load, Stage::Encode]);
    }

    #[test]
    fn tracing_observer_accepts_all_events() {
        let observer = TracingObserver;
        observer.on_event(&PipelineEvent::Finished {
            stage: Stage::Resize,
            size: Size::new(10, 10),
        });
        observer.on_event(&PipelineEvent::Note {
            stage: Stage::Optimize,
            message: "retry".into(),
        });
    }
}
