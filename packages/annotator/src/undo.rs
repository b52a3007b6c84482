//! Undo host seam.
//!
//! Tagger operations that change the document in several steps bracket
//! the whole operation as one undo level: they push a checkpoint and then
//! ask the host to ignore the checkpoint its own change tracking would take.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// The undo manager of the editing surface.
pub trait UndoHost: Send {
    /// Record the current state as an undo level.
    fn push_checkpoint(&mut self);

    /// Skip the next automatically taken checkpoint.
    fn suppress_next_checkpoint(&mut self);
}

/// Undo host for headless use.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopUndo;

impl UndoHost for NoopUndo {
    fn push_checkpoint(&mut self) {}

    fn suppress_next_checkpoint(&mut self) {}
}

/// Undo host that counts calls. Clones share their counters.
#[derive(Debug, Clone, Default)]
pub struct RecordingUndo {
    checkpoints: Arc<AtomicUsize>,
    suppressed: Arc<AtomicUsize>,
}

impl RecordingUndo {
    #[must_use]
    pub fn checkpoints(&self) -> usize {
        self.checkpoints.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn suppressed(&self) -> usize {
        self.suppressed.load(Ordering::SeqCst)
    }
}

impl UndoHost for RecordingUndo {
    fn push_checkpoint(&mut self) {
        self.checkpoints.fetch_add(1, Ordering::SeqCst);
    }

    fn suppress_next_checkpoint(&mut self) {
        self.suppressed.fetch_add(1, Ordering::SeqCst);
    }
}
