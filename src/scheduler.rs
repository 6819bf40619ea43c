//! Step clock over a draw sequence.
//!
//! The scheduler is the pure half of the pacing machinery: it owns the live
//! sequence and the run/draw pointers, and advances exactly one draw per tick.
//! The timed drive loop lives in the controller, which re-checks the shared
//! state on every tick, so pause, resume and stop act as precise state checks
//! instead of flags read by stale, already-queued callbacks.

use crate::sequence::Sequence;

/// Outcome of a single clock tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Animate one draw. `index` is the draw's position in the variable pool,
    /// `draw` its position within the current run. `run_complete` marks the
    /// last draw of a run; exactly one completion fires per run.
    Draw {
        /// Index into the active variable pool.
        index: usize,
        /// Zero-based position of the draw within its run.
        draw: usize,
        /// Whether this draw finishes its run.
        run_complete: bool,
    },
    /// The clock fired while paused; nothing advanced.
    Held,
    /// The sequence is exhausted: end-of-animation fires on this tick, one
    /// period after the final draw.
    Done,
}

/// Cancellable stepper over one sequence.
///
/// Dropping the scheduler cancels the remainder of the sequence; that is how
/// `stop()` discards a live experiment.
#[derive(Debug)]
pub struct Scheduler {
    sequence: Sequence,
    run: usize,
    draw: usize,
}

impl Scheduler {
    /// Take ownership of a freshly generated sequence, pointers at the start.
    #[must_use]
    pub const fn new(sequence: Sequence) -> Self {
        Self {
            sequence,
            run: 0,
            draw: 0,
        }
    }

    /// Advance by one tick.
    ///
    /// While `paused` the clock keeps firing but nothing advances; resuming
    /// continues from the exact frozen run/draw pointer, so no draw is
    /// skipped or repeated.
    pub fn tick(&mut self, paused: bool) -> Tick {
        if paused {
            return Tick::Held;
        }
        let Some(current) = self.sequence.run(self.run) else {
            return Tick::Done;
        };
        let index = current.draws()[self.draw];
        let draw = self.draw;
        let run_complete = draw + 1 == current.len();
        if run_complete {
            self.run += 1;
            self.draw = 0;
        } else {
            self.draw += 1;
        }
        Tick::Draw {
            index,
            draw,
            run_complete,
        }
    }

    /// Current (run, draw) pointer.
    #[must_use]
    pub const fn position(&self) -> (usize, usize) {
        (self.run, self.draw)
    }

    /// The sequence being scheduled.
    #[must_use]
    pub const fn sequence(&self) -> &Sequence {
        &self.sequence
    }
}
