//! Rendering collaborator contract.
//!
//! The engine never draws anything itself; it tells the view what happened
//! and the view animates it. Every method is fire-and-forget: the controller
//! does not wait on animation completion, run-boundary bookkeeping is driven
//! by the scheduler.

/// Animation and rendering hooks invoked by the controller.
pub trait View: Send + Sync {
    /// Redraw the model from current configuration.
    fn render(&self);

    /// Animate one draw: `value` is the sampled label, `draw` its zero-based
    /// position within the current run.
    fn animate_select_next_variable(&self, value: &str, draw: usize);

    /// Start the tumbling-mixer animation (mixer and collector devices).
    fn animate_mixer(&self);

    /// Freeze or unfreeze in-flight animation.
    fn pause(&self, paused: bool);

    /// Tear down in-flight animation at the end of an experiment or on stop.
    fn end_animation(&self);

    /// Clear all transient visuals back to the idle model.
    fn reset(&self);
}

/// A view that ignores every signal. Useful headless and in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullView;

impl View for NullView {
    fn render(&self) {}
    fn animate_select_next_variable(&self, _value: &str, _draw: usize) {}
    fn animate_mixer(&self) {}
    fn pause(&self, _paused: bool) {}
    fn end_animation(&self) {}
    fn reset(&self) {}
}
