//! The collaborator contract for concrete widgets, and the owner-thread
//! scheduler capability.
//!
//! The binding engine never touches a widget directly. Two-way and
//! one-way-to-source bindings talk to the widget layer exclusively
//! through [`ViewRegister`]: read the widget's current value, subscribe
//! to user-driven changes, unsubscribe. Concrete registers (text fields,
//! toggles, pickers) live in the widget layer; `tether-harness` ships
//! fake ones for tests.

use std::rc::Rc;

/// Callback a view register invokes when the user changes the widget.
///
/// `None` means the widget currently has no value to report.
pub type UserChangeCallback<Output> = Rc<dyn Fn(Option<Output>)>;

/// Per-widget-kind adapter for two-way and one-way-to-source bindings.
///
/// Implementations convert the widget's native change event into
/// `Output` and expose the widget's already-visible value through
/// [`value`](Self::value) (used to seed inverse state before any user
/// edit).
///
/// # Contract
///
/// - `register` replaces any previously registered callback for `view`.
/// - `deregister` must tolerate a view that was never registered.
/// - The forward apply path is expected to be idempotent: applying a
///   value equal to what the widget already shows must not re-fire the
///   widget's own change event.
pub trait ViewRegister<View, Output> {
    /// Subscribe `on_user_change` to user-driven changes of `view`.
    fn register(&self, view: &View, on_user_change: UserChangeCallback<Output>);

    /// Remove the subscription installed by [`register`](Self::register).
    fn deregister(&self, view: &View);

    /// The widget's currently displayed value.
    fn value(&self, view: &View) -> Output;
}

/// Capability to run a closure on the holder's owner thread.
///
/// All value application to view targets happens through the holder's
/// scheduler. The default, [`Scheduler::immediate`], invokes the task
/// synchronously: a field mutation's view update completes before the
/// setter returns. An embedder whose observables can be mutated from
/// worker threads injects a scheduler that marshals onto its UI event
/// loop instead; the handoff is explicit, never a hidden global.
#[derive(Clone)]
pub struct Scheduler {
    run: Rc<dyn Fn(Box<dyn FnOnce()>)>,
}

impl Scheduler {
    /// Wrap an embedder-provided "run on the owner thread" function.
    pub fn new(run: impl Fn(Box<dyn FnOnce()>) + 'static) -> Self {
        Self { run: Rc::new(run) }
    }

    /// Synchronous scheduler: tasks run inline on the calling thread.
    #[must_use]
    pub fn immediate() -> Self {
        Self::new(|task| task())
    }

    /// Hand `task` to the owner thread.
    pub fn schedule(&self, task: impl FnOnce() + 'static) {
        (self.run)(Box::new(task));
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::immediate()
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler").finish_non_exhaustive()
    }
}
