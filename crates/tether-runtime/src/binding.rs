//! The binding state machine contract.

/// Operations shared by every binding kind.
///
/// State machine: *unbound* → [`bind`](Self::bind) → *bound* →
/// [`unbind`](Self::unbind) → *unbound*. `unbind` is unconditionally
/// safe: calling it twice, or without ever binding, is a no-op.
pub trait Binding {
    /// Evaluate immediately, apply to the view target, then subscribe to
    /// the underlying change source.
    fn bind(&self);

    /// Tear down subscriptions and remove this binding from its holder.
    fn unbind(&self);

    /// Re-evaluate and re-apply to the view target. This is the sole
    /// application point, used both by direct field notification and by
    /// holder-driven property routing.
    fn notify_value_change(&self);
}

/// Object-safe internal face of a binding, as stored in the holder's
/// kind-indexed collections. `teardown` releases subscriptions without
/// touching the holder's indexes (the holder clears those itself during
/// bulk operations).
pub(crate) trait AnyBinding {
    fn bind(&self);
    fn teardown(&self);
    fn notify_value_change(&self);
}
