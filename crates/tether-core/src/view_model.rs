//! The seam between a view model and the binding holder.

use crate::observable::ChangeNotifier;

/// Implemented by any type a binding holder can own.
///
/// A view model that publishes property changes embeds a
/// [`ChangeNotifier`] and returns it here; the holder subscribes a single
/// dispatcher callback to it for the duration of a binding session. The
/// default implementation reports no notifier, which is valid: bindings
/// on such a view model are only re-evaluated by an explicit
/// `notify_changes()` pass or by directly-observed fields.
pub trait ViewModel {
    /// The notifier driving holder-level property routing, if any.
    fn change_notifier(&self) -> Option<&ChangeNotifier> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;
    impl ViewModel for Silent {}

    struct Chatty {
        changes: ChangeNotifier,
    }
    impl ViewModel for Chatty {
        fn change_notifier(&self) -> Option<&ChangeNotifier> {
            Some(&self.changes)
        }
    }

    #[test]
    fn default_is_unobservable() {
        assert!(Silent.change_notifier().is_none());
    }

    #[test]
    fn override_exposes_notifier() {
        let vm = Chatty {
            changes: ChangeNotifier::new(),
        };
        assert!(vm.change_notifier().is_some());
    }
}
