//! The change-notification capability and its reusable implementation.
//!
//! [`Observable`] is a capability, not an entity: anything that can hand
//! out and revoke change callbacks implements it. [`ChangeNotifier`] is
//! the implementation view models and fields embed and delegate to; the
//! backing [`CallbackRegistry`] is created lazily on the first
//! subscription so objects that are never observed pay nothing.

use std::cell::OnceCell;
use std::rc::Rc;

use crate::callback_registry::CallbackRegistry;
use crate::key::PropertyKey;

/// A change callback: invoked with the key of the changed property, or
/// `None` when the sender is self-identifying (a field) or the whole
/// object changed.
///
/// Callbacks are shared handles; removal is by identity, so keep a clone
/// of the `Rc` you registered.
pub type ChangeCallback = Rc<dyn Fn(Option<PropertyKey>)>;

/// Capability to register and revoke change callbacks.
pub trait Observable {
    /// Start listening for changes.
    fn add_callback(&self, callback: ChangeCallback);

    /// Stop listening. Removing a callback that was never added (or was
    /// already removed) is a no-op.
    fn remove_callback(&self, callback: &ChangeCallback);
}

/// Embeddable change-callback registry.
///
/// A view model that wants holder-level property routing embeds a
/// `ChangeNotifier`, reports it through
/// [`ViewModel::change_notifier`](crate::ViewModel::change_notifier), and
/// calls [`notify_change`](Self::notify_change) from its property setters:
///
/// ```
/// use tether_core::{ChangeNotifier, PropertyKey};
///
/// const NAME: PropertyKey = PropertyKey::new("name");
///
/// struct Person {
///     name: String,
///     changes: ChangeNotifier,
/// }
///
/// impl Person {
///     fn set_name(&mut self, name: String) {
///         if self.name != name {
///             self.name = name;
///             self.changes.notify_change(Some(NAME));
///         }
///     }
/// }
/// ```
#[derive(Default)]
pub struct ChangeNotifier {
    callbacks: OnceCell<CallbackRegistry<dyn Fn(Option<PropertyKey>)>>,
}

impl ChangeNotifier {
    /// Create a notifier with no registry allocated yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notify every registered callback that `key` changed (`None` means
    /// "revalidate everything").
    pub fn notify_change(&self, key: Option<PropertyKey>) {
        if let Some(callbacks) = self.callbacks.get() {
            #[cfg(feature = "tracing")]
            tracing::trace!(?key, listeners = callbacks.len(), "notify_change");
            callbacks.notify_all(|callback| callback(key));
        }
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.callbacks.get().map_or(0, CallbackRegistry::len)
    }
}

impl Observable for ChangeNotifier {
    fn add_callback(&self, callback: ChangeCallback) {
        self.callbacks
            .get_or_init(CallbackRegistry::new)
            .add(callback);
    }

    fn remove_callback(&self, callback: &ChangeCallback) {
        if let Some(callbacks) = self.callbacks.get() {
            callbacks.remove(callback);
        }
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("callbacks", &self.callback_count())
            .finish()
    }
}
