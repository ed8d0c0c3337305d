//! A single observable mutable value cell.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::observable::{ChangeCallback, ChangeNotifier, Observable};

/// Identity of an [`ObservableField`].
///
/// Two handles cloned from the same field compare equal; independently
/// created fields never do. Ids are drawn from a monotonic per-thread
/// counter at construction and never reused, so an id stays distinct
/// even from fields allocated after this one is dropped. Used by the
/// binding holder to enforce the at-most-one-two-way-binding-per-field
/// invariant.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FieldId(u64);

thread_local! {
    static NEXT_FIELD_ID: Cell<u64> = const { Cell::new(0) };
}

fn next_field_id() -> FieldId {
    NEXT_FIELD_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        FieldId(id)
    })
}

struct FieldInner<T> {
    id: FieldId,
    value: RefCell<T>,
    default: T,
    notifier: ChangeNotifier,
}

/// A shared, observable value cell.
///
/// `ObservableField<T>` is a cheaply clonable handle to one shared cell
/// (all clones observe and mutate the same value). Assigning a value
/// notifies subscribers iff it differs from the current one by equality.
/// The value the field was constructed with is kept as the immutable
/// *default*, used by inverse setters when a view produces no value.
///
/// ```
/// use tether_core::ObservableField;
///
/// let name = ObservableField::new(String::from("Andrew"));
/// assert_eq!(name.get(), "Andrew");
///
/// name.set(String::from("Mia"));
/// assert_eq!(name.get(), "Mia");
/// assert_eq!(*name.default_value(), "Andrew");
/// ```
pub struct ObservableField<T> {
    inner: Rc<FieldInner<T>>,
}

impl<T> Clone for ObservableField<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone> ObservableField<T> {
    /// Create a field holding `initial`; the same value becomes the
    /// immutable default.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            inner: Rc::new(FieldInner {
                id: next_field_id(),
                value: RefCell::new(initial.clone()),
                default: initial,
                notifier: ChangeNotifier::new(),
            }),
        }
    }

    /// Current value, cloned out of the cell.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }
}

impl<T> ObservableField<T> {
    /// Run `f` against the current value without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// The value captured at construction.
    #[must_use]
    pub fn default_value(&self) -> &T {
        &self.inner.default
    }

    /// Identity of the shared cell behind this handle.
    #[must_use]
    pub fn id(&self) -> FieldId {
        self.inner.id
    }

    /// Number of registered change callbacks. Test hook.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.inner.notifier.callback_count()
    }
}

impl<T: PartialEq> ObservableField<T> {
    /// Assign `value`, notifying subscribers iff it differs from the
    /// current value. Equal assignments are complete no-ops.
    pub fn set(&self, value: T) {
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return;
            }
            *current = value;
        }
        // Borrow released before notification so callbacks can read.
        self.inner.notifier.notify_change(None);
    }
}

impl<T: Clone + PartialEq> ObservableField<T> {
    /// Assign `value`, or the field's default when `value` is absent.
    ///
    /// This is the substitution rule inverse setters use when the view
    /// reports "no value".
    pub fn set_or_default(&self, value: Option<T>) {
        match value {
            Some(value) => self.set(value),
            None => self.set(self.inner.default.clone()),
        }
    }
}

impl<T> Observable for ObservableField<T> {
    fn add_callback(&self, callback: ChangeCallback) {
        self.inner.notifier.add_callback(callback);
    }

    fn remove_callback(&self, callback: &ChangeCallback) {
        self.inner.notifier.remove_callback(callback);
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ObservableField<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableField")
            .field("value", &*self.inner.value.borrow())
            .field("default", &self.inner.default)
            .finish()
    }
}
