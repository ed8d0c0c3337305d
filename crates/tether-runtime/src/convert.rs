//! Value extraction from a view model or an observable field.
//!
//! A converter is the first stage of every binding expression: it pulls a
//! typed `Input` out of the current view model (or a field selected from
//! it). An absent view model is never an error here; it short-circuits
//! to "no value", which flows through the transform chain as `None`.

use std::cell::RefCell;
use std::rc::Rc;

use tether_core::{ChangeCallback, Observable, ObservableField, PropertyKey};

/// Where the holder should index a binding built on a converter.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Slot {
    /// Observable-field-backed: the converter subscribes itself; the
    /// holder keeps these in the observable bucket.
    Field,
    /// Property-keyed expression: driven by holder routing for that key.
    Keyed(PropertyKey),
    /// Key-less expression: revalidated only when no specific key is
    /// given.
    Generic,
}

/// A live subscription of a field-backed converter.
///
/// The exact field selected at bind time is recorded so teardown after a
/// view-model swap removes the callback from the *old* field, not the
/// field the new view model would select.
struct FieldSubscription<Input> {
    field: ObservableField<Input>,
    callback: ChangeCallback,
}

/// How to pull an `Input` out of the current view model.
pub(crate) enum Converter<V, Input> {
    /// Selects an [`ObservableField`] and reads its value; subscribes
    /// directly to the field while bound.
    Field {
        select: Rc<dyn Fn(&V) -> ObservableField<Input>>,
        subscription: RefCell<Option<FieldSubscription<Input>>>,
    },
    /// Evaluates an expression against the view model; no subscription
    /// of its own, driven entirely by holder routing.
    Expression {
        select: Rc<dyn Fn(&V) -> Input>,
        key: Option<PropertyKey>,
    },
    /// Like `Expression`, but tolerates an absent view model and decides
    /// the result itself.
    Nullable {
        select: Rc<dyn Fn(Option<&V>) -> Input>,
        key: Option<PropertyKey>,
    },
}

impl<V, Input> Converter<V, Input> {
    pub(crate) fn field(select: impl Fn(&V) -> ObservableField<Input> + 'static) -> Self {
        Self::Field {
            select: Rc::new(select),
            subscription: RefCell::new(None),
        }
    }

    pub(crate) fn expression(
        key: Option<PropertyKey>,
        select: impl Fn(&V) -> Input + 'static,
    ) -> Self {
        Self::Expression {
            select: Rc::new(select),
            key,
        }
    }

    pub(crate) fn nullable(
        key: Option<PropertyKey>,
        select: impl Fn(Option<&V>) -> Input + 'static,
    ) -> Self {
        Self::Nullable {
            select: Rc::new(select),
            key,
        }
    }

    pub(crate) fn slot(&self) -> Slot {
        match self {
            Self::Field { .. } => Slot::Field,
            Self::Expression { key, .. } | Self::Nullable { key, .. } => {
                key.map_or(Slot::Generic, Slot::Keyed)
            }
        }
    }

    /// The observable field this converter selects, if it is
    /// field-backed and a view model is present.
    pub(crate) fn field_for(&self, view_model: &V) -> Option<ObservableField<Input>> {
        match self {
            Self::Field { select, .. } => Some(select(view_model)),
            _ => None,
        }
    }

    /// Extract the current value. Absent view model yields `None` for
    /// field and expression converters; nullable converters decide for
    /// themselves.
    pub(crate) fn convert(&self, view_model: Option<&V>) -> Option<Input>
    where
        Input: Clone,
    {
        match self {
            Self::Field { select, .. } => view_model.map(|vm| select(vm).get()),
            Self::Expression { select, .. } => view_model.map(|vm| select(vm)),
            Self::Nullable { select, .. } => Some(select(view_model)),
        }
    }

    /// Subscribe `callback` to the selected field (field-backed only).
    /// Rebinding replaces any previous subscription.
    pub(crate) fn bind(&self, callback: ChangeCallback, view_model: Option<&V>) {
        if let Self::Field {
            select,
            subscription,
        } = self
        {
            self.unbind();
            if let Some(vm) = view_model {
                let field = select(vm);
                field.add_callback(Rc::clone(&callback));
                *subscription.borrow_mut() = Some(FieldSubscription { field, callback });
            }
        }
    }

    /// Drop the field subscription, if one exists. Safe to call when
    /// never bound.
    pub(crate) fn unbind(&self) {
        if let Self::Field { subscription, .. } = self {
            if let Some(sub) = subscription.borrow_mut().take() {
                sub.field.remove_callback(&sub.callback);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Vm {
        name: ObservableField<String>,
        count: i32,
    }

    #[test]
    fn field_converter_reads_through_selector() {
        let vm = Vm {
            name: ObservableField::new(String::from("a")),
            count: 0,
        };
        let converter: Converter<Vm, String> = Converter::field(|vm: &Vm| vm.name.clone());
        assert_eq!(converter.convert(Some(&vm)), Some(String::from("a")));
        assert_eq!(converter.convert(None), None);
        assert_eq!(converter.slot(), Slot::Field);
    }

    #[test]
    fn expression_converter_short_circuits_absent_vm() {
        let key = PropertyKey::new("count");
        let converter: Converter<Vm, i32> = Converter::expression(Some(key), |vm: &Vm| vm.count);
        let vm = Vm {
            name: ObservableField::new(String::new()),
            count: 7,
        };
        assert_eq!(converter.convert(Some(&vm)), Some(7));
        assert_eq!(converter.convert(None), None);
        assert_eq!(converter.slot(), Slot::Keyed(key));
    }

    #[test]
    fn nullable_converter_sees_absent_vm() {
        let converter: Converter<Vm, bool> =
            Converter::nullable(None, |vm: Option<&Vm>| vm.is_some());
        assert_eq!(converter.convert(None), Some(false));
        assert_eq!(converter.slot(), Slot::Generic);
    }

    #[test]
    fn bind_subscribes_and_unbind_releases() {
        let vm = Vm {
            name: ObservableField::new(String::from("x")),
            count: 0,
        };
        let converter: Converter<Vm, String> = Converter::field(|vm: &Vm| vm.name.clone());
        let fired = Rc::new(Cell::new(0));
        let callback: ChangeCallback = {
            let fired = Rc::clone(&fired);
            Rc::new(move |_| fired.set(fired.get() + 1))
        };

        converter.bind(callback, Some(&vm));
        assert_eq!(vm.name.callback_count(), 1);
        vm.name.set(String::from("y"));
        assert_eq!(fired.get(), 1);

        converter.unbind();
        assert_eq!(vm.name.callback_count(), 0);
        vm.name.set(String::from("z"));
        assert_eq!(fired.get(), 1);

        // Idempotent.
        converter.unbind();
    }

    #[test]
    fn unbind_releases_the_field_bound_at_bind_time() {
        let old = Vm {
            name: ObservableField::new(String::from("old")),
            count: 0,
        };
        let new = Vm {
            name: ObservableField::new(String::from("new")),
            count: 0,
        };
        let converter: Converter<Vm, String> = Converter::field(|vm: &Vm| vm.name.clone());
        converter.bind(Rc::new(|_| {}), Some(&old));
        assert_eq!(old.name.callback_count(), 1);

        // Swap happened; teardown must still release the old field.
        converter.unbind();
        assert_eq!(old.name.callback_count(), 0);
        assert_eq!(new.name.callback_count(), 0);
    }
}
