//! Two-way bindings: view model ↔ view with feedback-loop suppression.
//!
//! A two-way binding wraps an existing [`OneWayBinding`] (the forward
//! leg) and adds a [`ViewRegister`] subscription plus a list of inverse
//! setters (the reverse leg). At construction the one-way registration
//! is swapped for a two-way registration, and at most one two-way
//! binding may observe a given field or property key; a second
//! registration is a programming error and panics at the call site that
//! introduced it.
//!
//! # Cycle prevention
//!
//! The forward apply callback mutates the widget only when the new value
//! differs from what the widget shows. A user edit pushed into the field
//! therefore re-notifies forward into a value the widget already
//! displays, and the round trip stops there. No re-entrancy flag is
//! involved; the idempotent-apply contract carries the whole invariant.
//!
//! # States
//!
//! *unattached* → `bind` → *attached* (view-subscribed, field-subscribed)
//! → `unbind` → *torn down*. `unbind` twice is a no-op.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tether_core::{FieldId, PropertyKey, ViewModel};

use crate::binding::{AnyBinding, Binding};
use crate::convert::Slot;
use crate::holder::HolderCore;
use crate::one_way::{OneWayBinding, OneWayCore};
use crate::view::{UserChangeCallback, ViewRegister};

/// Identity a two-way binding is registered under: the observed field
/// instance, or the observed property key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) enum TwoWayKey {
    Field(FieldId),
    Property(PropertyKey),
}

/// An inverse setter: receives the current view model and the raw value
/// the view produced, and pushes it into the model.
pub type InverseSetter<V, Output> = Rc<dyn Fn(Option<&V>, Option<Output>)>;

impl<V, Input, Output, W> OneWayBinding<V, Input, Output, W>
where
    V: ViewModel + 'static,
    Input: Clone + 'static,
    Output: Clone + 'static,
    W: 'static,
{
    /// Promote this binding to the forward leg of a two-way binding.
    ///
    /// `register` supplies the view-side subscription used to observe
    /// user-driven changes.
    pub fn two_way(
        self,
        register: impl ViewRegister<W, Output> + 'static,
    ) -> TwoWayExpr<V, Input, Output, W> {
        TwoWayExpr {
            one_way: self,
            register: Box::new(register),
        }
    }
}

/// A forward leg plus a view register, waiting for its inverse setter.
pub struct TwoWayExpr<V, Input, Output, W> {
    one_way: OneWayBinding<V, Input, Output, W>,
    register: Box<dyn ViewRegister<W, Output>>,
}

impl<V, Input, Output, W> TwoWayExpr<V, Input, Output, W>
where
    V: ViewModel + 'static,
    Input: Clone + 'static,
    Output: Clone + 'static,
    W: 'static,
{
    /// Complete the binding with an explicit inverse setter.
    ///
    /// # Panics
    ///
    /// Panics if another two-way binding already observes the same field
    /// or property key, if the converter is key-less (a generic two-way
    /// binding cannot be routed), or if the converter is field-backed
    /// and no view model is set (the observed field cannot be resolved).
    pub fn to_setter(
        self,
        inverse: impl Fn(Option<&V>, Option<Output>) + 'static,
    ) -> TwoWayBinding<V, Input, Output, W> {
        let one_way_core = Rc::clone(&self.one_way.core);
        let holder = one_way_core.holder.clone();
        let key = two_way_key(&one_way_core);

        let core = Rc::new_cyclic(|weak| TwoWayCore {
            one_way: one_way_core,
            register: self.register,
            inverse_setters: RefCell::new(vec![Rc::new(inverse) as InverseSetter<V, Output>]),
            key,
            holder: holder.clone(),
            view_subscribed: Cell::new(false),
            weak_self: weak.clone(),
        });

        if let Some(holder) = holder.upgrade() {
            // A binding cannot be both an independent one-way entry and
            // the forward leg of a two-way binding.
            let forward: Rc<dyn AnyBinding> = core.one_way.clone();
            holder.unregister_one_way(core.one_way.converter.slot(), &forward);
            holder.register_two_way(key, core.clone());
        }
        TwoWayBinding { core }
    }
}

impl<V, Input, W> TwoWayExpr<V, Input, Input, W>
where
    V: ViewModel + 'static,
    Input: Clone + PartialEq + 'static,
    W: 'static,
{
    /// Complete the binding with the default inverse setter: write the
    /// view's value straight into the originating observable field,
    /// substituting the field's default when the value is absent.
    ///
    /// # Panics
    ///
    /// Panics if the forward leg is not field-backed, plus the cases
    /// listed on [`to_setter`](Self::to_setter).
    pub fn to_field(self) -> TwoWayBinding<V, Input, Input, W> {
        assert!(
            matches!(self.one_way.core.converter.slot(), Slot::Field),
            "to_field requires an observable-field source; use to_setter for expression-backed bindings"
        );
        let converter_core = Rc::clone(&self.one_way.core);
        self.to_setter(move |vm, value| {
            if let Some(vm) = vm {
                if let Some(field) = converter_core.converter.field_for(vm) {
                    field.set_or_default(value);
                }
            }
        })
    }
}

fn two_way_key<V, Input, Output, W>(core: &Rc<OneWayCore<V, Input, Output, W>>) -> TwoWayKey
where
    V: ViewModel + 'static,
    Input: Clone + 'static,
    Output: 'static,
    W: 'static,
{
    match core.converter.slot() {
        Slot::Keyed(key) => TwoWayKey::Property(key),
        Slot::Generic => {
            panic!("cannot register a generic two-way binding; bind with a property key")
        }
        Slot::Field => {
            let field = core.holder.upgrade().and_then(|holder| {
                holder.with_view_model(|vm| vm.and_then(|vm| core.converter.field_for(vm)))
            });
            match field {
                Some(field) => TwoWayKey::Field(field.id()),
                None => panic!(
                    "cannot register a two-way field binding without a view model; set the view model first"
                ),
            }
        }
    }
}

pub(crate) struct TwoWayCore<V, Input, Output, W> {
    one_way: Rc<OneWayCore<V, Input, Output, W>>,
    register: Box<dyn ViewRegister<W, Output>>,
    inverse_setters: RefCell<Vec<InverseSetter<V, Output>>>,
    key: TwoWayKey,
    holder: Weak<HolderCore<V>>,
    view_subscribed: Cell<bool>,
    weak_self: Weak<TwoWayCore<V, Input, Output, W>>,
}

impl<V, Input, Output, W> TwoWayCore<V, Input, Output, W>
where
    V: ViewModel + 'static,
    Input: Clone + 'static,
    Output: Clone + 'static,
    W: 'static,
{
    /// Run every inverse setter with the value the view produced.
    fn notify_view_changed(&self, value: Option<Output>) {
        let setters: Vec<_> = self.inverse_setters.borrow().clone();
        match self.holder.upgrade() {
            Some(holder) => holder.with_view_model(|vm| {
                for setter in &setters {
                    setter(vm, value.clone());
                }
            }),
            None => {
                for setter in &setters {
                    setter(None, value.clone());
                }
            }
        }
    }
}

impl<V, Input, Output, W> AnyBinding for TwoWayCore<V, Input, Output, W>
where
    V: ViewModel + 'static,
    Input: Clone + 'static,
    Output: Clone + 'static,
    W: 'static,
{
    fn bind(&self) {
        AnyBinding::bind(&*self.one_way);
        let weak = self.weak_self.clone();
        let on_change: UserChangeCallback<Output> = Rc::new(move |value| {
            if let Some(core) = weak.upgrade() {
                core.notify_view_changed(value);
            }
        });
        self.register.register(&self.one_way.view, on_change);
        self.view_subscribed.set(true);
        // Re-apply so the view-model value wins over any pre-existing
        // widget content at bind time.
        AnyBinding::notify_value_change(&*self.one_way);
    }

    fn teardown(&self) {
        AnyBinding::teardown(&*self.one_way);
        if self.view_subscribed.replace(false) {
            self.register.deregister(&self.one_way.view);
        }
    }

    fn notify_value_change(&self) {
        AnyBinding::notify_value_change(&*self.one_way);
    }
}

/// A registered view-model ↔ view binding.
pub struct TwoWayBinding<V, Input, Output, W> {
    core: Rc<TwoWayCore<V, Input, Output, W>>,
}

impl<V, Input, Output, W> Clone for TwoWayBinding<V, Input, Output, W> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<V, Input, Output, W> TwoWayBinding<V, Input, Output, W>
where
    V: ViewModel + 'static,
    Input: Clone + 'static,
    Output: Clone + 'static,
    W: 'static,
{
    /// Append another inverse setter. All registered setters run, in
    /// order, for every user-driven view change.
    #[must_use]
    pub fn on_expression(self, inverse: impl Fn(Option<&V>, Option<Output>) + 'static) -> Self {
        self.core
            .inverse_setters
            .borrow_mut()
            .push(Rc::new(inverse));
        self
    }

    /// Manually push the forward leg's current value through the inverse
    /// setters, without waiting for a user event. Used to prime state.
    pub fn notify_view_changed(&self) {
        let value = self.core.one_way.evaluate();
        self.core.notify_view_changed(value);
    }
}

impl<V, Input, Output, W> Binding for TwoWayBinding<V, Input, Output, W>
where
    V: ViewModel + 'static,
    Input: Clone + 'static,
    Output: Clone + 'static,
    W: 'static,
{
    fn bind(&self) {
        AnyBinding::bind(&*self.core);
    }

    fn unbind(&self) {
        AnyBinding::teardown(&*self.core);
        if let Some(holder) = self.core.holder.upgrade() {
            let binding: Rc<dyn AnyBinding> = self.core.clone();
            holder.unregister_two_way(self.core.key, &binding);
        }
    }

    fn notify_value_change(&self) {
        AnyBinding::notify_value_change(&*self.core);
    }
}
