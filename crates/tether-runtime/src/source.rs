//! One-way-to-source bindings: view → view model, no reverse leg.
//!
//! Built from the view side: `holder.bind_view(view, register)` starts a
//! [`ViewSource`], `on`/`on_self` adds the transform from the view's raw
//! output to the model-facing input, and `to`/`to_field` attaches the
//! property setter and registers the binding. Every user-driven change
//! event computes `setter(view_model, transform(raw), view)`; binding
//! also primes once from the view's current value.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use tether_core::{ObservableField, ViewModel};

use crate::binding::{AnyBinding, Binding};
use crate::holder::HolderCore;
use crate::view::{UserChangeCallback, ViewRegister};

/// A view handle plus its register, waiting for a transform.
pub struct ViewSource<V, W, Output> {
    pub(crate) view: W,
    pub(crate) register: Box<dyn ViewRegister<W, Output>>,
    pub(crate) holder: Weak<HolderCore<V>>,
}

impl<V: 'static, W: 'static, Output: 'static> ViewSource<V, W, Output> {
    /// Transform the view's output, propagating absence.
    pub fn on<Input>(
        self,
        expression: impl Fn(Output) -> Input + 'static,
    ) -> SourceExpr<V, Input, Output, W> {
        SourceExpr {
            view: self.view,
            register: self.register,
            transform: Box::new(move |output| output.map(&expression)),
            holder: self.holder,
        }
    }

    /// Pass the view's output through unchanged.
    pub fn on_self(self) -> SourceExpr<V, Output, Output, W> {
        SourceExpr {
            view: self.view,
            register: self.register,
            transform: Box::new(|output| output),
            holder: self.holder,
        }
    }
}

/// View source plus transform, waiting for the property setter.
pub struct SourceExpr<V, Input, Output, W> {
    view: W,
    register: Box<dyn ViewRegister<W, Output>>,
    transform: Box<dyn Fn(Option<Output>) -> Option<Input>>,
    holder: Weak<HolderCore<V>>,
}

impl<V, Input, Output, W> SourceExpr<V, Input, Output, W>
where
    V: ViewModel + 'static,
    Input: 'static,
    Output: 'static,
    W: 'static,
{
    /// Attach the setter that pushes transformed view output into the
    /// view model, and register the binding with the holder.
    pub fn to(
        self,
        setter: impl Fn(Option<&V>, Option<Input>, &W) + 'static,
    ) -> OneWayToSource<V, Input, Output, W> {
        let core = Rc::new_cyclic(|weak| SourceCore {
            view: self.view,
            register: self.register,
            transform: self.transform,
            setter: Box::new(setter),
            holder: self.holder,
            view_subscribed: Cell::new(false),
            weak_self: weak.clone(),
        });
        if let Some(holder) = core.holder.upgrade() {
            holder.register_source(core.clone());
        }
        OneWayToSource { core }
    }
}

impl<V, Input, Output, W> SourceExpr<V, Input, Output, W>
where
    V: ViewModel + 'static,
    Input: Clone + PartialEq + 'static,
    Output: 'static,
    W: 'static,
{
    /// Write transformed view output into an observable field selected
    /// from the view model, substituting the field's default when the
    /// view produced no value.
    pub fn to_field(
        self,
        select: impl Fn(&V) -> ObservableField<Input> + 'static,
    ) -> OneWayToSource<V, Input, Output, W> {
        self.to(move |vm, input, _view| {
            if let Some(vm) = vm {
                select(vm).set_or_default(input);
            }
        })
    }
}

pub(crate) struct SourceCore<V, Input, Output, W> {
    view: W,
    register: Box<dyn ViewRegister<W, Output>>,
    transform: Box<dyn Fn(Option<Output>) -> Option<Input>>,
    setter: Box<dyn Fn(Option<&V>, Option<Input>, &W)>,
    holder: Weak<HolderCore<V>>,
    view_subscribed: Cell<bool>,
    weak_self: Weak<SourceCore<V, Input, Output, W>>,
}

impl<V, Input, Output, W> SourceCore<V, Input, Output, W>
where
    V: ViewModel + 'static,
    Input: 'static,
    Output: 'static,
    W: 'static,
{
    fn push(&self, value: Option<Output>) {
        let input = (self.transform)(value);
        match self.holder.upgrade() {
            Some(holder) => {
                holder.with_view_model(|vm| (self.setter)(vm, input, &self.view));
            }
            None => (self.setter)(None, input, &self.view),
        }
    }
}

impl<V, Input, Output, W> AnyBinding for SourceCore<V, Input, Output, W>
where
    V: ViewModel + 'static,
    Input: 'static,
    Output: 'static,
    W: 'static,
{
    fn bind(&self) {
        let weak = self.weak_self.clone();
        let on_change: UserChangeCallback<Output> = Rc::new(move |value| {
            if let Some(core) = weak.upgrade() {
                core.push(value);
            }
        });
        self.register.register(&self.view, on_change);
        self.view_subscribed.set(true);
        // Prime from whatever the view currently shows.
        AnyBinding::notify_value_change(self);
    }

    fn teardown(&self) {
        if self.view_subscribed.replace(false) {
            self.register.deregister(&self.view);
        }
    }

    fn notify_value_change(&self) {
        self.push(Some(self.register.value(&self.view)));
    }
}

/// A registered view → view-model binding.
pub struct OneWayToSource<V, Input, Output, W> {
    core: Rc<SourceCore<V, Input, Output, W>>,
}

impl<V, Input, Output, W> Clone for OneWayToSource<V, Input, Output, W> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<V, Input, Output, W> OneWayToSource<V, Input, Output, W> {
    /// The view handle this binding reads from.
    #[must_use]
    pub fn view(&self) -> &W {
        &self.core.view
    }
}

impl<V, Input, Output, W> Binding for OneWayToSource<V, Input, Output, W>
where
    V: ViewModel + 'static,
    Input: 'static,
    Output: 'static,
    W: 'static,
{
    fn bind(&self) {
        AnyBinding::bind(&*self.core);
    }

    fn unbind(&self) {
        AnyBinding::teardown(&*self.core);
        if let Some(holder) = self.core.holder.upgrade() {
            let binding: Rc<dyn AnyBinding> = self.core.clone();
            holder.unregister_source(&binding);
        }
    }

    fn notify_value_change(&self) {
        AnyBinding::notify_value_change(&*self.core);
    }
}
