//! One-way bindings: view model → view.
//!
//! A binding expression is assembled in three steps:
//!
//! 1. a *source* ([`BindSource`], from one of the holder's `bind_*`
//!    methods) wrapping a converter;
//! 2. a *transform* ([`OneWayExpr`], from `on`/`on_self`/`on_or`/…)
//!    mapping the converted `Input` to the view-facing `Output`;
//! 3. a *target* (`to_view`) attaching the view handle and the apply
//!    callback, which registers the finished [`OneWayBinding`] with the
//!    holder.
//!
//! Transforms are null-safe over absent input: with `on`, an absent
//! `Input` yields an absent `Output`; `on_or` supplies an explicit
//! fallback instead.
//!
//! # Apply-if-different
//!
//! The apply callback handed to `to_view` must compare old vs. new
//! before mutating the widget. This is what keeps a two-way binding from
//! re-toggling the widget a user edit originated from; see the harness
//! widgets' `set_*_if_changed` methods for the reference shape.

use std::rc::{Rc, Weak};

use tether_core::{ChangeCallback, ObservableField, PropertyKey, ViewModel};

use crate::binding::{AnyBinding, Binding};
use crate::convert::Converter;
use crate::holder::HolderCore;

/// First stage of a binding expression: a converter plus the holder it
/// will register with.
pub struct BindSource<V, Input> {
    pub(crate) converter: Converter<V, Input>,
    pub(crate) holder: Weak<HolderCore<V>>,
}

impl<V: 'static, Input: 'static> BindSource<V, Input> {
    /// Transform the input, propagating absence (`None` in → `None` out).
    pub fn on<Output>(
        self,
        expression: impl Fn(Input) -> Output + 'static,
    ) -> OneWayExpr<V, Input, Output> {
        self.on_nullable(move |input| input.map(&expression))
    }

    /// Transform the input with an explicit fallback for absent input.
    pub fn on_or<Output>(
        self,
        expression: impl Fn(Input) -> Output + 'static,
        fallback: impl Fn() -> Option<Output> + 'static,
    ) -> OneWayExpr<V, Input, Output> {
        self.on_nullable(move |input| match input {
            Some(input) => Some(expression(input)),
            None => fallback(),
        })
    }

    /// Transform that receives the possibly-absent input directly.
    pub fn on_nullable<Output>(
        self,
        expression: impl Fn(Option<Input>) -> Option<Output> + 'static,
    ) -> OneWayExpr<V, Input, Output> {
        OneWayExpr {
            converter: self.converter,
            transform: Box::new(expression),
            holder: self.holder,
        }
    }

    /// Pass the input through unchanged.
    pub fn on_self(self) -> OneWayExpr<V, Input, Input> {
        self.on_nullable(|input| input)
    }

    /// `true` when the input is present.
    pub fn is_some(self) -> OneWayExpr<V, Input, bool> {
        self.on_nullable(|input| Some(input.is_some()))
    }

    /// `true` when the input is absent.
    pub fn is_none(self) -> OneWayExpr<V, Input, bool> {
        self.on_nullable(|input| Some(input.is_none()))
    }
}

impl<V: 'static> BindSource<V, bool> {
    /// Flip a boolean input; absence stays absent.
    pub fn inverted(self) -> OneWayExpr<V, bool, bool> {
        self.on(|value| !value)
    }
}

impl<V: 'static> BindSource<V, String> {
    /// `true` when the input is present and non-empty.
    pub fn has_text(self) -> OneWayExpr<V, String, bool> {
        self.on_nullable(|input| Some(input.is_some_and(|text| !text.is_empty())))
    }

    /// `true` when the input is absent or empty.
    pub fn is_empty_or_none(self) -> OneWayExpr<V, String, bool> {
        self.on_nullable(|input| Some(input.is_none_or(|text| text.is_empty())))
    }
}

/// Converter plus transform, waiting for a view target.
pub struct OneWayExpr<V, Input, Output> {
    pub(crate) converter: Converter<V, Input>,
    pub(crate) transform: Box<dyn Fn(Option<Input>) -> Option<Output>>,
    pub(crate) holder: Weak<HolderCore<V>>,
}

impl<V: 'static, Input: 'static, Output: 'static> OneWayExpr<V, Input, Output> {
    /// Chain a further transform, propagating absence (`None` in →
    /// `None` out) like [`BindSource::on`].
    pub fn on<Next>(
        self,
        expression: impl Fn(Output) -> Next + 'static,
    ) -> OneWayExpr<V, Input, Next> {
        let previous = self.transform;
        OneWayExpr {
            converter: self.converter,
            transform: Box::new(move |input| previous(input).map(&expression)),
            holder: self.holder,
        }
    }
}

impl<V, Input, Output> OneWayExpr<V, Input, Output>
where
    V: ViewModel + 'static,
    Input: Clone + 'static,
    Output: 'static,
{
    /// Attach the view target and register the binding with the holder.
    ///
    /// `apply` must be idempotent: a no-op when the value it receives
    /// equals what the widget already shows.
    pub fn to_view<W: 'static>(
        self,
        view: W,
        apply: impl Fn(&W, Option<Output>) + 'static,
    ) -> OneWayBinding<V, Input, Output, W> {
        let core = Rc::new_cyclic(|weak| OneWayCore {
            converter: self.converter,
            transform: self.transform,
            view,
            apply: Box::new(apply),
            holder: self.holder,
            weak_self: weak.clone(),
        });
        if let Some(holder) = core.holder.upgrade() {
            holder.register_one_way(core.converter.slot(), core.clone());
        }
        OneWayBinding { core }
    }
}

pub(crate) struct OneWayCore<V, Input, Output, W> {
    pub(crate) converter: Converter<V, Input>,
    pub(crate) transform: Box<dyn Fn(Option<Input>) -> Option<Output>>,
    pub(crate) view: W,
    pub(crate) apply: Box<dyn Fn(&W, Option<Output>)>,
    pub(crate) holder: Weak<HolderCore<V>>,
    pub(crate) weak_self: Weak<OneWayCore<V, Input, Output, W>>,
}

impl<V, Input, Output, W> OneWayCore<V, Input, Output, W>
where
    V: ViewModel + 'static,
    Input: Clone + 'static,
    Output: 'static,
    W: 'static,
{
    /// `transform(converter.convert(current view model))`.
    pub(crate) fn evaluate(&self) -> Option<Output> {
        let input = match self.holder.upgrade() {
            Some(holder) => holder.with_view_model(|vm| self.converter.convert(vm)),
            None => None,
        };
        (self.transform)(input)
    }

    fn apply_now(&self) {
        (self.apply)(&self.view, self.evaluate());
    }

    /// Re-apply via the holder's scheduler (immediate by default).
    fn schedule_apply(&self) {
        let Some(holder) = self.holder.upgrade() else {
            return;
        };
        let weak = self.weak_self.clone();
        holder.scheduler().schedule(move || {
            if let Some(core) = weak.upgrade() {
                core.apply_now();
            }
        });
    }

    fn change_callback(&self) -> ChangeCallback {
        let weak = self.weak_self.clone();
        Rc::new(move |_key| {
            if let Some(core) = weak.upgrade() {
                core.schedule_apply();
            }
        })
    }
}

impl<V, Input, Output, W> AnyBinding for OneWayCore<V, Input, Output, W>
where
    V: ViewModel + 'static,
    Input: Clone + 'static,
    Output: 'static,
    W: 'static,
{
    fn bind(&self) {
        // Evaluate immediately so the view never shows stale or default
        // content, then subscribe for future changes.
        self.apply_now();
        if let Some(holder) = self.holder.upgrade() {
            let callback = self.change_callback();
            holder.with_view_model(|vm| self.converter.bind(callback, vm));
        }
    }

    fn teardown(&self) {
        self.converter.unbind();
    }

    fn notify_value_change(&self) {
        self.schedule_apply();
    }
}

/// A registered view-model → view binding.
///
/// Handles are cheap clones of the same underlying binding. The binding
/// stays registered with its holder until [`unbind`](Binding::unbind) or
/// the holder's `unbind_all`.
pub struct OneWayBinding<V, Input, Output, W> {
    pub(crate) core: Rc<OneWayCore<V, Input, Output, W>>,
}

impl<V, Input, Output, W> Clone for OneWayBinding<V, Input, Output, W> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<V, Input, Output, W> OneWayBinding<V, Input, Output, W>
where
    V: ViewModel + 'static,
    Input: Clone + 'static,
    Output: 'static,
    W: 'static,
{
    /// Run the converter and transform against the current view model
    /// without touching the view.
    #[must_use]
    pub fn evaluate(&self) -> Option<Output> {
        self.core.evaluate()
    }

    /// The view handle this binding applies to.
    #[must_use]
    pub fn view(&self) -> &W {
        &self.core.view
    }
}

impl<V, Input, Output, W> Binding for OneWayBinding<V, Input, Output, W>
where
    V: ViewModel + 'static,
    Input: Clone + 'static,
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
            holder.unregister_one_way(self.core.converter.slot(), &binding);
        }
    }

    fn notify_value_change(&self) {
        AnyBinding::notify_value_change(&*self.core);
    }
}

/// Conveniences mirroring the holder's `bind_*` entry points. Kept as
/// free constructors so expression builders stay testable without a full
/// holder round trip.
impl<V: 'static, Input: 'static> BindSource<V, Input> {
    pub(crate) fn from_field(
        holder: Weak<HolderCore<V>>,
        select: impl Fn(&V) -> ObservableField<Input> + 'static,
    ) -> Self {
        Self {
            converter: Converter::field(select),
            holder,
        }
    }

    pub(crate) fn from_expression(
        holder: Weak<HolderCore<V>>,
        key: Option<PropertyKey>,
        select: impl Fn(&V) -> Input + 'static,
    ) -> Self {
        Self {
            converter: Converter::expression(key, select),
            holder,
        }
    }

    pub(crate) fn from_nullable(
        holder: Weak<HolderCore<V>>,
        key: Option<PropertyKey>,
        select: impl Fn(Option<&V>) -> Input + 'static,
    ) -> Self {
        Self {
            converter: Converter::nullable(key, select),
            holder,
        }
    }
}
