//! The binding ledger: owns the view model and every binding attached
//! to it.
//!
//! A [`BindingHolder`] is created together with (or wrapping) a UI
//! component; a component that wants binding behavior holds one and
//! forwards calls: plain composition, no delegation machinery.
//! `bind_all()` runs once when the component becomes visible: every
//! binding evaluates immediately (so the view reflects current
//! view-model state with no flash of default content) and then
//! subscribes. `unbind_all()` on teardown is mandatory; subscriptions
//! otherwise leak and keep firing against destroyed view targets.
//!
//! # Indexes
//!
//! Bindings are indexed by kind so bulk operations never scan irrelevant
//! groups: field-backed one-way, property-keyed one-way, generic
//! one-way, source bindings, and the two exclusive two-way maps (by
//! field identity and by property key, at most one entry per key,
//! enforced at registration time).
//!
//! # Invariants
//!
//! 1. No property key and no observable field has more than one
//!    registered two-way binding (violation panics at registration).
//! 2. Swapping the view model unsubscribes from the old value before
//!    subscribing to the new one, and re-runs the full bind pass if
//!    currently bound.
//! 3. `unbind_all` is idempotent and leaves zero live subscriptions.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use tracing::{debug, trace};

use tether_core::{ChangeCallback, Observable, ObservableField, PropertyKey, ViewModel};

use crate::binding::AnyBinding;
use crate::convert::Slot;
use crate::one_way::{BindSource, OneWayExpr};
use crate::source::ViewSource;
use crate::two_way::TwoWayKey;
use crate::view::{Scheduler, ViewRegister};

pub(crate) struct HolderCore<V> {
    view_model: RefCell<Option<V>>,
    is_bound: Cell<bool>,
    scheduler: RefCell<Scheduler>,
    /// Single dispatcher subscribed to the view model's notifier for the
    /// duration of a binding session.
    dispatcher: ChangeCallback,

    observable_bindings: RefCell<Vec<Rc<dyn AnyBinding>>>,
    source_bindings: RefCell<Vec<Rc<dyn AnyBinding>>>,
    property_bindings: RefCell<AHashMap<PropertyKey, Vec<Rc<dyn AnyBinding>>>>,
    two_way_field_bindings: RefCell<AHashMap<tether_core::FieldId, Rc<dyn AnyBinding>>>,
    two_way_property_bindings: RefCell<AHashMap<PropertyKey, Rc<dyn AnyBinding>>>,
    generic_bindings: RefCell<Vec<Rc<dyn AnyBinding>>>,
}

impl<V: ViewModel + 'static> HolderCore<V> {
    pub(crate) fn with_view_model<R>(&self, f: impl FnOnce(Option<&V>) -> R) -> R {
        f(self.view_model.borrow().as_ref())
    }

    pub(crate) fn scheduler(&self) -> Scheduler {
        self.scheduler.borrow().clone()
    }

    pub(crate) fn register_one_way(&self, slot: Slot, binding: Rc<dyn AnyBinding>) {
        trace!(?slot, "register one-way binding");
        match slot {
            Slot::Field => self.observable_bindings.borrow_mut().push(binding),
            Slot::Keyed(key) => self
                .property_bindings
                .borrow_mut()
                .entry(key)
                .or_default()
                .push(binding),
            Slot::Generic => self.generic_bindings.borrow_mut().push(binding),
        }
    }

    pub(crate) fn unregister_one_way(&self, slot: Slot, binding: &Rc<dyn AnyBinding>) {
        match slot {
            Slot::Field => remove_binding(&mut self.observable_bindings.borrow_mut(), binding),
            Slot::Keyed(key) => {
                let mut buckets = self.property_bindings.borrow_mut();
                if let Some(bucket) = buckets.get_mut(&key) {
                    remove_binding(bucket, binding);
                    if bucket.is_empty() {
                        buckets.remove(&key);
                    }
                }
            }
            Slot::Generic => remove_binding(&mut self.generic_bindings.borrow_mut(), binding),
        }
    }

    /// # Panics
    ///
    /// Panics if `key` already has a registered two-way binding.
    pub(crate) fn register_two_way(&self, key: TwoWayKey, binding: Rc<dyn AnyBinding>) {
        trace!(?key, "register two-way binding");
        match key {
            TwoWayKey::Field(id) => {
                let mut map = self.two_way_field_bindings.borrow_mut();
                assert!(
                    !map.contains_key(&id),
                    "cannot register more than one two-way binding on an observable field; \
                     this would risk a view update cycle"
                );
                map.insert(id, binding);
            }
            TwoWayKey::Property(property) => {
                let mut map = self.two_way_property_bindings.borrow_mut();
                assert!(
                    !map.contains_key(&property),
                    "cannot register more than one two-way binding on property `{property}`; \
                     this would risk a view update cycle"
                );
                map.insert(property, binding);
            }
        }
    }

    /// Removal is by identity, not by key alone: a stale handle whose
    /// slot has since been re-registered must not evict the newcomer.
    pub(crate) fn unregister_two_way(&self, key: TwoWayKey, binding: &Rc<dyn AnyBinding>) {
        match key {
            TwoWayKey::Field(id) => {
                let mut map = self.two_way_field_bindings.borrow_mut();
                if map.get(&id).is_some_and(|current| Rc::ptr_eq(current, binding)) {
                    map.remove(&id);
                }
            }
            TwoWayKey::Property(property) => {
                let mut map = self.two_way_property_bindings.borrow_mut();
                if map
                    .get(&property)
                    .is_some_and(|current| Rc::ptr_eq(current, binding))
                {
                    map.remove(&property);
                }
            }
        }
    }

    pub(crate) fn register_source(&self, binding: Rc<dyn AnyBinding>) {
        trace!("register source binding");
        self.source_bindings.borrow_mut().push(binding);
    }

    pub(crate) fn unregister_source(&self, binding: &Rc<dyn AnyBinding>) {
        remove_binding(&mut self.source_bindings.borrow_mut(), binding);
    }

    /// Every binding, in the deterministic bulk-operation order:
    /// field-backed one-way, source, property-keyed one-way, two-way by
    /// field, two-way by property, generic one-way.
    fn all_bindings(&self) -> Vec<Rc<dyn AnyBinding>> {
        let mut all = Vec::new();
        all.extend(self.observable_bindings.borrow().iter().cloned());
        all.extend(self.source_bindings.borrow().iter().cloned());
        for bucket in self.property_bindings.borrow().values() {
            all.extend(bucket.iter().cloned());
        }
        all.extend(self.two_way_field_bindings.borrow().values().cloned());
        all.extend(self.two_way_property_bindings.borrow().values().cloned());
        all.extend(self.generic_bindings.borrow().iter().cloned());
        all
    }

    fn binding_count(&self) -> usize {
        self.observable_bindings.borrow().len()
            + self.source_bindings.borrow().len()
            + self
                .property_bindings
                .borrow()
                .values()
                .map(Vec::len)
                .sum::<usize>()
            + self.two_way_field_bindings.borrow().len()
            + self.two_way_property_bindings.borrow().len()
            + self.generic_bindings.borrow().len()
    }

    /// Route a property change to the matching bucket, or revalidate
    /// every routed binding when no key is given (the view model was
    /// replaced wholesale or cannot say what changed).
    fn on_view_model_changed(&self, key: Option<PropertyKey>) {
        trace!(?key, "view model changed");
        match key {
            Some(key) => {
                let keyed: Vec<_> = self
                    .property_bindings
                    .borrow()
                    .get(&key)
                    .cloned()
                    .unwrap_or_default();
                for binding in keyed {
                    binding.notify_value_change();
                }
                let two_way = self.two_way_property_bindings.borrow().get(&key).cloned();
                if let Some(binding) = two_way {
                    binding.notify_value_change();
                }
            }
            None => {
                let mut routed: Vec<Rc<dyn AnyBinding>> = Vec::new();
                for bucket in self.property_bindings.borrow().values() {
                    routed.extend(bucket.iter().cloned());
                }
                routed.extend(self.two_way_property_bindings.borrow().values().cloned());
                routed.extend(self.generic_bindings.borrow().iter().cloned());
                for binding in routed {
                    binding.notify_value_change();
                }
            }
        }
    }

    pub(crate) fn bind_all(&self) {
        {
            let view_model = self.view_model.borrow();
            if let Some(notifier) = view_model.as_ref().and_then(|vm| vm.change_notifier()) {
                notifier.add_callback(Rc::clone(&self.dispatcher));
            }
        }
        let bindings = self.all_bindings();
        debug!(count = bindings.len(), "bind_all");
        for binding in bindings {
            binding.bind();
        }
        self.is_bound.set(true);
    }

    pub(crate) fn unbind_all(&self) {
        {
            let view_model = self.view_model.borrow();
            if let Some(notifier) = view_model.as_ref().and_then(|vm| vm.change_notifier()) {
                notifier.remove_callback(&self.dispatcher);
            }
        }
        let bindings = self.all_bindings();
        debug!(count = bindings.len(), "unbind_all");
        for binding in bindings {
            binding.teardown();
        }
        self.observable_bindings.borrow_mut().clear();
        self.source_bindings.borrow_mut().clear();
        self.property_bindings.borrow_mut().clear();
        self.two_way_field_bindings.borrow_mut().clear();
        self.two_way_property_bindings.borrow_mut().clear();
        self.generic_bindings.borrow_mut().clear();
        self.is_bound.set(false);
    }

    /// # Panics
    ///
    /// Panics when the holder is not bound; forcing a re-evaluation on
    /// an unbound ledger is a caller error.
    pub(crate) fn notify_changes(&self) {
        assert!(
            self.is_bound.get(),
            "cannot notify changes on an unbound binding holder"
        );
        for binding in self.all_bindings() {
            binding.notify_value_change();
        }
    }

    pub(crate) fn set_view_model(&self, view_model: Option<V>) {
        {
            let old = self.view_model.borrow();
            if let Some(notifier) = old.as_ref().and_then(|vm| vm.change_notifier()) {
                notifier.remove_callback(&self.dispatcher);
            }
        }
        *self.view_model.borrow_mut() = view_model;
        if self.is_bound.get() {
            debug!("view model swapped while bound; re-running bind pass");
            for binding in self.all_bindings() {
                binding.teardown();
            }
            self.bind_all();
        }
    }
}

fn remove_binding(list: &mut Vec<Rc<dyn AnyBinding>>, binding: &Rc<dyn AnyBinding>) {
    list.retain(|candidate| !Rc::ptr_eq(candidate, binding));
}

/// Owns a view-model reference and every binding attached to it.
///
/// ```
/// use tether_core::{ObservableField, ViewModel};
/// use tether_runtime::BindingHolder;
/// # use std::cell::RefCell;
/// # use std::rc::Rc;
///
/// struct Profile {
///     name: ObservableField<String>,
/// }
/// impl ViewModel for Profile {}
///
/// let holder = BindingHolder::new(Some(Profile {
///     name: ObservableField::new(String::from("Andrew")),
/// }));
///
/// let label = Rc::new(RefCell::new(String::new()));
/// let shown = Rc::clone(&label);
/// holder
///     .bind_field(|vm: &Profile| vm.name.clone())
///     .on_self()
///     .to_view(label, move |_, text| {
///         if let Some(text) = text {
///             *shown.borrow_mut() = text;
///         }
///     });
///
/// holder.bind_all();
/// holder.with_view_model(|vm| vm.unwrap().name.set(String::from("Mia")));
/// holder.unbind_all();
/// ```
pub struct BindingHolder<V: ViewModel + 'static> {
    core: Rc<HolderCore<V>>,
}

impl<V: ViewModel + 'static> BindingHolder<V> {
    /// Create a holder, optionally with an initial view model.
    #[must_use]
    pub fn new(view_model: Option<V>) -> Self {
        let core = Rc::new_cyclic(|weak: &Weak<HolderCore<V>>| {
            let weak = weak.clone();
            let dispatcher: ChangeCallback = Rc::new(move |key| {
                if let Some(core) = weak.upgrade() {
                    core.on_view_model_changed(key);
                }
            });
            HolderCore {
                view_model: RefCell::new(view_model),
                is_bound: Cell::new(false),
                scheduler: RefCell::new(Scheduler::immediate()),
                dispatcher,
                observable_bindings: RefCell::new(Vec::new()),
                source_bindings: RefCell::new(Vec::new()),
                property_bindings: RefCell::new(AHashMap::new()),
                two_way_field_bindings: RefCell::new(AHashMap::new()),
                two_way_property_bindings: RefCell::new(AHashMap::new()),
                generic_bindings: RefCell::new(Vec::new()),
            }
        });
        Self { core }
    }

    /// Replace the scheduler used to apply values to view targets.
    pub fn set_scheduler(&self, scheduler: Scheduler) {
        *self.core.scheduler.borrow_mut() = scheduler;
    }

    /// Whether `bind_all` has run (and `unbind_all` has not).
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.core.is_bound.get()
    }

    /// Number of registered bindings across all kinds.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.core.binding_count()
    }

    /// Run `f` against the current view model.
    pub fn with_view_model<R>(&self, f: impl FnOnce(Option<&V>) -> R) -> R {
        self.core.with_view_model(f)
    }

    /// Swap the view model. The old value is fully unsubscribed before
    /// the new one is subscribed; if currently bound, the full bind pass
    /// re-runs against the new value.
    pub fn set_view_model(&self, view_model: Option<V>) {
        self.core.set_view_model(view_model);
    }

    /// Subscribe to the view model and bind every registered binding.
    /// Each binding evaluates and applies immediately.
    pub fn bind_all(&self) {
        self.core.bind_all();
    }

    /// Tear everything down and clear every index. Safe to call twice,
    /// or without ever binding.
    pub fn unbind_all(&self) {
        self.core.unbind_all();
    }

    /// Force every binding to re-evaluate without a triggering mutation.
    ///
    /// # Panics
    ///
    /// Panics if the holder is not bound.
    pub fn notify_changes(&self) {
        self.core.notify_changes();
    }

    /// Start a binding expression on an observable field selected from
    /// the view model.
    pub fn bind_field<Input: Clone + 'static>(
        &self,
        select: impl Fn(&V) -> ObservableField<Input> + 'static,
    ) -> BindSource<V, Input> {
        BindSource::from_field(Rc::downgrade(&self.core), select)
    }

    /// Start a property-keyed expression binding, driven by the view
    /// model's change notifications for `key`.
    pub fn bind_expr<Input: 'static>(
        &self,
        key: PropertyKey,
        select: impl Fn(&V) -> Input + 'static,
    ) -> BindSource<V, Input> {
        BindSource::from_expression(Rc::downgrade(&self.core), Some(key), select)
    }

    /// Start a key-less expression binding, revalidated whenever the
    /// view model notifies without a specific key.
    pub fn bind_generic<Input: 'static>(
        &self,
        select: impl Fn(&V) -> Input + 'static,
    ) -> BindSource<V, Input> {
        BindSource::from_expression(Rc::downgrade(&self.core), None, select)
    }

    /// Start an expression binding that runs even while no view model is
    /// set. Useful for loading states.
    pub fn bind_nullable<Input: 'static>(
        &self,
        key: Option<PropertyKey>,
        select: impl Fn(Option<&V>) -> Input + 'static,
    ) -> BindSource<V, Input> {
        BindSource::from_nullable(Rc::downgrade(&self.core), key, select)
    }

    /// Field binding with the identity transform in one step.
    pub fn bind_self<Input: Clone + 'static>(
        &self,
        select: impl Fn(&V) -> ObservableField<Input> + 'static,
    ) -> OneWayExpr<V, Input, Input> {
        self.bind_field(select).on_self()
    }

    /// Keyed expression binding with the identity transform in one step.
    pub fn bind_expr_self<Input: Clone + 'static>(
        &self,
        key: PropertyKey,
        select: impl Fn(&V) -> Input + 'static,
    ) -> OneWayExpr<V, Input, Input> {
        self.bind_expr(key, select).on_self()
    }

    /// Start a one-way-to-source expression from a view and its
    /// register.
    pub fn bind_view<W: 'static, Output: 'static>(
        &self,
        view: W,
        register: impl ViewRegister<W, Output> + 'static,
    ) -> ViewSource<V, W, Output> {
        ViewSource {
            view,
            register: Box::new(register),
            holder: Rc::downgrade(&self.core),
        }
    }
}

impl<V: ViewModel + 'static> std::fmt::Debug for BindingHolder<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingHolder")
            .field("is_bound", &self.is_bound())
            .field("binding_count", &self.binding_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::Binding;
    use std::cell::RefCell;

    struct Vm {
        name: ObservableField<String>,
        flag: ObservableField<bool>,
    }

    impl Vm {
        fn new(name: &str) -> Self {
            Self {
                name: ObservableField::new(String::from(name)),
                flag: ObservableField::new(false),
            }
        }
    }

    impl ViewModel for Vm {}

    fn text_target() -> (Rc<RefCell<Vec<Option<String>>>>, Rc<RefCell<Vec<Option<String>>>>) {
        let applied = Rc::new(RefCell::new(Vec::new()));
        (Rc::clone(&applied), applied)
    }

    #[test]
    fn to_view_registers_with_holder() {
        let holder = BindingHolder::new(Some(Vm::new("a")));
        let (applied, sink) = text_target();
        let _binding = holder
            .bind_field(|vm: &Vm| vm.name.clone())
            .on_self()
            .to_view((), move |_view, value| sink.borrow_mut().push(value));
        assert_eq!(holder.binding_count(), 1);
        assert!(applied.borrow().is_empty(), "nothing applies before bind");
    }

    #[test]
    fn bind_all_applies_immediately() {
        let holder = BindingHolder::new(Some(Vm::new("Andrew")));
        let (applied, sink) = text_target();
        let _binding = holder
            .bind_field(|vm: &Vm| vm.name.clone())
            .on_self()
            .to_view((), move |_view, value| sink.borrow_mut().push(value));

        holder.bind_all();
        assert_eq!(
            *applied.borrow(),
            vec![Some(String::from("Andrew"))],
            "view must reflect view-model state with no mutation"
        );
    }

    #[test]
    fn field_change_reapplies() {
        let holder = BindingHolder::new(Some(Vm::new("a")));
        let (applied, sink) = text_target();
        let _binding = holder
            .bind_field(|vm: &Vm| vm.name.clone())
            .on(|name| name.to_uppercase())
            .to_view((), move |_view, value| sink.borrow_mut().push(value));

        holder.bind_all();
        holder.with_view_model(|vm| vm.unwrap().name.set(String::from("b")));
        assert_eq!(
            *applied.borrow(),
            vec![Some(String::from("A")), Some(String::from("B"))]
        );
    }

    #[test]
    fn unbind_all_stops_notifications() {
        let holder = BindingHolder::new(Some(Vm::new("a")));
        let (applied, sink) = text_target();
        let _binding = holder
            .bind_field(|vm: &Vm| vm.name.clone())
            .on_self()
            .to_view((), move |_view, value| sink.borrow_mut().push(value));

        holder.bind_all();
        let field = holder.with_view_model(|vm| vm.unwrap().name.clone());
        holder.unbind_all();
        assert_eq!(field.callback_count(), 0);

        field.set(String::from("after"));
        assert_eq!(applied.borrow().len(), 1, "no application after unbind");
    }

    /// Double unbind is a no-op.
    #[test]
    fn unbind_all_twice_is_safe() {
        let holder = BindingHolder::new(Some(Vm::new("a")));
        let (_applied, sink) = text_target();
        let _binding = holder
            .bind_field(|vm: &Vm| vm.name.clone())
            .on_self()
            .to_view((), move |_view, value| sink.borrow_mut().push(value));
        holder.bind_all();
        holder.unbind_all();
        holder.unbind_all();
        assert!(!holder.is_bound());
        assert_eq!(holder.binding_count(), 0);
    }

    #[test]
    fn unbind_without_bind_is_safe() {
        let holder = BindingHolder::new(Some(Vm::new("a")));
        holder.unbind_all();
        assert!(!holder.is_bound());
    }

    #[test]
    #[should_panic(expected = "unbound binding holder")]
    fn notify_changes_on_unbound_holder_panics() {
        let holder: BindingHolder<Vm> = BindingHolder::new(Some(Vm::new("a")));
        holder.notify_changes();
    }

    #[test]
    fn manual_unbind_removes_registration() {
        let holder = BindingHolder::new(Some(Vm::new("a")));
        let (_applied, sink) = text_target();
        let binding = holder
            .bind_field(|vm: &Vm| vm.name.clone())
            .on_self()
            .to_view((), move |_view, value| sink.borrow_mut().push(value));
        assert_eq!(holder.binding_count(), 1);
        binding.unbind();
        assert_eq!(holder.binding_count(), 0);
    }

    /// Scenario C: a property-keyed binding on a view model with no
    /// notifier still re-evaluates through `notify_changes`.
    #[test]
    fn notify_changes_reaches_keyed_bindings_without_notifier() {
        const NAME: PropertyKey = PropertyKey::new("name");

        struct Plain {
            name: RefCell<String>,
        }
        impl ViewModel for Plain {}

        let holder = BindingHolder::new(Some(Plain {
            name: RefCell::new(String::from("first")),
        }));
        let (applied, sink) = text_target();
        let _binding = holder
            .bind_expr(NAME, |vm: &Plain| vm.name.borrow().clone())
            .on_self()
            .to_view((), move |_view, value| sink.borrow_mut().push(value));

        holder.bind_all();
        holder.with_view_model(|vm| {
            *vm.unwrap().name.borrow_mut() = String::from("second");
        });
        // No notifier, so nothing fired yet.
        assert_eq!(applied.borrow().len(), 1);

        holder.notify_changes();
        assert_eq!(
            applied.borrow().last().unwrap(),
            &Some(String::from("second"))
        );
    }

    /// Swapping the view model re-subscribes bindings to the new
    /// instance and fully releases the old one.
    #[test]
    fn view_model_swap_resubscribes() {
        let holder = BindingHolder::new(Some(Vm::new("old")));
        let (applied, sink) = text_target();
        let _binding = holder
            .bind_field(|vm: &Vm| vm.name.clone())
            .on_self()
            .to_view((), move |_view, value| sink.borrow_mut().push(value));

        holder.bind_all();
        let old_field = holder.with_view_model(|vm| vm.unwrap().name.clone());
        assert_eq!(old_field.callback_count(), 1);

        holder.set_view_model(Some(Vm::new("new")));
        assert_eq!(old_field.callback_count(), 0, "old field fully released");
        assert_eq!(
            applied.borrow().last().unwrap(),
            &Some(String::from("new")),
            "bind pass re-ran against the new view model"
        );

        let before = applied.borrow().len();
        old_field.set(String::from("stale"));
        assert_eq!(applied.borrow().len(), before, "old field must not trigger");

        holder.with_view_model(|vm| vm.unwrap().name.set(String::from("fresh")));
        assert_eq!(
            applied.borrow().last().unwrap(),
            &Some(String::from("fresh"))
        );
    }

    #[test]
    fn keyed_notification_routes_to_matching_bucket_only() {
        const NAME: PropertyKey = PropertyKey::new("name");
        const OTHER: PropertyKey = PropertyKey::new("other");

        struct Keyed {
            name: RefCell<String>,
            changes: tether_core::ChangeNotifier,
        }
        impl ViewModel for Keyed {
            fn change_notifier(&self) -> Option<&tether_core::ChangeNotifier> {
                Some(&self.changes)
            }
        }

        let holder = BindingHolder::new(Some(Keyed {
            name: RefCell::new(String::from("x")),
            changes: tether_core::ChangeNotifier::new(),
        }));
        let (applied, sink) = text_target();
        let _binding = holder
            .bind_expr(NAME, |vm: &Keyed| vm.name.borrow().clone())
            .on_self()
            .to_view((), move |_view, value| sink.borrow_mut().push(value));

        holder.bind_all();
        assert_eq!(applied.borrow().len(), 1);

        holder.with_view_model(|vm| vm.unwrap().changes.notify_change(Some(OTHER)));
        assert_eq!(applied.borrow().len(), 1, "unrelated key must not route here");

        holder.with_view_model(|vm| vm.unwrap().changes.notify_change(Some(NAME)));
        assert_eq!(applied.borrow().len(), 2);

        holder.with_view_model(|vm| vm.unwrap().changes.notify_change(None));
        assert_eq!(applied.borrow().len(), 3, "null key revalidates keyed bindings");
    }

    #[test]
    fn generic_bindings_revalidate_on_keyless_notification_only() {
        struct Keyed {
            changes: tether_core::ChangeNotifier,
        }
        impl ViewModel for Keyed {
            fn change_notifier(&self) -> Option<&tether_core::ChangeNotifier> {
                Some(&self.changes)
            }
        }

        let holder = BindingHolder::new(Some(Keyed {
            changes: tether_core::ChangeNotifier::new(),
        }));
        let applied = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&applied);
        let _binding = holder
            .bind_generic(|_vm: &Keyed| 1)
            .on_self()
            .to_view((), move |_view, _| *sink.borrow_mut() += 1);

        holder.bind_all();
        assert_eq!(*applied.borrow(), 1);

        holder.with_view_model(|vm| {
            vm.unwrap()
                .changes
                .notify_change(Some(PropertyKey::new("whatever")));
        });
        assert_eq!(*applied.borrow(), 1);

        holder.with_view_model(|vm| vm.unwrap().changes.notify_change(None));
        assert_eq!(*applied.borrow(), 2);
    }

    #[test]
    fn nullable_binding_runs_without_view_model() {
        let holder: BindingHolder<Vm> = BindingHolder::new(None);
        let applied = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&applied);
        let _binding = holder
            .bind_nullable(None, |vm: Option<&Vm>| vm.is_some())
            .on_self()
            .to_view((), move |_view, value| sink.borrow_mut().push(value));

        holder.bind_all();
        assert_eq!(*applied.borrow(), vec![Some(false)]);

        holder.set_view_model(Some(Vm::new("x")));
        assert_eq!(applied.borrow().last().unwrap(), &Some(true));
    }

    #[test]
    fn deferred_scheduler_defers_application() {
        let holder = BindingHolder::new(Some(Vm::new("a")));
        let queue: Rc<RefCell<Vec<Box<dyn FnOnce()>>>> = Rc::new(RefCell::new(Vec::new()));
        {
            let queue = Rc::clone(&queue);
            holder.set_scheduler(Scheduler::new(move |task| queue.borrow_mut().push(task)));
        }

        let (applied, sink) = text_target();
        let _binding = holder
            .bind_field(|vm: &Vm| vm.name.clone())
            .on_self()
            .to_view((), move |_view, value| sink.borrow_mut().push(value));

        holder.bind_all();
        // bind applies synchronously regardless of scheduler.
        assert_eq!(applied.borrow().len(), 1);

        holder.with_view_model(|vm| vm.unwrap().name.set(String::from("b")));
        assert_eq!(applied.borrow().len(), 1, "change application is queued");

        for task in queue.borrow_mut().drain(..) {
            task();
        }
        assert_eq!(applied.borrow().last().unwrap(), &Some(String::from("b")));
    }

    #[test]
    fn flag_field_binding_tracks_bool() {
        let holder = BindingHolder::new(Some(Vm::new("a")));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _binding = holder
            .bind_field(|vm: &Vm| vm.flag.clone())
            .inverted()
            .to_view((), move |_view, value| sink.borrow_mut().push(value));

        holder.bind_all();
        holder.with_view_model(|vm| vm.unwrap().flag.set(true));
        assert_eq!(*seen.borrow(), vec![Some(true), Some(false)]);
    }
}
