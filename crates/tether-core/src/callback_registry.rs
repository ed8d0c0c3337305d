//! Ordered callback storage that survives reentrant modification.
//!
//! A common pattern for change callbacks is to receive a notification and
//! then remove themselves (a one-shot binding, a teardown triggered from
//! inside a handler). Removing an entry while a notification pass is
//! walking the collection would corrupt iteration or skip/double-fire
//! neighbors, so removal during a pass is deferred: the slot is marked in
//! a machine-word bitset and physically compacted out only once the
//! outermost pass has finished.
//!
//! The first 64 slots are marked in an inline `u64`; registries larger
//! than that spill into an overflow word vector allocated on demand, so
//! the common small case never allocates for removal bookkeeping.
//!
//! # Invariants
//!
//! 1. Callbacks are invoked in registration order.
//! 2. A callback marked removed during a pass is skipped for the rest of
//!    that pass and never invoked afterwards.
//! 3. A pass snapshots the length at entry: callbacks added from inside a
//!    callback fire from the next pass onward.
//! 4. Reentrant [`notify_all`](CallbackRegistry::notify_all) calls are
//!    safe; compaction runs only when the outermost pass returns.
//! 5. Removing an absent callback is a no-op.

use std::cell::RefCell;
use std::rc::Rc;

const WORD_BITS: usize = u64::BITS as usize;

/// Ordered, reentrant-safe collection of shared callbacks.
///
/// Callbacks are stored and compared by identity (`Rc::ptr_eq`), so the
/// handle passed to [`remove`](Self::remove) must be a clone of the one
/// that was [`add`](Self::add)ed.
///
/// Not thread-safe; one registry belongs to one owner thread.
pub struct CallbackRegistry<C: ?Sized> {
    inner: RefCell<Inner<C>>,
}

struct Inner<C: ?Sized> {
    callbacks: Vec<Rc<C>>,
    /// Removal marks for slots 0..64. Bit i corresponds to index i.
    first_word: u64,
    /// Removal marks for slots 64.., one word per 64 slots.
    overflow: Vec<u64>,
    /// Notification recursion depth. Compaction only happens at zero.
    depth: u32,
}

impl<C: ?Sized> Inner<C> {
    fn is_marked(&self, index: usize) -> bool {
        if index < WORD_BITS {
            self.first_word & (1 << index) != 0
        } else {
            let word = (index - WORD_BITS) / WORD_BITS;
            let bit = (index - WORD_BITS) % WORD_BITS;
            self.overflow.get(word).is_some_and(|w| w & (1 << bit) != 0)
        }
    }

    fn mark(&mut self, index: usize) {
        if index < WORD_BITS {
            self.first_word |= 1 << index;
        } else {
            let word = (index - WORD_BITS) / WORD_BITS;
            let bit = (index - WORD_BITS) % WORD_BITS;
            if self.overflow.len() <= word {
                self.overflow.resize(word + 1, 0);
            }
            self.overflow[word] |= 1 << bit;
        }
    }

    fn has_marks(&self) -> bool {
        self.first_word != 0 || self.overflow.iter().any(|w| *w != 0)
    }

    /// Physically drop every marked slot. Only called at depth zero, so
    /// no pass is holding indices into `callbacks`.
    fn compact(&mut self) {
        if !self.has_marks() {
            return;
        }
        for index in (0..self.callbacks.len()).rev() {
            if self.is_marked(index) {
                self.callbacks.remove(index);
            }
        }
        self.first_word = 0;
        self.overflow.clear();
    }

    /// Index of a live (unmarked) entry identical to `callback`.
    fn live_index_of(&self, callback: &Rc<C>) -> Option<usize> {
        self.callbacks
            .iter()
            .enumerate()
            .find(|(index, cb)| Rc::ptr_eq(cb, callback) && !self.is_marked(*index))
            .map(|(index, _)| index)
    }
}

impl<C: ?Sized> CallbackRegistry<C> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(Inner {
                callbacks: Vec::new(),
                first_word: 0,
                overflow: Vec::new(),
                depth: 0,
            }),
        }
    }

    /// Append `callback` unless an identical live entry is already present.
    ///
    /// An entry that is marked for deferred removal no longer counts as
    /// present, so re-adding it during the same pass registers a fresh
    /// slot that fires from the next pass onward.
    pub fn add(&self, callback: Rc<C>) {
        let mut inner = self.inner.borrow_mut();
        if inner.live_index_of(&callback).is_none() {
            inner.callbacks.push(callback);
        }
    }

    /// Remove `callback`.
    ///
    /// Outside a notification pass the entry is dropped immediately.
    /// During a pass it is only marked; the slot stays in place (and is
    /// skipped) until the outermost pass finishes. Removing a callback
    /// that is not present is a no-op.
    pub fn remove(&self, callback: &Rc<C>) {
        let mut inner = self.inner.borrow_mut();
        let Some(index) = inner.live_index_of(callback) else {
            return;
        };
        if inner.depth == 0 {
            inner.callbacks.remove(index);
        } else {
            inner.mark(index);
        }
    }

    /// Whether an identical live entry is registered.
    #[must_use]
    pub fn contains(&self, callback: &Rc<C>) -> bool {
        self.inner.borrow().live_index_of(callback).is_some()
    }

    /// Number of live (unmarked) callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        let inner = self.inner.borrow();
        (0..inner.callbacks.len())
            .filter(|index| !inner.is_marked(*index))
            .count()
    }

    /// Whether no live callbacks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every live callback in registration order.
    ///
    /// The registry is not borrowed while `invoke` runs, so callbacks may
    /// freely call [`add`](Self::add), [`remove`](Self::remove), or even
    /// `notify_all` on this same registry.
    pub fn notify_all(&self, mut invoke: impl FnMut(&C)) {
        let len = {
            let mut inner = self.inner.borrow_mut();
            inner.depth += 1;
            inner.callbacks.len()
        };
        for index in 0..len {
            let callback = {
                let inner = self.inner.borrow();
                if inner.is_marked(index) {
                    None
                } else {
                    inner.callbacks.get(index).cloned()
                }
            };
            if let Some(callback) = callback {
                invoke(&callback);
            }
        }
        let mut inner = self.inner.borrow_mut();
        inner.depth -= 1;
        if inner.depth == 0 {
            inner.compact();
        }
    }
}

impl<C: ?Sized> Default for CallbackRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ?Sized> std::fmt::Debug for CallbackRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::cell::RefCell;

    type Callback = dyn Fn();

    fn counting(counter: &Rc<Cell<usize>>) -> Rc<Callback> {
        let counter = Rc::clone(counter);
        Rc::new(move || counter.set(counter.get() + 1))
    }

    #[test]
    fn fires_in_registration_order() {
        let registry: CallbackRegistry<dyn Fn(usize)> = CallbackRegistry::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for id in 0..4 {
            let order = Rc::clone(&order);
            registry.add(Rc::new(move |_| order.borrow_mut().push(id)));
        }
        registry.notify_all(|cb| cb(0));
        assert_eq!(*order.borrow(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn remove_outside_pass_is_immediate() {
        let registry: CallbackRegistry<Callback> = CallbackRegistry::new();
        let counter = Rc::new(Cell::new(0));
        let cb = counting(&counter);
        registry.add(Rc::clone(&cb));
        assert_eq!(registry.len(), 1);

        registry.remove(&cb);
        assert!(registry.is_empty());
        registry.notify_all(|cb| cb());
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn double_remove_is_noop() {
        let registry: CallbackRegistry<Callback> = CallbackRegistry::new();
        let counter = Rc::new(Cell::new(0));
        let cb = counting(&counter);
        registry.add(Rc::clone(&cb));
        registry.remove(&cb);
        registry.remove(&cb);
        assert!(registry.is_empty());
    }

    #[test]
    fn duplicate_add_is_ignored() {
        let registry: CallbackRegistry<Callback> = CallbackRegistry::new();
        let counter = Rc::new(Cell::new(0));
        let cb = counting(&counter);
        registry.add(Rc::clone(&cb));
        registry.add(Rc::clone(&cb));
        registry.notify_all(|cb| cb());
        assert_eq!(counter.get(), 1);
    }

    /// A callback removing itself mid-pass must not disturb the
    /// others, and must not fire in later passes.
    #[test]
    fn self_removal_mid_pass_notifies_all_others() {
        let registry: Rc<CallbackRegistry<Callback>> = Rc::new(CallbackRegistry::new());
        let fired = Rc::new(RefCell::new(Vec::new()));

        // Slot for the self-removing callback's own handle.
        let self_handle: Rc<RefCell<Option<Rc<Callback>>>> = Rc::new(RefCell::new(None));

        for id in 0..5usize {
            if id == 2 {
                let reg = Rc::clone(&registry);
                let fired = Rc::clone(&fired);
                let handle_slot = Rc::clone(&self_handle);
                let cb: Rc<Callback> = Rc::new(move || {
                    fired.borrow_mut().push(2);
                    let handle = handle_slot.borrow().clone();
                    if let Some(handle) = handle {
                        reg.remove(&handle);
                    }
                });
                *self_handle.borrow_mut() = Some(Rc::clone(&cb));
                registry.add(cb);
            } else {
                let fired = Rc::clone(&fired);
                registry.add(Rc::new(move || fired.borrow_mut().push(id)));
            }
        }

        registry.notify_all(|cb| cb());
        assert_eq!(*fired.borrow(), vec![0, 1, 2, 3, 4]);
        assert_eq!(registry.len(), 4);

        fired.borrow_mut().clear();
        registry.notify_all(|cb| cb());
        assert_eq!(*fired.borrow(), vec![0, 1, 3, 4]);
    }

    #[test]
    fn removal_of_later_neighbor_skips_it_same_pass() {
        let registry: Rc<CallbackRegistry<Callback>> = Rc::new(CallbackRegistry::new());
        let fired = Rc::new(RefCell::new(Vec::new()));

        let victim_slot: Rc<RefCell<Option<Rc<Callback>>>> = Rc::new(RefCell::new(None));

        {
            let reg = Rc::clone(&registry);
            let fired = Rc::clone(&fired);
            let victim_slot = Rc::clone(&victim_slot);
            registry.add(Rc::new(move || {
                fired.borrow_mut().push(0);
                let victim = victim_slot.borrow().clone();
                if let Some(victim) = victim {
                    reg.remove(&victim);
                }
            }));
        }
        {
            let fired = Rc::clone(&fired);
            let victim: Rc<Callback> = Rc::new(move || fired.borrow_mut().push(1));
            *victim_slot.borrow_mut() = Some(Rc::clone(&victim));
            registry.add(victim);
        }

        registry.notify_all(|cb| cb());
        assert_eq!(*fired.borrow(), vec![0], "marked neighbor must be skipped");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn additions_during_pass_fire_next_pass() {
        let registry: Rc<CallbackRegistry<Callback>> = Rc::new(CallbackRegistry::new());
        let counter = Rc::new(Cell::new(0));
        {
            let reg = Rc::clone(&registry);
            let counter = Rc::clone(&counter);
            registry.add(Rc::new(move || {
                let counter = Rc::clone(&counter);
                reg.add(Rc::new(move || counter.set(counter.get() + 1)));
            }));
        }

        registry.notify_all(|cb| cb());
        assert_eq!(counter.get(), 0, "late addition must not fire in the same pass");

        registry.notify_all(|cb| cb());
        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn reentrant_notify_is_safe() {
        let registry: Rc<CallbackRegistry<Callback>> = Rc::new(CallbackRegistry::new());
        let depth_hits = Rc::new(Cell::new(0));
        {
            let reg = Rc::clone(&registry);
            let depth_hits = Rc::clone(&depth_hits);
            let reentered = Rc::new(Cell::new(false));
            registry.add(Rc::new(move || {
                depth_hits.set(depth_hits.get() + 1);
                if !reentered.replace(true) {
                    reg.notify_all(|cb| cb());
                }
            }));
        }
        registry.notify_all(|cb| cb());
        assert_eq!(depth_hits.get(), 2);
    }

    #[test]
    fn overflow_marks_past_first_word() {
        let registry: Rc<CallbackRegistry<Callback>> = Rc::new(CallbackRegistry::new());
        let fired = Rc::new(Cell::new(0usize));
        let mut handles = Vec::new();
        for _ in 0..100 {
            let fired = Rc::clone(&fired);
            let cb: Rc<Callback> = Rc::new(move || fired.set(fired.get() + 1));
            handles.push(Rc::clone(&cb));
            registry.add(cb);
        }

        // First callback removes three entries deep in the overflow range.
        let doomed: Vec<Rc<Callback>> = vec![
            Rc::clone(&handles[70]),
            Rc::clone(&handles[85]),
            Rc::clone(&handles[99]),
        ];
        {
            let reg = Rc::clone(&registry);
            registry.add(Rc::new(move || {
                for victim in &doomed {
                    reg.remove(victim);
                }
            }));
        }
        // Trigger via a pass so removal is deferred through the bitset.
        registry.notify_all(|cb| cb());
        assert_eq!(fired.get(), 100, "all pre-removal entries fire once");
        assert_eq!(registry.len(), 98);

        fired.set(0);
        registry.notify_all(|cb| cb());
        assert_eq!(fired.get(), 97);
    }
}
