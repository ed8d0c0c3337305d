#![forbid(unsafe_code)]

//! Fake widgets and view registers for exercising Tether bindings.
//!
//! The fakes mimic the event behavior of real toolkit widgets:
//! programmatic writes fire the change listener exactly like user edits
//! do, so a test that survives a full two-way round trip demonstrates the
//! engine's cycle suppression rather than a quiet fake. Every widget
//! counts actual mutations (`write_count`), letting tests assert that
//! equal values were dropped instead of re-applied.
//!
//! Widgets are shared as `Rc` handles: the binding owns one clone as its
//! view target while the test keeps another to simulate the user.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::trace;

use tether_runtime::{UserChangeCallback, ViewRegister};

/// Display-only text widget. No change listener; pair it with one-way
/// bindings.
#[derive(Default)]
pub struct FakeLabel {
    text: RefCell<Option<String>>,
    writes: Cell<usize>,
}

impl FakeLabel {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Write `text` if it differs from what the label shows.
    pub fn set_text_if_changed(&self, text: Option<String>) {
        if *self.text.borrow() == text {
            return;
        }
        trace!(?text, "label write");
        *self.text.borrow_mut() = text;
        self.writes.set(self.writes.get() + 1);
    }

    #[must_use]
    pub fn text(&self) -> Option<String> {
        self.text.borrow().clone()
    }

    /// Number of actual mutations, not apply attempts.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }
}

/// Editable text widget with a single change listener.
///
/// Like a real text input, a programmatic
/// [`set_text_if_changed`](Self::set_text_if_changed) that mutates the
/// content fires the change listener just as a user edit would.
#[derive(Default)]
pub struct FakeTextInput {
    text: RefCell<String>,
    listener: RefCell<Option<UserChangeCallback<String>>>,
    writes: Cell<usize>,
}

impl FakeTextInput {
    #[must_use]
    pub fn new(initial: &str) -> Rc<Self> {
        Rc::new(Self {
            text: RefCell::new(String::from(initial)),
            ..Self::default()
        })
    }

    /// Write `text` (absent becomes empty) if it differs, firing the
    /// change listener on an actual mutation.
    pub fn set_text_if_changed(&self, text: Option<String>) {
        let text = text.unwrap_or_default();
        if *self.text.borrow() == text {
            return;
        }
        trace!(%text, "text input write");
        *self.text.borrow_mut() = text;
        self.writes.set(self.writes.get() + 1);
        self.fire();
    }

    /// Simulate the user typing `text` into the widget.
    pub fn user_types(&self, text: &str) {
        if *self.text.borrow() == text {
            return;
        }
        trace!(%text, "user types");
        *self.text.borrow_mut() = String::from(text);
        self.fire();
    }

    fn fire(&self) {
        let listener = self.listener.borrow().clone();
        if let Some(listener) = listener {
            listener(Some(self.text.borrow().clone()));
        }
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.text.borrow().clone()
    }

    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    #[must_use]
    pub fn has_listener(&self) -> bool {
        self.listener.borrow().is_some()
    }
}

/// [`ViewRegister`] over [`FakeTextInput`].
pub struct TextInputRegister;

impl ViewRegister<Rc<FakeTextInput>, String> for TextInputRegister {
    fn register(&self, view: &Rc<FakeTextInput>, on_user_change: UserChangeCallback<String>) {
        *view.listener.borrow_mut() = Some(on_user_change);
    }

    fn deregister(&self, view: &Rc<FakeTextInput>) {
        *view.listener.borrow_mut() = None;
    }

    fn value(&self, view: &Rc<FakeTextInput>) -> String {
        view.text()
    }
}

/// Boolean switch widget with a single change listener.
#[derive(Default)]
pub struct FakeToggle {
    on: Cell<bool>,
    listener: RefCell<Option<UserChangeCallback<bool>>>,
    writes: Cell<usize>,
}

impl FakeToggle {
    #[must_use]
    pub fn new(on: bool) -> Rc<Self> {
        Rc::new(Self {
            on: Cell::new(on),
            ..Self::default()
        })
    }

    /// Write `on` (absent becomes `false`) if it differs, firing the
    /// change listener on an actual mutation.
    pub fn set_on_if_changed(&self, on: Option<bool>) {
        let on = on.unwrap_or(false);
        if self.on.get() == on {
            return;
        }
        trace!(on, "toggle write");
        self.on.set(on);
        self.writes.set(self.writes.get() + 1);
        self.fire();
    }

    /// Simulate the user flipping the switch.
    pub fn user_toggles(&self) {
        self.on.set(!self.on.get());
        trace!(on = self.on.get(), "user toggles");
        self.fire();
    }

    fn fire(&self) {
        let listener = self.listener.borrow().clone();
        if let Some(listener) = listener {
            listener(Some(self.on.get()));
        }
    }

    #[must_use]
    pub fn is_on(&self) -> bool {
        self.on.get()
    }

    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    #[must_use]
    pub fn has_listener(&self) -> bool {
        self.listener.borrow().is_some()
    }
}

/// [`ViewRegister`] over [`FakeToggle`].
pub struct ToggleRegister;

impl ViewRegister<Rc<FakeToggle>, bool> for ToggleRegister {
    fn register(&self, view: &Rc<FakeToggle>, on_user_change: UserChangeCallback<bool>) {
        *view.listener.borrow_mut() = Some(on_user_change);
    }

    fn deregister(&self, view: &Rc<FakeToggle>) {
        *view.listener.borrow_mut() = None;
    }

    fn value(&self, view: &Rc<FakeToggle>) -> bool {
        view.on.get()
    }
}

/// Discrete slider widget (0..=100) with a single change listener.
#[derive(Default)]
pub struct FakeSlider {
    value: Cell<u8>,
    listener: RefCell<Option<UserChangeCallback<u8>>>,
    writes: Cell<usize>,
}

impl FakeSlider {
    #[must_use]
    pub fn new(value: u8) -> Rc<Self> {
        Rc::new(Self {
            value: Cell::new(value),
            ..Self::default()
        })
    }

    /// Write `value` (absent becomes 0) if it differs, firing the change
    /// listener on an actual mutation.
    pub fn set_value_if_changed(&self, value: Option<u8>) {
        let value = value.unwrap_or(0);
        if self.value.get() == value {
            return;
        }
        trace!(value, "slider write");
        self.value.set(value);
        self.writes.set(self.writes.get() + 1);
        self.fire();
    }

    /// Simulate the user dragging the slider to `value`.
    pub fn user_slides(&self, value: u8) {
        if self.value.get() == value {
            return;
        }
        trace!(value, "user slides");
        self.value.set(value);
        self.fire();
    }

    fn fire(&self) {
        let listener = self.listener.borrow().clone();
        if let Some(listener) = listener {
            listener(Some(self.value.get()));
        }
    }

    #[must_use]
    pub fn value(&self) -> u8 {
        self.value.get()
    }

    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }
}

/// [`ViewRegister`] over [`FakeSlider`].
pub struct SliderRegister;

impl ViewRegister<Rc<FakeSlider>, u8> for SliderRegister {
    fn register(&self, view: &Rc<FakeSlider>, on_user_change: UserChangeCallback<u8>) {
        *view.listener.borrow_mut() = Some(on_user_change);
    }

    fn deregister(&self, view: &Rc<FakeSlider>) {
        *view.listener.borrow_mut() = None;
    }

    fn value(&self, view: &Rc<FakeSlider>) -> u8 {
        view.value.get()
    }
}
