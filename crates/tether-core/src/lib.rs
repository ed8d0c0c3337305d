#![forbid(unsafe_code)]

//! Observable primitives for the Tether data-binding runtime.
//!
//! This crate provides the leaf building blocks the binding engine in
//! `tether-runtime` is assembled from:
//!
//! - [`CallbackRegistry`]: an ordered callback collection that stays safe
//!   when callbacks remove themselves (or each other) mid-notification.
//! - [`Observable`] / [`ChangeNotifier`]: the change-notification
//!   capability and its reusable implementation.
//! - [`ObservableField`]: a single observable mutable value cell with an
//!   immutable default captured at construction.
//! - [`PropertyKey`]: an opaque, comparable token identifying a named
//!   view-model property for notification routing.
//! - [`ViewModel`]: the seam through which a binding holder discovers
//!   whether a view model publishes property changes at all.
//!
//! # Threading
//!
//! Everything here is single-threaded by design: one logical owner thread
//! per observable graph (the UI/event thread). Handles are `Rc`-based and
//! deliberately `!Send`. Cross-thread mutation must be marshalled onto the
//! owner thread by the embedder before it reaches these types.
//!
//! # Invariants
//!
//! 1. [`ObservableField`] notifies iff the newly assigned value differs
//!    from the previous one (`PartialEq`, not identity).
//! 2. Callbacks fire in registration order within a notification pass.
//! 3. A callback removed during a pass is skipped for the remainder of
//!    that pass and never fires again afterwards.
//! 4. Removing a callback that was never added is a no-op.

pub mod callback_registry;
pub mod field;
pub mod key;
pub mod observable;
pub mod view_model;

pub use callback_registry::CallbackRegistry;
pub use field::{FieldId, ObservableField};
pub use key::PropertyKey;
pub use observable::{ChangeCallback, ChangeNotifier, Observable};
pub use view_model::ViewModel;
