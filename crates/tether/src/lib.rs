#![forbid(unsafe_code)]

//! Tether: declarative data binding between view models and widgets.
//!
//! A view model exposes [`ObservableField`]s (or a [`ChangeNotifier`]
//! with [`PropertyKey`]-addressed properties); a [`BindingHolder`] owns
//! the view model and a set of binding expressions that keep widgets and
//! model state in sync. Bindings come in three kinds: one-way (model to
//! view), two-way (both directions with echo suppression), and
//! one-way-to-source (view to model only).
//!
//! ```
//! use std::rc::Rc;
//! use tether::prelude::*;
//! use tether_harness::{FakeTextInput, TextInputRegister};
//!
//! struct SignupVm {
//!     email: ObservableField<String>,
//! }
//! impl ViewModel for SignupVm {}
//!
//! let holder = BindingHolder::new(Some(SignupVm {
//!     email: ObservableField::new(String::new()),
//! }));
//!
//! let input = FakeTextInput::new("");
//! let _binding = holder
//!     .bind_field(|vm: &SignupVm| vm.email.clone())
//!     .on_self()
//!     .to_view(Rc::clone(&input), |input, text| {
//!         input.set_text_if_changed(text);
//!     })
//!     .two_way(TextInputRegister)
//!     .to_field();
//!
//! holder.bind_all();
//! input.user_types("mia@example.com");
//! assert_eq!(
//!     holder.with_view_model(|vm| vm.unwrap().email.get()),
//!     "mia@example.com"
//! );
//! holder.unbind_all();
//! ```

pub use tether_core::{
    CallbackRegistry, ChangeCallback, ChangeNotifier, FieldId, Observable, ObservableField,
    PropertyKey, ViewModel,
};

#[cfg(feature = "runtime")]
pub use tether_runtime::{
    BindSource, Binding, BindingHolder, InverseSetter, OneWayBinding, OneWayExpr, OneWayToSource,
    Scheduler, SourceExpr, TwoWayBinding, TwoWayExpr, UserChangeCallback, ViewRegister, ViewSource,
};

/// Everything a binding-holder embedder usually needs.
pub mod prelude {
    pub use tether_core::{ChangeNotifier, Observable, ObservableField, PropertyKey, ViewModel};

    #[cfg(feature = "runtime")]
    pub use tether_runtime::{Binding, BindingHolder, Scheduler, ViewRegister};
}
