#![forbid(unsafe_code)]

//! Binding runtime for Tether: expressions, lifecycle, and the holder.
//!
//! This crate provides:
//! - [`BindingHolder`] owning a view model and every binding attached to it
//! - One-way ([`OneWayBinding`]), two-way ([`TwoWayBinding`]) and
//!   one-way-to-source ([`OneWayToSource`]) binding kinds
//! - [`ViewRegister`] for adapting widget toolkits to the reverse leg
//! - [`Scheduler`] for routing view application onto a UI thread
//!
//! Everything here is single-threaded by construction (`Rc`/`RefCell`);
//! cross-thread marshalling belongs in the [`Scheduler`] a host installs.

mod binding;
mod convert;
mod holder;
mod one_way;
mod source;
mod two_way;
mod view;

pub use binding::Binding;
pub use holder::BindingHolder;
pub use one_way::{BindSource, OneWayBinding, OneWayExpr};
pub use source::{OneWayToSource, SourceExpr, ViewSource};
pub use two_way::{InverseSetter, TwoWayBinding, TwoWayExpr};
pub use view::{Scheduler, UserChangeCallback, ViewRegister};
