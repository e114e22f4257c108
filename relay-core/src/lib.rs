//! Typed delegates for Relay.
//!
//! This crate wraps free functions and methods bound to an instance behind
//! one invocable interface, and collects them into sets that are invoked as
//! a group:
//!
//! - [`Signature`] — a function-pointer type naming a delegate's parameters
//!   and return type
//! - [`Invocable`] — something callable with a given signature, implemented
//!   by [`FunctionCallable`] and [`BoundMethodCallable`]
//! - [`CallableSet`] — an owned, ordered collection of invocables with bulk
//!   invocation and removal by function, method, instance, or id
//! - [`Deferred`] — a callable bundled with captured arguments, replayed
//!   later with no input; [`DeferredQueue`] holds them regardless of signature
//!
//! Bound methods never keep their instance alive. Instances are shared as
//! `Rc<RefCell<C>>` and delegates hold a `Weak`, so invoking a method on a
//! dropped instance is an [`Error`] rather than a dangling access.
//!
//! Nothing here is thread-safe; callers that share a set across threads must
//! provide their own synchronization.

macro_rules! trace {
    ($($arg:tt)*) => {{
        #[cfg(feature = "log")]
        ::log::trace!($($arg)*);
    }};
}

macro_rules! debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "log")]
        ::log::debug!($($arg)*);
    }};
}

pub(crate) use {debug, trace};

mod callable;
mod deferred;
mod error;
mod set;
mod signature;

pub use callable::{
    BoundMethodCallable, CallableKind, FunctionCallable, GenericCallable, InstanceAddress,
    Invocable, Target,
};
pub use deferred::{Deferred, DeferredCall, DeferredMethodCall, DeferredQueue, GenericDeferred};
pub use error::{Error, NullTarget, Result};
pub use set::{CallableId, CallableSet, Iter};
pub use signature::{FnAddress, Signature};
