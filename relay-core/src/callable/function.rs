use std::{any::TypeId, fmt};

use crate::{Error, GenericCallable, Invocable, NullTarget, Result, Signature, Target};

/// A callable that wraps a free function.
///
/// The function is assigned once at construction. A callable built with
/// [`FunctionCallable::null`] has no function and fails on every invocation.
#[derive(Clone, Copy)]
pub struct FunctionCallable<S: Signature> {
    function: Option<S>,
}

impl<S: Signature> FunctionCallable<S> {
    /// Creates a callable that invokes `function`.
    pub const fn new(function: S) -> Self {
        Self {
            function: Some(function),
        }
    }

    /// Creates a callable with no function.
    pub const fn null() -> Self {
        Self { function: None }
    }

    /// Returns the wrapped function, if any.
    #[must_use]
    pub fn function(&self) -> Option<S> {
        self.function
    }

    /// Returns `true` if this callable wraps `function`.
    #[must_use]
    pub fn matches_function(&self, function: S) -> bool {
        self.matches_function_address(function.address())
    }
}

impl<S: Signature> GenericCallable for FunctionCallable<S> {
    fn target(&self) -> Target {
        Target::Function(self.function.map(S::address))
    }

    fn signature(&self) -> TypeId {
        TypeId::of::<S>()
    }
}

impl<S: Signature> Invocable<S> for FunctionCallable<S> {
    fn invoke(&self, args: S::Args) -> Result<S::Output> {
        let function = self
            .function
            .ok_or(Error::NullTarget(NullTarget::Function))?;
        Ok(function.apply(args))
    }
}

impl<S: Signature> From<S> for FunctionCallable<S> {
    /// Converts a function into a `FunctionCallable`.
    fn from(function: S) -> Self {
        FunctionCallable::new(function)
    }
}

impl<S: Signature> fmt::Debug for FunctionCallable<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionCallable")
            .field("function", &self.function.map(S::address))
            .finish()
    }
}
