mod queue;

use std::{
    any::{Any, TypeId},
    cell::RefCell,
    fmt,
    rc::Rc,
};

use crate::{BoundMethodCallable, FunctionCallable, Invocable, Result, Signature};

pub use queue::DeferredQueue;

/// A callable bundled with the arguments to call it with.
///
/// `Deferred` captures its arguments by value when it is built, so it does
/// not borrow anything from the place it was created. It can be replayed any
/// number of times; every replay passes a fresh clone of the same captured
/// arguments.
///
/// Any [`Invocable`] can be deferred, including one taken back out of a
/// [`CallableSet`]. The deferred call owns the callable it wraps.
///
/// # Example
///
/// ```rust
/// use relay_core::DeferredCall;
///
/// type Describe = fn(String, f32, f64) -> String;
///
/// fn describe(name: String, a: f32, b: f64) -> String {
///     format!("{name}: {a} {b}")
/// }
///
/// let deferred = DeferredCall::<Describe>::function(describe, ("Foo".into(), 1.5, 2.25));
///
/// assert_eq!(deferred.replay().unwrap(), "Foo: 1.5 2.25");
/// assert_eq!(deferred.replay().unwrap(), "Foo: 1.5 2.25");
/// ```
///
/// [`CallableSet`]: crate::CallableSet
pub struct Deferred<S: Signature, I = Box<dyn Invocable<S>>> {
    callable: I,
    args: S::Args,
}

/// A deferred call to a free function.
pub type DeferredCall<S> = Deferred<S, FunctionCallable<S>>;

/// A deferred call to a method bound to an instance.
pub type DeferredMethodCall<C, S> = Deferred<S, BoundMethodCallable<C, S>>;

impl<S: Signature, I: Invocable<S>> Deferred<S, I> {
    /// Creates a deferred call of `callable` with `args`.
    pub fn new(callable: I, args: S::Args) -> Self {
        Self { callable, args }
    }

    /// Calls the wrapped callable with the captured arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the wrapped callable fails.
    pub fn replay(&self) -> Result<S::Output>
    where
        S::Args: Clone,
    {
        self.callable.invoke(self.args.clone())
    }

    /// Calls the wrapped callable and discards its return value.
    ///
    /// # Errors
    ///
    /// Returns an error if the wrapped callable fails.
    pub fn dispatch(&self) -> Result<()>
    where
        S::Args: Clone,
    {
        self.replay().map(drop)
    }

    /// Returns the captured arguments.
    #[must_use]
    pub fn args(&self) -> &S::Args {
        &self.args
    }

    /// Returns the wrapped callable.
    #[must_use]
    pub fn callable(&self) -> &I {
        &self.callable
    }

    /// Splits the deferred call into its callable and arguments.
    #[must_use]
    pub fn into_parts(self) -> (I, S::Args) {
        (self.callable, self.args)
    }
}

impl<S: Signature> Deferred<S, FunctionCallable<S>> {
    /// Creates a deferred call of `function` with `args`.
    pub fn function(function: S, args: S::Args) -> Self {
        Self::new(FunctionCallable::new(function), args)
    }
}

impl<C: 'static, S: Signature> Deferred<S, BoundMethodCallable<C, S>> {
    /// Creates a deferred call of `method` on `instance` with `args`.
    ///
    /// The deferred call does not keep `instance` alive.
    pub fn method(instance: &Rc<RefCell<C>>, method: S::Method<C>, args: S::Args) -> Self {
        Self::new(BoundMethodCallable::new(instance, method), args)
    }
}

impl<S, I> Clone for Deferred<S, I>
where
    S: Signature,
    S::Args: Clone,
    I: Clone,
{
    fn clone(&self) -> Self {
        Self {
            callable: self.callable.clone(),
            args: self.args.clone(),
        }
    }
}

impl<S, I> fmt::Debug for Deferred<S, I>
where
    S: Signature,
    S::Args: fmt::Debug,
    I: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("callable", &self.callable)
            .field("args", &self.args)
            .finish()
    }
}

/// The signature-independent view of a deferred call.
///
/// Deferred calls of different signatures can be stored together as
/// `Box<dyn GenericDeferred>` and dispatched without knowing their types.
/// The typed deferred call is recovered with a checked downcast.
///
/// ```rust
/// use relay_core::{DeferredCall, GenericDeferred};
///
/// type Count = fn(u32) -> u32;
/// type Log = fn(&'static str);
///
/// fn inc(x: u32) -> u32 {
///     x + 1
/// }
///
/// fn log(_: &'static str) {}
///
/// let pending: Vec<Box<dyn GenericDeferred>> = vec![
///     Box::new(DeferredCall::<Count>::function(inc, (1,))),
///     Box::new(DeferredCall::<Log>::function(log, ("done",))),
/// ];
///
/// for deferred in &pending {
///     deferred.dispatch_erased().unwrap();
/// }
///
/// let count = pending[0].downcast_ref::<DeferredCall<Count>>().unwrap();
/// assert_eq!(count.replay().unwrap(), 2);
/// assert!(pending[1].downcast_ref::<DeferredCall<Count>>().is_none());
/// ```
pub trait GenericDeferred: Any {
    /// Replays the deferred call and discards its return value.
    ///
    /// # Errors
    ///
    /// Returns an error if the wrapped callable fails.
    fn dispatch_erased(&self) -> Result<()>;

    /// Returns the `TypeId` of the wrapped callable's [`Signature`].
    fn signature(&self) -> TypeId;

    fn as_any(&self) -> &dyn Any;
}

impl dyn GenericDeferred {
    /// Returns `true` if the deferred call is a `T`.
    #[must_use]
    pub fn is<T: GenericDeferred>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Returns the deferred call as a `T`, if it is one.
    #[must_use]
    pub fn downcast_ref<T: GenericDeferred>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

impl<S, I> GenericDeferred for Deferred<S, I>
where
    S: Signature,
    S::Args: Clone + 'static,
    I: Invocable<S> + 'static,
{
    fn dispatch_erased(&self) -> Result<()> {
        self.dispatch()
    }

    fn signature(&self) -> TypeId {
        TypeId::of::<S>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
