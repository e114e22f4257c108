mod bound_method;
mod function;

use std::{any::TypeId, cell::RefCell, fmt, rc::Rc};

use crate::{FnAddress, Result, Signature};

pub use bound_method::BoundMethodCallable;
pub use function::FunctionCallable;

/// Whether a callable wraps a free function or a method bound to an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallableKind {
    Function,
    BoundMethod,
}

/// The identity of a bound instance.
///
/// This is the address of the instance's `Rc` allocation. It stays valid as
/// an identity after the instance is dropped, so a delegate whose instance is
/// gone can still be found and removed by it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceAddress(usize);

impl InstanceAddress {
    pub(crate) fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr as usize)
    }
}

impl<C> From<&Rc<RefCell<C>>> for InstanceAddress {
    fn from(instance: &Rc<RefCell<C>>) -> Self {
        Self::from_ptr(Rc::as_ptr(instance))
    }
}

impl fmt::Debug for InstanceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceAddress({:#x})", self.0)
    }
}

/// What a callable points at, without the ability to call it.
///
/// A `None` address means the callable was built without that part and will
/// fail with [`Error::NullTarget`] when invoked.
///
/// [`Error::NullTarget`]: crate::Error::NullTarget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Function(Option<FnAddress>),
    BoundMethod {
        method: Option<FnAddress>,
        instance: Option<InstanceAddress>,
    },
}

impl Target {
    /// Returns the kind of callable this target belongs to.
    #[must_use]
    pub fn kind(&self) -> CallableKind {
        match self {
            Self::Function(_) => CallableKind::Function,
            Self::BoundMethod { .. } => CallableKind::BoundMethod,
        }
    }

    /// Returns the function address of a function target.
    #[must_use]
    pub fn function_address(&self) -> Option<FnAddress> {
        match self {
            Self::Function(address) => *address,
            Self::BoundMethod { .. } => None,
        }
    }

    /// Returns the method address of a bound-method target.
    #[must_use]
    pub fn method_address(&self) -> Option<FnAddress> {
        match self {
            Self::Function(_) => None,
            Self::BoundMethod { method, .. } => *method,
        }
    }

    /// Returns the instance address of a bound-method target.
    #[must_use]
    pub fn instance_address(&self) -> Option<InstanceAddress> {
        match self {
            Self::Function(_) => None,
            Self::BoundMethod { instance, .. } => *instance,
        }
    }

    /// Returns `true` if both targets call the same code.
    ///
    /// Bound methods are compared by method address only. Two delegates bound
    /// to different instances of the same method are considered the same.
    /// A function target never equals a bound-method target.
    #[must_use]
    pub fn same_method_as(&self, other: &Target) -> bool {
        match (self, other) {
            (Self::Function(a), Self::Function(b)) => a == b,
            (Self::BoundMethod { method: a, .. }, Self::BoundMethod { method: b, .. }) => a == b,
            _ => false,
        }
    }
}

/// The signature-independent view of a callable.
///
/// `GenericCallable` lets callables of different signatures be inspected and
/// compared through one interface. It cannot invoke anything; that requires
/// the typed [`Invocable`] view.
pub trait GenericCallable {
    /// Returns what this callable points at.
    fn target(&self) -> Target;

    /// Returns the `TypeId` of this callable's [`Signature`].
    fn signature(&self) -> TypeId;

    fn kind(&self) -> CallableKind {
        self.target().kind()
    }

    fn is_bound_method(&self) -> bool {
        self.kind() == CallableKind::BoundMethod
    }

    /// Always `false` for function and bound-method callables.
    fn is_deferred(&self) -> bool {
        false
    }

    /// Returns `true` only for a function callable pointing at `address`.
    fn matches_function_address(&self, address: FnAddress) -> bool {
        self.target().function_address() == Some(address)
    }

    /// Returns `true` only for a bound-method callable pointing at `address`.
    fn matches_method_address(&self, address: FnAddress) -> bool {
        self.target().method_address() == Some(address)
    }

    /// Returns `true` only for a bound-method callable bound to `instance`.
    fn matches_instance(&self, instance: InstanceAddress) -> bool {
        self.target().instance_address() == Some(instance)
    }

    /// Returns `true` if `other` has the same signature and calls the same code.
    ///
    /// See [`Target::same_method_as`] for how bound methods compare.
    fn has_same_target_as(&self, other: &dyn GenericCallable) -> bool {
        self.signature() == other.signature() && self.target().same_method_as(&other.target())
    }
}

/// A callable with a fixed signature.
///
/// `Invocable` is the uniform interface over [`FunctionCallable`] and
/// [`BoundMethodCallable`], and the element type of a [`CallableSet`].
/// Arguments arrive packed in the signature's tuple.
///
/// # Example
///
/// ```rust
/// use std::{cell::RefCell, rc::Rc};
///
/// use relay_core::{BoundMethodCallable, FunctionCallable, Invocable};
///
/// type Greet = fn(&'static str) -> String;
///
/// fn hello(name: &'static str) -> String {
///     format!("hello {name}")
/// }
///
/// struct Greeter {
///     greeted: usize,
/// }
///
/// impl Greeter {
///     fn greet(&mut self, name: &'static str) -> String {
///         self.greeted += 1;
///         format!("hi {name} (#{})", self.greeted)
///     }
/// }
///
/// let greeter = Rc::new(RefCell::new(Greeter { greeted: 0 }));
///
/// let callables: Vec<Box<dyn Invocable<Greet>>> = vec![
///     Box::new(FunctionCallable::<Greet>::new(hello)),
///     Box::new(BoundMethodCallable::<_, Greet>::new(&greeter, Greeter::greet)),
/// ];
///
/// let out: Vec<String> = callables
///     .iter()
///     .map(|c| c.invoke(("ada",)))
///     .collect::<Result<_, _>>()
///     .unwrap();
///
/// assert_eq!(out, ["hello ada", "hi ada (#1)"]);
/// ```
///
/// [`CallableSet`]: crate::CallableSet
pub trait Invocable<S: Signature>: GenericCallable {
    /// Calls the target with `args`.
    ///
    /// # Errors
    ///
    /// Returns an error if the target is missing, or if a bound instance has
    /// been dropped or is already borrowed.
    fn invoke(&self, args: S::Args) -> Result<S::Output>;
}

impl<T: GenericCallable + ?Sized> GenericCallable for Box<T> {
    fn target(&self) -> Target {
        (**self).target()
    }

    fn signature(&self) -> TypeId {
        (**self).signature()
    }

    fn is_deferred(&self) -> bool {
        (**self).is_deferred()
    }
}

impl<S: Signature, T: Invocable<S> + ?Sized> Invocable<S> for Box<T> {
    fn invoke(&self, args: S::Args) -> Result<S::Output> {
        (**self).invoke(args)
    }
}
