use std::{
    any::TypeId,
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

use crate::{
    Error, GenericCallable, InstanceAddress, Invocable, NullTarget, Result, Signature, Target,
};

/// A callable that invokes a method on a specific instance.
///
/// The instance is held through a [`Weak`] reference and is never kept alive
/// by the callable. Invoking after the instance has been dropped fails with
/// [`Error::InstanceDropped`]. The method receives the instance through a
/// mutable borrow of its `RefCell`, so a method that invokes a delegate bound
/// to its own instance fails with [`Error::InstanceBusy`].
///
/// Methods take `&mut self`. A `&self` method is bound through a
/// non-capturing closure, which still takes the exclusive borrow:
///
/// ```rust
/// use std::{cell::RefCell, rc::Rc};
///
/// use relay_core::{BoundMethodCallable, Invocable};
///
/// type Peek = fn(u32) -> u32;
///
/// struct Gauge {
///     level: u32,
/// }
///
/// impl Gauge {
///     fn read(&self, offset: u32) -> u32 {
///         self.level + offset
///     }
/// }
///
/// let gauge = Rc::new(RefCell::new(Gauge { level: 40 }));
/// let callable =
///     BoundMethodCallable::<Gauge, Peek>::new(&gauge, |g: &mut Gauge, x: u32| g.read(x));
///
/// assert_eq!(callable.invoke((2,)), Ok(42));
/// ```
pub struct BoundMethodCallable<C: 'static, S: Signature> {
    instance: Option<Weak<RefCell<C>>>,
    method: Option<S::Method<C>>,
}

impl<C: 'static, S: Signature> BoundMethodCallable<C, S> {
    /// Creates a callable that invokes `method` on `instance`.
    pub fn new(instance: &Rc<RefCell<C>>, method: S::Method<C>) -> Self {
        Self {
            instance: Some(Rc::downgrade(instance)),
            method: Some(method),
        }
    }

    /// Creates a callable with a method but no instance.
    pub fn unbound(method: S::Method<C>) -> Self {
        Self {
            instance: None,
            method: Some(method),
        }
    }

    /// Creates a callable bound to `instance` with no method.
    pub fn without_method(instance: &Rc<RefCell<C>>) -> Self {
        Self {
            instance: Some(Rc::downgrade(instance)),
            method: None,
        }
    }

    /// Returns the bound instance if it is still alive.
    #[must_use]
    pub fn instance(&self) -> Option<Rc<RefCell<C>>> {
        self.instance.as_ref().and_then(Weak::upgrade)
    }

    /// Returns the wrapped method, if any.
    #[must_use]
    pub fn method(&self) -> Option<S::Method<C>> {
        self.method
    }

    /// Returns `true` if this callable wraps `method`, on any instance.
    #[must_use]
    pub fn matches_method(&self, method: S::Method<C>) -> bool {
        self.matches_method_address(S::method_address::<C>(method))
    }

    /// Returns `true` if this callable is bound to `instance`.
    #[must_use]
    pub fn is_bound_to(&self, instance: &Rc<RefCell<C>>) -> bool {
        self.matches_instance(InstanceAddress::from(instance))
    }
}

impl<C: 'static, S: Signature> GenericCallable for BoundMethodCallable<C, S> {
    fn target(&self) -> Target {
        Target::BoundMethod {
            method: self.method.map(S::method_address::<C>),
            instance: self
                .instance
                .as_ref()
                .map(|weak| InstanceAddress::from_ptr(weak.as_ptr())),
        }
    }

    fn signature(&self) -> TypeId {
        TypeId::of::<S>()
    }
}

impl<C: 'static, S: Signature> Invocable<S> for BoundMethodCallable<C, S> {
    fn invoke(&self, args: S::Args) -> Result<S::Output> {
        let weak = self
            .instance
            .as_ref()
            .ok_or(Error::NullTarget(NullTarget::Instance))?;
        let method = self.method.ok_or(Error::NullTarget(NullTarget::Method))?;

        let instance = weak.upgrade().ok_or(Error::InstanceDropped)?;
        let mut this = instance
            .try_borrow_mut()
            .map_err(|_| Error::InstanceBusy)?;

        Ok(S::apply_method::<C>(method, &mut *this, args))
    }
}

impl<C: 'static, S: Signature> Clone for BoundMethodCallable<C, S> {
    fn clone(&self) -> Self {
        Self {
            instance: self.instance.clone(),
            method: self.method,
        }
    }
}

impl<C: 'static, S: Signature> fmt::Debug for BoundMethodCallable<C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = self.target();
        f.debug_struct("BoundMethodCallable")
            .field("instance", &target.instance_address())
            .field("method", &target.method_address())
            .field("alive", &self.instance().is_some())
            .finish()
    }
}
