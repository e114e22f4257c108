use std::{cell::RefCell, fmt, ops::AddAssign, rc::Rc};

use crate::{
    BoundMethodCallable, FnAddress, FunctionCallable, GenericCallable, InstanceAddress, Invocable,
    Result, Signature,
};

/// The identity of a callable inside a [`CallableSet`].
///
/// Every insertion hands out a new id. Ids are never reused by the set that
/// issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallableId(u64);

/// An owned, ordered collection of callables sharing one signature.
///
/// The set owns every callable inserted into it and drops them when they are
/// removed with a `remove_*` method or when the set itself is dropped. The
/// `take_*` methods remove callables without dropping them and hand ownership
/// back to the caller.
///
/// Callables are invoked in insertion order. A bulk invocation stops at the
/// first callable that fails and returns that error; callables after it are
/// not invoked.
///
/// # Example
///
/// ```rust
/// use std::{cell::RefCell, collections::BTreeSet, rc::Rc};
///
/// use relay_core::CallableSet;
///
/// type OnEvent = fn(&'static str, f32, f64) -> u32;
///
/// fn five(_: &'static str, _: f32, _: f64) -> u32 {
///     5
/// }
///
/// struct Listener;
///
/// impl Listener {
///     fn on_event(&mut self, _: &'static str, _: f32, _: f64) -> u32 {
///         2
///     }
/// }
///
/// let listener = Rc::new(RefCell::new(Listener));
///
/// let mut set = CallableSet::<OnEvent>::new();
/// set.add_function(five);
/// set.add_bound_method(&listener, Listener::on_event);
/// set.add_function(five);
///
/// let mut all = Vec::new();
/// set.invoke_collecting(&mut all, ("Foo", 1.5, 2.25)).unwrap();
/// assert_eq!(all, [5, 2, 5]);
///
/// let mut distinct = BTreeSet::new();
/// set.invoke_collecting(&mut distinct, ("Foo", 1.5, 2.25)).unwrap();
/// assert_eq!(distinct.into_iter().collect::<Vec<_>>(), [2, 5]);
///
/// assert_eq!(set.remove_by_function(five), 2);
/// assert_eq!(set.len(), 1);
/// ```
pub struct CallableSet<S: Signature> {
    entries: Vec<Entry<S>>,
    next_id: u64,
}

struct Entry<S: Signature> {
    id: CallableId,
    callable: Box<dyn Invocable<S>>,
}

impl<S: Signature> CallableSet<S> {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Returns the number of callables in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the set holds no callables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if the callable with `id` is still in the set.
    #[must_use]
    pub fn contains(&self, id: CallableId) -> bool {
        self.position(id).is_some()
    }

    /// Adds a callable to the end of the set and takes ownership of it.
    pub fn add<I>(&mut self, callable: I) -> CallableId
    where
        I: Invocable<S> + 'static,
    {
        self.add_boxed(Box::new(callable))
    }

    /// Adds an already boxed callable to the end of the set.
    pub fn add_boxed(&mut self, callable: Box<dyn Invocable<S>>) -> CallableId {
        let index = self.entries.len();
        self.insert_boxed(index, callable)
    }

    /// Inserts a callable at `index`, shifting later callables back.
    ///
    /// An `index` past the end appends.
    pub fn insert<I>(&mut self, index: usize, callable: I) -> CallableId
    where
        I: Invocable<S> + 'static,
    {
        self.insert_boxed(index, Box::new(callable))
    }

    /// Inserts an already boxed callable at `index`.
    pub fn insert_boxed(&mut self, index: usize, callable: Box<dyn Invocable<S>>) -> CallableId {
        let id = CallableId(self.next_id);
        self.next_id += 1;

        crate::trace!("adding {:?} as {id:?}", callable.target());

        let index = index.min(self.entries.len());
        self.entries.insert(index, Entry { id, callable });
        id
    }

    /// Wraps `function` in a [`FunctionCallable`] and adds it.
    pub fn add_function(&mut self, function: S) -> CallableId {
        self.add(FunctionCallable::new(function))
    }

    /// Wraps `method` bound to `instance` in a [`BoundMethodCallable`] and adds it.
    ///
    /// The set does not keep `instance` alive.
    pub fn add_bound_method<C: 'static>(
        &mut self,
        instance: &Rc<RefCell<C>>,
        method: S::Method<C>,
    ) -> CallableId {
        self.add(BoundMethodCallable::<C, S>::new(instance, method))
    }

    /// Invokes every callable in order, discarding return values.
    ///
    /// # Errors
    ///
    /// Returns the error of the first callable that fails. Callables after it
    /// are not invoked.
    pub fn invoke_all(&self, args: S::Args) -> Result<()>
    where
        S::Args: Clone,
    {
        for entry in &self.entries {
            entry.callable.invoke(args.clone())?;
        }
        Ok(())
    }

    /// Invokes every callable in order, extending `out` with each return value.
    ///
    /// `out` decides what happens to duplicates: a `Vec` keeps one value per
    /// callable, a `BTreeSet` or `HashSet` keeps one per distinct value.
    ///
    /// # Errors
    ///
    /// Returns the error of the first callable that fails. Values returned
    /// before the failure remain in `out`.
    pub fn invoke_collecting<E>(&self, out: &mut E, args: S::Args) -> Result<()>
    where
        S::Args: Clone,
        E: Extend<S::Output>,
    {
        for entry in &self.entries {
            let value = entry.callable.invoke(args.clone())?;
            out.extend(Some(value));
        }
        Ok(())
    }

    /// Removes and drops every function callable wrapping `function`.
    ///
    /// Returns the number of callables removed. Matching is by address, and
    /// optimized builds may merge functions with identical bodies, so a
    /// distinct function that was merged with `function` is removed too.
    pub fn remove_by_function(&mut self, function: S) -> usize {
        self.take_by_function(function).len()
    }

    /// Removes every function callable wrapping `function` and returns them.
    ///
    /// Like [`remove_by_function`](Self::remove_by_function), this also takes
    /// callables whose function was merged with `function` by the compiler.
    pub fn take_by_function(&mut self, function: S) -> Vec<Box<dyn Invocable<S>>> {
        let address = function.address();
        self.take_where(|callable| callable.matches_function_address(address))
    }

    /// Removes and drops every bound-method callable wrapping `method`,
    /// regardless of the instance it is bound to.
    ///
    /// Returns the number of callables removed.
    pub fn remove_by_method<C: 'static>(&mut self, method: S::Method<C>) -> usize {
        self.take_by_method::<C>(method).len()
    }

    /// Removes every bound-method callable wrapping `method` and returns them.
    pub fn take_by_method<C: 'static>(&mut self, method: S::Method<C>) -> Vec<Box<dyn Invocable<S>>> {
        self.take_by_method_address(S::method_address::<C>(method))
    }

    /// Removes every bound-method callable whose method is at `address`.
    pub fn take_by_method_address(&mut self, address: FnAddress) -> Vec<Box<dyn Invocable<S>>> {
        self.take_where(|callable| callable.matches_method_address(address))
    }

    /// Removes and drops every bound-method callable bound to `instance`.
    ///
    /// Returns the number of callables removed.
    pub fn remove_by_instance<C>(&mut self, instance: &Rc<RefCell<C>>) -> usize {
        self.take_by_instance(instance).len()
    }

    /// Removes every bound-method callable bound to `instance` and returns them.
    pub fn take_by_instance<C>(&mut self, instance: &Rc<RefCell<C>>) -> Vec<Box<dyn Invocable<S>>> {
        self.take_by_instance_address(InstanceAddress::from(instance))
    }

    /// Removes every bound-method callable bound to the instance at `address`.
    ///
    /// Unlike [`take_by_instance`](Self::take_by_instance), this works after
    /// the instance has been dropped.
    pub fn take_by_instance_address(
        &mut self,
        address: InstanceAddress,
    ) -> Vec<Box<dyn Invocable<S>>> {
        self.take_where(|callable| callable.matches_instance(address))
    }

    /// Removes and drops the callable with `id`.
    ///
    /// Returns `false` if no callable in the set has that id.
    pub fn remove(&mut self, id: CallableId) -> bool {
        self.take(id).is_some()
    }

    /// Removes the callable with `id` and returns it.
    ///
    /// The returned callable is the same allocation that was added and can
    /// still be invoked.
    pub fn take(&mut self, id: CallableId) -> Option<Box<dyn Invocable<S>>> {
        let index = self.position(id)?;
        let entry = self.entries.remove(index);
        crate::trace!("removed {id:?}");
        Some(entry.callable)
    }

    /// Returns the callable with `id`.
    #[must_use]
    pub fn get(&self, id: CallableId) -> Option<&dyn Invocable<S>> {
        self.position(id)
            .map(|index| self.entries[index].callable.as_ref())
    }

    /// Removes and drops every callable.
    pub fn clear(&mut self) {
        crate::trace!("clearing {} callables", self.entries.len());
        self.entries.clear();
    }

    /// Returns an iterator over the callables in invocation order.
    pub fn iter(&self) -> Iter<'_, S> {
        Iter {
            inner: self.entries.iter(),
        }
    }

    /// Returns an iterator over the ids and callables in invocation order.
    pub fn entries(&self) -> impl Iterator<Item = (CallableId, &dyn Invocable<S>)> {
        self.entries
            .iter()
            .map(|entry| (entry.id, entry.callable.as_ref()))
    }

    fn position(&self, id: CallableId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    fn take_where<P>(&mut self, mut matches: P) -> Vec<Box<dyn Invocable<S>>>
    where
        P: FnMut(&dyn Invocable<S>) -> bool,
    {
        let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|entry| matches(entry.callable.as_ref()));
        self.entries = kept;

        if !taken.is_empty() {
            crate::debug!("removed {} callables", taken.len());
        }

        taken.into_iter().map(|entry| entry.callable).collect()
    }
}

impl<S: Signature> Default for CallableSet<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Signature> fmt::Debug for CallableSet<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.entries
                    .iter()
                    .map(|entry| (entry.id, entry.callable.target())),
            )
            .finish()
    }
}

impl<S: Signature, I: Invocable<S> + 'static> AddAssign<I> for CallableSet<S> {
    fn add_assign(&mut self, callable: I) {
        self.add(callable);
    }
}

impl<S: Signature> Extend<Box<dyn Invocable<S>>> for CallableSet<S> {
    fn extend<T: IntoIterator<Item = Box<dyn Invocable<S>>>>(&mut self, iter: T) {
        for callable in iter {
            self.add_boxed(callable);
        }
    }
}

/// An iterator over the callables of a [`CallableSet`].
///
/// The set cannot be modified while this iterator is alive.
pub struct Iter<'a, S: Signature> {
    inner: std::slice::Iter<'a, Entry<S>>,
}

impl<'a, S: Signature> Iterator for Iter<'a, S> {
    type Item = &'a dyn Invocable<S>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|entry| entry.callable.as_ref())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<S: Signature> ExactSizeIterator for Iter<'_, S> {}

impl<'a, S: Signature> IntoIterator for &'a CallableSet<S> {
    type Item = &'a dyn Invocable<S>;
    type IntoIter = Iter<'a, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::{Error, NullTarget};

    type Event = fn(i32) -> i32;

    fn identity(x: i32) -> i32 {
        x
    }

    fn double(x: i32) -> i32 {
        x * 2
    }

    struct Recorder {
        seen: Vec<i32>,
        offset: i32,
    }

    impl Recorder {
        fn record(&mut self, x: i32) -> i32 {
            self.seen.push(x);
            x + self.offset
        }

        fn other(&mut self, x: i32) -> i32 {
            x - self.offset
        }
    }

    fn recorder(offset: i32) -> Rc<RefCell<Recorder>> {
        Rc::new(RefCell::new(Recorder {
            seen: Vec::new(),
            offset,
        }))
    }

    #[test]
    fn invokes_in_insertion_order() {
        let a = recorder(100);
        let b = recorder(200);

        let mut set = CallableSet::<Event>::new();
        set.add_bound_method(&b, Recorder::record);
        set.add_function(double);
        set.add_bound_method(&a, Recorder::record);

        let mut out = Vec::new();
        set.invoke_collecting(&mut out, (1,)).unwrap();

        assert_eq!(out, [201, 2, 101]);
        assert_eq!(a.borrow().seen, [1]);
        assert_eq!(b.borrow().seen, [1]);
    }

    #[test]
    fn invoke_all_calls_every_member() {
        let a = recorder(0);

        let mut set = CallableSet::<Event>::new();
        set.add_bound_method(&a, Recorder::record);
        set.add_bound_method(&a, Recorder::record);

        set.invoke_all((7,)).unwrap();
        assert_eq!(a.borrow().seen, [7, 7]);
    }

    #[test]
    fn collecting_into_a_set_collapses_duplicates() {
        let mut set = CallableSet::<Event>::new();
        set.add_function(identity);
        set.add_function(identity);
        set.add_function(double);

        let mut out = BTreeSet::new();
        set.invoke_collecting(&mut out, (3,)).unwrap();

        assert_eq!(out.into_iter().collect::<Vec<_>>(), [3, 6]);
    }

    #[test]
    fn first_failure_stops_the_loop() {
        let a = recorder(0);

        let mut set = CallableSet::<Event>::new();
        set.add_function(identity);
        set.add(FunctionCallable::<Event>::null());
        set.add_bound_method(&a, Recorder::record);

        let mut out = Vec::new();
        let result = set.invoke_collecting(&mut out, (4,));

        assert_eq!(result, Err(Error::NullTarget(NullTarget::Function)));
        assert_eq!(out, [4]);
        assert!(a.borrow().seen.is_empty());
    }

    #[test]
    fn invoke_all_stops_at_first_failure() {
        let a = recorder(0);

        let mut set = CallableSet::<Event>::new();
        set.add(FunctionCallable::<Event>::null());
        set.add_bound_method(&a, Recorder::record);

        assert_eq!(
            set.invoke_all((6,)),
            Err(Error::NullTarget(NullTarget::Function))
        );
        assert!(a.borrow().seen.is_empty());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn extend_appends_boxed_callables() {
        let a = recorder(100);

        let mut set = CallableSet::<Event>::new();
        set.add_function(identity);
        set.extend([
            Box::new(FunctionCallable::<Event>::new(double)) as Box<dyn Invocable<Event>>,
            Box::new(BoundMethodCallable::<_, Event>::new(&a, Recorder::record)),
        ]);

        let mut out = Vec::new();
        set.invoke_collecting(&mut out, (2,)).unwrap();
        assert_eq!(out, [2, 4, 102]);
        assert_eq!(set.entries().count(), 3);
    }

    #[test]
    fn clear_drops_every_member() {
        let a = recorder(0);

        let mut set = CallableSet::<Event>::new();
        let id = set.add_bound_method(&a, Recorder::record);
        set.add_function(identity);
        assert_eq!(Rc::weak_count(&a), 1);

        set.clear();

        assert!(set.is_empty());
        assert!(!set.contains(id));
        assert_eq!(Rc::weak_count(&a), 0);
        assert_eq!(set.invoke_all((1,)), Ok(()));
        assert!(a.borrow().seen.is_empty());
    }

    #[test]
    fn remove_by_function_leaves_other_members() {
        let a = recorder(0);

        let mut set = CallableSet::<Event>::new();
        set.add_function(identity);
        set.add_bound_method(&a, Recorder::record);
        set.add_function(identity);
        set.add_function(double);

        assert_eq!(set.remove_by_function(identity), 2);
        assert_eq!(set.len(), 2);
        assert!(set.iter().all(|c| !c.matches_function_address((identity as Event).address())));

        let mut out = Vec::new();
        set.invoke_collecting(&mut out, (5,)).unwrap();
        assert_eq!(out, [5, 10]);
    }

    #[test]
    fn remove_by_method_ignores_instance() {
        let a = recorder(1);
        let b = recorder(2);

        let mut set = CallableSet::<Event>::new();
        set.add_bound_method(&a, Recorder::record);
        set.add_bound_method(&b, Recorder::record);
        set.add_bound_method(&a, Recorder::other);
        set.add_function(identity);

        assert_eq!(set.remove_by_method::<Recorder>(Recorder::record), 2);
        assert_eq!(set.len(), 2);

        let mut out = Vec::new();
        set.invoke_collecting(&mut out, (10,)).unwrap();
        assert_eq!(out, [9, 10]);
    }

    #[test]
    fn remove_by_instance_only_matches_that_instance() {
        let a = recorder(1);
        let b = recorder(2);

        let mut set = CallableSet::<Event>::new();
        set.add_bound_method(&a, Recorder::record);
        set.add_bound_method(&b, Recorder::record);
        set.add_bound_method(&a, Recorder::other);
        set.add_function(identity);

        assert_eq!(set.remove_by_instance(&a), 2);
        assert_eq!(set.len(), 2);

        set.invoke_all((3,)).unwrap();
        assert!(a.borrow().seen.is_empty());
        assert_eq!(b.borrow().seen, [3]);
    }

    #[test]
    fn take_returns_the_added_callable() {
        let a = recorder(0);
        let callable: Box<dyn Invocable<Event>> =
            Box::new(BoundMethodCallable::<_, Event>::new(&a, Recorder::record));
        let address = std::ptr::from_ref(callable.as_ref()).cast::<()>();

        let mut set = CallableSet::<Event>::new();
        set.add_function(double);
        let id = set.add_boxed(callable);

        let taken = set.take(id).expect("callable is in the set");
        assert_eq!(std::ptr::from_ref(taken.as_ref()).cast::<()>(), address);
        assert!(!set.contains(id));
        assert_eq!(set.len(), 1);

        assert_eq!(taken.invoke((8,)), Ok(8));
        assert_eq!(a.borrow().seen, [8]);

        assert!(set.take(id).is_none());
        assert!(!set.remove(id));
    }

    #[test]
    fn take_by_instance_hands_back_ownership() {
        let a = recorder(0);

        let mut set = CallableSet::<Event>::new();
        set.add_bound_method(&a, Recorder::record);
        set.add_function(double);

        let taken = set.take_by_instance(&a);
        assert_eq!(taken.len(), 1);
        assert_eq!(set.len(), 1);

        assert_eq!(taken[0].invoke((2,)), Ok(2));
        assert_eq!(a.borrow().seen, [2]);
    }

    #[test]
    fn dropped_instances_can_still_be_removed() {
        let a = recorder(0);
        let address = InstanceAddress::from(&a);

        let mut set = CallableSet::<Event>::new();
        set.add_bound_method(&a, Recorder::record);
        drop(a);

        assert_eq!(set.invoke_all((1,)), Err(Error::InstanceDropped));
        assert_eq!(set.take_by_instance_address(address).len(), 1);
        assert!(set.is_empty());
    }

    #[test]
    fn insert_and_add_assign() {
        let mut set = CallableSet::<Event>::new();
        set += FunctionCallable::<Event>::new(double);
        set.insert(0, FunctionCallable::<Event>::new(identity));
        set.insert(99, FunctionCallable::<Event>::new(identity));

        let mut out = Vec::new();
        set.invoke_collecting(&mut out, (4,)).unwrap();
        assert_eq!(out, [4, 8, 4]);
    }

    #[test]
    fn iteration_is_restartable() {
        let mut set = CallableSet::<Event>::new();
        set.add_function(identity);
        set.add_function(double);

        let first: Vec<i32> = set.iter().map(|c| c.invoke((3,)).unwrap()).collect();
        let mut second = Vec::new();
        for callable in &set {
            second.push(callable.invoke((3,)).unwrap());
        }

        assert_eq!(first, [3, 6]);
        assert_eq!(first, second);
        assert_eq!(set.iter().len(), 2);
    }

    #[test]
    fn ids_are_not_reused() {
        let mut set = CallableSet::<Event>::new();
        let first = set.add_function(identity);
        assert!(set.remove(first));
        let second = set.add_function(identity);

        assert_ne!(first, second);
        assert!(set.get(second).is_some());
        assert!(set.get(first).is_none());
    }

    #[test]
    fn dropping_the_set_drops_members() {
        let a = recorder(0);
        let callable = BoundMethodCallable::<_, Event>::new(&a, Recorder::record);

        let weak_count_before = Rc::weak_count(&a);
        {
            let mut set = CallableSet::<Event>::new();
            set.add(callable);
            set.add_bound_method(&a, Recorder::record);
            assert_eq!(Rc::weak_count(&a), weak_count_before + 1);
        }
        assert_eq!(Rc::weak_count(&a), 0);
    }
}
