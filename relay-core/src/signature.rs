use std::fmt;

/// A function-pointer type that names the shape of a delegate.
///
/// `Signature` is what the rest of the crate is generic over. It is
/// implemented for plain function pointers of up to eight parameters, so a
/// delegate that takes a name and two floats and returns a count is written
/// as `fn(String, f32, f64) -> u32`.
///
/// Each signature also names the matching method-pointer type,
/// [`Signature::Method`], which takes the receiver as an explicit first
/// parameter: `fn(&mut C, String, f32, f64) -> u32`. Inherent methods taking
/// `&mut self` coerce to it directly.
///
/// Parameters are packed into a tuple, [`Signature::Args`], so that a
/// delegate can forward them without knowing their arity.
///
/// # Example
///
/// ```rust
/// use relay_core::Signature;
///
/// fn scale(value: i32, factor: i32) -> i32 {
///     value * factor
/// }
///
/// type Scale = fn(i32, i32) -> i32;
///
/// let f: Scale = scale;
/// assert_eq!(f.apply((6, 7)), 42);
/// assert_eq!(f.address(), (scale as Scale).address());
/// ```
///
/// # Borrowed parameters
///
/// A signature must be `'static` and name each parameter type exactly. A
/// parameter written `&Event` makes the pointer type higher-ranked
/// (`for<'a> fn(&'a Event) -> u32`), and that type has no `Signature` impl:
///
/// ```compile_fail
/// use relay_core::CallableSet;
///
/// struct Event;
///
/// let set = CallableSet::<fn(&Event) -> u32>::new();
/// ```
///
/// Share borrowed data through an `Rc` instead, or use `&'static` data:
///
/// ```rust
/// use std::rc::Rc;
///
/// use relay_core::CallableSet;
///
/// struct Event {
///     code: u32,
/// }
///
/// fn code(event: Rc<Event>) -> u32 {
///     event.code
/// }
///
/// let mut set = CallableSet::<fn(Rc<Event>) -> u32>::new();
/// set.add_function(code);
///
/// let mut out = Vec::new();
/// set.invoke_collecting(&mut out, (Rc::new(Event { code: 7 }),)).unwrap();
/// assert_eq!(out, [7]);
/// ```
pub trait Signature: Copy + 'static {
    /// The parameters, packed into a tuple.
    type Args;

    /// The return type.
    type Output;

    /// The method-pointer type with a receiver of type `C`.
    type Method<C: 'static>: Copy + 'static;

    /// Calls the function with unpacked arguments.
    fn apply(self, args: Self::Args) -> Self::Output;

    /// Calls `method` on `this` with unpacked arguments.
    fn apply_method<C: 'static>(
        method: Self::Method<C>,
        this: &mut C,
        args: Self::Args,
    ) -> Self::Output;

    /// Returns the address of the function.
    fn address(self) -> FnAddress;

    /// Returns the address of a method pointer.
    fn method_address<C: 'static>(method: Self::Method<C>) -> FnAddress;
}

/// The address of a function or method pointer.
///
/// Addresses are only used for identity: two callables that point at the same
/// code compare equal. The compiler may merge identical functions, in which
/// case distinct functions can share an address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FnAddress(usize);

impl fmt::Debug for FnAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FnAddress({:#x})", self.0)
    }
}

macro_rules! signature {
    ($($arg:ident: $ty:ident),*) => {
        impl<R: 'static, $($ty: 'static),*> Signature for fn($($ty),*) -> R {
            type Args = ($($ty,)*);
            type Output = R;
            type Method<C: 'static> = fn(&mut C, $($ty),*) -> R;

            #[inline]
            fn apply(self, ($($arg,)*): Self::Args) -> R {
                self($($arg),*)
            }

            #[inline]
            fn apply_method<C: 'static>(
                method: Self::Method<C>,
                this: &mut C,
                ($($arg,)*): Self::Args,
            ) -> R {
                method(this, $($arg),*)
            }

            fn address(self) -> FnAddress {
                FnAddress(self as usize)
            }

            fn method_address<C: 'static>(method: Self::Method<C>) -> FnAddress {
                FnAddress(method as usize)
            }
        }
    };
}

signature!();
signature!(a: A);
signature!(a: A, b: B);
signature!(a: A, b: B, c: C0);
signature!(a: A, b: B, c: C0, d: D);
signature!(a: A, b: B, c: C0, d: D, e: E);
signature!(a: A, b: B, c: C0, d: D, e: E, f: F);
signature!(a: A, b: B, c: C0, d: D, e: E, f: F, g: G);
signature!(a: A, b: B, c: C0, d: D, e: E, f: F, g: G, h: H);
