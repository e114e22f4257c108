use thiserror::Error;

/// Errors that can occur when invoking a delegate.
///
/// None of these are retried internally. A bulk invocation through a
/// [`CallableSet`] stops at the first failing member and returns its error.
///
/// [`CallableSet`]: crate::CallableSet
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The callable was built without a target to call.
    #[error("callable has no {0} to invoke")]
    NullTarget(NullTarget),

    /// The bound instance was dropped before the method was invoked.
    #[error("bound instance was dropped before invocation")]
    InstanceDropped,

    /// The bound instance is already borrowed, usually because one of its own
    /// methods is invoking a delegate bound to it.
    #[error("bound instance is already borrowed")]
    InstanceBusy,
}

/// The part of a callable that was missing when it was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NullTarget {
    Function,
    Method,
    Instance,
}

impl std::fmt::Display for NullTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Instance => "instance",
        };
        f.write_str(name)
    }
}

/// A result with [`Error`] as its default error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_missing_target() {
        assert_eq!(
            Error::NullTarget(NullTarget::Function).to_string(),
            "callable has no function to invoke",
        );
        assert_eq!(
            Error::NullTarget(NullTarget::Instance).to_string(),
            "callable has no instance to invoke",
        );
        assert_eq!(
            Error::InstanceDropped.to_string(),
            "bound instance was dropped before invocation",
        );
    }
}
