//! Dependency Arrays
//!
//! Memoizing hooks take a list of dependencies and only recompute when the
//! list changed since the previous render. Dependencies are type-erased so
//! one list can mix values of different types.
//!
//! # Equality Policy
//!
//! Two dependencies are [`strictly_equal`] when:
//!
//! - they wrap the same runtime type, and
//! - for values ([`Dep::value`] and the `From` conversions for scalars,
//!   text and bytes) the values compare equal;
//! - for callables ([`Dep::callable`]) they are the same closure expression.
//!   Every closure expression has its own type, so a closure re-created on
//!   each render from the same source compares equal to its predecessor
//!   regardless of what it captured;
//! - for shared handles ([`Dep::identity`]) they point at the same
//!   allocation.
//!
//! Closures cannot be inspected for the variables they capture, so there is
//! no inference: callers list dependencies explicitly or pass
//! [`Dependencies::always`].

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

pub(crate) type DepList = SmallVec<[Dep; 4]>;

trait DepValue: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn dep_eq(&self, other: &dyn DepValue) -> bool;
    fn describe(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

struct ValueDep<T>(T);

impl<T> DepValue for ValueDep<T>
where
    T: PartialEq + fmt::Debug + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dep_eq(&self, other: &dyn DepValue) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| other.0 == self.0)
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

struct IdentityDep<T: ?Sized>(Arc<T>);

impl<T> DepValue for IdentityDep<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dep_eq(&self, other: &dyn DepValue) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| Arc::ptr_eq(&other.0, &self.0))
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} at {:p}>", type_name::<T>(), Arc::as_ptr(&self.0))
    }
}

struct CallableDep {
    code: TypeId,
    name: &'static str,
}

impl DepValue for CallableDep {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dep_eq(&self, other: &dyn DepValue) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| other.code == self.code)
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name)
    }
}

/// A single type-erased dependency.
#[derive(Clone)]
pub struct Dep(Arc<dyn DepValue>);

impl Dep {
    /// A dependency compared by value.
    pub fn value<T>(value: T) -> Self
    where
        T: PartialEq + fmt::Debug + Send + Sync + 'static,
    {
        Self(Arc::new(ValueDep(value)))
    }

    /// A dependency compared by pointer identity of the shared allocation.
    pub fn identity<T>(value: &Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Self(Arc::new(IdentityDep(Arc::clone(value))))
    }

    /// A dependency compared by the code of a closure or function.
    pub fn callable<F: 'static>(_function: &F) -> Self {
        Self(Arc::new(CallableDep {
            code: TypeId::of::<F>(),
            name: type_name::<F>(),
        }))
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.describe(f)
    }
}

macro_rules! value_deps {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Dep {
                fn from(value: $ty) -> Self {
                    Dep::value(value)
                }
            }
        )*
    };
}

value_deps!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    String, Vec<u8>, (),
);

impl From<&str> for Dep {
    fn from(value: &str) -> Self {
        Dep::value(value.to_string())
    }
}

impl From<&String> for Dep {
    fn from(value: &String) -> Self {
        Dep::value(value.clone())
    }
}

impl From<&[u8]> for Dep {
    fn from(value: &[u8]) -> Self {
        Dep::value(value.to_vec())
    }
}

/// Compare two dependencies under the equality policy described in the
/// module docs.
pub fn strictly_equal(x: &Dep, y: &Dep) -> bool {
    x.0.dep_eq(&*y.0)
}

/// The dependency list given to a memoizing hook.
#[derive(Clone, Debug)]
pub struct Dependencies(Option<DepList>);

impl Dependencies {
    /// Recompute on every render.
    pub fn always() -> Self {
        Self(None)
    }

    /// Compute on the first render only.
    pub fn once() -> Self {
        Self(Some(SmallVec::new()))
    }

    pub fn list<I>(deps: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Dep>,
    {
        Self(Some(deps.into_iter().map(Into::into).collect()))
    }

    pub fn is_always(&self) -> bool {
        self.0.is_none()
    }

    /// Whether these dependencies call for recomputing a value last
    /// computed with `previous`.
    pub(crate) fn changed_from(&self, previous: &DepList) -> bool {
        match &self.0 {
            None => true,
            Some(current) => {
                current.len() != previous.len()
                    || !current
                        .iter()
                        .zip(previous.iter())
                        .all(|(new, old)| strictly_equal(new, old))
            }
        }
    }

    /// The list to remember after a recompute.
    pub(crate) fn into_stored(self) -> DepList {
        self.0.unwrap_or_default()
    }
}

impl Default for Dependencies {
    fn default() -> Self {
        Self::always()
    }
}

/// Build a [`Dependencies`] list, converting each element with
/// `Dep::from`.
///
/// ```rust,ignore
/// use_memo(deps![count, name.as_str()], || expensive(count, &name))?;
/// ```
#[macro_export]
macro_rules! deps {
    () => {
        $crate::hooks::Dependencies::once()
    };
    ($($dep:expr),+ $(,)?) => {
        $crate::hooks::Dependencies::list([$($crate::hooks::Dep::from($dep)),+])
    };
}
