//! Identified values.

use core::fmt::Debug;
use core::hash::Hash;

/// A value with an identifier that is unique within one collection.
///
/// Collections compare stored values by reference (`Rc::ptr_eq`), not by
/// structural equality. The identifier only decides which slot a value
/// occupies.
pub trait Identified {
    /// Identifier type.
    type Id: Clone + Eq + Hash + Debug;

    /// Returns the identifier of this value.
    fn id(&self) -> &Self::Id;
}
