// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Strongly typed indices for the instance arena.
//!
//! Entities, their options and the global constraints all live in flattened
//! arrays inside `Instance`. A raw `usize` would let an option position be
//! passed where an entity is expected, so every index space gets its own
//! phantom-tagged wrapper. `TypedIndex<Tag>` is `#[repr(transparent)]` over
//! `usize` and costs nothing at runtime.
//!
//! ```rust
//! use premia_model::index::{EntityIndex, OptionIndex};
//!
//! let entity = EntityIndex::new(2);
//! let option = OptionIndex::new(0);
//! assert_eq!(format!("{}", entity), "EntityIndex(2)");
//! assert!(option.is_zero());
//! ```

/// Names an index space for `Display` and `Debug` output.
pub trait TypedIndexTag: Clone {
    const NAME: &'static str;
}

/// A `usize` index bound to the index space named by `T`.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypedIndex<T> {
    index: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<T> TypedIndex<T> {
    /// Wraps a raw position.
    #[inline(always)]
    pub const fn new(index: usize) -> Self {
        Self {
            index,
            _marker: std::marker::PhantomData,
        }
    }

    /// Returns the raw position.
    #[inline(always)]
    pub const fn get(&self) -> usize {
        self.index
    }

    #[inline(always)]
    pub const fn is_zero(&self) -> bool {
        self.index == 0
    }

    /// Returns the index following this one.
    #[inline(always)]
    pub const fn next(&self) -> Self {
        Self::new(self.index + 1)
    }
}

impl<T> std::fmt::Debug for TypedIndex<T>
where
    T: TypedIndexTag,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", T::NAME, self.index)
    }
}

impl<T> std::fmt::Display for TypedIndex<T>
where
    T: TypedIndexTag,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", T::NAME, self.index)
    }
}

impl<T> From<usize> for TypedIndex<T> {
    #[inline(always)]
    fn from(index: usize) -> Self {
        Self::new(index)
    }
}

impl<T> From<TypedIndex<T>> for usize {
    #[inline(always)]
    fn from(typed_index: TypedIndex<T>) -> Self {
        typed_index.index
    }
}

impl<T> std::ops::Add<usize> for TypedIndex<T> {
    type Output = Self;

    #[inline(always)]
    fn add(self, rhs: usize) -> Self::Output {
        Self::new(self.index + rhs)
    }
}

impl<T> std::ops::AddAssign<usize> for TypedIndex<T> {
    #[inline(always)]
    fn add_assign(&mut self, rhs: usize) {
        self.index += rhs;
    }
}

/// Tag for entity positions (declaration order).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct EntityIndexTag;

impl TypedIndexTag for EntityIndexTag {
    const NAME: &'static str = "EntityIndex";
}

/// Position of an entity in declaration order.
pub type EntityIndex = TypedIndex<EntityIndexTag>;

/// Tag for option positions inside one entity's menu.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct OptionIndexTag;

impl TypedIndexTag for OptionIndexTag {
    const NAME: &'static str = "OptionIndex";
}

/// Position of an option within its entity's menu.
pub type OptionIndex = TypedIndex<OptionIndexTag>;

/// Tag for global constraint positions.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ConstraintIndexTag;

impl TypedIndexTag for ConstraintIndexTag {
    const NAME: &'static str = "ConstraintIndex";
}

/// Position of a global constraint in declaration order.
pub type ConstraintIndex = TypedIndex<ConstraintIndexTag>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_get_and_conversions() {
        let e = EntityIndex::new(10);
        assert_eq!(e.get(), 10);

        let o: OptionIndex = 4.into();
        let raw: usize = o.into();
        assert_eq!(raw, 4);
    }

    #[test]
    fn test_display_and_debug_use_tag_name() {
        assert_eq!(format!("{}", EntityIndex::new(7)), "EntityIndex(7)");
        assert_eq!(format!("{:?}", OptionIndex::new(1)), "OptionIndex(1)");
        assert_eq!(
            format!("{}", ConstraintIndex::new(0)),
            "ConstraintIndex(0)"
        );
    }

    #[test]
    fn test_next_and_add() {
        let mut c = ConstraintIndex::new(0);
        assert!(c.is_zero());
        assert_eq!(c.next().get(), 1);
        c += 3;
        assert_eq!((c + 2).get(), 5);
    }

    #[test]
    fn test_ordering_follows_raw_index() {
        let mut v = vec![OptionIndex::new(3), OptionIndex::new(0), OptionIndex::new(2)];
        v.sort();
        assert_eq!(v, vec![OptionIndex::new(0), OptionIndex::new(2), OptionIndex::new(3)]);
    }
}
