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

use premia_model::index::{EntityIndex, OptionIndex};

/// Pins `entity` to `option` before the search starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FixedAssignment {
    /// The pinned entity.
    pub entity: EntityIndex,

    /// The option the entity is pinned to.
    pub option: OptionIndex,
}

impl FixedAssignment {
    #[inline]
    pub fn new(entity: EntityIndex, option: OptionIndex) -> Self {
        Self { entity, option }
    }
}

impl From<(EntityIndex, OptionIndex)> for FixedAssignment {
    #[inline]
    fn from((entity, option): (EntityIndex, OptionIndex)) -> Self {
        Self::new(entity, option)
    }
}

impl std::fmt::Display for FixedAssignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FixedAssignment(entity: {}, option: {})",
            self.entity, self.option
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_is_by_entity_then_option() {
        let mut pins = vec![
            FixedAssignment::new(EntityIndex::new(2), OptionIndex::new(0)),
            FixedAssignment::new(EntityIndex::new(0), OptionIndex::new(3)),
            FixedAssignment::new(EntityIndex::new(0), OptionIndex::new(1)),
        ];
        pins.sort();
        let pairs: Vec<_> = pins.iter().map(|p| (p.entity.get(), p.option.get())).collect();
        assert_eq!(pairs, vec![(0, 1), (0, 3), (2, 0)]);
    }

    #[test]
    fn test_display() {
        let pin: FixedAssignment = (EntityIndex::new(1), OptionIndex::new(2)).into();
        assert_eq!(
            pin.to_string(),
            "FixedAssignment(entity: EntityIndex(1), option: OptionIndex(2))"
        );
    }
}
