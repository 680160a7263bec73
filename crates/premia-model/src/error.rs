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

use thiserror::Error;

/// Reasons an instance description is rejected by `Instance::build`.
///
/// Numeric values are reported as `f64` so the error type does not depend on
/// the numeric type of the instance.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInstance {
    #[error("entity '{entity}' has no options")]
    EmptyOptions { entity: String },

    #[error("entity '{entity}' is declared more than once")]
    DuplicateEntity { entity: String },

    #[error("option {option} of entity '{entity}' has invalid reward {value}")]
    InvalidReward {
        entity: String,
        option: usize,
        value: f64,
    },

    #[error("option {option} of entity '{entity}' has invalid risk {value}")]
    InvalidRisk {
        entity: String,
        option: usize,
        value: f64,
    },

    #[error("local constraint references unknown entity '{entity}'")]
    LocalConstraintUnknownEntity { entity: String },

    #[error("entity '{entity}' has more than one local constraint")]
    DuplicateLocalConstraint { entity: String },

    #[error("local constraint of entity '{entity}' has invalid threshold {value}")]
    InvalidThreshold { entity: String, value: f64 },

    #[error("global constraint '{constraint}' is declared more than once")]
    DuplicateConstraint { constraint: String },

    #[error("global constraint '{constraint}' has invalid budget {value}")]
    InvalidBudget { constraint: String, value: f64 },

    #[error("global constraint '{constraint}' references unknown entity '{entity}'")]
    GlobalConstraintUnknownEntity { constraint: String, entity: String },

    #[error(
        "global constraint '{constraint}' references option {option} of entity '{entity}', which has {num_options} options"
    )]
    OptionOutOfRange {
        constraint: String,
        entity: String,
        option: usize,
        num_options: usize,
    },

    #[error(
        "global constraint '{constraint}' declares option {option} of entity '{entity}' more than once"
    )]
    DuplicateTerm {
        constraint: String,
        entity: String,
        option: usize,
    },

    #[error(
        "global constraint '{constraint}' has invalid weight {value} for option {option} of entity '{entity}'"
    )]
    InvalidWeight {
        constraint: String,
        entity: String,
        option: usize,
        value: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offending_item() {
        let e = InvalidInstance::EmptyOptions {
            entity: "A".to_string(),
        };
        assert_eq!(e.to_string(), "entity 'A' has no options");

        let e = InvalidInstance::OptionOutOfRange {
            constraint: "budget".to_string(),
            entity: "B".to_string(),
            option: 5,
            num_options: 3,
        };
        let msg = e.to_string();
        assert!(msg.contains("'budget'"));
        assert!(msg.contains("option 5"));
        assert!(msg.contains("3 options"));
    }
}
