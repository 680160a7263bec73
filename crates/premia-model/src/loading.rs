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

//! Line-oriented text format for instances.
//!
//! Every non-empty line holds one directive; `#` starts a comment that runs
//! to the end of the line.
//!
//! ```text
//! option      <entity> <option-index> <reward> <risk>
//! threshold   <entity> <value>
//! global      <name> <budget>
//! term        <name> <entity> <option-index> <weight>
//! global-risk <name> <budget> <entity> [<entity> ...]
//! ```
//!
//! Entities are declared implicitly by their first `option` line and keep
//! that order. Option indices of an entity must be contiguous from zero.
//! A `term` must follow the `global` line that declares its constraint.

use crate::{
    error::InvalidInstance,
    model::{
        Choice, EntitySpec, GlobalConstraintSpec, Instance, LocalConstraint, WeightTerm,
    },
};
use num_traits::Float;
use rustc_hash::FxHashMap;
use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
    str::FromStr,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: `{directive}` is missing its {expected}")]
    MissingToken {
        line: usize,
        directive: &'static str,
        expected: &'static str,
    },

    #[error("line {line}: could not parse token '{token}' as type {type_name}")]
    Parse {
        line: usize,
        token: String,
        type_name: &'static str,
    },

    #[error("line {line}: unknown directive '{directive}'")]
    UnknownDirective { line: usize, directive: String },

    #[error("line {line}: entity '{entity}' expects option index {expected} but got {found}")]
    NonContiguousOption {
        line: usize,
        entity: String,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: term references undeclared global constraint '{name}'")]
    UnknownConstraint { line: usize, name: String },

    #[error("line {line}: global constraint '{name}' is declared more than once")]
    DuplicateConstraint { line: usize, name: String },

    #[error("line {line}: unexpected trailing token '{token}'")]
    TrailingTokens { line: usize, token: String },

    #[error("invalid instance: {0}")]
    Invalid(#[from] InvalidInstance),
}

/// Reads instances in the text format described in the module docs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceLoader<T> {
    default_threshold: Option<T>,
}

impl<T> Default for InstanceLoader<T> {
    fn default() -> Self {
        Self {
            default_threshold: None,
        }
    }
}

impl<T> InstanceLoader<T>
where
    T: Float + FromStr,
{
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `threshold` to every entity that has no `threshold` line.
    #[inline]
    pub fn default_threshold(mut self, threshold: T) -> Self {
        self.default_threshold = Some(threshold);
        self
    }

    /// Loads an instance from a type implementing `BufRead`.
    pub fn from_bufread<R: BufRead>(&self, rdr: R) -> Result<Instance<T>, LoadError> {
        let mut entities: Vec<EntitySpec<T>> = Vec::new();
        let mut entity_lookup: FxHashMap<String, usize> = FxHashMap::default();
        let mut locals: Vec<LocalConstraint<T>> = Vec::new();
        let mut globals: Vec<GlobalConstraintSpec<T>> = Vec::new();
        let mut global_lookup: FxHashMap<String, usize> = FxHashMap::default();

        for (n, raw) in rdr.lines().enumerate() {
            let raw = raw?;
            let content = raw.split('#').next().unwrap_or("");
            let mut tokens = Tokens::new(content, n + 1);
            let Some(directive) = tokens.words.next() else {
                continue;
            };

            match directive {
                "option" => {
                    let entity = tokens.word("option", "entity")?;
                    let index: usize = tokens.value("option", "option index")?;
                    let reward: T = tokens.value("option", "reward")?;
                    let risk: T = tokens.value("option", "risk")?;
                    tokens.finish()?;

                    let position = *entity_lookup.entry(entity.to_string()).or_insert_with(|| {
                        entities.push(EntitySpec {
                            id: entity.to_string(),
                            choices: Vec::new(),
                        });
                        entities.len() - 1
                    });
                    let choices = &mut entities[position].choices;
                    if index != choices.len() {
                        return Err(LoadError::NonContiguousOption {
                            line: tokens.line,
                            entity: entity.to_string(),
                            expected: choices.len(),
                            found: index,
                        });
                    }
                    choices.push(Choice::new(reward, risk));
                }
                "threshold" => {
                    let entity = tokens.word("threshold", "entity")?;
                    let value: T = tokens.value("threshold", "value")?;
                    tokens.finish()?;
                    locals.push(LocalConstraint::new(entity, value));
                }
                "global" | "global-risk" => {
                    let directive = if directive == "global" { "global" } else { "global-risk" };
                    let name = tokens.word(directive, "name")?;
                    let budget: T = tokens.value(directive, "budget")?;
                    let mut spec = GlobalConstraintSpec::new(name, budget);
                    if directive == "global-risk" {
                        spec.risk_weighted.push(tokens.word(directive, "entity")?.to_string());
                        spec.risk_weighted
                            .extend(tokens.words.by_ref().map(str::to_string));
                    }
                    tokens.finish()?;

                    if global_lookup.contains_key(name) {
                        return Err(LoadError::DuplicateConstraint {
                            line: tokens.line,
                            name: name.to_string(),
                        });
                    }
                    global_lookup.insert(name.to_string(), globals.len());
                    globals.push(spec);
                }
                "term" => {
                    let name = tokens.word("term", "constraint name")?;
                    let entity = tokens.word("term", "entity")?;
                    let option: usize = tokens.value("term", "option index")?;
                    let weight: T = tokens.value("term", "weight")?;
                    tokens.finish()?;

                    let Some(&position) = global_lookup.get(name) else {
                        return Err(LoadError::UnknownConstraint {
                            line: tokens.line,
                            name: name.to_string(),
                        });
                    };
                    globals[position].terms.push(WeightTerm {
                        entity: entity.to_string(),
                        option,
                        weight,
                    });
                }
                other => {
                    return Err(LoadError::UnknownDirective {
                        line: tokens.line,
                        directive: other.to_string(),
                    });
                }
            }
        }

        if let Some(threshold) = self.default_threshold {
            let declared: FxHashMap<&str, ()> =
                locals.iter().map(|l| (l.entity.as_str(), ())).collect();
            let missing: Vec<LocalConstraint<T>> = entities
                .iter()
                .filter(|e| !declared.contains_key(e.id.as_str()))
                .map(|e| LocalConstraint::new(e.id.clone(), threshold))
                .collect();
            locals.extend(missing);
        }

        Ok(Instance::build(entities, locals, globals)?)
    }

    /// Loads an instance from a file path.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Instance<T>, LoadError> {
        let file = File::open(path)?;
        self.from_bufread(BufReader::new(file))
    }

    /// Loads an instance from a type implementing `Read`.
    pub fn from_reader<R: Read>(&self, r: R) -> Result<Instance<T>, LoadError> {
        self.from_bufread(BufReader::new(r))
    }

    /// Loads an instance from a string slice.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(&self, s: &str) -> Result<Instance<T>, LoadError> {
        self.from_reader(s.as_bytes())
    }
}

/// Whitespace tokens of one line.
struct Tokens<'a> {
    words: std::str::SplitWhitespace<'a>,
    line: usize,
}

impl<'a> Tokens<'a> {
    fn new(content: &'a str, line: usize) -> Self {
        Self {
            words: content.split_whitespace(),
            line,
        }
    }

    fn word(
        &mut self,
        directive: &'static str,
        expected: &'static str,
    ) -> Result<&'a str, LoadError> {
        self.words.next().ok_or(LoadError::MissingToken {
            line: self.line,
            directive,
            expected,
        })
    }

    fn value<V: FromStr>(
        &mut self,
        directive: &'static str,
        expected: &'static str,
    ) -> Result<V, LoadError> {
        let token = self.word(directive, expected)?;
        token.parse::<V>().map_err(|_| LoadError::Parse {
            line: self.line,
            token: token.to_string(),
            type_name: std::any::type_name::<V>(),
        })
    }

    fn finish(&mut self) -> Result<(), LoadError> {
        match self.words.next() {
            Some(token) => Err(LoadError::TrailingTokens {
                line: self.line,
                token: token.to_string(),
            }),
            None => Ok(()),
        }
    }
}
