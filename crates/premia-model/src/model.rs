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

use crate::{
    error::InvalidInstance,
    index::{ConstraintIndex, EntityIndex, OptionIndex},
};
use num_traits::Float;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Size of the naive search space, the product of all menu sizes, stored as
/// a base-10 logarithm because realistic instances overflow every float.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, PartialOrd)]
pub struct Complexity {
    log_val: f64,
}

impl Complexity {
    /// Computes the complexity for the given menu sizes.
    /// Empty menus are ignored; they make an instance invalid anyway.
    pub fn from_menu_sizes<I>(sizes: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let log_val = sizes
            .into_iter()
            .filter(|&n| n > 0)
            .map(|n| (n as f64).log10())
            .sum();
        Self { log_val }
    }

    /// Percentage of the search space covered by `nodes_explored`.
    /// Returns `Some(0.0)` when the space is too large to represent.
    pub fn coverage(&self, nodes_explored: u64) -> Option<f64> {
        if self.log_val > 15.0 {
            return Some(0.0);
        }
        let total = 10.0_f64.powf(self.log_val);
        if total == 0.0 {
            return None;
        }
        Some((nodes_explored as f64 / total) * 100.0)
    }

    #[inline]
    pub fn exponent(&self) -> u64 {
        self.log_val.floor() as u64
    }

    #[inline]
    pub fn mantissa(&self) -> f64 {
        10.0_f64.powf(self.log_val - self.log_val.floor())
    }

    /// Returns the raw log10 value.
    #[inline]
    pub fn raw(&self) -> f64 {
        self.log_val
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} × 10^{}", self.mantissa(), self.exponent())
    }
}

impl std::fmt::Debug for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Complexity(log10={:.4})", self.log_val)
    }
}

/// One entry of an entity's menu: the reward gained and the risk incurred
/// when the entity selects it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Choice<T> {
    pub reward: T,
    pub risk: T,
}

impl<T> Choice<T> {
    #[inline]
    pub fn new(reward: T, risk: T) -> Self {
        Self { reward, risk }
    }
}

impl<T> From<(T, T)> for Choice<T> {
    #[inline]
    fn from((reward, risk): (T, T)) -> Self {
        Self { reward, risk }
    }
}

/// Declaration of an entity and its ordered menu.
#[derive(Clone, Debug, PartialEq)]
pub struct EntitySpec<T> {
    pub id: String,
    pub choices: Vec<Choice<T>>,
}

impl<T> EntitySpec<T> {
    pub fn new<S, I, C>(id: S, choices: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = C>,
        C: Into<Choice<T>>,
    {
        Self {
            id: id.into(),
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }
}

/// `risk(selected option of entity) <= threshold`.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalConstraint<T> {
    pub entity: String,
    pub threshold: T,
}

impl<T> LocalConstraint<T> {
    pub fn new<S: Into<String>>(entity: S, threshold: T) -> Self {
        Self {
            entity: entity.into(),
            threshold,
        }
    }
}

/// Weight contributed by `option` of `entity` when it is selected.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightTerm<T> {
    pub entity: String,
    pub option: usize,
    pub weight: T,
}

/// Declaration of a global constraint `sum(weight(e, selected(e))) <= budget`.
///
/// Terms are sparse: options of a referenced entity that have no term weigh
/// zero. Every entity listed in `risk_weighted` contributes the risk of its
/// selected option, which is the common "total risk" budget.
#[derive(Clone, Debug, PartialEq)]
pub struct GlobalConstraintSpec<T> {
    pub name: String,
    pub budget: T,
    pub terms: Vec<WeightTerm<T>>,
    pub risk_weighted: Vec<String>,
}

impl<T> GlobalConstraintSpec<T> {
    pub fn new<S: Into<String>>(name: S, budget: T) -> Self {
        Self {
            name: name.into(),
            budget,
            terms: Vec::new(),
            risk_weighted: Vec::new(),
        }
    }

    /// Adds an explicit `(entity, option, weight)` term.
    pub fn with_term<S: Into<String>>(mut self, entity: S, option: usize, weight: T) -> Self {
        self.terms.push(WeightTerm {
            entity: entity.into(),
            option,
            weight,
        });
        self
    }

    /// Makes `entity` contribute the risk of whichever option it selects.
    pub fn with_risk_of<S: Into<String>>(mut self, entity: S) -> Self {
        self.risk_weighted.push(entity.into());
        self
    }
}

/// Membership of one entity in one global constraint.
///
/// The weights of all options of the entity are stored contiguously in the
/// instance starting at `weight_offset`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Incidence<T> {
    constraint: ConstraintIndex,
    entity: EntityIndex,
    weight_offset: usize,
    min_weight: T,
}

impl<T: Copy> Incidence<T> {
    #[inline]
    pub fn constraint(&self) -> ConstraintIndex {
        self.constraint
    }

    #[inline]
    pub fn entity(&self) -> EntityIndex {
        self.entity
    }

    /// Smallest weight among the entity's locally feasible options, or
    /// among all of its options when none is locally feasible.
    #[inline]
    pub fn min_weight(&self) -> T {
        self.min_weight
    }
}

/// A global constraint after id resolution, used while assembling.
struct RawConstraint<T> {
    name: String,
    budget: T,
    members: Vec<(EntityIndex, Vec<T>)>,
}

/// The immutable problem instance.
///
/// Options are stored flattened: the menu of entity `e` occupies
/// `option_offsets[e]..option_offsets[e + 1]` of `rewards` and `risks`.
/// Global constraints are stored as incidences grouped by constraint, and
/// each entity keeps the list of incidences touching it ordered by
/// constraint declaration order.
///
/// Construction goes through `Instance::build` or `InstanceBuilder`, both of
/// which validate the input.
#[derive(Clone, Debug)]
pub struct Instance<T> {
    entity_ids: Vec<String>,
    id_lookup: FxHashMap<String, EntityIndex>,
    option_offsets: Vec<usize>,
    rewards: Vec<T>,
    risks: Vec<T>,
    thresholds: Vec<T>,
    local_constrained: Vec<bool>,
    constraint_names: Vec<String>,
    budgets: Vec<T>,
    constraint_offsets: Vec<usize>,
    incidences: Vec<Incidence<T>>,
    weights: Vec<T>,
    entity_incidence_offsets: Vec<usize>,
    entity_incidences: Vec<usize>,
}

#[inline]
fn valid_value<T: Float>(value: T) -> bool {
    value.is_finite() && value >= T::zero()
}

#[inline]
fn as_f64<T: Float>(value: T) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

impl<T> Instance<T>
where
    T: Float,
{
    /// Validates the declarations and builds the instance.
    ///
    /// Entities keep their declaration order, which is also the order used
    /// for deterministic tie-breaking during search.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use premia_model::model::{EntitySpec, Instance, LocalConstraint};
    ///
    /// let instance = Instance::build(
    ///     vec![EntitySpec::new("A", [(0.0, 0.01), (20.0, 0.05)])],
    ///     vec![LocalConstraint::new("A", 0.10)],
    ///     vec![],
    /// )
    /// .unwrap();
    /// assert_eq!(instance.num_entities(), 1);
    /// ```
    pub fn build(
        entities: Vec<EntitySpec<T>>,
        local_constraints: Vec<LocalConstraint<T>>,
        global_constraints: Vec<GlobalConstraintSpec<T>>,
    ) -> Result<Self, InvalidInstance> {
        let mut id_lookup: FxHashMap<String, EntityIndex> = FxHashMap::default();
        id_lookup.reserve(entities.len());

        let mut entity_ids = Vec::with_capacity(entities.len());
        let mut menus = Vec::with_capacity(entities.len());
        for (position, spec) in entities.into_iter().enumerate() {
            if id_lookup.contains_key(&spec.id) {
                return Err(InvalidInstance::DuplicateEntity { entity: spec.id });
            }
            if spec.choices.is_empty() {
                return Err(InvalidInstance::EmptyOptions { entity: spec.id });
            }
            for (option, choice) in spec.choices.iter().enumerate() {
                if !valid_value(choice.reward) {
                    return Err(InvalidInstance::InvalidReward {
                        entity: spec.id,
                        option,
                        value: as_f64(choice.reward),
                    });
                }
                if !valid_value(choice.risk) {
                    return Err(InvalidInstance::InvalidRisk {
                        entity: spec.id,
                        option,
                        value: as_f64(choice.risk),
                    });
                }
            }
            id_lookup.insert(spec.id.clone(), EntityIndex::new(position));
            entity_ids.push(spec.id);
            menus.push(spec.choices);
        }

        let num_entities = entity_ids.len();
        let mut thresholds = vec![T::infinity(); num_entities];
        let mut local_constrained = vec![false; num_entities];
        for local in local_constraints {
            let Some(&entity) = id_lookup.get(&local.entity) else {
                return Err(InvalidInstance::LocalConstraintUnknownEntity {
                    entity: local.entity,
                });
            };
            if local_constrained[entity.get()] {
                return Err(InvalidInstance::DuplicateLocalConstraint {
                    entity: local.entity,
                });
            }
            if !valid_value(local.threshold) {
                return Err(InvalidInstance::InvalidThreshold {
                    entity: local.entity,
                    value: as_f64(local.threshold),
                });
            }
            local_constrained[entity.get()] = true;
            thresholds[entity.get()] = local.threshold;
        }

        let mut seen_names: FxHashMap<String, ()> = FxHashMap::default();
        let mut constraints = Vec::with_capacity(global_constraints.len());
        for spec in global_constraints {
            if seen_names.insert(spec.name.clone(), ()).is_some() {
                return Err(InvalidInstance::DuplicateConstraint {
                    constraint: spec.name,
                });
            }
            if !valid_value(spec.budget) {
                return Err(InvalidInstance::InvalidBudget {
                    constraint: spec.name,
                    value: as_f64(spec.budget),
                });
            }
            constraints.push(Self::resolve_constraint(spec, &id_lookup, &menus)?);
        }

        Ok(Self::assemble(
            entity_ids,
            menus,
            thresholds,
            local_constrained,
            constraints,
        ))
    }

    /// Resolves entity ids of a global constraint and expands its terms into
    /// dense per-entity weight vectors.
    fn resolve_constraint(
        spec: GlobalConstraintSpec<T>,
        id_lookup: &FxHashMap<String, EntityIndex>,
        menus: &[Vec<Choice<T>>],
    ) -> Result<RawConstraint<T>, InvalidInstance> {
        let GlobalConstraintSpec {
            name,
            budget,
            terms,
            risk_weighted,
        } = spec;

        let mut member_position: FxHashMap<EntityIndex, usize> = FxHashMap::default();
        let mut members: Vec<(EntityIndex, Vec<T>)> = Vec::new();
        let mut declared: Vec<Vec<bool>> = Vec::new();

        let expanded_risk = risk_weighted.into_iter().flat_map(|entity| {
            let risks: SmallVec<[(usize, Option<T>); 8]> = match id_lookup.get(&entity) {
                Some(index) => menus[index.get()]
                    .iter()
                    .enumerate()
                    .map(|(o, c)| (o, Some(c.risk)))
                    .collect(),
                None => smallvec::smallvec![(0, None)],
            };
            risks.into_iter().map(move |(option, weight)| {
                (entity.clone(), option, weight)
            })
        });
        let explicit = terms
            .into_iter()
            .map(|term| (term.entity, term.option, Some(term.weight)));

        for (entity_id, option, weight) in explicit.chain(expanded_risk) {
            let Some(&entity) = id_lookup.get(&entity_id) else {
                return Err(InvalidInstance::GlobalConstraintUnknownEntity {
                    constraint: name,
                    entity: entity_id,
                });
            };
            let Some(weight) = weight else {
                return Err(InvalidInstance::GlobalConstraintUnknownEntity {
                    constraint: name,
                    entity: entity_id,
                });
            };
            let num_options = menus[entity.get()].len();
            if option >= num_options {
                return Err(InvalidInstance::OptionOutOfRange {
                    constraint: name,
                    entity: entity_id,
                    option,
                    num_options,
                });
            }
            if !valid_value(weight) {
                return Err(InvalidInstance::InvalidWeight {
                    constraint: name,
                    entity: entity_id,
                    option,
                    value: as_f64(weight),
                });
            }

            let position = *member_position.entry(entity).or_insert_with(|| {
                members.push((entity, vec![T::zero(); num_options]));
                declared.push(vec![false; num_options]);
                members.len() - 1
            });
            if declared[position][option] {
                return Err(InvalidInstance::DuplicateTerm {
                    constraint: name,
                    entity: entity_id,
                    option,
                });
            }
            declared[position][option] = true;
            members[position].1[option] = weight;
        }

        Ok(RawConstraint {
            name,
            budget,
            members,
        })
    }

    /// Lays out validated data in the flattened representation.
    fn assemble(
        entity_ids: Vec<String>,
        menus: Vec<Vec<Choice<T>>>,
        thresholds: Vec<T>,
        local_constrained: Vec<bool>,
        constraints: Vec<RawConstraint<T>>,
    ) -> Self {
        let num_entities = entity_ids.len();
        let total_options: usize = menus.iter().map(Vec::len).sum();

        let mut option_offsets = Vec::with_capacity(num_entities + 1);
        let mut rewards = Vec::with_capacity(total_options);
        let mut risks = Vec::with_capacity(total_options);
        option_offsets.push(0);
        for menu in &menus {
            for choice in menu {
                rewards.push(choice.reward);
                risks.push(choice.risk);
            }
            option_offsets.push(rewards.len());
        }

        let mut constraint_names = Vec::with_capacity(constraints.len());
        let mut budgets = Vec::with_capacity(constraints.len());
        let mut constraint_offsets = Vec::with_capacity(constraints.len() + 1);
        let mut incidences = Vec::new();
        let mut weights = Vec::new();
        let mut per_entity_count = vec![0usize; num_entities];

        constraint_offsets.push(0);
        for (c, raw) in constraints.into_iter().enumerate() {
            for (entity, entity_weights) in raw.members {
                let threshold = thresholds[entity.get()];
                let menu = &menus[entity.get()];
                let feasible_min = entity_weights
                    .iter()
                    .zip(menu)
                    .filter(|(_, choice)| choice.risk <= threshold)
                    .map(|(w, _)| *w)
                    .fold(None, |acc: Option<T>, w| Some(acc.map_or(w, |a| a.min(w))));
                let min_weight = feasible_min.unwrap_or_else(|| {
                    entity_weights
                        .iter()
                        .copied()
                        .fold(T::infinity(), |a, w| a.min(w))
                });

                incidences.push(Incidence {
                    constraint: ConstraintIndex::new(c),
                    entity,
                    weight_offset: weights.len(),
                    min_weight,
                });
                weights.extend(entity_weights);
                per_entity_count[entity.get()] += 1;
            }
            constraint_names.push(raw.name);
            budgets.push(raw.budget);
            constraint_offsets.push(incidences.len());
        }

        let mut entity_incidence_offsets = Vec::with_capacity(num_entities + 1);
        entity_incidence_offsets.push(0);
        for count in &per_entity_count {
            let last = *entity_incidence_offsets.last().unwrap_or(&0);
            entity_incidence_offsets.push(last + count);
        }
        let mut cursor = entity_incidence_offsets.clone();
        let mut entity_incidences = vec![0usize; incidences.len()];
        for (i, incidence) in incidences.iter().enumerate() {
            let slot = &mut cursor[incidence.entity.get()];
            entity_incidences[*slot] = i;
            *slot += 1;
        }

        let id_lookup = entity_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), EntityIndex::new(i)))
            .collect();

        Self {
            entity_ids,
            id_lookup,
            option_offsets,
            rewards,
            risks,
            thresholds,
            local_constrained,
            constraint_names,
            budgets,
            constraint_offsets,
            incidences,
            weights,
            entity_incidence_offsets,
            entity_incidences,
        }
    }

    /// Restricts the instance to `entities`, in the given order.
    ///
    /// Global constraints are kept only when every entity they touch is part
    /// of the subset; constraints without any incidence are dropped. This is
    /// exact for the connected components of the incidence graph.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if an index is out of bounds or repeated.
    pub fn subinstance(&self, entities: &[EntityIndex]) -> Self {
        let mut new_position: Vec<Option<EntityIndex>> = vec![None; self.num_entities()];
        for (i, &entity) in entities.iter().enumerate() {
            debug_assert!(
                entity.get() < self.num_entities(),
                "called `Instance::subinstance` with entity index out of bounds: the len is {} but the index is {}",
                self.num_entities(),
                entity.get()
            );
            debug_assert!(
                new_position[entity.get()].is_none(),
                "called `Instance::subinstance` with repeated entity {}",
                entity
            );
            new_position[entity.get()] = Some(EntityIndex::new(i));
        }

        let entity_ids = entities
            .iter()
            .map(|&e| self.entity_ids[e.get()].clone())
            .collect();
        let menus = entities
            .iter()
            .map(|&e| {
                self.rewards(e)
                    .iter()
                    .zip(self.risks(e))
                    .map(|(&reward, &risk)| Choice::new(reward, risk))
                    .collect()
            })
            .collect();
        let thresholds = entities.iter().map(|&e| self.thresholds[e.get()]).collect();
        let local_constrained = entities
            .iter()
            .map(|&e| self.local_constrained[e.get()])
            .collect();

        let constraints = self
            .constraints()
            .filter_map(|c| {
                let incidences = self.constraint_incidences(c);
                if incidences.is_empty() {
                    return None;
                }
                let members = incidences
                    .iter()
                    .map(|inc| {
                        new_position[inc.entity.get()]
                            .map(|e| (e, self.incidence_weights(inc).to_vec()))
                    })
                    .collect::<Option<Vec<_>>>()?;
                Some(RawConstraint {
                    name: self.constraint_names[c.get()].clone(),
                    budget: self.budgets[c.get()],
                    members,
                })
            })
            .collect();

        Self::assemble(entity_ids, menus, thresholds, local_constrained, constraints)
    }

    /// Returns the index of the best locally feasible option of `entity`:
    /// highest reward, ties broken by the lowest option index. Returns `None`
    /// when every option exceeds the entity's threshold.
    pub fn best_local_option(&self, entity: EntityIndex) -> Option<OptionIndex> {
        let threshold = self.threshold(entity);
        let mut best: Option<(OptionIndex, T)> = None;
        let menu = self.rewards(entity).iter().zip(self.risks(entity));
        for (o, (&reward, &risk)) in menu.enumerate() {
            if risk > threshold {
                continue;
            }
            match best {
                Some((_, r)) if reward <= r => {}
                _ => best = Some((OptionIndex::new(o), reward)),
            }
        }
        best.map(|(o, _)| o)
    }
}

impl<T> Instance<T>
where
    T: Copy,
{
    #[inline]
    pub fn num_entities(&self) -> usize {
        self.entity_ids.len()
    }

    /// Total number of options over all entities.
    #[inline]
    pub fn num_options_total(&self) -> usize {
        self.rewards.len()
    }

    #[inline]
    pub fn num_constraints(&self) -> usize {
        self.constraint_names.len()
    }

    /// Returns `true` if at least one global constraint touches an entity.
    #[inline]
    pub fn has_global_constraints(&self) -> bool {
        !self.incidences.is_empty()
    }

    /// Iterates entity indices in declaration order.
    #[inline]
    pub fn entities(&self) -> impl ExactSizeIterator<Item = EntityIndex> + use<T> {
        (0..self.num_entities()).map(EntityIndex::new)
    }

    /// Iterates global constraint indices in declaration order.
    #[inline]
    pub fn constraints(&self) -> impl ExactSizeIterator<Item = ConstraintIndex> + use<T> {
        (0..self.num_constraints()).map(ConstraintIndex::new)
    }

    /// Returns the identifiers of all entities in declaration order.
    #[inline]
    pub fn entity_ids(&self) -> &[String] {
        &self.entity_ids
    }

    /// Returns the identifier of an entity.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is out of bounds.
    #[inline]
    pub fn entity_id(&self, entity: EntityIndex) -> &str {
        &self.entity_ids[entity.get()]
    }

    /// Looks up an entity by identifier.
    #[inline]
    pub fn entity_index(&self, id: &str) -> Option<EntityIndex> {
        self.id_lookup.get(id).copied()
    }

    /// Looks up a global constraint by name.
    pub fn constraint_index(&self, name: &str) -> Option<ConstraintIndex> {
        self.constraint_names
            .iter()
            .position(|n| n == name)
            .map(ConstraintIndex::new)
    }

    /// Returns the number of options of `entity`.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is out of bounds.
    #[inline]
    pub fn num_options(&self, entity: EntityIndex) -> usize {
        let index = entity.get();
        debug_assert!(
            index < self.num_entities(),
            "called `Instance::num_options` with entity index out of bounds: the len is {} but the index is {}",
            self.num_entities(),
            index
        );
        self.option_offsets[index + 1] - self.option_offsets[index]
    }

    /// Iterates the option indices of `entity`.
    #[inline]
    pub fn options(
        &self,
        entity: EntityIndex,
    ) -> impl ExactSizeIterator<Item = OptionIndex> + use<T> {
        (0..self.num_options(entity)).map(OptionIndex::new)
    }

    /// Returns the rewards of `entity`'s menu.
    #[inline]
    pub fn rewards(&self, entity: EntityIndex) -> &[T] {
        let index = entity.get();
        debug_assert!(
            index < self.num_entities(),
            "called `Instance::rewards` with entity index out of bounds: the len is {} but the index is {}",
            self.num_entities(),
            index
        );
        &self.rewards[self.option_offsets[index]..self.option_offsets[index + 1]]
    }

    /// Returns the risks of `entity`'s menu.
    #[inline]
    pub fn risks(&self, entity: EntityIndex) -> &[T] {
        let index = entity.get();
        debug_assert!(
            index < self.num_entities(),
            "called `Instance::risks` with entity index out of bounds: the len is {} but the index is {}",
            self.num_entities(),
            index
        );
        &self.risks[self.option_offsets[index]..self.option_offsets[index + 1]]
    }

    /// Returns the reward of an option.
    ///
    /// # Panics
    ///
    /// Panics if `entity` or `option` is out of bounds.
    #[inline]
    pub fn option_reward(&self, entity: EntityIndex, option: OptionIndex) -> T {
        self.rewards(entity)[option.get()]
    }

    /// Returns the risk of an option.
    ///
    /// # Panics
    ///
    /// Panics if `entity` or `option` is out of bounds.
    #[inline]
    pub fn option_risk(&self, entity: EntityIndex, option: OptionIndex) -> T {
        self.risks(entity)[option.get()]
    }

    /// Returns the local threshold of `entity`, or `+inf` if it has none.
    #[inline]
    pub fn threshold(&self, entity: EntityIndex) -> T {
        self.thresholds[entity.get()]
    }

    /// Returns the declared local threshold of `entity`, if any.
    #[inline]
    pub fn local_constraint(&self, entity: EntityIndex) -> Option<T> {
        self.local_constrained[entity.get()].then(|| self.thresholds[entity.get()])
    }

    /// Returns the name of a global constraint.
    #[inline]
    pub fn constraint_name(&self, constraint: ConstraintIndex) -> &str {
        &self.constraint_names[constraint.get()]
    }

    /// Returns the budget of a global constraint.
    #[inline]
    pub fn budget(&self, constraint: ConstraintIndex) -> T {
        self.budgets[constraint.get()]
    }

    /// Returns the incidences of a global constraint in term order.
    #[inline]
    pub fn constraint_incidences(&self, constraint: ConstraintIndex) -> &[Incidence<T>] {
        let c = constraint.get();
        debug_assert!(
            c < self.num_constraints(),
            "called `Instance::constraint_incidences` with constraint index out of bounds: the len is {} but the index is {}",
            self.num_constraints(),
            c
        );
        &self.incidences[self.constraint_offsets[c]..self.constraint_offsets[c + 1]]
    }

    /// Iterates the incidences of the constraints touching `entity`, in
    /// constraint declaration order.
    #[inline]
    pub fn entity_incidences(
        &self,
        entity: EntityIndex,
    ) -> impl ExactSizeIterator<Item = &Incidence<T>> + '_ {
        let e = entity.get();
        let range = self.entity_incidence_offsets[e]..self.entity_incidence_offsets[e + 1];
        self.entity_incidences[range]
            .iter()
            .map(|&i| &self.incidences[i])
    }

    /// Iterates the global constraints touching `entity`.
    #[inline]
    pub fn touching_constraints(
        &self,
        entity: EntityIndex,
    ) -> impl ExactSizeIterator<Item = ConstraintIndex> + '_ {
        self.entity_incidences(entity).map(|inc| inc.constraint)
    }

    #[inline]
    pub fn num_touching_constraints(&self, entity: EntityIndex) -> usize {
        let e = entity.get();
        self.entity_incidence_offsets[e + 1] - self.entity_incidence_offsets[e]
    }

    /// Returns the per-option weights of an incidence.
    #[inline]
    pub fn incidence_weights(&self, incidence: &Incidence<T>) -> &[T] {
        let len = self.num_options(incidence.entity);
        &self.weights[incidence.weight_offset..incidence.weight_offset + len]
    }

    /// Returns the weight of `option` in the incidence.
    #[inline]
    pub fn weight(&self, incidence: &Incidence<T>, option: OptionIndex) -> T {
        debug_assert!(
            option.get() < self.num_options(incidence.entity),
            "called `Instance::weight` with option index out of bounds: the len is {} but the index is {}",
            self.num_options(incidence.entity),
            option.get()
        );
        self.weights[incidence.weight_offset + option.get()]
    }

    /// Returns the naive search space size.
    #[inline]
    pub fn complexity(&self) -> Complexity {
        Complexity::from_menu_sizes(self.entities().map(|e| self.num_options(e)))
    }
}

impl<T> Instance<T>
where
    T: Float,
{
    /// Returns `true` if `option` satisfies the local constraint of `entity`.
    #[inline]
    pub fn is_locally_feasible(&self, entity: EntityIndex, option: OptionIndex) -> bool {
        self.option_risk(entity, option) <= self.threshold(entity)
    }

    /// Iterates the options of `entity` that satisfy its local constraint.
    pub fn locally_feasible_options(
        &self,
        entity: EntityIndex,
    ) -> impl Iterator<Item = OptionIndex> + '_ {
        self.options(entity)
            .filter(move |&o| self.is_locally_feasible(entity, o))
    }
}

impl<T> std::fmt::Display for Instance<T>
where
    T: Copy,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Instance(num_entities: {}, num_options: {}, num_constraints: {})",
            self.num_entities(),
            self.num_options_total(),
            self.num_constraints()
        )
    }
}

/// Incremental construction of an `Instance`.
///
/// All validation is deferred to `build`, so declarations may appear in any
/// order (a threshold may be set before its entity is added).
#[derive(Clone, Debug, Default)]
pub struct InstanceBuilder<T> {
    entities: Vec<EntitySpec<T>>,
    local_constraints: Vec<LocalConstraint<T>>,
    global_constraints: Vec<GlobalConstraintSpec<T>>,
}

impl<T> InstanceBuilder<T>
where
    T: Float,
{
    #[inline]
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            local_constraints: Vec::new(),
            global_constraints: Vec::new(),
        }
    }

    /// Declares an entity with its `(reward, risk)` menu.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use premia_model::model::InstanceBuilder;
    ///
    /// let mut builder = InstanceBuilder::<f64>::new();
    /// builder
    ///     .add_entity("A", [(0.0, 0.01), (20.0, 0.05), (40.0, 0.15)])
    ///     .set_risk_threshold("A", 0.10);
    /// let instance = builder.build().unwrap();
    /// assert_eq!(instance.num_options_total(), 3);
    /// ```
    pub fn add_entity<S, I>(&mut self, id: S, choices: I) -> &mut Self
    where
        S: Into<String>,
        I: IntoIterator<Item = (T, T)>,
    {
        self.entities.push(EntitySpec::new(id, choices));
        self
    }

    /// Declares the local risk threshold of an entity.
    pub fn set_risk_threshold<S: Into<String>>(&mut self, entity: S, threshold: T) -> &mut Self {
        self.local_constraints
            .push(LocalConstraint::new(entity, threshold));
        self
    }

    /// Declares a global constraint.
    pub fn add_global_constraint(&mut self, constraint: GlobalConstraintSpec<T>) -> &mut Self {
        self.global_constraints.push(constraint);
        self
    }

    /// Declares a global constraint bounding the summed risk of `entities`.
    pub fn add_total_risk_constraint<S, I, E>(
        &mut self,
        name: S,
        budget: T,
        entities: I,
    ) -> &mut Self
    where
        S: Into<String>,
        I: IntoIterator<Item = E>,
        E: Into<String>,
    {
        let mut spec = GlobalConstraintSpec::new(name, budget);
        spec.risk_weighted = entities.into_iter().map(Into::into).collect();
        self.global_constraints.push(spec);
        self
    }

    #[inline]
    pub fn num_entities(&self) -> usize {
        self.entities.len()
    }

    /// Validates and builds the instance.
    #[inline]
    pub fn build(self) -> Result<Instance<T>, InvalidInstance> {
        Instance::build(
            self.entities,
            self.local_constraints,
            self.global_constraints,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pricing_instance() -> Instance<f64> {
        let mut b = InstanceBuilder::new();
        b.add_entity("A", [(0.0, 0.01), (20.0, 0.05), (40.0, 0.15)])
            .add_entity("B", [(0.0, 0.01), (15.0, 0.03), (30.0, 0.10)])
            .add_entity("C", [(0.0, 0.01), (10.0, 0.05), (20.0, 0.08)])
            .set_risk_threshold("A", 0.10)
            .set_risk_threshold("B", 0.08)
            .set_risk_threshold("C", 0.06);
        b.build().unwrap()
    }

    #[test]
    fn test_build_lays_out_menus_in_declaration_order() {
        let inst = pricing_instance();
        assert_eq!(inst.num_entities(), 3);
        assert_eq!(inst.num_options_total(), 9);
        assert_eq!(inst.num_constraints(), 0);
        assert!(!inst.has_global_constraints());

        let b = inst.entity_index("B").unwrap();
        assert_eq!(b, EntityIndex::new(1));
        assert_eq!(inst.entity_id(b), "B");
        assert_eq!(inst.rewards(b), &[0.0, 15.0, 30.0]);
        assert_eq!(inst.risks(b), &[0.01, 0.03, 0.10]);
        assert_eq!(inst.option_reward(b, OptionIndex::new(2)), 30.0);
        assert_eq!(inst.option_risk(b, OptionIndex::new(1)), 0.03);
        assert_eq!(inst.threshold(b), 0.08);
        assert_eq!(inst.local_constraint(b), Some(0.08));
        assert!(inst.entity_index("Z").is_none());
    }

    #[test]
    fn test_missing_local_constraint_means_unbounded() {
        let mut b = InstanceBuilder::new();
        b.add_entity("X", [(1.0, 5.0)]);
        let inst = b.build().unwrap();
        let x = EntityIndex::new(0);
        assert!(inst.threshold(x).is_infinite());
        assert_eq!(inst.local_constraint(x), None);
        assert!(inst.is_locally_feasible(x, OptionIndex::new(0)));
    }

    #[test]
    fn test_locally_feasible_options_and_best_local_option() {
        let inst = pricing_instance();
        let a = EntityIndex::new(0);
        let feasible: Vec<_> = inst.locally_feasible_options(a).collect();
        assert_eq!(feasible, vec![OptionIndex::new(0), OptionIndex::new(1)]);
        assert_eq!(inst.best_local_option(a), Some(OptionIndex::new(1)));
        assert_eq!(inst.best_local_option(EntityIndex::new(2)), Some(OptionIndex::new(1)));
    }

    #[test]
    fn test_best_local_option_prefers_lowest_index_on_ties() {
        let mut b = InstanceBuilder::new();
        b.add_entity("T", [(5.0, 0.0), (7.0, 0.0), (7.0, 0.0)]);
        let inst = b.build().unwrap();
        assert_eq!(inst.best_local_option(EntityIndex::new(0)), Some(OptionIndex::new(1)));
    }

    #[test]
    fn test_best_local_option_none_when_all_exceed_threshold() {
        let mut b = InstanceBuilder::new();
        b.add_entity("D", [(1.0, 0.5), (2.0, 0.6)])
            .set_risk_threshold("D", 0.1);
        let inst = b.build().unwrap();
        assert_eq!(inst.best_local_option(EntityIndex::new(0)), None);
    }

    #[test]
    fn test_empty_options_rejected() {
        let entities = vec![EntitySpec::new("E", Vec::<(f64, f64)>::new())];
        let err = Instance::<f64>::build(entities, vec![], vec![]).unwrap_err();
        assert_eq!(
            err,
            InvalidInstance::EmptyOptions {
                entity: "E".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_entity_rejected() {
        let mut b = InstanceBuilder::new();
        b.add_entity("A", [(1.0, 0.0)]).add_entity("A", [(2.0, 0.0)]);
        assert!(matches!(
            b.build(),
            Err(InvalidInstance::DuplicateEntity { entity }) if entity == "A"
        ));
    }

    #[test]
    fn test_non_finite_and_negative_values_rejected() {
        let mut b = InstanceBuilder::new();
        b.add_entity("A", [(f64::NAN, 0.0)]);
        assert!(matches!(b.build(), Err(InvalidInstance::InvalidReward { option: 0, .. })));

        let mut b = InstanceBuilder::new();
        b.add_entity("A", [(1.0, 0.0), (1.0, -0.5)]);
        assert!(matches!(b.build(), Err(InvalidInstance::InvalidRisk { option: 1, .. })));

        let mut b = InstanceBuilder::new();
        b.add_entity("A", [(1.0, 0.0)]).set_risk_threshold("A", f64::INFINITY);
        assert!(matches!(b.build(), Err(InvalidInstance::InvalidThreshold { .. })));
    }

    #[test]
    fn test_local_constraint_errors() {
        let mut b = InstanceBuilder::new();
        b.add_entity("A", [(1.0, 0.0)]).set_risk_threshold("B", 0.1);
        assert!(matches!(
            b.build(),
            Err(InvalidInstance::LocalConstraintUnknownEntity { entity }) if entity == "B"
        ));

        let mut b = InstanceBuilder::new();
        b.add_entity("A", [(1.0, 0.0)])
            .set_risk_threshold("A", 0.1)
            .set_risk_threshold("A", 0.2);
        assert!(matches!(
            b.build(),
            Err(InvalidInstance::DuplicateLocalConstraint { .. })
        ));
    }

    #[test]
    fn test_global_constraint_errors() {
        let base = || {
            let mut b = InstanceBuilder::new();
            b.add_entity("A", [(1.0, 0.1), (2.0, 0.2)]);
            b
        };

        let mut b = base();
        b.add_global_constraint(GlobalConstraintSpec::new("g", 1.0).with_term("Q", 0, 1.0));
        assert!(matches!(
            b.build(),
            Err(InvalidInstance::GlobalConstraintUnknownEntity { constraint, entity })
                if constraint == "g" && entity == "Q"
        ));

        let mut b = base();
        b.add_global_constraint(GlobalConstraintSpec::new("g", 1.0).with_term("A", 2, 1.0));
        assert!(matches!(
            b.build(),
            Err(InvalidInstance::OptionOutOfRange { option: 2, num_options: 2, .. })
        ));

        let mut b = base();
        b.add_global_constraint(
            GlobalConstraintSpec::new("g", 1.0)
                .with_term("A", 1, 1.0)
                .with_term("A", 1, 2.0),
        );
        assert!(matches!(b.build(), Err(InvalidInstance::DuplicateTerm { option: 1, .. })));

        let mut b = base();
        b.add_global_constraint(GlobalConstraintSpec::new("g", -1.0));
        assert!(matches!(b.build(), Err(InvalidInstance::InvalidBudget { .. })));

        let mut b = base();
        b.add_global_constraint(GlobalConstraintSpec::new("g", 1.0).with_term("A", 0, -2.0));
        assert!(matches!(b.build(), Err(InvalidInstance::InvalidWeight { .. })));

        let mut b = base();
        b.add_global_constraint(GlobalConstraintSpec::new("g", 1.0))
            .add_global_constraint(GlobalConstraintSpec::new("g", 2.0));
        assert!(matches!(b.build(), Err(InvalidInstance::DuplicateConstraint { .. })));

        let mut b = base();
        b.add_total_risk_constraint("r", 1.0, ["Nope"]);
        assert!(matches!(
            b.build(),
            Err(InvalidInstance::GlobalConstraintUnknownEntity { .. })
        ));
    }

    #[test]
    fn test_sparse_terms_default_to_zero_weight() {
        let mut b = InstanceBuilder::new();
        b.add_entity("A", [(1.0, 0.1), (2.0, 0.2), (3.0, 0.3)])
            .add_global_constraint(GlobalConstraintSpec::new("g", 5.0).with_term("A", 2, 4.0));
        let inst = b.build().unwrap();
        let g = inst.constraint_index("g").unwrap();
        let incs = inst.constraint_incidences(g);
        assert_eq!(incs.len(), 1);
        assert_eq!(inst.incidence_weights(&incs[0]), &[0.0, 0.0, 4.0]);
        assert_eq!(incs[0].min_weight(), 0.0);
        assert_eq!(inst.budget(g), 5.0);
        assert_eq!(inst.constraint_name(g), "g");
    }

    #[test]
    fn test_total_risk_constraint_uses_option_risks() {
        let inst = {
            let mut b = InstanceBuilder::new();
            b.add_entity("A", [(0.0, 0.01), (20.0, 0.05)])
                .add_entity("B", [(0.0, 0.02), (15.0, 0.03)])
                .add_total_risk_constraint("risk", 0.07, ["A", "B"]);
            b.build().unwrap()
        };
        let a = EntityIndex::new(0);
        let incs: Vec<_> = inst.entity_incidences(a).collect();
        assert_eq!(incs.len(), 1);
        assert_eq!(inst.incidence_weights(incs[0]), &[0.01, 0.05]);
        assert_eq!(inst.weight(incs[0], OptionIndex::new(1)), 0.05);
        assert!(inst.has_global_constraints());
    }

    #[test]
    fn test_min_weight_ignores_locally_infeasible_options() {
        let mut b = InstanceBuilder::new();
        b.add_entity("A", [(0.0, 0.5), (1.0, 0.05)])
            .set_risk_threshold("A", 0.1)
            .add_global_constraint(
                GlobalConstraintSpec::new("g", 10.0)
                    .with_term("A", 0, 0.0)
                    .with_term("A", 1, 3.0),
            );
        let inst = b.build().unwrap();
        let inc = inst.constraint_incidences(ConstraintIndex::new(0))[0];
        assert_eq!(inc.min_weight(), 3.0);
    }

    #[test]
    fn test_entity_incidences_follow_constraint_order() {
        let mut b = InstanceBuilder::new();
        b.add_entity("A", [(1.0, 0.1)])
            .add_entity("B", [(1.0, 0.1)])
            .add_total_risk_constraint("first", 1.0, ["B"])
            .add_total_risk_constraint("second", 1.0, ["A", "B"]);
        let inst = b.build().unwrap();
        let touching: Vec<_> = inst.touching_constraints(EntityIndex::new(1)).collect();
        assert_eq!(touching, vec![ConstraintIndex::new(0), ConstraintIndex::new(1)]);
        assert_eq!(inst.num_touching_constraints(EntityIndex::new(0)), 1);
    }

    #[test]
    fn test_subinstance_keeps_only_enclosed_constraints() {
        let mut b = InstanceBuilder::new();
        b.add_entity("A", [(1.0, 0.1), (2.0, 0.2)])
            .add_entity("B", [(3.0, 0.3)])
            .add_entity("C", [(4.0, 0.4), (5.0, 0.5)])
            .set_risk_threshold("C", 0.45)
            .add_total_risk_constraint("ac", 1.0, ["A", "C"])
            .add_total_risk_constraint("b", 1.0, ["B"])
            .add_global_constraint(GlobalConstraintSpec::new("empty", 1.0));
        let inst = b.build().unwrap();

        let sub = inst.subinstance(&[EntityIndex::new(2), EntityIndex::new(0)]);
        assert_eq!(sub.entity_ids(), &["C".to_string(), "A".to_string()]);
        assert_eq!(sub.num_constraints(), 1);
        assert_eq!(sub.constraint_name(ConstraintIndex::new(0)), "ac");
        assert_eq!(sub.local_constraint(EntityIndex::new(0)), Some(0.45));
        let incs = sub.constraint_incidences(ConstraintIndex::new(0));
        assert_eq!(incs[0].entity(), EntityIndex::new(1));
        assert_eq!(incs[1].entity(), EntityIndex::new(0));
        assert_eq!(sub.incidence_weights(&incs[1]), &[0.4, 0.5]);
    }

    #[test]
    fn test_complexity_is_product_of_menu_sizes() {
        let inst = pricing_instance();
        let c = inst.complexity();
        assert!((c.raw() - 27f64.log10()).abs() < 1e-12);
        assert_eq!(c.exponent(), 1);
        assert!((c.mantissa() - 2.7).abs() < 1e-9);
        let cov = c.coverage(27).unwrap();
        assert!((cov - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_display() {
        let inst = pricing_instance();
        assert_eq!(
            format!("{}", inst),
            "Instance(num_entities: 3, num_options: 9, num_constraints: 0)"
        );
    }
}
