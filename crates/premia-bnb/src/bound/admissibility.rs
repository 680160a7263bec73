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


//! Randomized admissibility and monotonicity check shared by the bounder
//! tests.

use crate::{bound::bounder::RelaxationBounder, state::SearchState, trail::SearchTrail};
use premia_model::{
    index::{EntityIndex, OptionIndex},
    model::{GlobalConstraintSpec, Instance, InstanceBuilder},
};
use rand::{Rng, SeedableRng, rngs::StdRng};

fn random_instance(rng: &mut StdRng) -> Instance<f64> {
    let mut b = InstanceBuilder::new();
    let n = rng.random_range(2..6);
    let mut menu_sizes = Vec::with_capacity(n);
    for i in 0..n {
        let k = rng.random_range(1..4);
        let menu: Vec<(f64, f64)> = (0..k)
            .map(|_| {
                (
                    rng.random_range(0..20) as f64,
                    rng.random_range(0..10) as f64 / 10.0,
                )
            })
            .collect();
        b.add_entity(format!("e{i}"), menu);
        menu_sizes.push(k);
        if rng.random_bool(0.3) {
            b.set_risk_threshold(format!("e{i}"), 0.6);
        }
    }
    for c in 0..rng.random_range(1..4) {
        let members: Vec<usize> = (0..n).filter(|_| rng.random_bool(0.6)).collect();
        let budget = rng.random_range(0..15) as f64 / 10.0;
        if rng.random_bool(0.7) {
            b.add_total_risk_constraint(
                format!("c{c}"),
                budget,
                members.iter().map(|i| format!("e{i}")),
            );
        } else {
            let mut spec = GlobalConstraintSpec::new(format!("c{c}"), budget);
            for i in members {
                for option in 0..menu_sizes[i] {
                    let weight = rng.random_range(0..6) as f64 / 10.0;
                    if weight > 0.0 {
                        spec = spec.with_term(format!("e{i}"), option, weight);
                    }
                }
            }
            b.add_global_constraint(spec);
        }
    }
    b.build().unwrap()
}

/// Best feasible completion of the partial `selections`, by enumeration.
fn best_completion(
    inst: &Instance<f64>,
    selections: &mut [Option<usize>],
    at: usize,
) -> Option<f64> {
    if at == inst.num_entities() {
        let mut reward = 0.0;
        for (i, s) in selections.iter().enumerate() {
            let (entity, option) = (EntityIndex::new(i), OptionIndex::new(s.unwrap()));
            if !inst.is_locally_feasible(entity, option) {
                return None;
            }
            reward += inst.option_reward(entity, option);
        }
        for c in inst.constraints() {
            let lhs: f64 = inst
                .constraint_incidences(c)
                .iter()
                .map(|inc| {
                    let option = selections[inc.entity().get()].unwrap();
                    inst.weight(inc, OptionIndex::new(option))
                })
                .sum();
            if lhs > inst.budget(c) + 1e-9 {
                return None;
            }
        }
        return Some(reward);
    }
    if selections[at].is_some() {
        return best_completion(inst, selections, at + 1);
    }
    let mut best: Option<f64> = None;
    for opt in 0..inst.num_options(EntityIndex::new(at)) {
        selections[at] = Some(opt);
        if let Some(r) = best_completion(inst, selections, at + 1) {
            best = Some(best.map_or(r, |b: f64| b.max(r)));
        }
    }
    selections[at] = None;
    best
}

/// Walks random decision paths on random instances and asserts that the
/// bound never drops below the best reachable reward, never proves a
/// reachable completion infeasible and never increases along a path.
pub(crate) fn assert_admissible_and_monotone(bounder: &mut dyn RelaxationBounder<f64>, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..200 {
        let inst = random_instance(&mut rng);
        bounder.prepare(&inst);
        let mut state = SearchState::new(&inst);
        let mut trail = SearchTrail::new();
        let mut selections = vec![None; inst.num_entities()];

        let mut previous = bounder.upper_bound(&inst, &state);
        for i in 0..inst.num_entities() {
            let exact = best_completion(&inst, &mut selections, 0);
            match (previous, exact) {
                (Some(b), Some(x)) => assert!(b + 1e-9 >= x, "bound {b} below optimum {x}"),
                (None, Some(x)) => panic!("bound proved infeasible but {x} is reachable"),
                _ => {}
            }

            let entity = EntityIndex::new(i);
            let feasible: Vec<_> = inst.locally_feasible_options(entity).collect();
            if feasible.is_empty() {
                break;
            }
            let choice = feasible[rng.random_range(0..feasible.len())];
            trail.push_frame();
            trail.apply_assignment(&mut state, &inst, entity, choice);
            selections[i] = Some(choice.get());

            let next = bounder.upper_bound(&inst, &state);
            if let (Some(b), Some(n)) = (previous, next) {
                assert!(n <= b + 1e-9, "bound increased from {b} to {n}");
            }
            if previous.is_none() {
                assert!(next.is_none(), "bound recovered after proving infeasibility");
            }
            previous = next;
        }
    }
}
