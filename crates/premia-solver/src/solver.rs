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

//! # Component-Orchestrated Solver
//!
//! Entry point for solving an `Instance`. The solver splits the instance into
//! the connected components of its entity/constraint incidence graph, solves
//! each component on its own and merges the selections.
//!
//! ## Highlights
//!
//! - Components without global constraints are solved by a direct scan:
//!   every entity takes its best locally feasible option.
//! - Other components run the branch-and-bound search with the configured
//!   decision builder and relaxation bounder.
//! - Components are solved on a pool of scoped threads when parallelism is
//!   enabled; a single worker solves them in order otherwise.
//! - Every search is stopped by the same limits: an interrupt flag, a node
//!   budget shared through an `AtomicU64`, and a wall-clock deadline for the
//!   whole solve.
//! - The merged outcome is `Infeasible` as soon as one component is,
//!   `Optimal` when every component is, `Suboptimal` when every component has
//!   a solution and `Unknown` otherwise.
//!
//! ## Usage
//!
//! ```rust
//! use premia_model::model::InstanceBuilder;
//! use premia_solver::solver::SolverBuilder;
//!
//! let mut builder = InstanceBuilder::<f64>::new();
//! builder
//!     .add_entity("A", [(0.0, 0.01), (20.0, 0.05), (40.0, 0.15)])
//!     .add_entity("B", [(0.0, 0.01), (15.0, 0.03), (30.0, 0.10)])
//!     .add_total_risk_constraint("portfolio", 0.12, ["A", "B"]);
//! let instance = builder.build().unwrap();
//!
//! let solver = SolverBuilder::new().with_node_limit(10_000).build();
//! let outcome = solver.solve(&instance);
//! assert!(outcome.is_optimal());
//! assert_eq!(outcome.solution().unwrap().total_reward(), 35.0);
//! ```

use crate::{
    config::{BounderKind, BranchingKind, SolverConfig},
    decompose::Components,
};
use premia_bnb::{
    bnb::BnbSolver,
    bound::{independent::IndependentBounder, knapsack::KnapsackRelaxationBounder},
    branching::{declaration::DeclarationOrderBuilder, most_constrained::MostConstrainedBuilder},
    extract::extract,
    fixed::FixedAssignment,
    monitor::{
        composite::CompositeTreeSearchMonitor, log::LogTreeSearchMonitor,
        tree_search_monitor::TreeSearchMonitor, wrapper::WrapperMonitor,
    },
    result::BnbSolverOutcome,
};
use premia_model::{
    index::{EntityIndex, OptionIndex},
    model::Instance,
};
use premia_search::{
    monitor::{
        composite::CompositeMonitor, interrupt::InterruptMonitor, node_limit::NodeLimitMonitor,
        time_limit::TimeLimitMonitor,
    },
    num::SolverFloat,
    result::{SolverOutcome, SolverResult, TerminationReason},
    stats::SolverStatisticsBuilder,
};
use std::{
    sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    time::{Duration, Instant},
};
use thiserror::Error;

/// Clock and progress checks in the search happen on every 4096th node.
const PROGRESS_CLOCK_CHECK_MASK: u64 = 0xFFF;

/// Rejected pins. The solver never starts on invalid input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveError {
    #[error("unknown entity `{0}`")]
    UnknownEntity(String),

    #[error("pinned entity {entity} is out of range: the instance has {num_entities} entities")]
    EntityOutOfRange {
        entity: EntityIndex,
        num_entities: usize,
    },

    #[error("pinned option {option} is out of range: entity `{entity}` has {num_options} options")]
    OptionOutOfRange {
        entity: String,
        option: OptionIndex,
        num_options: usize,
    },
}

/// Resolves a pin given by entity id.
pub fn resolve_pin<T>(
    instance: &Instance<T>,
    entity_id: &str,
    option: usize,
) -> Result<FixedAssignment, SolveError>
where
    T: SolverFloat,
{
    let entity = instance
        .entity_index(entity_id)
        .ok_or_else(|| SolveError::UnknownEntity(entity_id.to_string()))?;
    let pin = FixedAssignment::new(entity, OptionIndex::new(option));
    check_pin(instance, &pin)?;
    Ok(pin)
}

fn check_pin<T>(instance: &Instance<T>, pin: &FixedAssignment) -> Result<(), SolveError>
where
    T: SolverFloat,
{
    if pin.entity.get() >= instance.num_entities() {
        return Err(SolveError::EntityOutOfRange {
            entity: pin.entity,
            num_entities: instance.num_entities(),
        });
    }
    let num_options = instance.num_options(pin.entity);
    if pin.option.get() >= num_options {
        return Err(SolveError::OptionOutOfRange {
            entity: instance.entity_id(pin.entity).to_string(),
            option: pin.option,
            num_options,
        });
    }
    Ok(())
}

pub struct Solver {
    time_limit: Option<Duration>,
    node_limit: Option<u64>,
    bounder: BounderKind,
    branching: BranchingKind,
    decompose: bool,
    parallel: bool,
    threads: Option<usize>,
    progress_interval: Option<Duration>,
    /// Raised to stop every running search. Stays raised until
    /// `clear_interrupt`.
    stop_signal: AtomicBool,
}

impl Solver {
    #[inline]
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }

    #[inline]
    pub fn node_limit(&self) -> Option<u64> {
        self.node_limit
    }

    #[inline]
    pub fn bounder(&self) -> BounderKind {
        self.bounder
    }

    #[inline]
    pub fn branching(&self) -> BranchingKind {
        self.branching
    }

    /// Flag that stops every solve running on this solver when raised.
    /// Solves never clear it.
    #[inline]
    pub fn stop_signal(&self) -> &AtomicBool {
        &self.stop_signal
    }

    /// Asks every running solve to stop at its next node. Later solves stop
    /// immediately until `clear_interrupt` is called.
    #[inline]
    pub fn interrupt(&self) {
        self.stop_signal.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn clear_interrupt(&self) {
        self.stop_signal.store(false, Ordering::Relaxed);
    }

    /// Solves `instance`.
    pub fn solve<T>(&self, instance: &Instance<T>) -> SolverOutcome<T>
    where
        T: SolverFloat,
    {
        self.run(instance, &[])
    }

    /// Solves `instance` with every entity in `fixed` pinned to its option.
    ///
    /// Contradicting pins, or pins that break a constraint, make the outcome
    /// `Infeasible`. Pins naming an entity or option the instance does not
    /// have are rejected.
    pub fn solve_with_fixed<T>(
        &self,
        instance: &Instance<T>,
        fixed: &[FixedAssignment],
    ) -> Result<SolverOutcome<T>, SolveError>
    where
        T: SolverFloat,
    {
        for pin in fixed {
            check_pin(instance, pin)?;
        }
        Ok(self.run(instance, fixed))
    }

    fn run<T>(&self, instance: &Instance<T>, fixed: &[FixedAssignment]) -> SolverOutcome<T>
    where
        T: SolverFloat,
    {
        let start_time = Instant::now();

        let components = if self.decompose {
            Components::compute(instance)
        } else {
            Components::single(instance)
        };
        let pins = distribute_pins(instance, &components, fixed);
        let workers = self.worker_count(components.len());

        tracing::info!(
            event = "solve_start",
            entities = instance.num_entities(),
            options = instance.num_options_total(),
            constraints = instance.num_constraints(),
            components = components.len(),
            largest_component = components.largest(),
            pins = fixed.len(),
            workers,
            bounder = %self.bounder,
            branching = %self.branching,
        );

        let context = SolveContext {
            solver: self,
            instance,
            deadline: self.time_limit.and_then(|limit| start_time.checked_add(limit)),
            nodes_used: AtomicU64::new(0),
            infeasible: AtomicBool::new(false),
        };

        let outcomes = if workers > 1 {
            context.run_parallel(&components, &pins, workers)
        } else {
            context.run_sequential(&components, &pins)
        };

        let outcome = construct_outcome(instance, &components, outcomes, start_time, workers);

        tracing::info!(
            event = "solve_end",
            status = outcome.result.status(),
            reason = %outcome.reason,
            reward = outcome.solution().map(|s| s.total_reward().as_f64()),
            nodes = outcome.statistics.nodes_explored,
            elapsed_s = outcome.statistics.solve_duration.as_secs_f64(),
        );

        outcome
    }

    fn worker_count(&self, num_components: usize) -> usize {
        if !self.parallel {
            return 1;
        }
        let threads = self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1)
        });
        threads.min(num_components).max(1)
    }
}

impl std::fmt::Debug for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solver")
            .field("time_limit", &self.time_limit)
            .field("node_limit", &self.node_limit)
            .field("bounder", &self.bounder)
            .field("branching", &self.branching)
            .field("decompose", &self.decompose)
            .field("parallel", &self.parallel)
            .field("threads", &self.threads)
            .field("progress_interval", &self.progress_interval)
            .finish()
    }
}

/// Pins of each component, renumbered to component-local entities.
fn distribute_pins<T>(
    instance: &Instance<T>,
    components: &Components,
    fixed: &[FixedAssignment],
) -> Vec<Vec<FixedAssignment>>
where
    T: SolverFloat,
{
    let mut pins = vec![Vec::new(); components.len()];
    if fixed.is_empty() {
        return pins;
    }

    let mut position = vec![(0usize, EntityIndex::new(0)); instance.num_entities()];
    for (k, entities) in components.iter().enumerate() {
        for (local, entity) in entities.iter().enumerate() {
            position[entity.get()] = (k, EntityIndex::new(local));
        }
    }
    for pin in fixed {
        let (k, local) = position[pin.entity.get()];
        pins[k].push(FixedAssignment::new(local, pin.option));
    }
    pins
}

/// What one component contributes to the merged outcome. Selections are in
/// component-local entity order.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ComponentResult {
    Optimal(Vec<OptionIndex>),
    Suboptimal(Vec<OptionIndex>, String),
    Infeasible,
    Unknown(String),
}

impl ComponentResult {
    fn status(&self) -> &'static str {
        match self {
            ComponentResult::Optimal(_) => "Optimal",
            ComponentResult::Suboptimal(..) => "Suboptimal",
            ComponentResult::Infeasible => "Infeasible",
            ComponentResult::Unknown(_) => "Unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ComponentOutcome {
    result: ComponentResult,
    nodes_explored: u64,
    solutions_found: u64,
}

impl<T> From<BnbSolverOutcome<T>> for ComponentOutcome
where
    T: SolverFloat,
{
    fn from(outcome: BnbSolverOutcome<T>) -> Self {
        let (result, reason, statistics) = outcome.into_parts();
        let reason = match reason {
            TerminationReason::Aborted(msg) => msg,
            other => other.to_string(),
        };
        let result = match result {
            SolverResult::Optimal(solution) => {
                ComponentResult::Optimal(solution.selections().to_vec())
            }
            SolverResult::Suboptimal(solution) => {
                ComponentResult::Suboptimal(solution.selections().to_vec(), reason)
            }
            SolverResult::Infeasible => ComponentResult::Infeasible,
            SolverResult::Unknown => ComponentResult::Unknown(reason),
        };
        Self {
            result,
            nodes_explored: statistics.nodes_explored,
            solutions_found: statistics.solutions_found,
        }
    }
}

/// State shared by all workers of one solve.
struct SolveContext<'a, T> {
    solver: &'a Solver,
    instance: &'a Instance<T>,
    deadline: Option<Instant>,
    nodes_used: AtomicU64,
    /// Raised once a component is infeasible; the remaining searches of this
    /// solve are pointless.
    infeasible: AtomicBool,
}

impl<'a, T> SolveContext<'a, T>
where
    T: SolverFloat,
{
    fn run_sequential(
        &self,
        components: &Components,
        pins: &[Vec<FixedAssignment>],
    ) -> Vec<ComponentOutcome> {
        let mut bnb = BnbSolver::new();
        components
            .iter()
            .zip(pins)
            .enumerate()
            .map(|(k, (entities, pins))| self.solve_component(&mut bnb, k, entities, pins))
            .collect()
    }

    /// Hands components out to `workers` scoped threads, largest first.
    fn run_parallel(
        &self,
        components: &Components,
        pins: &[Vec<FixedAssignment>],
        workers: usize,
    ) -> Vec<ComponentOutcome> {
        let mut schedule: Vec<usize> = (0..components.len()).collect();
        schedule.sort_by_key(|&k| std::cmp::Reverse(components.component(k).len()));
        let next = AtomicUsize::new(0);

        let mut solved: Vec<(usize, ComponentOutcome)> = Vec::with_capacity(components.len());
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    let schedule = &schedule;
                    let next = &next;
                    scope.spawn(move || {
                        let mut bnb = BnbSolver::new();
                        let mut local = Vec::new();
                        while let Some(&k) = schedule.get(next.fetch_add(1, Ordering::Relaxed)) {
                            let outcome = self.solve_component(
                                &mut bnb,
                                k,
                                components.component(k),
                                &pins[k],
                            );
                            local.push((k, outcome));
                        }
                        local
                    })
                })
                .collect();

            for handle in handles {
                match handle.join() {
                    Ok(local) => solved.extend(local),
                    Err(payload) => std::panic::resume_unwind(payload),
                }
            }
        });

        solved.sort_unstable_by_key(|(k, _)| *k);
        solved.into_iter().map(|(_, outcome)| outcome).collect()
    }

    fn solve_component(
        &self,
        bnb: &mut BnbSolver<T>,
        index: usize,
        entities: &[EntityIndex],
        pins: &[FixedAssignment],
    ) -> ComponentOutcome {
        let is_local = entities
            .iter()
            .all(|&e| self.instance.num_touching_constraints(e) == 0);

        let outcome = if is_local {
            self.solve_local(entities, pins)
        } else if entities.len() == self.instance.num_entities() {
            self.solve_search(bnb, self.instance, pins)
        } else {
            let sub = self.instance.subinstance(entities);
            self.solve_search(bnb, &sub, pins)
        };

        if matches!(outcome.result, ComponentResult::Infeasible) {
            self.infeasible.store(true, Ordering::Relaxed);
        }

        tracing::debug!(
            event = "component_solved",
            component = index,
            entities = entities.len(),
            local = is_local,
            status = outcome.result.status(),
            nodes = outcome.nodes_explored,
        );

        outcome
    }

    /// Picks the best locally feasible option of every entity, or the pinned
    /// one.
    fn solve_local(&self, entities: &[EntityIndex], pins: &[FixedAssignment]) -> ComponentOutcome {
        let infeasible = ComponentOutcome {
            result: ComponentResult::Infeasible,
            nodes_explored: 0,
            solutions_found: 0,
        };

        let mut pinned: Vec<Option<OptionIndex>> = vec![None; entities.len()];
        for pin in pins {
            let slot = &mut pinned[pin.entity.get()];
            match *slot {
                Some(option) if option != pin.option => return infeasible,
                _ => *slot = Some(pin.option),
            }
        }

        let selections = entities
            .iter()
            .zip(&pinned)
            .map(|(&entity, pin)| match *pin {
                Some(option) => self
                    .instance
                    .is_locally_feasible(entity, option)
                    .then_some(option),
                None => self.instance.best_local_option(entity),
            })
            .collect::<Option<Vec<OptionIndex>>>();

        match selections {
            Some(selections) => ComponentOutcome {
                result: ComponentResult::Optimal(selections),
                nodes_explored: 0,
                solutions_found: 1,
            },
            None => infeasible,
        }
    }

    fn solve_search(
        &self,
        bnb: &mut BnbSolver<T>,
        instance: &Instance<T>,
        pins: &[FixedAssignment],
    ) -> ComponentOutcome {
        let remaining = self
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()));
        if remaining.is_some_and(|r| r.is_zero()) {
            return ComponentOutcome {
                result: ComponentResult::Unknown("Time limit reached".to_string()),
                nodes_explored: 0,
                solutions_found: 0,
            };
        }

        let mut limits = CompositeMonitor::<T>::new();
        limits.add_monitor(InterruptMonitor::new(&self.solver.stop_signal));
        limits.add_monitor(InterruptMonitor::with_reason(
            &self.infeasible,
            "Another component is infeasible",
        ));
        if let Some(limit) = self.solver.node_limit {
            limits.add_monitor(NodeLimitMonitor::new(&self.nodes_used, limit));
        }
        if let Some(remaining) = remaining {
            limits.add_monitor(TimeLimitMonitor::new(remaining));
        }

        let mut monitor = CompositeTreeSearchMonitor::new();
        monitor.add_monitor(WrapperMonitor::new(&mut limits));
        if let Some(interval) = self.solver.progress_interval {
            monitor.add_monitor(LogTreeSearchMonitor::new(
                interval,
                PROGRESS_CLOCK_CHECK_MASK,
            ));
        }

        self.run_search(bnb, instance, pins, monitor).into()
    }

    fn run_search<S>(
        &self,
        bnb: &mut BnbSolver<T>,
        instance: &Instance<T>,
        pins: &[FixedAssignment],
        monitor: S,
    ) -> BnbSolverOutcome<T>
    where
        S: TreeSearchMonitor<T>,
    {
        match (self.solver.branching, self.solver.bounder) {
            (BranchingKind::Declaration, BounderKind::Knapsack) => bnb.solve_with_fixed(
                instance,
                pins,
                &mut DeclarationOrderBuilder::new(),
                &mut KnapsackRelaxationBounder::new(),
                monitor,
            ),
            (BranchingKind::Declaration, BounderKind::Independent) => bnb.solve_with_fixed(
                instance,
                pins,
                &mut DeclarationOrderBuilder::new(),
                &mut IndependentBounder::new(),
                monitor,
            ),
            (BranchingKind::MostConstrained, BounderKind::Knapsack) => bnb.solve_with_fixed(
                instance,
                pins,
                &mut MostConstrainedBuilder::new(),
                &mut KnapsackRelaxationBounder::new(),
                monitor,
            ),
            (BranchingKind::MostConstrained, BounderKind::Independent) => bnb.solve_with_fixed(
                instance,
                pins,
                &mut MostConstrainedBuilder::new(),
                &mut IndependentBounder::new(),
                monitor,
            ),
        }
    }
}

fn construct_outcome<T>(
    instance: &Instance<T>,
    components: &Components,
    outcomes: Vec<ComponentOutcome>,
    start_time: Instant,
    workers: usize,
) -> SolverOutcome<T>
where
    T: SolverFloat,
{
    let mut selections = vec![OptionIndex::new(0); instance.num_entities()];
    let mut nodes_explored = 0u64;
    let mut solutions_found = 0u64;
    let mut infeasible = false;
    let mut all_optimal = true;
    let mut all_solved = true;
    let mut abort_reason: Option<String> = None;

    for (entities, outcome) in components.iter().zip(outcomes) {
        nodes_explored += outcome.nodes_explored;
        solutions_found += outcome.solutions_found;
        match outcome.result {
            ComponentResult::Optimal(local) => scatter(&mut selections, entities, &local),
            ComponentResult::Suboptimal(local, reason) => {
                scatter(&mut selections, entities, &local);
                all_optimal = false;
                abort_reason.get_or_insert(reason);
            }
            ComponentResult::Infeasible => infeasible = true,
            ComponentResult::Unknown(reason) => {
                all_optimal = false;
                all_solved = false;
                abort_reason.get_or_insert(reason);
            }
        }
    }

    let statistics = SolverStatisticsBuilder::new()
        .nodes_explored(nodes_explored)
        .solutions_found(solutions_found)
        .components(components.len())
        .used_threads(workers)
        .solve_duration(start_time.elapsed())
        .build();

    if infeasible {
        return SolverOutcome::infeasible(statistics);
    }
    if all_optimal {
        return SolverOutcome::optimal(extract(instance, &selections), statistics);
    }
    let reason = abort_reason.unwrap_or_else(|| "search stopped without proof".to_string());
    if all_solved {
        SolverOutcome::suboptimal(extract(instance, &selections), reason, statistics)
    } else {
        SolverOutcome::unknown(reason, statistics)
    }
}

#[inline]
fn scatter(selections: &mut [OptionIndex], entities: &[EntityIndex], local: &[OptionIndex]) {
    debug_assert_eq!(entities.len(), local.len());
    for (entity, &option) in entities.iter().zip(local) {
        selections[entity.get()] = option;
    }
}

pub struct SolverBuilder {
    time_limit: Option<Duration>,
    node_limit: Option<u64>,
    bounder: BounderKind,
    branching: BranchingKind,
    decompose: bool,
    parallel: bool,
    threads: Option<usize>,
    progress_interval: Option<Duration>,
}

impl Default for SolverBuilder {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl SolverBuilder {
    #[inline]
    pub fn new() -> Self {
        Self {
            time_limit: None,
            node_limit: None,
            bounder: BounderKind::default(),
            branching: BranchingKind::default(),
            decompose: true,
            parallel: true,
            threads: None,
            progress_interval: None,
        }
    }

    /// Takes every setting from `config`.
    pub fn from_config(config: &SolverConfig) -> Self {
        Self {
            time_limit: config.time_limit(),
            node_limit: config.termination.node_limit,
            bounder: config.search.bounder,
            branching: config.search.branching,
            decompose: config.execution.decompose,
            parallel: config.execution.parallel,
            threads: config.execution.threads,
            progress_interval: config.progress_interval(),
        }
    }

    #[inline]
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    #[inline]
    pub fn with_node_limit(mut self, limit: u64) -> Self {
        self.node_limit = Some(limit);
        self
    }

    #[inline]
    pub fn with_bounder(mut self, bounder: BounderKind) -> Self {
        self.bounder = bounder;
        self
    }

    #[inline]
    pub fn with_branching(mut self, branching: BranchingKind) -> Self {
        self.branching = branching;
        self
    }

    #[inline]
    pub fn with_decomposition(mut self, decompose: bool) -> Self {
        self.decompose = decompose;
        self
    }

    #[inline]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    #[inline]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads.max(1));
        self
    }

    #[inline]
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = Some(interval);
        self
    }

    #[inline]
    pub fn build(self) -> Solver {
        Solver {
            time_limit: self.time_limit,
            node_limit: self.node_limit,
            bounder: self.bounder,
            branching: self.branching,
            decompose: self.decompose,
            parallel: self.parallel,
            threads: self.threads,
            progress_interval: self.progress_interval,
            stop_signal: AtomicBool::new(false),
        }
    }
}
