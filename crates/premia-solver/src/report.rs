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

//! Human- and machine-readable views of a `SolverOutcome`.
//!
//! A `SolutionReport` flattens an outcome into rows: one per entity with the
//! selected option, its reward and risk and the local slack, and one per
//! global constraint with its realized left-hand side, budget and slack.
//! Infinite slacks (entities without a threshold) are reported as absent.

use premia_model::{
    index::{EntityIndex, OptionIndex},
    model::Instance,
};
use premia_search::{num::SolverFloat, result::SolverOutcome};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRow {
    pub entity: String,
    pub option: usize,
    pub reward: f64,
    pub risk: f64,
    pub threshold: Option<f64>,
    pub local_slack: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintRow {
    pub name: String,
    pub lhs: f64,
    pub budget: f64,
    pub slack: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsRow {
    pub nodes_explored: u64,
    pub solutions_found: u64,
    pub components: usize,
    pub used_threads: usize,
    pub solve_duration_secs: f64,
    /// Explored nodes as a percentage of the naive search space.
    pub coverage_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolutionReport {
    pub status: &'static str,
    pub reason: String,
    pub total_reward: Option<f64>,
    pub entities: Vec<EntityRow>,
    pub constraints: Vec<ConstraintRow>,
    pub statistics: StatisticsRow,
}

impl SolutionReport {
    /// Builds the report of `outcome`, which must come from solving
    /// `instance`.
    pub fn new<T>(instance: &Instance<T>, outcome: &SolverOutcome<T>) -> Self
    where
        T: SolverFloat,
    {
        let stats = &outcome.statistics;
        let statistics = StatisticsRow {
            nodes_explored: stats.nodes_explored,
            solutions_found: stats.solutions_found,
            components: stats.components,
            used_threads: stats.used_threads,
            solve_duration_secs: stats.solve_duration.as_secs_f64(),
            coverage_pct: instance.complexity().coverage(stats.nodes_explored),
        };

        let Some(solution) = outcome.solution() else {
            return Self {
                status: outcome.result.status(),
                reason: outcome.reason.to_string(),
                total_reward: None,
                entities: Vec::new(),
                constraints: Vec::new(),
                statistics,
            };
        };

        let entities = instance
            .entities()
            .map(|e| entity_row(instance, e, solution.selection(e), solution.local_slack(e)))
            .collect();
        let constraints = instance
            .constraints()
            .map(|c| ConstraintRow {
                name: instance.constraint_name(c).to_string(),
                lhs: solution.global_lhs(c).as_f64(),
                budget: instance.budget(c).as_f64(),
                slack: solution.global_slack(c).as_f64(),
            })
            .collect();

        Self {
            status: outcome.result.status(),
            reason: outcome.reason.to_string(),
            total_reward: Some(solution.total_reward().as_f64()),
            entities,
            constraints,
            statistics,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Looks up the row of a constraint by name.
    pub fn constraint(&self, name: &str) -> Option<&ConstraintRow> {
        self.constraints.iter().find(|row| row.name == name)
    }

    /// Renders the report as aligned text tables.
    pub fn render_table(&self) -> String {
        self.to_string()
    }

    fn write_table<W: std::fmt::Write>(&self, out: &mut W) -> std::fmt::Result {
        writeln!(out, "Status: {}", self.status)?;
        writeln!(out, "Termination: {}", self.reason)?;
        match self.total_reward {
            Some(reward) => writeln!(out, "Total Reward: {}", reward)?,
            None => writeln!(out, "Total Reward: -")?,
        }

        if !self.entities.is_empty() {
            let width = self
                .entities
                .iter()
                .map(|row| row.entity.len())
                .max()
                .unwrap_or(0)
                .max("Entity".len());
            writeln!(out)?;
            writeln!(
                out,
                "{:<width$} | {:>6} | {:>12} | {:>10} | {:>10} | {:>11}",
                "Entity", "Option", "Reward", "Risk", "Threshold", "Local Slack"
            )?;
            writeln!(
                out,
                "{:-<width$}-+-{:-<6}-+-{:-<12}-+-{:-<10}-+-{:-<10}-+-{:-<11}",
                "", "", "", "", "", ""
            )?;
            for row in &self.entities {
                writeln!(
                    out,
                    "{:<width$} | {:>6} | {:>12} | {:>10} | {:>10} | {:>11}",
                    row.entity,
                    row.option,
                    row.reward,
                    row.risk,
                    optional(row.threshold),
                    optional(row.local_slack),
                )?;
            }
        }

        if !self.constraints.is_empty() {
            let width = self
                .constraints
                .iter()
                .map(|row| row.name.len())
                .max()
                .unwrap_or(0)
                .max("Constraint".len());
            writeln!(out)?;
            writeln!(
                out,
                "{:<width$} | {:>12} | {:>12} | {:>12}",
                "Constraint", "LHS", "Budget", "Slack"
            )?;
            writeln!(
                out,
                "{:-<width$}-+-{:-<12}-+-{:-<12}-+-{:-<12}",
                "", "", "", ""
            )?;
            for row in &self.constraints {
                writeln!(
                    out,
                    "{:<width$} | {:>12} | {:>12} | {:>12}",
                    row.name, row.lhs, row.budget, row.slack
                )?;
            }
        }

        writeln!(out)?;
        write!(
            out,
            "Nodes: {}  Solutions: {}  Components: {}  Threads: {}  Time: {:.3}s",
            self.statistics.nodes_explored,
            self.statistics.solutions_found,
            self.statistics.components,
            self.statistics.used_threads,
            self.statistics.solve_duration_secs
        )?;
        match self.statistics.coverage_pct {
            Some(pct) => writeln!(out, "  Coverage: {:.4}%", pct),
            None => writeln!(out),
        }
    }
}

impl std::fmt::Display for SolutionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.write_table(f)
    }
}

fn entity_row<T>(
    instance: &Instance<T>,
    entity: EntityIndex,
    option: OptionIndex,
    local_slack: T,
) -> EntityRow
where
    T: SolverFloat,
{
    EntityRow {
        entity: instance.entity_id(entity).to_string(),
        option: option.get(),
        reward: instance.option_reward(entity, option).as_f64(),
        risk: instance.option_risk(entity, option).as_f64(),
        threshold: instance.local_constraint(entity).map(SolverFloat::as_f64),
        local_slack: finite(local_slack.as_f64()),
    }
}

#[inline]
fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::SolverBuilder;
    use premia_model::model::InstanceBuilder;

    fn instance() -> Instance<f64> {
        let mut b = InstanceBuilder::new();
        b.add_entity("A", [(0.0, 0.01), (20.0, 0.05), (40.0, 0.15)])
            .add_entity("B", [(0.0, 0.01), (15.0, 0.03), (30.0, 0.10)])
            .set_risk_threshold("A", 0.10)
            .add_total_risk_constraint("portfolio", 0.25, ["A", "B"]);
        b.build().unwrap()
    }

    fn report() -> SolutionReport {
        let instance = instance();
        let outcome = SolverBuilder::new()
            .with_parallel(false)
            .build()
            .solve(&instance);
        SolutionReport::new(&instance, &outcome)
    }

    #[test]
    fn test_rows_describe_the_selection() {
        let report = report();
        assert_eq!(report.status, "Optimal");
        assert_eq!(report.total_reward, Some(50.0));
        assert_eq!(report.entities.len(), 2);

        let a = &report.entities[0];
        assert_eq!(a.entity, "A");
        assert_eq!(a.option, 1);
        assert_eq!(a.reward, 20.0);
        assert_eq!(a.threshold, Some(0.10));
        assert!(a.local_slack.is_some());

        let b = &report.entities[1];
        assert_eq!(b.option, 2);
        assert_eq!(b.threshold, None);
        assert_eq!(b.local_slack, None);

        let nodes = report.statistics.nodes_explored as f64;
        let coverage = report.statistics.coverage_pct.unwrap();
        assert!((coverage - nodes / 9.0 * 100.0).abs() < 1e-9);

        let portfolio = report.constraint("portfolio").unwrap();
        assert_eq!(portfolio.budget, 0.25);
        assert!((portfolio.lhs - 0.15).abs() < 1e-12);
        assert!(report.constraint("missing").is_none());
    }

    #[test]
    fn test_json_output() {
        let report = report();
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["status"], "Optimal");
        assert_eq!(value["total_reward"], 50.0);
        assert_eq!(value["entities"][1]["entity"], "B");
        assert!(value["entities"][1]["local_slack"].is_null());
        assert_eq!(value["constraints"][0]["name"], "portfolio");
        assert!(report.to_json_pretty().unwrap().contains('\n'));
    }

    #[test]
    fn test_table_output() {
        let table = report().render_table();
        assert!(table.starts_with("Status: Optimal\n"));
        assert!(table.contains("Total Reward: 50"));
        assert!(table.contains("Local Slack"));
        assert!(table.contains("portfolio"));
        assert!(table.contains("Components: 1"));
        assert!(table.contains("Coverage: "));
    }

    #[test]
    fn test_infeasible_report_has_no_rows() {
        let mut b = InstanceBuilder::<f64>::new();
        b.add_entity("A", [(1.0, 0.5)]).set_risk_threshold("A", 0.1);
        let instance = b.build().unwrap();
        let outcome = SolverBuilder::new().build().solve(&instance);
        let report = SolutionReport::new(&instance, &outcome);

        assert_eq!(report.status, "Infeasible");
        assert_eq!(report.total_reward, None);
        assert!(report.entities.is_empty());
        assert!(report.render_table().contains("Total Reward: -"));
    }
}
