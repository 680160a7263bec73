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

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use premia_model::model::{Instance, InstanceBuilder};
use premia_solver::{config::BounderKind, solver::SolverBuilder};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::hint::black_box;

/// A renewal book: every policy chooses among five price changes whose
/// premium gain and cancellation probability both grow with the increase.
/// Policies are grouped into portfolios of `group` that share a risk budget;
/// `group == 0` leaves the book purely local.
fn renewal_book(num_policies: usize, group: usize, seed: u64) -> Instance<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut b = InstanceBuilder::new();

    for p in 0..num_policies {
        let premium: f64 = rng.random_range(300.0..1500.0);
        let elasticity: f64 = rng.random_range(0.02..0.12);
        let menu: Vec<(f64, f64)> = (0..5)
            .map(|step| {
                let increase = step as f64 * 0.02;
                let lapse = (0.01 + elasticity * step as f64).min(1.0);
                (premium * increase * (1.0 - lapse), lapse)
            })
            .collect();
        b.add_entity(format!("policy-{p}"), menu);
        b.set_risk_threshold(format!("policy-{p}"), rng.random_range(0.15..0.40));
    }

    if group > 0 {
        for (k, start) in (0..num_policies).step_by(group).enumerate() {
            let members: Vec<String> = (start..(start + group).min(num_policies))
                .map(|p| format!("policy-{p}"))
                .collect();
            let budget = 0.12 * members.len() as f64;
            b.add_total_risk_constraint(format!("portfolio-{k}"), budget, members);
        }
    }

    b.build().unwrap()
}

fn bench_local_books(c: &mut Criterion) {
    let mut group = c.benchmark_group("local_books");
    let solver = SolverBuilder::new().with_parallel(false).build();

    for num_policies in [1_000, 10_000] {
        let instance = renewal_book(num_policies, 0, 1);
        group.throughput(Throughput::Elements(num_policies as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_policies),
            &instance,
            |b, instance| b.iter(|| solver.solve(black_box(instance))),
        );
    }
    group.finish();
}

fn bench_portfolio_books(c: &mut Criterion) {
    let mut group = c.benchmark_group("portfolio_books");

    for bounder in [BounderKind::Knapsack, BounderKind::Independent] {
        for parallel in [false, true] {
            let solver = SolverBuilder::new()
                .with_bounder(bounder)
                .with_parallel(parallel)
                .with_node_limit(5_000_000)
                .build();
            let instance = renewal_book(400, 8, 7);
            let label = format!("{}-{}", bounder, if parallel { "parallel" } else { "sequential" });

            group.throughput(Throughput::Elements(instance.num_entities() as u64));
            group.bench_with_input(BenchmarkId::new(label, 400), &instance, |b, instance| {
                b.iter(|| {
                    let outcome = solver.solve(black_box(instance));
                    assert!(
                        outcome.has_solution(),
                        "benchmark instance lost its solution: {}",
                        outcome.result
                    );
                })
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_local_books, bench_portfolio_books);
criterion_main!(benches);
