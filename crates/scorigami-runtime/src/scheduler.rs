//! Drivers for [`LayoutEngine::step`].
//!
//! The same engine runs either to completion on the calling thread (batch
//! and server precompute) or in short slices that yield back to the async
//! executor between steps (interactive use).

use crate::cancel::CancelToken;
use crate::layout::{LayoutEngine, LayoutReport, StepOutcome};
use std::time::{Duration, Instant};
use tracing::debug;

/// Run the layout to completion on the current thread.
///
/// Bounded by the engine's own iteration and wall-clock budgets.
pub fn run_blocking(engine: &mut LayoutEngine) -> LayoutReport {
    let deadline = Instant::now() + engine.time_budget() + Duration::from_millis(1);
    while engine.step(deadline) == StepOutcome::Pending {}
    engine.report()
}

/// Run at most `iterations` relaxation steps regardless of wall-clock
/// slices. A deadline already in the past makes each `step` run exactly
/// one iteration.
pub fn run_iterations(engine: &mut LayoutEngine, iterations: usize) -> LayoutReport {
    let target = engine.iterations() + iterations;
    while engine.iterations() < target {
        if engine.step(Instant::now()) == StepOutcome::Done {
            break;
        }
    }
    engine.report()
}

/// Run the layout in `slice`-long steps, yielding to the runtime between
/// them. Returns early, with the engine left mid-relaxation, if `cancel`
/// fires.
pub async fn run_cooperative(
    engine: &mut LayoutEngine,
    slice: Duration,
    cancel: Option<&CancelToken>,
) -> LayoutReport {
    let mut slices = 0usize;
    loop {
        if cancel.map_or(false, |c| c.is_cancelled()) {
            debug!(slices, "cooperative layout cancelled");
            break;
        }
        let outcome = engine.step(Instant::now() + slice);
        slices += 1;
        if outcome == StepOutcome::Done {
            break;
        }
        tokio::task::yield_now().await;
    }
    engine.report()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{LayoutOptions, LayoutState};
    use scorigami_core::types::{Edge, GraphDataset, Node};

    fn star(n: u32) -> GraphDataset {
        let mut nodes = vec![Node::root()];
        let mut edges = Vec::new();
        for id in 1..=n {
            nodes.push(Node {
                id,
                slug: format!("{:04}", id),
                depth: 1 + id % 3,
                played: true,
                occurrences: u64::from(id),
                norm: 0.0,
            });
            edges.push(Edge::new(0, id));
        }
        GraphDataset::new(nodes, edges)
    }

    fn options(iterations: usize) -> LayoutOptions {
        LayoutOptions {
            time_budget_ms: Some(30_000),
            max_iterations: Some(iterations),
            ..Default::default()
        }
    }

    #[test]
    fn blocking_and_iteration_drivers_agree() {
        let ds = star(60);
        let mut a = LayoutEngine::new(&ds, &options(12));
        let mut b = LayoutEngine::new(&ds, &options(12));

        let ra = run_blocking(&mut a);
        let rb = run_iterations(&mut b, 12);
        assert_eq!(ra.state, LayoutState::Relaxed);
        assert_eq!(ra.iterations, 12);
        assert_eq!(rb.iterations, 12);
        assert_eq!(a.position_map(), b.position_map());
    }

    #[tokio::test]
    async fn cooperative_matches_blocking() {
        let ds = star(60);
        let mut a = LayoutEngine::new(&ds, &options(20));
        let mut b = LayoutEngine::new(&ds, &options(20));

        run_blocking(&mut a);
        let report = run_cooperative(&mut b, Duration::from_micros(1), None).await;
        assert_eq!(report.state, LayoutState::Relaxed);
        assert_eq!(a.position_map(), b.position_map());
    }

    #[tokio::test]
    async fn cancelled_cooperative_run_stops() {
        let ds = star(60);
        let mut engine = LayoutEngine::new(&ds, &options(1_000));
        let token = CancelToken::new();
        token.cancel();
        let report = run_cooperative(&mut engine, Duration::from_millis(1), Some(&token)).await;
        assert_eq!(report.iterations, 0);
        assert_ne!(report.state, LayoutState::Relaxed);
    }
}
