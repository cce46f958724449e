//! Randomized hill-climbing over pool membership.

use crate::{place_all, seed_pools, Capacity, Facility, Objective, PoolId, SearchConfig, ServerId};

use indicatif::ProgressBar;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::Serialize;

/// Progress bar is updated every this many trials.
const PROGRESS_STEP: usize = 1 << 12;

/// Outcome of a single local search trial.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Trial {
    /// No pools satisfying the trial's constraints were found; nothing changed.
    Abandoned,
    /// The change did not decrease the global score and was kept.
    Accepted,
    /// The change decreased the global score and was rolled back.
    Rejected,
}

/// Trial counts and scores of a local search phase.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseStats {
    /// Number of accepted trials.
    pub accepted: usize,
    /// Number of rolled back trials.
    pub rejected: usize,
    /// Number of abandoned trials.
    pub abandoned: usize,
    /// Global score before the phase.
    pub initial_score: Capacity,
    /// Global score after the phase.
    pub final_score: Capacity,
}

impl PhaseStats {
    fn record(&mut self, trial: Trial) {
        match trial {
            Trial::Abandoned => self.abandoned += 1,
            Trial::Accepted => self.accepted += 1,
            Trial::Rejected => self.rejected += 1,
        }
    }
}

/// Local search over pool membership of placed servers.
///
/// Each trial randomly perturbs the membership of two pools and keeps the change only if the
/// global score does not decrease. Therefore, the global score never decreases over the
/// lifetime of the search.
pub struct LocalSearch<'a, R: Rng + ?Sized> {
    facility: &'a mut Facility,
    objective: Objective,
    rng: &'a mut R,
    group_sizes: Uniform<usize>,
    max_pool_draws: usize,
}

impl<'a, R: Rng + ?Sized> LocalSearch<'a, R> {
    /// Constructs a search over the current pools of `facility`.
    pub fn new(facility: &'a mut Facility, rng: &'a mut R, config: &SearchConfig) -> Self {
        let objective = Objective::new(facility.pools().len());
        Self {
            facility,
            objective,
            rng,
            group_sizes: Uniform::new_inclusive(0, config.max_group_size),
            max_pool_draws: config.max_pool_draws,
        }
    }

    /// The data center being optimized.
    #[must_use]
    pub fn facility(&self) -> &Facility {
        self.facility
    }

    /// The objective along with its current cache.
    #[must_use]
    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    /// Current global score.
    pub fn score(&mut self) -> Capacity {
        self.objective.global_score(&*self.facility)
    }

    /// Marks all cached pool capacities stale.
    pub fn reset_cache(&mut self) {
        self.objective.reset();
    }

    /// Attempts to exchange random groups of servers between two random pools.
    pub fn try_swap(&mut self) -> Trial {
        let first_size = self.group_sizes.sample(&mut *self.rng);
        let first = match self.pick_pool(first_size, None) {
            Some(pool) => pool,
            None => return Trial::Abandoned,
        };
        let second_size = self.group_sizes.sample(&mut *self.rng);
        let second = match self.pick_pool(second_size, Some(first)) {
            Some(pool) => pool,
            None => return Trial::Abandoned,
        };
        let outgoing = self.draw_members(first, first_size);
        let incoming = self.draw_members(second, second_size);
        self.attempt(first, second, &outgoing, &incoming)
    }

    /// Attempts to move a random group of servers from one random pool to another.
    pub fn try_move(&mut self) -> Trial {
        let size = self.group_sizes.sample(&mut *self.rng);
        let source = match self.pick_pool(size, None) {
            Some(pool) => pool,
            None => return Trial::Abandoned,
        };
        let destination = match self.pick_pool(0, Some(source)) {
            Some(pool) => pool,
            None => return Trial::Abandoned,
        };
        let moved = self.draw_members(source, size);
        self.attempt(source, destination, &moved, &[])
    }

    /// Runs `iterations` swap trials.
    pub fn run_swaps(&mut self, iterations: usize, progress: Option<&ProgressBar>) -> PhaseStats {
        self.run_phase("swap", iterations, progress, Self::try_swap)
    }

    /// Runs `iterations` move trials.
    pub fn run_moves(&mut self, iterations: usize, progress: Option<&ProgressBar>) -> PhaseStats {
        self.run_phase("move", iterations, progress, Self::try_move)
    }

    fn run_phase<F>(
        &mut self,
        name: &str,
        iterations: usize,
        progress: Option<&ProgressBar>,
        mut trial: F,
    ) -> PhaseStats
    where
        F: FnMut(&mut Self) -> Trial,
    {
        self.reset_cache();
        let mut stats = PhaseStats {
            initial_score: self.score(),
            ..PhaseStats::default()
        };
        if let Some(pb) = progress {
            pb.set_message(name);
            pb.set_length(iterations as u64);
            pb.set_position(0);
        }
        for iteration in 0..iterations {
            stats.record(trial(self));
            if iteration % PROGRESS_STEP == 0 {
                if let Some(pb) = progress {
                    pb.set_position(iteration as u64);
                }
            }
        }
        stats.final_score = self.score();
        if let Some(pb) = progress {
            pb.set_position(iterations as u64);
        }
        log::info!(
            "Phase {} done: score {} -> {} ({} accepted, {} rejected, {} abandoned)",
            name,
            stats.initial_score,
            stats.final_score,
            stats.accepted,
            stats.rejected,
            stats.abandoned
        );
        stats
    }

    /// Draws pools until one has at least `min_members` members and is not `exclude`.
    fn pick_pool(&mut self, min_members: usize, exclude: Option<PoolId>) -> Option<PoolId> {
        let rng = &mut *self.rng;
        let pools = self.facility.pools();
        let distr = Uniform::new(0, pools.len());
        (0..self.max_pool_draws)
            .map(|_| &pools[distr.sample(rng)])
            .find(|pool| Some(pool.id()) != exclude && pool.len() >= min_members)
            .map(|pool| pool.id())
    }

    /// Draws `count` distinct members of `pool`.
    fn draw_members(&mut self, pool: PoolId, count: usize) -> Vec<ServerId> {
        self.facility
            .pool(pool)
            .members()
            .choose_multiple(&mut *self.rng, count)
            .copied()
            .collect()
    }

    /// Transfers `forward` servers from `from` to `to`, and `backward` servers from `to` to
    /// `from`.
    fn exchange(&mut self, from: PoolId, to: PoolId, forward: &[ServerId], backward: &[ServerId]) {
        for &server in forward {
            self.facility.transfer(server, from, to);
        }
        for &server in backward {
            self.facility.transfer(server, to, from);
        }
    }

    /// Applies the exchange and keeps it if the global score does not drop; otherwise,
    /// restores both the membership and the cache entries of both pools.
    fn attempt(
        &mut self,
        first: PoolId,
        second: PoolId,
        forward: &[ServerId],
        backward: &[ServerId],
    ) -> Trial {
        let before = self.score();
        let cached = (self.objective.cached(first), self.objective.cached(second));
        self.exchange(first, second, forward, backward);
        self.objective.invalidate(first);
        self.objective.invalidate(second);
        let after = self.score();
        if after >= before {
            log::trace!(
                "Accepted: {:?} {} -> {}, {:?} {} -> {}; score {}",
                forward,
                first,
                second,
                backward,
                second,
                first,
                after
            );
            Trial::Accepted
        } else {
            self.exchange(second, first, forward, backward);
            self.objective.restore(first, cached.0);
            self.objective.restore(second, cached.1);
            Trial::Rejected
        }
    }
}

/// Runs the full optimization: placement, pool seeding, swap phase, and move phase.
#[derive(Clone, Default)]
pub struct Optimizer {
    config: SearchConfig,
    progress_bar: Option<ProgressBar>,
}

impl Optimizer {
    /// Constructs an optimizer with the given search configuration.
    #[must_use]
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            progress_bar: None,
        }
    }

    /// Sets a progress bar to report local search progress.
    pub fn progress_bar(&mut self, progress_bar: ProgressBar) -> &mut Self {
        self.progress_bar = Some(progress_bar);
        self
    }

    /// Places servers, seeds pools, improves pools with local search, and returns the final
    /// global score.
    ///
    /// Servers that are already placed keep their locations.
    pub fn optimize<R: Rng + ?Sized>(&self, facility: &mut Facility, rng: &mut R) -> Capacity {
        place_all(facility, rng);
        seed_pools(facility, rng);
        let mut search = LocalSearch::new(facility, rng, &self.config);
        log::info!("Pools seeded with score {}", search.score());
        let progress = self.progress_bar.as_ref();
        search.run_swaps(self.config.swap_iterations, progress);
        let stats = search.run_moves(self.config.move_iterations, progress);
        if let Some(pb) = progress {
            pb.finish_with_message("done");
        }
        stats.final_score
    }
}
