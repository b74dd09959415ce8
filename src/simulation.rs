//! Multi-world simulation driver
//!
//! All worlds evolve from the same initial state and the same stream of candidate events. Each
//! time step runs the following attempt until every world accepts it:
//!
//! 1. Reset the tentative buffers of all worlds.
//! 2. For every event type, in order: draw a sub-seed from the shared generator, thin the
//!    candidates of the pooled state with a generator seeded from it, and offer every surviving
//!    event to every world.
//! 3. Build each world's tentative next state and apply its state modifier.
//! 4. Ask every world's state filter. If any rejects, the whole attempt is discarded and redrawn.
//!
//! The pooled state is the union of the committed states of all worlds, such that an event that
//! only a single world could fire is still offered to all of them.

use rand::{RngCore, SeedableRng};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::core::{
    AggregatedState, Event, EventType, FiltrationPolicies, FiltrationSetup, ProbabilisticSampler,
    SimRng, SimulationState, aggregate,
};
use crate::errors::{CfepiError, Result};

/// How often a single time step may be redrawn before the run fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Redraw until accepted. An unsatisfiable state filter never terminates.
    #[default]
    Unbounded,
    /// Fail with `RetryLimitExceeded` once a step has been reset more than this many times.
    Limit(usize),
}

impl From<Option<usize>> for RetryPolicy {
    fn from(limit: Option<usize>) -> Self {
        match limit {
            Some(limit) => RetryPolicy::Limit(limit),
            None => RetryPolicy::Unbounded,
        }
    }
}

/// Outcome of a single attempt at a time step.
#[derive(Clone, Debug, PartialEq)]
pub enum StepDecision {
    /// All worlds accepted; holds the next state of every world.
    Accept(Vec<SimulationState>),
    /// Indices of the worlds that rejected their tentative state.
    Reject(Vec<usize>),
}

/// Per-world time series of a complete run.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationResult {
    /// `series[world][step]`, including the initial state at step 0.
    pub series: Vec<Vec<AggregatedState>>,
    /// Total number of discarded attempts.
    pub resets: usize,
    /// Discarded attempts of every accepted step.
    pub resets_per_step: Vec<usize>,
}

pub struct Simulation {
    event_types: Vec<EventType>,
    samplers: Vec<ProbabilisticSampler>,
    worlds: Vec<FiltrationSetup>,
    rng: SimRng,
    time: usize,
    duration: usize,
    resets: usize,
    resets_per_step: Vec<usize>,
    retry_policy: RetryPolicy,
}

impl Simulation {
    /// Set up a run of `duration` steps with one world per entry of `policies`.
    ///
    /// Fails before any step executes if the inputs are inconsistent.
    pub fn new(
        event_types: Vec<EventType>,
        probabilities: &[f64],
        initial_state: SimulationState,
        policies: Vec<FiltrationPolicies>,
        duration: usize,
        seed: u64,
    ) -> Result<Self> {
        if policies.is_empty() {
            return Err(CfepiError::InitializationError(
                "There should be at least one world".to_string(),
            ));
        }
        if event_types.is_empty() {
            return Err(CfepiError::InitializationError(
                "There should be at least one event type".to_string(),
            ));
        }
        if event_types.len() != probabilities.len() {
            return Err(CfepiError::InitializationError(format!(
                "Got {} event types but {} probabilities",
                event_types.len(),
                probabilities.len()
            )));
        }
        for event_type in event_types.iter() {
            event_type.validate()?;
        }
        if initial_state.is_empty() {
            return Err(CfepiError::InitializationError(
                "The initial population is empty".to_string(),
            ));
        }
        if !initial_state.is_committed() {
            return Err(CfepiError::InitializationError(
                "Every individual must start in exactly one compartment".to_string(),
            ));
        }

        let samplers = probabilities
            .iter()
            .map(|&probability| ProbabilisticSampler::new(probability))
            .collect::<Result<Vec<ProbabilisticSampler>>>()?;

        let worlds: Vec<FiltrationSetup> = policies
            .into_iter()
            .map(|policies| FiltrationSetup::new(initial_state.clone(), policies))
            .collect();

        log::info!(
            "Created {} worlds with {} individuals and {} event types",
            worlds.len(),
            initial_state.len(),
            event_types.len()
        );

        Ok(Self {
            event_types,
            samplers,
            worlds,
            rng: SimRng::seed_from_u64(seed),
            time: 0,
            duration,
            resets: 0,
            resets_per_step: Vec::with_capacity(duration),
            retry_policy: RetryPolicy::Unbounded,
        })
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn time(&self) -> usize {
        self.time
    }

    pub fn duration(&self) -> usize {
        self.duration
    }

    pub fn is_finished(&self) -> bool {
        self.time >= self.duration
    }

    pub fn resets(&self) -> usize {
        self.resets
    }

    pub fn resets_per_step(&self) -> &[usize] {
        &self.resets_per_step
    }

    pub fn worlds(&self) -> &[FiltrationSetup] {
        &self.worlds
    }

    /// Union of the committed states of all worlds.
    #[cfg(not(feature = "parallel"))]
    pub fn pooled_state(&self) -> SimulationState {
        self.worlds
            .iter()
            .map(|world| world.current_state().clone())
            .reduce(|pooled, state| pooled.union(&state))
            .unwrap_or_default()
    }

    /// Union of the committed states of all worlds.
    #[cfg(feature = "parallel")]
    pub fn pooled_state(&self) -> SimulationState {
        let states: Vec<&SimulationState> = self
            .worlds
            .iter()
            .map(|world| world.current_state())
            .collect();
        states
            .par_iter()
            .map(|state| (*state).clone())
            .reduce_with(|pooled, state| pooled.union(&state))
            .unwrap_or_default()
    }

    /// Histograms of the committed states of all worlds.
    #[cfg(not(feature = "parallel"))]
    pub fn aggregate_worlds(&self) -> Vec<AggregatedState> {
        self.worlds
            .iter()
            .map(|world| aggregate(world.current_state()))
            .collect()
    }

    /// Histograms of the committed states of all worlds.
    #[cfg(feature = "parallel")]
    pub fn aggregate_worlds(&self) -> Vec<AggregatedState> {
        let states: Vec<&SimulationState> = self
            .worlds
            .iter()
            .map(|world| world.current_state())
            .collect();
        states.par_iter().map(|state| aggregate(state)).collect()
    }

    /// Run a single time step to acceptance and commit it.
    ///
    /// Returns the histogram of every world after the step.
    pub fn step(&mut self) -> Result<Vec<AggregatedState>> {
        if self.is_finished() {
            return Err(CfepiError::ImplementationError(format!(
                "Simulation already finished after {} steps",
                self.duration
            )));
        }

        let pooled = self.pooled_state();
        let mut step_resets = 0;
        let states_next = loop {
            match self.attempt(&pooled) {
                StepDecision::Accept(states) => break states,
                StepDecision::Reject(worlds) => {
                    step_resets += 1;
                    self.resets += 1;
                    log::debug!(
                        "Reset step {} (attempt {step_resets}), rejected by worlds {worlds:?}",
                        self.time
                    );
                    if let RetryPolicy::Limit(limit) = self.retry_policy {
                        if step_resets > limit {
                            return Err(CfepiError::RetryLimitExceeded {
                                time: self.time,
                                resets: step_resets,
                            });
                        }
                    }
                }
            }
        };

        for (world, state) in self.worlds.iter_mut().zip(states_next) {
            world.commit(state);
        }
        self.resets_per_step.push(step_resets);
        self.time += 1;

        Ok(self.aggregate_worlds())
    }

    /// Run all remaining steps.
    pub fn run(self) -> Result<SimulationResult> {
        self.run_with(|_, _| {})
    }

    /// Run all remaining steps, calling `on_step` with the time and histograms after every step.
    pub fn run_with<F>(mut self, mut on_step: F) -> Result<SimulationResult>
    where
        F: FnMut(usize, &[AggregatedState]),
    {
        let mut series: Vec<Vec<AggregatedState>> = self
            .aggregate_worlds()
            .into_iter()
            .map(|aggregated| {
                let mut world_series = Vec::with_capacity(self.duration + 1);
                world_series.push(aggregated);
                world_series
            })
            .collect();

        while !self.is_finished() {
            let aggregated = self.step()?;
            on_step(self.time, &aggregated);
            for (world_series, aggregated) in series.iter_mut().zip(aggregated) {
                world_series.push(aggregated);
            }
        }
        log::info!("Ran with {} resets", self.resets);

        Ok(SimulationResult {
            series,
            resets: self.resets,
            resets_per_step: self.resets_per_step,
        })
    }

    /// Draw one attempt at the current time step.
    fn attempt(&mut self, pooled: &SimulationState) -> StepDecision {
        for world in self.worlds.iter_mut() {
            world.reset();
        }

        for event_index in 0..self.event_types.len() {
            self.run_event_type(event_index, pooled);
        }

        let mut states_next = Vec::with_capacity(self.worlds.len());
        for world in self.worlds.iter() {
            let mut state = world.tentative_state();
            state.set_time(self.time);
            world.modify_state(&mut state, &mut self.rng);
            states_next.push(state);
        }

        // every filter is evaluated, so the draw order does not depend on earlier verdicts
        let mut rejected = Vec::new();
        for (world_index, (world, state)) in self.worlds.iter().zip(&states_next).enumerate() {
            if !world.accept_state(state, &mut self.rng) {
                rejected.push(world_index);
            }
        }

        if rejected.is_empty() {
            StepDecision::Accept(states_next)
        } else {
            StepDecision::Reject(rejected)
        }
    }

    /// Sample the events of one type and record them in every world that keeps them.
    fn run_event_type(&mut self, event_index: usize, pooled: &SimulationState) {
        let sub_seed = self.rng.next_u64();
        let sampler = self.samplers[event_index];
        if sampler.probability() == 0.0 {
            return;
        }

        let event_type = &self.event_types[event_index];
        let events: Vec<Event> = sampler
            .sample(event_type.candidates(pooled), SimRng::seed_from_u64(sub_seed))
            .map(|participants| Event::new(event_index, participants))
            .collect();
        log::trace!(
            "Sampled {} events of type {event_index} at step {}",
            events.len(),
            self.time
        );

        for world in self.worlds.iter_mut() {
            for event in events.iter() {
                if world.keep_event(event, &mut self.rng) {
                    world.record(event_type, event);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PotentialState, SimRng};
    use crate::interventions::{FlatReduction, SingleTimeMove, StrictIncidenceFilter};
    use crate::simulation_state;
    use std::cell::RefCell;
    use std::rc::Rc;

    const S: usize = 0;
    const I: usize = 1;
    const R: usize = 2;
    const V: usize = 3;

    fn bit(compartment: usize) -> PotentialState {
        PotentialState::single(compartment)
    }

    fn sir_events() -> Vec<EventType> {
        vec![
            EventType::transition(bit(I), R),
            EventType::interaction(bit(I), bit(S) | bit(V), I),
        ]
    }

    fn reject_all(_: &Event, _: &SimulationState, _: &mut SimRng) -> bool {
        false
    }

    #[test]
    fn refuses_to_run_without_worlds() {
        let result = Simulation::new(
            sir_events(),
            &[0.5, 0.01],
            simulation_state![bit(S); 9, bit(I); 1],
            vec![],
            10,
            2,
        );
        assert!(matches!(result, Err(CfepiError::InitializationError(_))));
    }

    #[test]
    fn refuses_malformed_inputs() {
        let initial = simulation_state![bit(S); 9, bit(I); 1];
        let new = |events: Vec<EventType>, probabilities: &[f64], initial: SimulationState| {
            Simulation::new(
                events,
                probabilities,
                initial,
                vec![FiltrationPolicies::default()],
                10,
                2,
            )
        };

        assert!(new(vec![], &[], initial.clone()).is_err());
        assert!(new(sir_events(), &[0.5], initial.clone()).is_err());
        assert!(new(sir_events(), &[0.5, 1.5], initial.clone()).is_err());
        assert!(new(sir_events(), &[0.5, f64::NAN], initial.clone()).is_err());
        assert!(new(sir_events(), &[0.5, 0.1], simulation_state![]).is_err());
        assert!(new(sir_events(), &[0.5, 0.1], simulation_state![bit(S) | bit(I); 3]).is_err());
        assert!(new(sir_events(), &[0.5, 0.1], initial).is_ok());
    }

    #[test]
    fn series_includes_initial_state() {
        let simulation = Simulation::new(
            sir_events(),
            &[0.5, 0.01],
            simulation_state![bit(S); 99, bit(I); 1],
            vec![FiltrationPolicies::default(), FiltrationPolicies::default()],
            7,
            2,
        )
        .unwrap();
        let result = simulation.run().unwrap();

        assert_eq!(result.series.len(), 2);
        for world_series in result.series.iter() {
            assert_eq!(world_series.len(), 8);
            assert_eq!(world_series[0].count(bit(S)), 99);
            assert_eq!(world_series[0].count(bit(I)), 1);
        }
        assert_eq!(result.resets, 0);
        assert_eq!(result.resets_per_step, vec![0; 7]);
    }

    #[test]
    fn run_with_reports_every_step() {
        let simulation = Simulation::new(
            sir_events(),
            &[0.5, 0.01],
            simulation_state![bit(S); 49, bit(I); 1],
            vec![FiltrationPolicies::default()],
            5,
            2,
        )
        .unwrap();
        let mut reported = Vec::new();
        let result = simulation
            .run_with(|time, aggregated| reported.push((time, aggregated.to_vec())))
            .unwrap();

        assert_eq!(reported.len(), 5);
        assert_eq!(reported[4].0, 5);
        for (step, (_, aggregated)) in reported.iter().enumerate() {
            assert_eq!(aggregated[0], result.series[0][step + 1]);
        }
    }

    #[test]
    fn step_after_finish_fails() {
        let mut simulation = Simulation::new(
            sir_events(),
            &[0.5, 0.01],
            simulation_state![bit(S); 9, bit(I); 1],
            vec![FiltrationPolicies::default()],
            1,
            2,
        )
        .unwrap();
        assert!(simulation.step().is_ok());
        assert!(simulation.is_finished());
        assert!(matches!(
            simulation.step(),
            Err(CfepiError::ImplementationError(_))
        ));
    }

    #[test]
    fn population_is_conserved() {
        let policies = vec![
            FiltrationPolicies::default(),
            FiltrationPolicies::default().with_event_filter(FlatReduction::new(1, 0.5)),
            FiltrationPolicies::default().with_state_modifier(SingleTimeMove::new(
                0.3,
                2,
                bit(S),
                V,
            )),
        ];
        let simulation = Simulation::new(
            sir_events(),
            &[0.3, 0.004],
            simulation_state![bit(S); 495, bit(I); 5],
            policies,
            30,
            11,
        )
        .unwrap();
        let result = simulation.run().unwrap();

        for world_series in result.series.iter() {
            for aggregated in world_series.iter() {
                assert_eq!(aggregated.total(), 500);
                assert!(aggregated.iter().all(|(pattern, _)| pattern.count() == 1));
            }
        }
    }

    #[test]
    fn same_seed_same_series() {
        let run = |seed: u64| {
            let policies = vec![
                FiltrationPolicies::default(),
                FiltrationPolicies::default().with_event_filter(FlatReduction::new(1, 0.2)),
            ];
            Simulation::new(
                sir_events(),
                &[0.2, 0.002],
                simulation_state![bit(S); 990, bit(I); 10],
                policies,
                20,
                seed,
            )
            .unwrap()
            .run()
            .unwrap()
        };

        assert_eq!(run(5), run(5));
        assert_ne!(run(5).series, run(6).series);
    }

    #[test]
    fn saturating_transition() {
        let a = bit(0);
        let b = bit(1);
        let mut simulation = Simulation::new(
            vec![EventType::transition(a, 1)],
            &[1.0],
            simulation_state![a; 40, b; 10],
            vec![FiltrationPolicies::default()],
            1,
            3,
        )
        .unwrap();

        let aggregated = simulation.step().unwrap();
        assert_eq!(aggregated[0].count(a), 0);
        assert_eq!(aggregated[0].count(b), 50);
    }

    #[test]
    fn rejecting_an_event_equals_removing_it() {
        let initial = simulation_state![bit(S); 290, bit(I); 10];

        let filtered = Simulation::new(
            sir_events(),
            &[0.25, 0.003],
            initial.clone(),
            vec![FiltrationPolicies::default().with_event_filter(
                |event: &Event, _: &SimulationState, _: &mut SimRng| event.event_type != 0,
            )],
            15,
            8,
        )
        .unwrap()
        .run()
        .unwrap();

        let removed = Simulation::new(
            sir_events(),
            &[0.0, 0.003],
            initial,
            vec![FiltrationPolicies::default()],
            15,
            8,
        )
        .unwrap()
        .run()
        .unwrap();

        assert_eq!(filtered.series, removed.series);
        assert!(filtered.series[0].iter().all(|aggregated| aggregated.count(bit(R)) == 0));
        assert!(filtered.series[0].last().unwrap().count(bit(I)) > 10);
    }

    #[test]
    fn rejecting_all_events_keeps_initial_state() {
        let mut simulation = Simulation::new(
            vec![
                EventType::transition(bit(I), R),
                EventType::interaction(bit(I), bit(S), I),
            ],
            &[0.5, 0.3],
            simulation_state![bit(S); 999, bit(I); 1],
            vec![FiltrationPolicies::default().with_event_filter(reject_all)],
            1,
            2,
        )
        .unwrap();
        let initial = simulation.aggregate_worlds();

        let aggregated = simulation.step().unwrap();
        assert_eq!(aggregated[0].count(bit(S)), 999);
        assert_eq!(aggregated[0].count(bit(I)), 1);
        assert_eq!(aggregated[0].len(), 2);
        assert_eq!(aggregated[0].iter().collect::<Vec<_>>(), initial[0].iter().collect::<Vec<_>>());
    }

    #[test]
    fn incidence_pinning_commits_the_only_feasible_trajectory() {
        let onset = vec![EventType::transition(bit(S), I)];
        let pinned = FiltrationPolicies::default()
            .with_state_filter(StrictIncidenceFilter::new(I, vec![5, 0, 5]));
        let free = FiltrationPolicies::default();

        let simulation = Simulation::new(
            onset,
            &[0.5],
            simulation_state![bit(S); 10],
            vec![pinned, free],
            4,
            21,
        )
        .unwrap();
        let result = simulation.run().unwrap();

        let infected: Vec<usize> = result.series[0]
            .iter()
            .map(|aggregated| aggregated.count(bit(I)))
            .collect();
        assert_eq!(infected, vec![0, 5, 5, 10, 10]);
        assert!(result.resets > 0);
        assert_eq!(result.resets_per_step.len(), 4);
        assert_eq!(result.resets_per_step[3], 0);
        assert_eq!(result.resets, result.resets_per_step.iter().sum::<usize>());

        for world_series in result.series.iter() {
            assert!(world_series.iter().all(|aggregated| aggregated.total() == 10));
        }
    }

    #[test]
    fn retry_limit_stops_unsatisfiable_filters() {
        let mut simulation = Simulation::new(
            vec![EventType::transition(bit(S), I)],
            &[0.5],
            simulation_state![bit(S); 10],
            vec![FiltrationPolicies::default().with_state_filter(
                |_: &FiltrationSetup, _: &SimulationState, _: &mut SimRng| false,
            )],
            3,
            2,
        )
        .unwrap()
        .with_retry_policy(RetryPolicy::Limit(25));

        assert_eq!(
            simulation.step(),
            Err(CfepiError::RetryLimitExceeded {
                time: 0,
                resets: 26
            })
        );
        assert_eq!(simulation.resets(), 26);
        assert_eq!(simulation.time(), 0);
    }

    #[test]
    fn refuses_unrepresentable_destination() {
        let result = Simulation::new(
            vec![EventType::transition(bit(S), 70)],
            &[0.5],
            simulation_state![bit(S); 3],
            vec![FiltrationPolicies::default()],
            1,
            2,
        );
        assert!(matches!(result, Err(CfepiError::InitializationError(_))));
    }

    #[test]
    fn self_pair_with_two_destinations_keeps_state_committed() {
        let split = EventType::new(vec![bit(S), bit(S)], vec![Some(I), Some(R)]).unwrap();
        let mut simulation = Simulation::new(
            vec![split],
            &[1.0],
            simulation_state![bit(S); 1],
            vec![FiltrationPolicies::default()],
            1,
            2,
        )
        .unwrap();

        let aggregated = simulation.step().unwrap();
        assert!(simulation.worlds()[0].current_state().is_committed());
        assert_eq!(aggregated[0].count(bit(S)), 1);
        assert!(aggregated[0].iter().all(|(pattern, _)| pattern.count() == 1));
    }

    #[test]
    fn policies_run_in_draw_order() {
        let events_seen: Rc<RefCell<Vec<(usize, usize, usize)>>> = Rc::default();
        let states_seen: Rc<RefCell<Vec<usize>>> = Rc::default();

        let policies = (0..2)
            .map(|world| {
                let events_seen = events_seen.clone();
                let states_seen = states_seen.clone();
                FiltrationPolicies::default()
                    .with_event_filter(
                        move |event: &Event, _: &SimulationState, _: &mut SimRng| {
                            events_seen.borrow_mut().push((
                                world,
                                event.event_type,
                                event.participants.as_slice()[0],
                            ));
                            true
                        },
                    )
                    .with_state_filter(
                        move |_: &FiltrationSetup, _: &SimulationState, _: &mut SimRng| {
                            states_seen.borrow_mut().push(world);
                            world != 0
                        },
                    )
            })
            .collect();

        // A = 0, B = 1; individuals 0 and 1 start in A, individual 2 in B
        let mut simulation = Simulation::new(
            vec![
                EventType::transition(bit(0), 1),
                EventType::transition(bit(1), 0),
            ],
            &[1.0, 1.0],
            simulation_state![bit(0); 2, bit(1); 1],
            policies,
            1,
            2,
        )
        .unwrap()
        .with_retry_policy(RetryPolicy::Limit(0));

        assert_eq!(
            simulation.step(),
            Err(CfepiError::RetryLimitExceeded { time: 0, resets: 1 })
        );
        assert_eq!(
            *events_seen.borrow(),
            vec![
                (0, 0, 0),
                (0, 0, 1),
                (1, 0, 0),
                (1, 0, 1),
                (0, 1, 2),
                (1, 1, 2),
            ]
        );
        assert_eq!(*states_seen.borrow(), vec![0, 1]);
    }

    #[test]
    fn retry_policy_from_option() {
        assert_eq!(RetryPolicy::from(None), RetryPolicy::Unbounded);
        assert_eq!(RetryPolicy::from(Some(3)), RetryPolicy::Limit(3));
    }
}
