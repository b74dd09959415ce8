//! Event types and lazy enumeration of event candidates
//!
//! An event type describes a state transition with `k` roles. Each role carries a precondition
//! mask that the occupant's current compartment must intersect and an optional destination
//! compartment. Event types of different arity are unified in the `EventType` enum, and all
//! operations dispatch on the arity tag.
//!
//! Candidate enumeration never materializes the cartesian product of role occupants. Only the
//! per-role lists of eligible individuals are collected, and their product is iterated lazily.

use itertools::{Itertools, Product};
use std::vec::IntoIter;

use crate::core::compartments::MAX_COMPARTMENTS;
use crate::core::state::{PotentialState, SimulationState};
use crate::errors::{CfepiError, Result};

/// Event type with a fixed number of roles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SizedEventType<const N: usize> {
    preconditions: [PotentialState; N],
    postconditions: [Option<usize>; N],
}

impl<const N: usize> SizedEventType<N> {
    pub fn new(preconditions: [PotentialState; N], postconditions: [Option<usize>; N]) -> Self {
        Self {
            preconditions,
            postconditions,
        }
    }

    pub fn preconditions(&self) -> &[PotentialState; N] {
        &self.preconditions
    }

    pub fn postconditions(&self) -> &[Option<usize>; N] {
        &self.postconditions
    }

    /// Individuals eligible for each role in `state`, in ascending index order.
    pub fn eligible(&self, state: &SimulationState) -> [Vec<usize>; N] {
        std::array::from_fn(|role| {
            state
                .iter()
                .enumerate()
                .filter(|(_, potential_state)| potential_state.intersects(self.preconditions[role]))
                .map(|(individual, _)| individual)
                .collect()
        })
    }

    pub fn check_preconditions(&self, state: &SimulationState, individuals: &[usize; N]) -> bool {
        individuals
            .iter()
            .zip(self.preconditions.iter())
            .all(|(&individual, &mask)| state[individual].intersects(mask))
    }

    /// Whether any role with a destination is occupied by an individual that already gained a
    /// compartment in `entered`, or that also occupies another role with a destination.
    pub fn conflicts(&self, entered: &SimulationState, individuals: &[usize; N]) -> bool {
        let moves = |role: usize| self.postconditions[role].is_some();
        (0..N).filter(|&role| moves(role)).any(|role| {
            let individual = individuals[role];
            !entered[individual].is_empty()
                || (0..role).any(|other| moves(other) && individuals[other] == individual)
        })
    }

    /// Destination compartments must fit into a `PotentialState`.
    fn validate(&self) -> Result<()> {
        match self
            .postconditions
            .iter()
            .flatten()
            .find(|&&compartment| compartment >= MAX_COMPARTMENTS)
        {
            Some(compartment) => Err(CfepiError::InitializationError(format!(
                "Destination compartment {compartment} exceeds the limit of {MAX_COMPARTMENTS} compartments"
            ))),
            None => Ok(()),
        }
    }

    pub fn apply_entered(&self, entered: &mut SimulationState, individuals: &[usize; N]) {
        for (&individual, destination) in individuals.iter().zip(self.postconditions.iter()) {
            if let Some(compartment) = destination {
                entered[individual].insert(*compartment);
            }
        }
    }

    /// Clear the prior compartment of every role with a destination. Roles without a destination
    /// keep their bits.
    pub fn apply_left(
        &self,
        remained: &mut SimulationState,
        current: &SimulationState,
        individuals: &[usize; N],
    ) {
        for ((&individual, destination), &mask) in individuals
            .iter()
            .zip(self.postconditions.iter())
            .zip(self.preconditions.iter())
        {
            if destination.is_some() {
                remained[individual] &= !(current[individual] & mask);
            }
        }
    }
}

/// Event type of any supported arity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventType {
    /// Spontaneous change of a single individual.
    Transition(SizedEventType<1>),
    /// Change that requires the co-presence of two individuals.
    Interaction(SizedEventType<2>),
    /// Change that requires the co-presence of three individuals.
    Triad(SizedEventType<3>),
}

/// Individuals filling the roles of an event, tagged by arity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Participants {
    Transition([usize; 1]),
    Interaction([usize; 2]),
    Triad([usize; 3]),
}

impl Participants {
    pub fn as_slice(&self) -> &[usize] {
        match self {
            Participants::Transition(individuals) => individuals,
            Participants::Interaction(individuals) => individuals,
            Participants::Triad(individuals) => individuals,
        }
    }

    pub fn arity(&self) -> usize {
        self.as_slice().len()
    }
}

/// A concrete event: an event type index and the individuals in its roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Event {
    pub event_type: usize,
    pub participants: Participants,
}

impl Event {
    pub fn new(event_type: usize, participants: Participants) -> Self {
        Self {
            event_type,
            participants,
        }
    }

    /// Individual occupying `role`, if the event has that many roles.
    pub fn role(&self, role: usize) -> Option<usize> {
        self.participants.as_slice().get(role).copied()
    }
}

/// Lazy cartesian product of the eligible individuals of every role, tagged by arity.
pub enum Candidates {
    Transition(IntoIter<usize>),
    Interaction(Product<IntoIter<usize>, IntoIter<usize>>),
    Triad(Product<Product<IntoIter<usize>, IntoIter<usize>>, IntoIter<usize>>),
}

impl Iterator for Candidates {
    type Item = Participants;

    fn next(&mut self) -> Option<Participants> {
        match self {
            Candidates::Transition(candidates) => {
                candidates.next().map(|a| Participants::Transition([a]))
            }
            Candidates::Interaction(candidates) => candidates
                .next()
                .map(|(a, b)| Participants::Interaction([a, b])),
            Candidates::Triad(candidates) => candidates
                .next()
                .map(|((a, b), c)| Participants::Triad([a, b, c])),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Candidates::Transition(candidates) => candidates.size_hint(),
            Candidates::Interaction(candidates) => candidates.size_hint(),
            Candidates::Triad(candidates) => candidates.size_hint(),
        }
    }
}

impl EventType {
    /// Construct an event type from per-role preconditions and postconditions.
    pub fn new(
        preconditions: Vec<PotentialState>,
        postconditions: Vec<Option<usize>>,
    ) -> Result<Self> {
        if preconditions.len() != postconditions.len() {
            return Err(CfepiError::InitializationError(format!(
                "Event type has {} preconditions but {} postconditions",
                preconditions.len(),
                postconditions.len()
            )));
        }
        if let Some(role) = preconditions.iter().position(PotentialState::is_empty) {
            return Err(CfepiError::InitializationError(format!(
                "Role {role} of event type has an empty precondition"
            )));
        }

        let event_type = match (preconditions.as_slice(), postconditions.as_slice()) {
            (&[a], &[x]) => EventType::Transition(SizedEventType::new([a], [x])),
            (&[a, b], &[x, y]) => EventType::Interaction(SizedEventType::new([a, b], [x, y])),
            (&[a, b, c], &[x, y, z]) => {
                EventType::Triad(SizedEventType::new([a, b, c], [x, y, z]))
            }
            _ => {
                return Err(CfepiError::InitializationError(format!(
                    "Event types with {} roles are not supported",
                    preconditions.len()
                )));
            }
        };
        event_type.validate()?;
        Ok(event_type)
    }

    /// Check that every destination compartment is representable.
    ///
    /// `transition` and `interaction` do not check their destination, `Simulation::new` calls
    /// this for every event type it is given.
    pub fn validate(&self) -> Result<()> {
        match self {
            EventType::Transition(event_type) => event_type.validate(),
            EventType::Interaction(event_type) => event_type.validate(),
            EventType::Triad(event_type) => event_type.validate(),
        }
    }

    /// Spontaneous change from any compartment in `source` to `destination`.
    pub fn transition(source: PotentialState, destination: usize) -> Self {
        EventType::Transition(SizedEventType::new([source], [Some(destination)]))
    }

    /// Contact-driven change: an individual in `contact` moves an individual in `target` to
    /// `destination`. The contact itself is unaffected.
    pub fn interaction(contact: PotentialState, target: PotentialState, destination: usize) -> Self {
        EventType::Interaction(SizedEventType::new(
            [contact, target],
            [None, Some(destination)],
        ))
    }

    pub fn arity(&self) -> usize {
        match self {
            EventType::Transition(_) => 1,
            EventType::Interaction(_) => 2,
            EventType::Triad(_) => 3,
        }
    }

    pub fn preconditions(&self) -> &[PotentialState] {
        match self {
            EventType::Transition(event_type) => event_type.preconditions(),
            EventType::Interaction(event_type) => event_type.preconditions(),
            EventType::Triad(event_type) => event_type.preconditions(),
        }
    }

    pub fn postconditions(&self) -> &[Option<usize>] {
        match self {
            EventType::Transition(event_type) => event_type.postconditions(),
            EventType::Interaction(event_type) => event_type.postconditions(),
            EventType::Triad(event_type) => event_type.postconditions(),
        }
    }

    /// Lazily enumerate the role tuples eligible in `state`.
    ///
    /// The first role varies slowest. The order is fully determined by `state`.
    pub fn candidates(&self, state: &SimulationState) -> Candidates {
        match self {
            EventType::Transition(event_type) => {
                let [first] = event_type.eligible(state);
                Candidates::Transition(first.into_iter())
            }
            EventType::Interaction(event_type) => {
                let [first, second] = event_type.eligible(state);
                Candidates::Interaction(first.into_iter().cartesian_product(second))
            }
            EventType::Triad(event_type) => {
                let [first, second, third] = event_type.eligible(state);
                Candidates::Triad(
                    first
                        .into_iter()
                        .cartesian_product(second)
                        .cartesian_product(third),
                )
            }
        }
    }

    /// Check the preconditions of every role against `state`.
    ///
    /// Participants of a different arity never satisfy the event type.
    pub fn check_preconditions(&self, state: &SimulationState, participants: &Participants) -> bool {
        match (self, participants) {
            (EventType::Transition(event_type), Participants::Transition(individuals)) => {
                event_type.check_preconditions(state, individuals)
            }
            (EventType::Interaction(event_type), Participants::Interaction(individuals)) => {
                event_type.check_preconditions(state, individuals)
            }
            (EventType::Triad(event_type), Participants::Triad(individuals)) => {
                event_type.check_preconditions(state, individuals)
            }
            _ => false,
        }
    }

    pub fn conflicts(&self, entered: &SimulationState, participants: &Participants) -> bool {
        match (self, participants) {
            (EventType::Transition(event_type), Participants::Transition(individuals)) => {
                event_type.conflicts(entered, individuals)
            }
            (EventType::Interaction(event_type), Participants::Interaction(individuals)) => {
                event_type.conflicts(entered, individuals)
            }
            (EventType::Triad(event_type), Participants::Triad(individuals)) => {
                event_type.conflicts(entered, individuals)
            }
            _ => false,
        }
    }

    pub fn apply_entered(&self, entered: &mut SimulationState, participants: &Participants) {
        match (self, participants) {
            (EventType::Transition(event_type), Participants::Transition(individuals)) => {
                event_type.apply_entered(entered, individuals)
            }
            (EventType::Interaction(event_type), Participants::Interaction(individuals)) => {
                event_type.apply_entered(entered, individuals)
            }
            (EventType::Triad(event_type), Participants::Triad(individuals)) => {
                event_type.apply_entered(entered, individuals)
            }
            _ => {}
        }
    }

    pub fn apply_left(
        &self,
        remained: &mut SimulationState,
        current: &SimulationState,
        participants: &Participants,
    ) {
        match (self, participants) {
            (EventType::Transition(event_type), Participants::Transition(individuals)) => {
                event_type.apply_left(remained, current, individuals)
            }
            (EventType::Interaction(event_type), Participants::Interaction(individuals)) => {
                event_type.apply_left(remained, current, individuals)
            }
            (EventType::Triad(event_type), Participants::Triad(individuals)) => {
                event_type.apply_left(remained, current, individuals)
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation_state;

    const S: usize = 0;
    const I: usize = 1;
    const R: usize = 2;

    fn bit(compartment: usize) -> PotentialState {
        PotentialState::single(compartment)
    }

    #[test]
    fn construct_by_arity() {
        let transition = EventType::new(vec![bit(I)], vec![Some(R)]).unwrap();
        assert_eq!(transition, EventType::transition(bit(I), R));
        assert_eq!(transition.arity(), 1);

        let interaction = EventType::new(vec![bit(I), bit(S)], vec![None, Some(I)]).unwrap();
        assert_eq!(interaction, EventType::interaction(bit(I), bit(S), I));
        assert_eq!(interaction.arity(), 2);

        let triad =
            EventType::new(vec![bit(I), bit(I), bit(S)], vec![None, None, Some(I)]).unwrap();
        assert_eq!(triad.arity(), 3);
        assert_eq!(triad.postconditions(), &[None, None, Some(I)]);
    }

    #[test]
    fn construct_rejects_malformed() {
        assert!(EventType::new(vec![], vec![]).is_err());
        assert!(EventType::new(vec![bit(I)], vec![Some(R), None]).is_err());
        assert!(EventType::new(vec![PotentialState::empty()], vec![Some(R)]).is_err());
        assert!(EventType::new(vec![bit(S); 4], vec![None; 4]).is_err());
    }

    #[test]
    fn transition_candidates() {
        let state = simulation_state![bit(S); 2, bit(I); 2, bit(R); 1];
        let recovery = EventType::transition(bit(I), R);
        let candidates: Vec<Participants> = recovery.candidates(&state).collect();
        assert_eq!(
            candidates,
            vec![Participants::Transition([2]), Participants::Transition([3])]
        );
    }

    #[test]
    fn interaction_candidates_are_a_lazy_product() {
        let state = simulation_state![bit(S); 3, bit(I); 2];
        let infection = EventType::interaction(bit(I), bit(S), I);
        let mut candidates = infection.candidates(&state);
        assert_eq!(candidates.next(), Some(Participants::Interaction([3, 0])));
        assert_eq!(candidates.next(), Some(Participants::Interaction([3, 1])));
        assert_eq!(candidates.next(), Some(Participants::Interaction([3, 2])));
        assert_eq!(candidates.next(), Some(Participants::Interaction([4, 0])));
        assert_eq!(candidates.count(), 2);
    }

    #[test]
    fn candidates_on_large_population_are_not_materialized() {
        // 10^5 x 10^5 pairs would not fit in memory if collected.
        let state = simulation_state![bit(S); 100_000, bit(I); 100_000];
        let infection = EventType::interaction(bit(I), bit(S), I);
        let first: Vec<Participants> = infection.candidates(&state).take(3).collect();
        assert_eq!(first.len(), 3);
        assert_eq!(first[0], Participants::Interaction([100_000, 0]));
    }

    #[test]
    fn triad_candidates() {
        let state = simulation_state![bit(S); 1, bit(I); 2];
        let triad = EventType::new(vec![bit(I), bit(I), bit(S)], vec![None, None, Some(I)]).unwrap();
        assert_eq!(triad.candidates(&state).count(), 4);
    }

    #[test]
    fn empty_role_yields_no_candidates() {
        let state = simulation_state![bit(S); 10];
        let infection = EventType::interaction(bit(I), bit(S), I);
        assert_eq!(infection.candidates(&state).count(), 0);
    }

    #[test]
    fn pooled_state_widens_eligibility() {
        let state = simulation_state![bit(S) | bit(I); 1, bit(S); 1];
        let recovery = EventType::transition(bit(I), R);
        assert_eq!(recovery.candidates(&state).count(), 1);
    }

    #[test]
    fn check_preconditions_by_arity() {
        let state = simulation_state![bit(S); 1, bit(I); 1];
        let infection = EventType::interaction(bit(I), bit(S), I);
        assert!(infection.check_preconditions(&state, &Participants::Interaction([1, 0])));
        assert!(!infection.check_preconditions(&state, &Participants::Interaction([0, 1])));
        assert!(!infection.check_preconditions(&state, &Participants::Transition([1])));
    }

    #[test]
    fn apply_moves_only_roles_with_destination() {
        let current = simulation_state![bit(S); 1, bit(I); 1];
        let mut entered = current.empty_like();
        let mut remained = current.clone();
        let infection = EventType::interaction(bit(I), bit(S), I);
        let participants = Participants::Interaction([1, 0]);

        assert!(!infection.conflicts(&entered, &participants));
        infection.apply_entered(&mut entered, &participants);
        infection.apply_left(&mut remained, &current, &participants);

        // target gained I and lost S
        assert_eq!(entered[0], bit(I));
        assert_eq!(remained[0], PotentialState::empty());
        // contact is untouched in both buffers
        assert_eq!(entered[1], PotentialState::empty());
        assert_eq!(remained[1], bit(I));

        assert!(infection.conflicts(&entered, &Participants::Interaction([1, 0])));
        assert!(!infection.conflicts(&entered, &Participants::Interaction([0, 1])));
    }

    #[test]
    fn individual_in_two_moving_roles_conflicts() {
        let state = simulation_state![bit(S); 2];
        let entered = state.empty_like();
        let split = EventType::new(vec![bit(S), bit(S)], vec![Some(I), Some(R)]).unwrap();

        assert!(split.conflicts(&entered, &Participants::Interaction([0, 0])));
        assert!(!split.conflicts(&entered, &Participants::Interaction([0, 1])));

        // a role without destination may repeat a moving individual
        let infection = EventType::new(vec![bit(S), bit(S)], vec![None, Some(I)]).unwrap();
        assert!(!infection.conflicts(&entered, &Participants::Interaction([0, 0])));
    }

    #[test]
    fn destination_beyond_limit_is_rejected() {
        assert!(EventType::new(vec![bit(S)], vec![Some(63)]).is_ok());
        assert!(EventType::new(vec![bit(S)], vec![Some(64)]).is_err());
        assert!(EventType::new(vec![bit(I), bit(S)], vec![None, Some(70)]).is_err());
        assert!(EventType::transition(bit(S), 70).validate().is_err());
        assert!(EventType::interaction(bit(I), bit(S), R).validate().is_ok());
    }

    #[test]
    fn candidates_report_exact_size() {
        let state = simulation_state![bit(S); 3, bit(I); 2];
        let infection = EventType::interaction(bit(I), bit(S), I);
        assert_eq!(infection.candidates(&state).size_hint(), (6, Some(6)));
    }

    #[test]
    fn event_roles() {
        let event = Event::new(1, Participants::Interaction([4, 7]));
        assert_eq!(event.role(0), Some(4));
        assert_eq!(event.role(1), Some(7));
        assert_eq!(event.role(2), None);
        assert_eq!(event.participants.arity(), 2);
    }
}
