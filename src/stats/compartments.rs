use crate::core::AggregatedState;

/// Trait extension to compute per-compartment counts of a histogram
pub trait CompartmentTotals {
    fn totals(&self, compartments: usize) -> Vec<usize>;
    fn frequencies(&self, compartments: usize) -> Vec<f64>;
}

impl CompartmentTotals for AggregatedState {
    /// Number of individuals in each compartment.
    ///
    /// An individual whose pattern holds several compartments is counted in each of them.
    fn totals(&self, compartments: usize) -> Vec<usize> {
        let mut totals = vec![0; compartments];
        for (pattern, count) in self.iter() {
            for index in pattern.indices().filter(|&index| index < compartments) {
                totals[index] += count;
            }
        }
        totals
    }

    /// Fraction of the population in each compartment.
    fn frequencies(&self, compartments: usize) -> Vec<f64> {
        let population = self.total();
        if population == 0 {
            return vec![0.; compartments];
        }
        self.totals(compartments)
            .iter()
            .map(|&count| count as f64 / population as f64)
            .collect()
    }
}
