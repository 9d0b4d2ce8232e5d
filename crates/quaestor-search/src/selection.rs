/// Index of the highest score, first on ties. Falls back to 0 when nothing
/// beats negative infinity (empty or all-NaN scores).
pub fn best_of(scores: &[f64]) -> usize {
    let mut best_idx = 0;
    let mut best = f64::NEG_INFINITY;
    for (idx, &score) in scores.iter().enumerate() {
        if score > best {
            best = score;
            best_idx = idx;
        }
    }
    best_idx
}

/// `population / divisor`, at least one and never more than the population.
pub fn elite_count(population: usize, divisor: usize) -> usize {
    (population / divisor.max(1)).max(1).min(population)
}

fn beats(candidate: f64, current: f64) -> bool {
    candidate > current || (current.is_nan() && !candidate.is_nan())
}

/// Indices of the `count` best scores in selection order. Each pick is the
/// highest remaining score with the first index winning ties; picked
/// individuals are never picked again.
pub fn select_elites(scores: &[f64], count: usize) -> Vec<usize> {
    let count = count.min(scores.len());
    let mut taken = vec![false; scores.len()];
    let mut elites = Vec::with_capacity(count);

    for _ in 0..count {
        let mut pick: Option<usize> = None;
        for (idx, &score) in scores.iter().enumerate() {
            if taken[idx] {
                continue;
            }
            match pick {
                Some(current) if !beats(score, scores[current]) => {}
                _ => pick = Some(idx),
            }
        }
        let Some(idx) = pick else { break };
        taken[idx] = true;
        elites.push(idx);
    }
    elites
}
