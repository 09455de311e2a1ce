// Batch membership and reference-window planning
//
// Pure functions of the run counters; the orchestrator owns all state and
// recomputes the plan each iteration.

/// One planned batch: which pages to dispatch and which completed pages to
/// embed as references in every request of the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    pub ordinal: usize,
    pub page_indices: Vec<usize>,
    pub reference_indices: Vec<usize>,
}

/// Plan the next colorization batch.
///
/// Width ramp: the first batch is a single page (it seeds the reference
/// pool); afterwards `min(ordinal, max_width, completed)`. Concurrency
/// never exceeds the references available to ground color consistency,
/// never exceeds the configured cap, and grows by at most one slot per
/// round. The count is clamped so the batch never overruns the remaining
/// input.
///
/// `completed` is the registry of successfully finished page indices in
/// completion order; the reference window is its last
/// `min(max_width, completed.len())` entries.
pub fn plan_chained(
    total_pages: usize,
    max_width: usize,
    completed: &[usize],
    ordinal: usize,
    next_unprocessed: usize,
) -> BatchPlan {
    debug_assert!(max_width >= 1);
    debug_assert!(ordinal >= 1);

    let remaining = total_pages.saturating_sub(next_unprocessed);
    let count = if ordinal == 1 {
        1
    } else {
        ordinal.min(max_width).min(completed.len())
    };
    let count = count.min(remaining);

    let window = max_width.min(completed.len());
    let reference_indices = completed[completed.len() - window..].to_vec();

    BatchPlan {
        ordinal,
        page_indices: (next_unprocessed..next_unprocessed + count).collect(),
        reference_indices,
    }
}

/// Plan the next translation batch: fixed-width contiguous chunks, no
/// references.
pub fn plan_flat(
    total_pages: usize,
    max_width: usize,
    ordinal: usize,
    next_unprocessed: usize,
) -> BatchPlan {
    debug_assert!(max_width >= 1);
    debug_assert!(ordinal >= 1);

    let remaining = total_pages.saturating_sub(next_unprocessed);
    let count = max_width.min(remaining);

    BatchPlan {
        ordinal,
        page_indices: (next_unprocessed..next_unprocessed + count).collect(),
        reference_indices: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drive plan_chained through a full run where every page succeeds,
    /// returning the batch sizes in order.
    fn chained_batch_sizes(total_pages: usize, max_width: usize) -> Vec<usize> {
        let mut completed: Vec<usize> = Vec::new();
        let mut cursor = 0;
        let mut ordinal = 1;
        let mut sizes = Vec::new();

        while cursor < total_pages {
            let plan = plan_chained(total_pages, max_width, &completed, ordinal, cursor);
            assert!(!plan.page_indices.is_empty(), "planner stalled");
            sizes.push(plan.page_indices.len());
            completed.extend(&plan.page_indices);
            cursor += plan.page_indices.len();
            ordinal += 1;
        }
        sizes
    }

    #[test]
    fn test_ramp_twelve_pages_width_four() {
        assert_eq!(chained_batch_sizes(12, 4), vec![1, 1, 2, 4, 4]);
    }

    #[test]
    fn test_ramp_three_pages_width_four() {
        assert_eq!(chained_batch_sizes(3, 4), vec![1, 1, 1]);
    }

    #[test]
    fn test_flat_ten_pages_width_three() {
        let mut cursor = 0;
        let mut ordinal = 1;
        let mut sizes = Vec::new();

        while cursor < 10 {
            let plan = plan_flat(10, 3, ordinal, cursor);
            assert!(plan.reference_indices.is_empty());
            sizes.push(plan.page_indices.len());
            cursor += plan.page_indices.len();
            ordinal += 1;
        }

        assert_eq!(sizes, vec![3, 3, 3, 1]);
    }

    #[test]
    fn test_first_batch_is_single_page() {
        for max_width in 1..=8 {
            let plan = plan_chained(20, max_width, &[], 1, 0);
            assert_eq!(plan.page_indices, vec![0]);
            assert!(plan.reference_indices.is_empty());
        }
    }

    #[test]
    fn test_batches_partition_input_contiguously() {
        for total_pages in 1..=40 {
            for max_width in 1..=6 {
                let mut completed: Vec<usize> = Vec::new();
                let mut cursor = 0;
                let mut ordinal = 1;
                let mut seen: Vec<usize> = Vec::new();

                while cursor < total_pages {
                    let plan =
                        plan_chained(total_pages, max_width, &completed, ordinal, cursor);
                    assert_eq!(plan.page_indices.first(), Some(&cursor));
                    seen.extend(&plan.page_indices);
                    completed.extend(&plan.page_indices);
                    cursor += plan.page_indices.len();
                    ordinal += 1;
                }

                let expected: Vec<usize> = (0..total_pages).collect();
                assert_eq!(seen, expected, "total={total_pages} width={max_width}");
            }
        }
    }

    #[test]
    fn test_width_ramp_formula() {
        // ordinal 3, plenty of room: capped by completions
        let plan = plan_chained(30, 4, &[0], 3, 1);
        assert_eq!(plan.page_indices.len(), 1);

        // capped by the configured width
        let completed: Vec<usize> = (0..10).collect();
        let plan = plan_chained(30, 4, &completed, 8, 10);
        assert_eq!(plan.page_indices.len(), 4);

        // capped by the ordinal ramp
        let plan = plan_chained(30, 8, &completed, 3, 10);
        assert_eq!(plan.page_indices.len(), 3);
    }

    #[test]
    fn test_no_overrun_past_remaining() {
        let plan = plan_chained(5, 8, &[0, 1, 2, 3], 5, 4);
        assert_eq!(plan.page_indices, vec![4]);
    }

    #[test]
    fn test_reference_window_is_recent_completions() {
        let completed = vec![0, 1, 2, 3, 4, 5];
        let plan = plan_chained(20, 4, &completed, 5, 6);
        assert_eq!(plan.reference_indices, vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_reference_window_shrinks_to_available() {
        let plan = plan_chained(20, 4, &[0], 2, 1);
        assert_eq!(plan.reference_indices, vec![0]);
    }

    #[test]
    fn test_planner_is_pure() {
        let completed = vec![0, 1, 2];
        let a = plan_chained(12, 4, &completed, 4, 3);
        let b = plan_chained(12, 4, &completed, 4, 3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_pages_yield_empty_batch() {
        let plan = plan_chained(0, 4, &[], 1, 0);
        assert!(plan.page_indices.is_empty());
    }

    #[test]
    fn test_stalled_registry_yields_empty_batch() {
        // No completions after batch 1 (everything was skipped): the ramp
        // has nothing to grow on and the planner emits an empty batch. The
        // orchestrator handles re-seeding.
        let plan = plan_chained(10, 4, &[], 2, 1);
        assert!(plan.page_indices.is_empty());
    }
}
