//! Query-budget distribution across buyer-intent categories.

use brandlens_shared::QueryCategory;

/// Split `num_queries` across categories by weight.
///
/// Each category gets the floor of its weighted share; leftover queries go to
/// categories in descending-weight order (ties broken by generation order),
/// round-robin. Counts always sum to exactly `num_queries`.
pub fn compute_category_distribution(num_queries: u32) -> Vec<(QueryCategory, u32)> {
    let mut counts: Vec<(QueryCategory, u32)> = QueryCategory::ALL
        .iter()
        .map(|category| {
            (
                *category,
                (category.weight() * f64::from(num_queries)) as u32,
            )
        })
        .collect();

    let assigned: u32 = counts.iter().map(|(_, n)| n).sum();
    let mut leftover = num_queries - assigned;

    let mut by_weight: Vec<QueryCategory> = QueryCategory::ALL.to_vec();
    by_weight.sort_by(|a, b| b.weight().total_cmp(&a.weight()));

    let mut i = 0;
    while leftover > 0 {
        let category = by_weight[i % by_weight.len()];
        if let Some((_, count)) = counts.iter_mut().find(|(c, _)| *c == category) {
            *count += 1;
        }
        leftover -= 1;
        i += 1;
    }

    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_for(distribution: &[(QueryCategory, u32)], category: QueryCategory) -> u32 {
        distribution
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, n)| *n)
            .expect("category present")
    }

    #[test]
    fn distribution_sums_to_n_for_many_sizes() {
        for n in [10, 11, 13, 17, 20, 25, 50, 99, 100, 250] {
            let distribution = compute_category_distribution(n);
            let total: u32 = distribution.iter().map(|(_, count)| count).sum();
            assert_eq!(total, n, "counts must sum exactly to {n}");
        }
    }

    #[test]
    fn distribution_covers_every_category() {
        let distribution = compute_category_distribution(10);
        assert_eq!(distribution.len(), QueryCategory::ALL.len());
    }

    #[test]
    fn leftovers_favor_heavier_categories() {
        // 10 queries: floors are 2/1/2/2/2 = 9, one leftover goes to best_of.
        let distribution = compute_category_distribution(10);
        assert_eq!(count_for(&distribution, QueryCategory::BestOf), 3);
        assert_eq!(count_for(&distribution, QueryCategory::Budget), 1);
        assert_eq!(count_for(&distribution, QueryCategory::Comparison), 2);
        assert_eq!(count_for(&distribution, QueryCategory::Branded), 2);
        assert_eq!(count_for(&distribution, QueryCategory::Competitor), 2);
    }

    #[test]
    fn exact_multiples_need_no_leftover_pass() {
        // 20 queries: 5/3/4/4/4 sums to 20 with no remainder.
        let distribution = compute_category_distribution(20);
        assert_eq!(count_for(&distribution, QueryCategory::BestOf), 5);
        assert_eq!(count_for(&distribution, QueryCategory::Budget), 3);
        assert_eq!(count_for(&distribution, QueryCategory::Comparison), 4);
    }
}
