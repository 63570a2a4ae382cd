//! Feed Ranker
//!
//! Orders scored candidates by relevance, highest first. The sort is stable:
//! items with equal scores keep their input order, which is the only tie-break.

use super::model::ScoredItem;

/// Rank scored items by `total`, descending
pub fn rank(items: Vec<ScoredItem>) -> Vec<ScoredItem> {
    rank_by(items, |scored| scored.score_components.total)
}

/// Stable descending sort on an arbitrary score function
pub fn rank_by<T>(mut items: Vec<T>, score: impl Fn(&T) -> f64) -> Vec<T> {
    items.sort_by(|a, b| score(b).total_cmp(&score(a)));
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::model::{CandidateItem, ScoreComponents};

    fn scored(id: &str, total: f64) -> ScoredItem {
        ScoredItem::new(
            CandidateItem {
                id: id.to_string(),
                ..Default::default()
            },
            ScoreComponents {
                total,
                ..Default::default()
            },
        )
    }

    fn ids(items: &[ScoredItem]) -> Vec<&str> {
        items.iter().map(|s| s.item.id.as_str()).collect()
    }

    #[test]
    fn test_rank_descending() {
        let ranked = rank(vec![scored("a", 1.0), scored("b", 5.0), scored("c", 3.0)]);
        assert_eq!(ids(&ranked), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let ranked = rank(vec![
            scored("first", 2.0),
            scored("top", 9.0),
            scored("second", 2.0),
            scored("third", 2.0),
            scored("low", 0.5),
        ]);
        assert_eq!(ids(&ranked), vec!["top", "first", "second", "third", "low"]);
    }

    #[test]
    fn test_output_is_non_increasing() {
        let totals = [3.2, 7.0, 7.0, 0.0, 12.5, 3.2, 1.1, 9.9];
        let items = totals
            .iter()
            .enumerate()
            .map(|(i, t)| scored(&i.to_string(), *t))
            .collect();

        let ranked = rank(items);
        for pair in ranked.windows(2) {
            assert!(pair[0].score_components.total >= pair[1].score_components.total);
        }
        assert_eq!(ranked.len(), totals.len());
    }

    #[test]
    fn test_rank_by_generic() {
        let ranked = rank_by(vec![("x", 1.0), ("y", 2.0), ("z", 1.0)], |p| p.1);
        assert_eq!(ranked, vec![("y", 2.0), ("x", 1.0), ("z", 1.0)]);
    }
}
