//! Property-based tests for ipball.
//!
//! These tests verify invariants that should hold regardless of input:
//! - The tree search returns a true top-k (no candidate is ever pruned away)
//! - Normalization puts every vector on the unit sphere and preserves
//!   inner products up to the max-norm scale
//! - The bounded queue agrees with a full sort

use proptest::prelude::*;

use ipball::naive::top_k_naive;
use ipball::recover::recover;
use ipball::transform::{augment, Side};
use ipball::{compute_top_k_with, simd, BoundedTopK, Matrix, MipsParams};

prop_compose! {
    fn arb_matrix(max_rows: usize, dim: usize)
        (rows in prop::collection::vec(prop::collection::vec(-10.0f64..10.0, dim), 1..max_rows))
        -> Matrix
    {
        Matrix::from_rows(rows).unwrap()
    }
}

fn nonzero(m: &Matrix) -> bool {
    m.max_norm() > 1e-6
}

mod search_props {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn tree_returns_a_true_top_k(
            items in arb_matrix(200, 5),
            users in arb_matrix(6, 5),
            k in 1usize..25,
            leaf in 1usize..12,
            seed in any::<u64>(),
        ) {
            prop_assume!(nonzero(&items) && nonzero(&users));
            let params = MipsParams::default().with_leaf_capacity(leaf).with_seed(seed);
            let results = compute_top_k_with(k, &users, &items, &params).unwrap();

            for (u, result) in results.iter() {
                let got = result.as_ref().unwrap();
                let expected = top_k_naive(users.row(u), &items, k);
                prop_assert_eq!(got, &expected, "user {}", u);
            }
        }

        #[test]
        fn exact_ties_resolve_like_brute_force(
            items in prop::collection::vec(prop::collection::vec(-3i32..=3, 3), 1..120),
            users in prop::collection::vec(prop::collection::vec(-3i32..=3, 3), 1..6),
            k in 1usize..15,
            seed in any::<u64>(),
        ) {
            // Small integer grids: many distinct items share an exact score,
            // and their normalized scores need not round the same way.
            let to_matrix = |rows: Vec<Vec<i32>>| {
                Matrix::from_rows(
                    rows.into_iter()
                        .map(|r| r.into_iter().map(f64::from).collect())
                        .collect(),
                )
                .unwrap()
            };
            let items = to_matrix(items);
            let users = to_matrix(users);
            prop_assume!(nonzero(&items) && nonzero(&users));

            let params = MipsParams::default().with_leaf_capacity(4).with_seed(seed);
            let results = compute_top_k_with(k, &users, &items, &params).unwrap();
            for (u, result) in results.iter() {
                let expected = top_k_naive(users.row(u), &items, k);
                prop_assert_eq!(result.as_ref().unwrap(), &expected, "user {}", u);
            }
        }

        #[test]
        fn output_sorted_and_bounded(
            items in arb_matrix(80, 3),
            users in arb_matrix(4, 3),
            k in 1usize..100,
        ) {
            prop_assume!(nonzero(&items) && nonzero(&users));
            let results = compute_top_k_with(k, &users, &items, &MipsParams::default().with_seed(1)).unwrap();
            for (_, result) in results.iter() {
                let list = result.as_ref().unwrap();
                prop_assert_eq!(list.len(), k.min(items.num_rows()));
                for w in list.windows(2) {
                    prop_assert!(w[0].score > w[1].score || (w[0].score == w[1].score && w[0].id < w[1].id));
                }
            }
        }
    }
}

mod transform_props {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn augmented_rows_are_unit(m in arb_matrix(30, 6)) {
            prop_assume!(nonzero(&m));
            for side in [Side::User, Side::Item] {
                let aug = augment(&m, side).unwrap();
                for i in 0..aug.num_rows() {
                    let n = simd::norm(aug.row(i));
                    prop_assert!((n - 1.0).abs() < 1e-9, "row {} has norm {}", i, n);
                }
            }
        }

        #[test]
        fn recovered_score_round_trips(
            items in arb_matrix(20, 4),
            users in arb_matrix(5, 4),
        ) {
            prop_assume!(nonzero(&items) && nonzero(&users));
            let ai = augment(&items, Side::Item).unwrap();
            let au = augment(&users, Side::User).unwrap();
            let scale = ai.max_norm() * au.max_norm();

            for u in 0..users.num_rows() {
                let mut queue = BoundedTopK::new(items.num_rows());
                for i in 0..items.num_rows() {
                    queue.push(i as u32, simd::dot(au.row(u), ai.row(i)));
                }
                for n in recover(queue, users.row(u), &items) {
                    let original = simd::dot(users.row(u), items.row(n.id as usize));
                    prop_assert_eq!(n.score, original);
                    let augmented = simd::dot(au.row(u), ai.row(n.id as usize));
                    prop_assert!((augmented * scale - original).abs() <= 1e-9 * scale);
                }
            }
        }
    }
}

mod topk_props {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn queue_matches_full_sort(
            scores in prop::collection::vec(-100i32..100, 0..200),
            k in 1usize..50,
        ) {
            // Integer-valued scores force plenty of ties.
            let mut queue = BoundedTopK::new(k);
            for (id, &s) in scores.iter().enumerate() {
                queue.push(id as u32, s as f64);
                prop_assert!(queue.len() <= k);
            }

            let mut sorted: Vec<(u32, f64)> =
                scores.iter().enumerate().map(|(i, &s)| (i as u32, s as f64)).collect();
            sorted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap().then(a.0.cmp(&b.0)));
            sorted.truncate(k);

            let got: Vec<(u32, f64)> =
                queue.into_sorted_vec().into_iter().map(|n| (n.id, n.score)).collect();
            prop_assert_eq!(got, sorted);
        }
    }
}
