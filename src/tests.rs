use crate::{
    advance, initialize, perplexity_to_k, randomize_start, Configuration, EmbeddingState,
    GradientStepper, Layout, NeighborGraph, TsneError,
};
use ndarray::{Array2, Axis};
use ndarray_rand::rand_distr::Normal;
use ndarray_rand::RandomExt;
use quickcheck_macros::quickcheck;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::time::Duration;

/// Exact k-nearest-neighbor graph by brute force, for building test inputs.
fn knn_graph(x: &Array2<f64>, k: usize) -> NeighborGraph {
    let lists: Vec<Vec<(u32, f64)>> = x
        .outer_iter()
        .enumerate()
        .map(|(i, a)| {
            let mut distances: Vec<(u32, f64)> = x
                .outer_iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(j, b)| {
                    let d = (&a - &b).mapv(|v| v * v).sum().sqrt();
                    (j as u32, d)
                })
                .collect();
            distances.sort_by(|a, b| f64::total_cmp(&a.1, &b.1));
            distances.truncate(k);
            distances
        })
        .collect();

    NeighborGraph::from_lists(&lists).unwrap()
}

/// Two well separated Gaussian clusters of `per_cluster` points each.
fn two_clusters(per_cluster: usize, dims: usize) -> Array2<f64> {
    let mut rng = SmallRng::seed_from_u64(7);
    let normal = Normal::new(0.0, 1.0).unwrap();
    let mut x = Array2::random_using((2 * per_cluster, dims), normal, &mut rng);
    x.slice_mut(ndarray::s![per_cluster.., ..])
        .mapv_inplace(|v| v + 20.0);
    x
}

#[test]
fn test_configuration_builder() {
    let config = Configuration::builder()
        .perplexity(15.0)
        .learning_rate(50.0)
        .mom_switch_iter(100)
        .build();

    assert_eq!(config.perplexity, 15.0);
    assert_eq!(config.learning_rate, 50.0);
    assert_eq!(config.mom_switch_iter, 100);
    assert_eq!(config.stop_lying_iter, 250);
    assert_eq!(config.layout, Layout::DimensionMajor);
    assert_eq!(
        Configuration::builder().build(),
        Configuration::default()
    );
}

#[test]
fn test_perplexity_to_k() {
    assert_eq!(perplexity_to_k(5.0), 15);
    assert_eq!(perplexity_to_k(2.0), 6);
    assert_eq!(perplexity_to_k(30.0), 90);
    assert_eq!(perplexity_to_k(0.1), 1);
    assert_eq!(perplexity_to_k(1.5), 5);
}

#[quickcheck]
fn perplexity_to_k_is_smallest_cover(p: u16, frac: u8) -> bool {
    let perplexity = f64::from(p) + f64::from(frac) / 256.0;
    let k = perplexity_to_k(perplexity) as f64;
    k >= perplexity * 3.0 && k - 1.0 < perplexity * 3.0
}

#[test]
fn test_small_dataset_neighbor_counts() {
    let x = two_clusters(5, 3);

    // perplexity 2 needs 6 neighbors, which 10 points can supply
    let state = initialize(&knn_graph(&x, 6), 2.0).unwrap();
    assert_eq!(state.iteration_count(), 0);
    assert_eq!(state.observation_count(), 10);
    assert_eq!(state.neighbor_count(), 6);

    // perplexity 5 asks for 15, clamped to the 9 available
    let state = initialize(&knn_graph(&x, 9), 5.0).unwrap();
    assert_eq!(state.neighbor_count(), 9);

    assert!(matches!(
        initialize(&knn_graph(&x, 6), 5.0),
        Err(TsneError::NeighborCountMismatch {
            expected: 9,
            actual: 6
        })
    ));
}

#[test]
fn test_clone_does_not_share_progress() {
    let x = two_clusters(10, 4);
    let graph = knn_graph(&x, 6);
    let original = initialize(&graph, 2.0).unwrap();

    let mut fork = original.clone();
    assert_eq!(fork.iteration_count(), original.iteration_count());

    let mut y = vec![0.0; 40];
    randomize_start(20, &mut y, 3).unwrap();
    fork.advance(&mut y, Duration::from_secs(60), 20).unwrap();

    assert_eq!(fork.iteration_count(), 20);
    assert_eq!(original.iteration_count(), 0);
    assert!(original.velocities().iter().all(|&v| v == 0.0));
    assert!(original.gains().iter().all(|&g| g == 1.0));
}

#[test]
fn test_fork_reproduces_trajectory() {
    let x = two_clusters(10, 4);
    let graph = knn_graph(&x, 6);
    let mut state = initialize(&graph, 2.0).unwrap();

    let mut y = vec![0.0; 40];
    randomize_start(20, &mut y, 11).unwrap();
    state.advance(&mut y, Duration::from_secs(60), 10).unwrap();

    let mut fork = state.clone();
    let mut y_fork = y.clone();

    state.advance(&mut y, Duration::from_secs(60), 30).unwrap();
    fork.advance(&mut y_fork, Duration::from_secs(60), 30).unwrap();

    assert_eq!(state.iteration_count(), fork.iteration_count());
    for (a, b) in y.iter().zip(&y_fork) {
        approx::assert_abs_diff_eq!(a, b, epsilon = 1e-9);
    }
}

#[test]
fn test_never_exceeds_max_iterations() {
    let x = two_clusters(10, 4);
    let graph = knn_graph(&x, 6);
    let mut state = initialize(&graph, 2.0).unwrap();
    let mut y = vec![0.0; 40];
    randomize_start(20, &mut y, 5).unwrap();

    for max in [1, 1, 4, 9, 9, 3, 12] {
        state.advance(&mut y, Duration::from_secs(60), max).unwrap();
        assert!(state.iteration_count() <= 12);
    }
    assert_eq!(state.iteration_count(), 12);
}

#[test]
fn test_budget_with_iteration_ceiling() {
    let x = two_clusters(10, 4);
    let graph = knn_graph(&x, 6);
    let mut state = initialize(&graph, 2.0).unwrap();
    let mut y = vec![0.0; 40];
    randomize_start(20, &mut y, 5).unwrap();

    let performed = advance(
        &mut state,
        &mut GradientStepper,
        &mut y,
        Duration::from_millis(1000),
        5,
    )
    .unwrap();

    assert!((1..=5).contains(&performed));
    assert_eq!(state.iteration_count(), performed);
}

#[test]
fn test_zero_budget_still_progresses() {
    let x = two_clusters(10, 4);
    let graph = knn_graph(&x, 6);
    let mut state = initialize(&graph, 2.0).unwrap();
    let mut y = vec![0.0; 40];
    randomize_start(20, &mut y, 5).unwrap();
    let before = y.clone();

    for expected in 1..=3 {
        state.advance(&mut y, Duration::ZERO, 1_000).unwrap();
        assert_eq!(state.iteration_count(), expected);
    }
    assert_ne!(y, before);
}

#[test]
fn test_randomize_start_is_deterministic() {
    let mut a = vec![0.0; 200];
    let mut b = vec![0.0; 200];
    randomize_start(100, &mut a, 42).unwrap();
    randomize_start(100, &mut b, 42).unwrap();

    assert!(a.iter().zip(&b).all(|(x, y)| x.to_bits() == y.to_bits()));
}

#[test]
fn test_embedding_separates_clusters() {
    let per_cluster = 20;
    let n = 2 * per_cluster;
    let x = two_clusters(per_cluster, 5);

    for layout in [Layout::DimensionMajor, Layout::PointMajor] {
        let config = Configuration::builder()
            .perplexity(3.0)
            .learning_rate(1.0)
            .layout(layout)
            .build();
        let mut state = EmbeddingState::with_configuration(&knn_graph(&x, 9), config).unwrap();

        let mut y = vec![0.0; n * 2];
        randomize_start(n, &mut y, 42).unwrap();

        // Advance in many small increments, as an interactive caller would
        while state.iteration_count() < 400 {
            state.advance(&mut y, Duration::ZERO, 400).unwrap();
        }
        assert!(y.iter().all(|v| v.is_finite()), "Non-finite coordinates");

        let embedding = match layout {
            Layout::PointMajor => Array2::from_shape_vec((n, 2), y).unwrap(),
            _ => Array2::from_shape_vec((2, n), y).unwrap().reversed_axes(),
        };

        // Embedding should be centered
        let mean = embedding.mean_axis(Axis(0)).unwrap();
        assert!(mean.iter().all(|&m| m.abs() < 1e-9), "Embedding not centered");

        let mut intra = 0.0;
        let mut inter = 0.0;
        let mut intra_count = 0;
        let mut inter_count = 0;
        for i in 0..n {
            for j in (i + 1)..n {
                let d = (&embedding.row(i) - &embedding.row(j))
                    .mapv(|v| v * v)
                    .sum()
                    .sqrt();
                if (i / per_cluster) == (j / per_cluster) {
                    intra += d;
                    intra_count += 1;
                } else {
                    inter += d;
                    inter_count += 1;
                }
            }
        }
        intra /= f64::from(intra_count);
        inter /= f64::from(inter_count);

        assert!(
            intra < inter,
            "Cluster structure not preserved for {layout:?}, intra: {intra}, inter: {inter}"
        );
    }
}
