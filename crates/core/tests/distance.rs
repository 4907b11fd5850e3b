use std::f64::consts::PI;

use bintag_core::analysis::distance::{
    angular_distance, euclidean_distance, function_vectors, histogram_distance, mnemonic_basis,
    pair_distance, rescale_cosine, DistanceMatrix,
};
use bintag_core::model::{MnemonicCounts, MnemonicHistogram};

fn counts(pairs: &[(&str, u32)]) -> MnemonicCounts {
    pairs.iter().map(|(m, c)| (m.to_string(), *c)).collect()
}

fn histogram(functions: &[(&str, &[(&str, u32)])]) -> MnemonicHistogram {
    functions.iter().map(|(name, pairs)| (*name, counts(pairs))).collect()
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn basis_is_sorted_union_of_both_sides() {
    let a = histogram(&[("f1", &[("mov", 1), ("push", 2)])]);
    let b = histogram(&[("g1", &[("add", 1), ("mov", 4)])]);
    assert_eq!(mnemonic_basis(&a, &b), vec!["add", "mov", "push"]);
}

#[test]
fn function_vectors_zero_fill_missing_mnemonics() {
    let a = histogram(&[("f1", &[("mov", 3)]), ("f2", &[("add", 2)])]);
    let basis = ["add", "mov", "ret"];
    let vectors = function_vectors(&a, &basis);
    assert_eq!(vectors, vec![vec![0.0, 3.0, 0.0], vec![2.0, 0.0, 0.0]]);
}

#[test]
fn euclidean_is_l2_norm_of_difference() {
    assert!(approx(euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0));
    assert_eq!(euclidean_distance(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
}

#[test]
fn rescaled_cosine_maps_same_orthogonal_and_opposite_directions() {
    assert!(approx(rescale_cosine(1.0), 1.0));
    assert!(approx(rescale_cosine(0.0), 0.0));
    assert!(approx(rescale_cosine(-1.0), -1.0));
}

#[test]
fn rescaled_cosine_clamps_out_of_domain_input() {
    assert!(approx(rescale_cosine(1.0000001), 1.0));
    assert!(approx(rescale_cosine(-1.5), -1.0));
    assert!(rescale_cosine(1.0 + 1e-12).is_finite());
}

#[test]
fn angular_distance_of_identical_vectors_is_one() {
    assert!(approx(angular_distance(&[2.0, 1.0, 4.0], &[2.0, 1.0, 4.0]), 1.0));
    assert!(approx(angular_distance(&[2.0, 0.0], &[7.0, 0.0]), 1.0));
}

#[test]
fn zero_dot_product_is_exactly_one_regardless_of_magnitude() {
    assert_eq!(angular_distance(&[1.0, 0.0], &[0.0, 1.0]), 1.0);
    assert_eq!(angular_distance(&[900.0, 0.0], &[0.0, 0.01]), 1.0);
    assert_eq!(angular_distance(&[0.0, 0.0], &[0.0, 0.0]), 1.0);
}

#[test]
fn pair_distance_multiplies_euclidean_and_angular() {
    // basis [add, mov]: a = [4, 3], b = [0, 3]; euclid 4, cosine 9 / 15.
    let expected = 4.0 * (1.0 - 2.0 * 0.6f64.acos() / PI);
    assert!(approx(pair_distance(&[4.0, 3.0], &[0.0, 3.0]), expected));
}

#[test]
fn matrix_aggregate_takes_worse_direction() {
    let rows = vec![vec![1.0, 0.0], vec![3.0, 0.0]];
    let cols = vec![vec![1.0, 0.0]];
    let matrix = DistanceMatrix::between(&rows, &cols);

    assert_eq!((matrix.rows(), matrix.cols()), (2, 1));
    assert_eq!(matrix.row_minima(), vec![0.0, 2.0]);
    assert!(approx(matrix.mean_row_min(), 1.0));
    assert!(approx(matrix.transpose().mean_row_min(), 0.0));
    assert!(approx(matrix.aggregate(), 1.0));
}

#[test]
fn transpose_swaps_entries() {
    let rows = vec![vec![1.0, 0.0], vec![0.0, 2.0]];
    let cols = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]];
    let matrix = DistanceMatrix::between(&rows, &cols);
    let transposed = matrix.transpose();
    for r in 0..matrix.rows() {
        for c in 0..matrix.cols() {
            assert_eq!(matrix.get(r, c), transposed.get(c, r));
        }
    }
}

#[test]
fn distance_to_self_is_zero() {
    let a = histogram(&[
        ("f1", &[("mov", 5), ("add", 2)]),
        ("f2", &[("push", 1), ("call", 3), ("ret", 1)]),
        ("f3", &[("xor", 7)]),
    ]);
    assert_eq!(histogram_distance(&a, &a), 0.0);
}

#[test]
fn distance_is_symmetric() {
    let a = histogram(&[
        ("f1", &[("mov", 5), ("add", 2)]),
        ("f2", &[("push", 1), ("call", 3), ("ret", 1)]),
    ]);
    let b = histogram(&[
        ("g1", &[("mov", 4), ("sub", 1)]),
        ("g2", &[("call", 1), ("ret", 1)]),
        ("g3", &[("lea", 2), ("mov", 9), ("jmp", 1)]),
    ]);
    let ab = histogram_distance(&a, &b);
    let ba = histogram_distance(&b, &a);
    assert!(ab > 0.0);
    assert!(approx(ab, ba), "{ab} != {ba}");
}

#[test]
fn disjoint_functions_use_full_euclidean_distance() {
    let a = histogram(&[("f1", &[("mov", 2)])]);
    let b = histogram(&[("g1", &[("add", 1)])]);
    assert!(approx(histogram_distance(&a, &b), 5f64.sqrt()));
}

#[test]
fn empty_histogram_is_infinitely_far() {
    let a = histogram(&[("f1", &[("mov", 1)])]);
    let empty = MnemonicHistogram::new();
    assert_eq!(histogram_distance(&a, &empty), f64::INFINITY);
    assert_eq!(histogram_distance(&empty, &a), f64::INFINITY);
    assert_eq!(histogram_distance(&empty, &empty), f64::INFINITY);
}
