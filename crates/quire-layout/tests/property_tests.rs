//! Property tests for margin collapsing and resume positions.

use quickcheck::TestResult;
use quickcheck_macros::quickcheck;
use quire_layout::layout::{SkipStack, collapse_margin};

fn finite(margins: &[i16]) -> Vec<f32> {
    margins.iter().map(|&m| f32::from(m)).collect()
}

#[quickcheck]
fn prop_collapsed_margin_is_largest_minus_most_negative(margins: Vec<i16>) -> bool {
    let margins = finite(&margins);
    let positive = margins
        .iter()
        .copied()
        .filter(|m| *m > 0.0)
        .fold(0.0, f32::max);
    let negative = margins
        .iter()
        .copied()
        .filter(|m| *m < 0.0)
        .fold(0.0, f32::min);
    collapse_margin(&margins) == positive + negative
}

#[quickcheck]
fn prop_collapsing_ignores_order(margins: Vec<i16>) -> bool {
    let margins = finite(&margins);
    let mut reversed = margins.clone();
    reversed.reverse();
    collapse_margin(&margins) == collapse_margin(&reversed)
}

#[quickcheck]
fn prop_zero_margin_changes_nothing(margins: Vec<i16>) -> bool {
    let margins = finite(&margins);
    let mut with_zero = margins.clone();
    with_zero.push(0.0);
    collapse_margin(&margins) == collapse_margin(&with_zero)
}

#[quickcheck]
fn prop_skip_stack_keeps_its_path(path: Vec<u8>) -> TestResult {
    let path: Vec<usize> = path.into_iter().map(usize::from).collect();
    let Some(stack) = SkipStack::from_path(&path) else {
        return TestResult::from_bool(path.is_empty());
    };
    TestResult::from_bool(stack.path() == path && stack.depth() == path.len())
}

#[quickcheck]
fn prop_every_prefix_is_a_prefix(path: Vec<u8>, cut: usize) -> TestResult {
    if path.is_empty() {
        return TestResult::discard();
    }
    let path: Vec<usize> = path.into_iter().map(usize::from).collect();
    let prefix_len = cut % path.len() + 1;
    let (Some(stack), Some(prefix)) = (
        SkipStack::from_path(&path),
        SkipStack::from_path(&path[..prefix_len]),
    ) else {
        return TestResult::failed();
    };
    TestResult::from_bool(stack.starts_with(&prefix))
}

#[quickcheck]
fn prop_longer_path_is_not_a_prefix(path: Vec<u8>, extra: u8) -> TestResult {
    if path.is_empty() {
        return TestResult::discard();
    }
    let path: Vec<usize> = path.into_iter().map(usize::from).collect();
    let mut longer = path.clone();
    longer.push(usize::from(extra));
    let (Some(stack), Some(longer)) = (SkipStack::from_path(&path), SkipStack::from_path(&longer))
    else {
        return TestResult::failed();
    };
    TestResult::from_bool(!stack.starts_with(&longer) && longer.starts_with(&stack))
}
