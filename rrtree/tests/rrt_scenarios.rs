/*
* Licensed to Elasticsearch B.V. under one or more contributor
* license agreements. See the NOTICE file distributed with
* this work for additional information regarding copyright
* ownership. Elasticsearch B.V. licenses this file to you under
* the Apache License, Version 2.0 (the "License"); you may
* not use this file except in compliance with the License.
* You may obtain a copy of the License at
*
*  http://www.apache.org/licenses/LICENSE-2.0
*
* Unless required by applicable law or agreed to in writing,
* software distributed under the License is distributed on an
* "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
* KIND, either express or implied.  See the License for the
* specific language governing permissions and limitations
* under the License.
*/

#[macro_use]
extern crate assert_approx_eq;

use cspace::{
    ConfigurationSpace, ConstraintFilterReturn, IntervalType, Metric, Scalar, L2,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rrtree::{ExtendResult, NodeId, RrtreeError, SpatialTree};
use std::sync::Arc;

/// Axis-aligned box of valid configurations; everything inside is free space
/// and path checks follow the straight segment.
#[derive(Debug)]
struct BoxSpace {
    dof: usize,
    lo: Scalar,
    hi: Scalar,
}

impl BoxSpace {
    fn new(dof: usize, lo: Scalar, hi: Scalar) -> BoxSpace {
        BoxSpace { dof, lo, hi }
    }
}

impl ConfigurationSpace for BoxSpace {
    type Metric = L2;

    fn dof(&self) -> usize {
        self.dof
    }

    fn set_state(&self, config: &mut [Scalar]) -> i32 {
        for value in config.iter() {
            if *value < self.lo || *value > self.hi {
                return 1;
            }
        }
        0
    }

    fn check_path_all_constraints(
        &self,
        _from: &[Scalar],
        _to: &[Scalar],
        _interval: IntervalType,
        _options: u32,
        filter_return: &mut ConstraintFilterReturn,
    ) -> i32 {
        filter_return.clear();
        0
    }
}

/// A checker that always reports deviation and hands back a polyline of
/// equally spaced configurations between the segment endpoints.
#[derive(Debug)]
struct DeviatingSpace {
    dof: usize,
    segments: usize,
}

impl ConfigurationSpace for DeviatingSpace {
    type Metric = L2;

    fn dof(&self) -> usize {
        self.dof
    }

    fn set_state(&self, _config: &mut [Scalar]) -> i32 {
        0
    }

    fn check_path_all_constraints(
        &self,
        from: &[Scalar],
        to: &[Scalar],
        interval: IntervalType,
        _options: u32,
        filter_return: &mut ConstraintFilterReturn,
    ) -> i32 {
        filter_return.clear();
        filter_return.has_deviated = true;
        // the open endpoint is assumed valid and is not part of the record
        let steps = match interval {
            IntervalType::OpenStart => 1..=self.segments,
            IntervalType::OpenEnd => 0..=self.segments - 1,
        };
        for k in steps {
            let t = k as Scalar / self.segments as Scalar;
            for (f, g) in from.iter().zip(to) {
                filter_return.configurations.push(f + t * (g - f));
            }
        }
        0
    }
}

fn line_tree(configs: &[Scalar], step_length: Scalar) -> (SpatialTree<BoxSpace>, Vec<NodeId>) {
    let mut tree = SpatialTree::new(Arc::new(BoxSpace::new(1, -1000.0, 1000.0)), false);
    tree.init(step_length, 1024.0);
    let mut handles = Vec::new();
    let mut parent = None;
    for &value in configs {
        let node = tree
            .insert_node(parent, &[value], 0)
            .expect("insert in range")
            .expect("not a duplicate");
        handles.push(node);
        parent = Some(node);
    }
    (tree, handles)
}

fn distinct_configs<C: ConfigurationSpace>(tree: &SpatialTree<C>) -> usize {
    let mut nodes = Vec::new();
    tree.get_nodes_vector(&mut nodes);
    let mut configs: Vec<Vec<u64>> = nodes
        .iter()
        .map(|&n| {
            tree.get_vector_config(n)
                .iter()
                .map(|v| v.to_bits())
                .collect()
        })
        .collect();
    configs.sort();
    configs.dedup();
    configs.len()
}

#[test]
fn one_dimensional_sanity() {
    let (tree, _) = line_tree(&[0.0, 1.0, 2.0, 3.0], 1.0);
    assert!(tree.validate());
    // four configurations; the structural count also includes self-child clones
    assert_eq!(distinct_configs(&tree), 4);
    assert!(tree.num_nodes() >= 4);

    let (nearest, dist) = tree.find_nearest(&[1.4]).unwrap();
    assert_eq!(tree.get_vector_config(nearest), vec![1.0]);
    assert_approx_eq!(dist, 0.4);
}

#[test]
fn duplicate_suppression() {
    let (mut tree, handles) = line_tree(&[0.0, 1.0, 2.0, 3.0], 1.0);
    let before = tree.num_nodes();
    let inserted = tree
        .insert_node(Some(handles[0]), &[0.0000001], 0)
        .unwrap();
    assert!(inserted.is_none());
    assert_eq!(tree.num_nodes(), before);
    assert_eq!(distinct_configs(&tree), 4);
    assert!(tree.validate());
}

#[test]
fn invalidate_subtree() {
    let (mut tree, handles) = line_tree(&[0.0, 1.0, 2.0, 3.0], 1.0);
    tree.invalidate_nodes_with_parent(handles[2]);

    // [2] is out; [3] was grown from it and is out transitively
    assert!(!tree.is_nn_candidate(handles[2]));
    assert!(!tree.is_nn_candidate(handles[3]));

    let (nearest, dist) = tree.find_nearest(&[2.0]).unwrap();
    let config = tree.get_vector_config(nearest);
    assert!(config == vec![1.0] || config == vec![3.0]);
    assert_approx_eq!(dist, 1.0);

    // no structural change happened
    assert!(tree.validate());
    assert_eq!(distinct_configs(&tree), 4);
}

#[test]
fn remove_and_reparent() {
    let count = 200;
    let configs: Vec<Scalar> = (0..count)
        .map(|i| 10.0 * i as Scalar / (count - 1) as Scalar)
        .collect();
    let mut tree = SpatialTree::new(Arc::new(BoxSpace::new(1, -1000.0, 1000.0)), false);
    tree.init(0.1, 16.0);
    let mut handles = Vec::new();
    let mut parent = None;
    for value in &configs {
        let node = tree.insert_node(parent, &[*value], 0).unwrap().unwrap();
        handles.push(node);
        parent = Some(node);
    }
    assert!(tree.validate());

    let mut removed = 0;
    for i in (0..count).rev() {
        if i % 7 != 0 {
            continue;
        }
        assert!(tree.remove_node(handles[i]), "removal {} failed", i);
        assert!(tree.validate(), "invariants broken after removing index {}", i);
        removed += 1;
    }
    assert_eq!(removed, 29);
    assert!(!tree.empty());

    // survivors still answer queries with a live node
    let (nearest, _) = tree.find_nearest(&[5.0]).unwrap();
    assert!(tree.is_nn_candidate(nearest));
}

#[test]
fn extend_with_deviating_checker() {
    let mut tree = SpatialTree::new(Arc::new(DeviatingSpace { dof: 2, segments: 5 }), false);
    tree.init(0.2, 4.0);
    let root = tree.insert_node(None, &[0.0, 0.0], 0).unwrap().unwrap();

    let (result, last) = tree.extend(&[1.0, 0.0], true).unwrap();
    assert_eq!(result, ExtendResult::Connected);
    let last = last.unwrap();

    // five checked configurations inserted, chained along the polyline
    assert_eq!(distinct_configs(&tree), 6);
    let mut node = last;
    let mut walked = Vec::new();
    while let Some(parent) = tree.rrt_parent(node) {
        walked.push(tree.get_vector_config(node)[0]);
        node = parent;
    }
    assert_eq!(node, root);
    assert_eq!(walked.len(), 5);
    for pair in walked.windows(2) {
        assert!(pair[0] > pair[1], "chain must walk back toward the tree");
    }
    assert_approx_eq!(walked[0], 0.2);
    assert_approx_eq!(walked[4], 0.04);
    assert!(tree.validate());
}

#[test]
fn extend_connects_in_steps() {
    let mut tree = SpatialTree::new(Arc::new(BoxSpace::new(2, -10.0, 10.0)), false);
    tree.init(0.2, 8.0);
    tree.insert_node(None, &[0.0, 0.0], 0).unwrap().unwrap();

    let target = [1.0, 0.0];
    let (result, last) = tree.extend(&target, false).unwrap();
    assert_eq!(result, ExtendResult::Connected);
    let last_config = tree.get_vector_config(last.unwrap());
    let dist = L2::dist(&last_config, &target);
    assert!(dist <= 0.01 * 0.2 + 1e-12, "connected but {} away", dist);
    assert_eq!(distinct_configs(&tree), 6);
    assert!(tree.validate());
}

#[test]
fn extend_one_step_adds_one_node() {
    let mut tree = SpatialTree::new(Arc::new(BoxSpace::new(2, -10.0, 10.0)), false);
    tree.init(0.2, 8.0);
    tree.insert_node(None, &[0.0, 0.0], 0).unwrap().unwrap();

    let (result, last) = tree.extend(&[3.0, 0.0], true).unwrap();
    assert_eq!(result, ExtendResult::Connected);
    assert_eq!(distinct_configs(&tree), 2);
    let config = tree.get_vector_config(last.unwrap());
    assert_approx_eq!(config[0], 0.2);
    assert_approx_eq!(config[1], 0.0);
}

#[test]
fn extend_stops_at_a_wall() {
    // the box ends at 0.5, the target sits beyond it
    let mut tree = SpatialTree::new(Arc::new(BoxSpace::new(1, -10.0, 0.5)), false);
    tree.init(0.2, 8.0);
    tree.insert_node(None, &[0.0], 0).unwrap().unwrap();

    let (result, last) = tree.extend(&[1.0], false).unwrap();
    assert_eq!(result, ExtendResult::Success);
    let config = tree.get_vector_config(last.unwrap());
    assert_approx_eq!(config[0], 0.4);

    // a tree already pressed against the wall cannot move at all
    let mut stuck = SpatialTree::new(Arc::new(BoxSpace::new(1, -10.0, 0.5)), false);
    stuck.init(0.2, 8.0);
    stuck.insert_node(None, &[0.5], 0).unwrap().unwrap();
    let before = stuck.num_nodes();
    let (result, _) = stuck.extend(&[2.0], false).unwrap();
    assert_eq!(result, ExtendResult::Failed);
    assert_eq!(stuck.num_nodes(), before);
}

#[test]
fn extend_on_empty_tree_fails() {
    let mut tree = SpatialTree::new(Arc::new(BoxSpace::new(2, -1.0, 1.0)), false);
    tree.init(0.2, 2.0);
    let (result, last) = tree.extend(&[0.5, 0.5], false).unwrap();
    assert_eq!(result, ExtendResult::Failed);
    assert!(last.is_none());
}

#[test]
fn out_of_range_insert() {
    let mut tree = SpatialTree::new(Arc::new(BoxSpace::new(3, -1000.0, 1000.0)), false);
    tree.init(0.1, 1.0);
    let root = tree.insert_node(None, &[0.0, 0.0, 0.0], 0).unwrap().unwrap();
    let err = tree
        .insert_node(Some(root), &[100.0, 100.0, 100.0], 0)
        .unwrap_err();
    match err {
        RrtreeError::OutOfRange {
            config,
            max_distance,
        } => {
            assert_eq!(config, vec![100.0, 100.0, 100.0]);
            assert_approx_eq!(max_distance, 1.0);
        }
        other => panic!("expected OutOfRange, got {}", other),
    }
    assert_eq!(tree.num_nodes(), 1);
}

fn brute_force_nearest<C: ConfigurationSpace>(
    tree: &SpatialTree<C>,
    query: &[Scalar],
) -> Option<(NodeId, Scalar)> {
    let mut nodes = Vec::new();
    tree.get_nodes_vector(&mut nodes);
    let mut best: Option<(NodeId, Scalar)> = None;
    for &node in &nodes {
        if !tree.is_nn_candidate(node) {
            continue;
        }
        let dist = L2::dist(&tree.get_vector_config(node), query);
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((node, dist)),
        }
    }
    best
}

#[test]
fn nearest_matches_brute_force() {
    let mut rng = SmallRng::seed_from_u64(0x8d3a_1f42);
    let mut tree = SpatialTree::new(Arc::new(BoxSpace::new(3, -100.0, 100.0)), false);
    tree.init(0.5, 16.0);
    let mut handles: Vec<NodeId> = Vec::new();
    for _ in 0..150 {
        let config: Vec<Scalar> = (0..3).map(|_| rng.gen_range(0.0..8.0)).collect();
        let parent = if handles.is_empty() {
            None
        } else {
            Some(handles[rng.gen_range(0..handles.len())])
        };
        if let Some(node) = tree.insert_node(parent, &config, 0).unwrap() {
            handles.push(node);
        }
    }
    assert!(tree.validate());

    for _ in 0..50 {
        let query: Vec<Scalar> = (0..3).map(|_| rng.gen_range(0.0..8.0)).collect();
        let (found, found_dist) = tree.find_nearest(&query).unwrap();
        let (_, expected_dist) = brute_force_nearest(&tree, &query).unwrap();
        assert_approx_eq!(found_dist, expected_dist);
        assert_approx_eq!(L2::dist(&tree.get_vector_config(found), &query), found_dist);
    }

    // knock out a subtree and the query must still be exact over the survivors
    let victim = handles[10];
    tree.invalidate_nodes_with_parent(victim);
    assert!(!tree.is_nn_candidate(victim));
    for _ in 0..50 {
        let query: Vec<Scalar> = (0..3).map(|_| rng.gen_range(0.0..8.0)).collect();
        let found = tree.find_nearest(&query);
        let expected = brute_force_nearest(&tree, &query);
        match (found, expected) {
            (Some((_, fd)), Some((_, ed))) => assert_approx_eq!(fd, ed),
            (None, None) => {}
            other => panic!("query disagreement: {:?}", other),
        }
    }
}

#[test]
fn random_removals_keep_the_tree_valid() {
    let mut rng = SmallRng::seed_from_u64(0x51c6_09be);
    let mut tree = SpatialTree::new(Arc::new(BoxSpace::new(2, -100.0, 100.0)), false);
    tree.init(0.25, 16.0);
    let mut handles: Vec<NodeId> = Vec::new();
    for _ in 0..60 {
        let config: Vec<Scalar> = (0..2).map(|_| rng.gen_range(0.0..8.0)).collect();
        if let Some(node) = tree.insert_node(handles.last().copied(), &config, 0).unwrap() {
            handles.push(node);
        }
    }
    assert!(tree.validate());

    for _ in 0..30 {
        let index = rng.gen_range(0..handles.len());
        let handle = handles.swap_remove(index);
        // a stale handle may have been recycled; either way the tree must
        // stay consistent
        tree.remove_node(handle);
        assert!(tree.validate());
    }
    assert!(!tree.empty());
}

#[test]
fn delete_subtree_physically() {
    let (mut tree, handles) = line_tree(&[0.0, 1.0, 2.0, 3.0, 4.0], 1.0);
    let removed = tree.delete_nodes_with_parent(handles[2]);
    // [2], [3], [4] and any of their clones
    assert!(removed >= 3);
    assert!(tree.validate());
    assert_eq!(distinct_configs(&tree), 2);
    let (nearest, dist) = tree.find_nearest(&[4.0]).unwrap();
    assert_eq!(tree.get_vector_config(nearest), vec![1.0]);
    assert_approx_eq!(dist, 3.0);
}

#[test]
fn dump_format_round_reads() {
    let (tree, _) = line_tree(&[0.0, 1.0, 2.0], 1.0);
    let mut out = Vec::new();
    tree.dump_tree(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let mut lines = text.lines();
    let count: usize = lines.next().unwrap().parse().unwrap();
    assert_eq!(count, tree.num_nodes());

    let mut nodes = Vec::new();
    tree.get_nodes_vector(&mut nodes);
    for (line, &node) in lines.zip(nodes.iter()) {
        let mut fields = line.split(',');
        let value: Scalar = fields.next().unwrap().parse().unwrap();
        assert_approx_eq!(value, tree.get_vector_config(node)[0]);
        let parent_index: i64 = fields.next().unwrap().parse().unwrap();
        match tree.rrt_parent(node) {
            None => assert_eq!(parent_index, -1),
            Some(parent) => {
                let expected = nodes.iter().position(|&n| n == parent).unwrap() as i64;
                assert_eq!(parent_index, expected);
            }
        }
    }
}

#[test]
fn backward_tree_reverses_polyline_ingestion() {
    // a goal-rooted tree checks (new -> cur) and ingests the polyline from the
    // tree outward, so the chain still walks back toward the nearest node
    let mut tree = SpatialTree::new(Arc::new(DeviatingSpace { dof: 1, segments: 4 }), true);
    tree.init(0.2, 4.0);
    let root = tree.insert_node(None, &[1.0], 0).unwrap().unwrap();

    let (result, last) = tree.extend(&[0.0], true).unwrap();
    assert_eq!(result, ExtendResult::Connected);
    let mut node = last.unwrap();
    let mut chain = Vec::new();
    while let Some(parent) = tree.rrt_parent(node) {
        chain.push(tree.get_vector_config(node)[0]);
        node = parent;
    }
    assert_eq!(node, root);
    assert!(!chain.is_empty());
    // the further along the chain, the closer to the root
    for pair in chain.windows(2) {
        assert!(pair[0] < pair[1]);
    }
    assert!(tree.validate());
}
