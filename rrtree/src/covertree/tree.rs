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

//! # The Cover Tree Data Structure
//! Nodes at level `L` are pairwise separated by more than `base^L` and every
//! node covers its children within `base^L`. Those two facts are what make the
//! level-by-level descent of insertion and nearest-neighbor queries correct,
//! and everything delicate in this module exists to keep them true while
//! nodes come and go.
//!
//! A node near-identical to an existing one cannot be separated from it at any
//! level, so the existing node is cloned one level down and the newcomer hangs
//! under the clone; the clone is a *self child* and counts as a structural
//! node. The same cloning keeps chains intact when a removed node's orphans
//! are re-homed to an ancestor several levels up.
//!
//! The tree is a single-writer structure. Mutating operations take `&mut self`
//! and reuse the tree's scratch buffers; read-only queries take `&self` and
//! carry their own traversal state, so they may run whenever no writer is
//! active. There are no locks anywhere below this API.

use super::layer::{encode_level, LevelSet};
use super::node::NodeId;
use super::pool::NodePool;
use crate::errors::{RrtreeError, RrtreeResult};
use cspace::{ConfigurationSpace, ConstraintFilterReturn, Scalar};
use fxhash::FxBuildHasher;
use hashbrown::HashSet;
use log::{trace, warn};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::io;
use std::mem;
use std::sync::Arc;
use std::time::Instant;

/// Absolute slack for float comparisons against a level bound. Distances that
/// land exactly on a bound are common, covering checks allow `bound + ε`.
pub(crate) const DIST_EPSILON: Scalar = 1e-10;

/// Container for the parameters governing the shape of the tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpatialTreeParameters {
    /// Governs the level bounds, `base^L`. 2.0 by convention.
    pub base: Scalar,
    /// Bounds how far a descendant in a search frontier may sit from a
    /// covering ancestor, as a multiple of the level bound. Must satisfy
    /// `base <= base_child_mult`.
    pub base_child_mult: Scalar,
    /// The planner's nominal per-iteration progress magnitude. Set by `init`;
    /// also fixes `min_distance`, the radius under which two configurations
    /// are treated as the same node.
    pub step_length: Scalar,
    /// Upper bound on the distance from the root to anything ever inserted.
    /// Set by `init`.
    pub max_distance: Scalar,
    /// Cap on the number of steps a single `extend` call may take, guarding
    /// against oracle livelock.
    pub extend_iteration_cap: usize,
    /// True for a tree rooted at the goal. Flips the neighbor-step hint and
    /// the ingestion order of checked polylines during `extend`.
    pub from_goal: bool,
}

impl Default for SpatialTreeParameters {
    fn default() -> SpatialTreeParameters {
        SpatialTreeParameters {
            base: 2.0,
            base_child_mult: 2.0,
            step_length: 1.0,
            max_distance: 1.0,
            extend_iteration_cap: 100,
            from_goal: false,
        }
    }
}

/// An incremental cover tree over configuration vectors.
///
/// The tree owns its nodes through a fixed-stride pool and hands out [`NodeId`]
/// handles. All distances, state checks and constraint checks go through the
/// [`ConfigurationSpace`] the tree was built with.
pub struct SpatialTree<C: ConfigurationSpace> {
    pub(crate) space: Arc<C>,
    pub(crate) parameters: SpatialTreeParameters,
    pub(crate) pool: NodePool,
    levels: Vec<LevelSet>,
    num_nodes: usize,
    max_level: i32,
    min_level: i32,
    max_level_bound: Scalar,
    base_inv: Scalar,
    min_distance: Scalar,

    // scratch reused across mutating operations
    current_level_nodes: Vec<(NodeId, Scalar)>,
    next_level_nodes: Vec<(NodeId, Scalar)>,
    cache_nodes: Vec<Vec<NodeId>>,
    child_cache: HashSet<NodeId, FxBuildHasher>,
    pub(crate) cur_config: Vec<Scalar>,
    pub(crate) new_config: Vec<Scalar>,
    pub(crate) delta_config: Vec<Scalar>,
    pub(crate) constraint_return: ConstraintFilterReturn,
}

impl<C: ConfigurationSpace> SpatialTree<C> {
    /// Creates a tree bound to a configuration space. Call [`init`](Self::init)
    /// before inserting anything.
    pub fn new(space: Arc<C>, from_goal: bool) -> SpatialTree<C> {
        let parameters = SpatialTreeParameters {
            from_goal,
            ..SpatialTreeParameters::default()
        };
        SpatialTree::with_parameters(space, parameters)
    }

    /// Creates a tree with explicit parameters.
    pub fn with_parameters(space: Arc<C>, parameters: SpatialTreeParameters) -> SpatialTree<C> {
        let dof = space.dof();
        SpatialTree {
            space,
            parameters,
            pool: NodePool::new(dof),
            levels: Vec::new(),
            num_nodes: 0,
            max_level: 0,
            min_level: -1,
            max_level_bound: 1.0,
            base_inv: 0.5,
            min_distance: 0.0,
            current_level_nodes: Vec::new(),
            next_level_nodes: Vec::new(),
            cache_nodes: Vec::new(),
            child_cache: HashSet::default(),
            cur_config: Vec::new(),
            new_config: Vec::new(),
            delta_config: Vec::new(),
            constraint_return: ConstraintFilterReturn::new(),
        }
    }

    /// Resets the tree and derives the level span for a planning run.
    ///
    /// `step_length` is the planner's nominal step; `max_distance` must bound
    /// the distance from the root to any configuration that will be inserted.
    pub fn init(&mut self, step_length: Scalar, max_distance: Scalar) {
        debug_assert!(self.parameters.base <= self.parameters.base_child_mult);
        self.reset();
        self.parameters.step_length = step_length;
        self.parameters.max_distance = max_distance;
        self.min_distance = 0.001 * step_length;
        self.max_level = max_distance.log(self.parameters.base).ceil() as i32;
        self.min_level = self.max_level - 1;
        self.max_level_bound = self.parameters.base.powi(self.max_level);
        self.base_inv = 1.0 / self.parameters.base;
        let enc = encode_level(self.max_level);
        self.ensure_level(enc);
        let dof = self.pool.dof();
        self.cur_config.resize(dof, 0.0);
        self.new_config.resize(dof, 0.0);
        self.delta_config.resize(dof, 0.0);
        self.constraint_return.clear();
    }

    /// Drops every node. Handles held by the caller become invalid.
    pub fn reset(&mut self) {
        // scratch holds raw node handles, clear it before releasing the pool
        self.current_level_nodes.clear();
        self.next_level_nodes.clear();
        for cache in &mut self.cache_nodes {
            cache.clear();
        }
        self.child_cache.clear();
        for level in &mut self.levels {
            level.clear();
        }
        self.pool.reset();
        self.num_nodes = 0;
    }

    /// Whether the tree holds no nodes.
    pub fn empty(&self) -> bool {
        self.num_nodes == 0
    }

    /// Number of live structural nodes, self-child clones included. Callers
    /// counting distinct configurations need their own notion.
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Number of joint values per configuration.
    pub fn dof(&self) -> usize {
        self.pool.dof()
    }

    /// Read access to the tree parameters.
    pub fn parameters(&self) -> &SpatialTreeParameters {
        &self.parameters
    }

    /// The configuration space the tree was built with.
    pub fn space(&self) -> &Arc<C> {
        &self.space
    }

    /// The RRT parent recorded when `node` was inserted.
    pub fn rrt_parent(&self, node: NodeId) -> Option<NodeId> {
        self.pool.node(node).rrt_parent
    }

    /// The host tag recorded when `node` was inserted.
    pub fn userdata(&self, node: NodeId) -> u32 {
        self.pool.node(node).userdata
    }

    /// The cover-tree level `node` lives on.
    pub fn node_level(&self, node: NodeId) -> i32 {
        self.pool.node(node).level
    }

    /// Whether `node` may still be returned by nearest-neighbor queries.
    pub fn is_nn_candidate(&self, node: NodeId) -> bool {
        self.pool.node(node).use_nn
    }

    /// Copies out the configuration of `node`.
    pub fn get_vector_config(&self, node: NodeId) -> Vec<Scalar> {
        self.pool.config(node).to_vec()
    }

    /// Copies the configuration of `node` into a caller buffer.
    pub fn get_config(&self, node: NodeId, config: &mut Vec<Scalar>) {
        config.clear();
        config.extend_from_slice(self.pool.config(node));
    }

    /// Collects every live node, encoded-level order, insertion order within a
    /// level.
    pub fn get_nodes_vector(&self, nodes: &mut Vec<NodeId>) {
        nodes.clear();
        if nodes.capacity() < self.num_nodes {
            nodes.reserve(self.num_nodes - nodes.len());
        }
        for level in &self.levels {
            nodes.extend(level.iter().copied());
        }
    }

    /// Given `0 <= index < num_nodes`, returns a node. Indices are only stable
    /// until the next mutation.
    pub fn get_node_from_index(&self, index: usize) -> Option<NodeId> {
        if index >= self.num_nodes {
            return None;
        }
        let mut index = index;
        for level in &self.levels {
            if index < level.len() {
                return level.get(index);
            }
            index -= level.len();
        }
        None
    }

    fn ensure_level(&mut self, enc: usize) {
        if enc >= self.levels.len() {
            self.levels.resize_with(enc + 1, LevelSet::new);
        }
    }

    fn root(&self) -> NodeId {
        debug_assert!(self.num_nodes > 0);
        self.levels[encode_level(self.max_level)]
            .first()
            .expect("non-empty tree without a root")
    }

    pub(crate) fn config_distance(&self, a: &[Scalar], b: &[Scalar]) -> Scalar {
        self.space.distance(a, b)
    }

    fn node_config_distance(&self, node: NodeId, config: &[Scalar]) -> Scalar {
        self.space.distance(self.pool.config(node), config)
    }

    fn node_distance(&self, a: NodeId, b: NodeId) -> Scalar {
        self.space.distance(self.pool.config(a), self.pool.config(b))
    }

    /// Inserts a configuration with its RRT parent and host tag.
    ///
    /// Returns `Ok(None)` when the configuration lies within `min_distance` of
    /// an existing node; the tree is left untouched and the caller treats the
    /// node as already present. Returns [`RrtreeError::OutOfRange`] when no
    /// level accepts the node, which usually means the configuration lies
    /// further than `max_distance` from the root.
    pub fn insert_node(
        &mut self,
        rrt_parent: Option<NodeId>,
        config: &[Scalar],
        userdata: u32,
    ) -> RrtreeResult<Option<NodeId>> {
        self.space.validate_config(config)?;

        if self.num_nodes == 0 {
            let node = self.pool.alloc(config, rrt_parent, userdata);
            self.pool.node_mut(node).level = self.max_level;
            let enc = encode_level(self.max_level);
            self.ensure_level(enc);
            self.levels[enc].insert(node);
            self.num_nodes += 1;
            return Ok(Some(node));
        }

        let root = self.root();
        let root_dist = self.node_config_distance(root, config);

        let mut current = mem::take(&mut self.current_level_nodes);
        let mut next = mem::take(&mut self.next_level_nodes);
        current.clear();
        current.push((root, root_dist));

        let mut level = self.max_level;
        let mut bound = self.max_level_bound;
        // deepest level where a covering candidate existed: (parent, dist, level, bound)
        let mut chosen: Option<(NodeId, Scalar, i32, Scalar)> = None;
        let mut duplicate = false;

        loop {
            let mut closest: Option<(NodeId, Scalar)> = None;
            for &(node, dist) in current.iter() {
                if dist > bound {
                    continue;
                }
                match closest {
                    None => closest = Some((node, dist)),
                    Some((closest_node, closest_dist)) => {
                        if dist < closest_dist - DIST_EPSILON {
                            closest = Some((node, dist));
                        } else if dist < closest_dist + self.min_distance
                            && self.pool.node(node).level < self.pool.node(closest_node).level
                        {
                            // near tie, prefer the deeper clone
                            closest = Some((node, dist));
                        }
                    }
                }
                if closest.map_or(false, |(_, d)| d <= self.min_distance) {
                    duplicate = true;
                    break;
                }
            }
            if duplicate {
                break;
            }
            if let Some((parent, dist)) = closest {
                chosen = Some((parent, dist, level, bound));
            }

            next.clear();
            let enc = encode_level(level);
            if enc < self.levels.len() {
                let carry_bound = bound * self.parameters.base_child_mult;
                for &(node, dist) in current.iter() {
                    if dist <= carry_bound {
                        // a node covers all sets below its level
                        next.push((node, dist));
                    }
                    if self.pool.node(node).level == level {
                        for &child in self.pool.node(node).children.iter() {
                            let child_dist = self.node_config_distance(child, config);
                            if child_dist <= carry_bound {
                                next.push((child, child_dist));
                            }
                        }
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            mem::swap(&mut current, &mut next);
            level -= 1;
            bound *= self.base_inv;
        }

        self.current_level_nodes = current;
        self.next_level_nodes = next;

        if duplicate {
            return Ok(None);
        }
        match chosen {
            Some((parent, parent_dist, parent_level, parent_bound)) => {
                let node = self.insert_at(
                    rrt_parent,
                    config,
                    userdata,
                    parent,
                    parent_dist,
                    parent_level - 1,
                    parent_bound * self.base_inv,
                );
                Ok(Some(node))
            }
            // can happen with circular joints even inside max_distance
            None => Err(RrtreeError::OutOfRange {
                config: config.to_vec(),
                max_distance: self.parameters.max_distance,
            }),
        }
    }

    /// Hangs a new node under `parent`, cloning the parent down as many levels
    /// as the covering invariant demands.
    fn insert_at(
        &mut self,
        rrt_parent: Option<NodeId>,
        config: &[Scalar],
        userdata: u32,
        parent: NodeId,
        parent_dist: Scalar,
        max_insert_level: i32,
        insert_bound: Scalar,
    ) -> NodeId {
        let mut parent = parent;
        let mut parent_dist = parent_dist;
        let mut insert_level = max_insert_level;

        if parent_dist <= self.min_distance {
            // a similar configuration already sits here, walk its clone chain
            // down to the deepest member before attaching
            while self.pool.node(parent).has_self_child {
                let mut near: Option<(NodeId, Scalar)> = None;
                for &child in self.pool.node(parent).children.iter() {
                    let child_dist = self.node_config_distance(child, config);
                    if child_dist <= self.min_distance {
                        near = Some((child, child_dist));
                        break;
                    }
                }
                match near {
                    Some((child, child_dist)) => {
                        parent = child;
                        parent_dist = child_dist;
                        insert_level -= 1;
                    }
                    None => {
                        warn!("self-child flag set on {} with no near child", parent);
                        break;
                    }
                }
            }
        } else {
            // might have to insert lower to keep the sibling separation
            let mut child_bound = insert_bound;
            while parent_dist < child_bound {
                child_bound *= self.base_inv;
                insert_level -= 1;
            }
        }

        // the parent must sit exactly one level above the insert level; clone
        // it down as needed, each clone still represents the same RRT node
        while self.pool.node(parent).level > insert_level + 1 {
            let clone = self.pool.clone_node(parent);
            let clone_level = self.pool.node(parent).level - 1;
            self.pool.node_mut(clone).level = clone_level;
            self.pool.node_mut(parent).children.push(clone);
            self.pool.node_mut(parent).has_self_child = true;
            let enc = encode_level(clone_level);
            self.ensure_level(enc);
            self.levels[enc].insert(clone);
            self.num_nodes += 1;
            parent = clone;
        }

        if parent_dist <= self.min_distance {
            self.pool.node_mut(parent).has_self_child = true;
        }

        let node = self.pool.alloc(config, rrt_parent, userdata);
        self.pool.node_mut(node).level = insert_level;
        let enc = encode_level(insert_level);
        self.ensure_level(enc);
        self.levels[enc].insert(node);
        self.pool.node_mut(parent).children.push(node);
        self.num_nodes += 1;

        if self.min_level > insert_level {
            self.min_level = insert_level;
        }
        node
    }

    /// Nearest live node to `query` and its distance. Nodes invalidated
    /// through [`invalidate_nodes_with_parent`](Self::invalidate_nodes_with_parent)
    /// still route the search but are never returned. `None` on an empty tree.
    pub fn find_nearest(&self, query: &[Scalar]) -> Option<(NodeId, Scalar)> {
        if self.num_nodes == 0 {
            return None;
        }
        assert_eq!(query.len(), self.dof());

        let root = self.root();
        let root_dist = self.node_config_distance(root, query);
        let mut best = if self.pool.node(root).use_nn {
            Some((root, root_dist))
        } else {
            None
        };

        let mut current: Vec<(NodeId, Scalar)> = vec![(root, root_dist)];
        let mut next: Vec<(NodeId, Scalar)> = Vec::new();
        let mut bound = self.max_level_bound;
        while !current.is_empty() {
            next.clear();
            // prune against the closest child that could actually be returned;
            // invalidated children keep routing but must not tighten the bound
            let mut min_child_dist = Scalar::INFINITY;
            for &(node, _) in current.iter() {
                for &child in self.pool.node(node).children.iter() {
                    let child_dist = self.node_config_distance(child, query);
                    if self.pool.node(child).use_nn {
                        if best.map_or(true, |(_, best_dist)| child_dist < best_dist) {
                            best = Some((child, child_dist));
                        }
                        if min_child_dist > child_dist {
                            min_child_dist = child_dist;
                        }
                    }
                    next.push((child, child_dist));
                }
            }
            current.clear();
            let test_bound = min_child_dist + bound;
            for &(node, dist) in next.iter() {
                if dist < test_bound {
                    current.push((node, dist));
                }
            }
            bound *= self.base_inv;
        }
        best
    }

    /// Logically deletes `parent` and everything transitively grown from it:
    /// the whole subtree keeps routing queries but stops being eligible as a
    /// nearest neighbor. No structure changes and no handle is invalidated.
    pub fn invalidate_nodes_with_parent(&mut self, parent: NodeId) {
        let start = Instant::now();
        self.pool.node_mut(parent).use_nn = false;
        let mut marked = mem::take(&mut self.child_cache);
        marked.clear();
        marked.insert(parent);
        let mut changed = true;
        while changed {
            changed = false;
            for level in &self.levels {
                for &node in level.iter() {
                    if marked.contains(&node) {
                        continue;
                    }
                    let rrt_parent = self.pool.node(node).rrt_parent;
                    if let Some(rrt_parent) = rrt_parent {
                        if marked.contains(&rrt_parent) {
                            self.pool.node_mut(node).use_nn = false;
                            marked.insert(node);
                            changed = true;
                        }
                    }
                }
            }
        }
        trace!(
            "invalidated {} nodes in {:?}",
            marked.len(),
            start.elapsed()
        );
        self.child_cache = marked;
    }

    /// Physically removes `parent` and everything transitively grown from it,
    /// self-child clones included. Returns how many nodes were removed.
    pub fn delete_nodes_with_parent(&mut self, parent: NodeId) -> usize {
        debug_assert!(self.validate());
        let start = Instant::now();
        if !self.pool.contains(parent) {
            return 0;
        }
        let mut gathered: Vec<NodeId> = Vec::with_capacity(128);
        let mut marked = mem::take(&mut self.child_cache);
        marked.clear();
        marked.insert(parent);
        gathered.push(parent);
        let mut changed = true;
        while changed {
            changed = false;
            for level in &self.levels {
                for &node in level.iter() {
                    if marked.contains(&node) {
                        continue;
                    }
                    let rrt_parent = self.pool.node(node).rrt_parent;
                    if let Some(rrt_parent) = rrt_parent {
                        if marked.contains(&rrt_parent) {
                            gathered.push(node);
                            marked.insert(node);
                            changed = true;
                        }
                    }
                }
            }
        }
        self.child_cache = marked;

        // remove in the reverse of the gathered order
        let mut removed = 0;
        for &node in gathered.iter().rev() {
            if self.remove_node(node) {
                removed += 1;
            }
        }
        debug_assert!(self.validate());
        trace!("deleted {} nodes in {:?}", removed, start.elapsed());
        removed
    }

    /// Physically removes one node, re-homing its children so the covering and
    /// separation invariants hold afterwards. The handle becomes invalid; if
    /// the root was removed another node takes its place.
    pub fn remove_node(&mut self, node: NodeId) -> bool {
        if self.num_nodes == 0 || !self.pool.contains(node) {
            return false;
        }

        let root = self.root();
        if self.num_nodes == 1 && node == root {
            self.reset();
            return true;
        }

        let mut cache = mem::take(&mut self.cache_nodes);
        let depth = (self.max_level - self.min_level) as usize + 1;
        if cache.len() < depth {
            cache.resize_with(depth, Vec::new);
        }
        for level_cache in &mut cache {
            level_cache.clear();
        }
        cache[0].push(root);

        let removed = self.remove_rec(node, &mut cache, self.max_level, self.max_level_bound);
        self.cache_nodes = cache;
        if removed {
            self.pool.free(node);
            debug_assert!(self.validate());
        }
        removed
    }

    /// One level of the removal descent. Builds the cover set of nodes near
    /// enough to possibly hold `removing` in their subtree, unlinks it from its
    /// cover parent on the way down, and re-homes its children on the way up.
    fn remove_rec(
        &mut self,
        removing: NodeId,
        cache: &mut Vec<Vec<NodeId>>,
        level: i32,
        bound: Scalar,
    ) -> bool {
        let enc = encode_level(level);
        if enc >= self.levels.len() {
            return false;
        }

        let cover_index = (self.max_level - (level - 1)) as usize;
        if cover_index >= cache.len() {
            let grow = cover_index + (self.max_level - self.min_level) as usize + 1;
            cache.resize_with(grow, Vec::new);
        }
        cache[cover_index].clear();

        for i in 0..cache[cover_index - 1].len() {
            let node = cache[cover_index - 1][i];
            if !self.levels[enc].contains(node) {
                continue;
            }
            let mut unlinked = false;
            let mut child_index = 0;
            while child_index < self.pool.node(node).children.len() {
                let child = self.pool.node(node).children[child_index];
                if child == removing {
                    cache[cover_index].push(child);
                    self.pool.node_mut(node).children.remove(child_index);
                    unlinked = true;
                } else {
                    let child_dist = self.node_distance(removing, child);
                    if child_dist <= bound * self.parameters.base_child_mult {
                        cache[cover_index].push(child);
                    }
                    child_index += 1;
                }
            }
            if unlinked && self.pool.node(node).has_self_child {
                // the unlinked child may have been the self child
                let survivor_near = self
                    .pool
                    .node(node)
                    .children
                    .iter()
                    .any(|&c| self.node_distance(node, c) <= self.min_distance);
                if !survivor_near {
                    self.pool.node_mut(node).has_self_child = false;
                }
            }
        }

        let mut removed = self.remove_rec(removing, cache, level - 1, bound * self.base_inv);

        if !removed
            && self.pool.node(removing).level == level
            && cache[cover_index - 1].contains(&removing)
        {
            // find a better home for each child of the removed node
            let children: SmallVec<[NodeId; 10]> = self.pool.node(removing).children.clone();
            for child in children {
                let mut parent_level = level;
                let mut parent_bound = bound;
                let mut closest: Option<(NodeId, Scalar)> = None;
                while parent_level <= self.max_level {
                    let slot = (self.max_level - parent_level) as usize;
                    for i in 0..cache[slot].len() {
                        let candidate = cache[slot][i];
                        if candidate == removing {
                            continue;
                        }
                        let candidate_dist = self.node_distance(child, candidate);
                        if candidate_dist < parent_bound {
                            match closest {
                                Some((_, closest_dist)) if candidate_dist >= closest_dist => {}
                                _ => closest = Some((candidate, candidate_dist)),
                            }
                        }
                    }
                    if closest.is_some() {
                        break;
                    }
                    parent_level += 1;
                    parent_bound *= self.parameters.base;
                }

                match closest {
                    Some((closest_node, closest_dist)) => {
                        let target_level = self.pool.node(closest_node).level - 1;
                        let mut top = child;
                        while self.pool.node(top).level < target_level {
                            top = self.clone_up(top, cache);
                        }
                        if closest_dist <= self.min_distance {
                            self.pool.node_mut(closest_node).has_self_child = true;
                        }
                        self.pool.node_mut(closest_node).children.push(top);
                    }
                    None => {
                        // nothing covers the orphan, it becomes the new root
                        let mut top = child;
                        while self.pool.node(top).level < self.max_level {
                            top = self.clone_up(top, cache);
                        }
                    }
                }
            }

            let erased = self.levels[enc].remove(removing);
            debug_assert!(erased);
            self.num_nodes -= 1;
            removed = true;
        }
        removed
    }

    /// Clones `node` one level up, making the original its self child, and
    /// registers the clone with its level set and the removal cover cache.
    fn clone_up(&mut self, node: NodeId, cache: &mut Vec<Vec<NodeId>>) -> NodeId {
        let clone = self.pool.clone_node(node);
        let clone_level = self.pool.node(node).level + 1;
        self.pool.node_mut(clone).level = clone_level;
        self.pool.node_mut(clone).children.push(node);
        self.pool.node_mut(clone).has_self_child = true;
        let enc = encode_level(clone_level);
        self.ensure_level(enc);
        self.levels[enc].insert(clone);
        self.num_nodes += 1;
        let slot = (self.max_level - clone_level) as usize;
        if slot >= cache.len() {
            cache.resize_with(slot + 1, Vec::new);
        }
        cache[slot].push(clone);
        clone
    }

    /// Re-derives every structural invariant by walking the level sets top
    /// down. Logs the first violation. Meant for debug builds; mutation paths
    /// assert it after removals.
    pub fn validate(&self) -> bool {
        if self.num_nodes == 0 {
            return true;
        }

        let enc_max = encode_level(self.max_level);
        if enc_max >= self.levels.len() || self.levels[enc_max].len() != 1 {
            warn!("more than 1 root node");
            return false;
        }

        let mut bound = self.max_level_bound;
        let mut accum: Vec<NodeId> = Vec::with_capacity(self.num_nodes);
        let mut all_children = 0usize;
        let mut counted = 0usize;
        let mut level = self.max_level;
        while level >= self.min_level {
            let enc = encode_level(level);
            // an uninhabited level has nothing to check and cannot tighten the
            // separation view
            if enc < self.levels.len() && !self.levels[enc].is_empty() {
                for &node in self.levels[enc].iter() {
                    if self.pool.node(node).level != level {
                        warn!(
                            "node {} has level {} but sits on level {}",
                            node,
                            self.pool.node(node).level,
                            level
                        );
                        return false;
                    }
                    for &child in self.pool.node(node).children.iter() {
                        let child_dist = self.node_distance(node, child);
                        if child_dist > bound + DIST_EPSILON {
                            warn!(
                                "invalid parent child nodes at level {} ({}), dist={}",
                                level, bound, child_dist
                            );
                            return false;
                        }
                        if self.pool.node(child).level != level - 1 {
                            warn!(
                                "child {} of {} is at level {} instead of {}",
                                child,
                                node,
                                self.pool.node(child).level,
                                level - 1
                            );
                            return false;
                        }
                    }
                    all_children += self.pool.node(node).children.len();
                    if self.pool.node(node).has_self_child {
                        let has_near = self
                            .pool
                            .node(node)
                            .children
                            .iter()
                            .any(|&c| self.node_distance(node, c) <= self.min_distance);
                        if !has_near {
                            warn!("node {} flags a self child but has no near child", node);
                            return false;
                        }
                    } else {
                        accum.push(node);
                    }

                    if level < self.max_level {
                        let mut found = 0;
                        for &parent in self.levels[encode_level(level + 1)].iter() {
                            if self.pool.node(parent).children.contains(&node) {
                                found += 1;
                            }
                        }
                        if found != 1 {
                            warn!("node {} has {} parents at level {}", node, found, level + 1);
                            return false;
                        }
                    }
                }
                counted += self.levels[enc].len();

                let accumulated = accum.len();
                for i in 0..accumulated {
                    for j in (i + 1)..accumulated {
                        let sibling_dist = self.node_distance(accum[i], accum[j]);
                        if sibling_dist <= bound {
                            warn!(
                                "invalid sibling nodes {}, {} at level {} ({}), dist={}",
                                accum[i], accum[j], level, bound, sibling_dist
                            );
                            return false;
                        }
                    }
                }
            }
            level -= 1;
            bound *= self.base_inv;
        }

        if self.num_nodes != counted {
            warn!(
                "num predicted nodes ({}) does not match computed nodes ({})",
                self.num_nodes, counted
            );
            return false;
        }
        if self.num_nodes != all_children + 1 {
            warn!(
                "num predicted nodes ({}) does not match computed nodes from children ({})",
                self.num_nodes,
                all_children + 1
            );
            return false;
        }
        true
    }

    /// Writes the tree as text: the node count, then one line per node with its
    /// configuration values and the listing index of its RRT parent (`-1` when
    /// the parent is not in the listing).
    pub fn dump_tree<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "{}", self.num_nodes)?;
        let mut nodes = Vec::new();
        self.get_nodes_vector(&mut nodes);
        for &node in nodes.iter() {
            for value in self.pool.config(node) {
                write!(writer, "{},", value)?;
            }
            let parent_index = self
                .pool
                .node(node)
                .rrt_parent
                .and_then(|parent| nodes.iter().position(|&n| n == parent));
            match parent_index {
                Some(index) => writeln!(writer, "{}", index)?,
                None => writeln!(writer, "-1")?,
            }
        }
        Ok(())
    }
}
