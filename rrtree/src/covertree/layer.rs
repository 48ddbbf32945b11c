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

//! # The Levels
//! One set of live nodes per inhabited cover-tree level. Levels are indexed by
//! an encoding that folds the signed level into a non-negative array index, and
//! the per-level sets preserve insertion order: nearest-neighbor tie-breaks,
//! node enumeration and the dump format are all defined in terms of it.
//!
//! Level sets are grown on demand and never shrunk; the capacity is cheap and
//! a planner that emptied a level is very likely to repopulate it.

use super::node::NodeId;
use fxhash::FxBuildHasher;
use hashbrown::HashSet;

/// Folds a signed level into a non-negative array index.
///
/// Positive levels map to odd indices, the rest to even ones, so the root
/// (the largest level) always carries the largest index in use.
#[inline]
pub fn encode_level(level: i32) -> usize {
    let doubled = level << 1;
    if doubled > 0 {
        (doubled + 1) as usize
    } else {
        (-doubled) as usize
    }
}

/// The set of live nodes on one level.
///
/// A vector keeps the order nodes arrived in, a hash set makes membership
/// checks cheap during removal traversals.
#[derive(Default)]
pub struct LevelSet {
    order: Vec<NodeId>,
    members: HashSet<NodeId, FxBuildHasher>,
}

impl LevelSet {
    pub(crate) fn new() -> LevelSet {
        LevelSet::default()
    }

    pub(crate) fn insert(&mut self, node: NodeId) {
        debug_assert!(!self.members.contains(&node));
        self.members.insert(node);
        self.order.push(node);
    }

    /// Removes a node, keeping the arrival order of the rest. Returns false if
    /// the node was not on this level.
    pub(crate) fn remove(&mut self, node: NodeId) -> bool {
        if self.members.remove(&node) {
            self.order.retain(|&n| n != node);
            true
        } else {
            false
        }
    }

    pub(crate) fn contains(&self, node: NodeId) -> bool {
        self.members.contains(&node)
    }

    /// The earliest-inserted node still on this level.
    pub(crate) fn first(&self) -> Option<NodeId> {
        self.order.first().copied()
    }

    pub(crate) fn get(&self, index: usize) -> Option<NodeId> {
        self.order.get(index).copied()
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, NodeId> {
        self.order.iter()
    }

    /// Number of nodes on this level.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the level is uninhabited.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }
}
