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

//! # The Node Pool
//! Fixed-stride slab for tree nodes. Slot `i` keeps its bookkeeping in
//! `slots[i]` and its configuration vector inline in the flat arena at
//! `configs[i*dof .. (i+1)*dof]`, so allocating a node is one push (or a
//! free-list pop) with no per-node heap block. Tens of thousands of
//! uniformly-sized nodes get allocated and occasionally freed over a planning
//! run; recycling slots keeps that from fragmenting anything.
//!
//! The pool owns node memory exclusively. Nothing in a node owns another
//! node, so `reset` can drop everything in bulk as long as the tree clears
//! its scratch handle caches first.

use super::node::{NodeBody, NodeId};
use cspace::Scalar;

enum Slot {
    Occupied(NodeBody),
    Vacant,
}

pub(crate) struct NodePool {
    dof: usize,
    slots: Vec<Slot>,
    configs: Vec<Scalar>,
    free: Vec<usize>,
    live: usize,
}

impl NodePool {
    pub(crate) fn new(dof: usize) -> NodePool {
        NodePool {
            dof,
            slots: Vec::new(),
            configs: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    pub(crate) fn dof(&self) -> usize {
        self.dof
    }

    /// Number of live nodes.
    pub(crate) fn len(&self) -> usize {
        self.live
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        matches!(self.slots.get(id.0), Some(Slot::Occupied(_)))
    }

    /// Allocates a node for `config`, recycling a freed slot when one exists.
    pub(crate) fn alloc(
        &mut self,
        config: &[Scalar],
        rrt_parent: Option<NodeId>,
        userdata: u32,
    ) -> NodeId {
        debug_assert_eq!(config.len(), self.dof);
        let body = NodeBody::new(rrt_parent, userdata);
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index] = Slot::Occupied(body);
                self.configs[index * self.dof..(index + 1) * self.dof].copy_from_slice(config);
                index
            }
            None => {
                let index = self.slots.len();
                self.slots.push(Slot::Occupied(body));
                self.configs.extend_from_slice(config);
                index
            }
        };
        self.live += 1;
        NodeId(index)
    }

    /// Allocates a structural clone: same configuration, same RRT parent, same
    /// userdata. Level, children and flags start fresh; the caller wires them.
    pub(crate) fn clone_node(&mut self, id: NodeId) -> NodeId {
        let (rrt_parent, userdata) = {
            let body = self.node(id);
            (body.rrt_parent, body.userdata)
        };
        let body = NodeBody::new(rrt_parent, userdata);
        let src = id.0 * self.dof;
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index] = Slot::Occupied(body);
                let dst = index * self.dof;
                self.configs.copy_within(src..src + self.dof, dst);
                index
            }
            None => {
                let index = self.slots.len();
                self.slots.push(Slot::Occupied(body));
                self.configs.extend_from_within(src..src + self.dof);
                index
            }
        };
        self.live += 1;
        NodeId(index)
    }

    /// Returns the slot to the free list. The configuration bytes stay in the
    /// arena until the slot is recycled.
    pub(crate) fn free(&mut self, id: NodeId) {
        debug_assert!(self.contains(id));
        self.slots[id.0] = Slot::Vacant;
        self.free.push(id.0);
        self.live -= 1;
    }

    /// Drops every node at once.
    pub(crate) fn reset(&mut self) {
        self.slots.clear();
        self.configs.clear();
        self.free.clear();
        self.live = 0;
    }

    pub(crate) fn config(&self, id: NodeId) -> &[Scalar] {
        debug_assert!(self.contains(id));
        &self.configs[id.0 * self.dof..(id.0 + 1) * self.dof]
    }

    pub(crate) fn node(&self, id: NodeId) -> &NodeBody {
        match &self.slots[id.0] {
            Slot::Occupied(body) => body,
            Slot::Vacant => panic!("use of freed node handle {}", id),
        }
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut NodeBody {
        match &mut self.slots[id.0] {
            Slot::Occupied(body) => body,
            Slot::Vacant => panic!("use of freed node handle {}", id),
        }
    }
}
