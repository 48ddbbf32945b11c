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

//! # The Node
//! A tree node is an opaque handle into the pool plus the bookkeeping the
//! cover tree keeps per slot. The configuration vector itself lives in the
//! pool's flat arena, not here, so the bookkeeping stays one fixed-size block.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Opaque handle to a node owned by a [`SpatialTree`](crate::SpatialTree).
///
/// Handles are plain pool indices. One stays valid until the next
/// `remove_node` or `reset` that could free its slot; holding a handle across
/// such a call and using it afterwards finds either nothing or an unrelated
/// node, exactly as a raw pointer into a pool would.
#[derive(Copy, Clone, PartialEq, Eq, std::hash::Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The underlying pool slot index.
    pub fn raw(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("NodeId").field(&self.0).finish()
    }
}

/// Per-node bookkeeping. The children are kept inline for the common fan-out;
/// they are always one level below the node itself.
#[derive(Debug, Clone)]
pub(crate) struct NodeBody {
    /// The node this one was grown from by `extend`. This is the planner's
    /// causal parent, never the cover-tree parent, and it is not owned: the
    /// planner contract is to not remove an ancestor while descendants remain.
    pub(crate) rrt_parent: Option<NodeId>,
    /// Cover-tree level this node lives on.
    pub(crate) level: i32,
    /// Cover-tree children, all at `level - 1`.
    pub(crate) children: SmallVec<[NodeId; 10]>,
    /// True iff one of `children` is a clone of this node one level below.
    pub(crate) has_self_child: bool,
    /// Opaque tag carried for the host.
    pub(crate) userdata: u32,
    /// False once the node has been logically invalidated; such a node keeps
    /// routing queries but is never returned as a nearest neighbor.
    pub(crate) use_nn: bool,
}

impl NodeBody {
    pub(crate) fn new(rrt_parent: Option<NodeId>, userdata: u32) -> NodeBody {
        NodeBody {
            rrt_parent,
            level: 0,
            children: SmallVec::new(),
            has_self_child: false,
            userdata,
            use_nn: true,
        }
    }
}
