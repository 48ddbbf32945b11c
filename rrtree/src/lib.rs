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

#![allow(dead_code)]
#![warn(missing_docs)]

//! # Rrtree
//! An incremental cover tree for the inner loop of an RRT-family motion
//! planner. It stores configuration vectors, answers nearest-one queries, and
//! supports in-place removal of arbitrary nodes while keeping the covering and
//! separation invariants intact. On top of the index sits [`SpatialTree::extend`],
//! the primitive that grows a planning tree toward a target configuration
//! through the host's constraint oracles.
//!
//! ## Parameter Guide
//! The structure is controlled by the `base` (2.0 by convention) and the
//! planner's step length. `min_distance`, the radius under which two
//! configurations are treated as the same node, is derived from the step
//! length, so pick a step length that matches the scale of your configuration
//! space. `max_distance` must upper-bound the distance from the root to any
//! configuration you will ever insert; inserts outside it are a hard error.
//!
//! Nodes are handed out as opaque [`NodeId`] values. A handle stays valid until
//! the next [`SpatialTree::remove_node`] or [`SpatialTree::reset`] that could
//! free it; flipping a node's nearest-neighbor eligibility through
//! [`SpatialTree::invalidate_nodes_with_parent`] never frees anything.

#[cfg(test)]
#[macro_use]
extern crate assert_approx_eq;

pub mod errors;
pub use errors::{RrtreeError, RrtreeResult};

mod covertree;
pub use covertree::*;

mod extend;
pub use extend::ExtendResult;

pub use cspace::Scalar;
