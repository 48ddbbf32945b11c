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

//! Types shared between the planner and the host's constraint checker.

use crate::Scalar;

/// Which way a tree is growing. Backward trees are rooted at the goal, and the
/// host may clip steps differently depending on travel direction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepDirection {
    /// Growing from the start configuration toward the goal.
    InitialToGoal,
    /// Growing from the goal configuration toward the start.
    GoalToInitial,
}

/// Outcome of a [`neighbor_step`](crate::ConfigurationSpace::neighbor_step) call.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    /// The configuration was moved, possibly clipped onto a constraint manifold.
    Reached,
    /// The host could not move the configuration at all.
    Failed,
}

/// Which endpoint of a checked segment is excluded from the check.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntervalType {
    /// Check `(from, to]`, the segment start is assumed already valid.
    OpenStart,
    /// Check `[from, to)`, the segment end is assumed already valid.
    OpenEnd,
}

/// Check every constraint the host knows about.
pub const CHECK_ALL: u32 = 0xffff;

/// Ask the checker to record every configuration it visited in
/// [`ConstraintFilterReturn::configurations`].
pub const FILL_CHECKED_CONFIGURATIONS: u32 = 1 << 16;

/// What a path check hands back to the planner.
///
/// When the host's checker follows a constraint manifold rather than the
/// straight segment it was given, `has_deviated` is set and `configurations`
/// holds the polyline it actually verified, flattened `dof` scalars at a time
/// in visit order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConstraintFilterReturn {
    /// Flattened checked configurations, in the order the checker visited them.
    pub configurations: Vec<Scalar>,
    /// True iff the checked path deviated from straight-line interpolation.
    pub has_deviated: bool,
}

impl ConstraintFilterReturn {
    /// An empty return, ready to be passed to a check.
    pub fn new() -> ConstraintFilterReturn {
        ConstraintFilterReturn::default()
    }

    /// Resets the return for reuse without dropping its allocation.
    pub fn clear(&mut self) {
        self.configurations.clear();
        self.has_deviated = false;
    }

    /// Number of configurations recorded by the last check.
    pub fn num_configurations(&self, dof: usize) -> usize {
        self.configurations.len() / dof
    }
}
