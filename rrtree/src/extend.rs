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

//! # The Extend Primitive
//! Grows the tree from its nearest node toward a target configuration, one
//! step-length hop at a time, pushing every hop through the host's validity
//! and constraint oracles. A checker that follows a constraint manifold may
//! hand back a polyline instead of the straight segment it was asked about;
//! every checked configuration is then inserted so the tree records the path
//! that was actually verified.

use crate::covertree::{NodeId, SpatialTree};
use crate::errors::RrtreeResult;
use cspace::{
    ConfigurationSpace, ConstraintFilterReturn, IntervalType, Scalar, StepDirection, StepStatus,
    CHECK_ALL, FILL_CHECKED_CONFIGURATIONS,
};
use serde::{Deserialize, Serialize};
use std::mem;

/// Outcome of one [`SpatialTree::extend`] call.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtendResult {
    /// No progress: the tree is empty, or an oracle rejected the very first
    /// step.
    Failed,
    /// At least one node was added before an oracle stopped the walk.
    Success,
    /// The walk reached the target, or added its one allowed step. The
    /// bidirectional planner relies on the one-step convention.
    Connected,
}

impl<C: ConfigurationSpace> SpatialTree<C> {
    /// Grows the tree toward `target` from its nearest node.
    ///
    /// With `one_step` the walk stops after the first successful insertion and
    /// reports `Connected`; otherwise it keeps stepping until it reaches the
    /// target, an oracle rejects, or the iteration cap trips. The returned
    /// node is the last one added (or the nearest node when nothing was).
    ///
    /// Oracle rejections are not errors: they downgrade the result to
    /// `Success` or `Failed` depending on whether anything was added. The only
    /// error path is an insertion landing outside `max_distance`.
    pub fn extend(
        &mut self,
        target: &[Scalar],
        one_step: bool,
    ) -> RrtreeResult<(ExtendResult, Option<NodeId>)> {
        let mut cur = mem::take(&mut self.cur_config);
        let mut new = mem::take(&mut self.new_config);
        let mut delta = mem::take(&mut self.delta_config);
        let mut filter = mem::take(&mut self.constraint_return);
        let out = self.extend_inner(target, one_step, &mut cur, &mut new, &mut delta, &mut filter);
        self.cur_config = cur;
        self.new_config = new;
        self.delta_config = delta;
        self.constraint_return = filter;
        out
    }

    fn extend_inner(
        &mut self,
        target: &[Scalar],
        one_step: bool,
        cur: &mut Vec<Scalar>,
        new: &mut Vec<Scalar>,
        delta: &mut Vec<Scalar>,
        filter: &mut ConstraintFilterReturn,
    ) -> RrtreeResult<(ExtendResult, Option<NodeId>)> {
        let mut pnode = match self.find_nearest(target) {
            Some((node, _)) => node,
            None => return Ok((ExtendResult::Failed, None)),
        };
        let mut last = pnode;
        let mut added = false;

        let dof = self.dof();
        let step_length = self.parameters.step_length;
        let from_goal = self.parameters.from_goal;
        let direction = if from_goal {
            StepDirection::GoalToInitial
        } else {
            StepDirection::InitialToGoal
        };

        cur.clear();
        cur.extend_from_slice(self.pool.config(pnode));

        for _ in 0..self.parameters.extend_iteration_cap {
            let dist = self.config_distance(cur, target);
            let scale = if dist > step_length {
                step_length / dist
            } else if dist <= 0.01 * step_length {
                // close enough to call it connected
                return Ok((ExtendResult::Connected, Some(last)));
            } else {
                1.0
            };

            new.clear();
            new.extend_from_slice(cur);
            delta.clear();
            delta.extend_from_slice(target);
            self.space.diff_state(delta, cur);
            for d in delta.iter_mut() {
                *d *= scale;
            }

            if self.space.set_state(new) != 0 {
                return Ok((Self::partial_result(added), Some(last)));
            }
            if self.space.neighbor_step(new, delta, direction) == StepStatus::Failed {
                return Ok((Self::partial_result(added), Some(last)));
            }
            // an oracle that moves nowhere would loop forever
            if self.config_distance(cur, new) <= 0.01 * step_length {
                return Ok((Self::partial_result(added), Some(last)));
            }

            // the checker may substitute its own interpolation, so hand it the
            // filter return and watch for deviation
            filter.clear();
            let (check_from, check_to, interval) = if from_goal {
                (new.as_slice(), cur.as_slice(), IntervalType::OpenEnd)
            } else {
                (cur.as_slice(), new.as_slice(), IntervalType::OpenStart)
            };
            if self.space.check_path_all_constraints(
                check_from,
                check_to,
                interval,
                CHECK_ALL | FILL_CHECKED_CONFIGURATIONS,
                filter,
            ) != 0
            {
                return Ok((Self::partial_result(added), Some(last)));
            }

            if filter.has_deviated {
                // insert the polyline the checker actually verified, ordered
                // away from the tree, chaining the RRT parents along it
                let num_configs = filter.num_configurations(dof);
                for i in 0..num_configs {
                    let k = if from_goal { num_configs - 1 - i } else { i };
                    let chunk = &filter.configurations[k * dof..(k + 1) * dof];
                    new.clear();
                    new.extend_from_slice(chunk);
                    match self.insert_node(Some(pnode), chunk, 0)? {
                        Some(node) => {
                            added = true;
                            pnode = node;
                            last = node;
                        }
                        None => break,
                    }
                }
            } else {
                if let Some(node) = self.insert_node(Some(pnode), new, 0)? {
                    added = true;
                    pnode = node;
                    last = node;
                }
            }

            if added && one_step {
                return Ok((ExtendResult::Connected, Some(last)));
            }
            mem::swap(cur, new);
        }

        Ok((Self::partial_result(added), Some(last)))
    }

    fn partial_result(added: bool) -> ExtendResult {
        if added {
            ExtendResult::Success
        } else {
            ExtendResult::Failed
        }
    }
}
