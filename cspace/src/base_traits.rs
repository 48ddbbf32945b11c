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

use crate::constraints::*;
use crate::distances::Metric;
use crate::errors::{CspaceError, CspaceResult};
use crate::Scalar;

/// The capability bundle a host hands to the spatial index.
///
/// The index never touches the robot model directly; the metric, the state
/// difference operator and the validity oracles all route through here. The
/// provided defaults cover the common Euclidean, unconstrained case so a simple
/// host only has to supply `dof` and `set_state`.
pub trait ConfigurationSpace: Send + Sync + 'static {
    /// The metric backing the default `distance`.
    type Metric: Metric;

    /// Number of joint values in a configuration.
    fn dof(&self) -> usize;

    /// Boundary check for a configuration arriving from outside the space:
    /// the length must match `dof` and every joint value must be finite.
    fn validate_config(&self, config: &[Scalar]) -> CspaceResult<()> {
        if config.len() != self.dof() {
            return Err(CspaceError::DimensionMismatch {
                expected: self.dof(),
                found: config.len(),
            });
        }
        for (index, value) in config.iter().enumerate() {
            if !value.is_finite() {
                return Err(CspaceError::NonFiniteValue { index });
            }
        }
        Ok(())
    }

    /// Distance between two configurations. Must be symmetric and obey the
    /// triangle inequality; the cover tree's covering and separation guarantees
    /// depend on both.
    fn distance(&self, a: &[Scalar], b: &[Scalar]) -> Scalar {
        Self::Metric::dist(a, b)
    }

    /// Componentwise `to - from`, written into `to`. Hosts with circular joints
    /// override this to wrap the difference into the joint's period.
    fn diff_state(&self, to: &mut [Scalar], from: &[Scalar]) {
        for (t, f) in to.iter_mut().zip(from) {
            *t -= f;
        }
    }

    /// Pushes a configuration into the host's robot model. Returns 0 on
    /// acceptance; any other value rejects it (out of bounds, infeasible). The
    /// host may adjust the configuration in place while accepting it.
    fn set_state(&self, config: &mut [Scalar]) -> i32;

    /// Attempts to move `config` by `delta`. The host may clip the motion onto a
    /// constraint manifold; `direction` tells it which way the tree is growing.
    fn neighbor_step(
        &self,
        config: &mut [Scalar],
        delta: &[Scalar],
        _direction: StepDirection,
    ) -> StepStatus {
        for (c, d) in config.iter_mut().zip(delta) {
            *c += d;
        }
        if self.set_state(config) == 0 {
            StepStatus::Reached
        } else {
            StepStatus::Failed
        }
    }

    /// Checks the segment `from -> to` against every constraint selected by
    /// `options`. Returns 0 if the whole segment is valid. When
    /// [`FILL_CHECKED_CONFIGURATIONS`] is set the checker records the
    /// configurations it visited in `filter_return`, and sets `has_deviated`
    /// if the path it verified was not the straight segment.
    fn check_path_all_constraints(
        &self,
        from: &[Scalar],
        to: &[Scalar],
        interval: IntervalType,
        options: u32,
        filter_return: &mut ConstraintFilterReturn,
    ) -> i32;
}
