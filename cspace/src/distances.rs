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

//! Supported distances over configuration vectors.
//!
//! The spatial index only requires symmetry and the triangle inequality from its
//! metric, so a host with weighted joints can supply its own
//! [`ConfigurationSpace::distance`](crate::ConfigurationSpace::distance)
//! override instead of one of these.

use crate::Scalar;
use std::fmt::Debug;

/// The trait that enables a metric. Both slices must be the same length.
pub trait Metric: 'static + Send + Sync + Debug {
    /// Distance between two dense configuration vectors.
    fn dist(x: &[Scalar], y: &[Scalar]) -> Scalar;
    /// The norm, `dist(x, 0)`.
    fn norm(x: &[Scalar]) -> Scalar;
}

/// L2 norm, the square root of the sum of squares.
#[derive(Debug, Clone)]
pub struct L2 {}

impl Metric for L2 {
    fn dist(x: &[Scalar], y: &[Scalar]) -> Scalar {
        x.iter()
            .zip(y)
            .map(|(xi, yi)| (xi - yi) * (xi - yi))
            .sum::<Scalar>()
            .sqrt()
    }

    fn norm(x: &[Scalar]) -> Scalar {
        x.iter().map(|xi| xi * xi).sum::<Scalar>().sqrt()
    }
}

/// L1 norm, the sum of the absolute values of the componentwise differences.
#[derive(Debug, Clone)]
pub struct L1 {}

impl Metric for L1 {
    fn dist(x: &[Scalar], y: &[Scalar]) -> Scalar {
        x.iter().zip(y).map(|(xi, yi)| (xi - yi).abs()).sum()
    }

    fn norm(x: &[Scalar]) -> Scalar {
        x.iter().map(|xi| xi.abs()).sum()
    }
}

/// L-infinity norm, the maximum componentwise difference.
#[derive(Debug, Clone)]
pub struct Linfty {}

impl Metric for Linfty {
    fn dist(x: &[Scalar], y: &[Scalar]) -> Scalar {
        x.iter()
            .zip(y)
            .map(|(xi, yi)| (xi - yi).abs())
            .fold(0.0, Scalar::max)
    }

    fn norm(x: &[Scalar]) -> Scalar {
        x.iter().map(|xi| xi.abs()).fold(0.0, Scalar::max)
    }
}
