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

//! # Configuration Space
//! Abstracts the host robot model behind a small capability bundle: a distance
//! metric over joint values, a difference operator that respects joint topology,
//! and the validity oracles a sampling-based planner steps through.
//!
//! The planner-facing trait is [`ConfigurationSpace`]. A host implements it once
//! for its robot model and hands an `Arc` of it to the spatial index; everything
//! the index ever asks of the robot goes through this trait.

#![allow(dead_code)]
#![warn(missing_docs)]

#[macro_use]
extern crate serde;

#[cfg(test)]
#[macro_use]
extern crate assert_approx_eq;

mod base_traits;
#[doc(inline)]
pub use base_traits::ConfigurationSpace;

mod distances;
pub use distances::*;
pub mod errors;

mod constraints;
pub use constraints::*;

/// A single joint value. The hosts we care about plan in double precision.
pub type Scalar = f64;
