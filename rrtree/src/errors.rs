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

//! The errors that can occur while the spatial index is working.
//! A duplicate insertion is not an error; `insert_node` reports it as
//! `Ok(None)` and the planner treats it as benign.

use cspace::errors::CspaceError;
use cspace::Scalar;
use std::error::Error;
use std::fmt;
use std::io;

/// Helper type for a call that could go wrong.
pub type RrtreeResult<T> = Result<T, RrtreeError>;

/// Error type for the spatial index.
#[derive(Debug)]
pub enum RrtreeError {
    /// No level of the cover tree accepted the configuration, usually because
    /// it lies further than `max_distance` from the root. The planner typically
    /// enlarges `max_distance` and rebuilds, or aborts the run.
    OutOfRange {
        /// The configuration that could not be inserted.
        config: Vec<Scalar>,
        /// The `max_distance` the tree was initialized with.
        max_distance: Scalar,
    },
    /// The configuration space rejected a vector at the boundary (wrong
    /// length, non-finite joint value).
    CspaceError(CspaceError),
    /// An i/o error while dumping the tree.
    IoError(io::Error),
}

impl fmt::Display for RrtreeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RrtreeError::OutOfRange {
                ref config,
                max_distance,
            } => {
                write!(f, "could not insert config=[")?;
                for v in config {
                    write!(f, "{},", v)?;
                }
                write!(
                    f,
                    "] inside the cover tree, perhaps max_distance={} is not enough from the root",
                    max_distance
                )
            }
            RrtreeError::CspaceError(ref e) => write!(f, "{}", e),
            RrtreeError::IoError(ref e) => write!(f, "{}", e),
        }
    }
}

impl Error for RrtreeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            RrtreeError::CspaceError(ref e) => Some(e),
            RrtreeError::IoError(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<CspaceError> for RrtreeError {
    fn from(err: CspaceError) -> Self {
        RrtreeError::CspaceError(err)
    }
}

impl From<io::Error> for RrtreeError {
    fn from(err: io::Error) -> Self {
        RrtreeError::IoError(err)
    }
}
