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

//! The errors that can occur when a configuration space is handed bad data.

use std::error::Error;
use std::fmt;

/// Helper type for a call that could go wrong.
pub type CspaceResult<T> = Result<T, CspaceError>;

/// Error type for the configuration space layer.
#[derive(Debug)]
pub enum CspaceError {
    /// A configuration vector with the wrong number of joint values.
    DimensionMismatch {
        /// The dof the space was built with.
        expected: usize,
        /// The length of the offending vector.
        found: usize,
    },
    /// A joint value that is not finite.
    NonFiniteValue {
        /// Index of the offending joint.
        index: usize,
    },
}

impl fmt::Display for CspaceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            CspaceError::DimensionMismatch { expected, found } => write!(
                f,
                "configuration has {} joint values, the space expects {}",
                found, expected
            ),
            CspaceError::NonFiniteValue { index } => {
                write!(f, "joint value {} is not finite", index)
            }
        }
    }
}

impl Error for CspaceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_problem() {
        let err = CspaceError::DimensionMismatch {
            expected: 7,
            found: 6,
        };
        assert_eq!(
            format!("{}", err),
            "configuration has 6 joint values, the space expects 7"
        );
        let err = CspaceError::NonFiniteValue { index: 2 };
        assert!(format!("{}", err).contains("joint value 2"));
    }
}
