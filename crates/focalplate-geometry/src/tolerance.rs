// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Numeric tolerances shared by the placement code

/// Minimum |cos| between an extrusion axis and the bottom-plane normal
pub const AXIS_EPSILON: f64 = 1e-12;

/// Shortest front-to-back distance accepted as an axis, in metres
pub const MIN_AXIS_LENGTH: f64 = 1e-12;

/// Initial bound of the most-horizontal-edge scan
pub const MAX_REFERENCE_SLOPE: f64 = 999.0;

/// Edges within this many metres of the longest count as longest
pub const EDGE_LENGTH_TOLERANCE: f64 = 1e-9;

/// Shortest projected reference direction (unit input) still usable
pub const PROJECTION_EPSILON: f64 = 1e-6;

/// Rotations smaller than this (radians) are not emitted
pub const ANGLE_EPSILON: f64 = 1e-12;

/// Shortest vector accepted when building an orthonormal basis
pub const BASIS_EPSILON: f64 = 1e-9;

/// Largest slope an edge may have and still be constrained horizontal
pub const HORIZONTAL_SLOPE: f64 = 1e-9;

/// Largest distance between points a replayed relation treats as coincident
pub const COINCIDENCE_TOLERANCE: f64 = 1e-9;

/// Largest sine between lines a replayed relation treats as parallel
pub const PARALLEL_TOLERANCE: f64 = 1e-9;
