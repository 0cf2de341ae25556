//! # Request Construction
//!
//! Builds the relative route for a week code lookup. Nothing in here touches
//! the network, so invalid input is rejected before a connection is opened.

/// Validated request parameters and the route they render to.
pub mod params;
