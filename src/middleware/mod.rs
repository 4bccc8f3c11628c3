//! Middleware layer.
//!
//! canopy has no general middleware chain. Two fixed stages run around every
//! HTTP handler, in this order:
//!
//! - [`cors`] answers preflight requests and stamps the origin header
//! - [`envelope`] reshapes JSON bodies and records the response time

pub mod cors;
pub mod envelope;
