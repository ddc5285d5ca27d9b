//! Adapters Layer
//!
//! Inbound adapters drive the application; outbound adapters implement the
//! domain ports against real systems.

pub mod inbound;
pub mod outbound;
