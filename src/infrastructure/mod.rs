//! Infrastructure Layer
//!
//! Cross-cutting concerns and infrastructure components.

pub mod clock;
pub mod shutdown;
pub mod weather_cache;

pub use clock::{Clock, ManualClock, SystemClock};
pub use shutdown::{shutdown_signal, ShutdownController};
pub use weather_cache::{CachePolicy, WeatherCache};
