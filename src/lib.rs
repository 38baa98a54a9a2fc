//! # Repo Pulse
//!
//! Repository activity forecasting: scaling and windowing in [`math`],
//! aggregation, models and report composition in [`forecast`], and the HTTP
//! service publishing chart images in [`server`].
//!
//! ## Example
//!
//! ```
//! use repo_pulse_workspace::math::MinMaxScaler;
//!
//! let scaler = MinMaxScaler::fit(&[2.0, 4.0, 6.0]).unwrap();
//! assert_eq!(scaler.transform(4.0), 0.5);
//! assert_eq!(scaler.inverse(1.0), 6.0);
//! ```

pub use pulse_forecast as forecast;
pub use pulse_math as math;
pub use pulse_server as server;
