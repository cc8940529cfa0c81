//! # orientd
//!
//! A Linux daemon that rotates a sway output to follow the accelerometer
//! orientation reported by iio-sensor-proxy over the system bus.
//!
//! ## Architecture
//!
//! - [`BusSession`](session::BusSession) - system bus connection holding the
//!   accelerometer claim and the signal subscriptions
//! - [`decoder`] - total decoding of bus payloads into
//!   [`Orientation`](orientation::Orientation) values
//! - [`Dispatcher`](dispatch::Dispatcher) - bounded-wait loop routing
//!   notifications to the actuator until a stop signal arrives
//! - [`Actuator`](actuator::Actuator) - sway IPC socket or `swaymsg` back-end
//!
//! ## Example
//!
//! ```no_run
//! use orientd::{application::Application, config::Config, shutdown::StopFlag};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     Application::builder()
//!         .with_config(Config::default())
//!         .with_stop_flag(StopFlag::install()?)
//!         .build()?
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod actuator;
pub mod application;
pub mod cli;
pub mod config;
pub mod decoder;
pub mod dispatch;
pub mod notification;
pub mod orientation;
pub mod sensor_proxy;
pub mod session;
pub mod shutdown;
