//! Names and proxy for the iio-sensor-proxy service.

use zbus::proxy;

/// Well-known bus name of the sensor service.
pub const SENSOR_SERVICE: &str = "net.hadess.SensorProxy";
/// Object path the sensor service exports.
pub const SENSOR_PATH: &str = "/net/hadess/SensorProxy";
/// Interface carrying the accelerometer methods and properties.
pub const SENSOR_INTERFACE: &str = "net.hadess.SensorProxy";
/// Property holding the current orientation label.
pub const ORIENTATION_PROPERTY: &str = "AccelerometerOrientation";

#[proxy(
    interface = "net.hadess.SensorProxy",
    default_service = "net.hadess.SensorProxy",
    default_path = "/net/hadess/SensorProxy"
)]
pub trait SensorService {
    /// Starts accelerometer readings on behalf of this connection.
    fn claim_accelerometer(&self) -> zbus::Result<()>;

    /// Drops this connection's accelerometer claim.
    fn release_accelerometer(&self) -> zbus::Result<()>;

    #[zbus(property)]
    fn has_accelerometer(&self) -> zbus::Result<bool>;
}
