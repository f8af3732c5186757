//! Parker client: async host around parker-core.
//! Owns networking (spot repository), the location event channel and the sync driver.

pub mod config;
pub mod driver;
pub mod error;
pub mod location;
pub mod repository;

pub use config::ClientConfig;
pub use driver::SyncDriver;
pub use error::{AuthError, NetworkError, ReportError, TransportError};
pub use location::{event_channel, FixedLocationProvider, LocationProvider};
pub use repository::{HttpSpotRepository, HttpTransport, ReqwestTransport, SpotRepository};
