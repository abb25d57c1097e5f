pub mod connection;
pub mod correlator;
pub mod endpoint;
pub mod error;
pub mod framer;
pub mod proto;
pub mod sasl;
pub mod tls;

pub use connection::{Connection, ConnectionState};
pub use endpoint::Endpoint;
pub use error::LdapError;
pub use sasl::{ExternalSasl, PlainSasl, SaslMechanism};
pub use tls::TlsOptions;
