//! SASL bind support.
//!
//! The connection drives the bind loop; mechanisms only turn server
//! challenges into credential blobs. A mechanism that needs no challenge
//! (PLAIN, EXTERNAL) simply ignores its input and completes in one step.

use crate::connection::{interpret_bind_response, Connection};
use crate::error::LdapError;
use crate::proto::{
    BindAuthentication, BindRequest, BindResponse, ProtocolOp, RESULT_SASL_BIND_IN_PROGRESS,
};
use tracing::debug;

/// A SASL mechanism: a name plus a challenge/response step function.
pub trait SaslMechanism: Send {
    /// Mechanism name as sent in the bind request, e.g. `"PLAIN"`.
    fn name(&self) -> &str;

    /// Produce the next credential blob. `challenge` is `None` for the
    /// initial response and `Some` for server challenges on later rounds.
    fn step(&mut self, challenge: Option<&[u8]>) -> Result<Vec<u8>, LdapError>;
}

/// RFC 4616 PLAIN: `authzid NUL authcid NUL password`, single step.
pub struct PlainSasl {
    authzid: String,
    authcid: String,
    password: String,
}

impl PlainSasl {
    pub fn new(authcid: &str, password: &str) -> Self {
        Self {
            authzid: String::new(),
            authcid: authcid.to_string(),
            password: password.to_string(),
        }
    }

    pub fn with_authzid(mut self, authzid: &str) -> Self {
        self.authzid = authzid.to_string();
        self
    }
}

impl SaslMechanism for PlainSasl {
    fn name(&self) -> &str {
        "PLAIN"
    }

    fn step(&mut self, _challenge: Option<&[u8]>) -> Result<Vec<u8>, LdapError> {
        let mut blob = Vec::with_capacity(
            self.authzid.len() + self.authcid.len() + self.password.len() + 2,
        );
        blob.extend_from_slice(self.authzid.as_bytes());
        blob.push(0);
        blob.extend_from_slice(self.authcid.as_bytes());
        blob.push(0);
        blob.extend_from_slice(self.password.as_bytes());
        Ok(blob)
    }
}

/// RFC 4422 EXTERNAL: identity comes from the lower layer (the TLS client
/// certificate); the credential blob is empty.
pub struct ExternalSasl;

impl SaslMechanism for ExternalSasl {
    fn name(&self) -> &str {
        "EXTERNAL"
    }

    fn step(&mut self, _challenge: Option<&[u8]>) -> Result<Vec<u8>, LdapError> {
        Ok(Vec::new())
    }
}

/// Run the SASL bind loop: send a bind request with the mechanism's current
/// credentials, and while the server answers saslBindInProgress (14), feed
/// its serverSaslCreds back into the mechanism and send the next round. Any
/// other result code ends the loop, success or failure.
pub(crate) async fn sasl_bind(
    connection: &Connection,
    mechanism: &mut dyn SaslMechanism,
) -> Result<BindResponse, LdapError> {
    let mut challenge: Option<Vec<u8>> = None;
    loop {
        let credentials = mechanism.step(challenge.as_deref())?;
        let response = connection
            .request(ProtocolOp::BindRequest(BindRequest {
                version: 3,
                name: String::new(),
                authentication: BindAuthentication::Sasl {
                    mechanism: mechanism.name().to_string(),
                    credentials,
                },
            }))
            .await?;

        match response {
            ProtocolOp::BindResponse(resp)
                if resp.result_code == RESULT_SASL_BIND_IN_PROGRESS =>
            {
                debug!("SASL bind in progress, continuing {} exchange", mechanism.name());
                challenge = Some(resp.server_sasl_creds.unwrap_or_default());
            }
            other => return interpret_bind_response(other),
        }
    }
}
