// Router session lifecycle
//
// Challenge-response login, liveness probing, logout, and the generic
// `call` dispatch that every typed endpoint goes through. The session id
// is held by the client; only `login` ever sees the plaintext password.

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::client::RouterClient;
use crate::crypt::{CryptAlgorithm, login_hash};
use crate::error::Error;
use crate::rpc::{
    Challenge, LoginGrant, METHOD_ALIVE, METHOD_CALL, METHOD_CHALLENGE, METHOD_LOGIN,
    METHOD_LOGOUT, Params,
};

impl RouterClient {
    /// Run the challenge/login handshake and install the granted session.
    ///
    /// An empty password fails before any request is sent. A challenge
    /// announcing an algorithm other than MD5-crypt fails before `login`
    /// is called. Any session held from before is replaced on success and
    /// left in place on failure.
    pub async fn login(&self, password: &SecretString) -> Result<(), Error> {
        let password = password.expose_secret();
        if password.is_empty() {
            return Err(Error::MissingPassword);
        }

        let _challenging = self.session.begin_challenge();

        let challenge = self
            .request(
                METHOD_CHALLENGE,
                Params::keyed([("username", json!(self.username()))]),
            )
            .await?;
        let challenge: Challenge =
            serde_json::from_value(challenge).map_err(|e| Error::Authentication {
                message: format!("malformed challenge: {e}"),
            })?;

        let algorithm = CryptAlgorithm::from_id(&challenge.alg)?;
        let password_hash = algorithm.hash(password.as_bytes(), &challenge.salt);
        let hash = login_hash(self.username(), &password_hash, &challenge.nonce);

        let grant = self
            .request(
                METHOD_LOGIN,
                Params::keyed([("username", json!(self.username())), ("hash", json!(hash))]),
            )
            .await?;
        let grant: LoginGrant = serde_json::from_value(grant).map_err(|e| Error::Authentication {
            message: format!("malformed login result: {e}"),
        })?;

        let sid = grant
            .sid
            .filter(|sid| !sid.is_empty())
            .ok_or_else(|| Error::Authentication {
                message: "login result carried no session id".into(),
            })?;

        self.session.replace(sid);
        info!(username = self.username(), "router session established");
        Ok(())
    }

    /// Probe whether the held session is still accepted.
    ///
    /// Never errors. Without a session this returns `false` without any
    /// network traffic. A rejection by the router drops the probed session;
    /// an unreachable router leaves it in place for the next probe.
    pub async fn is_alive(&self) -> bool {
        let Some(sid) = self.session.sid() else {
            return false;
        };

        match self.request(METHOD_ALIVE, Params::default()).await {
            Ok(_) => true,
            Err(e) if e.is_session_rejected() => {
                if self.session.invalidate(&sid) {
                    info!("router rejected session, dropping it");
                }
                false
            }
            Err(e) => {
                debug!(error = %e, "liveness probe failed");
                false
            }
        }
    }

    /// End the session. Best effort: the local session is cleared even if
    /// the router cannot be reached.
    pub async fn logout(&self) -> Result<(), Error> {
        if self.session.sid().is_none() {
            return Ok(());
        }

        if let Err(e) = self.request(METHOD_LOGOUT, Params::default()).await {
            warn!(error = %e, "logout request failed, clearing session anyway");
        }
        self.session.clear();
        debug!("router session cleared");
        Ok(())
    }

    /// Invoke `module.method` through the generic `call` dispatch.
    ///
    /// Sends positional params `[sid, module, method, params]`. The sid is
    /// prepended by [`request`](Self::request) from a single read of the
    /// session, so a concurrent re-login cannot produce a mixed call.
    pub async fn call_api(
        &self,
        module: &str,
        method: &str,
        params: Params,
    ) -> Result<Value, Error> {
        if self.session.sid().is_none() {
            return Err(Error::NotAuthenticated);
        }
        let args = vec![
            Value::String(module.to_owned()),
            Value::String(method.to_owned()),
            params.into_value(),
        ];
        self.request(METHOD_CALL, Params::positional(args)).await
    }
}
