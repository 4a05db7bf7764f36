//! `hash`: compute the crypt hash (and optionally the login hash) a
//! router challenge expects, without contacting the router.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use vaultlink_api::{CryptAlgorithm, login_hash};
use vaultlink_core::config::DEFAULT_USERNAME;

use crate::cli::{GlobalOpts, HashArgs};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct HashOutput {
    alg: &'static str,
    hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    login_hash: Option<String>,
}

pub fn handle(args: HashArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let alg = CryptAlgorithm::from_id(&args.alg)?;

    let password = read_password(args.password)?;

    let hash = alg.hash(password.expose_secret().as_bytes(), &args.salt);
    let username = global.username.as_deref().unwrap_or(DEFAULT_USERNAME);
    let login = args
        .nonce
        .as_deref()
        .map(|nonce| login_hash(username, &hash, nonce));

    let result = HashOutput {
        alg: alg.id(),
        hash,
        login_hash: login,
    };

    let out = output::render_single(
        &global.output,
        &result,
        |r| {
            let mut pairs = vec![("Algorithm", r.alg.to_owned()), ("Hash", r.hash.clone())];
            if let Some(ref l) = r.login_hash {
                pairs.push(("Login hash", l.clone()));
            }
            output::detail_lines(&pairs)
        },
        |r| r.login_hash.clone().unwrap_or_else(|| r.hash.clone()),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Take the password from the argument, or prompt for it.
fn read_password(arg: Option<String>) -> Result<SecretString, CliError> {
    let password = match arg {
        Some(pw) => SecretString::from(pw),
        None => SecretString::from(rpassword::prompt_password("Password: ")?),
    };
    if password.expose_secret().is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "must not be empty".into(),
        });
    }
    Ok(password)
}
