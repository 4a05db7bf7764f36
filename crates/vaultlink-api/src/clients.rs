// `clients` module endpoints

use serde_json::{Value, json};

use crate::client::RouterClient;
use crate::error::Error;
use crate::rpc::Params;

const MODULE: &str = "clients";

impl RouterClient {
    /// Fetch the raw client roster.
    ///
    /// Returns `result.clients` as-is; entries are not validated here.
    /// A result without a `clients` array yields an empty list.
    pub async fn list_clients(&self) -> Result<Vec<Value>, Error> {
        let result = self.call_api(MODULE, "get_list", Params::default()).await?;
        match result {
            Value::Object(mut map) => match map.remove("clients") {
                Some(Value::Array(clients)) => Ok(clients),
                _ => Ok(Vec::new()),
            },
            _ => Ok(Vec::new()),
        }
    }

    /// Set the display alias the router stores for `mac`.
    pub async fn set_client_alias(&self, mac: &str, alias: &str) -> Result<(), Error> {
        let params = Params::keyed([("mac", json!(mac)), ("alias", json!(alias))]);
        self.call_api(MODULE, "set_info", params).await?;
        Ok(())
    }
}
