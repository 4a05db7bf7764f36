// `system` module endpoints

use serde_json::Value;

use crate::client::RouterClient;
use crate::error::Error;
use crate::rpc::Params;

impl RouterClient {
    /// Router status blob (`system get_status`). Shape varies by firmware,
    /// so it is returned untyped.
    pub async fn system_status(&self) -> Result<Value, Error> {
        self.call_api("system", "get_status", Params::default()).await
    }
}
