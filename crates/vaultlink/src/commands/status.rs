//! `status`: connection summary plus the router's own system status.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use vaultlink_core::{CoreError, MemoryCache, Router, RouterConfig, RouterStatus};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct StatusView {
    router: RouterStatus,
    system: Value,
}

pub async fn handle(config: RouterConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let view = Router::oneshot(config, Arc::new(MemoryCache::new()), |router| async move {
        let system = router.system_status().await?;
        Ok::<_, CoreError>(StatusView {
            router: router.status(),
            system,
        })
    })
    .await?;

    let out = output::render_single(&global.output, &view, detail, |v| {
        v.router.url.to_string()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn detail(view: &StatusView) -> String {
    let r = &view.router;
    let mut pairs = vec![
        ("Router", r.url.to_string()),
        ("User", r.username.clone()),
        ("State", format!("{:?}", r.state)),
        ("Devices", r.device_count.to_string()),
        ("Online", r.online_count.to_string()),
        (
            "Last update",
            r.last_update
                .map_or_else(|| "-".into(), |t| t.to_rfc3339()),
        ),
    ];

    if let Value::Object(fields) = &view.system {
        for (key, value) in fields {
            pairs.push((key.as_str(), scalar(value)));
        }
    }
    output::detail_lines(&pairs)
}

/// Inline rendering for a JSON value: strings unquoted, everything else
/// as compact JSON.
fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
