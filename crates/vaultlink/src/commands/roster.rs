//! `roster`: one-shot fetch of the connected-device roster.

use std::sync::Arc;

use tabled::Tabled;

use vaultlink_core::{
    CoreError, DeviceRecord, MemoryCache, Router, RouterConfig, SnapshotSource, format_bytes,
};

use crate::cli::{GlobalOpts, RosterArgs};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Status")]
    status: &'static str,
    #[tabled(rename = "Link")]
    link: String,
    #[tabled(rename = "Traffic")]
    traffic: String,
}

fn device_row(d: &DeviceRecord) -> DeviceRow {
    DeviceRow {
        name: d.display_name().to_owned(),
        ip: d.ip.clone(),
        mac: d.mac.to_string(),
        status: if d.blocked {
            "blocked"
        } else if d.online {
            "online"
        } else {
            "offline"
        },
        link: d.link_label().to_owned(),
        traffic: format_bytes(d.total_bytes()),
    }
}

pub async fn handle(
    args: RosterArgs,
    config: RouterConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let snapshot = Router::oneshot(config, Arc::new(MemoryCache::new()), |router| async move {
        Ok::<_, CoreError>(router.current_roster())
    })
    .await?;

    if snapshot.source == SnapshotSource::Stale {
        return Err(CliError::RosterUnavailable);
    }

    let devices: Vec<DeviceRecord> = snapshot
        .devices
        .iter()
        .filter(|d| !args.online || d.online)
        .cloned()
        .collect();

    let out = output::render_list(&global.output, &devices, device_row, |d| {
        d.mac.to_string()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
