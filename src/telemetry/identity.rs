use std::{
    fs,
    net::{IpAddr, Ipv4Addr, UdpSocket},
    path::Path,
};

use sysinfo::System;

use crate::format;

pub const MODEL_PATH: &str = "/proc/device-tree/model";
const UNKNOWN_MODEL: &str = "Unknown model";
const FALLBACK_HOST: &str = "localhost";
// Connecting a UDP socket sends nothing; it only makes the kernel pick a route.
const ROUTE_PROBE: (Ipv4Addr, u16) = (Ipv4Addr::new(8, 8, 8, 8), 80);

/// Static facts about the board drawn in the right-hand column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub model: String,
    pub user: Option<String>,
    pub host: String,
    pub ip: IpAddr,
}

impl DeviceIdentity {
    pub fn discover() -> Self {
        Self {
            model: read_model(Path::new(MODEL_PATH)),
            user: login_name(),
            host: System::host_name().unwrap_or_else(|| FALLBACK_HOST.to_string()),
            ip: local_ip(),
        }
    }
}

/// Normalized model line, or a placeholder on boards without a device tree.
pub fn read_model(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(raw) => format::model_line(&raw),
        Err(err) => {
            log::debug!("cannot read {}: {err}", path.display());
            UNKNOWN_MODEL.to_string()
        }
    }
}

fn login_name() -> Option<String> {
    ["USER", "LOGNAME"]
        .iter()
        .find_map(|key| std::env::var(key).ok())
        .filter(|name| !name.is_empty())
}

/// Address of the interface holding the default route; loopback when offline.
pub fn local_ip() -> IpAddr {
    let probe = || -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect(ROUTE_PROBE)?;
        Ok(socket.local_addr()?.ip())
    };
    probe().unwrap_or_else(|err| {
        log::debug!("local ip discovery failed: {err}");
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    })
}
