use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ExecutorConfig;
use crate::jobs::registry::JobGroupRegistry;
use crate::models::JobExecutor;

impl JobExecutor {
    /// Self-description of the local process.
    ///
    /// The id is fresh for every call; build it once at startup and share the
    /// value with whatever needs the executor identity.
    pub fn build(config: &ExecutorConfig, registry: &JobGroupRegistry) -> Self {
        let ip = match config.ip.as_deref().map(str::trim) {
            Some(ip) if !ip.is_empty() => ip.to_string(),
            _ => local_ip().to_string(),
        };

        let executor = JobExecutor {
            id: Uuid::new_v4().to_string(),
            name: config.name.clone(),
            key: config.key.clone(),
            address: format!("{}:{}", ip, config.port),
            groups: registry.groups().to_vec(),
        };

        info!(
            executor_id = %executor.id,
            name = %executor.name,
            address = %executor.address,
            groups = executor.groups.len(),
            "Built executor identity"
        );
        executor
    }
}

/// Address of the interface holding the default route, or loopback when none
/// can be determined. No packet is sent.
pub fn local_ip() -> IpAddr {
    let detected = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .and_then(|socket| {
            socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80))?;
            socket.local_addr()
        })
        .map(|addr| addr.ip());

    match detected {
        Ok(ip) if !ip.is_unspecified() => ip,
        Ok(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
        Err(e) => {
            debug!(error = %e, "Local address detection failed, using loopback");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}
