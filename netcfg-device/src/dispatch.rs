//! Command Dispatcher
//!
//! Every write lands here with its raw payload. Payloads are validated before
//! the backend is touched, and every outcome, good or bad, is reported through
//! the Status Tracker. Nothing is returned to the writer.
//!
//! | write        | status sequence                                            |
//! |--------------|------------------------------------------------------------|
//! | scan `start` | wifi_scan/start, wifi_scan/done                            |
//! | Wi-Fi config | apply/wifi_connect, apply/wifi_connect_done                |
//! | LAN config   | apply/lan_config, apply/lan_config_done                    |
//! | `apply`      | apply/done                                                 |
//! | `reboot`     | reboot/now                                                 |
//!
//! A payload that fails validation publishes a single failed record at the
//! first stage.

use netcfg_proto::status::{ops, stages};
use netcfg_proto::{Action, LanConfig, OperationStatus, ScanControl, WifiConfig};
use tracing::{debug, info, warn};

use crate::backend::{NetworkBackend, primary_ethernet};
use crate::device::Device;

impl<B: NetworkBackend> Device<B> {
    pub async fn scan_control(&mut self, payload: &[u8]) {
        let Some(ScanControl::Start) = ScanControl::parse(payload) else {
            debug!("ignoring scan control payload {:?}", String::from_utf8_lossy(payload));
            return;
        };

        self.publish(OperationStatus::succeeded(ops::WIFI_SCAN, stages::START)).await;
        tokio::task::yield_now().await;

        let outcome = self.scans.trigger(&self.backend, &self.codec).await.map(drop);
        self.publish(OperationStatus::from_outcome(ops::WIFI_SCAN, stages::DONE, &outcome))
            .await;
    }

    pub async fn write_wifi_config(&mut self, payload: &[u8]) {
        let config = match WifiConfig::from_json(payload) {
            Ok(config) => config,
            Err(e) => {
                self.publish(OperationStatus::failed(ops::APPLY, stages::WIFI_CONNECT, e.to_string()))
                    .await;
                return;
            }
        };

        self.publish(OperationStatus::succeeded(ops::APPLY, stages::WIFI_CONNECT)).await;
        tokio::task::yield_now().await;

        let outcome = self.backend.apply_wifi(&config).await;
        self.publish(OperationStatus::from_outcome(ops::APPLY, stages::WIFI_CONNECT_DONE, &outcome))
            .await;
    }

    pub async fn write_lan_config(&mut self, payload: &[u8]) {
        let mut config = match LanConfig::from_json(payload) {
            Ok(config) => config,
            Err(e) => {
                self.publish(OperationStatus::failed(ops::APPLY, stages::LAN_CONFIG, e.to_string()))
                    .await;
                return;
            }
        };

        self.publish(OperationStatus::succeeded(ops::APPLY, stages::LAN_CONFIG)).await;
        tokio::task::yield_now().await;

        if config.device.is_none() {
            config.device = match self.backend.list_interfaces().await {
                Ok(ifaces) => primary_ethernet(&ifaces).map(|i| i.device.clone()),
                Err(e) => {
                    warn!("cannot list interfaces: {e}");
                    None
                }
            };
        }
        info!(device = ?config.device, method = config.method.name(), "lan config");

        let outcome = self.backend.apply_lan(&config).await;
        self.publish(OperationStatus::from_outcome(ops::APPLY, stages::LAN_CONFIG_DONE, &outcome))
            .await;
    }

    pub async fn action(&mut self, payload: &[u8]) {
        match Action::parse(payload) {
            Some(Action::Apply) => {
                self.publish(OperationStatus::succeeded(ops::APPLY, stages::DONE)).await;
            }
            Some(Action::Reboot) => {
                self.publish(OperationStatus::succeeded(ops::REBOOT, stages::NOW)).await;
                tokio::task::yield_now().await;
                if let Err(e) = self.backend.reboot().await {
                    self.publish(OperationStatus::failed(ops::REBOOT, stages::NOW, e.to_string()))
                        .await;
                }
            }
            None => warn!("rejected action {:?}", String::from_utf8_lossy(payload)),
        }
    }
}
