//! Typed session operations, layered on top of a [`Connection`] and one of its
//! discovered [`Endpoint`]s.

use crate::config::{ConfigCategory, ConfigParameter, ConfigSnapshot};
use crate::connection::Connection;
use crate::constants::{
    DEFAULT_REPLY_TIMEOUT_MS, FIRMWARE_STEP_TIMEOUT_MS, HOST_TX_ID, RESET_MODE_COMPILED_DEFAULTS,
};
use crate::endpoint::EndpointId;
use crate::error::AmfiprotError;
use crate::firmware::{chunk_firmware, step_error, FirmwareProgress};
use crate::packet::{Packet, PacketKind};
use crate::payload::{CommonPayload, Payload, PAYLOAD_TYPE_SUCCESS};
use crate::uuid::DeviceUuid;
use bytes::Bytes;
use std::time::Duration;

/// Default deadline for a typed request/reply exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(DEFAULT_REPLY_TIMEOUT_MS);
/// Deadline used for each step of a firmware transfer.
pub const FIRMWARE_TIMEOUT: Duration = Duration::from_millis(FIRMWARE_STEP_TIMEOUT_MS);

/// A typed view of one endpoint reachable through a [`Connection`].
pub struct Device<'a> {
    connection: &'a mut Connection,
    tx_id: EndpointId,
}

impl<'a> Device<'a> {
    pub fn new(connection: &'a mut Connection, tx_id: EndpointId) -> Self {
        Self { connection, tx_id }
    }

    async fn request(&mut self, payload: CommonPayload, kind: PacketKind) -> Result<(), AmfiprotError> {
        let endpoint = self
            .connection
            .endpoint_mut(self.tx_id)
            .ok_or(AmfiprotError::UnknownEndpoint(self.tx_id))?;
        let packet_number = endpoint.next_packet_number();
        let packet = Packet::from_payload(Payload::Common(payload), self.tx_id, HOST_TX_ID, kind, packet_number);
        self.connection.send(packet).await
    }

    async fn await_common(&mut self, deadline: Duration, matches: impl Fn(&CommonPayload) -> bool) -> Result<CommonPayload, AmfiprotError> {
        let endpoint = self
            .connection
            .endpoint_mut(self.tx_id)
            .ok_or(AmfiprotError::UnknownEndpoint(self.tx_id))?;
        let packet = endpoint
            .await_packet(deadline, |p| matches!(p, Payload::Common(c) if matches(c)))
            .await?;
        match packet.payload {
            Payload::Common(c) => Ok(c),
            _ => unreachable!("await_packet only matched Payload::Common"),
        }
    }

    async fn await_top_level_tag(&mut self, deadline: Duration, tag: u8) -> Result<(), AmfiprotError> {
        let endpoint = self
            .connection
            .endpoint_mut(self.tx_id)
            .ok_or(AmfiprotError::UnknownEndpoint(self.tx_id))?;
        endpoint.await_packet(deadline, |p| p.type_tag() == tag).await?;
        Ok(())
    }

    // --- Identity & naming -------------------------------------------------

    pub fn uuid(&self) -> Option<DeviceUuid> {
        self.connection.endpoint(self.tx_id).map(|e| e.uuid)
    }

    pub async fn name(&mut self) -> Result<String, AmfiprotError> {
        self.request(CommonPayload::RequestDeviceName, PacketKind::RequestAck).await?;
        match self
            .await_common(DEFAULT_TIMEOUT, |p| matches!(p, CommonPayload::ReplyDeviceName { .. }))
            .await?
        {
            CommonPayload::ReplyDeviceName { name } => Ok(name),
            _ => unreachable!(),
        }
    }

    pub async fn firmware_version(&mut self) -> Result<(u32, u32, u32, u32), AmfiprotError> {
        self.request(CommonPayload::RequestFirmwareVersion, PacketKind::RequestAck).await?;
        match self
            .await_common(DEFAULT_TIMEOUT, |p| matches!(p, CommonPayload::ReplyFirmwareVersion { .. }))
            .await?
        {
            CommonPayload::ReplyFirmwareVersion { major, minor, patch, build } => Ok((major, minor, patch, build)),
            _ => unreachable!(),
        }
    }

    pub async fn firmware_version_per_id(&mut self, processor_id: u8) -> Result<(u32, u32, u32, u32), AmfiprotError> {
        self.request(CommonPayload::RequestFirmwareVersionPerId { processor_id }, PacketKind::RequestAck)
            .await?;
        match self
            .await_common(DEFAULT_TIMEOUT, |p| {
                matches!(p, CommonPayload::ReplyFirmwareVersionPerId { processor_id: pid, .. } if *pid == processor_id)
            })
            .await?
        {
            CommonPayload::ReplyFirmwareVersionPerId { major, minor, patch, build, .. } => Ok((major, minor, patch, build)),
            _ => unreachable!(),
        }
    }

    pub async fn set_tx_id(&mut self, new_tx_id: u8) -> Result<(), AmfiprotError> {
        let uuid = self.uuid().ok_or(AmfiprotError::UnknownEndpoint(self.tx_id))?;
        self.request(CommonPayload::SetTxId { tx_id: new_tx_id, uuid }, PacketKind::RequestAck).await
    }

    pub async fn save_as_default(&mut self) -> Result<(), AmfiprotError> {
        let uuid = self.uuid().ok_or(AmfiprotError::UnknownEndpoint(self.tx_id))?;
        self.request(CommonPayload::SaveAsDefault { uuid }, PacketKind::RequestAck).await
    }

    pub async fn load_default(&mut self) -> Result<(), AmfiprotError> {
        self.request(CommonPayload::LoadDefault, PacketKind::NoAck).await
    }

    /// Resets configuration to compiled-in defaults, carried over from the
    /// reference configurator's `reset_to_default`.
    pub async fn reset_to_default(&mut self) -> Result<(), AmfiprotError> {
        self.load_default().await
    }

    pub async fn reboot(&mut self) -> Result<(), AmfiprotError> {
        self.request(CommonPayload::Reboot, PacketKind::NoAck).await
    }

    pub async fn reset_parameter(&mut self, compiled_defaults: bool) -> Result<(), AmfiprotError> {
        let mode = if compiled_defaults { RESET_MODE_COMPILED_DEFAULTS } else { 0 };
        self.request(CommonPayload::ResetParameter { mode }, PacketKind::RequestAck).await
    }

    // --- Configuration walk -------------------------------------------------

    async fn category_count(&mut self) -> Result<u16, AmfiprotError> {
        self.request(CommonPayload::RequestCategoryCount, PacketKind::RequestAck).await?;
        match self
            .await_common(DEFAULT_TIMEOUT, |p| matches!(p, CommonPayload::ReplyCategoryCount { .. }))
            .await?
        {
            CommonPayload::ReplyCategoryCount { count } => Ok(count),
            _ => unreachable!(),
        }
    }

    async fn category_name(&mut self, category: u8) -> Result<String, AmfiprotError> {
        self.request(CommonPayload::RequestConfigurationCategory { category }, PacketKind::RequestAck)
            .await?;
        match self
            .await_common(DEFAULT_TIMEOUT, |p| matches!(p, CommonPayload::ReplyConfigurationCategory { category: c, .. } if *c == category))
            .await?
        {
            CommonPayload::ReplyConfigurationCategory { name, .. } => Ok(name),
            _ => unreachable!(),
        }
    }

    async fn parameter_count(&mut self, category: u8) -> Result<u16, AmfiprotError> {
        self.request(CommonPayload::RequestConfigurationValueCount { category }, PacketKind::RequestAck)
            .await?;
        match self
            .await_common(DEFAULT_TIMEOUT, |p| matches!(p, CommonPayload::ReplyConfigurationValueCount { category: c, .. } if *c == category))
            .await?
        {
            CommonPayload::ReplyConfigurationValueCount { count, .. } => Ok(count),
            _ => unreachable!(),
        }
    }

    async fn parameter_name_uid(&mut self, category: u8, index: u16) -> Result<(String, u32), AmfiprotError> {
        self.request(
            CommonPayload::RequestConfigurationNameAndUid { category, index },
            PacketKind::RequestAck,
        )
        .await?;
        match self
            .await_common(DEFAULT_TIMEOUT, |p| {
                matches!(p, CommonPayload::ReplyConfigurationNameAndUid { index: i, category: c, .. } if *i == index && *c == category)
            })
            .await?
        {
            CommonPayload::ReplyConfigurationNameAndUid { name, uid, .. } => Ok((name, uid)),
            _ => unreachable!(),
        }
    }

    /// Reads one configuration value, mirroring the reference configurator's
    /// `read(uid, return_datatype=True)`.
    pub async fn read_config_value(&mut self, uid: u32) -> Result<crate::payload::ConfigValue, AmfiprotError> {
        self.request(CommonPayload::RequestConfigurationValueUid { uid }, PacketKind::RequestAck)
            .await?;
        match self
            .await_common(DEFAULT_TIMEOUT, |p| matches!(p, CommonPayload::ReplyConfigurationValueUid { uid: u, .. } if *u == uid))
            .await?
        {
            CommonPayload::ReplyConfigurationValueUid { value, .. } => Ok(value),
            _ => unreachable!(),
        }
    }

    /// Writes one configuration value, then reads it back and requires
    /// equality, raising [`AmfiprotError::ConfigWriteMismatch`] otherwise.
    pub async fn write_config_value(&mut self, uid: u32, value: crate::payload::ConfigValue) -> Result<(), AmfiprotError> {
        self.request(CommonPayload::SetConfigurationValueUid { uid, value }, PacketKind::RequestAck)
            .await?;
        match self
            .await_common(DEFAULT_TIMEOUT, |p| matches!(p, CommonPayload::ReplyConfigurationValueUid { uid: u, .. } if *u == uid))
            .await?
        {
            CommonPayload::ReplyConfigurationValueUid { value: written_back, .. } => {
                if written_back == value {
                    Ok(())
                } else {
                    Err(AmfiprotError::ConfigWriteMismatch {
                        uid,
                        written: value.encode(),
                        read_back: written_back.encode(),
                    })
                }
            }
            _ => unreachable!(),
        }
    }

    /// Queries every category, every parameter within it, and every value,
    /// producing the nested snapshot described in the session helpers design.
    pub async fn read_all_config(&mut self) -> Result<ConfigSnapshot, AmfiprotError> {
        let mut snapshot = Vec::new();
        let category_count = self.category_count().await?;
        for category in 0..category_count as u8 {
            let name = self.category_name(category).await?;
            let parameter_count = self.parameter_count(category).await?;
            let mut parameters = Vec::new();
            for index in 0..parameter_count {
                let (param_name, uid) = self.parameter_name_uid(category, index).await?;
                let value = self.read_config_value(uid).await?;
                parameters.push(ConfigParameter { uid, name: param_name, value });
            }
            snapshot.push(ConfigCategory { name, parameters });
        }
        Ok(snapshot)
    }

    /// Writes every parameter in `snapshot`, requiring a matching readback for
    /// each one.
    pub async fn write_all_config(&mut self, snapshot: &ConfigSnapshot) -> Result<(), AmfiprotError> {
        for category in snapshot {
            for parameter in &category.parameters {
                self.write_config_value(parameter.uid, parameter.value).await?;
            }
        }
        Ok(())
    }

    // --- Remote procedure calls ---------------------------------------------

    pub async fn get_procedure_spec(&mut self, index: u16, uid: u32) -> Result<CommonPayload, AmfiprotError> {
        self.request(CommonPayload::RequestProcedureSpec { index, uid }, PacketKind::RequestAck)
            .await?;
        self.await_common(DEFAULT_TIMEOUT, |p| matches!(p, CommonPayload::ReplyProcedureSpec { uid: u, .. } if *u == uid))
            .await
    }

    pub async fn call_procedure(
        &mut self,
        uid: u32,
        params: [crate::payload::ConfigValue; 5],
    ) -> Result<crate::payload::ConfigValue, AmfiprotError> {
        self.request(CommonPayload::RequestProcedureCall { uid, params }, PacketKind::RequestAck)
            .await?;
        match self
            .await_common(DEFAULT_TIMEOUT, |p| matches!(p, CommonPayload::ReplyProcedureCall { uid: u, .. } if *u == uid))
            .await?
        {
            CommonPayload::ReplyProcedureCall { ret, .. } => Ok(ret),
            _ => unreachable!(),
        }
    }

    // --- Firmware transfer ---------------------------------------------------

    /// Drives the firmware download state machine end to end: `FIRMWARE_START`,
    /// one `FIRMWARE_DATA` per chunk (each awaiting `SUCCESS`), `FIRMWARE_END`.
    pub async fn download_firmware(
        &mut self,
        processor_id: u8,
        firmware: &[u8],
        max_payload_size: usize,
        mut progress: impl FirmwareProgress,
    ) -> Result<(), AmfiprotError> {
        self.request(CommonPayload::FirmwareStart { processor_id }, PacketKind::RequestAck)
            .await
            .map_err(|e| step_error("starting", e.to_string()))?;
        self.await_top_level_tag(FIRMWARE_TIMEOUT, PAYLOAD_TYPE_SUCCESS)
            .await
            .map_err(|e| step_error("starting", e.to_string()))?;

        let chunks = chunk_firmware(firmware, max_payload_size);
        let total = firmware.len();
        let mut sent = 0usize;
        for chunk in chunks {
            self.request(
                CommonPayload::FirmwareData { processor_id, chunk: Bytes::copy_from_slice(chunk) },
                PacketKind::RequestAck,
            )
            .await
            .map_err(|e| step_error("streaming", e.to_string()))?;
            self.await_top_level_tag(FIRMWARE_TIMEOUT, PAYLOAD_TYPE_SUCCESS)
                .await
                .map_err(|e| step_error("streaming", e.to_string()))?;
            sent += chunk.len();
            progress.on_progress(sent, total);
        }

        self.request(CommonPayload::FirmwareEnd { processor_id }, PacketKind::NoAck)
            .await
            .map_err(|e| step_error("ending", e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeouts_match_session_helper_deadlines() {
        assert_eq!(DEFAULT_TIMEOUT, Duration::from_millis(1000));
        assert_eq!(FIRMWARE_TIMEOUT, Duration::from_millis(10_000));
    }
}
