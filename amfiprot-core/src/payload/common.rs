//! The `COMMON` payload family (`payload_type == 0x00`), dispatched on a second
//! "common payload ID" byte.

use crate::error::AmfiprotError;
use crate::uuid::DeviceUuid;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use num_enum::{IntoPrimitive, TryFromPrimitive};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum CommonPayloadId {
    RequestDeviceId = 0x00,
    ReplyDeviceId = 0x01,
    SetTxId = 0x02,
    RequestFirmwareVersion = 0x03,
    ReplyFirmwareVersion = 0x04,
    FirmwareStart = 0x05,
    FirmwareData = 0x06,
    FirmwareEnd = 0x07,
    RequestDeviceName = 0x08,
    ReplyDeviceName = 0x09,
    LoadDefault = 0x0F,
    SaveAsDefault = 0x10,
    RequestConfigurationNameAndUid = 0x11,
    ReplyConfigurationNameAndUid = 0x12,
    RequestConfigurationValueUid = 0x13,
    ReplyConfigurationValueUid = 0x14,
    SetConfigurationValueUid = 0x15,
    RequestConfigurationCategory = 0x16,
    ReplyConfigurationCategory = 0x17,
    RequestConfigurationValueCount = 0x18,
    ReplyConfigurationValueCount = 0x19,
    RequestCategoryCount = 0x1A,
    ReplyCategoryCount = 0x1B,
    RequestFirmwareVersionPerId = 0x1C,
    ReplyFirmwareVersionPerId = 0x1D,
    DebugOutput = 0x20,
    Reboot = 0x21,
    ResetParameter = 0x24,
    RequestProcedureSpec = 0x30,
    ReplyProcedureSpec = 0x31,
    RequestProcedureCall = 0x32,
    ReplyProcedureCall = 0x33,
}

/// The `ConfigValueType` tag used by configuration values and RPC parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum ConfigValueType {
    Bool = 0,
    Char = 1,
    Int8 = 2,
    UInt8 = 3,
    Int16 = 4,
    UInt16 = 6,
    Int32 = 8,
    UInt32 = 10,
    Int64 = 12,
    UInt64 = 14,
    Float = 16,
    Double = 18,
    ProcedureCall = 100,
}

/// A typed configuration or RPC value, tagged by [`ConfigValueType`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConfigValue {
    Bool(bool),
    Char(u8),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    ProcedureCall(bool),
}

impl ConfigValue {
    pub fn value_type(&self) -> ConfigValueType {
        match self {
            ConfigValue::Bool(_) => ConfigValueType::Bool,
            ConfigValue::Char(_) => ConfigValueType::Char,
            ConfigValue::Int8(_) => ConfigValueType::Int8,
            ConfigValue::UInt8(_) => ConfigValueType::UInt8,
            ConfigValue::Int16(_) => ConfigValueType::Int16,
            ConfigValue::UInt16(_) => ConfigValueType::UInt16,
            ConfigValue::Int32(_) => ConfigValueType::Int32,
            ConfigValue::UInt32(_) => ConfigValueType::UInt32,
            ConfigValue::Int64(_) => ConfigValueType::Int64,
            ConfigValue::UInt64(_) => ConfigValueType::UInt64,
            ConfigValue::Float(_) => ConfigValueType::Float,
            ConfigValue::Double(_) => ConfigValueType::Double,
            ConfigValue::ProcedureCall(_) => ConfigValueType::ProcedureCall,
        }
    }

    /// Width in bytes of this value's natural (non-RPC-padded) wire encoding.
    pub fn width(ty: ConfigValueType) -> usize {
        match ty {
            ConfigValueType::Bool | ConfigValueType::Char => 1,
            ConfigValueType::Int8 | ConfigValueType::UInt8 => 1,
            ConfigValueType::Int16 | ConfigValueType::UInt16 => 2,
            ConfigValueType::Int32 | ConfigValueType::UInt32 => 4,
            ConfigValueType::Int64 | ConfigValueType::UInt64 => 8,
            ConfigValueType::Float => 4,
            ConfigValueType::Double => 8,
            ConfigValueType::ProcedureCall => 1,
        }
    }

    /// Encodes at natural width, used for `REPLY_CONFIGURATION_VALUE_UID` /
    /// `SET_CONFIGURATION_VALUE_UID`.
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            ConfigValue::Bool(v) => vec![v as u8],
            ConfigValue::Char(v) => vec![v],
            ConfigValue::Int8(v) => vec![v as u8],
            ConfigValue::UInt8(v) => vec![v],
            ConfigValue::Int16(v) => v.to_le_bytes().to_vec(),
            ConfigValue::UInt16(v) => v.to_le_bytes().to_vec(),
            ConfigValue::Int32(v) => v.to_le_bytes().to_vec(),
            ConfigValue::UInt32(v) => v.to_le_bytes().to_vec(),
            ConfigValue::Int64(v) => v.to_le_bytes().to_vec(),
            ConfigValue::UInt64(v) => v.to_le_bytes().to_vec(),
            ConfigValue::Float(v) => v.to_le_bytes().to_vec(),
            ConfigValue::Double(v) => v.to_le_bytes().to_vec(),
            ConfigValue::ProcedureCall(v) => vec![v as u8],
        }
    }

    /// Decodes at natural width, used for `REPLY_CONFIGURATION_VALUE_UID` /
    /// `SET_CONFIGURATION_VALUE_UID`.
    pub fn decode(ty: ConfigValueType, bytes: &[u8]) -> Result<Self, AmfiprotError> {
        let width = Self::width(ty);
        if bytes.len() < width {
            return Err(AmfiprotError::InsufficientData {
                expected: width,
                actual: bytes.len(),
            });
        }
        Ok(match ty {
            ConfigValueType::Bool => ConfigValue::Bool(bytes[0] != 0),
            ConfigValueType::Char => ConfigValue::Char(bytes[0]),
            ConfigValueType::Int8 => ConfigValue::Int8(bytes[0] as i8),
            ConfigValueType::UInt8 => ConfigValue::UInt8(bytes[0]),
            ConfigValueType::Int16 => ConfigValue::Int16(i16::from_le_bytes(bytes[0..2].try_into().unwrap())),
            ConfigValueType::UInt16 => ConfigValue::UInt16(u16::from_le_bytes(bytes[0..2].try_into().unwrap())),
            ConfigValueType::Int32 => ConfigValue::Int32(i32::from_le_bytes(bytes[0..4].try_into().unwrap())),
            ConfigValueType::UInt32 => ConfigValue::UInt32(u32::from_le_bytes(bytes[0..4].try_into().unwrap())),
            ConfigValueType::Int64 => ConfigValue::Int64(i64::from_le_bytes(bytes[0..8].try_into().unwrap())),
            ConfigValueType::UInt64 => ConfigValue::UInt64(u64::from_le_bytes(bytes[0..8].try_into().unwrap())),
            ConfigValueType::Float => ConfigValue::Float(f32::from_le_bytes(bytes[0..4].try_into().unwrap())),
            ConfigValueType::Double => ConfigValue::Double(f64::from_le_bytes(bytes[0..8].try_into().unwrap())),
            ConfigValueType::ProcedureCall => ConfigValue::ProcedureCall(bytes[0] != 0),
        })
    }

    /// Encodes as a fixed 8-byte RPC value slot (value left-padded/extended to 8
    /// bytes regardless of declared width, per the RPC parameter encoding).
    pub fn encode_rpc_value8(&self) -> [u8; 8] {
        let mut out = [0u8; 8];
        let encoded = self.encode();
        out[..encoded.len()].copy_from_slice(&encoded);
        out
    }

    /// Decodes an 8-byte RPC value slot given its type tag.
    pub fn decode_rpc(ty: ConfigValueType, value8: &[u8; 8]) -> Result<Self, AmfiprotError> {
        Self::decode(ty, &value8[..Self::width(ty)])
    }
}

fn decode_ascii_nul_terminated(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn encode_ascii_nul_terminated(s: &str) -> Vec<u8> {
    let mut v = s.as_bytes().to_vec();
    v.push(0);
    v
}

fn need(buf: &Bytes, n: usize) -> Result<(), AmfiprotError> {
    if buf.remaining() < n {
        Err(AmfiprotError::InsufficientData {
            expected: n,
            actual: buf.remaining(),
        })
    } else {
        Ok(())
    }
}

/// A single RPC parameter slot: a type tag plus its 8-byte-padded value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RpcParam {
    pub value: ConfigValue,
}

impl RpcParam {
    fn empty() -> Self {
        RpcParam {
            value: ConfigValue::UInt8(0),
        }
    }

    fn encode(&self) -> [u8; 9] {
        let mut out = [0u8; 9];
        out[0] = self.value.value_type().into();
        out[1..].copy_from_slice(&self.value.encode_rpc_value8());
        out
    }

    fn decode(body: &mut Bytes) -> Result<Self, AmfiprotError> {
        need(body, 9)?;
        let tag = body.get_u8();
        let mut value8 = [0u8; 8];
        body.copy_to_slice(&mut value8);
        if tag == 0 {
            return Ok(Self::empty());
        }
        let ty = ConfigValueType::try_from(tag).map_err(|_| AmfiprotError::ParseError(format!("unknown RPC value type tag {tag:#04x}")))?;
        Ok(RpcParam {
            value: ConfigValue::decode_rpc(ty, &value8)?,
        })
    }
}

/// Every decoded/encodable `COMMON` payload variant.
#[derive(Debug, Clone, PartialEq)]
pub enum CommonPayload {
    RequestDeviceId,
    ReplyDeviceId { tx_id: u8, uuid: DeviceUuid },
    SetTxId { tx_id: u8, uuid: DeviceUuid },
    RequestFirmwareVersion,
    ReplyFirmwareVersion { major: u32, minor: u32, patch: u32, build: u32 },
    FirmwareStart { processor_id: u8 },
    FirmwareData { processor_id: u8, chunk: Bytes },
    FirmwareEnd { processor_id: u8 },
    RequestDeviceName,
    ReplyDeviceName { name: String },
    LoadDefault,
    SaveAsDefault { uuid: DeviceUuid },
    RequestConfigurationNameAndUid { category: u8, index: u16 },
    ReplyConfigurationNameAndUid { index: u16, category: u8, uid: u32, name: String },
    RequestConfigurationValueUid { uid: u32 },
    ReplyConfigurationValueUid { uid: u32, value: ConfigValue },
    SetConfigurationValueUid { uid: u32, value: ConfigValue },
    RequestConfigurationCategory { category: u8 },
    ReplyConfigurationCategory { category: u8, name: String },
    RequestConfigurationValueCount { category: u8 },
    ReplyConfigurationValueCount { category: u8, count: u16 },
    RequestCategoryCount,
    ReplyCategoryCount { count: u16 },
    RequestFirmwareVersionPerId { processor_id: u8 },
    ReplyFirmwareVersionPerId { major: u32, minor: u32, patch: u32, build: u32, processor_id: u8 },
    DebugOutput { message: String },
    Reboot,
    ResetParameter { mode: u8 },
    RequestProcedureSpec { index: u16, uid: u32 },
    ReplyProcedureSpec {
        index: u16,
        uid: u32,
        ret_type: u8,
        param_types: [u8; 5],
        name: String,
    },
    RequestProcedureCall { uid: u32, params: [ConfigValue; 5] },
    ReplyProcedureCall { uid: u32, ret: ConfigValue },
}

impl CommonPayload {
    pub fn id(&self) -> CommonPayloadId {
        use CommonPayload::*;
        match self {
            RequestDeviceId => CommonPayloadId::RequestDeviceId,
            ReplyDeviceId { .. } => CommonPayloadId::ReplyDeviceId,
            SetTxId { .. } => CommonPayloadId::SetTxId,
            RequestFirmwareVersion => CommonPayloadId::RequestFirmwareVersion,
            ReplyFirmwareVersion { .. } => CommonPayloadId::ReplyFirmwareVersion,
            FirmwareStart { .. } => CommonPayloadId::FirmwareStart,
            FirmwareData { .. } => CommonPayloadId::FirmwareData,
            FirmwareEnd { .. } => CommonPayloadId::FirmwareEnd,
            RequestDeviceName => CommonPayloadId::RequestDeviceName,
            ReplyDeviceName { .. } => CommonPayloadId::ReplyDeviceName,
            LoadDefault => CommonPayloadId::LoadDefault,
            SaveAsDefault { .. } => CommonPayloadId::SaveAsDefault,
            RequestConfigurationNameAndUid { .. } => CommonPayloadId::RequestConfigurationNameAndUid,
            ReplyConfigurationNameAndUid { .. } => CommonPayloadId::ReplyConfigurationNameAndUid,
            RequestConfigurationValueUid { .. } => CommonPayloadId::RequestConfigurationValueUid,
            ReplyConfigurationValueUid { .. } => CommonPayloadId::ReplyConfigurationValueUid,
            SetConfigurationValueUid { .. } => CommonPayloadId::SetConfigurationValueUid,
            RequestConfigurationCategory { .. } => CommonPayloadId::RequestConfigurationCategory,
            ReplyConfigurationCategory { .. } => CommonPayloadId::ReplyConfigurationCategory,
            RequestConfigurationValueCount { .. } => CommonPayloadId::RequestConfigurationValueCount,
            ReplyConfigurationValueCount { .. } => CommonPayloadId::ReplyConfigurationValueCount,
            RequestCategoryCount => CommonPayloadId::RequestCategoryCount,
            ReplyCategoryCount { .. } => CommonPayloadId::ReplyCategoryCount,
            RequestFirmwareVersionPerId { .. } => CommonPayloadId::RequestFirmwareVersionPerId,
            ReplyFirmwareVersionPerId { .. } => CommonPayloadId::ReplyFirmwareVersionPerId,
            DebugOutput { .. } => CommonPayloadId::DebugOutput,
            Reboot => CommonPayloadId::Reboot,
            ResetParameter { .. } => CommonPayloadId::ResetParameter,
            RequestProcedureSpec { .. } => CommonPayloadId::RequestProcedureSpec,
            ReplyProcedureSpec { .. } => CommonPayloadId::ReplyProcedureSpec,
            RequestProcedureCall { .. } => CommonPayloadId::RequestProcedureCall,
            ReplyProcedureCall { .. } => CommonPayloadId::ReplyProcedureCall,
        }
    }

    pub fn encode(&self) -> Bytes {
        use CommonPayload::*;
        let mut buf = BytesMut::new();
        buf.put_u8(self.id().into());
        match self {
            RequestDeviceId | RequestFirmwareVersion | RequestDeviceName | LoadDefault | Reboot | RequestCategoryCount => {}
            ReplyDeviceId { tx_id, uuid } | SetTxId { tx_id, uuid } => {
                buf.put_u8(*tx_id);
                buf.put_slice(&uuid.to_wire_bytes());
            }
            ReplyFirmwareVersion { major, minor, patch, build } => {
                buf.put_u32_le(*major);
                buf.put_u32_le(*minor);
                buf.put_u32_le(*patch);
                buf.put_u32_le(*build);
            }
            FirmwareStart { processor_id } | FirmwareEnd { processor_id } | RequestFirmwareVersionPerId { processor_id } => {
                buf.put_u8(*processor_id);
            }
            FirmwareData { processor_id, chunk } => {
                buf.put_u8(*processor_id);
                buf.put_slice(chunk);
            }
            ReplyDeviceName { name } => buf.put_slice(&encode_ascii_nul_terminated(name)),
            SaveAsDefault { uuid } => buf.put_slice(&uuid.to_wire_bytes()),
            RequestConfigurationNameAndUid { category, index } => {
                buf.put_u8(*category);
                buf.put_u16_le(*index);
            }
            ReplyConfigurationNameAndUid { index, category, uid, name } => {
                buf.put_u16_le(*index);
                buf.put_u8(*category);
                buf.put_u32_le(*uid);
                buf.put_slice(&encode_ascii_nul_terminated(name));
            }
            RequestConfigurationValueUid { uid } => buf.put_u32_le(*uid),
            ReplyConfigurationValueUid { uid, value } | SetConfigurationValueUid { uid, value } => {
                buf.put_u32_le(*uid);
                buf.put_u8(value.value_type().into());
                buf.put_slice(&value.encode());
            }
            RequestConfigurationCategory { category } | RequestConfigurationValueCount { category } => {
                buf.put_u8(*category);
            }
            ReplyConfigurationCategory { category, name } => {
                buf.put_u8(*category);
                buf.put_slice(&encode_ascii_nul_terminated(name));
            }
            ReplyConfigurationValueCount { category, count } => {
                buf.put_u8(*category);
                buf.put_u16_le(*count);
            }
            ReplyCategoryCount { count } => buf.put_u16_le(*count),
            ReplyFirmwareVersionPerId { major, minor, patch, build, processor_id } => {
                buf.put_u32_le(*major);
                buf.put_u32_le(*minor);
                buf.put_u32_le(*patch);
                buf.put_u32_le(*build);
                buf.put_u8(*processor_id);
            }
            DebugOutput { message } => buf.put_slice(&encode_ascii_nul_terminated(message)),
            ResetParameter { mode } => buf.put_u8(*mode),
            RequestProcedureSpec { index, uid } => {
                buf.put_u16_le(*index);
                buf.put_u32_le(*uid);
            }
            ReplyProcedureSpec { index, uid, ret_type, param_types, name } => {
                buf.put_u16_le(*index);
                buf.put_u32_le(*uid);
                buf.put_u8(*ret_type);
                buf.put_slice(param_types);
                buf.put_slice(&encode_ascii_nul_terminated(name));
            }
            RequestProcedureCall { uid, params } => {
                buf.put_u32_le(*uid);
                for p in params {
                    let slot = RpcParam { value: *p };
                    buf.put_slice(&slot.encode());
                }
            }
            ReplyProcedureCall { uid, ret } => {
                buf.put_u32_le(*uid);
                buf.put_u8(ret.value_type().into());
                buf.put_slice(&ret.encode_rpc_value8());
            }
        }
        buf.freeze()
    }

    pub fn decode(id: u8, mut body: Bytes) -> Result<Self, AmfiprotError> {
        let id = CommonPayloadId::try_from(id).map_err(|_| AmfiprotError::InvalidCommonId(id))?;
        Ok(match id {
            CommonPayloadId::RequestDeviceId => CommonPayload::RequestDeviceId,
            CommonPayloadId::ReplyDeviceId | CommonPayloadId::SetTxId => {
                need(&body, 13)?;
                let tx_id = body.get_u8();
                let uuid = DeviceUuid::from_wire_bytes(&body.copy_to_bytes(12))?;
                if id == CommonPayloadId::ReplyDeviceId {
                    CommonPayload::ReplyDeviceId { tx_id, uuid }
                } else {
                    CommonPayload::SetTxId { tx_id, uuid }
                }
            }
            CommonPayloadId::RequestFirmwareVersion => CommonPayload::RequestFirmwareVersion,
            CommonPayloadId::ReplyFirmwareVersion => {
                need(&body, 16)?;
                CommonPayload::ReplyFirmwareVersion {
                    major: body.get_u32_le(),
                    minor: body.get_u32_le(),
                    patch: body.get_u32_le(),
                    build: body.get_u32_le(),
                }
            }
            CommonPayloadId::FirmwareStart => {
                need(&body, 1)?;
                CommonPayload::FirmwareStart { processor_id: body.get_u8() }
            }
            CommonPayloadId::FirmwareData => {
                need(&body, 1)?;
                let processor_id = body.get_u8();
                CommonPayload::FirmwareData { processor_id, chunk: body }
            }
            CommonPayloadId::FirmwareEnd => {
                need(&body, 1)?;
                CommonPayload::FirmwareEnd { processor_id: body.get_u8() }
            }
            CommonPayloadId::RequestDeviceName => CommonPayload::RequestDeviceName,
            CommonPayloadId::ReplyDeviceName => CommonPayload::ReplyDeviceName {
                name: decode_ascii_nul_terminated(&body),
            },
            CommonPayloadId::LoadDefault => CommonPayload::LoadDefault,
            CommonPayloadId::SaveAsDefault => {
                need(&body, 12)?;
                CommonPayload::SaveAsDefault {
                    uuid: DeviceUuid::from_wire_bytes(&body.copy_to_bytes(12))?,
                }
            }
            CommonPayloadId::RequestConfigurationNameAndUid => {
                need(&body, 3)?;
                CommonPayload::RequestConfigurationNameAndUid {
                    category: body.get_u8(),
                    index: body.get_u16_le(),
                }
            }
            CommonPayloadId::ReplyConfigurationNameAndUid => {
                need(&body, 7)?;
                let index = body.get_u16_le();
                let category = body.get_u8();
                let uid = body.get_u32_le();
                CommonPayload::ReplyConfigurationNameAndUid {
                    index,
                    category,
                    uid,
                    name: decode_ascii_nul_terminated(&body),
                }
            }
            CommonPayloadId::RequestConfigurationValueUid => {
                need(&body, 4)?;
                CommonPayload::RequestConfigurationValueUid { uid: body.get_u32_le() }
            }
            CommonPayloadId::ReplyConfigurationValueUid | CommonPayloadId::SetConfigurationValueUid => {
                need(&body, 5)?;
                let uid = body.get_u32_le();
                let ty_tag = body.get_u8();
                let ty = ConfigValueType::try_from(ty_tag)
                    .map_err(|_| AmfiprotError::ParseError(format!("unknown config value type tag {ty_tag:#04x}")))?;
                let value = ConfigValue::decode(ty, &body)?;
                if id == CommonPayloadId::ReplyConfigurationValueUid {
                    CommonPayload::ReplyConfigurationValueUid { uid, value }
                } else {
                    CommonPayload::SetConfigurationValueUid { uid, value }
                }
            }
            CommonPayloadId::RequestConfigurationCategory => {
                need(&body, 1)?;
                CommonPayload::RequestConfigurationCategory { category: body.get_u8() }
            }
            CommonPayloadId::ReplyConfigurationCategory => {
                need(&body, 1)?;
                let category = body.get_u8();
                CommonPayload::ReplyConfigurationCategory {
                    category,
                    name: decode_ascii_nul_terminated(&body),
                }
            }
            CommonPayloadId::RequestConfigurationValueCount => {
                need(&body, 1)?;
                CommonPayload::RequestConfigurationValueCount { category: body.get_u8() }
            }
            CommonPayloadId::ReplyConfigurationValueCount => {
                need(&body, 3)?;
                CommonPayload::ReplyConfigurationValueCount {
                    category: body.get_u8(),
                    count: body.get_u16_le(),
                }
            }
            CommonPayloadId::RequestCategoryCount => CommonPayload::RequestCategoryCount,
            CommonPayloadId::ReplyCategoryCount => {
                need(&body, 2)?;
                CommonPayload::ReplyCategoryCount { count: body.get_u16_le() }
            }
            CommonPayloadId::RequestFirmwareVersionPerId => {
                need(&body, 1)?;
                CommonPayload::RequestFirmwareVersionPerId { processor_id: body.get_u8() }
            }
            CommonPayloadId::ReplyFirmwareVersionPerId => {
                need(&body, 17)?;
                CommonPayload::ReplyFirmwareVersionPerId {
                    major: body.get_u32_le(),
                    minor: body.get_u32_le(),
                    patch: body.get_u32_le(),
                    build: body.get_u32_le(),
                    processor_id: body.get_u8(),
                }
            }
            CommonPayloadId::DebugOutput => CommonPayload::DebugOutput {
                message: decode_ascii_nul_terminated(&body),
            },
            CommonPayloadId::Reboot => CommonPayload::Reboot,
            CommonPayloadId::ResetParameter => {
                need(&body, 1)?;
                CommonPayload::ResetParameter { mode: body.get_u8() }
            }
            CommonPayloadId::RequestProcedureSpec => {
                need(&body, 6)?;
                CommonPayload::RequestProcedureSpec {
                    index: body.get_u16_le(),
                    uid: body.get_u32_le(),
                }
            }
            CommonPayloadId::ReplyProcedureSpec => {
                need(&body, 12)?;
                let index = body.get_u16_le();
                let uid = body.get_u32_le();
                let ret_type = body.get_u8();
                let mut param_types = [0u8; 5];
                body.copy_to_slice(&mut param_types);
                CommonPayload::ReplyProcedureSpec {
                    index,
                    uid,
                    ret_type,
                    param_types,
                    name: decode_ascii_nul_terminated(&body),
                }
            }
            CommonPayloadId::RequestProcedureCall => {
                need(&body, 4)?;
                let uid = body.get_u32_le();
                let mut params = [ConfigValue::UInt8(0); 5];
                for slot in &mut params {
                    *slot = RpcParam::decode(&mut body)?.value;
                }
                CommonPayload::RequestProcedureCall { uid, params }
            }
            CommonPayloadId::ReplyProcedureCall => {
                need(&body, 13)?;
                let uid = body.get_u32_le();
                let ret_tag = body.get_u8();
                let mut value8 = [0u8; 8];
                body.copy_to_slice(&mut value8);
                let ret_ty = ConfigValueType::try_from(ret_tag)
                    .map_err(|_| AmfiprotError::ParseError(format!("unknown RPC return type tag {ret_tag:#04x}")))?;
                CommonPayload::ReplyProcedureCall {
                    uid,
                    ret: ConfigValue::decode_rpc(ret_ty, &value8)?,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_device_name_round_trip() {
        let payload = CommonPayload::ReplyDeviceName { name: "Sensor".to_string() };
        let encoded = payload.encode();
        // ID byte + 6 name bytes + NUL terminator.
        assert_eq!(encoded.len(), 8);
        let decoded = CommonPayload::decode(encoded[0], encoded.slice(1..)).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn unknown_common_id_is_an_error() {
        let err = CommonPayload::decode(0x7F, Bytes::new()).unwrap_err();
        assert!(matches!(err, AmfiprotError::InvalidCommonId(0x7F)));
    }

    #[test]
    fn reply_device_id_round_trips_uuid() {
        let uuid = DeviceUuid::from_limbs(0x0102_0304, 0x0506_0708, 0x090A_0B0C);
        let payload = CommonPayload::ReplyDeviceId { tx_id: 7, uuid };
        let encoded = payload.encode();
        let decoded = CommonPayload::decode(encoded[0], encoded.slice(1..)).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn rpc_call_pads_five_slots() {
        let params = [
            ConfigValue::UInt8(0),
            ConfigValue::Bool(true),
            ConfigValue::UInt8(0),
            ConfigValue::UInt8(0),
            ConfigValue::UInt8(0),
        ];
        let payload = CommonPayload::RequestProcedureCall { uid: 42, params };
        let encoded = payload.encode();
        // ID (1) + uid (4) + 5 * 9-byte slots.
        assert_eq!(encoded.len(), 1 + 4 + 5 * 9);
        let decoded = CommonPayload::decode(encoded[0], encoded.slice(1..)).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn config_value_round_trips_each_type() {
        let values = [
            ConfigValue::Bool(true),
            ConfigValue::Int32(-5),
            ConfigValue::UInt64(123456789),
            ConfigValue::Float(1.5),
            ConfigValue::Double(-2.25),
        ];
        for value in values {
            let bytes = value.encode();
            let decoded = ConfigValue::decode(value.value_type(), &bytes).unwrap();
            assert_eq!(decoded, value);
        }
    }
}
