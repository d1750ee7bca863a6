//! Conversion between 64-bit Steam ids and 32-bit account ids.

use crate::error::{Error, Result};

/// Offset between a 64-bit Steam id and its 32-bit account id
pub const STEAM_ID_BASE: u64 = 76_561_197_960_265_728;

/// Account id reserved for players who hide their profile
pub const ANONYMOUS_ACCOUNT_ID: u32 = 4_294_967_295;

pub fn convert_64_to_32(steam_id: &str) -> Result<u32> {
    let id: u64 = steam_id
        .trim()
        .parse()
        .map_err(|_| Error::InvalidSteamId(steam_id.to_string()))?;

    id.checked_sub(STEAM_ID_BASE)
        .and_then(|account_id| u32::try_from(account_id).ok())
        .ok_or_else(|| Error::InvalidSteamId(steam_id.to_string()))
}
