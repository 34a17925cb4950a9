use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as Unix-epoch seconds, used for WitnessProof expiry tags and
/// the coordination permit (§4.F).
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
