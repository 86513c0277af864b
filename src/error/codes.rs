/// Error code registry for distrib-exec
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 3000-3999: Storage errors
/// - 4000-4999: Admission errors
/// - 5000-5999: Manifest errors
/// - 6000-6999: Routing RPC errors
#[allow(dead_code)]
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_PARSE_ERROR: u16 = 1002;
    pub const CONFIG_INVALID_VALUE: u16 = 1003;
    pub const CONFIG_CHUNK_SIZE_MISSING: u16 = 1010;

    // Storage errors (3000-3999)
    pub const STORAGE_UNAVAILABLE: u16 = 3000;

    // Admission errors (4000-4999)
    pub const ADMISSION_CORRUPT_RUN_FLAG: u16 = 4001;

    // Manifest errors (5000-5999)
    pub const MANIFEST_PARTIAL_WRITE: u16 = 5001;

    // Routing RPC errors (6000-6999)
    pub const RPC_GENERIC: u16 = 6000;
    pub const RPC_CONNECT_FAILED: u16 = 6001;
    pub const RPC_CALL_FAILED: u16 = 6002;
    pub const RPC_PROTOCOL_ERROR: u16 = 6003;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        1000 => "Generic configuration error",
        1001 => "Configuration file not found",
        1002 => "Failed to parse configuration",
        1003 => "Invalid value in configuration",
        1010 => "Manifest chunk size is missing or not a number",

        3000 => "Store unavailable",

        4001 => "Manual run flag holds an unreadable value",

        5001 => "Order flag update failed, manifest batch aborted",

        6000 => "Generic routing RPC error",
        6001 => "Failed to connect to the routing router",
        6002 => "Routing procedure returned an error",
        6003 => "Unexpected routing protocol message",

        _ => "Unknown error code",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_are_described() {
        for code in [
            ErrorCode::CONFIG_CHUNK_SIZE_MISSING,
            ErrorCode::STORAGE_UNAVAILABLE,
            ErrorCode::ADMISSION_CORRUPT_RUN_FLAG,
            ErrorCode::MANIFEST_PARTIAL_WRITE,
            ErrorCode::RPC_CALL_FAILED,
        ] {
            assert_ne!(describe_error_code(code), "Unknown error code");
        }
        assert_eq!(describe_error_code(42), "Unknown error code");
    }
}
