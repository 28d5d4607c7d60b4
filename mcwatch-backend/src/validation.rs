/// Input validation for configured and requested server addresses
use mcwatch_db::{DEFAULT_PORT, ServerIdentity, normalize_hostname};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Hostname cannot be empty")]
    HostnameEmpty,

    #[error("Hostname too long (max 253 characters, got {0})")]
    HostnameTooLong(usize),

    #[error("Hostname contains invalid characters (only letters, digits, '-', '.' and '_' allowed)")]
    HostnameInvalidChars,

    #[error("Invalid port '{0}'")]
    InvalidPort(String),
}

/// Validates a server hostname
///
/// Rules:
/// - Scheme prefix and trailing slash are ignored
/// - Cannot be empty
/// - Max 253 characters (DNS name limit)
/// - Only ASCII letters, digits, '-', '.', '_' (IPv4 literals pass too)
pub fn validate_hostname(hostname: &str) -> Result<(), ValidationError> {
    let host = normalize_hostname(hostname);

    if host.is_empty() {
        return Err(ValidationError::HostnameEmpty);
    }

    if host.len() > 253 {
        return Err(ValidationError::HostnameTooLong(host.len()));
    }

    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_')
    {
        return Err(ValidationError::HostnameInvalidChars);
    }

    Ok(())
}

/// Parses a `host[:port]` entry, tolerating a scheme prefix and trailing slash.
/// The port defaults to 25565.
pub fn parse_server(entry: &str) -> Result<ServerIdentity, ValidationError> {
    let host_port = normalize_hostname(entry.trim());

    let (host, port) = match host_port.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .ok()
                .filter(|p| *p != 0)
                .ok_or_else(|| ValidationError::InvalidPort(port.to_string()))?;
            (host, port)
        }
        None => (host_port, DEFAULT_PORT),
    };

    validate_hostname(host)?;
    Ok(ServerIdentity::new(host, port))
}
