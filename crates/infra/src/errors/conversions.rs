//! Conversions from external infrastructure errors into domain errors.

use fms_domain::FmsError;
use keyring::Error as KeyringError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub FmsError);

impl From<InfraError> for FmsError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<FmsError> for InfraError {
    fn from(value: FmsError) -> Self {
        InfraError(value)
    }
}

trait IntoFmsError {
    fn into_fms(self) -> FmsError;
}

/* -------------------------------------------------------------------------- */
/* keyring::Error → FmsError */
/* -------------------------------------------------------------------------- */

impl IntoFmsError for KeyringError {
    fn into_fms(self) -> FmsError {
        use KeyringError::*;

        let description = self.to_string();

        match self {
            NoEntry => FmsError::NotFound("keychain entry not found".into()),
            BadEncoding(_) => FmsError::Storage("credential in keychain is not valid UTF-8".into()),
            TooLong(name, limit) => FmsError::Storage(format!(
                "keychain attribute '{name}' exceeds platform limit ({limit})"
            )),
            Invalid(attr, reason) => {
                FmsError::Storage(format!("keychain attribute '{attr}' is invalid: {reason}"))
            }
            PlatformFailure(err) => FmsError::Storage(format!("keychain platform error: {err}")),
            NoStorageAccess(err) => {
                FmsError::Storage(format!("unable to access secure storage: {err}"))
            }
            _ => FmsError::Storage(description),
        }
    }
}

impl From<KeyringError> for InfraError {
    fn from(value: KeyringError) -> Self {
        InfraError(value.into_fms())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → FmsError */
/* -------------------------------------------------------------------------- */

impl IntoFmsError for HttpError {
    fn into_fms(self) -> FmsError {
        if self.is_timeout() {
            return FmsError::Network("HTTP request timed out".into());
        }

        if self.is_builder() {
            return FmsError::InvalidInput(format!("invalid HTTP request: {self}"));
        }

        #[cfg(not(target_arch = "wasm32"))]
        if self.is_connect() {
            return FmsError::Network("HTTP connection failure".into());
        }

        if self.is_decode() || self.is_body() {
            return FmsError::Network(format!("failed to read HTTP response body: {self}"));
        }

        FmsError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_fms())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error / serde_json::Error → FmsError */
/* -------------------------------------------------------------------------- */

impl IntoFmsError for std::io::Error {
    fn into_fms(self) -> FmsError {
        match self.kind() {
            std::io::ErrorKind::NotFound => FmsError::NotFound(self.to_string()),
            std::io::ErrorKind::PermissionDenied => {
                FmsError::Storage(format!("permission denied: {self}"))
            }
            _ => FmsError::Storage(self.to_string()),
        }
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(value.into_fms())
    }
}

impl IntoFmsError for serde_json::Error {
    fn into_fms(self) -> FmsError {
        FmsError::Storage(format!("corrupt credential file: {self}"))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(value.into_fms())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use reqwest::Client;

    use super::*;

    #[test]
    fn keyring_no_entry_maps_to_not_found() {
        let mapped: FmsError = InfraError::from(KeyringError::NoEntry).into();
        match mapped {
            FmsError::NotFound(msg) => assert!(msg.contains("keychain")),
            other => panic!("expected not found, got {:?}", other),
        }
    }

    #[test]
    fn io_permission_denied_maps_to_storage_error() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only fs");
        let mapped: FmsError = InfraError::from(err).into();
        assert!(matches!(mapped, FmsError::Storage(msg) if msg.contains("permission denied")));
    }

    #[test]
    fn malformed_json_maps_to_storage_error() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let mapped: FmsError = InfraError::from(err).into();
        assert!(matches!(mapped, FmsError::Storage(_)));
    }

    #[tokio::test]
    async fn refused_connection_maps_to_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(format!("http://{addr}")).send().await.unwrap_err();

        let mapped: FmsError = InfraError::from(error).into();
        assert!(matches!(mapped, FmsError::Network(_)), "got {mapped:?}");
    }
}
