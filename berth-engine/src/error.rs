//! Error types for the engine crate.

/// Errors that can occur while talking to a container engine.
///
/// Messages are the engine's own text, unprefixed, so they can be handed
/// to API callers verbatim.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EngineError {
    /// The engine reported that the referenced object does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A handle to the engine could not be acquired.
    #[error("{0}")]
    Connect(String),

    /// Any other failure reported by the engine or its client.
    #[error("{0}")]
    Engine(String),
}

impl From<bollard::errors::Error> for EngineError {
    fn from(err: bollard::errors::Error) -> Self {
        use bollard::errors::Error;
        match err {
            Error::DockerResponseServerError {
                status_code: 404,
                message,
            } => EngineError::NotFound(message),
            Error::DockerResponseServerError { message, .. } => EngineError::Engine(message),
            other => EngineError::Engine(other.to_string()),
        }
    }
}

impl From<berth_core::CoreError> for EngineError {
    fn from(err: berth_core::CoreError) -> Self {
        EngineError::Engine(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docker_404_maps_to_not_found_with_engine_message() {
        let err = bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message: "No such container: abc".to_owned(),
        };
        match EngineError::from(err) {
            EngineError::NotFound(msg) => assert_eq!(msg, "No such container: abc"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn docker_409_maps_to_engine_error() {
        let err = bollard::errors::Error::DockerResponseServerError {
            status_code: 409,
            message: "Conflict. The container name \"/web\" is already in use".to_owned(),
        };
        let mapped = EngineError::from(err);
        assert!(matches!(mapped, EngineError::Engine(_)));
        assert!(mapped.to_string().starts_with("Conflict."), "message must be verbatim");
    }
}
