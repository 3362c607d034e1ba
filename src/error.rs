use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::http::response::StatusCode;

/// Everything that can go wrong while answering one request.
///
/// Every variant is resolved inside the connection handler into a response;
/// none of them ever reaches the worker loop.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("cannot tokenize request line")]
    Protocol,

    #[error("request headers exceed {0} bytes")]
    HeadersTooLarge(usize),

    #[error("method {0} not allowed")]
    UnsupportedMethod(String),

    #[error("{} escapes the document root", .0.display())]
    PathEscapesRoot(PathBuf),

    #[error("{} not found", .0.display())]
    ResourceAbsent(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn status(&self) -> StatusCode {
        match self {
            HandlerError::Protocol | HandlerError::HeadersTooLarge(_) => StatusCode::BadRequest,
            HandlerError::UnsupportedMethod(_) => StatusCode::MethodNotAllowed,
            HandlerError::PathEscapesRoot(_) => StatusCode::Forbidden,
            HandlerError::ResourceAbsent(_) => StatusCode::NotFound,
            HandlerError::Io { .. } | HandlerError::Internal(_) => StatusCode::InternalServerError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_to_status() {
        assert_eq!(HandlerError::Protocol.status(), StatusCode::BadRequest);
        assert_eq!(HandlerError::HeadersTooLarge(16).status(), StatusCode::BadRequest);
        assert_eq!(
            HandlerError::UnsupportedMethod("DELETE".into()).status(),
            StatusCode::MethodNotAllowed
        );
        assert_eq!(
            HandlerError::PathEscapesRoot("/srv/../etc".into()).status(),
            StatusCode::Forbidden
        );
        let io = HandlerError::Io {
            path: "/srv/a".into(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert_eq!(io.status(), StatusCode::InternalServerError);
    }
}
