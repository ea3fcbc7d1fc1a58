use axum::http::StatusCode;
use tracing::error;

use cramr_core::CramrError;

/// Maps a core failure to the HTTP status returned to the client.
pub fn to_status(e: CramrError) -> StatusCode {
    match e {
        CramrError::Offline => StatusCode::SERVICE_UNAVAILABLE,
        CramrError::MissingUser => StatusCode::BAD_REQUEST,
        CramrError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        CramrError::NotInSession | CramrError::InvalidInviteState { .. } => StatusCode::CONFLICT,
        CramrError::Backend(e) => {
            error!("Backend error: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gone_session_is_not_found() {
        assert_eq!(to_status(CramrError::SessionNotFound("s1".into())), StatusCode::NOT_FOUND);
        assert_eq!(to_status(CramrError::Offline), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(to_status(CramrError::NotInSession), StatusCode::CONFLICT);
        assert_eq!(
            to_status(CramrError::Backend(anyhow::anyhow!("disk full"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
