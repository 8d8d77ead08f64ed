// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for operator error types.

#[cfg(test)]
mod tests {
    use crate::errors::*;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(Box::new(kube::error::ErrorResponse {
            status: Some(kube::core::response::StatusSummary::Failure),
            message: "test".to_string(),
            reason: "Test".to_string(),
            code,
            metadata: None,
            details: None,
        }))
    }

    #[test]
    fn test_kube_404_is_not_found() {
        let err = Error::from_kube(api_error(404), "Secret", "c1", "c1-ca");

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Secret 'c1/c1-ca' not found");
    }

    #[test]
    fn test_kube_409_is_conflict() {
        let err: Error = api_error(409).into();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.is_conflict());
    }

    #[test]
    fn test_other_kube_errors_are_transient() {
        for code in [400, 401, 429, 500, 503] {
            let err: Error = api_error(code).into();
            assert_eq!(err.kind(), ErrorKind::Transient, "code {code}");
        }
    }

    #[test]
    fn test_unsupported_kind() {
        let err = Error::Unsupported("externally provided certificates".to_string());
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert_eq!(
            err.to_string(),
            "unsupported configuration: externally provided certificates"
        );
    }

    #[test]
    fn test_engine_and_certificate_errors_are_transient() {
        assert_eq!(
            Error::engine("http://es:9200", "connection refused").kind(),
            ErrorKind::Transient
        );
        assert_eq!(
            Error::Certificate("bad key".to_string()).kind(),
            ErrorKind::Transient
        );
        assert_eq!(Error::Cancelled.kind(), ErrorKind::Transient);
    }

    #[test]
    fn test_engine_error_message() {
        let err = Error::engine("https://es-svc.c1.svc.cluster.local:9200", "HTTP 503");
        assert_eq!(
            err.to_string(),
            "OpenSearch API error at https://es-svc.c1.svc.cluster.local:9200: HTTP 503"
        );
    }
}
