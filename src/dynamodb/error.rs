use aws_sdk_dynamodb::{
    config::http::HttpResponse,
    error::{BuildError, DisplayErrorContext, ProvideErrorMetadata, SdkError},
    operation::RequestId,
};
use std::fmt;

/// Which side of the conversation a rejected request is blamed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    Client,
    Service,
}

impl ErrorType {
    fn from_status(status: u16) -> Self {
        if status >= 500 {
            ErrorType::Service
        } else {
            ErrorType::Client
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorType::Client => f.write_str("Client"),
            ErrorType::Service => f.write_str("Service"),
        }
    }
}

/// Errors raised by the store.
///
/// `Service` means the request reached DynamoDB and was rejected
/// (validation, throughput, permissions). `Client` means it never got a
/// response at all (credentials, network, timeouts).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("request rejected by DynamoDB ({code}): {message}")]
    Service {
        message: String,
        status_code: u16,
        code: String,
        error_type: ErrorType,
        request_id: Option<String>,
    },
    #[error("unable to reach DynamoDB: {message}")]
    Client { message: String },
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] BuildError),
}

impl StoreError {
    pub fn is_client(&self) -> bool {
        matches!(self, StoreError::Client { .. })
    }
}

impl<E> From<SdkError<E, HttpResponse>> for StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    fn from(err: SdkError<E, HttpResponse>) -> Self {
        let request_id = err.request_id().map(str::to_string);
        match &err {
            SdkError::ServiceError(context) => {
                let status_code = context.raw().status().as_u16();
                let service_err = context.err();
                StoreError::Service {
                    message: service_err
                        .message()
                        .map(str::to_string)
                        .unwrap_or_else(|| service_err.to_string()),
                    status_code,
                    code: service_err.code().unwrap_or("Unknown").to_string(),
                    error_type: ErrorType::from_status(status_code),
                    request_id,
                }
            }
            _ => StoreError::Client {
                message: DisplayErrorContext(&err).to_string(),
            },
        }
    }
}
