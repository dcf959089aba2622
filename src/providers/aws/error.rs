use aws_sdk_autoscaling::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

use crate::providers::ProviderError;

/// Known AWS error codes for throttling/rate limiting
const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "RequestThrottled",
    "TooManyRequestsException",
];

/// Known AWS error codes for server-side failures worth retrying
const TRANSIENT_CODES: &[&str] = &[
    "InternalFailure",
    "InternalError",
    "ServiceUnavailable",
    "RequestTimeout",
    "RequestTimeoutException",
];

/// Classify an AWS SDK error from either service client.
///
/// Both SDK crates share the smithy error types, so one classifier covers the
/// autoscaling and elbv2 operation errors alike.
pub fn classify_sdk_error<E>(operation: &'static str, err: &SdkError<E>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let context = DisplayErrorContext(err).to_string();

    match err {
        SdkError::ConstructionFailure(_) => {
            return ProviderError::Configuration(format!("{operation}: {context}"));
        }
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            return ProviderError::Transient {
                operation,
                message: context,
            };
        }
        _ => {}
    }

    let status = err.raw_response().map(|r| r.status().as_u16());
    if status.is_some_and(|s| s >= 500) && err.code().is_none() {
        return ProviderError::Transient {
            operation,
            message: context,
        };
    }

    classify_error_code(operation, err.code(), err.message().unwrap_or(&context))
}

/// Classify by AWS error code alone.
pub fn classify_error_code(
    operation: &'static str,
    code: Option<&str>,
    message: &str,
) -> ProviderError {
    let message = message.to_string();

    match code {
        Some(c) if THROTTLING_CODES.contains(&c) => ProviderError::Throttled { operation, message },
        Some(c) if TRANSIENT_CODES.contains(&c) => ProviderError::Transient { operation, message },
        Some(c) => ProviderError::Service {
            operation,
            code: c.to_string(),
            message,
        },
        None => ProviderError::Service {
            operation,
            code: "Unknown".to_string(),
            message,
        },
    }
}
