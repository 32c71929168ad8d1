mod client;
mod envelope;
mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod mock;
pub mod transport;

mod categories;
mod cities;
mod offers;
mod plans;
mod support;
mod users;

pub use client::{ApiClient, ApiRequest, RetryPolicy, TOKEN_HEADER};
pub use envelope::unwrap_field;
pub use error::{ApiError, ApiResult, FetchError, MutationError};
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
