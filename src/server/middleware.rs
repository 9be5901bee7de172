// HTTP middleware
// Author: kelexine (https://github.com/kelexine)

use crate::epoch::CacheEpoch;
use crate::error::{OfflineError, Result};
use axum::http::{HeaderName, HeaderValue};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;

/// Names the cache epoch that served a response.
pub const EPOCH_HEADER: HeaderName = HeaderName::from_static("x-offline-epoch");

/// Create request ID layers for the application
pub fn request_id_layers() -> (SetRequestIdLayer<MakeRequestUuid>, PropagateRequestIdLayer) {
    (
        SetRequestIdLayer::x_request_id(MakeRequestUuid),
        PropagateRequestIdLayer::x_request_id(),
    )
}

/// Stamp every response with the current epoch.
pub fn epoch_header_layer(epoch: &CacheEpoch) -> Result<SetResponseHeaderLayer<HeaderValue>> {
    let value = HeaderValue::from_str(epoch.as_str()).map_err(|_| {
        OfflineError::InvalidEpoch(format!("{:?} is not a valid header value", epoch.as_str()))
    })?;
    Ok(SetResponseHeaderLayer::overriding(EPOCH_HEADER, value))
}
