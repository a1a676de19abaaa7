//! Response header middlewares.

use http::header::ACCESS_CONTROL_ALLOW_ORIGIN;
use http::{HeaderName, HeaderValue};
use tower_http::set_header::SetResponseHeaderLayer;

use super::Middleware;
use crate::CommonError;

/// Set `Access-Control-Allow-Origin` on responses that do not already carry it.
///
/// # Errors
///
/// Returns an error if `origin` is not a valid header value.
pub fn access_control_allow_origin(origin: &str) -> Result<Middleware, CommonError> {
    let value = parse_value(ACCESS_CONTROL_ALLOW_ORIGIN.as_str(), origin)?;
    Ok(Middleware::from_layer(SetResponseHeaderLayer::if_not_present(
        ACCESS_CONTROL_ALLOW_ORIGIN,
        value,
    )))
}

/// Set each header on responses that do not already carry it.
///
/// # Errors
///
/// Returns an error naming the first invalid header name or value.
pub fn add_headers<I, K, V>(headers: I) -> Result<Middleware, CommonError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let layers = headers
        .into_iter()
        .map(|(name, value)| {
            let name = name.as_ref();
            let header = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| CommonError::invalid_header(format!("{name}: {e}")))?;
            let value = parse_value(name, value.as_ref())?;
            Ok(Middleware::from_layer(SetResponseHeaderLayer::if_not_present(header, value)))
        })
        .collect::<Result<Vec<_>, CommonError>>()?;

    Ok(Middleware::new(move |inner| {
        layers.iter().fold(inner, |service, layer| layer.wrap(service))
    }))
}

fn parse_value(name: &str, value: &str) -> Result<HeaderValue, CommonError> {
    HeaderValue::from_str(value)
        .map_err(|e| CommonError::invalid_header(format!("{name}: {e}")))
}
