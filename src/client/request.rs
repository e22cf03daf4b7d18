//! Request builders for the runners API operations.

use http::Method;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use url::Url;

use super::error::ClientError;
use super::models::GitLabRunner;
use super::transport::ApiRequest;

/// Path of the runners collection, relative to the server URL.
pub const COLLECTION_PATH: &str = "/gitlab-runners";

/// Characters escaped in a single path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Parse a server URL, making sure its path ends with `/` so operation paths
/// resolve below it. A query or fragment on the server URL is not carried
/// into operation URLs.
pub fn normalize_server(server: &str) -> Result<Url, ClientError> {
    let mut url = Url::parse(server)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Resolve an operation path against the server URL.
///
/// A leading `/` is taken as relative to the server, so a server with a
/// sub-path such as `https://host/api/` keeps its prefix.
pub fn operation_url(server: &Url, operation_path: &str) -> Result<Url, ClientError> {
    let relative = match operation_path.strip_prefix('/') {
        Some(rest) => format!("./{}", rest),
        None => operation_path.to_string(),
    };
    Ok(server.join(&relative)?)
}

/// Encode a path parameter in simple style for insertion as one segment.
pub fn encode_path_param(name: &'static str, value: &str) -> Result<String, ClientError> {
    let reason = match value {
        "" => "must not be empty",
        "." | ".." => "must not be a dot segment",
        _ => return Ok(utf8_percent_encode(value, PATH_SEGMENT).to_string()),
    };
    Err(ClientError::InvalidPathParam {
        name,
        reason: reason.to_string(),
    })
}

fn item_path(id: &str) -> Result<String, ClientError> {
    Ok(format!("{}/{}", COLLECTION_PATH, encode_path_param("id", id)?))
}

fn json_body(body: &GitLabRunner) -> Result<Vec<u8>, ClientError> {
    serde_json::to_vec(body).map_err(ClientError::Encode)
}

/// `POST /gitlab-runners`
pub fn create_request(server: &Url, body: &GitLabRunner) -> Result<ApiRequest, ClientError> {
    let body = json_body(body)?;
    let url = operation_url(server, COLLECTION_PATH)?;
    Ok(ApiRequest::new(Method::POST, url).with_json_body(body))
}

/// `GET /gitlab-runners/list`
pub fn list_request(server: &Url) -> Result<ApiRequest, ClientError> {
    let url = operation_url(server, &format!("{}/list", COLLECTION_PATH))?;
    Ok(ApiRequest::new(Method::GET, url))
}

/// `GET /gitlab-runners/{id}`
pub fn read_request(server: &Url, id: &str) -> Result<ApiRequest, ClientError> {
    let url = operation_url(server, &item_path(id)?)?;
    Ok(ApiRequest::new(Method::GET, url))
}

/// `PUT /gitlab-runners/{id}`
pub fn update_request(
    server: &Url,
    id: &str,
    body: &GitLabRunner,
) -> Result<ApiRequest, ClientError> {
    let path = item_path(id)?;
    let body = json_body(body)?;
    let url = operation_url(server, &path)?;
    Ok(ApiRequest::new(Method::PUT, url).with_json_body(body))
}

/// `DELETE /gitlab-runners/{id}`
pub fn delete_request(server: &Url, id: &str) -> Result<ApiRequest, ClientError> {
    let url = operation_url(server, &item_path(id)?)?;
    Ok(ApiRequest::new(Method::DELETE, url))
}
