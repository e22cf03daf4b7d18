//! Request editors: hooks that mutate a request right before it is sent.

use super::error::ClientError;
use super::transport::ApiRequest;

/// A hook applied to every outgoing request before it is sent.
///
/// Returning an error aborts the call; nothing is sent.
pub trait RequestEditor: Send + Sync {
    /// Mutate the request in place.
    fn edit(&self, request: &mut ApiRequest) -> Result<(), ClientError>;
}

impl<F> RequestEditor for F
where
    F: Fn(&mut ApiRequest) -> Result<(), ClientError> + Send + Sync,
{
    fn edit(&self, request: &mut ApiRequest) -> Result<(), ClientError> {
        self(request)
    }
}

/// Apply editors in order, stopping at the first failure.
pub(crate) fn apply_editors<'a, I, E>(request: &mut ApiRequest, editors: I) -> Result<(), ClientError>
where
    I: IntoIterator<Item = &'a E>,
    E: RequestEditor + ?Sized + 'a,
{
    for editor in editors {
        editor.edit(request)?;
    }
    Ok(())
}
