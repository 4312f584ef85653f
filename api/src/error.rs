use store::StoreError;
use thiserror::Error;

use crate::provider::ProviderError;

/// Errors that escape the auth core to callers. Most operations report
/// failures through the notifier instead; only the ones documented to
/// propagate return this.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}
