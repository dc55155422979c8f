use tracing::info;

use crate::api::AnalyzeApi;
use crate::config::{AppConfig, Session};
use crate::error::Error;
use crate::key_store::KeyStore;

/// Session for a command run, built from what `login` stored.
pub fn load_session(config: AppConfig, key_store: &KeyStore) -> Result<Session, Error> {
    let api_key = key_store.get_api_key()?.ok_or(Error::NotLoggedIn)?;
    let stored_url = key_store.get_default_url()?;
    Ok(Session::new(config, api_key, stored_url))
}

/// Verify the session's key against the service, then persist it.
///
/// `session.is_cloud` decides whether the on-premise URL is stored or cleared.
pub fn login(session: &Session, api: &dyn AnalyzeApi, key_store: &KeyStore) -> Result<(), Error> {
    api.authenticate()?;

    if session.is_cloud {
        key_store.delete_default_url()?;
    } else {
        key_store.store_default_url(&session.api_url)?;
    }
    key_store.store_api_key(&session.api_key)?;
    info!("Logged in to {}", session.api_url);
    Ok(())
}
