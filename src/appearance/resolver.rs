use std::sync::Arc;
use std::thread;

use crate::appearance::identity::AssetIdentity;
use crate::appearance::provider::{
    default_skin, empty_cape, failed_asset, now_millis, AssetSource, CapeProvider, ResolvedAsset,
    SkinAndCape,
};
use crate::config::ProxyConfig;
use crate::tasks::{Promise, WorkerPool};

/// Everything the resolver needs about one entity. The uuid and username
/// feed the alternate cape provider URL patterns.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub entity_uuid: String,
    pub username: String,
    pub identity: AssetIdentity,
}

/// Resolves skin and cape for an identity on the worker pool. Never runs on
/// the calling thread and never hard-fails: a failed skin substitutes the
/// built-in default skin, a failed cape walks the bounded alternate provider
/// chain before substituting the empty cape.
pub fn resolve_assets(
    pool: &WorkerPool,
    source: Arc<dyn AssetSource>,
    request: ResolveRequest,
    config: &ProxyConfig,
) -> Promise<SkinAndCape> {
    let (completer, promise) = Promise::pair();
    let allow_third_party = config.allow_third_party_capes;
    let retry_factor = config.cape_provider_retry_factor;
    pool.execute(move || {
        let resolved = resolve_blocking(&source, &request, allow_third_party, retry_factor);
        completer.complete(resolved);
    });
    promise
}

/// Synchronous core of [`resolve_assets`]; callers already on a background
/// thread use this directly. Skin and cape resolve concurrently.
pub(crate) fn resolve_blocking(
    source: &Arc<dyn AssetSource>,
    request: &ResolveRequest,
    allow_third_party: bool,
    retry_factor: u32,
) -> SkinAndCape {
    let requested_at = now_millis();

    let skin_source = Arc::clone(source);
    let skin_url = request.identity.skin_url.clone();
    let skin_handle = thread::spawn(move || skin_source.get_cached_or_fetch(&skin_url));

    let mut cape = match &request.identity.cape_url {
        Some(url) => source.get_cached_or_fetch(url),
        None => failed_asset("", requested_at),
    };
    if cape.failed {
        cape = if allow_third_party {
            resolve_unofficial_cape(source.as_ref(), request, retry_factor)
                .unwrap_or_else(|| empty_cape(requested_at))
        } else {
            empty_cape(requested_at)
        };
    }

    let mut skin = match skin_handle.join() {
        Ok(skin) => skin,
        Err(_) => failed_asset(&request.identity.skin_url, requested_at),
    };
    if skin.failed {
        skin = default_skin(requested_at);
    }

    SkinAndCape { skin, cape }
}

/// Tries each alternate provider in order, at most `retry_factor` attempts
/// per provider; the first success wins. Total attempts are bounded by
/// `VALUES.len() * retry_factor`, which is what bounds worst-case latency.
fn resolve_unofficial_cape(
    source: &dyn AssetSource,
    request: &ResolveRequest,
    retry_factor: u32,
) -> Option<ResolvedAsset> {
    for provider in CapeProvider::VALUES {
        let url = provider.url_for(&request.entity_uuid, &request.username);
        for _ in 0..retry_factor.max(1) {
            let cape = source.get_cached_or_fetch(&url);
            if !cape.failed {
                return Some(cape);
            }
        }
    }
    None
}
