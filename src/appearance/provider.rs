use lru::LruCache;
use sha1::{Digest, Sha1};
use std::fmt::Write as FmtWrite;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::telemetry::logging;

pub const DEFAULT_SKIN_ID: &str = "default.skin.steve";
pub const EMPTY_CAPE_ID: &str = "";

// Flat fill for the built-in skin; 64x64 RGBA.
const DEFAULT_SKIN_PIXEL: [u8; 4] = [0x7d, 0x5a, 0x3c, 0xff];

/// One resolved appearance asset. `failed` marks a resolution that produced
/// no real data; callers substitute a built-in default instead of erroring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    pub id: String,
    pub data: Vec<u8>,
    pub resolved_at: i64,
    pub failed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkinAndCape {
    pub skin: ResolvedAsset,
    pub cape: ResolvedAsset,
}

/// Built-in body skin used whenever real resolution fails.
pub fn default_skin(resolved_at: i64) -> ResolvedAsset {
    let mut data = Vec::with_capacity(64 * 64 * 4);
    for _ in 0..64 * 64 {
        data.extend_from_slice(&DEFAULT_SKIN_PIXEL);
    }
    ResolvedAsset {
        id: DEFAULT_SKIN_ID.to_string(),
        data,
        resolved_at,
        failed: false,
    }
}

/// Built-in "no cape" asset.
pub fn empty_cape(resolved_at: i64) -> ResolvedAsset {
    ResolvedAsset {
        id: EMPTY_CAPE_ID.to_string(),
        data: Vec::new(),
        resolved_at,
        failed: false,
    }
}

pub fn failed_asset(url: &str, resolved_at: i64) -> ResolvedAsset {
    ResolvedAsset {
        id: texture_id(url),
        data: Vec::new(),
        resolved_at,
        failed: true,
    }
}

/// Stable identifier for an asset URL: lowercase hex SHA-1.
pub fn texture_id(url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }
    let mut sha1 = Sha1::new();
    sha1.update(url.as_bytes());
    let digest = sha1.finalize();
    let mut id = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(id, "{byte:02x}");
    }
    id
}

pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Alternate cape sources tried, in order, when the primary cape fails and
/// third-party capes are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapeProvider {
    OptiFine,
    LabyMod,
    FiveZig,
    MinecraftCapes,
}

impl CapeProvider {
    pub const VALUES: [CapeProvider; 4] = [
        CapeProvider::OptiFine,
        CapeProvider::LabyMod,
        CapeProvider::FiveZig,
        CapeProvider::MinecraftCapes,
    ];

    pub fn url_for(&self, uuid: &str, username: &str) -> String {
        match self {
            CapeProvider::OptiFine => {
                format!("https://s.optifine.net/capes/{username}.png")
            }
            CapeProvider::LabyMod => {
                format!("https://dl.labymod.net/capes/{uuid}")
            }
            CapeProvider::FiveZig => {
                format!("https://textures.5zigreborn.eu/profile/{uuid}")
            }
            CapeProvider::MinecraftCapes => {
                format!("https://minecraftcapes.net/profile/{}/cape", uuid.replace('-', ""))
            }
        }
    }
}

/// External asset source consumed by the resolver. Cache-or-fetch is the
/// source's business; the pipeline only defines the policy around it.
pub trait AssetSource: Send + Sync {
    /// Resolves one asset by URL. An empty URL yields a failed asset.
    /// Implementations must not panic; failures come back with
    /// `failed = true`.
    fn get_cached_or_fetch(&self, url: &str) -> ResolvedAsset;
}

/// Bundled `AssetSource` backed by an in-memory LRU cache over a caller
/// supplied fetch function. Cache hits keep their original `resolved_at`
/// stamp, so re-resolving an unchanged asset is deduplicated by the
/// staleness guard downstream. Eviction is a local detail, not pipeline
/// contract.
pub struct CachedAssetSource {
    cache: Mutex<LruCache<String, ResolvedAsset>>,
    fetch: Box<dyn Fn(&str) -> Result<Vec<u8>, String> + Send + Sync>,
}

impl CachedAssetSource {
    pub fn new<F>(capacity: usize, fetch: F) -> Self
    where
        F: Fn(&str) -> Result<Vec<u8>, String> + Send + Sync + 'static,
    {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            fetch: Box::new(fetch),
        }
    }
}

impl AssetSource for CachedAssetSource {
    fn get_cached_or_fetch(&self, url: &str) -> ResolvedAsset {
        if url.is_empty() {
            return failed_asset(url, now_millis());
        }
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(asset) = cache.get(url) {
                return asset.clone();
            }
        }
        match (self.fetch)(url) {
            Ok(data) => {
                let asset = ResolvedAsset {
                    id: texture_id(url),
                    data,
                    resolved_at: now_millis(),
                    failed: false,
                };
                if let Ok(mut cache) = self.cache.lock() {
                    cache.put(url.to_string(), asset.clone());
                }
                asset
            }
            Err(err) => {
                logging::log_debug(&format!("asset fetch failed for {url}: {err}"));
                failed_asset(url, now_millis())
            }
        }
    }
}
