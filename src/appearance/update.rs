use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::appearance::identity::{extract_identity, AssetIdentity, GameProfile};
use crate::appearance::provider::{
    default_skin, empty_cape, now_millis, AssetSource, ResolvedAsset, SkinAndCape,
};
use crate::appearance::raster::decode_legacy;
use crate::appearance::resolver::{resolve_blocking, ResolveRequest};
use crate::config::ProxyConfig;
use crate::net::visual_list::{
    Connection, OutgoingAppearanceUpdate, VisualListPacket, GEOMETRY_CUSTOM,
    GEOMETRY_CUSTOM_SLIM, GEOMETRY_DEFAULT,
};
use crate::tasks::WorkerPool;
use crate::telemetry::logging;

/// The proxy-side handle for one connected entity.
#[derive(Debug, Clone)]
pub struct PeerEntity {
    pub entity_id: u64,
    pub uuid: String,
    pub username: String,
}

/// Per-entity staleness gate. The single timestamp doubles as a version
/// counter: a resolution is applied only if it is strictly newer than the
/// last applied one, and the compare-then-write is one atomic step because
/// racing resolutions complete on arbitrary pool threads.
#[derive(Debug)]
pub struct EntityAppearanceState {
    last_update: AtomicI64,
}

impl Default for EntityAppearanceState {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityAppearanceState {
    pub fn new() -> Self {
        Self {
            last_update: AtomicI64::new(-1),
        }
    }

    pub fn last_update(&self) -> i64 {
        self.last_update.load(Ordering::SeqCst)
    }

    /// Advances the timestamp if `resolved_at` is newer. Returns whether
    /// this resolution won; exactly one caller wins per race.
    pub fn try_advance(&self, resolved_at: i64) -> bool {
        self.last_update
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                if resolved_at > current {
                    Some(resolved_at)
                } else {
                    None
                }
            })
            .is_ok()
    }
}

pub fn body_model_name(slim_model: bool) -> &'static str {
    if slim_model {
        GEOMETRY_CUSTOM_SLIM
    } else {
        GEOMETRY_CUSTOM
    }
}

fn build_entry(
    entity: &PeerEntity,
    skin_id: &str,
    skin_data: Vec<u8>,
    cape: &ResolvedAsset,
    body_model: &str,
) -> Result<OutgoingAppearanceUpdate, String> {
    let skin = decode_legacy(skin_data).map_err(|err| err.to_string())?;
    Ok(OutgoingAppearanceUpdate {
        entity_id: entity.entity_id,
        display_name: entity.username.clone(),
        skin_id: skin_id.to_string(),
        skin,
        cape_id: cape.id.clone(),
        cape_data: cape.data.clone(),
        body_model_name: body_model.to_string(),
    })
}

/// Entry for a peer whose assets are already resolved by the source.
/// Failed lookups fall back to the built-in defaults per asset.
pub fn build_cached_entry(
    entity: &PeerEntity,
    identity: &AssetIdentity,
    source: &dyn AssetSource,
) -> Result<OutgoingAppearanceUpdate, String> {
    let mut skin = source.get_cached_or_fetch(&identity.skin_url);
    if skin.failed {
        skin = default_skin(now_millis());
    }
    let mut cape = match &identity.cape_url {
        Some(url) => source.get_cached_or_fetch(url),
        None => empty_cape(now_millis()),
    };
    if cape.failed {
        cape = empty_cape(now_millis());
    }
    let skin_id = skin.id.clone();
    build_entry(
        entity,
        &skin_id,
        skin.data,
        &cape,
        body_model_name(identity.slim_model),
    )
}

/// Entry showing the built-in default body and no cape.
pub fn build_default_entry(entity: &PeerEntity) -> Result<OutgoingAppearanceUpdate, String> {
    let skin = default_skin(now_millis());
    let skin_id = skin.id.clone();
    build_entry(
        entity,
        &skin_id,
        skin.data,
        &empty_cape(now_millis()),
        GEOMETRY_DEFAULT,
    )
}

/// Replace on the wire: retract the entry, then re-announce it. The list
/// protocol has no in-place update.
fn send_replace(conn: &dyn Connection, update: &OutgoingAppearanceUpdate) -> Result<(), String> {
    conn.send_packet(&VisualListPacket::remove(update.clone()))?;
    conn.send_packet(&VisualListPacket::add(update.clone()))
}

/// Applies one resolution to a connected peer. Emits at most one update:
/// stale results are discarded by the timestamp gate, results for a channel
/// that never finished its handshake are dropped, and emit failures are
/// logged with the entity id and swallowed. Nothing here may tear down the
/// connection.
pub fn apply_resolved(
    entity: &PeerEntity,
    state: &EntityAppearanceState,
    identity: &AssetIdentity,
    resolved: &SkinAndCape,
    conn: &dyn Connection,
) -> bool {
    if !state.try_advance(resolved.skin.resolved_at) {
        return false;
    }
    if !conn.is_initialized() {
        return false;
    }
    let entry = build_entry(
        entity,
        &resolved.skin.id,
        resolved.skin.data.clone(),
        &resolved.cape,
        body_model_name(identity.slim_model),
    );
    match entry.and_then(|update| send_replace(conn, &update)) {
        Ok(()) => {
            logging::log_session(&format!(
                "appearance refreshed for {} ({})",
                entity.username, entity.uuid
            ));
            true
        }
        Err(err) => {
            logging::log_error(&format!(
                "appearance update failed for {}: {}",
                entity.uuid, err
            ));
            false
        }
    }
}

/// End-to-end driver: extract the identity from the profile, resolve the
/// assets off-thread, then apply the result through the staleness gate.
/// An optional callback observes the resolved pair either way.
#[allow(clippy::too_many_arguments)]
pub fn request_and_refresh(
    pool: &WorkerPool,
    source: Arc<dyn AssetSource>,
    config: &ProxyConfig,
    profile: GameProfile,
    entity: PeerEntity,
    state: Arc<EntityAppearanceState>,
    conn: Arc<dyn Connection>,
    on_complete: Option<Box<dyn FnOnce(SkinAndCape) + Send>>,
) {
    let config = config.clone();
    pool.execute(move || {
        let identity = extract_identity(&profile, &config);
        let request = ResolveRequest {
            entity_uuid: entity.uuid.clone(),
            username: entity.username.clone(),
            identity: identity.clone(),
        };
        let resolved = resolve_blocking(
            &source,
            &request,
            config.allow_third_party_capes,
            config.cape_provider_retry_factor,
        );
        apply_resolved(&entity, &state, &identity, &resolved, conn.as_ref());
        if let Some(callback) = on_complete {
            callback(resolved);
        }
    });
}
