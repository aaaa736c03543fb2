pub mod appearance;
pub mod config;
pub mod net;
pub mod tasks;
pub mod telemetry;

pub use appearance::identity::{
    extract_identity, try_extract_identity, AssetIdentity, GameProfile, IdentityError,
    ProfileProperty,
};
pub use appearance::payload::{ClientPayload, PayloadError};
pub use appearance::provider::{
    default_skin, empty_cape, texture_id, AssetSource, CachedAssetSource, CapeProvider,
    ResolvedAsset, SkinAndCape, DEFAULT_SKIN_ID, EMPTY_CAPE_ID,
};
pub use appearance::raster::{decode_legacy, RasterError, RawSkin};
pub use appearance::resolver::{resolve_assets, ResolveRequest};
pub use appearance::update::{
    apply_resolved, build_cached_entry, build_default_entry, request_and_refresh,
    EntityAppearanceState, PeerEntity,
};
pub use config::{ProxyConfig, TrustMode};
pub use net::packet::{PacketReader, PacketWriter};
pub use net::visual_list::{
    geometry_descriptor, Connection, OutgoingAppearanceUpdate, VisualListAction, VisualListPacket,
};
pub use tasks::{Completer, Promise, WorkerPool};

/// Opens the log files under `root` and applies the configured debug
/// toggle. Call once at proxy startup, before any session work.
pub fn init_telemetry(root: &std::path::Path, config: &ProxyConfig) -> Result<(), String> {
    telemetry::logging::init(root)?;
    telemetry::logging::set_debug(config.debug_logging);
    Ok(())
}
