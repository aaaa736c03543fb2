use crate::appearance::raster::RawSkin;
use crate::net::packet::PacketWriter;

pub const OPCODE_VISUAL_LIST: u8 = 0x3f;

pub const GEOMETRY_DEFAULT: &str = "geometry.humanoid";
pub const GEOMETRY_CUSTOM: &str = "geometry.humanoid.custom";
pub const GEOMETRY_CUSTOM_SLIM: &str = "geometry.humanoid.customSlim";

/// Body-model descriptor understood by clients:
/// `{"geometry":{"default":"<name>"}}`.
pub fn geometry_descriptor(body_model_name: &str) -> String {
    format!("{{\"geometry\":{{\"default\":\"{body_model_name}\"}}}}")
}

/// One visual list entry. Entries are immutable once announced on the wire;
/// changing any field requires retracting and re-announcing the entry,
/// which is why updates travel as a remove+add pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingAppearanceUpdate {
    pub entity_id: u64,
    pub display_name: String,
    /// Stable skin identifier string.
    pub skin_id: String,
    pub skin: RawSkin,
    pub cape_id: String,
    pub cape_data: Vec<u8>,
    pub body_model_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualListAction {
    Add = 0,
    Remove = 1,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualListPacket {
    pub action: VisualListAction,
    pub entries: Vec<OutgoingAppearanceUpdate>,
}

impl VisualListPacket {
    pub fn add(entry: OutgoingAppearanceUpdate) -> Self {
        Self {
            action: VisualListAction::Add,
            entries: vec![entry],
        }
    }

    pub fn remove(entry: OutgoingAppearanceUpdate) -> Self {
        Self {
            action: VisualListAction::Remove,
            entries: vec![entry],
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = PacketWriter::new();
        writer.write_u8(OPCODE_VISUAL_LIST);
        writer.write_u8(self.action as u8);
        writer.write_u32_le(self.entries.len() as u32);
        for entry in &self.entries {
            writer.write_u64_le(entry.entity_id);
            // Retractions are keyed by entity id alone.
            if self.action == VisualListAction::Remove {
                continue;
            }
            writer.write_string(&entry.display_name);
            writer.write_string(&entry.skin_id);
            writer.write_u32_le(entry.skin.width);
            writer.write_u32_le(entry.skin.height);
            writer.write_blob(&entry.skin.pixels);
            writer.write_string(&entry.cape_id);
            writer.write_blob(&entry.cape_data);
            writer.write_string(&geometry_descriptor(&entry.body_model_name));
        }
        writer.into_vec()
    }
}

/// Outbound seam towards one connected peer. `send_packet` must not be
/// called before the handshake completes; `is_initialized` reports that.
pub trait Connection: Send + Sync {
    fn is_initialized(&self) -> bool;
    fn send_packet(&self, packet: &VisualListPacket) -> Result<(), String>;
}
