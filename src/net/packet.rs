#[derive(Debug, Clone)]
pub struct PacketReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        let value = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(value)
    }

    pub fn read_u16_le(&mut self) -> Option<u16> {
        let bytes = self.read_bytes(2)?;
        Some(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32_le(&mut self) -> Option<u32> {
        let bytes = self.read_bytes(4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_u64_le(&mut self) -> Option<u64> {
        let low = self.read_u32_le()? as u64;
        let high = self.read_u32_le()? as u64;
        Some(low | (high << 32))
    }

    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.remaining() < len {
            return None;
        }
        let start = self.pos;
        self.pos += len;
        Some(&self.data[start..start + len])
    }

    /// u16-length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Option<String> {
        let len = self.read_u16_le()? as usize;
        let bytes = self.read_bytes(len)?;
        Some(String::from_utf8_lossy(bytes).to_string())
    }

    /// u32-length-prefixed byte blob, used for image payloads.
    pub fn read_blob(&mut self) -> Option<Vec<u8>> {
        let len = self.read_u32_le()? as usize;
        Some(self.read_bytes(len)?.to_vec())
    }
}

#[derive(Debug, Default, Clone)]
pub struct PacketWriter {
    data: Vec<u8>,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn write_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    pub fn write_u16_le(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32_le(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64_le(&mut self, value: u64) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_u16_le(value.len().min(u16::MAX as usize) as u16);
        self.write_bytes(&value.as_bytes()[..value.len().min(u16::MAX as usize)]);
    }

    pub fn write_blob(&mut self, bytes: &[u8]) {
        self.write_u32_le(bytes.len() as u32);
        self.write_bytes(bytes);
    }
}
