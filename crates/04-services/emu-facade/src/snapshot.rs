use aesp_wire::payloads::RegisterFile;

/// `save_state`/`restore_state` produce and consume this opaque blob: a
/// magic/version prefix, a `serde_json`-encoded header (small, human-
/// inspectable if dumped), and the raw 64 KiB memory image appended after
/// it. The memory image is not JSON-encoded — base64 or a byte-array
/// literal would roughly triple its size for no benefit, since nothing
/// but this crate ever reads it back.
const MAGIC: &[u8; 8] = b"AESPSTAT";
const VERSION: u8 = 1;

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Header {
    registers: RegisterFile,
    frame_counter: u64,
    disks: Vec<(u8, String)>,
}

pub struct Snapshot {
    pub registers: RegisterFile,
    pub frame_counter: u64,
    pub disks: Vec<(u8, String)>,
    pub memory: Vec<u8>,
}

pub fn encode(snap: &Snapshot) -> Vec<u8> {
    let header = Header {
        registers: snap.registers,
        frame_counter: snap.frame_counter,
        disks: snap.disks.clone(),
    };
    let header_bytes = serde_json::to_vec(&header).expect("header serialization cannot fail");

    let mut out = Vec::with_capacity(MAGIC.len() + 1 + 4 + header_bytes.len() + snap.memory.len());
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    out.extend_from_slice(&(header_bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(&header_bytes);
    out.extend_from_slice(&snap.memory);
    out
}

pub fn decode(blob: &[u8]) -> Result<Snapshot, String> {
    if blob.len() < MAGIC.len() + 1 + 4 {
        return Err("state blob truncated before header length".to_string());
    }
    if &blob[..MAGIC.len()] != MAGIC {
        return Err("state blob has an unrecognized magic".to_string());
    }
    let mut offset = MAGIC.len();
    let version = blob[offset];
    offset += 1;
    if version != VERSION {
        return Err(format!("state blob has unsupported version {version}"));
    }
    let header_len = u32::from_be_bytes(blob[offset..offset + 4].try_into().unwrap()) as usize;
    offset += 4;

    let header_end = offset
        .checked_add(header_len)
        .filter(|&end| end <= blob.len())
        .ok_or_else(|| "state blob truncated before end of header".to_string())?;
    let header: Header = serde_json::from_slice(&blob[offset..header_end])
        .map_err(|e| format!("malformed state header: {e}"))?;

    Ok(Snapshot {
        registers: header.registers,
        frame_counter: header.frame_counter,
        disks: header.disks,
        memory: blob[header_end..].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_registers_disks_and_memory() {
        let mut memory = vec![0u8; 0x10000];
        memory[0x0600] = 0xA9;
        let snap = Snapshot {
            registers: RegisterFile {
                a: 1,
                x: 2,
                y: 3,
                s: 0xFD,
                p: 0x24,
                pc: 0x0600,
            },
            frame_counter: 42,
            disks: vec![(1, "/disks/dos.atr".to_string())],
            memory,
        };
        let blob = encode(&snap);
        let restored = decode(&blob).unwrap();
        assert_eq!(restored.registers, snap.registers);
        assert_eq!(restored.frame_counter, 42);
        assert_eq!(restored.disks, vec![(1, "/disks/dos.atr".to_string())]);
        assert_eq!(restored.memory[0x0600], 0xA9);
        assert_eq!(restored.memory.len(), 0x10000);
    }

    #[test]
    fn rejects_bad_magic() {
        let blob = vec![0u8; 32];
        assert!(decode(&blob).is_err());
    }

    #[test]
    fn rejects_truncated_header() {
        let mut blob = MAGIC.to_vec();
        blob.push(VERSION);
        blob.extend_from_slice(&100u32.to_be_bytes());
        assert!(decode(&blob).is_err());
    }
}
