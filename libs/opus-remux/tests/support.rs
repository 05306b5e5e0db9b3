use std::fs;
use std::path::{Path, PathBuf};

use ogg::writing::{PacketWriteEndInfo, PacketWriter};

/// Light-weight representation of an MP4 box used for parsing tests.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub struct Mp4Box {
    pub typ: [u8; 4],
    pub size: usize,
    pub offset: usize,
}

impl Mp4Box {
    /// Return the payload that immediately follows the box header.
    #[allow(dead_code)]
    pub fn payload<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[self.offset + 8..self.offset + self.size]
    }
}

/// Parses sibling boxes from the provided data.
#[allow(dead_code)]
pub fn parse_boxes(data: &[u8]) -> Vec<Mp4Box> {
    let mut boxes = Vec::new();
    let mut cursor = 0;

    while cursor + 8 <= data.len() {
        let size = be_u32(&data[cursor..]) as usize;
        if size < 8 || cursor + size > data.len() {
            break;
        }
        let typ = data[cursor + 4..cursor + 8].try_into().unwrap();
        boxes.push(Mp4Box {
            typ,
            size,
            offset: cursor,
        });
        cursor += size;
    }

    boxes
}

/// Bytes to skip before the children of a container box.
fn child_start(typ: &[u8; 4]) -> Option<usize> {
    match typ {
        b"moov" | b"trak" | b"edts" | b"mdia" | b"minf" | b"dinf" | b"stbl" => Some(0),
        // full box header + entry count
        b"dref" | b"stsd" => Some(8),
        // audio sample entry fields
        b"Opus" => Some(28),
        _ => None,
    }
}

/// Payload of the box at `path`, e.g. `["moov", "trak", "mdia"]`.
#[allow(dead_code)]
pub fn find_box<'a>(data: &'a [u8], path: &[&str]) -> Option<&'a [u8]> {
    let (first, rest) = path.split_first()?;
    let found = parse_boxes(data)
        .into_iter()
        .find(|b| b.typ == first.as_bytes())?;
    let payload = found.payload(data);
    if rest.is_empty() {
        return Some(payload);
    }
    let skip = child_start(&found.typ)?;
    find_box(&payload[skip..], rest)
}

/// Checks every declared box length, recursing into containers.
#[allow(dead_code)]
pub fn assert_tree_consistent(data: &[u8]) {
    let boxes = parse_boxes(data);
    let covered: usize = boxes.iter().map(|b| b.size).sum();
    assert_eq!(covered, data.len(), "sibling boxes must cover their parent");
    for b in boxes {
        if let Some(skip) = child_start(&b.typ) {
            assert_tree_consistent(&b.payload(data)[skip..]);
        }
    }
}

#[allow(dead_code)]
pub fn be_u32(data: &[u8]) -> u32 {
    u32::from_be_bytes(data[0..4].try_into().unwrap())
}

#[allow(dead_code)]
pub fn be_u16(data: &[u8]) -> u16 {
    u16::from_be_bytes(data[0..2].try_into().unwrap())
}

/// `OpusHead` for mapping family 0.
#[allow(dead_code)]
pub fn opus_head(channels: u8, pre_skip: u16) -> Vec<u8> {
    let mut packet = b"OpusHead".to_vec();
    packet.push(1);
    packet.push(channels);
    packet.extend_from_slice(&pre_skip.to_le_bytes());
    packet.extend_from_slice(&48000u32.to_le_bytes());
    packet.extend_from_slice(&0i16.to_le_bytes());
    packet.push(0);
    packet
}

#[allow(dead_code)]
pub fn opus_tags() -> Vec<u8> {
    let mut packet = b"OpusTags".to_vec();
    let vendor = b"opus-remux tests";
    packet.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
    packet.extend_from_slice(vendor);
    packet.extend_from_slice(&0u32.to_le_bytes());
    packet
}

/// Headers followed by `count` packets of `size` bytes, all starting with `toc`.
#[allow(dead_code)]
pub fn opus_stream(
    channels: u8,
    pre_skip: u16,
    toc: u8,
    count: usize,
    size: usize,
) -> Vec<Vec<u8>> {
    let mut packets = vec![opus_head(channels, pre_skip), opus_tags()];
    packets.extend((0..count).map(|i| {
        let mut packet = vec![(i % 251) as u8; size];
        packet[0] = toc;
        packet
    }));
    packets
}

/// Encode packets as one logical Ogg stream, one packet per page.
#[allow(dead_code)]
pub fn ogg_bytes(serial: u32, packets: &[Vec<u8>]) -> Vec<u8> {
    interleaved_ogg_bytes(&[(serial, packets)])
}

/// Encode several logical streams, interleaving their pages round robin.
#[allow(dead_code)]
pub fn interleaved_ogg_bytes(streams: &[(u32, &[Vec<u8>])]) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut writer = PacketWriter::new(&mut out);
        let longest = streams.iter().map(|(_, p)| p.len()).max().unwrap_or(0);
        for index in 0..longest {
            for (serial, packets) in streams {
                let Some(packet) = packets.get(index) else {
                    continue;
                };
                let info = if index + 1 == packets.len() {
                    PacketWriteEndInfo::EndStream
                } else {
                    PacketWriteEndInfo::EndPage
                };
                writer
                    .write_packet(packet.clone(), *serial, info, index as u64 * 960)
                    .unwrap();
            }
        }
    }
    out
}

#[allow(dead_code)]
pub fn write_ogg(dir: &Path, name: &str, packets: &[Vec<u8>]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, ogg_bytes(0x5EED, packets)).unwrap();
    path
}
