//! Ogg Opus file in, fast-start MP4 out.

mod support;

use std::error::Error;
use std::fs;
use std::io::Cursor;

use opus_remux::ogg::OggPacketSource;
use opus_remux::{remux, RemuxError, Remuxer};
use support::{
    assert_tree_consistent, be_u16, be_u32, find_box, interleaved_ogg_bytes, opus_head,
    opus_stream, opus_tags, parse_boxes, write_ogg,
};

#[test]
fn fifty_packet_stereo_stream() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let source = write_ogg(dir.path(), "in.opus", &opus_stream(2, 312, 0x08, 50, 50));
    let destination = dir.path().join("out.mp4");

    let stats = remux(&source, &destination)?;
    let out = fs::read(&destination)?;
    assert_eq!(stats.bytes_written, out.len() as u64);
    assert_tree_consistent(&out);

    let top = parse_boxes(&out);
    let order: Vec<&[u8; 4]> = top.iter().map(|b| &b.typ).collect();
    assert_eq!(order, vec![b"ftyp", b"moov", b"mdat"]);

    let (ftyp, moov, mdat) = (top[0], top[1], top[2]);
    assert_eq!(mdat.payload(&out).len(), 2500);

    let stbl = find_box(&out, &["moov", "trak", "mdia", "minf", "stbl"]).unwrap();
    let stsz = find_box(stbl, &["stsz"]).unwrap();
    assert_eq!(be_u32(&stsz[4..]), 0);
    assert_eq!(be_u32(&stsz[8..]), 50);
    for i in 0..50 {
        assert_eq!(be_u32(&stsz[12 + 4 * i..]), 50);
    }

    let stts = find_box(stbl, &["stts"]).unwrap();
    assert_eq!(be_u32(&stts[4..]), 1);
    assert_eq!(be_u32(&stts[8..]), 50);
    assert_eq!(be_u32(&stts[12..]), 960);

    let stco = find_box(stbl, &["stco"]).unwrap();
    assert_eq!(be_u32(&stco[4..]), 1);
    let offset = be_u32(&stco[8..]) as usize;
    assert_eq!(offset, ftyp.size + moov.size + 8);
    assert_eq!(offset, mdat.offset + 8);

    // Every sample sits where the tables say it does.
    let source_packets = opus_stream(2, 312, 0x08, 50, 50);
    assert_eq!(&out[offset..offset + 50], &source_packets[2][..]);
    assert_eq!(&out[offset + 49 * 50..offset + 50 * 50], &source_packets[51][..]);
    Ok(())
}

#[test]
fn track_headers_follow_the_opus_config() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let source = write_ogg(dir.path(), "in.opus", &opus_stream(1, 312, 0x08, 10, 20));
    let mut out = Vec::new();
    let mut packets = OggPacketSource::new(Cursor::new(fs::read(&source)?));
    Remuxer::new()
        .with_creation_time(0)
        .remux_to_writer(&mut packets, &mut out)?;

    let mvhd = find_box(&out, &["moov", "mvhd"]).unwrap();
    assert_eq!(be_u32(&mvhd[4..]), 2_082_844_800); // creation time
    assert_eq!(be_u32(&mvhd[12..]), 48000);
    assert_eq!(be_u32(&mvhd[16..]), 9600);

    let tkhd = find_box(&out, &["moov", "trak", "tkhd"]).unwrap();
    assert_eq!(&tkhd[0..4], &[0, 0, 0, 3]);
    assert_eq!(be_u32(&tkhd[20..]), 9600 - 312);

    let elst = find_box(&out, &["moov", "trak", "edts", "elst"]).unwrap();
    assert_eq!(be_u32(&elst[4..]), 1);
    assert_eq!(be_u32(&elst[8..]), 9600 - 312);
    assert_eq!(be_u32(&elst[12..]), 312);

    let mdhd = find_box(&out, &["moov", "trak", "mdia", "mdhd"]).unwrap();
    assert_eq!(be_u32(&mdhd[12..]), 48000);
    assert_eq!(be_u16(&mdhd[20..]), 0x55C4);

    let hdlr = find_box(&out, &["moov", "trak", "mdia", "hdlr"]).unwrap();
    assert_eq!(&hdlr[8..12], b"soun");

    let dops = find_box(
        &out,
        &["moov", "trak", "mdia", "minf", "stbl", "stsd", "Opus", "dOps"],
    )
    .unwrap();
    assert_eq!(dops[0], 0);
    assert_eq!(dops[1], 1);
    assert_eq!(be_u16(&dops[2..]), 312);
    assert_eq!(be_u32(&dops[4..]), 48000);
    Ok(())
}

#[test]
fn roll_groups_cover_every_sample() -> Result<(), Box<dyn Error>> {
    let mut out = Vec::new();
    Remuxer::new()
        .with_creation_time(0)
        .remux_to_writer(opus_stream(2, 0, 0x08, 100, 3).into_iter(), &mut out)?;

    let stbl = find_box(&out, &["moov", "trak", "mdia", "minf", "stbl"]).unwrap();
    let sgpd = find_box(stbl, &["sgpd"]).unwrap();
    assert_eq!(sgpd[0], 1); // version
    assert_eq!(&sgpd[4..8], b"roll");
    assert_eq!(i16::from_be_bytes([sgpd[16], sgpd[17]]), -4);

    let sbgp = find_box(stbl, &["sbgp"]).unwrap();
    assert_eq!(be_u32(&sbgp[8..]), 2);
    assert_eq!((be_u32(&sbgp[12..]), be_u32(&sbgp[16..])), (4, 0));
    assert_eq!((be_u32(&sbgp[20..]), be_u32(&sbgp[24..])), (96, 1));
    Ok(())
}

#[test]
fn missing_opus_head_writes_nothing() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let packets: Vec<Vec<u8>> = (0..5).map(|_| vec![0x08; 50]).collect();
    let source = write_ogg(dir.path(), "in.opus", &packets);
    let destination = dir.path().join("out.mp4");

    let err = remux(&source, &destination).unwrap_err();
    assert!(matches!(err, RemuxError::MissingConfiguration));
    assert!(!destination.exists());
    assert_eq!(fs::read_dir(dir.path())?.count(), 1);
    Ok(())
}

#[test]
fn empty_source_is_missing_configuration() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let source = dir.path().join("empty.opus");
    fs::write(&source, b"")?;
    let destination = dir.path().join("out.mp4");

    let err = remux(&source, &destination).unwrap_err();
    assert!(matches!(err, RemuxError::MissingConfiguration), "{err:?}");
    assert!(!destination.exists());
    assert_eq!(fs::read_dir(dir.path())?.count(), 1);
    Ok(())
}

#[test]
fn failed_remux_keeps_existing_destination() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let source = write_ogg(dir.path(), "in.opus", &[opus_tags(), opus_head(2, 0)]);
    let destination = dir.path().join("out.mp4");
    fs::write(&destination, b"previous")?;

    assert!(remux(&source, &destination).is_err());
    assert_eq!(fs::read(&destination)?, b"previous");
    Ok(())
}

#[test]
fn successful_remux_replaces_destination() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let source = write_ogg(dir.path(), "in.opus", &opus_stream(2, 312, 0x08, 3, 10));
    let destination = dir.path().join("out.mp4");
    fs::write(&destination, vec![0xFF; 10_000])?;

    let stats = remux(&source, &destination)?;
    let out = fs::read(&destination)?;
    assert_eq!(out.len() as u64, stats.bytes_written);
    assert_eq!(&out[4..8], b"ftyp");
    Ok(())
}

#[test]
fn only_first_logical_stream_is_used() -> Result<(), Box<dyn Error>> {
    let opus = opus_stream(2, 312, 0x08, 6, 40);
    let other: Vec<Vec<u8>> = (0..9).map(|_| vec![0x77; 13]).collect();
    let bytes = interleaved_ogg_bytes(&[(1, &opus), (2, &other)]);

    let mut out = Vec::new();
    let stats = Remuxer::new()
        .with_creation_time(0)
        .remux_to_writer(OggPacketSource::new(Cursor::new(bytes)), &mut out)?;
    assert_eq!(stats.audio_packets, 6);

    let mdat = parse_boxes(&out)[2];
    assert_eq!(mdat.payload(&out).len(), 240);
    assert!(!mdat.payload(&out).contains(&0x77));
    Ok(())
}

#[test]
fn headers_only_stream_is_a_valid_empty_track() -> Result<(), Box<dyn Error>> {
    let mut out = Vec::new();
    let stats = Remuxer::new()
        .with_creation_time(0)
        .remux_to_writer(vec![opus_head(2, 312), opus_tags()].into_iter(), &mut out)?;
    assert_eq!(stats.audio_packets, 0);
    assert_eq!(stats.playable_duration, 0);
    assert_tree_consistent(&out);

    let stbl = find_box(&out, &["moov", "trak", "mdia", "minf", "stbl"]).unwrap();
    assert_eq!(be_u32(&find_box(stbl, &["stco"]).unwrap()[4..]), 0);
    assert_eq!(be_u32(&find_box(stbl, &["stsc"]).unwrap()[4..]), 0);
    assert!(find_box(stbl, &["sgpd"]).is_none());
    assert!(find_box(stbl, &["sbgp"]).is_none());
    assert_eq!(parse_boxes(&out)[2].size, 8);
    Ok(())
}

#[test]
fn variable_durations_become_separate_runs() -> Result<(), Box<dyn Error>> {
    let mut packets = vec![opus_head(2, 0), opus_tags()];
    packets.extend([vec![0x08, 1], vec![0x08, 2], vec![0x00, 3], vec![0x19, 4]]);
    let mut out = Vec::new();
    let stats = Remuxer::new()
        .with_creation_time(0)
        .remux_to_writer(packets.into_iter(), &mut out)?;
    assert_eq!(stats.total_duration, 960 * 2 + 480 + 5760);

    let stts = find_box(&out, &["moov", "trak", "mdia", "minf", "stbl", "stts"]).unwrap();
    let runs: Vec<(u32, u32)> = (0..be_u32(&stts[4..]) as usize)
        .map(|i| (be_u32(&stts[8 + 8 * i..]), be_u32(&stts[12 + 8 * i..])))
        .collect();
    assert_eq!(runs, vec![(2, 960), (1, 480), (1, 5760)]);
    Ok(())
}
