use gix_packetline_blocking::{PacketLineRef, StreamingPeekableIter};
use gix_serve_core::{pktline, ServiceKind};

#[test]
fn service_preface_decodes_as_one_line_followed_by_flush() {
    for service in [ServiceKind::UploadPack, ServiceKind::ReceivePack] {
        let preface = pktline::service_preface(service).unwrap();
        let mut lines = StreamingPeekableIter::new(preface.as_slice(), &[PacketLineRef::Flush], false);

        let announcement = lines
            .read_line()
            .expect("one line")
            .expect("no io error")
            .expect("valid pkt-line");
        assert_eq!(
            announcement.as_slice(),
            Some(format!("# service=git-{service}\n").as_bytes())
        );

        assert!(lines.read_line().is_none(), "the flush packet ends the preface");
        assert_eq!(lines.stopped_at(), Some(PacketLineRef::Flush));
    }
}

#[test]
fn encoded_lines_are_readable_by_a_pkt_line_decoder() {
    let mut buf = Vec::new();
    for line in ["want 0123\n", "have 4567\n", "done\n"] {
        buf.extend(pktline::encode(line).unwrap());
    }
    pktline::write_flush(&mut buf).unwrap();

    let mut lines = StreamingPeekableIter::new(buf.as_slice(), &[PacketLineRef::Flush], false);
    let mut decoded = Vec::new();
    while let Some(line) = lines.read_line() {
        decoded.push(line.unwrap().unwrap().as_slice().unwrap().to_vec());
    }
    assert_eq!(
        decoded,
        vec![b"want 0123\n".to_vec(), b"have 4567\n".to_vec(), b"done\n".to_vec()]
    );
}
