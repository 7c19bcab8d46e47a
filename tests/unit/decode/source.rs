use super::*;

fn drain(source: &mut dyn ByteSource) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    while let Some(chunk) = source.next_chunk().unwrap() {
        out.push(chunk);
    }
    out
}

#[test]
fn memory_source_chunks_in_order() {
    let mut src = MemorySource::new((0u8..10).collect(), 4);
    assert_eq!(src.len_hint(), Some(10));
    let chunks = drain(&mut src);
    assert_eq!(chunks, vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7], vec![8, 9]]);
    assert!(src.next_chunk().unwrap().is_none());
}

/// Reader that hands out at most three bytes per call.
struct Dribble(std::io::Cursor<Vec<u8>>);

impl Read for Dribble {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = buf.len().min(3);
        self.0.read(&mut buf[..n])
    }
}

#[test]
fn reader_source_fills_whole_chunks_from_short_reads() {
    let data: Vec<u8> = (0u8..20).collect();
    let mut src = ReaderSource::new(Dribble(std::io::Cursor::new(data.clone())), 8);
    assert_eq!(src.len_hint(), None);
    let chunks = drain(&mut src);
    assert_eq!(chunks.iter().map(Vec::len).collect::<Vec<_>>(), vec![8, 8, 4]);
    assert_eq!(chunks.concat(), data);
}

#[test]
fn empty_reader_ends_immediately() {
    let mut src = ReaderSource::new(std::io::empty(), 16);
    assert!(src.next_chunk().unwrap().is_none());
}

#[test]
fn opening_a_missing_file_fails() {
    let err = ReaderSource::open(Path::new("/definitely/not/here.mp4"), 1024)
        .err()
        .unwrap();
    assert!(err.to_string().contains("not/here.mp4"));
}
