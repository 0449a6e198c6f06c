use std::{
    fs,
    io::{self, BufRead, BufReader, Read},
    path::PathBuf,
    thread::{self, JoinHandle},
};

use crossbeam::channel::{Receiver, Sender};
use thiserror::Error;
use xz2::read::XzDecoder;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("trace line {line}: cannot parse `{text}`")]
    Parse { line: usize, text: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Read,
    Write(u32),
}

/// One trace record: an address and the operation applied to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub addr: usize,
    pub op: Op,
}

type Batch = Result<Vec<Access>, TraceError>;

/// Streams batches of accesses from a reader thread through a bounded
/// queue, so parsing overlaps simulation.
pub struct Trace {
    pub rec: Receiver<Batch>,
    _thread: JoinHandle<()>,
}

impl Trace {
    /// Replay a trace file. Files ending in `.xz` are decompressed on the
    /// fly. Format: one access per line, `r <addr>` or `w <addr> <value>`,
    /// numbers decimal or 0x-hex, `#` starts a comment.
    pub fn read(path: PathBuf, per_batch: usize, batches_per_queue: usize) -> io::Result<Trace> {
        let stream = fs::File::open(&path)?;
        let stream: Box<dyn Read + Send> = if path.extension().is_some_and(|ext| ext == "xz") {
            Box::new(XzDecoder::new(stream))
        } else {
            Box::new(stream)
        };
        let (sender, receiver) = crossbeam::channel::bounded(batches_per_queue);

        let t = thread::spawn(move || Trace::run_reader(stream, per_batch, sender));

        Ok(Trace {
            rec: receiver,
            _thread: t,
        })
    }

    /// Generate `count` pseudo-random accesses over `addr_space` bytes.
    /// Deterministic per seed; roughly one access in eight is a write.
    pub fn synthetic(
        count: u64,
        addr_space: usize,
        seed: u64,
        per_batch: usize,
        batches_per_queue: usize,
    ) -> Trace {
        let (sender, receiver) = crossbeam::channel::bounded(batches_per_queue);

        let t = thread::spawn(move || Trace::run_synth(count, addr_space, seed, per_batch, sender));

        Trace {
            rec: receiver,
            _thread: t,
        }
    }

    fn run_reader(stream: Box<dyn Read + Send>, per_batch: usize, queue: Sender<Batch>) {
        let mut lines = BufReader::new(stream).lines();
        let mut line_no = 0;
        loop {
            let mut batch = Vec::with_capacity(per_batch);
            let mut eof = false;
            while batch.len() < per_batch {
                let Some(next) = lines.next() else {
                    eof = true;
                    break;
                };
                line_no += 1;
                let text = match next {
                    Ok(text) => text,
                    Err(err) => {
                        let _ = queue.send(Err(err.into()));
                        return;
                    }
                };
                match parse_line(&text) {
                    Ok(Some(access)) => batch.push(access),
                    Ok(None) => {}
                    Err(()) => {
                        let _ = queue.send(Err(TraceError::Parse { line: line_no, text }));
                        return;
                    }
                }
            }
            if !batch.is_empty() && queue.send(Ok(batch)).is_err() {
                return;
            }
            if eof {
                return;
            }
        }
    }

    fn run_synth(count: u64, addr_space: usize, seed: u64, per_batch: usize, queue: Sender<Batch>) {
        let mut rng = fastrand::Rng::with_seed(seed);
        let mut left = count;
        while left > 0 {
            let n = per_batch.min(left as usize);
            let mut batch = Vec::with_capacity(n);
            for _ in 0..n {
                let addr = rng.usize(0..addr_space);
                let op = if rng.u8(0..8) == 0 {
                    Op::Write(rng.u32(..))
                } else {
                    Op::Read
                };
                batch.push(Access { addr, op });
            }
            left -= n as u64;
            if queue.send(Ok(batch)).is_err() {
                return;
            }
        }
    }
}

fn parse_line(text: &str) -> Result<Option<Access>, ()> {
    let text = match text.split_once('#') {
        Some((before, _comment)) => before,
        None => text,
    }
    .trim();
    if text.is_empty() {
        return Ok(None);
    }

    let mut fields = text.split_whitespace();
    let op = fields.next().ok_or(())?;
    let addr = parse_num(fields.next().ok_or(())?)? as usize;
    let access = match op {
        "r" | "R" => Access { addr, op: Op::Read },
        "w" | "W" => {
            let value = u32::try_from(parse_num(fields.next().ok_or(())?)?).map_err(|_| ())?;
            Access {
                addr,
                op: Op::Write(value),
            }
        }
        _ => return Err(()),
    };
    if fields.next().is_some() {
        return Err(());
    }
    Ok(Some(access))
}

fn parse_num(text: &str) -> Result<u64, ()> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    }
    .map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn drain(trace: Trace) -> Vec<Access> {
        trace
            .rec
            .iter()
            .flat_map(|batch| batch.unwrap())
            .collect()
    }

    #[test]
    fn parses_reads_and_writes() {
        assert_eq!(
            parse_line("r 0x1f00"),
            Ok(Some(Access {
                addr: 0x1f00,
                op: Op::Read
            }))
        );
        assert_eq!(
            parse_line("w 256 0xdeadbeef"),
            Ok(Some(Access {
                addr: 256,
                op: Op::Write(0xdead_beef)
            }))
        );
        assert_eq!(
            parse_line("R 0X10  # trailing comment"),
            Ok(Some(Access {
                addr: 0x10,
                op: Op::Read
            }))
        );
    }

    #[test]
    fn skips_blanks_and_comments() {
        assert_eq!(parse_line(""), Ok(None));
        assert_eq!(parse_line("   "), Ok(None));
        assert_eq!(parse_line("# a comment"), Ok(None));
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(parse_line("x 0x10"), Err(()));
        assert_eq!(parse_line("r"), Err(()));
        assert_eq!(parse_line("r zzz"), Err(()));
        assert_eq!(parse_line("w 0x10"), Err(()));
        assert_eq!(parse_line("w 0x10 5000000000"), Err(()));
        assert_eq!(parse_line("r 0x10 extra"), Err(()));
    }

    #[test]
    fn file_replay_batches_every_record_in_order() {
        let path = std::env::temp_dir().join("cachesim_trace_replay_test.txt");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "# header comment").unwrap();
        for i in 0..10 {
            writeln!(file, "r {:#x}", i * 16).unwrap();
        }
        writeln!(file, "w 0x40 7").unwrap();
        drop(file);

        let trace = Trace::read(path.clone(), 4, 2).unwrap();
        let accesses = drain(trace);
        fs::remove_file(path).unwrap();

        assert_eq!(accesses.len(), 11);
        assert_eq!(
            accesses[0],
            Access {
                addr: 0,
                op: Op::Read
            }
        );
        assert_eq!(
            accesses[10],
            Access {
                addr: 0x40,
                op: Op::Write(7)
            }
        );
    }

    #[test]
    fn parse_errors_name_the_line() {
        let path = std::env::temp_dir().join("cachesim_trace_error_test.txt");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "r 0x10").unwrap();
        writeln!(file, "bogus line").unwrap();
        drop(file);

        let trace = Trace::read(path.clone(), 4, 2).unwrap();
        let batches: Vec<Batch> = trace.rec.iter().collect();
        fs::remove_file(path).unwrap();

        match batches.last().unwrap() {
            Err(TraceError::Parse { line, .. }) => assert_eq!(*line, 2),
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn synthetic_traces_are_deterministic_per_seed() {
        let first = drain(Trace::synthetic(100, 1 << 16, 7, 32, 4));
        let second = drain(Trace::synthetic(100, 1 << 16, 7, 32, 4));
        assert_eq!(first.len(), 100);
        assert_eq!(first, second);
        assert!(first.iter().all(|access| access.addr < (1 << 16)));
        assert!(first.iter().any(|access| matches!(access.op, Op::Write(_))));
    }
}
