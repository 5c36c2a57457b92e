use criterion::{criterion_group, criterion_main, Criterion};

use star_sas::{
    ContentHandler, DataItem, ErrorHandler, Flow, StarLexer, StreamHandler, TagValueHandler,
};

/// Counts callbacks without retaining anything.
#[derive(Default)]
struct CountingHandler {
    events: usize,
}

impl CountingHandler {
    fn bump(&mut self) -> Flow {
        self.events += 1;
        Flow::Continue
    }
}

impl ContentHandler for CountingHandler {
    fn start_data(&mut self, _line: u32, _name: &str) -> Flow {
        self.bump()
    }
    fn end_data(&mut self, _line: u32, _name: &str) {}
    fn start_loop(&mut self, _line: u32) -> Flow {
        self.bump()
    }
    fn end_loop(&mut self, _line: u32) -> Flow {
        self.bump()
    }
    fn comment(&mut self, _line: u32, _text: &str) -> Flow {
        self.bump()
    }
    fn data(&mut self, _item: &DataItem<'_>) -> Flow {
        self.bump()
    }
}

impl TagValueHandler for CountingHandler {
    fn start_data(&mut self, _line: u32, _name: &str) -> Flow {
        self.bump()
    }
    fn end_data(&mut self, _line: u32, _name: &str) {}
    fn start_loop(&mut self, _line: u32) -> Flow {
        self.bump()
    }
    fn end_loop(&mut self, _line: u32) -> Flow {
        self.bump()
    }
    fn comment(&mut self, _line: u32, _text: &str) -> Flow {
        self.bump()
    }
    fn tag(&mut self, _line: u32, _name: &str) -> Flow {
        self.bump()
    }
    fn value(&mut self, _line: u32, _text: &str, _delim: Option<star_sas::Delimiter>) -> Flow {
        self.bump()
    }
}

impl StreamHandler for CountingHandler {
    fn start_data(&mut self, _line: u32, _name: &str) -> Flow {
        self.bump()
    }
    fn end_data(&mut self, _line: u32, _name: &str) {}
    fn start_loop(&mut self, _line: u32) -> Flow {
        self.bump()
    }
    fn end_loop(&mut self, _line: u32) -> Flow {
        self.bump()
    }
    fn comment(&mut self, _line: u32, _text: &str) -> Flow {
        self.bump()
    }
    fn tag(&mut self, _line: u32, _name: &str) -> Flow {
        self.bump()
    }
    fn start_value(&mut self, _line: u32, _delim: Option<star_sas::Delimiter>) -> Flow {
        self.bump()
    }
    fn characters(&mut self, _line: u32, _text: &str) -> Flow {
        self.bump()
    }
    fn end_value(&mut self, _line: u32, _delim: Option<star_sas::Delimiter>) -> Flow {
        self.bump()
    }
}

/// Silently swallows diagnostics; the synthesized input is clean anyway.
#[derive(Default)]
struct QuietSink;

impl ErrorHandler for QuietSink {
    fn fatal(&mut self, _line: u32, _msg: &str) {}
    fn error(&mut self, _line: u32, _msg: &str) -> Flow {
        Flow::Stop
    }
    fn warning(&mut self, _line: u32, _msg: &str) -> Flow {
        Flow::Continue
    }
}

/// A synthetic NMR-STAR entry: many saveframes, each with a handful of items
/// and a loop, plus one large semicolon text field per frame.
fn synthesize_nmr_star(frames: usize, rows: usize) -> String {
    let mut out = String::from("data_synthetic\n");
    for frame in 0..frames {
        out.push_str(&format!("save_frame_{frame}\n"));
        out.push_str(&format!("_Frame.ID {frame}\n"));
        out.push_str("_Frame.Type 'assigned chemical shifts'\n");
        out.push_str("_Frame.Details\n;a multi-line description\nwith a second line\n;\n");
        out.push_str("loop_\n_Shift.ID\n_Shift.Value\n_Shift.Error\n");
        for row in 0..rows {
            out.push_str(&format!("{row} {}.{} 0.01\n", row % 170, row % 100));
        }
        out.push_str("stop_\nsave_\n");
    }
    out
}

fn parse_benchmarks(c: &mut Criterion) {
    let input = synthesize_nmr_star(50, 200);

    let mut group = c.benchmark_group("nmr-star");
    group.bench_function("item handler", |b| {
        b.iter(|| {
            let mut handler = CountingHandler::default();
            let mut sink = QuietSink;
            star_sas::parse_nmr_star(StarLexer::from_str(&input), &mut handler, &mut sink);
            handler.events
        })
    });
    group.bench_function("tag/value handler", |b| {
        b.iter(|| {
            let mut handler = CountingHandler::default();
            let mut sink = QuietSink;
            star_sas::parse_nmr_star_tag_value(StarLexer::from_str(&input), &mut handler, &mut sink);
            handler.events
        })
    });
    group.bench_function("streaming handler", |b| {
        b.iter(|| {
            let mut handler = CountingHandler::default();
            let mut sink = QuietSink;
            star_sas::parse_nmr_star_stream(StarLexer::from_str(&input), &mut handler, &mut sink);
            handler.events
        })
    });
    group.finish();
}

criterion_group!(benches, parse_benchmarks);
criterion_main!(benches);
