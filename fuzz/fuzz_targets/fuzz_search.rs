#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use lieutenant::search::SearchIndex;

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    buffer: &'a str,
    pattern: &'a str,
    steps: Vec<bool>,
}

fuzz_target!(|input: Input| {
    // Searching and stepping must never panic, and every match must be a
    // valid slice of the buffer
    let mut index = SearchIndex::new();
    let Ok(matches) = index.search(input.buffer, input.pattern) else {
        return;
    };
    for m in matches {
        assert!(input.buffer.get(m.range()).is_some());
    }

    let count = index.matches().len();
    for forward in input.steps {
        let current = if forward { index.next() } else { index.previous() };
        if let Some(i) = current {
            assert!(i < count);
        }
        let (position, total) = index.status();
        assert!(position <= total);
    }
});
