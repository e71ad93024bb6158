/*
 * fuzz_targets/size_product.rs
 *
 * fuzz target for the checked size product. compares against u128
 * arithmetic done the same way: left to right, stop at the first
 * overflow, a leading zero wins.
 */

#![no_main]

use libfuzzer_sys::fuzz_target;
use portshim::SizeRequest;

fn word(chunk: &[u8]) -> usize {
    let mut buf = [0u8; core::mem::size_of::<usize>()];
    let n = chunk.len().min(buf.len());
    buf[..n].copy_from_slice(&chunk[..n]);
    usize::from_le_bytes(buf)
}

fn reference(factors: &[usize]) -> Option<usize> {
    if factors.first() == Some(&0) {
        return Some(0);
    }
    let mut acc: u128 = 1;
    for &f in factors {
        acc *= f as u128;
        if acc > usize::MAX as u128 {
            return None;
        }
    }
    Some(acc as usize)
}

fuzz_target!(|data: &[u8]| {
    let w = core::mem::size_of::<usize>();
    let mut words = data.chunks(w).map(word);
    let (Some(a), Some(b)) = (words.next(), words.next()) else {
        return;
    };

    let pair = SizeRequest::pair(a, b);
    assert_eq!(pair.product(), reference(&[a, b]));

    if let Some(c) = words.next() {
        let triple = SizeRequest::triple(a, b, c);
        assert_eq!(triple.product(), reference(&[a, b, c]));
    }
});
