//! The hashing contract behind every deterministic selection.
//!
//! Every replica has to land on the same ring from the same inputs, so the
//! byte layout, the digest, and the word extraction here are fixed:
//!
//! - a list of identifiers is encoded as `len (u64 LE) ‖ utf8 bytes` per item
//! - the digest is SHA-256 of that encoding
//! - a digest yields four big-endian `u64` words
//! - an index is `word mod bound`

use sha2::{Digest as _, Sha256};

pub type Digest = [u8; 32];

const WORDS_PER_DIGEST: usize = 4;

fn encode_into<I, S>(hasher: &mut Sha256, items: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for item in items {
        let bytes = item.as_ref().as_bytes();
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    }
}

/// SHA-256 over the canonical encoding of `items`.
pub fn digest<I, S>(items: I) -> Digest
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = Sha256::new();
    encode_into(&mut hasher, items);
    hasher.finalize().into()
}

/// Hex form of [`digest`]; used for ring and fractal IDs.
pub fn hash_id<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    hex::encode(digest(items))
}

#[must_use]
pub fn words(digest: &Digest) -> [u64; WORDS_PER_DIGEST] {
    let mut out = [0u64; WORDS_PER_DIGEST];
    for (slot, chunk) in out.iter_mut().zip(digest.chunks_exact(8)) {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(chunk);
        *slot = u64::from_be_bytes(buf);
    }
    out
}

/// XOR of the four digest words. Folds a whole list into one number.
pub fn digest_word<I, S>(items: I) -> u64
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    words(&digest(items)).iter().fold(0, |acc, w| acc ^ w)
}

/// `word mod bound` as an index. `bound` must be non-zero.
#[must_use]
pub fn pick_index(word: u64, bound: usize) -> usize {
    (word % bound as u64) as usize
}

/// A bounded stream of words drawn from a chain of digests.
///
/// Once the four words of the current digest are used up, the next digest is
/// `SHA-256(current ‖ encode(selection))` where `selection` is whatever the
/// caller has picked so far.
#[derive(Debug, Clone)]
pub struct HashStream {
    current: Digest,
    words: [u64; WORDS_PER_DIGEST],
    cursor: usize,
}

impl HashStream {
    #[must_use]
    pub fn new(seed: Digest) -> Self {
        Self {
            current: seed,
            words: words(&seed),
            cursor: 0,
        }
    }

    pub fn next_word<S: AsRef<str>>(&mut self, selection: &[S]) -> u64 {
        if self.cursor == WORDS_PER_DIGEST {
            self.refill(selection);
        }
        let word = self.words[self.cursor];
        self.cursor += 1;
        word
    }

    pub fn next_index<S: AsRef<str>>(&mut self, bound: usize, selection: &[S]) -> usize {
        pick_index(self.next_word(selection), bound)
    }

    fn refill<S: AsRef<str>>(&mut self, selection: &[S]) {
        let mut hasher = Sha256::new();
        hasher.update(self.current);
        encode_into(&mut hasher, selection.iter());
        self.current = hasher.finalize().into();
        self.words = words(&self.current);
        self.cursor = 0;
    }
}

/// Picks `k` items from `pool` without replacement (remove-and-compact).
///
/// Step `i` swaps position `i` with `i + next_word mod (len - i)`. Returns the
/// chosen prefix and the remainder, or `None` when the pool is smaller than
/// `k`. Callers pass pools in sorted order.
pub fn sample(pool: &[String], k: usize, seed: Digest) -> Option<(Vec<String>, Vec<String>)> {
    if pool.len() < k {
        return None;
    }
    let mut arr = pool.to_vec();
    let mut stream = HashStream::new(seed);
    for i in 0..k {
        let offset = stream.next_index(arr.len() - i, &arr[..i]);
        arr.swap(i, i + offset);
    }
    let rest = arr.split_off(k);
    Some((arr, rest))
}
