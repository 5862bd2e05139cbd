//! Canonical form of a request path.
//!
//! The rules, applied lexically over raw bytes:
//!
//! 1. The result is absolute; a missing leading `/` is added.
//! 2. Runs of `/` collapse to one.
//! 3. `.` segments are dropped.
//! 4. `..` drops itself and the segment before it. At the root it is dropped
//!    alone, so the result never climbs above `/`.
//! 5. A trailing `/` (or a final `.` segment) is kept unless the result is
//!    the root.
//!
//! Only `/` and `.` are special and both are compared as single ASCII bytes.
//! No percent-decoding takes place.
//!
//! Every surface shares one rewrite loop. When the input starts with `/` the
//! write cursor never passes the read cursor, so the rewrite happens in the
//! caller's storage. Only a missing leading `/` makes the result longer than
//! the input, and that is the one case which allocates.

use std::borrow::Cow;

use bytes::{BufMut, BytesMut};

const SEP: u8 = b'/';
const DOT: u8 = b'.';

/// Storage the rewrite loop reads from and writes to.
///
/// `input` is the unread source, `output` is what has been written so far.
/// In-place storage answers both from the same buffer.
trait Rewrite {
    fn input_len(&self) -> usize;
    fn input(&self, i: usize) -> u8;
    fn output(&self, i: usize) -> u8;
    fn put(&mut self, i: usize, b: u8);
}

struct InPlace<'a>(&'a mut [u8]);

impl Rewrite for InPlace<'_> {
    #[inline]
    fn input_len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    fn input(&self, i: usize) -> u8 {
        self.0[i]
    }

    #[inline]
    fn output(&self, i: usize) -> u8 {
        self.0[i]
    }

    #[inline]
    fn put(&mut self, i: usize, b: u8) {
        self.0[i] = b;
    }
}

/// Reads a borrowed path and only copies it once a written byte differs
/// from the byte already at that position.
struct CopyOnWrite<'a> {
    src: &'a [u8],
    buf: Option<Vec<u8>>,
}

impl Rewrite for CopyOnWrite<'_> {
    #[inline]
    fn input_len(&self) -> usize {
        self.src.len()
    }

    #[inline]
    fn input(&self, i: usize) -> u8 {
        self.src[i]
    }

    #[inline]
    fn output(&self, i: usize) -> u8 {
        match &self.buf {
            Some(buf) => buf[i],
            None => self.src[i],
        }
    }

    #[inline]
    fn put(&mut self, i: usize, b: u8) {
        if let Some(buf) = self.buf.as_mut() {
            buf[i] = b;
            return;
        }
        if self.src[i] != b {
            let mut buf = self.src.to_vec();
            buf[i] = b;
            self.buf = Some(buf);
        }
    }
}

/// Runs the rewrite over storage whose first byte is `/` and returns the
/// length of the canonical path written at its front.
fn rewrite<R: Rewrite>(out: &mut R) -> usize {
    let n = out.input_len();
    debug_assert!(n > 0 && out.input(0) == SEP);

    // r: next byte to read. w: next byte to write. Both skip the root.
    let mut r = 1;
    let mut w = 1;
    let mut trailing = n > 1 && out.input(n - 1) == SEP;

    while r < n {
        let c = out.input(r);
        if c == SEP {
            r += 1;
        } else if c == DOT && r + 1 == n {
            trailing = true;
            r += 1;
        } else if c == DOT && out.input(r + 1) == SEP {
            r += 2;
        } else if c == DOT
            && out.input(r + 1) == DOT
            && (r + 2 == n || out.input(r + 2) == SEP)
        {
            r += 3;
            if w > 1 {
                // back to the separator in front of the last segment
                w -= 1;
                while w > 1 && out.output(w) != SEP {
                    w -= 1;
                }
            }
        } else {
            if w > 1 {
                out.put(w, SEP);
                w += 1;
            }
            while r < n && out.input(r) != SEP {
                let b = out.input(r);
                out.put(w, b);
                w += 1;
                r += 1;
            }
        }
    }

    if trailing && w > 1 {
        out.put(w, SEP);
        w += 1;
    }

    w
}

enum Cleaned {
    Root,
    /// The canonical path is the first `n` bytes of the input.
    Prefix(usize),
    Owned(Vec<u8>),
}

fn clean_borrowed(path: &[u8]) -> Cleaned {
    if path.is_empty() {
        return Cleaned::Root;
    }

    if path[0] != SEP {
        let mut buf = Vec::with_capacity(path.len() + 1);
        buf.push(SEP);
        buf.extend_from_slice(path);
        let w = rewrite(&mut InPlace(&mut buf));
        buf.truncate(w);
        return Cleaned::Owned(buf);
    }

    let mut cow = CopyOnWrite { src: path, buf: None };
    let w = rewrite(&mut cow);
    match cow.buf {
        Some(mut buf) => {
            buf.truncate(w);
            Cleaned::Owned(buf)
        }
        None => Cleaned::Prefix(w),
    }
}

/// Returns the canonical form of `path`.
///
/// Borrows from `path` when it is already canonical (or when the canonical
/// form is a prefix of it, e.g. `/a/b/c/..`), so the common case of a clean
/// request path does not allocate.
///
/// ```
/// use canonpath::path::clean::clean_path;
///
/// assert_eq!(clean_path("/abc//def//ghi"), "/abc/def/ghi");
/// assert_eq!(clean_path("abc/./../def"), "/def");
/// assert_eq!(clean_path(""), "/");
/// ```
pub fn clean_path(path: &str) -> Cow<'_, str> {
    match clean_borrowed(path.as_bytes()) {
        Cleaned::Root => Cow::Borrowed("/"),
        // ends on an ASCII byte or in front of a `/`, so on a char boundary
        Cleaned::Prefix(n) => Cow::Borrowed(&path[..n]),
        // segments are copied whole, so UTF-8 input stays UTF-8
        Cleaned::Owned(buf) => match String::from_utf8(buf) {
            Ok(s) => Cow::Owned(s),
            Err(e) => Cow::Owned(String::from_utf8_lossy(e.as_bytes()).into_owned()),
        },
    }
}

/// Byte-level [`clean_path`]. Any byte sequence is accepted.
pub fn clean_path_bytes(path: &[u8]) -> Cow<'_, [u8]> {
    match clean_borrowed(path) {
        Cleaned::Root => Cow::Borrowed(&b"/"[..]),
        Cleaned::Prefix(n) => Cow::Borrowed(&path[..n]),
        Cleaned::Owned(buf) => Cow::Owned(buf),
    }
}

/// Cleans an owned buffer and hands it back.
///
/// The rewrite happens inside `path`'s storage. A missing leading `/` is
/// inserted first, which reallocates only when `path` has no spare capacity.
pub fn clean_path_vec(mut path: Vec<u8>) -> Vec<u8> {
    if path.first() != Some(&SEP) {
        path.insert(0, SEP);
    }
    let w = rewrite(&mut InPlace(&mut path));
    path.truncate(w);
    path
}

/// Cleans a request buffer, reusing it whenever it starts with `/`.
///
/// The returned buffer may be the one passed in.
pub fn clean_bytes_mut(mut buf: BytesMut) -> BytesMut {
    if buf.first() != Some(&SEP) {
        let mut grown = BytesMut::with_capacity(buf.len() + 1);
        grown.put_u8(SEP);
        grown.extend_from_slice(&buf);
        buf = grown;
    }
    let w = rewrite(&mut InPlace(&mut buf[..]));
    buf.truncate(w);
    buf
}

/// True when `path` is already in canonical form.
pub fn is_clean(path: &[u8]) -> bool {
    matches!(clean_borrowed(path), Cleaned::Prefix(n) if n == path.len())
}
