use std::io::{self, BufRead};

/// Like [`BufRead::lines`], but invalid UTF-8 is replaced instead of failing the whole read.
/// The compiler's listing file may contain comments in any encoding.
pub struct Utf8LossyLines<R: BufRead> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> Iterator for Utf8LossyLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                let line = self.buf.strip_suffix(b"\n").unwrap_or(&self.buf);
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                Some(Ok(String::from_utf8_lossy(line).into_owned()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

pub trait Utf8LossyLinesExt: BufRead + Sized {
    fn utf8_lossy_lines(self) -> Utf8LossyLines<Self>;
}

impl<R: BufRead> Utf8LossyLinesExt for R {
    fn utf8_lossy_lines(self) -> Utf8LossyLines<R> {
        Utf8LossyLines {
            reader: self,
            buf: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lossy_lines() {
        let input: &[u8] = b"add x1\r\nbad \xff byte\nlast";
        let lines: Vec<_> = input.utf8_lossy_lines().map(Result::unwrap).collect();
        assert_eq!(lines, vec!["add x1", "bad \u{FFFD} byte", "last"]);
    }
}
