// Floe - Rust client library for Apache Iceberg tables
// Copyright 2025 The Floe Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Avro binary encoding primitives

/// Zig-zag maps signed values onto unsigned ones so small magnitudes stay short
#[inline]
pub fn zigzag_encode(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Appends Avro binary values to a caller-owned buffer
#[derive(Debug)]
pub struct BinaryEncoder<'a> {
    buf: &'a mut Vec<u8>,
}

impl<'a> BinaryEncoder<'a> {
    pub fn new(buf: &'a mut Vec<u8>) -> Self {
        BinaryEncoder { buf }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_long(&mut self, value: i64) {
        let mut n = zigzag_encode(value);
        while n >= 0x80 {
            self.buf.push((n as u8) | 0x80);
            n >>= 7;
        }
        self.buf.push(n as u8);
    }

    pub fn write_int(&mut self, value: i32) {
        self.write_long(i64::from(value));
    }

    pub fn write_boolean(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    pub fn write_float(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_double(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bytes(&mut self, value: &[u8]) {
        self.write_long(value.len() as i64);
        self.buf.extend_from_slice(value);
    }

    pub fn write_str(&mut self, value: &str) {
        self.write_bytes(value.as_bytes());
    }

    pub fn write_fixed(&mut self, value: &[u8]) {
        self.buf.extend_from_slice(value);
    }

    pub fn write_union_index(&mut self, index: usize) {
        self.write_long(index as i64);
    }

    /// Writes `value` as a `["null", T]` union
    pub fn write_optional<T>(&mut self, value: Option<T>, write: impl FnOnce(&mut Self, T)) {
        match value {
            None => self.write_union_index(0),
            Some(v) => {
                self.write_union_index(1);
                write(self, v);
            }
        }
    }

    /// Writes `items` as a single block followed by the terminating empty block
    pub fn write_array<T>(&mut self, items: &[T], mut write: impl FnMut(&mut Self, &T)) {
        if !items.is_empty() {
            self.write_long(items.len() as i64);
            for item in items {
                write(self, item);
            }
        }
        self.write_long(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zigzag() {
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_encode(-2), 3);
        assert_eq!(zigzag_encode(i64::MAX), u64::MAX - 1);
        assert_eq!(zigzag_encode(i64::MIN), u64::MAX);
    }

    #[test]
    fn test_write_long() {
        let mut buf = Vec::new();
        let mut e = BinaryEncoder::new(&mut buf);
        e.write_long(64);
        e.write_long(-64);
        assert_eq!(buf, vec![0x80, 0x01, 0x7f]);
    }

    #[test]
    fn test_write_array() {
        let mut buf = Vec::new();
        let mut e = BinaryEncoder::new(&mut buf);
        e.write_array(&[1i64, 2], |e, v| e.write_long(*v));
        assert_eq!(buf, vec![0x04, 0x02, 0x04, 0x00]);

        let mut buf = Vec::new();
        BinaryEncoder::new(&mut buf).write_array::<i64>(&[], |e, v| e.write_long(*v));
        assert_eq!(buf, vec![0x00]);
    }

    #[test]
    fn test_write_optional() {
        let mut buf = Vec::new();
        let mut e = BinaryEncoder::new(&mut buf);
        e.write_optional(None::<&str>, |e, s| e.write_str(s));
        e.write_optional(Some("a"), |e, s| e.write_str(s));
        assert_eq!(buf, vec![0x00, 0x02, 0x02, b'a']);
    }
}
