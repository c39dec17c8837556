//! Primitive field encodings used by every ZIP record.
//!
//! All integers in the format are unsigned little-endian with a fixed
//! width. Values wider than their field are masked to the low-order bytes
//! instead of being rejected, matching how legacy (non-ZIP64) readers
//! interpret those fields.

use byteorder::{ByteOrder, LittleEndian};
use time::OffsetDateTime;

/// Longest file name stored in a header, in bytes.
pub const MAX_NAME_LEN: usize = 255;

/// Largest value representable in `width` bytes.
///
/// # Panics
///
/// Panics if `width` is not in `1..=8`.
pub fn mask(width: usize) -> u64 {
    assert!((1..=8).contains(&width), "invalid field width: {width}");
    if width == 8 {
        u64::MAX
    } else {
        (1u64 << (width * 8)) - 1
    }
}

/// Append `value` as a `width`-byte little-endian integer, masking off the
/// bits that don't fit.
///
/// # Panics
///
/// Panics if `width` is not in `1..=8`.
pub fn put_uint(out: &mut Vec<u8>, value: u64, width: usize) {
    let mut buf = [0u8; 8];
    LittleEndian::write_uint(&mut buf, value & mask(width), width);
    out.extend_from_slice(&buf[..width]);
}

/// Encode `value` as a `width`-byte little-endian integer.
pub fn encode_uint(value: u64, width: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(width);
    put_uint(&mut out, value, width);
    out
}

pub fn put_u16(out: &mut Vec<u8>, value: u64) {
    put_uint(out, value, 2);
}

pub fn put_u32(out: &mut Vec<u8>, value: u64) {
    put_uint(out, value, 4);
}

/// UTF-8 bytes of `value`, cut to [`MAX_NAME_LEN`].
///
/// The cut may land inside a multi-byte character.
pub fn encode_text(value: &str) -> &[u8] {
    let bytes = value.as_bytes();
    &bytes[..bytes.len().min(MAX_NAME_LEN)]
}

/// Packed MS-DOS date and time.
///
/// The low 16 bits hold the time (seconds/2, minute, hour), the high 16 bits
/// the date (day, month, years since 1980). The value is not validated;
/// years before 1980 or after 2107 wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DosDateTime(u32);

impl DosDateTime {
    pub fn from_raw(value: u32) -> Self {
        Self(value)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Parse modification date to (year, month, day)
    pub fn date(&self) -> (u16, u8, u8) {
        let date = (self.0 >> 16) as u16;
        let day = (date & 0x1F) as u8;
        let month = ((date >> 5) & 0x0F) as u8;
        let year = ((date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn time(&self) -> (u8, u8, u8) {
        let time = self.0 as u16;
        let second = ((time & 0x1F) * 2) as u8;
        let minute = ((time >> 5) & 0x3F) as u8;
        let hour = ((time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }

    pub fn put(&self, out: &mut Vec<u8>) {
        put_u32(out, self.0 as u64);
    }

    pub fn to_bytes(&self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl From<OffsetDateTime> for DosDateTime {
    fn from(value: OffsetDateTime) -> Self {
        let year = (value.year() - 1980) as u32;
        let mut packed = year << 25;
        packed |= (u8::from(value.month()) as u32) << 21;
        packed |= (value.day() as u32) << 16;
        packed |= (value.hour() as u32) << 11;
        packed |= (value.minute() as u32) << 5;
        packed |= (value.second() / 2) as u32;
        Self(packed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Month, PrimitiveDateTime, Time};

    fn at(year: i32, month: Month, day: u8, h: u8, m: u8, s: u8) -> OffsetDateTime {
        PrimitiveDateTime::new(
            Date::from_calendar_date(year, month, day).unwrap(),
            Time::from_hms(h, m, s).unwrap(),
        )
        .assume_utc()
    }

    #[test]
    fn uint_is_little_endian_and_masked() {
        assert_eq!(encode_uint(0x0403_4B50, 4), b"PK\x03\x04");
        assert_eq!(encode_uint(20, 2), [20, 0]);
        assert_eq!(encode_uint(0x1_2345, 2), [0x45, 0x23]);
        assert_eq!(encode_uint(u64::MAX, 4), [0xFF; 4]);
        assert_eq!(encode_uint(1, 8), [1, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    #[should_panic(expected = "invalid field width")]
    fn zero_width_panics() {
        encode_uint(1, 0);
    }

    #[test]
    fn text_is_cut_at_255_bytes() {
        let long = "a".repeat(300);
        assert_eq!(encode_text(&long).len(), 255);
        assert_eq!(encode_text("bar/baz.txt"), b"bar/baz.txt");
        // 128 two-byte characters, the cut splits the last one
        let wide = "é".repeat(128);
        assert_eq!(encode_text(&wide).len(), 255);
    }

    #[test]
    fn dos_datetime_packs_fields() {
        let dos = DosDateTime::from(at(2021, Month::March, 14, 15, 9, 27));
        assert_eq!(dos.date(), (2021, 3, 14));
        assert_eq!(dos.time(), (15, 9, 26));
        let expected = (41u32 << 25) | (3 << 21) | (14 << 16) | (15 << 11) | (9 << 5) | 13;
        assert_eq!(dos.as_u32(), expected);
        assert_eq!(dos.to_bytes(), expected.to_le_bytes());
    }

    #[test]
    fn dos_epoch_is_1980() {
        let dos = DosDateTime::from(at(1980, Month::January, 1, 0, 0, 0));
        assert_eq!(dos.as_u32(), (1 << 21) | (1 << 16));
        let mut out = Vec::new();
        dos.put(&mut out);
        assert_eq!(out, [0, 0, 0x21, 0]);
    }
}
