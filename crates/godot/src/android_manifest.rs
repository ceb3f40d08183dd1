//! Minimal Android binary XML (AXML) reader, used only to pull a version string out of an APK's
//! `AndroidManifest.xml` (`spec.md` §4.3 item 3: "The APK manifest is parsed as Android binary XML
//! to extract the engine library's version string when present"). `file_access_apk.cpp`'s
//! `get_version_string_from_manifest` delegates this to a dedicated manifest parser this retrieval
//! pack doesn't carry the source for, and falls back to `"unknown"` at the call site for
//! engine-2.x manifests that never wrote a version string; this module mirrors that fallback by
//! returning `None` for the caller to substitute. The chunk layout below follows the public
//! Android binary-XML format (`RES_XML_*`/`RES_STRING_POOL_TYPE` chunk tags), read with the same
//! manual bounds-checked byte reads `script::decoder` uses for the `GDSC` bytecode container,
//! rather than the `zerocopy`-derived header structs `gdpack_windows::pe`/`elf` use, since every
//! chunk here is variable-length and walked by its own declared size rather than a fixed layout.

const CHUNK_XML: u16 = 0x0003;
const CHUNK_STRING_POOL: u16 = 0x0001;
const CHUNK_START_ELEMENT: u16 = 0x0102;
const STRING_POOL_UTF8_FLAG: u32 = 1 << 8;
const CHUNK_HEADER_LEN: usize = 8;
const NODE_HEADER_LEN: usize = 8; // line_number u32 + comment u32, following the common chunk header
const ELEMENT_HEADER_LEN: usize = 20;
const ATTRIBUTE_LEN: usize = 20;

fn read_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    bytes.get(offset..offset + 2).map(|slice| u16::from_le_bytes([slice[0], slice[1]]))
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    bytes.get(offset..offset + 4).map(|slice| u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

struct StringPool<'a> {
    data: &'a [u8],
    offsets_start: usize,
    string_count: usize,
    strings_start: usize,
    utf8: bool,
}

impl<'a> StringPool<'a> {
    fn parse(chunk: &'a [u8]) -> Option<Self> {
        let header_size = read_u16(chunk, 2)? as usize;
        let string_count = read_u32(chunk, 8)? as usize;
        let flags = read_u32(chunk, 20)?;
        let strings_start = read_u32(chunk, 24)? as usize;
        Some(Self { data: chunk, offsets_start: header_size, string_count, strings_start, utf8: flags & STRING_POOL_UTF8_FLAG != 0 })
    }

    fn get(&self, index: u32) -> Option<String> {
        let index = index as usize;
        if index >= self.string_count {
            return None;
        }
        let entry_offset = self.strings_start + read_u32(self.data, self.offsets_start + index * 4)? as usize;
        let slice = self.data.get(entry_offset..)?;
        if self.utf8 {
            let (_char_len, rest) = read_utf8_length(slice)?;
            let (byte_len, rest) = read_utf8_length(rest)?;
            core::str::from_utf8(rest.get(..byte_len)?).ok().map(str::to_owned)
        } else {
            let unit_len = read_u16(slice, 0)? as usize;
            let units = slice.get(2..2 + unit_len * 2)?;
            let utf16: Vec<u16> = units.chunks_exact(2).map(|pair| u16::from_le_bytes([pair[0], pair[1]])).collect();
            String::from_utf16(&utf16).ok()
        }
    }
}

/// AXML's UTF-8 string-pool entries prefix each string with two variable-width lengths (character
/// count, then byte count): a single byte if the high bit is clear, otherwise two bytes with the
/// high bit of the first masked off.
fn read_utf8_length(bytes: &[u8]) -> Option<(usize, &[u8])> {
    let first = *bytes.first()?;
    if first & 0x80 == 0 {
        Some((first as usize, &bytes[1..]))
    } else {
        let second = *bytes.get(1)? as usize;
        Some((((first as usize & 0x7F) << 8) | second, &bytes[2..]))
    }
}

/// Walks every start-tag's attributes looking for one whose resolved name contains `"version"`
/// (covers both the standard `android:versionName` and Godot's own custom manifest entries),
/// returning its string value.
#[must_use]
pub fn engine_version_string(data: &[u8]) -> Option<String> {
    if read_u16(data, 0)? != CHUNK_XML {
        return None;
    }
    let document_end = read_u32(data, 4)? as usize;

    let mut pool = None;
    let mut offset = read_u16(data, 2)? as usize; // skip the document's own chunk header
    while offset + CHUNK_HEADER_LEN <= data.len() && offset < document_end {
        let chunk_type = read_u16(data, offset)?;
        let chunk_size = read_u32(data, offset + 4)? as usize;
        if chunk_size < CHUNK_HEADER_LEN {
            break;
        }
        let chunk = data.get(offset..offset + chunk_size)?;

        match chunk_type {
            CHUNK_STRING_POOL => pool = StringPool::parse(chunk),
            CHUNK_START_ELEMENT => {
                if let Some(pool) = &pool {
                    if let Some(version) = find_version_attribute(chunk, pool) {
                        return Some(version);
                    }
                }
            }
            _ => {}
        }
        offset += chunk_size;
    }
    None
}

fn find_version_attribute(chunk: &[u8], pool: &StringPool<'_>) -> Option<String> {
    let element = chunk.get(NODE_HEADER_LEN..NODE_HEADER_LEN + ELEMENT_HEADER_LEN)?;
    let attribute_start = NODE_HEADER_LEN + read_u16(element, 8)? as usize;
    let attribute_size = read_u16(element, 10)? as usize;
    let attribute_count = read_u16(element, 12)? as usize;

    for index in 0..attribute_count {
        let attribute_offset = attribute_start + index * attribute_size;
        let attribute = chunk.get(attribute_offset..attribute_offset + ATTRIBUTE_LEN)?;
        let name_index = read_u32(attribute, 4)?;
        let name = pool.get(name_index)?;
        if name.contains("version") {
            let raw_value_index = read_u32(attribute, 8)?;
            if let Some(value) = pool.get(raw_value_index) {
                return Some(value);
            }
            let data_value = read_u32(attribute, 16)?;
            return Some(data_value.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_u16(buffer: &mut Vec<u8>, value: u16) {
        buffer.extend_from_slice(&value.to_le_bytes());
    }
    fn write_u32(buffer: &mut Vec<u8>, value: u32) {
        buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Builds a minimal AXML document: a UTF-8 string pool with the strings `"manifest"` and
    /// `"versionName"`, followed by one `<manifest versionName="1.2.3">` start-element chunk.
    fn build_manifest_with_version(version: &str) -> Vec<u8> {
        let strings = ["manifest", "versionName", version];

        let mut string_data = Vec::new();
        let mut offsets = Vec::new();
        for string in strings {
            offsets.push(string_data.len() as u32);
            string_data.push(string.len() as u8); // char length, fits in one byte for this test
            string_data.push(string.len() as u8); // byte length
            string_data.extend_from_slice(string.as_bytes());
            string_data.push(0);
        }
        while string_data.len() % 4 != 0 {
            string_data.push(0);
        }

        let pool_header_size = 28u16;
        let mut pool = Vec::new();
        write_u16(&mut pool, CHUNK_STRING_POOL);
        write_u16(&mut pool, pool_header_size);
        let pool_chunk_size_position = pool.len();
        write_u32(&mut pool, 0); // patched below
        write_u32(&mut pool, strings.len() as u32); // string_count
        write_u32(&mut pool, 0); // style_count
        write_u32(&mut pool, STRING_POOL_UTF8_FLAG); // flags
        let strings_start_position = pool.len();
        write_u32(&mut pool, 0); // patched below
        write_u32(&mut pool, 0); // styles_start
        for offset in &offsets {
            write_u32(&mut pool, *offset);
        }
        let strings_start = pool.len() as u32;
        pool[strings_start_position..strings_start_position + 4].copy_from_slice(&strings_start.to_le_bytes());
        pool.extend_from_slice(&string_data);
        let pool_chunk_size = pool.len() as u32;
        pool[pool_chunk_size_position..pool_chunk_size_position + 4].copy_from_slice(&pool_chunk_size.to_le_bytes());

        let mut element = Vec::new();
        write_u16(&mut element, CHUNK_START_ELEMENT);
        write_u16(&mut element, 16); // header_size
        let element_chunk_size_position = element.len();
        write_u32(&mut element, 0); // patched below
        write_u32(&mut element, 0); // line_number
        write_u32(&mut element, 0xFFFF_FFFF); // comment
        write_u32(&mut element, 0xFFFF_FFFF); // namespace_uri
        write_u32(&mut element, 0); // name = "manifest"
        write_u16(&mut element, 20); // attribute_start, relative to NODE_HEADER_LEN
        write_u16(&mut element, ATTRIBUTE_LEN as u16); // attribute_size
        write_u16(&mut element, 1); // attribute_count
        write_u16(&mut element, 0); // id_index
        write_u16(&mut element, 0); // class_index
        write_u16(&mut element, 0); // style_index
        write_u32(&mut element, 0xFFFF_FFFF); // attribute namespace_uri
        write_u32(&mut element, 1); // attribute name = "versionName"
        write_u32(&mut element, 2); // attribute raw_value = version string
        write_u16(&mut element, 8); // typed-value size
        element.push(0); // reserved
        element.push(3); // data_type = TYPE_STRING
        write_u32(&mut element, 2); // data, unused when raw_value resolves
        let element_chunk_size = element.len() as u32;
        element[element_chunk_size_position..element_chunk_size_position + 4].copy_from_slice(&element_chunk_size.to_le_bytes());

        let mut document = Vec::new();
        write_u16(&mut document, CHUNK_XML);
        write_u16(&mut document, 8); // header_size
        let document_size_position = document.len();
        write_u32(&mut document, 0); // patched below
        document.extend_from_slice(&pool);
        document.extend_from_slice(&element);
        let document_size = document.len() as u32;
        document[document_size_position..document_size_position + 4].copy_from_slice(&document_size.to_le_bytes());

        document
    }

    #[test]
    fn extracts_version_name_attribute() {
        let bytes = build_manifest_with_version("1.2.3");
        assert_eq!(engine_version_string(&bytes), Some("1.2.3".to_owned()));
    }

    #[test]
    fn non_manifest_chunk_returns_none() {
        assert_eq!(engine_version_string(&[0u8; 8]), None);
    }
}
