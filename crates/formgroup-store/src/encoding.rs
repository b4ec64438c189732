use std::fmt;
use std::str::FromStr;

use formgroup_core::StoreError;
use serde::Deserialize;

/// Text encoding of the snapshot file. Names follow the usual Node.js
/// spellings (`utf8`, `utf16le`, `latin1`, `ascii`, ...).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Encoding {
    #[default]
    Utf8,
    Utf16Le,
    Latin1,
    Ascii,
}

impl Encoding {
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf8",
            Encoding::Utf16Le => "utf16le",
            Encoding::Latin1 => "latin1",
            Encoding::Ascii => "ascii",
        }
    }

    pub fn encode(self, text: &str) -> Result<Vec<u8>, StoreError> {
        match self {
            Encoding::Utf8 => Ok(text.as_bytes().to_vec()),
            Encoding::Utf16Le => Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect()),
            Encoding::Latin1 => self.encode_narrow(text, 0xFF),
            Encoding::Ascii => self.encode_narrow(text, 0x7F),
        }
    }

    pub fn decode(self, bytes: &[u8]) -> Result<String, StoreError> {
        match self {
            Encoding::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|e| self.error(e.to_string())),
            Encoding::Utf16Le => {
                if bytes.len() % 2 != 0 {
                    return Err(self.error(format!("odd byte length {}", bytes.len())));
                }
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16(&units).map_err(|e| self.error(e.to_string()))
            }
            Encoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            Encoding::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
                Some(at) => Err(self.error(format!("non-ascii byte at offset {at}"))),
                None => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            },
        }
    }

    fn encode_narrow(self, text: &str, max: u32) -> Result<Vec<u8>, StoreError> {
        text.chars()
            .map(|c| {
                u8::try_from(u32::from(c))
                    .ok()
                    .filter(|&b| u32::from(b) <= max)
                    .ok_or_else(|| self.error(format!("cannot represent {c:?}")))
            })
            .collect()
    }

    fn error(self, detail: String) -> StoreError {
        StoreError::Encoding {
            encoding: self.name(),
            detail,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Encoding::Utf8),
            "utf16le" | "utf-16le" | "ucs2" | "ucs-2" => Ok(Encoding::Utf16Le),
            "latin1" | "binary" => Ok(Encoding::Latin1),
            "ascii" => Ok(Encoding::Ascii),
            _ => Err(StoreError::UnsupportedEncoding(s.to_string())),
        }
    }
}

impl TryFrom<String> for Encoding {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
