use crate::error::DecodeError;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use std::borrow::Cow;

/// Bytes per chunk of a decoded payload.
pub const CHUNK_SIZE: usize = 512;

/// Base64 characters decoded per step when yielding: 512 quads, which is
/// exactly three chunks of output.
const SLICE_LEN: usize = CHUNK_SIZE * 4;

/// Standard alphabet, padding optional, trailing bits ignored (what `atob` accepts).
const FORGIVING: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// A decoded image split into fixed-size chunks, ready for multipart transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryPayload {
    chunks: Vec<Vec<u8>>,
    mime_type: String,
}

impl BinaryPayload {
    /// Chunk raw bytes under the given MIME type.
    pub fn from_bytes(data: &[u8], mime_type: impl Into<String>) -> Self {
        Self {
            chunks: data.chunks(CHUNK_SIZE).map(|c| c.to_vec()).collect(),
            mime_type: mime_type.into(),
        }
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The part after `/` in the MIME type, e.g. `jpeg` for `image/jpeg`.
    pub fn subtype(&self) -> &str {
        self.mime_type
            .split_once('/')
            .map(|(_, sub)| sub)
            .unwrap_or(&self.mime_type)
    }

    pub fn chunks(&self) -> &[Vec<u8>] {
        &self.chunks
    }

    /// Total decoded size in bytes.
    pub fn len(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Concatenate the chunks back into the original bytes.
    pub fn to_vec(&self) -> Vec<u8> {
        self.chunks.concat()
    }

    /// Stream the chunks as a request body without re-concatenating them.
    pub fn into_body(self) -> reqwest::Body {
        let chunks = self.chunks.into_iter().map(Ok::<_, std::io::Error>);
        reqwest::Body::wrap_stream(tokio_stream::iter(chunks))
    }
}

/// Decoder settings. `yield_between_chunks` hands control back to the
/// runtime after every chunk so large captures don't stall other tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct Codec {
    pub yield_between_chunks: bool,
}

impl Codec {
    pub fn new(yield_between_chunks: bool) -> Self {
        Self {
            yield_between_chunks,
        }
    }

    pub async fn decode(
        &self,
        base64: &str,
        mime_subtype: &str,
    ) -> Result<BinaryPayload, DecodeError> {
        if !self.yield_between_chunks {
            return decode(base64, mime_subtype);
        }

        let text = strip_whitespace(base64);
        let mut slices = text.as_bytes().chunks(SLICE_LEN).enumerate().peekable();
        let mut chunks = Vec::new();
        let mut buf = Vec::with_capacity(3 * CHUNK_SIZE);

        while let Some((index, slice)) = slices.next() {
            let offset = index * SLICE_LEN;
            // Padding is only legal in the final slice
            if slices.peek().is_some() {
                if let Some(pos) = slice.iter().position(|&b| b == b'=') {
                    return Err(base64::DecodeError::InvalidByte(offset + pos, b'=').into());
                }
            }

            buf.clear();
            FORGIVING
                .decode_vec(slice, &mut buf)
                .map_err(|e| shift_offset(e, offset))?;
            chunks.extend(buf.chunks(CHUNK_SIZE).map(<[u8]>::to_vec));
            tokio::task::yield_now().await;
        }

        Ok(BinaryPayload {
            chunks,
            mime_type: mime_type(mime_subtype),
        })
    }
}

fn shift_offset(err: base64::DecodeError, offset: usize) -> base64::DecodeError {
    match err {
        base64::DecodeError::InvalidByte(at, byte) => {
            base64::DecodeError::InvalidByte(at + offset, byte)
        }
        base64::DecodeError::InvalidLastSymbol(at, byte) => {
            base64::DecodeError::InvalidLastSymbol(at + offset, byte)
        }
        other => other,
    }
}

/// Decode base64 image data into a chunked payload typed `image/<mime_subtype>`.
pub fn decode(base64: &str, mime_subtype: &str) -> Result<BinaryPayload, DecodeError> {
    let data = decode_raw(base64)?;
    Ok(BinaryPayload::from_bytes(&data, mime_type(mime_subtype)))
}

fn decode_raw(base64: &str) -> Result<Vec<u8>, DecodeError> {
    Ok(FORGIVING.decode(strip_whitespace(base64).as_bytes())?)
}

fn mime_type(subtype: &str) -> String {
    if subtype.contains('/') {
        subtype.to_string()
    } else {
        format!("image/{}", subtype)
    }
}

fn strip_whitespace(input: &str) -> Cow<'_, str> {
    if input.bytes().any(|b| b.is_ascii_whitespace()) {
        Cow::Owned(input.chars().filter(|c| !c.is_ascii_whitespace()).collect())
    } else {
        Cow::Borrowed(input)
    }
}
