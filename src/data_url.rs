//! `data:<mime>;base64,<payload>` strings, the storage form of every image.

use base64::{engine::general_purpose, Engine as _};

use crate::error::DataUrlError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataUrl {
    pub mime: String,
    pub bytes: Vec<u8>,
}

pub fn encode(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, general_purpose::STANDARD.encode(bytes))
}

/// Encode raw file bytes, sniffing the MIME type from the content.
pub fn from_image_bytes(bytes: &[u8]) -> String {
    let mime = image::guess_format(bytes)
        .map(|f| f.to_mime_type())
        .unwrap_or("application/octet-stream");
    encode(mime, bytes)
}

/// Borrow the MIME type and the still-encoded base64 payload.
pub fn split(url: &str) -> Result<(&str, &str), DataUrlError> {
    let rest = url
        .trim()
        .strip_prefix("data:")
        .ok_or(DataUrlError::MissingScheme)?;
    let (header, payload) = rest.split_once(',').ok_or(DataUrlError::MissingPayload)?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or(DataUrlError::NotBase64)?;
    Ok((mime, payload))
}

pub fn parse(url: &str) -> Result<DataUrl, DataUrlError> {
    let (mime, payload) = split(url)?;
    let bytes = general_purpose::STANDARD.decode(payload)?;
    Ok(DataUrl {
        mime: mime.to_string(),
        bytes,
    })
}

/// Just the payload bytes; used for thumbnails and file export.
pub fn decode_bytes(url: &str) -> Result<Vec<u8>, DataUrlError> {
    parse(url).map(|d| d.bytes)
}

/// File extension matching a data URL's MIME type.
pub fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        _ => "png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_parse_keeps_mime_and_bytes() {
        let url = encode("image/png", &[1, 2, 3, 250]);
        assert_eq!(url, "data:image/png;base64,AQID+g==");
        let parsed = parse(&url).unwrap();
        assert_eq!(parsed.mime, "image/png");
        assert_eq!(parsed.bytes, vec![1, 2, 3, 250]);
    }

    #[test]
    fn split_borrows_without_decoding() {
        let (mime, payload) = split("data:image/jpeg;base64,/9j/4AAQ").unwrap();
        assert_eq!(mime, "image/jpeg");
        assert_eq!(payload, "/9j/4AAQ");
    }

    #[test]
    fn sniffs_png_signature() {
        let png_magic = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert!(from_image_bytes(&png_magic).starts_with("data:image/png;base64,"));
    }

    #[test]
    fn unknown_bytes_fall_back_to_octet_stream() {
        assert!(from_image_bytes(b"hello").starts_with("data:application/octet-stream;base64,"));
    }

    #[test]
    fn rejects_malformed_urls() {
        assert!(matches!(parse("image/png;base64,AAAA"), Err(DataUrlError::MissingScheme)));
        assert!(matches!(parse("data:image/png;base64"), Err(DataUrlError::MissingPayload)));
        assert!(matches!(parse("data:text/plain,hello"), Err(DataUrlError::NotBase64)));
        assert!(matches!(parse("data:image/png;base64,@@@"), Err(DataUrlError::Base64(_))));
    }

    #[test]
    fn extension_follows_mime() {
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("image/png"), "png");
        assert_eq!(extension_for("application/octet-stream"), "png");
    }
}
