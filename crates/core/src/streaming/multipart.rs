use crate::shared::constants::STREAM_BOUNDARY;

/// One part of a `multipart/x-mixed-replace` body:
/// `--<boundary>\r\nContent-Type: <type>\r\n\r\n<body>\r\n`.
pub fn multipart_part(content_type: &str, body: &[u8]) -> Vec<u8> {
    let header = format!("--{STREAM_BOUNDARY}\r\nContent-Type: {content_type}\r\n\r\n");
    let mut part = Vec::with_capacity(header.len() + body.len() + 2);
    part.extend_from_slice(header.as_bytes());
    part.extend_from_slice(body);
    part.extend_from_slice(b"\r\n");
    part
}
