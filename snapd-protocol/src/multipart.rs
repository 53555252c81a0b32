// SPDX-FileCopyrightText: 2025 snapd-rs contributors
// SPDX-License-Identifier: MIT

//! `multipart/form-data` bodies for snap uploads.

use bytes::{Bytes, BytesMut};

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Field {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        content_type: String,
        data: Bytes,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Multipart {
    boundary: String,
    parts: Vec<Part>,
}

impl Default for Multipart {
    fn default() -> Self {
        Self::new()
    }
}

impl Multipart {
    /// Start a body with a freshly generated boundary.
    pub fn new() -> Self {
        Self::with_boundary(generate_boundary())
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.parts.push(Part::Field {
            name: name.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn file(
        mut self,
        name: &str,
        filename: &str,
        content_type: &str,
        data: impl Into<Bytes>,
    ) -> Self {
        self.parts.push(Part::File {
            name: name.to_string(),
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            data: data.into(),
        });
        self
    }

    /// Returns the `Content-Type` header value and the encoded body.
    pub fn encode(&self) -> (String, Bytes) {
        let mut out = BytesMut::new();
        for part in &self.parts {
            out.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
            match part {
                Part::Field { name, value } => {
                    out.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    out.extend_from_slice(value.as_bytes());
                }
                Part::File {
                    name,
                    filename,
                    content_type,
                    data,
                } => {
                    out.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                             Content-Type: {content_type}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    out.extend_from_slice(data);
                }
            }
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            out.freeze(),
        )
    }
}

/// 32 random hex digits. Falls back to the clock if the OS has no entropy to give.
fn generate_boundary() -> String {
    let mut seed = [0u8; 16];
    if getrandom::fill(&mut seed).is_err() {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        seed = nanos.to_le_bytes();
    }
    format!("snapd-rs-{}", hex::encode(seed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_fields_and_file() {
        let body = Multipart::with_boundary("XYZ")
            .field("action", "install")
            .field("dangerous", "true")
            .file("snap", "hello.snap", "application/octet-stream", &b"SNAP"[..]);
        let (content_type, data) = body.encode();
        assert_eq!(content_type, "multipart/form-data; boundary=XYZ");
        let expected = "--XYZ\r\n\
Content-Disposition: form-data; name=\"action\"\r\n\r\ninstall\r\n\
--XYZ\r\n\
Content-Disposition: form-data; name=\"dangerous\"\r\n\r\ntrue\r\n\
--XYZ\r\n\
Content-Disposition: form-data; name=\"snap\"; filename=\"hello.snap\"\r\n\
Content-Type: application/octet-stream\r\n\r\nSNAP\r\n\
--XYZ--\r\n";
        assert_eq!(std::str::from_utf8(&data).unwrap(), expected);
    }

    #[test]
    fn boundaries_are_unique() {
        let a = Multipart::new();
        let b = Multipart::new();
        assert_ne!(a.boundary(), b.boundary());
        assert!(a.boundary().len() > 30);
    }
}
