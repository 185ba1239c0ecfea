// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

/// Anything that names a world state key
pub trait IntoKey {
    fn into_key(self) -> Vec<u8>;
}

impl IntoKey for &[u8] {
    fn into_key(self) -> Vec<u8> {
        self.to_vec()
    }
}

impl IntoKey for &Vec<u8> {
    fn into_key(self) -> Vec<u8> {
        self.clone()
    }
}

impl IntoKey for &str {
    fn into_key(self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl IntoKey for String {
    fn into_key(self) -> Vec<u8> {
        self.into_bytes()
    }
}

impl IntoKey for &String {
    fn into_key(self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

/// Composite key, segments joined with a slash
impl IntoKey for &[&str] {
    fn into_key(self) -> Vec<u8> {
        self.join("/").into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::IntoKey;

    #[test]
    fn composite_keys() {
        assert_eq!(
            ["gateway", "staged", "abc"].as_slice().into_key(),
            b"gateway/staged/abc"
        );
        assert_eq!("defender/anomaly".to_string().into_key(), b"defender/anomaly");
    }
}
