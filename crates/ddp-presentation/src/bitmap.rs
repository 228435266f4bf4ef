//! The bitmap asset table (spec §6): a static, externally-delivered mapping
//! from icon name to packed pixel data. The driver only reads it.

use std::collections::HashMap;

/// Row-major, LSB-first-within-byte packed monochrome bitmap.
#[derive(Debug, Clone)]
pub struct BitmapAsset {
    pub w: u16,
    pub h: u16,
    pub data: Vec<u8>,
}

impl BitmapAsset {
    #[must_use]
    pub fn bytes_per_row(&self) -> usize {
        (self.w as usize + 7) / 8
    }
}

#[derive(Debug, Default, Clone)]
pub struct BitmapTable {
    icons: HashMap<String, BitmapAsset>,
}

impl BitmapTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, asset: BitmapAsset) {
        self.icons.insert(name.into(), asset);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BitmapAsset> {
        self.icons.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_per_row_rounds_up() {
        let asset = BitmapAsset { w: 10, h: 1, data: vec![] };
        assert_eq!(asset.bytes_per_row(), 2);
    }

    #[test]
    fn test_table_lookup() {
        let mut table = BitmapTable::new();
        table.insert("ok", BitmapAsset { w: 16, h: 16, data: vec![0; 32] });
        assert!(table.get("ok").is_some());
        assert!(table.get("missing").is_none());
    }
}
