//! Loads the bitmap asset table (spec §6) from a JSON file delivered
//! out-of-band by whatever packages icon assets for this vehicle. The
//! driver only reads it - no asset generation happens here.

use std::path::Path;

use ddp_presentation::{BitmapAsset, BitmapTable};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct AssetFile {
    icons: std::collections::HashMap<String, AssetEntry>,
}

#[derive(Debug, Deserialize)]
struct AssetEntry {
    w: u16,
    h: u16,
    /// Hex-encoded packed pixel bytes (row-major, LSB-first within byte).
    data: String,
}

pub fn load(path: &Path) -> eyre::Result<BitmapTable> {
    let content = std::fs::read_to_string(path)?;
    let file: AssetFile = serde_json::from_str(&content)?;

    let mut table = BitmapTable::new();
    for (name, entry) in file.icons {
        let data = hex::decode(&entry.data)?;
        table.insert(name, BitmapAsset { w: entry.w, h: entry.h, data });
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_parses_hex_pixel_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("icons.json");
        std::fs::write(
            &path,
            r#"{"icons":{"battery":{"w":8,"h":8,"data":"0001020304050607"}}}"#,
        )
        .unwrap();

        let table = load(&path).unwrap();
        let asset = table.get("battery").unwrap();
        assert_eq!(asset.w, 8);
        assert_eq!(asset.data, vec![0, 1, 2, 3, 4, 5, 6, 7]);
    }
}
