use std::path::Path;

use anyhow::Context;

/// Read an asset file relative to `root`.
pub fn load_binary(root: &Path, file_name: &str) -> anyhow::Result<Vec<u8>> {
    let path = root.join(file_name);
    let data = std::fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(data)
}

/// Decode image file contents to 8-bit RGBA.
///
/// The file extension picks the decoder when it is known; otherwise the
/// format is guessed from the data.
pub fn decode_rgba(bytes: &[u8], file_name: &str) -> anyhow::Result<image::RgbaImage> {
    let img = match image::ImageFormat::from_path(file_name) {
        Ok(format) => image::load_from_memory_with_format(bytes, format)
            .or_else(|_| image::load_from_memory(bytes)),
        Err(_) => image::load_from_memory(bytes),
    }
    .with_context(|| format!("failed to decode {file_name}"))?;
    Ok(img.to_rgba8())
}

pub fn load_rgba(root: &Path, file_name: &str) -> anyhow::Result<image::RgbaImage> {
    let data = load_binary(root, file_name)?;
    decode_rgba(&data, file_name)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn decodes_png_bytes() {
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png).unwrap();

        let decoded = decode_rgba(&png, "wall.png").unwrap();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(1, 1).0, [10, 20, 30, 255]);
        // wrong extension still decodes by sniffing
        assert!(decode_rgba(&png, "wall.jpg").is_ok());
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(decode_rgba(b"not an image", "floor.png").is_err());
    }
}
