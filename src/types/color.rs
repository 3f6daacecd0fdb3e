//! RGB565 display color conversion

/// Expand an RGB565 pixel to 8-bit channels.
///
/// Each channel is scaled with truncating integer math, `v * 255 / max`, so
/// the extremes map exactly to 0 and 255.
pub fn rgb565_to_rgb8(color: u16) -> (u8, u8, u8) {
    let r = (color >> 11) & 0x1F;
    let g = (color >> 5) & 0x3F;
    let b = color & 0x1F;

    let scale = |value: u16, max: u32| (value as u32 * 255 / max) as u8;
    (scale(r, 31), scale(g, 63), scale(b, 31))
}
