//! Colorspace the shader-path surface should be tagged with for a frame.

use prism_core::{ColorPrimaries, Frame, TransferCharacteristic};
use serde::{Deserialize, Serialize};

/// Output colorspace of the presentation surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DisplayColorspace {
    #[default]
    Srgb,
    Bt709,
    DisplayP3,
    Bt2020,
    Bt2100Pq,
    Bt2100Hlg,
}

impl DisplayColorspace {
    /// Pick the surface colorspace matching a frame's tags.
    pub fn for_frame(frame: &Frame) -> Self {
        Self::from_tags(frame.primaries, frame.transfer, frame.dovi)
    }

    pub fn from_tags(primaries: ColorPrimaries, transfer: TransferCharacteristic, dovi: bool) -> Self {
        if dovi {
            return Self::Bt2100Pq;
        }
        match (transfer, primaries) {
            (TransferCharacteristic::Pq, _) => Self::Bt2100Pq,
            (TransferCharacteristic::Hlg, _) => Self::Bt2100Hlg,
            (_, ColorPrimaries::Bt2020) => Self::Bt2020,
            (_, ColorPrimaries::DciP3) => Self::DisplayP3,
            (TransferCharacteristic::Bt709, ColorPrimaries::Bt709) => Self::Bt709,
            _ => Self::Srgb,
        }
    }

    /// Whether the surface should request extended dynamic range.
    ///
    /// Any non-sRGB colorspace asks for it, as long as the display has
    /// headroom above SDR white.
    pub fn wants_extended_dynamic_range(self, display_headroom: f32) -> bool {
        self != Self::Srgb && display_headroom > 1.0
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Srgb => "sRGB",
            Self::Bt709 => "ITU-R BT.709",
            Self::DisplayP3 => "Display P3",
            Self::Bt2020 => "ITU-R BT.2020",
            Self::Bt2100Pq => "ITU-R BT.2100 PQ",
            Self::Bt2100Hlg => "ITU-R BT.2100 HLG",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::PixelFormat;

    #[test]
    fn test_sdr_709() {
        let frame = Frame::new(16, 16, PixelFormat::Nv12);
        assert_eq!(DisplayColorspace::for_frame(&frame), DisplayColorspace::Bt709);
    }

    #[test]
    fn test_hdr_transfers() {
        assert_eq!(
            DisplayColorspace::from_tags(ColorPrimaries::Bt2020, TransferCharacteristic::Pq, false),
            DisplayColorspace::Bt2100Pq
        );
        assert_eq!(
            DisplayColorspace::from_tags(ColorPrimaries::Bt2020, TransferCharacteristic::Hlg, false),
            DisplayColorspace::Bt2100Hlg
        );
        assert_eq!(
            DisplayColorspace::from_tags(ColorPrimaries::Bt709, TransferCharacteristic::Bt709, true),
            DisplayColorspace::Bt2100Pq
        );
    }

    #[test]
    fn test_untagged_is_srgb() {
        let cs = DisplayColorspace::from_tags(
            ColorPrimaries::Unspecified,
            TransferCharacteristic::Unspecified,
            false,
        );
        assert_eq!(cs, DisplayColorspace::Srgb);
        assert!(!cs.wants_extended_dynamic_range(4.0));
    }

    #[test]
    fn test_edr_needs_headroom() {
        assert!(DisplayColorspace::Bt2100Pq.wants_extended_dynamic_range(2.0));
        assert!(!DisplayColorspace::Bt2100Pq.wants_extended_dynamic_range(1.0));
    }
}
