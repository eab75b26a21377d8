//! Integration tests: mask set → decoded layers → label lookup.
//!
//! Exercises the full `mc-render` path against an 800×600 base image with
//! PNG masks encoded the way a segmentation collaborator returns them.

use image::{ImageFormat, RgbaImage};
use mc_core::{DataUri, Id, MaskBox, MaskSet, NormPoint};
use mc_render::{HitMapBuilder, MaskLayers, decode_mask};
use pretty_assertions::assert_eq;
use std::io::Cursor;

const W: u32 = 800;
const H: u32 = 600;

fn png_rect(w: u32, h: u32, rect: (u32, u32, u32, u32)) -> DataUri {
    let (rx, ry, rw, rh) = rect;
    let img = RgbaImage::from_fn(w, h, |x, y| {
        let inside = x >= rx && x < rx + rw && y >= ry && y < ry + rh;
        image::Rgba([0, 0, 0, if inside { 255 } else { 0 }])
    });
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    DataUri::from_bytes("image/png", &buf)
}

fn quadrant_masks() -> MaskSet {
    MaskSet::from_detections(
        Id::intern("image_harbour"),
        vec![
            ("лодка".to_string(), png_rect(W, H, (0, 0, 400, 300)), None),
            ("маяк".to_string(), png_rect(W, H, (400, 300, 400, 300)), None),
        ],
    )
}

// ─── Disjoint quadrants ──────────────────────────────────────────────────

#[tokio::test]
async fn hover_in_quadrant_reports_its_label() {
    let layers = MaskLayers::decode(quadrant_masks(), W, H).await;
    assert_eq!(layers.dimensions(), (W, H));
    assert_eq!(layers.label_at(NormPoint::new(0.25, 0.25)), Some("лодка"));
    assert_eq!(layers.label_at(NormPoint::new(0.75, 0.75)), Some("маяк"));
    // Uncovered quadrants.
    assert_eq!(layers.label_at(NormPoint::new(0.75, 0.25)), None);
    assert_eq!(layers.label_at(NormPoint::new(0.25, 0.75)), None);
}

#[test]
fn every_pixel_resolves_to_its_own_mask() {
    let layers = MaskLayers::decode_blocking(quadrant_masks(), W, H);
    let hit = layers.hit_map();
    for y in (0..H).step_by(37) {
        for x in (0..W).step_by(41) {
            let expected = match (x < 400, y < 300) {
                (true, true) => 1,
                (false, false) => 2,
                _ => 0,
            };
            assert_eq!(hit.value_at(x, y), expected, "pixel ({x},{y})");
        }
    }
}

// ─── Overlap & completion order ──────────────────────────────────────────

#[test]
fn later_mask_wins_regardless_of_completion_order() {
    let set = MaskSet::from_detections(
        Id::intern("image_overlap"),
        vec![
            ("sea".to_string(), png_rect(80, 60, (0, 0, 80, 60)), None),
            ("boat".to_string(), png_rect(80, 60, (20, 20, 20, 20)), None),
            ("flag".to_string(), png_rect(80, 60, (25, 15, 5, 10)), None),
        ],
    );
    let planes: Vec<_> = set
        .masks
        .iter()
        .map(|m| decode_mask(m, 80, 60).unwrap())
        .collect();
    let labels: Vec<String> = set.masks.iter().map(|m| m.label.clone()).collect();

    let mut reference = None;
    for order in [[0, 1, 2], [2, 1, 0], [1, 2, 0], [2, 0, 1]] {
        let mut builder = HitMapBuilder::new(80, 60, labels.clone());
        for i in order {
            builder.apply(i, &planes[i]);
        }
        let map = builder.finish().unwrap();
        assert_eq!(map.label_at(NormPoint::new(30.0 / 80.0, 30.0 / 60.0)), Some("boat"));
        assert_eq!(map.label_at(NormPoint::new(27.0 / 80.0, 21.0 / 60.0)), Some("flag"));
        assert_eq!(map.label_at(NormPoint::new(5.0 / 80.0, 5.0 / 60.0)), Some("sea"));
        match &reference {
            None => reference = Some(map),
            Some(r) => assert_eq!(&map, r),
        }
    }
}

// ─── Boxed masks ─────────────────────────────────────────────────────────

#[test]
fn boxed_mask_is_positioned_by_its_box() {
    let set = MaskSet::from_detections(
        Id::intern("image_boxed"),
        vec![(
            "window".to_string(),
            png_rect(10, 10, (0, 0, 10, 10)),
            Some(MaskBox::from([500.0, 500.0, 1000.0, 1000.0])),
        )],
    );
    let layers = MaskLayers::decode_blocking(set, W, H);
    assert_eq!(layers.label_at(NormPoint::new(0.75, 0.75)), Some("window"));
    assert_eq!(layers.label_at(NormPoint::new(0.25, 0.75)), None);
}
