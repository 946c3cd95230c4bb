//! Round trips through the public decoding and encoding entry points.

use glyph_codec::{
    model::{CurveOrder, FigureBuilder, PointMatch},
    postscript::{
        decode_charstring, decrypt_charstring, encode_charstring, encrypt_charstring,
        CffContext, CharstringVersion, EncodeOptions, PrivateDict,
    },
    truetype::{decode_glyph, GlyfEncoder},
    types::GlyphId16,
    ComponentRef, Glyph, HintMask, OutlineFormat,
};
use kurbo::{Affine, Point, Rect};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn square(size: f64) -> Glyph {
    let mut builder = FigureBuilder::new(CurveOrder::Quadratic);
    builder.move_to(Point::new(0.0, 0.0));
    builder.line_to(Point::new(0.0, size));
    builder.line_to(Point::new(size, size));
    builder.line_to(Point::new(size, 0.0));
    builder.close();
    let mut glyph = Glyph::new(OutlineFormat::TrueType);
    glyph.figures.push(builder.finish());
    glyph
}

#[test]
fn type2_moveto_is_shortened() {
    // 100 0 rmoveto 50 hlineto endchar
    let data = [239, 139, 21, 189, 6, 14];
    let private = PrivateDict::default();
    let ctx = CffContext::new(CharstringVersion::Type2, &private);
    let decoded = decode_charstring(&data, &ctx);
    assert!(decoded.is_clean(), "{:?}", decoded.diagnostics);
    let bytes = encode_charstring(&decoded.glyph, &ctx, &EncodeOptions::default()).unwrap();
    // 100 hmoveto 50 hlineto endchar
    assert_eq!(bytes, [239, 22, 189, 6, 14]);
}

#[test]
fn encrypted_type1_charstring() {
    // 50 500 hsbw 0 0 rmoveto 100 0 rlineto 0 100 rlineto closepath endchar
    let plain = [
        189, 248, 136, 13, 139, 139, 21, 239, 139, 5, 139, 239, 5, 9, 14,
    ];
    let private = PrivateDict::default();
    let encrypted = encrypt_charstring(&plain, private.len_iv());
    assert_ne!(&encrypted[4..], &plain[..]);
    let data = decrypt_charstring(&encrypted, private.len_iv());
    assert_eq!(data, plain);

    let ctx = CffContext::new(CharstringVersion::Type1, &private);
    let decoded = decode_charstring(&data, &ctx);
    assert!(decoded.is_clean(), "{:?}", decoded.diagnostics);
    let mut glyph = decoded.glyph;
    assert_eq!(glyph.advance_width, 500.0);
    assert_eq!(glyph.lsb, 50.0);
    assert_eq!(glyph.compute_bbox(), Rect::new(50.0, 0.0, 150.0, 100.0));
}

#[test]
fn truetype_outline_to_charstring() {
    let source: Vec<Glyph> = Vec::new();
    let bytes = GlyfEncoder::default()
        .encode(GlyphId16::new(0), &square(100.0), &source)
        .unwrap();
    let mut glyph = decode_glyph(&bytes).into_result().unwrap();
    assert_eq!(glyph.bbox, Rect::new(0.0, 0.0, 100.0, 100.0));

    glyph.convert_to(OutlineFormat::PostScript, 1.0);
    let private = PrivateDict::default();
    let ctx = CffContext::new(CharstringVersion::Cff2, &private);
    let charstring = encode_charstring(&glyph, &ctx, &EncodeOptions::default()).unwrap();
    let mut decoded = decode_charstring(&charstring, &ctx)
        .into_result()
        .unwrap();
    assert_eq!(decoded.compute_bbox(), Rect::new(0.0, 0.0, 100.0, 100.0));
}

#[test]
fn composite_round_trip() {
    let glyphs = vec![Glyph::new(OutlineFormat::TrueType), square(100.0)];
    let mut composite = Glyph::new(OutlineFormat::TrueType);
    composite.refs.push(ComponentRef::new(
        GlyphId16::new(1),
        Affine::new([0.5, 0.0, 0.0, 0.5, 10.0, 20.0]),
    ));
    let mut encoder = GlyfEncoder::default();
    let bytes = encoder
        .encode(GlyphId16::new(2), &composite, &glyphs)
        .unwrap();
    let decoded = decode_glyph(&bytes).into_result().unwrap();
    assert_eq!(decoded.refs, composite.refs);
    assert_eq!(decoded.bbox, Rect::new(10.0, 20.0, 60.0, 70.0));
    assert_eq!(encoder.maxima().max_component_depth, 1);
}

#[test]
fn point_matched_component_is_placed() {
    let glyphs = vec![Glyph::new(OutlineFormat::TrueType), square(100.0)];
    let mut composite = Glyph::new(OutlineFormat::TrueType);
    composite
        .refs
        .push(ComponentRef::new(GlyphId16::new(1), Affine::IDENTITY));
    let mut attached = ComponentRef::new(GlyphId16::new(1), Affine::IDENTITY);
    // third point of the first square, first point of the second
    attached.point_match = Some(PointMatch {
        base: 2,
        component: 0,
    });
    composite.refs.push(attached);

    composite
        .finalize_refs(GlyphId16::new(2), &glyphs)
        .unwrap();
    assert_eq!(
        composite.refs[1].transform,
        Affine::translate((100.0, 100.0))
    );

    composite
        .flatten_refs(GlyphId16::new(2), &glyphs)
        .unwrap();
    assert!(composite.refs.is_empty());
    assert_eq!(composite.contour_count(), 2);
    assert_eq!(composite.compute_bbox(), Rect::new(0.0, 0.0, 200.0, 200.0));
}

/// Xorshift generator so that failures reproduce from the seed alone.
struct Rng(u32);

impl Rng {
    fn next(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }

    fn chance(&mut self, one_in: u32) -> bool {
        self.next() % one_in == 0
    }

    fn range(&mut self, lo: i32, hi: i32) -> f64 {
        let span = (hi - lo + 1) as u32;
        (lo + (self.next() % span) as i32) as f64
    }

    fn delta(&mut self) -> f64 {
        loop {
            let value = self.range(-200, 200);
            if value != 0.0 {
                return value;
            }
        }
    }

    /// A delta that is zero one time in three.
    fn maybe_zero(&mut self) -> f64 {
        if self.chance(3) {
            0.0
        } else {
            self.delta()
        }
    }

    fn mask(&mut self, stem_count: usize) -> HintMask {
        let mut mask = HintMask::new();
        mask.set(self.next() as usize % stem_count);
        for n in 0..stem_count {
            if self.chance(2) {
                mask.set(n);
            }
        }
        mask
    }
}

enum Segment {
    Line(Point),
    Curve(Point, Point, Point),
}

impl Segment {
    fn end(&self) -> Point {
        match self {
            Segment::Line(p) | Segment::Curve(_, _, p) => *p,
        }
    }
}

fn random_segment(rng: &mut Rng, from: Point) -> Segment {
    match rng.next() % 3 {
        0 => {
            let (dx, dy) = match rng.next() % 3 {
                0 => (rng.delta(), 0.0),
                1 => (0.0, rng.delta()),
                _ => (rng.delta(), rng.delta()),
            };
            Segment::Line(from + (dx, dy))
        }
        _ => loop {
            let c1 = from + (rng.maybe_zero(), rng.maybe_zero());
            let c2 = c1 + (rng.delta(), rng.delta());
            let p = c2 + (rng.maybe_zero(), rng.maybe_zero());
            if p != from {
                return Segment::Curve(c1, c2, p);
            }
        },
    }
}

/// Two shallow curves meeting at a level joint, as drawn by flex.
fn flex_pair(rng: &mut Rng, from: Point) -> [Segment; 2] {
    let depth = rng.range(1, 15) * if rng.chance(2) { 1.0 } else { -1.0 };
    let step = rng.range(10, 60);
    let y = from.y + depth;
    let c1 = Point::new(from.x + step, from.y);
    let c2 = Point::new(c1.x + step, y);
    let p = Point::new(c2.x + step, y);
    let c3 = Point::new(p.x + step, y);
    let c4 = Point::new(c3.x + step, from.y);
    let end = Point::new(c4.x + step, from.y);
    [Segment::Curve(c1, c2, p), Segment::Curve(c3, c4, end)]
}

/// Builds a glyph of open cubic contours with stems and hint masks.
fn random_glyph(rng: &mut Rng) -> Glyph {
    let mut glyph = Glyph::new(OutlineFormat::PostScript);
    // horizontal stems first so that hint numbers follow declaration order
    for _ in 0..rng.range(1, 5) as usize {
        glyph.hints.add_hstem(rng.range(-100, 800), rng.range(10, 80)).unwrap();
    }
    for _ in 0..rng.range(0, 5) as usize {
        glyph.hints.add_vstem(rng.range(-100, 800), rng.range(10, 80)).unwrap();
    }
    let stem_count = glyph.hints.count();
    if rng.chance(4) {
        glyph.counter_masks.push(rng.mask(stem_count));
    }

    let mut builder = FigureBuilder::new(CurveOrder::Cubic);
    let mut current = Point::ZERO;
    for _ in 0..rng.range(1, 3) as usize {
        let start = current + (rng.delta(), rng.delta());
        let id = builder.move_to(start);
        if rng.chance(2) {
            builder.point_mut(id).hint_mask = Some(rng.mask(stem_count));
        }
        let mut segments = Vec::new();
        let mut end = start;
        for _ in 0..rng.range(1, 8) as usize {
            if rng.chance(5) {
                segments.extend(flex_pair(rng, end));
            } else {
                segments.push(random_segment(rng, end));
            }
            end = segments[segments.len() - 1].end();
        }
        // a final point on the start would be merged into it
        if end == start {
            segments.push(Segment::Line(end + (7.0, 0.0)));
        }
        for segment in segments {
            current = segment.end();
            let id = match segment {
                Segment::Line(p) => builder.line_to(p),
                Segment::Curve(c1, c2, p) => builder.curve_to(c1, c2, p),
            };
            if rng.chance(4) {
                builder.point_mut(id).hint_mask = Some(rng.mask(stem_count));
            }
        }
    }
    glyph.figures.push(builder.finish());
    glyph
}

type PointShape = (Point, Option<Point>, Option<Point>, Option<HintMask>);

fn shape(glyph: &Glyph) -> Vec<Vec<PointShape>> {
    glyph
        .figures
        .iter()
        .flat_map(|figure| {
            figure.contours().iter().map(|contour| {
                figure
                    .contour_points(contour)
                    .into_iter()
                    .map(|id| {
                        let p = figure.point(id);
                        (p.anchor, p.prev_cp, p.next_cp, p.hint_mask.clone())
                    })
                    .collect()
            })
        })
        .collect()
}

#[rstest]
#[case::type2(CharstringVersion::Type2)]
#[case::cff2(CharstringVersion::Cff2)]
fn random_outlines_survive_round_trip(#[case] version: CharstringVersion) {
    let private = PrivateDict::default();
    let ctx = CffContext::new(version, &private);
    for seed in 1..=300u32 {
        let mut rng = Rng(0x9E37_79B9u32.wrapping_mul(seed));
        let glyph = random_glyph(&mut rng);
        let bytes = encode_charstring(&glyph, &ctx, &EncodeOptions::default()).unwrap();
        let decoded = decode_charstring(&bytes, &ctx);
        assert!(decoded.is_clean(), "seed {seed}: {:?}", decoded.diagnostics);
        let decoded = decoded.glyph;
        assert_eq!(shape(&decoded), shape(&glyph), "seed {seed}");
        assert_eq!(decoded.hints, glyph.hints, "seed {seed}");
        assert_eq!(decoded.counter_masks, glyph.counter_masks, "seed {seed}");
    }
}
